//! A small lobby bot: joins its configured channels and answers commands
//! addressed to it.

use lobby_client::{ClientHandle, Event, EventKind, OrLog};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use structopt::StructOpt;
use tokio::sync::Notify;

mod addressed;
mod commands;
mod config;
mod tracing_config;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug, StructOpt)]
#[structopt(rename_all = "kebab")]
struct Opts {
    /// Bot config file location
    #[structopt(short, long)]
    config: PathBuf,
}

fn install_handlers(handle: &ClientHandle, prefixes: Vec<String>, finished: Arc<Notify>) {
    handle.subscribe(EventKind::Connected, |n| {
        if let Event::Connected { session } = n.event {
            tracing::info!(session, network = %n.context.network(), "Connected");
        }
        Ok(())
    });

    handle.subscribe(EventKind::Registered, |n| {
        if let Event::Registered { nickname } = n.event {
            tracing::info!(%nickname, network = %n.context.network(), "Logged in");
        }
        Ok(())
    });

    handle.subscribe(EventKind::Denied, |n| {
        if let Event::Denied { reason } = n.event {
            tracing::error!(%reason, "Login denied");
        }
        Ok(())
    });

    handle.subscribe(EventKind::SyncComplete, |n| {
        if let Event::SyncComplete { channel } = n.event {
            let members = n.context.registry().members_of(channel).len();
            tracing::info!(%channel, members, "Channel synchronised");
        }
        Ok(())
    });

    let replies = handle.clone();
    handle.subscribe(EventKind::Said, move |n| {
        let Event::Said { channel, user, text } = n.event else {
            return Ok(());
        };
        if n.context.is_self(user) {
            return Ok(());
        }
        let Some(nick) = n.context.nickname() else {
            return Ok(());
        };

        if let Some(command) = addressed::strip_address(text, nick, &prefixes) {
            tracing::debug!(%channel, %user, %command, "Addressed");
            if let Some(answer) = commands::reply(command, n.context) {
                replies.say(channel, &format!("{}: {}", user, answer))?;
            }
        }
        Ok(())
    });

    let replies = handle.clone();
    handle.subscribe(EventKind::SaidPrivate, move |n| {
        let Event::SaidPrivate { user, text } = n.event else {
            return Ok(());
        };
        if let Some(answer) = commands::reply(text, n.context) {
            replies.say_private(user, &answer)?;
        }
        Ok(())
    });

    handle.subscribe(EventKind::Disconnected, move |n| {
        if let Event::Disconnected {
            reason,
            will_reconnect,
        } = n.event
        {
            tracing::warn!(%reason, will_reconnect, "Disconnected");
            if !will_reconnect {
                finished.notify_one();
            }
        }
        Ok(())
    });
}

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let opts = Opts::from_args();
    let config = config::load_bot_config(&opts.config)?;

    let subscriber = tracing_config::build_subscriber(config.logging.clone())?;
    tracing::subscriber::set_global_default(subscriber)?;

    let handle = ClientHandle::new(config.client.clone())?;
    let finished = Arc::new(Notify::new());
    install_handlers(&handle, config.command_prefixes.clone(), Arc::clone(&finished));
    handle.start().await?;

    tokio::select! {
        _ = finished.notified() => {
            tracing::info!("Connection finished; exiting");
        }
        res = tokio::signal::ctrl_c() => {
            res?;
            tracing::info!("Interrupted; disconnecting");
            handle.disconnect().or_warn("sending disconnect");
            // No event follows if we were between sessions
            let _ = tokio::time::timeout(SHUTDOWN_GRACE, finished.notified()).await;
        }
    }

    Ok(())
}
