use crate::config::{
    validate_capability, validate_channel, validate_email, validate_target, ClientConfig,
    Credentials, ServerAddress,
};
use crate::connection_task::{ConnectionTask, SessionOutcome};
use crate::errors::ClientError;
use crate::event::{Event, EventBus, EventKind, Notification};
use crate::id::{NetworkId, SubscriptionId};
use crate::registration::RegistrationState;
use crate::transport::{BoxedStream, Connector, TcpConnector};
use crate::{ClientAction, ConnectionContext, ContextSettings, SessionIdentity};

use backoff::backoff::Backoff;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::Notify;
use tokio::time::Instant;

/// State shared between the handles and the supervisor task
#[derive(Debug)]
struct Control {
    auto_reconnect: AtomicBool,
    stop: Notify,
}

/// A supervisor that has not been started yet
struct Pending {
    supervisor: Supervisor,
    actions: UnboundedReceiver<ClientAction>,
}

struct Shared {
    network: NetworkId,
    bus: EventBus,
    commands: UnboundedSender<ClientAction>,
    control: Arc<Control>,
    pending: Mutex<Option<Pending>>,
}

/// The application's handle on one logical connection.
///
/// Handles are cheap to clone; all clones refer to the same connection. Apart
/// from starting, every method returns without waiting on the network. Invalid
/// input is rejected synchronously with [`ClientError::Config`].
///
/// When the last handle is dropped the current session ends and no
/// reconnection is attempted.
#[derive(Clone)]
pub struct ClientHandle {
    shared: Arc<Shared>,
}

/// Connect to `host:port` with default settings
pub async fn connect(host: &str, port: u16, tls: bool) -> Result<ClientHandle, ClientError> {
    ClientHandle::connect_with_config(ClientConfig::new(ServerAddress::new(host, port, tls))).await
}

impl ClientHandle {
    /// Validate `config`, open the first transport session and start the
    /// connection supervisor. A failure to open the first session is reported
    /// here rather than through the reconnection policy.
    ///
    /// Handlers subscribed after this returns may miss the first events. Use
    /// [`new`](Self::new) and [`start`](Self::start) to subscribe first.
    pub async fn connect_with_config(config: ClientConfig) -> Result<Self, ClientError> {
        let handle = Self::new(config)?;
        handle.start().await?;
        Ok(handle)
    }

    /// As [`connect_with_config`](Self::connect_with_config), opening every
    /// transport session through `connector`
    pub async fn connect_with_connector(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        let handle = Self::with_connector(config, connector)?;
        handle.start().await?;
        Ok(handle)
    }

    /// Validate `config` and build a handle without connecting. Nothing is
    /// published and nothing is sent until [`start`](Self::start); calls made
    /// before then are queued.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let connector = Arc::new(TcpConnector::new(config.server.clone()));
        Self::with_connector(config, connector)
    }

    pub fn with_connector(
        config: ClientConfig,
        connector: Arc<dyn Connector>,
    ) -> Result<Self, ClientError> {
        config.validate()?;

        let network = NetworkId::next();
        let (commands, actions) = unbounded_channel();
        let control = Arc::new(Control {
            auto_reconnect: AtomicBool::new(config.reconnect.enabled),
            stop: Notify::new(),
        });
        let bus = EventBus::new();

        let supervisor = Supervisor {
            network,
            bus: bus.clone(),
            control: Arc::clone(&control),
            connector,
            config,
        };

        Ok(Self {
            shared: Arc::new(Shared {
                network,
                bus,
                commands,
                control,
                pending: Mutex::new(Some(Pending {
                    supervisor,
                    actions,
                })),
            }),
        })
    }

    /// Open the first transport session and start the connection supervisor.
    ///
    /// If the first session cannot be opened the error is returned and the
    /// handle may be started again.
    pub async fn start(&self) -> Result<(), ClientError> {
        let Some(pending) = self.shared.pending.lock().take() else {
            return Err(ClientError::AlreadyStarted);
        };

        let connected = pending.supervisor.connector.connect().await;
        match connected {
            Ok(stream) => {
                tokio::spawn(pending.supervisor.run(stream, pending.actions));
                Ok(())
            }
            Err(e) => {
                *self.shared.pending.lock() = Some(pending);
                Err(e.into())
            }
        }
    }

    pub fn network(&self) -> NetworkId {
        self.shared.network
    }

    pub fn bus(&self) -> &EventBus {
        &self.shared.bus
    }

    /// Register a handler for one kind of event. See [`EventBus::subscribe`].
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared.bus.subscribe(kind, handler)
    }

    pub fn subscribe_all<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&Notification<'_>) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.shared.bus.subscribe_all(handler)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.shared.bus.unsubscribe(id)
    }

    fn send(&self, action: ClientAction) -> Result<(), ClientError> {
        self.shared.commands.send(action)?;
        Ok(())
    }

    /// Log in once the login delay has passed. Credentials are kept for
    /// later sessions.
    pub fn login(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.send(ClientAction::Login(Credentials::new(username, password)?))
    }

    /// Ask the server to create an account
    pub fn register_account(
        &self,
        username: &str,
        password: &str,
        email: Option<&str>,
    ) -> Result<(), ClientError> {
        let credentials = Credentials::new(username, password)?;
        if let Some(email) = email {
            validate_email(email)?;
        }
        self.send(ClientAction::RegisterAccount {
            credentials,
            email: email.map(str::to_string),
        })
    }

    /// Authenticate with SASL PLAIN during capability negotiation
    pub fn authenticate(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.send(ClientAction::Authenticate(Credentials::new(username, password)?))
    }

    pub fn request_capability(&self, name: &str) -> Result<(), ClientError> {
        validate_capability(name)?;
        self.send(ClientAction::RequestCapability(name.to_string()))
    }

    /// Join `channel`, now if registered and otherwise once registration
    /// completes. The channel is rejoined after every reconnection.
    pub fn join(&self, channel: &str) -> Result<(), ClientError> {
        validate_channel(channel)?;
        self.send(ClientAction::Join(channel.to_string()))
    }

    pub fn leave(&self, channel: &str) -> Result<(), ClientError> {
        validate_channel(channel)?;
        self.send(ClientAction::Leave(channel.to_string()))
    }

    pub fn say(&self, channel: &str, text: &str) -> Result<(), ClientError> {
        validate_channel(channel)?;
        self.send(ClientAction::Say {
            channel: channel.to_string(),
            text: text.to_string(),
        })
    }

    pub fn say_emote(&self, channel: &str, text: &str) -> Result<(), ClientError> {
        validate_channel(channel)?;
        self.send(ClientAction::SayEx {
            channel: channel.to_string(),
            text: text.to_string(),
        })
    }

    pub fn say_private(&self, user: &str, text: &str) -> Result<(), ClientError> {
        validate_target(user)?;
        self.send(ClientAction::SayPrivate {
            user: user.to_string(),
            text: text.to_string(),
        })
    }

    pub fn say_private_emote(&self, user: &str, text: &str) -> Result<(), ClientError> {
        validate_target(user)?;
        self.send(ClientAction::SayPrivateEx {
            user: user.to_string(),
            text: text.to_string(),
        })
    }

    /// Queue an arbitrary line on the paced queue. Line breaks are removed.
    pub fn send_raw(&self, line: &str) -> Result<(), ClientError> {
        self.send(ClientAction::Raw(line.to_string()))
    }

    /// Whether a transport failure leads to a reconnection attempt
    pub fn auto_reconnect(&self) -> bool {
        self.shared.control.auto_reconnect.load(Ordering::Relaxed)
    }

    pub fn set_auto_reconnect(&self, enabled: bool) {
        self.shared
            .control
            .auto_reconnect
            .store(enabled, Ordering::Relaxed);
    }

    /// Send `EXIT` and end the connection's lifecycle
    pub fn disconnect(&self) -> Result<(), ClientError> {
        self.set_auto_reconnect(false);
        self.shared.control.stop.notify_one();
        self.send(ClientAction::Disconnect)
    }
}

/// Runs sessions one after another for the lifetime of a connection
struct Supervisor {
    network: NetworkId,
    bus: EventBus,
    control: Arc<Control>,
    connector: Arc<dyn Connector>,
    config: ClientConfig,
}

impl Supervisor {
    #[tracing::instrument(skip_all, fields(network = %self.network))]
    async fn run(self, first: BoxedStream, mut actions: UnboundedReceiver<ClientAction>) {
        let settings = ContextSettings::from_config(&self.config);
        let mut identity = SessionIdentity::from_config(&self.config);
        let mut stream = first;
        let mut session = 0;

        loop {
            session += 1;
            let ctx = ConnectionContext::new(
                self.network,
                session,
                identity,
                settings.clone(),
                Instant::now(),
            );

            let SessionOutcome {
                end,
                context,
                actions: returned,
            } = ConnectionTask::new(ctx, stream, self.bus.clone(), actions)
                .run()
                .await;
            actions = returned;

            let denied = matches!(context.registration(), RegistrationState::Denied(_));
            let will_reconnect = end.permits_reconnect()
                && !denied
                && self.control.auto_reconnect.load(Ordering::Relaxed);

            let event = Event::Disconnected {
                reason: end.reason(),
                will_reconnect,
            };
            self.bus.publish(&Notification {
                context: &context,
                event: &event,
                message: None,
            });

            identity = context.into_identity();
            if !will_reconnect {
                tracing::info!("Connection finished");
                return;
            }

            stream = match self.reconnect().await {
                Some(stream) => stream,
                None => return,
            };
        }
    }

    /// Open a new transport, waiting between attempts according to the
    /// reconnection policy. Returns `None` if the policy gives up or
    /// reconnection is cancelled.
    async fn reconnect(&self) -> Option<BoxedStream> {
        let mut backoff = self.config.reconnect.backoff();

        loop {
            let Some(delay) = backoff.next_backoff() else {
                tracing::warn!("Giving up on reconnection");
                return None;
            };

            tracing::info!(?delay, "Reconnecting");
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = self.control.stop.notified() => {
                    tracing::info!("Reconnection cancelled");
                    return None;
                }
            }
            if !self.control.auto_reconnect.load(Ordering::Relaxed) {
                return None;
            }

            match self.connector.connect().await {
                Ok(stream) => return Some(stream),
                Err(e) => tracing::warn!(error = %e, "Reconnection attempt failed"),
            }
        }
    }
}
