//! The bot's answers to the commands addressed to it

use lobby_client::ConnectionContext;

/// Produce the reply to `command`, if it is one the bot knows
pub fn reply(command: &str, ctx: &ConnectionContext) -> Option<String> {
    let mut words = command.split_whitespace();
    let verb = words.next()?.to_ascii_lowercase();

    match verb.as_str() {
        "ping" => Some("pong".to_string()),
        "lag" => Some(match ctx.lag() {
            Some(lag) => format!("lag is {}ms", lag.as_millis()),
            None => "no lag measured yet".to_string(),
        }),
        "channels" => {
            let nick = ctx.nickname()?;
            let channels = ctx.registry().channels_of(nick);
            if channels.is_empty() {
                Some("not in any channels".to_string())
            } else {
                Some(channels.join(" "))
            }
        }
        "members" => {
            let channel = words.next()?;
            let members = ctx.registry().members_of(channel);
            Some(format!("{} members in {}", members.len(), channel))
        }
        "seen" => {
            let nick = words.next()?;
            Some(match ctx.registry().user(nick) {
                Some(user) => match user.hostmask() {
                    Some(mask) => format!("{} is {}", nick, mask),
                    None => format!("{} is here", nick),
                },
                None => format!("I don't know {}", nick),
            })
        }
        _ => None,
    }
}
