//! Outbound protocol lines

use itertools::Itertools;

/// Chat text longer than this is split across several commands
pub const MAX_TEXT_LEN: usize = 400;

/// Protocol version advertised in `LOGIN`
pub const LOGIN_CPU_FIELD: &str = "3200";

/// A line the engine can send to the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CapLs,
    CapReq(Vec<String>),
    CapEnd,
    Authenticate(String),
    Login {
        username: String,
        password: String,
        client_name: String,
    },
    Register {
        username: String,
        password: String,
        email: Option<String>,
    },
    Join(String),
    Leave(String),
    Say { channel: String, text: String },
    SayEx { channel: String, text: String },
    SayPrivate { user: String, text: String },
    SayPrivateEx { user: String, text: String },
    Ping,
    Pong(Option<String>),
    Who { channel: String, whox: bool },
    Mode(String),
    Nick(String),
    Exit,
    Raw(String),
}

impl Command {
    /// The wire form of this command, without a line terminator
    pub fn to_line(&self) -> String {
        match self {
            Self::CapLs => "CAP LS".to_string(),
            Self::CapReq(caps) => format!("CAP REQ :{}", caps.iter().join(" ")),
            Self::CapEnd => "CAP END".to_string(),
            Self::Authenticate(data) => format!("AUTHENTICATE {}", data),
            Self::Login {
                username,
                password,
                client_name,
            } => format!(
                "LOGIN {} {} {} * {}",
                username, password, LOGIN_CPU_FIELD, client_name
            ),
            Self::Register {
                username,
                password,
                email: Some(email),
            } => format!("REGISTER {} {} {}", username, password, email),
            Self::Register {
                username, password, ..
            } => format!("REGISTER {} {}", username, password),
            Self::Join(channel) => format!("JOIN {}", channel),
            Self::Leave(channel) => format!("LEAVE {}", channel),
            Self::Say { channel, text } => format!("SAY {} {}", channel, text),
            Self::SayEx { channel, text } => format!("SAYEX {} {}", channel, text),
            Self::SayPrivate { user, text } => format!("SAYPRIVATE {} :{}", user, text),
            Self::SayPrivateEx { user, text } => format!("SAYPRIVATEEX {} :{}", user, text),
            Self::Ping => "PING".to_string(),
            Self::Pong(Some(token)) => format!("PONG {}", token),
            Self::Pong(None) => "PONG".to_string(),
            Self::Who {
                channel,
                whox: true,
            } => format!("WHO {} %cnuha", channel),
            Self::Who { channel, .. } => format!("WHO {}", channel),
            Self::Mode(target) => format!("MODE {}", target),
            Self::Nick(nick) => format!("NICK {}", nick),
            Self::Exit => "EXIT".to_string(),
            Self::Raw(line) => strip_line_breaks(line),
        }
    }

    /// Whether this line should be sent again on the next session if it was
    /// still queued when the previous one ended
    pub fn replayable(&self) -> bool {
        matches!(
            self,
            Self::Say { .. } | Self::SayEx { .. } | Self::SayPrivate { .. } | Self::SayPrivateEx { .. }
        )
    }
}

fn strip_line_breaks(text: &str) -> String {
    text.chars().filter(|c| *c != '\r' && *c != '\n').collect()
}

/// Remove line breaks from `text` and split it into chunks of at most
/// `max_len` bytes, breaking only on character boundaries.
pub fn split_text(text: &str, max_len: usize) -> Vec<String> {
    let text = strip_line_breaks(text);
    let mut chunks = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if !current.is_empty() && current.len() + c.len_utf8() > max_len {
            chunks.push(std::mem::take(&mut current));
        }
        current.push(c);
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
