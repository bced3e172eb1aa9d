use thiserror::Error;
use tokio::sync::mpsc::error::SendError;

/// A line that could not be decoded into a [`LobbyMessage`](crate::LobbyMessage)
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty line")]
    Empty,
    #[error("Message tags with no command")]
    TagsWithoutVerb,
    #[error("Message source with no command")]
    SourceWithoutVerb,
    #[error("Empty command")]
    EmptyVerb,
    #[error("Line too long")]
    Overlong,
}

/// A message that cannot be represented on the wire
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Empty command")]
    EmptyVerb,
    #[error("Parameter {0} cannot be encoded before the final parameter")]
    InvalidMiddleParameter(usize),
}

/// An error that might occur on the transport of a single connection.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Connection closed")]
    Closed,
    #[error("I/O Error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Invalid server name {0:?}")]
    InvalidServerName(String),
    #[error("Ping timeout: {0} seconds")]
    PingTimeout(u64),
    #[error("Connector exhausted")]
    ConnectorExhausted,
}

/// An error that occurred while handling a well-formed message
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("{verb}: missing parameter {index}")]
    MissingParameter { verb: String, index: usize },
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),
    #[error("Registration denied: {0}")]
    RegistrationDenied(String),
}

impl ProtocolError {
    pub(crate) fn missing(verb: &str, index: usize) -> Self {
        Self::MissingParameter {
            verb: verb.to_string(),
            index,
        }
    }
}

pub type HandleResult = Result<(), ProtocolError>;

/// Invalid input supplied by the application. These are reported at call time,
/// never deferred into the event stream.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid username {0:?}")]
    InvalidUsername(String),
    #[error("Invalid password")]
    InvalidPassword,
    #[error("Invalid channel name {0:?}")]
    InvalidChannel(String),
    #[error("Invalid message target {0:?}")]
    InvalidTarget(String),
    #[error("Invalid capability name {0:?}")]
    InvalidCapability(String),
    #[error("Invalid email address {0:?}")]
    InvalidEmail(String),
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
}

/// An error returned by [`ClientHandle`](crate::ClientHandle) methods
#[derive(Debug, Error)]
pub enum ClientError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("Could not connect: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Connection has terminated")]
    ConnectionClosed,
    #[error("Connection has already been started")]
    AlreadyStarted,
}

impl<T> From<SendError<T>> for ClientError {
    fn from(_: SendError<T>) -> Self {
        Self::ConnectionClosed
    }
}
