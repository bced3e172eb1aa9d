//! Commonly used types, re-exported for convenience

pub use crate::client::{connect, ClientHandle};
pub use crate::config::{ClientConfig, Credentials, ReconnectConfig, ServerAddress, TimingConfig};
pub use crate::errors::{
    ClientError, ConfigError, ConnectionError, EncodeError, ParseError, ProtocolError,
};
pub use crate::event::{Event, EventBus, EventKind, Notification};
pub use crate::id::{NetworkId, SubscriptionId};
pub use crate::message::{Hostmask, LobbyMessage};
pub use crate::outbound_queue::OutboundQueue;
pub use crate::transport::{Connector, TcpConnector};
pub use crate::utils::OrLog;
pub use crate::{ClientAction, ConnectionContext};
