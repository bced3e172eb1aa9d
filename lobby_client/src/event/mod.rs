//! Events published by a connection

use crate::errors::ParseError;
use crate::message::LobbyMessage;
use crate::ConnectionContext;

use std::time::Duration;
use strum::{EnumDiscriminants, IntoStaticStr};

mod bus;
pub use bus::*;

/// Everything a connection can report to the application.
///
/// Subscriptions are made per [`EventKind`], the field-less discriminant of
/// this type.
#[derive(Debug, Clone, PartialEq, EnumDiscriminants)]
#[strum_discriminants(name(EventKind))]
#[strum_discriminants(derive(Hash, IntoStaticStr))]
pub enum Event {
    /// A transport session has been opened. `session` counts from 1 and
    /// increases with each reconnection.
    Connected { session: u64 },
    /// The transport session has ended
    Disconnected { reason: String, will_reconnect: bool },

    /// The server accepted our login
    Registered { nickname: String },
    /// The server rejected our login
    Denied { reason: String },
    AccountRegistered,
    AccountRegistrationDenied { reason: String },

    Said { channel: String, user: String, text: String },
    SaidEx { channel: String, user: String, text: String },
    SaidPrivate { user: String, text: String },
    SaidPrivateEx { user: String, text: String },
    Notice {
        target: String,
        user: Option<String>,
        text: String,
    },

    Joined {
        channel: String,
        user: String,
        is_self: bool,
    },
    Parted {
        channel: String,
        user: String,
        reason: Option<String>,
        is_self: bool,
    },
    Quit { user: String, reason: Option<String> },
    Kicked {
        channel: String,
        kicker: Option<String>,
        kickee: String,
        reason: Option<String>,
    },
    NickChanged {
        old: String,
        new: String,
        is_self: bool,
    },
    AccountChanged { user: String, account: Option<String> },

    ModeSet {
        target: String,
        mode: char,
        arg: Option<String>,
        setter: Option<String>,
    },
    ModeUnset {
        target: String,
        mode: char,
        arg: Option<String>,
        setter: Option<String>,
    },
    TopicChanged {
        channel: String,
        topic: String,
        setter: Option<String>,
    },
    /// Membership, mode and user details for a joined channel are now complete
    SyncComplete { channel: String },

    CapabilityAcknowledged { caps: Vec<String> },
    CapabilityRejected { caps: Vec<String> },
    AuthComplete,
    AuthFailed { reason: String },

    Pong { lag: Duration },
    NickCollision { attempted: String, replacement: String },

    /// A complete inbound line, before decoding
    Raw { line: String },
    /// A decoded inbound message; the message itself is attached to the
    /// [`Notification`]
    Message,
    /// An inbound line that could not be decoded and was dropped
    MalformedLine { line: String, error: ParseError },
    /// A line was written to the transport
    LineSent { line: String },
}

impl Event {
    pub fn kind(&self) -> EventKind {
        EventKind::from(self)
    }
}

impl EventKind {
    pub fn name(&self) -> &'static str {
        (*self).into()
    }
}

/// What a subscriber receives: the event, the message that caused it if any,
/// and read-only access to the state of the connection that produced it.
#[derive(Clone, Copy)]
pub struct Notification<'a> {
    pub context: &'a ConnectionContext,
    pub event: &'a Event,
    pub message: Option<&'a LobbyMessage>,
}

impl<'a> Notification<'a> {
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

impl std::fmt::Debug for Notification<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Notification")
            .field("network", &self.context.network())
            .field("event", self.event)
            .field("message", &self.message)
            .finish()
    }
}
