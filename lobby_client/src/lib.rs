//! Client engine for the lobby chat protocol.
//!
//! The main entry point is [`ClientHandle`], returned by [`connect`] or
//! [`ClientHandle::connect_with_config`]. To have handlers in place for the
//! first events, build it with [`ClientHandle::new`], subscribe, then call
//! [`ClientHandle::start`]. Each handle owns one logical
//! connection: a supervisor task that opens the transport, runs a connection
//! task for the lifetime of each transport session, and reconnects according
//! to the configured policy.
//!
//! # Inbound path
//!
//! Bytes read from the transport are split into lines by the [`framing`] module
//! and decoded into [`LobbyMessage`]s. Each message is handed to the
//! connection's [`ConnectionContext`], which owns every piece of per-connection
//! state (capability negotiation, authentication, registration, the channel and
//! user [`Registry`](tracking::Registry)) and translates the message into zero
//! or more [`Event`]s. State is always updated before the corresponding event
//! is published, so a subscriber that inspects the context from inside its
//! handler sees the state the event describes.
//!
//! # Event delivery
//!
//! Events are published on the handle's [`EventBus`]. Subscribers are invoked
//! synchronously on the connection task, in subscription order, and receive a
//! [`Notification`] carrying the event, the message that caused it (if any),
//! and read-only access to the connection context. Handlers must not block;
//! use a cloned [`ClientHandle`] to act on an event.
//!
//! # Outbound path
//!
//! Application calls on the handle are turned into [`ClientAction`]s and sent
//! to the connection task without blocking. Most outbound lines go through the
//! paced [`OutboundQueue`], which releases one line per pacing tick; lines
//! required by the internal handshakes bypass the queue.

pub mod capability;
pub mod command;
pub mod config;
pub mod errors;
pub mod event;
pub mod framing;
pub mod id;
pub mod isupport;
pub mod keepalive;
pub mod message;
pub mod numeric;
pub mod outbound_queue;
pub mod registration;
pub mod sasl;
pub mod tracking;
pub mod transport;
pub mod utils;

mod context;
pub use context::*;

mod connection_task;

mod client;
pub use client::*;

pub mod prelude;
pub use prelude::*;
