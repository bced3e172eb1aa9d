use crate::capability::CapabilityNegotiation;
use crate::command::Command;
use crate::config::{ClientConfig, Credentials, TimingConfig, DEFAULT_CLIENT_NAME};
use crate::errors::{ParseError, ProtocolError};
use crate::event::Event;
use crate::id::NetworkId;
use crate::isupport::ServerFeatures;
use crate::keepalive::{Keepalive, KeepaliveAction};
use crate::message::LobbyMessage;
use crate::outbound_queue::{OutboundQueue, QueuedLine};
use crate::registration::{Registration, RegistrationState};
use crate::sasl::{AuthState, Authenticator, SASL_CAPABILITY};
use crate::tracking::Registry;
use crate::utils::OrLog;

use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

mod action;
pub use action::*;

mod handlers;

/// The application-level identity of a connection: everything that survives a
/// reconnection.
#[derive(Debug, Clone, Default)]
pub struct SessionIdentity {
    pub login: Option<Credentials>,
    pub sasl: Option<Credentials>,
    pub capabilities: Vec<String>,
    /// Channels to join on registration
    pub channels: Vec<String>,
    /// Chat lines accepted from the application but not yet transmitted
    pub replay: Vec<String>,
}

impl SessionIdentity {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            login: config.login.clone(),
            sasl: config.sasl.clone(),
            capabilities: config.capabilities.clone(),
            channels: config.channels.clone(),
            replay: Vec::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContextSettings {
    pub client_name: String,
    pub timing: TimingConfig,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            client_name: DEFAULT_CLIENT_NAME.to_string(),
            timing: TimingConfig::default(),
        }
    }
}

impl ContextSettings {
    pub fn from_config(config: &ClientConfig) -> Self {
        Self {
            client_name: config.client_name.clone(),
            timing: config.timing,
        }
    }
}

/// Why a session should be closed from our side
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionClose {
    PingTimeout(Duration),
    ClientExit,
}

/// Events produced while handling one input, and the message that caused them
pub type PendingEvent = (Event, Option<Arc<LobbyMessage>>);

/// Work produced by the context for the connection task to carry out
#[derive(Debug, Default)]
pub struct ContextOutput {
    /// Lines to write immediately, bypassing the pacing queue
    pub immediate: Vec<String>,
    /// Events to publish, in order
    pub events: Vec<PendingEvent>,
}

/// All the state of one transport session.
///
/// The context performs no I/O. Inbound lines, application actions and timer
/// ticks are fed in; outbound lines and events accumulate until collected with
/// [`take_output`](Self::take_output), and paced lines wait in the
/// [`OutboundQueue`].
#[derive(Debug)]
pub struct ConnectionContext {
    network: NetworkId,
    session: u64,
    identity: SessionIdentity,
    settings: ContextSettings,

    nickname: Option<String>,
    old_nickname: Option<String>,
    features: ServerFeatures,
    caps: CapabilityNegotiation,
    sasl: Authenticator,
    registration: Registration,
    registry: Registry,
    keepalive: Option<Keepalive>,

    queue: OutboundQueue,
    immediate: Vec<String>,
    events: Vec<PendingEvent>,
    current: Option<Arc<LobbyMessage>>,
    close: Option<SessionClose>,

    connected_at: Instant,
    now: Instant,
}

impl ConnectionContext {
    /// Start a session. Capability discovery is announced immediately and a
    /// `Connected` event is queued.
    pub fn new(
        network: NetworkId,
        session: u64,
        identity: SessionIdentity,
        settings: ContextSettings,
        now: Instant,
    ) -> Self {
        let mut caps = CapabilityNegotiation::new();
        for cap in &identity.capabilities {
            caps.request(cap);
        }

        let sasl = Authenticator::new(identity.sasl.clone());
        if sasl.credentials().is_some() {
            caps.wait_for(SASL_CAPABILITY);
        }

        let mut ret = Self {
            network,
            session,
            identity,
            settings,
            nickname: None,
            old_nickname: None,
            features: ServerFeatures::new(),
            caps,
            sasl,
            registration: Registration::new(),
            registry: Registry::new(network),
            keepalive: None,
            queue: OutboundQueue::new(),
            immediate: Vec::new(),
            events: Vec::new(),
            current: None,
            close: None,
            connected_at: now,
            now,
        };

        ret.send_now(&Command::CapLs);
        ret.push_event(Event::Connected { session });
        ret
    }

    /// Process one complete inbound line
    pub fn handle_line(&mut self, line: &str, now: Instant) {
        self.now = now;
        self.current = None;
        self.push_event(Event::Raw {
            line: line.to_string(),
        });

        let message = match LobbyMessage::parse(self.network, line) {
            Ok(message) => Arc::new(message),
            Err(error) => {
                tracing::warn!(?error, line, "Dropping malformed line");
                self.push_event(Event::MalformedLine {
                    line: line.to_string(),
                    error,
                });
                return;
            }
        };

        tracing::trace!(verb = %message.verb, "Received message");

        self.current = Some(Arc::clone(&message));
        self.push_event(Event::Message);

        let result = self.dispatch(&message);
        let context = format!("handling {}", message.verb);
        match &result {
            Err(ProtocolError::MissingParameter { .. }) => result.or_warn(context),
            _ => result.or_log(context),
        }

        self.current = None;
    }

    /// Report a line the framer had to discard
    pub fn handle_overlong(&mut self, prefix: &str, now: Instant) {
        self.now = now;
        tracing::warn!(prefix, "Dropping overlong line");
        self.push_event(Event::MalformedLine {
            line: prefix.to_string(),
            error: ParseError::Overlong,
        });
    }

    /// The login delay has passed since the transport connected
    pub fn open_login_window(&mut self, now: Instant) {
        self.now = now;
        self.registration.open_login_window();
        self.caps.set_ready();
        self.try_login();
        self.advance_negotiation();
    }

    /// Keepalive interval tick. Does nothing before registration.
    pub fn keepalive_tick(&mut self, now: Instant) {
        self.now = now;
        let Some(keepalive) = &mut self.keepalive else {
            return;
        };

        match keepalive.tick(now) {
            KeepaliveAction::Probe => self.send_now(&Command::Ping),
            KeepaliveAction::Dead { silent_for } => {
                tracing::warn!(?silent_for, "No PONG received; closing connection");
                self.close = Some(SessionClose::PingTimeout(silent_for));
            }
        }
    }

    /// Collect the lines and events produced since the last call
    pub fn take_output(&mut self) -> ContextOutput {
        ContextOutput {
            immediate: std::mem::take(&mut self.immediate),
            events: std::mem::take(&mut self.events),
        }
    }

    /// Release the next paced line
    pub fn pop_queued(&mut self) -> Option<QueuedLine> {
        self.queue.pop()
    }

    /// Return a line to the head of the queue after a failed write
    pub fn requeue(&mut self, line: QueuedLine) {
        self.queue.push_front(line);
    }

    /// End the session, keeping what a replacement session needs
    pub fn into_identity(mut self) -> SessionIdentity {
        let unsent = self.queue.take_replayable();
        self.identity.replay.extend(unsent);
        self.identity
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    pub fn settings(&self) -> &ContextSettings {
        &self.settings
    }

    /// Our current nickname, once login has been attempted
    pub fn nickname(&self) -> Option<&str> {
        self.nickname.as_deref()
    }

    /// The nickname in use before the most recent change or collision
    pub fn old_nickname(&self) -> Option<&str> {
        self.old_nickname.as_deref()
    }

    pub fn is_self(&self, nick: &str) -> bool {
        self.nickname.as_deref() == Some(nick)
    }

    pub fn features(&self) -> &ServerFeatures {
        &self.features
    }

    pub fn capabilities(&self) -> &CapabilityNegotiation {
        &self.caps
    }

    pub fn auth_state(&self) -> AuthState {
        self.sasl.state()
    }

    pub fn registration(&self) -> &RegistrationState {
        self.registration.state()
    }

    pub fn is_registered(&self) -> bool {
        self.registration.is_registered()
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn lag(&self) -> Option<Duration> {
        self.keepalive.as_ref().and_then(Keepalive::lag)
    }

    pub fn keepalive_running(&self) -> bool {
        self.keepalive.is_some()
    }

    pub fn queued_lines(&self) -> impl Iterator<Item = &str> {
        self.queue.iter().map(|q| q.line.as_str())
    }

    pub fn close_requested(&self) -> Option<&SessionClose> {
        self.close.as_ref()
    }

    pub fn connected_at(&self) -> Instant {
        self.connected_at
    }

    pub(crate) fn push_event(&mut self, event: Event) {
        self.events.push((event, self.current.clone()));
    }

    pub(crate) fn send_now(&mut self, cmd: &Command) {
        self.immediate.push(cmd.to_line());
    }

    pub(crate) fn enqueue(&mut self, cmd: &Command) {
        self.queue.push_command(cmd);
    }

    fn try_login(&mut self) {
        let Some(login) = self.identity.login.clone() else {
            return;
        };
        if self.registration.take_login_turn(true) {
            tracing::debug!(username = %login.username, "Sending login");
            self.nickname = Some(login.username.clone());
            let cmd = Command::Login {
                username: login.username,
                password: login.password,
                client_name: self.settings.client_name.clone(),
            };
            self.send_now(&cmd);
        }
    }

    /// Send any capability request or `CAP END` that has become possible, and
    /// complete a held login acceptance once negotiation is over
    fn advance_negotiation(&mut self) {
        if let Some(caps) = self.caps.try_request() {
            tracing::debug!(?caps, "Requesting capabilities");
            self.send_now(&Command::CapReq(caps));
        }

        if self.caps.try_end() {
            tracing::debug!("Ending capability negotiation");
            self.send_now(&Command::CapEnd);
        }

        let negotiating = self.negotiating();
        if let Some(name) = self.registration.release_held(negotiating) {
            self.complete_registration(name);
        }
    }

    /// Whether capability negotiation has started and not yet ended
    fn negotiating(&self) -> bool {
        self.caps.caps_known() && !self.caps.ended()
    }

    fn complete_registration(&mut self, nickname: String) {
        tracing::info!(%nickname, "Registered");

        self.nickname = Some(nickname.clone());
        self.keepalive = Some(Keepalive::new(self.settings.timing.ping_timeout(), self.now));
        self.push_event(Event::Registered { nickname });

        for channel in self.identity.channels.clone() {
            self.enqueue(&Command::Join(channel));
        }
        for line in std::mem::take(&mut self.identity.replay) {
            self.queue.push(QueuedLine { line, replay: true });
        }
    }
}

#[cfg(test)]
mod tests;
