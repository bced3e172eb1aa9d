//! Session registration handshake

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationState {
    /// Transport open; capability discovery announced
    Connected,
    /// The server's capability list has been received
    CapabilitiesKnown,
    /// An authentication exchange is under way
    Authenticating,
    Registered,
    /// Login or authentication was rejected. Terminal for this session.
    Denied(String),
}

/// Drives one session from transport connect to `Registered` or `Denied`.
///
/// A login acceptance that arrives while capability negotiation is still
/// open is held, and takes effect once negotiation ends.
#[derive(Debug)]
pub struct Registration {
    state: RegistrationState,
    login_window_open: bool,
    login_sent: bool,
    held_acceptance: Option<String>,
}

impl Default for Registration {
    fn default() -> Self {
        Self::new()
    }
}

impl Registration {
    pub fn new() -> Self {
        Self {
            state: RegistrationState::Connected,
            login_window_open: false,
            login_sent: false,
            held_acceptance: None,
        }
    }

    pub fn state(&self) -> &RegistrationState {
        &self.state
    }

    pub fn is_registered(&self) -> bool {
        self.state == RegistrationState::Registered
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self.state,
            RegistrationState::Registered | RegistrationState::Denied(_)
        )
    }

    pub fn login_sent(&self) -> bool {
        self.login_sent
    }

    pub fn login_window_open(&self) -> bool {
        self.login_window_open
    }

    pub fn capabilities_known(&mut self) {
        if self.state == RegistrationState::Connected {
            self.state = RegistrationState::CapabilitiesKnown;
        }
    }

    pub fn begin_authentication(&mut self) {
        if !self.is_terminal() {
            self.state = RegistrationState::Authenticating;
        }
    }

    pub fn end_authentication(&mut self) {
        if self.state == RegistrationState::Authenticating {
            self.state = RegistrationState::CapabilitiesKnown;
        }
    }

    /// The login delay has passed
    pub fn open_login_window(&mut self) {
        self.login_window_open = true;
    }

    /// Whether `LOGIN` should be sent now. Returns `true` at most once per
    /// session.
    pub fn take_login_turn(&mut self, have_credentials: bool) -> bool {
        if !have_credentials || !self.login_window_open || self.login_sent || self.is_terminal() {
            return false;
        }
        self.login_sent = true;
        true
    }

    /// Process `ACCEPTED <name>`. Returns the accepted name if registration is
    /// now complete.
    pub fn on_accepted(&mut self, name: &str, negotiating: bool) -> Option<String> {
        if self.is_terminal() {
            return None;
        }
        if negotiating {
            self.held_acceptance = Some(name.to_string());
            return None;
        }
        self.state = RegistrationState::Registered;
        Some(name.to_string())
    }

    /// Complete a held acceptance if negotiation has now ended
    pub fn release_held(&mut self, negotiating: bool) -> Option<String> {
        if negotiating || self.is_terminal() {
            return None;
        }
        let name = self.held_acceptance.take()?;
        self.state = RegistrationState::Registered;
        Some(name)
    }

    pub fn deny(&mut self, reason: &str) {
        self.held_acceptance = None;
        self.state = RegistrationState::Denied(reason.to_string());
    }
}
