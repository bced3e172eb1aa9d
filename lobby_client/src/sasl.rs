//! SASL PLAIN authentication

use crate::config::Credentials;
use base64::prelude::*;

/// Name of the capability that gates authentication
pub const SASL_CAPABILITY: &str = "sasl";

/// Maximum length of one `AUTHENTICATE` argument
pub const CHUNK_LEN: usize = 400;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// No credentials configured
    Idle,
    /// Waiting for the server to acknowledge the capability
    Requested,
    /// `AUTHENTICATE PLAIN` sent, waiting for the server's prompt
    MechanismSent,
    /// Credentials sent, waiting for the result
    PayloadSent,
    Complete,
    Failed,
}

/// Client side of a single PLAIN exchange
#[derive(Debug)]
pub struct Authenticator {
    credentials: Option<Credentials>,
    state: AuthState,
}

impl Authenticator {
    pub fn new(credentials: Option<Credentials>) -> Self {
        let state = if credentials.is_some() {
            AuthState::Requested
        } else {
            AuthState::Idle
        };
        Self { credentials, state }
    }

    /// Set credentials and start waiting for the capability
    pub fn configure(&mut self, credentials: Credentials) {
        self.credentials = Some(credentials);
        self.state = AuthState::Requested;
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(
            self.state,
            AuthState::Requested | AuthState::MechanismSent | AuthState::PayloadSent
        )
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// The capability was acknowledged; returns the mechanism to announce
    pub fn on_capability_ack(&mut self) -> Option<&'static str> {
        if self.state != AuthState::Requested {
            return None;
        }
        self.state = AuthState::MechanismSent;
        Some("PLAIN")
    }

    /// The server sent `AUTHENTICATE <data>`. Returns the arguments of the
    /// `AUTHENTICATE` lines to send in reply.
    pub fn on_challenge(&mut self, data: &str) -> Option<Vec<String>> {
        if self.state != AuthState::MechanismSent || data != "+" {
            return None;
        }
        let credentials = self.credentials.as_ref()?;
        self.state = AuthState::PayloadSent;
        Some(plain_payload(&credentials.username, &credentials.password))
    }

    /// A success numeric arrived. Returns `true` only the first time the
    /// exchange completes.
    pub fn on_success(&mut self) -> bool {
        if self.is_in_progress() {
            self.state = AuthState::Complete;
            true
        } else {
            false
        }
    }

    /// A failure numeric arrived. Returns `true` if an exchange was in
    /// progress and has now failed.
    pub fn on_failure(&mut self) -> bool {
        if self.is_in_progress() {
            self.state = AuthState::Failed;
            true
        } else {
            false
        }
    }
}

/// Encode `username\0username\0password` and split it into `AUTHENTICATE`
/// sized chunks. A payload that is an exact multiple of the chunk size is
/// followed by a lone `+`.
pub fn plain_payload(username: &str, password: &str) -> Vec<String> {
    let encoded = BASE64_STANDARD.encode(format!("{0}\0{0}\0{1}", username, password));

    let mut chunks: Vec<String> = encoded
        .as_bytes()
        .chunks(CHUNK_LEN)
        .map(|c| String::from_utf8_lossy(c).into_owned())
        .collect();

    if encoded.len() % CHUNK_LEN == 0 {
        chunks.push("+".to_string());
    }

    chunks
}
