//! Dead-connection detection and lag measurement

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepaliveAction {
    /// Send a `PING`
    Probe,
    /// Nothing has been heard for too long; drop the connection
    Dead { silent_for: Duration },
}

/// Ping/pong bookkeeping for one transport session
#[derive(Debug, Clone)]
pub struct Keepalive {
    timeout: Duration,
    last_ping: Option<Instant>,
    last_pong: Instant,
    lag: Option<Duration>,
}

impl Keepalive {
    /// Start tracking at `now`, which counts as the most recent sign of life
    pub fn new(timeout: Duration, now: Instant) -> Self {
        Self {
            timeout,
            last_ping: None,
            last_pong: now,
            lag: None,
        }
    }

    /// Called on each keepalive interval
    pub fn tick(&mut self, now: Instant) -> KeepaliveAction {
        let silent_for = now.saturating_duration_since(self.last_pong);
        if silent_for > self.timeout {
            return KeepaliveAction::Dead { silent_for };
        }

        self.last_ping = Some(now);
        KeepaliveAction::Probe
    }

    /// Record a `PONG`, returning the measured lag
    pub fn pong(&mut self, now: Instant) -> Duration {
        self.last_pong = now;
        let lag = self
            .last_ping
            .map(|ping| now.saturating_duration_since(ping))
            .unwrap_or_default();
        self.lag = Some(lag);
        lag
    }

    pub fn lag(&self) -> Option<Duration> {
        self.lag
    }

    pub fn last_ping(&self) -> Option<Instant> {
        self.last_ping
    }

    pub fn last_pong(&self) -> Instant {
        self.last_pong
    }
}
