//! Capability negotiation state for one connection

use std::collections::BTreeSet;

/// Outcome of processing one `CAP LS` line
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ListOutcome {
    /// Whether this line completed the capability list
    pub complete: bool,
    /// Capabilities that were being waited on by a sub-protocol but which the
    /// completed list does not include
    pub unavailable: Vec<String>,
}

/// Tracks which optional protocol extensions the server offers, which the
/// application wants, and which are still held open by a sub-protocol.
///
/// Negotiation only starts once the capability list is known and the
/// handshake is [ready](Self::set_ready). `CAP END` may be sent once, after
/// every outstanding request is answered and no sub-protocol holds a
/// capability open.
#[derive(Debug, Default)]
pub struct CapabilityNegotiation {
    available: BTreeSet<String>,
    requested: BTreeSet<String>,
    pending: BTreeSet<String>,
    active: BTreeSet<String>,
    /// Requested on the wire, not yet acknowledged or rejected
    awaiting_reply: BTreeSet<String>,
    caps_known: bool,
    ready: bool,
    ended: bool,
}

impl CapabilityNegotiation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask for a capability, with no sub-protocol attached to it
    pub fn request(&mut self, cap: &str) {
        self.requested.insert(cap.to_string());
    }

    /// Ask for a capability whose owning sub-protocol must call
    /// [`done`](Self::done) before negotiation can end
    pub fn wait_for(&mut self, cap: &str) {
        self.requested.insert(cap.to_string());
        self.pending.insert(cap.to_string());
    }

    /// Signal that the sub-protocol owning `cap` has finished. Returns whether
    /// the capability was pending.
    pub fn done(&mut self, cap: &str) -> bool {
        self.pending.remove(cap)
    }

    /// Stop requesting `cap` and stop waiting on its sub-protocol
    pub fn abandon(&mut self, cap: &str) {
        self.pending.remove(cap);
        self.requested.remove(cap);
    }

    /// Mark the rest of the handshake as far enough along that requests may be
    /// sent
    pub fn set_ready(&mut self) {
        self.ready = true;
    }

    /// Process the parameters of a `CAP <nick> LS ...` line
    pub fn on_list(&mut self, params: &[String]) -> ListOutcome {
        // [nick, "LS", "*", caps] for a continuation, [nick, "LS", caps] for the
        // final line
        let (continues, list) = match params.get(2).map(String::as_str) {
            Some("*") if params.len() > 3 => (true, params.get(3)),
            _ => (false, params.get(2)),
        };

        if let Some(list) = list {
            for token in list.split_whitespace() {
                let name = token.split_once('=').map_or(token, |(n, _)| n);
                self.available.insert(name.to_string());
            }
        }

        if continues {
            return ListOutcome::default();
        }

        self.caps_known = true;

        let unavailable: Vec<String> = self
            .pending
            .iter()
            .filter(|cap| !self.available.contains(*cap))
            .cloned()
            .collect();
        for cap in &unavailable {
            self.pending.remove(cap);
        }

        ListOutcome {
            complete: true,
            unavailable,
        }
    }

    /// The set of capabilities to request now, if negotiation is ready and
    /// there is anything new to ask for
    pub fn try_request(&mut self) -> Option<Vec<String>> {
        if !self.caps_known || !self.ready {
            return None;
        }

        let wanted: Vec<String> = self
            .available
            .intersection(&self.requested)
            .filter(|cap| !self.awaiting_reply.contains(*cap) && !self.active.contains(*cap))
            .cloned()
            .collect();

        if wanted.is_empty() {
            return None;
        }

        self.awaiting_reply.extend(wanted.iter().cloned());
        Some(wanted)
    }

    /// Process a `CAP ACK`; returns the acknowledged capability names
    pub fn on_ack(&mut self, list: &str) -> Vec<String> {
        let mut acked = Vec::new();

        for token in list.split_whitespace() {
            if let Some(name) = token.strip_prefix('-') {
                self.active.remove(name);
                self.awaiting_reply.remove(name);
                continue;
            }
            self.awaiting_reply.remove(token);
            self.active.insert(token.to_string());
            acked.push(token.to_string());
        }

        acked
    }

    /// Process a `CAP NAK`; returns the capabilities that were being waited on
    /// by a sub-protocol and can now never complete
    pub fn on_nak(&mut self, list: &str) -> Vec<String> {
        let mut abandoned = Vec::new();

        // Rejected capabilities are not asked for again on this connection
        for token in list.split_whitespace() {
            self.awaiting_reply.remove(token);
            self.requested.remove(token);
            if self.pending.remove(token) {
                abandoned.push(token.to_string());
            }
        }

        abandoned
    }

    /// Returns `true` exactly once, when `CAP END` should be sent
    pub fn try_end(&mut self) -> bool {
        if self.caps_known
            && self.ready
            && !self.ended
            && self.pending.is_empty()
            && self.awaiting_reply.is_empty()
        {
            self.ended = true;
            true
        } else {
            false
        }
    }

    pub fn caps_known(&self) -> bool {
        self.caps_known
    }

    pub fn ended(&self) -> bool {
        self.ended
    }

    pub fn is_active(&self, cap: &str) -> bool {
        self.active.contains(cap)
    }

    pub fn is_pending(&self, cap: &str) -> bool {
        self.pending.contains(cap)
    }

    pub fn is_requested(&self, cap: &str) -> bool {
        self.requested.contains(cap)
    }

    pub fn available(&self) -> impl Iterator<Item = &str> {
        self.available.iter().map(String::as_str)
    }

    pub fn active(&self) -> impl Iterator<Item = &str> {
        self.active.iter().map(String::as_str)
    }
}
