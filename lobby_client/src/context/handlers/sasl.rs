use super::*;

impl ConnectionContext {
    pub(super) fn handle_authenticate(&mut self, msg: &LobbyMessage) -> HandleResult {
        let data = arg(msg, 0)?;

        if let Some(chunks) = self.sasl.on_challenge(data) {
            tracing::debug!("Sending authentication payload");
            for chunk in chunks {
                self.send_now(&Command::Authenticate(chunk));
            }
        }
        Ok(())
    }

    pub(super) fn handle_sasl_success(&mut self) -> HandleResult {
        if self.sasl.on_success() {
            tracing::info!("Authentication complete");
            self.caps.done(SASL_CAPABILITY);
            self.registration.end_authentication();
            self.push_event(Event::AuthComplete);
            self.advance_negotiation();
        }
        Ok(())
    }

    pub(super) fn handle_sasl_failure(&mut self, msg: &LobbyMessage) -> HandleResult {
        if !self.sasl.on_failure() {
            return Ok(());
        }
        let reason = format!("numeric {}", msg.verb);
        self.fail_authentication(&reason)
    }

    /// Authentication cannot succeed on this session. Negotiation is left open
    /// so that `CAP END` is never sent.
    pub(super) fn fail_authentication(&mut self, reason: &str) -> HandleResult {
        self.sasl.on_failure();
        self.registration.deny(reason);
        self.push_event(Event::AuthFailed {
            reason: reason.to_string(),
        });
        self.push_event(Event::Denied {
            reason: reason.to_string(),
        });
        Err(ProtocolError::AuthenticationFailed(reason.to_string()))
    }
}
