use super::*;

impl ConnectionContext {
    /// `ACCEPTED <name>`
    pub(super) fn handle_accepted(&mut self, msg: &LobbyMessage) -> HandleResult {
        let name = arg(msg, 0)?;
        let negotiating = self.negotiating();

        match self.registration.on_accepted(name, negotiating) {
            Some(name) => self.complete_registration(name),
            None => tracing::debug!(name, "Login accepted; waiting for capability negotiation"),
        }
        Ok(())
    }

    /// `DENIED <reason>`
    pub(super) fn handle_denied(&mut self, msg: &LobbyMessage) -> HandleResult {
        let reason = text_from(msg, 0);
        tracing::warn!(%reason, "Login denied");

        self.registration.deny(&reason);
        self.push_event(Event::Denied { reason });
        Ok(())
    }

    pub(super) fn handle_account_registered(&mut self) -> HandleResult {
        tracing::info!("Account registration accepted");
        self.push_event(Event::AccountRegistered);
        Ok(())
    }

    pub(super) fn handle_account_denied(&mut self, msg: &LobbyMessage) -> HandleResult {
        let reason = text_from(msg, 0);
        tracing::warn!(%reason, "Account registration denied");
        self.push_event(Event::AccountRegistrationDenied { reason });
        Ok(())
    }
}
