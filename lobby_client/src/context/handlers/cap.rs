use super::*;

impl ConnectionContext {
    /// `CAP <nick> <subcommand> ...`
    pub(super) fn handle_cap(&mut self, msg: &LobbyMessage) -> HandleResult {
        let subcommand = arg(msg, 1)?.to_ascii_uppercase();

        match subcommand.as_str() {
            "LS" => {
                let outcome = self.caps.on_list(&msg.params);
                if !outcome.complete {
                    return Ok(());
                }

                tracing::debug!(
                    available = ?self.caps.available().collect::<Vec<_>>(),
                    "Capability list received"
                );
                self.registration.capabilities_known();

                let sasl_missing = outcome.unavailable.iter().any(|c| c == SASL_CAPABILITY);
                let result = if sasl_missing {
                    self.fail_authentication("server does not offer sasl")
                } else {
                    Ok(())
                };

                self.advance_negotiation();
                result
            }
            "ACK" => {
                let acked = self.caps.on_ack(msg.param(2).unwrap_or_default());
                let sasl_acked = acked.iter().any(|c| c == SASL_CAPABILITY);
                self.push_event(Event::CapabilityAcknowledged { caps: acked });

                if sasl_acked {
                    if let Some(mechanism) = self.sasl.on_capability_ack() {
                        self.registration.begin_authentication();
                        self.send_now(&Command::Authenticate(mechanism.to_string()));
                    }
                }

                self.advance_negotiation();
                Ok(())
            }
            "NAK" => {
                let list = msg.param(2).unwrap_or_default();
                let abandoned = self.caps.on_nak(list);
                self.push_event(Event::CapabilityRejected {
                    caps: list.split_whitespace().map(str::to_string).collect(),
                });

                let result = if abandoned.iter().any(|c| c == SASL_CAPABILITY) {
                    self.fail_authentication("sasl capability rejected")
                } else {
                    Ok(())
                };

                self.advance_negotiation();
                result
            }
            _ => Ok(()),
        }
    }
}
