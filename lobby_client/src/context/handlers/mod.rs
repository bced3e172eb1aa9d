//! Per-verb handling of inbound messages

use super::*;
use crate::errors::HandleResult;
use crate::numeric;

mod cap;
mod messaging;
mod registration;
mod sasl;
mod tracking;

/// Fetch a required parameter or fail with `MissingParameter`
fn arg<'a>(msg: &'a LobbyMessage, index: usize) -> Result<&'a str, ProtocolError> {
    msg.param(index)
        .ok_or_else(|| ProtocolError::missing(&msg.verb, index))
}

/// Join the parameters from `index` onwards back into one piece of text
fn text_from(msg: &LobbyMessage, index: usize) -> String {
    msg.params.get(index..).map(|p| p.join(" ")).unwrap_or_default()
}

impl ConnectionContext {
    pub(super) fn dispatch(&mut self, msg: &LobbyMessage) -> HandleResult {
        match msg.verb.as_str() {
            "PING" => self.handle_ping(msg),
            "PONG" => self.handle_pong(),
            "CAP" => self.handle_cap(msg),
            "AUTHENTICATE" => self.handle_authenticate(msg),
            numeric::LOGGED_IN | numeric::SASL_SUCCESS => self.handle_sasl_success(),
            v if numeric::SASL_FAILURES.contains(&v) => self.handle_sasl_failure(msg),

            "ACCEPTED" => self.handle_accepted(msg),
            "DENIED" => self.handle_denied(msg),
            "REGISTRATIONACCEPTED" => self.handle_account_registered(),
            "REGISTRATIONDENIED" => self.handle_account_denied(msg),

            "SAID" | "SAIDEX" => self.handle_said(msg),
            "SAIDPRIVATE" | "SAIDPRIVATEEX" => self.handle_said_private(msg),
            "NOTICE" => self.handle_notice(msg),
            numeric::ISUPPORT => self.handle_isupport(msg),
            numeric::NICKNAME_IN_USE => self.handle_nick_in_use(msg),

            "JOIN" => self.handle_join(msg),
            "JOINED" => self.handle_joined(msg),
            "LEFT" => self.handle_left(msg),
            "PART" => self.handle_part(msg),
            "QUIT" => self.handle_quit(msg),
            "KICK" => self.handle_kick(msg),
            "NICK" => self.handle_nick(msg),
            "ACCOUNT" => self.handle_account(msg),
            "MODE" => self.handle_mode(msg),
            "TOPIC" => self.handle_topic(msg),
            numeric::TOPIC_IS => self.handle_topic_is(msg),
            numeric::WHO_REPLY => self.handle_who_reply(msg),
            numeric::WHOX_REPLY => self.handle_whox_reply(msg),
            numeric::END_OF_WHO => self.handle_end_of_who(msg),
            numeric::NAMES_REPLY => self.handle_names_reply(msg),
            numeric::END_OF_NAMES => self.handle_end_of_names(msg),
            numeric::CHANNEL_MODE_IS => self.handle_channel_mode(msg),

            _ => Ok(()),
        }
    }
}
