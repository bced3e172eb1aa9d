use super::*;
use crate::utils::fallback_nickname;

impl ConnectionContext {
    pub(super) fn handle_ping(&mut self, msg: &LobbyMessage) -> HandleResult {
        self.send_now(&Command::Pong(msg.param(0).map(str::to_string)));
        Ok(())
    }

    pub(super) fn handle_pong(&mut self) -> HandleResult {
        let now = self.now;
        if let Some(keepalive) = &mut self.keepalive {
            let lag = keepalive.pong(now);
            tracing::trace!(?lag, "PONG");
            self.push_event(Event::Pong { lag });
        }
        Ok(())
    }

    /// `SAID <channel> <user> <text>` and `SAIDEX`; the user has already been
    /// moved into the message source
    pub(super) fn handle_said(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 0)?.to_string();
        let user = msg.source.clone().unwrap_or_default();
        let text = text_from(msg, 1);

        let event = if msg.verb == "SAID" {
            Event::Said {
                channel,
                user,
                text,
            }
        } else {
            Event::SaidEx {
                channel,
                user,
                text,
            }
        };
        self.push_event(event);
        Ok(())
    }

    pub(super) fn handle_said_private(&mut self, msg: &LobbyMessage) -> HandleResult {
        let user = msg.source.clone().unwrap_or_default();
        let text = text_from(msg, 0);

        let event = if msg.verb == "SAIDPRIVATE" {
            Event::SaidPrivate { user, text }
        } else {
            Event::SaidPrivateEx { user, text }
        };
        self.push_event(event);
        Ok(())
    }

    pub(super) fn handle_notice(&mut self, msg: &LobbyMessage) -> HandleResult {
        let target = arg(msg, 0)?.to_string();
        let user = msg.source_mask().map(|m| m.nick);
        let text = text_from(msg, 1);

        self.push_event(Event::Notice { target, user, text });
        Ok(())
    }

    pub(super) fn handle_isupport(&mut self, msg: &LobbyMessage) -> HandleResult {
        self.features.update(&msg.params);
        Ok(())
    }

    /// `433 <nick> <attempted> :Nickname is already in use`
    pub(super) fn handle_nick_in_use(&mut self, msg: &LobbyMessage) -> HandleResult {
        let attempted = msg
            .param(1)
            .map(str::to_string)
            .or_else(|| self.nickname.clone())
            .unwrap_or_default();
        let replacement = fallback_nickname();

        tracing::info!(%attempted, %replacement, "Nickname in use");

        self.old_nickname = self.nickname.take();
        self.nickname = Some(replacement.clone());
        self.send_now(&Command::Nick(replacement.clone()));
        self.push_event(Event::NickCollision {
            attempted,
            replacement,
        });
        Ok(())
    }
}
