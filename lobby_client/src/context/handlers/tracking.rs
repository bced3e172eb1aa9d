use super::*;
use crate::message::Hostmask;
use crate::tracking::SyncItem;

/// `*` and `0` both mean "not logged in"
fn account_value(account: &str) -> Option<String> {
    match account {
        "*" | "0" | "" => None,
        a => Some(a.to_string()),
    }
}

impl ConnectionContext {
    /// The nick a message came from
    fn source_nick(&self, msg: &LobbyMessage) -> Result<String, ProtocolError> {
        msg.source_mask()
            .map(|m| m.nick)
            .ok_or_else(|| ProtocolError::missing(&msg.verb, 0))
    }

    /// Request the state of a channel we have just joined
    fn start_channel_sync(&mut self, channel: &str) {
        tracing::debug!(channel, "Synchronising channel");
        self.registry.begin_sync(channel);
        let whox = self.features.whox();
        self.enqueue(&Command::Who {
            channel: channel.to_string(),
            whox,
        });
        self.enqueue(&Command::Mode(channel.to_string()));
    }

    fn record_sync(&mut self, channel: &str, item: SyncItem) {
        if self.registry.mark_synced(channel, item) {
            tracing::debug!(channel, "Channel synchronised");
            self.push_event(Event::SyncComplete {
                channel: channel.to_string(),
            });
        }
    }

    fn user_left(&mut self, channel: &str, nick: &str) -> bool {
        let is_self = self.is_self(nick);
        if is_self {
            self.registry.leave_channel(channel);
        } else {
            self.registry.remove_member(nick, channel);
        }
        is_self
    }

    /// `JOIN <channel>` confirms our own join. With a source, it reports
    /// someone else's (or our own, echoed); with extended-join the account
    /// follows the channel name.
    pub(super) fn handle_join(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 0)?.to_string();

        let mask = match msg.source_mask() {
            Some(mask) => mask,
            None => Hostmask::nick_only(self.nickname.as_deref().unwrap_or_default()),
        };
        let is_self = msg.source.is_none() || self.is_self(&mask.nick);

        if is_self {
            self.start_channel_sync(&channel);
        }

        if !mask.nick.is_empty() {
            self.registry.add_member(&mask, &channel);

            if self.caps.is_active("extended-join") {
                if let Some(account) = msg.param(1) {
                    self.registry.set_account(&mask.nick, account_value(account));
                }
            }
        }

        self.push_event(Event::Joined {
            channel,
            user: mask.nick,
            is_self,
        });
        Ok(())
    }

    /// `JOINED <channel> <user>`
    pub(super) fn handle_joined(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 0)?.to_string();
        let mask = Hostmask::parse(arg(msg, 1)?);
        let is_self = self.is_self(&mask.nick);

        self.registry.add_member(&mask, &channel);
        self.push_event(Event::Joined {
            channel,
            user: mask.nick,
            is_self,
        });
        Ok(())
    }

    /// `LEFT <channel> <user> [reason]`
    pub(super) fn handle_left(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 0)?.to_string();
        let user = Hostmask::parse(arg(msg, 1)?).nick;
        let reason = msg.param(2).map(|_| text_from(msg, 2));

        let is_self = self.user_left(&channel, &user);
        self.push_event(Event::Parted {
            channel,
            user,
            reason,
            is_self,
        });
        Ok(())
    }

    /// `:<user> PART <channel> [reason]`
    pub(super) fn handle_part(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 0)?.to_string();
        let user = self.source_nick(msg)?;
        let reason = msg.param(1).map(str::to_string);

        let is_self = self.user_left(&channel, &user);
        self.push_event(Event::Parted {
            channel,
            user,
            reason,
            is_self,
        });
        Ok(())
    }

    pub(super) fn handle_quit(&mut self, msg: &LobbyMessage) -> HandleResult {
        let user = self.source_nick(msg)?;
        let reason = msg.param(0).map(str::to_string);

        self.registry.quit(&user);
        self.push_event(Event::Quit { user, reason });
        Ok(())
    }

    /// `:<kicker> KICK <channel> <kickee> [reason]`
    pub(super) fn handle_kick(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 0)?.to_string();
        let kickee = arg(msg, 1)?.to_string();
        let kicker = msg.source_mask().map(|m| m.nick);
        let reason = msg.param(2).map(str::to_string);

        self.user_left(&channel, &kickee);
        self.push_event(Event::Kicked {
            channel,
            kicker,
            kickee,
            reason,
        });
        Ok(())
    }

    /// `:<old> NICK <new>`
    pub(super) fn handle_nick(&mut self, msg: &LobbyMessage) -> HandleResult {
        let old = self.source_nick(msg)?;
        let new = arg(msg, 0)?.to_string();

        let is_self = self.is_self(&old);
        if is_self {
            self.old_nickname = self.nickname.replace(new.clone());
        }

        self.registry.rename(&old, &new);
        self.push_event(Event::NickChanged { old, new, is_self });
        Ok(())
    }

    /// `:<user> ACCOUNT <account>`
    pub(super) fn handle_account(&mut self, msg: &LobbyMessage) -> HandleResult {
        let user = self.source_nick(msg)?;
        let account = account_value(arg(msg, 0)?);

        self.registry.set_account(&user, account.clone());
        self.push_event(Event::AccountChanged { user, account });
        Ok(())
    }

    /// `:<setter> MODE <target> <modes> [args...]`
    pub(super) fn handle_mode(&mut self, msg: &LobbyMessage) -> HandleResult {
        let target = arg(msg, 0)?.to_string();
        let modes = arg(msg, 1)?;
        let setter = msg.source_mask().map(|m| m.nick);

        let on_channel = !self.is_self(&target);
        let set_args = self.features.argument_modes(true);
        let unset_args = self.features.argument_modes(false);

        let mut args = msg.params.iter().skip(2);
        let mut adding = true;

        for mode in modes.chars() {
            match mode {
                '+' => adding = true,
                '-' => adding = false,
                _ => {
                    let takes_arg = if adding {
                        set_args.contains(mode)
                    } else {
                        unset_args.contains(mode)
                    };
                    let arg = if takes_arg { args.next().cloned() } else { None };

                    if on_channel {
                        if let (Some(prefix), Some(nick)) =
                            (self.features.prefix_for_mode(mode), arg.as_deref())
                        {
                            self.registry.set_flag(&target, prefix, nick, adding);
                        }
                    }

                    let event = if adding {
                        Event::ModeSet {
                            target: target.clone(),
                            mode,
                            arg,
                            setter: setter.clone(),
                        }
                    } else {
                        Event::ModeUnset {
                            target: target.clone(),
                            mode,
                            arg,
                            setter: setter.clone(),
                        }
                    };
                    self.push_event(event);
                }
            }
        }
        Ok(())
    }

    /// `:<user> TOPIC <channel> :<topic>`
    pub(super) fn handle_topic(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 0)?.to_string();
        let topic = msg.param(1).unwrap_or_default().to_string();
        let setter = msg.source_mask().map(|m| m.nick);

        self.registry.set_topic(&channel, &topic);
        self.push_event(Event::TopicChanged {
            channel,
            topic,
            setter,
        });
        Ok(())
    }

    /// `332 <me> <channel> :<topic>`
    pub(super) fn handle_topic_is(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 1)?;
        let topic = arg(msg, 2)?;
        self.registry.set_topic(channel, topic);
        Ok(())
    }

    /// `352 <me> <channel> <ident> <host> <server> <nick> <flags> :<hops> <realname>`
    pub(super) fn handle_who_reply(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 1)?;
        let mask = Hostmask {
            nick: arg(msg, 5)?.to_string(),
            ident: Some(arg(msg, 2)?.to_string()),
            host: Some(arg(msg, 3)?.to_string()),
        };

        self.registry.add_member(&mask, channel);
        Ok(())
    }

    /// `354 <me> <channel> <ident> <host> <nick> <account>`, in answer to
    /// `WHO <channel> %cnuha`
    pub(super) fn handle_whox_reply(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 1)?;
        let mask = Hostmask {
            nick: arg(msg, 4)?.to_string(),
            ident: Some(arg(msg, 2)?.to_string()),
            host: Some(arg(msg, 3)?.to_string()),
        };
        let account = account_value(arg(msg, 5)?);

        self.registry.add_member(&mask, channel);
        self.registry.set_account(&mask.nick, account);
        Ok(())
    }

    /// `315 <me> <channel> :End of /WHO list`
    pub(super) fn handle_end_of_who(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 1)?.to_string();
        self.record_sync(&channel, SyncItem::Who);
        Ok(())
    }

    /// `353 <me> <type> <channel> :<names>`
    pub(super) fn handle_names_reply(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 2)?;
        let names = arg(msg, 3)?;
        let prefixes: Vec<char> = self
            .features
            .prefix_map()
            .into_iter()
            .map(|(_, p)| p)
            .collect();

        self.registry.add_names(channel, names, &prefixes);
        Ok(())
    }

    /// `366 <me> <channel> :End of names list`
    pub(super) fn handle_end_of_names(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 1)?.to_string();
        self.record_sync(&channel, SyncItem::Names);
        Ok(())
    }

    /// `324 <me> <channel> <modes> [args...]`
    pub(super) fn handle_channel_mode(&mut self, msg: &LobbyMessage) -> HandleResult {
        let channel = arg(msg, 1)?.to_string();
        arg(msg, 2)?;
        let mode = text_from(msg, 2);

        self.registry.set_mode(&channel, &mode);
        self.record_sync(&channel, SyncItem::Mode);
        Ok(())
    }
}
