//! Users, channels and channel membership as seen by one connection.
//!
//! The [`Registry`] is rebuilt from scratch for every transport session. It
//! is updated only by the owning connection's message handlers, before the
//! corresponding event is published.

use crate::id::NetworkId;
use crate::message::Hostmask;

use std::collections::{HashMap, HashSet};

mod user;
pub use user::*;

mod channel;
pub use channel::*;

#[derive(Debug)]
pub struct Registry {
    network: NetworkId,
    users: HashMap<String, User>,
    channels: HashMap<String, Channel>,
    /// (nickname, channel name)
    memberships: HashSet<(String, String)>,
}

impl Registry {
    pub fn new(network: NetworkId) -> Self {
        Self {
            network,
            users: HashMap::new(),
            channels: HashMap::new(),
            memberships: HashSet::new(),
        }
    }

    pub fn user(&self, nick: &str) -> Option<&User> {
        self.users.get(nick)
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(name)
    }

    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.users.values()
    }

    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub fn is_member(&self, nick: &str, channel: &str) -> bool {
        self.memberships
            .contains(&(nick.to_string(), channel.to_string()))
    }

    /// Channels in which `nick` is a member, sorted by name
    pub fn channels_of(&self, nick: &str) -> Vec<&str> {
        let mut ret: Vec<&str> = self
            .memberships
            .iter()
            .filter(|(n, _)| n == nick)
            .map(|(_, c)| c.as_str())
            .collect();
        ret.sort_unstable();
        ret
    }

    /// Members of `channel`, sorted by nickname
    pub fn members_of(&self, channel: &str) -> Vec<&str> {
        let mut ret: Vec<&str> = self
            .memberships
            .iter()
            .filter(|(_, c)| c == channel)
            .map(|(n, _)| n.as_str())
            .collect();
        ret.sort_unstable();
        ret
    }

    pub fn membership_count(&self) -> usize {
        self.memberships.len()
    }

    /// Look up the user named by `mask`, creating them if needed and filling in
    /// ident and host if the mask carries them. Servers are not tracked.
    pub fn observe(&mut self, mask: &Hostmask) -> Option<&mut User> {
        if !self.users.contains_key(&mask.nick) && mask.is_server() {
            return None;
        }

        let network = self.network;
        let user = self
            .users
            .entry(mask.nick.clone())
            .or_insert_with(|| User::new(network, mask));
        user.update_from(mask);
        Some(user)
    }

    pub(crate) fn channel_mut(&mut self, name: &str) -> &mut Channel {
        let network = self.network;
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| Channel::new(network, name))
    }

    pub fn add_member(&mut self, mask: &Hostmask, channel: &str) {
        self.observe(mask);
        self.channel_mut(channel);
        self.memberships
            .insert((mask.nick.clone(), channel.to_string()));
    }

    /// Remove `nick` from `channel`. Returns whether they were a member.
    pub fn remove_member(&mut self, nick: &str, channel: &str) -> bool {
        if let Some(chan) = self.channels.get_mut(channel) {
            chan.forget_flags_of(nick);
        }
        self.memberships
            .remove(&(nick.to_string(), channel.to_string()))
    }

    /// Our own session joined `channel`: mark it available and restart its
    /// synchronisation
    pub fn begin_sync(&mut self, channel: &str) {
        let chan = self.channel_mut(channel);
        chan.available = true;
        chan.sync.clear();
        chan.sync_announced = false;
    }

    /// Record that one part of a channel's state has arrived. Returns `true`
    /// exactly once per join, when the channel has become fully synchronised.
    pub fn mark_synced(&mut self, channel: &str, item: SyncItem) -> bool {
        let chan = self.channel_mut(channel);
        chan.sync.insert(item);

        if chan.available && !chan.sync_announced && chan.is_synced() {
            chan.sync_announced = true;
            true
        } else {
            false
        }
    }

    /// Our own session is no longer in `channel`
    pub fn leave_channel(&mut self, channel: &str) {
        if let Some(chan) = self.channels.get_mut(channel) {
            chan.available = false;
            chan.flags.clear();
            chan.sync.clear();
        }
        self.memberships.retain(|(_, c)| c != channel);
    }

    /// Apply a nickname change to the user, every membership pair and every
    /// prefix flag
    pub fn rename(&mut self, old: &str, new: &str) {
        if old == new {
            return;
        }

        let mut user = self
            .users
            .remove(old)
            .unwrap_or_else(|| User::new(self.network, &Hostmask::nick_only(old)));
        user.previous_nicks.push(old.to_string());
        user.nick = new.to_string();
        self.users.insert(new.to_string(), user);

        let moved: Vec<String> = self
            .memberships
            .iter()
            .filter(|(n, _)| n == old)
            .map(|(_, c)| c.clone())
            .collect();
        for channel in moved {
            self.memberships.remove(&(old.to_string(), channel.clone()));
            self.memberships.insert((new.to_string(), channel));
        }

        for chan in self.channels.values_mut() {
            chan.rename_flags(old, new);
        }
    }

    /// Remove a user and all of their memberships
    pub fn quit(&mut self, nick: &str) -> Option<User> {
        self.memberships.retain(|(n, _)| n != nick);
        for chan in self.channels.values_mut() {
            chan.forget_flags_of(nick);
        }
        self.users.remove(nick)
    }

    pub fn set_account(&mut self, nick: &str, account: Option<String>) {
        if let Some(user) = self.observe(&Hostmask::nick_only(nick)) {
            user.account = account;
        }
    }

    pub fn set_topic(&mut self, channel: &str, topic: &str) {
        self.channel_mut(channel).topic = Some(topic.to_string());
    }

    pub fn set_mode(&mut self, channel: &str, mode: &str) {
        self.channel_mut(channel).mode = mode.to_string();
    }

    /// Grant or remove a membership prefix such as `@`
    pub fn set_flag(&mut self, channel: &str, prefix: char, nick: &str, set: bool) {
        let flags = self.channel_mut(channel).flags.entry(prefix).or_default();
        if set {
            flags.insert(nick.to_string());
        } else {
            flags.remove(nick);
        }
    }

    /// Process the names list of one `353` reply. Each entry may carry several
    /// prefix characters; one flag is recorded per prefix.
    pub fn add_names(&mut self, channel: &str, names: &str, prefixes: &[char]) {
        for entry in names.split_whitespace() {
            let bare = entry.trim_start_matches(|c: char| prefixes.contains(&c));
            if bare.is_empty() {
                continue;
            }
            let held = &entry[..entry.len() - bare.len()];

            let mask = Hostmask::parse(bare);
            for prefix in held.chars() {
                self.set_flag(channel, prefix, &mask.nick, true);
            }
            self.add_member(&mask, channel);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn registry() -> Registry {
        Registry::new(NetworkId::next())
    }

    fn mask(s: &str) -> Hostmask {
        Hostmask::parse(s)
    }

    #[test]
    fn lazy_users() {
        let mut reg = registry();
        reg.observe(&mask("alice"));
        assert_eq!(
            reg.user("alice").unwrap().identity,
            UserIdentity::PendingHostmask
        );

        reg.observe(&mask("alice!a@host"));
        let alice = reg.user("alice").unwrap();
        assert!(alice.is_known());
        assert_eq!(alice.hostmask().as_deref(), Some("alice!a@host"));

        assert!(reg.observe(&mask("lobby.example.com")).is_none());
        assert!(reg.user("lobby.example.com").is_none());
    }

    #[test]
    fn rename_rewrites_memberships() {
        let mut reg = registry();
        reg.add_member(&mask("old!u@h"), "a");
        reg.add_member(&mask("old!u@h"), "b");
        reg.add_member(&mask("other!u@h"), "a");
        reg.set_flag("a", '@', "old", true);

        reg.rename("old", "new");

        assert!(reg.user("old").is_none());
        let user = reg.user("new").unwrap();
        assert_eq!(user.previous_nicks, vec!["old".to_string()]);
        assert_eq!(reg.channels_of("new"), vec!["a", "b"]);
        assert!(reg.channels_of("old").is_empty());
        assert_eq!(reg.members_of("a"), vec!["new", "other"]);
        assert!(reg.channel("a").unwrap().has_flag('@', "new"));
        assert!(!reg.channel("a").unwrap().has_flag('@', "old"));
    }

    #[test]
    fn quit_removes_everything() {
        let mut reg = registry();
        reg.add_member(&mask("alice!u@h"), "a");
        reg.add_member(&mask("alice!u@h"), "b");
        reg.add_member(&mask("bob!u@h"), "a");

        assert!(reg.quit("alice").is_some());
        assert!(reg.user("alice").is_none());
        assert!(reg.channels_of("alice").is_empty());
        assert_eq!(reg.membership_count(), 1);
    }

    #[test]
    fn names_with_multiple_prefixes() {
        let mut reg = registry();
        reg.add_names("main", "@+alice +bob carol @", &['@', '+']);

        let chan = reg.channel("main").unwrap();
        assert!(chan.has_flag('@', "alice"));
        assert!(chan.has_flag('+', "alice"));
        assert!(chan.has_flag('+', "bob"));
        assert!(!chan.has_flag('@', "bob"));
        assert_eq!(reg.members_of("main"), vec!["alice", "bob", "carol"]);
        // Joining is not ours, so the channel is not available
        assert!(!chan.available);
    }

    #[test]
    fn sync_announced_once_per_join() {
        let mut reg = registry();
        reg.begin_sync("main");

        assert!(!reg.mark_synced("main", SyncItem::Names));
        assert!(!reg.mark_synced("main", SyncItem::Mode));
        assert!(reg.mark_synced("main", SyncItem::Who));
        assert!(!reg.mark_synced("main", SyncItem::Who));

        // A new join cycle syncs again
        reg.leave_channel("main");
        reg.begin_sync("main");
        assert!(!reg.mark_synced("main", SyncItem::Who));
        assert!(!reg.mark_synced("main", SyncItem::Mode));
        assert!(reg.mark_synced("main", SyncItem::Names));
    }

    #[test]
    fn observed_channels_never_sync() {
        let mut reg = registry();
        for item in SyncItem::ALL {
            assert!(!reg.mark_synced("elsewhere", item));
        }
        assert!(!reg.channel("elsewhere").unwrap().available);
    }

    #[test]
    fn leaving_drops_memberships() {
        let mut reg = registry();
        reg.begin_sync("main");
        reg.add_member(&mask("me"), "main");
        reg.add_member(&mask("alice!u@h"), "main");
        reg.add_member(&mask("alice!u@h"), "other");

        reg.leave_channel("main");
        assert!(!reg.channel("main").unwrap().available);
        assert!(reg.members_of("main").is_empty());
        assert_eq!(reg.channels_of("alice"), vec!["other"]);
    }
}
