use crate::id::NetworkId;
use crate::message::Hostmask;

/// How much is known about a user's `ident@host`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserIdentity {
    Known { ident: String, host: String },
    /// Only the nickname has been seen so far
    PendingHostmask,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub nick: String,
    pub identity: UserIdentity,
    /// Services account, if the server has told us
    pub account: Option<String>,
    /// Earlier nicknames, oldest first
    pub previous_nicks: Vec<String>,
    pub network: NetworkId,
}

impl User {
    pub(crate) fn new(network: NetworkId, mask: &Hostmask) -> Self {
        let mut user = Self {
            nick: mask.nick.clone(),
            identity: UserIdentity::PendingHostmask,
            account: None,
            previous_nicks: Vec::new(),
            network,
        };
        user.update_from(mask);
        user
    }

    /// Fill in ident and host if `mask` carries them
    pub(crate) fn update_from(&mut self, mask: &Hostmask) {
        if let (Some(ident), Some(host)) = (&mask.ident, &mask.host) {
            self.identity = UserIdentity::Known {
                ident: ident.clone(),
                host: host.clone(),
            };
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self.identity, UserIdentity::Known { .. })
    }

    /// Full `nick!ident@host`, if known
    pub fn hostmask(&self) -> Option<String> {
        match &self.identity {
            UserIdentity::Known { ident, host } => Some(format!("{}!{}@{}", self.nick, ident, host)),
            UserIdentity::PendingHostmask => None,
        }
    }
}
