use crate::id::NetworkId;

use std::collections::{BTreeMap, BTreeSet};

/// The pieces of channel state requested after joining
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SyncItem {
    Mode,
    Who,
    Names,
}

impl SyncItem {
    pub const ALL: [SyncItem; 3] = [SyncItem::Mode, SyncItem::Who, SyncItem::Names];
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub name: String,
    pub topic: Option<String>,
    /// Mode string from the last `324` reply
    pub mode: String,
    /// Members holding each prefix, keyed by prefix character
    pub flags: BTreeMap<char, BTreeSet<String>>,
    pub sync: BTreeSet<SyncItem>,
    /// Set only for channels this session has joined itself
    pub available: bool,
    pub(crate) sync_announced: bool,
    pub network: NetworkId,
}

impl Channel {
    pub(crate) fn new(network: NetworkId, name: &str) -> Self {
        Self {
            name: name.to_string(),
            topic: None,
            mode: String::new(),
            flags: BTreeMap::new(),
            sync: BTreeSet::new(),
            available: false,
            sync_announced: false,
            network,
        }
    }

    pub fn is_synced(&self) -> bool {
        SyncItem::ALL.iter().all(|item| self.sync.contains(item))
    }

    /// Whether `nick` holds the given prefix (e.g. `@`)
    pub fn has_flag(&self, prefix: char, nick: &str) -> bool {
        self.flags.get(&prefix).map_or(false, |set| set.contains(nick))
    }

    pub(crate) fn forget_flags_of(&mut self, nick: &str) {
        for set in self.flags.values_mut() {
            set.remove(nick);
        }
    }

    pub(crate) fn rename_flags(&mut self, old: &str, new: &str) {
        for set in self.flags.values_mut() {
            if set.remove(old) {
                set.insert(new.to_string());
            }
        }
    }
}
