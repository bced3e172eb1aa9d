//! Server feature advertisement (`005`)

use std::collections::HashMap;

const DEFAULT_PREFIX: &str = "(ov)@+";
const DEFAULT_ARGUMENT_MODES: &str = "beIqaohvlk";

/// A single advertised feature
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeatureValue {
    Flag,
    Value(String),
}

/// The features a server has advertised on this connection
#[derive(Debug, Clone, Default)]
pub struct ServerFeatures {
    features: HashMap<String, FeatureValue>,
}

impl ServerFeatures {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the tokens of one `005` reply. The first parameter (our nick) and
    /// the final human-readable text are not features.
    pub fn update(&mut self, params: &[String]) {
        if params.len() < 3 {
            return;
        }

        for token in &params[1..params.len() - 1] {
            // A leading '-' withdraws a previously advertised feature
            if let Some(name) = token.strip_prefix('-') {
                self.features.remove(name);
                continue;
            }

            match token.split_once('=') {
                Some((key, value)) => {
                    self.features
                        .insert(key.to_string(), FeatureValue::Value(value.to_string()));
                }
                None => {
                    self.features.insert(token.to_string(), FeatureValue::Flag);
                }
            }
        }
    }

    pub fn has(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features.get(name)
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        match self.features.get(name) {
            Some(FeatureValue::Value(v)) => Some(v),
            _ => None,
        }
    }

    /// Whether extended `WHO` queries are available
    pub fn whox(&self) -> bool {
        self.has("WHOX")
    }

    /// Mapping from membership mode letter to its prefix character, e.g. `o => @`
    pub fn prefix_map(&self) -> Vec<(char, char)> {
        let prefix = self.value("PREFIX").unwrap_or(DEFAULT_PREFIX);
        parse_prefix(prefix).unwrap_or_else(|| parse_prefix(DEFAULT_PREFIX).unwrap_or_default())
    }

    /// The prefix character shown for a membership mode letter
    pub fn prefix_for_mode(&self, mode: char) -> Option<char> {
        self.prefix_map()
            .into_iter()
            .find(|(m, _)| *m == mode)
            .map(|(_, p)| p)
    }

    /// Mode letters that consume an argument when being set (`set == true`) or
    /// unset.
    pub fn argument_modes(&self, set: bool) -> String {
        let Some(chanmodes) = self.value("CHANMODES") else {
            return DEFAULT_ARGUMENT_MODES.to_string();
        };

        let groups: Vec<&str> = chanmodes.split(',').collect();
        let mut modes = String::new();

        // Type A (lists) and B (always an argument)
        for group in groups.iter().take(2) {
            modes.push_str(group);
        }
        // Type C only takes an argument when set
        if set {
            if let Some(group) = groups.get(2) {
                modes.push_str(group);
            }
        }
        modes.extend(self.prefix_map().into_iter().map(|(m, _)| m));

        modes
    }
}

fn parse_prefix(prefix: &str) -> Option<Vec<(char, char)>> {
    let (modes, prefixes) = prefix.strip_prefix('(')?.split_once(')')?;
    if modes.chars().count() != prefixes.chars().count() {
        return None;
    }
    Some(modes.chars().zip(prefixes.chars()).collect())
}
