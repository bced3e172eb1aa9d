use crate::errors::{EncodeError, ParseError};
use crate::id::NetworkId;

use std::collections::HashMap;
use std::fmt;

/// A tokenised message received from the lobby server
///
/// Messages are immutable once constructed and always carry the id of the
/// connection that produced them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyMessage {
    /// The connection from which the message was received
    pub network: NetworkId,
    /// The command, upper-cased
    pub verb: String,
    /// The list of arguments
    pub params: Vec<String>,
    /// The originating entity, if the line named one
    pub source: Option<String>,
    /// Message tags; a tag given without a value maps to an empty string
    pub tags: HashMap<String, String>,
}

impl LobbyMessage {
    /// Construct a message from its parts
    pub fn new(network: NetworkId, verb: &str, params: Vec<String>) -> Self {
        Self {
            network,
            verb: verb.to_ascii_uppercase(),
            params,
            source: None,
            tags: HashMap::new(),
        }
    }

    /// Create a `LobbyMessage` from a received line
    pub fn parse(network: NetworkId, raw: &str) -> Result<Self, ParseError> {
        let mut params = Vec::new();
        let mut tags = HashMap::new();
        let mut source = None;

        let mut raw = raw.trim_end_matches(['\r', '\n']).trim_start();
        if raw.is_empty() {
            return Err(ParseError::Empty);
        }

        if let Some(tag_block) = raw.strip_prefix('@') {
            let Some(space_offset) = tag_block.find(' ') else {
                return Err(ParseError::TagsWithoutVerb);
            };

            for tag_def in tag_block[..space_offset].split(';') {
                if tag_def.is_empty() {
                    continue;
                }
                let (name, value) = match tag_def.split_once('=') {
                    Some((n, v)) => (n.to_string(), unescape_tag_value(v)),
                    None => (tag_def.to_string(), String::new()),
                };
                tags.insert(name, value);
            }

            raw = tag_block[space_offset..].trim_start();
            if raw.is_empty() {
                return Err(ParseError::TagsWithoutVerb);
            }
        }

        if let Some(prefixed) = raw.strip_prefix(':') {
            let Some(space_offset) = prefixed.find(' ') else {
                return Err(ParseError::SourceWithoutVerb);
            };
            let name = &prefixed[..space_offset];
            if !name.is_empty() {
                source = Some(name.to_string());
            }

            raw = prefixed[space_offset..].trim_start();
            if raw.is_empty() {
                return Err(ParseError::SourceWithoutVerb);
            }
        }

        let (verb, mut rest) = match raw.find(' ') {
            Some(offset) => (&raw[..offset], &raw[offset + 1..]),
            None => (raw, ""),
        };
        if verb.is_empty() || verb.starts_with(':') {
            return Err(ParseError::EmptyVerb);
        }
        let verb = verb.to_ascii_uppercase();

        // Index of the trailer parameter, if the line had one
        let mut trailing_index = None;

        loop {
            if let Some(arg) = rest.strip_prefix(':') {
                trailing_index = Some(params.len());
                params.push(arg.to_string());
                break;
            }

            match rest.find(' ') {
                Some(offset) => {
                    let arg = &rest[..offset];

                    if !arg.is_empty() {
                        params.push(arg.to_string());
                    }

                    rest = &rest[offset + 1..];
                }
                None => {
                    if !rest.is_empty() {
                        params.push(rest.to_string());
                    }
                    break;
                }
            }
        }

        // The SAID family names the acting user inside the parameter list rather
        // than in the source field
        if let Some(index) = said_source_index(&verb) {
            let is_plain_token = index < params.len() && trailing_index.map_or(true, |t| index < t);
            if is_plain_token {
                source = Some(params.remove(index));
            }
        }

        Ok(Self {
            network,
            verb,
            params,
            source,
            tags,
        })
    }

    /// Parameter at `index`, if present
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// The final parameter, if there is one
    pub fn last_param(&self) -> Option<&str> {
        self.params.last().map(String::as_str)
    }

    /// The message source, split into its hostmask parts
    pub fn source_mask(&self) -> Option<Hostmask> {
        self.source.as_deref().map(Hostmask::parse)
    }

    /// Whether the verb is a three-digit numeric reply
    pub fn is_numeric(&self) -> bool {
        self.verb.len() == 3 && self.verb.bytes().all(|b| b.is_ascii_digit())
    }

    /// Encode this message as a CRLF-terminated line. Tags and source are not
    /// encoded.
    pub fn encode(&self) -> Result<String, EncodeError> {
        let mut line = format_line(&self.verb, &self.params)?;
        line.push_str("\r\n");
        Ok(line)
    }
}

/// Join a verb and its parameters into a single line, without a terminator.
///
/// The final parameter is prefixed with the trailer sentinel when it is empty,
/// contains a space, or itself starts with the sentinel.
pub fn format_line<S: AsRef<str>>(verb: &str, params: &[S]) -> Result<String, EncodeError> {
    if verb.is_empty() || verb.contains(' ') {
        return Err(EncodeError::EmptyVerb);
    }

    let mut line = verb.to_string();
    let count = params.len();

    for (index, param) in params.iter().enumerate() {
        let param = param.as_ref();
        let needs_trailer = param.is_empty() || param.contains(' ') || param.starts_with(':');

        line.push(' ');
        if needs_trailer {
            if index + 1 != count {
                return Err(EncodeError::InvalidMiddleParameter(index));
            }
            line.push(':');
        }
        line.push_str(param);
    }

    Ok(line)
}

fn said_source_index(verb: &str) -> Option<usize> {
    match verb {
        "SAID" | "SAIDEX" => Some(1),
        "SAIDPRIVATE" | "SAIDPRIVATEEX" => Some(0),
        _ => None,
    }
}

fn unescape_tag_value(value: &str) -> String {
    let mut ret = String::with_capacity(value.len());
    let mut chars = value.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            ret.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => ret.push(';'),
            Some('s') => ret.push(' '),
            Some('r') => ret.push('\r'),
            Some('n') => ret.push('\n'),
            Some(other) => ret.push(other),
            None => {}
        }
    }

    ret
}

/// A `nick!ident@host` triple, any part of which beyond the nick may be unknown
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Hostmask {
    pub nick: String,
    pub ident: Option<String>,
    pub host: Option<String>,
}

impl Hostmask {
    pub fn parse(mask: &str) -> Self {
        if let Some((nick, userhost)) = mask.split_once('!') {
            if let Some((ident, host)) = userhost.split_once('@') {
                return Self {
                    nick: nick.to_string(),
                    ident: Some(ident.to_string()),
                    host: Some(host.to_string()),
                };
            }
        }

        Self::nick_only(mask)
    }

    pub fn nick_only(nick: &str) -> Self {
        Self {
            nick: nick.to_string(),
            ident: None,
            host: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.ident.is_some() && self.host.is_some()
    }

    /// Whether this source looks like a server name rather than a user
    pub fn is_server(&self) -> bool {
        !self.is_complete() && self.nick.contains('.')
    }
}

impl fmt::Display for Hostmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.ident, &self.host) {
            (Some(ident), Some(host)) => write!(f, "{}!{}@{}", self.nick, ident, host),
            _ => f.write_str(&self.nick),
        }
    }
}
