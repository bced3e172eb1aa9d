//! Numeric replies interpreted by the engine

pub const ISUPPORT: &str = "005";
pub const END_OF_WHO: &str = "315";
pub const CHANNEL_MODE_IS: &str = "324";
pub const TOPIC_IS: &str = "332";
pub const WHO_REPLY: &str = "352";
pub const NAMES_REPLY: &str = "353";
pub const WHOX_REPLY: &str = "354";
pub const END_OF_NAMES: &str = "366";
pub const NICKNAME_IN_USE: &str = "433";

pub const LOGGED_IN: &str = "900";
pub const SASL_SUCCESS: &str = "903";
pub const NICK_LOCKED: &str = "902";
pub const SASL_FAIL: &str = "904";
pub const SASL_TOO_LONG: &str = "905";
pub const SASL_ABORTED: &str = "906";

/// Numerics that end an authentication attempt unsuccessfully
pub const SASL_FAILURES: &[&str] = &[NICK_LOCKED, SASL_FAIL, SASL_TOO_LONG, SASL_ABORTED];
