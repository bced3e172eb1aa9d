//! Recognising public messages meant for the bot

/// If `text` is addressed to `nick`, return the rest of the message.
///
/// A message is addressed when it starts with `<nick>: `, `<nick>, `,
/// `<nick> ` or one of `prefixes`. Triggers are tried in that order and only
/// the first match is removed.
pub fn strip_address<'a>(text: &'a str, nick: &str, prefixes: &[String]) -> Option<&'a str> {
    if !nick.is_empty() {
        if let Some(after_nick) = text.strip_prefix(nick) {
            for separator in [": ", ", ", " "] {
                if let Some(rest) = after_nick.strip_prefix(separator) {
                    return Some(rest);
                }
            }
        }
    }

    prefixes
        .iter()
        .filter(|p| !p.is_empty())
        .find_map(|p| text.strip_prefix(p.as_str()))
}
