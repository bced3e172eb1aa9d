mod or_log;
pub use or_log::OrLog;

use rand::Rng;

const FALLBACK_NICK_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// A nickname to use when the one we asked for is taken: `a` followed by
/// eight characters from `[0-9A-Z]`
pub fn fallback_nickname() -> String {
    let mut rng = rand::thread_rng();
    let mut nick = String::with_capacity(9);
    nick.push('a');
    for _ in 0..8 {
        let idx = rng.gen_range(0..FALLBACK_NICK_CHARS.len());
        nick.push(FALLBACK_NICK_CHARS[idx] as char);
    }
    nick
}
