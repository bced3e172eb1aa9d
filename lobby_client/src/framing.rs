//! Splitting a byte stream into protocol lines

/// Longest partial line that will be buffered while waiting for a terminator
pub const MAX_LINE_LEN: usize = 16 * 1024;

/// One unit of output from a [`LineBuffer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// A complete line, with its terminator and surrounding whitespace removed
    Line(String),
    /// A run of bytes that exceeded [`MAX_LINE_LEN`] without a terminator.
    /// Holds a short prefix of the discarded data.
    Overlong(String),
}

/// Accumulates bytes read from a transport and yields complete lines.
///
/// Partial lines are held across calls to [`feed`](Self::feed). Bytes that are
/// not valid UTF-8 are replaced rather than rejected, so one bad byte never
/// loses the rest of the line.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
    discarding: bool,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a chunk of bytes, returning every frame completed by it
    pub fn feed(&mut self, data: &[u8]) -> Vec<Frame> {
        let mut frames = Vec::new();
        let mut rest = data;

        while let Some(offset) = rest.iter().position(|&b| b == b'\n') {
            let (head, tail) = rest.split_at(offset);
            rest = &tail[1..];

            if self.discarding {
                self.discarding = false;
                continue;
            }

            self.pending.extend_from_slice(head);
            let line = std::mem::take(&mut self.pending);
            let text = String::from_utf8_lossy(&line);
            let text = text.trim();
            if !text.is_empty() {
                frames.push(Frame::Line(text.to_string()));
            }
        }

        if !self.discarding {
            self.pending.extend_from_slice(rest);
            if self.pending.len() > MAX_LINE_LEN {
                let prefix_len = self.pending.len().min(64);
                let prefix = String::from_utf8_lossy(&self.pending[..prefix_len]).into_owned();
                frames.push(Frame::Overlong(prefix));
                self.pending.clear();
                self.discarding = true;
            }
        }

        frames
    }

    /// Number of bytes held in an unterminated line
    pub fn buffered(&self) -> usize {
        self.pending.len()
    }
}
