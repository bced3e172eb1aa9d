use crate::command::Command;

use std::collections::VecDeque;

/// A line waiting in the [`OutboundQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedLine {
    pub line: String,
    /// Whether the line should be sent again on the next session if this one
    /// ends before it is transmitted
    pub replay: bool,
}

impl From<&Command> for QueuedLine {
    fn from(cmd: &Command) -> Self {
        Self {
            line: cmd.to_line(),
            replay: cmd.replayable(),
        }
    }
}

/// FIFO of outbound lines released by the pacing timer.
///
/// The queue does no timing of its own; the connection task pops at most one
/// line per pacing tick.
#[derive(Debug, Default)]
pub struct OutboundQueue {
    pending: VecDeque<QueuedLine>,
}

impl OutboundQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: QueuedLine) {
        self.pending.push_back(item);
    }

    pub fn push_command(&mut self, cmd: &Command) {
        self.push(QueuedLine::from(cmd));
    }

    /// Put a line back at the head of the queue, e.g. after a failed write
    pub fn push_front(&mut self, item: QueuedLine) {
        self.pending.push_front(item);
    }

    pub fn pop(&mut self) -> Option<QueuedLine> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &QueuedLine> {
        self.pending.iter()
    }

    /// Drain the queue, keeping only the lines marked for replay
    pub fn take_replayable(&mut self) -> Vec<String> {
        self.pending
            .drain(..)
            .filter(|item| item.replay)
            .map(|item| item.line)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fifo_order() {
        let mut queue = OutboundQueue::new();
        queue.push_command(&Command::Join("a".to_string()));
        queue.push_command(&Command::Join("b".to_string()));

        let first = queue.pop().unwrap();
        assert_eq!(first.line, "JOIN a");
        queue.push_front(first);

        assert_eq!(queue.pop().unwrap().line, "JOIN a");
        assert_eq!(queue.pop().unwrap().line, "JOIN b");
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn only_chat_is_replayed() {
        let mut queue = OutboundQueue::new();
        queue.push_command(&Command::Join("main".to_string()));
        queue.push_command(&Command::Say {
            channel: "main".to_string(),
            text: "one".to_string(),
        });
        queue.push_command(&Command::Ping);
        queue.push_command(&Command::SayPrivate {
            user: "alice".to_string(),
            text: "two".to_string(),
        });

        assert_eq!(
            queue.take_replayable(),
            vec!["SAY main one".to_string(), "SAYPRIVATE alice :two".to_string()]
        );
        assert!(queue.is_empty());
    }
}
