//! Bounded message queue shared by a simulation hierarchy.
//!
//! Components and systems push info/warning/error/fatal/debug messages; an
//! external consumer drains them with [`MessageHandler::get_message`]. The
//! queue holds at most `max_queue_size` entries and drops the oldest entry
//! when a new one would exceed that bound. Every message is also forwarded to
//! `tracing` under the `tlm::messages` target.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Default queue bound.
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 10_000;

/// Severity of a queued message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MessageKind {
    Info,
    Warning,
    Error,
    Fatal,
    Debug,
}

impl MessageKind {
    const ALL: [MessageKind; 5] = [
        MessageKind::Info,
        MessageKind::Warning,
        MessageKind::Error,
        MessageKind::Fatal,
        MessageKind::Debug,
    ];

    /// Text prepended to the message body.
    pub fn prefix(self) -> &'static str {
        match self {
            MessageKind::Info => "Info: ",
            MessageKind::Warning => "Warning: ",
            MessageKind::Error => "Error: ",
            MessageKind::Fatal => "Fatal error: ",
            MessageKind::Debug => "Debug: ",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
            MessageKind::Fatal => "fatal",
            MessageKind::Debug => "debug",
        }
    }

    fn counter(self) -> usize {
        match self {
            MessageKind::Info => 0,
            MessageKind::Warning => 1,
            MessageKind::Error => 2,
            MessageKind::Fatal => 3,
            MessageKind::Debug => 4,
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One queued message. `text` already carries the kind prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Message {
    pub kind: MessageKind,
    pub text: String,
    pub tag: String,
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[derive(Debug, Default)]
struct Queue {
    messages: VecDeque<Message>,
    counts: [usize; 5],
}

impl Queue {
    fn push(&mut self, msg: Message, max: usize) {
        self.counts[msg.kind.counter()] += 1;
        self.messages.push_back(msg);
        while self.messages.len() > max {
            if let Some(old) = self.messages.pop_front() {
                self.counts[old.kind.counter()] -= 1;
            }
        }
    }

    fn pop(&mut self) -> Option<Message> {
        let msg = self.messages.pop_front()?;
        self.counts[msg.kind.counter()] -= 1;
        Some(msg)
    }
}

/// Thread-safe bounded message queue.
#[derive(Debug)]
pub struct MessageHandler {
    queue: Mutex<Queue>,
    max_queue_size: usize,
}

impl Default for MessageHandler {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_MAX_QUEUE_SIZE)
    }
}

impl MessageHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a handler holding at most `max_queue_size` messages (minimum 1).
    pub fn with_capacity(max_queue_size: usize) -> Self {
        Self {
            queue: Mutex::new(Queue::default()),
            max_queue_size: max_queue_size.max(1),
        }
    }

    pub fn max_queue_size(&self) -> usize {
        self.max_queue_size
    }

    // A panic while holding the lock cannot leave the queue half-updated.
    fn lock(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a message of the given kind.
    pub fn add_message(&self, kind: MessageKind, text: impl AsRef<str>, tag: impl Into<String>) {
        let text = format!("{}{}", kind.prefix(), text.as_ref());
        let tag = tag.into();
        match kind {
            MessageKind::Info => tracing::info!(target: "tlm::messages", %tag, "{text}"),
            MessageKind::Warning => tracing::warn!(target: "tlm::messages", %tag, "{text}"),
            MessageKind::Error | MessageKind::Fatal => {
                tracing::error!(target: "tlm::messages", %tag, "{text}")
            }
            MessageKind::Debug => tracing::debug!(target: "tlm::messages", %tag, "{text}"),
        }
        self.lock()
            .push(Message { kind, text, tag }, self.max_queue_size);
    }

    pub fn add_info_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Info, text, "");
    }

    pub fn add_warning_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Warning, text, "");
    }

    pub fn add_error_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Error, text, "");
    }

    /// Fatal messages tell the consumer to shut down in a controlled way.
    pub fn add_fatal_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Fatal, text, "");
    }

    pub fn add_debug_message(&self, text: impl AsRef<str>) {
        self.add_message(MessageKind::Debug, text, "");
    }

    /// Pop the oldest waiting message.
    pub fn get_message(&self) -> Option<Message> {
        self.lock().pop()
    }

    /// Pop every waiting message, oldest first.
    pub fn drain(&self) -> Vec<Message> {
        let mut queue = self.lock();
        queue.counts = [0; 5];
        queue.messages.drain(..).collect()
    }

    pub fn num_waiting(&self) -> usize {
        self.lock().messages.len()
    }

    /// Number of waiting messages of one kind.
    pub fn count(&self, kind: MessageKind) -> usize {
        self.lock().counts[kind.counter()]
    }

    /// True if any error or fatal message is waiting.
    pub fn has_errors(&self) -> bool {
        let queue = self.lock();
        queue.counts[MessageKind::Error.counter()] + queue.counts[MessageKind::Fatal.counter()] > 0
    }

    /// Snapshot of the waiting messages without consuming them.
    pub fn peek_all(&self) -> Vec<Message> {
        self.lock().messages.iter().cloned().collect()
    }

    pub fn clear(&self) {
        let mut queue = self.lock();
        queue.messages.clear();
        queue.counts = [0; 5];
    }

    /// Per-kind waiting counts, in `Info, Warning, Error, Fatal, Debug` order.
    pub fn counts(&self) -> [(MessageKind, usize); 5] {
        let queue = self.lock();
        MessageKind::ALL.map(|k| (k, queue.counts[k.counter()]))
    }
}
