//! Message id allocation.
//!
//! Ids 0-99 correlate requests with responses. Id 100 is reserved for frames
//! the device sends on its own initiative.

/// Highest id handed out to a request.
pub const MAX_REQUEST_ID: u8 = 99;

/// Id carried by every unsolicited (device-originated) frame.
pub const UNSOLICITED_ID: u8 = 100;

/// Sequential request ids: `0, 1, ..., 99, 0, 1, ...`.
#[derive(Debug, Clone, Default)]
pub struct MessageIdSequence {
    next: u8,
}

impl MessageIdSequence {
    /// Start a sequence at id 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the next request id and advance, wrapping after 99.
    pub fn next_id(&mut self) -> u8 {
        let id = self.next;
        self.next = if id >= MAX_REQUEST_ID { 0 } else { id + 1 };
        id
    }

    /// The id the next call to [`next_id`](Self::next_id) will return.
    pub fn peek(&self) -> u8 {
        self.next
    }
}

/// Returns true if `id` marks an unsolicited frame.
pub fn is_unsolicited(id: u8) -> bool {
    id == UNSOLICITED_ID
}
