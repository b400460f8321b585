//! Bounded chat history.

use bytes::Bytes;
use std::collections::VecDeque;

/// Append-only chat history capped at a fixed number of entries.
///
/// Once full, the oldest entry is evicted for every new one.
#[derive(Debug)]
pub struct ChatLog {
    entries: VecDeque<Bytes>,
    limit: usize,
}

impl ChatLog {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            entries: VecDeque::with_capacity(limit.min(1024)),
            limit,
        }
    }

    /// Append a payload, evicting the oldest entries past the limit.
    pub fn push(&mut self, payload: Bytes) {
        while self.entries.len() >= self.limit {
            self.entries.pop_front();
        }
        self.entries.push_back(payload);
    }

    /// Retained entries, oldest first.
    pub fn entries(&self) -> impl ExactSizeIterator<Item = &Bytes> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
