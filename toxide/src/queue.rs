//! Per-friend outbound message queue. Entries wait for the read
//! receipt that clears the line's noread mark; entries that never got
//! a receipt id (sent while offline) are retried on reconnect.

use crate::scrollback::LineId;
use std::collections::VecDeque;
use std::time::{Duration, Instant};
use toxide_net::{MessageKind, ReceiptId};

/// A queued entry without a receipt is re-sent after this long.
pub const RETRY_AFTER: Duration = Duration::from_secs(60);
pub const MAX_ATTEMPTS: u8 = 2;

#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub receipt: Option<ReceiptId>,
    pub line_id: LineId,
    pub text: String,
    pub kind: MessageKind,
    pub sent_at: Instant,
    pub attempts: u8,
}

#[derive(Debug, Default)]
pub struct MessageQueue {
    entries: VecDeque<QueuedMessage>,
}

impl MessageQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn enqueue(&mut self, line_id: LineId, text: String, kind: MessageKind, now: Instant) {
        self.entries.push_back(QueuedMessage {
            receipt: None,
            line_id,
            text,
            kind,
            sent_at: now,
            attempts: 1,
        });
    }

    pub fn set_receipt(&mut self, line_id: LineId, receipt: ReceiptId) {
        if let Some(entry) = self.entries.iter_mut().find(|e| e.line_id == line_id) {
            entry.receipt = Some(receipt);
        }
    }

    /// Read receipts arrive in send order; everything up to and
    /// including the matching receipt counts as read.
    pub fn ack(&mut self, receipt: ReceiptId) -> Vec<LineId> {
        let mut acked = Vec::new();
        while let Some(front) = self.entries.front() {
            match front.receipt {
                Some(r) if r.0 <= receipt.0 => {
                    acked.push(self.entries.pop_front().unwrap().line_id);
                }
                _ => break,
            }
        }
        acked
    }

    /// Entries due for another send attempt; bumps their clocks.
    pub fn due_for_retry(&mut self, now: Instant) -> Vec<QueuedMessage> {
        let mut due = Vec::new();
        for entry in self.entries.iter_mut() {
            if entry.receipt.is_none()
                && entry.attempts < MAX_ATTEMPTS
                && now.duration_since(entry.sent_at) >= RETRY_AFTER
            {
                entry.attempts += 1;
                entry.sent_at = now;
                due.push(entry.clone());
            }
        }
        due
    }

    /// Unreceipted entries, re-sent when the friend reconnects.
    pub fn unsent(&mut self) -> Vec<QueuedMessage> {
        self.entries
            .iter()
            .filter(|e| e.receipt.is_none())
            .cloned()
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
