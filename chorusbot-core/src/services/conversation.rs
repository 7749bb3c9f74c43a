// File: src/services/conversation.rs
//
// Per-channel conversation activity tracking. One tracker per channel,
// owned by that channel's dispatch loop; never shared across channels.

use chrono::{DateTime, Duration, Utc};

/// Snapshot of the conversation state at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversationState {
    pub is_active: bool,
    pub last_message_time: DateTime<Utc>,
    pub messages_since_last_response: u32,
}

pub struct ConversationTracker {
    timeout: Duration,
    is_active: bool,
    last_message_time: DateTime<Utc>,
    messages_since_last_response: u32,
}

impl ConversationTracker {
    pub fn new(timeout_ms: u64) -> Self {
        Self {
            timeout: Duration::milliseconds(timeout_ms as i64),
            is_active: false,
            last_message_time: Utc::now(),
            messages_since_last_response: 0,
        }
    }

    /// Record one inbound message. Runs before the orchestrator decision
    /// for the same message.
    ///
    /// An idle gap longer than the timeout resets the conversation first,
    /// so the message after a quiet spell counts from zero.
    pub fn observe(&mut self, now: DateTime<Utc>) {
        if now - self.last_message_time > self.timeout {
            self.is_active = false;
            self.messages_since_last_response = 0;
        }
        self.messages_since_last_response += 1;
        self.is_active = true;
        self.last_message_time = now;
    }

    /// Zero the counter once a persona actually replies.
    pub fn note_response(&mut self) {
        self.messages_since_last_response = 0;
    }

    pub fn snapshot(&self) -> ConversationState {
        ConversationState {
            is_active: self.is_active,
            last_message_time: self.last_message_time,
            messages_since_last_response: self.messages_since_last_response,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_messages_stay_active() {
        let mut tracker = ConversationTracker::new(30_000);
        let t0 = Utc::now();
        tracker.observe(t0);
        tracker.observe(t0 + Duration::seconds(5));
        tracker.observe(t0 + Duration::seconds(10));

        let state = tracker.snapshot();
        assert!(state.is_active);
        assert_eq!(state.messages_since_last_response, 3);
    }

    #[test]
    fn idle_gap_resets_then_counts_the_new_message() {
        let mut tracker = ConversationTracker::new(30_000);
        let t0 = Utc::now();
        tracker.observe(t0);
        tracker.observe(t0 + Duration::seconds(2));

        // Gap past the timeout: counter resets to 0 and then the new
        // message increments it to exactly 1.
        tracker.observe(t0 + Duration::seconds(40));
        let state = tracker.snapshot();
        assert!(state.is_active);
        assert_eq!(state.messages_since_last_response, 1);
    }

    #[test]
    fn note_response_zeroes_the_counter() {
        let mut tracker = ConversationTracker::new(30_000);
        tracker.observe(Utc::now());
        tracker.note_response();
        assert_eq!(tracker.snapshot().messages_since_last_response, 0);
    }
}
