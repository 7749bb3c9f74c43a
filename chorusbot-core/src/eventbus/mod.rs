//! src/eventbus/mod.rs
//!
//! Provides an in-process event bus that supports delivery to multiple
//! subscribers via bounded MPSC queues, plus the shared shutdown flag.

use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use chrono::{DateTime, Utc};

use chorusbot_common::models::Role;

/// Global event type the various parts of the bot publish or subscribe to.
#[derive(Debug, Clone)]
pub enum BotEvent {
    /// An inbound chat message from the channel.
    ChatMessage {
        channel: String,
        username: String,
        text: String,
        role: Role,
        timestamp: DateTime<Utc>,
    },

    /// A reply one of our personas sent out.
    PersonaReply {
        channel: String,
        persona_name: String,
        text: String,
        timestamp: DateTime<Utc>,
    },

    /// Periodic heartbeat event.
    Tick,

    /// System-wide event for debugging or administration.
    SystemMessage(String),
}

impl BotEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            BotEvent::ChatMessage { .. } => "chat_message",
            BotEvent::PersonaReply { .. } => "persona_reply",
            BotEvent::Tick => "tick",
            BotEvent::SystemMessage(_) => "system_message",
        }
    }
}

pub struct EventBus {
    subscribers: Arc<Mutex<Vec<mpsc::Sender<BotEvent>>>>,
    shutdown_tx: watch::Sender<bool>,
    pub shutdown_rx: watch::Receiver<bool>,
}

/// Default size for each subscriber's buffer. Adjust as needed.
const DEFAULT_BUFFER_SIZE: usize = 10000;

impl EventBus {
    /// Create a new, empty event bus.
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            subscribers: Arc::new(Mutex::new(vec![])),
            shutdown_tx: tx,
            shutdown_rx: rx,
        }
    }

    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }

    /// Returns a receiver on which events will be delivered.
    pub async fn subscribe(&self, buffer_size: Option<usize>) -> mpsc::Receiver<BotEvent> {
        let size = buffer_size.unwrap_or(DEFAULT_BUFFER_SIZE);
        let (tx, rx) = mpsc::channel(size);
        let mut subs = self.subscribers.lock().await;
        subs.push(tx);
        rx
    }

    /// Publish an event to all subscribers.
    pub async fn publish(&self, event: BotEvent) {
        let senders = {
            let subs = self.subscribers.lock().await;
            subs.clone()
        };
        for s in senders {
            let _ = s.send(event.clone()).await;
        }
    }

    /// Convenience method: publish a `ChatMessage` event.
    pub async fn publish_chat(&self, channel: &str, username: &str, text: &str, role: Role) {
        let event = BotEvent::ChatMessage {
            channel: channel.to_string(),
            username: username.to_string(),
            text: text.to_string(),
            role,
            timestamp: Utc::now(),
        };
        self.publish(event).await;
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let bus = EventBus::new();

        let mut rx1 = bus.subscribe(Some(5)).await;
        let mut rx2 = bus.subscribe(Some(5)).await;

        bus.publish_chat("#somechannel", "viewer1", "hello there", Role::User).await;

        let got1 = timeout(Duration::from_millis(100), rx1.recv())
            .await
            .expect("rx1 timed out")
            .expect("rx1 closed");
        let got2 = timeout(Duration::from_millis(100), rx2.recv())
            .await
            .expect("rx2 timed out")
            .expect("rx2 closed");

        for got in [got1, got2] {
            match got {
                BotEvent::ChatMessage { channel, username, text, .. } => {
                    assert_eq!(channel, "#somechannel");
                    assert_eq!(username, "viewer1");
                    assert_eq!(text, "hello there");
                }
                other => panic!("expected ChatMessage, got {:?}", other),
            }
        }
    }

    #[tokio::test]
    async fn test_shutdown_flag() {
        let bus = EventBus::new();
        assert!(!bus.is_shutdown());
        bus.shutdown();
        assert!(bus.is_shutdown());
    }
}
