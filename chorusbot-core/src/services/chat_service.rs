// File: src/services/chat_service.rs
//
// The single dispatch point for inbound chat. Classification, state
// update and the orchestration decision run synchronously per message;
// only the scheduled reply units (delay + completion + send) suspend,
// inside the response queue.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use chrono::Utc;
use tracing::{debug, error, info};

use chorusbot_ai::PersonaRuntime;
use chorusbot_common::models::Role;
use chorusbot_common::models::ChatMessage;

use crate::eventbus::{BotEvent, EventBus};
use crate::platforms::ChatTransport;
use crate::services::classifier;
use crate::services::conversation::ConversationTracker;
use crate::services::moderation::ModerationEvaluator;
use crate::services::orchestrator::ResponseOrchestrator;
use crate::services::response_queue::ResponseQueue;
use crate::Error;

/// One message as delivered by the chat transport callback.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub channel: String,
    pub username: String,
    pub text: String,
    pub role: Role,
}

/// The ChatService ingests new chat messages, decides which personas
/// reply, and hands the reply units to the response queue.
pub struct ChatService {
    orchestrator: Arc<Mutex<ResponseOrchestrator>>,
    /// One tracker per channel, touched only from the dispatch path and
    /// the reply units' completion bookkeeping.
    trackers: Arc<Mutex<HashMap<String, ConversationTracker>>>,
    conversation_timeout_ms: u64,
    runtime: Arc<PersonaRuntime>,
    transport: Arc<dyn ChatTransport>,
    response_queue: Arc<ResponseQueue>,
    evaluator: Arc<ModerationEvaluator>,
    event_bus: Arc<EventBus>,
}

impl ChatService {
    pub fn new(
        orchestrator: ResponseOrchestrator,
        conversation_timeout_ms: u64,
        runtime: Arc<PersonaRuntime>,
        transport: Arc<dyn ChatTransport>,
        response_queue: Arc<ResponseQueue>,
        evaluator: Arc<ModerationEvaluator>,
        event_bus: Arc<EventBus>,
    ) -> Self {
        debug!("ChatService::new() called");
        Self {
            orchestrator: Arc::new(Mutex::new(orchestrator)),
            trackers: Arc::new(Mutex::new(HashMap::new())),
            conversation_timeout_ms,
            runtime,
            transport,
            response_queue,
            evaluator,
            event_bus,
        }
    }

    /// Send each persona's intro line after joining the channel.
    pub async fn send_intros(&self, channel: &str) -> Result<(), Error> {
        let intros: Vec<(String, String)> = {
            let orch = self.orchestrator.lock().await;
            orch.persona_names()
                .iter()
                .filter_map(|name| {
                    let p = orch.persona(name)?;
                    let intro = p.intro_message.clone()?;
                    Some((p.name.clone(), intro))
                })
                .collect()
        };
        for (name, intro) in intros {
            if let Err(e) = self.transport.send_message(channel, &intro).await {
                error!("intro for '{}' failed: {e}", name);
            }
        }
        Ok(())
    }

    /// Processes an incoming chat message:
    ///  1. Publishes the chat event to the EventBus.
    ///  2. Updates the channel's conversation state (every message counts,
    ///     persona chatter included).
    ///  3. Drops anything a persona authored (never reply to ourselves).
    ///  4. Buffers the message for moderation review.
    ///  5. Classifies the text and schedules the decided responses.
    pub async fn process_incoming_message(
        &self,
        channel: &str,
        username: &str,
        text: &str,
        role: Role,
    ) -> Result<(), Error> {
        let message = ChatMessage::new(channel, username, text, role);
        self.event_bus
            .publish_chat(channel, username, text, role)
            .await;

        {
            let mut trackers = self.trackers.lock().await;
            let tracker = trackers
                .entry(channel.to_string())
                .or_insert_with(|| ConversationTracker::new(self.conversation_timeout_ms));
            tracker.observe(Utc::now());
        }

        let (mentions, is_greeting, scheduled) = {
            let mut orch = self.orchestrator.lock().await;

            // A message authored by one of our personas never triggers
            // classification or moderation buffering.
            if orch.is_persona_name(username) {
                debug!("ignoring message from persona '{}'", username);
                return Ok(());
            }

            self.evaluator.ingest(&message);

            let classification = classifier::classify(text, &orch.persona_names());
            let scheduled =
                orch.determine_responses(&classification.mentions, classification.is_greeting);
            (classification.mentions, classification.is_greeting, scheduled)
        };

        debug!(
            "message from '{}': mentions={:?} greeting={} -> {} reply unit(s)",
            username,
            mentions,
            is_greeting,
            scheduled.len()
        );

        for response in scheduled {
            self.schedule_reply(channel, text, response);
        }
        Ok(())
    }

    fn schedule_reply(
        &self,
        channel: &str,
        trigger_text: &str,
        response: chorusbot_common::models::ScheduledResponse,
    ) {
        let orchestrator = self.orchestrator.clone();
        let trackers = self.trackers.clone();
        let runtime = self.runtime.clone();
        let transport = self.transport.clone();
        let event_bus = self.event_bus.clone();
        let channel = channel.to_string();
        let trigger = trigger_text.to_string();
        let persona_name = response.persona_name.clone();

        self.response_queue.schedule(&response.persona_name, response.delay, async move {
            let persona = {
                let orch = orchestrator.lock().await;
                orch.persona(&persona_name)
                    .cloned()
                    .ok_or_else(|| Error::PersonaNotFound(persona_name.clone()))?
            };

            // A failed or empty completion simply means no message is
            // sent; there is no retry.
            let Some(reply) = runtime.generate_reply(&persona, &trigger).await? else {
                return Ok(());
            };

            transport.send_message(&channel, &reply).await?;
            orchestrator.lock().await.note_spoke(&persona_name);
            if let Some(tracker) = trackers.lock().await.get_mut(&channel) {
                tracker.note_response();
            }
            event_bus
                .publish(BotEvent::PersonaReply {
                    channel: channel.clone(),
                    persona_name: persona_name.clone(),
                    text: reply,
                    timestamp: Utc::now(),
                })
                .await;
            Ok(())
        });
    }

    /// Current conversation state for a channel, if any messages arrived.
    pub async fn conversation_state(
        &self,
        channel: &str,
    ) -> Option<crate::services::conversation::ConversationState> {
        self.trackers.lock().await.get(channel).map(|t| t.snapshot())
    }

    /// Single-consumer dispatch loop: preserves arrival order and fully
    /// processes each message before the next one.
    pub async fn run_dispatch_loop(&self, mut rx: mpsc::Receiver<InboundMessage>) {
        info!("chat dispatch loop started");
        while let Some(inbound) = rx.recv().await {
            if self.event_bus.is_shutdown() {
                break;
            }
            if let Err(e) = self
                .process_incoming_message(
                    &inbound.channel,
                    &inbound.username,
                    &inbound.text,
                    inbound.role,
                )
                .await
            {
                error!("dispatch failed for message from '{}': {e}", inbound.username);
            }
        }
        info!("chat dispatch loop ended");
    }
}
