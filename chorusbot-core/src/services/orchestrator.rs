// File: src/services/orchestrator.rs
//
// Decides which personas respond to an inbound message and with what
// delay. Mentions always win; greetings draw at most one low-priority
// reply, probability-gated.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::{Rng, RngCore};
use tracing::debug;

use chorusbot_common::models::{
    OrchestratorConfig, PersonaConfig, ResponsePriority, ScheduledResponse,
};

pub struct ResponseOrchestrator {
    personas: Vec<PersonaConfig>,
    config: OrchestratorConfig,
    /// When each persona last sent a reply; absent = never spoke.
    last_spoke_at: HashMap<String, DateTime<Utc>>,
    rng: Box<dyn RngCore + Send>,
}

impl ResponseOrchestrator {
    /// The RNG is injected so tests can seed it and force either side of
    /// the greeting-chance gate.
    pub fn new(
        personas: Vec<PersonaConfig>,
        config: OrchestratorConfig,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            personas,
            config,
            last_spoke_at: HashMap::new(),
            rng,
        }
    }

    pub fn persona_names(&self) -> Vec<String> {
        self.personas.iter().map(|p| p.name.clone()).collect()
    }

    pub fn persona(&self, name: &str) -> Option<&PersonaConfig> {
        self.personas.iter().find(|p| p.name == name)
    }

    /// True if `username` is any configured persona (case-insensitive).
    pub fn is_persona_name(&self, username: &str) -> bool {
        self.personas.iter().any(|p| p.matches_username(username))
    }

    /// Record that a persona just sent a reply, for recency-based
    /// greeting selection.
    pub fn note_spoke(&mut self, persona_name: &str) {
        self.last_spoke_at
            .insert(persona_name.to_string(), Utc::now());
    }

    /// Compute the scheduled responses for one classified message.
    ///
    /// `mentions` must already exclude the message author; that filter
    /// runs at ingestion, upstream of classification.
    pub fn determine_responses(
        &mut self,
        mentions: &[String],
        is_greeting: bool,
    ) -> Vec<ScheduledResponse> {
        let mut scheduled: Vec<ScheduledResponse> = Vec::new();

        // Rule A: every mentioned persona replies, staggered so the
        // replies never land at the same instant.
        for (index, name) in mentions.iter().enumerate() {
            let jitter: u64 = self.rng.random_range(0..=self.config.jitter_max_ms);
            let delay_ms =
                self.config.base_delay_ms + index as u64 * self.config.stagger_ms + jitter;
            scheduled.push(ScheduledResponse {
                persona_name: name.clone(),
                delay: Duration::from_millis(delay_ms),
                priority: ResponsePriority::High,
            });
        }

        // Rule B: greeting fallback, only when nothing was mentioned.
        if scheduled.is_empty()
            && is_greeting
            && self.rng.random::<f64>() < self.config.greeting_chance
        {
            if let Some(name) = self.least_recently_spoken() {
                let jitter: u64 = self.rng.random_range(0..=self.config.jitter_max_ms);
                let delay_ms = (self.config.max_delay_ms as f64 * 0.8) as u64 + jitter;
                scheduled.push(ScheduledResponse {
                    persona_name: name,
                    delay: Duration::from_millis(delay_ms),
                    priority: ResponsePriority::Low,
                });
            }
        }

        scheduled.truncate(self.config.max_bots_per_conversation);
        if !scheduled.is_empty() {
            debug!(
                "scheduled {} response(s): {:?}",
                scheduled.len(),
                scheduled.iter().map(|s| &s.persona_name).collect::<Vec<_>>()
            );
        }
        scheduled
    }

    /// Personas that never spoke win first; ties break by roster order.
    fn least_recently_spoken(&self) -> Option<String> {
        self.personas
            .iter()
            .enumerate()
            .min_by_key(|&(index, p)| (self.last_spoke_at.get(&p.name).copied(), index))
            .map(|(_, p)| p.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn roster() -> Vec<PersonaConfig> {
        vec![
            PersonaConfig::new("Alice", "gpt-4o-mini", "You are Alice."),
            PersonaConfig::new("Bob", "gpt-4o-mini", "You are Bob."),
            PersonaConfig::new("Carol", "gpt-4o-mini", "You are Carol."),
            PersonaConfig::new("Dave", "gpt-4o-mini", "You are Dave."),
        ]
    }

    fn orchestrator(config: OrchestratorConfig) -> ResponseOrchestrator {
        ResponseOrchestrator::new(roster(), config, Box::new(StdRng::seed_from_u64(7)))
    }

    #[test]
    fn mentions_get_high_priority_staggered_delays() {
        // Jitter pinned to zero so the stagger is exact.
        let config = OrchestratorConfig {
            jitter_max_ms: 0,
            ..Default::default()
        };
        let base = config.base_delay_ms;
        let stagger = config.stagger_ms;
        let mut orch = orchestrator(config);

        let out = orch.determine_responses(
            &["Alice".to_string(), "Bob".to_string()],
            false,
        );
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|s| s.priority == ResponsePriority::High));

        let d0 = out[0].delay.as_millis() as u64;
        let d1 = out[1].delay.as_millis() as u64;
        assert_eq!(d0, base);
        assert_eq!(d1, base + stagger);
        assert!(d1 >= d0 + stagger);
    }

    #[test]
    fn jitter_stays_within_its_bound() {
        let config = OrchestratorConfig {
            jitter_max_ms: 250,
            ..Default::default()
        };
        let base = config.base_delay_ms;
        let mut orch = orchestrator(config);

        for _ in 0..50 {
            let out = orch.determine_responses(&["Alice".to_string()], false);
            let d = out[0].delay.as_millis() as u64;
            assert!((base..=base + 250).contains(&d), "delay={d}");
        }
    }

    #[test]
    fn output_never_exceeds_max_bots() {
        let config = OrchestratorConfig {
            max_bots_per_conversation: 3,
            ..Default::default()
        };
        let mut orch = orchestrator(config);
        let mentions: Vec<String> =
            ["Alice", "Bob", "Carol", "Dave"].iter().map(|s| s.to_string()).collect();

        let out = orch.determine_responses(&mentions, false);
        assert_eq!(out.len(), 3);
        // Truncation preserves emission order.
        assert_eq!(out[0].persona_name, "Alice");
        assert_eq!(out[2].persona_name, "Carol");
    }

    #[test]
    fn no_persona_appears_twice() {
        let mut orch = orchestrator(OrchestratorConfig::default());
        let out = orch.determine_responses(&["Bob".to_string()], true);
        let mut names: Vec<_> = out.iter().map(|s| s.persona_name.clone()).collect();
        names.dedup();
        assert_eq!(names.len(), out.len());
    }

    #[test]
    fn greeting_with_chance_one_schedules_exactly_one_low_priority() {
        let config = OrchestratorConfig {
            greeting_chance: 1.0,
            ..Default::default()
        };
        let mut orch = orchestrator(config);

        let out = orch.determine_responses(&[], true);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].priority, ResponsePriority::Low);
    }

    #[test]
    fn greeting_with_chance_zero_schedules_nothing() {
        let config = OrchestratorConfig {
            greeting_chance: 0.0,
            ..Default::default()
        };
        let mut orch = orchestrator(config);

        let out = orch.determine_responses(&[], true);
        assert!(out.is_empty());
    }

    #[test]
    fn non_greeting_without_mentions_schedules_nothing() {
        let config = OrchestratorConfig {
            greeting_chance: 1.0,
            ..Default::default()
        };
        let mut orch = orchestrator(config);
        assert!(orch.determine_responses(&[], false).is_empty());
    }

    #[test]
    fn greeting_delay_sits_near_the_ceiling() {
        let config = OrchestratorConfig {
            greeting_chance: 1.0,
            ..Default::default()
        };
        let floor = (config.max_delay_ms as f64 * 0.8) as u64;
        let ceiling = floor + config.jitter_max_ms;
        let mut orch = orchestrator(config);

        let out = orch.determine_responses(&[], true);
        let delay = out[0].delay.as_millis() as u64;
        assert!(delay >= floor && delay <= ceiling, "delay={delay}");
    }

    #[test]
    fn greeting_fallback_prefers_least_recently_spoken() {
        let config = OrchestratorConfig {
            greeting_chance: 1.0,
            ..Default::default()
        };
        let mut orch = orchestrator(config);

        // Everyone but Carol has spoken; Carol (never spoke) must win.
        orch.note_spoke("Alice");
        orch.note_spoke("Bob");
        orch.note_spoke("Dave");

        let out = orch.determine_responses(&[], true);
        assert_eq!(out[0].persona_name, "Carol");
    }

    #[test]
    fn mentions_win_over_greeting_fallback() {
        let config = OrchestratorConfig {
            greeting_chance: 1.0,
            ..Default::default()
        };
        let mut orch = orchestrator(config);

        let out = orch.determine_responses(&["Bob".to_string()], true);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].persona_name, "Bob");
        assert_eq!(out[0].priority, ResponsePriority::High);
    }
}
