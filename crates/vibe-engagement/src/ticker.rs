//! Demo metrics simulation.
//!
//! Without a telemetry backend the reader's engagement is simulated: every
//! tick adds time, randomly bumps a few counters and nudges confidence. The
//! RNG is seedable so a run can be replayed exactly.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

use crate::api::AppState;
use crate::config::SimulationConfig;
use crate::metrics::{EngagementMetrics, PathwayTransition};
use crate::websocket::EngagementEvent;

/// Random activity drawn for one tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickOutcome {
    /// Seconds added to `time_spent`.
    pub seconds: u64,
    /// Whether a code interaction happened.
    pub code_interaction: bool,
    /// Whether an AI prompt was sent.
    pub ai_prompt: bool,
    /// Whether a run succeeded.
    pub execution_success: bool,
    /// Whether a run failed.
    pub execution_failure: bool,
    /// Change applied to the confidence score before clamping.
    pub confidence_delta: f64,
}

/// Draws simulated activity from a seedable RNG.
#[derive(Debug, Clone)]
pub struct MetricsSimulator {
    rng: ChaCha8Rng,
    settings: SimulationConfig,
    tick_seconds: u64,
}

impl MetricsSimulator {
    /// Creates a simulator.
    ///
    /// Uses `settings.seed` when present, entropy otherwise.
    #[must_use]
    pub fn new(settings: SimulationConfig, tick_seconds: u64) -> Self {
        let rng = settings
            .seed
            .map_or_else(ChaCha8Rng::from_entropy, ChaCha8Rng::seed_from_u64);
        Self {
            rng,
            settings,
            tick_seconds,
        }
    }

    /// Seconds each tick adds.
    #[must_use]
    pub const fn tick_seconds(&self) -> u64 {
        self.tick_seconds
    }

    /// Draws the activity for one tick.
    pub fn next_outcome(&mut self) -> TickOutcome {
        let code_interaction = self.chance(self.settings.code_interaction_probability);
        let ai_prompt = self.chance(self.settings.ai_prompt_probability);
        let execution_success = self.chance(self.settings.execution_success_probability);
        let execution_failure = self.chance(self.settings.execution_failure_probability);

        let span = self.settings.confidence_step_max - self.settings.confidence_step_min;
        let confidence_delta = self.settings.confidence_step_min + self.rng.gen::<f64>() * span;

        TickOutcome {
            seconds: self.tick_seconds,
            code_interaction,
            ai_prompt,
            execution_success,
            execution_failure,
            confidence_delta,
        }
    }

    /// Draws an outcome and applies it to `metrics`.
    pub fn tick(&mut self, metrics: &mut EngagementMetrics) -> PathwayTransition {
        let outcome = self.next_outcome();
        metrics.apply_tick(&outcome)
    }

    fn chance(&mut self, probability: f64) -> bool {
        self.rng.gen::<f64>() < probability
    }
}

/// Spawns the background task that ticks every simulated session.
///
/// Each tick broadcasts `metrics_updated` per session and `pathway_changed`
/// when a tier moved. Abort the returned handle to stop the ticker.
pub fn spawn_ticker(state: AppState) -> JoinHandle<()> {
    let period = Duration::from_secs(state.config.tick_interval_secs.max(1));

    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately
        ticker.tick().await;

        info!(interval_secs = period.as_secs(), "Metrics ticker started");

        loop {
            ticker.tick().await;

            let updates = {
                let mut simulator = state.simulator.lock().await;
                let mut sessions = state.sessions.lock().await;
                sessions.tick_all(&mut simulator)
            };

            if updates.is_empty() {
                continue;
            }

            debug!(sessions = updates.len(), "Simulated tick");

            for update in updates {
                if let Some(change) = &update.pathway_change {
                    state.broadcaster.send(EngagementEvent::pathway_changed(
                        update.snapshot.id,
                        change.clone(),
                    ));
                }
                state
                    .broadcaster
                    .send(EngagementEvent::metrics_updated(update.snapshot));
            }
        }
    })
}
