//! Reading sessions and the in-memory session store.
//!
//! Each session owns one [`EngagementMetrics`] record plus the hint derived
//! from it. Every mutation goes through the store, which refreshes the hint
//! and records pathway changes so oscillation around a threshold stays
//! visible afterwards.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Result, VibeError};
use crate::hint::{generate_hint, AdaptiveHint, HintKind};
use crate::metrics::{EngagementMetrics, EventKind, PathwayTransition};
use crate::pathway::LearningPathway;
use crate::ticker::MetricsSimulator;

/// A recorded change of learning pathway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathwayChange {
    /// Pathway before the change.
    pub from: LearningPathway,
    /// Pathway after the change.
    pub to: LearningPathway,
    /// When the change happened.
    pub at: DateTime<Utc>,
    /// Number of simulation ticks the session had seen.
    pub tick: u64,
}

/// Serializable view of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    /// Session id.
    pub id: Uuid,
    /// Chapter being read.
    pub chapter_id: String,
    /// Section being read.
    pub section_id: String,
    /// Whether the ticker drives this session.
    pub simulate: bool,
    /// Current metrics.
    pub metrics: EngagementMetrics,
    /// Current hint.
    pub hint: AdaptiveHint,
    /// Every pathway change so far, oldest first.
    pub pathway_changes: Vec<PathwayChange>,
    /// Hints displayed so far; a new entry is added whenever the hint changes.
    pub hints_shown: Vec<HintKind>,
    /// Simulation ticks applied.
    pub ticks: u64,
    /// When the session started.
    pub created_at: DateTime<Utc>,
}

/// Result of mutating one session.
#[derive(Debug, Clone)]
pub struct SessionUpdate {
    /// The session after the mutation.
    pub snapshot: SessionSnapshot,
    /// Set when the mutation moved the pathway.
    pub pathway_change: Option<PathwayChange>,
}

#[derive(Debug, Clone)]
struct Session {
    id: Uuid,
    chapter_id: String,
    section_id: String,
    simulate: bool,
    metrics: EngagementMetrics,
    hint: AdaptiveHint,
    pathway_changes: Vec<PathwayChange>,
    hints_shown: Vec<HintKind>,
    ticks: u64,
    created_at: DateTime<Utc>,
}

impl Session {
    fn new(chapter_id: String, section_id: String, simulate: bool) -> Self {
        let metrics = EngagementMetrics::new();
        let hint = generate_hint(&metrics, &chapter_id, &section_id);
        Self {
            id: Uuid::new_v4(),
            hints_shown: vec![hint.kind],
            chapter_id,
            section_id,
            simulate,
            metrics,
            hint,
            pathway_changes: Vec::new(),
            ticks: 0,
            created_at: Utc::now(),
        }
    }

    fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            id: self.id,
            chapter_id: self.chapter_id.clone(),
            section_id: self.section_id.clone(),
            simulate: self.simulate,
            metrics: self.metrics.clone(),
            hint: self.hint.clone(),
            pathway_changes: self.pathway_changes.clone(),
            hints_shown: self.hints_shown.clone(),
            ticks: self.ticks,
            created_at: self.created_at,
        }
    }

    /// Refreshes the hint and records a pathway change if there was one.
    fn after_mutation(&mut self, transition: PathwayTransition) -> SessionUpdate {
        let hint = generate_hint(&self.metrics, &self.chapter_id, &self.section_id);
        if hint.kind != self.hint.kind {
            self.hints_shown.push(hint.kind);
        }
        self.hint = hint;

        let pathway_change = transition.changed().then(|| {
            let change = PathwayChange {
                from: transition.previous,
                to: transition.current,
                at: Utc::now(),
                tick: self.ticks,
            };
            debug!(
                session = %self.id,
                from = %change.from,
                to = %change.to,
                tick = change.tick,
                "Pathway changed"
            );
            self.pathway_changes.push(change.clone());
            change
        });

        SessionUpdate {
            snapshot: self.snapshot(),
            pathway_change,
        }
    }

    fn tick(&mut self, simulator: &mut MetricsSimulator) -> SessionUpdate {
        let transition = simulator.tick(&mut self.metrics);
        self.ticks += 1;
        self.after_mutation(transition)
    }

    fn record(&mut self, event: EventKind) -> SessionUpdate {
        let transition = self.metrics.record(event);
        self.after_mutation(transition)
    }
}

/// In-memory store of live sessions.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, Session>,
}

impl SessionStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Returns `true` if there are no sessions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Starts a session for a chapter section.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::InvalidInput` if either id is blank.
    pub fn create(
        &mut self,
        chapter_id: &str,
        section_id: &str,
        simulate: bool,
    ) -> Result<SessionSnapshot> {
        let chapter_id = chapter_id.trim();
        let section_id = section_id.trim();
        if chapter_id.is_empty() {
            return Err(VibeError::invalid_input("Chapter id cannot be empty"));
        }
        if section_id.is_empty() {
            return Err(VibeError::invalid_input("Section id cannot be empty"));
        }

        let session = Session::new(chapter_id.to_string(), section_id.to_string(), simulate);
        let snapshot = session.snapshot();
        info!(
            session = %session.id,
            chapter = %chapter_id,
            section = %section_id,
            simulate,
            "Session started"
        );
        self.sessions.insert(session.id, session);
        Ok(snapshot)
    }

    /// Returns a snapshot of one session.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::SessionNotFound` for an unknown or malformed id.
    pub fn get(&self, id: &str) -> Result<SessionSnapshot> {
        self.find(id).map(Session::snapshot)
    }

    /// Removes a session and returns its final snapshot.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::SessionNotFound` for an unknown or malformed id.
    pub fn remove(&mut self, id: &str) -> Result<SessionSnapshot> {
        let key = Self::parse_id(id)?;
        let session = self
            .sessions
            .remove(&key)
            .ok_or_else(|| VibeError::session_not_found(id))?;
        info!(session = %key, ticks = session.ticks, "Session closed");
        Ok(session.snapshot())
    }

    /// Snapshots of all sessions, oldest first.
    #[must_use]
    pub fn list(&self) -> Vec<SessionSnapshot> {
        let mut snapshots: Vec<_> = self.sessions.values().map(Session::snapshot).collect();
        snapshots.sort_by_key(|s| (s.created_at, s.id));
        snapshots
    }

    /// Applies one simulation tick to every session with simulation enabled.
    pub fn tick_all(&mut self, simulator: &mut MetricsSimulator) -> Vec<SessionUpdate> {
        let mut ids: Vec<_> = self
            .sessions
            .values()
            .filter(|s| s.simulate)
            .map(|s| (s.created_at, s.id))
            .collect();
        // Stable order keeps seeded runs reproducible
        ids.sort();

        let mut updates = Vec::with_capacity(ids.len());
        for (_, id) in ids {
            if let Some(session) = self.sessions.get_mut(&id) {
                updates.push(session.tick(simulator));
            }
        }
        updates
    }

    /// Applies one simulation tick to a single session, simulated or not.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::SessionNotFound` for an unknown or malformed id.
    pub fn tick(&mut self, id: &str, simulator: &mut MetricsSimulator) -> Result<SessionUpdate> {
        Ok(self.find_mut(id)?.tick(simulator))
    }

    /// Records a real interaction event on a session.
    ///
    /// # Errors
    ///
    /// Returns `VibeError::SessionNotFound` for an unknown or malformed id.
    pub fn record_event(&mut self, id: &str, event: EventKind) -> Result<SessionUpdate> {
        Ok(self.find_mut(id)?.record(event))
    }

    fn parse_id(id: &str) -> Result<Uuid> {
        Uuid::parse_str(id).map_err(|_| VibeError::session_not_found(id))
    }

    fn find(&self, id: &str) -> Result<&Session> {
        let key = Self::parse_id(id)?;
        self.sessions
            .get(&key)
            .ok_or_else(|| VibeError::session_not_found(id))
    }

    fn find_mut(&mut self, id: &str) -> Result<&mut Session> {
        let key = Self::parse_id(id)?;
        self.sessions
            .get_mut(&key)
            .ok_or_else(|| VibeError::session_not_found(id))
    }
}
