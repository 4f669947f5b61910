// ============================================
// Behavioral Store
// ============================================
//
// Session-scoped record of what one user did:
// - visit records per city (throttled visit counts, sections, interaction log)
// - saved cities
// - the user profile
//
// Every mutation that changes state bumps a revision published on a watch
// channel so readers can re-derive greetings and recommendations.

use super::VisitRecord;
use crate::config::BehaviorConfig;
use crate::error::{AppError, Result};
use crate::models::{InteractionEvent, UserProfile, MAX_PRICE_LEVEL, MIN_PRICE_LEVEL};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::time::Duration;
use tokio::sync::watch;
use tracing::debug;

#[derive(Debug, Default)]
struct BehaviorState {
    profile: UserProfile,
    visits: HashMap<String, VisitRecord>,
    saved: BTreeSet<String>,
}

/// Immutable copy of a user's behavior, the only input the
/// personalization engine reads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BehaviorSnapshot {
    pub profile: UserProfile,
    pub visits: HashMap<String, VisitRecord>,
    pub saved: BTreeSet<String>,
}

impl BehaviorSnapshot {
    pub fn is_saved(&self, city_id: &str) -> bool {
        self.saved.contains(city_id)
    }

    pub fn is_visited(&self, city_id: &str) -> bool {
        self.visits
            .get(city_id)
            .map(VisitRecord::is_visited)
            .unwrap_or(false)
    }

    pub fn visited_city_count(&self) -> usize {
        self.visits.values().filter(|r| r.is_visited()).count()
    }

    pub fn total_visits(&self) -> u64 {
        self.visits.values().map(|r| u64::from(r.visit_count)).sum()
    }

    pub fn last_visit(&self) -> Option<DateTime<Utc>> {
        self.visits
            .values()
            .filter(|r| r.is_visited())
            .filter_map(|r| r.last_visited_at)
            .max()
    }
}

pub struct BehavioralStore {
    config: BehaviorConfig,
    state: RwLock<BehaviorState>,
    revision: watch::Sender<u64>,
}

impl BehavioralStore {
    pub fn new(config: BehaviorConfig) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            config,
            state: RwLock::new(BehaviorState::default()),
            revision,
        }
    }

    pub fn with_profile(config: BehaviorConfig, profile: UserProfile) -> Result<Self> {
        let store = Self::new(config);
        store.set_profile(profile)?;
        Ok(store)
    }

    /// Receiver observing the revision counter; changes on every effective mutation.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.revision.subscribe()
    }

    pub fn revision(&self) -> u64 {
        *self.revision.borrow()
    }

    fn bump(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }

    pub fn throttle(&self) -> Duration {
        self.config.visit_throttle
    }

    // ============================================
    // Writes
    // ============================================

    pub fn record_visit(&self, city_id: &str) -> u32 {
        self.record_visit_at(city_id, Utc::now())
    }

    /// Count a visit at `now`, throttled per city. Returns the resulting count.
    pub fn record_visit_at(&self, city_id: &str, now: DateTime<Utc>) -> u32 {
        let (counted, visit_count) = {
            let mut state = self.state.write();
            let record = state
                .visits
                .entry(city_id.to_string())
                .or_insert_with(|| VisitRecord::new(city_id));
            let counted = record.register_visit(now, self.config.visit_throttle);
            (counted, record.visit_count)
        };

        debug!(city_id, visit_count, counted, "Visit recorded");
        self.bump();
        visit_count
    }

    /// Accrue time spent on an open city page. Never changes the visit count.
    pub fn record_dwell(&self, city_id: &str, elapsed: Duration) -> bool {
        self.record_dwell_at(city_id, elapsed, Utc::now())
    }

    pub fn record_dwell_at(&self, city_id: &str, elapsed: Duration, now: DateTime<Utc>) -> bool {
        {
            let mut state = self.state.write();
            let Some(record) = state.visits.get_mut(city_id) else {
                return false;
            };
            record.dwell_secs = record.dwell_secs.saturating_add(elapsed.as_secs());
            record.touch(now);
        }

        self.bump();
        true
    }

    /// Flip saved state. Returns the new state.
    pub fn toggle_saved(&self, city_id: &str) -> bool {
        let saved = {
            let mut state = self.state.write();
            if state.saved.remove(city_id) {
                false
            } else {
                state.saved.insert(city_id.to_string());
                true
            }
        };

        debug!(city_id, saved, "Saved state toggled");
        self.bump();
        saved
    }

    /// Idempotent form of [`toggle_saved`](Self::toggle_saved). Returns whether anything changed.
    pub fn set_saved(&self, city_id: &str, saved: bool) -> bool {
        let changed = {
            let mut state = self.state.write();
            if saved {
                state.saved.insert(city_id.to_string())
            } else {
                state.saved.remove(city_id)
            }
        };

        if changed {
            self.bump();
        }
        changed
    }

    /// Returns false when the section was already explored.
    pub fn record_section_explored(&self, city_id: &str, section_id: &str) -> bool {
        let added = {
            let mut state = self.state.write();
            state
                .visits
                .entry(city_id.to_string())
                .or_insert_with(|| VisitRecord::new(city_id))
                .explored_sections
                .insert(section_id.to_string())
        };

        if added {
            debug!(city_id, section_id, "Section explored");
            self.bump();
        }
        added
    }

    pub fn record_interaction(&self, city_id: &str, event: InteractionEvent) {
        let evicted = {
            let mut state = self.state.write();
            state
                .visits
                .entry(city_id.to_string())
                .or_insert_with(|| VisitRecord::new(city_id))
                .push_interaction(event, self.config.interaction_log_capacity)
        };

        if !evicted.is_empty() {
            debug!(city_id, evicted = evicted.len(), "Interaction log trimmed");
        }
        self.bump();
    }

    pub fn set_profile(&self, profile: UserProfile) -> Result<()> {
        if let Some(budget) = profile.preferences.budget_level {
            if !(MIN_PRICE_LEVEL..=MAX_PRICE_LEVEL).contains(&budget) {
                return Err(AppError::Validation(format!(
                    "budget level must be between {} and {}, got {}",
                    MIN_PRICE_LEVEL, MAX_PRICE_LEVEL, budget
                )));
            }
        }

        self.state.write().profile = profile;
        self.bump();
        Ok(())
    }

    // ============================================
    // Reads
    // ============================================

    pub fn profile(&self) -> UserProfile {
        self.state.read().profile.clone()
    }

    pub fn is_saved(&self, city_id: &str) -> bool {
        self.state.read().saved.contains(city_id)
    }

    pub fn saved_ids(&self) -> Vec<String> {
        self.state.read().saved.iter().cloned().collect()
    }

    pub fn visit_record(&self, city_id: &str) -> Option<VisitRecord> {
        self.state.read().visits.get(city_id).cloned()
    }

    /// Visited city ids, most recent first, one entry per city.
    pub fn recently_visited(&self, limit: usize) -> Vec<String> {
        let state = self.state.read();
        let mut visited: Vec<(&String, DateTime<Utc>)> = state
            .visits
            .values()
            .filter(|record| record.is_visited())
            .filter_map(|record| record.last_visited_at.map(|at| (&record.city_id, at)))
            .collect();

        visited.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        visited
            .into_iter()
            .take(limit)
            .map(|(city_id, _)| city_id.clone())
            .collect()
    }

    pub fn snapshot(&self) -> BehaviorSnapshot {
        let state = self.state.read();
        BehaviorSnapshot {
            profile: state.profile.clone(),
            visits: state.visits.clone(),
            saved: state.saved.clone(),
        }
    }
}
