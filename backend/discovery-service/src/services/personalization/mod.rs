/// Personalization Module
///
/// Turns a behavior snapshot and the catalog into greetings, the
/// personalization gate, ranked recommendations and similar cities.
///
/// Every operation is a pure function of its inputs: the engine holds only
/// configuration and a shared catalog handle, never user state.
///
/// # Scoring
/// 1. Tag overlap between city tags and the user's styles and interests
/// 2. Budget proximity (only when a budget is set)
/// 3. Rating and popularity baseline
/// 4. Novelty bonus for cities never visited
pub mod greeting;
pub mod scoring;
pub mod similarity;

use crate::config::PersonalizationConfig;
use crate::error::{AppError, Result};
use crate::models::CityRecord;
use crate::services::behavior::BehaviorSnapshot;
use crate::services::catalog::Catalog;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

pub use greeting::{Greeting, VisitorKind};
pub use scoring::{Factor, RecommendationReason, ScoreBreakdown};
pub use similarity::SimilarCity;

#[derive(Debug, Clone, Serialize)]
pub struct Recommendation {
    pub city: CityRecord,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
    pub reason: RecommendationReason,
    pub reason_label: String,
}

pub struct PersonalizationEngine {
    config: PersonalizationConfig,
    catalog: Arc<Catalog>,
}

impl PersonalizationEngine {
    pub fn new(config: PersonalizationConfig, catalog: Arc<Catalog>) -> Self {
        Self { config, catalog }
    }

    pub fn config(&self) -> &PersonalizationConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn personalized_greeting(&self, snapshot: &BehaviorSnapshot, now: DateTime<Utc>) -> Greeting {
        greeting::greet(&self.config, snapshot, now)
    }

    /// Cold-start gate: at least one saved city, or enough distinct visited cities.
    pub fn is_personalization_eligible(&self, snapshot: &BehaviorSnapshot) -> bool {
        !snapshot.saved.is_empty() || snapshot.visited_city_count() >= self.config.min_visited_cities
    }

    /// Top `n` unsaved cities. Never padded.
    pub fn recommendations(&self, snapshot: &BehaviorSnapshot, n: usize) -> Vec<Recommendation> {
        let preferences = &snapshot.profile.preferences;

        let mut scored: Vec<(f64, ScoreBreakdown, &CityRecord)> = self
            .catalog
            .all()
            .iter()
            .filter(|city| !snapshot.is_saved(&city.id))
            .map(|city| {
                let breakdown = ScoreBreakdown::compute(
                    &self.config,
                    preferences,
                    city,
                    snapshot.is_visited(&city.id),
                );
                (breakdown.total(), breakdown, city)
            })
            .collect();

        scored.sort_by(|a, b| scoring::rank_order(a.0, a.2, b.0, b.2));
        scored.truncate(n);

        debug!(
            candidates = self.catalog.len(),
            returned = scored.len(),
            top_score = scored.first().map(|s| s.0),
            "Recommendations ranked"
        );

        scored
            .into_iter()
            .map(|(score, breakdown, city)| {
                let reason = RecommendationReason::explain(&breakdown, preferences, city);
                Recommendation {
                    city: city.clone(),
                    score,
                    breakdown,
                    reason_label: reason.label(),
                    reason,
                }
            })
            .collect()
    }

    /// The gated form the presentation layer uses: `None` means "omit the section".
    pub fn personalized_section(
        &self,
        snapshot: &BehaviorSnapshot,
        n: usize,
    ) -> Option<Vec<Recommendation>> {
        if self.is_personalization_eligible(snapshot) {
            Some(self.recommendations(snapshot, n))
        } else {
            None
        }
    }

    pub fn recommendation_reason(
        &self,
        snapshot: &BehaviorSnapshot,
        city: &CityRecord,
    ) -> RecommendationReason {
        let preferences = &snapshot.profile.preferences;
        let breakdown =
            ScoreBreakdown::compute(&self.config, preferences, city, snapshot.is_visited(&city.id));
        RecommendationReason::explain(&breakdown, preferences, city)
    }

    pub fn similar_cities(&self, city_id: &str, n: usize) -> Result<Vec<SimilarCity>> {
        let origin = self
            .catalog
            .lookup(city_id)
            .ok_or_else(|| AppError::NotFound(city_id.to_string()))?;

        let mut similar: Vec<SimilarCity> = self
            .catalog
            .all()
            .iter()
            .filter(|other| other.id != origin.id)
            .map(|other| similarity::similarity(&self.config, origin, other))
            .collect();

        similar.sort_by(|a, b| scoring::rank_order(a.score, &a.city, b.score, &b.city));
        similar.truncate(n);

        Ok(similar)
    }
}
