/// Recommendation scoring
///
/// Per-factor contributions for one (user, city) pair. Both the ranking and
/// the reason label come from [`ScoreBreakdown::compute`], so the label can
/// never disagree with the order.
use crate::config::PersonalizationConfig;
use crate::models::{CityRecord, Preferences, MAX_PRICE_LEVEL, MIN_PRICE_LEVEL};
use crate::utils::{normalize, proximity};
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScoreBreakdown {
    pub tag_match: f64,
    pub budget_match: f64,
    pub popularity: f64,
    pub novelty: f64,
}

impl ScoreBreakdown {
    pub fn compute(
        config: &PersonalizationConfig,
        preferences: &Preferences,
        city: &CityRecord,
        visited: bool,
    ) -> Self {
        let wanted = preferences.tag_profile();
        let overlap = city
            .tags
            .iter()
            .filter(|tag| wanted.contains(tag.as_str()))
            .count();

        let budget_match = match preferences.budget_level {
            Some(budget) => {
                config.budget_weight
                    * proximity(city.price_level, budget, MAX_PRICE_LEVEL - MIN_PRICE_LEVEL)
            }
            None => 0.0,
        };

        let baseline =
            (normalize(city.rating, 0.0, 5.0) + normalize(city.popularity_score, 0.0, 100.0)) / 2.0;

        Self {
            tag_match: config.tag_weight * overlap as f64,
            budget_match,
            popularity: config.popularity_weight * baseline,
            novelty: if visited { 0.0 } else { config.novelty_bonus },
        }
    }

    pub fn total(&self) -> f64 {
        self.tag_match + self.budget_match + self.popularity + self.novelty
    }

    /// Largest of tag, budget and popularity contributions. Ties resolve in
    /// that order; novelty never explains a recommendation.
    pub fn dominant_factor(&self) -> Factor {
        let mut best = (Factor::TagMatch, self.tag_match);
        for candidate in [
            (Factor::BudgetMatch, self.budget_match),
            (Factor::Popularity, self.popularity),
        ] {
            if candidate.1 > best.1 {
                best = candidate;
            }
        }

        if best.1 <= 0.0 {
            Factor::Popularity
        } else {
            best.0
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    TagMatch,
    BudgetMatch,
    Popularity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecommendationReason {
    TagMatch { tags: Vec<String> },
    BudgetMatch,
    Popularity,
}

impl RecommendationReason {
    pub fn explain(breakdown: &ScoreBreakdown, preferences: &Preferences, city: &CityRecord) -> Self {
        match breakdown.dominant_factor() {
            Factor::TagMatch => {
                let wanted = preferences.tag_profile();
                let tags = city
                    .tags
                    .iter()
                    .filter(|tag| wanted.contains(tag.as_str()))
                    .cloned()
                    .collect();
                RecommendationReason::TagMatch { tags }
            }
            Factor::BudgetMatch => RecommendationReason::BudgetMatch,
            Factor::Popularity => RecommendationReason::Popularity,
        }
    }

    pub fn label(&self) -> String {
        match self {
            RecommendationReason::TagMatch { tags } => {
                format!("Matches your interests: {}", tags.join(", "))
            }
            RecommendationReason::BudgetMatch => "Fits your budget".to_string(),
            RecommendationReason::Popularity => "Popular with travelers".to_string(),
        }
    }
}

/// Descending score, then rating descending, then name and id ascending.
pub fn rank_order(a_score: f64, a: &CityRecord, b_score: f64, b: &CityRecord) -> Ordering {
    b_score
        .total_cmp(&a_score)
        .then_with(|| b.rating.total_cmp(&a.rating))
        .then_with(|| a.name.cmp(&b.name))
        .then_with(|| a.id.cmp(&b.id))
}
