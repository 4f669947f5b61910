use crate::config::PersonalizationConfig;
use crate::models::{CityRecord, MAX_PRICE_LEVEL, MIN_PRICE_LEVEL};
use crate::utils::{jaccard, proximity};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct SimilarCity {
    pub city: CityRecord,
    pub score: f64,
    pub tag_overlap: f64,
    pub same_continent: bool,
    pub price_affinity: f64,
}

pub fn similarity(
    config: &PersonalizationConfig,
    origin: &CityRecord,
    other: &CityRecord,
) -> SimilarCity {
    let tag_overlap = jaccard(&origin.tags, &other.tags);
    let same_continent = origin.continent.eq_ignore_ascii_case(&other.continent);
    let price_affinity = config.price_similarity_bonus
        * proximity(
            origin.price_level,
            other.price_level,
            MAX_PRICE_LEVEL - MIN_PRICE_LEVEL,
        );
    let continent_bonus = if same_continent {
        config.same_continent_bonus
    } else {
        0.0
    };

    SimilarCity {
        city: other.clone(),
        score: tag_overlap + continent_bonus + price_affinity,
        tag_overlap,
        same_continent,
        price_affinity,
    }
}
