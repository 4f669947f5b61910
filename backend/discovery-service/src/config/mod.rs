use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{key} has an invalid value {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub service: ServiceConfig,
    pub catalog: CatalogConfig,
    pub behavior: BehaviorConfig,
    pub personalization: PersonalizationConfig,
    pub aggregator: AggregatorConfig,
    pub sources: SourcesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub http_port: u16,
    pub service_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BehaviorConfig {
    /// Minimum gap between two counted visits of the same city
    pub visit_throttle: Duration,
    /// Period of the visit-tracking timer while a city page is open
    pub visit_tick: Duration,
    pub interaction_log_capacity: usize,
    /// Sessions untouched for longer than this are evicted
    pub session_idle_ttl: Duration,
    pub session_sweep_interval: Duration,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            visit_throttle: Duration::from_secs(30),
            visit_tick: Duration::from_secs(10),
            interaction_log_capacity: 50,
            session_idle_ttl: Duration::from_secs(7200),
            session_sweep_interval: Duration::from_secs(60),
        }
    }
}

/// Scoring weights and gates. Weights were tuned by hand and are meant to be
/// overridden per deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonalizationConfig {
    pub tag_weight: f64,
    pub budget_weight: f64,
    pub popularity_weight: f64,
    pub novelty_bonus: f64,
    pub same_continent_bonus: f64,
    pub price_similarity_bonus: f64,
    /// Distinct visited cities needed to unlock personalized sections
    pub min_visited_cities: usize,
    /// Total visits that make a returning user "frequent"
    pub frequent_visit_threshold: u32,
    pub recency_window_days: i64,
}

impl PersonalizationConfig {
    pub fn recency_window(&self) -> chrono::Duration {
        chrono::Duration::days(self.recency_window_days)
    }
}

impl Default for PersonalizationConfig {
    fn default() -> Self {
        Self {
            tag_weight: 3.0,
            budget_weight: 2.0,
            popularity_weight: 1.0,
            novelty_bonus: 0.5,
            same_continent_bonus: 0.3,
            price_similarity_bonus: 0.2,
            min_visited_cities: 3,
            frequent_visit_threshold: 5,
            recency_window_days: 7,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AggregatorConfig {
    pub source_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            source_timeout: Duration::from_secs(8),
        }
    }
}

/// URL templates for the live sources. A missing template leaves the source
/// unregistered and its field permanently absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcesConfig {
    pub weather_url: Option<String>,
    pub forecast_url: Option<String>,
    pub summary_url: Option<String>,
    pub country_url: Option<String>,
    pub photos_url: Option<String>,
    pub attractions_url: Option<String>,
    pub restaurants_url: Option<String>,
    pub attraction_photos_url: Option<String>,
    pub restaurant_photos_url: Option<String>,
}

fn parse_env<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}

/// Like [`parse_env`] for a duration that must be non-zero.
fn parse_duration_env(
    key: &'static str,
    default: Duration,
    from_units: fn(u64) -> Duration,
    to_units: fn(&Duration) -> u64,
) -> Result<Duration, ConfigError> {
    let units = parse_env(key, to_units(&default))?;
    if units == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: units.to_string(),
        });
    }
    Ok(from_units(units))
}

fn secs_env(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_duration_env(key, default, Duration::from_secs, Duration::as_secs)
}

fn millis_env(key: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    parse_duration_env(key, default, Duration::from_millis, |d| d.as_millis() as u64)
}

fn optional_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let behavior_defaults = BehaviorConfig::default();
        let weights = PersonalizationConfig::default();
        let aggregator_defaults = AggregatorConfig::default();

        Ok(Config {
            service: ServiceConfig {
                http_port: parse_env("HTTP_PORT", 8020)?,
                service_name: env::var("SERVICE_NAME")
                    .unwrap_or_else(|_| "discovery-service".to_string()),
            },
            catalog: CatalogConfig {
                path: env::var("CATALOG_PATH").unwrap_or_else(|_| "data/cities.json".to_string()),
            },
            behavior: BehaviorConfig {
                visit_throttle: secs_env("VISIT_THROTTLE_SECS", behavior_defaults.visit_throttle)?,
                visit_tick: secs_env("VISIT_TICK_SECS", behavior_defaults.visit_tick)?,
                interaction_log_capacity: parse_env(
                    "INTERACTION_LOG_CAPACITY",
                    behavior_defaults.interaction_log_capacity,
                )?,
                session_idle_ttl: secs_env("SESSION_TTL_SECS", behavior_defaults.session_idle_ttl)?,
                session_sweep_interval: secs_env(
                    "SESSION_SWEEP_SECS",
                    behavior_defaults.session_sweep_interval,
                )?,
            },
            personalization: PersonalizationConfig {
                tag_weight: parse_env("TAG_WEIGHT", weights.tag_weight)?,
                budget_weight: parse_env("BUDGET_WEIGHT", weights.budget_weight)?,
                popularity_weight: parse_env("POPULARITY_WEIGHT", weights.popularity_weight)?,
                novelty_bonus: parse_env("NOVELTY_BONUS", weights.novelty_bonus)?,
                same_continent_bonus: parse_env(
                    "SAME_CONTINENT_BONUS",
                    weights.same_continent_bonus,
                )?,
                price_similarity_bonus: parse_env(
                    "PRICE_SIMILARITY_BONUS",
                    weights.price_similarity_bonus,
                )?,
                min_visited_cities: parse_env("MIN_VISITED_CITIES", weights.min_visited_cities)?,
                frequent_visit_threshold: parse_env(
                    "FREQUENT_VISIT_THRESHOLD",
                    weights.frequent_visit_threshold,
                )?,
                recency_window_days: parse_env("RECENCY_WINDOW_DAYS", weights.recency_window_days)?,
            },
            aggregator: AggregatorConfig {
                source_timeout: millis_env("SOURCE_TIMEOUT_MS", aggregator_defaults.source_timeout)?,
            },
            sources: SourcesConfig {
                weather_url: optional_env("WEATHER_URL"),
                forecast_url: optional_env("FORECAST_URL"),
                summary_url: optional_env("SUMMARY_URL"),
                country_url: optional_env("COUNTRY_URL"),
                photos_url: optional_env("PHOTOS_URL"),
                attractions_url: optional_env("ATTRACTIONS_URL"),
                restaurants_url: optional_env("RESTAURANTS_URL"),
                attraction_photos_url: optional_env("ATTRACTION_PHOTOS_URL"),
                restaurant_photos_url: optional_env("RESTAURANT_PHOTOS_URL"),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_falls_back_to_default() {
        let value: u16 = parse_env("DISCOVERY_TEST_UNSET_PORT", 8020).unwrap();
        assert_eq!(value, 8020);
    }

    #[test]
    fn test_parse_env_rejects_garbage() {
        env::set_var("DISCOVERY_TEST_BAD_WEIGHT", "heavy");
        let result: Result<f64, _> = parse_env("DISCOVERY_TEST_BAD_WEIGHT", 1.0);
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        env::remove_var("DISCOVERY_TEST_BAD_WEIGHT");
    }

    #[test]
    fn test_zero_durations_are_rejected() {
        env::set_var("DISCOVERY_TEST_ZERO_TICK", "0");
        let result = secs_env("DISCOVERY_TEST_ZERO_TICK", Duration::from_secs(10));
        assert!(matches!(
            result,
            Err(ConfigError::Invalid { key: "DISCOVERY_TEST_ZERO_TICK", .. })
        ));
        env::remove_var("DISCOVERY_TEST_ZERO_TICK");

        env::set_var("DISCOVERY_TEST_ZERO_TIMEOUT", " 0 ");
        let result = millis_env("DISCOVERY_TEST_ZERO_TIMEOUT", Duration::from_secs(8));
        assert!(matches!(result, Err(ConfigError::Invalid { .. })));
        env::remove_var("DISCOVERY_TEST_ZERO_TIMEOUT");
    }

    #[test]
    fn test_duration_env_units() {
        env::set_var("DISCOVERY_TEST_TIMEOUT_MS", "250");
        let timeout = millis_env("DISCOVERY_TEST_TIMEOUT_MS", Duration::from_secs(8)).unwrap();
        assert_eq!(timeout, Duration::from_millis(250));
        env::remove_var("DISCOVERY_TEST_TIMEOUT_MS");

        let tick = secs_env("DISCOVERY_TEST_UNSET_TICK", Duration::from_secs(10)).unwrap();
        assert_eq!(tick, Duration::from_secs(10));
    }

    #[test]
    fn test_default_weights_favor_tags_over_popularity() {
        let weights = PersonalizationConfig::default();
        assert!(weights.tag_weight > weights.popularity_weight);
        assert!(weights.budget_weight > weights.popularity_weight);
    }
}
