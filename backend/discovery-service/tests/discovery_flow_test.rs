//! End-to-end flows over the seed catalog: behavior recording feeding the
//! personalization engine, and city pages driving the live-data aggregator.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use discovery_service::config::{AggregatorConfig, BehaviorConfig, PersonalizationConfig};
use discovery_service::models::{Identity, Preferences, UserProfile};
use discovery_service::services::aggregator::{
    CityQuery, EncyclopediaSummary, FieldStatus, LiveDataView, LiveField, LiveSource,
    SourceError, SourcePayload,
};
use discovery_service::services::personalization::VisitorKind;
use discovery_service::{
    BehavioralStore, Catalog, CityPage, LiveDataAggregator, PersonalizationEngine,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use uuid::Uuid;

fn seed_catalog() -> Arc<Catalog> {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/data/cities.json");
    Arc::new(Catalog::load(path).expect("seed catalog loads"))
}

fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Answers with the city name after a per-city delay.
struct DelayedSummary {
    slow_city: &'static str,
}

#[async_trait]
impl LiveSource for DelayedSummary {
    fn name(&self) -> &str {
        "delayed-summary"
    }

    fn field(&self) -> LiveField {
        LiveField::Summary
    }

    async fn fetch(&self, query: &CityQuery) -> Result<SourcePayload, SourceError> {
        let delay = if query.city_id == self.slow_city { 5 } else { 1 };
        tokio::time::sleep(Duration::from_secs(delay)).await;
        Ok(SourcePayload::Summary(EncyclopediaSummary {
            title: query.city_name.clone(),
            extract: format!("{} is a city in {}", query.city_name, query.country),
            canonical_url: format!("https://wiki.test/{}", query.city_id),
        }))
    }
}

struct DownSource;

#[async_trait]
impl LiveSource for DownSource {
    fn name(&self) -> &str {
        "down"
    }

    fn field(&self) -> LiveField {
        LiveField::Weather
    }

    async fn fetch(&self, _query: &CityQuery) -> Result<SourcePayload, SourceError> {
        Err(SourceError::Status(503))
    }
}

async fn settled(rx: &mut watch::Receiver<LiveDataView>) -> LiveDataView {
    loop {
        {
            let view = rx.borrow_and_update();
            if view.city_id.is_some() && view.is_settled() {
                return view.clone();
            }
        }
        rx.changed().await.expect("aggregator alive");
    }
}

#[test]
fn test_seed_catalog_is_valid() {
    let catalog = seed_catalog();

    assert!(catalog.len() >= 20);
    assert!(catalog.lookup("lisbon").is_some());
    assert!(catalog.lookup("atlantis").is_none());
    assert!(!catalog.search("foodie").is_empty());
}

#[test]
fn test_cold_start_to_personalized_journey() {
    let catalog = seed_catalog();
    let engine = PersonalizationEngine::new(PersonalizationConfig::default(), Arc::clone(&catalog));
    let store = BehavioralStore::new(BehaviorConfig::default());
    let now = Utc::now();

    let greeting = engine.personalized_greeting(&store.snapshot(), now);
    assert_eq!(greeting.visitor, VisitorKind::FirstTime);
    assert_eq!(greeting.phrase, "Welcome, traveler");
    assert!(engine.personalized_section(&store.snapshot(), 5).is_none());

    store
        .set_profile(UserProfile {
            identity: Identity::Named {
                user_id: Uuid::new_v4(),
                display_name: "Sam".to_string(),
            },
            preferences: Preferences {
                interests: tags(&["foodie"]),
                budget_level: Some(1),
                ..Preferences::default()
            },
        })
        .unwrap();

    for (offset, city) in ["lisbon", "porto", "rome"].iter().enumerate() {
        store.record_visit_at(city, now - ChronoDuration::minutes(10 - offset as i64));
    }
    assert!(engine.is_personalization_eligible(&store.snapshot()));

    let items = engine.personalized_section(&store.snapshot(), 3).unwrap();
    assert_eq!(items.len(), 3);
    assert_eq!(items[0].city.id, "bangkok");
    assert!(items[0].reason_label.starts_with("Matches your interests"));

    store.toggle_saved("bangkok");
    let items = engine.recommendations(&store.snapshot(), 3);
    assert!(items.iter().all(|item| item.city.id != "bangkok"));
    assert_eq!(items[0].city.id, "hanoi");

    let greeting = engine.personalized_greeting(&store.snapshot(), now);
    assert_eq!(greeting.visitor, VisitorKind::ReturningInfrequent);
    assert_eq!(greeting.display_name.as_deref(), Some("Sam"));

    assert_eq!(store.recently_visited(2), vec!["rome", "porto"]);
}

#[test]
fn test_similar_cities_over_seed_catalog() {
    let engine = PersonalizationEngine::new(PersonalizationConfig::default(), seed_catalog());

    let similar = engine.similar_cities("kyoto", 3).unwrap();
    assert_eq!(similar.len(), 3);
    assert!(similar.iter().all(|s| s.city.id != "kyoto"));
    assert!(similar.windows(2).all(|w| w[0].score >= w[1].score));

    assert!(engine.similar_cities("atlantis", 3).is_err());
}

#[tokio::test(start_paused = true)]
async fn test_navigation_keeps_only_latest_city_data() {
    let catalog = seed_catalog();
    let store = Arc::new(BehavioralStore::new(BehaviorConfig::default()));
    let sources: Vec<Arc<dyn LiveSource>> = vec![
        Arc::new(DelayedSummary { slow_city: "lisbon" }),
        Arc::new(DownSource),
    ];
    let aggregator = LiveDataAggregator::new(sources, &AggregatorConfig::default()).unwrap();
    let page = CityPage::new(
        catalog,
        Arc::clone(&store),
        aggregator,
        Duration::from_secs(10),
    );
    let mut rx = page.aggregator().subscribe();

    let first = page.open("lisbon").unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    let second = page.open("tokyo").unwrap();
    assert!(second.generation > first.generation);

    let view = settled(&mut rx).await;
    assert_eq!(view.city_id.as_deref(), Some("tokyo"));
    assert_eq!(view.bundle.city_id, "tokyo");
    assert_eq!(
        view.bundle.summary.as_ref().map(|s| s.title.as_str()),
        Some("Tokyo")
    );
    assert_eq!(view.status(LiveField::Weather), FieldStatus::Unavailable);

    tokio::time::sleep(Duration::from_secs(10)).await;
    let later = page.live();
    assert_eq!(later.bundle.summary.map(|s| s.title), Some("Tokyo".to_string()));

    assert_eq!(store.visit_record("lisbon").unwrap().visit_count, 1);
    assert_eq!(store.visit_record("tokyo").unwrap().visit_count, 1);
    assert_eq!(page.timer_cancellations(), 1);
}
