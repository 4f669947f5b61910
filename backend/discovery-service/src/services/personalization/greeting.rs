use crate::config::PersonalizationConfig;
use crate::services::behavior::BehaviorSnapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisitorKind {
    FirstTime,
    ReturningInfrequent,
    ReturningFrequent,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Greeting {
    pub visitor: VisitorKind,
    pub named: bool,
    pub phrase: String,
    pub display_name: Option<String>,
}

pub fn classify_visitor(
    config: &PersonalizationConfig,
    snapshot: &BehaviorSnapshot,
    now: DateTime<Utc>,
) -> VisitorKind {
    if snapshot.visited_city_count() == 0 {
        return VisitorKind::FirstTime;
    }

    let recent = snapshot
        .last_visit()
        .map(|last| now - last <= config.recency_window())
        .unwrap_or(false);

    if recent && snapshot.total_visits() >= u64::from(config.frequent_visit_threshold) {
        VisitorKind::ReturningFrequent
    } else {
        VisitorKind::ReturningInfrequent
    }
}

pub fn greet(
    config: &PersonalizationConfig,
    snapshot: &BehaviorSnapshot,
    now: DateTime<Utc>,
) -> Greeting {
    let visitor = classify_visitor(config, snapshot, now);
    let display_name = snapshot.profile.identity.display_name().map(str::to_string);
    let named = display_name.is_some();

    let phrase = match (visitor, named) {
        (VisitorKind::FirstTime, false) => "Welcome, traveler",
        (VisitorKind::FirstTime, true) => "Welcome",
        (VisitorKind::ReturningInfrequent, _) => "Welcome back",
        (VisitorKind::ReturningFrequent, false) => "Good to see you again",
        (VisitorKind::ReturningFrequent, true) => "Your next trip awaits",
    };

    Greeting {
        visitor,
        named,
        phrase: phrase.to_string(),
        display_name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BehaviorConfig;
    use crate::models::{Identity, UserProfile};
    use crate::services::behavior::BehavioralStore;
    use chrono::Duration;
    use uuid::Uuid;

    fn config() -> PersonalizationConfig {
        PersonalizationConfig {
            frequent_visit_threshold: 3,
            ..PersonalizationConfig::default()
        }
    }

    #[test]
    fn test_first_time_anonymous() {
        let store = BehavioralStore::new(BehaviorConfig::default());
        let greeting = greet(&config(), &store.snapshot(), Utc::now());

        assert_eq!(greeting.visitor, VisitorKind::FirstTime);
        assert!(!greeting.named);
        assert_eq!(greeting.display_name, None);
        assert_eq!(greeting.phrase, "Welcome, traveler");
    }

    #[test]
    fn test_frequent_named_visitor() {
        let profile = UserProfile {
            identity: Identity::Named {
                user_id: Uuid::new_v4(),
                display_name: "Ana".to_string(),
            },
            ..UserProfile::default()
        };
        let store = BehavioralStore::with_profile(BehaviorConfig::default(), profile).unwrap();
        let start = Utc::now();
        for minute in 0..3 {
            store.record_visit_at("lisbon", start + Duration::minutes(minute));
        }

        let greeting = greet(&config(), &store.snapshot(), start + Duration::hours(1));

        assert_eq!(greeting.visitor, VisitorKind::ReturningFrequent);
        assert_eq!(greeting.display_name.as_deref(), Some("Ana"));
    }

    #[test]
    fn test_stale_frequent_visitor_is_infrequent() {
        let store = BehavioralStore::new(BehaviorConfig::default());
        let start = Utc::now();
        for minute in 0..5 {
            store.record_visit_at("lisbon", start + Duration::minutes(minute));
        }

        let later = start + Duration::days(30);
        assert_eq!(
            classify_visitor(&config(), &store.snapshot(), later),
            VisitorKind::ReturningInfrequent
        );
    }

    #[test]
    fn test_greeting_is_deterministic() {
        let store = BehavioralStore::new(BehaviorConfig::default());
        let now = Utc::now();
        store.record_visit_at("oslo", now);

        let snapshot = store.snapshot();
        assert_eq!(greet(&config(), &snapshot, now), greet(&config(), &snapshot, now));
    }
}
