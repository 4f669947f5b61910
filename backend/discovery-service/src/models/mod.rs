use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Lowest and highest price level a city or a budget can carry.
pub const MIN_PRICE_LEVEL: u8 = 1;
pub const MAX_PRICE_LEVEL: u8 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Catalog entry. Immutable once the catalog is loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    pub continent: String,
    /// 1 (cheap) to 5 (expensive)
    pub price_level: u8,
    /// 0.0 to 5.0
    pub rating: f64,
    /// 0 to 100
    pub popularity_score: f64,
    pub coordinates: Coordinates,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Identity {
    Anonymous,
    Named { user_id: Uuid, display_name: String },
}

impl Identity {
    pub fn display_name(&self) -> Option<&str> {
        match self {
            Identity::Anonymous => None,
            Identity::Named { display_name, .. } => Some(display_name.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default)]
    pub preferred_styles: BTreeSet<String>,
    /// None until the user picks a budget
    #[serde(default)]
    pub budget_level: Option<u8>,
    #[serde(default)]
    pub interests: BTreeSet<String>,
    #[serde(default)]
    pub avoid_crowds: bool,
}

impl Preferences {
    /// Union of preferred styles and interests, the tag set scoring matches against.
    pub fn tag_profile(&self) -> BTreeSet<&str> {
        self.preferred_styles
            .iter()
            .chain(self.interests.iter())
            .map(String::as_str)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub identity: Identity,
    #[serde(default)]
    pub preferences: Preferences,
}

impl Default for UserProfile {
    fn default() -> Self {
        Self {
            identity: Identity::Anonymous,
            preferences: Preferences::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionKind {
    Click,
    Scroll,
    Share,
    ViewPhoto,
    OpenMap,
    ReadStory,
}

/// One entry of a visit record's bounded interaction log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionEvent {
    pub kind: InteractionKind,
    pub target: String,
    pub timestamp: DateTime<Utc>,
}

impl InteractionEvent {
    pub fn now(kind: InteractionKind, target: impl Into<String>) -> Self {
        Self {
            kind,
            target: target.into(),
            timestamp: Utc::now(),
        }
    }
}
