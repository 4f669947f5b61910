use crate::models::Coordinates;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One slot of a city's live data. Every source owns exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveField {
    Weather,
    Forecast,
    Summary,
    CountryInfo,
    Photos,
    Attractions,
    Restaurants,
    RealPhotoAttractions,
    RealPhotoRestaurants,
}

impl LiveField {
    pub const ALL: [LiveField; 9] = [
        LiveField::Weather,
        LiveField::Forecast,
        LiveField::Summary,
        LiveField::CountryInfo,
        LiveField::Photos,
        LiveField::Attractions,
        LiveField::Restaurants,
        LiveField::RealPhotoAttractions,
        LiveField::RealPhotoRestaurants,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LiveField::Weather => "weather",
            LiveField::Forecast => "forecast",
            LiveField::Summary => "summary",
            LiveField::CountryInfo => "country_info",
            LiveField::Photos => "photos",
            LiveField::Attractions => "attractions",
            LiveField::Restaurants => "restaurants",
            LiveField::RealPhotoAttractions => "real_photo_attractions",
            LiveField::RealPhotoRestaurants => "real_photo_restaurants",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherSnapshot {
    pub temperature_c: f64,
    pub condition: String,
    #[serde(default)]
    pub humidity_pct: Option<u8>,
    #[serde(default)]
    pub wind_kph: Option<f64>,
    #[serde(default)]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    pub date: String,
    pub min_c: f64,
    pub max_c: f64,
    pub condition: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EncyclopediaSummary {
    pub title: String,
    pub extract: String,
    pub canonical_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryFacts {
    pub name: String,
    #[serde(default)]
    pub capital: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub population: Option<u64>,
    #[serde(default)]
    pub currencies: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotoRef {
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub attribution: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointOfInterest {
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
}

/// Photos found for a named place (attraction or restaurant).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlacePhotos {
    pub place: String,
    pub photos: Vec<PhotoRef>,
}

/// Typed result of one source fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum SourcePayload {
    Weather(WeatherSnapshot),
    Forecast(Vec<ForecastEntry>),
    Summary(EncyclopediaSummary),
    CountryInfo(CountryFacts),
    Photos(Vec<PhotoRef>),
    Attractions(Vec<PointOfInterest>),
    Restaurants(Vec<PointOfInterest>),
    RealPhotoAttractions(Vec<PlacePhotos>),
    RealPhotoRestaurants(Vec<PlacePhotos>),
}

impl SourcePayload {
    pub fn field(&self) -> LiveField {
        match self {
            SourcePayload::Weather(_) => LiveField::Weather,
            SourcePayload::Forecast(_) => LiveField::Forecast,
            SourcePayload::Summary(_) => LiveField::Summary,
            SourcePayload::CountryInfo(_) => LiveField::CountryInfo,
            SourcePayload::Photos(_) => LiveField::Photos,
            SourcePayload::Attractions(_) => LiveField::Attractions,
            SourcePayload::Restaurants(_) => LiveField::Restaurants,
            SourcePayload::RealPhotoAttractions(_) => LiveField::RealPhotoAttractions,
            SourcePayload::RealPhotoRestaurants(_) => LiveField::RealPhotoRestaurants,
        }
    }

    /// Decode a JSON document as the payload type of `field`.
    pub fn decode(field: LiveField, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match field {
            LiveField::Weather => SourcePayload::Weather(serde_json::from_value(value)?),
            LiveField::Forecast => SourcePayload::Forecast(serde_json::from_value(value)?),
            LiveField::Summary => SourcePayload::Summary(serde_json::from_value(value)?),
            LiveField::CountryInfo => SourcePayload::CountryInfo(serde_json::from_value(value)?),
            LiveField::Photos => SourcePayload::Photos(serde_json::from_value(value)?),
            LiveField::Attractions => SourcePayload::Attractions(serde_json::from_value(value)?),
            LiveField::Restaurants => SourcePayload::Restaurants(serde_json::from_value(value)?),
            LiveField::RealPhotoAttractions => {
                SourcePayload::RealPhotoAttractions(serde_json::from_value(value)?)
            }
            LiveField::RealPhotoRestaurants => {
                SourcePayload::RealPhotoRestaurants(serde_json::from_value(value)?)
            }
        })
    }
}

/// Live data for one city. An absent field is either still loading or
/// failed; [`LiveDataView::status`] tells which.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveDataBundle {
    pub city_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub weather: Option<WeatherSnapshot>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast: Option<Vec<ForecastEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<EncyclopediaSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_info: Option<CountryFacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photos: Option<Vec<PhotoRef>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attractions: Option<Vec<PointOfInterest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub restaurants: Option<Vec<PointOfInterest>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_photo_attractions: Option<Vec<PlacePhotos>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub real_photo_restaurants: Option<Vec<PlacePhotos>>,
}

fn fill<T>(slot: &mut Option<T>, value: T) -> bool {
    if slot.is_some() {
        return false;
    }
    *slot = Some(value);
    true
}

impl LiveDataBundle {
    pub fn new(city_id: impl Into<String>) -> Self {
        Self {
            city_id: city_id.into(),
            ..Self::default()
        }
    }

    /// Write the payload's field if it is still empty. Returns false when the
    /// field was already populated.
    pub fn apply(&mut self, payload: SourcePayload) -> bool {
        match payload {
            SourcePayload::Weather(v) => fill(&mut self.weather, v),
            SourcePayload::Forecast(v) => fill(&mut self.forecast, v),
            SourcePayload::Summary(v) => fill(&mut self.summary, v),
            SourcePayload::CountryInfo(v) => fill(&mut self.country_info, v),
            SourcePayload::Photos(v) => fill(&mut self.photos, v),
            SourcePayload::Attractions(v) => fill(&mut self.attractions, v),
            SourcePayload::Restaurants(v) => fill(&mut self.restaurants, v),
            SourcePayload::RealPhotoAttractions(v) => fill(&mut self.real_photo_attractions, v),
            SourcePayload::RealPhotoRestaurants(v) => fill(&mut self.real_photo_restaurants, v),
        }
    }

    pub fn has(&self, field: LiveField) -> bool {
        match field {
            LiveField::Weather => self.weather.is_some(),
            LiveField::Forecast => self.forecast.is_some(),
            LiveField::Summary => self.summary.is_some(),
            LiveField::CountryInfo => self.country_info.is_some(),
            LiveField::Photos => self.photos.is_some(),
            LiveField::Attractions => self.attractions.is_some(),
            LiveField::Restaurants => self.restaurants.is_some(),
            LiveField::RealPhotoAttractions => self.real_photo_attractions.is_some(),
            LiveField::RealPhotoRestaurants => self.real_photo_restaurants.is_some(),
        }
    }

    pub fn populated_fields(&self) -> Vec<LiveField> {
        LiveField::ALL.into_iter().filter(|f| self.has(*f)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFetchState {
    Pending,
    Resolved,
    Failed,
}

/// What the page should draw for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    Ready,
    Loading,
    Unavailable,
}

/// Point-in-time view of the aggregator, published on every merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveDataView {
    /// None when no city page is open
    pub city_id: Option<String>,
    pub generation: u64,
    pub bundle: LiveDataBundle,
    pub states: BTreeMap<LiveField, SourceFetchState>,
}

impl LiveDataView {
    pub fn status(&self, field: LiveField) -> FieldStatus {
        if self.bundle.has(field) {
            return FieldStatus::Ready;
        }
        match self.states.get(&field) {
            Some(SourceFetchState::Pending) => FieldStatus::Loading,
            _ => FieldStatus::Unavailable,
        }
    }

    /// True once no registered source is still pending.
    pub fn is_settled(&self) -> bool {
        self.states
            .values()
            .all(|state| *state != SourceFetchState::Pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn weather(temp: f64) -> SourcePayload {
        SourcePayload::Weather(WeatherSnapshot {
            temperature_c: temp,
            condition: "sunny".to_string(),
            humidity_pct: None,
            wind_kph: None,
            icon: None,
        })
    }

    #[test]
    fn test_field_written_at_most_once() {
        let mut bundle = LiveDataBundle::new("lisbon");
        assert!(bundle.apply(weather(21.0)));
        assert!(!bundle.apply(weather(35.0)));
        assert_eq!(bundle.weather.as_ref().map(|w| w.temperature_c), Some(21.0));
        assert_eq!(bundle.populated_fields(), vec![LiveField::Weather]);
    }

    #[test]
    fn test_decode_by_field() {
        let payload = SourcePayload::decode(
            LiveField::Summary,
            json!({
                "title": "Lisbon",
                "extract": "Capital of Portugal.",
                "canonical_url": "https://en.wikipedia.org/wiki/Lisbon"
            }),
        )
        .unwrap();
        assert_eq!(payload.field(), LiveField::Summary);

        assert!(SourcePayload::decode(LiveField::Weather, json!({"nope": 1})).is_err());
    }

    #[test]
    fn test_status_distinguishes_loading_from_unavailable() {
        let mut view = LiveDataView {
            city_id: Some("lisbon".to_string()),
            generation: 1,
            bundle: LiveDataBundle::new("lisbon"),
            states: BTreeMap::new(),
        };
        view.states.insert(LiveField::Weather, SourceFetchState::Pending);
        view.states.insert(LiveField::Photos, SourceFetchState::Failed);

        assert_eq!(view.status(LiveField::Weather), FieldStatus::Loading);
        assert_eq!(view.status(LiveField::Photos), FieldStatus::Unavailable);
        assert_eq!(view.status(LiveField::Summary), FieldStatus::Unavailable);
        assert!(!view.is_settled());
    }

    #[test]
    fn test_absent_fields_not_serialized() {
        let mut bundle = LiveDataBundle::new("lisbon");
        bundle.apply(weather(20.0));
        let value = serde_json::to_value(&bundle).unwrap();
        assert!(value.get("weather").is_some());
        assert!(value.get("summary").is_none());
    }
}
