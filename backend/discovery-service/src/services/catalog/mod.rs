/// City Catalog
///
/// Read-only, in-memory set of city records loaded once at startup. Supplies
/// the lookup and listing operations every other component reads through.
use crate::error::{AppError, Result};
use crate::models::{CityRecord, MAX_PRICE_LEVEL, MIN_PRICE_LEVEL};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    Name,
    Rating,
    Popularity,
    PriceAsc,
    PriceDesc,
}

#[derive(Debug, Default)]
pub struct Catalog {
    cities: Vec<CityRecord>,
    index: HashMap<String, usize>,
}

impl Catalog {
    /// Build a catalog, rejecting duplicate ids and out-of-range attributes.
    pub fn new(cities: Vec<CityRecord>) -> Result<Self> {
        let mut index = HashMap::with_capacity(cities.len());

        for (position, city) in cities.iter().enumerate() {
            validate_city(city)?;
            if index.insert(city.id.clone(), position).is_some() {
                return Err(AppError::Catalog(format!("duplicate city id {}", city.id)));
            }
        }

        Ok(Self { cities, index })
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let cities: Vec<CityRecord> = serde_json::from_str(json)?;
        Self::new(cities)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let catalog = Self::from_json(&raw)?;

        info!(path = %path.display(), cities = catalog.len(), "Catalog loaded");

        Ok(catalog)
    }

    pub fn lookup(&self, id: &str) -> Option<&CityRecord> {
        self.index.get(id).map(|&position| &self.cities[position])
    }

    pub fn all(&self) -> &[CityRecord] {
        &self.cities
    }

    pub fn len(&self) -> usize {
        self.cities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cities.is_empty()
    }

    /// Case-insensitive match on name, country or tag.
    pub fn search(&self, text: &str) -> Vec<&CityRecord> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return self.cities.iter().collect();
        }

        self.cities
            .iter()
            .filter(|city| {
                city.name.to_lowercase().contains(&needle)
                    || city.country.to_lowercase().contains(&needle)
                    || city.tags.iter().any(|tag| tag.to_lowercase() == needle)
            })
            .collect()
    }

    pub fn by_continent(&self, continent: &str) -> Vec<&CityRecord> {
        self.cities
            .iter()
            .filter(|city| city.continent.eq_ignore_ascii_case(continent))
            .collect()
    }

    pub fn sort(cities: &mut [&CityRecord], key: SortKey) {
        match key {
            SortKey::Name => cities.sort_by(|a, b| a.name.cmp(&b.name)),
            SortKey::Rating => cities.sort_by(|a, b| {
                b.rating.total_cmp(&a.rating).then_with(|| a.name.cmp(&b.name))
            }),
            SortKey::Popularity => cities.sort_by(|a, b| {
                b.popularity_score
                    .total_cmp(&a.popularity_score)
                    .then_with(|| a.name.cmp(&b.name))
            }),
            SortKey::PriceAsc => cities.sort_by(|a, b| {
                a.price_level.cmp(&b.price_level).then_with(|| a.name.cmp(&b.name))
            }),
            SortKey::PriceDesc => cities.sort_by(|a, b| {
                b.price_level.cmp(&a.price_level).then_with(|| a.name.cmp(&b.name))
            }),
        }
    }
}

fn validate_city(city: &CityRecord) -> Result<()> {
    if city.id.trim().is_empty() {
        return Err(AppError::Catalog("city with empty id".to_string()));
    }
    if !(MIN_PRICE_LEVEL..=MAX_PRICE_LEVEL).contains(&city.price_level) {
        return Err(AppError::Catalog(format!(
            "{}: price level {} out of range",
            city.id, city.price_level
        )));
    }
    if !(0.0..=5.0).contains(&city.rating) {
        return Err(AppError::Catalog(format!(
            "{}: rating {} out of range",
            city.id, city.rating
        )));
    }
    if !(0.0..=100.0).contains(&city.popularity_score) {
        return Err(AppError::Catalog(format!(
            "{}: popularity {} out of range",
            city.id, city.popularity_score
        )));
    }
    Ok(())
}


#[cfg(test)]
mod tests {
    use super::fixtures::city;
    use super::*;

    fn sample() -> Catalog {
        Catalog::new(vec![
            city("lisbon", &["foodie", "coastal"], "Europe", 2, 4.6),
            city("tokyo", &["foodie", "urban"], "Asia", 4, 4.8),
            city("oslo", &["nature"], "Europe", 5, 4.2),
        ])
        .unwrap()
    }

    #[test]
    fn test_lookup() {
        let catalog = sample();
        assert_eq!(catalog.lookup("tokyo").map(|c| c.price_level), Some(4));
        assert!(catalog.lookup("atlantis").is_none());
        assert_eq!(catalog.all().len(), 3);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Catalog::new(vec![
            city("lisbon", &[], "Europe", 2, 4.0),
            city("lisbon", &[], "Europe", 3, 4.0),
        ]);
        assert!(matches!(result, Err(AppError::Catalog(_))));
    }

    #[test]
    fn test_out_of_range_price_rejected() {
        let result = Catalog::new(vec![city("lisbon", &[], "Europe", 9, 4.0)]);
        assert!(result.is_err());
    }

    #[test]
    fn test_search_and_filter() {
        let catalog = sample();
        let foodie: Vec<&str> = catalog.search("FOODIE").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(foodie, vec!["lisbon", "tokyo"]);
        assert_eq!(catalog.by_continent("europe").len(), 2);
        assert_eq!(catalog.search("  ").len(), 3);
    }

    #[test]
    fn test_sort_by_rating() {
        let catalog = sample();
        let mut cities: Vec<&CityRecord> = catalog.all().iter().collect();
        Catalog::sort(&mut cities, SortKey::Rating);
        let ids: Vec<&str> = cities.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["tokyo", "lisbon", "oslo"]);
    }

    #[test]
    fn test_from_json() {
        let json = r#"[{
            "id": "kyoto", "name": "Kyoto", "country": "Japan",
            "tags": ["culture"], "continent": "Asia", "price_level": 3,
            "rating": 4.7, "popularity_score": 88,
            "coordinates": {"lat": 35.0, "lon": 135.7}
        }]"#;
        let catalog = Catalog::from_json(json).unwrap();
        assert_eq!(catalog.lookup("kyoto").map(|c| c.name.as_str()), Some("Kyoto"));
    }
}
