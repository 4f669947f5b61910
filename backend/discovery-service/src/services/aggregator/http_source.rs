/// Generic JSON-over-HTTP source
///
/// GETs a URL template and decodes the body as the payload of its field.
/// Placeholders: `{city}`, `{country}`, `{lat}`, `{lon}`.
use super::bundle::{LiveField, SourcePayload};
use super::source::{CityQuery, LiveSource, SourceError};
use crate::config::SourcesConfig;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct HttpJsonSource {
    name: String,
    field: LiveField,
    url_template: String,
    client: reqwest::Client,
}

impl HttpJsonSource {
    pub fn new(field: LiveField, url_template: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            name: format!("http:{}", field.as_str()),
            field,
            url_template: url_template.into(),
            client,
        }
    }

    pub fn render_url(&self, query: &CityQuery) -> String {
        self.url_template
            .replace("{city}", &urlencoding::encode(&query.city_name))
            .replace("{country}", &urlencoding::encode(&query.country))
            .replace("{lat}", &query.coordinates.lat.to_string())
            .replace("{lon}", &query.coordinates.lon.to_string())
    }
}

#[async_trait]
impl LiveSource for HttpJsonSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn field(&self) -> LiveField {
        self.field
    }

    async fn fetch(&self, query: &CityQuery) -> Result<SourcePayload, SourceError> {
        let url = self.render_url(query);
        debug!(source = %self.name, city_id = %query.city_id, "Fetching live data");

        let value: serde_json::Value = self
            .client
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(SourcePayload::decode(self.field, value)?)
    }
}

/// One source per configured URL template.
pub fn sources_from_config(
    config: &SourcesConfig,
    client: reqwest::Client,
) -> Vec<Arc<dyn LiveSource>> {
    let templates = [
        (LiveField::Weather, &config.weather_url),
        (LiveField::Forecast, &config.forecast_url),
        (LiveField::Summary, &config.summary_url),
        (LiveField::CountryInfo, &config.country_url),
        (LiveField::Photos, &config.photos_url),
        (LiveField::Attractions, &config.attractions_url),
        (LiveField::Restaurants, &config.restaurants_url),
        (LiveField::RealPhotoAttractions, &config.attraction_photos_url),
        (LiveField::RealPhotoRestaurants, &config.restaurant_photos_url),
    ];

    templates
        .into_iter()
        .filter_map(|(field, template)| {
            template.as_ref().map(|url| {
                Arc::new(HttpJsonSource::new(field, url.clone(), client.clone()))
                    as Arc<dyn LiveSource>
            })
        })
        .collect()
}
