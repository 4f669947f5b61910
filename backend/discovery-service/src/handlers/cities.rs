/// Catalog API Handlers
use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{AppState, LimitQuery};
use crate::error::{AppError, Result};
use crate::models::CityRecord;
use crate::services::catalog::{Catalog, SortKey};
use crate::services::personalization::SimilarCity;

/// Query parameters for GET /api/v1/cities
#[derive(Debug, Default, Deserialize)]
pub struct CityListQuery {
    /// Free-text match on name, country or tag
    pub q: Option<String>,
    pub continent: Option<String>,
    pub sort: Option<SortKey>,
}

#[derive(Debug, Serialize)]
pub struct CityListResponse<'a> {
    pub cities: Vec<&'a CityRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SimilarCitiesResponse {
    pub city_id: String,
    pub similar: Vec<SimilarCity>,
    pub count: usize,
}

/// GET /api/v1/cities
#[get("/api/v1/cities")]
pub async fn list_cities(
    query: web::Query<CityListQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let mut cities = match query.q.as_deref() {
        Some(text) => state.catalog.search(text),
        None => state.catalog.all().iter().collect(),
    };

    if let Some(continent) = query.continent.as_deref() {
        cities.retain(|city| city.continent.eq_ignore_ascii_case(continent));
    }

    if let Some(key) = query.sort {
        Catalog::sort(&mut cities, key);
    }

    debug!(q = ?query.q, continent = ?query.continent, matched = cities.len(), "Listing cities");

    let count = cities.len();
    Ok(HttpResponse::Ok().json(CityListResponse { cities, count }))
}

/// GET /api/v1/cities/{id}
#[get("/api/v1/cities/{id}")]
pub async fn get_city(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let city_id = path.into_inner();
    let city = state
        .catalog
        .lookup(&city_id)
        .ok_or(AppError::NotFound(city_id))?;

    Ok(HttpResponse::Ok().json(city))
}

/// GET /api/v1/cities/{id}/similar
#[get("/api/v1/cities/{id}/similar")]
pub async fn similar_cities(
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let city_id = path.into_inner();
    let similar = state.engine.similar_cities(&city_id, query.clamped())?;

    let count = similar.len();
    Ok(HttpResponse::Ok().json(SimilarCitiesResponse {
        city_id,
        similar,
        count,
    }))
}
