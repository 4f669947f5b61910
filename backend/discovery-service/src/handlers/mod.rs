/// HTTP handlers
///
/// JSON glue between actix-web and the discovery services. Session-scoped
/// routes live under `/api/v1/sessions/{session_id}`.
use actix_web::{get, web, HttpResponse};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::services::{Catalog, PersonalizationEngine, SessionRegistry};

pub mod cities;
pub mod sessions;

const DEFAULT_LIMIT: usize = 10;
const MAX_LIMIT: usize = 50;

/// Shared state handed to every handler
pub struct AppState {
    pub service_name: String,
    pub catalog: Arc<Catalog>,
    pub engine: Arc<PersonalizationEngine>,
    pub sessions: Arc<SessionRegistry>,
}

/// `?limit=` parameter shared by the list endpoints
#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

impl LimitQuery {
    pub fn clamped(&self) -> usize {
        self.limit.clamp(1, MAX_LIMIT)
    }
}

#[derive(Debug, Serialize)]
struct HealthResponse<'a> {
    status: &'static str,
    service: &'a str,
    cities: usize,
    active_sessions: usize,
}

#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(HealthResponse {
        status: "ok",
        service: &state.service_name,
        cities: state.catalog.len(),
        active_sessions: state.sessions.len(),
    })
}

/// Register every route on an actix `App`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(health)
        .service(cities::list_cities)
        .service(cities::get_city)
        .service(cities::similar_cities)
        .service(sessions::update_profile)
        .service(sessions::greeting)
        .service(sessions::recommendations)
        .service(sessions::recent)
        .service(sessions::toggle_saved)
        .service(sessions::save_city)
        .service(sessions::unsave_city)
        .service(sessions::explore_section)
        .service(sessions::record_interaction)
        .service(sessions::visit_record)
        .service(sessions::open_page)
        .service(sessions::live_view)
        .service(sessions::close_page)
        .service(sessions::end_session);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_clamped() {
        assert_eq!(LimitQuery { limit: 0 }.clamped(), 1);
        assert_eq!(LimitQuery { limit: 7 }.clamped(), 7);
        assert_eq!(LimitQuery { limit: 500 }.clamped(), MAX_LIMIT);
        assert_eq!(default_limit(), 10);
    }
}
