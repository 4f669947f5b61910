/// Session API Handlers
///
/// Behavior recording, personalization and city page lifecycle for one
/// browsing session. Sessions are created on first use and end on
/// `DELETE` or after sitting idle past the configured TTL.
use actix_web::{delete, get, post, put, web, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use super::{AppState, LimitQuery};
use crate::error::{AppError, Result};
use crate::models::{CityRecord, InteractionEvent, InteractionKind, UserProfile};
use crate::services::personalization::Recommendation;
use crate::services::session::{validate_session_id, Session};

#[derive(Debug, Serialize)]
pub struct RecommendationsResponse {
    pub eligible: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Recommendation>>,
}

#[derive(Debug, Serialize)]
pub struct RecentResponse {
    pub cities: Vec<CityRecord>,
    pub count: usize,
}

#[derive(Debug, Serialize)]
pub struct SavedResponse {
    pub city_id: String,
    pub saved: bool,
    pub changed: bool,
}

/// Toggle result; the new state is the only thing a flip can report.
#[derive(Debug, Serialize)]
pub struct ToggleSavedResponse {
    pub city_id: String,
    pub saved: bool,
}

#[derive(Debug, Serialize)]
pub struct SectionResponse {
    pub city_id: String,
    pub section_id: String,
    pub newly_explored: bool,
}

#[derive(Debug, Serialize)]
pub struct ClosedResponse {
    pub closed: bool,
}

#[derive(Debug, Serialize)]
pub struct SessionEndedResponse {
    pub session_id: String,
    pub removed: bool,
}

/// Request body for POST .../cities/{city_id}/interactions
#[derive(Debug, Deserialize)]
pub struct InteractionRequest {
    pub kind: InteractionKind,
    #[serde(default)]
    pub target: String,
}

fn load_session(state: &AppState, session_id: &str) -> Result<Arc<Session>> {
    state.sessions.get_or_create(session_id)
}

fn require_city<'a>(state: &'a AppState, city_id: &str) -> Result<&'a CityRecord> {
    state
        .catalog
        .lookup(city_id)
        .ok_or_else(|| AppError::NotFound(city_id.to_string()))
}

/// PUT /api/v1/sessions/{session_id}/profile
#[put("/api/v1/sessions/{session_id}/profile")]
pub async fn update_profile(
    path: web::Path<String>,
    body: web::Json<UserProfile>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = load_session(&state, &path)?;
    session.store.set_profile(body.into_inner())?;

    Ok(HttpResponse::Ok().json(session.store.profile()))
}

/// GET /api/v1/sessions/{session_id}/greeting
#[get("/api/v1/sessions/{session_id}/greeting")]
pub async fn greeting(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = load_session(&state, &path)?;
    let greeting = state
        .engine
        .personalized_greeting(&session.store.snapshot(), Utc::now());

    Ok(HttpResponse::Ok().json(greeting))
}

/// GET /api/v1/sessions/{session_id}/recommendations
#[get("/api/v1/sessions/{session_id}/recommendations")]
pub async fn recommendations(
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = load_session(&state, &path)?;
    let items = state
        .engine
        .personalized_section(&session.store.snapshot(), query.clamped());

    debug!(
        session_id = %session.id,
        eligible = items.is_some(),
        "Serving recommendations"
    );

    Ok(HttpResponse::Ok().json(RecommendationsResponse {
        eligible: items.is_some(),
        items,
    }))
}

/// GET /api/v1/sessions/{session_id}/recent
#[get("/api/v1/sessions/{session_id}/recent")]
pub async fn recent(
    path: web::Path<String>,
    query: web::Query<LimitQuery>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session = load_session(&state, &path)?;
    let cities: Vec<CityRecord> = session
        .store
        .recently_visited(query.clamped())
        .iter()
        .filter_map(|city_id| state.catalog.lookup(city_id).cloned())
        .collect();

    let count = cities.len();
    Ok(HttpResponse::Ok().json(RecentResponse { cities, count }))
}

/// POST /api/v1/sessions/{session_id}/saved/{city_id}
/// Flip the saved flag
#[post("/api/v1/sessions/{session_id}/saved/{city_id}")]
pub async fn toggle_saved(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (session_id, city_id) = path.into_inner();
    let session = load_session(&state, &session_id)?;
    require_city(&state, &city_id)?;

    let saved = session.store.toggle_saved(&city_id);
    Ok(HttpResponse::Ok().json(ToggleSavedResponse { city_id, saved }))
}

/// PUT /api/v1/sessions/{session_id}/saved/{city_id}
#[put("/api/v1/sessions/{session_id}/saved/{city_id}")]
pub async fn save_city(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    set_saved(path.into_inner(), &state, true)
}

/// DELETE /api/v1/sessions/{session_id}/saved/{city_id}
#[delete("/api/v1/sessions/{session_id}/saved/{city_id}")]
pub async fn unsave_city(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    set_saved(path.into_inner(), &state, false)
}

fn set_saved(
    (session_id, city_id): (String, String),
    state: &AppState,
    saved: bool,
) -> Result<HttpResponse> {
    let session = load_session(state, &session_id)?;
    require_city(state, &city_id)?;

    let changed = session.store.set_saved(&city_id, saved);
    Ok(HttpResponse::Ok().json(SavedResponse {
        city_id,
        saved,
        changed,
    }))
}

/// POST /api/v1/sessions/{session_id}/cities/{city_id}/sections/{section_id}
#[post("/api/v1/sessions/{session_id}/cities/{city_id}/sections/{section_id}")]
pub async fn explore_section(
    path: web::Path<(String, String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (session_id, city_id, section_id) = path.into_inner();
    if section_id.trim().is_empty() {
        return Err(AppError::Validation("section id must not be empty".to_string()));
    }
    let session = load_session(&state, &session_id)?;
    require_city(&state, &city_id)?;

    let newly_explored = session.store.record_section_explored(&city_id, &section_id);
    Ok(HttpResponse::Ok().json(SectionResponse {
        city_id,
        section_id,
        newly_explored,
    }))
}

/// POST /api/v1/sessions/{session_id}/cities/{city_id}/interactions
#[post("/api/v1/sessions/{session_id}/cities/{city_id}/interactions")]
pub async fn record_interaction(
    path: web::Path<(String, String)>,
    body: web::Json<InteractionRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (session_id, city_id) = path.into_inner();
    let session = load_session(&state, &session_id)?;
    require_city(&state, &city_id)?;

    let InteractionRequest { kind, target } = body.into_inner();
    session
        .store
        .record_interaction(&city_id, InteractionEvent::now(kind, target));

    Ok(HttpResponse::Accepted().finish())
}

/// GET /api/v1/sessions/{session_id}/cities/{city_id}/visit
#[get("/api/v1/sessions/{session_id}/cities/{city_id}/visit")]
pub async fn visit_record(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (session_id, city_id) = path.into_inner();
    let session = load_session(&state, &session_id)?;
    let record = session
        .store
        .visit_record(&city_id)
        .ok_or(AppError::NotFound(city_id))?;

    Ok(HttpResponse::Ok().json(record))
}

/// POST /api/v1/sessions/{session_id}/pages/{city_id}
/// Open a city page: counts the visit and starts the live-data fan-out
#[post("/api/v1/sessions/{session_id}/pages/{city_id}")]
pub async fn open_page(
    path: web::Path<(String, String)>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let (session_id, city_id) = path.into_inner();
    let session = load_session(&state, &session_id)?;
    let view = session.page.open(&city_id)?;

    Ok(HttpResponse::Ok().json(view))
}

/// GET /api/v1/sessions/{session_id}/live
#[get("/api/v1/sessions/{session_id}/live")]
pub async fn live_view(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = load_session(&state, &path)?;
    Ok(HttpResponse::Ok().json(session.page.live()))
}

/// DELETE /api/v1/sessions/{session_id}/pages
#[delete("/api/v1/sessions/{session_id}/pages")]
pub async fn close_page(path: web::Path<String>, state: web::Data<AppState>) -> Result<HttpResponse> {
    let session = load_session(&state, &path)?;
    Ok(HttpResponse::Ok().json(ClosedResponse {
        closed: session.page.close(),
    }))
}

/// DELETE /api/v1/sessions/{session_id}
/// End the session: closes its page and drops its behavior
#[delete("/api/v1/sessions/{session_id}")]
pub async fn end_session(
    path: web::Path<String>,
    state: web::Data<AppState>,
) -> Result<HttpResponse> {
    let session_id = path.into_inner();
    validate_session_id(&session_id)?;

    let removed = state.sessions.remove(&session_id);
    debug!(session_id = %session_id, removed, "Session ended");

    Ok(HttpResponse::Ok().json(SessionEndedResponse {
        session_id,
        removed,
    }))
}
