use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::models::{
    CountryProgress, NewVisit, TravelStats, TripEntry, Visit, VisitPatch, VisitedSnapshot,
};
use crate::store::VisitedStore;

pub struct AppState {
    pub store: Arc<VisitedStore>,
}

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub message: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryAdded {
    pub country_code: String,
    pub added: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryRemoved {
    pub country_code: String,
    pub removed_visits: usize,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn not_found(what: &str) -> ApiError {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse {
            error: format!("{} not found", what),
        }),
    )
}

fn bad_request(message: &str) -> ApiError {
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: message.to_string(),
        }),
    )
}

/// Full visited state
pub async fn get_state(State(state): State<Arc<AppState>>) -> Json<VisitedSnapshot> {
    Json(state.store.snapshot())
}

/// The four widget aggregates
pub async fn get_stats(State(state): State<Arc<AppState>>) -> Json<TravelStats> {
    Json(state.store.stats())
}

pub async fn list_trips(State(state): State<Arc<AppState>>) -> Json<Vec<TripEntry>> {
    Json(state.store.trips())
}

pub async fn list_country_progress(
    State(state): State<Arc<AppState>>,
) -> Json<Vec<CountryProgress>> {
    Json(state.store.country_progress())
}

/// Record a new visit
pub async fn create_visit(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<NewVisit>,
) -> Result<(StatusCode, Json<Visit>), ApiError> {
    if payload.region_code.trim().is_empty() {
        return Err(bad_request("regionCode cannot be empty"));
    }
    if payload.country_code.trim().is_empty() {
        return Err(bad_request("countryCode cannot be empty"));
    }

    let visit = state.store.add_visit(payload);
    Ok((StatusCode::CREATED, Json(visit)))
}

pub async fn get_visit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Visit>, ApiError> {
    state
        .store
        .get_visit(&id)
        .map(Json)
        .ok_or_else(|| not_found("Visit"))
}

/// Change a visit's dates
pub async fn update_visit(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(patch): Json<VisitPatch>,
) -> Result<Json<Visit>, ApiError> {
    if patch.is_empty() {
        return Err(bad_request("Provide dateFrom and/or dateTo"));
    }

    state
        .store
        .update_visit(&id, patch)
        .map(Json)
        .ok_or_else(|| not_found("Visit"))
}

/// Delete a visit; unknown ids are accepted
pub async fn delete_visit(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    state.store.remove_visit(&id);
    StatusCode::NO_CONTENT
}

/// Remove all travel data
pub async fn clear_visits(State(state): State<Arc<AppState>>) -> StatusCode {
    state.store.clear_all();
    StatusCode::NO_CONTENT
}

pub async fn list_region_visits(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<Vec<Visit>> {
    Json(state.store.get_visits(&code))
}

/// Mark a country visited without a region
pub async fn add_country(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<CountryAdded> {
    let added = state.store.add_country(&code);
    Json(CountryAdded {
        country_code: code,
        added,
    })
}

/// Unmark a country and drop its visits
pub async fn remove_country(
    State(state): State<Arc<AppState>>,
    Path(code): Path<String>,
) -> Json<CountryRemoved> {
    let removed_visits = state.store.remove_country(&code);
    Json(CountryRemoved {
        country_code: code,
        removed_visits,
    })
}

/// Health check endpoint
pub async fn health_check() -> Json<SuccessResponse> {
    Json(SuccessResponse {
        message: "OK".to_string(),
    })
}
