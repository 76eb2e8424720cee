use axum::{
    routing::{get, post, put},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::store::VisitedStore;

use super::handlers::{
    add_country, clear_visits, create_visit, delete_visit, get_state, get_stats, get_visit,
    health_check, list_country_progress, list_region_visits, list_trips, remove_country,
    update_visit, AppState,
};

pub fn create_api_router(store: Arc<VisitedStore>) -> Router {
    let state = Arc::new(AppState { store });

    let api_routes = Router::new()
        .route("/state", get(get_state))
        .route("/stats", get(get_stats))
        .route("/trips", get(list_trips))
        .route("/countries", get(list_country_progress))
        .route("/countries/{code}", put(add_country).delete(remove_country))
        .route("/visits", post(create_visit).delete(clear_visits))
        .route(
            "/visits/{id}",
            get(get_visit).patch(update_visit).delete(delete_visit),
        )
        .route("/regions/{code}/visits", get(list_region_visits))
        .with_state(state);

    Router::new()
        .route("/health", get(health_check))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
}
