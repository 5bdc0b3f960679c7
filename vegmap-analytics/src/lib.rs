pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use vegmap_shared::middleware::metrics_middleware;

use crate::routes::{health, progress, stats, track};
use crate::store::ActivityStore;

pub struct AppState {
    pub store: Arc<dyn ActivityStore>,
    pub config: config::AppConfig,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/track/visit/start", post(track::start_visit))
        .route("/track/visit/end", post(track::end_visit))
        .route("/track/page-view", post(track::page_view))
        .route("/track/restaurant-view", post(track::restaurant_view))
        .route("/track/search", post(track::search))
        .route("/progress/me", get(progress::my_progress))
        .route("/stats/dashboard", get(stats::dashboard))
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
