use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use diesel::RunQueryDsl;

use vegmap_shared::{HealthCheck, HealthResponse, HealthStatus};

use crate::AppState;

fn ping(state: &AppState) -> Result<(), String> {
    let mut conn = state.db.get().map_err(|e| e.to_string())?;
    diesel::sql_query("SELECT 1")
        .execute(&mut conn)
        .map(|_| ())
        .map_err(|e| e.to_string())
}

pub async fn health_check(State(state): State<Arc<AppState>>) -> Response {
    let response = HealthResponse::healthy("vegmap-restaurants", env!("CARGO_PKG_VERSION"))
        .with_checks(vec![HealthCheck::from_result("postgres", ping(&state))]);

    let status = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    (status, Json(response)).into_response()
}

pub async fn metrics(State(state): State<Arc<AppState>>) -> String {
    state
        .metrics_handle
        .as_ref()
        .map(|handle| handle.render())
        .unwrap_or_default()
}
