use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use vegmap_shared::middleware::AdminUser;
use vegmap_shared::types::api::ApiResponse;

use crate::services::dashboard::{get_dashboard_stats, DashboardStats};
use crate::AppState;

/// GET /stats/dashboard
/// Site-wide statistics. Requires AdminUser. `data` is null when any
/// underlying read failed.
pub async fn dashboard(
    AdminUser(admin): AdminUser,
    State(state): State<Arc<AppState>>,
) -> Json<ApiResponse<Option<DashboardStats>>> {
    tracing::debug!(admin = %admin.external_id, "dashboard requested");
    let stats = get_dashboard_stats(
        state.store.as_ref(),
        Utc::now(),
        state.config.activity_window_days,
    );
    Json(ApiResponse::from_option(stats, "dashboard data is unavailable"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::memory::MemoryActivityStore;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use tower::ServiceExt;
    use vegmap_shared::middleware::DEV_JWT_SECRET;
    use vegmap_shared::types::auth::{Claims, UserRole};

    fn request(role: Option<UserRole>) -> Request<Body> {
        let mut builder = Request::get("/stats/dashboard");
        if let Some(role) = role {
            let token = encode(
                &Header::default(),
                &Claims::new("user_admin", role, 300),
                &EncodingKey::from_secret(DEV_JWT_SECRET.as_bytes()),
            )
            .unwrap();
            builder = builder.header("Authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    fn app(store: Arc<MemoryActivityStore>) -> axum::Router {
        crate::router(Arc::new(AppState {
            store,
            config: AppConfig::default(),
            metrics_handle: None,
        }))
    }

    #[tokio::test]
    async fn requires_admin() {
        std::env::remove_var("JWT_SECRET");
        let store = Arc::new(MemoryActivityStore::new());
        let anonymous = app(store.clone()).oneshot(request(None)).await.unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let user = app(store).oneshot(request(Some(UserRole::User))).await.unwrap();
        assert_eq!(user.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn read_failure_returns_null_data() {
        std::env::remove_var("JWT_SECRET");
        let store = Arc::new(MemoryActivityStore::new());
        store.fail_reads(true);
        let response = app(store).oneshot(request(Some(UserRole::Admin))).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert!(json["data"].is_null());
        assert_eq!(json["message"], "dashboard data is unavailable");
    }
}
