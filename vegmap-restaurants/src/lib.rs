pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;

use std::sync::Arc;

use axum::routing::{get, patch, post, put};
use axum::{middleware, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::trace::TraceLayer;

use vegmap_shared::clients::db::DbPool;
use vegmap_shared::middleware::metrics_middleware;

use crate::routes::{admin, health, restaurants, side_dishes, suggestions};

pub struct AppState {
    pub db: DbPool,
    pub config: config::AppConfig,
    pub metrics_handle: Option<PrometheusHandle>,
}

pub fn router(state: Arc<AppState>) -> Router {
    let admin_routes = Router::new()
        .route("/restaurants", get(admin::list_restaurants).post(admin::create_restaurant))
        .route(
            "/restaurants/:id",
            patch(admin::update_restaurant).delete(admin::delete_restaurant),
        )
        .route(
            "/side-dishes/:id",
            patch(side_dishes::update_side_dish).delete(side_dishes::delete_side_dish),
        )
        .route("/suggestions", get(suggestions::list_suggestions))
        .route("/suggestions/:id/review", put(suggestions::review_suggestion))
        .route("/suggestions/:id/apply", post(suggestions::apply_suggestion));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/restaurants", get(restaurants::list_restaurants))
        .route("/restaurants/search", get(restaurants::search_restaurants))
        .route("/restaurants/browse", post(restaurants::browse_restaurants))
        .route("/restaurants/:id", get(restaurants::get_restaurant))
        .route(
            "/restaurants/:id/side-dishes",
            get(side_dishes::list_side_dishes).post(side_dishes::create_side_dish),
        )
        .route("/restaurants/:id/suggestions", post(suggestions::create_suggestion))
        .nest("/admin", admin_routes)
        .route_layer(middleware::from_fn(metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use diesel::r2d2::{ConnectionManager, Pool};
    use diesel::PgConnection;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use std::time::Duration;
    use tower::ServiceExt;
    use vegmap_shared::middleware::DEV_JWT_SECRET;
    use vegmap_shared::types::auth::{Claims, UserRole};

    /// A pool that never connects; handlers that reach the database fail.
    fn app() -> Router {
        let pool = Pool::builder()
            .connection_timeout(Duration::from_millis(250))
            .build_unchecked(ConnectionManager::<PgConnection>::new("postgres://127.0.0.1:1/unreachable"));
        router(Arc::new(AppState {
            db: pool,
            config: config::AppConfig::default(),
            metrics_handle: None,
        }))
    }

    fn bearer(role: UserRole) -> String {
        let token = encode(
            &Header::default(),
            &Claims::new("user_123", role, 300),
            &EncodingKey::from_secret(DEV_JWT_SECRET.as_bytes()),
        )
        .unwrap();
        format!("Bearer {token}")
    }

    #[tokio::test]
    async fn admin_routes_require_admin_role() {
        std::env::remove_var("JWT_SECRET");

        let anonymous = app()
            .oneshot(Request::get("/admin/suggestions").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

        let user = app()
            .oneshot(
                Request::delete("/admin/restaurants/7d1c1f7e-4c1b-4bb0-9f4e-2d7f1b6a9c11")
                    .header("Authorization", bearer(UserRole::User))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(user.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn contributions_require_sign_in() {
        std::env::remove_var("JWT_SECRET");
        let response = app()
            .oneshot(
                Request::post("/restaurants/7d1c1f7e-4c1b-4bb0-9f4e-2d7f1b6a9c11/suggestions")
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"field_name":"name_en","new_value":"Plant"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn suggestion_for_locked_field_is_rejected_before_the_database() {
        std::env::remove_var("JWT_SECRET");
        let response = app()
            .oneshot(
                Request::post("/restaurants/7d1c1f7e-4c1b-4bb0-9f4e-2d7f1b6a9c11/suggestions")
                    .header("Authorization", bearer(UserRole::User))
                    .header("Content-Type", "application/json")
                    .body(Body::from(r#"{"field_name":"is_verified","new_value":"true"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], false);
    }

    #[tokio::test]
    async fn health_reports_unreachable_database() {
        let response = app()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
