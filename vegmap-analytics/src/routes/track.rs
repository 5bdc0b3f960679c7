use std::sync::Arc;

use axum::extract::State;
use axum::http::header::{REFERER, USER_AGENT};
use axum::http::HeaderMap;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use vegmap_shared::errors::{AppError, AppResult, ErrorCode};
use vegmap_shared::middleware::{OptionalAuthUser, SessionToken};
use vegmap_shared::types::api::ApiResponse;

use crate::services::identity::resolve_actor;
use crate::services::recorder::{self, SearchEvent};
use crate::store::VisitContext;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct TrackingAck {
    pub session_id: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrackRestaurantViewRequest {
    pub restaurant_id: Uuid,
    #[validate(length(max = 50, message = "source must be at most 50 characters"))]
    pub source: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct TrackSearchRequest {
    #[validate(length(min = 1, max = 500, message = "query_text must be 1 to 500 characters"))]
    pub query_text: String,
    #[validate(length(max = 50, message = "filter_category must be at most 50 characters"))]
    pub filter_category: Option<String>,
    #[serde(default)]
    #[validate(range(min = 0, message = "results_count must not be negative"))]
    pub results_count: i32,
}

fn check<T: Validate>(req: &T) -> AppResult<()> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::InvalidTrackingEvent, e.to_string()))
}

/// Success envelope, plus `Set-Cookie` when the session was just minted.
fn acknowledge(state: &AppState, session: &SessionToken) -> Response {
    let mut response = Json(ApiResponse::ok(TrackingAck { session_id: session.id.clone() })).into_response();
    session.apply(response.headers_mut(), state.config.secure_cookies);
    response
}

fn header_text(headers: &HeaderMap, name: axum::http::HeaderName) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// POST /track/visit/start
pub async fn start_visit(
    State(state): State<Arc<AppState>>,
    session: SessionToken,
    OptionalAuthUser(user): OptionalAuthUser,
    headers: HeaderMap,
) -> Response {
    let store = state.store.as_ref();
    let actor = resolve_actor(store, &session, user.as_ref());
    let context = VisitContext {
        user_agent: header_text(&headers, USER_AGENT),
        referrer: header_text(&headers, REFERER),
    };
    recorder::start_visit(store, &actor, context, Utc::now());
    acknowledge(&state, &session)
}

/// POST /track/visit/end
pub async fn end_visit(State(state): State<Arc<AppState>>, session: SessionToken) -> Response {
    if !session.minted {
        recorder::end_visit(state.store.as_ref(), &session.id, Utc::now());
    }
    acknowledge(&state, &session)
}

/// POST /track/page-view
pub async fn page_view(
    State(state): State<Arc<AppState>>,
    session: SessionToken,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Response {
    let store = state.store.as_ref();
    let actor = resolve_actor(store, &session, user.as_ref());
    recorder::track_page_view(store, &actor, Utc::now());
    acknowledge(&state, &session)
}

/// POST /track/restaurant-view
pub async fn restaurant_view(
    State(state): State<Arc<AppState>>,
    session: SessionToken,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(req): Json<TrackRestaurantViewRequest>,
) -> AppResult<Response> {
    check(&req)?;

    let store = state.store.as_ref();
    let actor = resolve_actor(store, &session, user.as_ref());
    recorder::track_restaurant_view(store, &actor, req.restaurant_id, req.source, Utc::now());
    Ok(acknowledge(&state, &session))
}

/// POST /track/search
pub async fn search(
    State(state): State<Arc<AppState>>,
    session: SessionToken,
    OptionalAuthUser(user): OptionalAuthUser,
    Json(req): Json<TrackSearchRequest>,
) -> AppResult<Response> {
    check(&req)?;
    let query_text = req.query_text.trim();
    if query_text.is_empty() {
        return Err(AppError::new(ErrorCode::InvalidTrackingEvent, "query_text must not be blank"));
    }

    let store = state.store.as_ref();
    let actor = resolve_actor(store, &session, user.as_ref());
    let event = SearchEvent {
        query_text: query_text.to_string(),
        filter_category: req.filter_category,
        results_count: req.results_count,
    };
    recorder::track_search(store, &actor, event, Utc::now());
    Ok(acknowledge(&state, &session))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::store::memory::MemoryActivityStore;
    use axum::body::{to_bytes, Body};
    use axum::http::header::{COOKIE, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn app(store: Arc<MemoryActivityStore>) -> axum::Router {
        crate::router(Arc::new(AppState {
            store,
            config: AppConfig::default(),
            metrics_handle: None,
        }))
    }

    fn post(uri: &str, cookie: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::post(uri).header("content-type", "application/json");
        if let Some(c) = cookie {
            builder = builder.header(COOKIE, c);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn first_contact_mints_session_cookie() {
        let store = Arc::new(MemoryActivityStore::new());
        let response = app(store.clone())
            .oneshot(post("/track/page-view", None, serde_json::json!({})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let cookie = response.headers().get(SET_COOKIE).unwrap().to_str().unwrap().to_string();
        assert!(cookie.starts_with("session_id="));

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        let session_id = json["data"]["session_id"].as_str().unwrap();
        assert_eq!(store.snapshot_visits()[0].session_id, session_id);
        assert_eq!(store.snapshot_visits()[0].page_views, 1);
    }

    #[tokio::test]
    async fn repeated_views_share_one_visit() {
        let store = Arc::new(MemoryActivityStore::new());
        let restaurant_id = Uuid::new_v4();
        for _ in 0..3 {
            let response = app(store.clone())
                .oneshot(post(
                    "/track/restaurant-view",
                    Some("session_id=browser-1"),
                    serde_json::json!({ "restaurant_id": restaurant_id }),
                ))
                .await
                .unwrap();
            assert!(response.headers().get(SET_COOKIE).is_none());
        }

        let visits = store.snapshot_visits();
        assert_eq!(visits.len(), 1);
        assert_eq!(visits[0].restaurants_viewed, 3);
        assert_eq!(store.snapshot_views().len(), 3);
    }

    #[tokio::test]
    async fn tracking_succeeds_when_store_is_down() {
        let store = Arc::new(MemoryActivityStore::new());
        store.fail_writes(true);
        let response = app(store)
            .oneshot(post(
                "/track/search",
                Some("session_id=browser-1"),
                serde_json::json!({ "query_text": "tofu" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn blank_search_is_rejected() {
        let store = Arc::new(MemoryActivityStore::new());
        let response = app(store.clone())
            .oneshot(post("/track/search", None, serde_json::json!({ "query_text": "   " })))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(store.snapshot_searches().is_empty());
    }

    #[tokio::test]
    async fn oversized_labels_are_rejected_before_recording() {
        let store = Arc::new(MemoryActivityStore::new());
        let long = "x".repeat(51);

        let response = app(store.clone())
            .oneshot(post(
                "/track/restaurant-view",
                Some("session_id=browser-1"),
                serde_json::json!({ "restaurant_id": Uuid::new_v4(), "source": long }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(store.clone())
            .oneshot(post(
                "/track/search",
                Some("session_id=browser-1"),
                serde_json::json!({ "query_text": "tofu", "filter_category": long }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app(store.clone())
            .oneshot(post(
                "/track/search",
                Some("session_id=browser-1"),
                serde_json::json!({ "query_text": "tofu", "results_count": -1 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        assert!(store.snapshot_visits().is_empty());
        assert!(store.snapshot_views().is_empty());
        assert!(store.snapshot_searches().is_empty());
    }

    #[tokio::test]
    async fn visit_start_captures_request_context() {
        let store = Arc::new(MemoryActivityStore::new());
        let request = Request::post("/track/visit/start")
            .header(COOKIE, "session_id=browser-1")
            .header(USER_AGENT, "Mozilla/5.0")
            .header(REFERER, "https://search.naver.com")
            .body(Body::empty())
            .unwrap();
        app(store.clone()).oneshot(request).await.unwrap();

        let visit = &store.snapshot_visits()[0];
        assert_eq!(visit.user_agent.as_deref(), Some("Mozilla/5.0"));
        assert_eq!(visit.referrer.as_deref(), Some("https://search.naver.com"));
        assert!(visit.is_open());
    }
}
