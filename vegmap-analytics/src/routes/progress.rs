use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use vegmap_shared::middleware::OptionalAuthUser;
use vegmap_shared::types::api::ApiResponse;

use crate::services::identity::resolve_user_id;
use crate::services::progress::{get_user_progress, UserProgress};
use crate::AppState;

/// GET /progress/me
/// `data` is null for anonymous or not-yet-synced callers, and when the
/// aggregation could not be computed.
pub async fn my_progress(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
) -> Json<ApiResponse<Option<UserProgress>>> {
    if user.is_none() {
        return Json(ApiResponse::no_data("sign in to see your progress"));
    }

    let store = state.store.as_ref();
    let Some(user_id) = resolve_user_id(store, user.as_ref()) else {
        return Json(ApiResponse::no_data("account is not synced yet"));
    };

    Json(ApiResponse::from_option(
        get_user_progress(store, Some(user_id)),
        "progress is unavailable right now",
    ))
}
