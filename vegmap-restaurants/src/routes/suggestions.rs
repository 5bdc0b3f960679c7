use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use vegmap_shared::errors::{AppError, AppResult, ErrorCode};
use vegmap_shared::middleware::AdminUser;
use vegmap_shared::types::api::ApiResponse;
use vegmap_shared::types::auth::AuthUser;
use vegmap_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{EditSuggestion, NewEditSuggestion, Restaurant, SuggestionStatus};
use crate::schema::{restaurant_edit_suggestions, restaurants};
use crate::services::identity::require_user_id;
use crate::services::suggestions::EditableField;
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSuggestionRequest {
    pub field_name: String,
    #[validate(length(max = 2000, message = "new_value must be at most 2000 characters"))]
    pub new_value: String,
}

#[derive(Debug, Deserialize)]
pub struct SuggestionFilterParams {
    #[serde(default = "default_page")]
    pub page: u64,
    #[serde(default = "default_per_page")]
    pub per_page: u64,
    pub status: Option<SuggestionStatus>,
}

fn default_page() -> u64 { 1 }
fn default_per_page() -> u64 { 20 }

impl SuggestionFilterParams {
    fn pagination(&self) -> PaginationParams {
        PaginationParams {
            page: self.page,
            per_page: self.per_page,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ReviewSuggestionRequest {
    pub status: SuggestionStatus, // "approved" or "rejected"
}

fn load_suggestion(conn: &mut PgConnection, suggestion_id: Uuid) -> AppResult<EditSuggestion> {
    restaurant_edit_suggestions::table
        .find(suggestion_id)
        .first::<EditSuggestion>(conn)
        .optional()
        .map_err(|e| AppError::internal(format!("db error: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::SuggestionNotFound, "suggestion not found"))
}

fn load_restaurant(conn: &mut PgConnection, restaurant_id: Uuid) -> AppResult<Restaurant> {
    restaurants::table
        .find(restaurant_id)
        .first::<Restaurant>(conn)
        .optional()
        .map_err(|e| AppError::internal(format!("db error: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound, "restaurant not found"))
}

// --- Signed-in users: propose a change ---

pub async fn create_suggestion(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(restaurant_id): Path<Uuid>,
    Json(req): Json<CreateSuggestionRequest>,
) -> AppResult<Json<ApiResponse<EditSuggestion>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let field = EditableField::parse(req.field_name.trim())?;
    // Reject values that could never be applied.
    field.to_changes(&req.new_value, Utc::now())?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let restaurant = load_restaurant(&mut conn, restaurant_id)?;
    let user_id = require_user_id(&mut conn, &auth)?;

    let new_suggestion = NewEditSuggestion {
        restaurant_id,
        suggested_by: user_id,
        field_name: field.as_str().to_string(),
        old_value: field.current_value(&restaurant),
        new_value: req.new_value.trim().to_string(),
        status: SuggestionStatus::Pending.as_str().to_string(),
    };

    let suggestion: EditSuggestion = diesel::insert_into(restaurant_edit_suggestions::table)
        .values(&new_suggestion)
        .get_result(&mut conn)
        .map_err(|e| AppError::internal(format!("failed to create suggestion: {e}")))?;

    tracing::info!(
        suggestion_id = %suggestion.id,
        restaurant_id = %restaurant_id,
        field = field.as_str(),
        "edit suggestion submitted"
    );

    Ok(Json(ApiResponse::ok_with_message(
        suggestion,
        "thanks, an admin will review your suggestion",
    )))
}

// --- Admin: review queue ---

pub async fn list_suggestions(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(params): Query<SuggestionFilterParams>,
) -> AppResult<Json<ApiResponse<Paginated<EditSuggestion>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let pagination = params.pagination();
    let offset = pagination.offset() as i64;
    let limit = pagination.limit() as i64;

    let mut items_query = restaurant_edit_suggestions::table.into_boxed();
    let mut count_query = restaurant_edit_suggestions::table.into_boxed();
    if let Some(status) = params.status {
        items_query = items_query.filter(restaurant_edit_suggestions::status.eq(status.as_str()));
        count_query = count_query.filter(restaurant_edit_suggestions::status.eq(status.as_str()));
    }

    let items = items_query
        .order(restaurant_edit_suggestions::created_at.desc())
        .offset(offset)
        .limit(limit)
        .load::<EditSuggestion>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    let total: i64 = count_query
        .count()
        .get_result(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    let paginated = Paginated::new(items, total as u64, &pagination);
    Ok(Json(ApiResponse::ok(paginated)))
}

// --- Admin: approve / reject ---

pub async fn review_suggestion(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Path(suggestion_id): Path<Uuid>,
    Json(body): Json<ReviewSuggestionRequest>,
) -> AppResult<Json<ApiResponse<EditSuggestion>>> {
    if body.status == SuggestionStatus::Pending {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            "status must be 'approved' or 'rejected'",
        ));
    }

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let reviewer_id = require_user_id(&mut conn, &admin.0)?;
    let suggestion = load_suggestion(&mut conn, suggestion_id)?;

    if !suggestion.has_status(SuggestionStatus::Pending) {
        return Err(AppError::new(
            ErrorCode::SuggestionAlreadyReviewed,
            "this suggestion has already been reviewed",
        ));
    }

    // The status guard keeps two concurrent reviews from both succeeding.
    let updated: EditSuggestion = diesel::update(
        restaurant_edit_suggestions::table
            .find(suggestion_id)
            .filter(restaurant_edit_suggestions::status.eq(SuggestionStatus::Pending.as_str())),
    )
    .set((
        restaurant_edit_suggestions::status.eq(body.status.as_str()),
        restaurant_edit_suggestions::reviewed_by.eq(reviewer_id),
        restaurant_edit_suggestions::reviewed_at.eq(Utc::now()),
    ))
    .get_result(&mut conn)
    .optional()
    .map_err(|e| AppError::internal(format!("failed to update suggestion: {e}")))?
    .ok_or_else(|| {
        AppError::new(
            ErrorCode::SuggestionAlreadyReviewed,
            "this suggestion has already been reviewed",
        )
    })?;

    tracing::info!(
        suggestion_id = %suggestion_id,
        status = body.status.as_str(),
        "edit suggestion reviewed"
    );

    Ok(Json(ApiResponse::ok(updated)))
}

// --- Admin: write an approved suggestion to the restaurant ---

pub async fn apply_suggestion(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(suggestion_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    let mut pooled = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;
    let conn: &mut PgConnection = &mut pooled;

    let restaurant = conn.transaction::<Restaurant, AppError, _>(|conn| {
        let suggestion = load_suggestion(conn, suggestion_id)?;

        if !suggestion.has_status(SuggestionStatus::Approved) {
            return Err(AppError::new(
                ErrorCode::SuggestionNotApproved,
                "only approved suggestions can be applied",
            ));
        }

        let field = EditableField::parse(&suggestion.field_name)?;
        let changes = field.to_changes(&suggestion.new_value, Utc::now())?;

        diesel::update(restaurants::table.find(suggestion.restaurant_id))
            .set(&changes)
            .get_result::<Restaurant>(conn)
            .optional()
            .map_err(|e| AppError::internal(format!("failed to apply suggestion: {e}")))?
            .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound, "restaurant not found"))
    })?;

    tracing::info!(suggestion_id = %suggestion_id, restaurant_id = %restaurant.id, "edit suggestion applied");

    Ok(Json(ApiResponse::ok(restaurant)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filter_params_read_status() {
        let params: SuggestionFilterParams =
            serde_json::from_value(serde_json::json!({ "status": "pending" })).unwrap();
        assert_eq!(params.status, Some(SuggestionStatus::Pending));
        assert_eq!(params.pagination().page, 1);
        assert_eq!(params.pagination().per_page, 20);
    }

    #[test]
    fn review_rejects_unknown_status() {
        let parsed = serde_json::from_str::<ReviewSuggestionRequest>(r#"{"status":"maybe"}"#);
        assert!(parsed.is_err());

        let parsed: ReviewSuggestionRequest = serde_json::from_str(r#"{"status":"rejected"}"#).unwrap();
        assert_eq!(parsed.status, SuggestionStatus::Rejected);
    }

    #[test]
    fn overly_long_values_fail_validation() {
        let req = CreateSuggestionRequest {
            field_name: "description_en".into(),
            new_value: "x".repeat(2001),
        };
        assert!(req.validate().is_err());
    }
}
