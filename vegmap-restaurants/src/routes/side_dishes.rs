use axum::extract::{Path, State};
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

use crate::models::{double_option, NewSideDishNote, SideDishNote, SideDishNoteChanges};
use crate::routes::restaurants::ensure_restaurant_exists;
use crate::schema::restaurant_side_dish_notes;
use crate::services::identity::require_user_id;
use crate::AppState;

// --- Request types ---

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSideDishRequest {
    #[validate(length(min = 1, max = 255, message = "side_dish_name_ko must be 1-255 characters"))]
    pub side_dish_name_ko: String,
    #[validate(length(max = 255))]
    pub side_dish_name_en: Option<String>,
    #[validate(length(max = 2000))]
    pub description_en: Option<String>,
    #[validate(length(max = 2000))]
    pub description_ko: Option<String>,
    #[serde(default)]
    pub is_vegetarian: bool,
    #[serde(default)]
    pub is_vegan: bool,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(max = 500))]
    pub ordering_phrase_ko: Option<String>,
    #[validate(length(max = 500))]
    pub ordering_phrase_en: Option<String>,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateSideDishRequest {
    #[validate(length(min = 1, max = 255, message = "side_dish_name_ko must be 1-255 characters"))]
    pub side_dish_name_ko: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub side_dish_name_en: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description_en: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description_ko: Option<Option<String>>,
    pub is_vegetarian: Option<bool>,
    pub is_vegan: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ordering_phrase_ko: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ordering_phrase_en: Option<Option<String>>,
    pub is_verified: Option<bool>,
}

impl CreateSideDishRequest {
    /// Community notes start unverified; a vegan dish is always vegetarian.
    fn into_new(self, restaurant_id: Uuid, created_by: Uuid) -> NewSideDishNote {
        NewSideDishNote {
            restaurant_id,
            side_dish_name_ko: self.side_dish_name_ko.trim().to_string(),
            side_dish_name_en: self.side_dish_name_en,
            description_en: self.description_en,
            description_ko: self.description_ko,
            is_vegetarian: self.is_vegetarian || self.is_vegan,
            is_vegan: self.is_vegan,
            notes: self.notes,
            ordering_phrase_ko: self.ordering_phrase_ko,
            ordering_phrase_en: self.ordering_phrase_en,
            created_by: Some(created_by),
            is_verified: false,
        }
    }
}

impl UpdateSideDishRequest {
    /// Marking a dish vegan also marks it vegetarian, and clearing
    /// vegetarian clears vegan, whatever the stored row says.
    fn into_changes(self) -> SideDishNoteChanges {
        let (is_vegetarian, is_vegan) = match (self.is_vegetarian, self.is_vegan) {
            (_, Some(true)) => (Some(true), Some(true)),
            (Some(false), None) => (Some(false), Some(false)),
            other => other,
        };
        SideDishNoteChanges {
            side_dish_name_ko: self.side_dish_name_ko.map(|name| name.trim().to_string()),
            side_dish_name_en: self.side_dish_name_en,
            description_en: self.description_en,
            description_ko: self.description_ko,
            is_vegetarian,
            is_vegan,
            notes: self.notes,
            ordering_phrase_ko: self.ordering_phrase_ko,
            ordering_phrase_en: self.ordering_phrase_en,
            is_verified: self.is_verified,
            updated_at: Some(Utc::now()),
        }
    }
}

// --- Public: verified notes for a restaurant ---

pub async fn list_side_dishes(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Vec<SideDishNote>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    ensure_restaurant_exists(&mut conn, restaurant_id)?;

    let notes = restaurant_side_dish_notes::table
        .filter(restaurant_side_dish_notes::restaurant_id.eq(restaurant_id))
        .filter(restaurant_side_dish_notes::is_verified.eq(true))
        .order(restaurant_side_dish_notes::created_at.desc())
        .load::<SideDishNote>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    Ok(Json(ApiResponse::ok(notes)))
}

// --- Signed-in users: submit a note for review ---

pub async fn create_side_dish(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(restaurant_id): Path<Uuid>,
    Json(req): Json<CreateSideDishRequest>,
) -> AppResult<Json<ApiResponse<SideDishNote>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    ensure_restaurant_exists(&mut conn, restaurant_id)?;
    let user_id = require_user_id(&mut conn, &auth)?;

    let note: SideDishNote = diesel::insert_into(restaurant_side_dish_notes::table)
        .values(&req.into_new(restaurant_id, user_id))
        .get_result(&mut conn)
        .map_err(|e| AppError::internal(format!("failed to create side dish note: {e}")))?;

    tracing::info!(note_id = %note.id, restaurant_id = %restaurant_id, "side dish note submitted");

    Ok(Json(ApiResponse::ok_with_message(
        note,
        "thanks, your note will appear once it has been verified",
    )))
}

// --- Admin: edit / verify ---

pub async fn update_side_dish(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(note_id): Path<Uuid>,
    Json(req): Json<UpdateSideDishRequest>,
) -> AppResult<Json<ApiResponse<SideDishNote>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let note: SideDishNote = diesel::update(restaurant_side_dish_notes::table.find(note_id))
        .set(&req.into_changes())
        .get_result(&mut conn)
        .optional()
        .map_err(|e| AppError::internal(format!("failed to update side dish note: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::SideDishNoteNotFound, "side dish note not found"))?;

    Ok(Json(ApiResponse::ok(note)))
}

// --- Admin: delete ---

pub async fn delete_side_dish(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(note_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let deleted = diesel::delete(restaurant_side_dish_notes::table.find(note_id))
        .execute(&mut conn)
        .map_err(|e| AppError::internal(format!("failed to delete side dish note: {e}")))?;

    if deleted == 0 {
        return Err(AppError::new(ErrorCode::SideDishNoteNotFound, "side dish note not found"));
    }

    Ok(Json(ApiResponse::ok_with_message((), "side dish note deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_request(json: &str) -> CreateSideDishRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn korean_name_is_required() {
        let req = create_request(r#"{"side_dish_name_ko": ""}"#);
        assert!(req.validate().is_err());

        let req = create_request(r#"{"side_dish_name_ko": "콩나물무침"}"#);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn new_notes_start_unverified_and_vegan_implies_vegetarian() {
        let req = create_request(r#"{"side_dish_name_ko": " 두부조림 ", "is_vegan": true}"#);
        let user = Uuid::new_v4();
        let note = req.into_new(Uuid::new_v4(), user);
        assert!(!note.is_verified);
        assert!(note.is_vegetarian && note.is_vegan);
        assert_eq!(note.side_dish_name_ko, "두부조림");
        assert_eq!(note.created_by, Some(user));
    }

    #[test]
    fn update_can_clear_optional_text() {
        let req: UpdateSideDishRequest =
            serde_json::from_str(r#"{"notes": null, "is_verified": true}"#).unwrap();
        let changes = req.into_changes();
        assert_eq!(changes.notes, Some(None));
        assert_eq!(changes.description_en, None);
        assert_eq!(changes.is_verified, Some(true));
        assert!(changes.updated_at.is_some());
    }

    #[test]
    fn update_keeps_vegan_dishes_vegetarian() {
        let req: UpdateSideDishRequest =
            serde_json::from_str(r#"{"is_vegan": true, "is_vegetarian": false}"#).unwrap();
        let changes = req.into_changes();
        assert_eq!(changes.is_vegan, Some(true));
        assert_eq!(changes.is_vegetarian, Some(true));

        let req: UpdateSideDishRequest = serde_json::from_str(r#"{"is_vegan": true}"#).unwrap();
        assert_eq!(req.into_changes().is_vegetarian, Some(true));

        let req: UpdateSideDishRequest = serde_json::from_str(r#"{"is_vegan": false}"#).unwrap();
        assert_eq!(req.into_changes().is_vegetarian, None);

        let req: UpdateSideDishRequest = serde_json::from_str(r#"{"is_vegetarian": false}"#).unwrap();
        let changes = req.into_changes();
        assert_eq!(changes.is_vegetarian, Some(false));
        assert_eq!(changes.is_vegan, Some(false));
    }
}
