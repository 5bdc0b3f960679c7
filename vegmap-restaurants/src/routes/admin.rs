use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use vegmap_shared::errors::{AppError, AppResult, ErrorCode};
use vegmap_shared::middleware::AdminUser;
use vegmap_shared::types::api::ApiResponse;
use vegmap_shared::types::pagination::{Paginated, PaginationParams};

use crate::models::{
    double_option, MenuItem, NewRestaurant, OperatingHours, PriceRange, Restaurant,
    RestaurantCategory, RestaurantChanges,
};
use crate::schema::restaurants;
use crate::services::identity::find_user_id;
use crate::AppState;

// --- Request types ---

fn validate_category(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<RestaurantCategory>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_category"))
}

fn validate_price_range(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<PriceRange>()
        .map(|_| ())
        .map_err(|_| ValidationError::new("unknown_price_range"))
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateRestaurantRequest {
    #[validate(length(min = 1, max = 255, message = "name_en must be 1-255 characters"))]
    pub name_en: String,
    #[validate(length(min = 1, max = 255, message = "name_ko must be 1-255 characters"))]
    pub name_ko: String,
    #[validate(custom = "validate_category")]
    pub category: String,
    #[validate(length(min = 1, max = 500))]
    pub address_en: String,
    #[validate(length(min = 1, max = 500))]
    pub address_ko: String,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: f64,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: f64,
    pub menu_items: Option<Vec<MenuItem>>,
    pub operating_hours: Option<OperatingHours>,
    #[validate(custom = "validate_price_range")]
    pub price_range: Option<String>,
    pub description_en: Option<String>,
    pub description_ko: Option<String>,
    pub naver_place_id: Option<String>,
    #[serde(default)]
    pub offers_side_dish_only: bool,
    pub ordering_tips_en: Option<String>,
    pub ordering_tips_ko: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateRestaurantRequest {
    #[validate(length(min = 1, max = 255))]
    pub name_en: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub name_ko: Option<String>,
    #[validate(custom = "validate_category")]
    pub category: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub address_en: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub address_ko: Option<String>,
    #[validate(range(min = -90.0, max = 90.0))]
    pub latitude: Option<f64>,
    #[validate(range(min = -180.0, max = 180.0))]
    pub longitude: Option<f64>,
    #[serde(default, deserialize_with = "double_option")]
    pub menu_items: Option<Option<Vec<MenuItem>>>,
    #[serde(default, deserialize_with = "double_option")]
    pub operating_hours: Option<Option<OperatingHours>>,
    #[serde(default, deserialize_with = "double_option")]
    pub price_range: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description_en: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub description_ko: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub naver_place_id: Option<Option<String>>,
    pub offers_side_dish_only: Option<bool>,
    #[serde(default, deserialize_with = "double_option")]
    pub ordering_tips_en: Option<Option<String>>,
    #[serde(default, deserialize_with = "double_option")]
    pub ordering_tips_ko: Option<Option<String>>,
    pub is_verified: Option<bool>,
}

fn to_json<T: serde::Serialize>(value: T) -> AppResult<serde_json::Value> {
    serde_json::to_value(value).map_err(|e| AppError::internal(format!("serialization error: {e}")))
}

/// Blank optional text is stored as NULL.
fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl CreateRestaurantRequest {
    fn into_new(self, created_by: Option<Uuid>) -> AppResult<NewRestaurant> {
        Ok(NewRestaurant {
            name_en: self.name_en.trim().to_string(),
            name_ko: self.name_ko.trim().to_string(),
            category: self.category,
            address_en: self.address_en,
            address_ko: self.address_ko,
            latitude: self.latitude,
            longitude: self.longitude,
            menu_items: self.menu_items.map(to_json).transpose()?,
            operating_hours: self.operating_hours.map(to_json).transpose()?,
            price_range: self.price_range,
            description_en: non_blank(self.description_en),
            description_ko: non_blank(self.description_ko),
            naver_place_id: non_blank(self.naver_place_id),
            offers_side_dish_only: self.offers_side_dish_only,
            ordering_tips_en: non_blank(self.ordering_tips_en),
            ordering_tips_ko: non_blank(self.ordering_tips_ko),
            created_by,
            is_verified: self.is_verified,
        })
    }
}

impl UpdateRestaurantRequest {
    fn into_changes(self) -> AppResult<RestaurantChanges> {
        if let Some(Some(price)) = &self.price_range {
            price
                .parse::<PriceRange>()
                .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e))?;
        }

        let menu_items = match self.menu_items {
            Some(items) => Some(items.map(to_json).transpose()?),
            None => None,
        };
        let operating_hours = match self.operating_hours {
            Some(hours) => Some(hours.map(to_json).transpose()?),
            None => None,
        };

        Ok(RestaurantChanges {
            name_en: self.name_en.map(|n| n.trim().to_string()),
            name_ko: self.name_ko.map(|n| n.trim().to_string()),
            category: self.category,
            address_en: self.address_en,
            address_ko: self.address_ko,
            latitude: self.latitude,
            longitude: self.longitude,
            menu_items,
            operating_hours,
            price_range: self.price_range,
            description_en: self.description_en.map(non_blank),
            description_ko: self.description_ko.map(non_blank),
            naver_place_id: self.naver_place_id.map(non_blank),
            offers_side_dish_only: self.offers_side_dish_only,
            ordering_tips_en: self.ordering_tips_en.map(non_blank),
            ordering_tips_ko: self.ordering_tips_ko.map(non_blank),
            is_verified: self.is_verified,
            updated_at: Some(Utc::now()),
        })
    }
}

// --- List restaurants (paginated) ---

pub async fn list_restaurants(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Query(pagination): Query<PaginationParams>,
) -> AppResult<Json<ApiResponse<Paginated<Restaurant>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let items = restaurants::table
        .order(restaurants::created_at.desc())
        .offset(pagination.offset() as i64)
        .limit(pagination.limit() as i64)
        .load::<Restaurant>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    let total: i64 = restaurants::table
        .count()
        .get_result(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    Ok(Json(ApiResponse::ok(Paginated::new(items, total as u64, &pagination))))
}

// --- Create restaurant ---

pub async fn create_restaurant(
    State(state): State<Arc<AppState>>,
    admin: AdminUser,
    Json(req): Json<CreateRestaurantRequest>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let created_by = find_user_id(&mut conn, &admin.0.external_id)?;

    let restaurant: Restaurant = diesel::insert_into(restaurants::table)
        .values(&req.into_new(created_by)?)
        .get_result(&mut conn)
        .map_err(|e| AppError::internal(format!("failed to create restaurant: {e}")))?;

    tracing::info!(restaurant_id = %restaurant.id, name = %restaurant.name_en, "restaurant created");

    Ok(Json(ApiResponse::ok(restaurant)))
}

// --- Update restaurant ---

pub async fn update_restaurant(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(restaurant_id): Path<Uuid>,
    Json(req): Json<UpdateRestaurantRequest>,
) -> AppResult<Json<ApiResponse<Restaurant>>> {
    req.validate()
        .map_err(|e| AppError::new(ErrorCode::ValidationError, e.to_string()))?;
    let changes = req.into_changes()?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let restaurant: Restaurant = diesel::update(restaurants::table.find(restaurant_id))
        .set(&changes)
        .get_result(&mut conn)
        .optional()
        .map_err(|e| AppError::internal(format!("failed to update restaurant: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound, "restaurant not found"))?;

    Ok(Json(ApiResponse::ok(restaurant)))
}

// --- Delete restaurant ---

pub async fn delete_restaurant(
    State(state): State<Arc<AppState>>,
    _admin: AdminUser,
    Path(restaurant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<()>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    // Photos, notes and suggestions go with it (ON DELETE CASCADE).
    let deleted = diesel::delete(restaurants::table.find(restaurant_id))
        .execute(&mut conn)
        .map_err(|e| AppError::internal(format!("failed to delete restaurant: {e}")))?;

    if deleted == 0 {
        return Err(AppError::new(ErrorCode::RestaurantNotFound, "restaurant not found"));
    }

    tracing::info!(restaurant_id = %restaurant_id, "restaurant deleted");
    Ok(Json(ApiResponse::ok_with_message((), "restaurant deleted")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_body() -> serde_json::Value {
        serde_json::json!({
            "name_en": "Plant Cafe",
            "name_ko": "플랜트 카페",
            "category": "vegan",
            "address_en": "Itaewon-ro 117",
            "address_ko": "이태원로 117",
            "latitude": 37.5344,
            "longitude": 126.9941,
            "menu_items": [{"name_en": "Tofu bowl", "name_ko": "두부 덮밥", "price": 12000}],
            "operating_hours": {"mon": "11:00-21:00", "sun": "closed"},
            "price_range": "mid-range"
        })
    }

    #[test]
    fn valid_create_request_passes() {
        let req: CreateRestaurantRequest = serde_json::from_value(create_body()).unwrap();
        assert!(req.validate().is_ok());

        let new = req.into_new(None).unwrap();
        assert_eq!(new.menu_items.unwrap()[0]["name_ko"], "두부 덮밥");
        assert_eq!(new.operating_hours.unwrap()["sun"], "closed");
        assert!(!new.is_verified);
    }

    #[test]
    fn create_rejects_unknown_category_and_bad_coordinates() {
        let mut body = create_body();
        body["category"] = "pescatarian".into();
        let req: CreateRestaurantRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());

        let mut body = create_body();
        body["latitude"] = 91.0.into();
        let req: CreateRestaurantRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());

        let mut body = create_body();
        body["price_range"] = "cheap".into();
        let req: CreateRestaurantRequest = serde_json::from_value(body).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn update_distinguishes_clear_from_untouched() {
        let req: UpdateRestaurantRequest =
            serde_json::from_str(r#"{"price_range": null, "name_en": " Plant "}"#).unwrap();
        assert!(req.validate().is_ok());

        let changes = req.into_changes().unwrap();
        assert_eq!(changes.price_range, Some(None));
        assert_eq!(changes.name_en.as_deref(), Some("Plant"));
        assert_eq!(changes.description_en, None);
        assert!(changes.updated_at.is_some());
    }

    #[test]
    fn blank_optional_text_is_stored_as_null() {
        let mut body = create_body();
        body["naver_place_id"] = "  ".into();
        body["description_en"] = "Temple food".into();
        let req: CreateRestaurantRequest = serde_json::from_value(body).unwrap();
        let new = req.into_new(None).unwrap();
        assert_eq!(new.naver_place_id, None);
        assert_eq!(new.description_en.as_deref(), Some("Temple food"));

        let req: UpdateRestaurantRequest =
            serde_json::from_str(r#"{"naver_place_id": "", "ordering_tips_en": "ask for no fish sauce"}"#).unwrap();
        let changes = req.into_changes().unwrap();
        assert_eq!(changes.naver_place_id, Some(None));
        assert_eq!(changes.ordering_tips_en, Some(Some("ask for no fish sauce".into())));
    }

    #[test]
    fn update_rejects_unknown_price_range() {
        let req: UpdateRestaurantRequest =
            serde_json::from_str(r#"{"price_range": "cheap"}"#).unwrap();
        assert!(req.into_changes().is_err());
    }
}
