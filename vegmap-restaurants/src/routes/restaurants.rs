use axum::extract::{Path, Query, State};
use axum::Json;
use diesel::prelude::*;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use vegmap_shared::errors::{AppError, AppResult, ErrorCode};
use vegmap_shared::types::api::ApiResponse;

use crate::models::{
    PriceRange, Restaurant, RestaurantCategory, RestaurantDetails, RestaurantPhoto,
    RestaurantSearchResult, SideDishNote,
};
use crate::schema::{restaurant_photos, restaurant_side_dish_notes, restaurants};
use crate::services::filter::{apply_filters, FilterState, Language};
use crate::AppState;

// --- Request types ---

#[derive(Debug, Default, Deserialize)]
pub struct ListRestaurantsParams {
    /// A category name, or `all` for no category filter.
    pub category: Option<String>,
    pub price_range: Option<String>,
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct BrowseRequest {
    #[serde(default)]
    pub filters: FilterState,
    #[serde(default)]
    pub language: Language,
}

impl ListRestaurantsParams {
    fn category(&self) -> AppResult<Option<RestaurantCategory>> {
        match self.category.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e)),
        }
    }

    fn price(&self) -> AppResult<Option<PriceRange>> {
        match self.price_range.as_deref().map(str::trim) {
            None | Some("") | Some("all") => Ok(None),
            Some(raw) => raw
                .parse()
                .map(Some)
                .map_err(|e: String| AppError::new(ErrorCode::ValidationError, e)),
        }
    }
}

/// `%term%` for ILIKE, with the pattern metacharacters escaped.
pub(crate) fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn search_catalogue(
    conn: &mut PgConnection,
    category: Option<RestaurantCategory>,
    price: Option<PriceRange>,
    term: Option<&str>,
) -> AppResult<Vec<Restaurant>> {
    let mut query = restaurants::table.into_boxed();

    if let Some(category) = category {
        query = query.filter(restaurants::category.eq(category.as_str()));
    }
    if let Some(price) = price {
        query = query.filter(restaurants::price_range.eq(price.as_str()));
    }
    if let Some(term) = term.map(str::trim).filter(|t| !t.is_empty()) {
        let pattern = contains_pattern(term);
        query = query.filter(
            restaurants::name_en
                .ilike(pattern.clone())
                .or(restaurants::name_ko.ilike(pattern.clone()))
                .or(restaurants::address_en.ilike(pattern.clone()))
                .or(restaurants::address_ko.ilike(pattern)),
        );
    }

    let rows = query
        .order(restaurants::created_at.desc())
        .load::<Restaurant>(conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;
    Ok(rows)
}

// --- List restaurants ---

pub async fn list_restaurants(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListRestaurantsParams>,
) -> AppResult<Json<ApiResponse<Vec<Restaurant>>>> {
    let category = params.category()?;
    let price = params.price()?;

    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let rows = search_catalogue(&mut conn, category, price, params.search.as_deref())?;
    Ok(Json(ApiResponse::ok(rows)))
}

// --- Free-text search ---

pub async fn search_restaurants(
    State(state): State<Arc<AppState>>,
    Query(params): Query<SearchParams>,
) -> AppResult<Json<ApiResponse<RestaurantSearchResult>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let rows = search_catalogue(&mut conn, None, None, Some(&params.q))?;
    let total = rows.len();
    Ok(Json(ApiResponse::ok(RestaurantSearchResult { restaurants: rows, total })))
}

// --- Homepage browse ---

pub async fn browse_restaurants(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BrowseRequest>,
) -> AppResult<Json<ApiResponse<Vec<Restaurant>>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let all = search_catalogue(&mut conn, None, None, None)?;
    let visible = apply_filters(&all, &body.filters, body.language);

    tracing::debug!(total = all.len(), visible = visible.len(), "homepage browse");
    Ok(Json(ApiResponse::ok(visible)))
}

// --- Restaurant details ---

pub async fn get_restaurant(
    State(state): State<Arc<AppState>>,
    Path(restaurant_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<RestaurantDetails>>> {
    let mut conn = state.db.get()
        .map_err(|e| AppError::internal(format!("db pool error: {e}")))?;

    let restaurant = restaurants::table
        .find(restaurant_id)
        .first::<Restaurant>(&mut conn)
        .optional()
        .map_err(|e| AppError::internal(format!("db error: {e}")))?
        .ok_or_else(|| AppError::new(ErrorCode::RestaurantNotFound, "restaurant not found"))?;

    let photos = restaurant_photos::table
        .filter(restaurant_photos::restaurant_id.eq(restaurant_id))
        .order((restaurant_photos::is_primary.desc(), restaurant_photos::uploaded_at.desc()))
        .load::<RestaurantPhoto>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    let side_dish_notes = restaurant_side_dish_notes::table
        .filter(restaurant_side_dish_notes::restaurant_id.eq(restaurant_id))
        .filter(restaurant_side_dish_notes::is_verified.eq(true))
        .order(restaurant_side_dish_notes::created_at.desc())
        .load::<SideDishNote>(&mut conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;

    Ok(Json(ApiResponse::ok(RestaurantDetails { restaurant, photos, side_dish_notes })))
}

/// 404s unless the restaurant exists.
pub(crate) fn ensure_restaurant_exists(conn: &mut PgConnection, restaurant_id: Uuid) -> AppResult<()> {
    let found: i64 = restaurants::table
        .filter(restaurants::id.eq(restaurant_id))
        .count()
        .get_result(conn)
        .map_err(|e| AppError::internal(format!("db error: {e}")))?;
    if found == 0 {
        return Err(AppError::new(ErrorCode::RestaurantNotFound, "restaurant not found"));
    }
    Ok(())
}
