use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::schema::{
    restaurant_edit_suggestions, restaurant_photos, restaurant_side_dish_notes, restaurants,
};

// --- Enumerations stored as text ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RestaurantCategory {
    Vegetarian,
    Vegan,
    VegetarianFriendly,
}

impl RestaurantCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Vegetarian => "vegetarian",
            Self::Vegan => "vegan",
            Self::VegetarianFriendly => "vegetarian-friendly",
        }
    }
}

impl std::str::FromStr for RestaurantCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "vegetarian" => Ok(Self::Vegetarian),
            "vegan" => Ok(Self::Vegan),
            "vegetarian-friendly" => Ok(Self::VegetarianFriendly),
            _ => Err(format!("unknown category: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PriceRange {
    Budget,
    MidRange,
    Upscale,
}

impl PriceRange {
    pub const ALL: [PriceRange; 3] = [Self::Budget, Self::MidRange, Self::Upscale];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Budget => "budget",
            Self::MidRange => "mid-range",
            Self::Upscale => "upscale",
        }
    }

    /// Sort key; an unset price ranks 0, below every priced restaurant.
    pub fn ordinal(&self) -> u8 {
        match self {
            Self::Budget => 1,
            Self::MidRange => 2,
            Self::Upscale => 3,
        }
    }
}

impl std::str::FromStr for PriceRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "budget" => Ok(Self::Budget),
            "mid-range" => Ok(Self::MidRange),
            "upscale" => Ok(Self::Upscale),
            _ => Err(format!("unknown price range: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Pending,
    Approved,
    Rejected,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

/// Deserializes a present field (including an explicit `null`) as
/// `Some(..)`, so PATCH bodies can tell "clear" apart from "leave as is".
pub fn double_option<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// --- Restaurant ---

/// One entry of the `menu_items` JSON array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuItem {
    pub name_en: String,
    pub name_ko: String,
    /// Either a number of won or free text such as "market price".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<serde_json::Value>,
}

/// `operating_hours` JSON object, e.g. `{"mon": "11:00-22:00", "sun": "closed"}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperatingHours {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tue: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sat: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sun: Option<String>,
}

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = restaurants)]
pub struct Restaurant {
    pub id: Uuid,
    pub name_en: String,
    pub name_ko: String,
    pub category: String,
    pub address_en: String,
    pub address_ko: String,
    pub latitude: f64,
    pub longitude: f64,
    pub menu_items: Option<serde_json::Value>,
    pub operating_hours: Option<serde_json::Value>,
    pub price_range: Option<String>,
    pub description_en: Option<String>,
    pub description_ko: Option<String>,
    pub naver_place_id: Option<String>,
    pub offers_side_dish_only: bool,
    pub ordering_tips_en: Option<String>,
    pub ordering_tips_ko: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by: Option<Uuid>,
    pub is_verified: bool,
}

impl Restaurant {
    pub fn price(&self) -> Option<PriceRange> {
        self.price_range.as_deref().and_then(|p| p.parse().ok())
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = restaurants)]
pub struct NewRestaurant {
    pub name_en: String,
    pub name_ko: String,
    pub category: String,
    pub address_en: String,
    pub address_ko: String,
    pub latitude: f64,
    pub longitude: f64,
    pub menu_items: Option<serde_json::Value>,
    pub operating_hours: Option<serde_json::Value>,
    pub price_range: Option<String>,
    pub description_en: Option<String>,
    pub description_ko: Option<String>,
    pub naver_place_id: Option<String>,
    pub offers_side_dish_only: bool,
    pub ordering_tips_en: Option<String>,
    pub ordering_tips_ko: Option<String>,
    pub created_by: Option<Uuid>,
    pub is_verified: bool,
}

/// Partial update. Outer `None` leaves a column untouched; for nullable
/// columns `Some(None)` clears it.
#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = restaurants)]
pub struct RestaurantChanges {
    pub name_en: Option<String>,
    pub name_ko: Option<String>,
    pub category: Option<String>,
    pub address_en: Option<String>,
    pub address_ko: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub menu_items: Option<Option<serde_json::Value>>,
    pub operating_hours: Option<Option<serde_json::Value>>,
    pub price_range: Option<Option<String>>,
    pub description_en: Option<Option<String>>,
    pub description_ko: Option<Option<String>>,
    pub naver_place_id: Option<Option<String>>,
    pub offers_side_dish_only: Option<bool>,
    pub ordering_tips_en: Option<Option<String>>,
    pub ordering_tips_ko: Option<Option<String>>,
    pub is_verified: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

// --- Photos ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = restaurant_photos)]
pub struct RestaurantPhoto {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub storage_path: String,
    pub caption_en: Option<String>,
    pub caption_ko: Option<String>,
    pub uploaded_by: Option<Uuid>,
    pub uploaded_at: DateTime<Utc>,
    pub is_primary: bool,
    pub photo_type: String,
}

// --- Side-dish notes ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = restaurant_side_dish_notes)]
pub struct SideDishNote {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub side_dish_name_ko: String,
    pub side_dish_name_en: Option<String>,
    pub description_en: Option<String>,
    pub description_ko: Option<String>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub notes: Option<String>,
    pub ordering_phrase_ko: Option<String>,
    pub ordering_phrase_en: Option<String>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = restaurant_side_dish_notes)]
pub struct NewSideDishNote {
    pub restaurant_id: Uuid,
    pub side_dish_name_ko: String,
    pub side_dish_name_en: Option<String>,
    pub description_en: Option<String>,
    pub description_ko: Option<String>,
    pub is_vegetarian: bool,
    pub is_vegan: bool,
    pub notes: Option<String>,
    pub ordering_phrase_ko: Option<String>,
    pub ordering_phrase_en: Option<String>,
    pub created_by: Option<Uuid>,
    pub is_verified: bool,
}

#[derive(Debug, Clone, Default, AsChangeset)]
#[diesel(table_name = restaurant_side_dish_notes)]
pub struct SideDishNoteChanges {
    pub side_dish_name_ko: Option<String>,
    pub side_dish_name_en: Option<Option<String>>,
    pub description_en: Option<Option<String>>,
    pub description_ko: Option<Option<String>>,
    pub is_vegetarian: Option<bool>,
    pub is_vegan: Option<bool>,
    pub notes: Option<Option<String>>,
    pub ordering_phrase_ko: Option<Option<String>>,
    pub ordering_phrase_en: Option<Option<String>>,
    pub is_verified: Option<bool>,
    pub updated_at: Option<DateTime<Utc>>,
}

// --- Edit suggestions ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = restaurant_edit_suggestions)]
pub struct EditSuggestion {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub suggested_by: Uuid,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub status: String,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl EditSuggestion {
    pub fn has_status(&self, status: SuggestionStatus) -> bool {
        self.status == status.as_str()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = restaurant_edit_suggestions)]
pub struct NewEditSuggestion {
    pub restaurant_id: Uuid,
    pub suggested_by: Uuid,
    pub field_name: String,
    pub old_value: Option<String>,
    pub new_value: String,
    pub status: String,
}

// --- Composite responses ---

#[derive(Debug, Serialize)]
pub struct RestaurantDetails {
    #[serde(flatten)]
    pub restaurant: Restaurant,
    pub photos: Vec<RestaurantPhoto>,
    pub side_dish_notes: Vec<SideDishNote>,
}

#[derive(Debug, Serialize)]
pub struct RestaurantSearchResult {
    pub restaurants: Vec<Restaurant>,
    pub total: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enums_use_wire_spelling() {
        assert_eq!(serde_json::to_value(PriceRange::MidRange).unwrap(), "mid-range");
        assert_eq!(
            serde_json::to_value(RestaurantCategory::VegetarianFriendly).unwrap(),
            "vegetarian-friendly"
        );
        assert_eq!("mid-range".parse::<PriceRange>().unwrap(), PriceRange::MidRange);
        assert!("cheap".parse::<PriceRange>().is_err());
    }

    #[test]
    fn price_ordinals_are_increasing() {
        let ordinals: Vec<u8> = PriceRange::ALL.iter().map(PriceRange::ordinal).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
    }

    #[derive(Deserialize)]
    struct Patch {
        #[serde(default, deserialize_with = "double_option")]
        price_range: Option<Option<String>>,
    }

    #[test]
    fn double_option_distinguishes_null_from_missing() {
        let missing: Patch = serde_json::from_str("{}").unwrap();
        let cleared: Patch = serde_json::from_str(r#"{"price_range":null}"#).unwrap();
        let set: Patch = serde_json::from_str(r#"{"price_range":"budget"}"#).unwrap();
        assert_eq!(missing.price_range, None);
        assert_eq!(cleared.price_range, Some(None));
        assert_eq!(set.price_range, Some(Some("budget".into())));
    }
}
