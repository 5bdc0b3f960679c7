//! Which restaurant columns crowd-sourced edit suggestions may touch, and
//! how their text values turn into a typed update.

use chrono::{DateTime, Utc};

use vegmap_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{PriceRange, Restaurant, RestaurantCategory, RestaurantChanges};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditableField {
    NameEn,
    NameKo,
    Category,
    AddressEn,
    AddressKo,
    Latitude,
    Longitude,
    PriceRange,
    DescriptionEn,
    DescriptionKo,
    NaverPlaceId,
    OffersSideDishOnly,
    OrderingTipsEn,
    OrderingTipsKo,
}

impl EditableField {
    pub const ALL: [EditableField; 14] = [
        Self::NameEn,
        Self::NameKo,
        Self::Category,
        Self::AddressEn,
        Self::AddressKo,
        Self::Latitude,
        Self::Longitude,
        Self::PriceRange,
        Self::DescriptionEn,
        Self::DescriptionKo,
        Self::NaverPlaceId,
        Self::OffersSideDishOnly,
        Self::OrderingTipsEn,
        Self::OrderingTipsKo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NameEn => "name_en",
            Self::NameKo => "name_ko",
            Self::Category => "category",
            Self::AddressEn => "address_en",
            Self::AddressKo => "address_ko",
            Self::Latitude => "latitude",
            Self::Longitude => "longitude",
            Self::PriceRange => "price_range",
            Self::DescriptionEn => "description_en",
            Self::DescriptionKo => "description_ko",
            Self::NaverPlaceId => "naver_place_id",
            Self::OffersSideDishOnly => "offers_side_dish_only",
            Self::OrderingTipsEn => "ordering_tips_en",
            Self::OrderingTipsKo => "ordering_tips_ko",
        }
    }

    pub fn parse(name: &str) -> AppResult<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| {
                AppError::with_details(
                    ErrorCode::FieldNotEditable,
                    format!("field '{name}' cannot be edited through suggestions"),
                    serde_json::json!({ "editable": Self::ALL.map(|f| f.as_str()) }),
                )
            })
    }

    /// Current value rendered as text, for the suggestion's `old_value`.
    pub fn current_value(&self, r: &Restaurant) -> Option<String> {
        match self {
            Self::NameEn => Some(r.name_en.clone()),
            Self::NameKo => Some(r.name_ko.clone()),
            Self::Category => Some(r.category.clone()),
            Self::AddressEn => Some(r.address_en.clone()),
            Self::AddressKo => Some(r.address_ko.clone()),
            Self::Latitude => Some(r.latitude.to_string()),
            Self::Longitude => Some(r.longitude.to_string()),
            Self::PriceRange => r.price_range.clone(),
            Self::DescriptionEn => r.description_en.clone(),
            Self::DescriptionKo => r.description_ko.clone(),
            Self::NaverPlaceId => r.naver_place_id.clone(),
            Self::OffersSideDishOnly => Some(r.offers_side_dish_only.to_string()),
            Self::OrderingTipsEn => r.ordering_tips_en.clone(),
            Self::OrderingTipsKo => r.ordering_tips_ko.clone(),
        }
    }

    /// Parses `new_value` for this column. Blank values clear optional
    /// columns.
    pub fn to_changes(&self, new_value: &str, now: DateTime<Utc>) -> AppResult<RestaurantChanges> {
        let mut changes = RestaurantChanges { updated_at: Some(now), ..Default::default() };
        let value = new_value.trim();

        match self {
            Self::NameEn => changes.name_en = Some(self.required_text(value)?),
            Self::NameKo => changes.name_ko = Some(self.required_text(value)?),
            Self::AddressEn => changes.address_en = Some(self.required_text(value)?),
            Self::AddressKo => changes.address_ko = Some(self.required_text(value)?),
            Self::Category => {
                let category: RestaurantCategory = value.parse().map_err(|e: String| self.invalid(e))?;
                changes.category = Some(category.as_str().to_string());
            }
            Self::Latitude => changes.latitude = Some(self.coordinate(value, 90.0)?),
            Self::Longitude => changes.longitude = Some(self.coordinate(value, 180.0)?),
            Self::PriceRange => {
                let price = if value.is_empty() {
                    None
                } else {
                    let parsed: PriceRange = value.parse().map_err(|e: String| self.invalid(e))?;
                    Some(parsed.as_str().to_string())
                };
                changes.price_range = Some(price);
            }
            Self::OffersSideDishOnly => {
                let flag = value
                    .parse::<bool>()
                    .map_err(|_| self.invalid("expected true or false"))?;
                changes.offers_side_dish_only = Some(flag);
            }
            Self::DescriptionEn => changes.description_en = Some(optional_text(value)),
            Self::DescriptionKo => changes.description_ko = Some(optional_text(value)),
            Self::NaverPlaceId => changes.naver_place_id = Some(optional_text(value)),
            Self::OrderingTipsEn => changes.ordering_tips_en = Some(optional_text(value)),
            Self::OrderingTipsKo => changes.ordering_tips_ko = Some(optional_text(value)),
        }

        Ok(changes)
    }

    fn invalid(&self, reason: impl std::fmt::Display) -> AppError {
        AppError::new(
            ErrorCode::InvalidFieldValue,
            format!("invalid value for {}: {reason}", self.as_str()),
        )
    }

    fn required_text(&self, value: &str) -> AppResult<String> {
        if value.is_empty() {
            return Err(self.invalid("must not be empty"));
        }
        Ok(value.to_string())
    }

    fn coordinate(&self, value: &str, limit: f64) -> AppResult<f64> {
        let parsed: f64 = value.parse().map_err(|_| self.invalid("expected a number"))?;
        if !parsed.is_finite() || parsed.abs() > limit {
            return Err(self.invalid(format!("must be between -{limit} and {limit}")));
        }
        Ok(parsed)
    }
}

fn optional_text(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}
