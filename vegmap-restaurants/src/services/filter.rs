//! Homepage browse pipeline: category, price, feature flags, free-text
//! search, then a stable sort. Pure over the given restaurant slice.

use std::cmp::Ordering;
use std::collections::HashSet;

use serde::Deserialize;

use crate::models::{PriceRange, Restaurant, RestaurantCategory};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ko,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortBy {
    #[default]
    Name,
    Category,
    Price,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Features {
    pub side_dish_only: bool,
    pub verified: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct FilterState {
    pub categories: Vec<RestaurantCategory>,
    pub price_ranges: Vec<PriceRange>,
    pub features: Features,
    pub search: String,
    pub sort_by: SortBy,
}

impl FilterState {
    /// Price filtering only narrows when some, but not all, ranges are picked.
    fn price_filter(&self) -> Option<HashSet<PriceRange>> {
        let picked: HashSet<PriceRange> = self.price_ranges.iter().copied().collect();
        (!picked.is_empty() && picked.len() < PriceRange::ALL.len()).then_some(picked)
    }
}

fn matches_search(restaurant: &Restaurant, needle: &str) -> bool {
    [
        &restaurant.name_en,
        &restaurant.name_ko,
        &restaurant.address_en,
        &restaurant.address_ko,
    ]
    .iter()
    .any(|field| field.to_lowercase().contains(needle))
}

fn price_ordinal(restaurant: &Restaurant) -> u8 {
    restaurant.price().map_or(0, |p| p.ordinal())
}

fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b))
}

pub fn apply_filters(restaurants: &[Restaurant], filters: &FilterState, language: Language) -> Vec<Restaurant> {
    let categories: HashSet<&str> = filters.categories.iter().map(RestaurantCategory::as_str).collect();
    let prices = filters.price_filter();
    let needle = filters.search.trim().to_lowercase();

    let mut filtered: Vec<Restaurant> = restaurants
        .iter()
        .filter(|r| categories.is_empty() || categories.contains(r.category.as_str()))
        .filter(|r| match &prices {
            Some(picked) => r.price().is_some_and(|p| picked.contains(&p)),
            None => true,
        })
        .filter(|r| !filters.features.side_dish_only || r.offers_side_dish_only)
        .filter(|r| !filters.features.verified || r.is_verified)
        .filter(|r| needle.is_empty() || matches_search(r, &needle))
        .cloned()
        .collect();

    match filters.sort_by {
        SortBy::Name => filtered.sort_by(|a, b| match language {
            Language::En => compare_names(&a.name_en, &b.name_en),
            Language::Ko => compare_names(&a.name_ko, &b.name_ko),
        }),
        SortBy::Category => filtered.sort_by(|a, b| a.category.cmp(&b.category)),
        SortBy::Price => filtered.sort_by_key(price_ordinal),
    }

    filtered
}
