use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{restaurant_views, restaurants, search_queries, user_visits};

// --- Visits ---

/// One browser session. `ended_at` and `duration_seconds` stay null until
/// the client reports the end of the visit.
#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = user_visits)]
pub struct Visit {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_seconds: Option<i32>,
    pub page_views: i32,
    pub restaurants_viewed: i32,
    pub searches_performed: i32,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Visit {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = user_visits)]
pub struct NewVisit {
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub started_at: DateTime<Utc>,
    pub page_views: i32,
    pub restaurants_viewed: i32,
    pub searches_performed: i32,
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

impl NewVisit {
    pub fn open(session_id: impl Into<String>, user_id: Option<Uuid>, started_at: DateTime<Utc>) -> Self {
        Self {
            user_id,
            session_id: session_id.into(),
            started_at,
            page_views: 0,
            restaurants_viewed: 0,
            searches_performed: 0,
            user_agent: None,
            referrer: None,
        }
    }

    /// A visit created on the fly by its first tracked event.
    pub fn seeded_with(mut self, counter: VisitCounter) -> Self {
        match counter {
            VisitCounter::PageViews => self.page_views = 1,
            VisitCounter::RestaurantsViewed => self.restaurants_viewed = 1,
            VisitCounter::SearchesPerformed => self.searches_performed = 1,
        }
        self
    }
}

/// Per-visit counters bumped by tracked events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitCounter {
    PageViews,
    RestaurantsViewed,
    SearchesPerformed,
}

/// Kind of activity recorded against a visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEvent {
    PageView,
    RestaurantView,
    Search,
}

impl TrackingEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PageView => "page_view",
            Self::RestaurantView => "restaurant_view",
            Self::Search => "search",
        }
    }

    pub fn counter(&self) -> VisitCounter {
        match self {
            Self::PageView => VisitCounter::PageViews,
            Self::RestaurantView => VisitCounter::RestaurantsViewed,
            Self::Search => VisitCounter::SearchesPerformed,
        }
    }
}

impl std::fmt::Display for TrackingEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// --- Restaurant views ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = restaurant_views)]
pub struct RestaurantView {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub viewed_at: DateTime<Utc>,
    pub source: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = restaurant_views)]
pub struct NewRestaurantView {
    pub restaurant_id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub viewed_at: DateTime<Utc>,
    pub source: Option<String>,
}

// --- Search queries ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize, Deserialize)]
#[diesel(table_name = search_queries)]
pub struct SearchQuery {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub query_text: String,
    pub filter_category: Option<String>,
    pub results_count: i32,
    pub searched_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = search_queries)]
pub struct NewSearchQuery {
    pub user_id: Option<Uuid>,
    pub session_id: String,
    pub query_text: String,
    pub filter_category: Option<String>,
    pub results_count: i32,
    pub searched_at: DateTime<Utc>,
}

// --- Restaurants (read-only projection) ---

#[derive(Debug, Clone, Queryable, Identifiable, Serialize)]
#[diesel(table_name = restaurants)]
pub struct RestaurantRef {
    pub id: Uuid,
    pub name_en: String,
    pub name_ko: String,
    pub category: String,
    pub naver_place_id: Option<String>,
}

pub const VEGETARIAN_FRIENDLY: &str = "vegetarian-friendly";

impl RestaurantRef {
    /// English name, falling back to the Korean one.
    pub fn display_name(&self) -> Option<&str> {
        [self.name_en.as_str(), self.name_ko.as_str()]
            .into_iter()
            .find(|name| !name.trim().is_empty())
    }

    /// Review-platform linkage; any stored id counts.
    pub fn has_reviews(&self) -> bool {
        self.naver_place_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn restaurant(name_en: &str, name_ko: &str) -> RestaurantRef {
        RestaurantRef {
            id: Uuid::new_v4(),
            name_en: name_en.into(),
            name_ko: name_ko.into(),
            category: "vegan".into(),
            naver_place_id: None,
        }
    }

    #[test]
    fn display_name_prefers_english() {
        assert_eq!(restaurant("Loving Hut", "러빙헛").display_name(), Some("Loving Hut"));
        assert_eq!(restaurant("", "러빙헛").display_name(), Some("러빙헛"));
        assert_eq!(restaurant(" ", "").display_name(), None);
    }

    #[test]
    fn seeded_visit_starts_counter_at_one() {
        let visit = NewVisit::open("s1", None, Utc::now()).seeded_with(VisitCounter::SearchesPerformed);
        assert_eq!((visit.page_views, visit.restaurants_viewed, visit.searches_performed), (0, 0, 1));
    }

    #[test]
    fn tracking_events_map_to_counters() {
        assert_eq!(TrackingEvent::RestaurantView.counter(), VisitCounter::RestaurantsViewed);
        assert_eq!(TrackingEvent::Search.to_string(), "search");
    }
}
