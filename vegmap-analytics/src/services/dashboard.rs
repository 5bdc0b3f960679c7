use std::collections::{BTreeMap, HashMap, HashSet};

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{RestaurantRef, RestaurantView, SearchQuery, Visit, VEGETARIAN_FRIENDLY};
use crate::services::progress::average_session_duration;
use crate::services::tally::{mean, Tally};
use crate::store::{ActivityStore, Scope, StoreResult};

pub const TOP_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularSearch {
    pub query: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopularRestaurant {
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub view_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryViews {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub visits: i64,
    pub views: i64,
    pub searches: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardStats {
    pub total_users: i64,
    pub monthly_active_users: i64,
    pub average_session_duration: i64,
    pub restaurants_viewed_per_session: f64,
    pub total_restaurants: i64,
    pub restaurants_with_photos: i64,
    pub restaurants_with_reviews: i64,
    pub vegetarian_friendly_count: i64,
    pub total_restaurant_views: i64,
    pub total_search_queries: i64,
    pub popular_searches: Vec<PopularSearch>,
    pub popular_restaurants: Vec<PopularRestaurant>,
    pub views_by_category: Vec<CategoryViews>,
    pub daily_activity: Vec<DailyActivity>,
}

/// Everything the dashboard reads, fetched up front.
#[derive(Debug, Default)]
pub struct DashboardInput {
    pub total_users: i64,
    pub visits: Vec<Visit>,
    pub views: Vec<RestaurantView>,
    pub searches: Vec<SearchQuery>,
    pub restaurants: Vec<RestaurantRef>,
    pub photographed_restaurant_ids: Vec<Uuid>,
}

impl DashboardInput {
    /// All-or-nothing: the first failed read aborts the load.
    pub fn load(store: &dyn ActivityStore) -> StoreResult<Self> {
        Ok(Self {
            total_users: store.count_users()?,
            visits: store.visits(Scope::All)?,
            views: store.restaurant_views(Scope::All)?,
            searches: store.search_queries(Scope::All)?,
            restaurants: store.restaurants(None)?,
            photographed_restaurant_ids: store.photographed_restaurant_ids()?,
        })
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn day_bucket(
    days: &mut BTreeMap<NaiveDate, DailyActivity>,
    since: DateTime<Utc>,
    at: DateTime<Utc>,
) -> Option<&mut DailyActivity> {
    if at < since {
        return None;
    }
    let date = at.date_naive();
    Some(days.entry(date).or_insert_with(|| DailyActivity { date, visits: 0, views: 0, searches: 0 }))
}

fn daily_activity(input: &DashboardInput, since: DateTime<Utc>) -> Vec<DailyActivity> {
    let mut days = BTreeMap::new();

    for visit in &input.visits {
        if let Some(day) = day_bucket(&mut days, since, visit.started_at) {
            day.visits += 1;
        }
    }
    for view in &input.views {
        if let Some(day) = day_bucket(&mut days, since, view.viewed_at) {
            day.views += 1;
        }
    }
    for search in &input.searches {
        if let Some(day) = day_bucket(&mut days, since, search.searched_at) {
            day.searches += 1;
        }
    }

    days.into_values().collect()
}

pub fn compute_dashboard(input: &DashboardInput, now: DateTime<Utc>, window_days: i64) -> DashboardStats {
    let since = now - Duration::days(window_days);
    let by_id: HashMap<Uuid, &RestaurantRef> = input.restaurants.iter().map(|r| (r.id, r)).collect();

    let monthly_active_users = input
        .visits
        .iter()
        .filter(|v| v.started_at >= since)
        .filter_map(|v| v.user_id)
        .collect::<HashSet<_>>()
        .len() as i64;

    let restaurants_viewed_per_session = mean(
        input
            .visits
            .iter()
            .filter(|v| v.duration_seconds.is_some())
            .map(|v| f64::from(v.restaurants_viewed)),
    )
    .map(round_one_decimal)
    .unwrap_or(0.0);

    let popular_searches = input
        .searches
        .iter()
        .map(|s| s.query_text.clone())
        .collect::<Tally<String>>()
        .top(TOP_LIMIT)
        .into_iter()
        .map(|(query, count)| PopularSearch { query, count })
        .collect();

    let popular_restaurants = input
        .views
        .iter()
        .map(|v| v.restaurant_id)
        .collect::<Tally<Uuid>>()
        .top(TOP_LIMIT)
        .into_iter()
        .filter_map(|(restaurant_id, view_count)| {
            let restaurant_name = by_id.get(&restaurant_id)?.display_name()?.to_string();
            Some(PopularRestaurant { restaurant_id, restaurant_name, view_count })
        })
        .collect();

    let views_by_category = input
        .views
        .iter()
        .filter_map(|v| by_id.get(&v.restaurant_id).map(|r| r.category.clone()))
        .collect::<Tally<String>>()
        .into_entries()
        .into_iter()
        .map(|(category, count)| CategoryViews { category, count })
        .collect();

    DashboardStats {
        total_users: input.total_users,
        monthly_active_users,
        average_session_duration: average_session_duration(&input.visits),
        restaurants_viewed_per_session,
        total_restaurants: input.restaurants.len() as i64,
        restaurants_with_photos: input.photographed_restaurant_ids.iter().collect::<HashSet<_>>().len() as i64,
        restaurants_with_reviews: input.restaurants.iter().filter(|r| r.has_reviews()).count() as i64,
        vegetarian_friendly_count: input
            .restaurants
            .iter()
            .filter(|r| r.category == VEGETARIAN_FRIENDLY)
            .count() as i64,
        total_restaurant_views: input.views.len() as i64,
        total_search_queries: input.searches.len() as i64,
        popular_searches,
        popular_restaurants,
        views_by_category,
        daily_activity: daily_activity(input, since),
    }
}

/// Site-wide statistics, or `None` when any read fails.
pub fn get_dashboard_stats(store: &dyn ActivityStore, now: DateTime<Utc>, window_days: i64) -> Option<DashboardStats> {
    match DashboardInput::load(store) {
        Ok(input) => Some(compute_dashboard(&input, now, window_days)),
        Err(e) => {
            tracing::error!(error = %e, "failed to aggregate dashboard stats");
            None
        }
    }
}
