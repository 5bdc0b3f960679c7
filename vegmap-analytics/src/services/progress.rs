use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::models::{RestaurantRef, RestaurantView, SearchQuery, Visit};
use crate::services::tally::{mean, Tally};
use crate::store::{ActivityStore, Scope, StoreResult};

pub const RECENT_LIMIT: usize = 10;
pub const UNKNOWN_RESTAURANT: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecentRestaurantView {
    pub restaurant_id: Uuid,
    pub restaurant_name: String,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserProgress {
    pub total_visits: i64,
    pub total_restaurants_viewed: i64,
    pub total_searches: i64,
    pub average_session_duration: i64,
    pub favorite_categories: Vec<CategoryCount>,
    pub recent_searches: Vec<SearchQuery>,
    pub recent_restaurant_views: Vec<RecentRestaurantView>,
}

/// Mean of the non-null durations, rounded to whole seconds. 0 when there
/// are none.
pub fn average_session_duration(visits: &[Visit]) -> i64 {
    mean(visits.iter().filter_map(|v| v.duration_seconds).map(f64::from))
        .map(|m| m.round() as i64)
        .unwrap_or(0)
}

pub fn compute_progress(
    visits: &[Visit],
    views: &[RestaurantView],
    searches: &[SearchQuery],
    restaurants: &[RestaurantRef],
) -> UserProgress {
    let by_id: HashMap<Uuid, &RestaurantRef> = restaurants.iter().map(|r| (r.id, r)).collect();

    let favorite_categories = views
        .iter()
        .filter_map(|v| by_id.get(&v.restaurant_id).map(|r| r.category.clone()))
        .collect::<Tally<String>>()
        .into_entries()
        .into_iter()
        .map(|(category, count)| CategoryCount { category, count })
        .collect();

    let mut recent_searches = searches.to_vec();
    recent_searches.sort_by(|a, b| b.searched_at.cmp(&a.searched_at));
    recent_searches.truncate(RECENT_LIMIT);

    let mut recent_views: Vec<&RestaurantView> = views.iter().collect();
    recent_views.sort_by(|a, b| b.viewed_at.cmp(&a.viewed_at));
    let recent_restaurant_views = recent_views
        .into_iter()
        .take(RECENT_LIMIT)
        .map(|v| RecentRestaurantView {
            restaurant_id: v.restaurant_id,
            restaurant_name: by_id
                .get(&v.restaurant_id)
                .and_then(|r| r.display_name())
                .unwrap_or(UNKNOWN_RESTAURANT)
                .to_string(),
            viewed_at: v.viewed_at,
        })
        .collect();

    UserProgress {
        total_visits: visits.len() as i64,
        total_restaurants_viewed: views.len() as i64,
        total_searches: searches.len() as i64,
        average_session_duration: average_session_duration(visits),
        favorite_categories,
        recent_searches,
        recent_restaurant_views,
    }
}

fn load_progress(store: &dyn ActivityStore, user_id: Uuid) -> StoreResult<UserProgress> {
    let scope = Scope::User(user_id);
    let visits = store.visits(scope)?;
    let views = store.restaurant_views(scope)?;
    let searches = store.search_queries(scope)?;

    let mut viewed_ids: Vec<Uuid> = views.iter().map(|v| v.restaurant_id).collect();
    viewed_ids.sort();
    viewed_ids.dedup();
    let restaurants = if viewed_ids.is_empty() {
        Vec::new()
    } else {
        store.restaurants(Some(&viewed_ids))?
    };

    Ok(compute_progress(&visits, &views, &searches, &restaurants))
}

/// Personal progress for a signed-in user. `None` for anonymous callers and
/// whenever a read fails.
pub fn get_user_progress(store: &dyn ActivityStore, user_id: Option<Uuid>) -> Option<UserProgress> {
    let user_id = user_id?;
    match load_progress(store, user_id) {
        Ok(progress) => Some(progress),
        Err(e) => {
            tracing::error!(error = %e, user_id = %user_id, "failed to aggregate user progress");
            None
        }
    }
}
