//! Fire-and-forget activity tracking.
//!
//! Every operation swallows store failures after logging them and bumping
//! `tracking_write_failures_total`; tracking never fails the request that
//! triggered it. A visit counter only moves once its fact row is stored.

use chrono::{DateTime, Utc};
use metrics::{counter, describe_counter};
use uuid::Uuid;

use crate::models::{NewRestaurantView, NewSearchQuery, TrackingEvent, Visit};
use crate::services::identity::Actor;
use crate::store::{ActivityStore, StoreResult, VisitContext};

pub const DEFAULT_VIEW_SOURCE: &str = "unknown";

#[derive(Debug, Clone)]
pub struct SearchEvent {
    pub query_text: String,
    pub filter_category: Option<String>,
    pub results_count: i32,
}

/// Registers descriptions for the recorder's counters.
pub fn describe_metrics() {
    describe_counter!("tracking_events_total", "Tracked client events by kind");
    describe_counter!(
        "tracking_write_failures_total",
        "Tracking writes that failed and were dropped, by operation"
    );
}

fn swallow<T>(operation: &'static str, actor_session: &str, result: StoreResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            counter!("tracking_write_failures_total", "operation" => operation).increment(1);
            tracing::error!(error = %e, operation, session_id = %actor_session, "failed to record activity");
            None
        }
    }
}

fn bump(store: &dyn ActivityStore, actor: &Actor, event: TrackingEvent, now: DateTime<Utc>) -> Option<Visit> {
    counter!("tracking_events_total", "event" => event.as_str()).increment(1);
    swallow(
        event.as_str(),
        &actor.session_id,
        store.bump_visit_counter(&actor.session_id, actor.user_id, event.counter(), now),
    )
}

/// Opens a visit for the session unless one is already open.
pub fn start_visit(
    store: &dyn ActivityStore,
    actor: &Actor,
    context: VisitContext,
    now: DateTime<Utc>,
) -> Option<Visit> {
    let visit = swallow(
        "visit_start",
        &actor.session_id,
        store.open_visit(&actor.session_id, actor.user_id, context, now),
    )?;
    tracing::debug!(visit_id = %visit.id, session_id = %visit.session_id, "visit started");
    Some(visit)
}

pub fn track_page_view(store: &dyn ActivityStore, actor: &Actor, now: DateTime<Utc>) {
    bump(store, actor, TrackingEvent::PageView, now);
}

pub fn track_restaurant_view(
    store: &dyn ActivityStore,
    actor: &Actor,
    restaurant_id: Uuid,
    source: Option<String>,
    now: DateTime<Utc>,
) {
    let source = source
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_VIEW_SOURCE.to_string());
    let view = NewRestaurantView {
        restaurant_id,
        user_id: actor.user_id,
        session_id: actor.session_id.clone(),
        viewed_at: now,
        source: Some(source),
    };
    if swallow("restaurant_view_insert", &actor.session_id, store.insert_restaurant_view(view)).is_none() {
        return;
    }
    bump(store, actor, TrackingEvent::RestaurantView, now);
}

pub fn track_search(store: &dyn ActivityStore, actor: &Actor, search: SearchEvent, now: DateTime<Utc>) {
    let query = NewSearchQuery {
        user_id: actor.user_id,
        session_id: actor.session_id.clone(),
        query_text: search.query_text,
        filter_category: search.filter_category.filter(|c| !c.is_empty()),
        results_count: search.results_count,
        searched_at: now,
    };
    if swallow("search_insert", &actor.session_id, store.insert_search_query(query)).is_none() {
        return;
    }
    bump(store, actor, TrackingEvent::Search, now);
}

/// Closes the session's open visit; nothing happens when none is open.
pub fn end_visit(store: &dyn ActivityStore, session_id: &str, now: DateTime<Utc>) -> Option<Visit> {
    let closed = swallow("visit_end", session_id, store.close_visit(session_id, now))??;
    tracing::debug!(
        visit_id = %closed.id,
        duration_seconds = closed.duration_seconds.unwrap_or_default(),
        "visit ended"
    );
    Some(closed)
}
