//! Record-fetch interface behind the recorder and both aggregators.
//!
//! Handlers and services only see [`ActivityStore`]; the Postgres
//! implementation is wired in `main`, tests use the in-memory one.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    NewRestaurantView, NewSearchQuery, RestaurantRef, RestaurantView, SearchQuery, Visit,
    VisitCounter,
};

mod postgres;
#[cfg(test)]
pub(crate) mod memory;

pub use postgres::PgActivityStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Which rows a read covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    All,
    User(Uuid),
}

impl Scope {
    pub fn includes(&self, user_id: Option<Uuid>) -> bool {
        match self {
            Self::All => true,
            Self::User(id) => user_id == Some(*id),
        }
    }
}

/// Extra request context stored on a freshly opened visit.
#[derive(Debug, Clone, Default)]
pub struct VisitContext {
    pub user_agent: Option<String>,
    pub referrer: Option<String>,
}

pub trait ActivityStore: Send + Sync {
    fn ping(&self) -> StoreResult<()>;

    /// Internal id for an identity-provider subject, if the user is synced.
    fn find_user_id(&self, external_id: &str) -> StoreResult<Option<Uuid>>;

    /// Returns the session's open visit, or inserts one.
    fn open_visit(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        context: VisitContext,
        now: DateTime<Utc>,
    ) -> StoreResult<Visit>;

    /// Increments `counter` on the session's most recently started visit,
    /// inserting a visit with the counter at 1 when the session has none.
    fn bump_visit_counter(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        counter: VisitCounter,
        now: DateTime<Utc>,
    ) -> StoreResult<Visit>;

    /// Closes the session's open visit. `None` when nothing was open.
    fn close_visit(&self, session_id: &str, ended_at: DateTime<Utc>) -> StoreResult<Option<Visit>>;

    fn insert_restaurant_view(&self, view: NewRestaurantView) -> StoreResult<RestaurantView>;

    fn insert_search_query(&self, query: NewSearchQuery) -> StoreResult<SearchQuery>;

    /// Visits ordered by `started_at` ascending.
    fn visits(&self, scope: Scope) -> StoreResult<Vec<Visit>>;

    /// Views ordered by `viewed_at` ascending.
    fn restaurant_views(&self, scope: Scope) -> StoreResult<Vec<RestaurantView>>;

    /// Searches ordered by `searched_at` ascending.
    fn search_queries(&self, scope: Scope) -> StoreResult<Vec<SearchQuery>>;

    /// All restaurants, or only those in `ids`.
    fn restaurants(&self, ids: Option<&[Uuid]>) -> StoreResult<Vec<RestaurantRef>>;

    fn count_users(&self) -> StoreResult<i64>;

    /// Distinct restaurant ids with at least one photo.
    fn photographed_restaurant_ids(&self) -> StoreResult<Vec<Uuid>>;
}

/// Whole seconds between start and end, never negative.
pub(crate) fn duration_seconds(started_at: DateTime<Utc>, ended_at: DateTime<Utc>) -> i32 {
    let secs = (ended_at - started_at).num_seconds().max(0);
    i32::try_from(secs).unwrap_or(i32::MAX)
}
