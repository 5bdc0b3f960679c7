use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{duration_seconds, ActivityStore, Scope, StoreError, StoreResult, VisitContext};
use crate::models::{
    NewRestaurantView, NewSearchQuery, NewVisit, RestaurantRef, RestaurantView, SearchQuery, Visit,
    VisitCounter,
};

#[derive(Default)]
struct Tables {
    users: Vec<(Uuid, String)>,
    visits: Vec<Visit>,
    views: Vec<RestaurantView>,
    searches: Vec<SearchQuery>,
    restaurants: Vec<RestaurantRef>,
    photos: Vec<Uuid>,
}

/// In-process store for tests. `fail_reads`/`fail_writes` make every read
/// or write return [`StoreError::Unavailable`]. With `enforce_restaurant_refs`
/// on, views of unknown restaurants are refused like a foreign key would.
#[derive(Default)]
pub struct MemoryActivityStore {
    tables: Mutex<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
    enforce_restaurant_refs: AtomicBool,
}

impl MemoryActivityStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn enforce_restaurant_refs(&self, enforce: bool) {
        self.enforce_restaurant_refs.store(enforce, Ordering::SeqCst);
    }

    pub fn add_user(&self, external_id: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().users.push((id, external_id.to_string()));
        id
    }

    pub fn add_restaurant(&self, name_en: &str, name_ko: &str, category: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.tables.lock().unwrap().restaurants.push(RestaurantRef {
            id,
            name_en: name_en.into(),
            name_ko: name_ko.into(),
            category: category.into(),
            naver_place_id: None,
        });
        id
    }

    pub fn add_photo(&self, restaurant_id: Uuid) {
        self.tables.lock().unwrap().photos.push(restaurant_id);
    }

    pub fn snapshot_visits(&self) -> Vec<Visit> {
        self.tables.lock().unwrap().visits.clone()
    }

    pub fn snapshot_views(&self) -> Vec<RestaurantView> {
        self.tables.lock().unwrap().views.clone()
    }

    pub fn snapshot_searches(&self) -> Vec<SearchQuery> {
        self.tables.lock().unwrap().searches.clone()
    }

    fn check_read(&self) -> StoreResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("reads disabled".into()));
        }
        Ok(())
    }

    fn check_write(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("writes disabled".into()));
        }
        Ok(())
    }
}

fn materialize(new: NewVisit, now: DateTime<Utc>) -> Visit {
    Visit {
        id: Uuid::new_v4(),
        user_id: new.user_id,
        session_id: new.session_id,
        started_at: new.started_at,
        ended_at: None,
        duration_seconds: None,
        page_views: new.page_views,
        restaurants_viewed: new.restaurants_viewed,
        searches_performed: new.searches_performed,
        user_agent: new.user_agent,
        referrer: new.referrer,
        created_at: now,
    }
}

fn latest_index(visits: &[Visit], session_id: &str, open_only: bool) -> Option<usize> {
    visits
        .iter()
        .enumerate()
        .filter(|(_, v)| v.session_id == session_id && (!open_only || v.is_open()))
        .max_by_key(|(_, v)| v.started_at)
        .map(|(i, _)| i)
}

impl ActivityStore for MemoryActivityStore {
    fn ping(&self) -> StoreResult<()> {
        self.check_read()
    }

    fn find_user_id(&self, external_id: &str) -> StoreResult<Option<Uuid>> {
        self.check_read()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables.users.iter().find(|(_, ext)| ext == external_id).map(|(id, _)| *id))
    }

    fn open_visit(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        context: VisitContext,
        now: DateTime<Utc>,
    ) -> StoreResult<Visit> {
        self.check_write()?;
        let mut tables = self.tables.lock().unwrap();
        if let Some(i) = latest_index(&tables.visits, session_id, true) {
            let visit = &mut tables.visits[i];
            visit.user_id = visit.user_id.or(user_id);
            return Ok(visit.clone());
        }
        let new_visit = NewVisit {
            user_agent: context.user_agent,
            referrer: context.referrer,
            ..NewVisit::open(session_id, user_id, now)
        };
        let visit = materialize(new_visit, now);
        tables.visits.push(visit.clone());
        Ok(visit)
    }

    fn bump_visit_counter(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        counter: VisitCounter,
        now: DateTime<Utc>,
    ) -> StoreResult<Visit> {
        self.check_write()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(i) = latest_index(&tables.visits, session_id, false) else {
            let visit = materialize(NewVisit::open(session_id, user_id, now).seeded_with(counter), now);
            tables.visits.push(visit.clone());
            return Ok(visit);
        };
        let visit = &mut tables.visits[i];
        match counter {
            VisitCounter::PageViews => visit.page_views += 1,
            VisitCounter::RestaurantsViewed => visit.restaurants_viewed += 1,
            VisitCounter::SearchesPerformed => visit.searches_performed += 1,
        }
        visit.user_id = visit.user_id.or(user_id);
        Ok(visit.clone())
    }

    fn close_visit(&self, session_id: &str, ended_at: DateTime<Utc>) -> StoreResult<Option<Visit>> {
        self.check_write()?;
        let mut tables = self.tables.lock().unwrap();
        let Some(i) = latest_index(&tables.visits, session_id, true) else {
            return Ok(None);
        };
        let visit = &mut tables.visits[i];
        visit.ended_at = Some(ended_at);
        visit.duration_seconds = Some(duration_seconds(visit.started_at, ended_at));
        Ok(Some(visit.clone()))
    }

    fn insert_restaurant_view(&self, view: NewRestaurantView) -> StoreResult<RestaurantView> {
        self.check_write()?;
        if self.enforce_restaurant_refs.load(Ordering::SeqCst) {
            let tables = self.tables.lock().unwrap();
            if !tables.restaurants.iter().any(|r| r.id == view.restaurant_id) {
                return Err(StoreError::Unavailable(format!(
                    "restaurant {} does not exist",
                    view.restaurant_id
                )));
            }
        }
        let row = RestaurantView {
            id: Uuid::new_v4(),
            restaurant_id: view.restaurant_id,
            user_id: view.user_id,
            session_id: view.session_id,
            viewed_at: view.viewed_at,
            source: view.source,
            created_at: view.viewed_at,
        };
        self.tables.lock().unwrap().views.push(row.clone());
        Ok(row)
    }

    fn insert_search_query(&self, query: NewSearchQuery) -> StoreResult<SearchQuery> {
        self.check_write()?;
        let row = SearchQuery {
            id: Uuid::new_v4(),
            user_id: query.user_id,
            session_id: query.session_id,
            query_text: query.query_text,
            filter_category: query.filter_category,
            results_count: query.results_count,
            searched_at: query.searched_at,
            created_at: query.searched_at,
        };
        self.tables.lock().unwrap().searches.push(row.clone());
        Ok(row)
    }

    fn visits(&self, scope: Scope) -> StoreResult<Vec<Visit>> {
        self.check_read()?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<Visit> = tables.visits.iter().filter(|v| scope.includes(v.user_id)).cloned().collect();
        rows.sort_by_key(|v| v.started_at);
        Ok(rows)
    }

    fn restaurant_views(&self, scope: Scope) -> StoreResult<Vec<RestaurantView>> {
        self.check_read()?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<RestaurantView> = tables.views.iter().filter(|v| scope.includes(v.user_id)).cloned().collect();
        rows.sort_by_key(|v| v.viewed_at);
        Ok(rows)
    }

    fn search_queries(&self, scope: Scope) -> StoreResult<Vec<SearchQuery>> {
        self.check_read()?;
        let tables = self.tables.lock().unwrap();
        let mut rows: Vec<SearchQuery> = tables.searches.iter().filter(|s| scope.includes(s.user_id)).cloned().collect();
        rows.sort_by_key(|s| s.searched_at);
        Ok(rows)
    }

    fn restaurants(&self, ids: Option<&[Uuid]>) -> StoreResult<Vec<RestaurantRef>> {
        self.check_read()?;
        let tables = self.tables.lock().unwrap();
        Ok(tables
            .restaurants
            .iter()
            .filter(|r| ids.map_or(true, |ids| ids.contains(&r.id)))
            .cloned()
            .collect())
    }

    fn count_users(&self) -> StoreResult<i64> {
        self.check_read()?;
        Ok(self.tables.lock().unwrap().users.len() as i64)
    }

    fn photographed_restaurant_ids(&self) -> StoreResult<Vec<Uuid>> {
        self.check_read()?;
        let mut ids = self.tables.lock().unwrap().photos.clone();
        ids.sort();
        ids.dedup();
        Ok(ids)
    }
}
