use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use vegmap_shared::clients::db::{DbConn, DbPool};

use super::{duration_seconds, ActivityStore, Scope, StoreError, StoreResult, VisitContext};
use crate::models::{
    NewRestaurantView, NewSearchQuery, NewVisit, RestaurantRef, RestaurantView, SearchQuery, Visit,
    VisitCounter,
};
use crate::schema::{restaurant_photos, restaurant_views, restaurants, search_queries, user_visits, users};

pub struct PgActivityStore {
    pool: DbPool,
}

impl PgActivityStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> StoreResult<DbConn> {
        Ok(self.pool.get()?)
    }
}

/// Latest visit for the session, locked for the rest of the transaction.
fn lock_latest_visit(conn: &mut PgConnection, session_id: &str, open_only: bool) -> QueryResult<Option<Visit>> {
    if open_only {
        user_visits::table
            .filter(user_visits::session_id.eq(session_id))
            .filter(user_visits::ended_at.is_null())
            .order(user_visits::started_at.desc())
            .for_update()
            .first::<Visit>(conn)
            .optional()
    } else {
        user_visits::table
            .filter(user_visits::session_id.eq(session_id))
            .order(user_visits::started_at.desc())
            .for_update()
            .first::<Visit>(conn)
            .optional()
    }
}

/// Attaches the signed-in user to a visit that started anonymously.
fn claim_visit(conn: &mut PgConnection, visit: Visit, user_id: Option<Uuid>) -> QueryResult<Visit> {
    match user_id {
        Some(uid) if visit.user_id.is_none() => diesel::update(user_visits::table.find(visit.id))
            .set(user_visits::user_id.eq(uid))
            .get_result(conn),
        _ => Ok(visit),
    }
}

impl ActivityStore for PgActivityStore {
    fn ping(&self) -> StoreResult<()> {
        let mut conn = self.conn()?;
        diesel::sql_query("SELECT 1").execute(&mut conn)?;
        Ok(())
    }

    fn find_user_id(&self, external_id: &str) -> StoreResult<Option<Uuid>> {
        let mut conn = self.conn()?;
        let id = users::table
            .filter(users::external_id.eq(external_id))
            .select(users::id)
            .first::<Uuid>(&mut conn)
            .optional()?;
        Ok(id)
    }

    fn open_visit(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        context: VisitContext,
        now: DateTime<Utc>,
    ) -> StoreResult<Visit> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<Visit, StoreError, _>(|conn| {
            if let Some(current) = lock_latest_visit(conn, session_id, true)? {
                return Ok(claim_visit(conn, current, user_id)?);
            }

            let new_visit = NewVisit {
                user_agent: context.user_agent,
                referrer: context.referrer,
                ..NewVisit::open(session_id, user_id, now)
            };
            let visit = diesel::insert_into(user_visits::table)
                .values(&new_visit)
                .get_result(conn)?;
            Ok(visit)
        })
    }

    fn bump_visit_counter(
        &self,
        session_id: &str,
        user_id: Option<Uuid>,
        counter: VisitCounter,
        now: DateTime<Utc>,
    ) -> StoreResult<Visit> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<Visit, StoreError, _>(|conn| {
            let Some(current) = lock_latest_visit(conn, session_id, false)? else {
                let visit = diesel::insert_into(user_visits::table)
                    .values(&NewVisit::open(session_id, user_id, now).seeded_with(counter))
                    .get_result(conn)?;
                return Ok(visit);
            };

            let target = user_visits::table.find(current.id);
            let bumped: Visit = match counter {
                VisitCounter::PageViews => diesel::update(target)
                    .set(user_visits::page_views.eq(user_visits::page_views + 1))
                    .get_result(conn)?,
                VisitCounter::RestaurantsViewed => diesel::update(target)
                    .set(user_visits::restaurants_viewed.eq(user_visits::restaurants_viewed + 1))
                    .get_result(conn)?,
                VisitCounter::SearchesPerformed => diesel::update(target)
                    .set(user_visits::searches_performed.eq(user_visits::searches_performed + 1))
                    .get_result(conn)?,
            };
            Ok(claim_visit(conn, bumped, user_id)?)
        })
    }

    fn close_visit(&self, session_id: &str, ended_at: DateTime<Utc>) -> StoreResult<Option<Visit>> {
        let mut pooled = self.conn()?;
        let conn: &mut PgConnection = &mut pooled;
        conn.transaction::<Option<Visit>, StoreError, _>(|conn| {
            let Some(current) = lock_latest_visit(conn, session_id, true)? else {
                return Ok(None);
            };
            let closed = diesel::update(user_visits::table.find(current.id))
                .set((
                    user_visits::ended_at.eq(ended_at),
                    user_visits::duration_seconds.eq(duration_seconds(current.started_at, ended_at)),
                ))
                .get_result(conn)?;
            Ok(Some(closed))
        })
    }

    fn insert_restaurant_view(&self, view: NewRestaurantView) -> StoreResult<RestaurantView> {
        let mut conn = self.conn()?;
        let row = diesel::insert_into(restaurant_views::table)
            .values(&view)
            .get_result(&mut conn)?;
        Ok(row)
    }

    fn insert_search_query(&self, query: NewSearchQuery) -> StoreResult<SearchQuery> {
        let mut conn = self.conn()?;
        let row = diesel::insert_into(search_queries::table)
            .values(&query)
            .get_result(&mut conn)?;
        Ok(row)
    }

    fn visits(&self, scope: Scope) -> StoreResult<Vec<Visit>> {
        let mut conn = self.conn()?;
        let mut query = user_visits::table.into_boxed();
        if let Scope::User(id) = scope {
            query = query.filter(user_visits::user_id.eq(id));
        }
        Ok(query.order(user_visits::started_at.asc()).load(&mut conn)?)
    }

    fn restaurant_views(&self, scope: Scope) -> StoreResult<Vec<RestaurantView>> {
        let mut conn = self.conn()?;
        let mut query = restaurant_views::table.into_boxed();
        if let Scope::User(id) = scope {
            query = query.filter(restaurant_views::user_id.eq(id));
        }
        Ok(query.order(restaurant_views::viewed_at.asc()).load(&mut conn)?)
    }

    fn search_queries(&self, scope: Scope) -> StoreResult<Vec<SearchQuery>> {
        let mut conn = self.conn()?;
        let mut query = search_queries::table.into_boxed();
        if let Scope::User(id) = scope {
            query = query.filter(search_queries::user_id.eq(id));
        }
        Ok(query.order(search_queries::searched_at.asc()).load(&mut conn)?)
    }

    fn restaurants(&self, ids: Option<&[Uuid]>) -> StoreResult<Vec<RestaurantRef>> {
        let mut conn = self.conn()?;
        let mut query = restaurants::table.into_boxed();
        if let Some(ids) = ids {
            query = query.filter(restaurants::id.eq_any(ids.to_vec()));
        }
        Ok(query.load(&mut conn)?)
    }

    fn count_users(&self) -> StoreResult<i64> {
        let mut conn = self.conn()?;
        Ok(users::table.count().get_result(&mut conn)?)
    }

    fn photographed_restaurant_ids(&self) -> StoreResult<Vec<Uuid>> {
        let mut conn = self.conn()?;
        Ok(restaurant_photos::table
            .select(restaurant_photos::restaurant_id)
            .distinct()
            .load(&mut conn)?)
    }
}
