use diesel::prelude::*;
use uuid::Uuid;

use vegmap_shared::errors::{AppError, AppResult, ErrorCode};
use vegmap_shared::types::auth::AuthUser;

use crate::schema::users;

/// Internal id for an identity-provider subject, `None` until the user has
/// been synced into `users`.
pub fn find_user_id(conn: &mut PgConnection, external_id: &str) -> AppResult<Option<Uuid>> {
    let id = users::table
        .filter(users::external_id.eq(external_id))
        .select(users::id)
        .first::<Uuid>(conn)
        .optional()?;
    Ok(id)
}

/// Like [`find_user_id`] but rejects callers that are not synced yet.
pub fn require_user_id(conn: &mut PgConnection, user: &AuthUser) -> AppResult<Uuid> {
    find_user_id(conn, &user.external_id)?.ok_or_else(|| {
        AppError::new(
            ErrorCode::UserNotSynced,
            "your account is still being set up, try again shortly",
        )
    })
}
