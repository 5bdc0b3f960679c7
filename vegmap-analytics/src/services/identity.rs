use uuid::Uuid;

use vegmap_shared::middleware::SessionToken;
use vegmap_shared::types::auth::AuthUser;

use crate::store::ActivityStore;

/// Who a tracked event is attributed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub session_id: String,
    pub user_id: Option<Uuid>,
}

impl Actor {
    pub fn anonymous(session_id: impl Into<String>) -> Self {
        Self { session_id: session_id.into(), user_id: None }
    }
}

/// Maps a verified caller to the internal user id.
///
/// Callers not yet synced to `users`, and lookups that fail, resolve to
/// anonymous.
pub fn resolve_user_id(store: &dyn ActivityStore, user: Option<&AuthUser>) -> Option<Uuid> {
    let user = user?;
    match store.find_user_id(&user.external_id) {
        Ok(Some(id)) => Some(id),
        Ok(None) => {
            tracing::debug!(external_id = %user.external_id, "caller not synced yet, tracking anonymously");
            None
        }
        Err(e) => {
            tracing::warn!(error = %e, external_id = %user.external_id, "user lookup failed");
            None
        }
    }
}

pub fn resolve_actor(store: &dyn ActivityStore, session: &SessionToken, user: Option<&AuthUser>) -> Actor {
    Actor {
        session_id: session.id.clone(),
        user_id: resolve_user_id(store, user),
    }
}
