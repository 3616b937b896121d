//! Cached principal in the caller's session

use crate::{models::Principal, session::Session};

/// Session attribute holding the serialized principal
pub const CURRENT_USER_KEY: &str = "current-user";

pub struct SessionHolder;

impl SessionHolder {
    pub fn get(session: &Session) -> Option<Principal> {
        let value = session.get(CURRENT_USER_KEY)?;
        match serde_json::from_value(value) {
            Ok(principal) => Some(principal),
            Err(e) => {
                tracing::warn!(session_id = %session.id(), error = %e, "discarding unreadable session principal");
                session.set(CURRENT_USER_KEY, None);
                None
            }
        }
    }

    pub fn set(session: &Session, principal: &Principal) {
        match serde_json::to_value(principal) {
            Ok(value) => session.set(CURRENT_USER_KEY, Some(value)),
            Err(e) => tracing::error!(error = %e, "failed to serialize principal into session"),
        }
    }

    /// Store the principal under a freshly rotated session id
    pub fn establish(session: &Session, principal: &Principal) {
        session.rotate();
        Self::set(session, principal);
    }

    pub fn clear(session: &Session) {
        session.set(CURRENT_USER_KEY, None);
    }
}
