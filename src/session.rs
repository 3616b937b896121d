//! Cookie-keyed server-side sessions
//! An opaque id travels in a cookie; attributes live in a `SessionStore`

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap, HeaderValue},
    middleware::Next,
    response::Response,
};
use dashmap::DashMap;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::{config::SessionConfig, error::AppError};

/// Server-side attribute storage keyed by session id
pub trait SessionStore: Send + Sync {
    fn get_attribute(&self, session_id: &str, key: &str) -> Option<Value>;

    /// `None` removes the attribute
    fn set_attribute(&self, session_id: &str, key: &str, value: Option<Value>);

    fn contains(&self, session_id: &str) -> bool;

    /// Forget the session and every attribute under it
    fn remove(&self, session_id: &str);

    /// Drop sessions idle past their timeout, returning how many were evicted
    fn purge_expired(&self) -> usize {
        0
    }
}

struct SessionEntry {
    attributes: HashMap<String, Value>,
    last_access: Instant,
}

/// Process-local store with idle eviction
pub struct MemorySessionStore {
    sessions: DashMap<String, SessionEntry>,
    idle_timeout: Duration,
}

impl MemorySessionStore {
    pub fn new(idle_timeout: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            idle_timeout,
        }
    }

    fn is_expired(&self, entry: &SessionEntry) -> bool {
        entry.last_access.elapsed() > self.idle_timeout
    }
}

impl SessionStore for MemorySessionStore {
    fn get_attribute(&self, session_id: &str, key: &str) -> Option<Value> {
        let mut entry = self.sessions.get_mut(session_id)?;
        if self.is_expired(&entry) {
            drop(entry);
            self.sessions.remove(session_id);
            return None;
        }
        entry.last_access = Instant::now();
        entry.attributes.get(key).cloned()
    }

    fn set_attribute(&self, session_id: &str, key: &str, value: Option<Value>) {
        let mut entry = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionEntry {
                attributes: HashMap::new(),
                last_access: Instant::now(),
            });
        entry.last_access = Instant::now();
        match value {
            Some(v) => {
                entry.attributes.insert(key.to_string(), v);
            }
            None => {
                entry.attributes.remove(key);
            }
        }
    }

    fn contains(&self, session_id: &str) -> bool {
        self.sessions
            .get(session_id)
            .map(|entry| !self.is_expired(&entry))
            .unwrap_or(false)
    }

    fn remove(&self, session_id: &str) {
        self.sessions.remove(session_id);
    }

    fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        self.sessions.retain(|_, entry| entry.last_access.elapsed() <= self.idle_timeout);
        before.saturating_sub(self.sessions.len())
    }
}

/// Per-request handle on the caller's session
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: RwLock<Arc<str>>,
    store: Arc<dyn SessionStore>,
    issue_cookie: AtomicBool,
    written: AtomicBool,
}

fn new_session_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Session {
    /// `fresh` marks an id minted for this request rather than presented by the client
    pub fn new(id: impl Into<Arc<str>>, store: Arc<dyn SessionStore>, fresh: bool) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                id: RwLock::new(id.into()),
                store,
                issue_cookie: AtomicBool::new(fresh),
                written: AtomicBool::new(false),
            }),
        }
    }

    pub fn id(&self) -> Arc<str> {
        self.inner
            .id
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.inner.store.get_attribute(&self.id(), key)
    }

    pub fn set(&self, key: &str, value: Option<Value>) {
        self.inner.written.store(true, Ordering::Relaxed);
        self.inner.store.set_attribute(&self.id(), key, value);
    }

    /// Move the caller onto a newly minted id. The old id and its attributes are dropped
    /// and the new id goes out as a cookie once something is stored under it.
    pub fn rotate(&self) {
        let old = {
            let mut id = self
                .inner
                .id
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            std::mem::replace(&mut *id, Arc::from(new_session_id()))
        };
        self.inner.store.remove(&old);
        self.inner.issue_cookie.store(true, Ordering::Relaxed);
    }

    /// True when this request minted the id and stored something under it
    fn needs_cookie(&self) -> bool {
        self.inner.issue_cookie.load(Ordering::Relaxed) && self.inner.written.load(Ordering::Relaxed)
    }
}

impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer not installed".to_string()))
    }
}

/// State for `session_middleware`
#[derive(Clone)]
pub struct SessionLayerState {
    pub store: Arc<dyn SessionStore>,
    pub config: Arc<SessionConfig>,
}

fn session_id_from_cookies(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|s| s.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, value)| value.to_string())
        .filter(|value| !value.is_empty())
}

fn session_cookie(config: &SessionConfig, id: &str) -> String {
    let mut cookie = format!("{}={}; Path=/; HttpOnly; SameSite=Lax", config.cookie_name, id);
    if config.secure_cookie {
        cookie.push_str("; Secure");
    }
    cookie
}

/// Attaches a `Session` to every request and issues the cookie when a new session gets written
pub async fn session_middleware(
    State(layer): State<SessionLayerState>,
    mut req: Request,
    next: Next,
) -> Response {
    let known = session_id_from_cookies(req.headers(), &layer.config.cookie_name)
        .filter(|id| layer.store.contains(id));

    let session = match known {
        Some(id) => Session::new(id, layer.store.clone(), false),
        None => Session::new(new_session_id(), layer.store.clone(), true),
    };

    req.extensions_mut().insert(session.clone());

    let mut response = next.run(req).await;

    if session.needs_cookie() {
        match HeaderValue::from_str(&session_cookie(&layer.config, &session.id())) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::warn!(error = %e, "could not encode session cookie"),
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_set_get_clear() {
        let store = MemorySessionStore::new(Duration::from_secs(60));
        store.set_attribute("s1", "k", Some(json!({"a": 1})));
        assert_eq!(store.get_attribute("s1", "k"), Some(json!({"a": 1})));
        assert!(store.get_attribute("s2", "k").is_none());

        store.set_attribute("s1", "k", None);
        assert!(store.get_attribute("s1", "k").is_none());
        assert!(store.contains("s1"));
    }

    #[test]
    fn test_idle_sessions_expire() {
        let store = MemorySessionStore::new(Duration::from_millis(0));
        store.set_attribute("s1", "k", Some(json!(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert!(!store.contains("s1"));
        assert!(store.get_attribute("s1", "k").is_none());

        store.set_attribute("s2", "k", Some(json!(1)));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(store.purge_expired(), 1);
        assert!(!store.contains("s2"));
    }

    #[test]
    fn test_rotate_moves_to_a_new_id() {
        let store = Arc::new(MemorySessionStore::new(Duration::from_secs(60)));
        store.set_attribute("known", "k", Some(json!("old")));

        let session = Session::new("known", store.clone() as Arc<dyn SessionStore>, false);
        assert!(!session.needs_cookie());
        let handle = session.clone();

        session.rotate();
        let rotated = session.id();
        assert_ne!(&*rotated, "known");
        assert!(!store.contains("known"));
        assert!(session.get("k").is_none());

        // clones made before the rotation see the new id
        handle.set("k", Some(json!("new")));
        assert_eq!(store.get_attribute(&rotated, "k"), Some(json!("new")));
        assert!(session.needs_cookie());
    }

    #[test]
    fn test_cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark; SESSION_ID=abc123".parse().unwrap());
        assert_eq!(session_id_from_cookies(&headers, "SESSION_ID"), Some("abc123".to_string()));
        assert_eq!(session_id_from_cookies(&headers, "OTHER"), None);
    }

    #[test]
    fn test_cookie_flags() {
        let mut config = SessionConfig {
            cookie_name: "SESSION_ID".to_string(),
            idle_timeout_secs: 60,
            secure_cookie: false,
            purge_interval_secs: 60,
        };
        assert_eq!(
            session_cookie(&config, "abc"),
            "SESSION_ID=abc; Path=/; HttpOnly; SameSite=Lax"
        );
        config.secure_cookie = true;
        assert!(session_cookie(&config, "abc").ends_with("; Secure"));
    }
}
