// Sessions and delegated credentials
// A session is created at sign-in, read-only afterwards, dropped at sign-out or expiry

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

/// Cookie carrying the opaque session id
pub const SESSION_COOKIE: &str = "dashboard_session";

/// How long an OAuth `state` stays redeemable
const PENDING_SIGN_IN_TTL_SECS: i64 = 600;

// ============================================================================
// CREDENTIAL
// ============================================================================

/// Validated delegated access token, handed explicitly to every data call.
///
/// Can only be built from a non-empty token. `Debug` never prints the token.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    access_token: String,
}

impl Credential {
    pub fn new(access_token: impl Into<String>) -> Option<Self> {
        let access_token = access_token.into();
        if access_token.trim().is_empty() {
            return None;
        }
        Some(Self { access_token })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// SESSION
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub name: String,
    pub email: String,
}

#[derive(Clone)]
pub struct Session {
    pub id: String,
    pub user: UserProfile,
    access_token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// `None` when the provider handed back an empty token
    pub fn credential(&self) -> Option<Credential> {
        Credential::new(self.access_token.clone())
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("id", &self.id)
            .field("user", &self.user)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// OAuth round-trip in flight, keyed by its `state` parameter
#[derive(Debug, Clone)]
pub struct PendingSignIn {
    pub code_verifier: String,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// SESSION STORE
// ============================================================================

#[derive(Default)]
struct StoreInner {
    sessions: HashMap<String, Session>,
    pending: HashMap<String, PendingSignIn>,
}

/// In-memory session store shared by all request handlers
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<StoreInner>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
            ttl: Duration::seconds(ttl_secs.min(u32::MAX as u64) as i64),
        }
    }

    pub fn create(&self, user: UserProfile, access_token: String) -> Session {
        let now = Utc::now();
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            user,
            access_token,
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.sessions.retain(|_, s| !s.is_expired(now));
        inner.sessions.insert(session.id.clone(), session.clone());
        session
    }

    /// Live session for `id`; expired sessions are evicted on lookup
    pub fn get(&self, id: &str) -> Option<Session> {
        let now = Utc::now();
        {
            let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
            match inner.sessions.get(id) {
                Some(session) if !session.is_expired(now) => return Some(session.clone()),
                Some(_) => {}
                None => return None,
            }
        }

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.sessions.remove(id);
        None
    }

    pub fn remove(&self, id: &str) -> Option<Session> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.sessions.remove(id)
    }

    pub fn len(&self) -> usize {
        let inner = self.inner.read().unwrap_or_else(|e| e.into_inner());
        inner.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remember a PKCE verifier and return the `state` to send to the provider
    pub fn begin_sign_in(&self, code_verifier: String) -> String {
        let now = Utc::now();
        let state = uuid::Uuid::new_v4().simple().to_string();

        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        inner.pending.retain(|_, pending| {
            now - pending.created_at < Duration::seconds(PENDING_SIGN_IN_TTL_SECS)
        });
        inner.pending.insert(
            state.clone(),
            PendingSignIn {
                code_verifier,
                created_at: now,
            },
        );
        state
    }

    /// One-shot: a `state` can be redeemed once, and only before it goes stale
    pub fn take_sign_in(&self, state: &str) -> Option<PendingSignIn> {
        let mut inner = self.inner.write().unwrap_or_else(|e| e.into_inner());
        let pending = inner.pending.remove(state)?;
        if Utc::now() - pending.created_at >= Duration::seconds(PENDING_SIGN_IN_TTL_SECS) {
            return None;
        }
        Some(pending)
    }
}

// ============================================================================
// COOKIES
// ============================================================================

/// Extract the session id from a raw `Cookie` header
pub fn session_id_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}

pub fn session_cookie(session: &Session, secure: bool) -> String {
    let max_age = (session.expires_at - session.created_at).num_seconds().max(0);
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, session.id, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

pub fn clear_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}
