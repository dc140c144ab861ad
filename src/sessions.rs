use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::{Duration, Instant},
};

use axum::http::HeaderMap;
use rand::RngCore;
use tokio::{sync::watch, time};

pub const SESSION_COOKIE: &str = "pastedrop_session";

/// How long a password session stays valid.
pub const SESSION_DURATION: Duration = Duration::from_secs(60 * 60);

/// How often the reaper drops stale sessions. Purely memory hygiene:
/// `validate` rejects expired sessions on its own, the reaper only bounds
/// the map's growth.
const REAP_INTERVAL: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
struct Session {
    filename: String,
    created_at: Instant,
}

/// In-memory grants created after a successful password entry. Each
/// session authorizes exactly one file for one hour. Reads run in
/// parallel; creation and reaping take the write half of the lock.
#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session bound to `filename` and return its opaque token
    /// (32 random bytes, hex-encoded). Collisions are vanishingly
    /// unlikely and not handled.
    pub fn create(&self, filename: &str) -> String {
        let mut bytes = [0u8; 32];
        rand::rng().fill_bytes(&mut bytes);
        let token = hex::encode(bytes);

        let mut sessions = self.inner.write().expect("session lock poisoned");
        sessions.insert(
            token.clone(),
            Session {
                filename: filename.to_string(),
                created_at: Instant::now(),
            },
        );

        token
    }

    /// True iff the token exists, is bound to this exact file, and has not
    /// aged out. Unknown token, wrong file and expiry are deliberately
    /// indistinguishable.
    pub fn validate(&self, token: &str, filename: &str) -> bool {
        let sessions = self.inner.read().expect("session lock poisoned");
        match sessions.get(token) {
            Some(session) => {
                session.filename == filename && session.created_at.elapsed() < SESSION_DURATION
            }
            None => false,
        }
    }

    /// Periodically drop sessions older than [`SESSION_DURATION`] until
    /// shutdown is signalled.
    pub fn spawn_reaper(&self, mut shutdown: watch::Receiver<()>) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = time::interval(REAP_INTERVAL);
            ticker.tick().await; // first tick fires immediately, skip it
            loop {
                tokio::select! {
                    _ = ticker.tick() => store.reap(),
                    _ = shutdown.changed() => break,
                }
            }
        });
    }

    fn reap(&self) {
        let mut sessions = self.inner.write().expect("session lock poisoned");
        let before = sessions.len();
        sessions.retain(|_, session| session.created_at.elapsed() < SESSION_DURATION);
        let dropped = before - sessions.len();
        if dropped > 0 {
            tracing::debug!("reaped {dropped} expired sessions");
        }
    }

    #[cfg(test)]
    pub(crate) fn insert_backdated(&self, token: &str, filename: &str, age: Duration) {
        let created_at = Instant::now()
            .checked_sub(age)
            .expect("backdated instant out of range");
        let mut sessions = self.inner.write().expect("session lock poisoned");
        sessions.insert(
            token.to_string(),
            Session {
                filename: filename.to_string(),
                created_at,
            },
        );
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.inner.read().expect("session lock poisoned").len()
    }

    #[cfg(test)]
    pub(crate) fn reap_now(&self) {
        self.reap();
    }
}

/// Pull our session token out of the request's `Cookie` header.
pub fn cookie_token(headers: &HeaderMap) -> Option<String> {
    let cookies = headers.get(axum::http::header::COOKIE)?.to_str().ok()?;
    for pair in cookies.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == SESSION_COOKIE {
                return Some(value.to_string());
            }
        }
    }
    None
}

/// `Set-Cookie` value for a freshly created session.
pub fn session_cookie(token: &str) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Max-Age={}; Path=/; HttpOnly; SameSite=Lax",
        SESSION_DURATION.as_secs()
    )
}
