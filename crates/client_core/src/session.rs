//! Client-local session: the bearer token, the signed-in user and their role.
//!
//! [`SessionManager`] is the only writer. The API client reads the token from
//! it on every authenticated call and asks it to invalidate the session when
//! the server answers 401/403; dependents learn about that through
//! [`SessionManager::subscribe`].

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex as StdMutex},
};

use serde::{Deserialize, Serialize};
use shared::{domain::Role, protocol::UserProfile};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info, warn};

use crate::error::SessionError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub user: UserProfile,
    pub token: String,
    pub role: Role,
}

impl Session {
    pub fn new(user: UserProfile, token: impl Into<String>) -> Self {
        let role = user.role;
        Self {
            user,
            token: token.into(),
            role,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvalidationReason {
    Logout,
    Rejected { status: u16 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    SignedIn { role: Role },
    Invalidated { reason: InvalidationReason },
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, SessionError>;
    fn save(&self, session: &Session) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}

#[derive(Default)]
pub struct MemorySessionStore {
    slot: StdMutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            slot: StdMutex::new(Some(session)),
        }
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        Ok(self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone())
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        *self
            .slot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
        Ok(())
    }
}

/// Session persisted as a JSON file between CLI invocations.
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&raw)?))
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, serde_json::to_vec_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    current: RwLock<Option<Session>>,
    events: broadcast::Sender<SessionEvent>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        let (events, _) = broadcast::channel(64);
        Self {
            store,
            current: RwLock::new(None),
            events,
        }
    }

    /// Builds a manager primed with whatever the store already holds.
    pub fn restore(store: Arc<dyn SessionStore>) -> Result<Self, SessionError> {
        let existing = store.load()?;
        if existing.is_some() {
            debug!("restored persisted session");
        }
        let (events, _) = broadcast::channel(64);
        Ok(Self {
            store,
            current: RwLock::new(existing),
            events,
        })
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionStore::new()))
    }

    pub async fn establish(&self, session: Session) -> Result<(), SessionError> {
        self.store.save(&session)?;
        let role = session.role;
        *self.current.write().await = Some(session);
        info!(role = ?role, "session established");
        let _ = self.events.send(SessionEvent::SignedIn { role });
        Ok(())
    }

    /// Clears the session. Storage failures are logged, the in-memory session
    /// is dropped regardless.
    pub async fn invalidate(&self, reason: InvalidationReason) {
        let had_session = self.current.write().await.take().is_some();
        if let Err(err) = self.store.clear() {
            warn!(error = %err, "failed to clear persisted session");
        }
        if had_session {
            info!(reason = ?reason, "session invalidated");
        }
        let _ = self.events.send(SessionEvent::Invalidated { reason });
    }

    pub async fn current(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    pub async fn token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.token.clone())
    }

    pub async fn role(&self) -> Option<Role> {
        self.current.read().await.as_ref().map(|session| session.role)
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
