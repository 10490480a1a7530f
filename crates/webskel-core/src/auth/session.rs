use std::sync::Arc;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::api::TokenSource;
use crate::models::User;

use super::storage::{MemoryStorage, SessionStorage};

/// Storage key the session document lives under
pub const STORAGE_KEY: &str = "auth-storage";

/// Version tag written alongside the state. Documents with any other
/// version are discarded on load.
const STORAGE_VERSION: u32 = 0;

/// The current token and profile. Either both are set or neither is.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    token: Option<String>,
    user: Option<User>,
}

impl SessionState {
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }
}

/// On-disk layout: `{"state": {...}, "version": 0}`, the same shape the
/// web frontend persists.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    state: StoredState,
    #[serde(default)]
    version: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoredState {
    #[serde(default)]
    token: Option<String>,
    #[serde(default)]
    user: Option<User>,
    #[serde(rename = "isAuthenticated", default)]
    is_authenticated: bool,
}

impl From<&SessionState> for PersistedSession {
    fn from(state: &SessionState) -> Self {
        Self {
            state: StoredState {
                token: state.token.clone(),
                user: state.user.clone(),
                is_authenticated: state.is_authenticated(),
            },
            version: STORAGE_VERSION,
        }
    }
}

impl From<StoredState> for SessionState {
    fn from(stored: StoredState) -> Self {
        match (stored.token, stored.user) {
            (Some(token), Some(user)) => {
                if !stored.is_authenticated {
                    warn!("Stored session flag disagrees with its contents, recomputing");
                }
                SessionState {
                    token: Some(token),
                    user: Some(user),
                }
            }
            (None, None) => SessionState::default(),
            _ => {
                warn!("Stored session is only partially set, starting signed out");
                SessionState::default()
            }
        }
    }
}

/// Shared handle to the process's session.
///
/// Clones share one state. Every mutation is written to storage before the
/// next one can start, and subscribers are notified after each.
#[derive(Clone)]
pub struct SessionStore {
    state: Arc<watch::Sender<SessionState>>,
    storage: Arc<dyn SessionStorage>,
}

impl SessionStore {
    /// Open the store, rehydrating whatever `storage` holds.
    /// An unreadable document yields an empty session.
    pub fn open(storage: impl SessionStorage + 'static) -> Result<Self> {
        let state = Self::rehydrate(&storage)?;
        debug!(authenticated = state.is_authenticated(), "Session loaded");

        let (tx, _rx) = watch::channel(state);
        Ok(Self {
            state: Arc::new(tx),
            storage: Arc::new(storage),
        })
    }

    /// A session that lives only as long as the process
    pub fn in_memory() -> Self {
        let (tx, _rx) = watch::channel(SessionState::default());
        Self {
            state: Arc::new(tx),
            storage: Arc::new(MemoryStorage::default()),
        }
    }

    fn rehydrate(storage: &dyn SessionStorage) -> Result<SessionState> {
        let Some(contents) = storage.get(STORAGE_KEY).context("Failed to read session")? else {
            return Ok(SessionState::default());
        };

        match serde_json::from_str::<PersistedSession>(&contents) {
            Ok(doc) if doc.version == STORAGE_VERSION => Ok(doc.state.into()),
            Ok(doc) => {
                warn!(version = doc.version, "Ignoring session stored with unsupported version");
                Ok(SessionState::default())
            }
            Err(e) => {
                warn!(error = %e, "Ignoring unreadable session document");
                Ok(SessionState::default())
            }
        }
    }

    fn persist(&self, state: &SessionState) -> Result<()> {
        let contents = serde_json::to_string(&PersistedSession::from(state))
            .context("Failed to serialize session")?;
        self.storage
            .set(STORAGE_KEY, &contents)
            .context("Failed to save session")
    }

    /// Replace the in-memory state and write it out. The new state stays in
    /// effect even if the write fails.
    fn replace(&self, next: SessionState) -> Result<()> {
        let mut result = Ok(());
        self.state.send_modify(|current| {
            *current = next;
            result = self.persist(current);
        });
        result
    }

    /// Store a token and profile already accepted by the server.
    pub fn set_auth(&self, token: String, user: User) -> Result<()> {
        info!(user_id = user.id, "Session established");
        self.replace(SessionState {
            token: Some(token),
            user: Some(user),
        })
    }

    /// Sign out. The cleared state is persisted, not deleted.
    pub fn clear_auth(&self) -> Result<()> {
        info!("Session cleared");
        self.replace(SessionState::default())
    }

    /// Clear the session and delete its stored document.
    pub fn purge(&self) -> Result<()> {
        let mut result = Ok(());
        self.state.send_modify(|current| {
            *current = SessionState::default();
            result = self
                .storage
                .remove(STORAGE_KEY)
                .context("Failed to remove stored session");
        });
        result
    }

    /// Copy of the current state; later changes are not reflected.
    pub fn snapshot(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.borrow().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.state.borrow().user.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Receive every state change from here on.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }
}

impl TokenSource for SessionStore {
    fn bearer_token(&self) -> Option<String> {
        self.token()
    }
}
