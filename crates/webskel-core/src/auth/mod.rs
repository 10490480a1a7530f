//! Authentication module for managing the user's session.
//!
//! This module provides:
//! - `SessionStore`: the current token and profile, persisted under the
//!   `auth-storage` key and shared by everything that needs it
//! - `SessionStorage`: the key-value backends (file, OS keychain, memory)
//! - `flow`: sign-in, sign-up and sign-out against the `ApiClient`

pub mod flow;
pub mod session;
pub mod storage;

pub use flow::{sign_in, sign_out, sign_up, verify, SignUp};
pub use session::{SessionState, SessionStore, STORAGE_KEY};
pub use storage::{FileStorage, KeyringStorage, MemoryStorage, SessionStorage, StorageKind};
