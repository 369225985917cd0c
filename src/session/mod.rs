//! Session credential for the console.
//!
//! Holds the bearer token and the profile snapshot returned at login, mirrors
//! them into a `CredentialStore` so the next run starts logged in, and clears
//! both on logout or when the backend rejects the token.

pub mod keychain;
pub mod store;

pub use keychain::KeychainStore;
pub use store::{FileStore, MemoryStore};

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use zeroize::Zeroize;

use crate::api::types::UserProfile;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Keychain operation failed: {0}")]
    Keychain(String),

    #[error("Session file {path} could not be accessed: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Stored session is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Bearer token plus the user it belongs to. The token is wiped on drop.
#[derive(Clone, Serialize, Deserialize)]
pub struct Credential {
    token: String,
    user: UserProfile,
}

impl Credential {
    pub fn new(token: impl Into<String>, user: UserProfile) -> Self {
        Self {
            token: token.into(),
            user,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn user(&self) -> &UserProfile {
        &self.user
    }
}

impl Drop for Credential {
    fn drop(&mut self) {
        self.token.zeroize();
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"<redacted>")
            .field("user", &self.user.correo)
            .finish()
    }
}

/// Persistence for the credential between runs.
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Result<Option<Credential>, SessionError>;
    fn save(&self, credential: &Credential) -> Result<(), SessionError>;
    /// Remove any stored credential. Idempotent.
    fn clear(&self) -> Result<(), SessionError>;
}

impl<S: CredentialStore + ?Sized> CredentialStore for std::sync::Arc<S> {
    fn load(&self) -> Result<Option<Credential>, SessionError> {
        (**self).load()
    }

    fn save(&self, credential: &Credential) -> Result<(), SessionError> {
        (**self).save(credential)
    }

    fn clear(&self) -> Result<(), SessionError> {
        (**self).clear()
    }
}

/// The process-wide session. Shared as `Arc<Session>` between clients and commands.
pub struct Session {
    store: Box<dyn CredentialStore>,
    current: RwLock<Option<Credential>>,
}

impl Session {
    /// Empty session backed by `store`. Nothing is read from the store.
    pub fn new(store: Box<dyn CredentialStore>) -> Self {
        Self {
            store,
            current: RwLock::new(None),
        }
    }

    /// Session initialised from whatever `store` holds.
    ///
    /// An unreadable store starts logged out rather than failing start-up.
    pub fn restore(store: Box<dyn CredentialStore>) -> Self {
        let current = match store.load() {
            Ok(credential) => credential,
            Err(e) => {
                log::warn!("Ignoring stored session: {}", e);
                None
            }
        };
        if let Some(ref c) = current {
            log::debug!("Restored session for {}", c.user().correo);
        }
        Self {
            store,
            current: RwLock::new(current),
        }
    }

    /// Persist and activate a credential (successful login).
    pub async fn establish(&self, credential: Credential) -> Result<(), SessionError> {
        self.store.save(&credential)?;
        *self.current.write().await = Some(credential);
        Ok(())
    }

    /// Drop the credential from memory and from the store (logout).
    pub async fn clear(&self) -> Result<(), SessionError> {
        *self.current.write().await = None;
        self.store.clear()
    }

    /// Clear after the backend rejected the token.
    ///
    /// Store failures are logged: the caller is already reporting the expiry.
    /// Returns whether a credential was active.
    pub async fn expire(&self) -> bool {
        let was_active = self.current.write().await.take().is_some();
        if let Err(e) = self.store.clear() {
            log::warn!("Failed to clear stored session: {}", e);
        }
        was_active
    }

    pub async fn token(&self) -> Option<String> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|c| c.token().to_string())
    }

    pub async fn user(&self) -> Option<UserProfile> {
        self.current.read().await.as_ref().map(|c| c.user().clone())
    }

    pub async fn is_active(&self) -> bool {
        self.current.read().await.is_some()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn profile() -> UserProfile {
        UserProfile {
            codigo: 7,
            nombre: "Ana".into(),
            apellido: "Rojas".into(),
            correo: "ana@condo.bo".into(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn establish_persists_and_activates() {
        let store = Arc::new(MemoryStore::default());
        let session = Session::new(Box::new(store.clone()));

        session
            .establish(Credential::new("tok-1", profile()))
            .await
            .unwrap();

        assert!(session.is_active().await);
        assert_eq!(session.token().await.as_deref(), Some("tok-1"));
        assert_eq!(store.load().unwrap().unwrap().token(), "tok-1");
    }

    #[tokio::test]
    async fn restore_reads_store() {
        let store = MemoryStore::with_credential(Credential::new("saved", profile()));
        let session = Session::restore(Box::new(store));
        assert_eq!(session.token().await.as_deref(), Some("saved"));
        assert_eq!(session.user().await.unwrap().nombre, "Ana");
    }

    #[tokio::test]
    async fn expire_reports_previous_state() {
        let store = Arc::new(MemoryStore::with_credential(Credential::new("t", profile())));
        let session = Session::restore(Box::new(store.clone()));

        assert!(session.expire().await);
        assert!(!session.is_active().await);
        assert!(store.load().unwrap().is_none());
        assert!(!session.expire().await);
        assert_eq!(store.clear_count(), 2);
    }

    #[test]
    fn debug_hides_token() {
        let rendered = format!("{:?}", Credential::new("super-secret", profile()));
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("ana@condo.bo"));
    }
}
