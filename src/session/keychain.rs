//! System keychain credential store.
//!
//! Uses the `keyring` crate; the whole credential (token + profile snapshot) is
//! kept as one JSON secret so nothing touches disk.

use keyring::Entry;

use super::{Credential, CredentialStore, SessionError};

/// Keychain service name for the console.
const SERVICE_NAME: &str = "bo.smartcondo.console";

/// Account name under which the active session is stored.
const SESSION_ACCOUNT: &str = "active_session";

impl From<keyring::Error> for SessionError {
    fn from(err: keyring::Error) -> Self {
        SessionError::Keychain(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct KeychainStore {
    service: String,
    account: String,
}

impl KeychainStore {
    pub fn new() -> Self {
        Self::with_names(SERVICE_NAME, SESSION_ACCOUNT)
    }

    /// Store under a custom service/account pair (one per backend, for example).
    pub fn with_names(service: impl Into<String>, account: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            account: account.into(),
        }
    }

    fn entry(&self) -> Result<Entry, SessionError> {
        Ok(Entry::new(&self.service, &self.account)?)
    }
}

impl Default for KeychainStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialStore for KeychainStore {
    /// Returns `None` if no entry exists (never logged in, or logged out).
    fn load(&self) -> Result<Option<Credential>, SessionError> {
        match self.entry()?.get_password() {
            Ok(secret) => Ok(Some(serde_json::from_str(&secret)?)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(SessionError::from(e)),
        }
    }

    fn save(&self, credential: &Credential) -> Result<(), SessionError> {
        let secret = serde_json::to_string(credential)?;
        self.entry()?.set_password(&secret)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        match self.entry()?.delete_credential() {
            Ok(()) => Ok(()),
            Err(keyring::Error::NoEntry) => Ok(()), // already gone
            Err(e) => Err(SessionError::from(e)),
        }
    }
}
