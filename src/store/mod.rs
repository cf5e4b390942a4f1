//! Credential store: the single owner of session state.
//!
//! Holds the current token material and hydrated profile, mirrors them to
//! durable storage, and is the only module allowed to mutate either. Every
//! mutation replaces the whole record under a lock, so interleaved readers
//! never observe a token without its principal or a half-cleared session.

pub mod storage;

use crate::error::StorageError;
use parking_lot::RwLock;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use storage::Storage;
use tracing::{debug, warn};

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";
const EXPIRES_AT_KEY: &str = "expires_at";
const PRINCIPAL_ID_KEY: &str = "principal_id";
const PROFILE_KEY: &str = "profile";

const SESSION_KEYS: [&str; 5] = [
    ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
    EXPIRES_AT_KEY,
    PRINCIPAL_ID_KEY,
    PROFILE_KEY,
];

/// Snapshot of the credential state.
///
/// `is_authenticated` tracks token presence only; expiry is a separate,
/// advisory check consumed by callers that want proactive renewal.
#[derive(Clone, Default)]
pub struct Session {
    pub access_token: Option<SecretString>,
    pub refresh_token: Option<SecretString>,
    /// Unix timestamp (seconds) after which the access token is stale.
    pub expires_at: Option<u64>,
    pub principal_id: Option<String>,
}

impl Session {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }

    fn is_empty(&self) -> bool {
        self.access_token.is_none()
            && self.refresh_token.is_none()
            && self.expires_at.is_none()
            && self.principal_id.is_none()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("access_token", &self.access_token.as_ref().map(|_| "***"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "***"))
            .field("expires_at", &self.expires_at)
            .field("principal_id", &self.principal_id)
            .finish()
    }
}

/// Principal profile as returned by the profile endpoint.
///
/// Opaque beyond what the permission evaluator needs; extra backend fields
/// ride along in `attributes`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub id: String,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub attributes: serde_json::Value,
}

#[derive(Default)]
struct Inner {
    session: Session,
    profile: Option<Profile>,
}

impl Inner {
    fn is_empty(&self) -> bool {
        self.session.is_empty() && self.profile.is_none()
    }
}

pub struct CredentialStore {
    storage: Arc<dyn Storage>,
    inner: RwLock<Inner>,
}

impl CredentialStore {
    #[must_use]
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            inner: RwLock::new(Inner::default()),
        }
    }

    /// Populate the in-memory session from durable storage.
    ///
    /// Called once at process start, before anything reads the store.
    /// Idempotent: re-running replaces memory with the same stored record and
    /// performs no writes. Without a stored record the unauthenticated
    /// default stays in place.
    ///
    /// # Errors
    /// Returns an error if the storage backend cannot be read.
    pub fn hydrate(&self) -> Result<(), StorageError> {
        let access_token = self.storage.get(ACCESS_TOKEN_KEY)?.map(SecretString::from);
        let refresh_token = self.storage.get(REFRESH_TOKEN_KEY)?.map(SecretString::from);
        let expires_at = self
            .storage
            .get(EXPIRES_AT_KEY)?
            .and_then(|raw| raw.parse::<u64>().ok());
        let principal_id = self.storage.get(PRINCIPAL_ID_KEY)?;

        let profile = match self.storage.get(PROFILE_KEY)? {
            Some(raw) => match serde_json::from_str(&raw) {
                Ok(profile) => Some(profile),
                Err(err) => {
                    warn!("discarding unreadable stored profile: {err}");
                    None
                }
            },
            None => None,
        };

        let session = Session {
            access_token,
            refresh_token,
            expires_at,
            principal_id,
        };
        debug!("hydrated session: {session:?}");

        *self.inner.write() = Inner { session, profile };
        Ok(())
    }

    /// Replace the session and persist it in the same logical step.
    ///
    /// Storage is written first; memory is replaced only once every key has
    /// landed. On a failed write the stored keys are swept and both sides are
    /// reset to the unauthenticated default, so the caller can retry the
    /// whole operation without observing a half-written session.
    ///
    /// Any previously hydrated profile belongs to the old principal and is
    /// dropped.
    ///
    /// # Errors
    /// Returns an error if the storage backend rejects a write.
    pub fn set_session(
        &self,
        access_token: SecretString,
        refresh_token: SecretString,
        expires_at: u64,
        principal_id: &str,
    ) -> Result<(), StorageError> {
        let written = self
            .storage
            .set(ACCESS_TOKEN_KEY, access_token.expose_secret())
            .and_then(|()| {
                self.storage
                    .set(REFRESH_TOKEN_KEY, refresh_token.expose_secret())
            })
            .and_then(|()| self.storage.set(EXPIRES_AT_KEY, &expires_at.to_string()))
            .and_then(|()| self.storage.set(PRINCIPAL_ID_KEY, principal_id))
            .and_then(|()| self.storage.remove(PROFILE_KEY));

        if let Err(err) = written {
            self.sweep_storage();
            *self.inner.write() = Inner::default();
            return Err(err);
        }

        *self.inner.write() = Inner {
            session: Session {
                access_token: Some(access_token),
                refresh_token: Some(refresh_token),
                expires_at: Some(expires_at),
                principal_id: Some(principal_id.to_string()),
            },
            profile: None,
        };
        Ok(())
    }

    /// Persist the hydrated profile for the current principal.
    ///
    /// # Errors
    /// Returns an error if serialization or the storage write fails.
    pub fn set_profile(&self, profile: Profile) -> Result<(), StorageError> {
        let raw = serde_json::to_string(&profile)?;
        self.storage.set(PROFILE_KEY, &raw)?;
        self.inner.write().profile = Some(profile);
        Ok(())
    }

    /// Clear the session, profile, and every durable key.
    ///
    /// Idempotent: once the store is empty, further calls touch neither
    /// memory nor storage. Memory is cleared before the storage sweep, so a
    /// failing backend can never leave a live-looking token behind.
    ///
    /// # Errors
    /// Returns the first storage error encountered; the in-memory state is
    /// cleared regardless.
    pub fn clear(&self) -> Result<(), StorageError> {
        {
            let mut inner = self.inner.write();
            if inner.is_empty() {
                return Ok(());
            }
            *inner = Inner::default();
        }

        let mut first_error = None;
        for key in SESSION_KEYS {
            if let Err(err) = self.storage.remove(key) {
                if first_error.is_none() {
                    first_error = Some(err);
                }
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    #[must_use]
    pub fn session(&self) -> Session {
        self.inner.read().session.clone()
    }

    #[must_use]
    pub fn profile(&self) -> Option<Profile> {
        self.inner.read().profile.clone()
    }

    #[must_use]
    pub fn access_token(&self) -> Option<SecretString> {
        self.inner.read().session.access_token.clone()
    }

    #[must_use]
    pub fn principal_id(&self) -> Option<String> {
        self.inner.read().session.principal_id.clone()
    }

    /// True iff an access token is present, independent of expiry.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.read().session.is_authenticated()
    }

    /// True if no expiry is recorded or the recorded instant has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        match self.inner.read().session.expires_at {
            Some(at) => at <= now_unix(),
            None => true,
        }
    }

    fn sweep_storage(&self) {
        for key in SESSION_KEYS {
            if let Err(err) = self.storage.remove(key) {
                warn!("failed to sweep storage key {key}: {err}");
            }
        }
    }
}

impl fmt::Debug for CredentialStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialStore")
            .field("session", &self.inner.read().session)
            .finish()
    }
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs())
}
