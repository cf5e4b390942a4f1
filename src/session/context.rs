//! Shared session context: the store, the evaluator, the failure guard and
//! the lifecycle state, behind one handle.
//!
//! Every collaborator that needs session state receives this context
//! explicitly instead of reaching for ambient globals, so the single source
//! of truth survives without hidden coupling between the consoles.

use crate::authz::PermissionEvaluator;
use crate::error::StorageError;
use crate::http::guard::FailureGuard;
use crate::store::CredentialStore;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Navigation side effect invoked at most once per failure episode.
pub type RedirectFn = Arc<dyn Fn() + Send + Sync>;

/// Lifecycle states of the session state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleState {
    Anonymous,
    Authenticating,
    Authenticated,
    LoggingOut,
}

pub struct SessionContext {
    store: CredentialStore,
    permissions: PermissionEvaluator,
    guard: FailureGuard,
    state: Mutex<LifecycleState>,
    redirect: RedirectFn,
}

impl SessionContext {
    #[must_use]
    pub fn new(store: CredentialStore, redirect: RedirectFn) -> Self {
        Self {
            store,
            permissions: PermissionEvaluator::new(),
            guard: FailureGuard::new(),
            state: Mutex::new(LifecycleState::Anonymous),
            redirect,
        }
    }

    #[must_use]
    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    #[must_use]
    pub fn permissions(&self) -> &PermissionEvaluator {
        &self.permissions
    }

    #[must_use]
    pub fn state(&self) -> LifecycleState {
        *self.state.lock()
    }

    /// Rehydrate from durable storage at process start.
    ///
    /// When a stored session exists the state machine starts Authenticated
    /// and the failure guard is armed, so a stale stored token still gets the
    /// regular teardown + redirect on first use. The permission set is
    /// derived state and is not persisted; callers refetch it via
    /// [`SessionManager::refresh_permissions`](super::SessionManager::refresh_permissions).
    ///
    /// # Errors
    /// Returns an error if durable storage cannot be read.
    pub fn hydrate(&self) -> Result<(), StorageError> {
        self.store.hydrate()?;
        if self.store.is_authenticated() {
            *self.state.lock() = LifecycleState::Authenticated;
            self.guard.arm();
            debug!("restored stored session for {:?}", self.store.principal_id());
        }
        Ok(())
    }

    /// User-initiated logout: clear everything, end Anonymous.
    ///
    /// Idempotent; concurrent calls while already logging out or anonymous
    /// are no-ops. Never performs network I/O and never redirects.
    pub fn logout(&self) {
        {
            let mut state = self.state.lock();
            match *state {
                LifecycleState::Anonymous | LifecycleState::LoggingOut => return,
                _ => *state = LifecycleState::LoggingOut,
            }
        }

        // In-flight requests finishing after this point must not re-trigger
        // teardown; the episode is already handled.
        self.guard.disarm();
        if let Err(err) = self.store.clear() {
            warn!("failed to clear durable session state: {err}");
        }
        self.permissions.clear();
        *self.state.lock() = LifecycleState::Anonymous;
        info!("session cleared");
    }

    /// Tear down after an auth failure; single-flight.
    ///
    /// Returns `true` when this call performed the teardown and redirect,
    /// `false` when another failure already did (or no session was valid in
    /// the first place).
    pub(crate) fn auth_failure_teardown(&self) -> bool {
        if !self.guard.trip() {
            debug!("auth failure absorbed, session already torn down");
            return false;
        }

        warn!("credential rejected by the backend, clearing session");
        *self.state.lock() = LifecycleState::Anonymous;
        if let Err(err) = self.store.clear() {
            warn!("failed to clear durable session state: {err}");
        }
        self.permissions.clear();
        (self.redirect)();
        true
    }

    pub(crate) fn begin_login(&self) -> Result<(), crate::error::Error> {
        let mut state = self.state.lock();
        match *state {
            LifecycleState::Anonymous => {
                *state = LifecycleState::Authenticating;
                Ok(())
            }
            LifecycleState::Authenticating => Err(crate::error::Error::LoginInProgress),
            LifecycleState::LoggingOut => Err(crate::error::Error::LogoutInProgress),
            LifecycleState::Authenticated => Err(crate::error::Error::AlreadyAuthenticated),
        }
    }

    pub(crate) fn finish_login(&self) {
        *self.state.lock() = LifecycleState::Authenticated;
        self.guard.arm();
    }

    /// Roll a failed login back to the anonymous default.
    pub(crate) fn abort_login(&self) {
        if let Err(err) = self.store.clear() {
            warn!("failed to clear partial session state: {err}");
        }
        self.permissions.clear();
        self.guard.disarm();
        *self.state.lock() = LifecycleState::Anonymous;
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("state", &self.state())
            .field("store", &self.store)
            .finish()
    }
}
