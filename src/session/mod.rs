//! Session lifecycle orchestration.
//!
//! The manager drives the state machine over
//! { Anonymous, Authenticating, Authenticated, LoggingOut }: login runs
//! authenticate → store session → fetch profile → fetch permissions in that
//! order and rolls everything back on any failure, so no half-authenticated
//! state is ever observable. Logout and teardown are idempotent.

pub mod context;
pub mod expiry;

pub use context::{LifecycleState, RedirectFn, SessionContext};

use crate::error::Error;
use crate::portal::{AuthGateway, Credentials};
use std::sync::Arc;
use tracing::{debug, info};

pub struct SessionManager {
    ctx: Arc<SessionContext>,
    gateway: Arc<dyn AuthGateway>,
}

impl SessionManager {
    #[must_use]
    pub fn new(ctx: Arc<SessionContext>, gateway: Arc<dyn AuthGateway>) -> Self {
        Self { ctx, gateway }
    }

    #[must_use]
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Exchange credentials for a full session.
    ///
    /// The three hydration steps are strictly sequential. A concurrent
    /// `login` is rejected, never interleaved.
    ///
    /// # Errors
    /// [`Error::CredentialsRejected`] when the portal refuses the
    /// credentials, [`Error::Storage`] when the session cannot be persisted,
    /// and the underlying fetch error when profile or permission hydration
    /// fails; in every case the store is rolled back to the anonymous
    /// default.
    pub async fn login(&self, credentials: &Credentials) -> Result<(), Error> {
        self.ctx.begin_login()?;

        match self.run_login(credentials).await {
            Ok(()) => {
                self.ctx.finish_login();
                info!("login complete for {:?}", self.ctx.store().principal_id());
                Ok(())
            }
            Err(err) => {
                debug!("login failed, rolling back: {err}");
                self.ctx.abort_login();
                Err(err)
            }
        }
    }

    async fn run_login(&self, credentials: &Credentials) -> Result<(), Error> {
        let grant = self.gateway.authenticate(credentials).await?;
        let principal_id = grant.principal_id.clone();
        let access_token = grant.access_token.clone();

        self.ctx.store().set_session(
            grant.access_token,
            grant.refresh_token,
            grant.expires_at,
            &principal_id,
        )?;

        let profile = self
            .gateway
            .fetch_profile(&access_token, &principal_id)
            .await?;
        self.ctx.store().set_profile(profile)?;

        let permissions = self
            .gateway
            .fetch_permissions(&access_token, &principal_id)
            .await?;
        self.ctx
            .permissions()
            .hydrate(&permissions.roles, &permissions.permission_codes);

        Ok(())
    }

    /// Refetch roles and codes for a rehydrated session.
    ///
    /// The effective permission set is derived state and never persisted;
    /// after a process restart the store carries the principal but the
    /// evaluator starts empty until this runs.
    ///
    /// # Errors
    /// [`Error::NoSession`] without an authenticated session, otherwise the
    /// underlying fetch error.
    pub async fn refresh_permissions(&self) -> Result<(), Error> {
        let Some(access_token) = self.ctx.store().access_token() else {
            return Err(Error::NoSession);
        };
        let Some(principal_id) = self.ctx.store().principal_id() else {
            return Err(Error::NoSession);
        };

        let permissions = self
            .gateway
            .fetch_permissions(&access_token, &principal_id)
            .await?;
        self.ctx
            .permissions()
            .hydrate(&permissions.roles, &permissions.permission_codes);
        Ok(())
    }

    /// User-initiated logout; see [`SessionContext::logout`].
    pub fn logout(&self) {
        self.ctx.logout();
    }

    /// Proactive expiry check before dispatching a sensitive request.
    ///
    /// Optional hardening: the failure interceptor catches a stale token on
    /// first use regardless. Returns `true` when the session was expired and
    /// has been torn down.
    pub fn expire_if_stale(&self) -> bool {
        if self.ctx.store().is_authenticated() && self.ctx.store().is_expired() {
            info!("credential expired locally, clearing session");
            self.ctx.auth_failure_teardown();
            return true;
        }
        false
    }
}
