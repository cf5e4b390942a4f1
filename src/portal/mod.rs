//! Portal API collaborators consumed by the session lifecycle.
//!
//! Login-time calls live behind the [`AuthGateway`] seam and take the
//! credential explicitly, bypassing the failure interceptor: a 401 from the
//! login endpoint is a credential rejection surfaced to the caller, not a
//! session-failure episode.

use crate::authz::Role;
use crate::error::Error;
use crate::http::{endpoint_url, Envelope, SUCCESS_CODE};
use crate::store::Profile;
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use tracing::{debug, info_span, Instrument};

/// Credentials supplied by the user at login.
pub struct Credentials {
    pub email: String,
    pub password: SecretString,
}

impl Credentials {
    #[must_use]
    pub fn new(email: impl Into<String>, password: SecretString) -> Self {
        Self {
            email: email.into(),
            password,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

/// Token material returned by the login endpoint.
pub struct TokenGrant {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    /// Unix timestamp (seconds) after which the access token is stale.
    pub expires_at: u64,
    pub principal_id: String,
}

impl fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"***")
            .field("refresh_token", &"***")
            .field("expires_at", &self.expires_at)
            .field("principal_id", &self.principal_id)
            .finish()
    }
}

/// Roles and direct codes returned by the permissions endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PermissionGrant {
    #[serde(default)]
    pub roles: Vec<Role>,
    #[serde(default)]
    pub permission_codes: Vec<String>,
}

/// External capabilities the lifecycle controller depends on.
#[async_trait]
pub trait AuthGateway: Send + Sync {
    /// Exchange credentials for token material.
    async fn authenticate(&self, credentials: &Credentials) -> Result<TokenGrant, Error>;

    /// Fetch the principal profile with a freshly issued credential.
    async fn fetch_profile(
        &self,
        access_token: &SecretString,
        principal_id: &str,
    ) -> Result<Profile, Error>;

    /// Fetch the principal's roles and direct permission codes.
    async fn fetch_permissions(
        &self,
        access_token: &SecretString,
        principal_id: &str,
    ) -> Result<PermissionGrant, Error>;
}

#[derive(Deserialize)]
struct LoginData {
    access_token: String,
    refresh_token: String,
    expires_at: u64,
    principal_id: String,
}

/// HTTP implementation against the portal REST API.
pub struct PortalGateway {
    http: Client,
    base_url: String,
}

impl PortalGateway {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>) -> Result<Self, Error> {
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    /// Unwrap the portal envelope, mapping non-zero codes to errors.
    fn unwrap_envelope<T>(envelope: Envelope<T>, context: &str) -> Result<T, Error> {
        if envelope.code != SUCCESS_CODE {
            return Err(Error::Response(format!(
                "{context}: portal error {}: {}",
                envelope.code, envelope.message
            )));
        }
        envelope
            .data
            .ok_or_else(|| Error::Response(format!("{context}: missing data in response envelope")))
    }
}

#[async_trait]
impl AuthGateway for PortalGateway {
    async fn authenticate(&self, credentials: &Credentials) -> Result<TokenGrant, Error> {
        let url = endpoint_url(&self.base_url, "/v1/auth/login")?;

        let payload = json!({
            "email": credentials.email,
            "password": credentials.password.expose_secret(),
        });

        debug!("login URL: {}, email: {}", url, credentials.email);

        let span = info_span!(
            "portal.authenticate",
            http.method = "POST",
            url = %url
        );
        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::CredentialsRejected(body.trim().to_string()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Response(format!("{status}, {}", body.trim())));
        }

        let envelope: Envelope<LoginData> = response.json().await?;
        if envelope.code != SUCCESS_CODE {
            // The portal reports bad credentials inside a 200 envelope.
            return Err(Error::CredentialsRejected(envelope.message));
        }
        let data = envelope
            .data
            .ok_or_else(|| Error::Response("login: missing data in response envelope".to_string()))?;

        Ok(TokenGrant {
            access_token: SecretString::from(data.access_token),
            refresh_token: SecretString::from(data.refresh_token),
            expires_at: data.expires_at,
            principal_id: data.principal_id,
        })
    }

    async fn fetch_profile(
        &self,
        access_token: &SecretString,
        principal_id: &str,
    ) -> Result<Profile, Error> {
        let url = endpoint_url(&self.base_url, &format!("/v1/principals/{principal_id}/profile"))?;

        let span = info_span!(
            "portal.fetch_profile",
            http.method = "GET",
            url = %url
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Response(format!("{status}, {}", body.trim())));
        }

        let envelope: Envelope<Profile> = response.json().await?;
        Self::unwrap_envelope(envelope, "profile")
    }

    async fn fetch_permissions(
        &self,
        access_token: &SecretString,
        principal_id: &str,
    ) -> Result<PermissionGrant, Error> {
        let url = endpoint_url(
            &self.base_url,
            &format!("/v1/principals/{principal_id}/permissions"),
        )?;

        let span = info_span!(
            "portal.fetch_permissions",
            http.method = "GET",
            url = %url
        );
        let response = self
            .http
            .get(&url)
            .bearer_auth(access_token.expose_secret())
            .send()
            .instrument(span)
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Response(format!("{status}, {}", body.trim())));
        }

        let envelope: Envelope<PermissionGrant> = response.json().await?;
        Self::unwrap_envelope(envelope, "permissions")
    }
}
