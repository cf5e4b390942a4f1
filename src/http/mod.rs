//! Authenticated HTTP plumbing for the portal API.
//!
//! [`ApiClient`] owns the two interceptable stages every outgoing call passes
//! through: "before send" attaches the current credential read synchronously
//! from the store, and "after receive" classifies the response. Auth failures
//! (HTTP 401/403 or an in-envelope failure code) tear the session down and
//! redirect exactly once per episode via the single-flight guard; every other
//! failure is handed back to the caller untouched.

pub mod guard;

use crate::error::Error;
use crate::session::context::SessionContext;
use crate::APP_USER_AGENT;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info_span, Instrument};
use url::Url;

/// Application-level envelope wrapped around every portal response body.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
}

/// Envelope code of a successful call.
pub const SUCCESS_CODE: i64 = 0;

/// In-body codes meaning the credential is no longer valid: generic
/// rejection, expired, revoked, signed in elsewhere.
fn is_auth_failure_code(code: i64) -> bool {
    matches!(code, 401 | 40_101 | 40_102 | 40_103)
}

/// Build `base/path` with explicit scheme, host and port.
///
/// # Errors
/// Returns an error if `base` cannot be parsed, has no host, or uses an
/// unsupported scheme.
pub fn endpoint_url(base: &str, path: &str) -> Result<String, Error> {
    let url = Url::parse(base)?;

    let scheme = url.scheme();

    let host = url
        .host()
        .ok_or_else(|| Error::Endpoint("no host specified".to_string()))?
        .to_owned();

    let port = match url.port() {
        Some(p) => p,
        None => match scheme {
            "http" => 80,
            "https" => 443,
            _ => return Err(Error::Endpoint(format!("unsupported scheme {scheme}"))),
        },
    };

    let endpoint_url = format!("{scheme}://{host}:{port}{path}");

    debug!("endpoint URL: {}", endpoint_url);

    Ok(endpoint_url)
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    ctx: Arc<SessionContext>,
}

impl ApiClient {
    /// # Errors
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: impl Into<String>, ctx: Arc<SessionContext>) -> Result<Self, Error> {
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            ctx,
        })
    }

    #[must_use]
    pub fn context(&self) -> &Arc<SessionContext> {
        &self.ctx
    }

    /// Attach the current credential, if any.
    ///
    /// Reads the store synchronously and never blocks; with no token present
    /// the request goes out unauthenticated and the server is the final
    /// arbiter. Never triggers a refresh or a login prompt.
    fn authorize(&self, builder: RequestBuilder) -> RequestBuilder {
        match self.ctx.store().access_token() {
            Some(token) => builder.bearer_auth(token.expose_secret()),
            None => builder,
        }
    }

    /// GET `path` and decode the enveloped payload.
    ///
    /// # Errors
    /// Returns [`Error::AuthFailure`] when the credential was rejected (the
    /// session is already torn down by then), or the untouched failure
    /// otherwise.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, Error> {
        let url = endpoint_url(&self.base_url, path)?;

        let span = info_span!(
            "portal.get",
            http.method = "GET",
            url = %url
        );
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .instrument(span)
            .await?;

        self.decode(response).await
    }

    /// POST `body` to `path` and decode the enveloped payload.
    ///
    /// # Errors
    /// Same contract as [`ApiClient::get_json`].
    pub async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, Error> {
        let url = endpoint_url(&self.base_url, path)?;

        let span = info_span!(
            "portal.post",
            http.method = "POST",
            url = %url
        );
        let response = self
            .authorize(self.http.post(&url).json(body))
            .send()
            .instrument(span)
            .await?;

        self.decode(response).await
    }

    /// Classify an inbound response.
    ///
    /// Auth failures run the guarded teardown and come back as
    /// [`Error::AuthFailure`]; non-auth failures pass through with their
    /// status and body intact.
    async fn decode<T: DeserializeOwned>(&self, response: Response) -> Result<T, Error> {
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.ctx.auth_failure_teardown();
            return Err(Error::AuthFailure);
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Response(format!("{status}, {}", body.trim())));
        }

        let envelope: Envelope<T> = response.json().await?;

        if is_auth_failure_code(envelope.code) {
            self.ctx.auth_failure_teardown();
            return Err(Error::AuthFailure);
        }

        if envelope.code != SUCCESS_CODE {
            return Err(Error::Response(format!(
                "portal error {}: {}",
                envelope.code, envelope.message
            )));
        }

        envelope
            .data
            .ok_or_else(|| Error::Response("missing data in response envelope".to_string()))
    }
}
