use thiserror::Error;

/// Errors surfaced by the session core.
///
/// The lifecycle controller maps each variant onto a distinct outcome: a
/// rejected credential is user-visible, a storage failure fails the login
/// fast, and an auth failure mid-session is recovered automatically by the
/// failure interceptor before this error reaches the caller.
#[derive(Debug, Error)]
pub enum Error {
    #[error("credentials rejected: {0}")]
    CredentialsRejected(String),
    #[error("storage unavailable: {0}")]
    Storage(#[from] StorageError),
    #[error("session terminated: credential no longer valid")]
    AuthFailure,
    #[error("login already in progress")]
    LoginInProgress,
    #[error("logout in progress")]
    LogoutInProgress,
    #[error("already authenticated, log out first")]
    AlreadyAuthenticated,
    #[error("no active session")]
    NoSession,
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),
    #[error("invalid endpoint: {0}")]
    Endpoint(String),
    #[error("unexpected response: {0}")]
    Response(String),
}

/// Errors raised by a durable storage backend.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage io: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage encoding: {0}")]
    Encoding(#[from] serde_json::Error),
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
