//! # Ingresso (Client Session & Authorization Manager)
//!
//! `ingresso` owns the client side of authentication for the placement
//! platform consoles: it holds the access credential, persists it across
//! restarts, attaches it to every outgoing request, detects credential
//! rejection in responses, and filters the navigation tree down to what the
//! current principal may see.
//!
//! ## Session Ownership
//!
//! The [`store::CredentialStore`] is the only place allowed to mutate session
//! state. Everything else reads snapshots. Mutations replace the whole record
//! under a lock, so readers never observe a token without its principal or
//! the other way around.
//!
//! ## Failure Handling
//!
//! Responses flow through the [`http::ApiClient`], which classifies HTTP
//! 401/403 and in-envelope auth-failure codes. The first failure after the
//! session was last valid tears the session down and redirects to the login
//! entry point exactly once; concurrent failures are absorbed silently until
//! the next successful login re-arms the guard.
//!
//! ## Authorization
//!
//! Capability checks go through [`authz::PermissionEvaluator`]; call sites
//! never inspect raw permission strings. The effective set is the union of
//! the principal's role codes and any directly granted codes, replaced
//! atomically and never mutated in place.

pub mod authz;
pub mod cli;
pub mod error;
pub mod http;
pub mod portal;
pub mod session;
pub mod store;

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
