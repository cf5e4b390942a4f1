//! Background expiry watch.
//!
//! Proactive hardening for long-lived consoles: instead of waiting for the
//! next request to bounce off the backend, a background task periodically
//! checks the recorded expiry and performs the same guarded teardown as the
//! failure interceptor, parking the user on the login entry point.

use super::context::SessionContext;
use rand::Rng;
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, info};

/// Base poll interval in seconds; each watcher jitters below this so a fleet
/// of consoles does not tick in lockstep.
const CHECK_INTERVAL_SECS: u64 = 30;

/// Spawn the watcher; it runs for the life of the process.
pub fn spawn_expiry_watch(ctx: Arc<SessionContext>) {
    let mut rng = rand::thread_rng();
    let jitter_factor = 0.1;
    let jittered_interval =
        (CHECK_INTERVAL_SECS as f64 * rng.gen_range(1.0 - jitter_factor..1.0)) as u64;
    let mut check_interval = interval(Duration::from_secs(jittered_interval.max(1)));

    tokio::spawn(async move {
        loop {
            check_interval.tick().await;

            if ctx.store().is_authenticated() && ctx.store().is_expired() {
                info!("credential expired, clearing session");
                ctx.auth_failure_teardown();
            } else {
                debug!("expiry check passed");
            }
        }
    });
}
