//! Login navigation hook
//!
//! When a backend rejects the session the client hands the login address to a
//! `LoginNavigator`. A browser shell would perform a hard navigation; a
//! terminal front end prints the address instead.

use tracing::info;

/// Receives the external login address after the session has been wiped.
pub trait LoginNavigator: Send + Sync {
    fn redirect(&self, login_url: &str);
}

/// Navigator that only records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNavigator;

impl LoginNavigator for TracingNavigator {
    fn redirect(&self, login_url: &str) {
        info!(login_url = login_url, "Session ended, login required");
    }
}
