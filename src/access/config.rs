use std::time::Duration;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 24 * 60 * 60;
const DEFAULT_STORE_TIMEOUT: Duration = Duration::from_secs(5);

/// Tunables for the access core.
///
/// TTL is fixed at session issuance; there is no sliding expiration. Every
/// store call is bounded by `store_timeout`.
#[derive(Clone, Debug)]
pub struct AccessConfig {
    session_ttl_seconds: i64,
    store_timeout: Duration,
}

impl Default for AccessConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessConfig {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            store_timeout: DEFAULT_STORE_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub const fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = timeout;
        self
    }

    #[must_use]
    pub const fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    #[must_use]
    pub const fn store_timeout(&self) -> Duration {
        self.store_timeout
    }
}
