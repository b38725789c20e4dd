//! Bearer token cache.

use std::time::{Duration, Instant};

/// Tokens are refreshed once they are this close to expiry.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// Holds at most one token with its expiry.
#[derive(Debug, Clone)]
pub struct TokenCache {
    token: Option<CachedToken>,
    refresh_margin: Duration,
}

impl Default for TokenCache {
    fn default() -> Self {
        Self::new(TOKEN_REFRESH_MARGIN)
    }
}

impl TokenCache {
    pub fn new(refresh_margin: Duration) -> Self {
        Self {
            token: None,
            refresh_margin,
        }
    }

    /// The cached token, unless it is missing or within the refresh margin.
    pub fn get(&self, now: Instant) -> Option<&str> {
        self.token
            .as_ref()
            .filter(|t| now + self.refresh_margin < t.expires_at)
            .map(|t| t.value.as_str())
    }

    pub fn store(&mut self, value: String, expires_in: Duration, now: Instant) {
        self.token = Some(CachedToken {
            value,
            expires_at: now + expires_in,
        });
    }

    pub fn clear(&mut self) {
        self.token = None;
    }
}
