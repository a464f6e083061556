//! Time-based throwaway identities.
//!
//! `email = <prefix>_<unix-seconds>@<domain>`. Uniqueness across processes is
//! best effort; inside one process the generator never hands out the same
//! second twice.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

static GLOBAL: IdentityGenerator = IdentityGenerator::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub username: String,
    pub email: String,
    pub issued_at: u64,
}

impl Identity {
    pub fn new(prefix: &str, domain: &str, issued_at: u64) -> Self {
        let username = format!("{prefix}_{issued_at}");
        Self {
            email: format!("{username}@{domain}"),
            username,
            issued_at,
        }
    }
}

/// Hands out strictly increasing timestamps.
#[derive(Debug)]
pub struct IdentityGenerator {
    last: AtomicU64,
}

impl Default for IdentityGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityGenerator {
    pub const fn new() -> Self {
        Self {
            last: AtomicU64::new(0),
        }
    }

    /// Process-wide generator
    pub fn global() -> &'static IdentityGenerator {
        &GLOBAL
    }

    pub fn next(&self, prefix: &str, domain: &str) -> Identity {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        self.next_at(prefix, domain, now)
    }

    /// Uses `now` unless an identity at or after `now` was already issued.
    pub fn next_at(&self, prefix: &str, domain: &str, now: u64) -> Identity {
        let previous = self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        Identity::new(prefix, domain, now.max(previous + 1))
    }
}
