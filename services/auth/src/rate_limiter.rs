//! Rate limiter for preventing brute force attacks on the login surface

use anyhow::Result;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Tracked keys at which stale entries are first swept
const PRUNE_THRESHOLD: usize = 1024;

/// Rate limiter configuration
#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    /// Maximum number of attempts allowed
    pub max_attempts: u32,
    /// Time window in seconds
    pub window_seconds: u64,
    /// Ban duration in seconds
    pub ban_duration_seconds: u64,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_seconds: 300,        // 5 minutes
            ban_duration_seconds: 3600, // 1 hour
        }
    }
}

impl RateLimiterConfig {
    /// Create a new RateLimiterConfig from environment variables
    ///
    /// # Environment Variables
    /// - `LOGIN_MAX_ATTEMPTS`: Attempts allowed per window (default: 5)
    /// - `LOGIN_WINDOW_SECONDS`: Window length in seconds (default: 300)
    /// - `LOGIN_BAN_SECONDS`: Ban duration in seconds (default: 3600)
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            max_attempts: env_or("LOGIN_MAX_ATTEMPTS", defaults.max_attempts)?,
            window_seconds: env_or("LOGIN_WINDOW_SECONDS", defaults.window_seconds)?,
            ban_duration_seconds: env_or("LOGIN_BAN_SECONDS", defaults.ban_duration_seconds)?,
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid {} {:?}: {}", key, value, e)),
        Err(_) => Ok(default),
    }
}

/// Rate limiter entry
#[derive(Debug)]
struct RateLimiterEntry {
    /// Number of attempts
    attempts: u32,
    /// Last attempt time
    last_attempt: Instant,
    /// Ban expiration time
    ban_expires: Option<Instant>,
}

impl RateLimiterEntry {
    /// Neither banned nor inside the attempt window any more
    fn is_stale(&self, now: Instant, window: Duration) -> bool {
        self.ban_expires.is_none_or(|ban_expires| now >= ban_expires)
            && now.duration_since(self.last_attempt) >= window
    }
}

/// Entries plus the size at which the next sweep runs
#[derive(Debug)]
struct Tracked {
    entries: HashMap<String, RateLimiterEntry>,
    prune_at: usize,
}

impl Tracked {
    fn prune(&mut self, now: Instant, window: Duration) {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_stale(now, window));
        // Live entries get room to double before the next sweep
        self.prune_at = PRUNE_THRESHOLD.max(self.entries.len() * 2);
        debug!(
            "Pruned {} stale login throttling entries",
            before - self.entries.len()
        );
    }
}

/// Rate limiter keyed by an arbitrary string (the login phone number)
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimiterConfig,
    tracked: Arc<Mutex<Tracked>>,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            tracked: Arc::new(Mutex::new(Tracked {
                entries: HashMap::new(),
                prune_at: PRUNE_THRESHOLD,
            })),
        }
    }

    /// Record an attempt for `key` and report whether it may proceed
    pub async fn is_allowed(&self, key: &str) -> bool {
        self.is_allowed_at(key, Instant::now()).await
    }

    async fn is_allowed_at(&self, key: &str, now: Instant) -> bool {
        let mut tracked = self.tracked.lock().await;
        let window = Duration::from_secs(self.config.window_seconds);

        if tracked.entries.len() >= tracked.prune_at {
            tracked.prune(now, window);
        }

        let entry = tracked.entries.entry(key.to_string()).or_insert(RateLimiterEntry {
            attempts: 0,
            last_attempt: now,
            ban_expires: None,
        });

        if let Some(ban_expires) = entry.ban_expires {
            if now >= ban_expires {
                entry.attempts = 0;
                entry.ban_expires = None;
            } else {
                return false;
            }
        }

        if now.duration_since(entry.last_attempt) >= window {
            entry.attempts = 0;
        }

        if entry.attempts >= self.config.max_attempts {
            entry.ban_expires = Some(now + Duration::from_secs(self.config.ban_duration_seconds));
            warn!(
                "Login throttled for {} seconds after {} attempts",
                self.config.ban_duration_seconds, entry.attempts
            );
            return false;
        }

        entry.attempts += 1;
        entry.last_attempt = now;

        true
    }

    /// Forget the attempts recorded for `key`
    pub async fn reset(&self, key: &str) {
        self.tracked.lock().await.entries.remove(key);
    }

    /// Drop every entry that is neither banned nor inside its window
    pub async fn purge_expired(&self) {
        self.purge_expired_at(Instant::now()).await
    }

    async fn purge_expired_at(&self, now: Instant) {
        let window = Duration::from_secs(self.config.window_seconds);
        self.tracked.lock().await.prune(now, window);
    }

    /// Number of keys currently tracked
    pub async fn tracked_keys(&self) -> usize {
        self.tracked.lock().await.entries.len()
    }

    /// Get the rate limiter configuration
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }
}
