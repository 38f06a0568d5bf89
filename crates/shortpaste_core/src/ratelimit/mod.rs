//! Fixed-window admission control keyed by client identity and category.
//!
//! A window opens on the first request a client makes in a category and lasts
//! `every`. Once it elapses the next request opens a fresh window, so a client
//! can burst up to twice the quota across one boundary.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::{Duration, Instant};

/// Quota for one rate-limit category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitRule {
    /// Requests admitted per window.
    pub total_requests: u32,
    /// Window length in milliseconds.
    pub every: u64,
}

impl RateLimitRule {
    fn window(&self) -> Duration {
        Duration::from_millis(self.every)
    }
}

/// Outcome of a single admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub admitted: bool,
    /// Time until the current window closes.
    pub reset_after: Duration,
}

impl RateDecision {
    fn unlimited() -> Self {
        Self {
            admitted: true,
            reset_after: Duration::ZERO,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct WindowKey {
    client: String,
    category: String,
}

#[derive(Debug)]
struct Window {
    started: Instant,
    count: u32,
}

impl Window {
    /// Count one request at `now`, rolling over to a fresh window if this one
    /// has elapsed.
    fn count_request(&mut self, rule: &RateLimitRule, now: Instant) -> RateDecision {
        let length = rule.window();
        if now.saturating_duration_since(self.started) >= length {
            self.started = now;
            self.count = 0;
        }
        self.count = self.count.saturating_add(1);

        RateDecision {
            admitted: self.count <= rule.total_requests,
            reset_after: length.saturating_sub(now.saturating_duration_since(self.started)),
        }
    }
}

/// Per-client request counters.
///
/// Each `(client, category)` pair owns its own mutex; the outer table is only
/// write-locked to insert new entries or prune elapsed ones.
#[derive(Debug, Default)]
pub struct RateLimiter {
    rules: HashMap<String, RateLimitRule>,
    windows: RwLock<HashMap<WindowKey, Arc<Mutex<Window>>>>,
}

impl RateLimiter {
    /// Build a limiter from configured categories.
    pub fn new(categories: &BTreeMap<String, RateLimitRule>) -> Self {
        Self {
            rules: categories
                .iter()
                .map(|(name, rule)| (name.clone(), *rule))
                .collect(),
            windows: RwLock::new(HashMap::new()),
        }
    }

    /// Admit or reject one request at the current instant.
    pub fn admit(&self, client: &str, category: &str) -> bool {
        self.check(client, category).admitted
    }

    /// Check one request at the current instant.
    pub fn check(&self, client: &str, category: &str) -> RateDecision {
        self.check_at(client, category, Instant::now())
    }

    /// Count one request made at `now` and decide whether it is admitted.
    ///
    /// # Arguments
    /// - `client`: Caller identity (usually a network address).
    /// - `category`: Configured category name.
    /// - `now`: Time of the request.
    ///
    /// # Returns
    /// The decision and the time until the window resets.
    /// Categories without a rule are always admitted.
    pub fn check_at(&self, client: &str, category: &str, now: Instant) -> RateDecision {
        let Some(rule) = self.rules.get(category) else {
            tracing::debug!("No rate limit configured for category '{}'", category);
            return RateDecision::unlimited();
        };

        let entry = self.window_entry(client, category, now);
        let mut window = entry.lock().unwrap_or_else(PoisonError::into_inner);
        let decision = window.count_request(rule, now);
        if !decision.admitted {
            tracing::debug!(
                "Rate limit hit for client '{}' in '{}' ({} requests)",
                client,
                category,
                window.count
            );
        }
        decision
    }

    fn window_entry(&self, client: &str, category: &str, now: Instant) -> Arc<Mutex<Window>> {
        let key = WindowKey {
            client: client.to_string(),
            category: category.to_string(),
        };
        {
            let windows = self.windows.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = windows.get(&key) {
                return entry.clone();
            }
        }
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        windows
            .entry(key)
            .or_insert_with(|| {
                Arc::new(Mutex::new(Window {
                    started: now,
                    count: 0,
                }))
            })
            .clone()
    }

    /// Drop every window that has fully elapsed at `now`.
    ///
    /// # Returns
    /// Number of windows removed.
    pub fn prune_expired(&self, now: Instant) -> usize {
        let mut windows = self.windows.write().unwrap_or_else(PoisonError::into_inner);
        let before = windows.len();
        windows.retain(|key, entry| {
            let Some(rule) = self.rules.get(&key.category) else {
                return false;
            };
            // A handle held outside the table is about to be counted against.
            if Arc::strong_count(entry) > 1 {
                return true;
            }
            let window = entry.lock().unwrap_or_else(PoisonError::into_inner);
            now.saturating_duration_since(window.started) < rule.window()
        });
        before - windows.len()
    }

    /// Number of tracked windows.
    pub fn tracked_windows(&self) -> usize {
        self.windows
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}
