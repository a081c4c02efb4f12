//! Brute-force protection for password logins.
//!
//! Failures are counted per normalized username. Counting restarts when the
//! previous failure is older than the reset window; reaching the limit locks
//! the username for a fixed duration. Expired lockouts are cleared lazily the
//! next time the username is checked.

use super::user_models::normalize_username;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct AttemptTrackerConfig {
    pub max_failures: u32,
    pub reset_window: Duration,
    pub lockout_duration: Duration,
}

impl Default for AttemptTrackerConfig {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_window: Duration::from_secs(30 * 60),
            lockout_duration: Duration::from_secs(15 * 60),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct AttemptState {
    failures: u32,
    last_failure: Instant,
    locked_until: Option<Instant>,
}

/// Outcome of a recorded failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureOutcome {
    /// Still counting, `remaining` more failures are allowed before lockout.
    Counting { remaining: u32 },
    /// This failure locked the username.
    Locked { lockout: Duration },
}

/// Observable state of a username, mostly for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptStatus {
    Clear,
    Counting { failures: u32 },
    Locked { remaining: Duration },
}

pub struct AttemptTracker {
    config: AttemptTrackerConfig,
    states: Mutex<HashMap<String, AttemptState>>,
}

impl AttemptTracker {
    pub fn new(config: AttemptTrackerConfig) -> Self {
        Self {
            config,
            states: Mutex::new(HashMap::new()),
        }
    }

    /// An entry is stale once its lockout expired or, while counting, once
    /// its last failure fell out of the reset window.
    fn is_stale(&self, state: &AttemptState, now: Instant) -> bool {
        match state.locked_until {
            Some(until) => until <= now,
            None => now.saturating_duration_since(state.last_failure) > self.config.reset_window,
        }
    }

    fn states(&self) -> MutexGuard<'_, HashMap<String, AttemptState>> {
        self.states
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the remaining lockout if the username is locked.
    pub fn check_locked(&self, username: &str) -> Option<Duration> {
        self.check_locked_at(username, Instant::now())
    }

    pub fn check_locked_at(&self, username: &str, now: Instant) -> Option<Duration> {
        match self.status_at(username, now) {
            AttemptStatus::Locked { remaining } => Some(remaining),
            _ => None,
        }
    }

    pub fn status(&self, username: &str) -> AttemptStatus {
        self.status_at(username, Instant::now())
    }

    pub fn status_at(&self, username: &str, now: Instant) -> AttemptStatus {
        let key = normalize_username(username);
        let mut states = self.states();
        let state = match states.get(&key) {
            Some(state) => *state,
            None => return AttemptStatus::Clear,
        };
        if self.is_stale(&state, now) {
            states.remove(&key);
            return AttemptStatus::Clear;
        }
        match state.locked_until {
            Some(until) => AttemptStatus::Locked {
                remaining: until - now,
            },
            None => AttemptStatus::Counting {
                failures: state.failures,
            },
        }
    }

    pub fn record_failure(&self, username: &str) -> FailureOutcome {
        self.record_failure_at(username, Instant::now())
    }

    pub fn record_failure_at(&self, username: &str, now: Instant) -> FailureOutcome {
        let key = normalize_username(username);
        let mut states = self.states();
        states.retain(|_, state| !self.is_stale(state, now));

        let failures = match states.get(&key) {
            Some(AttemptState {
                locked_until: Some(until),
                ..
            }) => {
                return FailureOutcome::Locked {
                    lockout: *until - now,
                };
            }
            Some(state) => state.failures + 1,
            None => 1,
        };

        let locked_until = if failures >= self.config.max_failures {
            Some(now + self.config.lockout_duration)
        } else {
            None
        };
        states.insert(
            key,
            AttemptState {
                failures,
                last_failure: now,
                locked_until,
            },
        );

        match locked_until {
            Some(_) => FailureOutcome::Locked {
                lockout: self.config.lockout_duration,
            },
            None => FailureOutcome::Counting {
                remaining: self.config.max_failures - failures,
            },
        }
    }

    pub fn reset(&self, username: &str) {
        self.states().remove(&normalize_username(username));
    }
}

impl Default for AttemptTracker {
    fn default() -> Self {
        Self::new(AttemptTrackerConfig::default())
    }
}
