//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: a bounded number of probes test if the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures within window >= failure_threshold
//! Open → Half-Open: open_duration elapsed (checked on the next allow())
//! Half-Open → Closed: a probe succeeds
//! Half-Open → Open: a probe fails
//! ```
//!
//! # Design Decisions
//! - One breaker per breaker id, shared by the routes that reference it
//! - All transitions happen under a single mutex, so they are linearizable
//! - Every transition bumps a generation; permits remember theirs and
//!   outcomes from an older generation are discarded
//! - A permit dropped without an outcome releases its probe slot

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use axum::http::StatusCode;
use serde::Serialize;
use thiserror::Error;

use crate::config::BreakerSettings;
use crate::observability::metrics;

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    /// Gauge encoding: 0 closed, 1 half-open, 2 open.
    pub fn as_gauge(self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

/// Returned by [`CircuitBreaker::allow`] when the request must not reach the upstream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("circuit '{breaker}' is open")]
pub struct CircuitOpen {
    pub breaker: String,
}

/// Which upstream statuses count as failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusPolicy {
    /// Every 5xx.
    ServerErrors,
    /// An explicit set of status codes.
    Codes(Vec<u16>),
}

impl StatusPolicy {
    pub fn is_failure(&self, status: StatusCode) -> bool {
        match self {
            StatusPolicy::ServerErrors => status.is_server_error(),
            StatusPolicy::Codes(codes) => codes.contains(&status.as_u16()),
        }
    }
}

/// Runtime breaker configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub failure_threshold: u32,
    pub open_duration: Duration,
    pub half_open_trial_count: u32,
    pub window: Duration,
    pub failure_statuses: StatusPolicy,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self::from(&BreakerSettings::default())
    }
}

impl From<&BreakerSettings> for CircuitBreakerConfig {
    fn from(settings: &BreakerSettings) -> Self {
        let failure_statuses = if settings.failure_status_codes.is_empty() {
            StatusPolicy::ServerErrors
        } else {
            StatusPolicy::Codes(settings.failure_status_codes.clone())
        };
        Self {
            failure_threshold: settings.failure_threshold,
            open_duration: Duration::from_millis(settings.open_duration_ms),
            half_open_trial_count: settings.half_open_trial_count,
            window: Duration::from_millis(settings.window_ms),
            failure_statuses,
        }
    }
}

impl CircuitBreakerConfig {
    pub fn with_failure_threshold(mut self, threshold: u32) -> Self {
        self.failure_threshold = threshold;
        self
    }

    pub fn with_open_duration(mut self, duration: Duration) -> Self {
        self.open_duration = duration;
        self
    }

    pub fn with_half_open_trials(mut self, trials: u32) -> Self {
        self.half_open_trial_count = trials;
        self
    }

    pub fn with_window(mut self, window: Duration) -> Self {
        self.window = window;
        self
    }
}

/// Point-in-time view of a breaker, exposed through the admin API.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerSnapshot {
    pub id: String,
    pub state: CircuitState,
    pub failure_count: usize,
    pub success_count: u64,
    pub probes_in_flight: u32,
    pub since_transition_ms: u64,
    pub failure_threshold: u32,
    pub open_duration_ms: u64,
    pub half_open_trial_count: u32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    generation: u64,
    /// Failure timestamps inside the sliding window (Closed only).
    failures: VecDeque<Instant>,
    successes: u64,
    probes_in_flight: u32,
    last_transition: Instant,
}

impl Inner {
    fn transition(&mut self, to: CircuitState, now: Instant) -> (CircuitState, CircuitState) {
        let from = self.state;
        self.state = to;
        self.generation += 1;
        self.failures.clear();
        self.successes = 0;
        self.probes_in_flight = 0;
        self.last_transition = now;
        (from, to)
    }

    fn prune(&mut self, window: Duration, now: Instant) {
        while let Some(oldest) = self.failures.front() {
            if now.duration_since(*oldest) > window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}

/// Three-state circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    id: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(id: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            id: id.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                generation: 0,
                failures: VecDeque::new(),
                successes: 0,
                probes_in_flight: 0,
                last_transition: Instant::now(),
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Whether an upstream status counts as a failure for this breaker.
    pub fn is_failure_status(&self, status: StatusCode) -> bool {
        self.config.failure_statuses.is_failure(status)
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Inner is left consistent at every await-free step, so a poisoned
        // lock still holds valid state.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current state, applying the Open → Half-Open timeout if due.
    pub fn state(&self) -> CircuitState {
        let mut inner = self.lock();
        let transition = self.refresh(&mut inner, Instant::now());
        let state = inner.state;
        drop(inner);
        self.report(transition);
        state
    }

    /// Ask for permission to call the upstream.
    pub fn allow(self: &Arc<Self>) -> Result<Permit, CircuitOpen> {
        let mut inner = self.lock();
        let transition = self.refresh(&mut inner, Instant::now());

        let result = match inner.state {
            CircuitState::Closed => Ok(Permit::new(self, inner.generation, false)),
            CircuitState::HalfOpen if inner.probes_in_flight < self.config.half_open_trial_count => {
                inner.probes_in_flight += 1;
                Ok(Permit::new(self, inner.generation, true))
            }
            CircuitState::HalfOpen | CircuitState::Open => Err(CircuitOpen {
                breaker: self.id.clone(),
            }),
        };
        drop(inner);

        self.report(transition);
        result
    }

    /// Feed the outcome of a permitted call back into the breaker.
    pub fn record_outcome(&self, mut permit: Permit, success: bool) {
        if !std::ptr::eq(Arc::as_ptr(&permit.breaker), self) {
            tracing::warn!(breaker = %self.id, other = %permit.breaker.id, "Permit recorded on a foreign breaker");
            return;
        }
        permit.settled = true;

        let now = Instant::now();
        let mut inner = self.lock();
        if permit.generation != inner.generation {
            tracing::trace!(breaker = %self.id, "Discarding outcome from a previous breaker generation");
            return;
        }

        let transition = match inner.state {
            CircuitState::Closed if success => {
                inner.successes += 1;
                None
            }
            CircuitState::Closed => {
                inner.failures.push_back(now);
                inner.prune(self.config.window, now);
                if inner.failures.len() >= self.config.failure_threshold as usize {
                    Some(inner.transition(CircuitState::Open, now))
                } else {
                    None
                }
            }
            CircuitState::HalfOpen => {
                inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
                if success {
                    Some(inner.transition(CircuitState::Closed, now))
                } else {
                    Some(inner.transition(CircuitState::Open, now))
                }
            }
            // No permit is ever issued in Open under the current generation.
            CircuitState::Open => None,
        };
        drop(inner);

        self.report(transition);
    }

    pub fn snapshot(&self) -> BreakerSnapshot {
        let mut inner = self.lock();
        let now = Instant::now();
        let transition = self.refresh(&mut inner, now);
        inner.prune(self.config.window, now);
        let snapshot = BreakerSnapshot {
            id: self.id.clone(),
            state: inner.state,
            failure_count: inner.failures.len(),
            success_count: inner.successes,
            probes_in_flight: inner.probes_in_flight,
            since_transition_ms: now.duration_since(inner.last_transition).as_millis() as u64,
            failure_threshold: self.config.failure_threshold,
            open_duration_ms: self.config.open_duration.as_millis() as u64,
            half_open_trial_count: self.config.half_open_trial_count,
        };
        drop(inner);
        self.report(transition);
        snapshot
    }

    fn refresh(&self, inner: &mut Inner, now: Instant) -> Option<(CircuitState, CircuitState)> {
        if inner.state == CircuitState::Open
            && now.duration_since(inner.last_transition) >= self.config.open_duration
        {
            return Some(inner.transition(CircuitState::HalfOpen, now));
        }
        None
    }

    fn release_probe(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.generation == generation && inner.state == CircuitState::HalfOpen {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
            tracing::debug!(breaker = %self.id, "Probe abandoned before completion");
        }
    }

    fn report(&self, transition: Option<(CircuitState, CircuitState)>) {
        let Some((from, to)) = transition else {
            return;
        };
        match to {
            CircuitState::Open => {
                tracing::warn!(breaker = %self.id, from = ?from, to = ?to, "Circuit opened")
            }
            _ => tracing::info!(breaker = %self.id, from = ?from, to = ?to, "Circuit state changed"),
        }
        metrics::record_breaker_state(&self.id, to);
    }
}

/// Permission to make one upstream call.
///
/// Hand it back through [`CircuitBreaker::record_outcome`]. Dropping it
/// without an outcome (cancelled request) counts as neither success nor
/// failure.
#[derive(Debug)]
#[must_use = "a permit must be settled with record_outcome"]
pub struct Permit {
    breaker: Arc<CircuitBreaker>,
    generation: u64,
    probe: bool,
    settled: bool,
}

impl Permit {
    fn new(breaker: &Arc<CircuitBreaker>, generation: u64, probe: bool) -> Self {
        Self {
            breaker: breaker.clone(),
            generation,
            probe,
            settled: false,
        }
    }

    /// Whether this permit was issued as a half-open probe.
    pub fn is_probe(&self) -> bool {
        self.probe
    }
}

impl Drop for Permit {
    fn drop(&mut self) {
        if !self.settled && self.probe {
            self.breaker.release_probe(self.generation);
        }
    }
}
