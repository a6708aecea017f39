//! Per-endpoint health tracking with exponential backoff
//!
//! Each endpoint carries its own failure counters and backoff deadline.
//! Rate-limit signals set the deadline directly from the upstream's hint;
//! repeated server errors push the endpoint into exponential backoff once a
//! threshold of consecutive failures is crossed.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::config::RoutingConfig;
use crate::upstream::{FailureKind, UpstreamSpec};

/// Mutable health behind the endpoint's lock
#[derive(Debug, Default)]
struct Health {
    /// Consecutive server errors since the last success
    consecutive_errors: u32,
    /// Endpoint is excluded from selection until this deadline passes
    retry_at: Option<Instant>,
}

/// One upstream endpoint plus its live health state
///
/// State is in-memory per process (each gateway instance tracks health from
/// its own observations) and lives as long as the router that built it; a
/// rebuilt router starts with fresh health.
#[derive(Debug)]
pub struct EndpointState {
    spec: UpstreamSpec,
    config: RoutingConfig,
    health: Mutex<Health>,
}

impl EndpointState {
    /// Wrap a spec with fresh health state
    ///
    /// Callers must have filtered out non-positive weights already.
    pub(crate) fn new(spec: UpstreamSpec, config: RoutingConfig) -> Self {
        debug_assert!(spec.weight > 0);
        Self {
            spec,
            config,
            health: Mutex::new(Health::default()),
        }
    }

    /// The immutable spec this state tracks
    pub fn spec(&self) -> &UpstreamSpec {
        &self.spec
    }

    /// Whether the endpoint is currently selectable
    ///
    /// True when no backoff deadline is set or the deadline has passed.
    pub fn is_available(&self) -> bool {
        let health = self.health.lock().unwrap();
        match health.retry_at {
            None => true,
            Some(retry_at) => Instant::now() > retry_at,
        }
    }

    /// Remaining backoff window, if any (for Retry-After style diagnostics)
    pub fn backoff_remaining(&self) -> Option<Duration> {
        let health = self.health.lock().unwrap();
        health
            .retry_at
            .map(|retry_at| retry_at.saturating_duration_since(Instant::now()))
            .filter(|remaining| !remaining.is_zero())
    }

    /// Consecutive server errors since the last success
    pub fn consecutive_errors(&self) -> u32 {
        self.health.lock().unwrap().consecutive_errors
    }

    /// Record a failed call against this endpoint
    pub fn record_failure(&self, kind: FailureKind) {
        let mut health = self.health.lock().unwrap();
        match kind {
            FailureKind::RateLimited { retry_after } => {
                // The upstream's hint is trusted as given; the error streak
                // is untouched.
                health.retry_at = Some(Instant::now() + retry_after);
                debug!(
                    endpoint = %self.spec.endpoint,
                    retry_after_secs = retry_after.as_secs(),
                    "Endpoint rate limited"
                );
            }
            FailureKind::ServerError => {
                health.consecutive_errors += 1;
                if health.consecutive_errors >= self.config.error_threshold {
                    let delay = self.backoff_delay(health.consecutive_errors);
                    health.retry_at = Some(Instant::now() + delay);
                    warn!(
                        endpoint = %self.spec.endpoint,
                        consecutive_errors = health.consecutive_errors,
                        backoff_ms = delay.as_millis() as u64,
                        "Endpoint entering backoff after repeated server errors"
                    );
                }
            }
        }
    }

    /// Record a successful call, resetting the error streak and any backoff
    pub fn record_success(&self) {
        let mut health = self.health.lock().unwrap();
        if health.consecutive_errors > 0 || health.retry_at.is_some() {
            info!(
                endpoint = %self.spec.endpoint,
                previous_errors = health.consecutive_errors,
                "Endpoint recovered, resetting health state"
            );
        }
        health.consecutive_errors = 0;
        health.retry_at = None;
    }

    /// Exponential backoff: `initial * 2^errors`, capped at `max_backoff`
    ///
    /// The error counter keeps growing past the threshold; the cap alone
    /// bounds the delay, and exponent overflow saturates at the cap.
    fn backoff_delay(&self, consecutive_errors: u32) -> Duration {
        2u32.checked_pow(consecutive_errors)
            .map(|factor| self.config.initial_backoff.saturating_mul(factor))
            .unwrap_or(self.config.max_backoff)
            .min(self.config.max_backoff)
    }
}
