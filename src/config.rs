//! Configuration for the routing engine
//!
//! Tuning knobs are loaded from environment variables; defaults match
//! production behavior (3-error threshold, 1s exponential backoff base,
//! 5-minute cap, 5 attempts per request).

use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Routing engine configuration
#[derive(Debug, Clone)]
pub struct RoutingConfig {
    /// Consecutive server errors before an endpoint enters backoff
    pub error_threshold: u32,
    /// Backoff base; the delay is `initial_backoff * 2^consecutive_errors`
    pub initial_backoff: Duration,
    /// Upper bound on any computed backoff delay
    pub max_backoff: Duration,
    /// Selection budget of a single request's route
    pub max_attempts: u32,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            error_threshold: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(300), // 5 minutes
            max_attempts: 5,
        }
    }
}

impl RoutingConfig {
    /// Load configuration from environment variables, falling back to defaults
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            error_threshold: parse_var("FAIRWAY_ERROR_THRESHOLD", defaults.error_threshold)?,
            initial_backoff: Duration::from_millis(parse_var(
                "FAIRWAY_INITIAL_BACKOFF_MS",
                defaults.initial_backoff.as_millis() as u64,
            )?),
            max_backoff: Duration::from_millis(parse_var(
                "FAIRWAY_MAX_BACKOFF_MS",
                defaults.max_backoff.as_millis() as u64,
            )?),
            max_attempts: parse_var("FAIRWAY_MAX_ATTEMPTS", defaults.max_attempts)?,
        })
    }
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(name) {
        Ok(raw) => raw.parse().with_context(|| format!("Invalid {}", name)),
        Err(_) => Ok(default),
    }
}
