//! Error types for Fairway
//!
//! Endpoint-level failures are recorded in health state and never surface as
//! errors; only construction-time misconfiguration does.

use thiserror::Error;

/// Routing-engine errors
#[derive(Debug, Error)]
pub enum RoutingError {
    /// A deployment declared no usable upstream endpoints. Raised while a
    /// router is built during config load/reload, never at request time.
    #[error("Deployment '{0}' has no upstream endpoints configured")]
    NoUpstreams(String),
}

/// Result type alias for convenience
pub type RoutingResult<T> = Result<T, RoutingError>;
