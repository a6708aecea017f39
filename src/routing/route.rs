//! Per-request selection cursor with a fixed retry budget
//!
//! Dispatch obtains one `Route` per inbound request and walks it:
//!
//! ```ignore
//! while route.available() {
//!     let Some(upstream) = route.next() else { break };
//!     match call_endpoint(&upstream).await {
//!         Ok(_) => {
//!             route.succeed();
//!             break;
//!         }
//!         Err(failure) => route.fail(failure),
//!     }
//! }
//! ```
//!
//! Exhausting the budget is a normal signal, not an error: the caller
//! synthesizes the final client-facing response (502/503) itself.

use std::sync::Arc;

use tracing::debug;

use crate::upstream::{FailureKind, UpstreamSpec};

use super::health::EndpointState;
use super::router::TieredRouter;

/// Retry-budgeted cursor over one deployment's router
///
/// Ephemeral: created at dispatch start, dropped with the request. Dropping
/// an in-flight route carries no cleanup obligation.
pub struct Route {
    router: Arc<TieredRouter>,
    attempts_used: u32,
    max_attempts: u32,
    current: Option<Arc<EndpointState>>,
    exhausted: bool,
}

impl Route {
    pub(crate) fn new(router: Arc<TieredRouter>, max_attempts: u32) -> Self {
        Self {
            router,
            attempts_used: 0,
            max_attempts,
            current: None,
            exhausted: false,
        }
    }

    /// Whether another selection may be attempted
    pub fn available(&self) -> bool {
        !self.exhausted && self.attempts_used < self.max_attempts
    }

    /// Select the next endpoint to try
    ///
    /// Returns `None`, permanently, once the budget is spent or the router
    /// has no available endpoint left in any tier.
    pub fn next(&mut self) -> Option<UpstreamSpec> {
        if !self.available() {
            self.exhausted = true;
            return None;
        }
        match self.router.select() {
            Some(endpoint) => {
                self.attempts_used += 1;
                let spec = endpoint.spec().clone();
                self.current = Some(endpoint);
                Some(spec)
            }
            None => {
                debug!(
                    deployment = %self.router.name(),
                    attempts_used = self.attempts_used,
                    "No available endpoint in any tier"
                );
                self.exhausted = true;
                None
            }
        }
    }

    /// The most recent selection, if any
    pub fn current(&self) -> Option<&UpstreamSpec> {
        self.current.as_ref().map(|ep| ep.spec())
    }

    /// Report a failed call against the current selection
    ///
    /// Records into the endpoint's health only; the caller asks `next()` for
    /// a replacement itself.
    pub fn fail(&self, kind: FailureKind) {
        if let Some(endpoint) = &self.current {
            endpoint.record_failure(kind);
        }
    }

    /// Report a successful call against the current selection
    pub fn succeed(&self) {
        if let Some(endpoint) = &self.current {
            endpoint.record_success();
        }
    }

    /// Selections handed out so far
    pub fn used(&self) -> u32 {
        self.attempts_used
    }
}
