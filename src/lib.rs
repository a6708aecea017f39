//! Fairway - weighted fair routing and tiered failover for gateway upstreams
//!
//! This library picks which physical backend endpoint serves each request of
//! a logical deployment: load is spread inside a priority tier by configured
//! weights, unhealthy endpoints sit out exponential or rate-limit backoff
//! windows, lower-priority tiers take over only when a whole tier is down,
//! and configuration hot-reloads keep live health state whenever a
//! deployment's endpoint set is unchanged.
//!
//! The HTTP transport, authentication, and the config loader are external
//! collaborators: the engine consumes deployment catalogs and emits one
//! endpoint per attempt, learning outcomes after the fact.

pub mod config;
pub mod error;
pub mod routing;
pub mod upstream;

pub use crate::config::RoutingConfig;
pub use crate::error::{RoutingError, RoutingResult};
pub use crate::routing::{EndpointState, Registry, Route, TieredRouter, UnavailableEndpoint};
pub use crate::upstream::{
    Deployment, DeploymentKind, FailureKind, GatewayConfig, UpstreamSource, UpstreamSpec,
};
