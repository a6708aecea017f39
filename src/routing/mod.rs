//! Request routing and failover engine
//!
//! Selection flows bottom-up: per-endpoint health ([`EndpointState`]) feeds
//! weighted fair selection inside a tier, tiers fail over in priority order
//! ([`TieredRouter`]), a [`Route`] budgets selections per request, and the
//! [`Registry`] maps deployment names to routers across config reloads.

mod balancer;
mod health;
mod registry;
mod route;
mod router;

pub use health::EndpointState;
pub use registry::{Registry, UnavailableEndpoint};
pub use route::Route;
pub use router::TieredRouter;
