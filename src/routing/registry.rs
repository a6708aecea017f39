//! Routing table with hot reload
//!
//! Holds one `TieredRouter` per deployment name behind a copy-on-write
//! snapshot: readers clone an `Arc` to the whole map and never see a
//! partially updated table, while reloads rebuild the map off to the side
//! and swap it in with a single write.
//!
//! Reloads preserve health state wherever they can: a deployment whose
//! upstream spec set is value-identical to the previous generation keeps its
//! router object, and with it every endpoint's error streak and backoff
//! deadline.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::RoutingConfig;
use crate::error::RoutingError;
use crate::upstream::{GatewayConfig, UpstreamSource};

use super::route::Route;
use super::router::TieredRouter;

type RouterMap = HashMap<String, Arc<TieredRouter>>;

/// An endpoint currently sitting out a backoff window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnavailableEndpoint {
    pub deployment: String,
    pub endpoint: String,
    pub consecutive_errors: u32,
}

/// Deployment-name → router table, rebuilt on every config update
pub struct Registry {
    routers: RwLock<Arc<RouterMap>>,
    config: RoutingConfig,
}

impl Registry {
    /// Create an empty registry
    pub fn new(config: RoutingConfig) -> Self {
        Self {
            routers: RwLock::new(Arc::new(HashMap::new())),
            config,
        }
    }

    /// Start a retry-budgeted route for one request
    ///
    /// Deployments absent from the current snapshot (ad-hoc applications,
    /// requests racing a reload) get a throwaway router built directly from
    /// the source; its health state lives only as long as the route.
    pub fn route(&self, source: &dyn UpstreamSource) -> Result<Route, RoutingError> {
        let snapshot = Arc::clone(&self.routers.read().unwrap());
        if let Some(router) = snapshot.get(source.name()) {
            return Ok(Route::new(Arc::clone(router), self.config.max_attempts));
        }

        debug!(
            deployment = %source.name(),
            "Deployment not in routing table, building ad-hoc router"
        );
        let router = Arc::new(TieredRouter::new(
            source.name(),
            source.upstreams(),
            &self.config,
        )?);
        Ok(Route::new(router, self.config.max_attempts))
    }

    /// Rebuild the routing table from a new catalog snapshot
    ///
    /// Single-writer (the config loader serializes reloads) but always safe
    /// against concurrent `route()` calls. Routers whose upstream set is
    /// unchanged are carried over with their health intact; duplicate names
    /// keep the first definition.
    pub fn on_update(&self, catalog: &GatewayConfig) -> Result<(), RoutingError> {
        let previous = Arc::clone(&self.routers.read().unwrap());
        let mut next: RouterMap = HashMap::with_capacity(catalog.deployments.len());
        let mut reused = 0usize;

        for deployment in &catalog.deployments {
            let name = deployment.name();
            if next.contains_key(name) {
                warn!(
                    deployment = %name,
                    "Duplicate deployment name in catalog, keeping the first definition"
                );
                continue;
            }

            let upstreams = deployment.upstreams();
            let router = match previous.get(name) {
                Some(existing) if existing.same_upstreams(&upstreams) => {
                    reused += 1;
                    Arc::clone(existing)
                }
                _ => Arc::new(TieredRouter::new(name, upstreams, &self.config)?),
            };
            next.insert(name.to_string(), router);
        }

        let total = next.len();
        *self.routers.write().unwrap() = Arc::new(next);

        info!(
            deployments = total,
            reused, "Routing table updated from new catalog"
        );
        Ok(())
    }

    /// Endpoints currently excluded by backoff, for diagnostics
    pub fn unavailable_endpoints(&self) -> Vec<UnavailableEndpoint> {
        let snapshot = Arc::clone(&self.routers.read().unwrap());
        let mut out = Vec::new();
        for (name, router) in snapshot.iter() {
            for state in router.states() {
                if !state.is_available() {
                    out.push(UnavailableEndpoint {
                        deployment: name.clone(),
                        endpoint: state.spec().endpoint.clone(),
                        consecutive_errors: state.consecutive_errors(),
                    });
                }
            }
        }
        out
    }

    /// Shortest remaining backoff across a deployment's endpoints, if every
    /// endpoint is unavailable (for a Retry-After hint on the synthesized
    /// failure response)
    pub fn retry_hint(&self, deployment: &str) -> Option<Duration> {
        let snapshot = Arc::clone(&self.routers.read().unwrap());
        let router = snapshot.get(deployment)?;
        if router.states().any(|state| state.is_available()) {
            return None;
        }
        router
            .states()
            .filter_map(|state| state.backoff_remaining())
            .min()
    }
}
