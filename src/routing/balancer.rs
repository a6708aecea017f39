//! Weighted fair selection within one priority tier
//!
//! Every call rebuilds the deficit ranking from the usage counters, so there
//! is no floating-point state to drift: each endpoint's delta is how far its
//! actual share of selections lags its weighted fair share, and the furthest-
//! behind available endpoint wins.

use std::sync::{Arc, Mutex};

use tracing::warn;

use crate::config::RoutingConfig;
use crate::upstream::UpstreamSpec;

use super::health::EndpointState;

/// Usage counters guarded as one unit: deltas read several counters and the
/// walk writes several, and the whole select call must see/leave a
/// consistent ensemble.
#[derive(Debug)]
struct UsageCounters {
    usage: Vec<u64>,
    total: u64,
}

/// Deficit-based weighted fair balancer over the endpoints of one tier
#[derive(Debug)]
pub(crate) struct WeightedFairBalancer {
    endpoints: Vec<Arc<EndpointState>>,
    total_weight: u64,
    counters: Mutex<UsageCounters>,
}

impl WeightedFairBalancer {
    /// Build a balancer from one tier's specs
    ///
    /// Specs with weight 0 are dropped here; a tier emptied by that filter
    /// logs one warning and then always selects nothing, leaving other tiers
    /// to carry the deployment's traffic.
    pub(crate) fn new(tier: i32, specs: Vec<UpstreamSpec>, config: &RoutingConfig) -> Self {
        let endpoints: Vec<Arc<EndpointState>> = specs
            .into_iter()
            .filter(|spec| spec.weight > 0)
            .map(|spec| Arc::new(EndpointState::new(spec, config.clone())))
            .collect();

        if endpoints.is_empty() {
            warn!(
                tier,
                "Tier has no endpoints with positive weight, it will never serve traffic"
            );
        }

        let total_weight = endpoints.iter().map(|ep| ep.spec().weight as u64).sum();
        let usage = vec![0; endpoints.len()];

        Self {
            endpoints,
            total_weight,
            counters: Mutex::new(UsageCounters { usage, total: 0 }),
        }
    }

    /// Endpoint states of this tier, in construction order
    pub(crate) fn states(&self) -> &[Arc<EndpointState>] {
        &self.endpoints
    }

    /// Pick the available endpoint furthest behind its fair share
    ///
    /// Usage is bumped for every candidate walked, available or not, so an
    /// endpoint sitting out a backoff window keeps accruing fair-share
    /// accounting and is not flooded the moment it recovers. Returns `None`
    /// only when every endpoint in the tier is unavailable.
    pub(crate) fn select(&self) -> Option<Arc<EndpointState>> {
        if self.endpoints.is_empty() {
            return None;
        }

        let mut counters = self.counters.lock().unwrap();

        let deltas: Vec<f64> = self
            .endpoints
            .iter()
            .enumerate()
            .map(|(i, ep)| {
                let expected = ep.spec().weight as f64 / self.total_weight as f64;
                let actual = if counters.total == 0 {
                    0.0
                } else {
                    counters.usage[i] as f64 / counters.total as f64
                };
                expected - actual
            })
            .collect();

        let mut ranking: Vec<usize> = (0..self.endpoints.len()).collect();
        // Ties among equal deltas are deliberately unordered.
        ranking.sort_unstable_by(|&a, &b| deltas[b].total_cmp(&deltas[a]));

        for i in ranking {
            counters.usage[i] += 1;
            counters.total += 1;
            if self.endpoints[i].is_available() {
                return Some(Arc::clone(&self.endpoints[i]));
            }
        }

        None
    }
}
