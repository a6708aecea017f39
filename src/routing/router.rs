//! Tiered failover across priority groups
//!
//! A deployment's endpoints are grouped by tier and tried in ascending tier
//! order; a tier is passed over only when every endpoint in it is
//! unavailable, so weights shape distribution inside a tier but never the
//! failover decision between tiers.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::RoutingConfig;
use crate::error::RoutingError;
use crate::upstream::UpstreamSpec;

use super::balancer::WeightedFairBalancer;
use super::health::EndpointState;

/// Immutable router over one deployment's tiers
///
/// Built once per deployment per config generation; all mutability lives in
/// the per-tier balancers and per-endpoint health it owns. The original spec
/// list is kept verbatim so a reload can tell whether this router may be
/// reused with its health intact.
#[derive(Debug)]
pub struct TieredRouter {
    name: String,
    /// Balancers in ascending tier order
    tiers: Vec<WeightedFairBalancer>,
    /// The exact list this router was built from, for reload comparison
    specs: Vec<UpstreamSpec>,
}

impl TieredRouter {
    /// Build a router for a deployment's upstream list
    ///
    /// An empty list is a misconfiguration surfaced immediately at config
    /// load, never deferred to request time.
    pub fn new(
        name: impl Into<String>,
        specs: Vec<UpstreamSpec>,
        config: &RoutingConfig,
    ) -> Result<Self, RoutingError> {
        let name = name.into();
        if specs.is_empty() {
            return Err(RoutingError::NoUpstreams(name));
        }

        let mut by_tier: BTreeMap<i32, Vec<UpstreamSpec>> = BTreeMap::new();
        for spec in &specs {
            by_tier.entry(spec.tier).or_default().push(spec.clone());
        }

        // BTreeMap iteration gives ascending tier order.
        let tiers = by_tier
            .into_iter()
            .map(|(tier, group)| WeightedFairBalancer::new(tier, group, config))
            .collect();

        Ok(Self { name, tiers, specs })
    }

    /// Deployment name this router serves
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Select an endpoint, failing over to lower-priority tiers as needed
    pub fn select(&self) -> Option<Arc<EndpointState>> {
        self.tiers.iter().find_map(|tier| tier.select())
    }

    /// Whether `specs` is the same unordered multiset this router was built
    /// from (reuse across reloads keeps health state alive)
    pub fn same_upstreams(&self, specs: &[UpstreamSpec]) -> bool {
        if self.specs.len() != specs.len() {
            return false;
        }
        let mut ours = self.specs.clone();
        let mut theirs = specs.to_vec();
        ours.sort_unstable();
        theirs.sort_unstable();
        ours == theirs
    }

    /// Endpoint states across all tiers, ascending tier order
    pub(crate) fn states(&self) -> impl Iterator<Item = &Arc<EndpointState>> {
        self.tiers.iter().flat_map(|tier| tier.states().iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::FailureKind;
    use pretty_assertions::assert_eq;

    fn two_tier_router() -> TieredRouter {
        // Tier 0 carries a single light endpoint; tier 1 a heavy one.
        let specs = vec![
            UpstreamSpec::new("https://primary.example", "k1").with_weight(1),
            UpstreamSpec::new("https://fallback.example", "k2")
                .with_weight(9)
                .with_tier(1),
        ];
        TieredRouter::new("gpt-4o", specs, &RoutingConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_upstreams_is_fatal() {
        let err = TieredRouter::new("broken", Vec::new(), &RoutingConfig::default()).unwrap_err();
        assert!(matches!(err, RoutingError::NoUpstreams(name) if name == "broken"));
    }

    #[test]
    fn test_lower_tier_shadows_higher_weight() {
        let router = two_tier_router();
        // Weight 9 in tier 1 never beats an available tier 0 endpoint.
        for _ in 0..20 {
            let ep = router.select().unwrap();
            assert_eq!(ep.spec().endpoint, "https://primary.example");
        }
    }

    #[test]
    fn test_failover_when_tier_exhausted() {
        let router = two_tier_router();
        let primary = router.select().unwrap();
        primary.record_failure(FailureKind::rate_limited(3600));

        let ep = router.select().unwrap();
        assert_eq!(ep.spec().endpoint, "https://fallback.example");
    }

    #[test]
    fn test_recovery_returns_traffic_to_preferred_tier() {
        let router = two_tier_router();
        let primary = router.select().unwrap();
        primary.record_failure(FailureKind::rate_limited(3600));
        assert_eq!(router.select().unwrap().spec().endpoint, "https://fallback.example");

        primary.record_success();
        assert_eq!(router.select().unwrap().spec().endpoint, "https://primary.example");
    }

    #[test]
    fn test_all_tiers_exhausted_returns_none() {
        let router = two_tier_router();
        let states: Vec<_> = router.states().cloned().collect();
        for state in states {
            state.record_failure(FailureKind::rate_limited(3600));
        }
        assert!(router.select().is_none());
    }

    #[test]
    fn test_same_upstreams_ignores_order() {
        let a = UpstreamSpec::new("https://a.example", "k1");
        let b = UpstreamSpec::new("https://b.example", "k2").with_weight(3);
        let router =
            TieredRouter::new("d", vec![a.clone(), b.clone()], &RoutingConfig::default()).unwrap();

        assert!(router.same_upstreams(&[b.clone(), a.clone()]));
        assert!(!router.same_upstreams(&[a.clone()]));
        assert!(!router.same_upstreams(&[a.clone(), b.with_weight(4)]));
        assert!(!router.same_upstreams(&[a.clone(), a]));
    }

    #[test]
    fn test_zero_weight_tier_degrades_to_next() {
        let specs = vec![
            UpstreamSpec::new("https://dead.example", "k").with_weight(0),
            UpstreamSpec::new("https://live.example", "k").with_tier(1),
        ];
        let router = TieredRouter::new("d", specs, &RoutingConfig::default()).unwrap();
        assert_eq!(router.select().unwrap().spec().endpoint, "https://live.example");
    }
}
