//! Upstream and deployment models
//!
//! Defines the endpoint specification consumed by the routing engine, the
//! failure taxonomy reported back after each call, and the `UpstreamSource`
//! seam through which the config loader and dispatch layer hand deployments
//! to the registry.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Credential attached to upstreams synthesized from a bare endpoint field
pub const PLACEHOLDER_CREDENTIAL: &str = "unset";

/// One physical backend endpoint able to serve a deployment's traffic
///
/// Value-equal: two specs with identical fields are interchangeable, which is
/// what reload comparison relies on. `Ord` exists so spec lists can be
/// compared as unordered multisets.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UpstreamSpec {
    /// Backend address
    pub endpoint: String,
    /// Credential forwarded as the upstream authorization header
    pub credential: String,
    /// Relative share of traffic within the tier; 0 excludes the endpoint
    #[serde(default = "default_weight")]
    pub weight: u32,
    /// Priority tier; lower values are tried first
    #[serde(default)]
    pub tier: i32,
}

fn default_weight() -> u32 {
    1
}

impl UpstreamSpec {
    /// Create a spec with weight 1 in tier 0
    pub fn new(endpoint: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            credential: credential.into(),
            weight: 1,
            tier: 0,
        }
    }

    /// Set the traffic weight
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Set the priority tier
    pub fn with_tier(mut self, tier: i32) -> Self {
        self.tier = tier;
        self
    }
}

/// Failure category reported back to an endpoint after a call
///
/// Anything that is not a 429 or a 5xx is not tracked as a failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
    /// HTTP 429; carries the Retry-After hint (zero when absent)
    RateLimited { retry_after: Duration },
    /// HTTP 5xx; drives exponential backoff past the error threshold
    ServerError,
}

impl FailureKind {
    /// Rate-limit failure from a Retry-After hint in seconds
    ///
    /// Negative hints (malformed headers) are clamped to zero.
    pub fn rate_limited(retry_after_secs: i64) -> Self {
        Self::RateLimited {
            retry_after: Duration::from_secs(retry_after_secs.max(0) as u64),
        }
    }

    /// Map an HTTP status to a failure category
    ///
    /// Returns `None` for statuses the engine does not track (2xx, 4xx other
    /// than 429).
    pub fn from_status(status: u16, retry_after_secs: Option<i64>) -> Option<Self> {
        match status {
            429 => Some(Self::rate_limited(retry_after_secs.unwrap_or(0))),
            500..=599 => Some(Self::ServerError),
            _ => None,
        }
    }
}

/// Anything the registry can route for: a named entity with upstreams
///
/// Implemented by [`Deployment`] for catalog entries; dispatch may also hand
/// the registry ad-hoc sources that never appeared in a config snapshot.
pub trait UpstreamSource {
    /// Deployment name used as the routing-table key
    fn name(&self) -> &str;

    /// Upstream endpoint list for this deployment
    fn upstreams(&self) -> Vec<UpstreamSpec>;
}

/// Kind of routable entity exposed by the gateway
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentKind {
    #[default]
    Model,
    Application,
    Addon,
    Assistant,
    StaticRoute,
}

/// One routable target from the deployment catalog
///
/// Deployments without an explicit upstream list but with a bare `endpoint`
/// field synthesize a single-element list with a placeholder credential.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Deployment {
    pub name: String,
    #[serde(default)]
    pub kind: DeploymentKind,
    /// Bare endpoint for deployments without an explicit upstream list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub upstreams: Vec<UpstreamSpec>,
}

impl UpstreamSource for Deployment {
    fn name(&self) -> &str {
        &self.name
    }

    fn upstreams(&self) -> Vec<UpstreamSpec> {
        if !self.upstreams.is_empty() {
            return self.upstreams.clone();
        }
        match &self.endpoint {
            Some(endpoint) => vec![UpstreamSpec::new(endpoint, PLACEHOLDER_CREDENTIAL)],
            None => Vec::new(),
        }
    }
}

/// Immutable catalog snapshot handed to `Registry::on_update` by the loader
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub deployments: Vec<Deployment>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_spec_deserialization_defaults() {
        let spec: UpstreamSpec =
            serde_json::from_str(r#"{"endpoint": "https://a.example", "credential": "k1"}"#)
                .unwrap();
        assert_eq!(spec.weight, 1);
        assert_eq!(spec.tier, 0);
    }

    #[test]
    fn test_specs_are_value_equal() {
        let a = UpstreamSpec::new("https://a.example", "k1").with_weight(3);
        let b = UpstreamSpec::new("https://a.example", "k1").with_weight(3);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_weight(4));
    }

    #[test]
    fn test_rate_limited_clamps_negative_hint() {
        let kind = FailureKind::rate_limited(-7);
        assert_eq!(
            kind,
            FailureKind::RateLimited {
                retry_after: Duration::ZERO
            }
        );
    }

    #[test]
    fn test_from_status_taxonomy() {
        assert_eq!(
            FailureKind::from_status(429, Some(12)),
            Some(FailureKind::RateLimited {
                retry_after: Duration::from_secs(12)
            })
        );
        assert_eq!(
            FailureKind::from_status(503, None),
            Some(FailureKind::ServerError)
        );
        assert_eq!(FailureKind::from_status(200, None), None);
        assert_eq!(FailureKind::from_status(404, None), None);
    }

    #[test]
    fn test_deployment_synthesizes_upstream_from_bare_endpoint() {
        let deployment: Deployment = serde_json::from_str(
            r#"{"name": "gpt-4o", "kind": "model", "endpoint": "https://llm.example/v1"}"#,
        )
        .unwrap();

        let upstreams = deployment.upstreams();
        assert_eq!(upstreams.len(), 1);
        assert_eq!(upstreams[0].endpoint, "https://llm.example/v1");
        assert_eq!(upstreams[0].credential, PLACEHOLDER_CREDENTIAL);
        assert_eq!(upstreams[0].weight, 1);
    }

    #[test]
    fn test_deployment_prefers_explicit_upstreams() {
        let deployment = Deployment {
            name: "assistant-a".to_string(),
            kind: DeploymentKind::Assistant,
            endpoint: Some("https://ignored.example".to_string()),
            upstreams: vec![UpstreamSpec::new("https://a.example", "k1")],
        };
        assert_eq!(deployment.upstreams().len(), 1);
        assert_eq!(deployment.upstreams()[0].endpoint, "https://a.example");
    }

    #[test]
    fn test_gateway_config_deserialization() {
        let config: GatewayConfig = serde_json::from_str(
            r#"{
                "deployments": [
                    {"name": "route-a", "kind": "static_route",
                     "upstreams": [{"endpoint": "https://a", "credential": "k", "weight": 2, "tier": 1}]}
                ]
            }"#,
        )
        .unwrap();
        assert_eq!(config.deployments.len(), 1);
        assert_eq!(config.deployments[0].kind, DeploymentKind::StaticRoute);
        assert_eq!(config.deployments[0].upstreams[0].tier, 1);
    }
}
