//! Reputation and Trust Scoring Module
//!
//! Derives per-node reputation from the live incoming edges of the risk graph
//! and resolves identities to scores.
//!
//! Reputation is a pure function of the live graph: nothing is cached, so a
//! score read right after a mutation is indistinguishable from a fresh
//! recomputation.

use crate::graph::RiskGraph;
use qvl_core::{Identity, NodeId, ReputationConfig, Result, NEUTRAL_SCORE};
use qvl_identity::IdentityRegistry;
use serde::{Deserialize, Serialize};

/// Reputation of one node at one evaluation time
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationRecord {
    pub node: NodeId,
    /// 0.0 to 1.0; 0.5 is neutral
    pub score: f64,
    /// Number of live incoming edges that contributed
    pub live_incoming: usize,
    /// Sum of level and recency weights of those edges
    pub evidence_weight: f64,
}

/// Aggregates live incoming edges into a reputation score.
///
/// `score = (1 + x) / 2` with
/// `x = Σ wᵢ·riskᵢ / (prior_weight + Σ wᵢ)` and
/// `wᵢ = level_weight · recency`. The neutral prior keeps the score at 0.5
/// without evidence and pulls it back towards 0.5 as edges approach
/// expiration, so scores move continuously. Raising any risk only raises the
/// numerator, so the score is monotone in every incoming risk.
#[derive(Debug, Clone, Default)]
pub struct ReputationAggregator {
    config: ReputationConfig,
}

impl ReputationAggregator {
    pub fn new(config: ReputationConfig) -> Self {
        Self { config }
    }

    pub fn aggregate(&self, graph: &RiskGraph, node: NodeId, now_ns: u64) -> ReputationRecord {
        let mut live_incoming = 0usize;
        let mut weighted_risk = 0.0;
        let mut evidence_weight = 0.0;

        for edge in graph.incoming(node, now_ns) {
            let weight = edge.level_weight() * edge.recency_at(now_ns);
            live_incoming += 1;
            weighted_risk += weight * edge.risk;
            evidence_weight += weight;
        }

        let score = if live_incoming == 0 {
            NEUTRAL_SCORE
        } else {
            let x = weighted_risk / (self.config.prior_weight + evidence_weight);
            ((1.0 + x) / 2.0).clamp(0.0, 1.0)
        };

        ReputationRecord {
            node,
            score,
            live_incoming,
            evidence_weight,
        }
    }

    pub fn reputation(&self, graph: &RiskGraph, node: NodeId, now_ns: u64) -> f64 {
        self.aggregate(graph, node, now_ns).score
    }
}

/// Resolves identities to reputation scores
#[derive(Debug, Clone, Default)]
pub struct TrustScorer {
    aggregator: ReputationAggregator,
}

impl TrustScorer {
    pub fn new(aggregator: ReputationAggregator) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &ReputationAggregator {
        &self.aggregator
    }

    /// Trust score for an untrusted identity buffer.
    ///
    /// Wrong-length buffers are `MalformedIdentity`; identities the registry
    /// has never seen are treated as unknown nodes and score neutral.
    pub fn trust_score(
        &self,
        registry: &IdentityRegistry,
        graph: &RiskGraph,
        identity: &[u8],
        now_ns: u64,
    ) -> Result<f64> {
        let identity = Identity::from_slice(identity)?;
        Ok(self.score_identity(registry, graph, &identity, now_ns))
    }

    pub fn score_identity(
        &self,
        registry: &IdentityRegistry,
        graph: &RiskGraph,
        identity: &Identity,
        now_ns: u64,
    ) -> f64 {
        match registry.lookup(identity) {
            Some(node) => self.aggregator.reputation(graph, node, now_ns),
            None => NEUTRAL_SCORE,
        }
    }
}
