//! Betrayal Detection
//!
//! Graph-wide anomaly analysis from a source node, evaluated in strict
//! priority order; only the highest-priority finding is reported:
//!
//! 1. **Negative cycle**: Bellman-Ford over the live edges reachable from the
//!    source, with edge weight equal to `risk`. A cycle whose cumulative risk
//!    is net-negative is compounding betrayal.
//! 2. **Low coverage**: the source can no longer reach enough of the peers it
//!    could once reach (gossip partition signal).
//! 3. **Belief propagation divergence**: endorsements that keep contradicting
//!    each other, so beliefs still reverse direction when the iteration bound
//!    is reached (see [`crate::belief`]).
//!
//! Nodes unreachable from the source take no part in any check.

use crate::belief::{divergence_score, BeliefOutcome, BeliefPropagation};
use crate::graph::RiskGraph;
use qvl_core::{BetrayalConfig, NodeId, QvlError, Result, RiskEdge};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

/// Relaxations smaller than this are treated as float noise
const RELAX_EPSILON: f64 = 1e-9;

/// Score at or above which an anomaly is critical
pub const CRITICAL_SCORE: f64 = 0.9;

/// Anomaly detection reason
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AnomalyReason {
    None = 0,
    NegativeCycle = 1,
    LowCoverage = 2,
    BpDivergence = 3,
}

impl AnomalyReason {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::None),
            1 => Some(Self::NegativeCycle),
            2 => Some(Self::LowCoverage),
            3 => Some(Self::BpDivergence),
            _ => None,
        }
    }
}

/// Anomaly score from betrayal detection
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AnomalyScore {
    /// Node flagged
    pub node: NodeId,
    /// 0.0 to 1.0 (0.9+ = critical)
    pub score: f64,
    pub reason: AnomalyReason,
}

impl AnomalyScore {
    pub fn clean(node: NodeId) -> Self {
        Self {
            node,
            score: 0.0,
            reason: AnomalyReason::None,
        }
    }

    pub fn is_critical(&self) -> bool {
        self.score >= CRITICAL_SCORE
    }
}

/// Proof of cycle: the edges of a net-negative cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetrayalEvidence {
    /// Node the evidence was gathered for
    pub node: NodeId,
    /// Cycle edges in traversal order, starting at the smallest node id
    pub cycle: Vec<RiskEdge>,
    /// Sum of `risk` around the cycle (negative)
    pub cumulative_risk: f64,
}

impl BetrayalEvidence {
    /// Deterministic encoding: `u16` edge count, then per edge
    /// `from u32 · to u32 · risk f64 · nonce u64`, all little-endian.
    ///
    /// Fails when the cycle has more edges than the count can describe.
    pub fn encode(&self) -> Result<Vec<u8>> {
        let count = u16::try_from(self.cycle.len()).map_err(|_| QvlError::EvidenceTooLarge {
            edges: self.cycle.len(),
        })?;
        let mut out = Vec::with_capacity(2 + self.cycle.len() * 24);
        out.extend_from_slice(&count.to_le_bytes());
        for edge in &self.cycle {
            out.extend_from_slice(&edge.from.to_le_bytes());
            out.extend_from_slice(&edge.to.to_le_bytes());
            out.extend_from_slice(&edge.risk.to_le_bytes());
            out.extend_from_slice(&edge.nonce.to_le_bytes());
        }
        Ok(out)
    }

    /// BLAKE3 digest of [`Self::encode`]
    pub fn digest(&self) -> Result<[u8; 32]> {
        Ok(*blake3::hash(&self.encode()?).as_bytes())
    }

    pub fn nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.cycle.iter().map(|edge| edge.from)
    }
}

/// Negative cycle found by Bellman-Ford
#[derive(Debug, Clone, PartialEq)]
struct NegativeCycle {
    /// Nodes in traversal order, rotated to start at the smallest id
    nodes: Vec<NodeId>,
    edges: Vec<RiskEdge>,
    cumulative_risk: f64,
}

/// Betrayal detector
#[derive(Debug, Clone, Default)]
pub struct BetrayalDetector {
    config: BetrayalConfig,
}

impl BetrayalDetector {
    pub fn new(config: BetrayalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BetrayalConfig {
        &self.config
    }

    /// Run every check from `source` and report the highest-priority finding.
    pub fn detect(&self, graph: &RiskGraph, source: NodeId, now_ns: u64) -> AnomalyScore {
        let reachable = graph.reachable_from(source, now_ns);

        if let Some(cycle) = self.worst_negative_cycle(graph, source, &reachable, now_ns) {
            let magnitude = cycle.cumulative_risk.abs();
            let node = if cycle.nodes.contains(&source) {
                source
            } else {
                cycle.nodes[0]
            };
            let score = cycle_score(magnitude, self.config.critical_cycle_magnitude);
            warn!(
                source,
                node,
                cycle_len = cycle.nodes.len(),
                cumulative_risk = cycle.cumulative_risk,
                score,
                "negative trust cycle detected"
            );
            return AnomalyScore {
                node,
                score,
                reason: AnomalyReason::NegativeCycle,
            };
        }

        let coverage = self.coverage_with(graph, source, &reachable);
        if coverage < self.config.min_coverage {
            let score = (1.0 - coverage).clamp(0.0, 1.0);
            warn!(source, coverage, score, "low gossip coverage");
            return AnomalyScore {
                node: source,
                score,
                reason: AnomalyReason::LowCoverage,
            };
        }

        let bp = BeliefPropagation::new(self.config.bp_max_iterations, self.config.bp_tolerance);
        match bp.run(graph, source, &reachable, now_ns) {
            BeliefOutcome::Converged { iterations, .. } => {
                debug!(source, iterations, "belief propagation converged");
                AnomalyScore::clean(source)
            }
            BeliefOutcome::Settling { residual, .. } => {
                debug!(source, residual, "belief propagation still settling at iteration bound");
                AnomalyScore::clean(source)
            }
            BeliefOutcome::Diverged {
                node,
                first_residual,
                final_residual,
                iterations,
            } => {
                let score = divergence_score(first_residual, final_residual, bp.tolerance());
                warn!(
                    source,
                    node,
                    iterations,
                    final_residual,
                    score,
                    "belief propagation diverged"
                );
                AnomalyScore {
                    node,
                    score,
                    reason: AnomalyReason::BpDivergence,
                }
            }
        }
    }

    /// Fraction of the source's expected peer set reachable over live edges.
    ///
    /// The expected set is everything reachable over every record ever
    /// inserted, live, revoked or expired. 1.0 when nothing is expected.
    pub fn coverage(&self, graph: &RiskGraph, source: NodeId, now_ns: u64) -> f64 {
        let reachable = graph.reachable_from(source, now_ns);
        self.coverage_with(graph, source, &reachable)
    }

    fn coverage_with(
        &self,
        graph: &RiskGraph,
        source: NodeId,
        reachable: &BTreeSet<NodeId>,
    ) -> f64 {
        let expected = graph.historically_reachable_from(source);
        let expected_peers = expected.iter().filter(|n| **n != source).count();
        if expected_peers == 0 {
            return 1.0;
        }
        let live_peers = reachable
            .iter()
            .filter(|n| **n != source && expected.contains(n))
            .count();
        live_peers as f64 / expected_peers as f64
    }

    /// Evidence for the worst negative cycle reachable from `node`.
    pub fn evidence(&self, graph: &RiskGraph, node: NodeId, now_ns: u64) -> Option<BetrayalEvidence> {
        let reachable = graph.reachable_from(node, now_ns);
        self.worst_negative_cycle(graph, node, &reachable, now_ns)
            .map(|cycle| BetrayalEvidence {
                node,
                cycle: cycle.edges,
                cumulative_risk: cycle.cumulative_risk,
            })
    }

    /// Bellman-Ford from `source` over live edges within `reachable`.
    fn worst_negative_cycle(
        &self,
        graph: &RiskGraph,
        source: NodeId,
        reachable: &BTreeSet<NodeId>,
        now_ns: u64,
    ) -> Option<NegativeCycle> {
        let edges: Vec<&RiskEdge> = reachable
            .iter()
            .flat_map(|node| graph.neighbors(*node, now_ns))
            .collect();
        if edges.is_empty() {
            return None;
        }

        let mut dist: BTreeMap<NodeId, f64> = BTreeMap::from([(source, 0.0)]);
        let mut pred: BTreeMap<NodeId, NodeId> = BTreeMap::new();

        let relax = |dist: &mut BTreeMap<NodeId, f64>,
                     pred: &mut BTreeMap<NodeId, NodeId>,
                     edge: &RiskEdge|
         -> bool {
            let Some(&from_dist) = dist.get(&edge.from) else {
                return false;
            };
            let candidate = from_dist + edge.risk;
            let current = dist.get(&edge.to).copied().unwrap_or(f64::INFINITY);
            if candidate < current - RELAX_EPSILON {
                dist.insert(edge.to, candidate);
                pred.insert(edge.to, edge.from);
                true
            } else {
                false
            }
        };

        for _ in 1..reachable.len() {
            let mut changed = false;
            for edge in &edges {
                changed |= relax(&mut dist, &mut pred, edge);
            }
            if !changed {
                return None;
            }
        }

        // The predecessor graph keeps changing during the extra pass, so
        // cycles are traced right after each residual relaxation.
        let mut seen: BTreeSet<Vec<NodeId>> = BTreeSet::new();
        let mut worst: Option<NegativeCycle> = None;
        for edge in &edges {
            if !relax(&mut dist, &mut pred, edge) {
                continue;
            }
            let Some(nodes) = trace_cycle(&pred, edge.to, reachable.len()) else {
                continue;
            };
            if !seen.insert(nodes.clone()) {
                continue;
            }
            let Some(cycle) = materialize(graph, nodes, now_ns) else {
                continue;
            };
            if cycle.cumulative_risk >= 0.0 {
                continue;
            }
            let is_worse = worst
                .as_ref()
                .map_or(true, |w| cycle.cumulative_risk < w.cumulative_risk);
            if is_worse {
                worst = Some(cycle);
            }
        }
        worst
    }
}

/// Walk predecessors back from `start` into the cycle it hangs off and return
/// the cycle's nodes in forward order, rotated to start at the smallest id.
fn trace_cycle(pred: &BTreeMap<NodeId, NodeId>, start: NodeId, n: usize) -> Option<Vec<NodeId>> {
    let mut on_cycle = start;
    for _ in 0..n {
        on_cycle = *pred.get(&on_cycle)?;
    }

    let mut backwards = vec![on_cycle];
    let mut cursor = *pred.get(&on_cycle)?;
    while cursor != on_cycle {
        if backwards.len() > n {
            return None;
        }
        backwards.push(cursor);
        cursor = *pred.get(&cursor)?;
    }
    backwards.reverse();

    let min_pos = backwards
        .iter()
        .enumerate()
        .min_by_key(|(_, node)| **node)
        .map(|(pos, _)| pos)
        .unwrap_or(0);
    backwards.rotate_left(min_pos);
    Some(backwards)
}

fn materialize(graph: &RiskGraph, nodes: Vec<NodeId>, now_ns: u64) -> Option<NegativeCycle> {
    let mut edges = Vec::with_capacity(nodes.len());
    for (i, from) in nodes.iter().enumerate() {
        let to = nodes[(i + 1) % nodes.len()];
        edges.push(*graph.lookup_edge(*from, to, now_ns)?);
    }
    let cumulative_risk = edges.iter().map(|e| e.risk).sum();
    Some(NegativeCycle {
        nodes,
        edges,
        cumulative_risk,
    })
}

/// Map a cycle's negative magnitude to [0, 1]; cycles at or beyond the
/// critical magnitude land in [0.9, 1.0].
fn cycle_score(magnitude: f64, critical: f64) -> f64 {
    let score = if magnitude >= critical {
        CRITICAL_SCORE + (1.0 - CRITICAL_SCORE) * ((magnitude - critical) / critical).min(1.0)
    } else {
        CRITICAL_SCORE * magnitude / critical
    };
    score.clamp(0.0, 1.0)
}
