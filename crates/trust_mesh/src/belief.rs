//! Belief propagation consistency check.
//!
//! Each reachable node holds a belief in [0, 1] that it is trustworthy. The
//! source is pinned at 1.0; every other node starts at 0.5. In each
//! synchronous round a node's belief becomes the level-weighted mean of the
//! messages on its live incoming edges:
//!
//! ```text
//! t = (1 + risk) / 2
//! m = b_from · t + (1 − b_from) · (1 − t)
//! ```
//!
//! A trusted sender's endorsement is taken at face value, a distrusted
//! sender's is inverted.
//!
//! Running out of rounds is not by itself an anomaly. Rings of mutual
//! endorsement approach their fixed point monotonically, but slowly when every
//! endorsement is close to full trust. Only beliefs that still reverse
//! direction in the second half of the run count as divergence: that happens
//! when a loop mixes endorsement with distrust and the messages keep
//! contradicting each other.

use crate::graph::RiskGraph;
use qvl_core::NodeId;
use std::collections::{BTreeMap, BTreeSet};

/// Result of one belief propagation run
#[derive(Debug, Clone, PartialEq)]
pub enum BeliefOutcome {
    /// Max per-round delta fell to or below the tolerance
    Converged {
        iterations: usize,
        beliefs: BTreeMap<NodeId, f64>,
    },
    /// Iteration bound reached while every belief was still moving
    /// monotonically toward its fixed point
    Settling {
        iterations: usize,
        residual: f64,
        beliefs: BTreeMap<NodeId, f64>,
    },
    /// Iteration bound reached while beliefs kept reversing direction
    Diverged {
        /// Node with the largest delta in the final round
        node: NodeId,
        first_residual: f64,
        final_residual: f64,
        iterations: usize,
    },
}

/// Bounded-iteration belief propagation
#[derive(Debug, Clone)]
pub struct BeliefPropagation {
    max_iterations: usize,
    tolerance: f64,
}

struct Message {
    from: NodeId,
    truth: f64,
    weight: f64,
}

impl BeliefPropagation {
    pub fn new(max_iterations: usize, tolerance: f64) -> Self {
        Self {
            max_iterations,
            tolerance,
        }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Run over the live subgraph induced by `reachable`.
    pub fn run(
        &self,
        graph: &RiskGraph,
        source: NodeId,
        reachable: &BTreeSet<NodeId>,
        now_ns: u64,
    ) -> BeliefOutcome {
        let inbound: BTreeMap<NodeId, Vec<Message>> = reachable
            .iter()
            .filter(|node| **node != source)
            .map(|node| {
                let messages = graph
                    .incoming(*node, now_ns)
                    .filter(|edge| reachable.contains(&edge.from))
                    .map(|edge| Message {
                        from: edge.from,
                        truth: (1.0 + edge.risk) / 2.0,
                        weight: edge.level_weight(),
                    })
                    .collect();
                (*node, messages)
            })
            .collect();

        let mut beliefs: BTreeMap<NodeId, f64> = reachable
            .iter()
            .map(|node| (*node, if *node == source { 1.0 } else { 0.5 }))
            .collect();

        let mut first_residual = None;
        let mut final_residual = 0.0;
        let mut worst = source;
        // Sign of each node's last move larger than the tolerance
        let mut direction: BTreeMap<NodeId, f64> = BTreeMap::new();
        let mut reversed_late = false;
        let late_from = self.max_iterations / 2;

        for iteration in 1..=self.max_iterations {
            let mut next = beliefs.clone();
            let mut residual = 0.0;

            for (node, messages) in &inbound {
                let (numerator, denominator) =
                    messages.iter().fold((0.0, 0.0), |(num, den), msg| {
                        let b = beliefs.get(&msg.from).copied().unwrap_or(0.5);
                        let m = b * msg.truth + (1.0 - b) * (1.0 - msg.truth);
                        (num + msg.weight * m, den + msg.weight)
                    });
                if denominator <= 0.0 {
                    continue;
                }
                let updated = numerator / denominator;
                let change = updated - beliefs[node];
                let delta = change.abs();
                if delta > residual {
                    residual = delta;
                    worst = *node;
                }
                if delta > self.tolerance {
                    let sign = change.signum();
                    if let Some(previous) = direction.insert(*node, sign) {
                        if previous != sign && iteration > late_from {
                            reversed_late = true;
                        }
                    }
                }
                next.insert(*node, updated);
            }

            beliefs = next;
            first_residual.get_or_insert(residual);
            final_residual = residual;

            if residual <= self.tolerance {
                return BeliefOutcome::Converged {
                    iterations: iteration,
                    beliefs,
                };
            }
        }

        if !reversed_late {
            return BeliefOutcome::Settling {
                iterations: self.max_iterations,
                residual: final_residual,
                beliefs,
            };
        }

        BeliefOutcome::Diverged {
            node: worst,
            first_residual: first_residual.unwrap_or(final_residual),
            final_residual,
            iterations: self.max_iterations,
        }
    }
}

/// Normalized residual of a diverged run, on a log scale relative to the
/// tolerance: 1.0 when nothing settled at all, approaching 0.0 as the run got
/// close to converging.
pub fn divergence_score(first_residual: f64, final_residual: f64, tolerance: f64) -> f64 {
    if final_residual <= tolerance {
        return 0.0;
    }
    let span = (first_residual / tolerance).ln();
    if span <= 0.0 || final_residual >= first_residual {
        return 1.0;
    }
    ((final_residual / tolerance).ln() / span).clamp(0.0, 1.0)
}
