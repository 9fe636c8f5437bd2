//! Trust context: one exclusively owned registry, graph and clock.
//!
//! Every operation of the substrate goes through a [`TrustContext`]. The
//! context has no internal synchronization; callers serialize access to it.
//! Independent contexts share nothing and may live on different threads.

use crate::betrayal::{AnomalyScore, BetrayalDetector, BetrayalEvidence};
use crate::graph::{Neighbors, RiskGraph};
use crate::proof::{PathVerifier, PopVerdict};
use crate::slashing::{severity_from_score, slash_reason, SlashSignal};
use crate::trust::{ReputationAggregator, ReputationRecord, TrustScorer};
use qvl_core::{EvaluationClock, Identity, NodeId, QvlConfig, QvlError, Result, RiskEdge};
use qvl_identity::IdentityRegistry;
use tracing::{debug, info, warn};

/// QVL trust context
#[derive(Debug)]
pub struct TrustContext {
    config: QvlConfig,
    registry: IdentityRegistry,
    graph: RiskGraph,
    clock: EvaluationClock,
    scorer: TrustScorer,
    detector: BetrayalDetector,
    verifier: PathVerifier,
    slash_nonce: u64,
}

impl Default for TrustContext {
    fn default() -> Self {
        Self::build(QvlConfig::default())
    }
}

impl TrustContext {
    /// Create a context with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context with a validated configuration.
    pub fn with_config(config: QvlConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: QvlConfig) -> Self {
        info!(clock = ?config.clock.mode, max_hops = config.proof.max_hops, "trust context created");
        Self {
            registry: IdentityRegistry::new(),
            graph: RiskGraph::new(),
            clock: EvaluationClock::new(config.clock.mode),
            scorer: TrustScorer::new(ReputationAggregator::new(config.reputation.clone())),
            detector: BetrayalDetector::new(config.betrayal.clone()),
            verifier: PathVerifier::new(config.proof.max_hops),
            slash_nonce: 0,
            config,
        }
    }

    pub fn config(&self) -> &QvlConfig {
        &self.config
    }

    pub fn graph(&self) -> &RiskGraph {
        &self.graph
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    // ------------------------------------------------------------------
    // Identities
    // ------------------------------------------------------------------

    /// Resolve an identity buffer to its node id, registering it on first sight.
    pub fn register_node(&mut self, identity: &[u8]) -> Result<NodeId> {
        self.registry.resolve_bytes(identity)
    }

    pub fn register_identity(&mut self, identity: &Identity) -> Result<NodeId> {
        self.registry.resolve(identity)
    }

    pub fn identity_of(&self, node: NodeId) -> Option<&Identity> {
        self.registry.identity_of(node)
    }

    // ------------------------------------------------------------------
    // Graph
    // ------------------------------------------------------------------

    /// Insert or replace an edge. The logical clock follows ingested timestamps.
    pub fn add_edge(&mut self, edge: RiskEdge) -> Result<()> {
        self.graph.add_edge(edge)?;
        self.clock.observe(edge.timestamp_ns);
        Ok(())
    }

    pub fn revoke_edge(&mut self, from: NodeId, to: NodeId) -> Result<RiskEdge> {
        let now = self.clock.now_ns();
        self.graph.revoke_edge(from, to, now)
    }

    pub fn lookup_edge(&self, from: NodeId, to: NodeId) -> Option<&RiskEdge> {
        self.graph.lookup_edge(from, to, self.clock.now_ns())
    }

    pub fn neighbors(&self, node: NodeId) -> Neighbors<'_> {
        self.graph.neighbors(node, self.clock.now_ns())
    }

    // ------------------------------------------------------------------
    // Scoring
    // ------------------------------------------------------------------

    pub fn reputation(&self, node: NodeId) -> f64 {
        self.reputation_record(node).score
    }

    pub fn reputation_record(&self, node: NodeId) -> ReputationRecord {
        self.scorer
            .aggregator()
            .aggregate(&self.graph, node, self.clock.now_ns())
    }

    pub fn trust_score(&self, identity: &[u8]) -> Result<f64> {
        self.scorer
            .trust_score(&self.registry, &self.graph, identity, self.clock.now_ns())
    }

    // ------------------------------------------------------------------
    // Betrayal
    // ------------------------------------------------------------------

    pub fn detect_betrayal(&self, source: NodeId) -> AnomalyScore {
        self.detector.detect(&self.graph, source, self.clock.now_ns())
    }

    pub fn betrayal_evidence(&self, node: NodeId) -> Result<BetrayalEvidence> {
        self.detector
            .evidence(&self.graph, node, self.clock.now_ns())
            .ok_or(QvlError::NoEvidence(node))
    }

    /// Build a slash signal against `target`.
    ///
    /// Severity follows the target's current anomaly score; an identity the
    /// registry has never seen gets severity 0.
    pub fn issue_slash_signal(
        &mut self,
        target: &[u8],
        reason: u8,
        evidence_hash: [u8; 32],
    ) -> Result<SlashSignal> {
        let target = Identity::from_slice(target)?;
        let reason = slash_reason(reason)?;

        let severity = match self.registry.lookup(&target) {
            Some(node) => severity_from_score(self.detect_betrayal(node).score),
            None => 0,
        };
        let nonce = self.slash_nonce;
        let signal = SlashSignal::new(
            target,
            reason,
            evidence_hash,
            self.clock.now_ns(),
            severity,
            nonce,
        )?;
        self.slash_nonce += 1;

        warn!(
            target = %target,
            ?reason,
            severity,
            nonce,
            evidence = %hex::encode(&evidence_hash[..8]),
            "slash signal issued"
        );
        Ok(signal)
    }

    // ------------------------------------------------------------------
    // Proof-of-Path
    // ------------------------------------------------------------------

    /// Verify a proof, spending its nonces when valid.
    pub fn verify_pop(
        &mut self,
        proof_bytes: &[u8],
        sender: &Identity,
        receiver: &Identity,
    ) -> PopVerdict {
        let now = self.clock.now_ns();
        self.verifier
            .verify(&mut self.graph, &self.registry, proof_bytes, sender, receiver, now)
    }

    /// Judge a proof without spending anything.
    pub fn evaluate_pop(&self, proof_bytes: &[u8], sender: &Identity, receiver: &Identity) -> PopVerdict {
        self.verifier.evaluate(
            &self.graph,
            &self.registry,
            proof_bytes,
            sender,
            receiver,
            self.clock.now_ns(),
        )
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    pub fn now_ns(&self) -> u64 {
        self.clock.now_ns()
    }

    /// Move the logical evaluation clock forward; earlier values are ignored.
    pub fn advance_clock(&mut self, now_ns: u64) -> u64 {
        let now = self.clock.advance_to(now_ns);
        debug!(requested = now_ns, now, "evaluation clock advanced");
        now
    }
}
