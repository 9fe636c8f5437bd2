//! Risk Graph Store
//!
//! Directed graph of time-bounded, revocable risk edges keyed by (from, to).
//!
//! # Liveness
//!
//! An edge is live when it is not revoked and the evaluation clock has not
//! reached its expiration. Expiration is only ever applied as a query-time
//! filter; nothing is compacted in the background, so every algorithm run in a
//! single call observes one consistent live view.
//!
//! # Tombstones
//!
//! Revocation never erases a record. The tombstone keeps the insertion nonce
//! and every nonce consumed by a successful Proof-of-Path verification, because
//! replay detection must still consult that history.

use qvl_core::{NodeId, QvlError, Result, RiskEdge};
use std::collections::btree_map::Range;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, warn};

/// Stored state for one (from, to) pair
#[derive(Debug, Clone)]
pub struct EdgeRecord {
    edge: RiskEdge,
    revoked_at_ns: Option<u64>,
    consumed_nonces: BTreeSet<u64>,
}

impl EdgeRecord {
    fn new(edge: RiskEdge) -> Self {
        Self {
            edge,
            revoked_at_ns: None,
            consumed_nonces: BTreeSet::new(),
        }
    }

    /// Most recently inserted edge for this pair
    pub fn edge(&self) -> &RiskEdge {
        &self.edge
    }

    /// Nonce recorded at the most recent insertion
    pub fn insert_nonce(&self) -> u64 {
        self.edge.nonce
    }

    pub fn revoked_at_ns(&self) -> Option<u64> {
        self.revoked_at_ns
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at_ns.is_some()
    }

    pub fn is_live_at(&self, now_ns: u64) -> bool {
        !self.is_revoked() && !self.edge.is_expired_at(now_ns)
    }

    /// Whether a prior successful verification already used this nonce
    pub fn is_consumed(&self, nonce: u64) -> bool {
        self.consumed_nonces.contains(&nonce)
    }
}

/// Lazy sequence of live outgoing edges of one node.
///
/// Cheap to clone; each call to [`RiskGraph::neighbors`] starts a fresh walk
/// over the current state.
#[derive(Clone)]
pub struct Neighbors<'a> {
    range: Range<'a, (NodeId, NodeId), EdgeRecord>,
    now_ns: u64,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = &'a RiskEdge;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let (_, record) = self.range.next()?;
            if record.is_live_at(self.now_ns) {
                return Some(&record.edge);
            }
        }
    }
}

/// Directed risk graph
#[derive(Debug, Default)]
pub struct RiskGraph {
    /// Records keyed by (from, to); ordered so outgoing edges form a contiguous range
    records: BTreeMap<(NodeId, NodeId), EdgeRecord>,
    /// Reverse index: target -> sources with a record
    incoming: BTreeMap<NodeId, BTreeSet<NodeId>>,
}

impl RiskGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an edge or atomically replace the record for its (from, to) pair.
    ///
    /// Validation happens before any state is touched, so a malformed edge
    /// leaves the graph unchanged. Replacing a tombstone revives the pair with
    /// the new insertion nonce; consumed nonces are kept.
    pub fn add_edge(&mut self, edge: RiskEdge) -> Result<()> {
        if let Err(e) = edge.validate() {
            warn!(from = edge.from, to = edge.to, error = %e, "rejected malformed edge");
            return Err(e);
        }

        match self.records.get_mut(&(edge.from, edge.to)) {
            Some(record) => {
                record.edge = edge;
                record.revoked_at_ns = None;
                debug!(from = edge.from, to = edge.to, nonce = edge.nonce, "replaced edge");
            }
            None => {
                self.records.insert((edge.from, edge.to), EdgeRecord::new(edge));
                self.incoming.entry(edge.to).or_default().insert(edge.from);
                debug!(from = edge.from, to = edge.to, nonce = edge.nonce, "inserted edge");
            }
        }
        Ok(())
    }

    /// Tombstone the live edge for (from, to).
    ///
    /// Fails with `EdgeNotFound` when there is no live edge: it never existed,
    /// was already revoked, or has expired.
    pub fn revoke_edge(&mut self, from: NodeId, to: NodeId, now_ns: u64) -> Result<RiskEdge> {
        match self.records.get_mut(&(from, to)) {
            Some(record) if record.is_live_at(now_ns) => {
                record.revoked_at_ns = Some(now_ns);
                debug!(from, to, revoked_at_ns = now_ns, "revoked edge");
                Ok(record.edge)
            }
            _ => Err(QvlError::EdgeNotFound { from, to }),
        }
    }

    /// The edge for (from, to) if it is live at `now_ns`.
    pub fn lookup_edge(&self, from: NodeId, to: NodeId, now_ns: u64) -> Option<&RiskEdge> {
        self.records
            .get(&(from, to))
            .filter(|record| record.is_live_at(now_ns))
            .map(|record| &record.edge)
    }

    /// Any record ever inserted for (from, to), live or tombstoned.
    pub fn record(&self, from: NodeId, to: NodeId) -> Option<&EdgeRecord> {
        self.records.get(&(from, to))
    }

    /// Live outgoing edges of `node`, in ascending target order.
    pub fn neighbors(&self, node: NodeId, now_ns: u64) -> Neighbors<'_> {
        Neighbors {
            range: self.records.range((node, NodeId::MIN)..=(node, NodeId::MAX)),
            now_ns,
        }
    }

    /// Every outgoing record of `node`, regardless of liveness.
    pub fn all_outgoing(&self, node: NodeId) -> impl Iterator<Item = &EdgeRecord> + '_ {
        self.records
            .range((node, NodeId::MIN)..=(node, NodeId::MAX))
            .map(|(_, record)| record)
    }

    /// Live incoming edges of `node`, in ascending source order.
    pub fn incoming(&self, node: NodeId, now_ns: u64) -> impl Iterator<Item = &RiskEdge> + '_ {
        self.incoming
            .get(&node)
            .into_iter()
            .flatten()
            .filter_map(move |from| self.lookup_edge(*from, node, now_ns))
    }

    /// Nodes reachable from `source` over live edges, including `source` itself.
    pub fn reachable_from(&self, source: NodeId, now_ns: u64) -> BTreeSet<NodeId> {
        self.bfs(source, |node| {
            self.neighbors(node, now_ns).map(|e| e.to).collect()
        })
    }

    /// Nodes reachable from `source` over every record ever inserted,
    /// including `source` itself.
    pub fn historically_reachable_from(&self, source: NodeId) -> BTreeSet<NodeId> {
        self.bfs(source, |node| {
            self.all_outgoing(node).map(|r| r.edge.to).collect()
        })
    }

    fn bfs<F>(&self, source: NodeId, successors: F) -> BTreeSet<NodeId>
    where
        F: Fn(NodeId) -> Vec<NodeId>,
    {
        let mut seen = BTreeSet::from([source]);
        let mut queue = VecDeque::from([source]);
        while let Some(node) = queue.pop_front() {
            for next in successors(node) {
                if seen.insert(next) {
                    queue.push_back(next);
                }
            }
        }
        seen
    }

    /// Record a nonce as consumed on the (from, to) record. Returns false when
    /// there is no record or the nonce was already consumed.
    pub(crate) fn consume_nonce(&mut self, from: NodeId, to: NodeId, nonce: u64) -> bool {
        self.records
            .get_mut(&(from, to))
            .map(|record| record.consumed_nonces.insert(nonce))
            .unwrap_or(false)
    }

    /// Number of records, live or tombstoned
    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    /// Number of edges live at `now_ns`
    pub fn live_edge_count(&self, now_ns: u64) -> usize {
        self.records
            .values()
            .filter(|record| record.is_live_at(now_ns))
            .count()
    }
}
