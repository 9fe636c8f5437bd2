//! Identity registry
//!
//! Bidirectional mapping between 32-byte agent identities and the compact
//! numeric node ids used by the risk graph.

use qvl_core::{Identity, NodeId, QvlError, Result};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Derive the preferred node id for an identity.
///
/// First four bytes (little-endian) of the BLAKE3 digest, so the same identity
/// prefers the same id in every context.
pub fn derive_node_id(identity: &Identity) -> NodeId {
    let digest = blake3::hash(identity.as_bytes());
    let bytes = digest.as_bytes();
    NodeId::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

/// Registry of known identities
#[derive(Debug, Default)]
pub struct IdentityRegistry {
    by_identity: HashMap<Identity, NodeId>,
    by_node: HashMap<NodeId, Identity>,
}

impl IdentityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an identity to its node id, assigning one on first sight.
    ///
    /// Ids are derived from the identity hash; if the derived id already
    /// belongs to another identity the next free id is taken. Once assigned,
    /// an identity keeps its id for the life of the registry.
    pub fn resolve(&mut self, identity: &Identity) -> Result<NodeId> {
        if let Some(node) = self.by_identity.get(identity) {
            return Ok(*node);
        }

        let preferred = derive_node_id(identity);
        let mut candidate = preferred;
        let mut probes: u64 = 0;
        while self.by_node.contains_key(&candidate) {
            probes += 1;
            if probes > u64::from(NodeId::MAX) {
                return Err(QvlError::NodeSpaceExhausted);
            }
            candidate = candidate.wrapping_add(1);
        }

        if candidate != preferred {
            warn!(
                identity = %identity,
                preferred,
                assigned = candidate,
                "node id collision, probed to next free id"
            );
        }

        self.by_identity.insert(*identity, candidate);
        self.by_node.insert(candidate, *identity);
        debug!(identity = %identity, node = candidate, "registered identity");
        Ok(candidate)
    }

    /// Resolve an untrusted identity buffer, rejecting anything but 32 bytes.
    pub fn resolve_bytes(&mut self, bytes: &[u8]) -> Result<NodeId> {
        let identity = Identity::from_slice(bytes)?;
        self.resolve(&identity)
    }

    /// Look up an identity without registering it.
    pub fn lookup(&self, identity: &Identity) -> Option<NodeId> {
        self.by_identity.get(identity).copied()
    }

    /// Look up an untrusted identity buffer without registering it.
    pub fn lookup_bytes(&self, bytes: &[u8]) -> Result<Option<NodeId>> {
        let identity = Identity::from_slice(bytes)?;
        Ok(self.lookup(&identity))
    }

    /// Reverse lookup from node id to identity.
    pub fn identity_of(&self, node: NodeId) -> Option<&Identity> {
        self.by_node.get(&node)
    }

    pub fn len(&self) -> usize {
        self.by_identity.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_identity.is_empty()
    }
}
