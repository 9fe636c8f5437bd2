//! Betrayal Simulation - Adversarial Rings in an Honest Mesh
//!
//! # Test Scenarios
//!
//! 1. **Betrayal ring**: three agents endorse each other negatively; the
//!    ring is flagged critical and evidence is produced
//! 2. **Slash signal**: evidence digest and anomaly score flow into the
//!    fixed-layout signal
//! 3. **Partition**: revocations cut a node off from most of its peers
//! 4. **Honest mesh**: a positive forward mesh stays clean
//! 5. **Mutual trust**: peers endorsing each other in rings stay clean

use crate::test_utils::{init_test_logging, risk_edge, TestAgent};
use qvl_core::NodeId;
use qvl_trust_mesh::{AnomalyReason, SlashSignal, TrustContext, SLASH_SIGNAL_LEN};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Honest mesh of `size` agents with random positive endorsements.
///
/// Endorsements only point forward (a chain plus random chords), so every
/// agent reaches all later agents and the honest part has no cycles.
fn honest_mesh(size: usize, seed: u64) -> (TrustContext, Vec<TestAgent>) {
    init_test_logging();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ctx = TrustContext::new();
    let agents: Vec<TestAgent> = (0..size).map(|_| TestAgent::random(&mut ctx, &mut rng)).collect();

    for i in 0..size - 1 {
        ctx.add_edge(risk_edge(agents[i].node, agents[i + 1].node, rng.gen_range(0.1..=1.0), 0))
            .unwrap();
        if i + 2 < size {
            let chord = agents[rng.gen_range(i + 2..size)].node;
            ctx.add_edge(risk_edge(agents[i].node, chord, rng.gen_range(0.0..=1.0), 0))
                .unwrap();
        }
    }
    (ctx, agents)
}

/// Ring of `size` agents endorsing both neighbours, plus two-way chords.
fn mutual_mesh(size: usize, seed: u64) -> (TrustContext, Vec<TestAgent>) {
    init_test_logging();
    let mut rng = StdRng::seed_from_u64(seed);
    let mut ctx = TrustContext::new();
    let agents: Vec<TestAgent> = (0..size).map(|_| TestAgent::random(&mut ctx, &mut rng)).collect();

    for i in 0..size {
        let next = agents[(i + 1) % size].node;
        let chord = agents[(i + size / 2) % size].node;
        for peer in [next, chord] {
            ctx.add_edge(risk_edge(agents[i].node, peer, rng.gen_range(0.9..=1.0), 0))
                .unwrap();
            ctx.add_edge(risk_edge(peer, agents[i].node, rng.gen_range(0.9..=1.0), 0))
                .unwrap();
        }
    }
    (ctx, agents)
}

fn plant_ring(ctx: &mut TrustContext, ring: &[NodeId], risk: f64) {
    for (i, from) in ring.iter().enumerate() {
        let to = ring[(i + 1) % ring.len()];
        ctx.add_edge(risk_edge(*from, to, risk, 1)).unwrap();
    }
}

#[test]
fn test_honest_mesh_is_clean() {
    let (ctx, agents) = honest_mesh(24, 7);

    for agent in agents.iter().take(5) {
        let anomaly = ctx.detect_betrayal(agent.node);
        assert_eq!(anomaly.reason, AnomalyReason::None, "agent {}", agent.node);
        assert_eq!(anomaly.score, 0.0);
    }
}

#[test]
fn test_mutual_trust_mesh_is_clean() {
    let (ctx, agents) = mutual_mesh(16, 3);

    for agent in agents.iter().take(6) {
        let anomaly = ctx.detect_betrayal(agent.node);
        assert_eq!(anomaly.reason, AnomalyReason::None, "agent {}", agent.node);
        assert_eq!(anomaly.score, 0.0);
    }
}

#[test]
fn test_betrayal_ring_in_mutual_mesh_is_still_caught() {
    let (mut ctx, agents) = mutual_mesh(16, 8);
    let ring = [agents[2].node, agents[7].node, agents[12].node];
    plant_ring(&mut ctx, &ring, -0.9);

    let anomaly = ctx.detect_betrayal(agents[2].node);
    assert_eq!(anomaly.reason, AnomalyReason::NegativeCycle);
    assert!(anomaly.is_critical());
}

#[test]
fn test_betrayal_ring_is_critical() {
    let (mut ctx, agents) = honest_mesh(24, 11);
    let ring = [agents[3].node, agents[9].node, agents[17].node];
    plant_ring(&mut ctx, &ring, -0.9);

    let anomaly = ctx.detect_betrayal(agents[3].node);
    assert_eq!(anomaly.reason, AnomalyReason::NegativeCycle);
    assert!(anomaly.is_critical());
    assert_eq!(anomaly.node, agents[3].node);

    // Detected from anywhere upstream of the ring as well
    let upstream = ctx.detect_betrayal(agents[0].node);
    assert_eq!(upstream.reason, AnomalyReason::NegativeCycle);
}

#[test]
fn test_evidence_feeds_slash_signal() {
    let (mut ctx, agents) = honest_mesh(12, 23);
    let ring = [agents[2].node, agents[5].node, agents[8].node];
    plant_ring(&mut ctx, &ring, -0.9);

    let evidence = ctx.betrayal_evidence(agents[2].node).unwrap();
    assert!(evidence.cumulative_risk <= -2.7 + 1e-9);
    assert_eq!(
        evidence.digest().unwrap(),
        ctx.betrayal_evidence(agents[2].node).unwrap().digest().unwrap()
    );

    let anomaly = ctx.detect_betrayal(agents[2].node);
    let signal = ctx
        .issue_slash_signal(agents[2].did(), anomaly.reason.code(), evidence.digest().unwrap())
        .unwrap();
    let bytes = signal.to_bytes();

    assert_eq!(bytes.len(), SLASH_SIGNAL_LEN);
    assert_eq!(&bytes[0..32], agents[2].did());
    assert_eq!(bytes[32], AnomalyReason::NegativeCycle.code());
    assert_eq!(&bytes[33..65], &evidence.digest().unwrap());
    assert_eq!(&bytes[65..73], &ctx.now_ns().to_le_bytes());
    assert_eq!(bytes[73], (anomaly.score * 255.0).round() as u8);
    assert_eq!(SlashSignal::from_bytes(&bytes).unwrap(), signal);
}

#[test]
fn test_breaking_the_ring_clears_the_finding() {
    let (mut ctx, agents) = honest_mesh(12, 5);
    let ring = [agents[1].node, agents[4].node, agents[7].node];
    plant_ring(&mut ctx, &ring, -0.9);
    assert_eq!(ctx.detect_betrayal(ring[0]).reason, AnomalyReason::NegativeCycle);

    ctx.revoke_edge(ring[2], ring[0]).unwrap();
    assert_ne!(ctx.detect_betrayal(ring[0]).reason, AnomalyReason::NegativeCycle);
    assert!(ctx.betrayal_evidence(ring[0]).is_err());
}

#[test]
fn test_partition_flags_low_coverage() {
    init_test_logging();
    let mut ctx = TrustContext::new();
    let hub = TestAgent::named(&mut ctx, "hub");
    let spokes: Vec<TestAgent> = (0..6)
        .map(|i| TestAgent::named(&mut ctx, &format!("spoke-{}", i)))
        .collect();
    for spoke in &spokes {
        ctx.add_edge(risk_edge(hub.node, spoke.node, 0.7, 0)).unwrap();
    }
    assert_eq!(ctx.detect_betrayal(hub.node).reason, AnomalyReason::None);

    for spoke in spokes.iter().take(4) {
        ctx.revoke_edge(hub.node, spoke.node).unwrap();
    }
    let anomaly = ctx.detect_betrayal(hub.node);
    assert_eq!(anomaly.reason, AnomalyReason::LowCoverage);
    assert_eq!(anomaly.node, hub.node);
    assert!((anomaly.score - 4.0 / 6.0).abs() < 1e-9);
}

#[test]
fn test_reputation_of_betrayers_drops() {
    let (mut ctx, agents) = honest_mesh(12, 99);
    let target = agents[6].node;
    let before = ctx.reputation(target);

    for accuser in agents.iter().take(4).filter(|a| a.node != target) {
        ctx.add_edge(risk_edge(accuser.node, target, -1.0, 2)).unwrap();
    }
    assert!(ctx.reputation(target) < before);
    assert!(ctx.reputation(target) < 0.5);
}
