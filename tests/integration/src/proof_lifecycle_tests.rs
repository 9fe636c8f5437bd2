//! Proof-of-Path lifecycle across registry, graph and verifier
//!
//! A message travels A -> B -> C. The same proof is checked as the graph
//! changes underneath it: revocation, replacement, re-insertion and replay.

use crate::test_utils::{encode_path, init_test_logging, risk_edge, TestAgent};
use qvl_core::QvlConfig;
use qvl_trust_mesh::{Hop, PopVerdict, ProofOfPath, TrustContext};

struct Mesh {
    ctx: TrustContext,
    a: TestAgent,
    b: TestAgent,
    c: TestAgent,
}

fn mesh() -> Mesh {
    init_test_logging();
    let mut ctx = TrustContext::new();
    let a = TestAgent::named(&mut ctx, "alpha");
    let b = TestAgent::named(&mut ctx, "bravo");
    let c = TestAgent::named(&mut ctx, "charlie");
    ctx.add_edge(risk_edge(a.node, b.node, 0.8, 1)).unwrap();
    ctx.add_edge(risk_edge(b.node, c.node, 0.6, 1)).unwrap();
    Mesh { ctx, a, b, c }
}

#[test]
fn test_valid_then_revoked() {
    let mut m = mesh();
    let proof = encode_path(&m.a, &m.c, &[m.a.node, m.b.node, m.c.node], 1);

    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.c.identity), PopVerdict::Valid);

    m.ctx.revoke_edge(m.b.node, m.c.node).unwrap();
    let fresh = encode_path(&m.a, &m.c, &[m.a.node, m.b.node, m.c.node], 2);
    assert_eq!(m.ctx.verify_pop(&fresh, &m.a.identity, &m.c.identity), PopVerdict::Revoked);
}

#[test]
fn test_sender_resolving_elsewhere_is_invalid_endpoints() {
    let mut m = mesh();
    let delta = TestAgent::named(&mut m.ctx, "delta");
    let proof = encode_path(&delta, &m.c, &[m.a.node, m.b.node, m.c.node], 1);

    assert_eq!(
        m.ctx.verify_pop(&proof, &delta.identity, &m.c.identity),
        PopVerdict::InvalidEndpoints
    );
    // Nothing was spent by the rejected proof
    let honest = encode_path(&m.a, &m.c, &[m.a.node, m.b.node, m.c.node], 1);
    assert_eq!(m.ctx.verify_pop(&honest, &m.a.identity, &m.c.identity), PopVerdict::Valid);
}

#[test]
fn test_gap_is_broken_link() {
    let mut m = mesh();
    let hops = vec![
        Hop { from: m.a.node, to: m.b.node, nonce: 1 },
        Hop { from: m.c.node, to: m.c.node, nonce: 1 },
    ];
    let mut proof = ProofOfPath::new(m.a.identity, m.c.identity, hops)
        .encode()
        .unwrap();

    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.c.identity), PopVerdict::BrokenLink);

    // A continuous path over a pair that never had an edge is broken too
    m.ctx.add_edge(risk_edge(m.c.node, m.a.node, 0.1, 0)).unwrap();
    proof = encode_path(&m.c, &m.b, &[m.c.node, m.a.node, m.c.node, m.b.node], 1);
    assert_eq!(m.ctx.verify_pop(&proof, &m.c.identity, &m.b.identity), PopVerdict::BrokenLink);
}

#[test]
fn test_consumed_nonce_is_replay() {
    let mut m = mesh();
    let proof = encode_path(&m.a, &m.c, &[m.a.node, m.b.node, m.c.node], 1);

    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.c.identity), PopVerdict::Valid);
    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.c.identity), PopVerdict::Replay);

    let next = encode_path(&m.a, &m.c, &[m.a.node, m.b.node, m.c.node], 2);
    assert_eq!(m.ctx.verify_pop(&next, &m.a.identity, &m.c.identity), PopVerdict::Valid);
}

#[test]
fn test_replacement_raises_nonce_floor() {
    let mut m = mesh();
    m.ctx.add_edge(risk_edge(m.a.node, m.b.node, 0.8, 10)).unwrap();

    let stale = encode_path(&m.a, &m.c, &[m.a.node, m.b.node, m.c.node], 5);
    assert_eq!(m.ctx.verify_pop(&stale, &m.a.identity, &m.c.identity), PopVerdict::Replay);

    let current = encode_path(&m.a, &m.c, &[m.a.node, m.b.node, m.c.node], 10);
    assert_eq!(m.ctx.verify_pop(&current, &m.a.identity, &m.c.identity), PopVerdict::Valid);
}

#[test]
fn test_tombstone_remembers_spent_nonces() {
    let mut m = mesh();
    let proof = encode_path(&m.a, &m.b, &[m.a.node, m.b.node], 1);
    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.b.identity), PopVerdict::Valid);

    m.ctx.revoke_edge(m.a.node, m.b.node).unwrap();
    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.b.identity), PopVerdict::Revoked);

    m.ctx.add_edge(risk_edge(m.a.node, m.b.node, 0.8, 1)).unwrap();
    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.b.identity), PopVerdict::Replay);
}

#[test]
fn test_expiry_reads_as_revoked() {
    let mut m = mesh();
    let mut short = risk_edge(m.a.node, m.b.node, 0.8, 1);
    short.expires_at_ns = 5_000;
    m.ctx.add_edge(short).unwrap();
    m.ctx.advance_clock(5_000);

    let proof = encode_path(&m.a, &m.b, &[m.a.node, m.b.node], 1);
    assert_eq!(m.ctx.verify_pop(&proof, &m.a.identity, &m.b.identity), PopVerdict::Revoked);
}

#[test]
fn test_max_hops_comes_from_config() {
    let mut config = QvlConfig::default();
    config.proof.max_hops = 1;
    let mut ctx = TrustContext::with_config(config).unwrap();
    let a = TestAgent::named(&mut ctx, "alpha");
    let b = TestAgent::named(&mut ctx, "bravo");
    let c = TestAgent::named(&mut ctx, "charlie");
    ctx.add_edge(risk_edge(a.node, b.node, 0.8, 1)).unwrap();
    ctx.add_edge(risk_edge(b.node, c.node, 0.8, 1)).unwrap();

    let two_hops = encode_path(&a, &c, &[a.node, b.node, c.node], 1);
    assert_eq!(ctx.verify_pop(&two_hops, &a.identity, &c.identity), PopVerdict::InvalidEndpoints);

    let one_hop = encode_path(&a, &b, &[a.node, b.node], 1);
    assert_eq!(ctx.verify_pop(&one_hop, &a.identity, &b.identity), PopVerdict::Valid);
}
