//! Property checks over scoring, the clock, the registry and configuration

use crate::test_utils::{risk_edge, TestAgent, FAR_FUTURE_NS};
use proptest::prelude::*;
use qvl_core::{EvaluationClock, Identity, QvlConfig, RiskEdge, NEUTRAL_SCORE};
use qvl_identity::{derive_node_id, IdentityRegistry};
use qvl_trust_mesh::{AnomalyReason, TrustContext};

proptest! {
    #[test]
    fn reputation_stays_in_unit_interval(risks in prop::collection::vec(-1.0f64..=1.0, 0..20)) {
        let mut ctx = TrustContext::new();
        for (i, risk) in risks.iter().enumerate() {
            ctx.add_edge(risk_edge(i as u32 + 1, 0, *risk, 0)).unwrap();
        }
        let score = ctx.reputation(0);
        prop_assert!((0.0..=1.0).contains(&score));
        if risks.is_empty() {
            prop_assert_eq!(score, NEUTRAL_SCORE);
        }
    }

    #[test]
    fn higher_endorsement_never_lowers_reputation(
        base in -1.0f64..=1.0,
        bump in 0.0f64..=1.0,
        others in prop::collection::vec(-1.0f64..=1.0, 0..8),
    ) {
        let build = |risk: f64| {
            let mut ctx = TrustContext::new();
            for (i, other) in others.iter().enumerate() {
                ctx.add_edge(risk_edge(i as u32 + 2, 0, *other, 0)).unwrap();
            }
            ctx.add_edge(risk_edge(1, 0, risk, 0)).unwrap();
            ctx.reputation(0)
        };
        let raised = (base + bump).min(1.0);
        prop_assert!(build(raised) >= build(base) - 1e-12);
    }

    #[test]
    fn wrong_length_identity_scores_minus_one(len in 0usize..96) {
        prop_assume!(len != 32);
        let ctx = TrustContext::new();
        let bytes = vec![0x5Au8; len];
        prop_assert!(ctx.trust_score(&bytes).is_err());

        let handle = qvl::qvl_init();
        let score = unsafe { qvl::qvl_get_trust_score(handle, bytes.as_ptr(), len) };
        qvl::qvl_deinit(handle);
        prop_assert_eq!(score, -1.0);
    }

    #[test]
    fn clock_never_moves_backwards(steps in prop::collection::vec(any::<u64>(), 1..32)) {
        let mut clock = EvaluationClock::default();
        let mut previous = clock.now_ns();
        for step in steps {
            let now = clock.advance_to(step);
            prop_assert!(now >= previous);
            prop_assert_eq!(now, previous.max(step));
            previous = now;
        }
    }

    #[test]
    fn ingestion_order_does_not_rewind_clock(stamps in prop::collection::vec(0u64..1_000_000, 1..16)) {
        let mut ctx = TrustContext::new();
        let mut high = 0;
        for (i, ts) in stamps.iter().enumerate() {
            let edge = RiskEdge {
                timestamp_ns: *ts,
                expires_at_ns: FAR_FUTURE_NS,
                ..risk_edge(i as u32, i as u32 + 1, 0.5, 0)
            };
            ctx.add_edge(edge).unwrap();
            high = high.max(*ts);
            prop_assert_eq!(ctx.now_ns(), high);
        }
    }

    #[test]
    fn registry_is_deterministic_across_contexts(seeds in prop::collection::vec(any::<[u8; 32]>(), 1..16)) {
        let mut first = TrustContext::new();
        let mut second = TrustContext::new();
        for did in seeds.iter().rev() {
            second.register_node(did).unwrap();
        }
        for did in &seeds {
            let a = first.register_node(did).unwrap();
            let b = second.register_node(did).unwrap();
            prop_assert_eq!(a, b);
            prop_assert_eq!(first.register_node(did).unwrap(), a);
        }
    }

    #[test]
    fn first_identity_takes_its_derived_id(did in any::<[u8; 32]>()) {
        let identity = Identity::new(did);
        let mut registry = IdentityRegistry::new();
        prop_assert_eq!(registry.lookup(&identity), None);
        let node = registry.resolve(&identity).unwrap();
        prop_assert_eq!(node, derive_node_id(&identity));
        prop_assert_eq!(registry.identity_of(node), Some(&identity));
    }

    #[test]
    fn positive_chains_are_never_flagged(risks in prop::collection::vec(0.0f64..=1.0, 1..12)) {
        let mut ctx = TrustContext::new();
        for (i, risk) in risks.iter().enumerate() {
            ctx.add_edge(risk_edge(i as u32, i as u32 + 1, *risk, 0)).unwrap();
        }
        let anomaly = ctx.detect_betrayal(0);
        prop_assert_eq!(anomaly.reason, AnomalyReason::None);
        prop_assert_eq!(anomaly.score, 0.0);
    }
}

#[test]
fn test_config_file_drives_context() {
    let path = std::env::temp_dir().join(format!("qvl-config-{}.toml", std::process::id()));
    std::fs::write(
        &path,
        "[reputation]\nprior_weight = 2.0\n\n[proof]\nmax_hops = 3\n",
    )
    .unwrap();

    let config = QvlConfig::from_file(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert_eq!(config.proof.max_hops, 3);
    assert_eq!(config.reputation.prior_weight, 2.0);

    let mut ctx = TrustContext::with_config(config).unwrap();
    let a = TestAgent::named(&mut ctx, "alpha");
    let b = TestAgent::named(&mut ctx, "bravo");
    ctx.add_edge(risk_edge(a.node, b.node, 1.0, 0)).unwrap();

    // x = 1 / (2 + 1)
    let expected = (1.0 + 1.0 / 3.0) / 2.0;
    assert!((ctx.reputation(b.node) - expected).abs() < 1e-9);
}

#[test]
fn test_invalid_config_file_is_rejected() {
    let path = std::env::temp_dir().join(format!("qvl-bad-config-{}.toml", std::process::id()));
    std::fs::write(&path, "[betrayal]\nmin_coverage = 4.0\n").unwrap();

    let result = QvlConfig::from_file(&path);
    std::fs::remove_file(&path).unwrap();
    assert!(result.is_err());
}
