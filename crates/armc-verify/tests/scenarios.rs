//! End-to-end verification scenarios over Σ = {a, b}.
//!
//! Small reachability problems driven through both abstraction strategies
//! and both computation directions.

use armc_abstraction::{
    Abstraction, AbstractionSnapshot, BoundIncrement, Direction, FiniteLengthAbstraction,
    PredicateAbstraction,
};
use armc_algebra::{Algebra, AlgebraRegistry, Label, Predicate, Symbol};
use armc_automata::{Guard, Machine, Move, Sfa, Sft};
use armc_verify::{NullSink, VerifyError, VerifyOutcome, VerifySession, VerifySettings};
use std::collections::BTreeMap;
use std::sync::Arc;

fn alg(reg: &mut AlgebraRegistry) -> Arc<Algebra> {
    reg.algebra(["a", "b"].map(Symbol::new))
}

fn word(s: &str) -> Vec<Symbol> {
    s.chars().map(|c| Symbol::new(c.to_string())).collect()
}

fn p(s: &str) -> Predicate {
    Predicate::of([s])
}

/// The single given word.
fn sfa_word(reg: &mut AlgebraRegistry, letters: &str) -> Sfa {
    let moves: Vec<Move<Guard>> = letters
        .chars()
        .enumerate()
        .map(|(i, c)| Move::new(i, Guard::Pred(p(&c.to_string())), i + 1))
        .collect();
    Machine::new(alg(reg), 0, [letters.len()], moves, None, BTreeMap::new()).unwrap()
}

/// a*
fn sfa_astar(reg: &mut AlgebraRegistry) -> Sfa {
    Machine::new(
        alg(reg),
        0,
        [0],
        [Move::new(0, Guard::Pred(p("a")), 0)],
        None,
        BTreeMap::new(),
    )
    .unwrap()
}

/// Copies every configuration unchanged.
fn tau_identity(reg: &mut AlgebraRegistry) -> Sft {
    Machine::new(
        alg(reg),
        0,
        [0],
        [Move::new(0, Label::identity(Predicate::any()), 0)],
        None,
        BTreeMap::new(),
    )
    .unwrap()
}

/// Rewrites the whole word "a" to "b".
fn tau_a_to_b(reg: &mut AlgebraRegistry) -> Sft {
    Machine::new(
        alg(reg),
        0,
        [1],
        [Move::new(0, Label::pair(Some(p("a")), Some(p("b"))), 1)],
        None,
        BTreeMap::new(),
    )
    .unwrap()
}

/// Rewrites one occurrence of "ba" to "ab", copying the rest.
fn tau_shift(reg: &mut AlgebraRegistry) -> Sft {
    Machine::new(
        alg(reg),
        0,
        [2],
        [
            Move::new(0, Label::identity(Predicate::any()), 0),
            Move::new(0, Label::pair(Some(p("b")), Some(p("a"))), 1),
            Move::new(1, Label::pair(Some(p("a")), Some(p("b"))), 2),
            Move::new(2, Label::identity(Predicate::any()), 2),
        ],
        None,
        BTreeMap::new(),
    )
    .unwrap()
}

fn predicate_abstraction(bad: &Sfa) -> PredicateAbstraction {
    PredicateAbstraction::new(Direction::Forward, None, vec![bad.clone()])
}

// ============================================================================
// S1: an initial configuration is already bad
// ============================================================================

#[test]
fn s1_initial_violation() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_astar(&mut reg);
    let bad = sfa_astar(&mut reg);
    let tau = tau_identity(&mut reg);
    let err = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings::default(),
    )
    .err()
    .expect("construction must fail");
    assert!(matches!(err, VerifyError::InitialViolation));
}

// ============================================================================
// S2: trivial hold under the identity relation
// ============================================================================

#[test]
fn s2_trivial_holds() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "b");
    let tau = tau_identity(&mut reg);
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings::default(),
    )
    .unwrap();
    let mut abs = predicate_abstraction(session.bad());
    let outcome = session.run(&mut abs, &mut NullSink).unwrap();
    match outcome {
        VerifyOutcome::Holds { loops, iterations } => {
            assert_eq!(loops, 0);
            assert_eq!(iterations, 1);
        }
        other => panic!("expected holds, got {other:?}"),
    }
}

// ============================================================================
// S3: finite-length abstraction refines once, then holds
// ============================================================================

#[test]
fn s3_finite_length_refinement_then_holds() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "aba");
    let bad = sfa_word(&mut reg, "ab");
    let tau = tau_shift(&mut reg);
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings::default(),
    )
    .unwrap();
    let mut abs =
        FiniteLengthAbstraction::new(Direction::Forward, false, 1, BoundIncrement::One, false);
    let outcome = session.run(&mut abs, &mut NullSink).unwrap();
    match outcome {
        VerifyOutcome::Holds { loops, .. } => assert_eq!(loops, 1),
        other => panic!("expected holds, got {other:?}"),
    }
    // the single refinement moved the bound from 1 to 2
    assert!(matches!(abs.snapshot(), AbstractionSnapshot::Bound(2)));
}

// ============================================================================
// S4: a real counterexample of length two
// ============================================================================

#[test]
fn s4_real_counterexample() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "b");
    let tau = tau_a_to_b(&mut reg);
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings::default(),
    )
    .unwrap();
    let mut abs = predicate_abstraction(session.bad());
    let outcome = session.run(&mut abs, &mut NullSink).unwrap();
    let VerifyOutcome::Violated { counterexample, .. } = outcome else {
        panic!("expected a violation");
    };
    assert_eq!(counterexample.len(), 2);
    // M₀ ⊇ {a}, M₁ ⊇ {b}; X₀ = {a}, X₁ = {b}
    assert!(counterexample.steps[0].reachable.accepts(&word("a")));
    assert!(counterexample.steps[1].reachable.accepts(&word("b")));
    assert!(counterexample.steps[0].witness.accepts(&word("a")));
    assert!(!counterexample.steps[0].witness.accepts(&word("b")));
    assert!(counterexample.steps[1].witness.accepts(&word("b")));
    assert!(counterexample.steps[0].abstracted.is_some());
    assert!(counterexample.steps[1].abstracted.is_none());
}

// ============================================================================
// S5: predicate abstraction refines once, then holds
// ============================================================================

#[test]
fn s5_predicate_refinement_then_holds() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "aba");
    let bad = sfa_word(&mut reg, "ab");
    let tau = tau_shift(&mut reg);
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings::default(),
    )
    .unwrap();
    let mut abs = predicate_abstraction(session.bad());
    let outcome = session.run(&mut abs, &mut NullSink).unwrap();
    match outcome {
        VerifyOutcome::Holds { loops, .. } => assert_eq!(loops, 1),
        other => panic!("expected holds, got {other:?}"),
    }
    // one predicate automaton was learnt on top of the seed
    match abs.snapshot() {
        AbstractionSnapshot::PredicateAutomata(ps) => assert_eq!(ps.len(), 2),
        other => panic!("unexpected snapshot {other:?}"),
    }
}

// ============================================================================
// S6: backward direction gives the same verdicts
// ============================================================================

#[test]
fn s6_backward_counterexample_matches_forward() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "b");
    let tau = tau_a_to_b(&mut reg);
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings {
            direction: Direction::Backward,
            timeout: None,
        },
    )
    .unwrap();
    let mut abs = predicate_abstraction(session.bad());
    let outcome = session.run(&mut abs, &mut NullSink).unwrap();
    let VerifyOutcome::Violated { counterexample, .. } = outcome else {
        panic!("expected a violation");
    };
    // same length as the forward run; the roles of a and b swap
    assert_eq!(counterexample.len(), 2);
    assert!(counterexample.steps[0].reachable.accepts(&word("b")));
    assert!(counterexample.steps[1].reachable.accepts(&word("a")));
}

#[test]
fn s6_backward_holds_matches_forward() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "b");
    let tau = tau_identity(&mut reg);
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings {
            direction: Direction::Backward,
            timeout: None,
        },
    )
    .unwrap();
    let mut abs = predicate_abstraction(session.bad());
    let outcome = session.run(&mut abs, &mut NullSink).unwrap();
    assert!(matches!(outcome, VerifyOutcome::Holds { .. }));
}

// ============================================================================
// timeout and transducer families
// ============================================================================

#[test]
fn zero_budget_times_out() {
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "b");
    let tau = tau_identity(&mut reg);
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![tau],
        VerifySettings {
            direction: Direction::Forward,
            timeout: Some(std::time::Duration::ZERO),
        },
    )
    .unwrap();
    let mut abs = predicate_abstraction(session.bad());
    let err = session.run(&mut abs, &mut NullSink).unwrap_err();
    assert!(matches!(err, VerifyError::Timeout(_)));
}

#[test]
fn union_of_transducers_drives_all_rules() {
    // keep, a ↦ b, b ↦ a: from {a} the reachable set is {a, b}, bad = {ab}
    let mut reg = AlgebraRegistry::new();
    let init = sfa_word(&mut reg, "a");
    let bad = sfa_word(&mut reg, "ab");
    let keep = tau_identity(&mut reg);
    let fwd = tau_a_to_b(&mut reg);
    let back = fwd.invert().unwrap();
    let session = VerifySession::new(
        &mut reg,
        init,
        bad,
        vec![keep, fwd, back],
        VerifySettings::default(),
    )
    .unwrap();
    let mut abs = predicate_abstraction(session.bad());
    let outcome = session.run(&mut abs, &mut NullSink).unwrap();
    assert!(matches!(outcome, VerifyOutcome::Holds { .. }));
}
