//! Property tests for the automaton algebra.
//!
//! Random small machines over {a, b, c} are compared against brute-force
//! word enumeration: the NFA membership test `accepts` serves as the oracle
//! for every derived operation.

use armc_automata::{Guard, Machine, Move, Sfa};
use armc_algebra::{AlgebraRegistry, Predicate, Symbol};
use proptest::prelude::*;
use std::collections::BTreeMap;

const SYMS: [&str; 3] = ["a", "b", "c"];

fn build(
    n_states: usize,
    finals_mask: u8,
    moves: &[(usize, usize, u8)],
) -> Option<Sfa> {
    let algebra = AlgebraRegistry::new().algebra(SYMS.map(Symbol::new));
    let finals = (0..n_states).filter(|i| finals_mask & (1 << i) != 0);
    let moves: Vec<Move<Guard>> = moves
        .iter()
        .map(|&(src, tgt, mask)| {
            let set = SYMS
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| Symbol::new(s));
            Move::new(
                src % n_states,
                Guard::Pred(Predicate::of(set)),
                tgt % n_states,
            )
        })
        .collect();
    Machine::new(algebra, 0, finals, moves, None, BTreeMap::new()).ok()
}

prop_compose! {
    fn arb_sfa()(
        n_states in 1usize..4,
        finals_mask in 0u8..16,
        moves in proptest::collection::vec((0usize..4, 0usize..4, 1u8..8), 0..7),
    ) -> Sfa {
        build(n_states, finals_mask, &moves).expect("construction from in-alphabet parts")
    }
}

/// All words over {a, b, c} of length at most `max_len`.
fn words(max_len: usize) -> Vec<Vec<Symbol>> {
    let mut all: Vec<Vec<Symbol>> = vec![vec![]];
    let mut frontier = all.clone();
    for _ in 0..max_len {
        let mut next = Vec::new();
        for w in &frontier {
            for s in SYMS {
                let mut w2 = w.clone();
                w2.push(Symbol::new(s));
                next.push(w2);
            }
        }
        all.extend(next.iter().cloned());
        frontier = next;
    }
    all
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn product_accepts_intersection(a in arb_sfa(), b in arb_sfa()) {
        let p = a.product(&b).unwrap();
        for w in words(3) {
            prop_assert_eq!(p.accepts(&w), a.accepts(&w) && b.accepts(&w));
        }
    }

    #[test]
    fn sum_accepts_union(a in arb_sfa(), b in arb_sfa()) {
        let s = a.sum(&b).unwrap();
        for w in words(3) {
            prop_assert_eq!(s.accepts(&w), a.accepts(&w) || b.accepts(&w));
        }
    }

    #[test]
    fn complement_flips_membership(a in arb_sfa()) {
        let c = a.complement().unwrap();
        for w in words(3) {
            prop_assert_eq!(c.accepts(&w), !a.accepts(&w));
        }
    }

    #[test]
    fn difference_subtracts(a in arb_sfa(), b in arb_sfa()) {
        let d = a.difference(&b).unwrap();
        for w in words(3) {
            prop_assert_eq!(d.accepts(&w), a.accepts(&w) && !b.accepts(&w));
        }
    }

    #[test]
    fn determinize_preserves_language(a in arb_sfa()) {
        let d = a.determinize().unwrap();
        for w in words(3) {
            prop_assert_eq!(d.accepts(&w), a.accepts(&w));
        }
    }

    #[test]
    fn minimize_preserves_language_with_fewer_states(a in arb_sfa()) {
        let d = a.determinize().unwrap();
        let m = a.minimize().unwrap();
        prop_assert!(m.state_count() <= d.state_count() + 1);
        for w in words(3) {
            prop_assert_eq!(m.accepts(&w), a.accepts(&w));
        }
    }

    #[test]
    fn normalize_preserves_language_and_is_idempotent(a in arb_sfa()) {
        let n = a.normalize(5);
        for w in words(3) {
            prop_assert_eq!(n.accepts(&w), a.accepts(&w));
        }
        let again = n.normalize(5);
        prop_assert_eq!(again.states(), n.states());
        prop_assert_eq!(again.initial(), n.initial());
        prop_assert_eq!(
            again.moves().cloned().collect::<Vec<_>>(),
            n.moves().cloned().collect::<Vec<_>>()
        );
    }

    #[test]
    fn reverse_accepts_mirror_words(a in arb_sfa()) {
        let r = a.reverse().unwrap();
        for w in words(3) {
            let mut m = w.clone();
            m.reverse();
            prop_assert_eq!(r.accepts(&m), a.accepts(&w));
        }
    }

    #[test]
    fn bounded_language_cuts_at_length(a in arb_sfa()) {
        let b = a.bounded_language(2).unwrap();
        for w in words(3) {
            prop_assert_eq!(b.accepts(&w), a.accepts(&w) && w.len() <= 2);
        }
    }

    #[test]
    fn prefix_language_is_prefix_closure(a in arb_sfa()) {
        let p = a.prefix_language().unwrap();
        let extensions = words(4);
        for w in words(2) {
            let expected = extensions.iter().any(|ext| {
                let mut full = w.clone();
                full.extend(ext.iter().cloned());
                a.accepts(&full)
            });
            prop_assert_eq!(p.accepts(&w), expected);
        }
    }

    #[test]
    fn collapse_only_adds_words(a in arb_sfa()) {
        // merging by finality is an arbitrary coarse equivalence
        let c = a
            .collapse(|m, x, y| Ok(m.is_final(x) == m.is_final(y)))
            .unwrap();
        for w in words(3) {
            if a.accepts(&w) {
                prop_assert!(c.accepts(&w));
            }
        }
    }

    #[test]
    fn equivalence_agrees_with_enumeration(a in arb_sfa(), b in arb_sfa()) {
        // equivalence implies agreement on all short words
        if a.equivalent(&b).unwrap() {
            for w in words(3) {
                prop_assert_eq!(a.accepts(&w), b.accepts(&w));
            }
        }
    }
}
