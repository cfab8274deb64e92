//! Abstraction by languages of predicate automata.

use crate::{Abstraction, AbstractionResult, AbstractionSnapshot, Direction};
use armc_automata::{Guard, Sfa, StateId};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

/// How refinement trims a freshly added predicate automaton when it would
/// blow up the state signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefinementHeuristic {
    /// Ignore predicate states that label no state of the collapsed machine.
    ImportantStates,
    /// Look for one predicate state (then an unordered pair) that alone
    /// keeps the witness excluded; fall back to `ImportantStates`.
    KeyStates,
}

/// The signature of a machine state: which states of which predicate
/// automata share a state language with it.
type Signature = BTreeSet<(usize, StateId)>;

/// Predicate-language abstraction.
///
/// Two states of `m` are equivalent when they intersect the state languages
/// of exactly the same states of every predicate automaton. The family is
/// seeded from configuration and grows by one automaton per refinement; the
/// ignored-state set persists across refinements by union.
pub struct PredicateAbstraction {
    direction: Direction,
    heuristic: Option<RefinementHeuristic>,
    predicates: Vec<Sfa>,
    ignored: BTreeSet<(usize, StateId)>,
}

impl PredicateAbstraction {
    pub fn new(
        direction: Direction,
        heuristic: Option<RefinementHeuristic>,
        seeds: Vec<Sfa>,
    ) -> Self {
        PredicateAbstraction {
            direction,
            heuristic,
            predicates: seeds,
            ignored: BTreeSet::new(),
        }
    }

    pub fn predicate_count(&self) -> usize {
        self.predicates.len()
    }

    /// Fixed-point labelling of the states of `m` with predicate states.
    ///
    /// Work items are pairs of one `m`-state and one predicate state whose
    /// state languages intersect. Seeds pair the final states (forward) or
    /// the initial states (backward); expansion follows moves against the
    /// language direction, with satisfiable label conjunctions, and one-sided
    /// steps across ε-moves. The work-list marks visited pairs, so cycles
    /// terminate.
    fn labelling(
        &self,
        m: &Sfa,
        ignored: &BTreeSet<(usize, StateId)>,
    ) -> BTreeMap<StateId, Signature> {
        let mut visited: BTreeSet<(StateId, usize, StateId)> = BTreeSet::new();
        let mut work: VecDeque<(StateId, usize, StateId)> = VecDeque::new();

        for (idx, p) in self.predicates.iter().enumerate() {
            match self.direction {
                Direction::Forward => {
                    for &fm in m.finals() {
                        for &fp in p.finals() {
                            if visited.insert((fm, idx, fp)) {
                                work.push_back((fm, idx, fp));
                            }
                        }
                    }
                }
                Direction::Backward => {
                    let seed = (m.initial(), idx, p.initial());
                    if visited.insert(seed) {
                        work.push_back(seed);
                    }
                }
            }
        }

        while let Some((sm, idx, sp)) = work.pop_front() {
            let p = &self.predicates[idx];
            let mut candidates: Vec<(StateId, StateId)> = Vec::new();
            // orient moves against the propagation: reverse for forward
            // languages, forward for backward languages
            let m_moves = m.moves().filter(|a| match self.direction {
                Direction::Forward => a.target == sm,
                Direction::Backward => a.source == sm,
            });
            let far = |mv: &armc_automata::Move<Guard>| match self.direction {
                Direction::Forward => mv.source,
                Direction::Backward => mv.target,
            };
            for am in m_moves {
                match &am.label {
                    Guard::Epsilon => candidates.push((far(am), sp)),
                    Guard::Pred(pa) => {
                        for pm in p.moves().filter(|b| match self.direction {
                            Direction::Forward => b.target == sp,
                            Direction::Backward => b.source == sp,
                        }) {
                            match &pm.label {
                                Guard::Epsilon => {}
                                Guard::Pred(pb) => {
                                    if m.algebra().satisfiable(&pa.and(pb)) {
                                        candidates.push((far(am), far(pm)));
                                    }
                                }
                            }
                        }
                    }
                }
            }
            for pm in p.moves().filter(|b| {
                matches!(b.label, Guard::Epsilon)
                    && match self.direction {
                        Direction::Forward => b.target == sp,
                        Direction::Backward => b.source == sp,
                    }
            }) {
                candidates.push((sm, far(pm)));
            }
            for (nm, np) in candidates {
                if visited.insert((nm, idx, np)) {
                    work.push_back((nm, idx, np));
                }
            }
        }

        let mut lambda: BTreeMap<StateId, Signature> =
            m.states().iter().map(|&s| (s, Signature::new())).collect();
        for (sm, idx, sp) in visited {
            if !ignored.contains(&(idx, sp)) {
                if let Some(sig) = lambda.get_mut(&sm) {
                    sig.insert((idx, sp));
                }
            }
        }
        lambda
    }

    fn collapse_with(
        &self,
        m: &Sfa,
        ignored: &BTreeSet<(usize, StateId)>,
    ) -> AbstractionResult<Sfa> {
        let lambda = self.labelling(m, ignored);
        m.collapse(|_, a, b| Ok(lambda[&a] == lambda[&b]))
            .map_err(Into::into)
    }

    /// Predicate states of automaton `idx` that label some state of `m`.
    fn important_states(&self, m: &Sfa, idx: usize) -> BTreeSet<StateId> {
        self.labelling(m, &self.ignored)
            .values()
            .flatten()
            .filter(|(i, _)| *i == idx)
            .map(|(_, s)| *s)
            .collect()
    }

    /// Whether ignoring everything of automaton `idx` outside `keep` still
    /// excludes the witness from the collapsed machine.
    fn excludes_with_kept(
        &self,
        m: &Sfa,
        x: &Sfa,
        idx: usize,
        keep: &[StateId],
    ) -> AbstractionResult<Option<BTreeSet<(usize, StateId)>>> {
        let mut trial = self.ignored.clone();
        trial.extend(
            x.states()
                .iter()
                .filter(|s| !keep.contains(*s))
                .map(|&s| (idx, s)),
        );
        let collapsed = self.collapse_with(m, &trial)?;
        if collapsed.product_is_empty(x)? {
            Ok(Some(trial))
        } else {
            Ok(None)
        }
    }
}

impl Abstraction for PredicateAbstraction {
    fn collapse(&self, m: &Sfa) -> AbstractionResult<Sfa> {
        self.collapse_with(m, &self.ignored)
    }

    fn states_equivalent(&self, m: &Sfa, a: StateId, b: StateId) -> AbstractionResult<bool> {
        let lambda = self.labelling(m, &self.ignored);
        let empty = Signature::new();
        let sa = lambda.get(&a).unwrap_or(&empty);
        let sb = lambda.get(&b).unwrap_or(&empty);
        Ok(sa == sb)
    }

    fn refine(&mut self, m: &Sfa, x: &Sfa) -> AbstractionResult<()> {
        let idx = self.predicates.len();
        self.predicates.push(x.clone());
        debug!(predicates = self.predicates.len(), "refined abstraction");

        let Some(heuristic) = self.heuristic else {
            return Ok(());
        };
        let important = self.important_states(m, idx);

        if heuristic == RefinementHeuristic::KeyStates {
            for &k in &important {
                if let Some(trial) = self.excludes_with_kept(m, x, idx, &[k])? {
                    debug!(key = k, "key state found");
                    self.ignored = trial;
                    return Ok(());
                }
            }
            let candidates: Vec<StateId> = important.iter().copied().collect();
            for (i, &k1) in candidates.iter().enumerate() {
                for &k2 in &candidates[i + 1..] {
                    if let Some(trial) = self.excludes_with_kept(m, x, idx, &[k1, k2])? {
                        debug!(keys = ?(k1, k2), "key state pair found");
                        self.ignored = trial;
                        return Ok(());
                    }
                }
            }
        }

        // ImportantStates, and the KeyStates fallback
        self.ignored.extend(
            x.states()
                .iter()
                .filter(|s| !important.contains(*s))
                .map(|&s| (idx, s)),
        );
        Ok(())
    }

    fn snapshot(&self) -> AbstractionSnapshot {
        AbstractionSnapshot::PredicateAutomata(self.predicates.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armc_algebra::{AlgebraRegistry, Predicate, Symbol};
    use armc_automata::{Machine, Move};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn alg() -> Arc<armc_algebra::Algebra> {
        AlgebraRegistry::new().algebra(["a", "b"].map(Symbol::new))
    }

    fn word(s: &str) -> Vec<Symbol> {
        s.chars().map(|c| Symbol::new(c.to_string())).collect()
    }

    fn pred(s: &str) -> Guard {
        Guard::Pred(Predicate::of([s]))
    }

    fn sfa_word(letters: &str) -> Sfa {
        let moves: Vec<Move<Guard>> = letters
            .chars()
            .enumerate()
            .map(|(i, c)| Move::new(i, pred(&c.to_string()), i + 1))
            .collect();
        Machine::new(alg(), 0, [letters.len()], moves, None, BTreeMap::new()).unwrap()
    }

    /// words containing bb
    fn contains_bb() -> Sfa {
        let any = Guard::Pred(Predicate::any());
        Machine::new(
            alg(),
            0,
            [2],
            [
                Move::new(0, any.clone(), 0),
                Move::new(0, pred("b"), 1),
                Move::new(1, pred("b"), 2),
                Move::new(2, any, 2),
            ],
            None,
            BTreeMap::new(),
        )
        .unwrap()
    }

    #[test]
    fn test_collapse_is_sound() {
        let abs = PredicateAbstraction::new(Direction::Forward, None, vec![contains_bb()]);
        let m = sfa_word("abab");
        let collapsed = abs.collapse(&m).unwrap();
        assert!(collapsed.accepts(&word("abab")));
    }

    #[test]
    fn test_distinct_signatures_stay_separate() {
        // m = {b}: with the bad-language predicate, the two states of m
        // carry different labels and must not merge
        let abs = PredicateAbstraction::new(Direction::Forward, None, vec![sfa_word("b")]);
        let m = sfa_word("b");
        assert!(!abs.states_equivalent(&m, 0, 1).unwrap());
        let collapsed = abs.collapse(&m).unwrap();
        assert_eq!(collapsed.state_count(), m.state_count());
    }

    #[test]
    fn test_refine_excludes_witness() {
        // start with no predicates: everything merges
        let mut abs = PredicateAbstraction::new(Direction::Forward, None, vec![]);
        let m = sfa_word("ab");
        let coarse = abs.collapse(&m).unwrap();
        assert!(coarse.accepts(&word("abab")));

        // a spurious witness within the collapsed language
        let x = sfa_word("abab").determinize().unwrap().minimize().unwrap();
        assert!(!coarse.product_is_empty(&x).unwrap());

        abs.refine(&m, &x).unwrap();
        let refined = abs.collapse(&m).unwrap();
        assert!(refined.product_is_empty(&x).unwrap());
        // the machine's own language is still there
        assert!(refined.accepts(&word("ab")));
    }

    #[test]
    fn test_refine_with_heuristics_stays_sound() {
        for heuristic in [
            RefinementHeuristic::ImportantStates,
            RefinementHeuristic::KeyStates,
        ] {
            let mut abs = PredicateAbstraction::new(Direction::Forward, Some(heuristic), vec![]);
            let m = sfa_word("ab");
            let x = sfa_word("abab").determinize().unwrap().minimize().unwrap();
            abs.refine(&m, &x).unwrap();
            let refined = abs.collapse(&m).unwrap();
            assert!(
                refined.product_is_empty(&x).unwrap(),
                "witness still collapsible under {heuristic:?}"
            );
            assert!(refined.accepts(&word("ab")));
        }
    }

    #[test]
    fn test_backward_direction_labelling() {
        let abs = PredicateAbstraction::new(Direction::Backward, None, vec![sfa_word("ab")]);
        let m = sfa_word("ab");
        // backward signatures separate the chain states as well
        assert!(!abs.states_equivalent(&m, 0, 2).unwrap());
    }
}
