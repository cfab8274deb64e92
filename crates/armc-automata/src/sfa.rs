//! Symbolic finite automata.

use crate::error::{AutomatonError, AutomatonResult};
use crate::machine::{Guard, Machine, Move, StateId};
use armc_algebra::{Predicate, Symbol};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::trace;

/// An automaton whose edges are labelled by predicates (or ε).
pub type Sfa = Machine<Guard>;

impl Machine<Guard> {
    /// An automaton with the empty language over the given algebra.
    fn empty_language(&self) -> AutomatonResult<Sfa> {
        Machine::new(
            self.algebra().clone(),
            0,
            [],
            Vec::<Move<Guard>>::new(),
            self.name().map(str::to_string),
            BTreeMap::new(),
        )
    }

    /// Emptiness. Dead states are removed at construction, so the language
    /// is empty exactly when no final state survived.
    pub fn is_empty(&self) -> bool {
        self.finals().is_empty()
    }

    /// ε-closure of a set of states.
    fn epsilon_closure(&self, seed: &BTreeSet<StateId>) -> BTreeSet<StateId> {
        let mut closure = seed.clone();
        let mut work: VecDeque<StateId> = seed.iter().copied().collect();
        while let Some(s) = work.pop_front() {
            for m in self.moves().filter(|m| m.source == s) {
                if matches!(m.label, Guard::Epsilon) && closure.insert(m.target) {
                    work.push_back(m.target);
                }
            }
        }
        closure
    }

    /// Membership test by direct NFA simulation.
    pub fn accepts(&self, word: &[Symbol]) -> bool {
        let mut current = self.epsilon_closure(&BTreeSet::from([self.initial()]));
        for symbol in word {
            let mut next = BTreeSet::new();
            for m in self.moves().filter(|m| current.contains(&m.source)) {
                if let Guard::Pred(p) = &m.label {
                    if p.accepts_symbol(symbol) {
                        next.insert(m.target);
                    }
                }
            }
            current = self.epsilon_closure(&next);
            if current.is_empty() {
                return false;
            }
        }
        current.iter().any(|s| self.is_final(*s))
    }

    /// A word of the language as a sequence of predicates along an accepting
    /// path with the fewest moves; `None` when the language is empty.
    /// ε-moves on the path contribute no predicate.
    pub fn shortest_word(&self) -> Option<Vec<Predicate>> {
        let mut prev: BTreeMap<StateId, (StateId, Option<Predicate>)> = BTreeMap::new();
        let mut seen = BTreeSet::from([self.initial()]);
        let mut work = VecDeque::from([self.initial()]);
        while let Some(s) = work.pop_front() {
            if self.is_final(s) {
                let mut word = Vec::new();
                let mut cur = s;
                while cur != self.initial() {
                    let (parent, label) = &prev[&cur];
                    if let Some(p) = label {
                        word.push(p.clone());
                    }
                    cur = *parent;
                }
                word.reverse();
                return Some(word);
            }
            for m in self.moves().filter(|m| m.source == s) {
                if seen.insert(m.target) {
                    prev.insert(m.target, (s, m.label.pred().cloned()));
                    work.push_back(m.target);
                }
            }
        }
        None
    }

    /// An equivalent automaton without ε-moves.
    pub fn remove_epsilons(&self) -> AutomatonResult<Sfa> {
        if !self.has_epsilon_moves() {
            return Ok(self.clone());
        }
        let mut moves = Vec::new();
        let mut finals = BTreeSet::new();
        for &s in self.states() {
            let closure = self.epsilon_closure(&BTreeSet::from([s]));
            if closure.iter().any(|t| self.is_final(*t)) {
                finals.insert(s);
            }
            for m in self.moves().filter(|m| closure.contains(&m.source)) {
                if let Guard::Pred(p) = &m.label {
                    moves.push(Move::new(s, Guard::Pred(p.clone()), m.target));
                }
            }
        }
        Machine::new(
            self.algebra().clone(),
            self.initial(),
            finals,
            moves,
            self.name().map(str::to_string),
            BTreeMap::new(),
        )
    }

    /// Minterm-based subset construction.
    pub fn determinize(&self) -> AutomatonResult<Sfa> {
        let nfa = self.remove_epsilons()?;
        let start: BTreeSet<StateId> = BTreeSet::from([nfa.initial()]);
        let mut ids: BTreeMap<BTreeSet<StateId>, StateId> = BTreeMap::new();
        ids.insert(start.clone(), 0);
        let mut work = VecDeque::from([start]);
        let mut moves = Vec::new();
        let mut finals = BTreeSet::new();

        while let Some(set) = work.pop_front() {
            let id = ids[&set];
            if set.iter().any(|s| nfa.is_final(*s)) {
                finals.insert(id);
            }
            let mut preds: Vec<Predicate> = Vec::new();
            for m in nfa.moves().filter(|m| set.contains(&m.source)) {
                if let Guard::Pred(p) = &m.label {
                    if !preds.contains(p) {
                        preds.push(p.clone());
                    }
                }
            }
            for term in nfa.algebra().minterms(&preds) {
                let targets: BTreeSet<StateId> = nfa
                    .moves()
                    .filter(|m| set.contains(&m.source))
                    .filter_map(|m| m.label.pred().map(|p| (p, m.target)))
                    .filter(|(p, _)| nfa.algebra().satisfiable(&term.and(p)))
                    .map(|(_, t)| t)
                    .collect();
                if targets.is_empty() {
                    continue;
                }
                let next = if let Some(&i) = ids.get(&targets) {
                    i
                } else {
                    let i = ids.len();
                    ids.insert(targets.clone(), i);
                    work.push_back(targets);
                    i
                };
                moves.push(Move::new(id, Guard::Pred(term), next));
            }
        }
        trace!(states = ids.len(), "determinized");
        Machine::new(
            self.algebra().clone(),
            0,
            finals,
            moves,
            self.name().map(str::to_string),
            BTreeMap::new(),
        )
    }

    /// Complete the transition relation with a sink state.
    ///
    /// The sink is dead when no final state is reachable from it; this is
    /// the one construction that keeps such a state, since totality is the
    /// point. Intended for ε-free machines.
    pub fn make_total(&self) -> AutomatonResult<Sfa> {
        let sink = self.max_state() + 1;
        let mut moves: Vec<Move<Guard>> = self.moves().cloned().collect();
        let mut needs_sink = false;
        for &s in self.states() {
            let mut missing = Predicate::any();
            for m in self.moves().filter(|m| m.source == s) {
                if let Guard::Pred(p) = &m.label {
                    missing = missing.and(&p.not());
                }
            }
            if self.algebra().satisfiable(&missing) {
                moves.push(Move::new(s, Guard::Pred(self.algebra().simplify(&missing)), sink));
                needs_sink = true;
            }
        }
        if needs_sink {
            moves.push(Move::new(sink, Guard::Pred(Predicate::any()), sink));
        }
        Machine::untrimmed(
            self.algebra().clone(),
            self.initial(),
            self.finals().iter().copied(),
            moves,
            self.name().map(str::to_string),
            BTreeMap::new(),
        )
    }

    /// Language complement via determinise, totalise, flip finality.
    pub fn complement(&self) -> AutomatonResult<Sfa> {
        let total = self.determinize()?.make_total()?;
        let finals: BTreeSet<StateId> = total
            .states()
            .iter()
            .copied()
            .filter(|s| !total.is_final(*s))
            .collect();
        Machine::new(
            total.algebra().clone(),
            total.initial(),
            finals,
            total.moves().cloned(),
            None,
            BTreeMap::new(),
        )
    }

    /// Synchronous product; the language is the intersection.
    pub fn product(&self, other: &Sfa) -> AutomatonResult<Sfa> {
        self.check_compatible(other)?;
        let a = self.remove_epsilons()?;
        let b = other.remove_epsilons()?;
        let start = (a.initial(), b.initial());
        let mut ids: BTreeMap<(StateId, StateId), StateId> = BTreeMap::new();
        ids.insert(start, 0);
        let mut work = VecDeque::from([start]);
        let mut moves = Vec::new();
        let mut finals = BTreeSet::new();

        while let Some((p, q)) = work.pop_front() {
            let id = ids[&(p, q)];
            if a.is_final(p) && b.is_final(q) {
                finals.insert(id);
            }
            for ma in a.moves().filter(|m| m.source == p) {
                for mb in b.moves().filter(|m| m.source == q) {
                    let (Some(pa), Some(pb)) = (ma.label.pred(), mb.label.pred()) else {
                        continue;
                    };
                    let conj = pa.and(pb);
                    if !a.algebra().satisfiable(&conj) {
                        continue;
                    }
                    let key = (ma.target, mb.target);
                    let next = if let Some(&i) = ids.get(&key) {
                        i
                    } else {
                        let i = ids.len();
                        ids.insert(key, i);
                        work.push_back(key);
                        i
                    };
                    moves.push(Move::new(id, Guard::Pred(conj), next));
                }
            }
        }
        Machine::new(
            self.algebra().clone(),
            0,
            finals,
            moves,
            None,
            BTreeMap::new(),
        )
    }

    /// Classical union: a fresh start state with ε-moves to both operands.
    pub fn sum(&self, other: &Sfa) -> AutomatonResult<Sfa> {
        self.check_compatible(other)?;
        let mut map_a = BTreeMap::new();
        let mut next = 1;
        for &s in self.states() {
            map_a.insert(s, next);
            next += 1;
        }
        let mut map_b = BTreeMap::new();
        for &s in other.states() {
            map_b.insert(s, next);
            next += 1;
        }
        let mut moves = vec![
            Move::new(0, Guard::Epsilon, map_a[&self.initial()]),
            Move::new(0, Guard::Epsilon, map_b[&other.initial()]),
        ];
        for m in self.moves() {
            moves.push(Move::new(map_a[&m.source], m.label.clone(), map_a[&m.target]));
        }
        for m in other.moves() {
            moves.push(Move::new(map_b[&m.source], m.label.clone(), map_b[&m.target]));
        }
        let finals: BTreeSet<StateId> = self
            .finals()
            .iter()
            .map(|f| map_a[f])
            .chain(other.finals().iter().map(|f| map_b[f]))
            .collect();
        Machine::new(
            self.algebra().clone(),
            0,
            finals,
            moves,
            None,
            BTreeMap::new(),
        )
    }

    /// Words of `self` not accepted by `other`.
    pub fn difference(&self, other: &Sfa) -> AutomatonResult<Sfa> {
        self.product(&other.complement()?)
    }

    /// Whether the intersection of two languages is empty, decided on the
    /// lazily built product with an early exit. This is the hot check of the
    /// verification loop: no product automaton is materialised.
    pub fn product_is_empty(&self, other: &Sfa) -> AutomatonResult<bool> {
        self.check_compatible(other)?;
        let start = (self.initial(), other.initial());
        let mut seen = BTreeSet::from([start]);
        let mut work = VecDeque::from([start]);
        while let Some((p, q)) = work.pop_front() {
            if self.is_final(p) && other.is_final(q) {
                return Ok(false);
            }
            for ma in self.moves().filter(|m| m.source == p) {
                match &ma.label {
                    Guard::Epsilon => {
                        let key = (ma.target, q);
                        if seen.insert(key) {
                            work.push_back(key);
                        }
                    }
                    Guard::Pred(pa) => {
                        for mb in other.moves().filter(|m| m.source == q) {
                            if let Guard::Pred(pb) = &mb.label {
                                if self.algebra().satisfiable(&pa.and(pb)) {
                                    let key = (ma.target, mb.target);
                                    if seen.insert(key) {
                                        work.push_back(key);
                                    }
                                }
                            }
                        }
                    }
                }
            }
            for mb in other.moves().filter(|m| m.source == q) {
                if matches!(mb.label, Guard::Epsilon) {
                    let key = (p, mb.target);
                    if seen.insert(key) {
                        work.push_back(key);
                    }
                }
            }
        }
        Ok(true)
    }

    /// Language inclusion.
    pub fn subset_of(&self, other: &Sfa) -> AutomatonResult<bool> {
        self.product_is_empty(&other.complement()?)
    }

    /// Language equivalence. Expensive: two complements and two product
    /// reachability checks. Callers opt in explicitly; machines are never
    /// compared by `==`.
    pub fn equivalent(&self, other: &Sfa) -> AutomatonResult<bool> {
        Ok(self.subset_of(other)? && other.subset_of(self)?)
    }

    /// A word separating the two languages, or `None` when equivalent.
    pub fn distinguishing_word(&self, other: &Sfa) -> AutomatonResult<Option<Vec<Predicate>>> {
        if let Some(word) = self.difference(other)?.shortest_word() {
            return Ok(Some(word));
        }
        Ok(other.difference(self)?.shortest_word())
    }

    /// Minimal deterministic automaton for the language, computed by Moore
    /// partition refinement over the minterms of the totalised automaton.
    pub fn minimize(&self) -> AutomatonResult<Sfa> {
        if self.is_empty() {
            return self.empty_language();
        }
        let total = self.determinize()?.make_total()?;

        let mut preds: Vec<Predicate> = Vec::new();
        for m in total.moves() {
            if let Guard::Pred(p) = &m.label {
                if !preds.contains(p) {
                    preds.push(p.clone());
                }
            }
        }
        let letters = total.algebra().minterms(&preds);
        let successor = |s: StateId, letter: &Predicate| -> StateId {
            total
                .moves()
                .find(|m| {
                    m.source == s
                        && m.label
                            .pred()
                            .map_or(false, |p| total.algebra().satisfiable(&letter.and(p)))
                })
                .map(|m| m.target)
                // the automaton is total, so a successor always exists
                .unwrap_or(s)
        };

        let mut block: BTreeMap<StateId, usize> = total
            .states()
            .iter()
            .map(|&s| (s, usize::from(!total.is_final(s))))
            .collect();
        loop {
            let before = block.values().collect::<BTreeSet<_>>().len();
            let mut signatures: BTreeMap<(usize, Vec<usize>), usize> = BTreeMap::new();
            let mut refined: BTreeMap<StateId, usize> = BTreeMap::new();
            for &s in total.states() {
                let sig = (
                    block[&s],
                    letters.iter().map(|l| block[&successor(s, l)]).collect(),
                );
                let fresh = signatures.len();
                let id = *signatures.entry(sig).or_insert(fresh);
                refined.insert(s, id);
            }
            let after = refined.values().collect::<BTreeSet<_>>().len();
            block = refined;
            if after == before {
                break;
            }
        }

        let mut representative: BTreeMap<usize, StateId> = BTreeMap::new();
        for (&s, &b) in &block {
            representative.entry(b).or_insert(s);
        }
        let rep = |s: StateId| representative[&block[&s]];

        let mut merged: BTreeMap<(StateId, StateId), Predicate> = BTreeMap::new();
        for m in total.moves() {
            if let Guard::Pred(p) = &m.label {
                merged
                    .entry((rep(m.source), rep(m.target)))
                    .and_modify(|acc| *acc = acc.or(p))
                    .or_insert_with(|| p.clone());
            }
        }
        let moves = merged
            .into_iter()
            .map(|((s, t), p)| Move::new(s, Guard::Pred(total.algebra().simplify(&p)), t));
        let finals: BTreeSet<StateId> = total.finals().iter().map(|&f| rep(f)).collect();
        Machine::new(
            total.algebra().clone(),
            rep(total.initial()),
            finals,
            moves,
            self.name().map(str::to_string),
            BTreeMap::new(),
        )
    }

    /// The reversed language.
    pub fn reverse(&self) -> AutomatonResult<Sfa> {
        let mut moves: Vec<Move<Guard>> = self
            .moves()
            .map(|m| Move::new(m.target, m.label.clone(), m.source))
            .collect();
        let finals_vec: Vec<StateId> = self.finals().iter().copied().collect();
        let initial = match finals_vec.as_slice() {
            [only] => *only,
            _ => {
                let fresh = self.max_state() + 1;
                for &f in &finals_vec {
                    moves.push(Move::new(fresh, Guard::Epsilon, f));
                }
                fresh
            }
        };
        Machine::new(
            self.algebra().clone(),
            initial,
            [self.initial()],
            moves,
            None,
            BTreeMap::new(),
        )
    }

    /// The prefix closure of the language. On a trimmed machine every state
    /// lies on an accepting path, so it suffices to make every state final.
    pub fn prefix_language(&self) -> AutomatonResult<Sfa> {
        if self.is_empty() {
            return self.empty_language();
        }
        Machine::new(
            self.algebra().clone(),
            self.initial(),
            self.states().iter().copied(),
            self.moves().cloned(),
            None,
            BTreeMap::new(),
        )
    }

    /// The suffix closure of the language: a fresh start state with ε-moves
    /// to every state.
    pub fn suffix_language(&self) -> AutomatonResult<Sfa> {
        if self.is_empty() {
            return self.empty_language();
        }
        let fresh = self.max_state() + 1;
        let mut moves: Vec<Move<Guard>> = self.moves().cloned().collect();
        for &s in self.states() {
            moves.push(Move::new(fresh, Guard::Epsilon, s));
        }
        Machine::new(
            self.algebra().clone(),
            fresh,
            self.finals().iter().copied(),
            moves,
            None,
            BTreeMap::new(),
        )
    }

    /// Words of the language of length at most `n`: the product with the
    /// `n`-word-length chain automaton.
    pub fn bounded_language(&self, n: usize) -> AutomatonResult<Sfa> {
        let mut moves = Vec::new();
        for i in 0..n {
            moves.push(Move::new(i, Guard::Pred(Predicate::any()), i + 1));
        }
        let chain = Machine::new(
            self.algebra().clone(),
            0,
            0..=n,
            moves,
            None,
            BTreeMap::new(),
        )?;
        self.product(&chain)
    }

    /// `Lf(q)`: the language from `q` to the final states.
    pub fn forward_state_language(&self, q: StateId) -> AutomatonResult<Sfa> {
        if !self.states().contains(&q) {
            return Err(AutomatonError::StateNotInStates { state: q });
        }
        Machine::new(
            self.algebra().clone(),
            q,
            self.finals().iter().copied(),
            self.moves().cloned(),
            None,
            BTreeMap::new(),
        )
    }

    /// `Lb(q)`: the language from the initial state to `q`.
    pub fn backward_state_language(&self, q: StateId) -> AutomatonResult<Sfa> {
        if !self.states().contains(&q) {
            return Err(AutomatonError::StateNotInStates { state: q });
        }
        Machine::new(
            self.algebra().clone(),
            self.initial(),
            [q],
            self.moves().cloned(),
            None,
            BTreeMap::new(),
        )
    }

    /// Prefix closure of `Lf(q)`.
    pub fn forward_trace_language(&self, q: StateId) -> AutomatonResult<Sfa> {
        self.forward_state_language(q)?.prefix_language()
    }

    /// Suffix closure of `Lb(q)`, dual to the forward case.
    pub fn backward_trace_language(&self, q: StateId) -> AutomatonResult<Sfa> {
        self.backward_state_language(q)?.suffix_language()
    }

    /// Quotient by a client-supplied equivalence on states.
    ///
    /// States are visited in ascending order; each joins the first existing
    /// class whose representative it is equivalent to, otherwise it founds a
    /// new class. Merging states can only add words, so the result language
    /// contains the input language.
    pub fn collapse<F>(&self, mut equiv: F) -> AutomatonResult<Sfa>
    where
        F: FnMut(&Sfa, StateId, StateId) -> AutomatonResult<bool>,
    {
        let mut representatives: Vec<StateId> = Vec::new();
        let mut class: BTreeMap<StateId, StateId> = BTreeMap::new();
        for &s in self.states() {
            let mut joined = false;
            for &r in &representatives {
                if equiv(self, s, r)? {
                    class.insert(s, r);
                    joined = true;
                    break;
                }
            }
            if !joined {
                representatives.push(s);
                class.insert(s, s);
            }
        }
        trace!(
            states = self.state_count(),
            classes = representatives.len(),
            "collapsed"
        );
        let moves = self
            .moves()
            .map(|m| Move::new(class[&m.source], m.label.clone(), class[&m.target]));
        let finals: BTreeSet<StateId> = self.finals().iter().map(|f| class[f]).collect();
        Machine::new(
            self.algebra().clone(),
            class[&self.initial()],
            finals,
            moves,
            self.name().map(str::to_string),
            BTreeMap::new(),
        )
    }
}
