//! Symbolic finite transducers.

use crate::error::{AutomatonError, AutomatonResult};
use crate::machine::{Guard, Machine, Move, StateId};
use crate::sfa::Sfa;
use armc_algebra::Label;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::trace;

/// A transducer: a machine whose edges carry input/output labels.
pub type Sft = Machine<Label>;

impl Machine<Label> {
    /// The image `{τ(w) : w ∈ L(m)}` as an automaton.
    ///
    /// A forward product traversal: moves with an ε input advance the
    /// transducer alone, ε-moves of `m` advance the automaton alone, and
    /// every other pairing requires the transducer input to meet the
    /// automaton predicate. Identity labels emit that conjunction; pair
    /// labels emit their output side.
    pub fn apply(&self, m: &Sfa) -> AutomatonResult<Sfa> {
        self.check_compatible(m)?;
        let start = (self.initial(), m.initial());
        let mut ids: BTreeMap<(StateId, StateId), StateId> = BTreeMap::new();
        ids.insert(start, 0);
        let mut work = VecDeque::from([start]);
        let mut moves = Vec::new();
        let mut finals = BTreeSet::new();

        while let Some((p, s)) = work.pop_front() {
            let id = ids[&(p, s)];
            if self.is_final(p) && m.is_final(s) {
                finals.insert(id);
            }
            let push = |moves: &mut Vec<Move<Guard>>,
                            ids: &mut BTreeMap<(StateId, StateId), StateId>,
                            work: &mut VecDeque<(StateId, StateId)>,
                            guard: Guard,
                            key: (StateId, StateId)| {
                let next = if let Some(&i) = ids.get(&key) {
                    i
                } else {
                    let i = ids.len();
                    ids.insert(key, i);
                    work.push_back(key);
                    i
                };
                moves.push(Move::new(id, guard, next));
            };

            for tm in self.moves().filter(|t| t.source == p) {
                match tm.label.input() {
                    None => {
                        // ε input: the transducer writes without reading
                        let guard = match tm.label.output() {
                            Some(out) => Guard::Pred(out.clone()),
                            None => Guard::Epsilon,
                        };
                        push(&mut moves, &mut ids, &mut work, guard, (tm.target, s));
                    }
                    Some(input) => {
                        for am in m.moves().filter(|a| a.source == s) {
                            let Guard::Pred(read) = &am.label else { continue };
                            let fused = input.and(read);
                            if !self.algebra().satisfiable(&fused) {
                                continue;
                            }
                            let guard = if tm.label.is_identity() {
                                Guard::Pred(fused)
                            } else {
                                match tm.label.output() {
                                    Some(out) => Guard::Pred(out.clone()),
                                    None => Guard::Epsilon,
                                }
                            };
                            push(&mut moves, &mut ids, &mut work, guard, (tm.target, am.target));
                        }
                    }
                }
            }
            for am in m.moves().filter(|a| a.source == s) {
                if matches!(am.label, Guard::Epsilon) {
                    push(&mut moves, &mut ids, &mut work, Guard::Epsilon, (p, am.target));
                }
            }
        }
        trace!(states = ids.len(), "applied transducer");
        Machine::new(
            self.algebra().clone(),
            0,
            finals,
            moves,
            None,
            BTreeMap::new(),
        )
    }

    /// The inverse relation: input and output swap on every pair label;
    /// identity labels are their own inverse.
    pub fn invert(&self) -> AutomatonResult<Sft> {
        let moves = self.moves().map(|m| {
            let label = match &m.label {
                Label::Identity(p) => Label::Identity(p.clone()),
                Label::Pair { input, output } => Label::Pair {
                    input: output.clone(),
                    output: input.clone(),
                },
            };
            Move::new(m.source, label, m.target)
        });
        Machine::new(
            self.algebra().clone(),
            self.initial(),
            self.finals().iter().copied(),
            moves,
            self.name().map(|n| format!("{n}-inverse")),
            BTreeMap::new(),
        )
    }

    /// Serial composition: this transducer feeding `other`.
    ///
    /// A synchronous product with [`Label::combine`] on lockstep moves;
    /// moves writing ε advance this operand alone, moves reading ε advance
    /// `other` alone, and unsatisfiable composites are dropped.
    pub fn compose(&self, other: &Sft) -> AutomatonResult<Sft> {
        self.check_compatible(other)?;
        let start = (self.initial(), other.initial());
        let mut ids: BTreeMap<(StateId, StateId), StateId> = BTreeMap::new();
        ids.insert(start, 0);
        let mut work = VecDeque::from([start]);
        let mut moves = Vec::new();
        let mut finals = BTreeSet::new();

        while let Some((p, q)) = work.pop_front() {
            let id = ids[&(p, q)];
            if self.is_final(p) && other.is_final(q) {
                finals.insert(id);
            }
            let push = |moves: &mut Vec<Move<Label>>,
                            ids: &mut BTreeMap<(StateId, StateId), StateId>,
                            work: &mut VecDeque<(StateId, StateId)>,
                            label: Label,
                            key: (StateId, StateId)| {
                let next = if let Some(&i) = ids.get(&key) {
                    i
                } else {
                    let i = ids.len();
                    ids.insert(key, i);
                    work.push_back(key);
                    i
                };
                moves.push(Move::new(id, label, next));
            };

            for ma in self.moves().filter(|m| m.source == p) {
                if ma.label.output().is_none() {
                    // writes nothing: the second transducer stays put
                    let label = Label::pair(ma.label.input().cloned(), None);
                    push(&mut moves, &mut ids, &mut work, label, (ma.target, q));
                    continue;
                }
                for mb in other.moves().filter(|m| m.source == q) {
                    if mb.label.input().is_none() {
                        continue;
                    }
                    if let Some(label) = ma.label.combine(&mb.label, self.algebra()) {
                        push(&mut moves, &mut ids, &mut work, label, (ma.target, mb.target));
                    }
                }
            }
            for mb in other.moves().filter(|m| m.source == q) {
                if mb.label.input().is_none() {
                    // reads nothing: the first transducer stays put
                    let label = Label::pair(None, mb.label.output().cloned());
                    push(&mut moves, &mut ids, &mut work, label, (p, mb.target));
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

    /// Union of a family of transducers: a fresh start state with ε-moves
    /// to each normalised operand.
    pub fn union(transducers: &[Sft]) -> AutomatonResult<Sft> {
        let (first, rest) = transducers
            .split_first()
            .ok_or(AutomatonError::EmptyUnion)?;
        for t in rest {
            first.check_compatible(t)?;
        }
        let mut moves: Vec<Move<Label>> = Vec::new();
        let mut finals: BTreeSet<StateId> = BTreeSet::new();
        let mut offset = 1;
        for t in transducers {
            let shifted = t.normalize(offset);
            moves.push(Move::new(0, Label::epsilon(), shifted.initial()));
            moves.extend(shifted.moves().cloned());
            finals.extend(shifted.finals().iter().copied());
            offset = shifted.max_state() + 1;
        }
        Machine::new(
            first.algebra().clone(),
            0,
            finals,
            moves,
            None,
            BTreeMap::new(),
        )
    }

    /// The input language: each label projected to its input side.
    pub fn domain(&self) -> AutomatonResult<Sfa> {
        self.project(|label| label.input().cloned())
    }

    /// The output language: each label projected to its output side.
    pub fn range(&self) -> AutomatonResult<Sfa> {
        self.project(|label| label.output().cloned())
    }

    fn project(
        &self,
        side: impl Fn(&Label) -> Option<armc_algebra::Predicate>,
    ) -> AutomatonResult<Sfa> {
        let moves = self.moves().map(|m| {
            let guard = match side(&m.label) {
                Some(p) => Guard::Pred(p),
                None => Guard::Epsilon,
            };
            Move::new(m.source, guard, m.target)
        });
        Machine::new(
            self.algebra().clone(),
            self.initial(),
            self.finals().iter().copied(),
            moves,
            self.name().map(str::to_string),
            BTreeMap::new(),
        )
    }
}
