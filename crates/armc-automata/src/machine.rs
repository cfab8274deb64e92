//! The machine shape shared by automata and transducers.

use crate::error::{AutomatonError, AutomatonResult};
use armc_algebra::{Algebra, Label, Predicate, Symbol};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// A state identifier, local to one machine.
pub type StateId = usize;

/// A labelled transition.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Move<L> {
    pub source: StateId,
    pub target: StateId,
    pub label: L,
}

impl<L> Move<L> {
    pub fn new(source: StateId, label: L, target: StateId) -> Self {
        Move {
            source,
            target,
            label,
        }
    }
}

/// The label of an automaton edge: a predicate, or ε.
///
/// An ε-move is distinct from a move with an unsatisfiable predicate; the
/// latter is dropped at construction, the former consumes no symbol.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Guard {
    Epsilon,
    Pred(Predicate),
}

impl Guard {
    pub fn pred(&self) -> Option<&Predicate> {
        match self {
            Guard::Epsilon => None,
            Guard::Pred(p) => Some(p),
        }
    }
}

impl fmt::Display for Guard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Guard::Epsilon => write!(f, "eps"),
            Guard::Pred(p) => write!(f, "{p}"),
        }
    }
}

/// Behaviour every edge label must provide to the shared machine code.
pub trait EdgeLabel: Clone + Ord + fmt::Debug + fmt::Display {
    fn is_epsilon(&self) -> bool;
    fn satisfiable(&self, algebra: &Algebra) -> bool;
    /// Some symbol mentioned by the label that is outside the alphabet.
    fn foreign_symbol(&self, algebra: &Algebra) -> Option<Symbol>;
}

fn foreign_in_pred(p: &Predicate, algebra: &Algebra) -> Option<Symbol> {
    p.set().iter().find(|s| !algebra.contains(s)).cloned()
}

impl EdgeLabel for Guard {
    fn is_epsilon(&self) -> bool {
        matches!(self, Guard::Epsilon)
    }

    fn satisfiable(&self, algebra: &Algebra) -> bool {
        match self {
            Guard::Epsilon => true,
            Guard::Pred(p) => algebra.satisfiable(p),
        }
    }

    fn foreign_symbol(&self, algebra: &Algebra) -> Option<Symbol> {
        self.pred().and_then(|p| foreign_in_pred(p, algebra))
    }
}

impl EdgeLabel for Label {
    fn is_epsilon(&self) -> bool {
        Label::is_epsilon(self)
    }

    fn satisfiable(&self, algebra: &Algebra) -> bool {
        Label::satisfiable(self, algebra)
    }

    fn foreign_symbol(&self, algebra: &Algebra) -> Option<Symbol> {
        self.input()
            .and_then(|p| foreign_in_pred(p, algebra))
            .or_else(|| self.output().and_then(|p| foreign_in_pred(p, algebra)))
    }
}

/// A symbolic machine: states, moves, an initial state, final states and a
/// reference to the algebra owning its alphabet.
///
/// Construction enforces the structural invariants: every edge label stays
/// within the alphabet, the state-name map (when present) covers only known
/// states with unique names, and unreachable or dead states are removed.
/// The only construction that keeps dead states is
/// [`Sfa::make_total`](crate::Sfa::make_total), whose sink is dead on
/// purpose.
#[derive(Debug, Clone)]
pub struct Machine<L> {
    algebra: Arc<Algebra>,
    initial: StateId,
    states: BTreeSet<StateId>,
    finals: BTreeSet<StateId>,
    moves: BTreeSet<Move<L>>,
    name: Option<String>,
    state_names: BTreeMap<StateId, String>,
}

impl<L: EdgeLabel> Machine<L> {
    /// Build a machine, validate it, and trim unreachable and dead states.
    pub fn new(
        algebra: Arc<Algebra>,
        initial: StateId,
        finals: impl IntoIterator<Item = StateId>,
        moves: impl IntoIterator<Item = Move<L>>,
        name: Option<String>,
        state_names: BTreeMap<StateId, String>,
    ) -> AutomatonResult<Self> {
        let machine = Self::untrimmed(algebra, initial, finals, moves, name, state_names)?;
        Ok(machine.trimmed())
    }

    /// Build and validate without removing unreachable or dead states.
    pub(crate) fn untrimmed(
        algebra: Arc<Algebra>,
        initial: StateId,
        finals: impl IntoIterator<Item = StateId>,
        moves: impl IntoIterator<Item = Move<L>>,
        name: Option<String>,
        state_names: BTreeMap<StateId, String>,
    ) -> AutomatonResult<Self> {
        let finals: BTreeSet<StateId> = finals.into_iter().collect();
        let moves: BTreeSet<Move<L>> = moves.into_iter().collect();

        for m in &moves {
            if let Some(symbol) = m.label.foreign_symbol(&algebra) {
                return Err(AutomatonError::SymbolOutsideAlphabet { symbol });
            }
        }

        let mut states: BTreeSet<StateId> = BTreeSet::new();
        states.insert(initial);
        states.extend(finals.iter().copied());
        for m in &moves {
            states.insert(m.source);
            states.insert(m.target);
        }

        for (state, name) in &state_names {
            if !states.contains(state) {
                return Err(AutomatonError::InvalidStateNames {
                    reason: format!("name '{name}' given to unknown state {state}"),
                });
            }
        }
        let mut seen = BTreeSet::new();
        for name in state_names.values() {
            if !seen.insert(name) {
                return Err(AutomatonError::InvalidStateNames {
                    reason: format!("name '{name}' used twice"),
                });
            }
        }

        Ok(Machine {
            algebra,
            initial,
            states,
            finals,
            moves,
            name,
            state_names,
        })
    }

    /// Remove moves with unsatisfiable labels, then unreachable and dead
    /// states. The initial state is always kept, even when the language is
    /// empty.
    fn trimmed(mut self) -> Self {
        self.moves
            .retain(|m| m.label.is_epsilon() || m.label.satisfiable(&self.algebra));

        let forward = reach(self.initial, &self.moves, |m| (m.source, m.target));
        let mut live = BTreeSet::new();
        for &f in self.finals.intersection(&forward) {
            live.insert(f);
        }
        let backward = reach_all(&live, &self.moves, |m| (m.target, m.source));
        let live: BTreeSet<StateId> = forward.intersection(&backward).copied().collect();

        self.moves
            .retain(|m| live.contains(&m.source) && live.contains(&m.target));
        self.finals.retain(|f| live.contains(f));
        let mut states = live;
        states.insert(self.initial);
        self.state_names.retain(|s, _| states.contains(s));
        self.states = states;
        self
    }

    pub fn algebra(&self) -> &Arc<Algebra> {
        &self.algebra
    }

    pub fn initial(&self) -> StateId {
        self.initial
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    pub fn finals(&self) -> &BTreeSet<StateId> {
        &self.finals
    }

    pub fn is_final(&self, state: StateId) -> bool {
        self.finals.contains(&state)
    }

    pub fn moves(&self) -> impl Iterator<Item = &Move<L>> {
        self.moves.iter()
    }

    pub fn move_count(&self) -> usize {
        self.moves.len()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn state_names(&self) -> &BTreeMap<StateId, String> {
        &self.state_names
    }

    pub fn has_epsilon_moves(&self) -> bool {
        self.moves.iter().any(|m| m.label.is_epsilon())
    }

    /// Error unless `other` lives over the same alphabet.
    pub fn check_compatible<M: EdgeLabel>(&self, other: &Machine<M>) -> AutomatonResult<()> {
        if Arc::ptr_eq(&self.algebra, &other.algebra)
            || self.algebra.symbols() == other.algebra.symbols()
        {
            Ok(())
        } else {
            Err(AutomatonError::IncompatibleAlphabets)
        }
    }

    /// Reinterpret this machine over a larger alphabet.
    ///
    /// Complemented predicates widen with the alphabet; that is the point of
    /// rebinding all inputs to one merged algebra before verification.
    pub fn rebind(&self, algebra: Arc<Algebra>) -> AutomatonResult<Self> {
        if !self
            .algebra
            .symbols()
            .iter()
            .all(|s| algebra.contains(s))
        {
            return Err(AutomatonError::IncompatibleAlphabets);
        }
        Machine::new(
            algebra,
            self.initial,
            self.finals.iter().copied(),
            self.moves.iter().cloned(),
            self.name.clone(),
            self.state_names.clone(),
        )
    }

    /// Renumber states so the initial state is `offset`, final states form
    /// the next contiguous block, and the remaining states follow; each block
    /// in ascending order of the old identifiers. The language is unchanged
    /// and the operation is idempotent.
    pub fn normalize(&self, offset: StateId) -> Self {
        let mut map: BTreeMap<StateId, StateId> = BTreeMap::new();
        let mut next = offset;
        map.insert(self.initial, next);
        next += 1;
        for &f in &self.finals {
            if f != self.initial {
                map.insert(f, next);
                next += 1;
            }
        }
        for &s in &self.states {
            if !map.contains_key(&s) {
                map.insert(s, next);
                next += 1;
            }
        }
        self.renumbered(&map)
    }

    /// The largest state identifier in use.
    pub fn max_state(&self) -> StateId {
        self.states.iter().next_back().copied().unwrap_or(0)
    }

    fn renumbered(&self, map: &BTreeMap<StateId, StateId>) -> Self {
        Machine {
            algebra: self.algebra.clone(),
            initial: map[&self.initial],
            states: self.states.iter().map(|s| map[s]).collect(),
            finals: self.finals.iter().map(|s| map[s]).collect(),
            moves: self
                .moves
                .iter()
                .map(|m| Move::new(map[&m.source], m.label.clone(), map[&m.target]))
                .collect(),
            name: self.name.clone(),
            state_names: self
                .state_names
                .iter()
                .map(|(s, n)| (map[s], n.clone()))
                .collect(),
        }
    }
}

/// States reachable from `start` following oriented moves.
fn reach<L: EdgeLabel>(
    start: StateId,
    moves: &BTreeSet<Move<L>>,
    orient: impl Fn(&Move<L>) -> (StateId, StateId),
) -> BTreeSet<StateId> {
    reach_all(&BTreeSet::from([start]), moves, orient)
}

fn reach_all<L: EdgeLabel>(
    start: &BTreeSet<StateId>,
    moves: &BTreeSet<Move<L>>,
    orient: impl Fn(&Move<L>) -> (StateId, StateId),
) -> BTreeSet<StateId> {
    let mut adjacency: BTreeMap<StateId, Vec<StateId>> = BTreeMap::new();
    for m in moves {
        let (from, to) = orient(m);
        adjacency.entry(from).or_default().push(to);
    }
    let mut seen = start.clone();
    let mut work: VecDeque<StateId> = start.iter().copied().collect();
    while let Some(s) = work.pop_front() {
        if let Some(succ) = adjacency.get(&s) {
            for &t in succ {
                if seen.insert(t) {
                    work.push_back(t);
                }
            }
        }
    }
    seen
}

impl<L: EdgeLabel> fmt::Display for Machine<L> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = &self.name {
            writeln!(f, "{name}:")?;
        }
        writeln!(f, "{} states, initial {}", self.states.len(), self.initial)?;
        write!(f, "final:")?;
        for s in &self.finals {
            write!(f, " {s}")?;
        }
        writeln!(f)?;
        for m in &self.moves {
            writeln!(f, "  {} -{}-> {}", m.source, m.label, m.target)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use armc_algebra::AlgebraRegistry;

    fn alg() -> Arc<Algebra> {
        AlgebraRegistry::new().algebra(["a", "b"].map(Symbol::new))
    }

    fn pred(s: &str) -> Guard {
        Guard::Pred(Predicate::of([s]))
    }

    #[test]
    fn test_construction_trims_unreachable_and_dead() {
        // 0 -a-> 1(final); 2 -b-> 1 unreachable; 1 -a-> 3 dead
        let m = Machine::new(
            alg(),
            0,
            [1],
            [
                Move::new(0, pred("a"), 1),
                Move::new(2, pred("b"), 1),
                Move::new(1, pred("a"), 3),
            ],
            None,
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(m.states().len(), 2);
        assert_eq!(m.move_count(), 1);
    }

    #[test]
    fn test_unsatisfiable_moves_are_dropped() {
        let m = Machine::new(
            alg(),
            0,
            [1],
            [
                Move::new(0, pred("a"), 1),
                Move::new(0, Guard::Pred(Predicate::none()), 1),
            ],
            None,
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(m.move_count(), 1);
    }

    #[test]
    fn test_foreign_symbol_rejected() {
        let err = Machine::new(
            alg(),
            0,
            [1],
            [Move::new(0, pred("z"), 1)],
            None,
            BTreeMap::new(),
        )
        .unwrap_err();
        assert!(matches!(err, AutomatonError::SymbolOutsideAlphabet { .. }));
    }

    #[test]
    fn test_duplicate_state_name_rejected() {
        let names: BTreeMap<StateId, String> =
            [(0, "q".to_string()), (1, "q".to_string())].into();
        let err = Machine::new(
            alg(),
            0,
            [1],
            [Move::new(0, pred("a"), 1)],
            None,
            names,
        )
        .unwrap_err();
        assert!(matches!(err, AutomatonError::InvalidStateNames { .. }));
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let m = Machine::new(
            alg(),
            5,
            [7, 9],
            [
                Move::new(5, pred("a"), 7),
                Move::new(7, pred("b"), 9),
                Move::new(5, pred("b"), 9),
            ],
            None,
            BTreeMap::new(),
        )
        .unwrap();
        let n = m.normalize(10);
        assert_eq!(n.initial(), 10);
        assert_eq!(n.finals().iter().copied().collect::<Vec<_>>(), vec![11, 12]);
        let again = n.normalize(10);
        assert_eq!(again.states(), n.states());
        assert_eq!(
            again.moves().cloned().collect::<Vec<_>>(),
            n.moves().cloned().collect::<Vec<_>>()
        );
    }
}
