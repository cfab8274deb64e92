//! State-collapsing abstractions for regular model checking.
//!
//! An abstraction quotients an automaton by an equivalence on states, which
//! can only grow the language; refinement strengthens the equivalence until
//! a given counterexample language no longer survives the quotient. Two
//! strategies are provided: equivalence with respect to a growing family of
//! predicate automata, and equivalence of bounded state languages.

pub mod finite_length;
pub mod predicate_langs;

use armc_automata::{AutomatonError, Sfa, StateId};
use thiserror::Error;

pub use finite_length::{BoundIncrement, FiniteLengthAbstraction};
pub use predicate_langs::{PredicateAbstraction, RefinementHeuristic};

/// An abstraction error; today always a propagated automaton error.
#[derive(Debug, Error)]
pub enum AbstractionError {
    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

pub type AbstractionResult<T> = Result<T, AbstractionError>;

/// Which way state languages are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// What an abstraction currently consists of, for dumps and logging.
#[derive(Debug, Clone)]
pub enum AbstractionSnapshot {
    /// The predicate automata of a predicate-language abstraction.
    PredicateAutomata(Vec<Sfa>),
    /// The current bound of a finite-length abstraction.
    Bound(usize),
}

/// A language-overapproximating quotient with refinement.
pub trait Abstraction {
    /// Quotient `m` by the abstraction's state equivalence;
    /// `L(m) ⊆ L(collapse(m))` always holds.
    fn collapse(&self, m: &Sfa) -> AbstractionResult<Sfa>;

    /// The equivalence used by `collapse`.
    fn states_equivalent(&self, m: &Sfa, a: StateId, b: StateId) -> AbstractionResult<bool>;

    /// Strengthen the abstraction so the spurious witness `x` no longer
    /// survives the quotient of `m`. Refinement is monotonic: previously
    /// excluded witnesses stay excluded.
    fn refine(&mut self, m: &Sfa, x: &Sfa) -> AbstractionResult<()>;

    /// Current contents, for serialisation.
    fn snapshot(&self) -> AbstractionSnapshot;
}
