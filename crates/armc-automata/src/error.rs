//! Automaton error types.

use crate::machine::StateId;
use armc_algebra::Symbol;
use thiserror::Error;

/// An error raised by machine construction or a machine operation.
#[derive(Debug, Error)]
pub enum AutomatonError {
    #[error("transition uses symbol '{symbol}' outside the alphabet")]
    SymbolOutsideAlphabet { symbol: Symbol },

    #[error("invalid state-name map: {reason}")]
    InvalidStateNames { reason: String },

    #[error("state {state} is not in the state set")]
    StateNotInStates { state: StateId },

    #[error("incompatible alphabets")]
    IncompatibleAlphabets,

    #[error("union of zero transducers")]
    EmptyUnion,
}

pub type AutomatonResult<T> = Result<T, AutomatonError>;
