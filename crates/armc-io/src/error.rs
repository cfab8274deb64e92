//! Configuration and parser error types.

use armc_automata::AutomatonError;
use thiserror::Error;

/// A configuration file problem. All are fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read '{path}': {message}")]
    Read { path: String, message: String },

    #[error("configuration line {line}: expected KEY = value")]
    Syntax { line: usize },

    #[error("unknown property '{key}'")]
    UnknownKey { key: String },

    #[error("duplicate property '{key}'")]
    DuplicateKey { key: String },

    #[error("missing property '{key}'")]
    MissingKey { key: &'static str },

    #[error("bad value '{value}' for '{key}': expected {expected}")]
    BadValue {
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("exactly one of PREDICATE_LANGUAGES and FINITE_LENGTH_LANGUAGES must be selected")]
    AbstractionSelection,
}

/// An automaton file problem.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("unknown automaton format for '{0}'")]
    UnknownFormat(String),

    #[error("cannot read '{path}': {message}")]
    Read { path: String, message: String },

    #[error("{format} line {line}: {message}")]
    Syntax {
        format: &'static str,
        line: usize,
        message: String,
    },

    #[error("duplicate state '{0}'")]
    DuplicateState(String),

    #[error("duplicate symbol declaration '{0}'")]
    DuplicateDeclaration(String),

    #[error("unknown final state '{0}'")]
    UnknownFinalState(String),

    #[error("missing start symbol")]
    MissingStartSymbol,

    #[error("unsupported tree-automaton arity {arity} for '{symbol}'")]
    UnsupportedArity { symbol: String, arity: usize },

    #[error("invalid identity label '{0}'")]
    InvalidIdentityLabel(String),

    #[error("expected {expected}")]
    WrongKind { expected: &'static str },

    #[error("mixed automaton and transducer labels")]
    MixedLabels,

    #[error(transparent)]
    Automaton(#[from] AutomatonError),
}

pub type ParseResult<T> = Result<T, ParseError>;
