//! The abstract-regular-model-checking driver.
//!
//! Computes overapproximations of the configurations reachable from an
//! initial automaton under a transducer, collapsing each iterate through a
//! state abstraction, until either the abstract reachable set stabilises
//! away from the bad set (the property holds), a concrete error path is
//! replayed back to the initial set (a real counterexample), or a spurious
//! abstract path triggers refinement and another round.

pub mod counterexample;
pub mod driver;
pub mod sink;
pub mod stopwatch;

use armc_abstraction::AbstractionError;
use armc_automata::AutomatonError;
use std::time::Duration;
use thiserror::Error;

pub use armc_abstraction::Direction;
pub use counterexample::{Counterexample, TraceStep};
pub use driver::{VerifySession, VerifySettings};
pub use sink::{NullSink, ProgressSink};
pub use stopwatch::Stopwatch;

/// A verification failure. Outcomes (holds, violated) are not errors.
#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("initial property violation")]
    InitialViolation,

    #[error("timeout after {0:?}")]
    Timeout(Duration),

    #[error(transparent)]
    Automaton(#[from] AutomatonError),

    #[error(transparent)]
    Abstraction(#[from] AbstractionError),

    #[error("output error: {0}")]
    Sink(#[from] std::io::Error),
}

pub type VerifyResult<T> = Result<T, VerifyError>;

/// The result of a verification run.
#[derive(Debug)]
pub enum VerifyOutcome {
    /// The abstract reachable set reached a fixed point disjoint from the
    /// bad configurations.
    Holds {
        /// Completed refinement rounds.
        loops: usize,
        /// Transducer applications in the final round.
        iterations: usize,
    },
    /// A concrete error path exists.
    Violated {
        counterexample: Counterexample,
        loops: usize,
    },
}
