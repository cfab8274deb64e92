//! Symbolic finite automata (SFA) and transducers (SFT).
//!
//! Both share one machine shape: integer states, a set of moves whose labels
//! come from the predicate or label algebra, and a reference to the shared
//! algebra owning the alphabet. Machines are immutable values; every
//! operation returns a fresh machine with unreachable and dead states
//! removed.

pub mod error;
pub mod machine;
pub mod sfa;
pub mod sft;

pub use error::{AutomatonError, AutomatonResult};
pub use machine::{EdgeLabel, Guard, Machine, Move, StateId};
pub use sfa::Sfa;
pub use sft::Sft;
