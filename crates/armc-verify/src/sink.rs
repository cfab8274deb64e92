//! Progress reporting hooks.

use crate::counterexample::Counterexample;
use armc_abstraction::AbstractionSnapshot;
use armc_automata::{Sfa, Sft};
use std::io;

/// Receives intermediate automata as verification progresses.
///
/// Implementations print or serialise; the driver pauses its stopwatch
/// around every call, so sink time never counts towards the timeout.
pub trait ProgressSink {
    /// The rebound inputs, once, before the first round.
    fn on_inputs(&mut self, _init: &Sfa, _bad: &Sfa, _tau: &Sft) -> io::Result<()> {
        Ok(())
    }

    /// A refinement round begins.
    fn on_loop_begin(&mut self, _loop_index: usize) -> io::Result<()> {
        Ok(())
    }

    /// One forward step: the iterate and its abstraction.
    fn on_step(&mut self, _index: usize, _m: &Sfa, _m_abs: &Sfa) -> io::Result<()> {
        Ok(())
    }

    /// One replayed witness.
    fn on_witness(&mut self, _index: usize, _x: &Sfa) -> io::Result<()> {
        Ok(())
    }

    /// The abstraction contents after a refinement.
    fn on_abstraction(&mut self, _snapshot: &AbstractionSnapshot) -> io::Result<()> {
        Ok(())
    }

    /// A real counterexample was assembled.
    fn on_counterexample(&mut self, _counterexample: &Counterexample) -> io::Result<()> {
        Ok(())
    }
}

/// Discards everything.
pub struct NullSink;

impl ProgressSink for NullSink {}
