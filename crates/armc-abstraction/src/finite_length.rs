//! Abstraction by bounded state languages.

use crate::{Abstraction, AbstractionResult, AbstractionSnapshot, Direction};
use armc_automata::{AutomatonResult, Sfa, StateId};
use std::collections::BTreeMap;
use tracing::debug;

/// How much the bound grows on refinement.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundIncrement {
    /// Grow by one.
    One,
    /// Grow by the state count of the machine being collapsed.
    MachineSize,
    /// Grow by the state count of the spurious witness.
    WitnessSize,
}

/// Finite-length-language abstraction.
///
/// Two states are equivalent when their state languages (or trace languages,
/// the prefix/suffix closures) agree on all words up to the current bound.
/// Refinement only ever increases the bound, so the equivalence can only get
/// finer and previously excluded witnesses stay excluded.
pub struct FiniteLengthAbstraction {
    direction: Direction,
    trace_languages: bool,
    bound: usize,
    increment: BoundIncrement,
    halve_increment: bool,
}

impl FiniteLengthAbstraction {
    pub fn new(
        direction: Direction,
        trace_languages: bool,
        initial_bound: usize,
        increment: BoundIncrement,
        halve_increment: bool,
    ) -> Self {
        FiniteLengthAbstraction {
            direction,
            trace_languages,
            bound: initial_bound.max(1),
            increment,
            halve_increment,
        }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// The bounded comparison language of one state.
    fn state_language(&self, m: &Sfa, q: StateId) -> AutomatonResult<Sfa> {
        let language = match (self.direction, self.trace_languages) {
            (Direction::Forward, false) => m.forward_state_language(q)?,
            (Direction::Forward, true) => m.forward_trace_language(q)?,
            (Direction::Backward, false) => m.backward_state_language(q)?,
            (Direction::Backward, true) => m.backward_trace_language(q)?,
        };
        language.bounded_language(self.bound)
    }
}

impl Abstraction for FiniteLengthAbstraction {
    fn collapse(&self, m: &Sfa) -> AbstractionResult<Sfa> {
        // one bounded language per state, compared pairwise during the
        // first-fit partition
        let mut languages: BTreeMap<StateId, Sfa> = BTreeMap::new();
        for &s in m.states() {
            languages.insert(s, self.state_language(m, s)?);
        }
        m.collapse(|_, a, b| languages[&a].equivalent(&languages[&b]))
            .map_err(Into::into)
    }

    fn states_equivalent(&self, m: &Sfa, a: StateId, b: StateId) -> AbstractionResult<bool> {
        let la = self.state_language(m, a)?;
        let lb = self.state_language(m, b)?;
        Ok(la.equivalent(&lb)?)
    }

    fn refine(&mut self, m: &Sfa, x: &Sfa) -> AbstractionResult<()> {
        let mut step = match self.increment {
            BoundIncrement::One => 1,
            BoundIncrement::MachineSize => m.state_count(),
            BoundIncrement::WitnessSize => x.state_count(),
        };
        if self.halve_increment {
            step = step.div_ceil(2);
        }
        self.bound += step.max(1);
        debug!(bound = self.bound, "bound increased");
        Ok(())
    }

    fn snapshot(&self) -> AbstractionSnapshot {
        AbstractionSnapshot::Bound(self.bound)
    }
}
