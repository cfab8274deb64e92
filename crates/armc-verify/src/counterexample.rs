//! Counterexample traces.

use armc_automata::Sfa;

/// One step of a counterexample trace.
#[derive(Debug, Clone)]
pub struct TraceStep {
    /// The reachable-set iterate `Mᵢ`.
    pub reachable: Sfa,
    /// Its abstraction `Mᵢ^α`; absent on the final step, which broke out of
    /// the forward phase before collapsing.
    pub abstracted: Option<Sfa>,
    /// The replayed witness `Xᵢ ⊆ L(Mᵢ)` connecting the bad set back to the
    /// initial configurations.
    pub witness: Sfa,
}

/// A concrete error path: the iterates `M₀ … Mₗ` with their abstractions and
/// the replayed witnesses `X₀ … Xₗ`, in forward order.
#[derive(Debug, Clone)]
pub struct Counterexample {
    pub steps: Vec<TraceStep>,
}

impl Counterexample {
    /// Number of steps, counting both endpoints.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}
