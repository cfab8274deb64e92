//! The abstraction-refinement loop.

use crate::counterexample::{Counterexample, TraceStep};
use crate::sink::ProgressSink;
use crate::stopwatch::Stopwatch;
use crate::{VerifyError, VerifyOutcome, VerifyResult};
use armc_abstraction::{Abstraction, Direction};
use armc_algebra::AlgebraRegistry;
use armc_automata::{Sfa, Sft};
use std::time::Duration;
use tracing::{debug, info};

/// Driver settings.
#[derive(Debug, Clone)]
pub struct VerifySettings {
    /// Forward starts from the initial set; backward swaps the roles of the
    /// initial and bad sets and inverts the transducer.
    pub direction: Direction,
    /// Compute-time budget; `None` disables the check.
    pub timeout: Option<Duration>,
}

impl Default for VerifySettings {
    fn default() -> Self {
        VerifySettings {
            direction: Direction::Forward,
            timeout: None,
        }
    }
}

/// What one refinement round concluded.
enum StepOutcome {
    Holds { iterations: usize },
    Violated(Counterexample),
    Spurious,
}

/// A prepared verification problem: all inputs rebound to one merged
/// alphabet, the transducer family unioned and inverted, the initial
/// disjointness of initial and bad sets established.
pub struct VerifySession {
    init: Sfa,
    bad: Sfa,
    taus: Vec<Sft>,
    tau: Sft,
    tau_inv: Sft,
    settings: VerifySettings,
}

impl VerifySession {
    pub fn new(
        registry: &mut AlgebraRegistry,
        init: Sfa,
        bad: Sfa,
        taus: Vec<Sft>,
        settings: VerifySettings,
    ) -> VerifyResult<Self> {
        let mut algebras = vec![init.algebra(), bad.algebra()];
        algebras.extend(taus.iter().map(|t| t.algebra()));
        let merged = registry.merged(&algebras);

        let init = init.rebind(merged.clone())?;
        let bad = bad.rebind(merged.clone())?;
        let taus: Vec<Sft> = taus
            .iter()
            .map(|t| t.rebind(merged.clone()))
            .collect::<Result<_, _>>()?;
        let tau = Sft::union(&taus)?;
        let tau_inv = tau.invert()?;

        if !init.product_is_empty(&bad)? {
            return Err(VerifyError::InitialViolation);
        }

        let session = match settings.direction {
            Direction::Forward => VerifySession {
                init,
                bad,
                taus,
                tau,
                tau_inv,
                settings,
            },
            // backward verification swaps the endpoints and runs the inverse
            // relation forwards
            Direction::Backward => VerifySession {
                init: bad,
                bad: init,
                taus,
                tau: tau_inv.clone(),
                tau_inv: tau,
                settings,
            },
        };
        Ok(session)
    }

    /// The initial set as verification sees it (after a backward swap).
    pub fn init(&self) -> &Sfa {
        &self.init
    }

    /// The bad set as verification sees it.
    pub fn bad(&self) -> &Sfa {
        &self.bad
    }

    /// The unioned one-step transducer.
    pub fn tau(&self) -> &Sft {
        &self.tau
    }

    pub fn tau_inverse(&self) -> &Sft {
        &self.tau_inv
    }

    /// The individual rebound transducers, for abstraction seeding.
    pub fn transducers(&self) -> &[Sft] {
        &self.taus
    }

    /// Run the outer refinement loop to a verdict.
    pub fn run(
        &self,
        abstraction: &mut dyn Abstraction,
        sink: &mut dyn ProgressSink,
    ) -> VerifyResult<VerifyOutcome> {
        let mut watch = Stopwatch::started();
        paused(&mut watch, sink, |s| s.on_inputs(&self.init, &self.bad, &self.tau))?;

        let mut loops = 0;
        loop {
            match self.refinement_round(abstraction, sink, &mut watch, loops)? {
                StepOutcome::Holds { iterations } => {
                    info!(loops, iterations, "fixed point reached");
                    return Ok(VerifyOutcome::Holds { loops, iterations });
                }
                StepOutcome::Violated(counterexample) => {
                    info!(loops, length = counterexample.len(), "counterexample found");
                    paused(&mut watch, sink, |s| s.on_counterexample(&counterexample))?;
                    return Ok(VerifyOutcome::Violated {
                        counterexample,
                        loops,
                    });
                }
                StepOutcome::Spurious => loops += 1,
            }
        }
    }

    /// One round: the forward phase, then the replay on a bad hit.
    fn refinement_round(
        &self,
        abstraction: &mut dyn Abstraction,
        sink: &mut dyn ProgressSink,
        watch: &mut Stopwatch,
        loop_index: usize,
    ) -> VerifyResult<StepOutcome> {
        paused(watch, sink, |s| s.on_loop_begin(loop_index))?;

        // forward phase
        let mut sequence: Vec<(Sfa, Sfa)> = Vec::new();
        let mut m = self.init.clone();
        let (x_top, last_m) = loop {
            let i = sequence.len();
            if i > 0 && !m.product_is_empty(&self.bad)? {
                debug!(step = i, "bad set hit, replaying");
                let x = m.product(&self.bad)?.determinize()?.minimize()?;
                paused(watch, sink, |s| s.on_witness(i, &x))?;
                break (x, m);
            }
            let m_abs = abstraction.collapse(&m)?.determinize()?.minimize()?;
            if i > 0 && m_abs.equivalent(&sequence[i - 1].1)? {
                return Ok(StepOutcome::Holds { iterations: i });
            }
            self.check_timeout(watch)?;
            paused(watch, sink, |s| s.on_step(i, &m, &m_abs))?;
            debug!(
                step = i,
                states = m.state_count(),
                abstract_states = m_abs.state_count(),
                "forward step"
            );
            sequence.push((m, m_abs.clone()));
            m = self.tau.apply(&m_abs)?.determinize()?.minimize()?;
        };

        // replay phase: walk the recorded iterates from the most recent one
        let top = sequence.len();
        let mut witnesses = vec![x_top];
        let mut spurious_at = None;
        for j in (0..top).rev() {
            let (m_j, m_abs_j) = &sequence[j];
            let x_prev = &witnesses[witnesses.len() - 1];
            let x = self
                .tau_inv
                .apply(x_prev)?
                .product(m_abs_j)?
                .determinize()?
                .minimize()?;
            paused(watch, sink, |s| s.on_witness(j, &x))?;
            let disjoint = x.product_is_empty(m_j)?;
            witnesses.push(x);
            if disjoint {
                spurious_at = Some(j);
                break;
            }
        }

        match spurious_at {
            Some(j) => {
                debug!(step = j, "witness is spurious, refining");
                let x = &witnesses[witnesses.len() - 1];
                abstraction.refine(&sequence[j].0, x)?;
                paused(watch, sink, |s| s.on_abstraction(&abstraction.snapshot()))?;
                Ok(StepOutcome::Spurious)
            }
            None => {
                // witnesses run from X_top down to X_0; flip to forward order
                witnesses.reverse();
                let mut steps: Vec<TraceStep> = sequence
                    .into_iter()
                    .zip(witnesses.iter())
                    .map(|((reachable, abstracted), witness)| TraceStep {
                        reachable,
                        abstracted: Some(abstracted),
                        witness: witness.clone(),
                    })
                    .collect();
                steps.push(TraceStep {
                    reachable: last_m,
                    abstracted: None,
                    witness: witnesses[witnesses.len() - 1].clone(),
                });
                Ok(StepOutcome::Violated(Counterexample { steps }))
            }
        }
    }

    fn check_timeout(&self, watch: &Stopwatch) -> VerifyResult<()> {
        if let Some(limit) = self.settings.timeout {
            if watch.elapsed() > limit {
                return Err(VerifyError::Timeout(limit));
            }
        }
        Ok(())
    }
}

/// Run a sink call with the stopwatch paused, so reporting time never
/// counts towards the timeout.
fn paused<T>(
    watch: &mut Stopwatch,
    sink: &mut dyn ProgressSink,
    call: impl FnOnce(&mut dyn ProgressSink) -> std::io::Result<T>,
) -> VerifyResult<T> {
    watch.pause();
    let result = call(sink);
    watch.resume();
    Ok(result?)
}
