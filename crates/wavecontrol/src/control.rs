//! The exact controllability solver.
//!
//! A state on a time-periodic orbit has zero control energy,
//! so finding one amounts to solving the normal equations `DᵀDx = Dᵀb`
//! of the period map, which conjugate gradients do
//! using [`cost_gradient`] as the operator.

use crate::{cost_gradient, ForwardSolver, SourceTerms, StepContext, WaveState};

/// Convergence history of a controllability run.
///
/// All three sequences have one entry per iteration plus one for the initial guess.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ControlTrace {
    /// Control energy of the current estimate.
    pub control_energy: Vec<f64>,
    /// Norm of the residual `Dᵀb − DᵀDx`.
    pub residual_norm: Vec<f64>,
    /// `DᵀDw · w'` between the previous search direction `w` and the new one `w'`.
    ///
    /// Zero in exact arithmetic; large values indicate
    /// the gradient is not symmetric in the current discretization.
    /// The first entry, with no previous direction, is zero.
    pub conjugacy: Vec<f64>,
}

impl ControlTrace {
    fn record(&mut self, control_energy: f64, residual_norm: f64, conjugacy: f64) {
        self.control_energy.push(control_energy);
        self.residual_norm.push(residual_norm);
        self.conjugacy.push(conjugacy);
    }

    /// Number of recorded entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.control_energy.len()
    }

    /// Check whether nothing has been recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.control_energy.is_empty()
    }
}

/// Result of [`solve`].
#[derive(Clone, Debug)]
pub struct ControlSolution {
    /// The best estimate of a periodic state.
    pub state: WaveState,
    /// Convergence history.
    pub trace: ControlTrace,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the residual reached the threshold.
    ///
    /// Running out of iterations is not an error;
    /// the estimate is returned either way.
    pub converged: bool,
}

/// Find a state that returns to itself after one period of forward simulation,
/// starting from `initial`.
///
/// Iterates until the squared residual relative to its initial value
/// drops below the square of
/// [`ControlParams::threshold`][crate::ControlParams::threshold]
/// or [`ControlParams::max_iters`][crate::ControlParams::max_iters] is reached.
/// The iteration also stops early if the search direction degenerates
/// so that the step length would not be finite.
pub fn solve(ctx: &StepContext, initial: WaveState) -> ControlSolution {
    let params = ctx.params();
    let threshold_sq = params.threshold.powi(2);

    let mut guess = initial;
    let first = cost_gradient(ctx, &guess, SourceTerms::Included);
    // the defect is affine in the guess,
    // so it's updated alongside the guess instead of simulated again
    let mut defect = first.forward_diff;
    let mut residual = -first.gradient;
    let mut search_dir = residual.clone();
    let mut resid_sq = residual.norm_squared();
    let initial_resid_sq = resid_sq;

    let mut trace = ControlTrace::default();
    trace.record(defect.energy(), resid_sq.sqrt(), 0.0);
    log::info!(
        "Starting from control energy {:.6e}, residual {:.6e}",
        defect.energy(),
        resid_sq.sqrt()
    );

    if initial_resid_sq == 0.0 {
        log::info!("Initial guess is already a stationary point");
        return ControlSolution {
            state: guess,
            trace,
            iterations: 0,
            converged: true,
        };
    }

    let mut iterations = 0;
    let mut converged = false;
    while iterations < params.max_iters {
        let a_w = cost_gradient(ctx, &search_dir, SourceTerms::Excluded);
        let curvature = a_w.gradient.dot(&search_dir);
        if !curvature.is_finite() || curvature.abs() < f64::MIN_POSITIVE {
            log::warn!(
                "Search direction degenerated (curvature {curvature:e}) after {iterations} iterations"
            );
            break;
        }

        let step_len = resid_sq / curvature;
        guess.add_scaled(step_len, &search_dir);
        defect.add_scaled(step_len, &a_w.forward_diff);
        residual.add_scaled(-step_len, &a_w.gradient);

        let new_resid_sq = residual.norm_squared();
        let beta = new_resid_sq / resid_sq;
        search_dir *= beta;
        search_dir += &residual;
        resid_sq = new_resid_sq;
        iterations += 1;

        let conjugacy = a_w.gradient.dot(&search_dir);
        trace.record(defect.energy(), resid_sq.sqrt(), conjugacy);
        log::debug!(
            "Iteration {iterations}: control energy {:.6e}, relative residual {:.6e}, conjugacy {:.3e}",
            defect.energy(),
            (resid_sq / initial_resid_sq).sqrt(),
            conjugacy,
        );

        if resid_sq / initial_resid_sq < threshold_sq {
            converged = true;
            break;
        }
    }

    if converged {
        log::info!(
            "Converged in {iterations} iterations, control energy {:.6e}",
            defect.energy()
        );
    } else {
        log::info!(
            "Stopped after {iterations} iterations without converging, control energy {:.6e}",
            defect.energy()
        );
    }

    ControlSolution {
        state: guess,
        trace,
        iterations,
        converged,
    }
}

/// Simulate `periods` consecutive periods forward from `seed`
/// and record the control energy of each,
/// i.e. how far each period's end state is from its start.
///
/// Plain forward simulation also approaches the periodic solution
/// as transients leave through the absorbing boundary;
/// this gives a baseline to compare the conjugate gradient history against.
pub fn reference_forward_energies(ctx: &StepContext, seed: &WaveState, periods: usize) -> Vec<f64> {
    let mut solver = ForwardSolver::new(ctx, seed.clone());
    let mut period_start = seed.clone();
    let mut energies = Vec::with_capacity(periods);
    for _ in 0..periods {
        solver.run_with(ctx.steps_per_period(), |_| 1.0);
        energies.push((solver.state() - &period_start).energy());
        period_start.clone_from(solver.state());
    }
    energies
}
