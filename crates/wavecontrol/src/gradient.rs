//! The control energy functional and its gradient.
//!
//! The control energy of a state `x` is `½‖Fᴺx − x‖²`,
//! where `F` is one forward step and `N` the number of steps per period.
//! Writing the period map as `Fᴺx − x = Dx − b`
//! with `D` linear and `b` the contribution of the incoming wave,
//! the gradient is `Dᵀ(Dx − b)`, computed with one forward and one backward run.

use crate::{
    solver::apply_boundary_transpose, AdjointBoundary, BackwardSolver, ForwardSolver, StepContext,
    WaveState,
};

/// Whether the incoming wave is included in a forward run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SourceTerms {
    /// Simulate with the incoming wave, giving the affine map `Dx − b`.
    Included,
    /// Simulate without sources, giving the linear map `Dx`.
    Excluded,
}

impl SourceTerms {
    fn scaling(self) -> f64 {
        match self {
            Self::Included => 1.0,
            Self::Excluded => 0.0,
        }
    }
}

/// Result of [`cost_gradient`].
#[derive(Clone, Debug)]
pub struct GradientResult {
    /// Gradient of the control energy.
    pub gradient: WaveState,
    /// Difference between the state after one period and the initial state.
    pub forward_diff: WaveState,
}

impl GradientResult {
    /// The control energy of the state the gradient was computed for.
    #[inline]
    pub fn energy(&self) -> f64 {
        self.forward_diff.energy()
    }
}

/// Simulate one period from `state` with the incoming wave
/// and return the energy of the difference to the start.
pub fn control_energy(ctx: &StepContext, state: &WaveState) -> f64 {
    let mut solver = ForwardSolver::new(ctx, state.clone());
    solver.run_with(ctx.steps_per_period(), |_| 1.0);
    (solver.into_state() - state).energy()
}

/// Compute the gradient of the control energy at `initial`.
///
/// With [`SourceTerms::Excluded`] this evaluates the linear operator `DᵀD`
/// of the normal equations that conjugate gradients solve.
pub fn cost_gradient(ctx: &StepContext, initial: &WaveState, sources: SourceTerms) -> GradientResult {
    let steps = ctx.steps_per_period();
    let scaling = sources.scaling();

    let mut fwd = ForwardSolver::new(ctx, initial.clone());
    fwd.run_with(steps, |_| scaling);
    let forward_diff = fwd.into_state() - initial;

    // the last forward step ends in the boundary conditions,
    // so in the exact adjoint their transpose comes first
    let mut adjoint_source = forward_diff.clone();
    if ctx.params().adjoint_boundary == AdjointBoundary::Exact {
        apply_boundary_transpose(ctx, &mut adjoint_source);
    }

    let bwd_flux = -adjoint_source.flux;
    let mut bwd_pressure = ctx.q_step_t() * &bwd_flux;
    bwd_pressure -= &adjoint_source.pressure;

    // flux lags pressure by half a step,
    // so the first and last half steps are handled outside the loop
    let mut bwd = BackwardSolver::new(
        ctx,
        WaveState {
            pressure: bwd_pressure,
            flux: bwd_flux,
        },
    );
    bwd.run(steps - 1);
    let bwd = bwd.into_state();

    let mut final_flux = -bwd.flux;
    final_flux -= &(ctx.p_step_t() * &bwd.pressure);
    let final_bwd = WaveState {
        pressure: -bwd.pressure,
        flux: final_flux,
    };

    GradientResult {
        gradient: final_bwd - &forward_diff,
        forward_diff,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ControlParams;
    use approx::assert_relative_eq;
    use std::f64::consts::TAU;
    use wavecontrol_dec::lattice::square_with_hole;

    fn pseudo_random_state(ctx: &StepContext, seed: f64) -> WaveState {
        let mut state = WaveState::zeros(ctx.mesh());
        for (i, p) in state.pressure.values.iter_mut().enumerate() {
            *p = (seed * (i as f64 + 1.0)).sin();
        }
        for (i, q) in state.flux.values.iter_mut().enumerate() {
            *q = (seed * 1.3 * (i as f64 + 2.0)).cos();
        }
        state
    }

    /// `Dx` for the homogeneous period map.
    fn period_defect(ctx: &StepContext, x: &WaveState) -> WaveState {
        let mut solver = ForwardSolver::new(ctx, x.clone());
        solver.run_with(ctx.steps_per_period(), |_| 0.0);
        solver.into_state() - x
    }

    #[test]
    fn gradient_is_normal_operator() {
        let mesh = square_with_hole(1.0, 0.3, 0.3).expect("valid lattice");
        // periods of 1, 2 and 5 steps
        for (omega, dt) in [(TAU, 1.0), (TAU, 0.5), (TAU / 0.5, 0.1)] {
            let params = ControlParams {
                angular_velocity: omega,
                dt,
                ..Default::default()
            };
            let ctx = StepContext::new(&mesh, params).expect("valid setup");
            let x = pseudo_random_state(&ctx, 0.77);
            let y = pseudo_random_state(&ctx, 1.91);

            let grad_x = cost_gradient(&ctx, &x, SourceTerms::Excluded);
            let grad_y = cost_gradient(&ctx, &y, SourceTerms::Excluded);
            let (dx, dy) = (period_defect(&ctx, &x), period_defect(&ctx, &y));

            // ⟨DᵀDx, y⟩ = ⟨Dx, Dy⟩ = ⟨x, DᵀDy⟩, up to rounding relative to the magnitudes involved
            let lhs = grad_x.gradient.dot(&y);
            let rhs = dx.dot(&dy);
            let scale = (grad_x.gradient.norm_squared() * y.norm_squared()).sqrt()
                + (dx.norm_squared() * dy.norm_squared()).sqrt();
            assert!((lhs - rhs).abs() <= 1e-10 * scale, "{lhs} != {rhs}");
            let sym = x.dot(&grad_y.gradient);
            assert!((lhs - sym).abs() <= 1e-10 * scale, "{lhs} != {sym}");

            assert_relative_eq!(grad_x.energy(), dx.energy(), max_relative = 1e-12);
        }
    }

    #[test]
    fn energy_of_gradient_result_matches_control_energy() {
        let mesh = square_with_hole(1.0, 0.3, 0.3).expect("valid lattice");
        let params = ControlParams {
            dt: 0.05,
            ..Default::default()
        };
        let ctx = StepContext::new(&mesh, params).expect("valid setup");
        let x = pseudo_random_state(&ctx, 0.42);

        let with_sources = cost_gradient(&ctx, &x, SourceTerms::Included);
        assert_relative_eq!(with_sources.energy(), control_energy(&ctx, &x), max_relative = 1e-12);

        // the source terms add a constant to the defect
        let without = cost_gradient(&ctx, &x, SourceTerms::Excluded);
        let zero = WaveState::zeros(&mesh);
        let source_only = cost_gradient(&ctx, &zero, SourceTerms::Included);
        let combined = &without.forward_diff + &source_only.forward_diff;
        assert!(
            (&combined - &with_sources.forward_diff).norm_squared()
                <= 1e-20 * with_sources.forward_diff.norm_squared()
        );
    }

    #[test]
    fn time_reversed_boundary_matches_exact_without_absorption() {
        let mut mesh = square_with_hole(1.0, 0.3, 0.3).expect("valid lattice");
        mesh.store_subset::<1>(wavecontrol_dec::OUTER_BOUNDARY, wavecontrol_dec::Subset::new_empty());
        let params = ControlParams {
            dt: 0.05,
            ..Default::default()
        };
        let exact_ctx = StepContext::new(&mesh, params).expect("valid setup");
        let reversed_ctx = StepContext::new(
            &mesh,
            ControlParams {
                adjoint_boundary: AdjointBoundary::TimeReversed,
                ..params
            },
        )
        .expect("valid setup");

        // states in the range of the forward step carry no scatterer flux
        let mut x = pseudo_random_state(&exact_ctx, 0.9);
        for src in exact_ctx.inner_edges() {
            x.flux.values[src.edge] = 0.0;
        }
        let exact = cost_gradient(&exact_ctx, &x, SourceTerms::Excluded);
        let reversed = cost_gradient(&reversed_ctx, &x, SourceTerms::Excluded);
        assert_eq!(exact.gradient, reversed.gradient);
    }
}
