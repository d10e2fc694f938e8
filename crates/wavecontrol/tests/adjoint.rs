//! The gradient must be the exact discrete adjoint of the forward simulation,
//! otherwise conjugate gradients lose their convergence guarantees.

use proptest::prelude::*;
use std::f64::consts::TAU;
use wavecontrol::{cost_gradient, ControlParams, ForwardSolver, SourceTerms, StepContext, WaveState};
use wavecontrol_dec::{lattice::square_with_hole, SimplicialMesh};

fn mesh() -> SimplicialMesh {
    square_with_hole(1.0, 0.3, 0.4).expect("valid lattice")
}

/// Parameters giving a period of exactly `steps` timesteps.
fn params_with_steps(steps: usize) -> ControlParams {
    ControlParams {
        angular_velocity: TAU,
        dt: 1.0 / steps as f64,
        ..Default::default()
    }
}

fn arb_state() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
    let mesh = mesh();
    (
        prop::collection::vec(-1.0..1.0_f64, mesh.simplex_count::<2>()),
        prop::collection::vec(-1.0..1.0_f64, mesh.simplex_count::<1>()),
    )
}

fn to_state(mesh: &SimplicialMesh, (pressure, flux): &(Vec<f64>, Vec<f64>)) -> WaveState {
    let mut state = WaveState::zeros(mesh);
    state.pressure.values.copy_from_slice(pressure);
    state.flux.values.copy_from_slice(flux);
    state
}

fn homogeneous_defect(ctx: &StepContext, x: &WaveState) -> WaveState {
    let mut solver = ForwardSolver::new(ctx, x.clone());
    solver.run_with(ctx.steps_per_period(), |_| 0.0);
    solver.into_state() - x
}

/// Check `⟨DᵀDx, y⟩ = ⟨Dx, Dy⟩ = ⟨x, DᵀDy⟩`
/// with a tolerance relative to the sizes of the terms.
fn check_normal_operator(steps: usize, x: &(Vec<f64>, Vec<f64>), y: &(Vec<f64>, Vec<f64>)) {
    let mesh = mesh();
    let ctx = StepContext::new(&mesh, params_with_steps(steps)).expect("valid setup");
    assert_eq!(ctx.steps_per_period(), steps);
    let (x, y) = (to_state(&mesh, x), to_state(&mesh, y));

    let grad_x = cost_gradient(&ctx, &x, SourceTerms::Excluded).gradient;
    let grad_y = cost_gradient(&ctx, &y, SourceTerms::Excluded).gradient;
    let (dx, dy) = (homogeneous_defect(&ctx, &x), homogeneous_defect(&ctx, &y));

    let scale = (grad_x.norm_squared() * y.norm_squared()).sqrt()
        + (grad_y.norm_squared() * x.norm_squared()).sqrt()
        + (dx.norm_squared() * dy.norm_squared()).sqrt();
    let (gx_y, dx_dy, x_gy) = (grad_x.dot(&y), dx.dot(&dy), x.dot(&grad_y));
    assert!(
        (gx_y - dx_dy).abs() <= 1e-10 * scale,
        "<grad x, y> = {gx_y}, <Dx, Dy> = {dx_dy}"
    );
    assert!(
        (gx_y - x_gy).abs() <= 1e-10 * scale,
        "<grad x, y> = {gx_y}, <x, grad y> = {x_gy}"
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn single_step_period_is_adjoint(x in arb_state(), y in arb_state()) {
        // no backward steps at all, only the start and end transforms
        check_normal_operator(1, &x, &y);
    }

    #[test]
    fn two_step_period_is_adjoint(x in arb_state(), y in arb_state()) {
        check_normal_operator(2, &x, &y);
    }

    #[test]
    fn multi_step_period_is_adjoint(x in arb_state(), y in arb_state()) {
        check_normal_operator(12, &x, &y);
    }

    #[test]
    fn gradient_curvature_is_defect_norm(x in arb_state()) {
        // ⟨DᵀDx, x⟩ = ‖Dx‖² ≥ 0
        let mesh = mesh();
        let ctx = StepContext::new(&mesh, params_with_steps(6)).expect("valid setup");
        let x = to_state(&mesh, &x);
        let result = cost_gradient(&ctx, &x, SourceTerms::Excluded);

        let curvature = result.gradient.dot(&x);
        let scale = (result.gradient.norm_squared() * x.norm_squared()).sqrt();
        prop_assert!(curvature >= -1e-10 * scale);
        prop_assert!(
            (curvature - 2.0 * result.energy()).abs() <= 1e-10 * (scale + 2.0 * result.energy())
        );
    }
}
