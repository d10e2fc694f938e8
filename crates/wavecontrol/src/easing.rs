//! Smooth startup of the simulation from rest.
//!
//! Switching the incoming wave on abruptly creates a sharp transient;
//! ramping it up over a few periods gives a much better
//! initial guess for the controllability solver.

use std::f64::consts::PI;

use crate::{ForwardSolver, StepContext, WaveState};

/// Source scaling that rises smoothly from 0 at `t = 0`
/// to 1 at `t = transition_time` and stays there.
pub fn easing(t: f64, transition_time: f64) -> f64 {
    if t >= transition_time {
        return 1.;
    }
    let sin_val = f64::sin((t / transition_time) * (PI / 2.0));
    (2.0 - sin_val) * sin_val
}

/// Simulate from the zero state with the incoming wave eased in
/// over [`ControlParams::transition_periods`][crate::ControlParams::transition_periods]
/// and return the resulting state.
///
/// The step count is rounded up to whole steps,
/// so with a period that is a whole number of steps
/// the result is in phase with the start of a period.
pub fn eased_initial_state(ctx: &StepContext) -> WaveState {
    let params = ctx.params();
    let transition_time = params.transition_time();
    let mut solver = ForwardSolver::new(ctx, WaveState::zeros(ctx.mesh()));
    solver.run_with(params.transition_steps(), |t| easing(t, transition_time));
    log::debug!(
        "Eased in the incoming wave over {} steps, ending at t = {:.4}",
        params.transition_steps(),
        solver.time()
    );
    solver.into_state()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ControlParams;
    use approx::assert_relative_eq;
    use wavecontrol_dec::lattice::square_with_hole;

    #[test]
    fn easing_curve() {
        let t_end = 3.0;
        assert_eq!(easing(0.0, t_end), 0.0);
        assert_relative_eq!(easing(t_end, t_end), 1.0);
        assert_eq!(easing(10.0, t_end), 1.0);

        // monotonic and flat at the end
        let samples: Vec<f64> = (0..=100).map(|i| easing(i as f64 * t_end / 100.0, t_end)).collect();
        assert!(samples.windows(2).all(|w| w[0] <= w[1]));
        assert!(samples[100] - samples[99] < 1e-3);
    }

    #[test]
    fn eased_start_grows_the_wave_smoothly() {
        let mesh = square_with_hole(1.0, 0.3, 0.3).expect("valid lattice");
        let params = ControlParams {
            dt: 0.05,
            transition_periods: 1.0,
            ..Default::default()
        };
        let ctx = StepContext::new(&mesh, params).expect("valid setup");
        let state = eased_initial_state(&ctx);

        assert!(state.energy() > 0.0);
        // the scatterer flux at the end is the full incoming wave
        let t_half = params.transition_steps() as f64 * params.dt + 0.5 * params.dt;
        for src in ctx.inner_edges() {
            assert_relative_eq!(
                state.flux.values[src.edge],
                ctx.wave().flux_over_edge(t_half, src.endpoints),
                epsilon = 1e-9
            );
        }
    }
}
