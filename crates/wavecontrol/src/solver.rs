//! Leapfrog time stepping of the wave equation and its adjoint.
//!
//! Pressure lives on dual vertices (triangles) at whole timesteps
//! and flux on primal edges at half timesteps.
//! Each solver owns the state it advances;
//! clone a state before handing it over if the original is still needed.

use crate::{AdjointBoundary, StepContext, WaveState};

/// Solver advancing a wave state forward in time.
///
/// The incoming wave is imposed as a flux on the scatterer surface
/// and a first-order absorbing condition on the outer boundary.
pub struct ForwardSolver<'a> {
    ctx: &'a StepContext<'a>,
    state: WaveState,
    t: f64,
}

impl<'a> ForwardSolver<'a> {
    /// Start a solver from the given state at time zero.
    pub fn new(ctx: &'a StepContext<'a>, state: WaveState) -> Self {
        Self { ctx, state, t: 0.0 }
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> &WaveState {
        &self.state
    }

    /// Take the current state out of the solver.
    #[inline]
    pub fn into_state(self) -> WaveState {
        self.state
    }

    /// Simulated time of the current pressure values.
    #[inline]
    pub fn time(&self) -> f64 {
        self.t
    }

    /// Advance one timestep with the full incoming wave.
    #[inline]
    pub fn step(&mut self) {
        self.step_with(|_| 1.0);
    }

    /// Advance one timestep, scaling the incoming wave
    /// by `source_scaling` evaluated at the flux's time.
    ///
    /// A scaling of zero gives the homogeneous equation.
    pub fn step_with(&mut self, source_scaling: impl Fn(f64) -> f64) {
        let ctx = self.ctx;
        let dt = ctx.dt();
        let state = &mut self.state;

        self.t += dt;
        ctx.p_step().apply_add(&state.flux, &mut state.pressure);

        let t_half = self.t + 0.5 * dt;
        ctx.q_step().apply_add(&state.pressure, &mut state.flux);

        let scaling = source_scaling(t_half);
        for src in ctx.inner_edges() {
            state.flux.values[src.edge] = if scaling == 0.0 {
                0.0
            } else {
                scaling * ctx.wave().flux_over_edge(t_half, src.endpoints)
            };
        }

        for info in ctx.outer_edges() {
            state.flux.values[info.edge] =
                -state.pressure.values[info.adjacent_face] * info.length * info.orientation as f64;
        }
    }

    /// Advance `steps` timesteps with the given source scaling.
    pub fn run_with(&mut self, steps: usize, source_scaling: impl Fn(f64) -> f64) {
        for _ in 0..steps {
            self.step_with(&source_scaling);
        }
    }
}

/// Solver advancing a wave state backward in time under the adjoint equation.
///
/// There is no source term; the scatterer surface is held at zero flux.
/// The absorbing boundary is handled according to
/// [`ControlParams::adjoint_boundary`][crate::ControlParams::adjoint_boundary].
pub struct BackwardSolver<'a> {
    ctx: &'a StepContext<'a>,
    state: WaveState,
}

impl<'a> BackwardSolver<'a> {
    /// Start a solver from the given state.
    pub fn new(ctx: &'a StepContext<'a>, state: WaveState) -> Self {
        Self { ctx, state }
    }

    /// The current state.
    #[inline]
    pub fn state(&self) -> &WaveState {
        &self.state
    }

    /// Take the current state out of the solver.
    #[inline]
    pub fn into_state(self) -> WaveState {
        self.state
    }

    /// Advance one timestep backward.
    ///
    /// The flux is updated before the pressure,
    /// with the transposes of the forward operators.
    pub fn step(&mut self) {
        let ctx = self.ctx;
        let state = &mut self.state;

        ctx.p_step_t().apply_add(&state.pressure, &mut state.flux);

        match ctx.params().adjoint_boundary {
            AdjointBoundary::Exact => apply_boundary_transpose(ctx, state),
            AdjointBoundary::TimeReversed => {
                for src in ctx.inner_edges() {
                    state.flux.values[src.edge] = 0.0;
                }
                for info in ctx.outer_edges() {
                    state.flux.values[info.edge] = state.pressure.values[info.adjacent_face]
                        * info.length
                        * info.orientation as f64;
                }
            }
        }

        ctx.q_step_t().apply_add(&state.flux, &mut state.pressure);
    }

    /// Advance `steps` timesteps backward.
    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step();
        }
    }
}

/// Apply the transpose of the forward boundary conditions to a state in place.
///
/// The forward step overwrites scatterer fluxes with the source
/// and absorbing fluxes with a multiple of the adjacent pressure.
/// Transposed, scatterer fluxes are cleared
/// and absorbing fluxes are moved into the adjacent pressure.
pub(crate) fn apply_boundary_transpose(ctx: &StepContext, state: &mut WaveState) {
    for src in ctx.inner_edges() {
        state.flux.values[src.edge] = 0.0;
    }
    for info in ctx.outer_edges() {
        let flux = &mut state.flux.values[info.edge];
        state.pressure.values[info.adjacent_face] -= info.length * info.orientation as f64 * *flux;
        *flux = 0.0;
    }
}
