//! Exact controllability of the acoustic wave equation
//! discretized with Discrete Exterior Calculus.
//!
//! An incoming plane wave hits a scatterer in the middle of a 2D mesh
//! with an absorbing outer boundary.
//! Instead of simulating until the transients die out,
//! this crate looks for the time-periodic solution directly:
//! a state that returns to itself after one wave period.
//! The mismatch after one period is minimized with conjugate gradients,
//! with the gradient computed by simulating one period forward
//! and the adjoint equation one period backward.
//!
//! ```no_run
//! use wavecontrol::{ControlParams, StepContext};
//! use wavecontrol_dec::lattice::square_with_hole;
//! use std::f64::consts::PI;
//!
//! let mesh = square_with_hole(2. * PI, PI / 3., PI / 6.)?;
//! let ctx = StepContext::new(&mesh, ControlParams::default())?;
//! let seed = wavecontrol::eased_initial_state(&ctx);
//! let solution = wavecontrol::solve(&ctx, seed);
//! println!("converged: {}", solution.converged);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]

pub mod params;
#[doc(inline)]
pub use params::{AdjointBoundary, ControlParams, ParamsError};

pub mod incoming;
#[doc(inline)]
pub use incoming::PlaneWave;

pub mod state;
#[doc(inline)]
pub use state::{Flux, Pressure, WaveState};

pub mod boundary;
#[doc(inline)]
pub use boundary::BoundaryEdgeInfo;

pub mod context;
#[doc(inline)]
pub use context::{SetupError, StepContext};

pub mod solver;
#[doc(inline)]
pub use solver::{BackwardSolver, ForwardSolver};

pub mod gradient;
#[doc(inline)]
pub use gradient::{control_energy, cost_gradient, GradientResult, SourceTerms};

pub mod control;
#[doc(inline)]
pub use control::{reference_forward_energies, solve, ControlSolution, ControlTrace};

pub mod easing;
#[doc(inline)]
pub use easing::eased_initial_state;
