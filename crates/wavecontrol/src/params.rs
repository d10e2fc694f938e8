//! Numeric parameters of a controllability run.

use std::f64::consts::{PI, TAU};

use wavecontrol_dec::Vec2;

/// How the backward solver treats the absorbing outer boundary.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AdjointBoundary {
    /// Apply the exact transpose of the forward absorbing condition:
    /// the outer-edge flux is moved into the adjacent pressure and then cleared,
    /// and the periodicity defect is passed through the same transpose
    /// before the backward run.
    ///
    /// With this the computed gradient is exactly `Dᵀ D x` for the period map `D`,
    /// which is what conjugate gradients assume.
    #[default]
    Exact,
    /// Run the absorbing condition backwards in time,
    /// overwriting the outer-edge flux with `+pressure · length · orientation`.
    ///
    /// This is a consistent discretization of the continuous adjoint equation
    /// but not the transpose of the discrete forward step,
    /// so the gradient is only approximate near the outer boundary.
    TimeReversed,
}

/// Error in the values of [`ControlParams`].
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum ParamsError {
    /// A quantity that must be positive and finite wasn't.
    #[error("{name} must be positive and finite, got {value}")]
    NotPositive {
        /// Name of the parameter.
        name: &'static str,
        /// The invalid value.
        value: f64,
    },
    /// The incident angle was not a finite number.
    #[error("Incident angle must be finite, got {0}")]
    InvalidAngle(f64),
    /// The convergence threshold was outside of `(0, 1)`.
    #[error("Convergence threshold must be in (0, 1), got {0}")]
    InvalidThreshold(f64),
    /// Zero iterations were allowed.
    #[error("At least one iteration must be allowed")]
    ZeroIterations,
}

/// Parameters of the incoming wave, the time discretization
/// and the conjugate gradient iteration.
///
/// The defaults are those of the reference scatterer scenario.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ControlParams {
    /// Magnitude of the incoming wave vector.
    pub wavenumber: f64,
    /// Direction of the incoming wave in degrees,
    /// measured counterclockwise from the positive x axis.
    pub incident_angle_deg: f64,
    /// Angular velocity of the incoming wave,
    /// which sets the period the solution is made periodic over.
    pub angular_velocity: f64,
    /// Timestep.
    pub dt: f64,
    /// Relative residual norm at which the iteration stops.
    /// The squared residual is compared against the square of this.
    pub threshold: f64,
    /// Maximum number of conjugate gradient iterations.
    pub max_iters: usize,
    /// Duration of the eased start in wave periods.
    pub transition_periods: f64,
    /// Treatment of the absorbing boundary in the backward solver.
    pub adjoint_boundary: AdjointBoundary,
}

impl Default for ControlParams {
    fn default() -> Self {
        Self {
            wavenumber: 1.0,
            incident_angle_deg: 90.0,
            angular_velocity: 2.0,
            dt: PI / 120.0,
            threshold: 1e-2,
            max_iters: 50,
            transition_periods: 5.0,
            adjoint_boundary: AdjointBoundary::default(),
        }
    }
}

impl ControlParams {
    /// Check that every parameter is in its valid range.
    pub fn validate(&self) -> Result<(), ParamsError> {
        for (name, value) in [
            ("Wavenumber", self.wavenumber),
            ("Angular velocity", self.angular_velocity),
            ("Timestep", self.dt),
            ("Transition duration", self.transition_periods),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ParamsError::NotPositive { name, value });
            }
        }
        if !self.incident_angle_deg.is_finite() {
            return Err(ParamsError::InvalidAngle(self.incident_angle_deg));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ParamsError::InvalidThreshold(self.threshold));
        }
        if self.max_iters == 0 {
            return Err(ParamsError::ZeroIterations);
        }
        Ok(())
    }

    /// Period of the incoming wave.
    #[inline]
    pub fn period(&self) -> f64 {
        TAU / self.angular_velocity
    }

    /// Number of timesteps simulated per wave period.
    ///
    /// Rounded up, so the simulated period is at least the wave period.
    #[inline]
    pub fn steps_per_period(&self) -> usize {
        (self.period() / self.dt).ceil() as usize
    }

    /// Number of timesteps in the eased start.
    #[inline]
    pub fn transition_steps(&self) -> usize {
        (self.transition_time() / self.dt).ceil() as usize
    }

    /// Duration of the eased start.
    #[inline]
    pub fn transition_time(&self) -> f64 {
        self.transition_periods * self.period()
    }

    /// The wave vector of the incoming wave.
    pub fn wave_vector(&self) -> Vec2 {
        let angle = self.incident_angle_deg.to_radians();
        self.wavenumber * Vec2::new(angle.cos(), angle.sin())
    }
}
