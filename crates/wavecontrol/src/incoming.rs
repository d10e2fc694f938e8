//! The incoming plane wave that drives the scattering problem.

use wavecontrol_dec::Vec2;

use crate::{ControlParams, StepContext, WaveState};

/// An acoustic plane wave with pressure `ω sin(ωt - κ·x)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlaneWave {
    /// Wave vector `κ`.
    pub wave_vector: Vec2,
    /// Angular velocity `ω`.
    pub angular_velocity: f64,
}

impl PlaneWave {
    /// The plane wave described by a set of parameters.
    pub fn from_params(params: &ControlParams) -> Self {
        Self {
            wave_vector: params.wave_vector(),
            angular_velocity: params.angular_velocity,
        }
    }

    /// Pressure of the wave at a point.
    #[inline]
    pub fn pressure_at(&self, t: f64, pos: &Vec2) -> f64 {
        let w = self.angular_velocity;
        w * f64::sin(w * t - self.wave_vector.dot(pos))
    }

    /// Flux of the wave integrated over a straight edge
    /// from `endpoints[0]` to `endpoints[1]`.
    ///
    /// The normal is the edge direction rotated clockwise.
    /// When the wave travels nearly perpendicular to the edge
    /// the closed form divides by almost zero,
    /// and its limit is used instead.
    pub fn flux_over_edge(&self, t: f64, endpoints: [Vec2; 2]) -> f64 {
        let k = &self.wave_vector;
        let kdotp = k.dot(&endpoints[0]);
        let l = endpoints[1] - endpoints[0];
        let kdotl = k.dot(&l);
        let kdotn = k.dot(&Vec2::new(l.y, -l.x));
        let wave_angle = self.angular_velocity * t;
        if kdotl.abs() < 1e-5 {
            -kdotn * f64::sin(wave_angle - kdotp)
        } else {
            (kdotn / kdotl) * (f64::cos(wave_angle - kdotp) - f64::cos(wave_angle - kdotp - kdotl))
        }
    }

    /// Sample the wave on a mesh as a wave state,
    /// e.g. to add the incident field to a simulated scattered field.
    ///
    /// Pressure is evaluated at triangle circumcenters at time `t`
    /// and flux on every edge at `t + dt/2`,
    /// matching the staggering of the solvers.
    /// Edges on the scatterer surface are left at zero
    /// since the solvers already carry the incoming flux there.
    pub fn sample_state(&self, ctx: &StepContext, t: f64) -> WaveState {
        let mesh = ctx.mesh();
        let t_flux = t + 0.5 * ctx.params().dt;
        let mut state = WaveState {
            pressure: mesh.integrate_cochain(|v| self.pressure_at(t, &v[0])),
            flux: mesh.integrate_cochain(|v| self.flux_over_edge(t_flux, [v[0], v[1]])),
        };
        for edge in ctx.inner_edges() {
            state.flux.values[edge.edge] = 0.0;
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn wave() -> PlaneWave {
        PlaneWave::from_params(&ControlParams {
            incident_angle_deg: 30.0,
            wavenumber: 1.5,
            ..Default::default()
        })
    }

    #[test]
    fn pressure_travels_along_wave_vector() {
        let wave = wave();
        let dir = wave.wave_vector.normalize();
        let speed = wave.angular_velocity / wave.wave_vector.norm();
        let start = Vec2::new(0.3, -0.2);
        for t in [0.0, 0.4, 1.7] {
            assert_relative_eq!(
                wave.pressure_at(0.0, &start),
                wave.pressure_at(t, &(start + t * speed * dir)),
                epsilon = 1e-12
            );
        }
    }

    #[test]
    fn flux_matches_numerical_integral() {
        let wave = wave();
        let t = 0.8;
        let endpoints = [Vec2::new(-0.4, 0.1), Vec2::new(0.5, 0.35)];

        // midpoint rule for the integral of -κ·n sin(ωt - κ·x) along the edge
        let l = endpoints[1] - endpoints[0];
        let n = Vec2::new(l.y, -l.x);
        let samples = 2000;
        let numerical: f64 = (0..samples)
            .map(|i| {
                let s = (i as f64 + 0.5) / samples as f64;
                let x = endpoints[0] + s * l;
                wave.wave_vector.dot(&n)
                    * f64::sin(wave.angular_velocity * t - wave.wave_vector.dot(&x))
                    / samples as f64
            })
            .sum();
        assert_relative_eq!(
            wave.flux_over_edge(t, endpoints),
            -numerical,
            epsilon = 1e-6
        );
    }

    #[test]
    fn perpendicular_fallback_is_the_limit() {
        let wave = PlaneWave {
            wave_vector: Vec2::new(0.0, 1.0),
            angular_velocity: 2.0,
        };
        let t = 0.3;
        // k·l = 0 exactly
        let horizontal = [Vec2::new(0.0, 0.5), Vec2::new(1.0, 0.5)];
        // k·l tiny but above the cutoff, so the closed form is used
        let tilted = [Vec2::new(0.0, 0.5), Vec2::new(1.0, 0.5 + 2e-5)];
        let exact = wave.flux_over_edge(t, horizontal);
        assert!(exact.is_finite());
        assert_relative_eq!(exact, wave.flux_over_edge(t, tilted), epsilon = 1e-4);
    }

    #[test]
    fn flux_is_additive_over_split_edges() {
        let wave = wave();
        let t = 2.1;
        let (a, b, c) = (
            Vec2::new(0.0, 0.0),
            Vec2::new(0.7, 0.2),
            Vec2::new(1.4, 0.4),
        );
        let whole = wave.flux_over_edge(t, [a, c]);
        let split = wave.flux_over_edge(t, [a, b]) + wave.flux_over_edge(t, [b, c]);
        assert_relative_eq!(whole, split, epsilon = 1e-12);
        // reversing the edge flips the sign
        assert_relative_eq!(wave.flux_over_edge(t, [c, a]), -whole, epsilon = 1e-12);
    }
}
