//! The simulated quantities and their vector space operations.

use wavecontrol_dec::{Cochain, Dual, Primal, SimplicialMesh};

/// Pressure, one value per triangle (i.e. per dual vertex).
pub type Pressure = Cochain<0, Dual>;
/// Flux, one value per primal edge.
pub type Flux = Cochain<1, Primal>;

/// A state of the simulated wave: pressure on triangles and flux on edges.
///
/// `Clone` gives an independent copy; no storage is shared between states.
#[derive(Clone, Debug, PartialEq)]
pub struct WaveState {
    /// Pressure cochain.
    pub pressure: Pressure,
    /// Flux cochain.
    pub flux: Flux,
}

impl WaveState {
    /// The zero state on a mesh.
    pub fn zeros(mesh: &SimplicialMesh) -> Self {
        Self {
            pressure: mesh.new_zero_cochain(),
            flux: mesh.new_zero_cochain(),
        }
    }

    /// Inner product over both pressure and flux values.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.pressure.dot(&other.pressure) + self.flux.dot(&other.flux)
    }

    /// Squared Euclidean norm, `self · self`.
    #[inline]
    pub fn norm_squared(&self) -> f64 {
        self.dot(self)
    }

    /// Half the squared norm.
    #[inline]
    pub fn energy(&self) -> f64 {
        0.5 * self.norm_squared()
    }

    /// Add `coef * other` to this state in place.
    pub fn add_scaled(&mut self, coef: f64, other: &Self) {
        self.pressure.values.axpy(coef, &other.pressure.values, 1.0);
        self.flux.values.axpy(coef, &other.flux.values, 1.0);
    }
}

//
// arithmetic
//

impl std::ops::Add<&WaveState> for WaveState {
    type Output = WaveState;

    fn add(mut self, rhs: &WaveState) -> Self::Output {
        self += rhs;
        self
    }
}

impl std::ops::Add for &WaveState {
    type Output = WaveState;

    fn add(self, rhs: &WaveState) -> Self::Output {
        self.clone() + rhs
    }
}

impl std::ops::Sub<&WaveState> for WaveState {
    type Output = WaveState;

    fn sub(mut self, rhs: &WaveState) -> Self::Output {
        self -= rhs;
        self
    }
}

impl std::ops::Sub for &WaveState {
    type Output = WaveState;

    fn sub(self, rhs: &WaveState) -> Self::Output {
        self.clone() - rhs
    }
}

impl std::ops::AddAssign<&WaveState> for WaveState {
    fn add_assign(&mut self, rhs: &WaveState) {
        self.pressure += &rhs.pressure;
        self.flux += &rhs.flux;
    }
}

impl std::ops::SubAssign<&WaveState> for WaveState {
    fn sub_assign(&mut self, rhs: &WaveState) {
        self.pressure -= &rhs.pressure;
        self.flux -= &rhs.flux;
    }
}

impl std::ops::Neg for WaveState {
    type Output = WaveState;

    fn neg(self) -> Self::Output {
        Self {
            pressure: -self.pressure,
            flux: -self.flux,
        }
    }
}

impl std::ops::Neg for &WaveState {
    type Output = WaveState;

    fn neg(self) -> Self::Output {
        -self.clone()
    }
}

impl std::ops::Mul<WaveState> for f64 {
    type Output = WaveState;

    fn mul(self, mut rhs: WaveState) -> Self::Output {
        rhs *= self;
        rhs
    }
}

impl std::ops::Mul<&WaveState> for f64 {
    type Output = WaveState;

    fn mul(self, rhs: &WaveState) -> Self::Output {
        self * rhs.clone()
    }
}

impl std::ops::MulAssign<f64> for WaveState {
    fn mul_assign(&mut self, rhs: f64) {
        self.pressure *= rhs;
        self.flux *= rhs;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use wavecontrol_dec::mesh::tiny_mesh_2d;

    fn ramp(mesh: &SimplicialMesh, offset: f64) -> WaveState {
        let mut s = WaveState::zeros(mesh);
        for (i, p) in s.pressure.values.iter_mut().enumerate() {
            *p = offset + i as f64;
        }
        for (i, q) in s.flux.values.iter_mut().enumerate() {
            *q = offset - 0.5 * i as f64;
        }
        s
    }

    #[test]
    fn vector_space_ops() {
        let mesh = tiny_mesh_2d();
        let a = ramp(&mesh, 1.0);
        let b = ramp(&mesh, -2.0);

        let sum = &a + &b;
        assert_eq!(sum.pressure.values[3], a.pressure.values[3] + b.pressure.values[3]);
        assert_eq!(&sum - &b, a);
        assert_eq!(-&a + &a, WaveState::zeros(&mesh));
        assert_eq!(2.0 * &a, &a + &a);

        let mut acc = a.clone();
        acc.add_scaled(-3.0, &b);
        assert_eq!(acc, &a - &(3.0 * &b));

        let expected_dot: f64 = a
            .pressure
            .values
            .iter()
            .chain(a.flux.values.iter())
            .zip(b.pressure.values.iter().chain(b.flux.values.iter()))
            .map(|(x, y)| x * y)
            .sum();
        assert_relative_eq!(a.dot(&b), expected_dot);
        assert_relative_eq!(a.energy(), 0.5 * a.dot(&a));
    }

    #[test]
    fn energy_is_nonnegative_and_zero_only_at_zero() {
        let mesh = tiny_mesh_2d();
        assert_eq!(WaveState::zeros(&mesh).energy(), 0.0);
        for offset in [-3.0, 0.0, 0.25] {
            let s = ramp(&mesh, offset);
            assert!(s.energy() > 0.0);
            assert!((-&s).energy() > 0.0);
        }
    }

    #[test]
    fn clones_do_not_share_storage() {
        let mesh = tiny_mesh_2d();
        let original = ramp(&mesh, 1.0);
        let mut copy = original.clone();
        assert_relative_eq!(copy.dot(&original), original.dot(&original));

        copy.flux.values[0] += 10.0;
        copy.pressure *= 0.0;
        assert_eq!(original, ramp(&mesh, 1.0));
        assert!(copy != original);
    }
}
