//! Cochains, i.e. values assigned to the cells of a mesh.

use nalgebra as na;

/// A vector of values corresponding to
/// a set of `DIM`-dimensional cells on a mesh,
/// either primal simplices or their circumcentric duals.
///
/// Cochains are constructed using
/// [`new_zero_cochain`][crate::SimplicialMesh::new_zero_cochain]
/// or [`integrate_cochain`][crate::SimplicialMesh::integrate_cochain].
/// The dimension and primality parameters only exist at the type level;
/// they let operator application be checked at compile time.
#[derive(Clone)]
pub struct Cochain<const DIM: usize, Primality> {
    /// The underlying vector of real values, exposed for convenience.
    ///
    /// Changing the length of this vector at runtime
    /// causes a dimension mismatch with operators,
    /// leading to a panic when an operator is applied.
    pub values: na::DVector<f64>,
    _marker: std::marker::PhantomData<Primality>,
}

impl<const DIM: usize, Primality> Cochain<DIM, Primality> {
    #[inline]
    pub(crate) fn from_values(values: na::DVector<f64>) -> Self {
        Self {
            values,
            _marker: std::marker::PhantomData,
        }
    }

    #[inline]
    pub(crate) fn zeros(len: usize) -> Self {
        Self::from_values(na::DVector::zeros(len))
    }

    /// Get the number of values in the cochain.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check whether the cochain has no values at all.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Euclidean inner product of the value vectors.
    #[inline]
    pub fn dot(&self, other: &Self) -> f64 {
        self.values.dot(&other.values)
    }

    /// Set every value to zero while keeping the allocation.
    #[inline]
    pub fn fill_zero(&mut self) {
        self.values.fill(0.0);
    }
}

impl<const DIM: usize, Primality> crate::operator::Operand for Cochain<DIM, Primality> {
    fn values(&self) -> &na::DVector<f64> {
        &self.values
    }

    fn from_values(values: na::DVector<f64>) -> Self {
        Self::from_values(values)
    }
}

impl<const DIM: usize, P> std::fmt::Debug for Cochain<DIM, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-cochain, values {:?}", DIM, self.values)
    }
}

impl<const DIM: usize, P> PartialEq for Cochain<DIM, P> {
    fn eq(&self, other: &Self) -> bool {
        self.values == other.values
    }
}

// index primal cochains with simplex views of the same dimension

impl<'a, const DIM: usize> std::ops::Index<crate::SimplexView<'a, DIM>>
    for Cochain<DIM, crate::Primal>
{
    type Output = f64;

    fn index(&self, simplex: crate::SimplexView<'a, DIM>) -> &Self::Output {
        &self.values[simplex.index()]
    }
}

impl<'a, const DIM: usize> std::ops::IndexMut<crate::SimplexView<'a, DIM>>
    for Cochain<DIM, crate::Primal>
{
    fn index_mut(&mut self, simplex: crate::SimplexView<'a, DIM>) -> &mut Self::Output {
        &mut self.values[simplex.index()]
    }
}

// arithmetic, with the reference permutations solvers need
// to accumulate without reallocating

impl<const D: usize, P> std::ops::Add for Cochain<D, P> {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self::from_values(self.values + rhs.values)
    }
}

impl<const D: usize, P> std::ops::Add<&Cochain<D, P>> for Cochain<D, P> {
    type Output = Self;

    fn add(self, rhs: &Cochain<D, P>) -> Self::Output {
        Self::from_values(self.values + &rhs.values)
    }
}

impl<const D: usize, P> std::ops::Add for &Cochain<D, P> {
    type Output = Cochain<D, P>;

    fn add(self, rhs: Self) -> Self::Output {
        Cochain::from_values(&self.values + &rhs.values)
    }
}

impl<const D: usize, P> std::ops::AddAssign<&Cochain<D, P>> for Cochain<D, P> {
    fn add_assign(&mut self, rhs: &Cochain<D, P>) {
        self.values += &rhs.values;
    }
}

impl<const D: usize, P> std::ops::AddAssign for Cochain<D, P> {
    fn add_assign(&mut self, rhs: Self) {
        self.values += rhs.values;
    }
}

impl<const D: usize, P> std::ops::Neg for Cochain<D, P> {
    type Output = Self;

    fn neg(self) -> Self::Output {
        Self::from_values(-self.values)
    }
}

impl<const D: usize, P> std::ops::Neg for &Cochain<D, P> {
    type Output = Cochain<D, P>;

    fn neg(self) -> Self::Output {
        Cochain::from_values(-&self.values)
    }
}

impl<const D: usize, P> std::ops::Sub for Cochain<D, P> {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self::from_values(self.values - rhs.values)
    }
}

impl<const D: usize, P> std::ops::Sub<&Cochain<D, P>> for Cochain<D, P> {
    type Output = Self;

    fn sub(self, rhs: &Cochain<D, P>) -> Self::Output {
        Self::from_values(self.values - &rhs.values)
    }
}

impl<const D: usize, P> std::ops::Sub for &Cochain<D, P> {
    type Output = Cochain<D, P>;

    fn sub(self, rhs: Self) -> Self::Output {
        Cochain::from_values(&self.values - &rhs.values)
    }
}

impl<const D: usize, P> std::ops::SubAssign<&Cochain<D, P>> for Cochain<D, P> {
    fn sub_assign(&mut self, rhs: &Cochain<D, P>) {
        self.values -= &rhs.values;
    }
}

impl<const D: usize, P> std::ops::SubAssign for Cochain<D, P> {
    fn sub_assign(&mut self, rhs: Self) {
        self.values -= rhs.values;
    }
}

impl<const D: usize, P> std::ops::Mul<Cochain<D, P>> for f64 {
    type Output = Cochain<D, P>;

    fn mul(self, rhs: Cochain<D, P>) -> Self::Output {
        Cochain::from_values(self * rhs.values)
    }
}

impl<const D: usize, P> std::ops::Mul<&Cochain<D, P>> for f64 {
    type Output = Cochain<D, P>;

    fn mul(self, rhs: &Cochain<D, P>) -> Self::Output {
        Cochain::from_values(self * &rhs.values)
    }
}

impl<const D: usize, P> std::ops::MulAssign<f64> for Cochain<D, P> {
    fn mul_assign(&mut self, rhs: f64) {
        self.values *= rhs;
    }
}
