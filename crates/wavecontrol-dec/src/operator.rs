//! Composable operators for doing math on [`Cochain`][crate::Cochain]s.

use fixedbitset as fb;
use nalgebra as na;
use nalgebra_sparse as nas;

use crate::{mesh::Subset, Cochain};
use itertools::izip;

//
// traits
//

/// Trait enabling operator composition checked for compatibility at compile time.
pub trait Operator {
    /// The type of cochain this operator takes as an input.
    type Input: Operand;
    /// The type of cochain this operator produces as an output.
    type Output: Operand;

    /// Apply this operator to an input cochain.
    fn apply(&self, input: &Self::Input) -> Self::Output;
    /// Convert this operator into a CSR matrix.
    fn into_csr(self) -> nas::CsrMatrix<f64>;
}

/// Trait implemented by [`Cochain`]s to enable operators
/// to construct and deconstruct them in a generic way.
pub trait Operand {
    /// Get the underlying vector of values.
    fn values(&self) -> &na::DVector<f64>;
    /// Construct an operand from a vector of values.
    fn from_values(values: na::DVector<f64>) -> Self;
}

//
// concrete operators
//

/// A diagonal matrix operator, e.g. a Hodge star.
///
/// Stored as its diagonal vector and converted into a matrix
/// when composed with other operators.
#[derive(Clone, Debug)]
pub struct DiagonalOperator<Input, Output> {
    diagonal: na::DVector<f64>,
    _marker: std::marker::PhantomData<(Input, Output)>,
}

impl<Input, Output> Operator for DiagonalOperator<Input, Output>
where
    Input: Operand,
    Output: Operand,
{
    type Input = Input;
    type Output = Output;

    fn apply(&self, input: &Self::Input) -> Self::Output {
        let input = input.values();
        let ret = na::DVector::from_iterator(
            input.len(),
            izip!(self.diagonal.iter(), input.iter()).map(|(&diag_val, &in_val)| diag_val * in_val),
        );
        Self::Output::from_values(ret)
    }

    fn into_csr(self) -> nas::CsrMatrix<f64> {
        // start from an identity matrix to get the sparsity pattern,
        // then replace the entries
        let mut csr = nas::CsrMatrix::identity(self.diagonal.len());
        for (&diag, mat_diag) in self.diagonal.iter().zip(csr.values_mut()) {
            *mat_diag = diag;
        }
        csr
    }
}

impl<Input, Output> From<na::DVector<f64>> for DiagonalOperator<Input, Output> {
    fn from(diagonal: na::DVector<f64>) -> Self {
        Self {
            diagonal,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Input, Output> DiagonalOperator<Input, Output> {
    /// Access the diagonal values.
    #[inline]
    pub fn diagonal(&self) -> &na::DVector<f64> {
        &self.diagonal
    }
}

impl<Input, const DIM: usize, P> DiagonalOperator<Input, Cochain<DIM, P>> {
    /// Set a subset of elements in the output cochain to zero
    /// when this operator is applied.
    pub fn exclude_subset(mut self, set: &Subset<DIM, P>) -> Self {
        for row_idx in set.indices.ones() {
            self.diagonal[row_idx] = 0.0;
        }
        self
    }
}

impl<Input, Output> PartialEq for DiagonalOperator<Input, Output> {
    fn eq(&self, other: &Self) -> bool {
        self.diagonal == other.diagonal
    }
}

/// A general sparse matrix operator,
/// parameterized with the cochain types it consumes and produces.
///
/// This can be a composition of one or more [`MatrixOperator`]s and [`DiagonalOperator`]s.
/// Composition can be done using multiplication syntax:
/// ```
/// # use wavecontrol_dec::{Cochain, Dual, Primal, Op, mesh::tiny_mesh_2d};
/// # let mesh = tiny_mesh_2d();
/// let op: Op<Cochain<1, Primal>, Cochain<0, Dual>> = mesh.star_2() * mesh.d_1();
/// ```
/// A free function [`compose`] is also provided for the same purpose.
#[derive(Clone, Debug)]
pub struct MatrixOperator<Input, Output> {
    mat: nas::CsrMatrix<f64>,
    _marker: std::marker::PhantomData<(Input, Output)>,
}

/// A type alias for [`MatrixOperator`]
/// to make common patterns more convenient to type.
pub type Op<Input, Output> = MatrixOperator<Input, Output>;

impl<Input, Output> Operator for MatrixOperator<Input, Output>
where
    Input: Operand,
    Output: Operand,
{
    type Input = Input;
    type Output = Output;

    fn apply(&self, input: &Self::Input) -> Self::Output {
        Self::Output::from_values(&self.mat * input.values())
    }

    fn into_csr(self) -> nas::CsrMatrix<f64> {
        self.mat
    }
}

impl<Input, Output> MatrixOperator<Input, Output> {
    /// Get the transpose of this operator,
    /// which maps the output space back into the input space.
    pub fn transpose(&self) -> MatrixOperator<Output, Input> {
        MatrixOperator {
            mat: self.mat.transpose(),
            _marker: std::marker::PhantomData,
        }
    }

    /// Access the underlying sparse matrix.
    #[inline]
    pub fn csr(&self) -> &nas::CsrMatrix<f64> {
        &self.mat
    }

    /// Apply the operator and add the result into `target`
    /// without allocating a new vector.
    pub fn apply_add(&self, input: &Input, target: &mut Output)
    where
        Input: Operand,
        Output: OperandMut,
    {
        let input = input.values();
        for (row, out) in izip!(self.mat.row_iter(), target.values_mut().iter_mut()) {
            *out += izip!(row.col_indices(), row.values())
                .map(|(&col, &val)| val * input[col])
                .sum::<f64>();
        }
    }
}

impl<Input, const DIM: usize, P> MatrixOperator<Input, Cochain<DIM, P>> {
    /// Set a subset of elements in the output cochain to zero
    /// when this operator is applied
    /// (i.e. set a subset of rows in the operator matrix to zero).
    pub fn exclude_subset(mut self, set: &Subset<DIM, P>) -> Self {
        self.mat = drop_csr_rows(self.mat, &set.indices);
        self
    }
}

impl<L, R> PartialEq for MatrixOperator<L, R> {
    fn eq(&self, other: &Self) -> bool {
        self.mat == other.mat
    }
}

/// Mutable access to an operand's values,
/// used for accumulating operator results in place.
pub trait OperandMut: Operand {
    /// Get the underlying vector of values mutably.
    fn values_mut(&mut self) -> &mut na::DVector<f64>;
}

impl<const DIM: usize, P> OperandMut for Cochain<DIM, P> {
    fn values_mut(&mut self) -> &mut na::DVector<f64> {
        &mut self.values
    }
}

// conversions from other operators and construction by matrix

impl<Input, Output> From<nas::CsrMatrix<f64>> for MatrixOperator<Input, Output> {
    fn from(mat: nas::CsrMatrix<f64>) -> Self {
        Self {
            mat,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<Input, Output> From<DiagonalOperator<Input, Output>> for MatrixOperator<Input, Output>
where
    DiagonalOperator<Input, Output>: Operator,
{
    fn from(s: DiagonalOperator<Input, Output>) -> Self {
        Self {
            mat: s.into_csr(),
            _marker: std::marker::PhantomData,
        }
    }
}

//
// helper functions
//

/// Compose two operators such that `r` is applied before `l`.
///
/// This can also be done with multiplication syntax:
/// ```
/// # use wavecontrol_dec::{operator::compose, mesh::tiny_mesh_2d};
/// # let mesh = tiny_mesh_2d();
/// assert_eq!(
///     compose(mesh.star_2(), mesh.d_1()),
///     mesh.star_2() * mesh.d_1(),
/// );
/// ```
pub fn compose<Left, Right>(l: Left, r: Right) -> MatrixOperator<Right::Input, Left::Output>
where
    Left: Operator<Input = Right::Output>,
    Right: Operator,
{
    MatrixOperator {
        mat: l.into_csr() * r.into_csr(),
        _marker: std::marker::PhantomData,
    }
}

/// Takes a CSR matrix and generates another matrix with the given rows set to zeroes.
fn drop_csr_rows(mat: nas::CsrMatrix<f64>, set_to_drop: &fb::FixedBitSet) -> nas::CsrMatrix<f64> {
    let num_rows = mat.nrows();
    let num_cols = mat.ncols();
    let (mut row_offsets, mut col_indices, mut values) = mat.disassemble();

    // compact the retained entries towards the front,
    // rewriting row offsets as we go.
    // `row_offsets[row_idx + 1]` is overwritten during the loop,
    // so the previous value is kept as state
    let mut retained_value_idx = 0;
    let mut prev_row_offset = 0;
    for row_idx in 0..num_rows {
        let old_row_range = prev_row_offset..row_offsets[row_idx + 1];
        prev_row_offset = row_offsets[row_idx + 1];

        if set_to_drop.contains(row_idx) {
            row_offsets[row_idx + 1] = row_offsets[row_idx];
        } else {
            for old_val_idx in old_row_range {
                col_indices[retained_value_idx] = col_indices[old_val_idx];
                values[retained_value_idx] = values[old_val_idx];
                retained_value_idx += 1;
            }
            row_offsets[row_idx + 1] = retained_value_idx;
        }
    }

    col_indices.truncate(retained_value_idx);
    values.truncate(retained_value_idx);

    nas::CsrMatrix::try_from_csr_data(num_rows, num_cols, row_offsets, col_indices, values)
        .expect("Dropping rows keeps a valid CSR structure")
}

//
// std trait implementations
//

// compositions

impl<In, Out, Op> std::ops::Mul<Op> for DiagonalOperator<In, Out>
where
    In: Operand,
    Out: Operand,
    Op: Operator<Output = In>,
{
    type Output = MatrixOperator<Op::Input, Out>;

    fn mul(self, rhs: Op) -> Self::Output {
        compose(self, rhs)
    }
}

impl<In, Out, Op> std::ops::Mul<Op> for MatrixOperator<In, Out>
where
    In: Operand,
    Out: Operand,
    Op: Operator<Output = In>,
{
    type Output = MatrixOperator<Op::Input, Out>;

    fn mul(self, rhs: Op) -> Self::Output {
        compose(self, rhs)
    }
}

// scalar multiplication

impl<Input, Output> std::ops::Mul<DiagonalOperator<Input, Output>> for f64 {
    type Output = DiagonalOperator<Input, Output>;

    fn mul(self, mut rhs: DiagonalOperator<Input, Output>) -> Self::Output {
        rhs.diagonal *= self;
        rhs
    }
}

impl<L, R> std::ops::Mul<MatrixOperator<L, R>> for f64 {
    type Output = MatrixOperator<L, R>;

    fn mul(self, mut rhs: MatrixOperator<L, R>) -> Self::Output {
        rhs.mat *= self;
        rhs
    }
}

// application to cochains.
// by reference too, because the impl for value consumes the operator

impl<Out, const D: usize, P> std::ops::Mul<&Cochain<D, P>> for DiagonalOperator<Cochain<D, P>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Cochain<D, P>) -> Self::Output {
        self.apply(rhs)
    }
}

impl<Out, const D: usize, P> std::ops::Mul<&Cochain<D, P>> for &DiagonalOperator<Cochain<D, P>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Cochain<D, P>) -> Self::Output {
        self.apply(rhs)
    }
}

impl<Out, const D: usize, P> std::ops::Mul<&Cochain<D, P>> for MatrixOperator<Cochain<D, P>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Cochain<D, P>) -> Self::Output {
        self.apply(rhs)
    }
}

impl<Out, const D: usize, P> std::ops::Mul<&Cochain<D, P>> for &MatrixOperator<Cochain<D, P>, Out>
where
    Out: Operand,
{
    type Output = Out;

    fn mul(self, rhs: &Cochain<D, P>) -> Self::Output {
        self.apply(rhs)
    }
}

//
// tests
//

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::{tiny_mesh_2d, Dual, Primal};
    use approx::relative_eq;

    #[test]
    fn exterior_derivative_works_in_2d() {
        let mesh = tiny_mesh_2d();
        // a cochain where each vertex has the value of its index
        let mut c0 = mesh.new_zero_cochain::<0, Primal>();
        for (i, val) in c0.values.iter_mut().enumerate() {
            *val = i as f64;
        }

        let c1 = mesh.d_0() * &c0;
        // edges are sorted by vertex indices, see mesh_construction.rs
        #[rustfmt::skip]
        let expected_c1 = na::DVector::from_vec(vec![
            1.-0., 2.-0., 3.-0.,
            3.-1., 4.-1.,
            3.-2., 5.-2.,
            4.-3., 5.-3., 6.-3.,
            6.-4., 6.-5.,
        ]);
        assert_eq!(c1.values, expected_c1, "d_0 gave unexpected results");

        let c2 = mesh.d_1() * &c1;
        assert!(
            c2.values.iter().all(|v| *v == 0.0),
            "d twice should always be zero"
        );

        assert_eq!(
            mesh.dual_d_0().mat,
            mesh.d_1().mat.transpose(),
            "dual d_0 should be the transpose of primal d_1",
        );
        assert_eq!(
            mesh.dual_d_1().mat,
            mesh.d_0().mat.transpose(),
            "dual d_1 should be the transpose of primal d_0",
        );
    }

    #[test]
    fn hodge_stars_and_inverses() {
        let mesh = tiny_mesh_2d();

        // star_2 is the reciprocal area, and every triangle has area 0.5
        assert!(mesh.star_2().diagonal().iter().all(|v| *v == 2.0));

        // star_1 and its inverse compose to -1 on a well-centered mesh
        let composed: Op<Cochain<1, Dual>, Cochain<1, Dual>> = mesh.star_1() * mesh.star_1_inv();
        let mut ones = mesh.new_zero_cochain::<1, Dual>();
        ones.values.fill(1.0);
        let res = &composed * &ones;
        for v in res.values.iter() {
            assert!(relative_eq!(*v, -1.0, max_relative = 1e-12));
        }
    }

    #[test]
    fn exclude_subsets() {
        let mesh = tiny_mesh_2d();

        let d0_full = mesh.d_0();
        let boundary = mesh.boundary::<1>();
        let d0_excluded = d0_full.clone().exclude_subset(&boundary);
        for (row_idx, (full_row, excluded_row)) in
            izip!(d0_full.mat.row_iter(), d0_excluded.mat.row_iter()).enumerate()
        {
            if boundary.indices.contains(row_idx) {
                assert!(excluded_row.nnz() == 0);
            } else {
                assert_eq!(full_row, excluded_row);
            }
        }

        let star_full = mesh.star_1();
        let star_excluded = star_full.clone().exclude_subset(&boundary.dual());
        for (row_idx, (full_diag, excluded_diag)) in
            izip!(star_full.diagonal.iter(), star_excluded.diagonal.iter()).enumerate()
        {
            if boundary.indices.contains(row_idx) {
                assert!(*excluded_diag == 0.0);
            } else {
                assert_eq!(full_diag, excluded_diag);
            }
        }
    }

    #[test]
    fn transpose_and_accumulate() {
        let mesh = tiny_mesh_2d();
        let op: Op<Cochain<1, Primal>, Cochain<0, Dual>> = 0.5 * (mesh.star_2() * mesh.d_1());

        let mut q = mesh.new_zero_cochain::<1, Primal>();
        for (i, v) in q.values.iter_mut().enumerate() {
            *v = (i as f64).sin();
        }
        let mut p = mesh.new_zero_cochain::<0, Dual>();
        p.values.fill(1.0);

        let mut acc = p.clone();
        op.apply_add(&q, &mut acc);
        assert_eq!(acc, &p + &(&op * &q));

        // <Aq, p> = <q, A^T p>
        let lhs = (&op * &q).dot(&p);
        let rhs = q.dot(&(&op.transpose() * &p));
        assert!(relative_eq!(lhs, rhs, max_relative = 1e-12));
    }
}
