//! The core discretization structure of DEC, the simplicial triangle mesh,
//! together with its circumcentric dual.

mod mesh_construction;
/// re-export the testing mesh for use in other modules' tests
/// and in the tests of dependent crates
#[doc(hidden)]
pub use mesh_construction::tiny_mesh_2d;

mod subset;
pub use subset::Subset;

mod views;
pub use views::{BoundaryIter, SimplexIter, SimplexView};

//

use fixedbitset as fb;
use nalgebra as na;
use nalgebra_sparse as nas;

use itertools::izip;
use std::{collections::HashMap, rc::Rc};

use crate::{Cochain, DiagonalOperator, MatrixOperator, Vec2};

/// A two-dimensional DEC mesh where the primal cells are
/// vertices, line segments and triangles.
///
/// Every triangle is oriented counterclockwise,
/// so the values of a dual 0-cochain (one per triangle)
/// and of a primal 2-cochain share a consistent sign across the mesh.
#[derive(Clone, Debug)]
pub struct SimplicialMesh {
    /// Vertices stored in a Rc so that they can be shared
    /// with the 0-simplex collection.
    /// Mutation after creation is not supported.
    pub vertices: Rc<[Vec2]>,
    /// Storage for each dimension of simplex in the mesh.
    pub(crate) simplices: [SimplexCollection; 3],
    bounds: BoundingBox,
}

/// An axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundingBox {
    /// The bottom left corner of the box.
    pub min: Vec2,
    /// The top right corner of the box.
    pub max: Vec2,
}

#[derive(Clone, Debug)]
pub(crate) struct SimplexCollection {
    /// points per simplex in the storage Vec
    simplex_size: usize,
    /// indices stored in a flat Vec, `simplex_size` at a time
    pub indices: Vec<usize>,
    /// matrix where the rows correspond to DIM-simplices,
    /// the columns to (DIM-1)-simplices,
    /// and the values of -1 or 1 to the relative orientation of the boundary.
    /// this is the exterior derivative on (DIM-1)-cochains.
    boundary_map: nas::CsrMatrix<i8>,
    /// transpose of the (DIM+1)-dimensional collection's `boundary_map`,
    /// stored separately for efficient row access
    coboundary_map: nas::CsrMatrix<i8>,
    /// simplices on the boundary of the mesh
    mesh_boundary: fb::FixedBitSet,
    /// user-defined subsets, e.g. physical groups from gmsh meshes
    custom_subsets: HashMap<String, fb::FixedBitSet>,
    circumcenters: Rc<[Vec2]>,
    barycenters: Rc<[Vec2]>,
    /// unsigned volumes of the primal simplices
    volumes: Vec<f64>,
    /// signed volumes of the corresponding dual cells
    dual_volumes: Vec<f64>,
}

impl Default for SimplexCollection {
    fn default() -> Self {
        Self {
            simplex_size: 0,
            indices: Vec::new(),
            boundary_map: nas::CsrMatrix::zeros(0, 0),
            coboundary_map: nas::CsrMatrix::zeros(0, 0),
            mesh_boundary: fb::FixedBitSet::default(),
            custom_subsets: HashMap::new(),
            circumcenters: Rc::from([]),
            barycenters: Rc::from([]),
            volumes: Vec::new(),
            dual_volumes: Vec::new(),
        }
    }
}

impl SimplexCollection {
    /// Get the number of simplices in the collection.
    #[inline]
    fn len(&self) -> usize {
        self.indices.len() / self.simplex_size
    }

    /// Get the slice of vertex indices corresponding to a single simplex.
    #[inline]
    fn simplex_indices(&self, simplex_idx: usize) -> &[usize] {
        let start_idx = simplex_idx * self.simplex_size;
        &self.indices[start_idx..start_idx + self.simplex_size]
    }
}

impl SimplicialMesh {
    /// Construct a mesh from raw vertices and triangle indices.
    ///
    /// The indices are given as a flat array
    /// where every 3 indices correspond to one triangle.
    ///
    /// # Panics
    ///
    /// If a triangle is degenerate (its vertices are collinear).
    #[inline]
    pub fn new(vertices: Vec<Vec2>, indices: Vec<usize>) -> Self {
        mesh_construction::build_mesh(vertices, indices)
    }

    /// Get the number of `DIM`-simplices in the mesh.
    #[inline]
    pub fn simplex_count<const DIM: usize>(&self) -> usize {
        self.simplex_count_dyn(DIM)
    }

    #[inline]
    pub(crate) fn simplex_count_dyn(&self, dim: usize) -> usize {
        self.simplices[dim].len()
    }

    /// Get the number of cells in the dual of `DIM`-simplices
    /// (i.e. of dual `2 - DIM`-cells).
    #[inline]
    fn cell_count<const DIM: usize, Primality: MeshPrimality>(&self) -> usize {
        if Primality::IS_PRIMAL {
            self.simplex_count_dyn(DIM)
        } else {
            self.simplex_count_dyn(2 - DIM)
        }
    }

    /// Get a view into a simplex by its index in the data.
    #[inline]
    pub fn get_simplex_by_index<const DIM: usize>(&self, idx: usize) -> SimplexView<'_, DIM> {
        SimplexView {
            mesh: self,
            index: idx,
            indices: self.simplices[DIM].simplex_indices(idx),
        }
    }

    /// Get a slice of all vertices in the mesh.
    #[inline]
    pub fn vertices(&self) -> &[Vec2] {
        &self.vertices
    }

    /// Iterate over all `DIM`-dimensional simplices in the mesh.
    pub fn simplices<const DIM: usize>(&self) -> SimplexIter<'_, DIM> {
        SimplexIter {
            mesh: self,
            idx_iter: views::IndexIter::All(0..self.simplices[DIM].len()),
        }
    }

    /// Iterate over the `DIM`-simplices in the given subset.
    pub fn simplices_in<'me, const DIM: usize>(
        &'me self,
        subset: &'me Subset<DIM, Primal>,
    ) -> SimplexIter<'me, DIM> {
        SimplexIter {
            mesh: self,
            idx_iter: views::IndexIter::Subset(subset.indices.ones()),
        }
    }

    /// Access the vertex indices for the given dimension of simplex
    /// as a chunked iterator where each element is a `DIM + 1`-length slice.
    #[inline]
    pub fn indices<const DIM: usize>(&self) -> std::slice::ChunksExact<'_, usize> {
        self.simplices[DIM].indices.chunks_exact(DIM + 1)
    }

    /// Get a slice of `DIM`-simplex circumcenters.
    ///
    /// Circumcenters of triangles are the vertices of the dual mesh.
    #[inline]
    pub fn circumcenters<const DIM: usize>(&self) -> &[Vec2] {
        &self.simplices[DIM].circumcenters
    }

    /// Get a slice of `DIM`-simplex barycenters.
    #[inline]
    pub fn barycenters<const DIM: usize>(&self) -> &[Vec2] {
        &self.simplices[DIM].barycenters
    }

    /// Get a bounding box enclosing the entire mesh.
    #[inline]
    pub fn bounds(&self) -> BoundingBox {
        self.bounds
    }

    /// Create a new cochain with a value of zero
    /// for each `DIM`-cell of the primal or dual mesh.
    pub fn new_zero_cochain<const DIM: usize, Primality>(&self) -> Cochain<DIM, Primality>
    where
        Primality: MeshPrimality,
    {
        Cochain::zeros(self.cell_count::<DIM, Primality>())
    }

    /// Create a cochain with values supplied by a function
    /// that takes the vertices of a cell and produces a scalar.
    ///
    /// The function is expected to compute the integral over the cell itself.
    /// For primal simplices the slice holds the `DIM + 1` vertices in order.
    /// Dual 0-cells are the triangle circumcenters.
    /// For dual 1-cells the slice holds the circumcenters of the adjacent triangles,
    /// ending with the edge midpoint for edges on the mesh boundary;
    /// this order does not follow the orientation of the dual cell.
    /// Dual 2-cells are not supported and produce a zero cochain.
    pub fn integrate_cochain<const DIM: usize, Primality, IntgFn>(
        &self,
        mut integrate: IntgFn,
    ) -> Cochain<DIM, Primality>
    where
        Primality: MeshPrimality,
        IntgFn: FnMut(&[Vec2]) -> f64,
    {
        let mut c = self.new_zero_cochain::<DIM, Primality>();

        match (DIM, Primality::IS_PRIMAL) {
            (_, true) => {
                let mut vertices = Vec::with_capacity(DIM + 1);
                for (indices, c_val) in izip!(self.indices::<DIM>(), c.values.iter_mut()) {
                    vertices.extend(indices.iter().map(|i| self.vertices[*i]));
                    *c_val = integrate(&vertices);
                    vertices.clear();
                }
            }
            (0, false) => {
                for (circumcenter, c_val) in
                    izip!(self.simplices[2].circumcenters.iter(), c.values.iter_mut())
                {
                    *c_val = integrate(&[*circumcenter]);
                }
            }
            (1, false) => {
                let mut vertices = Vec::with_capacity(2);
                for (edge_idx, (cob_row, c_val)) in
                    izip!(self.simplices[1].coboundary_map.row_iter(), c.values.iter_mut())
                        .enumerate()
                {
                    vertices.extend(
                        cob_row
                            .col_indices()
                            .iter()
                            .map(|tri| self.simplices[2].circumcenters[*tri]),
                    );
                    if vertices.len() <= 1 {
                        vertices.push(self.simplices[1].circumcenters[edge_idx]);
                    }
                    *c_val = integrate(&vertices);
                    vertices.clear();
                }
            }
            _ => {}
        }

        c
    }

    /// Exterior derivative on primal 0-cochains (vertices to edges).
    pub fn d_0(&self) -> MatrixOperator<Cochain<0, Primal>, Cochain<1, Primal>> {
        float_operator(&self.simplices[1].boundary_map)
    }

    /// Exterior derivative on primal 1-cochains (edges to triangles).
    pub fn d_1(&self) -> MatrixOperator<Cochain<1, Primal>, Cochain<2, Primal>> {
        float_operator(&self.simplices[2].boundary_map)
    }

    /// Exterior derivative on dual 0-cochains,
    /// the transpose of [`d_1`][Self::d_1].
    pub fn dual_d_0(&self) -> MatrixOperator<Cochain<0, Dual>, Cochain<1, Dual>> {
        float_operator(&self.simplices[1].coboundary_map)
    }

    /// Exterior derivative on dual 1-cochains,
    /// the transpose of [`d_0`][Self::d_0].
    pub fn dual_d_1(&self) -> MatrixOperator<Cochain<1, Dual>, Cochain<2, Dual>> {
        float_operator(&self.simplices[0].coboundary_map)
    }

    /// Hodge star mapping primal 1-cochains to dual 1-cochains,
    /// the ratio of dual edge length to primal edge length.
    pub fn star_1(&self) -> DiagonalOperator<Cochain<1, Primal>, Cochain<1, Dual>> {
        self.primal_star(1)
    }

    /// Hodge star mapping primal 2-cochains to dual 0-cochains,
    /// the reciprocal of the triangle area.
    pub fn star_2(&self) -> DiagonalOperator<Cochain<2, Primal>, Cochain<0, Dual>> {
        self.primal_star(2)
    }

    /// Hodge star mapping dual 1-cochains back to primal 1-cochains.
    ///
    /// This is the inverse of [`star_1`][Self::star_1]
    /// up to the sign `(-1)^(k(n-k)) = -1`,
    /// so that `star_1_inv * star_1` is minus the identity.
    pub fn star_1_inv(&self) -> DiagonalOperator<Cochain<1, Dual>, Cochain<1, Primal>> {
        let edges = &self.simplices[1];
        let diag = na::DVector::from_iterator(
            edges.len(),
            izip!(&edges.volumes, &edges.dual_volumes)
                .map(|(primal_vol, dual_vol)| -primal_vol / dual_vol),
        );
        DiagonalOperator::from(diag)
    }

    fn primal_star<In, Out>(&self, dim: usize) -> DiagonalOperator<In, Out> {
        let simplices = &self.simplices[dim];
        let diag = na::DVector::from_iterator(
            simplices.len(),
            izip!(&simplices.volumes, &simplices.dual_volumes)
                .map(|(primal_vol, dual_vol)| dual_vol / primal_vol),
        );
        DiagonalOperator::from(diag)
    }

    /// Get the set of `DIM`-simplices on the mesh boundary.
    ///
    /// For triangles (`DIM = 2`) this is always empty.
    pub fn boundary<const DIM: usize>(&self) -> Subset<DIM, Primal> {
        Subset::new(self.simplices[DIM].mesh_boundary.clone())
    }

    /// Store a subset of `DIM`-simplices in the mesh under a name,
    /// replacing any subset previously stored with the same name.
    ///
    /// The subset can be accessed using [`get_subset`][Self::get_subset].
    pub fn store_subset<const DIM: usize>(
        &mut self,
        name: impl Into<String>,
        subset: Subset<DIM, Primal>,
    ) {
        self.simplices[DIM]
            .custom_subsets
            .insert(name.into(), subset.indices);
    }

    /// Look up a stored subset of `DIM`-simplices by name.
    ///
    /// Returns None if a subset with the name does not exist for this dimension.
    /// Subsets are created by [`store_subset`][Self::store_subset],
    /// by physical groups in a [`gmsh`][crate::gmsh] file,
    /// or by the [`lattice`][crate::lattice] generator.
    pub fn get_subset<const DIM: usize>(&self, name: &str) -> Option<Subset<DIM, Primal>> {
        let indices = self.simplices[DIM].custom_subsets.get(name)?;
        Some(Subset::new(indices.clone()))
    }

    /// Names of the stored subsets of `DIM`-simplices, in no particular order.
    pub fn subset_names<const DIM: usize>(&self) -> impl '_ + Iterator<Item = &str> {
        self.simplices[DIM].custom_subsets.keys().map(|k| k.as_str())
    }

    /// Remove a stored subset, returning it if it existed.
    pub fn remove_subset<const DIM: usize>(&mut self, name: &str) -> Option<Subset<DIM, Primal>> {
        self.simplices[DIM]
            .custom_subsets
            .remove(name)
            .map(Subset::new)
    }
}

/// Build an operator from an orientation matrix,
/// converting the orientations to floats for multiplication.
fn float_operator<In, Out>(orientation_mat: &nas::CsrMatrix<i8>) -> MatrixOperator<In, Out> {
    let float_mat = nas::CsrMatrix::try_from_pattern_and_values(
        orientation_mat.pattern().clone(),
        orientation_mat.values().iter().map(|o| *o as f64).collect(),
    )
    .expect("Pattern and values come from the same valid matrix");
    MatrixOperator::from(float_mat)
}

//
// mesh primality generics
//

/// Marker type indicating a [`Cochain`][crate::Cochain]
/// or [`operator`][crate::operator] corresponds to a primal mesh.
#[derive(Clone, Copy, Debug)]
pub struct Primal;

/// Marker type indicating a [`Cochain`][crate::Cochain]
/// or [`operator`][crate::operator] corresponds to a dual mesh.
#[derive(Clone, Copy, Debug)]
pub struct Dual;

/// Trait allowing types and mesh methods to be generic
/// on whether they operate on the primal ([`Primal`]) or dual ([`Dual`]) mesh.
///
/// Not intended to be implemented by users.
pub trait MeshPrimality {
    /// Constant for runtime branching.
    #[doc(hidden)]
    const IS_PRIMAL: bool;
}

impl MeshPrimality for Primal {
    const IS_PRIMAL: bool = true;
}

impl MeshPrimality for Dual {
    const IS_PRIMAL: bool = false;
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;

    #[test]
    fn store_and_look_up_subsets() {
        let mut mesh = tiny_mesh_2d();

        let indices = [1, 3, 8];
        mesh.store_subset::<1>("indices", Subset::from_indices(indices.iter().cloned()));
        let pred = Subset::<1, Primal>::from_predicate(&mesh, |s| indices.contains(&s.index()));
        mesh.store_subset::<1>("predicate", pred);

        let idx_subset = mesh.get_subset::<1>("indices").unwrap();
        let pred_subset = mesh.get_subset::<1>("predicate").unwrap();
        assert_eq!(idx_subset, pred_subset);
        itertools::assert_equal(
            mesh.simplices_in(&idx_subset).map(|s| s.index()),
            indices.iter().cloned(),
        );

        assert!(mesh.get_subset::<0>("indices").is_none());
        assert_eq!(mesh.subset_names::<1>().count(), 2);
        assert!(mesh.remove_subset::<1>("indices").is_some());
        assert!(mesh.get_subset::<1>("indices").is_none());
    }

    #[test]
    fn integrate_primal_and_dual_cochains() {
        let mesh = tiny_mesh_2d();

        // integrating the constant 1 over edges gives their lengths
        let lengths: Cochain<1, Primal> =
            mesh.integrate_cochain(|verts| (verts[1] - verts[0]).magnitude());
        for edge in mesh.simplices::<1>() {
            assert!(relative_eq!(lengths[edge], edge.volume()));
        }

        // point evaluation at circumcenters
        let heights: Cochain<0, Dual> = mesh.integrate_cochain(|verts| verts[0].y);
        for (tri, h) in izip!(mesh.simplices::<2>(), heights.values.iter()) {
            assert_eq!(*h, tri.circumcenter().y);
        }

        // dual edge lengths, unsigned on this well-centered mesh
        let dual_lengths: Cochain<1, Dual> =
            mesh.integrate_cochain(|verts| (verts[1] - verts[0]).magnitude());
        for (edge, len) in izip!(mesh.simplices::<1>(), dual_lengths.values.iter()) {
            assert!(relative_eq!(*len, edge.dual_volume(), max_relative = 1e-12));
        }
    }
}
