use super::SimplicialMesh;
use crate::Vec2;

use fixedbitset as fb;
use nalgebra_sparse as nas;

/// A view into a single simplex's data.
///
/// This type can also be used as an index into a primal [`Cochain`][crate::Cochain]
/// of the corresponding dimension:
/// ```
/// # use wavecontrol_dec::{mesh::tiny_mesh_2d, Cochain, Primal};
/// # let mesh = tiny_mesh_2d();
/// let c: Cochain<1, Primal> = mesh.new_zero_cochain();
/// for edge in mesh.simplices::<1>() {
///     let val = c[edge];
///     // ..is a typechecked equivalent to
///     let val = c.values[edge.index()];
/// }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct SimplexView<'a, const DIM: usize> {
    pub(super) mesh: &'a SimplicialMesh,
    pub(super) index: usize,
    pub(super) indices: &'a [usize],
}

impl<'a, const DIM: usize> PartialEq for SimplexView<'a, DIM> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}
impl<'a, const DIM: usize> Eq for SimplexView<'a, DIM> {}

impl<'a, const DIM: usize> SimplexView<'a, DIM> {
    /// Iterate over the vertices of this simplex.
    #[inline]
    pub fn vertices(&self) -> impl '_ + Iterator<Item = Vec2> {
        self.indices.iter().map(|i| self.mesh.vertices[*i])
    }

    /// Iterate over the vertex indices of this simplex.
    #[inline]
    pub fn vertex_indices(&self) -> impl '_ + Iterator<Item = usize> {
        self.indices.iter().cloned()
    }

    /// Get the index of this simplex in the ordering of `DIM`-simplices.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// Get the unsigned volume of this simplex.
    #[inline]
    pub fn volume(&self) -> f64 {
        self.mesh.simplices[DIM].volumes[self.index]
    }

    /// Get the signed volume of the dual cell corresponding to this simplex.
    ///
    /// This is negative when the circumcenters bounding the dual cell
    /// lie on the far side of the simplex (a non-well-centered mesh).
    #[inline]
    pub fn dual_volume(&self) -> f64 {
        self.mesh.simplices[DIM].dual_volumes[self.index]
    }

    /// Get the circumcenter of this simplex.
    #[inline]
    pub fn circumcenter(&self) -> Vec2 {
        self.mesh.simplices[DIM].circumcenters[self.index]
    }

    /// Get the barycenter of this simplex.
    #[inline]
    pub fn barycenter(&self) -> Vec2 {
        self.mesh.simplices[DIM].barycenters[self.index]
    }

    /// Check whether this simplex is on the boundary of the mesh.
    #[inline]
    pub fn is_on_boundary(&self) -> bool {
        self.mesh.simplices[DIM].mesh_boundary.contains(self.index)
    }
}

impl<'a> SimplexView<'a, 1> {
    /// The start and end vertices of this edge.
    /// The edge is oriented from the first to the second.
    #[inline]
    pub fn endpoints(&self) -> [Vec2; 2] {
        [
            self.mesh.vertices[self.indices[0]],
            self.mesh.vertices[self.indices[1]],
        ]
    }
}

// boundary and coboundary navigation.
// const generic arithmetic isn't available on stable,
// so these are written out for each pair of dimensions

macro_rules! impl_navigation {
    ($dim:literal, boundary => $lower:literal) => {
        impl<'a> SimplexView<'a, $dim> {
            /// Iterate over the simplices on the boundary of this simplex
            /// together with their relative orientations.
            pub fn boundary(self) -> BoundaryIter<'a, $lower> {
                BoundaryIter {
                    mesh: self.mesh,
                    index: 0,
                    map_row: self.mesh.simplices[$dim].boundary_map.row(self.index),
                }
            }
        }
    };
    ($dim:literal, coboundary => $upper:literal) => {
        impl<'a> SimplexView<'a, $dim> {
            /// Iterate over the simplices on whose boundary this simplex lies
            /// together with their relative orientations.
            pub fn coboundary(self) -> BoundaryIter<'a, $upper> {
                BoundaryIter {
                    mesh: self.mesh,
                    index: 0,
                    map_row: self.mesh.simplices[$dim].coboundary_map.row(self.index),
                }
            }
        }
    };
}

impl_navigation!(0, coboundary => 1);
impl_navigation!(1, coboundary => 2);
impl_navigation!(1, boundary => 0);
impl_navigation!(2, boundary => 1);

/// An iterator over the boundary or coboundary of a simplex,
/// obtained with [`SimplexView::coboundary`] or [`SimplexView::boundary`].
///
/// The iterator returns a pair `(orientation, simplex)`
/// where orientation is the relative orientation
/// between the boundary and coboundary simplices in question.
pub struct BoundaryIter<'a, const DIM: usize> {
    mesh: &'a SimplicialMesh,
    index: usize,
    map_row: nas::csr::CsrRow<'a, i8>,
}

impl<'a, const DIM: usize> Iterator for BoundaryIter<'a, DIM> {
    type Item = (i8, SimplexView<'a, DIM>);

    fn next(&mut self) -> Option<Self::Item> {
        let cols = self.map_row.col_indices();
        if self.index >= cols.len() {
            return None;
        }
        let next_idx = cols[self.index];
        let next_ori = self.map_row.values()[self.index];

        self.index += 1;

        Some((next_ori, self.mesh.get_simplex_by_index::<DIM>(next_idx)))
    }
}

/// Iterator over a set of `DIM`-simplices in a mesh.
pub struct SimplexIter<'a, const DIM: usize> {
    pub(super) mesh: &'a SimplicialMesh,
    pub(super) idx_iter: IndexIter<'a>,
}

impl<'a, const DIM: usize> Iterator for SimplexIter<'a, DIM> {
    type Item = SimplexView<'a, DIM>;

    fn next(&mut self) -> Option<Self::Item> {
        let next_idx = self.idx_iter.next()?;
        Some(self.mesh.get_simplex_by_index::<DIM>(next_idx))
    }
}

/// A set of indices to iterate over,
/// defined either as a contiguous range
/// or an arbitrary set represented by a bitset.
pub(super) enum IndexIter<'a> {
    All(std::ops::Range<usize>),
    Subset(fb::Ones<'a>),
}

impl<'a> Iterator for IndexIter<'a> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Self::All(range) => range.next(),
            Self::Subset(indices) => indices.next(),
        }
    }
}
