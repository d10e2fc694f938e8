use fixedbitset as fb;

use super::{Dual, MeshPrimality, Primal, SimplexView, SimplicialMesh};

/// A subset of `DIM`-cells in a mesh, e.g. its boundary
/// or one of the named boundary groups of a scatterer mesh.
///
/// Can be used to restrict operations to certain parts of the mesh,
/// e.g. with [`MatrixOperator::exclude_subset`][crate::MatrixOperator::exclude_subset].
/// Iterate over the simplices in the set with [`SimplicialMesh::simplices_in`].
#[derive(Clone, Debug)]
pub struct Subset<const DIM: usize, Primality> {
    /// A bitset containing the indices of cells present in the subset.
    ///
    /// Iterate over the indices with `indices.ones()`.
    pub indices: fb::FixedBitSet,
    _marker: std::marker::PhantomData<Primality>,
}

impl<const DIM: usize, Primality> PartialEq for Subset<DIM, Primality> {
    fn eq(&self, other: &Self) -> bool {
        // compare contents only, so that bitsets grown to different lengths
        // but holding the same indices are equal
        self.indices.ones().eq(other.indices.ones())
    }
}
impl<const DIM: usize, Primality> Eq for Subset<DIM, Primality> {}

impl<const DIM: usize, Primality> Subset<DIM, Primality>
where
    Primality: MeshPrimality,
{
    #[inline]
    pub(crate) fn new(indices: fb::FixedBitSet) -> Self {
        Self {
            indices,
            _marker: std::marker::PhantomData,
        }
    }

    /// Create a subset from an iterator of cell indices.
    pub fn from_indices(indices: impl Iterator<Item = usize>) -> Self {
        Self::new(fb::FixedBitSet::from_iter(indices))
    }

    /// Create an empty subset.
    pub fn new_empty() -> Self {
        Self::new(fb::FixedBitSet::new())
    }

    /// Create a subset containing every `DIM`-cell in the mesh.
    pub fn new_full(mesh: &SimplicialMesh) -> Self {
        let mut indices = fb::FixedBitSet::with_capacity(mesh.cell_count::<DIM, Primality>());
        indices.set_range(.., true);
        Self::new(indices)
    }

    /// Take the complement of a subset, i.e. the cells not in that subset.
    pub fn complement(&self, mesh: &SimplicialMesh) -> Self {
        let mut indices = Self::new_full(mesh).indices;
        indices.difference_with(&self.indices);
        Self::new(indices)
    }

    /// Take the intersection (i.e. set of cells that are in both)
    /// of this subset with another of the same type.
    #[inline]
    pub fn intersection(&self, other: &Self) -> Self {
        let mut indices = self.indices.clone();
        indices.intersect_with(&other.indices);
        Self::new(indices)
    }

    /// Take the union (i.e. set of cells that are in one or the other)
    /// of this subset with another of the same type.
    #[inline]
    pub fn union(&self, other: &Self) -> Self {
        let mut indices = self.indices.clone();
        indices.union_with(&other.indices);
        Self::new(indices)
    }

    /// Take the difference (i.e. set of cells that are in `self` but not in `other`)
    /// of this subset with another of the same type.
    #[inline]
    pub fn difference(&self, other: &Self) -> Self {
        let mut indices = self.indices.clone();
        indices.difference_with(&other.indices);
        Self::new(indices)
    }

    /// Get the number of cells in this subset.
    #[inline]
    pub fn count(&self) -> usize {
        self.indices.count_ones(..)
    }

    /// Check whether the subset contains no cells.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Check if the subset contains the cell with the given index.
    #[inline]
    pub fn contains_index(&self, index: usize) -> bool {
        self.indices.contains(index)
    }
}

impl<const DIM: usize> Subset<DIM, Primal> {
    /// Create a subset containing the simplices in the given mesh
    /// that pass the given predicate.
    pub fn from_predicate(mesh: &SimplicialMesh, pred: impl Fn(SimplexView<DIM>) -> bool) -> Self {
        let bits: fb::FixedBitSet = mesh
            .simplices::<DIM>()
            .filter(|s| pred(*s))
            .map(|s| s.index())
            .collect();
        Self::new(bits)
    }

    /// Create a subset containing the simplices yielded by an iterator.
    pub fn from_simplex_iter<'a>(iter: impl Iterator<Item = SimplexView<'a, DIM>>) -> Self {
        let bits: fb::FixedBitSet = iter.map(|s| s.index()).collect();
        Self::new(bits)
    }

    /// Check if the subset contains a given simplex.
    #[inline]
    pub fn contains(&self, simplex: SimplexView<'_, DIM>) -> bool {
        self.indices.contains(simplex.index())
    }
}

impl Subset<2, Primal> {
    /// Get the edges on the boundary of a set of triangles,
    /// i.e. the edges whose coboundary only includes one of this subset's triangles.
    pub fn manifold_boundary(&self, mesh: &SimplicialMesh) -> Subset<1, Primal> {
        let edges = mesh
            .simplices_in(self)
            .flat_map(|tri| tri.boundary().map(|(_, edge)| edge))
            .filter(|edge| {
                edge.coboundary()
                    .filter(|(_, tri)| self.contains(*tri))
                    .count()
                    == 1
            });
        Subset::from_simplex_iter(edges)
    }
}

// in two dimensions a primal k-simplex is dual to a (2-k)-cell.
// written out per dimension for the same reason as simplex navigation

macro_rules! impl_dual {
    ($primal:literal <=> $dual:literal) => {
        impl Subset<$primal, Primal> {
            /// Create a subset containing the dual cells of this one.
            #[inline]
            pub fn dual(&self) -> Subset<$dual, Dual> {
                Subset::new(self.indices.clone())
            }
        }

        impl Subset<$dual, Dual> {
            /// Create a subset containing the primal simplices dual to this one.
            #[inline]
            pub fn dual(&self) -> Subset<$primal, Primal> {
                Subset::new(self.indices.clone())
            }
        }
    };
}

impl_dual!(0 <=> 2);
impl_dual!(1 <=> 1);
impl_dual!(2 <=> 0);
