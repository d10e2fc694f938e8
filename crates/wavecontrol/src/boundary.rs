//! Precomputed data for applying boundary conditions edge by edge.

use wavecontrol_dec::{Primal, SimplicialMesh, Subset, Vec2};

use crate::SetupError;

/// An edge on the absorbing boundary together with
/// the information needed to apply the absorbing condition on it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoundaryEdgeInfo {
    /// Index of the edge.
    pub edge: usize,
    /// Index of the one triangle the edge borders,
    /// which is also the index of the adjacent pressure value.
    pub adjacent_face: usize,
    /// Orientation of the edge relative to the triangle's boundary.
    pub orientation: i8,
    /// Length of the edge.
    pub length: f64,
}

/// An edge on the scatterer surface and its endpoints,
/// for evaluating the incoming flux over it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SourceEdge {
    /// Index of the edge.
    pub edge: usize,
    /// Endpoints of the edge in the order that defines its orientation.
    pub endpoints: [Vec2; 2],
}

/// Gather [`BoundaryEdgeInfo`]s for every edge in a subset.
///
/// Every edge must border exactly one triangle;
/// otherwise it isn't on the boundary of the mesh
/// and the subset doesn't describe a valid absorbing boundary.
pub fn extract_boundary_edges(
    mesh: &SimplicialMesh,
    edges: &Subset<1, Primal>,
) -> Result<Vec<BoundaryEdgeInfo>, SetupError> {
    mesh.simplices_in(edges)
        .map(|edge| {
            let mut coboundary = edge.coboundary();
            match (coboundary.next(), coboundary.count()) {
                (Some((orientation, face)), 0) => Ok(BoundaryEdgeInfo {
                    edge: edge.index(),
                    adjacent_face: face.index(),
                    orientation,
                    length: edge.volume(),
                }),
                (first, rest) => Err(SetupError::BoundaryAdjacency {
                    edge: edge.index(),
                    faces: first.map_or(0, |_| 1) + rest,
                }),
            }
        })
        .collect()
}

/// Gather the endpoints of every edge in a subset.
pub fn extract_source_edges(mesh: &SimplicialMesh, edges: &Subset<1, Primal>) -> Vec<SourceEdge> {
    mesh.simplices_in(edges)
        .map(|edge| SourceEdge {
            edge: edge.index(),
            endpoints: edge.endpoints(),
        })
        .collect()
}
