//! Generation of structured scatterer meshes without external tools.
//!
//! [`square_with_hole`] triangulates a square with near-equilateral triangles
//! and cuts a square hole in the middle for a scattering obstacle.

use itertools::Itertools;

use crate::{Primal, SimplicialMesh, Subset, Vec2, INNER_BOUNDARY, OUTER_BOUNDARY};

/// Error in the parameters of a generated mesh.
#[derive(thiserror::Error, Debug, PartialEq)]
pub enum LatticeError {
    /// The outer extent was not a positive finite number.
    #[error("Outer extent must be positive and finite, got {0}")]
    InvalidOuterExtent(f64),
    /// The inner extent was negative, not finite, or didn't fit inside the outer square.
    #[error("Inner extent must be in [0, outer extent), got {inner} with outer extent {outer}")]
    InvalidInnerExtent {
        /// The given inner extent.
        inner: f64,
        /// The given outer extent.
        outer: f64,
    },
    /// The element size was not positive and finite or exceeded the outer extent.
    #[error("Element size must be in (0, outer extent], got {0}")]
    InvalidElementSize(f64),
}

/// Generate a triangle mesh of the square `[-outer_extent, outer_extent]²`
/// with the square `(-inner_extent, inner_extent)²` cut out of the middle.
///
/// The vertices form rows of spacing close to `elem_size` in both directions,
/// every other row shifted by half a spacing,
/// and adjacent rows are zipped together into triangles.
/// Triangles whose barycenter lies inside the inner square are removed,
/// so the hole boundary follows the lattice rather than the exact square.
/// Row and column counts are rounded to even numbers
/// so that the mesh is symmetric about both axes.
///
/// The edges on the hole boundary are stored in the subset
/// [`INNER_BOUNDARY`][crate::INNER_BOUNDARY]
/// and the edges on the outer square in [`OUTER_BOUNDARY`][crate::OUTER_BOUNDARY].
/// An `inner_extent` of zero gives a full square with an empty inner boundary.
pub fn square_with_hole(
    outer_extent: f64,
    inner_extent: f64,
    elem_size: f64,
) -> Result<SimplicialMesh, LatticeError> {
    if !(outer_extent.is_finite() && outer_extent > 0.0) {
        return Err(LatticeError::InvalidOuterExtent(outer_extent));
    }
    if !(inner_extent.is_finite() && inner_extent >= 0.0 && inner_extent < outer_extent) {
        return Err(LatticeError::InvalidInnerExtent {
            inner: inner_extent,
            outer: outer_extent,
        });
    }
    if !(elem_size.is_finite() && elem_size > 0.0 && elem_size <= outer_extent) {
        return Err(LatticeError::InvalidElementSize(elem_size));
    }

    let side = 2.0 * outer_extent;
    let col_count = round_up_to_even((side / elem_size).round() as usize);
    let dx = side / col_count as f64;
    // equilateral triangles have height sqrt(3)/2 times their side length
    let row_count = round_up_to_even((side / (dx * 3f64.sqrt() / 2.0)).round() as usize);
    let dy = side / row_count as f64;

    let mut vertices: Vec<Vec2> = Vec::new();
    let mut rows: Vec<std::ops::Range<usize>> = Vec::with_capacity(row_count + 1);
    for row in 0..=row_count {
        let y = -outer_extent + row as f64 * dy;
        let row_start = vertices.len();
        if row % 2 == 0 {
            vertices.extend((0..=col_count).map(|i| Vec2::new(-outer_extent + i as f64 * dx, y)));
        } else {
            // shifted row, with extra vertices to keep the sides of the square straight
            vertices.push(Vec2::new(-outer_extent, y));
            vertices.extend(
                (0..col_count).map(|i| Vec2::new(-outer_extent + 0.5 * dx + i as f64 * dx, y)),
            );
            vertices.push(Vec2::new(outer_extent, y));
        }
        rows.push(row_start..vertices.len());
    }

    let mut indices: Vec<usize> = Vec::new();
    for (lower, upper) in rows.iter().tuple_windows() {
        zip_rows(&vertices, lower.clone(), upper.clone(), &mut indices);
    }

    // cut the hole
    let indices: Vec<usize> = indices
        .chunks_exact(3)
        .filter(|tri| {
            let barycenter = tri.iter().map(|i| vertices[*i]).sum::<Vec2>() / 3.0;
            !(barycenter.x.abs() < inner_extent && barycenter.y.abs() < inner_extent)
        })
        .flatten()
        .cloned()
        .collect();

    // drop vertices left inside the hole and compact the indices
    let mut new_index: Vec<Option<usize>> = vec![None; vertices.len()];
    for &i in &indices {
        new_index[i] = Some(0);
    }
    let mut kept_vertices = Vec::with_capacity(vertices.len());
    for (old_idx, slot) in new_index.iter_mut().enumerate() {
        if slot.is_some() {
            *slot = Some(kept_vertices.len());
            kept_vertices.push(vertices[old_idx]);
        }
    }
    let indices: Vec<usize> = indices
        .iter()
        .filter_map(|i| new_index[*i])
        .collect();

    let mut mesh = SimplicialMesh::new(kept_vertices, indices);

    // boundary edges on the outer square are those whose midpoint touches it,
    // the rest of the boundary surrounds the hole
    let boundary = mesh.boundary::<1>();
    let tolerance = 1e-9 * outer_extent;
    let outer = Subset::<1, Primal>::from_simplex_iter(mesh.simplices_in(&boundary).filter(
        |edge| {
            let mid = edge.circumcenter();
            mid.x.abs().max(mid.y.abs()) > outer_extent - tolerance
        },
    ));
    let inner = boundary.difference(&outer);
    mesh.store_subset::<1>(OUTER_BOUNDARY, outer);
    mesh.store_subset::<1>(INNER_BOUNDARY, inner);

    Ok(mesh)
}

fn round_up_to_even(n: usize) -> usize {
    let n = n.max(2);
    n + n % 2
}

/// Triangulate the strip between two rows of vertices
/// by always advancing the row whose next vertex is further left.
fn zip_rows(
    vertices: &[Vec2],
    lower: std::ops::Range<usize>,
    upper: std::ops::Range<usize>,
    indices: &mut Vec<usize>,
) {
    let (mut l, mut u) = (lower.start, upper.start);
    let (l_last, u_last) = (lower.end - 1, upper.end - 1);
    while l < l_last || u < u_last {
        let advance_lower = if l == l_last {
            false
        } else if u == u_last {
            true
        } else {
            let (next_l, next_u) = (vertices[l + 1].x, vertices[u + 1].x);
            if next_l != next_u {
                next_l < next_u
            } else {
                // on a tie, advance from the vertex further behind
                vertices[l].x <= vertices[u].x
            }
        };

        if advance_lower {
            indices.extend_from_slice(&[l, u, l + 1]);
            l += 1;
        } else {
            indices.extend_from_slice(&[l, u, u + 1]);
            u += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::relative_eq;

    #[test]
    fn square_without_hole_is_tiled() {
        let mesh = square_with_hole(1.0, 0.0, 0.5).expect("valid parameters");

        let total_area: f64 = mesh.simplices::<2>().map(|t| t.volume()).sum();
        assert!(relative_eq!(total_area, 4.0, epsilon = 1e-12));

        let inner = mesh.get_subset::<1>(INNER_BOUNDARY).unwrap();
        let outer = mesh.get_subset::<1>(OUTER_BOUNDARY).unwrap();
        assert!(inner.is_empty());
        assert_eq!(outer, mesh.boundary::<1>());

        let perimeter: f64 = mesh.simplices_in(&outer).map(|e| e.volume()).sum();
        assert!(relative_eq!(perimeter, 8.0, epsilon = 1e-12));

        let bounds = mesh.bounds();
        assert_eq!(bounds.min, Vec2::new(-1.0, -1.0));
        assert_eq!(bounds.max, Vec2::new(1.0, 1.0));
    }

    #[test]
    fn hole_is_cut_symmetrically() {
        let outer_extent = 2.0;
        let mesh = square_with_hole(outer_extent, 0.6, 0.5).expect("valid parameters");

        let inner = mesh.get_subset::<1>(INNER_BOUNDARY).unwrap();
        let outer = mesh.get_subset::<1>(OUTER_BOUNDARY).unwrap();
        assert!(!inner.is_empty());
        assert_eq!(inner.union(&outer), mesh.boundary::<1>());
        assert!(inner.intersection(&outer).is_empty());

        // the hole boundary is a closed loop: every vertex on it has two hole edges
        let mut vertex_degrees = vec![0; mesh.simplex_count::<0>()];
        for edge in mesh.simplices_in(&inner) {
            for v in edge.vertex_indices() {
                vertex_degrees[v] += 1;
            }
        }
        assert!(vertex_degrees.iter().all(|d| *d == 0 || *d == 2));

        // inner edges stay near the hole, outer edges on the square
        for edge in mesh.simplices_in(&inner) {
            let mid = edge.circumcenter();
            assert!(mid.x.abs().max(mid.y.abs()) < 0.6 + 0.5);
        }
        for edge in mesh.simplices_in(&outer) {
            let mid = edge.circumcenter();
            assert!(relative_eq!(mid.x.abs().max(mid.y.abs()), outer_extent));
        }

        // no vertices are left dangling inside the hole
        for vert in mesh.vertices() {
            assert!(vert.x.abs().max(vert.y.abs()) > 0.3);
        }

        // mirror symmetry about the y axis
        let mut centers: Vec<(i64, i64)> = mesh
            .circumcenters::<2>()
            .iter()
            .map(|c| ((c.x * 1e6).round() as i64, (c.y * 1e6).round() as i64))
            .collect();
        let mut mirrored: Vec<(i64, i64)> = centers.iter().map(|(x, y)| (-x, *y)).collect();
        centers.sort_unstable();
        mirrored.sort_unstable();
        assert_eq!(centers, mirrored);
    }

    #[test]
    fn lattice_triangles_are_well_centered() {
        let mesh = square_with_hole(1.0, 0.3, 0.25).expect("valid parameters");
        assert!(mesh.simplices::<1>().all(|e| e.dual_volume() > 0.0));
    }

    #[test]
    fn invalid_parameters() {
        assert_eq!(
            square_with_hole(-1.0, 0.0, 0.1).unwrap_err(),
            LatticeError::InvalidOuterExtent(-1.0)
        );
        assert!(matches!(
            square_with_hole(1.0, 1.0, 0.1),
            Err(LatticeError::InvalidInnerExtent { .. })
        ));
        assert!(matches!(
            square_with_hole(1.0, -0.5, 0.1),
            Err(LatticeError::InvalidInnerExtent { .. })
        ));
        assert_eq!(
            square_with_hole(1.0, 0.5, 0.0).unwrap_err(),
            LatticeError::InvalidElementSize(0.0)
        );
        assert_eq!(
            square_with_hole(1.0, 0.5, f64::NAN).unwrap_err().to_string(),
            "Element size must be in (0, outer extent], got NaN"
        );
    }
}
