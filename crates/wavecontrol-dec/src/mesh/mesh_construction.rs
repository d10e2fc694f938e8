use nalgebra_sparse as nas;

use itertools::{izip, Itertools};
use std::rc::Rc;

use super::{BoundingBox, SimplexCollection, SimplicialMesh};
use crate::Vec2;

/// Construct a mesh from raw vertices and triangle indices.
pub fn build_mesh(vertices: Vec<Vec2>, indices: Vec<usize>) -> SimplicialMesh {
    let vertices: Rc<[Vec2]> = Rc::from(vertices);
    let mut simplices: [SimplexCollection; 3] = std::array::from_fn(|i| SimplexCollection {
        simplex_size: i + 1,
        ..Default::default()
    });

    // the collection of 0-simplices is just the vertices in order
    // with volume 1
    simplices[0].indices = (0..vertices.len()).collect();
    simplices[0].circumcenters = vertices.clone();
    simplices[0].barycenters = vertices.clone();
    simplices[0].volumes.resize(vertices.len(), 1.0);

    //
    // triangles and edges
    //

    // by convention, sort simplices to have their indices in ascending order.
    // this gives a consistent way to identify a simplex with its vertices
    simplices[2].indices = indices;
    for tri in simplices[2].indices.chunks_exact_mut(3) {
        tri.sort_unstable();
    }

    let tri_count = simplices[2].len();
    // edge vertex indices, orientations and the triangle each edge came from,
    // sorted afterwards to deduplicate edges shared by two triangles
    // (these correspond to the matrix S++ in the PyDEC paper section 7)
    let mut edge_records: Vec<([usize; 2], i8, usize)> = Vec::with_capacity(3 * tri_count);
    for (tri_idx, tri) in simplices[2].indices.chunks_exact(3).enumerate() {
        // sorted vertex order gives a clockwise triangle about half the time.
        // flip the whole boundary of those so that every triangle is counterclockwise
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| vertices[i]);
        let cross = (b - a).perp(&(c - a));
        assert!(cross != 0.0, "Degenerate triangle {tri:?}");
        let winding: i8 = if cross > 0.0 { 1 } else { -1 };

        for exclude_idx in 0..3 {
            let mut edge = [0; 2];
            for (slot, vert) in tri
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != exclude_idx)
                .map(|(_, v)| v)
                .enumerate()
            {
                edge[slot] = *vert;
            }
            // boundary orientations alternate between forward and backward
            // when defined in this order.
            // see Discrete Differential Forms for Computational Modeling by Desbrun et al. (2006)
            let orientation = if exclude_idx % 2 == 0 { 1 } else { -1 };
            edge_records.push((edge, winding * orientation, tri_idx));
        }
    }
    edge_records.sort_unstable_by_key(|(edge, _, _)| *edge);

    // rows of the coboundary map are edges, columns triangles.
    // column indices and values come directly from the sorted records,
    // only the row offsets need to be computed
    let mut row_offsets: Vec<usize> = vec![0];
    let mut record_iter = edge_records.iter().enumerate().peekable();
    while let Some((record_idx, (edge, _, _))) = record_iter.next() {
        // a duplicate means this edge is shared by the next triangle too,
        // so we stay on the same row
        if matches!(record_iter.peek(), Some((_, (next_edge, _, _))) if next_edge == edge) {
            continue;
        }
        row_offsets.push(record_idx + 1);
        simplices[1].indices.extend_from_slice(edge);
    }
    let (cob_cols, cob_vals): (Vec<usize>, Vec<i8>) = edge_records
        .iter()
        .map(|(_, orientation, tri_idx)| (*tri_idx, *orientation))
        .unzip();

    let edge_count = simplices[1].len();
    let edge_coboundary =
        nas::CsrMatrix::try_from_unsorted_csr_data(edge_count, tri_count, row_offsets, cob_cols, cob_vals)
            .expect("Error in coboundary matrix construction. This is a bug in wavecontrol-dec");
    simplices[2].boundary_map = edge_coboundary.transpose();
    simplices[1].coboundary_map = edge_coboundary;

    // edge boundaries are vertices; no deduplication needed here
    let mut edge_boundary = nas::CooMatrix::new(edge_count, vertices.len());
    for (edge_idx, edge) in simplices[1].indices.chunks_exact(2).enumerate() {
        edge_boundary.push(edge_idx, edge[0], -1);
        edge_boundary.push(edge_idx, edge[1], 1);
    }
    let edge_boundary = nas::CsrMatrix::from(&edge_boundary);
    simplices[0].coboundary_map = edge_boundary.transpose();
    simplices[1].boundary_map = edge_boundary;

    // empty matrices with the right row counts so that row indexing works on them too
    simplices[0].boundary_map = nas::CsrMatrix::zeros(vertices.len(), 0);
    simplices[2].coboundary_map = nas::CsrMatrix::zeros(tri_count, 0);

    //
    // identify mesh boundary
    //

    for simplices in &mut simplices {
        simplices.mesh_boundary.grow(simplices.len());
    }
    // an edge on the boundary of only one triangle is on the mesh boundary,
    // and so are its vertices
    for (edge_idx, cob_row) in simplices[1].coboundary_map.row_iter().enumerate() {
        if cob_row.nnz() == 1 {
            simplices[1].mesh_boundary.insert(edge_idx);
        }
    }
    let boundary_verts: Vec<usize> = simplices[1]
        .mesh_boundary
        .ones()
        .flat_map(|edge_idx| simplices[1].simplex_indices(edge_idx).to_vec())
        .collect();
    for vert_idx in boundary_verts {
        simplices[0].mesh_boundary.insert(vert_idx);
    }

    //
    // circumcenters, barycenters and primal volumes
    //

    let midpoints: Vec<Vec2> = simplices[1]
        .indices
        .chunks_exact(2)
        .map(|e| 0.5 * (vertices[e[0]] + vertices[e[1]]))
        .collect();
    let lengths: Vec<f64> = simplices[1]
        .indices
        .chunks_exact(2)
        .map(|e| (vertices[e[1]] - vertices[e[0]]).magnitude())
        .collect();
    simplices[1].barycenters = Rc::from(midpoints.clone());
    simplices[1].circumcenters = Rc::from(midpoints);
    simplices[1].volumes = lengths;

    // closed-form circumcenter of a triangle in coordinates relative to its first vertex,
    // together with its barycentric coordinates,
    // which give the signs of the elementary dual volumes below
    let mut tri_circumcenters = Vec::with_capacity(tri_count);
    let mut tri_circumcenter_barys: Vec<[f64; 3]> = Vec::with_capacity(tri_count);
    let mut tri_barycenters = Vec::with_capacity(tri_count);
    let mut areas = Vec::with_capacity(tri_count);
    for tri in simplices[2].indices.chunks_exact(3) {
        let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| vertices[i]);
        let (ab, ac) = (b - a, c - a);
        let cross = ab.perp(&ac);
        let denom = 2.0 * cross;
        let rel_center = Vec2::new(
            (ac.y * ab.norm_squared() - ab.y * ac.norm_squared()) / denom,
            (ab.x * ac.norm_squared() - ac.x * ab.norm_squared()) / denom,
        );
        let center = a + rel_center;
        // barycentric coordinates are ratios of signed sub-triangle areas
        let bary = [
            (c - b).perp(&(center - b)) / cross,
            (a - c).perp(&(center - c)) / cross,
            ab.perp(&rel_center) / cross,
        ];

        tri_circumcenters.push(center);
        tri_circumcenter_barys.push(bary);
        tri_barycenters.push((a + b + c) / 3.0);
        areas.push(0.5 * cross.abs());
    }
    simplices[2].circumcenters = Rc::from(tri_circumcenters);
    simplices[2].barycenters = Rc::from(tri_barycenters);
    simplices[2].volumes = areas;

    //
    // dual volumes
    //

    // accumulated from the "first circumcentric subdivision" of each triangle
    // (see Desbrun et al. (2005). Discrete Exterior Calculus, chapter 3):
    // the segment from the triangle's circumcenter to each edge midpoint
    // contributes to the dual edge, and the two right triangles it forms
    // with the edge's halves contribute to the dual cells of the edge's vertices.
    // an elementary dual is negative if the circumcenter is on the opposite side
    // of the edge from the triangle's third vertex.
    // see Hirani et al. (2012). Delaunay Hodge Star
    let mut vertex_dual_areas = vec![0.0; vertices.len()];
    let mut edge_dual_lengths = vec![0.0; edge_count];
    for (tri_idx, (tri, bary)) in izip!(
        simplices[2].indices.chunks_exact(3),
        &tri_circumcenter_barys
    )
    .enumerate()
    {
        let center = simplices[2].circumcenters[tri_idx];
        for &edge_idx in simplices[2].boundary_map.row(tri_idx).col_indices() {
            let edge = simplices[1].simplex_indices(edge_idx);
            let (opposite_idx, _) = tri
                .iter()
                .find_position(|&v| !edge.contains(v))
                .expect("A triangle has a vertex opposite each of its edges");
            let sign = bary[opposite_idx].signum();

            let dual_part = (center - simplices[1].circumcenters[edge_idx])
                .magnitude()
                .copysign(sign);
            edge_dual_lengths[edge_idx] += dual_part;

            let half_edge_area = 0.25 * simplices[1].volumes[edge_idx] * dual_part;
            for &vert_idx in edge {
                vertex_dual_areas[vert_idx] += half_edge_area;
            }
        }
    }
    simplices[0].dual_volumes = vertex_dual_areas;
    simplices[1].dual_volumes = edge_dual_lengths;
    simplices[2].dual_volumes = vec![1.0; tri_count];

    let bounds = vertices.iter().fold(
        BoundingBox {
            min: Vec2::repeat(f64::MAX),
            max: Vec2::repeat(f64::MIN),
        },
        |bounds, v| BoundingBox {
            min: bounds.min.inf(v),
            max: bounds.max.sup(v),
        },
    );

    SimplicialMesh {
        vertices,
        simplices,
        bounds,
    }
}

/// A small hexagon-shaped 2D mesh for testing basic functionality.
/// Shape roughly like this:
///    ____
///   /\  /\
///  /__\/__\
///  \  /\  /
///   \/__\/
///
/// with vertices in order from top left to bottom right.
#[doc(hidden)]
pub fn tiny_mesh_2d() -> SimplicialMesh {
    let vertices = vec![
        Vec2::new(-0.5, 1.0),
        Vec2::new(0.5, 1.0),
        Vec2::new(-1.0, 0.0),
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(-0.5, -1.0),
        Vec2::new(0.5, -1.0),
    ];
    #[rustfmt::skip]
    let indices = vec![
        0, 2, 3,
        0, 3, 1,
        1, 3, 4,
        2, 5, 3,
        5, 3, 6,
        3, 6, 4,
    ];
    SimplicialMesh::new(vertices, indices)
}
