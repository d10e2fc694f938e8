//! Utilities for loading meshes generated with [`gmsh`](https://www.gmsh.info/).
//!
//! Only version 4.1 of the MSH format is supported,
//! as per the [`mshio`] library.

use std::collections::{HashMap, HashSet};

use crate::{mesh::Subset, Primal, SimplicialMesh, Vec2, INNER_BOUNDARY, OUTER_BOUNDARY};

/// Error in loading a mesh from a Gmsh .msh file.
#[derive(thiserror::Error, Debug)]
pub enum GmshError {
    /// Error parsing the .msh data.
    ///
    /// (the parser error is converted to a string
    /// to avoid lifetime issues with the byte slices it contains)
    #[error("Parsing the .msh data failed: {0}")]
    ParseError(String),
    /// The given .msh data contains no nodes.
    #[error("Invalid .msh data: no nodes")]
    MissingNodes,
    /// The given .msh data contains no triangle elements.
    #[error("Invalid .msh data: no elements of the correct type")]
    MissingElements,
    /// A physical group that was asked for doesn't exist in the data.
    #[error("Invalid .msh data: no physical group with tag {0}")]
    MissingPhysicalGroup(i32),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
struct EntityId {
    dim: i32,
    tag: i32,
}

#[derive(Clone, Debug, Default)]
struct PhysicalGroup {
    entities: HashSet<EntityId>,
    nodes: HashSet<usize>,
}

/// Load a 2D triangle mesh from `.msh` data.
///
/// First-order triangle elements in the file are interpreted as the triangles of the mesh.
/// These must be of type `Tri3` (see [`ElementType`][mshio::ElementType]).
/// The `z` coordinate of vertices is dropped to project the mesh to 2D space.
///
/// # Physical groups
///
/// If the .msh data contains physical groups,
/// mesh subsets of all dimensions are generated corresponding to them.
/// These subsets can be looked up with the physical group's integer tag
/// using [`get_subset`][crate::SimplicialMesh::get_subset].
///
/// These subsets only include simplices where **every** vertex belongs to the group.
/// Consequently, a group containing curves must also contain
/// the points at the curves' ends, e.g.
/// ```text
/// Physical Curve(100) = {1};
/// Physical Point(100) = {1, 2}; // also add the curve endpoints!
/// ```
pub fn load_trimesh_2d(bytes: &[u8]) -> Result<SimplicialMesh, GmshError> {
    let msh = mshio::parse_msh_bytes(bytes).map_err(|e| GmshError::ParseError(format!("{}", e)))?;
    let nodes = msh.data.nodes.ok_or(GmshError::MissingNodes)?;
    let elements = msh.data.elements.ok_or(GmshError::MissingElements)?;

    let mut physical_groups = gather_physical_groups(msh.data.entities.as_ref());

    let mut vertices: Vec<Vec2> = Vec::new();
    for block in &nodes.node_blocks {
        let ent_id = EntityId {
            dim: block.entity_dim,
            tag: block.entity_tag,
        };
        let mut phys_groups: Vec<&mut PhysicalGroup> = physical_groups
            .values_mut()
            .filter(|pg| pg.entities.contains(&ent_id))
            .collect();

        for node in &block.nodes {
            let vert_idx = vertices.len();
            vertices.push(Vec2::new(node.x, node.y));
            for g in &mut phys_groups {
                g.nodes.insert(vert_idx);
            }
        }
    }

    if vertices.is_empty() {
        return Err(GmshError::MissingNodes);
    }

    let indices: Vec<usize> = elements
        .element_blocks
        .iter()
        .filter(|block| block.element_type == mshio::ElementType::Tri3)
        .flat_map(|block| block.elements.iter())
        .flat_map(|el| el.nodes.iter())
        // gmsh tags start at 1 and are assumed sequential,
        // so subtracting 1 gives the index in the vertex array
        .map(|node_tag| *node_tag as usize - 1)
        .collect();
    if indices.is_empty() {
        return Err(GmshError::MissingElements);
    }

    let mut mesh = SimplicialMesh::new(vertices, indices);
    for (group_id, group) in physical_groups.iter() {
        let group_name = format!("{}", group_id);
        // the subset of vertices is just the nodes in the group.
        // for other dimensions, only include simplices
        // for which all vertices belong to the group
        mesh.store_subset::<0>(&group_name, Subset::from_indices(group.nodes.iter().cloned()));

        let edges = Subset::<1, Primal>::from_predicate(&mesh, |s| {
            s.vertex_indices().all(|i| group.nodes.contains(&i))
        });
        mesh.store_subset::<1>(&group_name, edges);

        let tris = Subset::<2, Primal>::from_predicate(&mesh, |s| {
            s.vertex_indices().all(|i| group.nodes.contains(&i))
        });
        mesh.store_subset::<2>(&group_name, tris);
    }

    Ok(mesh)
}

/// Load a scatterer mesh: a 2D triangle mesh with a hole in the middle
/// and two physical groups marking the boundary of the hole
/// and the outer boundary of the domain.
///
/// The edge subsets of the two groups are additionally stored under the names
/// [`INNER_BOUNDARY`][crate::INNER_BOUNDARY] and [`OUTER_BOUNDARY`][crate::OUTER_BOUNDARY].
/// Returns [`GmshError::MissingPhysicalGroup`] if either group doesn't exist.
pub fn load_scatterer_mesh(
    bytes: &[u8],
    inner_group: i32,
    outer_group: i32,
) -> Result<SimplicialMesh, GmshError> {
    let mut mesh = load_trimesh_2d(bytes)?;
    for (tag, name) in [(inner_group, INNER_BOUNDARY), (outer_group, OUTER_BOUNDARY)] {
        let edges = mesh
            .get_subset::<1>(&format!("{}", tag))
            .ok_or(GmshError::MissingPhysicalGroup(tag))?;
        mesh.store_subset::<1>(name, edges);
    }
    Ok(mesh)
}

/// Collect the physical groups defined in a .msh file
/// into a structure we can easily look them up from.
///
/// This only populates the `entities` field of each group;
/// nodes are filled in by the loader.
fn gather_physical_groups(
    entities: Option<&mshio::Entities<i32, f64>>,
) -> HashMap<i32, PhysicalGroup> {
    let Some(entities) = entities else {
        return HashMap::new();
    };

    let mut groups: HashMap<i32, PhysicalGroup> = HashMap::new();
    let mut insert = |dim: i32, tag: i32, physical_tags: &[i32]| {
        for ptag in physical_tags {
            groups
                .entry(*ptag)
                .or_default()
                .entities
                .insert(EntityId { dim, tag });
        }
    };

    for point in &entities.points {
        insert(0, point.tag, &point.physical_tags);
    }
    for curve in &entities.curves {
        insert(1, curve.tag, &curve.physical_tags);
    }
    for surface in &entities.surfaces {
        insert(2, surface.tag, &surface.physical_tags);
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_MESH: &[u8] = include_bytes!("gmsh/test_mesh_2d.msh");

    #[test]
    fn physical_groups_2d() {
        let mesh = load_trimesh_2d(TEST_MESH).expect("Failed to load mesh");
        assert_eq!(mesh.simplex_count::<0>(), 6);
        assert_eq!(mesh.simplex_count::<2>(), 5);

        // group 100 is the bottom edge of the unit square,
        // ensure it's there and contains the entire edge
        let subset_0 = mesh.get_subset::<0>("100").expect("subset didn't exist");
        let subset_1 = mesh.get_subset::<1>("100").expect("subset didn't exist");
        let subset_2 = mesh.get_subset::<2>("100").expect("subset didn't exist");

        assert_eq!(subset_0.count(), 3, "subset should contain 3 vertices");
        assert_eq!(subset_1.count(), 2, "subset should contain 2 edges");
        assert!(subset_2.is_empty(), "subset shouldn't contain faces");

        for simp in mesh.simplices_in(&subset_1) {
            for vert in simp.vertices() {
                assert_eq!(
                    vert.y, 0.,
                    "contained an edge {vert:?} that wasn't on the bottom edge"
                );
            }
        }
        for edge in mesh
            .simplices::<1>()
            .filter(|e| e.vertices().all(|v| v.y == 0.))
        {
            assert!(
                subset_1.contains(edge),
                "a bottom edge {edge:?} was not in the subset"
            );
        }

        // group 200 is the top edge, which has no interior nodes
        let top = mesh.get_subset::<1>("200").expect("subset didn't exist");
        assert_eq!(top.count(), 1);
    }

    #[test]
    fn scatterer_groups_are_renamed() {
        let mesh = load_scatterer_mesh(TEST_MESH, 200, 100).expect("Failed to load mesh");
        assert_eq!(
            mesh.get_subset::<1>(INNER_BOUNDARY),
            mesh.get_subset::<1>("200")
        );
        assert_eq!(
            mesh.get_subset::<1>(OUTER_BOUNDARY),
            mesh.get_subset::<1>("100")
        );

        assert!(matches!(
            load_scatterer_mesh(TEST_MESH, 300, 100),
            Err(GmshError::MissingPhysicalGroup(300))
        ));
    }

    #[test]
    fn invalid_data_is_an_error() {
        assert!(matches!(
            load_trimesh_2d(b"definitely not a mesh"),
            Err(GmshError::ParseError(_))
        ));

        // cut the data off before the elements section
        let text = std::str::from_utf8(TEST_MESH).unwrap();
        let no_elements = &text[..text.find("$Elements").unwrap()];
        assert!(matches!(
            load_trimesh_2d(no_elements.as_bytes()),
            Err(GmshError::MissingElements)
        ));
    }
}
