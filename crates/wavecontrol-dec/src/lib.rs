//! A small Discrete Exterior Calculus toolkit for two-dimensional triangle meshes.
//!
//! This crate provides the mesh structures and operators
//! that the `wavecontrol` solvers are built on:
//! simplicial meshes with their circumcentric duals,
//! cochains typed by dimension and primality,
//! exterior derivatives and diagonal Hodge stars
//! composable into sparse matrix operators,
//! named subsets of simplices,
//! and two ways of obtaining a mesh
//! (loading a [`gmsh`] file or generating one with [`lattice`]).

#![warn(missing_docs)]

pub mod mesh;
#[doc(inline)]
pub use mesh::{BoundingBox, Dual, Primal, SimplexIter, SimplexView, SimplicialMesh, Subset};

pub mod cochain;
#[doc(inline)]
pub use cochain::Cochain;

pub mod operator;
#[doc(inline)]
pub use operator::{DiagonalOperator, MatrixOperator, Op, Operator};

pub mod gmsh;

pub mod lattice;

/// Name of the edge subset forming the surface of the scattering obstacle.
pub const INNER_BOUNDARY: &str = "inner boundary";
/// Name of the edge subset forming the absorbing far boundary.
pub const OUTER_BOUNDARY: &str = "outer boundary";

// nalgebra re-exports of common types for convenience

pub use nalgebra as na;
/// Type alias for a 2D `nalgebra` vector.
pub type Vec2 = na::Vector2<f64>;
