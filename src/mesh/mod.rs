//! Core mesh data structures.
//!
//! This module provides the loop-based polygon mesh used by the transfer
//! algorithms.
//!
//! # Overview
//!
//! A [`Mesh`] is an ordered list of vertices (3D positions) and an ordered list
//! of face-loops. A face-loop is one corner of one face: it references exactly
//! one vertex and carries one UV coordinate per [`UvLayer`]. Several loops can
//! reference the same vertex, and on a UV seam those loops carry different
//! coordinates.
//!
//! # Index Types
//!
//! Mesh elements are identified by type-safe index wrappers:
//! - [`VertexId`] - Identifies a vertex
//! - [`LoopId`] - Identifies a face-loop
//! - [`FaceId`] - Identifies a face
//!
//! These indices are generic over the underlying integer type ([`MeshIndex`] trait),
//! allowing you to choose `u16`, `u32`, or `u64` based on mesh size.
//!
//! # Construction
//!
//! ```
//! use uvtransfer::mesh::{build_from_polygons, Mesh};
//! use nalgebra::{Point2, Point3};
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(0.5, 1.0, 0.0),
//! ];
//! let mut mesh: Mesh = build_from_polygons(&vertices, &[vec![0, 1, 2]]).unwrap();
//! mesh.add_uv_layer(
//!     "UVMap",
//!     vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.5, 1.0)],
//! )
//! .unwrap();
//! assert!(mesh.has_uvs());
//! ```

mod builder;
mod index;
mod polymesh;
mod uv;

pub use builder::{
    build_from_polygons, build_from_triangles, loop_uvs_from_vertex_uvs, to_face_vertex,
    MeshBuilder,
};
pub use index::{FaceId, LoopId, MeshIndex, VertexId};
pub use polymesh::{Face, Loop, Mesh, Vertex};
pub use uv::{UvLayer, UvPoint};
