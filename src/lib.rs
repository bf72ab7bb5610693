//! # uvtransfer
//!
//! Transfer vertex positions between two meshes that share a UV layout.
//!
//! Every face corner (loop) of the target mesh is matched to the source loop
//! whose UV coordinate is nearest, and the source vertex position is copied
//! onto the target vertex. This lets a retopologized or re-sculpted mesh take
//! on the shape of another mesh as long as both were unwrapped the same way.
//!
//! ## Features
//!
//! - **Loop-based polygon mesh**: per-corner UV layers with seams, type-safe indices
//! - **UV index**: a balanced 2D k-d tree with deterministic tie-breaking
//! - **Transfer**: last-write-wins position copy with optional parallel queries
//! - **Host layer**: active/selected object resolution with undo
//! - **File formats**: OBJ (read/write), glTF (read)
//!
//! ## Quick Start
//!
//! ```no_run
//! use uvtransfer::prelude::*;
//!
//! let source: Mesh = uvtransfer::io::load("sculpt.obj").unwrap();
//! let mut target: Mesh = uvtransfer::io::load("retopo.obj").unwrap();
//!
//! let report = uv_transfer(&source, &mut target, &TransferOptions::default()).unwrap();
//! println!("{} vertices written", report.vertices_written);
//!
//! uvtransfer::io::save(&target, "retopo_shaped.obj").unwrap();
//! ```
//!
//! ## Building Meshes Programmatically
//!
//! ```
//! use uvtransfer::prelude::*;
//! use nalgebra::{Point2, Point3};
//!
//! let vertices = vec![
//!     Point3::new(0.0, 0.0, 0.0),
//!     Point3::new(1.0, 0.0, 0.0),
//!     Point3::new(1.0, 1.0, 0.0),
//!     Point3::new(0.0, 1.0, 0.0),
//! ];
//! let mut mesh: Mesh = build_from_polygons(&vertices, &[vec![0, 1, 2, 3]]).unwrap();
//! assert_eq!(mesh.num_loops(), 4);
//!
//! // One UV per loop, in loop order.
//! let uvs = vertices.iter().map(|p| Point2::new(p.x, p.y)).collect();
//! mesh.add_uv_layer("UVMap", uvs).unwrap();
//! assert!(mesh.has_uvs());
//! ```
//!
//! ## Reusing a Correspondence
//!
//! The matching step can be run once and applied to several meshes that
//! share the target's topology:
//!
//! ```
//! use uvtransfer::prelude::*;
//! use nalgebra::{Point2, Point3};
//!
//! # let vertices = vec![
//! #     Point3::new(0.0, 0.0, 0.0),
//! #     Point3::new(1.0, 0.0, 0.0),
//! #     Point3::new(0.0, 1.0, 0.0),
//! # ];
//! # let mut source: Mesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
//! # let uvs = vertices.iter().map(|p| Point2::new(p.x, p.y)).collect();
//! # source.add_uv_layer("UVMap", uvs).unwrap();
//! # let mut target = source.clone();
//! let index = UvIndex::from_mesh(&source, MeshRole::Source).unwrap();
//! let options = TransferOptions::default();
//! let correspondence = find_correspondence(&index, &target, &options).unwrap();
//! assert_eq!(correspondence.exact_matches(), 3);
//!
//! apply_correspondence(&correspondence, &source, &mut target).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod algo;
pub mod error;
pub mod host;
pub mod io;
pub mod mesh;

/// Prelude module for convenient imports.
///
/// This module re-exports the most commonly used types and functions:
///
/// ```
/// use uvtransfer::prelude::*;
/// ```
pub mod prelude {
    pub use crate::algo::{
        apply_correspondence, build_index, find_correspondence, resolve_and_copy, uv_transfer,
        Correspondence, Progress, TransferOptions, TransferReport, UvIndex, UvIndexBuilder,
    };
    pub use crate::error::{MeshRole, Result, TransferError};
    pub use crate::host::{Scene, SceneObject, UvTransferOperator};
    pub use crate::mesh::{
        build_from_polygons, build_from_triangles, to_face_vertex, FaceId, LoopId, Mesh,
        MeshBuilder, MeshIndex, UvLayer, UvPoint, VertexId,
    };
}

// Re-export nalgebra types for convenience
pub use nalgebra;

#[cfg(test)]
mod tests {
    use super::prelude::*;
    use nalgebra::{Point2, Point3};

    /// A 3x3 grid of quads whose UVs are the XY coordinates scaled to [0, 1].
    fn grid(z: f64) -> Mesh {
        let n = 4;
        let mut vertices = Vec::new();
        for j in 0..n {
            for i in 0..n {
                vertices.push(Point3::new(i as f64, j as f64, z));
            }
        }
        let mut faces = Vec::new();
        for j in 0..n - 1 {
            for i in 0..n - 1 {
                let a = j * n + i;
                faces.push(vec![a, a + 1, a + n + 1, a + n]);
            }
        }
        let mut mesh: Mesh = build_from_polygons(&vertices, &faces).unwrap();
        let scale = (n - 1) as f64;
        let uvs = mesh
            .loop_ids()
            .map(|l| {
                let p = mesh.position(mesh.loop_vertex(l));
                Point2::new(p.x / scale, p.y / scale)
            })
            .collect();
        mesh.add_uv_layer("UVMap", uvs).unwrap();
        mesh
    }

    #[test]
    fn test_grid_transfer() {
        let source = grid(2.0);
        let mut target = grid(0.0);

        let report = uv_transfer(&source, &mut target, &TransferOptions::default()).unwrap();

        assert_eq!(report.loops_matched, 36);
        assert_eq!(report.vertices_written, 16);
        assert_eq!(report.exact_matches, 36);
        assert_eq!(report.conflicting_vertices, 0);
        assert_eq!(target.positions(), source.positions());
    }
}
