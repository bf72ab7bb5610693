//! Mesh construction utilities.
//!
//! [`MeshBuilder`] assembles a mesh element by element. The `build_from_*`
//! functions wrap it for the face-vertex lists commonly found in mesh file
//! formats.

use nalgebra::{Point2, Point3};

use super::index::{FaceId, MeshIndex, VertexId};
use super::polymesh::Mesh;
use crate::error::{Result, TransferError};

/// Incremental mesh construction.
///
/// UV layers may be declared at any point; they are attached in [`build`]
/// once the loop count is final.
///
/// [`build`]: MeshBuilder::build
///
/// # Example
/// ```
/// use uvtransfer::mesh::{Mesh, MeshBuilder};
/// use nalgebra::{Point2, Point3};
///
/// let mut builder: MeshBuilder = MeshBuilder::new();
/// let a = builder.add_vertex(Point3::new(0.0, 0.0, 0.0));
/// let b = builder.add_vertex(Point3::new(1.0, 0.0, 0.0));
/// let c = builder.add_vertex(Point3::new(0.0, 1.0, 0.0));
/// builder.add_face(&[a, b, c]).unwrap();
/// builder.add_uv_layer(
///     "UVMap",
///     vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)],
/// );
///
/// let mesh: Mesh = builder.build().unwrap();
/// assert_eq!(mesh.num_loops(), 3);
/// assert!(mesh.has_uvs());
/// ```
#[derive(Debug, Clone)]
pub struct MeshBuilder<I: MeshIndex = u32> {
    mesh: Mesh<I>,
    uv_layers: Vec<(String, Vec<Point2<f64>>)>,
    active_uv_layer: Option<usize>,
}

impl<I: MeshIndex> Default for MeshBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> MeshBuilder<I> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self::with_capacity(0, 0, 0)
    }

    /// Create a builder with preallocated element storage.
    pub fn with_capacity(num_vertices: usize, num_loops: usize, num_faces: usize) -> Self {
        Self {
            mesh: Mesh::with_capacity(num_vertices, num_loops, num_faces),
            uv_layers: Vec::new(),
            active_uv_layer: None,
        }
    }

    /// Number of vertices added so far.
    pub fn num_vertices(&self) -> usize {
        self.mesh.num_vertices()
    }

    /// Number of loops added so far.
    pub fn num_loops(&self) -> usize {
        self.mesh.num_loops()
    }

    /// Number of faces added so far.
    pub fn num_faces(&self) -> usize {
        self.mesh.num_faces()
    }

    /// Add a vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        self.mesh.add_vertex(position)
    }

    /// Add a polygonal face and return its ID.
    ///
    /// Fails with [`TransferError::DegenerateFace`] for faces with fewer than
    /// three corners or a repeated vertex, and with
    /// [`TransferError::InvalidVertexIndex`] for unknown vertices. A rejected
    /// face leaves the builder unchanged.
    pub fn add_face(&mut self, corners: &[VertexId<I>]) -> Result<FaceId<I>> {
        self.mesh.add_face(corners)
    }

    /// Declare a UV layer with one coordinate per loop and return its index.
    ///
    /// The first layer becomes active. Lengths are checked in
    /// [`MeshBuilder::build`].
    pub fn add_uv_layer(&mut self, name: impl Into<String>, coords: Vec<Point2<f64>>) -> usize {
        self.uv_layers.push((name.into(), coords));
        let index = self.uv_layers.len() - 1;
        if self.active_uv_layer.is_none() {
            self.active_uv_layer = Some(index);
        }
        index
    }

    /// Make a declared UV layer active.
    pub fn set_active_uv_layer(&mut self, index: usize) -> Result<()> {
        if index >= self.uv_layers.len() {
            return Err(TransferError::invalid_state(format!(
                "UV layer {} does not exist ({} layers)",
                index,
                self.uv_layers.len()
            )));
        }
        self.active_uv_layer = Some(index);
        Ok(())
    }

    /// Finish the mesh.
    ///
    /// Fails with [`TransferError::EmptyMesh`] if no face was added and with
    /// [`TransferError::UvLayerLengthMismatch`] if a layer does not have one
    /// coordinate per loop.
    pub fn build(self) -> Result<Mesh<I>> {
        let MeshBuilder {
            mut mesh,
            uv_layers,
            active_uv_layer,
        } = self;

        if mesh.num_faces() == 0 {
            return Err(TransferError::EmptyMesh);
        }
        for (name, coords) in uv_layers {
            mesh.add_uv_layer(name, coords)?;
        }
        if let Some(index) = active_uv_layer {
            mesh.set_active_uv_layer(index)?;
        }
        Ok(mesh)
    }
}

/// Build a mesh from vertices and polygonal faces.
///
/// Each face lists its corner vertex indices in order; one loop is created per
/// corner. The resulting mesh has no UV layer.
///
/// # Example
/// ```
/// use uvtransfer::mesh::{build_from_polygons, Mesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(1.0, 1.0, 0.0),
///     Point3::new(0.0, 1.0, 0.0),
/// ];
/// let faces = vec![vec![0, 1, 2, 3]];
///
/// let mesh: Mesh = build_from_polygons(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_loops(), 4);
/// ```
pub fn build_from_polygons<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[Vec<usize>],
) -> Result<Mesh<I>> {
    if faces.is_empty() {
        return Err(TransferError::EmptyMesh);
    }

    let num_loops = faces.iter().map(Vec::len).sum();
    let mut builder = MeshBuilder::with_capacity(vertices.len(), num_loops, faces.len());
    for &p in vertices {
        builder.add_vertex(p);
    }

    let mut corners: Vec<VertexId<I>> = Vec::new();
    for (fi, face) in faces.iter().enumerate() {
        corners.clear();
        for &vi in face {
            if vi >= vertices.len() {
                return Err(TransferError::InvalidVertexIndex { face: fi, vertex: vi });
            }
            corners.push(VertexId::new(vi));
        }
        builder.add_face(&corners)?;
    }

    builder.build()
}

/// Build a mesh from vertices and triangle faces.
///
/// # Example
/// ```
/// use uvtransfer::mesh::{build_from_triangles, Mesh};
/// use nalgebra::Point3;
///
/// let vertices = vec![
///     Point3::new(0.0, 0.0, 0.0),
///     Point3::new(1.0, 0.0, 0.0),
///     Point3::new(0.5, 1.0, 0.0),
/// ];
/// let faces = vec![[0, 1, 2]];
///
/// let mesh: Mesh = build_from_triangles(&vertices, &faces).unwrap();
/// assert_eq!(mesh.num_vertices(), 3);
/// assert_eq!(mesh.num_faces(), 1);
/// ```
pub fn build_from_triangles<I: MeshIndex>(
    vertices: &[Point3<f64>],
    faces: &[[usize; 3]],
) -> Result<Mesh<I>> {
    let polygons: Vec<Vec<usize>> = faces.iter().map(|f| f.to_vec()).collect();
    build_from_polygons(vertices, &polygons)
}

/// Convert a mesh back to a face-vertex representation.
///
/// Returns vertex positions and, per face, its corner vertex indices.
pub fn to_face_vertex<I: MeshIndex>(mesh: &Mesh<I>) -> (Vec<Point3<f64>>, Vec<Vec<usize>>) {
    let faces = mesh
        .face_ids()
        .map(|f| mesh.face_vertices(f).map(|v| v.index()).collect())
        .collect();
    (mesh.positions(), faces)
}

/// Expand per-vertex UV coordinates into per-loop coordinates.
///
/// Formats such as glTF store one UV per vertex; every loop inherits the UV
/// of the vertex it references.
pub fn loop_uvs_from_vertex_uvs<I: MeshIndex>(
    mesh: &Mesh<I>,
    vertex_uvs: &[Point2<f64>],
) -> Result<Vec<Point2<f64>>> {
    if vertex_uvs.len() != mesh.num_vertices() {
        return Err(TransferError::invalid_state(format!(
            "expected {} vertex UVs, got {}",
            mesh.num_vertices(),
            vertex_uvs.len()
        )));
    }
    Ok(mesh
        .loop_ids()
        .map(|l| vertex_uvs[mesh.loop_vertex(l).index()])
        .collect())
}
