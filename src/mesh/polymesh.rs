//! Loop-based polygon mesh.
//!
//! A [`Mesh`] stores vertices, faces and face-loops (face corners). Every face
//! owns a contiguous run of loops in corner order; each loop references one
//! vertex. Per-corner attributes such as UV coordinates are stored per loop,
//! which lets a vertex on a UV seam carry several coordinates.

use std::collections::HashSet;

use nalgebra::{Point2, Point3};

use super::index::{FaceId, LoopId, MeshIndex, VertexId};
use super::uv::{UvLayer, UvPoint};
use crate::error::{Result, TransferError};

/// A vertex in the mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    /// The 3D position of this vertex.
    pub position: Point3<f64>,
}

impl Vertex {
    /// Create a new vertex at the given position.
    pub fn new(position: Point3<f64>) -> Self {
        Self { position }
    }
}

/// A face corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Loop<I: MeshIndex = u32> {
    /// The vertex at this corner.
    pub vertex: VertexId<I>,
    /// The face this corner belongs to.
    pub face: FaceId<I>,
}

/// A polygonal face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Face<I: MeshIndex = u32> {
    /// First loop of the face.
    pub loop_start: LoopId<I>,
    /// Number of corners.
    pub loop_count: usize,
}

/// A polygon mesh with per-loop UV layers.
#[derive(Debug, Clone)]
pub struct Mesh<I: MeshIndex = u32> {
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) loops: Vec<Loop<I>>,
    pub(crate) faces: Vec<Face<I>>,
    pub(crate) uv_layers: Vec<UvLayer<I>>,
    pub(crate) active_uv_layer: Option<usize>,
}

impl<I: MeshIndex> Default for Mesh<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> Mesh<I> {
    /// Create a new empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: Vec::new(),
            loops: Vec::new(),
            faces: Vec::new(),
            uv_layers: Vec::new(),
            active_uv_layer: None,
        }
    }

    /// Create a mesh with pre-allocated capacity.
    pub fn with_capacity(num_vertices: usize, num_loops: usize, num_faces: usize) -> Self {
        Self {
            vertices: Vec::with_capacity(num_vertices),
            loops: Vec::with_capacity(num_loops),
            faces: Vec::with_capacity(num_faces),
            uv_layers: Vec::new(),
            active_uv_layer: None,
        }
    }

    // ==================== Accessors ====================

    /// Get the number of vertices.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Get the number of face-loops.
    #[inline]
    pub fn num_loops(&self) -> usize {
        self.loops.len()
    }

    /// Get the number of faces.
    #[inline]
    pub fn num_faces(&self) -> usize {
        self.faces.len()
    }

    /// Get a vertex by ID.
    #[inline]
    pub fn vertex(&self, id: VertexId<I>) -> &Vertex {
        &self.vertices[id.index()]
    }

    /// Get a face by ID.
    #[inline]
    pub fn face(&self, id: FaceId<I>) -> &Face<I> {
        &self.faces[id.index()]
    }

    /// Get the position of a vertex.
    #[inline]
    pub fn position(&self, v: VertexId<I>) -> &Point3<f64> {
        &self.vertex(v).position
    }

    /// Set the position of a vertex.
    #[inline]
    pub fn set_position(&mut self, v: VertexId<I>, pos: Point3<f64>) {
        self.vertices[v.index()].position = pos;
    }

    /// Snapshot all vertex positions in vertex order.
    pub fn positions(&self) -> Vec<Point3<f64>> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    /// Overwrite all vertex positions from a snapshot taken with [`Mesh::positions`].
    pub fn set_positions(&mut self, positions: &[Point3<f64>]) -> Result<()> {
        if positions.len() != self.vertices.len() {
            return Err(TransferError::invalid_state(format!(
                "expected {} positions, got {}",
                self.vertices.len(),
                positions.len()
            )));
        }
        for (v, &p) in self.vertices.iter_mut().zip(positions) {
            v.position = p;
        }
        Ok(())
    }

    /// The vertex referenced by a loop.
    #[inline]
    pub fn loop_vertex(&self, l: LoopId<I>) -> VertexId<I> {
        self.loops[l.index()].vertex
    }

    // ==================== Iteration ====================

    /// Iterate over all loop IDs in storage order.
    pub fn loop_ids(&self) -> impl Iterator<Item = LoopId<I>> + '_ {
        (0..self.loops.len()).map(LoopId::new)
    }

    /// Iterate over all face IDs.
    pub fn face_ids(&self) -> impl Iterator<Item = FaceId<I>> + '_ {
        (0..self.faces.len()).map(FaceId::new)
    }

    /// Iterate over the loops of a face in corner order.
    pub fn face_loops(&self, f: FaceId<I>) -> impl Iterator<Item = LoopId<I>> + '_ {
        let face = *self.face(f);
        let start = face.loop_start.index();
        (start..start + face.loop_count).map(LoopId::new)
    }

    /// Iterate over the vertices of a face in corner order.
    pub fn face_vertices(&self, f: FaceId<I>) -> impl Iterator<Item = VertexId<I>> + '_ {
        self.face_loops(f).map(move |l| self.loop_vertex(l))
    }

    // ==================== UV layers ====================

    /// All UV layers.
    pub fn uv_layers(&self) -> &[UvLayer<I>] {
        &self.uv_layers
    }

    /// Index of the active UV layer, if any.
    pub fn active_uv_layer_index(&self) -> Option<usize> {
        self.active_uv_layer
    }

    /// The active UV layer, if any.
    pub fn active_uv_layer(&self) -> Option<&UvLayer<I>> {
        self.active_uv_layer.and_then(|i| self.uv_layers.get(i))
    }

    /// Whether the mesh carries an active UV layer covering every loop.
    pub fn has_uvs(&self) -> bool {
        self.active_uv_layer()
            .is_some_and(|layer| layer.len() == self.loops.len() && !layer.is_empty())
    }

    /// Find a UV layer by name.
    pub fn uv_layer_by_name(&self, name: &str) -> Option<usize> {
        self.uv_layers.iter().position(|layer| layer.name() == name)
    }

    /// Add a UV layer with one coordinate per loop and return its index.
    ///
    /// The first layer added becomes the active one.
    pub fn add_uv_layer(
        &mut self,
        name: impl Into<String>,
        coords: Vec<Point2<f64>>,
    ) -> Result<usize> {
        let name = name.into();
        if coords.len() != self.loops.len() {
            return Err(TransferError::UvLayerLengthMismatch {
                name,
                coords: coords.len(),
                loops: self.loops.len(),
            });
        }

        self.uv_layers.push(UvLayer::new(name, coords));
        let index = self.uv_layers.len() - 1;
        if self.active_uv_layer.is_none() {
            self.active_uv_layer = Some(index);
        }
        Ok(index)
    }

    /// Make the given UV layer active.
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

    /// The active-layer UV coordinate of a loop.
    pub fn loop_uv(&self, l: LoopId<I>) -> Option<Point2<f64>> {
        self.active_uv_layer().map(|layer| layer.get(l))
    }

    /// Collect the active layer as UV points in loop order.
    ///
    /// Returns `None` if the mesh has no usable UV layer.
    pub fn uv_points(&self) -> Option<Vec<UvPoint<I>>> {
        if !self.has_uvs() {
            return None;
        }
        self.active_uv_layer().map(|layer| layer.points().collect())
    }

    /// Bounding box of the active UV layer.
    pub fn uv_bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        self.active_uv_layer().and_then(UvLayer::bounding_box)
    }

    /// Count vertices whose loops carry more than one distinct UV coordinate
    /// in the active layer.
    pub fn seam_vertex_count(&self) -> usize {
        let Some(layer) = self.active_uv_layer() else {
            return 0;
        };

        let mut first_uv: Vec<Option<Point2<f64>>> = vec![None; self.vertices.len()];
        let mut on_seam = vec![false; self.vertices.len()];

        for (l, uv) in layer.iter() {
            let v = self.loop_vertex(l).index();
            match first_uv[v] {
                None => first_uv[v] = Some(uv),
                Some(first) if first != uv => on_seam[v] = true,
                Some(_) => {}
            }
        }

        on_seam.iter().filter(|&&s| s).count()
    }

    // ==================== Geometry ====================

    /// Compute the bounding box of the mesh.
    pub fn bounding_box(&self) -> Option<(Point3<f64>, Point3<f64>)> {
        let first = self.vertices.first()?.position;
        let mut min = first;
        let mut max = first;

        for v in &self.vertices {
            for i in 0..3 {
                min[i] = min[i].min(v.position[i]);
                max[i] = max[i].max(v.position[i]);
            }
        }

        Some((min, max))
    }

    /// Whether every face is a triangle.
    pub fn is_triangle_mesh(&self) -> bool {
        self.faces.iter().all(|f| f.loop_count == 3)
    }

    // ==================== Construction ====================

    /// Add a new vertex and return its ID.
    pub fn add_vertex(&mut self, position: Point3<f64>) -> VertexId<I> {
        let id = VertexId::new(self.vertices.len());
        self.vertices.push(Vertex::new(position));
        id
    }

    /// Add a polygonal face from its corner vertices and return its ID.
    ///
    /// Faces must be added before any UV layer, since layers are sized to the
    /// loop count.
    pub fn add_face(&mut self, corners: &[VertexId<I>]) -> Result<FaceId<I>> {
        let face_index = self.faces.len();

        if !self.uv_layers.is_empty() {
            return Err(TransferError::invalid_state(
                "faces cannot be added after UV layers",
            ));
        }
        if corners.len() < 3 {
            return Err(TransferError::DegenerateFace { face: face_index });
        }
        for &v in corners {
            if !v.is_valid() || v.index() >= self.vertices.len() {
                return Err(TransferError::InvalidVertexIndex {
                    face: face_index,
                    vertex: v.index(),
                });
            }
        }
        let mut seen: HashSet<VertexId<I>> = HashSet::with_capacity(corners.len());
        for &v in corners {
            if !seen.insert(v) {
                return Err(TransferError::DegenerateFace { face: face_index });
            }
        }

        let face_id = FaceId::new(face_index);
        let loop_start = LoopId::new(self.loops.len());
        self.loops.extend(corners.iter().map(|&vertex| Loop {
            vertex,
            face: face_id,
        }));
        self.faces.push(Face {
            loop_start,
            loop_count: corners.len(),
        });
        Ok(face_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quad() -> Mesh<u32> {
        let mut mesh = Mesh::new();
        let v: Vec<_> = [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ]
        .into_iter()
        .map(|p| mesh.add_vertex(p))
        .collect();
        mesh.add_face(&v).unwrap();
        mesh
    }

    #[test]
    fn test_empty_mesh() {
        let mesh = Mesh::<u32>::new();
        assert_eq!(mesh.num_vertices(), 0);
        assert_eq!(mesh.num_loops(), 0);
        assert_eq!(mesh.num_faces(), 0);
        assert!(!mesh.has_uvs());
        assert!(mesh.uv_points().is_none());
        assert!(mesh.bounding_box().is_none());
    }

    #[test]
    fn test_add_face_creates_loops() {
        let mesh = quad();
        assert_eq!(mesh.num_loops(), 4);
        assert_eq!(mesh.num_faces(), 1);

        let f = FaceId::new(0);
        let verts: Vec<usize> = mesh.face_vertices(f).map(|v| v.index()).collect();
        assert_eq!(verts, vec![0, 1, 2, 3]);
        assert_eq!(mesh.face(f).loop_count, 4);
        assert_eq!(mesh.face(f).loop_start, LoopId::new(0));
        assert!(!mesh.is_triangle_mesh());
    }

    #[test]
    fn test_add_face_rejects_bad_input() {
        let mut mesh = quad();
        let v0 = VertexId::new(0);
        let v1 = VertexId::new(1);

        assert!(matches!(
            mesh.add_face(&[v0, v1]),
            Err(TransferError::DegenerateFace { face: 1 })
        ));
        assert!(matches!(
            mesh.add_face(&[v0, v1, v0]),
            Err(TransferError::DegenerateFace { face: 1 })
        ));
        assert!(matches!(
            mesh.add_face(&[v0, v1, VertexId::new(9)]),
            Err(TransferError::InvalidVertexIndex { face: 1, vertex: 9 })
        ));
        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_loops(), 4);
    }

    #[test]
    fn test_uv_layer_must_cover_loops() {
        let mut mesh = quad();
        let err = mesh
            .add_uv_layer("UVMap", vec![Point2::new(0.0, 0.0)])
            .unwrap_err();
        assert!(matches!(
            err,
            TransferError::UvLayerLengthMismatch { coords: 1, loops: 4, .. }
        ));
        assert!(!mesh.has_uvs());
    }

    #[test]
    fn test_first_uv_layer_becomes_active() {
        let mut mesh = quad();
        let uvs = vec![
            Point2::new(0.0, 0.0),
            Point2::new(1.0, 0.0),
            Point2::new(1.0, 1.0),
            Point2::new(0.0, 1.0),
        ];
        let first = mesh.add_uv_layer("UVMap", uvs.clone()).unwrap();
        let shifted = uvs
            .iter()
            .map(|p| p + nalgebra::Vector2::new(2.0, 0.0))
            .collect();
        let second = mesh.add_uv_layer("Shifted", shifted).unwrap();

        assert_eq!(mesh.active_uv_layer_index(), Some(first));
        assert_eq!(mesh.loop_uv(LoopId::new(2)), Some(Point2::new(1.0, 1.0)));

        mesh.set_active_uv_layer(second).unwrap();
        assert_eq!(mesh.loop_uv(LoopId::new(2)), Some(Point2::new(3.0, 1.0)));
        assert_eq!(mesh.uv_layer_by_name("Shifted"), Some(1));
        assert!(mesh.set_active_uv_layer(5).is_err());

        assert!(mesh
            .add_face(&[VertexId::new(0), VertexId::new(1), VertexId::new(2)])
            .is_err());
    }

    #[test]
    fn test_seam_vertex_count() {
        // Two triangles sharing the edge (1, 2); the shared vertex 2 is split in UV space.
        let mut mesh: Mesh = Mesh::new();
        for p in [
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(1.0, 1.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ] {
            mesh.add_vertex(p);
        }
        let ids = |a: usize, b: usize, c: usize| {
            [VertexId::new(a), VertexId::new(b), VertexId::new(c)]
        };
        mesh.add_face(&ids(0, 1, 2)).unwrap();
        mesh.add_face(&ids(0, 2, 3)).unwrap();
        mesh.add_uv_layer(
            "UVMap",
            vec![
                Point2::new(0.0, 0.0),
                Point2::new(1.0, 0.0),
                Point2::new(1.0, 1.0),
                Point2::new(0.0, 0.0),
                Point2::new(0.9, 1.0),
                Point2::new(0.0, 1.0),
            ],
        )
        .unwrap();

        assert_eq!(mesh.seam_vertex_count(), 1);
    }

    #[test]
    fn test_positions_roundtrip() {
        let mut mesh = quad();
        let before = mesh.positions();
        mesh.set_position(VertexId::new(0), Point3::new(5.0, 5.0, 5.0));
        assert_ne!(mesh.positions(), before);

        mesh.set_positions(&before).unwrap();
        assert_eq!(mesh.positions(), before);
        assert!(mesh.set_positions(&before[..2]).is_err());
    }
}
