//! glTF format support.
//!
//! This module provides loading of meshes from glTF and GLB files. glTF
//! stores texture coordinates per vertex; every loop inherits the UV of the
//! vertex it references, so glTF meshes never carry seams inside one vertex.
//!
//! glTF places the UV origin at the top-left corner while OBJ uses the
//! bottom-left; V is flipped on load so that both formats share one UV space.
//!
//! Note: Saving to glTF is not yet supported.

use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::error::{Result, TransferError};
use crate::mesh::{loop_uvs_from_vertex_uvs, Mesh, MeshBuilder, MeshIndex, VertexId};

/// Load a mesh from a glTF or GLB file.
///
/// All triangle primitives of all meshes are combined into a single mesh.
/// Each `TEXCOORD_n` set present on every primitive becomes a UV layer named
/// `UVMap` (set 0), `UVMap.001` (set 1), and so on.
///
/// # Example
///
/// ```no_run
/// use uvtransfer::io::gltf;
/// use uvtransfer::mesh::Mesh;
///
/// let mesh: Mesh = gltf::load("model.gltf").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<Mesh<I>> {
    let path = path.as_ref();

    let (document, buffers, _images) =
        ::gltf::import(path).map_err(|e| TransferError::LoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

    let mut all_vertices: Vec<Point3<f64>> = Vec::new();
    let mut all_faces: Vec<[usize; 3]> = Vec::new();
    let mut uv_sets: Vec<Vec<Point2<f64>>> = Vec::new();
    let mut common_sets: Option<usize> = None;

    for mesh in document.meshes() {
        for primitive in mesh.primitives() {
            let reader = primitive.reader(|buffer| Some(&buffers[buffer.index()]));

            let vertex_offset = all_vertices.len();

            let Some(positions) = reader.read_positions() else {
                continue;
            };
            for pos in positions {
                all_vertices.push(Point3::new(pos[0] as f64, pos[1] as f64, pos[2] as f64));
            }
            let count = all_vertices.len() - vertex_offset;

            // Texture coordinate sets, kept only while every primitive has them.
            let mut set = 0;
            while let Some(coords) = reader.read_tex_coords(set) {
                let coords: Vec<Point2<f64>> = coords
                    .into_f32()
                    .map(|[u, v]| Point2::new(u as f64, 1.0 - v as f64))
                    .collect();
                if coords.len() != count {
                    break;
                }
                let set_index = set as usize;
                if set_index == uv_sets.len() {
                    // A set first seen here has no coordinates for earlier primitives.
                    uv_sets.push(vec![Point2::origin(); vertex_offset]);
                }
                uv_sets[set_index].extend(coords);
                set += 1;
            }
            let present = set as usize;
            common_sets = Some(common_sets.map_or(present, |n| n.min(present)));
            for layer in uv_sets.iter_mut().skip(present) {
                layer.resize(all_vertices.len(), Point2::origin());
            }

            // Read indices; non-indexed primitives use their vertices in order.
            let indices: Vec<usize> = match reader.read_indices() {
                Some(indices) => indices.into_u32().map(|i| i as usize).collect(),
                None => (0..count).collect(),
            };

            match primitive.mode() {
                ::gltf::mesh::Mode::Triangles => {
                    for chunk in indices.chunks_exact(3) {
                        all_faces.push([
                            chunk[0] + vertex_offset,
                            chunk[1] + vertex_offset,
                            chunk[2] + vertex_offset,
                        ]);
                    }
                }
                ::gltf::mesh::Mode::TriangleStrip => {
                    for i in 0..indices.len().saturating_sub(2) {
                        if i % 2 == 0 {
                            all_faces.push([
                                indices[i] + vertex_offset,
                                indices[i + 1] + vertex_offset,
                                indices[i + 2] + vertex_offset,
                            ]);
                        } else {
                            // Reverse winding for odd triangles
                            all_faces.push([
                                indices[i] + vertex_offset,
                                indices[i + 2] + vertex_offset,
                                indices[i + 1] + vertex_offset,
                            ]);
                        }
                    }
                }
                ::gltf::mesh::Mode::TriangleFan => {
                    for i in 1..indices.len().saturating_sub(1) {
                        all_faces.push([
                            indices[0] + vertex_offset,
                            indices[i] + vertex_offset,
                            indices[i + 1] + vertex_offset,
                        ]);
                    }
                }
                _ => {
                    // Skip non-triangle primitives (points, lines)
                }
            }
        }
    }

    let mut builder = MeshBuilder::with_capacity(
        all_vertices.len(),
        all_faces.len() * 3,
        all_faces.len(),
    );
    for &p in &all_vertices {
        builder.add_vertex(p);
    }
    // Strips use repeated indices as restarts; those triangles are dropped.
    let mut skipped = 0;
    for face in &all_faces {
        let corners: [VertexId<I>; 3] = face.map(VertexId::new);
        match builder.add_face(&corners) {
            Ok(_) => {}
            Err(TransferError::DegenerateFace { .. }) => skipped += 1,
            Err(e) => return Err(e),
        }
    }
    if skipped > 0 {
        log::warn!("{}: skipped {} degenerate triangle(s)", path.display(), skipped);
    }
    if builder.num_faces() == 0 {
        return Err(TransferError::LoadError {
            path: path.to_path_buf(),
            message: "glTF file contains no triangle meshes".to_string(),
        });
    }

    let mut mesh = builder.build()?;

    let kept = common_sets.unwrap_or(0);
    if uv_sets.len() > kept {
        log::warn!(
            "{}: dropped {} texture coordinate set(s) not present on every primitive",
            path.display(),
            uv_sets.len() - kept
        );
    }
    for (set, vertex_uvs) in uv_sets.iter().take(kept).enumerate() {
        let loop_uvs = loop_uvs_from_vertex_uvs(&mesh, vertex_uvs)?;
        mesh.add_uv_layer(layer_name(set), loop_uvs)?;
    }

    Ok(mesh)
}

/// Name of the UV layer created for texture coordinate set `set`.
pub fn layer_name(set: usize) -> String {
    if set == 0 {
        "UVMap".to_string()
    } else {
        format!("UVMap.{:03}", set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::LoopId;
    use std::path::PathBuf;

    /// Assembles a small glTF file with an external binary buffer.
    #[derive(Default)]
    struct GltfWriter {
        bin: Vec<u8>,
        views: Vec<String>,
        accessors: Vec<String>,
        primitives: Vec<String>,
    }

    impl GltfWriter {
        fn accessor(
            &mut self,
            bytes: Vec<u8>,
            component: u32,
            count: usize,
            kind: &str,
            extra: String,
        ) -> usize {
            while self.bin.len() % 4 != 0 {
                self.bin.push(0);
            }
            self.views.push(format!(
                r#"{{"buffer":0,"byteOffset":{},"byteLength":{}}}"#,
                self.bin.len(),
                bytes.len()
            ));
            self.bin.extend(bytes);
            self.accessors.push(format!(
                r#"{{"bufferView":{},"componentType":{},"count":{},"type":"{}"{}}}"#,
                self.views.len() - 1,
                component,
                count,
                kind,
                extra
            ));
            self.accessors.len() - 1
        }

        fn positions(&mut self, points: &[[f32; 3]]) -> usize {
            let mut min = [f32::MAX; 3];
            let mut max = [f32::MIN; 3];
            for p in points {
                for k in 0..3 {
                    min[k] = min[k].min(p[k]);
                    max[k] = max[k].max(p[k]);
                }
            }
            let bytes = points.iter().flatten().flat_map(|c| c.to_le_bytes()).collect();
            let bounds = format!(
                r#","min":[{},{},{}],"max":[{},{},{}]"#,
                min[0], min[1], min[2], max[0], max[1], max[2]
            );
            self.accessor(bytes, 5126, points.len(), "VEC3", bounds)
        }

        fn uvs(&mut self, uvs: &[[f32; 2]]) -> usize {
            let bytes = uvs.iter().flatten().flat_map(|c| c.to_le_bytes()).collect();
            self.accessor(bytes, 5126, uvs.len(), "VEC2", String::new())
        }

        fn indices(&mut self, indices: &[u16]) -> usize {
            let bytes = indices.iter().flat_map(|i| i.to_le_bytes()).collect();
            self.accessor(bytes, 5123, indices.len(), "SCALAR", String::new())
        }

        fn primitive(
            &mut self,
            position: usize,
            uv_sets: &[usize],
            indices: Option<usize>,
            mode: u32,
        ) {
            let mut attributes = format!(r#""POSITION":{}"#, position);
            for (set, accessor) in uv_sets.iter().enumerate() {
                attributes.push_str(&format!(r#","TEXCOORD_{}":{}"#, set, accessor));
            }
            let indices = indices.map(|i| format!(r#","indices":{}"#, i)).unwrap_or_default();
            self.primitives.push(format!(
                r#"{{"attributes":{{{}}}{},"mode":{}}}"#,
                attributes, indices, mode
            ));
        }

        fn write(mut self, dir: &Path) -> PathBuf {
            while self.bin.len() % 4 != 0 {
                self.bin.push(0);
            }
            let json = format!(
                concat!(
                    r#"{{"asset":{{"version":"2.0"}},"#,
                    r#""buffers":[{{"uri":"mesh.bin","byteLength":{}}}],"#,
                    r#""bufferViews":[{}],"accessors":[{}],"#,
                    r#""meshes":[{{"primitives":[{}]}}]}}"#
                ),
                self.bin.len(),
                self.views.join(","),
                self.accessors.join(","),
                self.primitives.join(",")
            );
            std::fs::write(dir.join("mesh.bin"), &self.bin).unwrap();
            let path = dir.join("mesh.gltf");
            std::fs::write(&path, json).unwrap();
            path
        }
    }

    const TRIANGLES: u32 = 4;
    const TRIANGLE_STRIP: u32 = 5;

    #[test]
    fn test_layer_names() {
        assert_eq!(layer_name(0), "UVMap");
        assert_eq!(layer_name(1), "UVMap.001");
        assert_eq!(layer_name(12), "UVMap.012");
    }

    #[test]
    fn test_missing_file() {
        let result: Result<Mesh> = load("does/not/exist.gltf");
        assert!(matches!(result, Err(TransferError::LoadError { .. })));
    }

    #[test]
    fn test_load_flips_v_and_names_every_set() {
        let dir = tempfile::tempdir().unwrap();
        let mut gltf = GltfWriter::default();
        let pos = gltf.positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let uv0 = gltf.uvs(&[[0.0, 0.0], [1.0, 0.0], [0.0, 0.25]]);
        let uv1 = gltf.uvs(&[[0.5, 0.5], [0.75, 0.5], [0.5, 0.125]]);
        let idx = gltf.indices(&[0, 1, 2]);
        gltf.primitive(pos, &[uv0, uv1], Some(idx), TRIANGLES);
        let path = gltf.write(dir.path());

        let mesh: Mesh = load(&path).unwrap();

        assert_eq!(mesh.num_faces(), 1);
        assert_eq!(mesh.num_loops(), 3);
        let names: Vec<&str> = mesh.uv_layers().iter().map(|l| l.name()).collect();
        assert_eq!(names, vec!["UVMap", "UVMap.001"]);
        assert_eq!(mesh.active_uv_layer().unwrap().name(), "UVMap");

        assert_eq!(mesh.loop_uv(LoopId::new(0)), Some(Point2::new(0.0, 1.0)));
        assert_eq!(mesh.loop_uv(LoopId::new(2)), Some(Point2::new(0.0, 0.75)));
        assert_eq!(
            mesh.uv_layers()[1].get(LoopId::new(2)),
            Point2::new(0.5, 0.875)
        );
    }

    #[test]
    fn test_load_drops_sets_missing_on_some_primitives() {
        let dir = tempfile::tempdir().unwrap();
        let mut gltf = GltfWriter::default();

        let pos_a = gltf.positions(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let uv0_a = gltf.uvs(&[[0.0, 0.0], [0.5, 0.0], [0.0, 0.5]]);
        let uv1_a = gltf.uvs(&[[0.25, 0.25]; 3]);
        let idx_a = gltf.indices(&[0, 1, 2]);
        gltf.primitive(pos_a, &[uv0_a, uv1_a], Some(idx_a), TRIANGLES);

        // Second primitive is non-indexed and has only TEXCOORD_0.
        let pos_b = gltf.positions(&[[2.0, 0.0, 0.0], [3.0, 0.0, 0.0], [2.0, 1.0, 0.0]]);
        let uv0_b = gltf.uvs(&[[0.5, 0.0], [1.0, 0.0], [0.5, 0.5]]);
        gltf.primitive(pos_b, &[uv0_b], None, TRIANGLES);

        let path = gltf.write(dir.path());
        let mesh: Mesh = load(&path).unwrap();

        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.uv_layers().len(), 1);
        assert_eq!(mesh.uv_layers()[0].name(), "UVMap");
        assert_eq!(mesh.loop_uv(LoopId::new(1)), Some(Point2::new(0.5, 1.0)));
        assert_eq!(mesh.loop_uv(LoopId::new(4)), Some(Point2::new(1.0, 1.0)));
        assert_eq!(*mesh.position(VertexId::new(5)), Point3::new(2.0, 1.0, 0.0));
    }

    #[test]
    fn test_load_skips_degenerate_strip_triangles() {
        let dir = tempfile::tempdir().unwrap();
        let mut gltf = GltfWriter::default();
        let pos = gltf.positions(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [1.0, 1.0, 0.0],
        ]);
        let uv0 = gltf.uvs(&[[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]]);
        // The repeated index yields two degenerate triangles between (0, 1, 2) and (2, 3, 1).
        let idx = gltf.indices(&[0, 1, 2, 2, 1, 3]);
        gltf.primitive(pos, &[uv0], Some(idx), TRIANGLE_STRIP);
        let path = gltf.write(dir.path());

        let mesh: Mesh = load(&path).unwrap();

        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_loops(), 6);
        assert!(mesh.has_uvs());
    }
}
