//! Wavefront OBJ format support.
//!
//! OBJ indexes positions and texture coordinates separately for every face
//! corner, which maps directly onto face-loops: a vertex shared by two faces
//! with different `vt` references lies on a UV seam. Files are read with
//! `tobj` in non-single-index mode so that the two index streams stay
//! independent, and polygons are kept as they are rather than triangulated.

use std::fs::File;
use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use nalgebra::{Point2, Point3};

use crate::error::{Result, TransferError};
use crate::mesh::{to_face_vertex, Mesh, MeshBuilder, MeshIndex, VertexId};

/// Name given to the UV layer read from `vt` records.
pub const UV_LAYER_NAME: &str = "UVMap";

fn load_options() -> tobj::LoadOptions {
    tobj::LoadOptions {
        single_index: false,
        triangulate: false,
        ignore_points: true,
        ignore_lines: true,
        ..Default::default()
    }
}

/// Load a mesh from an OBJ file.
///
/// All objects and groups in the file are merged into one mesh. The `vt`
/// coordinates become the [`UV_LAYER_NAME`] layer when every face corner
/// references one.
///
/// # Example
///
/// ```no_run
/// use uvtransfer::io::obj;
/// use uvtransfer::mesh::Mesh;
///
/// let mesh: Mesh = obj::load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<Mesh<I>> {
    let path = path.as_ref();
    let (models, _materials) =
        tobj::load_obj(path, &load_options()).map_err(|e| TransferError::LoadError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
    from_models(models, path)
}

/// Parse a mesh from OBJ text.
///
/// Material libraries referenced by the text are ignored.
///
/// # Example
///
/// ```
/// use uvtransfer::io::obj;
/// use uvtransfer::mesh::Mesh;
///
/// let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvt 0 0\nvt 1 0\nvt 0 1\nf 1/1 2/2 3/3\n";
/// let mesh: Mesh = obj::parse(&mut text.as_bytes()).unwrap();
/// assert!(mesh.has_uvs());
/// ```
pub fn parse<R: BufRead, I: MeshIndex>(reader: &mut R) -> Result<Mesh<I>> {
    let path = Path::new("<memory>");
    let (models, _materials) = tobj::load_obj_buf(reader, &load_options(), |_| {
        Err(tobj::LoadError::GenericFailure)
    })
    .map_err(|e| TransferError::LoadError {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    from_models(models, path)
}

fn from_models<I: MeshIndex>(models: Vec<tobj::Model>, path: &Path) -> Result<Mesh<I>> {
    let mut builder = MeshBuilder::new();
    let mut loop_uvs: Vec<Point2<f64>> = Vec::new();
    let mut every_corner_has_uv = true;
    let mut skipped = 0;
    let mut corners: Vec<VertexId<I>> = Vec::new();

    for model in &models {
        let mesh = &model.mesh;
        let vertex_offset = builder.num_vertices();

        for p in mesh.positions.chunks_exact(3) {
            builder.add_vertex(Point3::new(p[0], p[1], p[2]));
        }

        let has_uvs = !mesh.texcoord_indices.is_empty()
            && mesh.texcoord_indices.len() == mesh.indices.len();
        if !has_uvs {
            every_corner_has_uv = false;
        }

        // tobj leaves `face_arities` empty when every face is a triangle.
        let arities: Vec<usize> = if mesh.face_arities.is_empty() {
            vec![3; mesh.indices.len() / 3]
        } else {
            mesh.face_arities.iter().map(|&a| a as usize).collect()
        };

        let mut corner = 0;
        for arity in arities {
            let range = corner..corner + arity;
            corner += arity;

            corners.clear();
            corners.extend(
                mesh.indices[range.clone()]
                    .iter()
                    .map(|&i| VertexId::new(i as usize + vertex_offset)),
            );
            match builder.add_face(&corners) {
                Ok(_) => {}
                Err(TransferError::DegenerateFace { .. }) => {
                    skipped += 1;
                    continue;
                }
                Err(e) => return Err(e),
            }

            if has_uvs {
                for &t in &mesh.texcoord_indices[range] {
                    let t = t as usize;
                    let (u, v) = mesh
                        .texcoords
                        .get(2 * t)
                        .zip(mesh.texcoords.get(2 * t + 1))
                        .ok_or_else(|| TransferError::LoadError {
                            path: path.to_path_buf(),
                            message: format!("texture coordinate index {} out of range", t + 1),
                        })?;
                    loop_uvs.push(Point2::new(*u, *v));
                }
            }
        }
    }

    if skipped > 0 {
        log::warn!("{}: skipped {} degenerate face(s)", path.display(), skipped);
    }
    if builder.num_faces() == 0 {
        return Err(TransferError::LoadError {
            path: path.to_path_buf(),
            message: "OBJ file contains no faces".to_string(),
        });
    }

    if every_corner_has_uv {
        builder.add_uv_layer(UV_LAYER_NAME, loop_uvs);
    } else if !loop_uvs.is_empty() {
        log::warn!(
            "{}: texture coordinates are missing on some faces; UVs were dropped",
            path.display()
        );
    }
    let mesh = builder.build()?;

    log::debug!(
        "{}: {} vertices, {} faces, {} loops",
        path.display(),
        mesh.num_vertices(),
        mesh.num_faces(),
        mesh.num_loops()
    );
    Ok(mesh)
}

/// Save a mesh to an OBJ file.
///
/// The active UV layer, if any, is written as one `vt` record per loop so
/// seams survive the round trip.
///
/// # Example
///
/// ```no_run
/// use uvtransfer::io::obj;
/// use uvtransfer::mesh::Mesh;
///
/// let mesh: Mesh = Mesh::new();
/// obj::save(&mesh, "output.obj").unwrap();
/// ```
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &Mesh<I>, path: P) -> Result<()> {
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    write(mesh, &mut writer)?;
    writer.flush()?;
    Ok(())
}

/// Write a mesh as OBJ text.
pub fn write<W: Write, I: MeshIndex>(mesh: &Mesh<I>, writer: &mut W) -> Result<()> {
    let (vertices, faces) = to_face_vertex(mesh);
    let uvs = mesh.active_uv_layer().filter(|_| mesh.has_uvs());

    writeln!(writer, "# Generated by uvtransfer")?;
    writeln!(writer, "# {} vertices, {} faces", vertices.len(), faces.len())?;

    for v in &vertices {
        writeln!(writer, "v {} {} {}", v.x, v.y, v.z)?;
    }

    if let Some(layer) = uvs {
        for uv in layer.as_slice() {
            writeln!(writer, "vt {} {}", uv.x, uv.y)?;
        }
    }

    let mut loop_index = 0;
    for face in &faces {
        write!(writer, "f")?;
        for &v in face {
            loop_index += 1;
            if uvs.is_some() {
                write!(writer, " {}/{}", v + 1, loop_index)?;
            } else {
                write!(writer, " {}", v + 1)?;
            }
        }
        writeln!(writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::LoopId;

    const SEAM_QUADS: &str = "\
o strip
v 0 0 0
v 1 0 0
v 1 1 0
v 0 1 0
v 2 0 0
v 2 1 0
vt 0 0
vt 0.5 0
vt 0.5 1
vt 0 1
vt 0.75 0
vt 1 0
vt 1 1
vt 0.75 1
f 1/1 2/2 3/3 4/4
f 2/5 5/6 6/7 3/8
";

    #[test]
    fn test_parse_keeps_polygons_and_seams() {
        let mesh: Mesh = parse(&mut SEAM_QUADS.as_bytes()).unwrap();

        assert_eq!(mesh.num_vertices(), 6);
        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_loops(), 8);
        assert!(mesh.has_uvs());
        assert_eq!(mesh.active_uv_layer().unwrap().name(), UV_LAYER_NAME);

        // Vertex 2 (1-based) is shared by loop 1 and loop 4 with different UVs.
        assert_eq!(mesh.loop_vertex(LoopId::new(1)), mesh.loop_vertex(LoopId::new(4)));
        assert_eq!(mesh.loop_uv(LoopId::new(1)), Some(Point2::new(0.5, 0.0)));
        assert_eq!(mesh.loop_uv(LoopId::new(4)), Some(Point2::new(0.75, 0.0)));
        assert_eq!(mesh.seam_vertex_count(), 2);
    }

    #[test]
    fn test_parse_triangles_without_uvs() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nv 1 1 0\nf 1 2 3\nf 2 4 3\n";
        let mesh: Mesh = parse(&mut text.as_bytes()).unwrap();

        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_loops(), 6);
        assert!(!mesh.has_uvs());
        assert!(mesh.is_triangle_mesh());
    }

    #[test]
    fn test_parse_without_faces_fails() {
        let text = "v 0 0 0\nv 1 0 0\n";
        let result: Result<Mesh> = parse(&mut text.as_bytes());
        assert!(matches!(result, Err(TransferError::LoadError { .. })));
    }

    #[test]
    fn test_write_then_parse_preserves_loops() {
        let original: Mesh = parse(&mut SEAM_QUADS.as_bytes()).unwrap();

        let mut buffer = Vec::new();
        write(&original, &mut buffer).unwrap();
        let text = String::from_utf8(buffer).unwrap();
        assert_eq!(text.lines().filter(|l| l.starts_with("vt ")).count(), 8);
        assert!(text.contains("f 2/5 5/6 6/7 3/8"));

        let reparsed: Mesh = parse(&mut text.as_bytes()).unwrap();
        assert_eq!(reparsed.num_loops(), original.num_loops());
        assert_eq!(reparsed.positions(), original.positions());
        assert_eq!(
            reparsed.active_uv_layer().unwrap().as_slice(),
            original.active_uv_layer().unwrap().as_slice()
        );
    }

    #[test]
    fn test_parse_skips_degenerate_faces() {
        let text = "\
v 0 0 0
v 1 0 0
v 0 1 0
v 1 1 0
vt 0 0
vt 1 0
vt 0 1
vt 1 1
f 1/1 2/2 3/3
f 2/2 4/4 4/4
f 2/2 4/4 3/3
";
        let mesh: Mesh = parse(&mut text.as_bytes()).unwrap();

        assert_eq!(mesh.num_faces(), 2);
        assert_eq!(mesh.num_loops(), 6);
        assert!(mesh.has_uvs());
        // Loops of the kept faces keep their own coordinates.
        assert_eq!(mesh.loop_uv(LoopId::new(3)), Some(Point2::new(1.0, 0.0)));
        assert_eq!(mesh.loop_uv(LoopId::new(4)), Some(Point2::new(1.0, 1.0)));
        assert_eq!(mesh.loop_uv(LoopId::new(5)), Some(Point2::new(0.0, 1.0)));
    }

    #[test]
    fn test_parse_only_degenerate_faces_fails() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 2\n";
        let result: Result<Mesh> = parse(&mut text.as_bytes());
        assert!(matches!(result, Err(TransferError::LoadError { .. })));
    }

    #[test]
    fn test_write_then_parse_is_exact() {
        let text = "\
v 0.1 0.2 0.3
v 1.7 0 0
v 0 2.9 0
vt 0.1 0.3
vt 0.7 0.1
vt 0.3 0.9
f 1/1 2/2 3/3
";
        let mut mesh: Mesh = parse(&mut text.as_bytes()).unwrap();
        assert_eq!(*mesh.position(VertexId::new(0)), Point3::new(0.1, 0.2, 0.3));
        assert_eq!(mesh.loop_uv(LoopId::new(0)), Some(Point2::new(0.1, 0.3)));

        mesh.set_position(VertexId::new(2), Point3::new(1.0 / 3.0, 2.0 / 7.0, 0.1 + 0.2));
        let mut buffer = Vec::new();
        write(&mesh, &mut buffer).unwrap();
        let reparsed: Mesh = parse(&mut buffer.as_slice()).unwrap();

        assert_eq!(reparsed.positions(), mesh.positions());
        assert_eq!(
            reparsed.active_uv_layer().unwrap().as_slice(),
            mesh.active_uv_layer().unwrap().as_slice()
        );
    }

    #[test]
    fn test_write_without_uvs() {
        let text = "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n";
        let mut mesh: Mesh = parse(&mut text.as_bytes()).unwrap();
        mesh.set_position(VertexId::new(1), Point3::new(2.5, 0.0, 0.0));

        let mut buffer = Vec::new();
        write(&mesh, &mut buffer).unwrap();
        let out = String::from_utf8(buffer).unwrap();

        assert!(out.contains("v 2.5 0 0"));
        assert!(out.contains("f 1 2 3"));
        assert!(!out.contains("vt "));
    }
}
