//! Mesh file I/O.
//!
//! This module provides functions for loading and saving meshes in formats
//! that carry texture coordinates.
//!
//! # Supported Formats
//!
//! | Format | Extension | Load | Save | Notes |
//! |--------|-----------|------|------|-------|
//! | Wavefront OBJ | `.obj` | ✓ | ✓ | Per-corner UVs, seams preserved |
//! | glTF | `.gltf`, `.glb` | ✓ | ✗ | Per-vertex UVs, all `TEXCOORD_n` sets |
//!
//! # Usage
//!
//! ```no_run
//! use uvtransfer::io::{load, save};
//! use uvtransfer::mesh::Mesh;
//!
//! // Load with automatic format detection
//! let mesh: Mesh = load("model.obj").unwrap();
//!
//! // Save with automatic format detection
//! save(&mesh, "output.obj").unwrap();
//! ```

pub mod gltf;
pub mod obj;

use std::path::Path;

use crate::error::{Result, TransferError};
use crate::mesh::{Mesh, MeshIndex};

/// Supported mesh file formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    /// Wavefront OBJ format.
    Obj,
    /// glTF format.
    Gltf,
    /// glTF binary format.
    Glb,
}

impl Format {
    /// Detect format from file extension.
    pub fn from_extension(ext: &str) -> Option<Format> {
        match ext.to_lowercase().as_str() {
            "obj" => Some(Format::Obj),
            "gltf" => Some(Format::Gltf),
            "glb" => Some(Format::Glb),
            _ => None,
        }
    }

    /// Detect format from file path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Option<Format> {
        path.as_ref()
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(Format::from_extension)
    }
}

/// Load a mesh from a file with automatic format detection.
///
/// The format is determined by the file extension.
///
/// # Example
///
/// ```no_run
/// use uvtransfer::io::load;
/// use uvtransfer::mesh::Mesh;
///
/// let mesh: Mesh = load("model.obj").unwrap();
/// ```
pub fn load<P: AsRef<Path>, I: MeshIndex>(path: P) -> Result<Mesh<I>> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| TransferError::UnsupportedFormat {
        extension: extension_of(path),
    })?;

    match format {
        Format::Obj => obj::load(path),
        Format::Gltf | Format::Glb => gltf::load(path),
    }
}

/// Save a mesh to a file with automatic format detection.
///
/// Only OBJ can be written; glTF paths fail with [`TransferError::SaveError`].
///
/// # Example
///
/// ```no_run
/// use uvtransfer::io::{load, save};
/// use uvtransfer::mesh::Mesh;
///
/// let mesh: Mesh = load("model.gltf").unwrap();
/// save(&mesh, "model.obj").unwrap();
/// ```
pub fn save<P: AsRef<Path>, I: MeshIndex>(mesh: &Mesh<I>, path: P) -> Result<()> {
    let path = path.as_ref();
    let format = Format::from_path(path).ok_or_else(|| TransferError::UnsupportedFormat {
        extension: extension_of(path),
    })?;

    match format {
        Format::Obj => obj::save(mesh, path),
        Format::Gltf | Format::Glb => Err(TransferError::SaveError {
            path: path.to_path_buf(),
            message: "glTF saving is not yet supported".to_string(),
        }),
    }
}

/// Extension string for error messages.
fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("(none)")
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_detection() {
        assert_eq!(Format::from_path("a/b/model.OBJ"), Some(Format::Obj));
        assert_eq!(Format::from_path("scene.gltf"), Some(Format::Gltf));
        assert_eq!(Format::from_path("scene.glb"), Some(Format::Glb));
        assert_eq!(Format::from_path("part.stl"), None);
        assert_eq!(Format::from_path("no_extension"), None);
    }

    #[test]
    fn test_unsupported_extension() {
        let result: Result<Mesh> = load("mesh.ply");
        match result {
            Err(TransferError::UnsupportedFormat { extension }) => assert_eq!(extension, "ply"),
            other => panic!("unexpected result: {:?}", other.map(|m| m.num_vertices())),
        }

        let mesh: Mesh = Mesh::new();
        assert!(matches!(
            save(&mesh, "out.gltf"),
            Err(TransferError::SaveError { .. })
        ));
        assert!(matches!(
            save(&mesh, "out"),
            Err(TransferError::UnsupportedFormat { .. })
        ));
    }
}
