//! Error types for uvtransfer.
//!
//! This module defines all error types used throughout the library.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`TransferError`].
pub type Result<T> = std::result::Result<T, TransferError>;

/// Which side of a transfer a mesh plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MeshRole {
    /// The mesh whose positions are read.
    Source,
    /// The mesh whose positions are overwritten.
    Target,
}

impl fmt::Display for MeshRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MeshRole::Source => f.write_str("source"),
            MeshRole::Target => f.write_str("target"),
        }
    }
}

/// Errors that can occur while building meshes or transferring positions.
#[derive(Error, Debug)]
pub enum TransferError {
    /// A mesh has no active UV layer.
    #[error("{role} mesh has no UV data")]
    MissingUvData {
        /// The mesh lacking UVs.
        role: MeshRole,
    },

    /// Fewer or more than two objects are selected.
    #[error("exactly two mesh objects must be selected ({selected} selected)")]
    InsufficientSelection {
        /// Number of selected objects.
        selected: usize,
    },

    /// A selected or active object is not a mesh.
    #[error("object '{name}' is not a mesh")]
    InvalidObjectType {
        /// The offending object's name.
        name: String,
    },

    /// A spatial index was requested over zero UV points.
    #[error("cannot build a UV index from zero points")]
    EmptyIndex,

    /// The index was built over a different mesh than the one passed as source.
    #[error("UV index covers {index_points} loops but the source mesh has {source_loops}")]
    IndexMeshMismatch {
        /// Number of points in the index.
        index_points: usize,
        /// Number of loops in the source mesh.
        source_loops: usize,
    },

    /// The mesh has no faces.
    #[error("mesh has no faces")]
    EmptyMesh,

    /// A face references an invalid vertex index.
    #[error("face {face} references invalid vertex index {vertex}")]
    InvalidVertexIndex {
        /// The face index.
        face: usize,
        /// The invalid vertex index.
        vertex: usize,
    },

    /// A face has too few corners or repeats a vertex.
    #[error("face {face} is degenerate")]
    DegenerateFace {
        /// The face index.
        face: usize,
    },

    /// A UV layer does not carry exactly one coordinate per loop.
    #[error("UV layer '{name}' has {coords} coordinates but the mesh has {loops} loops")]
    UvLayerLengthMismatch {
        /// Layer name.
        name: String,
        /// Number of coordinates supplied.
        coords: usize,
        /// Number of loops in the mesh.
        loops: usize,
    },

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error loading mesh from file.
    #[error("failed to load mesh from {path}: {message}")]
    LoadError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Error saving mesh to file.
    #[error("failed to save mesh to {path}: {message}")]
    SaveError {
        /// The file path.
        path: PathBuf,
        /// Error message.
        message: String,
    },

    /// Unsupported file format.
    #[error("unsupported file format: {extension}")]
    UnsupportedFormat {
        /// The file extension.
        extension: String,
    },

    /// Invalid mesh or scene state for the requested operation.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl TransferError {
    /// Create an invalid state error.
    pub fn invalid_state<T: fmt::Display>(message: T) -> Self {
        TransferError::InvalidState(message.to_string())
    }

    /// Whether this error is a user-facing precondition failure rather than
    /// an I/O or programming error.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            TransferError::MissingUvData { .. }
                | TransferError::InsufficientSelection { .. }
                | TransferError::InvalidObjectType { .. }
        )
    }
}
