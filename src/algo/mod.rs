//! Correspondence algorithms.
//!
//! - **UV index**: a balanced 2D k-d tree over per-loop UV coordinates
//! - **Transfer**: nearest-UV loop matching and vertex position copy

pub mod kdtree;
pub mod progress;
pub mod transfer;

pub use kdtree::{build_index, Nearest, UvIndex, UvIndexBuilder};
pub use progress::Progress;
pub use transfer::{
    apply_correspondence, find_correspondence, resolve_and_copy, uv_transfer, Correspondence,
    LoopMatch, TransferOptions, TransferReport,
};
