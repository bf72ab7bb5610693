//! Vertex position transfer through UV correspondence.
//!
//! Every face-loop of the target mesh is matched to the source loop whose UV
//! coordinate is nearest in UV space. Both loops are then resolved to their
//! vertices and the source vertex position is copied onto the target vertex.
//!
//! # Last write wins
//!
//! Loops are applied in storage order. When several target loops reference
//! the same vertex (every shared vertex, and every vertex on a seam) the
//! vertex ends up at the position chosen by its *last* loop. Positions are
//! never averaged.
//!
//! # Atomicity
//!
//! All preconditions are checked and the full correspondence is computed
//! before the first write, so an error leaves both meshes untouched.
//!
//! # Example
//!
//! ```
//! use uvtransfer::algo::transfer::{uv_transfer, TransferOptions};
//! use uvtransfer::mesh::{build_from_polygons, Mesh, VertexId};
//! use nalgebra::{Point2, Point3};
//!
//! let uvs = vec![
//!     Point2::new(0.0, 0.0),
//!     Point2::new(1.0, 0.0),
//!     Point2::new(1.0, 1.0),
//!     Point2::new(0.0, 1.0),
//! ];
//! let corners = |z: f64| {
//!     vec![
//!         Point3::new(0.0, 0.0, z),
//!         Point3::new(1.0, 0.0, z),
//!         Point3::new(1.0, 1.0, z),
//!         Point3::new(0.0, 1.0, z),
//!     ]
//! };
//!
//! let mut source: Mesh = build_from_polygons(&corners(0.0), &[vec![0, 1, 2, 3]]).unwrap();
//! source.add_uv_layer("UVMap", uvs.clone()).unwrap();
//! let mut target: Mesh = build_from_polygons(&corners(5.0), &[vec![0, 1, 2, 3]]).unwrap();
//! target.add_uv_layer("UVMap", uvs).unwrap();
//!
//! let report = uv_transfer(&source, &mut target, &TransferOptions::default()).unwrap();
//! assert_eq!(report.loops_matched, 4);
//! assert_eq!(target.position(VertexId::new(2)).z, 0.0);
//! ```

use std::time::Instant;

use nalgebra::Point3;
use rayon::prelude::*;

use super::kdtree::UvIndex;
use super::Progress;
use crate::error::{MeshRole, Result, TransferError};
use crate::mesh::{LoopId, Mesh, MeshIndex, VertexId};

/// Number of loops between two progress reports.
const PROGRESS_CHUNK: usize = 4096;

/// Options for UV-based position transfer.
#[derive(Debug, Clone, Default)]
pub struct TransferOptions {
    /// Run the nearest-neighbour queries on the rayon thread pool.
    ///
    /// Positions are always written sequentially in loop order, so the result
    /// is identical either way.
    pub parallel: bool,
}

impl TransferOptions {
    /// Set whether to run queries in parallel.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Create options for single-threaded execution.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }
}

/// The nearest source loop found for one target loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoopMatch<I: MeshIndex = u32> {
    /// Loop of the target mesh.
    pub target_loop: LoopId<I>,
    /// Source loop with the nearest UV coordinate.
    pub source_loop: LoopId<I>,
    /// UV-space distance between the two coordinates.
    pub distance: f64,
}

/// Loop-to-loop correspondence from a target mesh onto a source mesh.
///
/// Holds exactly one [`LoopMatch`] per target loop, in loop order.
#[derive(Debug, Clone)]
pub struct Correspondence<I: MeshIndex = u32> {
    matches: Vec<LoopMatch<I>>,
}

impl<I: MeshIndex> Correspondence<I> {
    /// Number of matched target loops.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether the correspondence is empty.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// All matches in target loop order.
    pub fn matches(&self) -> &[LoopMatch<I>] {
        &self.matches
    }

    /// Iterate over matches in target loop order.
    pub fn iter(&self) -> impl Iterator<Item = &LoopMatch<I>> + '_ {
        self.matches.iter()
    }

    /// The source loop matched to a target loop.
    pub fn source_loop(&self, target_loop: LoopId<I>) -> Option<LoopId<I>> {
        self.matches.get(target_loop.index()).map(|m| m.source_loop)
    }

    /// Number of target loops whose UV coincides exactly with a source UV.
    pub fn exact_matches(&self) -> usize {
        self.matches.iter().filter(|m| m.distance == 0.0).count()
    }

    /// Largest UV-space distance over all matches.
    pub fn max_distance(&self) -> f64 {
        self.matches.iter().map(|m| m.distance).fold(0.0, f64::max)
    }

    /// Resolve the correspondence to vertex space.
    ///
    /// Entry `v` holds the source vertex whose position target vertex `v`
    /// receives: that of the last loop referencing `v`. Vertices referenced by
    /// no loop map to `None`. Fails if the correspondence was not built for
    /// these meshes.
    pub fn vertex_map(
        &self,
        source: &Mesh<I>,
        target: &Mesh<I>,
    ) -> Result<Vec<Option<VertexId<I>>>> {
        self.check_meshes(source, target)?;

        let mut map = vec![None; target.num_vertices()];
        for m in &self.matches {
            let v_t = target.loop_vertex(m.target_loop);
            map[v_t.index()] = Some(source.loop_vertex(m.source_loop));
        }
        Ok(map)
    }

    /// Check that every match addresses a loop of `target` and of `source`.
    fn check_meshes(&self, source: &Mesh<I>, target: &Mesh<I>) -> Result<()> {
        if self.len() != target.num_loops() {
            return Err(TransferError::invalid_state(format!(
                "correspondence covers {} loops but the target mesh has {}",
                self.len(),
                target.num_loops()
            )));
        }
        if let Some(m) = self
            .iter()
            .find(|m| m.source_loop.index() >= source.num_loops())
        {
            return Err(TransferError::invalid_state(format!(
                "source loop {} is out of range ({} loops)",
                m.source_loop.index(),
                source.num_loops()
            )));
        }
        Ok(())
    }
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TransferReport {
    /// Number of target loops matched (all of them).
    pub loops_matched: usize,
    /// Number of distinct target vertices written.
    pub vertices_written: usize,
    /// Number of loops whose UV matched a source UV exactly.
    pub exact_matches: usize,
    /// Target vertices whose loops resolved to different source positions.
    pub conflicting_vertices: usize,
    /// Largest UV-space match distance.
    pub max_distance: f64,
    /// Mean UV-space match distance.
    pub mean_distance: f64,
}

/// Match every target loop to its nearest source loop in UV space.
///
/// Fails with [`TransferError::MissingUvData`] if the target has no usable UV
/// layer.
pub fn find_correspondence<I: MeshIndex>(
    index: &UvIndex<I>,
    target: &Mesh<I>,
    options: &TransferOptions,
) -> Result<Correspondence<I>> {
    find_correspondence_with_progress(index, target, options, &Progress::none())
}

/// Match every target loop to its nearest source loop, reporting progress.
pub fn find_correspondence_with_progress<I: MeshIndex>(
    index: &UvIndex<I>,
    target: &Mesh<I>,
    options: &TransferOptions,
    progress: &Progress,
) -> Result<Correspondence<I>> {
    let layer = match target.active_uv_layer() {
        Some(layer) if target.has_uvs() => layer,
        _ => {
            return Err(TransferError::MissingUvData {
                role: MeshRole::Target,
            })
        }
    };
    let uvs = layer.as_slice();
    let total = uvs.len();

    let query = |i: usize| {
        let hit = index.nearest(uvs[i]);
        LoopMatch {
            target_loop: LoopId::new(i),
            source_loop: hit.loop_id,
            distance: hit.distance,
        }
    };

    progress.report(0, total, "Matching UVs");
    let matches: Vec<LoopMatch<I>> = if options.parallel {
        (0..total).into_par_iter().map(query).collect()
    } else {
        let mut matches = Vec::with_capacity(total);
        for i in 0..total {
            if i % PROGRESS_CHUNK == 0 {
                progress.report(i, total, "Matching UVs");
            }
            matches.push(query(i));
        }
        matches
    };
    progress.report(total, total, "Matching UVs");

    Ok(Correspondence { matches })
}

/// Copy source vertex positions onto the target following a correspondence.
///
/// Writes happen in target loop order; the last loop referencing a vertex
/// decides its final position. The correspondence is validated against both
/// meshes before anything is written.
pub fn apply_correspondence<I: MeshIndex>(
    correspondence: &Correspondence<I>,
    source: &Mesh<I>,
    target: &mut Mesh<I>,
) -> Result<TransferReport> {
    correspondence.check_meshes(source, target)?;

    let mut first_written: Vec<Option<Point3<f64>>> = vec![None; target.num_vertices()];
    let mut conflicting = vec![false; target.num_vertices()];
    let mut distance_sum = 0.0;

    for m in correspondence.iter() {
        let v_t = target.loop_vertex(m.target_loop);
        let v_s = source.loop_vertex(m.source_loop);
        let position = *source.position(v_s);

        match first_written[v_t.index()] {
            None => first_written[v_t.index()] = Some(position),
            Some(first) if first != position => conflicting[v_t.index()] = true,
            Some(_) => {}
        }
        target.set_position(v_t, position);
        distance_sum += m.distance;
    }

    let loops_matched = correspondence.len();
    let report = TransferReport {
        loops_matched,
        vertices_written: first_written.iter().filter(|p| p.is_some()).count(),
        exact_matches: correspondence.exact_matches(),
        conflicting_vertices: conflicting.iter().filter(|&&c| c).count(),
        max_distance: correspondence.max_distance(),
        mean_distance: if loops_matched > 0 {
            distance_sum / loops_matched as f64
        } else {
            0.0
        },
    };

    if report.conflicting_vertices > 0 {
        log::warn!(
            "{} target vertices matched different source positions through different loops; \
             the last loop in storage order was kept",
            report.conflicting_vertices
        );
    }

    Ok(report)
}

/// Query the source index for every target loop and copy positions.
///
/// `index` must have been built over `source`'s active UV layer. Fails with
/// [`TransferError::MissingUvData`] if either mesh lacks UVs and with
/// [`TransferError::IndexMeshMismatch`] if the index does not cover the
/// source's loops. No vertex is written unless every check passes.
pub fn resolve_and_copy<I: MeshIndex>(
    index: &UvIndex<I>,
    source: &Mesh<I>,
    target: &mut Mesh<I>,
) -> Result<TransferReport> {
    resolve_and_copy_with_progress(
        index,
        source,
        target,
        &TransferOptions::default(),
        &Progress::none(),
    )
}

/// [`resolve_and_copy`] with explicit options and progress reporting.
pub fn resolve_and_copy_with_progress<I: MeshIndex>(
    index: &UvIndex<I>,
    source: &Mesh<I>,
    target: &mut Mesh<I>,
    options: &TransferOptions,
    progress: &Progress,
) -> Result<TransferReport> {
    check_uvs(source, target)?;
    if index.len() != source.num_loops() {
        return Err(TransferError::IndexMeshMismatch {
            index_points: index.len(),
            source_loops: source.num_loops(),
        });
    }

    let start = Instant::now();
    let correspondence = find_correspondence_with_progress(index, target, options, progress)?;
    log::debug!(
        "matched {} target loops in {:.2?}",
        correspondence.len(),
        start.elapsed()
    );

    apply_correspondence(&correspondence, source, target)
}

/// Transfer vertex positions from `source` onto `target` by nearest UV.
///
/// Builds a UV index over the source's active layer, matches every target
/// loop against it and copies positions. Both meshes must carry an active UV
/// layer.
pub fn uv_transfer<I: MeshIndex>(
    source: &Mesh<I>,
    target: &mut Mesh<I>,
    options: &TransferOptions,
) -> Result<TransferReport> {
    uv_transfer_with_progress(source, target, options, &Progress::none())
}

/// [`uv_transfer`] with progress reporting.
pub fn uv_transfer_with_progress<I: MeshIndex>(
    source: &Mesh<I>,
    target: &mut Mesh<I>,
    options: &TransferOptions,
    progress: &Progress,
) -> Result<TransferReport> {
    check_uvs(source, target)?;

    let start = Instant::now();
    let index = UvIndex::from_mesh(source, MeshRole::Source)?;
    let report = resolve_and_copy_with_progress(&index, source, target, options, progress)?;

    log::info!(
        "transferred {} loops onto {} vertices ({} exact, max UV distance {:.6}) in {:.2?}",
        report.loops_matched,
        report.vertices_written,
        report.exact_matches,
        report.max_distance,
        start.elapsed()
    );
    Ok(report)
}

fn check_uvs<I: MeshIndex>(source: &Mesh<I>, target: &Mesh<I>) -> Result<()> {
    if !target.has_uvs() {
        return Err(TransferError::MissingUvData {
            role: MeshRole::Target,
        });
    }
    if !source.has_uvs() {
        return Err(TransferError::MissingUvData {
            role: MeshRole::Source,
        });
    }
    Ok(())
}
