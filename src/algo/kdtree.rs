//! Two-dimensional k-d tree over UV coordinates.
//!
//! The index is built in two steps. Points are collected in a
//! [`UvIndexBuilder`], and [`UvIndexBuilder::build`] balances them into an
//! immutable [`UvIndex`]. Only the built index can be queried, so a partially
//! built or unbalanced tree is never searched.
//!
//! # Layout
//!
//! The tree is stored implicitly: after balancing, the point at the middle of
//! any subrange is that subtree's splitting node, the lower half is its left
//! subtree and the upper half its right subtree. Each node splits along the
//! axis with the larger extent in its subrange.
//!
//! # Ties
//!
//! Among equidistant candidates the point with the lowest loop index is
//! returned. The search visits the far side of a split whenever it could hold
//! a point at *equal* distance, so the result does not depend on the tree
//! shape.
//!
//! # Example
//!
//! ```
//! use uvtransfer::algo::kdtree::UvIndexBuilder;
//! use uvtransfer::mesh::LoopId;
//! use nalgebra::Point2;
//!
//! let mut builder: UvIndexBuilder = UvIndexBuilder::new();
//! builder.insert(Point2::new(0.0, 0.0), LoopId::new(0));
//! builder.insert(Point2::new(1.0, 0.0), LoopId::new(1));
//! builder.insert(Point2::new(1.0, 1.0), LoopId::new(2));
//! let index = builder.build().unwrap();
//!
//! let hit = index.nearest(Point2::new(0.9, 0.2));
//! assert_eq!(hit.loop_id, LoopId::new(1));
//! ```

use std::cmp::Ordering;
use std::time::Instant;

use nalgebra::Point2;

use crate::error::{MeshRole, Result, TransferError};
use crate::mesh::{LoopId, Mesh, MeshIndex, UvPoint};

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearest<I: MeshIndex = u32> {
    /// Loop that produced the matched UV point.
    pub loop_id: LoopId<I>,
    /// The matched UV coordinate.
    pub uv: Point2<f64>,
    /// Euclidean distance from the query point.
    pub distance: f64,
}

impl<I: MeshIndex> Nearest<I> {
    /// Whether the query hit a stored point exactly.
    #[inline]
    pub fn is_exact(&self) -> bool {
        self.distance == 0.0
    }
}

/// Collects UV points before balancing them into a [`UvIndex`].
#[derive(Debug, Clone)]
pub struct UvIndexBuilder<I: MeshIndex = u32> {
    points: Vec<UvPoint<I>>,
}

impl<I: MeshIndex> Default for UvIndexBuilder<I> {
    fn default() -> Self {
        Self::new()
    }
}

impl<I: MeshIndex> UvIndexBuilder<I> {
    /// Create an empty builder.
    pub fn new() -> Self {
        Self { points: Vec::new() }
    }

    /// Create a builder with room for `capacity` points.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            points: Vec::with_capacity(capacity),
        }
    }

    /// Insert a UV coordinate produced by the given loop.
    pub fn insert(&mut self, uv: Point2<f64>, loop_id: LoopId<I>) {
        self.points.push(UvPoint::new(uv, loop_id));
    }

    /// Number of points inserted so far.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether no point has been inserted.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Balance the collected points into a searchable index.
    ///
    /// Fails with [`TransferError::EmptyIndex`] if no point was inserted.
    pub fn build(self) -> Result<UvIndex<I>> {
        if self.points.is_empty() {
            return Err(TransferError::EmptyIndex);
        }

        let start = Instant::now();
        let mut points = self.points;
        let mut axes = vec![Axis::U; points.len()];
        balance(&mut points, &mut axes);

        log::debug!(
            "balanced UV index over {} points in {:.2?}",
            points.len(),
            start.elapsed()
        );

        Ok(UvIndex { points, axes })
    }
}

impl<I: MeshIndex> Extend<UvPoint<I>> for UvIndexBuilder<I> {
    fn extend<T: IntoIterator<Item = UvPoint<I>>>(&mut self, iter: T) {
        self.points.extend(iter);
    }
}

impl<I: MeshIndex> FromIterator<UvPoint<I>> for UvIndexBuilder<I> {
    fn from_iter<T: IntoIterator<Item = UvPoint<I>>>(iter: T) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// Splitting axis of a tree node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    U,
    V,
}

impl Axis {
    #[inline]
    fn coord(self, p: &Point2<f64>) -> f64 {
        match self {
            Axis::U => p.x,
            Axis::V => p.y,
        }
    }
}

/// An immutable, balanced nearest-neighbour index over UV points.
///
/// Always holds at least one point.
#[derive(Debug, Clone)]
pub struct UvIndex<I: MeshIndex = u32> {
    /// Points in implicit tree order.
    points: Vec<UvPoint<I>>,
    /// Splitting axis of the node stored at the same position.
    axes: Vec<Axis>,
}

impl<I: MeshIndex> UvIndex<I> {
    /// Build an index over the active UV layer of a mesh.
    ///
    /// Fails with [`TransferError::MissingUvData`] if the mesh has no usable
    /// UV layer.
    pub fn from_mesh(mesh: &Mesh<I>, role: MeshRole) -> Result<Self> {
        let points = mesh
            .uv_points()
            .ok_or(TransferError::MissingUvData { role })?;
        points.into_iter().collect::<UvIndexBuilder<I>>().build()
    }

    /// Number of indexed points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Whether the index is empty. A built index never is.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Find the stored point nearest to `query`.
    ///
    /// Equidistant candidates resolve to the lowest loop index.
    pub fn nearest(&self, query: Point2<f64>) -> Nearest<I> {
        let mut best = Best {
            distance_sq: f64::INFINITY,
            slot: None,
        };
        self.search(&query, 0, self.points.len(), &mut best);

        // A built index is never empty, and the first visited node always
        // becomes the initial candidate.
        let slot = best.slot.unwrap_or(self.points.len() / 2);
        let hit = self.points[slot];
        Nearest {
            loop_id: hit.loop_id,
            uv: hit.uv,
            distance: best.distance_sq.sqrt(),
        }
    }

    fn search(&self, query: &Point2<f64>, lo: usize, hi: usize, best: &mut Best) {
        if lo >= hi {
            return;
        }
        let mid = lo + (hi - lo) / 2;
        let node = &self.points[mid];

        let mut distance_sq = (node.uv - *query).norm_squared();
        if distance_sq.is_nan() {
            distance_sq = f64::INFINITY;
        }
        if best.accepts(distance_sq, node.loop_id, &self.points) {
            best.distance_sq = distance_sq;
            best.slot = Some(mid);
        }

        let axis = self.axes[mid];
        let diff = axis.coord(query) - axis.coord(&node.uv);
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };

        self.search(query, near.0, near.1, best);
        if diff * diff <= best.distance_sq {
            self.search(query, far.0, far.1, best);
        }
    }
}

/// Build a balanced index from a slice of UV points.
///
/// Fails with [`TransferError::EmptyIndex`] if `points` is empty.
pub fn build_index<I: MeshIndex>(points: &[UvPoint<I>]) -> Result<UvIndex<I>> {
    points.iter().copied().collect::<UvIndexBuilder<I>>().build()
}

/// Current best candidate during a search.
struct Best {
    distance_sq: f64,
    slot: Option<usize>,
}

impl Best {
    #[inline]
    fn accepts<I: MeshIndex>(
        &self,
        distance_sq: f64,
        loop_id: LoopId<I>,
        points: &[UvPoint<I>],
    ) -> bool {
        match self.slot {
            None => true,
            Some(slot) => match distance_sq.partial_cmp(&self.distance_sq) {
                Some(Ordering::Less) => true,
                Some(Ordering::Equal) => loop_id < points[slot].loop_id,
                _ => false,
            },
        }
    }
}

/// Reorder `points` into implicit k-d tree order, recording split axes.
fn balance<I: MeshIndex>(points: &mut [UvPoint<I>], axes: &mut [Axis]) {
    if points.len() <= 1 {
        return;
    }

    let axis = widest_axis(points);
    let mid = points.len() / 2;
    points.select_nth_unstable_by(mid, |a, b| {
        axis.coord(&a.uv)
            .total_cmp(&axis.coord(&b.uv))
            .then(a.loop_id.cmp(&b.loop_id))
    });
    axes[mid] = axis;

    let (left, rest) = points.split_at_mut(mid);
    let (left_axes, rest_axes) = axes.split_at_mut(mid);
    balance(left, left_axes);
    balance(&mut rest[1..], &mut rest_axes[1..]);
}

fn widest_axis<I: MeshIndex>(points: &[UvPoint<I>]) -> Axis {
    let mut min = Point2::new(f64::INFINITY, f64::INFINITY);
    let mut max = Point2::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
    for p in points {
        min.x = min.x.min(p.uv.x);
        min.y = min.y.min(p.uv.y);
        max.x = max.x.max(p.uv.x);
        max.y = max.y.max(p.uv.y);
    }
    if max.y - min.y > max.x - min.x {
        Axis::V
    } else {
        Axis::U
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiddo::{KdTree, SquaredEuclidean};
    use rand::{Rng, SeedableRng};

    fn corners() -> Vec<UvPoint> {
        vec![
            UvPoint::from_coords(0.0, 0.0, 0),
            UvPoint::from_coords(1.0, 0.0, 1),
            UvPoint::from_coords(1.0, 1.0, 2),
            UvPoint::from_coords(0.0, 1.0, 3),
        ]
    }

    fn brute_force(points: &[UvPoint], query: Point2<f64>) -> (LoopId, f64) {
        let mut best = (points[0].loop_id, (points[0].uv - query).norm_squared());
        for p in &points[1..] {
            let d = (p.uv - query).norm_squared();
            if d < best.1 || (d == best.1 && p.loop_id < best.0) {
                best = (p.loop_id, d);
            }
        }
        (best.0, best.1.sqrt())
    }

    fn random_points(count: usize, seed: u64) -> Vec<UvPoint> {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        (0..count)
            .map(|i| UvPoint::from_coords(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0), i))
            .collect()
    }

    #[test]
    fn test_empty_builder_fails() {
        let builder: UvIndexBuilder = UvIndexBuilder::new();
        assert!(builder.is_empty());
        assert!(matches!(builder.build(), Err(TransferError::EmptyIndex)));

        let empty: &[UvPoint] = &[];
        assert!(matches!(build_index(empty), Err(TransferError::EmptyIndex)));
    }

    #[test]
    fn test_single_point() {
        let index = build_index(&[UvPoint::<u32>::from_coords(0.3, 0.7, 5)]).unwrap();
        assert_eq!(index.len(), 1);
        assert!(!index.is_empty());

        let hit = index.nearest(Point2::new(10.0, 10.0));
        assert_eq!(hit.loop_id, LoopId::new(5));
        assert_eq!(hit.uv, Point2::new(0.3, 0.7));
    }

    #[test]
    fn test_exact_match_has_zero_distance() {
        let index = build_index(&corners()).unwrap();
        for p in corners() {
            let hit = index.nearest(p.uv);
            assert_eq!(hit.loop_id, p.loop_id);
            assert_eq!(hit.distance, 0.0);
            assert!(hit.is_exact());
        }
    }

    #[test]
    fn test_center_tie_resolves_to_lowest_loop() {
        let index = build_index(&corners()).unwrap();
        let hit = index.nearest(Point2::new(0.5, 0.5));
        assert_eq!(hit.loop_id, LoopId::new(0));
        assert!((hit.distance - 0.5_f64.sqrt()).abs() < 1e-12);

        // Insertion order does not change the winner.
        let mut reversed = corners();
        reversed.reverse();
        let index = build_index(&reversed).unwrap();
        assert_eq!(index.nearest(Point2::new(0.5, 0.5)).loop_id, LoopId::new(0));
    }

    #[test]
    fn test_duplicate_coordinates_prefer_lowest_loop() {
        // A seam: the same UV appears on several loops.
        let points: Vec<UvPoint> = vec![
            UvPoint::from_coords(0.5, 0.5, 9),
            UvPoint::from_coords(0.5, 0.5, 4),
            UvPoint::from_coords(0.2, 0.5, 1),
            UvPoint::from_coords(0.5, 0.5, 6),
        ];
        let index = build_index(&points).unwrap();
        let hit = index.nearest(Point2::new(0.5, 0.5));
        assert_eq!(hit.loop_id, LoopId::new(4));
        assert!(hit.is_exact());
    }

    #[test]
    fn test_grid_aligned_points() {
        // Many points share a coordinate on each axis.
        let mut points = Vec::new();
        for j in 0..20 {
            for i in 0..20 {
                points.push(UvPoint::from_coords(i as f64 / 19.0, j as f64 / 19.0, j * 20 + i));
            }
        }
        let index = build_index(&points).unwrap();

        for q in [
            Point2::new(0.01, 0.01),
            Point2::new(0.5, 0.5),
            Point2::new(0.98, 0.33),
            Point2::new(-1.0, 2.0),
        ] {
            let hit = index.nearest(q);
            let (expected, dist) = brute_force(&points, q);
            assert_eq!(hit.loop_id, expected, "query {:?}", q);
            assert!((hit.distance - dist).abs() < 1e-12);
        }
    }

    #[test]
    fn test_matches_brute_force_on_random_points() {
        let points = random_points(500, 42);
        let index = build_index(&points).unwrap();

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let q = Point2::new(rng.gen_range(-0.2..1.2), rng.gen_range(-0.2..1.2));
            let hit = index.nearest(q);
            let (expected, dist) = brute_force(&points, q);
            assert_eq!(hit.loop_id, expected);
            assert!((hit.distance - dist).abs() < 1e-12);
        }
    }

    #[test]
    fn test_distances_agree_with_kiddo() {
        let points = random_points(300, 1234);
        let index = build_index(&points).unwrap();

        let mut reference: KdTree<f64, 2> = KdTree::new();
        for p in &points {
            reference.add(&[p.uv.x, p.uv.y], p.loop_id.index() as u64);
        }

        let mut rng = rand::rngs::StdRng::seed_from_u64(99);
        for _ in 0..100 {
            let q = Point2::new(rng.gen_range(0.0..1.0), rng.gen_range(0.0..1.0));
            let ours = index.nearest(q);
            let theirs = reference.nearest_one::<SquaredEuclidean>(&[q.x, q.y]);
            assert!((ours.distance * ours.distance - theirs.distance).abs() < 1e-12);
        }
    }

    #[test]
    fn test_nan_query_still_returns_a_point() {
        let index = build_index(&corners()).unwrap();
        let hit = index.nearest(Point2::new(f64::NAN, 0.0));
        assert!(hit.loop_id.is_valid());
    }

    #[test]
    fn test_from_mesh_requires_uvs() {
        use crate::mesh::build_from_triangles;
        use nalgebra::Point3;

        let vertices = vec![
            Point3::new(0.0, 0.0, 0.0),
            Point3::new(1.0, 0.0, 0.0),
            Point3::new(0.0, 1.0, 0.0),
        ];
        let mut mesh: Mesh = build_from_triangles(&vertices, &[[0, 1, 2]]).unwrap();
        assert!(matches!(
            UvIndex::from_mesh(&mesh, MeshRole::Source),
            Err(TransferError::MissingUvData { role: MeshRole::Source })
        ));

        mesh.add_uv_layer(
            "UVMap",
            vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0), Point2::new(0.0, 1.0)],
        )
        .unwrap();
        let index = UvIndex::from_mesh(&mesh, MeshRole::Source).unwrap();
        assert_eq!(index.len(), 3);
        assert_eq!(index.nearest(Point2::new(0.9, 0.1)).loop_id, LoopId::new(1));
    }
}
