//! Per-loop UV coordinate storage.
//!
//! UV coordinates live on face-loops rather than vertices, so a vertex on a
//! seam is seen through several loops that may each carry a different UV.

use std::marker::PhantomData;

use nalgebra::Point2;

use super::index::{LoopId, MeshIndex};

/// A UV coordinate tagged with the face-loop that produced it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UvPoint<I: MeshIndex = u32> {
    /// The 2D texture-space coordinate.
    pub uv: Point2<f64>,
    /// The loop carrying this coordinate.
    pub loop_id: LoopId<I>,
}

impl<I: MeshIndex> UvPoint<I> {
    /// Create a new UV point.
    pub fn new(uv: Point2<f64>, loop_id: LoopId<I>) -> Self {
        Self { uv, loop_id }
    }

    /// Create a UV point from raw coordinates and a loop index.
    pub fn from_coords(u: f64, v: f64, loop_index: usize) -> Self {
        Self::new(Point2::new(u, v), LoopId::new(loop_index))
    }
}

/// A named UV layer holding one coordinate per face-loop.
///
/// # Example
///
/// ```
/// use uvtransfer::mesh::{LoopId, UvLayer};
/// use nalgebra::Point2;
///
/// let layer: UvLayer = UvLayer::new("UVMap", vec![Point2::new(0.0, 0.0), Point2::new(1.0, 0.0)]);
/// assert_eq!(layer.get(LoopId::new(1)), Point2::new(1.0, 0.0));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct UvLayer<I: MeshIndex = u32> {
    name: String,
    /// UV coordinates indexed by loop ID.
    coords: Vec<Point2<f64>>,
    _marker: PhantomData<I>,
}

impl<I: MeshIndex> UvLayer<I> {
    /// Create a new UV layer with the given coordinates, indexed by loop.
    pub fn new(name: impl Into<String>, coords: Vec<Point2<f64>>) -> Self {
        Self {
            name: name.into(),
            coords,
            _marker: PhantomData,
        }
    }

    /// The layer's name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the UV coordinate of a loop.
    #[inline]
    pub fn get(&self, l: LoopId<I>) -> Point2<f64> {
        self.coords[l.index()]
    }

    /// Number of coordinates.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// Check if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// Iterate over all coordinates with their loop IDs.
    pub fn iter(&self) -> impl Iterator<Item = (LoopId<I>, Point2<f64>)> + '_ {
        self.coords
            .iter()
            .enumerate()
            .map(|(i, &uv)| (LoopId::new(i), uv))
    }

    /// Iterate over the layer as [`UvPoint`]s, in loop order.
    pub fn points(&self) -> impl Iterator<Item = UvPoint<I>> + '_ {
        self.iter().map(|(l, uv)| UvPoint::new(uv, l))
    }

    /// Get the raw coordinates slice.
    pub fn as_slice(&self) -> &[Point2<f64>] {
        &self.coords
    }

    /// Compute the bounding box of the UV coordinates.
    ///
    /// Returns `None` if the layer is empty.
    pub fn bounding_box(&self) -> Option<(Point2<f64>, Point2<f64>)> {
        let first = *self.coords.first()?;
        let mut min = first;
        let mut max = first;

        for uv in &self.coords {
            min.x = min.x.min(uv.x);
            min.y = min.y.min(uv.y);
            max.x = max.x.max(uv.x);
            max.y = max.y.max(uv.y);
        }

        Some((min, max))
    }
}
