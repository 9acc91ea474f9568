//! Static 2-D index over planar points for nearest-neighbour lookup.
//!
//! The R-tree is bulk-loaded from scratch on every change; there is no
//! incremental insert or delete.
//!
//! Ordering contract:
//! - `nearest` returns the entry with the smallest Euclidean distance.
//! - Among entries at exactly the same distance, the one supplied first to
//!   `rebuild` wins.

use crate::geometry::PlanarPoint;
use rstar::{PointDistance, RTree, RTreeObject, AABB};

/// Result of a nearest-neighbour query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Caller-supplied identifier of the matched entry.
    pub item: usize,
    pub point: PlanarPoint,
    pub distance: f64,
}

/// A planar point tagged with its caller id and supply order.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    item: usize,
    order: usize,
    x: f64,
    y: f64,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.x - point[0];
        let dy = self.y - point[1];
        dx * dx + dy * dy
    }
}

pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Discards the current tree and indexes exactly `points`.
    ///
    /// Non-finite coordinates are skipped. Duplicate coordinates are kept.
    pub fn rebuild<I>(&mut self, points: I)
    where
        I: IntoIterator<Item = (usize, PlanarPoint)>,
    {
        let indexed: Vec<IndexedPoint> = points
            .into_iter()
            .enumerate()
            .filter(|(_, (_, point))| point.is_finite())
            .map(|(order, (item, point))| IndexedPoint {
                item,
                order,
                x: point.x,
                y: point.y,
            })
            .collect();
        self.tree = RTree::bulk_load(indexed);
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// Closest indexed entry to `(x, y)`, or `None` when the index is empty
    /// or the query is not finite.
    pub fn nearest(&self, x: f64, y: f64) -> Option<Neighbor> {
        if !x.is_finite() || !y.is_finite() {
            return None;
        }
        let query = [x, y];

        // Candidates arrive in non-decreasing distance order.
        let mut candidates = self
            .tree
            .nearest_neighbor_iter(&query)
            .map(|entry| (entry.distance_2(&query), entry));
        let (best_distance, first) = candidates.next()?;
        let best = candidates
            .take_while(|(distance, _)| *distance == best_distance)
            .map(|(_, entry)| entry)
            .fold(first, |best, entry| {
                if entry.order < best.order {
                    entry
                } else {
                    best
                }
            });

        Some(Neighbor {
            item: best.item,
            point: PlanarPoint::new(best.x, best.y),
            distance: best_distance.sqrt(),
        })
    }
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::new()
    }
}
