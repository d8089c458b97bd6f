//! Spatial Index Module
//!
//! R-tree over polygon vertices for radius hit testing. Candidates come
//! from an envelope query and are then ranked by true distance.

use crate::types::Point;
use rstar::{AABB, RTree, RTreeObject};

/// A polygon vertex stored in the tree.
#[derive(Debug, Clone, Copy)]
pub struct VertexEntry {
    pub index: usize,
    pub x: f32,
    pub y: f32,
}

impl RTreeObject for VertexEntry {
    type Envelope = AABB<[f32; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point([self.x, self.y])
    }
}

impl PartialEq for VertexEntry {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

/// Spatial index over the vertices of one polygon.
pub struct VertexIndex {
    tree: RTree<VertexEntry>,
    entries: Vec<VertexEntry>,
}

impl Default for VertexIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl VertexIndex {
    pub fn new() -> Self {
        Self {
            tree: RTree::new(),
            entries: Vec::new(),
        }
    }

    /// Rebuild from scratch; vertex indices follow slice order
    pub fn from_points(points: &[Point]) -> Self {
        let entries: Vec<VertexEntry> = points
            .iter()
            .enumerate()
            .map(|(index, p)| VertexEntry { index, x: p.x, y: p.y })
            .collect();
        Self {
            tree: RTree::bulk_load(entries.clone()),
            entries,
        }
    }

    /// Move one vertex
    pub fn update(&mut self, index: usize, point: Point) {
        let Some(entry) = self.entries.get_mut(index) else {
            return;
        };
        self.tree.remove(entry);
        entry.x = point.x;
        entry.y = point.y;
        self.tree.insert(*entry);
    }

    /// Nearest vertex within `radius` of `(x, y)`
    pub fn nearest_within(&self, x: f32, y: f32, radius: f32) -> Option<usize> {
        let envelope = AABB::from_corners([x - radius, y - radius], [x + radius, y + radius]);
        let r2 = radius * radius;

        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|e| {
                let (dx, dy) = (e.x - x, e.y - y);
                (e.index, dx * dx + dy * dy)
            })
            .filter(|&(_, d2)| d2 <= r2)
            .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
            .map(|(index, _)| index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
