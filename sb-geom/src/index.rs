use rstar::{RTree, RTreeObject, AABB};

/// A rectangle-tree spatial index over candidate bounding rectangles,
/// supporting `query(rect)` for intersection candidates. Grounded on
/// `geom`'s `aabb-quadtree`-backed spatial index, reimplemented over
/// `rstar` since that crate is already a dependency of the teacher's own
/// `geom` crate.
pub struct SpatialIndex {
    tree: RTree<IndexedRect>,
}

#[derive(Clone, Debug)]
struct IndexedRect {
    idx: usize,
    min: [f64; 2],
    max: [f64; 2],
}

impl RTreeObject for IndexedRect {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.min, self.max)
    }
}

impl SpatialIndex {
    /// Builds an index over the bounding rectangles of the given
    /// geometries, keyed by their position in the input slice.
    pub fn build(rects: &[((f64, f64), (f64, f64))]) -> SpatialIndex {
        let entries = rects
            .iter()
            .enumerate()
            .map(|(idx, ((minx, miny), (maxx, maxy)))| IndexedRect {
                idx,
                min: [*minx, *miny],
                max: [*maxx, *maxy],
            })
            .collect();
        SpatialIndex {
            tree: RTree::bulk_load(entries),
        }
    }

    /// Indices whose bounding rectangle intersects the query rectangle.
    pub fn query(&self, min: (f64, f64), max: (f64, f64)) -> Vec<usize> {
        let envelope = AABB::from_corners([min.0, min.1], [max.0, max.1]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .map(|r| r.idx)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_overlapping_rect() {
        let idx = SpatialIndex::build(&[((0.0, 0.0), (1.0, 1.0)), ((5.0, 5.0), (6.0, 6.0))]);
        let hits = idx.query((0.5, 0.5), (0.6, 0.6));
        assert_eq!(hits, vec![0]);
    }
}
