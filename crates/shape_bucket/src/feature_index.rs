//! Hit-testing index over the features a tile's buckets retained.

use crate::geometry::{bounding_box, Ring};
use glam::IVec2;
use rstar::{RTree, RTreeObject, AABB};

#[derive(Debug, Clone, PartialEq)]
pub struct IndexedFeature {
    /// Position of the feature in the tile's raw feature stream.
    pub source_index: u32,
    /// Index of the bucket that retained it.
    pub bucket_index: u32,
    envelope: AABB<[i32; 2]>,
}

impl IndexedFeature {
    pub fn bounds(&self) -> (IVec2, IVec2) {
        (
            IVec2::from_array(self.envelope.lower()),
            IVec2::from_array(self.envelope.upper()),
        )
    }
}

impl RTreeObject for IndexedFeature {
    type Envelope = AABB<[i32; 2]>;

    #[inline]
    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// One per tile, shared by all of its buckets.
#[derive(Debug)]
pub struct FeatureIndex {
    tree: RTree<IndexedFeature>,
}

impl Default for FeatureIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl FeatureIndex {
    pub fn new() -> Self {
        Self { tree: RTree::new() }
    }

    /// Record a feature's tile-local bounds. Features without points are not indexed.
    pub fn insert(&mut self, geometry: &[Ring], source_index: u32, bucket_index: u32) {
        if let Some((min, max)) = bounding_box(geometry) {
            self.tree.insert(IndexedFeature {
                source_index,
                bucket_index,
                envelope: AABB::from_corners(min.to_array(), max.to_array()),
            });
        }
    }

    /// Features whose bounds intersect `[min, max]`, in stream order.
    pub fn query(&self, min: IVec2, max: IVec2) -> Vec<&IndexedFeature> {
        let query = AABB::from_corners(min.to_array(), max.to_array());
        let mut hits: Vec<&IndexedFeature> = self.tree.locate_in_envelope_intersecting(&query).collect();
        hits.sort_by_key(|f| (f.source_index, f.bucket_index));
        hits
    }

    /// Features within `radius` tile units of `point` (box test).
    pub fn query_point(&self, point: IVec2, radius: i32) -> Vec<&IndexedFeature> {
        let r = IVec2::splat(radius.max(0));
        self.query(point - r, point + r)
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
