//! Shape buckets: one per (tile, layer group).
//!
//! The icon variant draws atlas images, the quad variant plain unit squares.
//! Which one a layer group gets is decided once, from whether its layers name
//! a `shape-image`.

mod icon;
mod quad;

pub use icon::IconBucket;
pub use quad::QuadBucket;

use crate::array_group::ArrayGroup;
use crate::atlas::{IconDependencies, SpriteLookup};
use crate::buffers::ShapeBuffers;
use crate::collector::{collect, Collected, RetainedFeature};
use crate::config::BucketOptions;
use crate::error::{Error, Result};
use crate::feature_index::FeatureIndex;
use crate::geometry::VectorTileFeature;
use crate::style::{GlobalProperties, ShapeLayer};
use crate::vertex::LayoutVertex;
use crate::Properties;
use serde_json::Value;
use std::sync::Arc;

/// Triangles of a full quad over `[tl, tr, bl, br]`, sharing the tr-bl diagonal.
const QUAD_TRIANGLES: [[u16; 3]; 2] = [[0, 1, 2], [1, 2, 3]];

/// The bucket lifecycle.
pub trait Bucket {
    /// Filter and retain `features`, index them, and return the icon names
    /// `prepare` will need.
    fn populate<F: VectorTileFeature>(
        &mut self,
        features: &[F],
        feature_index: &mut FeatureIndex,
    ) -> IconDependencies;

    /// Emit geometry for every retained feature. Re-running replaces the
    /// previous output, so this may be called again once more icons resolve.
    fn prepare(&mut self, icons: &dyn SpriteLookup);

    /// Collision placement hook. Shapes are never culled against each other.
    fn place(&mut self) {}

    fn is_empty(&self) -> bool;
}

/// Counters from the last `prepare`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BucketStats {
    pub emitted_points: usize,
    /// Points outside the tile extent.
    pub dropped_points: usize,
    /// Features whose icon the atlas could not supply.
    pub unresolved_features: usize,
}

/// Which half of a marker a stacked feature draws, from its `segment` property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum HalfMarker {
    /// `segment == 1`: the tl, tr, bl triangle.
    First,
    /// `segment == 2`: the tr, bl, br triangle.
    Second,
}

impl HalfMarker {
    /// Any value other than the numbers 1 and 2 draws a full marker.
    pub(crate) fn from_properties(properties: &Properties) -> Option<Self> {
        match properties.get("segment").and_then(Value::as_f64) {
            Some(v) if v == 1.0 => Some(HalfMarker::First),
            Some(v) if v == 2.0 => Some(HalfMarker::Second),
            _ => None,
        }
    }
}

/// Write one marker given its corners in `[tl, tr, bl, br]` order.
pub(crate) fn emit_marker<V: LayoutVertex>(
    arrays: &mut ArrayGroup<V>,
    half: Option<HalfMarker>,
    corners: [V; 4],
) {
    match half {
        None => arrays.emit(&corners, &QUAD_TRIANGLES),
        Some(HalfMarker::First) => arrays.emit(&corners[..3], &QUAD_TRIANGLES[..1]),
        Some(HalfMarker::Second) => arrays.emit(&corners[1..], &QUAD_TRIANGLES[..1]),
    }
}

/// State shared by both variants: the layers, their options and what `populate` kept.
#[derive(Debug)]
pub(crate) struct BucketState {
    pub(crate) options: BucketOptions,
    pub(crate) layers: Vec<Arc<ShapeLayer>>,
    pub(crate) globals: GlobalProperties,
    pub(crate) features: Vec<RetainedFeature>,
    pub(crate) stats: BucketStats,
}

impl BucketState {
    pub(crate) fn new(options: BucketOptions, layers: Vec<Arc<ShapeLayer>>) -> Result<Self> {
        if layers.is_empty() {
            return Err(Error::Config("a bucket needs at least one layer".into()));
        }

        Ok(Self {
            globals: GlobalProperties { zoom: options.zoom },
            options,
            layers,
            features: Vec::new(),
            stats: BucketStats::default(),
        })
    }

    /// The group's layers share filter and layout, so the first one stands for all.
    pub(crate) fn layer(&self) -> &ShapeLayer {
        &self.layers[0]
    }

    pub(crate) fn populate<F: VectorTileFeature>(
        &mut self,
        features: &[F],
        feature_index: &mut FeatureIndex,
    ) -> IconDependencies {
        let Collected { features, icons } =
            collect(&self.layers[0], features, feature_index, self.options.index);

        self.features = features;
        icons
    }

    pub(crate) fn array_group<V: LayoutVertex>(&self) -> ArrayGroup<V> {
        ArrayGroup::new(&self.layers, &self.globals)
    }
}

/// A bucket of either variant.
#[derive(Debug)]
pub enum ShapeBucket {
    Icon(IconBucket),
    Quad(QuadBucket),
}

impl ShapeBucket {
    /// Pick the variant for a layer group. Fails when `layers` is empty.
    pub fn new(options: BucketOptions, layers: Vec<Arc<ShapeLayer>>) -> Result<Self> {
        let uses_icons = layers
            .first()
            .map_or(false, |layer| layer.layout.icon_image.is_some());

        Ok(if uses_icons {
            ShapeBucket::Icon(IconBucket::new(options, layers)?)
        } else {
            ShapeBucket::Quad(QuadBucket::new(options, layers)?)
        })
    }

    pub fn layer_ids(&self) -> Vec<&str> {
        let layers = match self {
            ShapeBucket::Icon(b) => &b.state.layers,
            ShapeBucket::Quad(b) => &b.state.layers,
        };

        layers.iter().map(|l| l.id.as_str()).collect()
    }

    pub fn stats(&self) -> BucketStats {
        match self {
            ShapeBucket::Icon(b) => b.stats(),
            ShapeBucket::Quad(b) => b.stats(),
        }
    }

    pub fn finish(self) -> ShapeBuffers {
        match self {
            ShapeBucket::Icon(b) => b.finish(),
            ShapeBucket::Quad(b) => b.finish(),
        }
    }
}

impl Bucket for ShapeBucket {
    fn populate<F: VectorTileFeature>(
        &mut self,
        features: &[F],
        feature_index: &mut FeatureIndex,
    ) -> IconDependencies {
        match self {
            ShapeBucket::Icon(b) => b.populate(features, feature_index),
            ShapeBucket::Quad(b) => b.populate(features, feature_index),
        }
    }

    fn prepare(&mut self, icons: &dyn SpriteLookup) {
        match self {
            ShapeBucket::Icon(b) => b.prepare(icons),
            ShapeBucket::Quad(b) => b.prepare(icons),
        }
    }

    fn place(&mut self) {
        match self {
            ShapeBucket::Icon(b) => b.place(),
            ShapeBucket::Quad(b) => b.place(),
        }
    }

    fn is_empty(&self) -> bool {
        match self {
            ShapeBucket::Icon(b) => b.is_empty(),
            ShapeBucket::Quad(b) => b.is_empty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::SpriteImage;
    use crate::geometry::TileFeature;
    use serde_json::json;
    use std::collections::HashMap;

    fn layer(value: serde_json::Value) -> Arc<ShapeLayer> {
        Arc::new(ShapeLayer::from_json(&value).unwrap())
    }

    #[test]
    fn variant_follows_icon_image() {
        let options = BucketOptions::new(0, 14.0);

        let icon = ShapeBucket::new(
            options.clone(),
            vec![layer(json!({"id": "a", "source-layer": "s", "layout": {"shape-image": "pin"}}))],
        )
        .unwrap();
        assert!(matches!(icon, ShapeBucket::Icon(_)));

        let quad = ShapeBucket::new(options.clone(), vec![layer(json!({"id": "b", "source-layer": "s"}))]).unwrap();
        assert!(matches!(quad, ShapeBucket::Quad(_)));
        assert_eq!(quad.layer_ids(), ["b"]);

        assert!(matches!(ShapeBucket::new(options, Vec::new()), Err(Error::Config(_))));
    }

    #[test]
    fn half_marker_only_for_numeric_one_or_two() {
        let half = |v: serde_json::Value| HalfMarker::from_properties(json!({"segment": v}).as_object().unwrap());

        assert_eq!(half(json!(1)), Some(HalfMarker::First));
        assert_eq!(half(json!(2.0)), Some(HalfMarker::Second));
        assert_eq!(half(json!(3)), None);
        assert_eq!(half(json!("1")), None);
        assert_eq!(half(json!(true)), None);
        assert_eq!(HalfMarker::from_properties(&Properties::new()), None);
    }

    #[test]
    fn full_lifecycle_through_the_enum() {
        let mut bucket = ShapeBucket::new(
            BucketOptions::new(3, 14.0),
            vec![layer(json!({"id": "a", "source-layer": "s", "layout": {"shape-image": "{kind}"}}))],
        )
        .unwrap();

        let features = vec![
            TileFeature::point(10, 10, json!({"kind": "pin"}).as_object().cloned().unwrap()),
            TileFeature::point(20, 20, json!({"kind": "flag"}).as_object().cloned().unwrap()),
        ];

        let mut index = FeatureIndex::new();
        let needed = bucket.populate(&features, &mut index);
        assert_eq!(needed.into_iter().collect::<Vec<_>>(), ["flag", "pin"]);
        assert_eq!(index.len(), 2);

        let mut sprites = HashMap::new();
        sprites.insert(
            "pin".to_string(),
            SpriteImage {
                rect: crate::atlas::AtlasRect { x: 0, y: 0, w: 8, h: 8 },
                pixel_ratio: 1.0,
                sdf: false,
            },
        );

        bucket.prepare(&sprites);
        bucket.place();

        assert!(!bucket.is_empty());
        assert_eq!(
            bucket.stats(),
            BucketStats {
                emitted_points: 1,
                dropped_points: 0,
                unresolved_features: 1
            }
        );

        let buffers = bucket.finish();
        assert_eq!(buffers.vertex_count(), 4);
        assert_eq!(buffers.vertex_bytes().len(), 4 * 12);
        assert_eq!(buffers.index_bytes().len(), 2 * 6);
        assert!(!buffers.icons_need_linear());
    }
}
