use super::{emit_marker, Bucket, BucketState, BucketStats, HalfMarker};
use crate::array_group::ArrayGroup;
use crate::atlas::{IconDependencies, SpriteLookup};
use crate::buffers::{LayoutVertices, ShapeBuffers};
use crate::collector::RetainedFeature;
use crate::config::BucketOptions;
use crate::error::Result;
use crate::feature_index::FeatureIndex;
use crate::geometry::VectorTileFeature;
use crate::shaping::UNIT_QUAD;
use crate::style::ShapeLayer;
use crate::vertex::QuadVertex;
use log::debug;
use std::sync::Arc;

/// Draws each point as an untextured unit square; the shader sizes it from
/// `shape-scale`.
#[derive(Debug)]
pub struct QuadBucket {
    pub(super) state: BucketState,
    arrays: ArrayGroup<QuadVertex>,
}

impl QuadBucket {
    pub fn new(options: BucketOptions, layers: Vec<Arc<ShapeLayer>>) -> Result<Self> {
        let state = BucketState::new(options, layers)?;
        let arrays = state.array_group();

        Ok(Self { state, arrays })
    }

    pub fn features(&self) -> &[RetainedFeature] {
        &self.state.features
    }

    pub fn stats(&self) -> BucketStats {
        self.state.stats
    }

    pub fn finish(self) -> ShapeBuffers {
        ShapeBuffers::from_parts(
            LayoutVertices::Quad(self.arrays.layout_vertices),
            self.arrays.triangles,
            self.arrays.segments.into_vec(),
            self.arrays.paint,
            false,
        )
    }
}

impl Bucket for QuadBucket {
    fn populate<F: VectorTileFeature>(
        &mut self,
        features: &[F],
        feature_index: &mut FeatureIndex,
    ) -> IconDependencies {
        self.state.populate(features, feature_index)
    }

    /// Needs no atlas; `icons` is ignored.
    fn prepare(&mut self, _icons: &dyn SpriteLookup) {
        self.arrays.clear();
        self.state.stats = BucketStats::default();

        let state = &mut self.state;

        for feature in &state.features {
            let half = HalfMarker::from_properties(&feature.properties);

            for point in feature.geometry.iter().flatten().copied() {
                if !state.options.extent.contains(point) {
                    state.stats.dropped_points += 1;
                    continue;
                }

                let corner = |i: usize| QuadVertex::new(point, UNIT_QUAD[i]);
                emit_marker(&mut self.arrays, half, [corner(0), corner(1), corner(2), corner(3)]);
                state.stats.emitted_points += 1;
            }

            self.arrays
                .populate_paint_arrays(&state.layers, &state.globals, &feature.properties);
        }

        debug!(
            "bucket {} ({}): {} squares, {} dropped points",
            state.options.index,
            state.layers[0].id,
            state.stats.emitted_points,
            state.stats.dropped_points
        );
    }

    fn is_empty(&self) -> bool {
        self.arrays.triangles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::SpriteImage;
    use crate::geometry::{GeometryType, TileFeature};
    use crate::vertex::Triangle;
    use crate::Properties;
    use glam::IVec2;
    use serde_json::json;
    use std::collections::HashMap;

    fn bucket(features: &[TileFeature]) -> QuadBucket {
        let layer = ShapeLayer::from_json(&json!({
            "id": "dots",
            "source-layer": "poi",
            "paint": {"shape-scale": {"property": "size", "type": "identity"}}
        }))
        .unwrap();

        let mut bucket = QuadBucket::new(BucketOptions::new(0, 12.0), vec![Arc::new(layer)]).unwrap();
        let icons = bucket.populate(features, &mut FeatureIndex::new());
        assert!(icons.is_empty());

        bucket.prepare(&HashMap::<String, SpriteImage>::new());
        bucket
    }

    #[test]
    fn unit_squares_pack_their_extrusion() {
        let buffers = bucket(&[TileFeature::point(7, 9, json!({"size": 1.5}).as_object().cloned().unwrap())]).finish();

        let LayoutVertices::Quad(vertices) = buffers.layout_vertices() else {
            panic!("expected unit-square vertices");
        };

        assert_eq!(vertices.len(), 4);
        assert_eq!(vertices[0].extrude, [14, 18]);
        assert_eq!(vertices[3].extrude, [15, 19]);

        let extrusions: Vec<IVec2> = vertices.iter().map(QuadVertex::unit_extrude).collect();
        assert_eq!(extrusions, UNIT_QUAD);

        assert_eq!(buffers.triangles(), [Triangle([0, 1, 2]), Triangle([1, 2, 3])]);
        assert_eq!(buffers.layout_vertices().stride(), 8);
        assert!(!buffers.layout_vertices().has_texture());
        assert!(!buffers.icons_need_linear());

        let scale = buffers.paint("dots").unwrap().get("a_scale").unwrap();
        assert!(matches!(
            scale,
            crate::paint::AttributeData::PerVertex(crate::paint::AttributeValues::Uint16(v)) if v == &[15; 4]
        ));
    }

    #[test]
    fn features_without_icons_still_draw() {
        let feature = TileFeature {
            id: Some(1),
            geometry_type: GeometryType::Point,
            geometry: vec![vec![[1, 1], [-5, 3]], vec![[2, 2]]],
            properties: json!({"segment": 2}).as_object().cloned().unwrap(),
        };
        let bucket = bucket(&[feature, TileFeature::point(3, 3, Properties::new())]);

        assert_eq!(bucket.stats().emitted_points, 3);
        assert_eq!(bucket.stats().dropped_points, 1);
        assert_eq!(bucket.features().len(), 2);

        let buffers = bucket.finish();
        assert_eq!(buffers.vertex_count(), 3 + 3 + 4);
        assert_eq!(buffers.triangle_count(), 4);
        assert_eq!(buffers.triangles()[1], Triangle([3, 4, 5]));
    }
}
