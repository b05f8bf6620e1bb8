use super::{emit_marker, Bucket, BucketState, BucketStats, HalfMarker};
use crate::array_group::ArrayGroup;
use crate::atlas::{IconDependencies, SpriteLookup};
use crate::buffers::{LayoutVertices, ShapeBuffers};
use crate::collector::RetainedFeature;
use crate::config::BucketOptions;
use crate::error::Result;
use crate::feature_index::FeatureIndex;
use crate::geometry::VectorTileFeature;
use crate::shaping::{icon_quad, shape_icon, PositionedIcon};
use crate::style::ShapeLayer;
use crate::vertex::IconVertex;
use crate::Properties;
use log::debug;
use std::sync::Arc;

/// Draws each point as a textured quad cut from the sprite atlas.
#[derive(Debug)]
pub struct IconBucket {
    pub(super) state: BucketState,
    arrays: ArrayGroup<IconVertex>,
    icons_need_linear: bool,
}

impl IconBucket {
    pub fn new(options: BucketOptions, layers: Vec<Arc<ShapeLayer>>) -> Result<Self> {
        let state = BucketState::new(options, layers)?;
        let arrays = state.array_group();

        Ok(Self {
            state,
            arrays,
            icons_need_linear: false,
        })
    }

    pub fn features(&self) -> &[RetainedFeature] {
        &self.state.features
    }

    pub fn stats(&self) -> BucketStats {
        self.state.stats
    }

    pub fn icons_need_linear(&self) -> bool {
        self.icons_need_linear
    }

    pub fn finish(self) -> ShapeBuffers {
        ShapeBuffers::from_parts(
            LayoutVertices::Icon(self.arrays.layout_vertices),
            self.arrays.triangles,
            self.arrays.segments.into_vec(),
            self.arrays.paint,
            self.icons_need_linear,
        )
    }

    /// Rotated icons are resampled, so nearest filtering would alias.
    fn rotation_needs_linear(&self) -> bool {
        let layer = self.state.layer();
        !layer.layout.icon_rotate.is_feature_constant()
            || layer.icon_rotate(&self.state.globals, &Properties::new()) != 0.0
    }

    fn add_feature(
        arrays: &mut ArrayGroup<IconVertex>,
        state: &mut BucketState,
        feature_index: usize,
        shaped: &PositionedIcon,
    ) {
        let feature = &state.features[feature_index];
        let layer = &state.layers[0];

        let rotate = layer.icon_rotate(&state.globals, &feature.properties);
        let quad = icon_quad(shaped, rotate);
        let offsets = quad.corners();
        let tex = quad.tex_corners();
        let half = HalfMarker::from_properties(&feature.properties);

        for point in feature.geometry.iter().flatten().copied() {
            if !state.options.extent.contains(point) {
                state.stats.dropped_points += 1;
                continue;
            }

            let corner = |i: usize| IconVertex::new(point, offsets[i], tex[i]);
            emit_marker(arrays, half, [corner(0), corner(1), corner(2), corner(3)]);
            state.stats.emitted_points += 1;
        }

        arrays.populate_paint_arrays(&state.layers, &state.globals, &feature.properties);
    }
}

impl Bucket for IconBucket {
    fn populate<F: VectorTileFeature>(
        &mut self,
        features: &[F],
        feature_index: &mut FeatureIndex,
    ) -> IconDependencies {
        self.state.populate(features, feature_index)
    }

    fn prepare(&mut self, icons: &dyn SpriteLookup) {
        self.arrays.clear();
        self.state.stats = BucketStats::default();
        self.icons_need_linear = false;

        let rotation_needs_linear = self.rotation_needs_linear();

        for i in 0..self.state.features.len() {
            let Some(name) = self.state.features[i].icon.as_deref() else {
                continue;
            };

            let Some(image) = icons.lookup(name) else {
                self.state.stats.unresolved_features += 1;
                continue;
            };

            if image.pixel_ratio != 1.0 || rotation_needs_linear {
                self.icons_need_linear = true;
            }

            let shaped = shape_icon(image, &self.state.layer().layout);
            Self::add_feature(&mut self.arrays, &mut self.state, i, &shaped);
        }

        debug!(
            "bucket {} ({}): {} points, {} dropped, {} unresolved features, {} vertices in {} segments",
            self.state.options.index,
            self.state.layer().id,
            self.state.stats.emitted_points,
            self.state.stats.dropped_points,
            self.state.stats.unresolved_features,
            self.arrays.layout_vertices.len(),
            self.arrays.segments.len()
        );
    }

    fn is_empty(&self) -> bool {
        self.arrays.triangles.is_empty()
    }
}
