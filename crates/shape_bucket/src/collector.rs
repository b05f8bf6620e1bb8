//! First bucket phase: filter the raw feature stream and retain what survives.

use crate::atlas::IconDependencies;
use crate::feature_index::FeatureIndex;
use crate::geometry::{Ring, VectorTileFeature};
use crate::style::ShapeLayer;
use crate::token::resolve_icon;
use crate::Properties;
use log::trace;

/// A feature kept by a bucket, in tile stream order.
#[derive(Debug, Clone, PartialEq)]
pub struct RetainedFeature {
    pub source_index: u32,
    pub icon: Option<String>,
    pub geometry: Vec<Ring>,
    pub properties: Properties,
}

#[derive(Debug, Default)]
pub struct Collected {
    pub features: Vec<RetainedFeature>,
    pub icons: IconDependencies,
}

/// Run `layer`'s filter over `features`. Accepted features get their icon name
/// resolved (when the layer names one), their geometry decoded and an entry in
/// `feature_index` under `bucket_index`.
pub fn collect<F: VectorTileFeature>(
    layer: &ShapeLayer,
    features: &[F],
    feature_index: &mut FeatureIndex,
    bucket_index: u32,
) -> Collected {
    let mut collected = Collected::default();

    for (source_index, feature) in features.iter().enumerate() {
        if !layer.accepts(feature) {
            continue;
        }

        let icon = layer
            .layout
            .icon_image
            .as_deref()
            .and_then(|template| resolve_icon(feature.properties(), template));

        let geometry = feature.load_geometry();
        let source_index = source_index as u32;
        feature_index.insert(&geometry, source_index, bucket_index);

        if let Some(icon) = &icon {
            collected.icons.insert(icon.clone());
        }

        collected.features.push(RetainedFeature {
            source_index,
            icon,
            geometry,
            properties: feature.properties().clone(),
        });
    }

    trace!(
        "layer {:?}: kept {} of {} features, {} icons",
        layer.id,
        collected.features.len(),
        features.len(),
        collected.icons.len()
    );

    collected
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TileFeature;
    use serde_json::json;

    fn props(value: serde_json::Value) -> Properties {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn filters_resolves_and_indexes() {
        let layer = ShapeLayer::from_json(&json!({
            "id": "pins",
            "source-layer": "poi",
            "filter": ["==", "kind", "shop"],
            "layout": {"shape-image": "{brand}-pin"}
        }))
        .unwrap();

        let features = vec![
            TileFeature::point(10, 10, props(json!({"kind": "shop", "brand": "acme"}))),
            TileFeature::point(20, 20, props(json!({"kind": "park"}))),
            TileFeature::point(30, 30, props(json!({"kind": "shop"}))),
        ];

        let mut index = FeatureIndex::new();
        let collected = collect(&layer, &features, &mut index, 7);

        assert_eq!(collected.features.len(), 2);
        assert_eq!(collected.features[0].icon.as_deref(), Some("acme-pin"));
        assert_eq!(collected.features[1].icon.as_deref(), Some("-pin"));
        assert_eq!(collected.features[1].source_index, 2);
        assert_eq!(
            collected.icons.iter().map(String::as_str).collect::<Vec<_>>(),
            ["-pin", "acme-pin"]
        );

        assert_eq!(index.len(), 2);
        let hit = index.query_point(glam::IVec2::new(30, 30), 0);
        assert_eq!(hit.len(), 1);
        assert_eq!((hit[0].source_index, hit[0].bucket_index), (2, 7));
    }

    #[test]
    fn layers_without_image_resolve_no_icons() {
        let layer = ShapeLayer::from_json(&json!({"id": "dots", "source-layer": "poi"})).unwrap();
        let features = vec![TileFeature::point(1, 2, Properties::new())];

        let collected = collect(&layer, &features, &mut FeatureIndex::new(), 0);

        assert_eq!(collected.features[0].icon, None);
        assert!(collected.icons.is_empty());
    }
}
