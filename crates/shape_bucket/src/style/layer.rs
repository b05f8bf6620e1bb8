use super::filter::Filter;
use super::function::{GlobalProperties, PropertyValue};
use crate::color::Color;
use crate::error::{Error, Result};
use crate::geometry::VectorTileFeature;
use crate::Properties;
use log::{debug, warn};
use serde::Deserialize;
use serde_json::{Map, Value};
use smallvec::{smallvec, SmallVec};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct LayoutProperties {
    /// Token template naming the sprite icon, e.g. `"{kind}-15"`.
    pub icon_image: Option<String>,
    pub icon_size: f32,
    /// Pixel offset of the icon center, in multiples of `icon_size`.
    pub icon_offset: [f32; 2],
    /// Clockwise rotation in degrees.
    pub icon_rotate: PropertyValue<f32>,
}

impl Default for LayoutProperties {
    fn default() -> Self {
        Self {
            icon_image: None,
            icon_size: 1.0,
            icon_offset: [0.0, 0.0],
            icon_rotate: PropertyValue::Constant(0.0),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaintProperties {
    pub color: PropertyValue<Color>,
    pub scale: PropertyValue<f32>,
    pub blur: PropertyValue<f32>,
    pub opacity: PropertyValue<f32>,
}

impl Default for PaintProperties {
    fn default() -> Self {
        Self {
            color: PropertyValue::Constant(Color::BLACK),
            scale: PropertyValue::Constant(1.0),
            blur: PropertyValue::Constant(0.0),
            opacity: PropertyValue::Constant(1.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PaintProperty {
    Color,
    Scale,
    Blur,
    Opacity,
}

impl PaintProperty {
    pub fn name(self) -> &'static str {
        match self {
            PaintProperty::Color => "shape-color",
            PaintProperty::Scale => "shape-scale",
            PaintProperty::Blur => "shape-blur",
            PaintProperty::Opacity => "shape-opacity",
        }
    }
}

/// A `shape` style layer.
#[derive(Debug, Clone)]
pub struct ShapeLayer {
    pub id: String,
    pub source_layer: String,
    pub filter: Option<Filter>,
    pub layout: LayoutProperties,
    pub paint: PaintProperties,
    /// Layers with equal keys share source layer, filter and layout, and so one bucket.
    group_key: String,
}

#[derive(Debug, Deserialize)]
struct RawLayer {
    id: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(rename = "source-layer")]
    source_layer: String,
    #[serde(default)]
    filter: Option<Value>,
    #[serde(default)]
    layout: Map<String, Value>,
    #[serde(default)]
    paint: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
struct RawStyle {
    layers: Vec<Value>,
}

impl ShapeLayer {
    pub fn from_json(value: &Value) -> Result<Self> {
        let raw = RawLayer::deserialize(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawLayer) -> Result<Self> {
        let context = |e: Error| Error::Style(format!("layer {:?}: {}", raw.id, e));

        let filter = match &raw.filter {
            Some(value) => Some(Filter::from_json(value).map_err(context)?),
            None => None,
        };

        let mut layout = LayoutProperties::default();
        for (key, value) in &raw.layout {
            match key.as_str() {
                "shape-image" => {
                    let template = value.as_str().ok_or_else(|| {
                        context(Error::Style("shape-image must be a string".into()))
                    })?;
                    layout.icon_image = Some(template.to_string());
                }
                "icon-size" => {
                    layout.icon_size = value
                        .as_f64()
                        .filter(|size| *size >= 0.0)
                        .ok_or_else(|| context(Error::Style("icon-size must be a non-negative number".into())))?
                        as f32;
                }
                "icon-offset" => {
                    layout.icon_offset = <[f32; 2] as super::StyleValue>::from_json(value)
                        .ok_or_else(|| context(Error::Style("icon-offset must be [x, y]".into())))?;
                }
                "icon-rotate" => layout.icon_rotate = PropertyValue::from_json(value).map_err(context)?,
                other => warn!("layer {:?}: ignoring unknown layout property {:?}", raw.id, other),
            }
        }

        let mut paint = PaintProperties::default();
        for (key, value) in &raw.paint {
            match key.as_str() {
                "shape-color" => paint.color = PropertyValue::from_json(value).map_err(context)?,
                "shape-scale" => paint.scale = PropertyValue::from_json(value).map_err(context)?,
                "shape-blur" => paint.blur = PropertyValue::from_json(value).map_err(context)?,
                "shape-opacity" => paint.opacity = PropertyValue::from_json(value).map_err(context)?,
                other => warn!("layer {:?}: ignoring unknown paint property {:?}", raw.id, other),
            }
        }

        let group_key = serde_json::to_string(&(&raw.source_layer, &raw.filter, &raw.layout))?;

        Ok(Self {
            id: raw.id,
            source_layer: raw.source_layer,
            filter,
            layout,
            paint,
            group_key,
        })
    }

    /// The layer filter; layers without one accept every feature.
    pub fn accepts<F: VectorTileFeature + ?Sized>(&self, feature: &F) -> bool {
        self.filter.as_ref().map_or(true, |f| f.evaluate(feature))
    }

    pub fn is_paint_feature_constant(&self, property: PaintProperty) -> bool {
        match property {
            PaintProperty::Color => self.paint.color.is_feature_constant(),
            PaintProperty::Scale => self.paint.scale.is_feature_constant(),
            PaintProperty::Blur => self.paint.blur.is_feature_constant(),
            PaintProperty::Opacity => self.paint.opacity.is_feature_constant(),
        }
    }

    /// Evaluate a paint property as attribute components (4 for color, 1 otherwise).
    pub fn paint_value(
        &self,
        property: PaintProperty,
        globals: &GlobalProperties,
        properties: &Properties,
    ) -> SmallVec<[f32; 4]> {
        match property {
            PaintProperty::Color => {
                SmallVec::from_buf(self.paint.color.evaluate(globals, properties, &Color::BLACK).to_array())
            }
            PaintProperty::Scale => smallvec![self.paint.scale.evaluate(globals, properties, &1.0)],
            PaintProperty::Blur => smallvec![self.paint.blur.evaluate(globals, properties, &0.0)],
            PaintProperty::Opacity => smallvec![self.paint.opacity.evaluate(globals, properties, &1.0)],
        }
    }

    pub fn icon_rotate(&self, globals: &GlobalProperties, properties: &Properties) -> f32 {
        self.layout.icon_rotate.evaluate(globals, properties, &0.0)
    }

    pub fn group_key(&self) -> &str {
        &self.group_key
    }
}

/// Parse the `shape` layers of a style document; other layer types are skipped.
pub fn parse_style(json: &str) -> Result<Vec<ShapeLayer>> {
    let style: RawStyle = serde_json::from_str(json)?;
    let mut layers = Vec::with_capacity(style.layers.len());

    for value in &style.layers {
        let raw = RawLayer::deserialize(value)?;

        match raw.kind.as_deref() {
            None | Some("shape") => layers.push(ShapeLayer::from_raw(raw)?),
            Some(other) => debug!("skipping layer {:?} of type {:?}", raw.id, other),
        }
    }

    Ok(layers)
}

/// Group layers that can share one bucket, keeping first-appearance order.
pub fn group_layers(layers: Vec<ShapeLayer>) -> Vec<Vec<Arc<ShapeLayer>>> {
    let mut groups: Vec<Vec<Arc<ShapeLayer>>> = Vec::new();

    for layer in layers {
        match groups.iter_mut().find(|g| g[0].group_key == layer.group_key) {
            Some(group) => group.push(Arc::new(layer)),
            None => groups.push(vec![Arc::new(layer)]),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::TileFeature;
    use serde_json::json;

    const STYLE: &str = r##"{
        "layers": [
            {"id": "bg", "type": "background", "source-layer": "none"},
            {
                "id": "pins",
                "type": "shape",
                "source-layer": "poi",
                "filter": ["==", "kind", "cafe"],
                "layout": {"shape-image": "{kind}-15", "icon-size": 2},
                "paint": {"shape-color": "#ff0000", "shape-opacity": {"property": "o", "type": "identity"}}
            },
            {
                "id": "pins-halo",
                "source-layer": "poi",
                "filter": ["==", "kind", "cafe"],
                "layout": {"shape-image": "{kind}-15", "icon-size": 2},
                "paint": {"shape-blur": 2}
            },
            {"id": "dots", "type": "shape", "source-layer": "poi"}
        ]
    }"##;

    #[test]
    fn parses_shape_layers_only() {
        let layers = parse_style(STYLE).unwrap();
        let ids: Vec<&str> = layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["pins", "pins-halo", "dots"]);

        let pins = &layers[0];
        assert_eq!(pins.layout.icon_image.as_deref(), Some("{kind}-15"));
        assert_eq!(pins.layout.icon_size, 2.0);
        assert!(pins.is_paint_feature_constant(PaintProperty::Color));
        assert!(!pins.is_paint_feature_constant(PaintProperty::Opacity));
    }

    #[test]
    fn groups_layers_sharing_layout_and_filter() {
        let groups = group_layers(parse_style(STYLE).unwrap());

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 2);
        assert_eq!(groups[1][0].id, "dots");
    }

    #[test]
    fn paint_values_fall_back_to_defaults() {
        let layer = ShapeLayer::from_json(&json!({"id": "a", "source-layer": "s"})).unwrap();
        let globals = GlobalProperties { zoom: 12.0 };
        let props = Properties::new();

        assert_eq!(layer.paint_value(PaintProperty::Color, &globals, &props).as_slice(), &[0.0, 0.0, 0.0, 1.0]);
        assert_eq!(layer.paint_value(PaintProperty::Scale, &globals, &props).as_slice(), &[1.0]);
        assert_eq!(layer.paint_value(PaintProperty::Blur, &globals, &props).as_slice(), &[0.0]);
        assert_eq!(layer.icon_rotate(&globals, &props), 0.0);
    }

    #[test]
    fn filter_is_applied() {
        let layers = parse_style(STYLE).unwrap();
        let cafe = TileFeature::point(1, 1, json!({"kind": "cafe"}).as_object().cloned().unwrap());
        let bar = TileFeature::point(1, 1, json!({"kind": "bar"}).as_object().cloned().unwrap());

        assert!(layers[0].accepts(&cafe));
        assert!(!layers[0].accepts(&bar));
        assert!(layers[2].accepts(&bar));
    }

    #[test]
    fn invalid_values_name_the_layer() {
        let err = ShapeLayer::from_json(&json!({
            "id": "broken",
            "source-layer": "s",
            "paint": {"shape-color": "not-a-color"}
        }))
        .unwrap_err();

        assert!(err.to_string().contains("broken"));
    }
}
