//! Per-layer paint attributes: layer-wide constants or one quantized value per vertex.

use crate::style::{GlobalProperties, PaintProperty, ShapeLayer};
use crate::Properties;
use smallvec::SmallVec;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AttributeType {
    Uint8 = 1,
    Uint16 = 2,
}

/// How one paint property is bound as a vertex attribute.
#[derive(Debug, PartialEq)]
pub struct PaintAttribute {
    pub name: &'static str,
    pub property: PaintProperty,
    pub components: usize,
    pub ty: AttributeType,
    /// Applied before rounding into the attribute type.
    pub multiplier: f32,
}

pub static SHAPE_PAINT_ATTRIBUTES: [PaintAttribute; 4] = [
    PaintAttribute {
        name: "a_color",
        property: PaintProperty::Color,
        components: 4,
        ty: AttributeType::Uint8,
        multiplier: 255.0,
    },
    PaintAttribute {
        name: "a_scale",
        property: PaintProperty::Scale,
        components: 1,
        ty: AttributeType::Uint16,
        multiplier: 10.0,
    },
    PaintAttribute {
        name: "a_blur",
        property: PaintProperty::Blur,
        components: 1,
        ty: AttributeType::Uint16,
        multiplier: 10.0,
    },
    PaintAttribute {
        name: "a_opacity",
        property: PaintProperty::Opacity,
        components: 1,
        ty: AttributeType::Uint16,
        multiplier: 255.0,
    },
];

impl PaintAttribute {
    pub fn by_name(name: &str) -> Option<&'static PaintAttribute> {
        SHAPE_PAINT_ATTRIBUTES.iter().find(|a| a.name == name)
    }

    pub fn quantize(&self, value: f32) -> u16 {
        let max = match self.ty {
            AttributeType::Uint8 => u8::MAX as f32,
            AttributeType::Uint16 => u16::MAX as f32,
        };

        (value * self.multiplier).round().clamp(0.0, max) as u16
    }
}

/// Flattened per-vertex components.
#[derive(Debug, Clone, PartialEq)]
pub enum AttributeValues {
    Uint8(Vec<u8>),
    Uint16(Vec<u16>),
}

impl AttributeValues {
    pub fn new(ty: AttributeType) -> Self {
        match ty {
            AttributeType::Uint8 => AttributeValues::Uint8(Vec::new()),
            AttributeType::Uint16 => AttributeValues::Uint16(Vec::new()),
        }
    }

    #[inline]
    fn push(&mut self, quantized: u16) {
        match self {
            AttributeValues::Uint8(values) => values.push(quantized as u8),
            AttributeValues::Uint16(values) => values.push(quantized),
        }
    }

    /// Number of components stored (vertices × components per vertex).
    pub fn len(&self) -> usize {
        match self {
            AttributeValues::Uint8(values) => values.len(),
            AttributeValues::Uint16(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            AttributeValues::Uint8(values) => values.as_slice(),
            AttributeValues::Uint16(values) => bytemuck::cast_slice(values),
        }
    }

    fn clear(&mut self) {
        match self {
            AttributeValues::Uint8(values) => values.clear(),
            AttributeValues::Uint16(values) => values.clear(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AttributeData {
    /// Same for every feature: bound as a uniform, unquantized.
    Constant(SmallVec<[f32; 4]>),
    PerVertex(AttributeValues),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PaintBinding {
    pub attribute: &'static PaintAttribute,
    pub data: AttributeData,
}

impl PaintBinding {
    /// Vertices covered by a per-vertex binding; `None` for constants.
    pub fn vertex_len(&self) -> Option<usize> {
        match &self.data {
            AttributeData::Constant(_) => None,
            AttributeData::PerVertex(values) => Some(values.len() / self.attribute.components),
        }
    }
}

/// Paint attribute data of one style layer sharing a bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintArrays {
    layer_id: String,
    bindings: Vec<PaintBinding>,
    vertex_len: usize,
}

impl PaintArrays {
    pub fn new(layer: &ShapeLayer, globals: &GlobalProperties) -> Self {
        let empty = Properties::new();
        let bindings = SHAPE_PAINT_ATTRIBUTES
            .iter()
            .map(|attribute| {
                let data = if layer.is_paint_feature_constant(attribute.property) {
                    AttributeData::Constant(layer.paint_value(attribute.property, globals, &empty))
                } else {
                    AttributeData::PerVertex(AttributeValues::new(attribute.ty))
                };

                PaintBinding { attribute, data }
            })
            .collect();

        Self {
            layer_id: layer.id.clone(),
            bindings,
            vertex_len: 0,
        }
    }

    pub(crate) fn from_parts(layer_id: String, bindings: Vec<PaintBinding>, vertex_len: usize) -> Self {
        Self {
            layer_id,
            bindings,
            vertex_len,
        }
    }

    /// Evaluate the feature's paint values once and copy them to every vertex
    /// appended since the previous call, so that the arrays reach `vertex_len`.
    pub fn populate(
        &mut self,
        layer: &ShapeLayer,
        globals: &GlobalProperties,
        properties: &Properties,
        vertex_len: usize,
    ) {
        let count = vertex_len.saturating_sub(self.vertex_len);

        if count > 0 {
            for binding in &mut self.bindings {
                let AttributeData::PerVertex(values) = &mut binding.data else {
                    continue;
                };

                let attribute = binding.attribute;
                let value = layer.paint_value(attribute.property, globals, properties);
                let quantized: SmallVec<[u16; 4]> = (0..attribute.components)
                    .map(|c| attribute.quantize(value.get(c).copied().unwrap_or(0.0)))
                    .collect();

                for _ in 0..count {
                    for &component in &quantized {
                        values.push(component);
                    }
                }
            }
        }

        self.vertex_len = self.vertex_len.max(vertex_len);
    }

    pub fn layer_id(&self) -> &str {
        &self.layer_id
    }

    pub fn bindings(&self) -> &[PaintBinding] {
        &self.bindings
    }

    pub fn get(&self, name: &str) -> Option<&AttributeData> {
        self.bindings
            .iter()
            .find(|b| b.attribute.name == name)
            .map(|b| &b.data)
    }

    pub fn vertex_len(&self) -> usize {
        self.vertex_len
    }

    pub fn clear(&mut self) {
        for binding in &mut self.bindings {
            if let AttributeData::PerVertex(values) = &mut binding.data {
                values.clear();
            }
        }

        self.vertex_len = 0;
    }
}
