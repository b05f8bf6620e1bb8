//! The slice of the style a shape bucket needs: filter, layout and paint of `shape` layers.

pub mod filter;
pub mod function;
mod layer;

pub use self::filter::Filter;
pub use self::function::{GlobalProperties, PropertyValue, StyleValue};
pub use self::layer::{
    group_layers, parse_style, LayoutProperties, PaintProperties, PaintProperty, ShapeLayer,
};
