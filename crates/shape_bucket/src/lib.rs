//! Shape buckets: GPU-ready billboard geometry for point markers in vector tiles.
//!
//! A bucket is built once per (tile, layer group) in three phases:
//!
//! 1. `populate`: filter the raw tile features, keep their geometry and
//!    properties, index them for hit testing and report the icons they need.
//! 2. `prepare`: once the sprite atlas has resolved those icons, shape every
//!    feature and emit one screen-facing quad per in-extent point.
//! 3. `finish`: hand the immutable [`ShapeBuffers`] to the draw layer.
//!
//! Layout vertex records (little-endian, tightly packed):
//!
//!   icon variant, 12 bytes:
//!     i16[2]  a_pos          anchor, tile-local units
//!     i16[2]  a_offset       corner extrusion, 1/64 px
//!     u16[2]  a_texture_pos  atlas texel / 4
//!
//!   unit-square variant, 8 bytes:
//!     i16[2]  a_pos          anchor, tile-local units
//!     i16[2]  a_extrude      anchor * 2 + (extrude + 1) / 2
//!
//! Indices are u16 triangles relative to the owning segment's vertex offset.

pub mod atlas;
pub mod bucket;
pub mod buffers;
pub mod collector;
pub mod color;
pub mod config;
pub mod error;
pub mod feature_index;
pub mod geometry;
pub mod paint;
pub mod segment;
pub mod shaping;
pub mod style;
pub mod token;
pub mod transfer;
pub mod vertex;

mod array_group;

/// Feature properties as decoded from the tile.
pub type Properties = serde_json::Map<String, serde_json::Value>;

pub use crate::atlas::{IconDependencies, SpriteAtlas, SpriteImage, SpriteLookup};
pub use crate::bucket::{Bucket, BucketStats, IconBucket, QuadBucket, ShapeBucket};
pub use crate::buffers::{LayoutVertices, ShapeBuffers};
pub use crate::config::{BucketOptions, Extent};
pub use crate::error::{Error, Result};
pub use crate::feature_index::FeatureIndex;
pub use crate::geometry::{GeometryType, Ring, TileFeature, VectorTileFeature};
pub use crate::segment::Segment;
pub use crate::style::{group_layers, parse_style, GlobalProperties, ShapeLayer};
