//! Tile-local feature geometry and the raw feature interface consumed by `populate`.

use crate::Properties;
use glam::IVec2;
use serde::Deserialize;

/// An ordered run of tile-local points.
pub type Ring = Vec<IVec2>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
}

impl GeometryType {
    pub fn as_str(self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
        }
    }
}

/// A feature as delivered by the tile decoder.
pub trait VectorTileFeature {
    fn id(&self) -> Option<u64>;

    fn geometry_type(&self) -> GeometryType;

    fn properties(&self) -> &Properties;

    /// Decode the geometry into rings of tile-local points.
    ///
    /// Malformed geometry yields zero rings.
    fn load_geometry(&self) -> Vec<Ring>;
}

/// A decoded tile feature, as stored in tile JSON files.
///
/// `geometry` holds rings of `[x, y]` pairs in tile-local units. Values are
/// read as `i64` so that out-of-range input is detected instead of wrapping.
#[derive(Debug, Clone, Deserialize)]
pub struct TileFeature {
    #[serde(default)]
    pub id: Option<u64>,

    #[serde(rename = "type")]
    pub geometry_type: GeometryType,

    #[serde(default)]
    pub geometry: Vec<Vec<[i64; 2]>>,

    #[serde(default)]
    pub properties: Properties,
}

impl TileFeature {
    pub fn point(x: i32, y: i32, properties: Properties) -> Self {
        Self {
            id: None,
            geometry_type: GeometryType::Point,
            geometry: vec![vec![[x as i64, y as i64]]],
            properties,
        }
    }
}

impl VectorTileFeature for TileFeature {
    fn id(&self) -> Option<u64> {
        self.id
    }

    fn geometry_type(&self) -> GeometryType {
        self.geometry_type
    }

    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn load_geometry(&self) -> Vec<Ring> {
        let mut rings = Vec::with_capacity(self.geometry.len());

        for ring in &self.geometry {
            let mut points = Ring::with_capacity(ring.len());

            for &[x, y] in ring {
                match (i32::try_from(x), i32::try_from(y)) {
                    (Ok(x), Ok(y)) => points.push(IVec2::new(x, y)),
                    _ => return Vec::new(),
                }
            }

            rings.push(points);
        }

        rings
    }
}

/// Axis-aligned bounds `(min, max)` over every point of every ring.
pub fn bounding_box(rings: &[Ring]) -> Option<(IVec2, IVec2)> {
    let mut points = rings.iter().flatten();
    let first = *points.next()?;

    Some(points.fold((first, first), |(min, max), &p| (min.min(p), max.max(p))))
}
