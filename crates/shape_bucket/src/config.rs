use crate::error::{Error, Result};
use glam::IVec2;

/// Default tile-local resolution per axis.
pub const DEFAULT_EXTENT: u32 = 8192;

/// Logical tile size in CSS pixels at overscaling 1.
pub const TILE_SIZE: u32 = 512;

/// Tile-local coordinate range `[0, extent)` on both axes.
///
/// Packed unit-square vertices store `x * 2 + 1`, so the extent is capped at
/// 16384 to keep that inside an `i16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Extent(u32);

impl Extent {
    pub const MAX: u32 = 16384;

    pub fn new(value: u32) -> Result<Self> {
        if !value.is_power_of_two() || value > Self::MAX {
            return Err(Error::Config(format!(
                "extent must be a power of two <= {}, got {}",
                Self::MAX,
                value
            )));
        }

        Ok(Self(value))
    }

    #[inline]
    pub fn get(self) -> u32 {
        self.0
    }

    /// `true` when `point` lies in `[0, extent)` on both axes.
    #[inline]
    pub fn contains(self, point: IVec2) -> bool {
        let extent = self.0 as i64;
        let (x, y) = (point.x as i64, point.y as i64);

        x >= 0 && y >= 0 && x < extent && y < extent
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self(DEFAULT_EXTENT)
    }
}

/// Per-bucket construction parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct BucketOptions {
    /// Position of this bucket among the tile's buckets; recorded in the feature index.
    pub index: u32,
    /// Tile zoom, used to evaluate zoom-dependent style values.
    pub zoom: f32,
    pub overscaling: u32,
    pub extent: Extent,
}

impl BucketOptions {
    pub fn new(index: u32, zoom: f32) -> Self {
        Self {
            index,
            zoom,
            overscaling: 1,
            extent: Extent::default(),
        }
    }

    pub fn with_extent(mut self, extent: Extent) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_overscaling(mut self, overscaling: u32) -> Self {
        self.overscaling = overscaling.max(1);
        self
    }

    /// Tile-local units per logical pixel.
    #[inline]
    pub fn tile_pixel_ratio(&self) -> f32 {
        self.extent.get() as f32 / (TILE_SIZE * self.overscaling.max(1)) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extent_rejects_non_power_of_two() {
        assert!(Extent::new(4096).is_ok());
        assert!(Extent::new(16384).is_ok());
        assert!(Extent::new(5000).is_err());
        assert!(Extent::new(32768).is_err());
        assert!(Extent::new(0).is_err());
    }

    #[test]
    fn extent_is_half_open() {
        let extent = Extent::new(4096).unwrap();

        assert!(extent.contains(IVec2::new(0, 0)));
        assert!(extent.contains(IVec2::new(4095, 4095)));
        assert!(!extent.contains(IVec2::new(4096, 10)));
        assert!(!extent.contains(IVec2::new(10, -1)));
    }

    #[test]
    fn tile_pixel_ratio_accounts_for_overscaling() {
        let options = BucketOptions::new(0, 14.0);
        assert_eq!(options.tile_pixel_ratio(), 16.0);

        let options = options.with_overscaling(2);
        assert_eq!(options.tile_pixel_ratio(), 8.0);
    }
}
