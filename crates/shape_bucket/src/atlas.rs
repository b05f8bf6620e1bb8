//! Sprite atlas metadata, as far as bucket construction needs it.

use crate::error::{Error, Result};
use log::debug;
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Icon names referenced by a bucket's features, reported by `populate`.
pub type IconDependencies = BTreeSet<String>;

/// A pixel rectangle inside the atlas texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasRect {
    pub x: u16,
    pub y: u16,
    pub w: u16,
    pub h: u16,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SpriteImage {
    pub rect: AtlasRect,
    /// Atlas pixels per logical pixel.
    pub pixel_ratio: f32,
    pub sdf: bool,
}

impl SpriteImage {
    /// Logical width in pixels.
    #[inline]
    pub fn width(&self) -> f32 {
        self.rect.w as f32 / self.pixel_ratio
    }

    /// Logical height in pixels.
    #[inline]
    pub fn height(&self) -> f32 {
        self.rect.h as f32 / self.pixel_ratio
    }
}

/// Resolves icon names to atlas metadata.
pub trait SpriteLookup {
    fn lookup(&self, id: &str) -> Option<&SpriteImage>;
}

impl SpriteLookup for HashMap<String, SpriteImage> {
    fn lookup(&self, id: &str) -> Option<&SpriteImage> {
        self.get(id)
    }
}

impl SpriteLookup for BTreeMap<String, SpriteImage> {
    fn lookup(&self, id: &str) -> Option<&SpriteImage> {
        self.get(id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpriteAtlas {
    images: HashMap<String, SpriteImage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SpriteEntry {
    x: u16,
    y: u16,
    width: u16,
    height: u16,
    #[serde(default = "default_pixel_ratio")]
    pixel_ratio: f32,
    #[serde(default)]
    sdf: bool,
}

fn default_pixel_ratio() -> f32 {
    1.0
}

impl SpriteAtlas {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a sprite index: `{"name": {"x", "y", "width", "height", "pixelRatio", "sdf"}}`.
    pub fn from_sprite_json(json: &str) -> Result<Self> {
        let entries: HashMap<String, SpriteEntry> = serde_json::from_str(json)?;
        let mut atlas = SpriteAtlas::new();

        for (name, entry) in entries {
            if entry.pixel_ratio <= 0.0 {
                return Err(Error::Sprite(format!("{:?}: pixelRatio must be > 0", name)));
            }

            atlas.insert(
                name,
                SpriteImage {
                    rect: AtlasRect {
                        x: entry.x,
                        y: entry.y,
                        w: entry.width,
                        h: entry.height,
                    },
                    pixel_ratio: entry.pixel_ratio,
                    sdf: entry.sdf,
                },
            );
        }

        Ok(atlas)
    }

    pub fn insert(&mut self, name: impl Into<String>, image: SpriteImage) {
        self.images.insert(name.into(), image);
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    /// Answer an icon request: the subset of images a bucket asked for.
    ///
    /// Names missing from the atlas are left out; features using them are
    /// dropped from geometry emission.
    pub fn resolve(&self, request: &IconDependencies) -> BTreeMap<String, SpriteImage> {
        let mut resolved = BTreeMap::new();

        for name in request {
            match self.images.get(name) {
                Some(image) => {
                    resolved.insert(name.clone(), image.clone());
                }
                None => debug!("icon {:?} is not in the sprite atlas", name),
            }
        }

        resolved
    }
}

impl SpriteLookup for SpriteAtlas {
    fn lookup(&self, id: &str) -> Option<&SpriteImage> {
        self.images.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SPRITE: &str = r#"{
        "cafe-15": {"x": 0, "y": 0, "width": 40, "height": 40, "pixelRatio": 2},
        "pin": {"x": 40, "y": 0, "width": 20, "height": 30}
    }"#;

    #[test]
    fn parses_sprite_index() {
        let atlas = SpriteAtlas::from_sprite_json(SPRITE).unwrap();
        assert_eq!(atlas.len(), 2);

        let cafe = atlas.lookup("cafe-15").unwrap();
        assert_eq!(cafe.width(), 20.0);
        assert_eq!(cafe.pixel_ratio, 2.0);

        let pin = atlas.lookup("pin").unwrap();
        assert_eq!(pin.rect, AtlasRect { x: 40, y: 0, w: 20, h: 30 });
        assert_eq!(pin.height(), 30.0);
        assert!(!pin.sdf);
    }

    #[test]
    fn rejects_zero_pixel_ratio() {
        let json = r#"{"bad": {"x": 0, "y": 0, "width": 1, "height": 1, "pixelRatio": 0}}"#;
        assert!(SpriteAtlas::from_sprite_json(json).is_err());
    }

    #[test]
    fn resolve_returns_only_requested_and_known_icons() {
        let atlas = SpriteAtlas::from_sprite_json(SPRITE).unwrap();
        let request: IconDependencies = ["pin", "unknown"].iter().map(|s| s.to_string()).collect();

        let resolved = atlas.resolve(&request);
        assert_eq!(resolved.len(), 1);
        assert!(resolved.lookup("pin").is_some());
        assert!(resolved.lookup("cafe-15").is_none());
    }
}
