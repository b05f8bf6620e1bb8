//! Icon shaping and quad corner geometry.

use crate::atlas::{AtlasRect, SpriteImage};
use crate::style::LayoutProperties;
use glam::{IVec2, Mat2, Vec2};

/// An icon placed relative to its anchor, in logical pixels (y down).
#[derive(Debug, Clone, PartialEq)]
pub struct PositionedIcon {
    pub image: SpriteImage,
    pub top: f32,
    pub bottom: f32,
    pub left: f32,
    pub right: f32,
}

/// Center the image on the anchor, scaled by `icon-size` and shifted by `icon-offset`.
pub fn shape_icon(image: &SpriteImage, layout: &LayoutProperties) -> PositionedIcon {
    let size = layout.icon_size;
    let [dx, dy] = layout.icon_offset;

    let left = (dx - image.width() / 2.0) * size;
    let top = (dy - image.height() / 2.0) * size;

    PositionedIcon {
        image: image.clone(),
        top,
        bottom: top + image.height() * size,
        left,
        right: left + image.width() * size,
    }
}

/// Corner offsets of one icon quad plus the atlas region it samples.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IconQuad {
    pub tl: Vec2,
    pub tr: Vec2,
    pub bl: Vec2,
    pub br: Vec2,
    pub tex: AtlasRect,
}

impl IconQuad {
    /// Texture coordinates of the corners in `[tl, tr, bl, br]` order.
    pub fn tex_corners(&self) -> [Vec2; 4] {
        let (x0, y0) = (self.tex.x as f32, self.tex.y as f32);
        let (x1, y1) = (x0 + self.tex.w as f32, y0 + self.tex.h as f32);

        [
            Vec2::new(x0, y0),
            Vec2::new(x1, y0),
            Vec2::new(x0, y1),
            Vec2::new(x1, y1),
        ]
    }

    pub fn corners(&self) -> [Vec2; 4] {
        [self.tl, self.tr, self.bl, self.br]
    }
}

/// Build the quad for a shaped icon, rotated clockwise by `rotate_deg` (screen space, y down).
pub fn icon_quad(shaped: &PositionedIcon, rotate_deg: f32) -> IconQuad {
    let mut tl = Vec2::new(shaped.left, shaped.top);
    let mut tr = Vec2::new(shaped.right, shaped.top);
    let mut bl = Vec2::new(shaped.left, shaped.bottom);
    let mut br = Vec2::new(shaped.right, shaped.bottom);

    if rotate_deg != 0.0 {
        let rotation = Mat2::from_angle(rotate_deg.to_radians());
        tl = rotation * tl;
        tr = rotation * tr;
        bl = rotation * bl;
        br = rotation * br;
    }

    IconQuad {
        tl,
        tr,
        bl,
        br,
        tex: shaped.image.rect,
    }
}

/// Unit-square extrusions in `[tl, tr, bl, br]` order.
pub const UNIT_QUAD: [IVec2; 4] = [
    IVec2::new(-1, -1),
    IVec2::new(1, -1),
    IVec2::new(-1, 1),
    IVec2::new(1, 1),
];

#[cfg(test)]
mod tests {
    use super::*;

    fn image(w: u16, h: u16, pixel_ratio: f32) -> SpriteImage {
        SpriteImage {
            rect: AtlasRect { x: 8, y: 16, w, h },
            pixel_ratio,
            sdf: false,
        }
    }

    fn close(a: Vec2, b: Vec2) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn centers_icon_on_anchor() {
        let shaped = shape_icon(&image(20, 20, 1.0), &LayoutProperties::default());

        assert_eq!((shaped.left, shaped.right), (-10.0, 10.0));
        assert_eq!((shaped.top, shaped.bottom), (-10.0, 10.0));
    }

    #[test]
    fn applies_pixel_ratio_size_and_offset() {
        let layout = LayoutProperties {
            icon_size: 2.0,
            icon_offset: [5.0, 0.0],
            ..LayoutProperties::default()
        };
        let shaped = shape_icon(&image(40, 20, 2.0), &layout);

        // 20x10 logical px, doubled, shifted right by 5 * 2.
        assert_eq!((shaped.left, shaped.right), (-10.0, 30.0));
        assert_eq!((shaped.top, shaped.bottom), (-10.0, 10.0));
    }

    #[test]
    fn quad_corners_and_texture() {
        let shaped = shape_icon(&image(20, 20, 1.0), &LayoutProperties::default());
        let quad = icon_quad(&shaped, 0.0);

        assert_eq!(quad.tl, Vec2::new(-10.0, -10.0));
        assert_eq!(quad.br, Vec2::new(10.0, 10.0));
        assert_eq!(
            quad.tex_corners(),
            [
                Vec2::new(8.0, 16.0),
                Vec2::new(28.0, 16.0),
                Vec2::new(8.0, 36.0),
                Vec2::new(28.0, 36.0)
            ]
        );
    }

    #[test]
    fn rotation_turns_corners_clockwise_on_screen() {
        let shaped = shape_icon(&image(20, 20, 1.0), &LayoutProperties::default());
        let quad = icon_quad(&shaped, 90.0);

        // With y pointing down, +90 degrees moves the top-left corner to the top-right.
        assert!(close(quad.tl, Vec2::new(10.0, -10.0)));
        assert!(close(quad.br, Vec2::new(-10.0, 10.0)));
    }
}
