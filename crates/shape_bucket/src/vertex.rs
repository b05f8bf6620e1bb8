//! Fixed-point layout vertex records.
//!
//! Rounding is `f32::round`: nearest, ties away from zero. Out-of-range values
//! saturate at the component's bounds.

use bytemuck::{Pod, Zeroable};
use glam::{IVec2, Vec2};
use std::fmt::Debug;

/// Sub-pixel units per pixel of icon extrusion.
pub const EXTRUDE_SCALE: f32 = 64.0;

/// Atlas texels per stored texture unit.
pub const TEXTURE_SCALE: f32 = 4.0;

/// A layout vertex type a bucket can emit.
pub trait LayoutVertex: Pod + Debug + PartialEq + Send + Sync {
    /// Whether records carry atlas texture coordinates.
    const HAS_TEXTURE: bool;

    /// Size of one record in bytes.
    const STRIDE: usize = std::mem::size_of::<Self>();

    fn anchor(&self) -> IVec2;
}

/// Icon-quad vertex: anchor, 1/64 px extrusion, quarter-scaled atlas position.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct IconVertex {
    pub pos: [i16; 2],
    pub offset: [i16; 2],
    pub tex: [u16; 2],
}

impl IconVertex {
    #[inline]
    pub fn new(anchor: IVec2, offset_px: Vec2, tex_px: Vec2) -> Self {
        Self {
            pos: [anchor.x as i16, anchor.y as i16],
            offset: [quantize_extrude(offset_px.x), quantize_extrude(offset_px.y)],
            tex: [quantize_texture(tex_px.x), quantize_texture(tex_px.y)],
        }
    }

    /// Extrusion in pixels as the shader reconstructs it.
    pub fn offset_px(&self) -> Vec2 {
        Vec2::new(self.offset[0] as f32, self.offset[1] as f32) / EXTRUDE_SCALE
    }

    /// Atlas position in texels as the shader reconstructs it.
    pub fn tex_px(&self) -> Vec2 {
        Vec2::new(self.tex[0] as f32, self.tex[1] as f32) * TEXTURE_SCALE
    }
}

impl LayoutVertex for IconVertex {
    const HAS_TEXTURE: bool = true;

    fn anchor(&self) -> IVec2 {
        IVec2::new(self.pos[0] as i32, self.pos[1] as i32)
    }
}

/// Unit-square vertex: anchor plus `anchor * 2 + (extrude + 1) / 2` packing.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct QuadVertex {
    pub pos: [i16; 2],
    pub extrude: [i16; 2],
}

impl QuadVertex {
    /// `extrude` components must be -1 or 1.
    #[inline]
    pub fn new(anchor: IVec2, extrude: IVec2) -> Self {
        let pack = |a: i32, e: i32| (a * 2 + (e + 1) / 2) as i16;

        Self {
            pos: [anchor.x as i16, anchor.y as i16],
            extrude: [pack(anchor.x, extrude.x), pack(anchor.y, extrude.y)],
        }
    }

    /// Recover the ±1 extrusion from the packed components.
    pub fn unit_extrude(&self) -> IVec2 {
        let unpack = |packed: i16, anchor: i16| (packed as i32 - anchor as i32 * 2) * 2 - 1;
        IVec2::new(
            unpack(self.extrude[0], self.pos[0]),
            unpack(self.extrude[1], self.pos[1]),
        )
    }
}

impl LayoutVertex for QuadVertex {
    const HAS_TEXTURE: bool = false;

    fn anchor(&self) -> IVec2 {
        IVec2::new(self.pos[0] as i32, self.pos[1] as i32)
    }
}

/// Three u16 indices, relative to the owning segment's vertex offset.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Pod, Zeroable)]
pub struct Triangle(pub [u16; 3]);

#[inline]
pub fn quantize_extrude(px: f32) -> i16 {
    (px * EXTRUDE_SCALE).round() as i16
}

#[inline]
pub fn quantize_texture(texel: f32) -> u16 {
    (texel / TEXTURE_SCALE).round() as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_sizes_match_layout() {
        assert_eq!(IconVertex::STRIDE, 12);
        assert_eq!(QuadVertex::STRIDE, 8);
        assert_eq!(std::mem::size_of::<Triangle>(), 6);
    }

    #[test]
    fn extrusion_rounds_half_away_from_zero() {
        assert_eq!(quantize_extrude(-10.0), -640);
        assert_eq!(quantize_extrude(0.5 / 64.0), 1);
        assert_eq!(quantize_extrude(-0.5 / 64.0), -1);
        assert_eq!(quantize_extrude(0.49 / 64.0), 0);
        assert_eq!(quantize_extrude(1.0e6), i16::MAX);
    }

    #[test]
    fn texture_round_trip_stays_within_quantization_error() {
        for texel in [0.0f32, 1.0, 2.0, 3.0, 17.0, 255.0, 1023.0, 4093.0] {
            let v = IconVertex::new(IVec2::ZERO, Vec2::ZERO, Vec2::new(texel, texel));
            let back = v.tex_px();
            assert!((back.x - texel).abs() <= TEXTURE_SCALE / 2.0, "{} -> {}", texel, back.x);
        }
    }

    #[test]
    fn icon_vertex_keeps_anchor_unquantized() {
        let v = IconVertex::new(IVec2::new(100, 4095), Vec2::new(-10.0, 10.0), Vec2::new(8.0, 16.0));

        assert_eq!(v.anchor(), IVec2::new(100, 4095));
        assert_eq!(v.offset, [-640, 640]);
        assert_eq!(v.tex, [2, 4]);
        assert_eq!(v.offset_px(), Vec2::new(-10.0, 10.0));
    }

    #[test]
    fn quad_vertex_packs_and_unpacks() {
        for extrude in crate::shaping::UNIT_QUAD {
            let v = QuadVertex::new(IVec2::new(16383, 7), extrude);
            assert_eq!(v.unit_extrude(), extrude);
            assert_eq!(v.anchor(), IVec2::new(16383, 7));
        }

        let v = QuadVertex::new(IVec2::new(100, 100), IVec2::new(1, -1));
        assert_eq!(v.extrude, [201, 200]);
    }

    #[test]
    fn records_cast_to_bytes() {
        let vertices = [QuadVertex::new(IVec2::new(1, 2), IVec2::new(1, 1))];
        let bytes: &[u8] = bytemuck::cast_slice(&vertices);
        assert_eq!(bytes.len(), 8);
    }
}
