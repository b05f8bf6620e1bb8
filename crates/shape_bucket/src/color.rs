use crate::error::{Error, Result};
use serde_json::Value;
use std::str::FromStr;

/// Straight (non-premultiplied) RGBA, each channel in `0..=1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::new(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::new(1.0, 1.0, 1.0, 1.0);
    pub const TRANSPARENT: Color = Color::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    #[inline]
    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }

    /// Accepts a CSS color string or an `[r, g, b, a]` array in `0..=1`.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => s.parse().ok(),
            Value::Array(items) if items.len() == 3 || items.len() == 4 => {
                let mut channels = [1.0f32; 4];
                for (slot, item) in channels.iter_mut().zip(items) {
                    *slot = item.as_f64()? as f32;
                }
                let [r, g, b, a] = channels;
                Some(Color::new(r, g, b, a))
            }
            _ => None,
        }
    }

    pub fn lerp(self, other: Color, t: f32) -> Color {
        let mix = |a: f32, b: f32| a + (b - a) * t;
        Color::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }
}

impl FromStr for Color {
    type Err = Error;

    fn from_str(input: &str) -> Result<Self> {
        let s = input.trim().to_ascii_lowercase();
        let bad = || Error::Color(input.to_string());

        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex).ok_or_else(bad);
        }

        if let Some(body) = s.strip_prefix("rgba(").or_else(|| s.strip_prefix("rgb(")) {
            let body = body.strip_suffix(')').ok_or_else(bad)?;
            let parts: Vec<f32> = body
                .split(',')
                .map(|p| p.trim().parse::<f32>())
                .collect::<std::result::Result<_, _>>()
                .map_err(|_| bad())?;

            return match parts.as_slice() {
                [r, g, b] => Ok(Color::new(r / 255.0, g / 255.0, b / 255.0, 1.0)),
                [r, g, b, a] => Ok(Color::new(r / 255.0, g / 255.0, b / 255.0, *a)),
                _ => Err(bad()),
            }
            .map(Color::clamped);
        }

        match s.as_str() {
            "black" => Ok(Color::BLACK),
            "white" => Ok(Color::WHITE),
            "transparent" => Ok(Color::TRANSPARENT),
            "red" => Ok(Color::new(1.0, 0.0, 0.0, 1.0)),
            "green" => Ok(Color::new(0.0, 128.0 / 255.0, 0.0, 1.0)),
            "blue" => Ok(Color::new(0.0, 0.0, 1.0, 1.0)),
            "gray" | "grey" => Ok(Color::new(128.0 / 255.0, 128.0 / 255.0, 128.0 / 255.0, 1.0)),
            _ => Err(bad()),
        }
    }
}

impl Color {
    fn clamped(self) -> Self {
        Color::new(
            self.r.clamp(0.0, 1.0),
            self.g.clamp(0.0, 1.0),
            self.b.clamp(0.0, 1.0),
            self.a.clamp(0.0, 1.0),
        )
    }
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    let unit = |v: u8| v as f32 / 255.0;

    let (r, g, b, a) = match hex.len() {
        3 => (nibble(0)?, nibble(1)?, nibble(2)?, 255),
        4 => (nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?),
        6 => (byte(0)?, byte(2)?, byte(4)?, 255),
        8 => (byte(0)?, byte(2)?, byte(4)?, byte(6)?),
        _ => return None,
    };

    Some(Color::new(unit(r), unit(g), unit(b), unit(a)))
}
