//! Paint and stroke vocabulary shared by shapes and paint contexts.

use serde::{Deserialize, Serialize};

// ─── Colors & Paint ──────────────────────────────────────────────────────

/// RGBA color with channels in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgba(0.0, 0.0, 0.0, 1.0);
    pub const WHITE: Color = Color::rgba(1.0, 1.0, 1.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Parse `#RGB`, `#RGBA`, `#RRGGBB` or `#RRGGBBAA`; the `#` is optional.
    pub fn from_hex(hex: &str) -> Option<Self> {
        let digits = hex.strip_prefix('#').unwrap_or(hex);
        if !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let value = u32::from_str_radix(digits, 16).ok()?;
        let channel = |shift: u32, bits: u32| -> f32 {
            let raw = (value >> shift) & ((1 << bits) - 1);
            let full = if bits == 4 { raw * 17 } else { raw };
            full as f32 / 255.0
        };
        match digits.len() {
            3 => Some(Self::rgba(channel(8, 4), channel(4, 4), channel(0, 4), 1.0)),
            4 => Some(Self::rgba(
                channel(12, 4),
                channel(8, 4),
                channel(4, 4),
                channel(0, 4),
            )),
            6 => Some(Self::rgba(channel(16, 8), channel(8, 8), channel(0, 8), 1.0)),
            8 => Some(Self::rgba(
                channel(24, 8),
                channel(16, 8),
                channel(8, 8),
                channel(0, 8),
            )),
            _ => None,
        }
    }

    /// `#RRGGBB`, or `#RRGGBBAA` when not fully opaque.
    pub fn to_hex(&self) -> String {
        let byte = |c: f32| (c.clamp(0.0, 1.0) * 255.0).round() as u8;
        let (r, g, b, a) = (byte(self.r), byte(self.g), byte(self.b), byte(self.a));
        if a == 255 {
            format!("#{r:02X}{g:02X}{b:02X}")
        } else {
            format!("#{r:02X}{g:02X}{b:02X}{a:02X}")
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientStop {
    pub offset: f32,
    pub color: Color,
}

/// A fill or stroke style.
///
/// Gradients are resolved against the shape's logical bounds when applied,
/// so they follow the shape through resizes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Paint {
    Solid(Color),
    LinearGradient {
        /// Degrees, clockwise from the positive x axis.
        angle: f32,
        stops: Vec<GradientStop>,
    },
    RadialGradient {
        stops: Vec<GradientStop>,
    },
}

impl Paint {
    /// Solid paint from a hex string.
    pub fn hex(hex: &str) -> Option<Paint> {
        Color::from_hex(hex).map(Paint::Solid)
    }
}

/// Which slot a [`Paint`] is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StyleRole {
    Fill,
    Stroke,
}

// ─── Stroke ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineCap {
    Butt,
    Round,
    Square,
}

impl LineCap {
    pub fn as_str(self) -> &'static str {
        match self {
            LineCap::Butt => "butt",
            LineCap::Round => "round",
            LineCap::Square => "square",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineJoin {
    Miter,
    Round,
    Bevel,
}

impl LineJoin {
    pub fn as_str(self) -> &'static str {
        match self {
            LineJoin::Miter => "miter",
            LineJoin::Round => "round",
            LineJoin::Bevel => "bevel",
        }
    }
}
