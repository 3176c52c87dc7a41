//! Geometry primitives: points, logical bounds, stamped transforms, lengths.
//!
//! Coordinates are canvas-style: x grows right, y grows down, angles are
//! radians measured clockwise from the positive x axis.

use crate::clock::Stamp;
use crate::error::StageError;
use kurbo::Affine;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ─── Point ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0.0, y: 0.0 };

    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn translate(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    #[must_use]
    pub fn translated(self, dx: f64, dy: f64) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance_to(self, other: Point) -> f64 {
        (self.x - other.x).hypot(self.y - other.y)
    }

    /// True when `other` lies within `radius` of this point.
    pub fn is_within(self, other: Point, radius: f64) -> bool {
        self.distance_to(other) <= radius
    }

    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

impl From<Point> for kurbo::Point {
    fn from(p: Point) -> Self {
        kurbo::Point::new(p.x, p.y)
    }
}

impl From<kurbo::Point> for Point {
    fn from(p: kurbo::Point) -> Self {
        Point::new(p.x, p.y)
    }
}

// ─── Bounds ──────────────────────────────────────────────────────────────

/// Axis-aligned rectangle in a shape's pre-transform space.
///
/// Width and height are never negative; use [`Bounds::from_corners`] when
/// the corners may arrive in any order.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub const ZERO: Bounds = Bounds::new(0.0, 0.0, 0.0, 0.0);

    pub const fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Normalizing constructor: the corners may be given in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self::new(
            a.x.min(b.x),
            a.y.min(b.y),
            (b.x - a.x).abs(),
            (b.y - a.y).abs(),
        )
    }

    /// Smallest bounds covering every point. Zero bounds for an empty set.
    pub fn enclosing(points: impl IntoIterator<Item = Point>) -> Self {
        let mut iter = points.into_iter();
        let Some(first) = iter.next() else {
            return Self::ZERO;
        };
        let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
        for p in iter {
            x0 = x0.min(p.x);
            y0 = y0.min(p.y);
            x1 = x1.max(p.x);
            y1 = y1.max(p.y);
        }
        Self::new(x0, y0, x1 - x0, y1 - y0)
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn center_x(&self) -> f64 {
        self.x + self.width / 2.0
    }

    pub fn center_y(&self) -> f64 {
        self.y + self.height / 2.0
    }

    pub fn center(&self) -> Point {
        Point::new(self.center_x(), self.center_y())
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0.0 && self.height == 0.0
    }

    /// Non-negative, finite extents.
    pub fn is_valid(&self) -> bool {
        self.width >= 0.0
            && self.height >= 0.0
            && self.x.is_finite()
            && self.y.is_finite()
            && self.width.is_finite()
            && self.height.is_finite()
    }

    #[must_use]
    pub fn union(&self, other: &Bounds) -> Bounds {
        let left = self.left().min(other.left());
        let top = self.top().min(other.top());
        let right = self.right().max(other.right());
        let bottom = self.bottom().max(other.bottom());
        Bounds::new(left, top, right - left, bottom - top)
    }

    /// Edges are inclusive.
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.left() && x <= self.right() && y >= self.top() && y <= self.bottom()
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        self.left() <= other.right()
            && other.left() <= self.right()
            && self.top() <= other.bottom()
            && other.top() <= self.bottom()
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) {
        self.x += dx;
        self.y += dy;
    }

    #[must_use]
    pub fn moved(&self, dx: f64, dy: f64) -> Bounds {
        Bounds::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Grow (or shrink, for negative `d`) on every side. Never inverts.
    #[must_use]
    pub fn inflate(&self, d: f64) -> Bounds {
        let width = (self.width + 2.0 * d).max(0.0);
        let height = (self.height + 2.0 * d).max(0.0);
        Bounds::new(
            self.center_x() - width / 2.0,
            self.center_y() - height / 2.0,
            width,
            height,
        )
    }

    /// Map `p` from this rectangle onto `to`, preserving its relative
    /// position. A degenerate axis only shifts.
    pub fn map_point(&self, p: Point, to: &Bounds) -> Point {
        let (sx, sy) = self.scale_to(to);
        Point::new(to.x + (p.x - self.x) * sx, to.y + (p.y - self.y) * sy)
    }

    /// Per-axis factors taking this rectangle's size to `to`'s size.
    pub fn scale_to(&self, to: &Bounds) -> (f64, f64) {
        let sx = if self.width == 0.0 {
            1.0
        } else {
            to.width / self.width
        };
        let sy = if self.height == 0.0 {
            1.0
        } else {
            to.height / self.height
        };
        (sx, sy)
    }

    /// Whether [`Bounds::map_point`] can carry points onto `to`. A flat axis
    /// stays flat, so it cannot grow.
    pub fn can_map_onto(&self, to: &Bounds) -> bool {
        (self.width != 0.0 || to.width == 0.0) && (self.height != 0.0 || to.height == 0.0)
    }

    pub fn corners(&self) -> [Point; 4] {
        [
            Point::new(self.left(), self.top()),
            Point::new(self.right(), self.top()),
            Point::new(self.right(), self.bottom()),
            Point::new(self.left(), self.bottom()),
        ]
    }
}

impl From<kurbo::Rect> for Bounds {
    fn from(r: kurbo::Rect) -> Self {
        let r = r.abs();
        Bounds::new(r.x0, r.y0, r.width(), r.height())
    }
}

impl From<Bounds> for kurbo::Rect {
    fn from(b: Bounds) -> Self {
        kurbo::Rect::new(b.left(), b.top(), b.right(), b.bottom())
    }
}

// ─── Transform ───────────────────────────────────────────────────────────

/// An affine map carrying the logical time it was computed at.
///
/// Builder methods compose in canvas order: each new step applies to points
/// before the steps already present, exactly like successive
/// `ctx.translate/rotate/scale` calls.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    affine: Affine,
    stamp: Stamp,
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}

impl Transform {
    /// Identity map stamped with [`Stamp::ZERO`].
    pub const fn identity() -> Self {
        Self {
            affine: Affine::IDENTITY,
            stamp: Stamp::ZERO,
        }
    }

    pub const fn from_affine(affine: Affine, stamp: Stamp) -> Self {
        Self { affine, stamp }
    }

    pub fn affine(&self) -> Affine {
        self.affine
    }

    /// When this transform was last recomputed.
    pub fn stamp(&self) -> Stamp {
        self.stamp
    }

    #[must_use]
    pub fn with_stamp(self, stamp: Stamp) -> Self {
        Self { stamp, ..self }
    }

    #[must_use]
    pub fn translate(self, dx: f64, dy: f64) -> Self {
        Self {
            affine: self.affine * Affine::translate((dx, dy)),
            ..self
        }
    }

    #[must_use]
    pub fn rotate(self, theta: f64) -> Self {
        Self {
            affine: self.affine * Affine::rotate(theta),
            ..self
        }
    }

    #[must_use]
    pub fn scale(self, sx: f64, sy: f64) -> Self {
        Self {
            affine: self.affine * Affine::scale_non_uniform(sx, sy),
            ..self
        }
    }

    /// Map through `self`, then through `outer`. Keeps this stamp.
    #[must_use]
    pub fn then(self, outer: &Transform) -> Self {
        Self {
            affine: outer.affine * self.affine,
            ..self
        }
    }

    #[must_use]
    pub fn inverse(self) -> Self {
        Self {
            affine: self.affine.inverse(),
            ..self
        }
    }

    pub fn apply(&self, x: f64, y: f64) -> Point {
        (self.affine * kurbo::Point::new(x, y)).into()
    }

    pub fn apply_point(&self, p: Point) -> Point {
        self.apply(p.x, p.y)
    }

    pub fn is_identity(&self) -> bool {
        self.affine == Affine::IDENTITY
    }
}

// ─── Length ──────────────────────────────────────────────────────────────

/// Pixels per `em` when no font context is available.
pub const DEFAULT_FONT_PX: f64 = 16.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LengthUnit {
    Px,
    Pt,
    Em,
    In,
    Cm,
    Mm,
    Percent,
}

/// A CSS-like length such as `10px`, `2em` or `50%`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Length {
    pub value: f64,
    pub unit: LengthUnit,
}

impl Length {
    pub const fn px(value: f64) -> Self {
        Self {
            value,
            unit: LengthUnit::Px,
        }
    }

    /// Resolve to pixels. `reference` is the extent percentages refer to.
    pub fn to_pixels(self, reference: f64) -> f64 {
        let v = self.value;
        match self.unit {
            LengthUnit::Px => v,
            LengthUnit::Pt => v * 96.0 / 72.0,
            LengthUnit::Em => v * DEFAULT_FONT_PX,
            LengthUnit::In => v * 96.0,
            LengthUnit::Cm => v * 96.0 / 2.54,
            LengthUnit::Mm => v * 96.0 / 25.4,
            LengthUnit::Percent => v * reference / 100.0,
        }
    }
}

impl FromStr for Length {
    type Err = StageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let split = s
            .find(|c: char| c.is_ascii_alphabetic() || c == '%')
            .unwrap_or(s.len());
        let (number, unit) = s.split_at(split);
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| StageError::invalid(format!("bad length value `{s}`")))?;
        if !value.is_finite() {
            return Err(StageError::invalid(format!("non-finite length `{s}`")));
        }
        let unit = match unit.trim() {
            "" | "px" => LengthUnit::Px,
            "pt" => LengthUnit::Pt,
            "em" => LengthUnit::Em,
            "in" => LengthUnit::In,
            "cm" => LengthUnit::Cm,
            "mm" => LengthUnit::Mm,
            "%" => LengthUnit::Percent,
            other => return Err(StageError::invalid(format!("unknown length unit `{other}`"))),
        };
        Ok(Length { value, unit })
    }
}
