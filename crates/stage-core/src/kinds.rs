//! The closed set of shape kinds.
//!
//! Every kind implements [`Geometry`]; [`ShapeKind`] dispatches over them and
//! picks the controller each kind is edited with.

use crate::controller::{BOX_CONTROLLER, PATH_CONTROLLER, ShapeController};
use crate::error::{Result, StageError};
use crate::geom::{Bounds, Length, Point};
use crate::path::Path;

/// Kind-specific geometry behind a shape's logical bounds.
pub trait Geometry {
    /// Bounds derived fresh from the kind's own state.
    fn eval_bounds(&self) -> Bounds;

    /// Reshape so that [`Geometry::eval_bounds`] becomes `new`.
    fn set_bounds(&mut self, new: &Bounds) -> Result<()>;

    /// Whether [`Geometry::set_bounds`] can produce exactly `new`. Kinds that
    /// rescale their points cannot stretch an axis they are flat on.
    fn can_reach(&self, _new: &Bounds) -> bool {
        true
    }

    /// Reject malformed construction values.
    fn validate(&self) -> Result<()> {
        Ok(())
    }
}

/// Corners spanning `new`, each kept on the side it was on.
fn fit_corners(p1: Point, p2: Point, new: &Bounds) -> (Point, Point) {
    let (x1, x2) = if p1.x <= p2.x {
        (new.left(), new.right())
    } else {
        (new.right(), new.left())
    };
    let (y1, y2) = if p1.y <= p2.y {
        (new.top(), new.bottom())
    } else {
        (new.bottom(), new.top())
    };
    (Point::new(x1, y1), Point::new(x2, y2))
}

fn finite(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(StageError::invalid(format!("{what} needs finite coordinates")))
    }
}

fn non_negative(what: &str, value: f64) -> Result<()> {
    if value < 0.0 {
        Err(StageError::invalid(format!(
            "{what} must be non-negative, got {value}"
        )))
    } else {
        Ok(())
    }
}

// ─── Circle ──────────────────────────────────────────────────────────────

pub const DEFAULT_CIRCLE_RADIUS: f64 = 10.0;

/// A circle. Non-uniform resizes stretch it, so the two radii can diverge.
#[derive(Debug, Clone, PartialEq)]
pub struct Circle {
    pub center: Point,
    pub radius_x: f64,
    pub radius_y: f64,
}

impl Circle {
    pub fn new(cx: f64, cy: f64, radius: f64) -> Self {
        Self {
            center: Point::new(cx, cy),
            radius_x: radius,
            radius_y: radius,
        }
    }

    /// Build from CSS-like lengths; percentages resolve against `reference`.
    pub fn from_lengths(cx: Length, cy: Length, radius: Length, reference: f64) -> Result<Self> {
        let circle = Self::new(
            cx.to_pixels(reference),
            cy.to_pixels(reference),
            radius.to_pixels(reference),
        );
        circle.validate()?;
        Ok(circle)
    }

    pub fn radius(&self) -> f64 {
        self.radius_x.min(self.radius_y)
    }

    pub fn is_round(&self) -> bool {
        self.radius_x == self.radius_y
    }
}

impl Default for Circle {
    fn default() -> Self {
        Self::new(0.0, 0.0, DEFAULT_CIRCLE_RADIUS)
    }
}

impl Geometry for Circle {
    fn eval_bounds(&self) -> Bounds {
        Bounds::new(
            self.center.x - self.radius_x,
            self.center.y - self.radius_y,
            self.radius_x * 2.0,
            self.radius_y * 2.0,
        )
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        self.center = new.center();
        self.radius_x = new.width / 2.0;
        self.radius_y = new.height / 2.0;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        finite("circle", &[self.center.x, self.center.y, self.radius_x, self.radius_y])?;
        non_negative("circle radius", self.radius_x.min(self.radius_y))
    }
}

// ─── Square ──────────────────────────────────────────────────────────────

pub const DEFAULT_SQUARE_SIZE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Square {
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl Square {
    pub fn new(x: f64, y: f64, size: f64) -> Self {
        Self {
            origin: Point::new(x, y),
            width: size,
            height: size,
        }
    }
}

impl Default for Square {
    fn default() -> Self {
        Self::new(0.0, 0.0, DEFAULT_SQUARE_SIZE)
    }
}

impl Geometry for Square {
    fn eval_bounds(&self) -> Bounds {
        Bounds::new(self.origin.x, self.origin.y, self.width, self.height)
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        self.origin = new.origin();
        self.width = new.width;
        self.height = new.height;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        finite("square", &[self.origin.x, self.origin.y, self.width, self.height])?;
        non_negative("square size", self.width.min(self.height))
    }
}

// ─── Ellipse ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Ellipse {
    pub frame: Bounds,
}

impl Ellipse {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            frame: Bounds::new(x, y, width, height),
        }
    }
}

impl Geometry for Ellipse {
    fn eval_bounds(&self) -> Bounds {
        self.frame
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        self.frame = *new;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.frame.is_valid() {
            Ok(())
        } else {
            Err(StageError::invalid(format!("bad ellipse frame {:?}", self.frame)))
        }
    }
}

// ─── Triangle ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Triangle {
    pub points: [Point; 3],
}

impl Triangle {
    pub fn new(p0: Point, p1: Point, p2: Point) -> Self {
        Self {
            points: [p0, p1, p2],
        }
    }

    /// Isosceles triangle pointing up inside `frame`.
    pub fn in_frame(frame: Bounds) -> Self {
        Self::new(
            Point::new(frame.center_x(), frame.top()),
            Point::new(frame.right(), frame.bottom()),
            Point::new(frame.left(), frame.bottom()),
        )
    }
}

impl Geometry for Triangle {
    fn eval_bounds(&self) -> Bounds {
        Bounds::enclosing(self.points)
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        let old = self.eval_bounds();
        for p in &mut self.points {
            *p = old.map_point(*p, new);
        }
        Ok(())
    }

    fn can_reach(&self, new: &Bounds) -> bool {
        self.eval_bounds().can_map_onto(new)
    }

    fn validate(&self) -> Result<()> {
        if self.points.iter().all(|p| p.is_finite()) {
            Ok(())
        } else {
            Err(StageError::invalid("triangle needs finite vertices"))
        }
    }
}

// ─── Plus ────────────────────────────────────────────────────────────────

/// A plus sign spanning two corners. The arm thickness is a fraction of the
/// box along each axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Plus {
    pub p1: Point,
    pub p2: Point,
    pub inner_width: f64,
    pub inner_height: f64,
}

impl Plus {
    pub fn new(p1: Point, p2: Point) -> Self {
        Self {
            p1,
            p2,
            inner_width: 0.3,
            inner_height: 0.3,
        }
    }

    /// Twelve-vertex outline, clockwise from the top arm's left corner.
    pub fn outline(&self) -> [Point; 12] {
        let b = Bounds::from_corners(self.p1, self.p2);
        let half_w = b.width * self.inner_width / 2.0;
        let half_h = b.height * self.inner_height / 2.0;
        let (cx, cy) = (b.center_x(), b.center_y());
        let (l, t, r, btm) = (b.left(), b.top(), b.right(), b.bottom());
        [
            Point::new(cx - half_w, t),
            Point::new(cx + half_w, t),
            Point::new(cx + half_w, cy - half_h),
            Point::new(r, cy - half_h),
            Point::new(r, cy + half_h),
            Point::new(cx + half_w, cy + half_h),
            Point::new(cx + half_w, btm),
            Point::new(cx - half_w, btm),
            Point::new(cx - half_w, cy + half_h),
            Point::new(l, cy + half_h),
            Point::new(l, cy - half_h),
            Point::new(cx - half_w, cy - half_h),
        ]
    }
}

impl Default for Plus {
    fn default() -> Self {
        Self::new(Point::ORIGIN, Point::new(100.0, 100.0))
    }
}

impl Geometry for Plus {
    fn eval_bounds(&self) -> Bounds {
        Bounds::from_corners(self.p1, self.p2)
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        (self.p1, self.p2) = fit_corners(self.p1, self.p2, new);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        finite("plus", &[self.p1.x, self.p1.y, self.p2.x, self.p2.y])?;
        for ratio in [self.inner_width, self.inner_height] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(StageError::invalid(format!(
                    "plus arm ratio must be within 0..=1, got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

// ─── Arrow family ────────────────────────────────────────────────────────

/// A right-pointing block arrow spanning two corners.
///
/// `shaft_width` is the shaft's share of the box height, `tip_length` the
/// head's share of the width, and `back_depth` how far the tail notch cuts
/// in. A full-height shaft with a notch is a chevron.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrow {
    pub p1: Point,
    pub p2: Point,
    pub shaft_width: f64,
    pub back_depth: f64,
    pub tip_length: f64,
}

impl Arrow {
    pub fn right_arrow(p1: Point, p2: Point) -> Self {
        Self {
            p1,
            p2,
            shaft_width: 0.5,
            back_depth: 0.0,
            tip_length: 0.3,
        }
    }

    pub fn right_chevron(p1: Point, p2: Point) -> Self {
        Self {
            p1,
            p2,
            shaft_width: 1.0,
            back_depth: 0.2,
            tip_length: 0.2,
        }
    }

    pub fn outline(&self) -> [Point; 8] {
        let b = Bounds::from_corners(self.p1, self.p2);
        let cy = b.center_y();
        let half_shaft = b.height * self.shaft_width / 2.0;
        let neck = b.right() - b.width * self.tip_length;
        let notch = b.left() + b.width * self.back_depth;
        [
            Point::new(b.left(), cy - half_shaft),
            Point::new(neck, cy - half_shaft),
            Point::new(neck, b.top()),
            Point::new(b.right(), cy),
            Point::new(neck, b.bottom()),
            Point::new(neck, cy + half_shaft),
            Point::new(b.left(), cy + half_shaft),
            Point::new(notch, cy),
        ]
    }
}

impl Geometry for Arrow {
    fn eval_bounds(&self) -> Bounds {
        Bounds::from_corners(self.p1, self.p2)
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        (self.p1, self.p2) = fit_corners(self.p1, self.p2, new);
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        finite("arrow", &[self.p1.x, self.p1.y, self.p2.x, self.p2.y])?;
        for (what, ratio) in [
            ("shaft width", self.shaft_width),
            ("back depth", self.back_depth),
            ("tip length", self.tip_length),
        ] {
            if !(0.0..=1.0).contains(&ratio) {
                return Err(StageError::invalid(format!(
                    "arrow {what} must be within 0..=1, got {ratio}"
                )));
            }
        }
        Ok(())
    }
}

// ─── Containers ──────────────────────────────────────────────────────────

/// A container whose children are positioned relative to `frame.origin`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub frame: Bounds,
}

impl Group {
    pub fn new(frame: Bounds) -> Self {
        Self { frame }
    }
}

impl Geometry for Group {
    fn eval_bounds(&self) -> Bounds {
        self.frame
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        self.frame = *new;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.frame.is_valid() {
            Ok(())
        } else {
            Err(StageError::invalid(format!("bad group frame {:?}", self.frame)))
        }
    }
}

/// A top-level container owned by the scene. Has no visual extent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Layer;

impl Geometry for Layer {
    fn eval_bounds(&self) -> Bounds {
        Bounds::ZERO
    }

    fn set_bounds(&mut self, _new: &Bounds) -> Result<()> {
        Err(StageError::MissingCapability(
            "layers cannot be resized".into(),
        ))
    }
}

// ─── Dispatch ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum ShapeKind {
    Circle(Circle),
    Square(Square),
    Ellipse(Ellipse),
    Triangle(Triangle),
    Plus(Plus),
    Arrow(Arrow),
    Group(Group),
    Layer(Layer),
    Path(Path),
}

impl ShapeKind {
    pub fn geometry(&self) -> &dyn Geometry {
        match self {
            ShapeKind::Circle(k) => k,
            ShapeKind::Square(k) => k,
            ShapeKind::Ellipse(k) => k,
            ShapeKind::Triangle(k) => k,
            ShapeKind::Plus(k) => k,
            ShapeKind::Arrow(k) => k,
            ShapeKind::Group(k) => k,
            ShapeKind::Layer(k) => k,
            ShapeKind::Path(k) => k,
        }
    }

    pub fn geometry_mut(&mut self) -> &mut dyn Geometry {
        match self {
            ShapeKind::Circle(k) => k,
            ShapeKind::Square(k) => k,
            ShapeKind::Ellipse(k) => k,
            ShapeKind::Triangle(k) => k,
            ShapeKind::Plus(k) => k,
            ShapeKind::Arrow(k) => k,
            ShapeKind::Group(k) => k,
            ShapeKind::Layer(k) => k,
            ShapeKind::Path(k) => k,
        }
    }

    pub fn class_name(&self) -> &'static str {
        match self {
            ShapeKind::Circle(_) => "Circle",
            ShapeKind::Square(_) => "Square",
            ShapeKind::Ellipse(_) => "Ellipse",
            ShapeKind::Triangle(_) => "Triangle",
            ShapeKind::Plus(_) => "Plus",
            ShapeKind::Arrow(_) => "Arrow",
            ShapeKind::Group(_) => "Group",
            ShapeKind::Layer(_) => "Layer",
            ShapeKind::Path(_) => "Path",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self, ShapeKind::Group(_) | ShapeKind::Layer(_))
    }

    pub fn is_layer(&self) -> bool {
        matches!(self, ShapeKind::Layer(_))
    }

    /// Origin of the coordinate space children are placed in.
    pub fn child_origin(&self) -> Point {
        match self {
            ShapeKind::Group(g) => g.frame.origin(),
            _ => Point::ORIGIN,
        }
    }

    /// The controller this kind is edited with, fixed at construction.
    pub fn controller(&self) -> &'static dyn ShapeController {
        match self {
            ShapeKind::Path(_) => &PATH_CONTROLLER,
            _ => &BOX_CONTROLLER,
        }
    }
}

macro_rules! impl_from_kind {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for ShapeKind {
                fn from(k: $variant) -> Self {
                    ShapeKind::$variant(k)
                }
            }
        )*
    };
}

impl_from_kind!(Circle, Square, Ellipse, Triangle, Plus, Arrow, Group, Layer, Path);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circle_bounds_follow_radius() {
        let c = Circle::new(50.0, 50.0, 10.0);
        assert_eq!(c.eval_bounds(), Bounds::new(40.0, 40.0, 20.0, 20.0));
    }

    #[test]
    fn circle_stretches_on_resize() {
        let mut c = Circle::new(0.0, 0.0, 20.0);
        c.set_bounds(&Bounds::new(-20.0, -20.0, 70.0, 40.0)).unwrap();
        assert_eq!(c.center, Point::new(15.0, 0.0));
        assert_eq!((c.radius_x, c.radius_y), (35.0, 20.0));
        assert!(!c.is_round());
    }

    #[test]
    fn negative_radius_is_invalid() {
        let err = Circle::new(0.0, 0.0, -1.0).validate().unwrap_err();
        assert!(matches!(err, StageError::InvalidArgument(_)));
    }

    #[test]
    fn circle_from_lengths() {
        let c = Circle::from_lengths(
            "1in".parse().unwrap(),
            Length::px(0.0),
            "10%".parse().unwrap(),
            200.0,
        )
        .unwrap();
        assert_eq!(c.center, Point::new(96.0, 0.0));
        assert_eq!(c.radius(), 20.0);
    }

    #[test]
    fn triangle_rescales_vertices() {
        let mut t = Triangle::in_frame(Bounds::new(0.0, 0.0, 10.0, 10.0));
        t.set_bounds(&Bounds::new(0.0, 0.0, 20.0, 10.0)).unwrap();
        assert_eq!(t.points[0], Point::new(10.0, 0.0));
        assert_eq!(t.eval_bounds(), Bounds::new(0.0, 0.0, 20.0, 10.0));
    }

    #[test]
    fn flat_triangle_cannot_grow_its_flat_axis() {
        let t = Triangle::new(Point::ORIGIN, Point::new(50.0, 0.0), Point::new(100.0, 0.0));
        assert!(!t.can_reach(&Bounds::new(0.0, 0.0, 100.0, 40.0)));
        assert!(t.can_reach(&Bounds::new(10.0, 5.0, 200.0, 0.0)));
    }

    #[test]
    fn flat_plus_and_arrow_take_the_new_frame() {
        let target = Bounds::new(0.0, 0.0, 100.0, 40.0);
        let mut plus = Plus::new(Point::ORIGIN, Point::new(100.0, 0.0));
        plus.set_bounds(&target).unwrap();
        assert_eq!(plus.eval_bounds(), target);

        let mut arrow = Arrow::right_arrow(Point::new(100.0, 10.0), Point::new(0.0, 10.0));
        arrow.set_bounds(&target).unwrap();
        assert_eq!(arrow.eval_bounds(), target);
        assert_eq!(arrow.p1, Point::new(100.0, 0.0));
    }

    #[test]
    fn chevron_is_full_height() {
        let c = Arrow::right_chevron(Point::ORIGIN, Point::new(100.0, 50.0));
        let outline = c.outline();
        assert_eq!(outline[0], Point::new(0.0, 0.0));
        assert_eq!(outline[3], Point::new(100.0, 25.0));
        assert_eq!(outline[7], Point::new(20.0, 25.0));
    }

    #[test]
    fn plus_outline_stays_in_bounds() {
        let plus = Plus::default();
        let b = plus.eval_bounds();
        assert!(plus.outline().iter().all(|p| b.contains_point(p.x, p.y)));
        assert_eq!(plus.outline()[0], Point::new(35.0, 0.0));
    }

    #[test]
    fn layers_cannot_be_resized() {
        let err = Layer.set_bounds(&Bounds::ZERO).unwrap_err();
        assert!(matches!(err, StageError::MissingCapability(_)));
    }

    #[test]
    fn paths_get_their_own_controller() {
        let path: ShapeKind = Path::starting_at(0.0, 0.0).into();
        let square: ShapeKind = Square::default().into();
        assert!(std::ptr::addr_eq(path.controller(), &PATH_CONTROLLER as &dyn ShapeController));
        assert!(std::ptr::addr_eq(square.controller(), &BOX_CONTROLLER as &dyn ShapeController));
    }
}
