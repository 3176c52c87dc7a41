//! Paths: an optional start point followed by drawing components.
//!
//! Several components derive their geometry from the endpoint of the one
//! before (an arc draws a connecting line from it, `ArcTo` tangents depend on
//! it), so each component caches its own bounds and an edit notifies every
//! later component whose pen position moved through
//! [`PathComponent::previous_changed`].

use crate::error::{Result, StageError};
use crate::geom::{Bounds, Point};
use crate::kinds::Geometry;
use kurbo::ParamCurveExtrema;
use smallvec::{SmallVec, smallvec};
use std::cell::Cell;
use std::f64::consts::{PI, TAU};

/// Address of one editable point in a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathPoint {
    /// The initial move-to point.
    Start,
    /// Control point `index` of component `component`.
    Component { component: usize, index: usize },
}

// ─── Segments ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    MoveTo(Point),
    LineTo(Point),
    Arc {
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    },
    ArcTo {
        p1: Point,
        p2: Point,
        radius: f64,
    },
    QuadraticTo {
        control: Point,
        end: Point,
    },
    BezierTo {
        control1: Point,
        control2: Point,
        end: Point,
    },
    Close,
}

impl Segment {
    pub fn name(&self) -> &'static str {
        match self {
            Segment::MoveTo(_) => "MoveTo",
            Segment::LineTo(_) => "LineTo",
            Segment::Arc { .. } => "Arc",
            Segment::ArcTo { .. } => "ArcTo",
            Segment::QuadraticTo { .. } => "QuadraticTo",
            Segment::BezierTo { .. } => "BezierTo",
            Segment::Close => "Close",
        }
    }

    /// The user-editable points, in control-point index order.
    pub fn control_points(&self) -> SmallVec<[Point; 3]> {
        match *self {
            Segment::MoveTo(p) | Segment::LineTo(p) => smallvec![p],
            Segment::Arc { center, .. } => {
                let end = self.arc_end().unwrap_or(center);
                smallvec![center, end]
            }
            Segment::ArcTo { p1, p2, .. } => smallvec![p1, p2],
            Segment::QuadraticTo { control, end } => smallvec![control, end],
            Segment::BezierTo {
                control1,
                control2,
                end,
            } => smallvec![control1, control2, end],
            Segment::Close => SmallVec::new(),
        }
    }

    fn set_control_point(&mut self, index: usize, p: Point) -> Result<()> {
        let slot = match (self, index) {
            (Segment::MoveTo(q) | Segment::LineTo(q), 0) => q,
            (Segment::Arc { center, .. }, 0) => center,
            (
                Segment::Arc {
                    center,
                    radius,
                    end_angle,
                    ..
                },
                1,
            ) => {
                *end_angle = (p.y - center.y).atan2(p.x - center.x);
                *radius = center.distance_to(p);
                return Ok(());
            }
            (Segment::ArcTo { p1, .. }, 0) => p1,
            (Segment::ArcTo { p2, .. }, 1) => p2,
            (Segment::QuadraticTo { control, .. }, 0) => control,
            (Segment::QuadraticTo { end, .. }, 1) => end,
            (Segment::BezierTo { control1, .. }, 0) => control1,
            (Segment::BezierTo { control2, .. }, 1) => control2,
            (Segment::BezierTo { end, .. }, 2) => end,
            (seg, _) => {
                return Err(StageError::invalid(format!(
                    "{} has no control point {index}",
                    seg.name()
                )));
            }
        };
        *slot = p;
        Ok(())
    }

    fn arc_end(&self) -> Option<Point> {
        match *self {
            Segment::Arc {
                center,
                radius,
                end_angle,
                ..
            } => Some(center.translated(radius * end_angle.cos(), radius * end_angle.sin())),
            _ => None,
        }
    }

    /// Where the pen rests after this segment.
    fn end_point(&self, prev: Option<Point>, subpath_start: Option<Point>) -> Option<Point> {
        match *self {
            Segment::MoveTo(p) | Segment::LineTo(p) => Some(p),
            Segment::Arc { .. } => self.arc_end(),
            Segment::ArcTo { p1, p2, radius } => {
                let from = prev.unwrap_or(p1);
                Some(arc_to_geometry(from, p1, p2, radius).map_or(p1, |g| g.t2))
            }
            Segment::QuadraticTo { end, .. } | Segment::BezierTo { end, .. } => Some(end),
            Segment::Close => subpath_start.or(prev),
        }
    }

    fn eval_bounds(&self, prev: Option<Point>, subpath_start: Option<Point>) -> Bounds {
        match *self {
            Segment::MoveTo(p) => Bounds::new(p.x, p.y, 0.0, 0.0),
            Segment::LineTo(p) => Bounds::enclosing(prev.into_iter().chain([p])),
            Segment::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                anticlockwise,
            } => {
                let sweep = arc_sweep(start_angle, end_angle, anticlockwise);
                let arc = arc_bounds(center, radius, start_angle, sweep);
                prev.map_or(arc, |p| arc.union(&Bounds::new(p.x, p.y, 0.0, 0.0)))
            }
            Segment::ArcTo { p1, p2, radius } => {
                let from = prev.unwrap_or(p1);
                match arc_to_geometry(from, p1, p2, radius) {
                    Some(g) => arc_bounds(g.center, radius, g.start_angle, g.sweep)
                        .union(&Bounds::enclosing([from, g.t1])),
                    None => Bounds::enclosing([from, p1]),
                }
            }
            Segment::QuadraticTo { control, end } => {
                let from = prev.unwrap_or(control);
                let quad = kurbo::QuadBez::new(from, control, end);
                ParamCurveExtrema::bounding_box(&quad).into()
            }
            Segment::BezierTo {
                control1,
                control2,
                end,
            } => {
                let from = prev.unwrap_or(control1);
                let cubic = kurbo::CubicBez::new(from, control1, control2, end);
                ParamCurveExtrema::bounding_box(&cubic).into()
            }
            Segment::Close => Bounds::enclosing(prev.into_iter().chain(subpath_start)),
        }
    }

    fn remap(&mut self, from: &Bounds, to: &Bounds) {
        let (sx, sy) = from.scale_to(to);
        let radius_scale = sx.min(sy);
        match self {
            Segment::MoveTo(p) | Segment::LineTo(p) => *p = from.map_point(*p, to),
            Segment::Arc { center, radius, .. } => {
                *center = from.map_point(*center, to);
                *radius *= radius_scale;
            }
            Segment::ArcTo { p1, p2, radius } => {
                *p1 = from.map_point(*p1, to);
                *p2 = from.map_point(*p2, to);
                *radius *= radius_scale;
            }
            Segment::QuadraticTo { control, end } => {
                *control = from.map_point(*control, to);
                *end = from.map_point(*end, to);
            }
            Segment::BezierTo {
                control1,
                control2,
                end,
            } => {
                *control1 = from.map_point(*control1, to);
                *control2 = from.map_point(*control2, to);
                *end = from.map_point(*end, to);
            }
            Segment::Close => {}
        }
    }

    fn validate(&self) -> Result<()> {
        let radius = match *self {
            Segment::Arc { radius, .. } | Segment::ArcTo { radius, .. } => radius,
            _ => 0.0,
        };
        if radius < 0.0 || !radius.is_finite() {
            return Err(StageError::invalid(format!(
                "{} radius must be non-negative, got {radius}",
                self.name()
            )));
        }
        if self.control_points().iter().any(|p| !p.is_finite()) {
            return Err(StageError::invalid(format!(
                "{} has a non-finite point",
                self.name()
            )));
        }
        Ok(())
    }
}

/// Signed sweep of a canvas `arc()` call.
pub fn arc_sweep(start: f64, end: f64, anticlockwise: bool) -> f64 {
    if anticlockwise {
        let d = start - end;
        if d >= TAU { -TAU } else { -d.rem_euclid(TAU) }
    } else {
        let d = end - start;
        if d >= TAU { TAU } else { d.rem_euclid(TAU) }
    }
}

fn arc_bounds(center: Point, radius: f64, start_angle: f64, sweep: f64) -> Bounds {
    let arc = kurbo::Arc {
        center: center.into(),
        radii: kurbo::Vec2::new(radius, radius),
        start_angle,
        sweep_angle: sweep,
        x_rotation: 0.0,
    };
    kurbo::Shape::bounding_box(&arc).into()
}

/// Resolved tangent geometry of a canvas `arcTo(p1, p2, r)` from `p0`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcToGeometry {
    /// Tangent point on the `p0 → p1` line, where the arc starts.
    pub t1: Point,
    /// Tangent point on the `p1 → p2` line, where the arc ends.
    pub t2: Point,
    pub center: Point,
    pub start_angle: f64,
    pub sweep: f64,
}

/// `None` when the arc degenerates into a straight line to `p1`.
pub fn arc_to_geometry(p0: Point, p1: Point, p2: Point, radius: f64) -> Option<ArcToGeometry> {
    let (ux, uy) = (p0.x - p1.x, p0.y - p1.y);
    let (vx, vy) = (p2.x - p1.x, p2.y - p1.y);
    let (lu, lv) = (ux.hypot(uy), vx.hypot(vy));
    if radius <= 0.0 || lu == 0.0 || lv == 0.0 {
        return None;
    }
    let (ux, uy, vx, vy) = (ux / lu, uy / lu, vx / lv, vy / lv);
    let angle = (ux * vx + uy * vy).clamp(-1.0, 1.0).acos();
    if angle < 1e-9 || PI - angle < 1e-9 {
        return None;
    }
    let half = angle / 2.0;
    let tangent = radius / half.tan();
    let t1 = p1.translated(ux * tangent, uy * tangent);
    let t2 = p1.translated(vx * tangent, vy * tangent);

    let (bx, by) = (ux + vx, uy + vy);
    let lb = bx.hypot(by);
    let offset = radius / half.sin();
    let center = p1.translated(bx / lb * offset, by / lb * offset);

    let a1 = (t1.y - center.y).atan2(t1.x - center.x);
    let a2 = (t2.y - center.y).atan2(t2.x - center.x);
    let mut sweep = a2 - a1;
    while sweep > PI {
        sweep -= TAU;
    }
    while sweep <= -PI {
        sweep += TAU;
    }
    Some(ArcToGeometry {
        t1,
        t2,
        center,
        start_angle: a1,
        sweep,
    })
}

// ─── Components ──────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PathComponent {
    segment: Segment,
    bounds: Cell<Option<Bounds>>,
}

impl PathComponent {
    pub fn new(segment: Segment) -> Self {
        Self {
            segment,
            bounds: Cell::new(None),
        }
    }

    pub fn segment(&self) -> &Segment {
        &self.segment
    }

    /// The component before this one moved its endpoint.
    pub fn previous_changed(&self) {
        self.bounds.set(None);
    }

    pub fn has_cached_bounds(&self) -> bool {
        self.bounds.get().is_some()
    }
}

impl PartialEq for PathComponent {
    fn eq(&self, other: &Self) -> bool {
        self.segment == other.segment
    }
}

// ─── Path ────────────────────────────────────────────────────────────────

/// Where the pen is before component `i` and where its subpath began.
#[derive(Debug, Clone, Copy, PartialEq)]
struct PenState {
    prev: Option<Point>,
    subpath_start: Option<Point>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Path {
    start: Option<Point>,
    components: Vec<PathComponent>,
}

impl Path {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn starting_at(x: f64, y: f64) -> Self {
        Self {
            start: Some(Point::new(x, y)),
            components: Vec::new(),
        }
    }

    #[must_use]
    pub fn move_to(self, x: f64, y: f64) -> Self {
        self.with(Segment::MoveTo(Point::new(x, y)))
    }

    #[must_use]
    pub fn line_to(self, x: f64, y: f64) -> Self {
        self.with(Segment::LineTo(Point::new(x, y)))
    }

    #[must_use]
    pub fn arc(
        self,
        center: Point,
        radius: f64,
        start_angle: f64,
        end_angle: f64,
        anticlockwise: bool,
    ) -> Self {
        self.with(Segment::Arc {
            center,
            radius,
            start_angle,
            end_angle,
            anticlockwise,
        })
    }

    #[must_use]
    pub fn arc_to(self, p1: Point, p2: Point, radius: f64) -> Self {
        self.with(Segment::ArcTo { p1, p2, radius })
    }

    #[must_use]
    pub fn quadratic_to(self, control: Point, end: Point) -> Self {
        self.with(Segment::QuadraticTo { control, end })
    }

    #[must_use]
    pub fn bezier_to(self, control1: Point, control2: Point, end: Point) -> Self {
        self.with(Segment::BezierTo {
            control1,
            control2,
            end,
        })
    }

    #[must_use]
    pub fn close(self) -> Self {
        self.with(Segment::Close)
    }

    #[must_use]
    pub fn with(mut self, segment: Segment) -> Self {
        self.push(segment);
        self
    }

    pub fn push(&mut self, segment: Segment) {
        self.components.push(PathComponent::new(segment));
    }

    pub fn start(&self) -> Option<Point> {
        self.start
    }

    pub fn components(&self) -> &[PathComponent] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.start.is_none() && self.components.is_empty()
    }

    pub fn point(&self, target: PathPoint) -> Option<Point> {
        match target {
            PathPoint::Start => self.start,
            PathPoint::Component { component, index } => self
                .components
                .get(component)?
                .segment
                .control_points()
                .get(index)
                .copied(),
        }
    }

    /// Every editable point: the start point first, then each component's
    /// points in order.
    pub fn control_points(&self) -> Vec<(PathPoint, Point)> {
        let mut out: Vec<(PathPoint, Point)> = self
            .start
            .map(|p| (PathPoint::Start, p))
            .into_iter()
            .collect();
        for (component, c) in self.components.iter().enumerate() {
            for (index, p) in c.segment.control_points().into_iter().enumerate() {
                out.push((PathPoint::Component { component, index }, p));
            }
        }
        out
    }

    /// Move one control point. Invalidates the owning component and
    /// notifies every later component whose pen position moved.
    pub fn set_point(&mut self, target: PathPoint, p: Point) -> Result<()> {
        if !p.is_finite() {
            return Err(StageError::invalid("path points must be finite"));
        }
        let before = self.pen_states();
        let changed = match target {
            PathPoint::Start => {
                let start = self
                    .start
                    .as_mut()
                    .ok_or_else(|| StageError::invalid("path has no start point"))?;
                *start = p;
                None
            }
            PathPoint::Component { component, index } => {
                let c = self.components.get_mut(component).ok_or_else(|| {
                    StageError::invalid(format!("path has no component {component}"))
                })?;
                c.segment.set_control_point(index, p)?;
                c.bounds.set(None);
                Some(component)
            }
        };
        let next = changed.map_or(0, |i| i + 1);
        // an ArcTo end depends on the pen before it, so a move can ripple
        // past the immediate successor
        let after = self.pen_states();
        for (c, (old, new)) in self.components.iter().zip(before.iter().zip(&after)).skip(next) {
            if old != new {
                c.previous_changed();
            }
        }
        Ok(())
    }

    fn pen_states(&self) -> Vec<PenState> {
        let mut states = Vec::with_capacity(self.components.len());
        let mut prev = self.start;
        let mut subpath_start = self.start;
        for c in &self.components {
            states.push(PenState {
                prev,
                subpath_start,
            });
            if let Segment::MoveTo(p) = c.segment {
                subpath_start = Some(p);
            }
            prev = c.segment.end_point(prev, subpath_start);
            if subpath_start.is_none() {
                subpath_start = prev;
            }
        }
        states
    }

    /// Cached bounds of component `i`.
    pub fn component_bounds(&self, i: usize) -> Option<Bounds> {
        let c = self.components.get(i)?;
        if let Some(b) = c.bounds.get() {
            return Some(b);
        }
        let pen = self.pen_states()[i];
        let b = c.segment.eval_bounds(pen.prev, pen.subpath_start);
        c.bounds.set(Some(b));
        Some(b)
    }

    /// Union of the start point and all component bounds, without any
    /// stroke margin.
    pub fn content_bounds(&self) -> Bounds {
        let pens = self.pen_states();
        let mut acc = self.start.map(|p| Bounds::new(p.x, p.y, 0.0, 0.0));
        for (c, pen) in self.components.iter().zip(pens) {
            let b = match c.bounds.get() {
                Some(b) => b,
                None => {
                    let b = c.segment.eval_bounds(pen.prev, pen.subpath_start);
                    c.bounds.set(Some(b));
                    b
                }
            };
            acc = Some(acc.map_or(b, |a| a.union(&b)));
        }
        acc.unwrap_or(Bounds::ZERO)
    }

    /// Where the pen starts for each component, for painters that need
    /// the resolved `ArcTo` tangents.
    pub fn pen_positions(&self) -> Vec<Option<Point>> {
        self.pen_states().into_iter().map(|s| s.prev).collect()
    }
}

impl Geometry for Path {
    fn eval_bounds(&self) -> Bounds {
        self.content_bounds()
    }

    fn set_bounds(&mut self, new: &Bounds) -> Result<()> {
        let old = self.content_bounds();
        if let Some(start) = self.start.as_mut() {
            *start = old.map_point(*start, new);
        }
        for c in &mut self.components {
            c.segment.remap(&old, new);
            c.bounds.set(None);
        }
        Ok(())
    }

    fn can_reach(&self, new: &Bounds) -> bool {
        self.content_bounds().can_map_onto(new)
    }

    fn validate(&self) -> Result<()> {
        if self.start.is_some_and(|p| !p.is_finite()) {
            return Err(StageError::invalid("path start must be finite"));
        }
        self.components.iter().try_for_each(|c| c.segment.validate())
    }
}
