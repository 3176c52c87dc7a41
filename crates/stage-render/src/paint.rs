//! Scene → paint-context drawing commands.
//!
//! Each shape paints in four steps: apply its local transform, apply its
//! styles, trace and fill/stroke its outline, and revert the transform.
//! Selection overlays are drawn in the same local space so they line up
//! with hit testing.

use crate::context::PaintContext;
use kurbo::{BezPath, PathEl};
use stage_core::controller::HitKind;
use stage_core::{
    Color, Paint, Path, Point, Result, Scene, Segment, Shape, ShapeId, ShapeKind, StyleRole,
};
use std::f64::consts::TAU;

static DEFAULT_STROKE: Paint = Paint::Solid(Color::BLACK);
static OUTLINE: Paint = Paint::Solid(Color::BLACK);
const OUTLINE_WIDTH: f64 = 0.5;
static HANDLE_FILL: Paint = Paint::Solid(Color::rgba(1.0, 1.0, 0.0, 1.0));
static ROTATE_FILL: Paint = Paint::Solid(Color::rgba(0.0, 0.5, 0.0, 1.0));
static ROTATE_STROKE: Paint = Paint::Solid(Color::rgba(0.0, 0.0, 1.0, 1.0));

// ─── Transforms ──────────────────────────────────────────────────────────

/// Push the shape's local transform. Returns whether anything was pushed,
/// to be handed back to [`revert_transforms`].
pub fn apply_transforms(ctx: &mut dyn PaintContext, shape: &Shape) -> bool {
    if !shape.has_transform() {
        return false;
    }
    ctx.save();
    ctx.transform(shape.local_transform().affine().as_coeffs());
    true
}

pub fn revert_transforms(ctx: &mut dyn PaintContext, applied: bool) {
    if applied {
        ctx.restore();
    }
}

// ─── Styles ──────────────────────────────────────────────────────────────

/// Install fill and stroke state. Stroke state is only touched when the
/// shape strokes at all; an unset stroke paint falls back to black.
pub fn apply_styles(ctx: &mut dyn PaintContext, shape: &Shape) {
    let bounds = shape.logical_bounds();
    if let Some(fill) = shape.fill_style() {
        ctx.set_paint(StyleRole::Fill, fill, &bounds);
    }
    if shape.line_width() <= 0.0 {
        return;
    }
    let stroke = shape.stroke_style().unwrap_or(&DEFAULT_STROKE);
    ctx.set_paint(StyleRole::Stroke, stroke, &bounds);
    ctx.set_line_width(shape.line_width());
    if let Some(cap) = shape.line_cap() {
        ctx.set_line_cap(cap);
    }
    if let Some(join) = shape.line_join() {
        ctx.set_line_join(join);
    }
    if let Some(limit) = shape.miter_limit() {
        ctx.set_miter_limit(limit);
    }
    ctx.set_line_dash(shape.line_dash());
    ctx.set_line_dash_offset(shape.line_dash_offset());
}

// ─── Outlines ────────────────────────────────────────────────────────────

/// Closed polygon outline for the straight-edged kinds.
pub fn outline(kind: &ShapeKind) -> Option<BezPath> {
    match kind {
        ShapeKind::Triangle(t) => Some(polygon(&t.points)),
        ShapeKind::Plus(p) => Some(polygon(&p.outline())),
        ShapeKind::Arrow(a) => Some(polygon(&a.outline())),
        _ => None,
    }
}

fn polygon(points: &[Point]) -> BezPath {
    let mut path = BezPath::new();
    let mut iter = points.iter();
    if let Some(first) = iter.next() {
        path.move_to(kurbo::Point::from(*first));
        for p in iter {
            path.line_to(kurbo::Point::from(*p));
        }
        path.close_path();
    }
    path
}

fn replay(ctx: &mut dyn PaintContext, path: &BezPath) {
    ctx.begin_path();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => ctx.move_to(p.x, p.y),
            PathEl::LineTo(p) => ctx.line_to(p.x, p.y),
            PathEl::QuadTo(c, p) => ctx.quadratic_curve_to(c.x, c.y, p.x, p.y),
            PathEl::CurveTo(c1, c2, p) => ctx.bezier_curve_to(c1.x, c1.y, c2.x, c2.y, p.x, p.y),
            PathEl::ClosePath => ctx.close_path(),
        }
    }
}

fn trace_path(ctx: &mut dyn PaintContext, path: &Path) {
    ctx.begin_path();
    if let Some(start) = path.start() {
        ctx.move_to(start.x, start.y);
    }
    for component in path.components() {
        match *component.segment() {
            Segment::MoveTo(p) => ctx.move_to(p.x, p.y),
            Segment::LineTo(p) => ctx.line_to(p.x, p.y),
            Segment::Arc {
                center,
                radius,
                start_angle,
                end_angle,
                anticlockwise,
            } => ctx.arc(center.x, center.y, radius, start_angle, end_angle, anticlockwise),
            Segment::ArcTo { p1, p2, radius } => ctx.arc_to(p1.x, p1.y, p2.x, p2.y, radius),
            Segment::QuadraticTo { control, end } => {
                ctx.quadratic_curve_to(control.x, control.y, end.x, end.y)
            }
            Segment::BezierTo {
                control1,
                control2,
                end,
            } => ctx.bezier_curve_to(control1.x, control1.y, control2.x, control2.y, end.x, end.y),
            Segment::Close => ctx.close_path(),
        }
    }
}

// ─── Drawing ─────────────────────────────────────────────────────────────

/// Trace the shape's outline in local space and fill/stroke it with the
/// current styles. Containers only draw a hairline frame when non-empty.
pub fn draw(ctx: &mut dyn PaintContext, shape: &Shape) {
    match shape.kind() {
        ShapeKind::Circle(c) => {
            ctx.begin_path();
            if c.is_round() {
                ctx.arc(c.center.x, c.center.y, c.radius_x, 0.0, TAU, false);
            } else {
                ctx.ellipse(
                    c.center.x, c.center.y, c.radius_x, c.radius_y, 0.0, 0.0, TAU, false,
                );
            }
        }
        ShapeKind::Square(s) => {
            ctx.begin_path();
            ctx.rect(s.origin.x, s.origin.y, s.width, s.height);
        }
        ShapeKind::Ellipse(e) => {
            let c = e.frame.center();
            ctx.begin_path();
            ctx.ellipse(
                c.x,
                c.y,
                e.frame.width / 2.0,
                e.frame.height / 2.0,
                0.0,
                0.0,
                TAU,
                false,
            );
        }
        ShapeKind::Path(p) => trace_path(ctx, p),
        ShapeKind::Group(g) => {
            if !shape.children().is_empty() {
                let f = g.frame;
                ctx.save();
                ctx.set_paint(StyleRole::Stroke, &OUTLINE, &f);
                ctx.set_line_width(OUTLINE_WIDTH);
                ctx.stroke_rect(f.x, f.y, f.width, f.height);
                ctx.restore();
            }
            return;
        }
        ShapeKind::Layer(_) => return,
        kind => match outline(kind) {
            Some(path) => replay(ctx, &path),
            None => return,
        },
    }
    if shape.fill_style().is_some() {
        ctx.fill();
    }
    if shape.line_width() > 0.0 {
        ctx.stroke();
    }
}

/// Selection overlay in local space: the bounds outline, the resize
/// handles, the rotate knob, and path points.
pub fn draw_controls(ctx: &mut dyn PaintContext, shape: &Shape) {
    let b = shape.logical_bounds();
    let r = shape.control_radius();
    ctx.save();
    ctx.set_line_dash(&[]);
    ctx.set_paint(StyleRole::Stroke, &OUTLINE, &b);
    ctx.set_line_width(OUTLINE_WIDTH);
    ctx.stroke_rect(b.x, b.y, b.width, b.height);

    for cp in shape.control_points().iter().rev() {
        let p = cp.point;
        match cp.kind {
            HitKind::Resize(_) => {
                ctx.set_paint(StyleRole::Fill, &HANDLE_FILL, &b);
                ctx.fill_rect(p.x - r, p.y - r, 2.0 * r, 2.0 * r);
                ctx.stroke_rect(p.x - r, p.y - r, 2.0 * r, 2.0 * r);
            }
            HitKind::Rotate => {
                ctx.begin_path();
                ctx.arc(p.x, p.y, r, 0.0, TAU, false);
                ctx.set_paint(StyleRole::Fill, &ROTATE_FILL, &b);
                ctx.fill();
                ctx.begin_path();
                ctx.move_to(b.right(), b.center_y());
                ctx.line_to(p.x - r, p.y);
                ctx.set_paint(StyleRole::Stroke, &ROTATE_STROKE, &b);
                ctx.stroke();
                ctx.set_paint(StyleRole::Stroke, &OUTLINE, &b);
            }
            HitKind::Control(_) => {
                ctx.begin_path();
                ctx.arc(p.x, p.y, r, 0.0, TAU, false);
                ctx.set_paint(StyleRole::Fill, &HANDLE_FILL, &b);
                ctx.fill();
                ctx.stroke();
            }
            HitKind::Move => {}
        }
    }
    ctx.restore();
}

/// Paint one shape and, for groups, its children. `with_controls` picks
/// the shapes that get a selection overlay.
pub fn paint_shape(
    ctx: &mut dyn PaintContext,
    scene: &Scene,
    id: ShapeId,
    with_controls: &dyn Fn(ShapeId) -> bool,
) -> Result<()> {
    let shape = scene.get(id)?;
    if !shape.is_visible() {
        return Ok(());
    }
    log::trace!("PAINT {} {id}", shape.class_name());
    let applied = apply_transforms(ctx, shape);
    ctx.save();
    apply_styles(ctx, shape);
    draw(ctx, shape);
    ctx.restore();

    if let ShapeKind::Group(g) = shape.kind()
        && !shape.children().is_empty()
    {
        ctx.save();
        ctx.translate(g.frame.x, g.frame.y);
        for child in shape.children() {
            paint_shape(ctx, scene, *child, with_controls)?;
        }
        ctx.restore();
    }
    if with_controls(id) {
        draw_controls(ctx, shape);
    }
    revert_transforms(ctx, applied);
    Ok(())
}

/// Paint every layer bottom to top.
pub fn paint_scene(
    ctx: &mut dyn PaintContext,
    scene: &Scene,
    with_controls: &dyn Fn(ShapeId) -> bool,
) -> Result<()> {
    for layer in scene.layers() {
        for child in scene.children(*layer)? {
            paint_shape(ctx, scene, *child, with_controls)?;
        }
    }
    Ok(())
}
