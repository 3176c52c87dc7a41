//! Integration tests: scene → recorded paint commands.
//!
//! Paints small scenes into a `RecordingContext` and checks the command
//! stream for the calls a canvas would receive.

use pretty_assertions::assert_eq;
use stage_core::{
    Bounds, Circle, Color, Group, Paint, Path, Point, Scene, ShapeConfig, ShapeId, Square,
    StyleRole, Triangle,
};
use stage_render::{DrawOp, RecordingContext, paint_scene, paint_shape};

fn none(_: ShapeId) -> bool {
    false
}

fn attach(scene: &mut Scene, kind: impl Into<stage_core::ShapeKind>, config: ShapeConfig) -> ShapeId {
    let id = scene.create(kind, config).unwrap();
    scene.add(id).unwrap();
    id
}

// ─── Plain shapes ────────────────────────────────────────────────────────

#[test]
fn unfilled_square_is_stroked_in_black() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(5.0, 5.0, 20.0), ShapeConfig::default());
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &none).unwrap();

    assert!(ctx.ops().contains(&DrawOp::Rect(5.0, 5.0, 20.0, 20.0)));
    assert!(ctx.ops().contains(&DrawOp::SetPaint {
        role: StyleRole::Stroke,
        paint: Paint::Solid(Color::BLACK),
        bounds: Bounds::new(5.0, 5.0, 20.0, 20.0),
    }));
    assert_eq!(ctx.count(|op| *op == DrawOp::Stroke), 1);
    assert_eq!(ctx.count(|op| *op == DrawOp::Fill), 0);
    assert_eq!(ctx.count(|op| matches!(op, DrawOp::Transform(_))), 0);
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn filled_circle_without_stroke() {
    let mut scene = Scene::new();
    let config = ShapeConfig::default()
        .fill(Paint::Solid(Color::WHITE))
        .line_width(0.0);
    let id = attach(&mut scene, Circle::new(50.0, 50.0, 10.0), config);
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &none).unwrap();

    assert!(ctx.ops().iter().any(|op| matches!(
        op,
        DrawOp::Arc { x, y, radius, .. } if *x == 50.0 && *y == 50.0 && *radius == 10.0
    )));
    assert_eq!(ctx.count(|op| *op == DrawOp::Fill), 1);
    assert_eq!(ctx.count(|op| *op == DrawOp::Stroke), 0);
    assert_eq!(ctx.count(|op| matches!(op, DrawOp::LineWidth(_))), 0);
}

#[test]
fn stretched_circle_draws_an_ellipse() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Circle::new(0.0, 0.0, 20.0), ShapeConfig::default());
    scene
        .edit(id)
        .unwrap()
        .set_bounds(Bounds::new(-20.0, -20.0, 70.0, 40.0))
        .unwrap();
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &none).unwrap();
    assert!(ctx.ops().contains(&DrawOp::Ellipse {
        x: 15.0,
        y: 0.0,
        radius_x: 35.0,
        radius_y: 20.0,
    }));
}

#[test]
fn triangle_traces_a_closed_polygon() {
    let mut scene = Scene::new();
    let id = attach(
        &mut scene,
        Triangle::new(
            Point::new(0.0, 10.0),
            Point::new(5.0, 0.0),
            Point::new(10.0, 10.0),
        ),
        ShapeConfig::default(),
    );
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &none).unwrap();
    let ops = ctx.ops();
    let start = ops
        .iter()
        .position(|op| *op == DrawOp::BeginPath)
        .expect("no path");
    assert_eq!(
        &ops[start..start + 5],
        &[
            DrawOp::BeginPath,
            DrawOp::MoveTo(0.0, 10.0),
            DrawOp::LineTo(5.0, 0.0),
            DrawOp::LineTo(10.0, 10.0),
            DrawOp::ClosePath,
        ]
    );
}

#[test]
fn paths_replay_their_segments() {
    let mut scene = Scene::new();
    let path = Path::starting_at(0.0, 0.0)
        .line_to(10.0, 0.0)
        .quadratic_to(Point::new(20.0, 0.0), Point::new(20.0, 10.0))
        .arc_to(Point::new(20.0, 30.0), Point::new(0.0, 30.0), 5.0)
        .close();
    let id = attach(&mut scene, path, ShapeConfig::default());
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &none).unwrap();
    let ops = ctx.ops();
    assert!(ops.contains(&DrawOp::MoveTo(0.0, 0.0)));
    assert!(ops.contains(&DrawOp::QuadraticCurveTo(20.0, 0.0, 20.0, 10.0)));
    assert!(ops.contains(&DrawOp::ArcTo {
        x1: 20.0,
        y1: 30.0,
        x2: 0.0,
        y2: 30.0,
        radius: 5.0,
    }));
    assert!(ops.contains(&DrawOp::ClosePath));
}

#[test]
fn invisible_shapes_are_skipped() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::default(), ShapeConfig::default());
    scene.edit(id).unwrap().set_visible(false).unwrap();
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &none).unwrap();
    assert!(ctx.ops().is_empty());
}

// ─── Transforms ──────────────────────────────────────────────────────────

#[test]
fn transformed_shape_pushes_its_local_transform() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 10.0), ShapeConfig::default());
    scene.edit(id).unwrap().move_to(30.0, 40.0).unwrap();
    scene.edit(id).unwrap().rotate_to(0.5).unwrap();

    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &none).unwrap();
    let expected = scene
        .get(id)
        .unwrap()
        .local_transform()
        .affine()
        .as_coeffs();
    assert_eq!(ctx.ops()[0], DrawOp::Save);
    assert_eq!(ctx.ops()[1], DrawOp::Transform(expected));
    assert_eq!(ctx.ops().last(), Some(&DrawOp::Restore));
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn group_children_paint_in_group_space() {
    let mut scene = Scene::new();
    let group = attach(
        &mut scene,
        Group::new(Bounds::new(100.0, 50.0, 60.0, 60.0)),
        ShapeConfig::default(),
    );
    let child = scene
        .create(Square::new(0.0, 0.0, 20.0), ShapeConfig::default())
        .unwrap();
    scene.add_to(group, child).unwrap();

    let mut ctx = RecordingContext::new();
    paint_scene(&mut ctx, &scene, &none).unwrap();
    let ops = ctx.ops();
    let frame = ops
        .iter()
        .position(|op| *op == DrawOp::StrokeRect(100.0, 50.0, 60.0, 60.0))
        .expect("group frame not drawn");
    let shift = ops
        .iter()
        .position(|op| *op == DrawOp::Translate(100.0, 50.0))
        .expect("children not shifted");
    let rect = ops
        .iter()
        .position(|op| *op == DrawOp::Rect(0.0, 0.0, 20.0, 20.0))
        .expect("child not drawn");
    assert!(frame < shift && shift < rect);
    assert_eq!(ctx.depth(), 0);
}

// ─── Controls ────────────────────────────────────────────────────────────

#[test]
fn selected_shapes_get_handles() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0), ShapeConfig::default());
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &|s| s == id).unwrap();

    assert_eq!(ctx.count(|op| matches!(op, DrawOp::FillRect(..))), 8);
    assert!(ctx.ops().contains(&DrawOp::FillRect(95.0, 45.0, 10.0, 10.0)));
    assert!(ctx.ops().iter().any(|op| matches!(
        op,
        DrawOp::Arc { x, y, .. } if *x == 150.0 && *y == 50.0
    )));
    assert!(ctx.ops().contains(&DrawOp::StrokeRect(0.0, 0.0, 100.0, 100.0)));
    assert_eq!(ctx.depth(), 0);
}

#[test]
fn path_controls_mark_every_point() {
    let mut scene = Scene::new();
    let path = Path::starting_at(0.0, 0.0)
        .line_to(50.0, 20.0)
        .line_to(100.0, 100.0);
    let id = attach(&mut scene, path, ShapeConfig::default().line_width(0.0));
    let mut ctx = RecordingContext::new();
    paint_shape(&mut ctx, &scene, id, &|_| true).unwrap();
    // three path points plus the rotate knob
    assert_eq!(ctx.count(|op| matches!(op, DrawOp::Arc { .. })), 4);
}
