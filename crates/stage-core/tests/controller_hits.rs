//! Integration tests: hit testing and snapshot-based drags.
//!
//! Each drag captures a snapshot at pointer-down and replays the whole
//! movement from it, the way an interactive gesture does.

use pretty_assertions::assert_eq;
use stage_core::{
    Bounds, Change, Circle, EventKind, Group, HitKind, Path, PathPoint, Point, Property,
    PropertyValue, ResizeDirection, Scene, ShapeConfig, ShapeId, Square,
};
use std::cell::RefCell;
use std::f64::consts::FRAC_PI_2;
use std::rc::Rc;

fn attach(scene: &mut Scene, kind: impl Into<stage_core::ShapeKind>) -> ShapeId {
    let id = scene.create(kind, ShapeConfig::default()).unwrap();
    scene.add(id).unwrap();
    id
}

/// Hit at `down`, snapshot, then drag to `curr`.
fn drag(scene: &mut Scene, id: ShapeId, down: Point, curr: Point) -> bool {
    let controller = scene.get(id).unwrap().controller();
    let hit = controller
        .hit_info(scene, id, down.x, down.y)
        .unwrap()
        .expect("nothing under the pointer");
    let saved = controller.snapshot_for(scene, id, Some(&hit)).unwrap();
    controller
        .apply_hit_changes(scene, id, &hit, &saved, down, curr)
        .unwrap()
}

// ─── Hit testing ─────────────────────────────────────────────────────────

#[test]
fn handles_win_over_body() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0));
    let controller = scene.get(id).unwrap().controller();

    let hit = controller.hit_info(&scene, id, 101.0, 52.0).unwrap().unwrap();
    assert_eq!(hit.kind, HitKind::Resize(ResizeDirection::E));
    assert_eq!(hit.cursor, "e-resize");

    let hit = controller.hit_info(&scene, id, 40.0, 40.0).unwrap().unwrap();
    assert_eq!(hit.kind, HitKind::Move);
    assert_eq!(hit.index, None);

    let hit = controller.hit_info(&scene, id, 150.0, 50.0).unwrap().unwrap();
    assert_eq!(hit.kind, HitKind::Rotate);

    assert_eq!(controller.hit_info(&scene, id, 300.0, 300.0).unwrap(), None);
}

#[test]
fn hit_testing_respects_rotation() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0));
    scene.edit(id).unwrap().rotate_to(FRAC_PI_2).unwrap();
    let controller = scene.get(id).unwrap().controller();
    // the east handle now sits below the center
    let hit = controller.hit_info(&scene, id, 50.0, 100.0).unwrap().unwrap();
    assert_eq!(hit.kind, HitKind::Resize(ResizeDirection::E));
}

// ─── Resize ──────────────────────────────────────────────────────────────

#[test]
fn east_handle_drag_widens_circle() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Circle::new(0.0, 0.0, 20.0));
    assert!(drag(
        &mut scene,
        id,
        Point::new(20.0, 0.0),
        Point::new(50.0, 0.0)
    ));
    assert_eq!(
        scene.logical_bounds(id).unwrap(),
        Bounds::new(-20.0, -20.0, 70.0, 40.0)
    );
}

#[test]
fn drag_is_measured_from_snapshot() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0));
    let controller = scene.get(id).unwrap().controller();
    let down = Point::new(100.0, 50.0);
    let hit = controller.hit_info(&scene, id, down.x, down.y).unwrap().unwrap();
    let saved = controller.snapshot_for(&scene, id, Some(&hit)).unwrap();

    for x in [110.0, 120.0, 130.0] {
        controller
            .apply_hit_changes(&mut scene, id, &hit, &saved, down, Point::new(x, 50.0))
            .unwrap();
    }
    assert_eq!(scene.logical_bounds(id).unwrap().width, 130.0);
}

#[test]
fn resize_stops_at_minimum_size() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0));
    assert!(!drag(
        &mut scene,
        id,
        Point::new(100.0, 50.0),
        Point::new(5.0, 50.0)
    ));
    assert_eq!(scene.logical_bounds(id).unwrap().width, 100.0);
}

// ─── Move ────────────────────────────────────────────────────────────────

#[test]
fn body_drag_moves_bounds() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0));
    assert!(drag(
        &mut scene,
        id,
        Point::new(50.0, 50.0),
        Point::new(60.0, 45.0)
    ));
    assert_eq!(
        scene.logical_bounds(id).unwrap(),
        Bounds::new(10.0, -5.0, 100.0, 100.0)
    );
}

#[test]
fn move_inside_group_uses_group_space() {
    let mut scene = Scene::new();
    let group = attach(&mut scene, Group::new(Bounds::new(200.0, 200.0, 100.0, 100.0)));
    let child = scene
        .create(Square::new(10.0, 10.0, 20.0), ShapeConfig::default())
        .unwrap();
    scene.add_to(group, child).unwrap();

    assert!(drag(
        &mut scene,
        child,
        Point::new(220.0, 220.0),
        Point::new(230.0, 240.0)
    ));
    assert_eq!(
        scene.logical_bounds(child).unwrap(),
        Bounds::new(20.0, 30.0, 20.0, 20.0)
    );
    assert_eq!(
        scene.global_bounds(child).unwrap(),
        Bounds::new(220.0, 230.0, 20.0, 20.0)
    );
}

// ─── Rotate ──────────────────────────────────────────────────────────────

#[test]
fn rotate_handle_sets_absolute_bearing() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0));
    scene.edit(id).unwrap().rotate_to(0.3).unwrap();

    let requested = Rc::new(RefCell::new(None));
    let sink = Rc::clone(&requested);
    scene
        .hub_mut()
        .before(EventKind::PropertyChanged(Property::Rotation), move |e| {
            if let Change::PropertyChanged {
                new: PropertyValue::Number(theta),
                ..
            } = e.change()
            {
                *sink.borrow_mut() = Some(*theta);
            }
            Ok(true)
        });

    // rotate handle of the rotated square, in global space
    let forward = scene.global_transform(id).unwrap().inverse();
    let handle = forward.apply(150.0, 50.0);
    assert!(drag(&mut scene, id, handle, Point::new(50.0, 250.0)));

    let theta = requested.borrow().expect("rotate_to not reached");
    assert!((theta - FRAC_PI_2).abs() < 1e-9, "got {theta}");
    assert!((scene.get(id).unwrap().rotation() - FRAC_PI_2).abs() < 1e-9);
}

#[test]
fn pointer_on_pivot_leaves_rotation() {
    let mut scene = Scene::new();
    let id = attach(&mut scene, Square::new(0.0, 0.0, 100.0));
    assert!(!drag(
        &mut scene,
        id,
        Point::new(150.0, 50.0),
        Point::new(50.0, 50.0)
    ));
    assert_eq!(scene.get(id).unwrap().rotation(), 0.0);
}

// ─── Path control points ─────────────────────────────────────────────────

#[test]
fn path_point_drag_moves_only_that_point() {
    let mut scene = Scene::new();
    let path = Path::starting_at(0.0, 0.0)
        .line_to(70.0, 30.0)
        .line_to(100.0, 100.0);
    let id = scene
        .create(path, ShapeConfig::default().line_width(0.0))
        .unwrap();
    scene.add(id).unwrap();

    let controller = scene.get(id).unwrap().controller();
    let hit = controller.hit_info(&scene, id, 71.0, 31.0).unwrap().unwrap();
    let target = PathPoint::Component {
        component: 0,
        index: 0,
    };
    assert_eq!(hit.kind, HitKind::Control(target));
    assert_eq!(hit.cursor, "crosshair");

    let saved = controller.snapshot_for(&scene, id, Some(&hit)).unwrap();
    assert_eq!(saved.down_point, Some(Point::new(70.0, 30.0)));
    controller
        .apply_hit_changes(
            &mut scene,
            id,
            &hit,
            &saved,
            Point::new(71.0, 31.0),
            Point::new(91.0, 21.0),
        )
        .unwrap();

    let shape = scene.get(id).unwrap();
    let stage_core::ShapeKind::Path(path) = shape.kind() else {
        panic!("not a path");
    };
    assert_eq!(path.point(target), Some(Point::new(90.0, 20.0)));
    assert_eq!(path.point(PathPoint::Start), Some(Point::ORIGIN));
}
