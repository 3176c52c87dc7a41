//! Shape controllers: grab handles, hit testing, and drag application.
//!
//! A controller is a stateless strategy picked per shape kind when the shape
//! is built. It derives handles from the shape's bounds, maps a pointer
//! through the shape's inverse global transform to find the handle under it,
//! and turns a drag (measured from a saved [`Snapshot`]) into a mutation.

use crate::error::Result;
use crate::geom::{Bounds, Point, Transform};
use crate::id::ShapeId;
use crate::kinds::ShapeKind;
use crate::path::PathPoint;
use crate::scene::Scene;
use crate::shape::Shape;
use std::f64::consts::{FRAC_PI_2, PI};
use std::fmt;

/// Distance from the right edge to the rotate handle.
pub const ROTATE_HANDLE_OFFSET: f64 = 50.0;

// ─── Handles ─────────────────────────────────────────────────────────────

/// The eight resize handles, clockwise from the top edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl ResizeDirection {
    pub const ALL: [ResizeDirection; 8] = [
        ResizeDirection::N,
        ResizeDirection::NE,
        ResizeDirection::E,
        ResizeDirection::SE,
        ResizeDirection::S,
        ResizeDirection::SW,
        ResizeDirection::W,
        ResizeDirection::NW,
    ];

    pub fn cursor(self) -> &'static str {
        match self {
            ResizeDirection::N => "n-resize",
            ResizeDirection::NE => "ne-resize",
            ResizeDirection::E => "e-resize",
            ResizeDirection::SE => "se-resize",
            ResizeDirection::S => "s-resize",
            ResizeDirection::SW => "sw-resize",
            ResizeDirection::W => "w-resize",
            ResizeDirection::NW => "nw-resize",
        }
    }

    /// Where this handle sits on `b`.
    pub fn anchor(self, b: &Bounds) -> Point {
        let (l, cx, r) = (b.left(), b.center_x(), b.right());
        let (t, cy, btm) = (b.top(), b.center_y(), b.bottom());
        match self {
            ResizeDirection::N => Point::new(cx, t),
            ResizeDirection::NE => Point::new(r, t),
            ResizeDirection::E => Point::new(r, cy),
            ResizeDirection::SE => Point::new(r, btm),
            ResizeDirection::S => Point::new(cx, btm),
            ResizeDirection::SW => Point::new(l, btm),
            ResizeDirection::W => Point::new(l, cy),
            ResizeDirection::NW => Point::new(l, t),
        }
    }

    /// Drag the edges named by this direction by `(dx, dy)`; the opposite
    /// edges stay put. The result may have negative extents.
    pub fn resize(self, saved: &Bounds, dx: f64, dy: f64) -> Bounds {
        let mut b = *saved;
        let (north, east, south, west) = match self {
            ResizeDirection::N => (true, false, false, false),
            ResizeDirection::NE => (true, true, false, false),
            ResizeDirection::E => (false, true, false, false),
            ResizeDirection::SE => (false, true, true, false),
            ResizeDirection::S => (false, false, true, false),
            ResizeDirection::SW => (false, false, true, true),
            ResizeDirection::W => (false, false, false, true),
            ResizeDirection::NW => (true, false, false, true),
        };
        if north {
            b.y += dy;
            b.height -= dy;
        }
        if south {
            b.height += dy;
        }
        if west {
            b.x += dx;
            b.width -= dx;
        }
        if east {
            b.width += dx;
        }
        b
    }
}

/// What a grab does.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitKind {
    Move,
    Resize(ResizeDirection),
    Rotate,
    /// Drag one path point.
    Control(PathPoint),
}

impl HitKind {
    pub fn cursor(self) -> &'static str {
        match self {
            HitKind::Move => "move",
            HitKind::Resize(dir) => dir.cursor(),
            HitKind::Rotate => "grab",
            HitKind::Control(_) => "crosshair",
        }
    }
}

/// A grab handle in the shape's local space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPoint {
    pub point: Point,
    pub kind: HitKind,
    /// Position in the shape's control point list.
    pub index: usize,
}

/// Outcome of a hit test against one shape.
#[derive(Debug, Clone, PartialEq)]
pub struct HitInfo {
    pub shape: ShapeId,
    pub kind: HitKind,
    pub index: Option<usize>,
    pub cursor: &'static str,
    pub control: Option<ControlPoint>,
}

/// State captured at gesture start so every drag step is measured from the
/// same origin.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub bounds: Bounds,
    pub rotation: f64,
    pub translation: Point,
    /// Global to local space, frozen at capture.
    pub to_local: Transform,
    /// Global to parent child space, frozen at capture.
    pub to_parent: Transform,
    /// The grabbed path point's position, for path-control hits.
    pub down_point: Option<Point>,
}

/// Eight resize handles then the rotate handle, numbered from `first_index`.
pub fn box_control_points(b: &Bounds, first_index: usize) -> Vec<ControlPoint> {
    let mut points: Vec<ControlPoint> = ResizeDirection::ALL
        .iter()
        .enumerate()
        .map(|(i, dir)| ControlPoint {
            point: dir.anchor(b),
            kind: HitKind::Resize(*dir),
            index: first_index + i,
        })
        .collect();
    points.push(ControlPoint {
        point: Point::new(b.right() + ROTATE_HANDLE_OFFSET, b.center_y()),
        kind: HitKind::Rotate,
        index: first_index + ResizeDirection::ALL.len(),
    });
    points
}

/// Absolute angle of the vector `(dx, dy)`. Straight down is `π/2`,
/// straight up `-π/2`. `None` for a zero vector.
pub fn bearing(dx: f64, dy: f64) -> Option<f64> {
    if dx == 0.0 {
        return match dy.partial_cmp(&0.0)? {
            std::cmp::Ordering::Greater => Some(FRAC_PI_2),
            std::cmp::Ordering::Less => Some(-FRAC_PI_2),
            std::cmp::Ordering::Equal => None,
        };
    }
    let theta = (dy / dx).atan();
    Some(if dx < 0.0 { theta + PI } else { theta })
}

fn delta(space: &Transform, down: Point, curr: Point) -> (f64, f64) {
    let a = space.apply_point(down);
    let b = space.apply_point(curr);
    (b.x - a.x, b.y - a.y)
}

// ─── Controller trait ────────────────────────────────────────────────────

pub trait ShapeController: fmt::Debug {
    /// Handles in local space. Called through
    /// [`Shape::control_points`], which caches the result.
    fn eval_control_points(&self, shape: &Shape) -> Vec<ControlPoint> {
        box_control_points(&shape.logical_bounds(), 0)
    }

    /// Which handle, if any, lies under the global point `(x, y)`.
    ///
    /// Handles are tested last-first so later ones win ties; a point inside
    /// the bounds but on no handle is a move hit.
    fn hit_info(&self, scene: &Scene, id: ShapeId, x: f64, y: f64) -> Result<Option<HitInfo>> {
        let shape = scene.get(id)?;
        let local = scene.global_transform(id)?.apply(x, y);
        let radius = shape.control_radius();
        if let Some(cp) = shape
            .control_points()
            .iter()
            .rev()
            .find(|cp| cp.point.is_within(local, radius))
        {
            return Ok(Some(HitInfo {
                shape: id,
                kind: cp.kind,
                index: Some(cp.index),
                cursor: cp.kind.cursor(),
                control: Some(*cp),
            }));
        }
        if shape.logical_bounds().contains_point(local.x, local.y) {
            return Ok(Some(HitInfo {
                shape: id,
                kind: HitKind::Move,
                index: None,
                cursor: HitKind::Move.cursor(),
                control: None,
            }));
        }
        Ok(None)
    }

    fn snapshot_for(&self, scene: &Scene, id: ShapeId, _hit: Option<&HitInfo>) -> Result<Snapshot> {
        let shape = scene.get(id)?;
        Ok(Snapshot {
            bounds: shape.logical_bounds(),
            rotation: shape.rotation(),
            translation: shape.translation(),
            to_local: scene.global_transform(id)?,
            to_parent: scene.parent_space(id)?,
            down_point: None,
        })
    }

    /// Replay the drag from `down` to `curr` (global space) against the
    /// saved state. Returns whether the shape changed.
    fn apply_hit_changes(
        &self,
        scene: &mut Scene,
        id: ShapeId,
        hit: &HitInfo,
        saved: &Snapshot,
        down: Point,
        curr: Point,
    ) -> Result<bool> {
        match hit.kind {
            HitKind::Move => {
                let (dx, dy) = delta(&saved.to_parent, down, curr);
                scene.edit(id)?.set_bounds(saved.bounds.moved(dx, dy))
            }
            HitKind::Resize(dir) => {
                let (dx, dy) = delta(&saved.to_local, down, curr);
                scene.edit(id)?.set_bounds(dir.resize(&saved.bounds, dx, dy))
            }
            HitKind::Rotate => {
                let pointer = saved.to_parent.apply_point(curr);
                let pivot = saved
                    .bounds
                    .center()
                    .translated(saved.translation.x, saved.translation.y);
                match bearing(pointer.x - pivot.x, pointer.y - pivot.y) {
                    Some(theta) => scene.edit(id)?.rotate_to(theta),
                    None => Ok(false),
                }
            }
            HitKind::Control(_) => Ok(false),
        }
    }
}

/// Controller for every kind edited through its bounding box.
#[derive(Debug)]
pub struct BoxController;

impl ShapeController for BoxController {}

/// Adds one handle per path point ahead of the box handles.
#[derive(Debug)]
pub struct PathController;

impl ShapeController for PathController {
    fn eval_control_points(&self, shape: &Shape) -> Vec<ControlPoint> {
        let ShapeKind::Path(path) = shape.kind() else {
            return box_control_points(&shape.logical_bounds(), 0);
        };
        let mut points: Vec<ControlPoint> = path
            .control_points()
            .into_iter()
            .enumerate()
            .map(|(index, (target, point))| ControlPoint {
                point,
                kind: HitKind::Control(target),
                index,
            })
            .collect();
        let handles = box_control_points(&shape.logical_bounds(), points.len());
        points.extend(handles);
        points
    }

    fn snapshot_for(&self, scene: &Scene, id: ShapeId, hit: Option<&HitInfo>) -> Result<Snapshot> {
        let mut snapshot = BOX_CONTROLLER.snapshot_for(scene, id, hit)?;
        if let Some(hit) = hit
            && hit.shape == id
            && let HitKind::Control(target) = hit.kind
            && let ShapeKind::Path(path) = scene.get(id)?.kind()
        {
            snapshot.down_point = path.point(target);
        }
        Ok(snapshot)
    }

    fn apply_hit_changes(
        &self,
        scene: &mut Scene,
        id: ShapeId,
        hit: &HitInfo,
        saved: &Snapshot,
        down: Point,
        curr: Point,
    ) -> Result<bool> {
        let HitKind::Control(target) = hit.kind else {
            return BOX_CONTROLLER.apply_hit_changes(scene, id, hit, saved, down, curr);
        };
        let Some(origin) = saved.down_point else {
            return Ok(false);
        };
        let (dx, dy) = delta(&saved.to_local, down, curr);
        scene
            .edit(id)?
            .set_path_point(target, origin.translated(dx, dy))
    }
}

pub static BOX_CONTROLLER: BoxController = BoxController;
pub static PATH_CONTROLLER: PathController = PathController;
