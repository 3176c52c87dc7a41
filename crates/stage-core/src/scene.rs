//! The scene: shape arena, layers, and the gated mutation protocol.
//!
//! Every observable change follows the same steps:
//!
//! 1. compare old and new values, returning `false` when equal;
//! 2. build one [`Event`] and ask the target's hub (and, while the target is
//!    in the scene, the scene hub) to validate it, returning `false` on veto;
//! 3. apply the change, invalidate caches, and notify the same hubs.
//!
//! Size guards run before step 2 and cannot be overridden by listeners.

use crate::clock::Stamp;
use crate::error::{Result, StageError};
use crate::event::{Change, Event, EventHub, Property, PropertyValue, ShapeList};
use crate::geom::{Bounds, Point, Transform};
use crate::id::ShapeId;
use crate::kinds::ShapeKind;
use crate::path::PathPoint;
use crate::shape::{Shape, ShapeConfig, validate_value};
use crate::style::{LineCap, LineJoin, Paint};
use std::collections::HashMap;
use std::mem::discriminant;

#[derive(Debug)]
pub struct Scene {
    shapes: HashMap<ShapeId, Shape>,
    layers: Vec<ShapeId>,
    selected_layer: usize,
    hub: EventHub,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// A scene with one empty layer, selected for insertion.
    #[must_use]
    pub fn new() -> Self {
        let mut scene = Self {
            shapes: HashMap::new(),
            layers: Vec::new(),
            selected_layer: 0,
            hub: EventHub::new(),
        };
        let mut layer = Shape::layer();
        layer.in_scene = true;
        scene.layers.push(layer.id());
        scene.shapes.insert(layer.id(), layer);
        scene
    }

    /// Scene-wide listeners. Sees every event of every shape in the scene.
    pub fn hub_mut(&mut self) -> &mut EventHub {
        &mut self.hub
    }

    pub fn hub_of(&mut self, id: ShapeId) -> Result<&mut EventHub> {
        Ok(&mut self.shape_mut(id)?.hub)
    }

    // ─── Arena ───

    /// Take ownership of a detached shape.
    pub fn insert(&mut self, shape: Shape) -> ShapeId {
        let id = shape.id();
        log::trace!("insert {} {id}", shape.class_name());
        self.shapes.insert(id, shape);
        id
    }

    /// Build and insert in one step.
    pub fn create(&mut self, kind: impl Into<ShapeKind>, config: ShapeConfig) -> Result<ShapeId> {
        Ok(self.insert(Shape::new(kind, config)?))
    }

    pub fn shape(&self, id: ShapeId) -> Option<&Shape> {
        self.shapes.get(&id)
    }

    pub fn get(&self, id: ShapeId) -> Result<&Shape> {
        self.shapes.get(&id).ok_or(StageError::ShapeNotFound(id))
    }

    fn shape_mut(&mut self, id: ShapeId) -> Result<&mut Shape> {
        self.shapes.get_mut(&id).ok_or(StageError::ShapeNotFound(id))
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.shapes.contains_key(&id)
    }

    /// Shapes in the arena, attached or not, layers included.
    pub fn len(&self) -> usize {
        self.shapes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shapes.is_empty()
    }

    /// Drop a detached shape and its subtree from the arena.
    pub fn destroy(&mut self, id: ShapeId) -> Result<()> {
        let shape = self.get(id)?;
        if shape.parent.is_some() || self.layers.contains(&id) {
            return Err(StageError::invariant(format!(
                "cannot destroy {id} while it is attached"
            )));
        }
        let doomed = self.descendants(id);
        for d in doomed.iter().chain([&id]) {
            self.shapes.remove(d);
        }
        log::debug!("destroyed {id} and {} descendants", doomed.len());
        Ok(())
    }

    // ─── Layers ───

    pub fn layers(&self) -> &[ShapeId] {
        &self.layers
    }

    /// The layer `add` attaches to.
    pub fn selected_layer(&self) -> ShapeId {
        self.layers[self.selected_layer]
    }

    pub fn selected_layer_index(&self) -> usize {
        self.selected_layer
    }

    /// Out-of-range indices are ignored.
    pub fn select_layer(&mut self, index: usize) -> bool {
        if index < self.layers.len() {
            self.selected_layer = index;
            true
        } else {
            false
        }
    }

    pub fn add_layer(&mut self) -> Result<Option<ShapeId>> {
        self.insert_layer(self.layers.len())
    }

    /// Insert a new empty layer at `index` (clamped). `None` when vetoed.
    pub fn insert_layer(&mut self, index: usize) -> Result<Option<ShapeId>> {
        let index = index.min(self.layers.len());
        let mut layer = Shape::layer();
        let id = layer.id();
        let event = Event::new(Change::LayerAdded { layer: id, index });
        if !self.hub.validate_before(&event)? {
            return Ok(None);
        }
        layer.in_scene = true;
        self.shapes.insert(id, layer);
        self.layers.insert(index, id);
        if index <= self.selected_layer && self.layers.len() > 1 {
            self.selected_layer += 1;
        }
        self.hub.trigger_on(&event.into_committed())?;
        log::debug!("layer {id} inserted at {index}");
        Ok(Some(id))
    }

    /// Detach a layer and its subtree from the scene. The last layer stays.
    pub fn remove_layer(&mut self, layer: ShapeId) -> Result<bool> {
        let index = self
            .layers
            .iter()
            .position(|l| *l == layer)
            .ok_or_else(|| StageError::invalid(format!("{layer} is not a layer of this scene")))?;
        if self.layers.len() == 1 {
            return Err(StageError::invariant("a scene keeps at least one layer"));
        }
        let descendants = self.descendants(layer);
        let event = Event::new(Change::LayerRemoved { layer, descendants });
        if !self.hub.validate_before(&event)? {
            return Ok(false);
        }
        self.layers.remove(index);
        self.set_in_scene(layer, false)?;
        if self.selected_layer >= self.layers.len() || index < self.selected_layer {
            self.selected_layer = self.selected_layer.saturating_sub(1);
        }
        self.hub.trigger_on(&event.into_committed())?;
        log::debug!("layer {layer} removed");
        Ok(true)
    }

    // ─── Tree queries ───

    pub fn parent(&self, id: ShapeId) -> Result<Option<ShapeId>> {
        Ok(self.get(id)?.parent)
    }

    pub fn children(&self, id: ShapeId) -> Result<&[ShapeId]> {
        Ok(&self.get(id)?.children)
    }

    /// Every shape below `id`, depth-first in paint order.
    pub fn descendants(&self, id: ShapeId) -> ShapeList {
        let mut out = ShapeList::new();
        self.collect_descendants(id, &mut out);
        out
    }

    fn collect_descendants(&self, id: ShapeId, out: &mut ShapeList) {
        if let Some(shape) = self.shapes.get(&id) {
            for child in &shape.children {
                out.push(*child);
                self.collect_descendants(*child, out);
            }
        }
    }

    /// All non-layer shapes in the scene, depth-first in paint order.
    pub fn attached_shapes(&self) -> Vec<ShapeId> {
        self.layers
            .iter()
            .flat_map(|layer| self.descendants(*layer))
            .collect()
    }

    pub fn is_ancestor_of(&self, ancestor: ShapeId, descendant: ShapeId) -> bool {
        let mut cursor = self.shapes.get(&descendant).and_then(|s| s.parent);
        while let Some(id) = cursor {
            if id == ancestor {
                return true;
            }
            cursor = self.shapes.get(&id).and_then(|s| s.parent);
        }
        false
    }

    /// Tag a subtree with a rendering pane. `None` falls back to whatever
    /// default the reader applies.
    pub fn set_pane(&mut self, id: ShapeId, pane: Option<&str>) -> Result<()> {
        let children = {
            let shape = self.shape_mut(id)?;
            shape.pane = pane.map(str::to_owned);
            shape.children.clone()
        };
        for child in children {
            self.set_pane(child, pane)?;
        }
        Ok(())
    }

    fn set_in_scene(&mut self, id: ShapeId, in_scene: bool) -> Result<()> {
        let children = {
            let shape = self.shape_mut(id)?;
            shape.in_scene = in_scene;
            shape.children.clone()
        };
        for child in children {
            self.set_in_scene(child, in_scene)?;
        }
        Ok(())
    }

    // ─── Structure ───

    /// Attach `child` to the selected layer.
    pub fn add(&mut self, child: ShapeId) -> Result<bool> {
        let layer = self.selected_layer();
        self.add_to(layer, child)
    }

    /// Append `child` to `parent`'s children, detaching it from its current
    /// parent first. `Ok(false)` if already there or vetoed.
    pub fn add_to(&mut self, parent: ShapeId, child: ShapeId) -> Result<bool> {
        let p = self.get(parent)?;
        if !p.kind.is_container() {
            return Err(StageError::invalid(format!(
                "{} {parent} cannot hold children",
                p.class_name()
            )));
        }
        let c = self.get(child)?;
        if c.kind.is_layer() {
            return Err(StageError::invalid("layers are attached by the scene"));
        }
        if c.parent == Some(parent) {
            return Ok(false);
        }
        if child == parent || self.is_ancestor_of(child, parent) {
            return Err(StageError::invalid(format!(
                "adding {child} to {parent} would create a cycle"
            )));
        }
        let previous_parent = c.parent;
        let change = Change::ShapeAdded {
            parent,
            shape: child,
            descendants: self.descendants(child),
        };
        let event = Event::new(change);
        if !self.validate(parent, &event)? {
            return Ok(false);
        }
        if let Some(old) = previous_parent
            && !self.remove_child(old, child)?
        {
            return Ok(false);
        }
        let in_scene = {
            let p = self.shape_mut(parent)?;
            p.children.push(child);
            p.in_scene
        };
        {
            let c = self.shape_mut(child)?;
            c.parent = Some(parent);
            c.mark_transformed();
        }
        self.set_in_scene(child, in_scene)?;
        self.trigger(parent, &event.into_committed())?;
        log::debug!("attached {child} to {parent}");
        Ok(true)
    }

    /// Detach `child` from `parent`. Errors if `parent` does not own it.
    pub fn remove_child(&mut self, parent: ShapeId, child: ShapeId) -> Result<bool> {
        let index = self
            .get(parent)?
            .children
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| {
                StageError::invariant(format!("{child} is not a child of {parent}"))
            })?;
        let change = Change::ShapeRemoved {
            parent,
            shape: child,
            descendants: self.descendants(child),
        };
        let event = Event::new(change);
        if !self.validate(parent, &event)? {
            return Ok(false);
        }
        self.shape_mut(parent)?.children.remove(index);
        {
            let c = self.shape_mut(child)?;
            c.parent = None;
            c.mark_transformed();
        }
        self.set_in_scene(child, false)?;
        self.trigger(parent, &event.into_committed())?;
        log::debug!("detached {child} from {parent}");
        Ok(true)
    }

    /// Detach from whatever parent holds the shape. A free shape is
    /// trivially detached.
    pub fn remove_from_parent(&mut self, id: ShapeId) -> Result<bool> {
        if self.layers.contains(&id) {
            return Err(StageError::invalid("layers are removed with remove_layer"));
        }
        match self.get(id)?.parent {
            Some(parent) => self.remove_child(parent, id),
            None => Ok(true),
        }
    }

    /// Move `child` to `new_index` (clamped) among its siblings.
    pub fn change_shape_index(&mut self, child: ShapeId, new_index: usize) -> Result<bool> {
        let parent = self
            .get(child)?
            .parent
            .ok_or_else(|| StageError::invalid(format!("{child} has no parent to reorder in")))?;
        let siblings = &self.get(parent)?.children;
        let old_index = siblings
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| StageError::invariant(format!("{parent} lost track of {child}")))?;
        let new_index = new_index.min(siblings.len() - 1);
        if new_index == old_index {
            return Ok(false);
        }
        let change = Change::ShapeIndexChanged {
            parent,
            shape: child,
            old_index,
            new_index,
        };
        self.commit(parent, change, |scene| {
            let siblings = &mut scene.shape_mut(parent)?.children;
            let moved = siblings.remove(old_index);
            siblings.insert(new_index, moved);
            Ok(())
        })
    }

    fn sibling_index(&self, child: ShapeId) -> Result<(usize, usize)> {
        let parent = self
            .get(child)?
            .parent
            .ok_or_else(|| StageError::invalid(format!("{child} has no parent to reorder in")))?;
        let siblings = &self.get(parent)?.children;
        let index = siblings
            .iter()
            .position(|c| *c == child)
            .ok_or_else(|| StageError::invariant(format!("{parent} lost track of {child}")))?;
        Ok((index, siblings.len()))
    }

    pub fn bring_forward(&mut self, child: ShapeId) -> Result<bool> {
        let (index, _) = self.sibling_index(child)?;
        self.change_shape_index(child, index + 1)
    }

    pub fn send_backward(&mut self, child: ShapeId) -> Result<bool> {
        let (index, _) = self.sibling_index(child)?;
        if index == 0 {
            return Ok(false);
        }
        self.change_shape_index(child, index - 1)
    }

    pub fn bring_to_front(&mut self, child: ShapeId) -> Result<bool> {
        let (_, len) = self.sibling_index(child)?;
        self.change_shape_index(child, len - 1)
    }

    pub fn send_to_back(&mut self, child: ShapeId) -> Result<bool> {
        self.change_shape_index(child, 0)
    }

    // ─── Transforms & geometry queries ───

    pub fn logical_bounds(&self, id: ShapeId) -> Result<Bounds> {
        Ok(self.get(id)?.logical_bounds())
    }

    /// Inverse map from global coordinates into `id`'s local space.
    ///
    /// Cached per shape and recomputed only when the shape's own geometry
    /// or an ancestor's transform is newer than the cached copy.
    pub fn global_transform(&self, id: ShapeId) -> Result<Transform> {
        let shape = self.get(id)?;
        let parent = match shape.parent {
            Some(p) => Some(self.child_space(p)?),
            None => None,
        };
        let cached = shape.global_cache.get();
        let parent_stamp = parent.map_or(Stamp::ZERO, |t| t.stamp());
        let fresh = cached.stamp() != Stamp::ZERO
            && cached.stamp() >= shape.last_transformed()
            && cached.stamp() >= parent_stamp;
        if fresh {
            return Ok(cached);
        }
        let local = shape.local_transform().inverse();
        let global = match parent {
            Some(p) => p.then(&local),
            None => local,
        }
        .with_stamp(Stamp::next());
        shape.global_cache.set(global);
        Ok(global)
    }

    /// Global map into the space `id`'s children are laid out in.
    pub fn child_space(&self, id: ShapeId) -> Result<Transform> {
        let global = self.global_transform(id)?;
        let origin = self.get(id)?.kind.child_origin();
        if origin == Point::ORIGIN {
            return Ok(global);
        }
        Ok(global.then(&Transform::identity().translate(-origin.x, -origin.y)))
    }

    /// Global map into the space `id` itself is laid out in.
    pub fn parent_space(&self, id: ShapeId) -> Result<Transform> {
        match self.get(id)?.parent {
            Some(p) => self.child_space(p),
            None => Ok(Transform::identity()),
        }
    }

    pub fn to_local(&self, id: ShapeId, x: f64, y: f64) -> Result<Point> {
        Ok(self.global_transform(id)?.apply(x, y))
    }

    /// Whether the global point falls inside the shape's logical bounds.
    pub fn contains_point(&self, id: ShapeId, x: f64, y: f64) -> Result<bool> {
        let local = self.to_local(id, x, y)?;
        Ok(self.logical_bounds(id)?.contains_point(local.x, local.y))
    }

    /// Axis-aligned global box around the transformed logical bounds.
    pub fn global_bounds(&self, id: ShapeId) -> Result<Bounds> {
        let forward = self.global_transform(id)?.inverse();
        let corners = self.logical_bounds(id)?.corners();
        Ok(Bounds::enclosing(corners.map(|c| forward.apply_point(c))))
    }

    // ─── Mutation ───

    /// Mutation handle for one shape.
    pub fn edit(&mut self, id: ShapeId) -> Result<ShapeMut<'_>> {
        self.get(id)?;
        Ok(ShapeMut { scene: self, id })
    }

    fn validate(&mut self, target: ShapeId, event: &Event) -> Result<bool> {
        let shape = self
            .shapes
            .get_mut(&target)
            .ok_or(StageError::ShapeNotFound(target))?;
        if !shape.hub.validate_before(event)? {
            log::trace!("{} on {target} vetoed by shape listener", event.kind());
            return Ok(false);
        }
        if shape.in_scene && !self.hub.validate_before(event)? {
            log::trace!("{} on {target} vetoed by scene listener", event.kind());
            return Ok(false);
        }
        Ok(true)
    }

    fn trigger(&mut self, target: ShapeId, event: &Event) -> Result<()> {
        let shape = self
            .shapes
            .get_mut(&target)
            .ok_or(StageError::ShapeNotFound(target))?;
        if shape.hub.trigger_on(event)? && shape.in_scene {
            self.hub.trigger_on(event)?;
        }
        Ok(())
    }

    fn commit(
        &mut self,
        target: ShapeId,
        change: Change,
        apply: impl FnOnce(&mut Scene) -> Result<()>,
    ) -> Result<bool> {
        let event = Event::new(change);
        if !self.validate(target, &event)? {
            return Ok(false);
        }
        apply(self)?;
        let event = event.into_committed();
        log::trace!("{} committed on {target}", event.kind());
        self.trigger(target, &event)?;
        Ok(true)
    }
}

/// Smallest size a dimension may shrink to, given the control radius.
fn min_extent(shape: &Shape) -> f64 {
    shape.control_radius() * 2.0
}

/// A dimension may not go negative, nor shrink below `min`. Growing is
/// always allowed, even when still under `min`.
fn extent_allowed(min: f64, new: f64, current: f64) -> bool {
    new >= 0.0 && (new >= min || new >= current)
}

fn finite_or_invalid(what: &str, values: &[f64]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(StageError::invalid(format!("{what} must be finite")))
    }
}

// ─── ShapeMut ────────────────────────────────────────────────────────────

/// Gated mutators for one shape. Every method returns `Ok(false)` when the
/// value is unchanged, a guard fails, or a listener vetoes.
pub struct ShapeMut<'a> {
    scene: &'a mut Scene,
    id: ShapeId,
}

impl ShapeMut<'_> {
    pub fn id(&self) -> ShapeId {
        self.id
    }

    fn shape(&self) -> Result<&Shape> {
        self.scene.get(self.id)
    }

    fn property_change(&self, property: Property, old: PropertyValue, new: PropertyValue) -> Change {
        Change::PropertyChanged {
            shape: self.id,
            property,
            old,
            new,
        }
    }

    /// Set the translation.
    pub fn move_to(&mut self, x: f64, y: f64) -> Result<bool> {
        finite_or_invalid("location", &[x, y])?;
        let old = self.shape()?.translation;
        let new = Point::new(x, y);
        if old == new {
            return Ok(false);
        }
        let id = self.id;
        let change = self.property_change(
            Property::Location,
            PropertyValue::Point(old),
            PropertyValue::Point(new),
        );
        self.scene.commit(id, change, |scene| {
            let s = scene.shape_mut(id)?;
            s.translation = new;
            s.mark_transformed();
            Ok(())
        })
    }

    pub fn move_by(&mut self, dx: f64, dy: f64) -> Result<bool> {
        let t = self.shape()?.translation;
        self.move_to(t.x + dx, t.y + dy)
    }

    /// Set the scale factor, refusing to shrink below the handle size.
    pub fn scale_to(&mut self, sx: f64, sy: f64) -> Result<bool> {
        finite_or_invalid("scale", &[sx, sy])?;
        let shape = self.shape()?;
        let old = shape.scale_factor;
        let new = Point::new(sx, sy);
        if old == new {
            return Ok(false);
        }
        let b = shape.logical_bounds();
        let min = min_extent(shape);
        if !extent_allowed(min, b.width * sx, b.width * old.x)
            || !extent_allowed(min, b.height * sy, b.height * old.y)
        {
            log::trace!("scale of {} to ({sx}, {sy}) below minimum size", self.id);
            return Ok(false);
        }
        let id = self.id;
        let change = self.property_change(
            Property::Scale,
            PropertyValue::Point(old),
            PropertyValue::Point(new),
        );
        self.scene.commit(id, change, |scene| {
            let s = scene.shape_mut(id)?;
            s.scale_factor = new;
            s.mark_transformed();
            Ok(())
        })
    }

    pub fn scale_by(&mut self, fx: f64, fy: f64) -> Result<bool> {
        let s = self.shape()?.scale_factor;
        self.scale_to(s.x * fx, s.y * fy)
    }

    /// Set the absolute rotation in radians.
    pub fn rotate_to(&mut self, theta: f64) -> Result<bool> {
        finite_or_invalid("rotation", &[theta])?;
        let old = self.shape()?.rotation;
        if old == theta {
            return Ok(false);
        }
        let id = self.id;
        let change = self.property_change(
            Property::Rotation,
            PropertyValue::Number(old),
            PropertyValue::Number(theta),
        );
        self.scene.commit(id, change, |scene| {
            let s = scene.shape_mut(id)?;
            s.rotation = theta;
            s.mark_transformed();
            Ok(())
        })
    }

    pub fn rotate_by(&mut self, delta: f64) -> Result<bool> {
        let r = self.shape()?.rotation;
        self.rotate_to(r + delta)
    }

    /// Reshape the shape so its logical bounds become `bounds`, resetting
    /// the scale factor to 1. Groups rescale their children to match.
    ///
    /// The event's new value is the bounds the shape actually reaches. A
    /// path with arcs can land short of `bounds` on a non-uniform resize.
    pub fn set_bounds(&mut self, bounds: Bounds) -> Result<bool> {
        finite_or_invalid("bounds", &[bounds.x, bounds.y, bounds.width, bounds.height])?;
        let shape = self.shape()?;
        if shape.kind.is_layer() {
            return Err(StageError::MissingCapability(format!(
                "{} cannot be resized",
                shape.class_name()
            )));
        }
        let old = shape.logical_bounds();
        let unit_scale = shape.scale_factor == Point::new(1.0, 1.0);
        if old == bounds && unit_scale {
            return Ok(false);
        }
        let min = min_extent(shape);
        if !extent_allowed(min, bounds.width, old.width)
            || !extent_allowed(min, bounds.height, old.height)
        {
            log::trace!("bounds {bounds:?} for {} below minimum size", self.id);
            return Ok(false);
        }
        let target = match shape.kind {
            ShapeKind::Path(_) => bounds.inflate(-shape.line_width() / 2.0),
            _ => bounds,
        };
        if !shape.kind.geometry().can_reach(&target) {
            log::trace!("{} cannot stretch to {bounds:?}", self.id);
            return Ok(false);
        }
        // reshape a copy so the event carries the bounds actually reached;
        // arc radii follow the smaller scale factor
        let mut reshaped = shape.kind.clone();
        reshaped.geometry_mut().set_bounds(&target)?;
        let reached = match reshaped {
            ShapeKind::Path(_) => reshaped
                .geometry()
                .eval_bounds()
                .inflate(shape.line_width() / 2.0),
            _ => reshaped.geometry().eval_bounds(),
        };
        if reached == old && unit_scale {
            return Ok(false);
        }
        if reached != bounds {
            log::trace!("{} reshaped to {reached:?} for {bounds:?}", self.id);
        }
        let id = self.id;
        let change = self.property_change(
            Property::Bounds,
            PropertyValue::Bounds(old),
            PropertyValue::Bounds(reached),
        );
        self.scene.commit(id, change, |scene| {
            let s = scene.shape_mut(id)?;
            s.kind = reshaped;
            s.scale_factor = Point::new(1.0, 1.0);
            s.mark_transformed();
            let children = match s.kind {
                ShapeKind::Group(_) => s.children.clone(),
                _ => Vec::new(),
            };
            let (sx, sy) = old.scale_to(&reached);
            if sx == 1.0 && sy == 1.0 {
                return Ok(());
            }
            for child in children {
                let cb = scene.logical_bounds(child)?;
                let scaled = Bounds::new(cb.x * sx, cb.y * sy, cb.width * sx, cb.height * sy);
                if !scene.edit(child)?.set_bounds(scaled)? {
                    log::warn!("{child} refused to follow its group's resize");
                }
            }
            Ok(())
        })
    }

    /// Move one point of a path.
    pub fn set_path_point(&mut self, target: PathPoint, point: Point) -> Result<bool> {
        finite_or_invalid("path point", &[point.x, point.y])?;
        let shape = self.shape()?;
        let ShapeKind::Path(path) = &shape.kind else {
            return Err(StageError::invalid(format!(
                "{} {} has no path points",
                shape.class_name(),
                self.id
            )));
        };
        let old = path
            .point(target)
            .ok_or_else(|| StageError::invalid(format!("no path point {target:?}")))?;
        if old == point {
            return Ok(false);
        }
        let id = self.id;
        let change = self.property_change(
            Property::ControlPoint,
            PropertyValue::PathPoint { target, point: old },
            PropertyValue::PathPoint { target, point },
        );
        self.scene.commit(id, change, |scene| {
            let s = scene.shape_mut(id)?;
            if let ShapeKind::Path(path) = &mut s.kind {
                path.set_point(target, point)?;
            }
            s.mark_transformed();
            Ok(())
        })
    }

    /// Generic setter. Geometric properties route to their dedicated
    /// methods; everything else is compared, validated, and committed.
    pub fn set(&mut self, property: Property, value: PropertyValue) -> Result<bool> {
        match (property, &value) {
            (Property::Location, PropertyValue::Point(p)) => return self.move_to(p.x, p.y),
            (Property::Scale, PropertyValue::Point(p)) => return self.scale_to(p.x, p.y),
            (Property::Rotation, PropertyValue::Number(r)) => return self.rotate_to(*r),
            (Property::Bounds, PropertyValue::Bounds(b)) => return self.set_bounds(*b),
            (Property::ControlPoint, PropertyValue::PathPoint { target, point }) => {
                return self.set_path_point(*target, *point);
            }
            _ => {}
        }
        let old = self
            .shape()?
            .property(property)
            .ok_or_else(|| StageError::invalid(format!("{} needs a target", property.as_str())))?;
        if discriminant(&old) != discriminant(&value) {
            return Err(StageError::invalid(format!(
                "{value:?} is not a {} value",
                property.as_str()
            )));
        }
        validate_value(property, &value)?;
        if old == value {
            return Ok(false);
        }
        let id = self.id;
        let change = self.property_change(property, old, value.clone());
        self.scene.commit(id, change, |scene| {
            scene.shape_mut(id)?.write_property(value, property)
        })
    }

    pub fn set_name(&mut self, name: Option<&str>) -> Result<bool> {
        self.set(Property::Name, PropertyValue::Text(name.map(str::to_owned)))
    }

    pub fn set_z_index(&mut self, z: i32) -> Result<bool> {
        self.set(Property::ZIndex, PropertyValue::Integer(z))
    }

    pub fn set_visible(&mut self, visible: bool) -> Result<bool> {
        self.set(Property::Visible, PropertyValue::Flag(visible))
    }

    pub fn set_line_width(&mut self, width: f64) -> Result<bool> {
        self.set(Property::LineWidth, PropertyValue::Number(width))
    }

    pub fn set_line_cap(&mut self, cap: Option<LineCap>) -> Result<bool> {
        self.set(Property::LineCap, PropertyValue::LineCap(cap))
    }

    pub fn set_line_join(&mut self, join: Option<LineJoin>) -> Result<bool> {
        self.set(Property::LineJoin, PropertyValue::LineJoin(join))
    }

    pub fn set_miter_limit(&mut self, limit: Option<f64>) -> Result<bool> {
        self.set(Property::MiterLimit, PropertyValue::OptionalNumber(limit))
    }

    pub fn set_line_dash(&mut self, dash: Vec<f64>) -> Result<bool> {
        self.set(Property::LineDash, PropertyValue::Dash(dash))
    }

    pub fn set_line_dash_offset(&mut self, offset: f64) -> Result<bool> {
        self.set(Property::LineDashOffset, PropertyValue::Number(offset))
    }

    pub fn set_fill_style(&mut self, paint: Option<Paint>) -> Result<bool> {
        self.set(Property::FillStyle, PropertyValue::Paint(paint))
    }

    pub fn set_stroke_style(&mut self, paint: Option<Paint>) -> Result<bool> {
        self.set(Property::StrokeStyle, PropertyValue::Paint(paint))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::EventKind;
    use crate::kinds::{Group, Square};
    use pretty_assertions::assert_eq;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn square(scene: &mut Scene, x: f64, y: f64, size: f64) -> ShapeId {
        let id = scene
            .create(Square::new(x, y, size), ShapeConfig::default())
            .unwrap();
        assert!(scene.add(id).unwrap());
        id
    }

    #[test]
    fn new_scene_has_one_selected_layer() {
        let scene = Scene::new();
        assert_eq!(scene.layers().len(), 1);
        assert_eq!(scene.selected_layer(), scene.layers()[0]);
        assert!(scene.get(scene.selected_layer()).unwrap().is_in_scene());
    }

    #[test]
    fn add_attaches_to_selected_layer() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        let layer = scene.selected_layer();
        assert_eq!(scene.parent(id).unwrap(), Some(layer));
        assert_eq!(scene.children(layer).unwrap(), &[id]);
        assert!(scene.get(id).unwrap().is_in_scene());
        // already there
        assert!(!scene.add(id).unwrap());
    }

    #[test]
    fn unchanged_value_is_a_no_op() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        let fired = Rc::new(RefCell::new(0));
        let counter = Rc::clone(&fired);
        scene
            .hub_mut()
            .on(EventKind::PropertyChanged(Property::LineWidth), move |_| {
                *counter.borrow_mut() += 1;
                Ok(true)
            });
        assert!(!scene.edit(id).unwrap().set_line_width(2.0).unwrap());
        assert!(scene.edit(id).unwrap().set_line_width(3.0).unwrap());
        assert_eq!(*fired.borrow(), 1);
    }

    #[test]
    fn shape_hub_and_scene_hub_both_see_events() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let (a, b) = (Rc::clone(&log), Rc::clone(&log));
        let kind = EventKind::PropertyChanged(Property::Rotation);
        scene.hub_of(id).unwrap().on(kind, move |_| {
            a.borrow_mut().push("shape");
            Ok(true)
        });
        scene.hub_mut().on(kind, move |_| {
            b.borrow_mut().push("scene");
            Ok(true)
        });
        scene.edit(id).unwrap().rotate_to(1.0).unwrap();
        assert_eq!(*log.borrow(), vec!["shape", "scene"]);
    }

    #[test]
    fn detached_shapes_do_not_reach_the_scene_hub() {
        let mut scene = Scene::new();
        let id = scene
            .create(Square::default(), ShapeConfig::default())
            .unwrap();
        let fired = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&fired);
        scene
            .hub_mut()
            .on(EventKind::PropertyChanged(Property::Location), move |_| {
                *flag.borrow_mut() = true;
                Ok(true)
            });
        assert!(scene.edit(id).unwrap().move_to(5.0, 5.0).unwrap());
        assert!(!*fired.borrow());
    }

    #[test]
    fn set_rejects_wrong_value_type() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        let err = scene
            .edit(id)
            .unwrap()
            .set(Property::LineWidth, PropertyValue::Flag(true))
            .unwrap_err();
        assert!(matches!(err, StageError::InvalidArgument(_)));
        assert!(scene.edit(id).unwrap().set_line_width(-2.0).is_err());
    }

    #[test]
    fn removing_from_the_wrong_parent_is_an_invariant_violation() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        let group = scene.create(Group::default(), ShapeConfig::default()).unwrap();
        let err = scene.remove_child(group, id).unwrap_err();
        assert!(matches!(err, StageError::InvariantViolation(_)));
    }

    #[test]
    fn cycles_are_rejected() {
        let mut scene = Scene::new();
        let outer = scene
            .create(Group::new(Bounds::new(0.0, 0.0, 50.0, 50.0)), ShapeConfig::default())
            .unwrap();
        let inner = scene
            .create(Group::new(Bounds::new(0.0, 0.0, 20.0, 20.0)), ShapeConfig::default())
            .unwrap();
        scene.add(outer).unwrap();
        scene.add_to(outer, inner).unwrap();
        assert!(scene.add_to(inner, outer).is_err());
        assert!(scene.add_to(inner, inner).is_err());
    }

    #[test]
    fn reparenting_moves_between_parents() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        let group = scene
            .create(Group::new(Bounds::new(0.0, 0.0, 50.0, 50.0)), ShapeConfig::default())
            .unwrap();
        scene.add(group).unwrap();
        assert!(scene.add_to(group, id).unwrap());
        let layer = scene.selected_layer();
        assert_eq!(scene.children(layer).unwrap(), &[group]);
        assert_eq!(scene.children(group).unwrap(), &[id]);
        assert_eq!(scene.parent(id).unwrap(), Some(group));
    }

    #[test]
    fn z_order_moves_and_clamps() {
        let mut scene = Scene::new();
        let a = square(&mut scene, 0.0, 0.0, 10.0);
        let b = square(&mut scene, 0.0, 0.0, 10.0);
        let c = square(&mut scene, 0.0, 0.0, 10.0);
        let layer = scene.selected_layer();

        assert!(scene.bring_to_front(a).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[b, c, a]);
        assert!(!scene.bring_forward(a).unwrap());
        assert!(scene.send_backward(a).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[b, a, c]);
        assert!(scene.send_to_back(c).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[c, b, a]);
        assert!(scene.change_shape_index(c, 99).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[b, a, c]);
        assert!(!scene.send_backward(b).unwrap());
    }

    #[test]
    fn group_children_follow_group_origin() {
        let mut scene = Scene::new();
        let group = scene
            .create(Group::new(Bounds::new(100.0, 100.0, 50.0, 50.0)), ShapeConfig::default())
            .unwrap();
        scene.add(group).unwrap();
        let child = scene
            .create(Square::new(0.0, 0.0, 20.0), ShapeConfig::default())
            .unwrap();
        scene.add_to(group, child).unwrap();

        assert!(scene.contains_point(child, 110.0, 110.0).unwrap());
        assert!(!scene.contains_point(child, 10.0, 10.0).unwrap());
        assert_eq!(
            scene.global_bounds(child).unwrap(),
            Bounds::new(100.0, 100.0, 20.0, 20.0)
        );
    }

    #[test]
    fn group_resize_rescales_children() {
        let mut scene = Scene::new();
        let group = scene
            .create(Group::new(Bounds::new(0.0, 0.0, 40.0, 40.0)), ShapeConfig::default())
            .unwrap();
        scene.add(group).unwrap();
        let child = scene
            .create(Square::new(20.0, 20.0, 20.0), ShapeConfig::default())
            .unwrap();
        scene.add_to(group, child).unwrap();

        assert!(
            scene
                .edit(group)
                .unwrap()
                .set_bounds(Bounds::new(0.0, 0.0, 80.0, 40.0))
                .unwrap()
        );
        assert_eq!(
            scene.logical_bounds(child).unwrap(),
            Bounds::new(40.0, 20.0, 40.0, 20.0)
        );
    }

    #[test]
    fn layers_cannot_be_resized() {
        let mut scene = Scene::new();
        let layer = scene.selected_layer();
        let err = scene
            .edit(layer)
            .unwrap()
            .set_bounds(Bounds::new(0.0, 0.0, 10.0, 10.0))
            .unwrap_err();
        assert!(matches!(err, StageError::MissingCapability(_)));
    }

    #[test]
    fn layer_insertion_and_removal() {
        let mut scene = Scene::new();
        let first = scene.selected_layer();
        let second = scene.add_layer().unwrap().unwrap();
        assert_eq!(scene.layers(), &[first, second]);
        assert!(scene.select_layer(1));
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        assert_eq!(scene.parent(id).unwrap(), Some(second));

        assert!(scene.remove_layer(second).unwrap());
        assert_eq!(scene.layers(), &[first]);
        assert_eq!(scene.selected_layer(), first);
        assert!(!scene.get(id).unwrap().is_in_scene());
        assert!(scene.remove_layer(first).is_err());
    }

    #[test]
    fn destroy_requires_detachment() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        assert!(scene.destroy(id).is_err());
        assert!(scene.remove_from_parent(id).unwrap());
        scene.destroy(id).unwrap();
        assert!(!scene.contains(id));
    }

    #[test]
    fn global_transform_is_cached() {
        let mut scene = Scene::new();
        let id = square(&mut scene, 0.0, 0.0, 10.0);
        let a = scene.global_transform(id).unwrap();
        let b = scene.global_transform(id).unwrap();
        assert_eq!(a.stamp(), b.stamp());
        scene.edit(id).unwrap().move_by(1.0, 0.0).unwrap();
        let c = scene.global_transform(id).unwrap();
        assert!(c.stamp() > b.stamp());
        assert_eq!(c.apply(1.0, 0.0), Point::new(0.0, 0.0));
    }
}
