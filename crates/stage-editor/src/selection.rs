//! The set of shapes being edited.
//!
//! Each member carries a controller snapshot taken when it joined or at the
//! last checkpoint. Drags replay from that snapshot, so the result of a
//! gesture does not depend on how many move events arrived. Members are
//! drawn in the edit pane and go back to the default pane on leaving.

use smallvec::smallvec;
use stage_core::{
    Bounds, Change, Event, EventHub, Group, HitInfo, HitKind, Point, Result, Scene, ShapeConfig,
    ShapeId, ShapeKind, ShapeList, Snapshot, StageError,
};
use std::collections::HashMap;

#[derive(Debug)]
pub struct Selection {
    members: Vec<ShapeId>,
    saved: HashMap<ShapeId, Snapshot>,
    hub: EventHub,
    edit_pane: String,
}

impl Selection {
    #[must_use]
    pub fn new(edit_pane: impl Into<String>) -> Self {
        Self {
            members: Vec::new(),
            saved: HashMap::new(),
            hub: EventHub::new(),
            edit_pane: edit_pane.into(),
        }
    }

    /// Listeners for `ShapesSelected` / `ShapesUnselected`.
    pub fn hub_mut(&mut self) -> &mut EventHub {
        &mut self.hub
    }

    // ─── Queries ───

    /// Members in the order they were selected.
    pub fn ids(&self) -> &[ShapeId] {
        &self.members
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn contains(&self, id: ShapeId) -> bool {
        self.saved.contains_key(&id)
    }

    pub fn saved(&self, id: ShapeId) -> Option<&Snapshot> {
        self.saved.get(&id)
    }

    /// Ids with a saved snapshot. Always the member set.
    pub fn saved_ids(&self) -> impl Iterator<Item = ShapeId> + '_ {
        self.saved.keys().copied()
    }

    // ─── Membership ───

    /// Select `id`. `Ok(false)` if already selected or vetoed.
    pub fn add(&mut self, scene: &mut Scene, id: ShapeId) -> Result<bool> {
        if self.contains(id) {
            return Ok(false);
        }
        let shape = scene.get(id)?;
        if shape.kind().is_layer() {
            return Err(StageError::invalid("layers cannot be selected"));
        }
        let snapshot = shape.controller().snapshot_for(scene, id, None)?;
        let event = Event::new(Change::ShapesSelected {
            shapes: smallvec![id],
        });
        if !self.hub.validate_before(&event)? {
            return Ok(false);
        }
        scene.set_pane(id, Some(&self.edit_pane))?;
        self.members.push(id);
        self.saved.insert(id, snapshot);
        self.hub.trigger_on(&event.into_committed())?;
        log::trace!("selected {id}");
        Ok(true)
    }

    /// Unselect `id`. `Ok(false)` if not selected or vetoed.
    pub fn remove(&mut self, scene: &mut Scene, id: ShapeId) -> Result<bool> {
        if !self.contains(id) {
            return Ok(false);
        }
        let event = Event::new(Change::ShapesUnselected {
            shapes: smallvec![id],
        });
        if !self.hub.validate_before(&event)? {
            return Ok(false);
        }
        self.drop_member(scene, id)?;
        self.hub.trigger_on(&event.into_committed())?;
        log::trace!("unselected {id}");
        Ok(true)
    }

    /// Flip membership. Returns whether `id` is selected afterwards.
    pub fn toggle(&mut self, scene: &mut Scene, id: ShapeId) -> Result<bool> {
        if self.contains(id) {
            self.remove(scene, id)?;
        } else {
            self.add(scene, id)?;
        }
        Ok(self.contains(id))
    }

    /// Unselect everything as one event. `Ok(false)` if empty or vetoed.
    pub fn clear(&mut self, scene: &mut Scene) -> Result<bool> {
        if self.members.is_empty() {
            return Ok(false);
        }
        let shapes: ShapeList = self.members.iter().copied().collect();
        let event = Event::new(Change::ShapesUnselected { shapes });
        if !self.hub.validate_before(&event)? {
            return Ok(false);
        }
        for id in std::mem::take(&mut self.members) {
            if scene.contains(id) {
                scene.set_pane(id, None)?;
            }
        }
        self.saved.clear();
        self.hub.trigger_on(&event.into_committed())?;
        Ok(true)
    }

    /// Drop members that left the scene behind the selection's back.
    pub fn prune(&mut self, scene: &mut Scene) -> Result<()> {
        let gone: ShapeList = self
            .members
            .iter()
            .copied()
            .filter(|id| scene.shape(*id).is_none_or(|s| !s.is_in_scene()))
            .collect();
        if gone.is_empty() {
            return Ok(());
        }
        for id in &gone {
            self.drop_member(scene, *id)?;
        }
        let event = Event::new(Change::ShapesUnselected { shapes: gone });
        self.hub.trigger_on(&event.into_committed())?;
        Ok(())
    }

    fn drop_member(&mut self, scene: &mut Scene, id: ShapeId) -> Result<()> {
        self.members.retain(|m| *m != id);
        self.saved.remove(&id);
        if scene.contains(id) {
            scene.set_pane(id, None)?;
        }
        Ok(())
    }

    // ─── Gestures ───

    /// Re-snapshot every member. The hit shape also records which handle
    /// was grabbed.
    pub fn checkpoint_shapes(&mut self, scene: &Scene, hit: Option<&HitInfo>) -> Result<()> {
        for id in &self.members {
            let hit = hit.filter(|h| h.shape == *id);
            let snapshot = scene.get(*id)?.controller().snapshot_for(scene, *id, hit)?;
            self.saved.insert(*id, snapshot);
        }
        Ok(())
    }

    /// Replay a drag from `down` to `curr` on every member. A path point
    /// belongs to one shape, so control hits only edit the hit shape.
    pub fn apply_hit_changes(
        &self,
        scene: &mut Scene,
        hit: &HitInfo,
        down: Point,
        curr: Point,
    ) -> Result<bool> {
        let mut changed = false;
        for id in &self.members {
            if matches!(hit.kind, HitKind::Control(_)) && *id != hit.shape {
                continue;
            }
            let Some(saved) = self.saved.get(id) else {
                continue;
            };
            let controller = scene.get(*id)?.controller();
            changed |= controller.apply_hit_changes(scene, *id, hit, saved, down, curr)?;
        }
        Ok(changed)
    }

    // ─── Z-order ───

    /// Members that have a parent, ordered by position among siblings.
    fn by_sibling_index(&self, scene: &Scene) -> Result<Vec<ShapeId>> {
        let mut keyed = Vec::with_capacity(self.members.len());
        for id in &self.members {
            let Some(parent) = scene.parent(*id)? else {
                continue;
            };
            let index = scene
                .children(parent)?
                .iter()
                .position(|c| c == id)
                .unwrap_or_default();
            keyed.push((index, *id));
        }
        keyed.sort_by_key(|(index, _)| *index);
        Ok(keyed.into_iter().map(|(_, id)| id).collect())
    }

    pub fn bring_forward(&self, scene: &mut Scene) -> Result<bool> {
        let mut changed = false;
        for id in self.by_sibling_index(scene)?.into_iter().rev() {
            changed |= scene.bring_forward(id)?;
        }
        Ok(changed)
    }

    pub fn send_backward(&self, scene: &mut Scene) -> Result<bool> {
        let mut changed = false;
        for id in self.by_sibling_index(scene)? {
            changed |= scene.send_backward(id)?;
        }
        Ok(changed)
    }

    pub fn bring_to_front(&self, scene: &mut Scene) -> Result<bool> {
        let mut changed = false;
        for id in self.by_sibling_index(scene)? {
            changed |= scene.bring_to_front(id)?;
        }
        Ok(changed)
    }

    pub fn send_to_back(&self, scene: &mut Scene) -> Result<bool> {
        let mut changed = false;
        for id in self.by_sibling_index(scene)?.into_iter().rev() {
            changed |= scene.send_to_back(id)?;
        }
        Ok(changed)
    }

    // ─── Grouping ───

    /// Wrap members that share a parent into a new group per parent, when
    /// at least two of them do. Each group is framed by the union of its
    /// children's boxes and takes their place in the selection. Returns
    /// the new groups.
    pub fn group(&mut self, scene: &mut Scene) -> Result<Vec<ShapeId>> {
        let mut by_parent: Vec<(ShapeId, Vec<ShapeId>)> = Vec::new();
        for id in &self.members {
            let Some(parent) = scene.parent(*id)? else {
                continue;
            };
            match by_parent.iter_mut().find(|(p, _)| *p == parent) {
                Some((_, ids)) => ids.push(*id),
                None => by_parent.push((parent, vec![*id])),
            }
        }

        let mut created = Vec::new();
        for (parent, mut children) in by_parent {
            if children.len() < 2 {
                continue;
            }
            let order = scene.children(parent)?.to_vec();
            children.sort_by_key(|c| order.iter().position(|o| o == c));
            let mut frame: Option<Bounds> = None;
            for child in &children {
                let b = frame_in_parent(scene, *child)?;
                frame = Some(frame.map_or(b, |f| f.union(&b)));
            }
            let Some(frame) = frame else {
                continue;
            };

            let group = scene.create(Group::new(frame), ShapeConfig::default())?;
            if !scene.add_to(parent, group)? {
                scene.destroy(group)?;
                continue;
            }
            for child in &children {
                self.remove(scene, *child)?;
                if scene.add_to(group, *child)? {
                    shift(scene, *child, -frame.x, -frame.y)?;
                } else {
                    log::warn!("{child} refused to join group {group}");
                }
            }
            self.add(scene, group)?;
            log::debug!("grouped {} shapes into {group}", children.len());
            created.push(group);
        }
        Ok(created)
    }

    /// Dissolve every selected group into its parent, rebasing children by
    /// the group's origin and selecting them. Emptied groups are destroyed.
    /// Returns the freed children.
    pub fn ungroup(&mut self, scene: &mut Scene) -> Result<Vec<ShapeId>> {
        let groups: Vec<ShapeId> = self
            .members
            .iter()
            .copied()
            .filter(|id| {
                scene
                    .shape(*id)
                    .is_some_and(|s| matches!(s.kind(), ShapeKind::Group(_)))
            })
            .collect();

        let mut freed = Vec::new();
        for group in groups {
            let Some(parent) = scene.parent(group)? else {
                continue;
            };
            let origin = scene.get(group)?.kind().child_origin();
            self.remove(scene, group)?;
            for child in scene.children(group)?.to_vec() {
                if !scene.add_to(parent, child)? {
                    continue;
                }
                shift(scene, child, origin.x, origin.y)?;
                self.add(scene, child)?;
                freed.push(child);
            }
            if scene.children(group)?.is_empty() && scene.remove_from_parent(group)? {
                scene.destroy(group)?;
                log::debug!("ungrouped {group}");
            }
        }
        Ok(freed)
    }
}

/// Axis-aligned box of `id` in its parent's child space.
fn frame_in_parent(scene: &Scene, id: ShapeId) -> Result<Bounds> {
    let shape = scene.get(id)?;
    let forward = shape.local_transform();
    Ok(Bounds::enclosing(
        shape
            .logical_bounds()
            .corners()
            .map(|c| forward.apply_point(c)),
    ))
}

/// Move a shape by `(dx, dy)` in its parent's space. Shifting the logical
/// bounds keeps the shape's own coordinates meaningful; scaled shapes are
/// moved through their translation so the scale survives.
fn shift(scene: &mut Scene, id: ShapeId, dx: f64, dy: f64) -> Result<bool> {
    if dx == 0.0 && dy == 0.0 {
        return Ok(false);
    }
    let shape = scene.get(id)?;
    if shape.scale_factor() == Point::new(1.0, 1.0) {
        let moved = shape.logical_bounds().moved(dx, dy);
        scene.edit(id)?.set_bounds(moved)
    } else {
        scene.edit(id)?.move_by(dx, dy)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stage_core::{EventKind, Square};
    use std::cell::RefCell;
    use std::rc::Rc;

    fn attach(scene: &mut Scene, kind: impl Into<ShapeKind>) -> ShapeId {
        let id = scene.create(kind, ShapeConfig::default()).unwrap();
        scene.add(id).unwrap();
        id
    }

    #[test]
    fn members_move_to_the_edit_pane_and_back() {
        let mut scene = Scene::new();
        let id = attach(&mut scene, Square::default());
        let mut sel = Selection::new("edit");
        assert!(sel.add(&mut scene, id).unwrap());
        assert_eq!(scene.get(id).unwrap().pane(), Some("edit"));
        assert!(!sel.add(&mut scene, id).unwrap());
        assert!(sel.remove(&mut scene, id).unwrap());
        assert_eq!(scene.get(id).unwrap().pane(), None);
        assert!(sel.saved(id).is_none());
    }

    #[test]
    fn toggle_reports_membership() {
        let mut scene = Scene::new();
        let id = attach(&mut scene, Square::default());
        let mut sel = Selection::new("edit");
        assert!(sel.toggle(&mut scene, id).unwrap());
        assert!(!sel.toggle(&mut scene, id).unwrap());
        assert!(sel.is_empty());
    }

    #[test]
    fn layers_are_not_selectable() {
        let mut scene = Scene::new();
        let layer = scene.selected_layer();
        let mut sel = Selection::new("edit");
        assert!(sel.add(&mut scene, layer).is_err());
    }

    #[test]
    fn selection_events_can_be_vetoed() {
        let mut scene = Scene::new();
        let id = attach(&mut scene, Square::default());
        let mut sel = Selection::new("edit");
        sel.hub_mut()
            .before(EventKind::ShapesSelected, |_| Ok(false));
        assert!(!sel.add(&mut scene, id).unwrap());
        assert!(!sel.contains(id));
        assert_eq!(scene.get(id).unwrap().pane(), None);
    }

    #[test]
    fn clear_sends_one_event() {
        let mut scene = Scene::new();
        let a = attach(&mut scene, Square::default());
        let b = attach(&mut scene, Square::new(50.0, 50.0, 10.0));
        let mut sel = Selection::new("edit");
        sel.add(&mut scene, a).unwrap();
        sel.add(&mut scene, b).unwrap();

        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = Rc::clone(&seen);
        sel.hub_mut().on(EventKind::ShapesUnselected, move |e| {
            if let Change::ShapesUnselected { shapes } = e.change() {
                log.borrow_mut().push(shapes.to_vec());
            }
            Ok(true)
        });
        assert!(sel.clear(&mut scene).unwrap());
        assert_eq!(*seen.borrow(), vec![vec![a, b]]);
        assert!(!sel.clear(&mut scene).unwrap());
    }

    #[test]
    fn prune_forgets_detached_members() {
        let mut scene = Scene::new();
        let id = attach(&mut scene, Square::default());
        let mut sel = Selection::new("edit");
        sel.add(&mut scene, id).unwrap();
        scene.remove_from_parent(id).unwrap();
        sel.prune(&mut scene).unwrap();
        assert!(sel.is_empty());
        assert_eq!(sel.saved_ids().count(), 0);
    }

    #[test]
    fn z_order_keeps_relative_order() {
        let mut scene = Scene::new();
        let a = attach(&mut scene, Square::default());
        let b = attach(&mut scene, Square::default());
        let c = attach(&mut scene, Square::default());
        let layer = scene.selected_layer();
        let mut sel = Selection::new("edit");
        sel.add(&mut scene, a).unwrap();
        sel.add(&mut scene, b).unwrap();

        assert!(sel.bring_to_front(&mut scene).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[c, a, b]);
        assert!(sel.send_to_back(&mut scene).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[a, b, c]);
        assert!(sel.bring_forward(&mut scene).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[c, a, b]);
        assert!(sel.send_backward(&mut scene).unwrap());
        assert_eq!(scene.children(layer).unwrap(), &[a, b, c]);
    }

    #[test]
    fn single_members_are_not_grouped() {
        let mut scene = Scene::new();
        let id = attach(&mut scene, Square::default());
        let mut sel = Selection::new("edit");
        sel.add(&mut scene, id).unwrap();
        assert!(sel.group(&mut scene).unwrap().is_empty());
        assert_eq!(sel.ids(), &[id]);
    }

    #[test]
    fn group_then_ungroup_restores_positions() {
        let mut scene = Scene::new();
        let a = attach(&mut scene, Square::new(40.0, 40.0, 10.0));
        let b = attach(&mut scene, Square::new(60.0, 70.0, 10.0));
        let layer = scene.selected_layer();
        let mut sel = Selection::new("edit");
        sel.add(&mut scene, a).unwrap();
        sel.add(&mut scene, b).unwrap();

        let groups = sel.group(&mut scene).unwrap();
        assert_eq!(groups.len(), 1);
        let g = groups[0];
        assert_eq!(
            scene.logical_bounds(g).unwrap(),
            Bounds::new(40.0, 40.0, 30.0, 40.0)
        );
        assert_eq!(scene.logical_bounds(a).unwrap(), Bounds::new(0.0, 0.0, 10.0, 10.0));
        assert_eq!(scene.logical_bounds(b).unwrap(), Bounds::new(20.0, 30.0, 10.0, 10.0));
        assert_eq!(scene.global_bounds(b).unwrap(), Bounds::new(60.0, 70.0, 10.0, 10.0));
        assert_eq!(sel.ids(), &[g]);

        let freed = sel.ungroup(&mut scene).unwrap();
        assert_eq!(freed, vec![a, b]);
        assert!(!scene.contains(g));
        assert_eq!(scene.children(layer).unwrap(), &[a, b]);
        assert_eq!(scene.logical_bounds(b).unwrap(), Bounds::new(60.0, 70.0, 10.0, 10.0));
        assert_eq!(sel.ids(), &[a, b]);
    }
}
