//! Flat registry of the shapes in a scene.
//!
//! Every shape gets a slot the first time it is seen. Removal empties the
//! slot instead of compacting, so other slots never move, and the id keeps
//! its slot for when it comes back. The index follows the scene through
//! listeners on the scene hub.

use stage_core::{
    Bounds, Change, EventKind, ListenerId, Result, Scene, ShapeId, StageError,
};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

#[derive(Debug, Default)]
struct Slots {
    by_id: HashMap<ShapeId, usize>,
    shapes: Vec<Option<ShapeId>>,
}

impl Slots {
    fn add(&mut self, id: ShapeId) -> Result<()> {
        match self.by_id.get(&id) {
            Some(&slot) => {
                if self.shapes[slot].is_some() {
                    return Err(StageError::invariant(format!(
                        "{id} added to the index again without removing it first"
                    )));
                }
                self.shapes[slot] = Some(id);
            }
            None => {
                self.by_id.insert(id, self.shapes.len());
                self.shapes.push(Some(id));
            }
        }
        Ok(())
    }

    fn remove(&mut self, id: ShapeId) -> Result<()> {
        let slot = *self
            .by_id
            .get(&id)
            .ok_or_else(|| StageError::invariant(format!("{id} was never indexed")))?;
        self.shapes[slot] = None;
        Ok(())
    }

    fn contains(&self, id: ShapeId) -> bool {
        self.by_id
            .get(&id)
            .is_some_and(|slot| self.shapes[*slot].is_some())
    }
}

#[derive(Debug)]
pub struct ShapeIndex {
    slots: Rc<RefCell<Slots>>,
    default_pane: String,
    listeners: Vec<ListenerId>,
}

impl ShapeIndex {
    /// An empty index not tied to any scene. Fill it with [`ShapeIndex::add`].
    #[must_use]
    pub fn new(default_pane: impl Into<String>) -> Self {
        Self {
            slots: Rc::default(),
            default_pane: default_pane.into(),
            listeners: Vec::new(),
        }
    }

    /// Index every shape already in `scene` and keep up with later
    /// additions and removals. Layers are containers, not indexed shapes.
    pub fn attach(scene: &mut Scene, default_pane: impl Into<String>) -> Result<Self> {
        let mut index = Self::new(default_pane);
        for id in scene.attached_shapes() {
            index.add(id)?;
        }

        let slots = Rc::clone(&index.slots);
        let added = scene.hub_mut().on(EventKind::ShapeAdded, move |event| {
            if let Change::ShapeAdded {
                shape, descendants, ..
            } = event.change()
            {
                let mut slots = slots.borrow_mut();
                slots.add(*shape)?;
                for d in descendants {
                    slots.add(*d)?;
                }
            }
            Ok(true)
        });

        let slots = Rc::clone(&index.slots);
        let removed = scene.hub_mut().on(EventKind::ShapeRemoved, move |event| {
            if let Change::ShapeRemoved {
                shape, descendants, ..
            } = event.change()
            {
                let mut slots = slots.borrow_mut();
                slots.remove(*shape)?;
                for d in descendants {
                    slots.remove(*d)?;
                }
            }
            Ok(true)
        });

        let slots = Rc::clone(&index.slots);
        let layer_removed = scene.hub_mut().on(EventKind::LayerRemoved, move |event| {
            if let Change::LayerRemoved { descendants, .. } = event.change() {
                let mut slots = slots.borrow_mut();
                for d in descendants {
                    slots.remove(*d)?;
                }
            }
            Ok(true)
        });

        index.listeners = vec![added, removed, layer_removed];
        log::debug!("index attached with {} shapes", index.len());
        Ok(index)
    }

    /// Stop following `scene`. The current contents stay.
    pub fn detach(&mut self, scene: &mut Scene) {
        for id in self.listeners.drain(..) {
            scene.hub_mut().off(id);
        }
    }

    pub fn default_pane(&self) -> &str {
        &self.default_pane
    }

    /// Errors if `id` already holds a live slot.
    pub fn add(&mut self, id: ShapeId) -> Result<()> {
        self.slots.borrow_mut().add(id)
    }

    /// Errors if `id` was never added.
    pub fn remove(&mut self, id: ShapeId) -> Result<()> {
        self.slots.borrow_mut().remove(id)
    }

    /// Whether `id` currently holds a live slot.
    pub fn contains(&self, id: ShapeId) -> bool {
        self.slots.borrow().contains(id)
    }

    /// Whether `id` was ever added, live or not.
    pub fn has_slot(&self, id: ShapeId) -> bool {
        self.slots.borrow().by_id.contains_key(&id)
    }

    pub fn slot_of(&self, id: ShapeId) -> Option<usize> {
        self.slots.borrow().by_id.get(&id).copied()
    }

    /// Live shapes in slot order.
    pub fn shapes(&self) -> Vec<ShapeId> {
        self.slots.borrow().shapes.iter().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.slots.borrow().shapes.iter().flatten().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Topmost visible shape containing the global point. Layers are
    /// searched top to bottom and only their immediate children are
    /// tested, so a group is hit as a whole.
    pub fn shape_at(&self, scene: &Scene, x: f64, y: f64) -> Result<Option<ShapeId>> {
        for layer in scene.layers().iter().rev() {
            for child in scene.children(*layer)?.iter().rev() {
                if !self.contains(*child) || !scene.get(*child)?.is_visible() {
                    continue;
                }
                if scene.contains_point(*child, x, y)? {
                    return Ok(Some(*child));
                }
            }
        }
        Ok(None)
    }

    /// The pane `id` draws in, falling back to the default pane.
    pub fn pane_of<'a>(&'a self, scene: &'a Scene, id: ShapeId) -> Result<&'a str> {
        Ok(scene.get(id)?.pane().unwrap_or(&self.default_pane))
    }

    /// Assign `id` and its subtree to `pane`.
    pub fn set_pane(&self, scene: &mut Scene, id: ShapeId, pane: &str) -> Result<()> {
        scene.set_pane(id, Some(pane))
    }

    /// Visit the live shapes drawn in `pane`, in slot order. With a
    /// `viewport`, shapes whose global box misses it are skipped.
    pub fn for_shapes_in_viewport(
        &self,
        scene: &Scene,
        pane: &str,
        viewport: Option<&Bounds>,
        mut visitor: impl FnMut(ShapeId),
    ) -> Result<()> {
        for id in self.shapes() {
            if self.pane_of(scene, id)? != pane {
                continue;
            }
            if let Some(v) = viewport
                && !scene.global_bounds(id)?.intersects(v)
            {
                continue;
            }
            visitor(id);
        }
        Ok(())
    }
}
