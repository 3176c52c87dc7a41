//! The editing stage: scene, index, selection, panes, and pointer gestures.
//!
//! A gesture is three phases. `pointer_down` hit-tests, updates the
//! selection and checkpoints it; every `pointer_move` replays the drag from
//! that checkpoint; `pointer_up` ends it, and a press that never moved and
//! was released quickly counts as a click that reselects.
//!
//! ## Modifier behaviors
//!
//! | Modifier | On a shape | On empty space |
//! |----------|------------|----------------|
//! | **⌘ / Shift** | Toggle membership | Marquee adds to selection |

use crate::config::StageConfig;
use crate::index::ShapeIndex;
use crate::input::{InputEvent, Modifiers};
use crate::pane::{PaneSet, Viewport};
use crate::selection::Selection;
use crate::shortcuts::{ShortcutAction, ShortcutMap};
use stage_core::{
    Bounds, Color, HitInfo, HitKind, ListenerId, Paint, Point, Result, Scene, ShapeId, StyleRole,
};
use stage_render::{PaintContext, paint_shape};
use std::cell::{Ref, RefCell};
use std::collections::HashSet;
use std::rc::Rc;

/// Zoom factor per zoom-in / zoom-out shortcut.
pub const ZOOM_STEP: f64 = 1.25;
/// Marquees smaller than this on both axes are treated as a click.
const MARQUEE_MIN: f64 = 2.0;
pub const DEFAULT_CURSOR: &str = "auto";

static MARQUEE_FILL: Paint = Paint::Solid(Color::rgba(0.31, 0.76, 0.97, 0.08));
static MARQUEE_STROKE: Paint = Paint::Solid(Color::rgba(0.31, 0.76, 0.97, 1.0));

#[derive(Debug, Clone)]
struct Gesture {
    /// Scene coordinates of the press.
    down: Point,
    down_time: f64,
    hit: Option<HitInfo>,
    multi: bool,
    moved: bool,
    /// The press landed on nothing, so dragging draws a marquee.
    on_empty: bool,
}

#[derive(Debug)]
pub struct Stage {
    scene: Scene,
    index: ShapeIndex,
    selection: Selection,
    panes: Rc<RefCell<PaneSet>>,
    viewport: Viewport,
    config: StageConfig,
    editable: bool,
    gesture: Option<Gesture>,
    marquee: Option<Bounds>,
    cursor: &'static str,
    scene_listener: ListenerId,
}

impl Stage {
    /// Wrap `scene` for viewing. Call [`Stage::set_editable`] to accept
    /// pointer and keyboard input.
    pub fn new(mut scene: Scene, config: StageConfig) -> Result<Self> {
        config.validate()?;
        let index = ShapeIndex::attach(&mut scene, config.default_pane.as_str())?;
        let panes = Rc::new(RefCell::new(PaneSet::new(config.default_pane.as_str())));
        panes.borrow_mut().acquire(&config.default_pane);

        let dirty = Rc::clone(&panes);
        let scene_listener = scene.hub_mut().on_any(move |_| {
            dirty.borrow_mut().needs_repaint(None);
            Ok(true)
        });
        let mut selection = Selection::new(config.edit_pane.as_str());
        let dirty = Rc::clone(&panes);
        selection.hub_mut().on_any(move |_| {
            dirty.borrow_mut().needs_repaint(None);
            Ok(true)
        });

        Ok(Self {
            scene,
            index,
            selection,
            panes,
            viewport: Viewport::default(),
            config,
            editable: false,
            gesture: None,
            marquee: None,
            cursor: DEFAULT_CURSOR,
            scene_listener,
        })
    }

    /// Stop tracking the scene and hand it back.
    pub fn into_scene(mut self) -> Scene {
        self.index.detach(&mut self.scene);
        self.scene.hub_mut().off(self.scene_listener);
        self.scene
    }

    // ─── Accessors ───

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    /// Direct scene access. Changes still reach the index and mark panes
    /// dirty through the scene hub.
    pub fn scene_mut(&mut self) -> &mut Scene {
        &mut self.scene
    }

    pub fn index(&self) -> &ShapeIndex {
        &self.index
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut Selection {
        &mut self.selection
    }

    pub fn config(&self) -> &StageConfig {
        &self.config
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    /// Cursor hint for the control under the pointer.
    pub fn cursor(&self) -> &'static str {
        self.cursor
    }

    /// Current marquee rectangle in scene coordinates.
    pub fn marquee(&self) -> Option<Bounds> {
        self.marquee
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    /// Editing needs the edit pane; leaving edit mode drops the selection
    /// and any gesture in flight.
    pub fn set_editable(&mut self, editable: bool) -> Result<()> {
        if self.editable == editable {
            return Ok(());
        }
        self.editable = editable;
        if editable {
            self.panes.borrow_mut().acquire(&self.config.edit_pane);
        } else {
            self.gesture = None;
            self.marquee = None;
            self.cursor = DEFAULT_CURSOR;
            self.selection.clear(&mut self.scene)?;
            self.panes.borrow_mut().release(&self.config.edit_pane);
        }
        Ok(())
    }

    // ─── Panes ───

    pub fn panes(&self) -> Ref<'_, PaneSet> {
        self.panes.borrow()
    }

    pub fn acquire_pane(&mut self, name: &str) -> bool {
        self.panes.borrow_mut().acquire(name)
    }

    pub fn release_pane(&mut self, name: &str) -> bool {
        self.panes.borrow_mut().release(name)
    }

    /// `None` marks every pane.
    pub fn pane_needs_repaint(&self, name: Option<&str>) {
        self.panes.borrow_mut().needs_repaint(name);
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.panes.borrow().is_dirty(name)
    }

    /// Move a shape to another pane, repainting both.
    pub fn set_shape_pane(&mut self, id: ShapeId, pane: &str) -> Result<()> {
        let old = self.index.pane_of(&self.scene, id)?.to_owned();
        if old == pane {
            return Ok(());
        }
        self.index.set_pane(&mut self.scene, id, pane)?;
        let mut panes = self.panes.borrow_mut();
        panes.needs_repaint(Some(&old));
        panes.needs_repaint(Some(pane));
        Ok(())
    }

    /// Repaint `name` if it is dirty. Returns whether anything was drawn.
    pub fn paint_pane(&self, name: &str, ctx: &mut dyn PaintContext) -> Result<bool> {
        if !self.panes.borrow_mut().take_dirty(name) {
            return Ok(false);
        }
        let (width, height) = self.viewport.size();
        if width > 0.0 && height > 0.0 {
            ctx.clear_rect(0.0, 0.0, width, height);
        }
        ctx.save();
        let offset = self.viewport.offset();
        let zoom = self.viewport.zoom();
        ctx.translate(offset.x, offset.y);
        ctx.scale(zoom, zoom);
        let painted = self.paint_contents(name, ctx);
        ctx.restore();
        painted?;
        Ok(true)
    }

    fn paint_contents(&self, name: &str, ctx: &mut dyn PaintContext) -> Result<()> {
        let mut members = HashSet::new();
        let visible = self.viewport.visible_bounds();
        self.index
            .for_shapes_in_viewport(&self.scene, name, visible.as_ref(), |id| {
                members.insert(id);
            })?;
        let selection = &self.selection;
        let with_controls = |id: ShapeId| selection.contains(id);
        for layer in self.scene.layers() {
            for child in self.scene.children(*layer)? {
                if members.contains(child) {
                    paint_shape(ctx, &self.scene, *child, &with_controls)?;
                }
            }
        }
        if name == self.config.edit_pane
            && let Some(m) = self.marquee
        {
            let hairline = 1.0 / self.viewport.zoom();
            ctx.save();
            ctx.set_paint(StyleRole::Fill, &MARQUEE_FILL, &m);
            ctx.fill_rect(m.x, m.y, m.width, m.height);
            ctx.set_paint(StyleRole::Stroke, &MARQUEE_STROKE, &m);
            ctx.set_line_width(hairline);
            ctx.set_line_dash(&[4.0 * hairline, 4.0 * hairline]);
            ctx.stroke_rect(m.x, m.y, m.width, m.height);
            ctx.restore();
        }
        Ok(())
    }

    // ─── Viewport ───

    /// Clamped by [`StageConfig::clamp_zoom`]. Returns whether it changed.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        let zoom = self.config.clamp_zoom(zoom);
        let changed = self.viewport.set_zoom(zoom);
        if changed {
            self.pane_needs_repaint(None);
        }
        changed
    }

    pub fn set_offset(&mut self, x: f64, y: f64) -> bool {
        let changed = self.viewport.set_offset(x, y);
        if changed {
            self.pane_needs_repaint(None);
        }
        changed
    }

    pub fn set_size(&mut self, width: f64, height: f64) {
        self.viewport.set_size(width, height);
        self.pane_needs_repaint(None);
    }

    // ─── Input ───

    /// Route one normalized input event. Returns whether it did anything.
    pub fn handle(&mut self, event: &InputEvent) -> Result<bool> {
        match event {
            InputEvent::PointerDown {
                x,
                y,
                time_ms,
                modifiers,
            } => self.pointer_down(*x, *y, *time_ms, *modifiers),
            InputEvent::PointerMove { x, y } => self.pointer_move(*x, *y),
            InputEvent::PointerUp { x, y, time_ms } => self.pointer_up(*x, *y, *time_ms),
            InputEvent::Scroll { dx, dy, zoom } => {
                let offset = self.viewport.offset();
                let panned = self.set_offset(offset.x - dx, offset.y - dy);
                let zoomed = *zoom != 1.0 && self.set_zoom(self.viewport.zoom() * zoom);
                Ok(panned || zoomed)
            }
            InputEvent::Key { key, modifiers } => self.key(key, *modifiers),
        }
    }

    /// A handle (not the body) of a selected shape under the point.
    fn handle_under(&self, p: Point) -> Result<Option<HitInfo>> {
        for id in self.selection.ids().iter().rev() {
            let controller = self.scene.get(*id)?.controller();
            if let Some(hit) = controller.hit_info(&self.scene, *id, p.x, p.y)?
                && hit.kind != HitKind::Move
            {
                return Ok(Some(hit));
            }
        }
        Ok(None)
    }

    fn cursor_at(&self, p: Point) -> Result<&'static str> {
        for id in self.selection.ids().iter().rev() {
            let controller = self.scene.get(*id)?.controller();
            if let Some(hit) = controller.hit_info(&self.scene, *id, p.x, p.y)? {
                return Ok(hit.cursor);
            }
        }
        Ok(DEFAULT_CURSOR)
    }

    /// Start a gesture at screen point `(x, y)`.
    pub fn pointer_down(
        &mut self,
        x: f64,
        y: f64,
        time_ms: f64,
        modifiers: Modifiers,
    ) -> Result<bool> {
        if !self.editable {
            return Ok(false);
        }
        self.selection.prune(&mut self.scene)?;
        let p = self.viewport.to_scene(x, y);
        let multi = modifiers.multi_select();
        let mut on_empty = false;

        let mut hit = self.handle_under(p)?;
        if hit.is_none() {
            match self.index.shape_at(&self.scene, p.x, p.y)? {
                None => {
                    on_empty = true;
                    if !multi {
                        self.selection.clear(&mut self.scene)?;
                    }
                }
                Some(shape) => {
                    let controller = self.scene.get(shape)?.controller();
                    hit = controller.hit_info(&self.scene, shape, p.x, p.y)?;
                    if multi {
                        self.selection.toggle(&mut self.scene, shape)?;
                        if !self.selection.contains(shape) {
                            // toggled off: a drag must not move the rest
                            hit = None;
                        }
                    } else if !self.selection.contains(shape) {
                        self.selection.clear(&mut self.scene)?;
                        self.selection.add(&mut self.scene, shape)?;
                    }
                }
            }
        }
        self.selection.checkpoint_shapes(&self.scene, hit.as_ref())?;
        log::trace!("pointer down at {p:?} hit {:?}", hit.as_ref().map(|h| h.kind));
        self.gesture = Some(Gesture {
            down: p,
            down_time: time_ms,
            hit,
            multi,
            moved: false,
            on_empty,
        });
        self.marquee = None;
        self.pane_needs_repaint(Some(&self.config.edit_pane));
        Ok(true)
    }

    /// Update the cursor hint and, mid-gesture, replay the drag.
    pub fn pointer_move(&mut self, x: f64, y: f64) -> Result<bool> {
        if !self.editable {
            return Ok(false);
        }
        let p = self.viewport.to_scene(x, y);
        self.cursor = self.cursor_at(p)?;
        let Some(gesture) = self.gesture.as_mut() else {
            return Ok(false);
        };
        if p != gesture.down {
            gesture.moved = true;
        }
        let (down, on_empty, hit) = (gesture.down, gesture.on_empty, gesture.hit.clone());
        if on_empty {
            self.marquee = Some(Bounds::from_corners(down, p));
            self.pane_needs_repaint(Some(&self.config.edit_pane));
            return Ok(true);
        }
        match hit {
            Some(hit) => self
                .selection
                .apply_hit_changes(&mut self.scene, &hit, down, p),
            None => Ok(false),
        }
    }

    /// Finish the gesture at screen point `(x, y)`.
    pub fn pointer_up(&mut self, x: f64, y: f64, time_ms: f64) -> Result<bool> {
        if !self.editable {
            return Ok(false);
        }
        let Some(gesture) = self.gesture.take() else {
            return Ok(false);
        };
        let p = self.viewport.to_scene(x, y);
        let moved = gesture.moved || p != gesture.down;
        let is_click = !moved && time_ms - gesture.down_time <= self.config.click_threshold_ms;

        if let Some(rect) = self.marquee.take() {
            if rect.width > MARQUEE_MIN || rect.height > MARQUEE_MIN {
                self.select_in(&rect)?;
            }
        } else if is_click && !gesture.multi {
            self.selection.clear(&mut self.scene)?;
            if let Some(shape) = self.index.shape_at(&self.scene, p.x, p.y)? {
                self.selection.add(&mut self.scene, shape)?;
            }
        }
        self.pane_needs_repaint(None);
        Ok(true)
    }

    /// Add every top-level shape whose global box meets `rect`.
    fn select_in(&mut self, rect: &Bounds) -> Result<()> {
        let mut hits = Vec::new();
        for layer in self.scene.layers() {
            for child in self.scene.children(*layer)? {
                if self.index.contains(*child)
                    && self.scene.get(*child)?.is_visible()
                    && self.scene.global_bounds(*child)?.intersects(rect)
                {
                    hits.push(*child);
                }
            }
        }
        for id in hits {
            self.selection.add(&mut self.scene, id)?;
        }
        Ok(())
    }

    // ─── Commands ───

    pub fn key(&mut self, key: &str, modifiers: Modifiers) -> Result<bool> {
        if !self.editable {
            return Ok(false);
        }
        match ShortcutMap::resolve(key, modifiers) {
            Some(action) => self.apply(action),
            None => Ok(false),
        }
    }

    pub fn apply(&mut self, action: ShortcutAction) -> Result<bool> {
        log::debug!("shortcut {action:?}");
        match action {
            ShortcutAction::Delete => self.delete_selection(),
            ShortcutAction::SelectAll => self.select_all(),
            ShortcutAction::Deselect => self.selection.clear(&mut self.scene),
            ShortcutAction::Group => Ok(!self.selection.group(&mut self.scene)?.is_empty()),
            ShortcutAction::Ungroup => Ok(!self.selection.ungroup(&mut self.scene)?.is_empty()),
            ShortcutAction::Nudge(dx, dy) => {
                let step = self.config.nudge_step;
                self.nudge(f64::from(dx) * step, f64::from(dy) * step)
            }
            ShortcutAction::ZoomIn => Ok(self.set_zoom(self.viewport.zoom() * ZOOM_STEP)),
            ShortcutAction::ZoomOut => Ok(self.set_zoom(self.viewport.zoom() / ZOOM_STEP)),
            ShortcutAction::ZoomReset => Ok(self.set_zoom(1.0)),
            ShortcutAction::BringForward => self.selection.bring_forward(&mut self.scene),
            ShortcutAction::SendBackward => self.selection.send_backward(&mut self.scene),
            ShortcutAction::BringToFront => self.selection.bring_to_front(&mut self.scene),
            ShortcutAction::SendToBack => self.selection.send_to_back(&mut self.scene),
        }
    }

    /// Select `id`, replacing the selection unless `additive`.
    pub fn select(&mut self, id: ShapeId, additive: bool) -> Result<bool> {
        if !self.editable {
            return Ok(false);
        }
        if !additive {
            self.selection.clear(&mut self.scene)?;
        }
        self.selection.add(&mut self.scene, id)
    }

    /// Detach and destroy every selected shape.
    pub fn delete_selection(&mut self) -> Result<bool> {
        let doomed = self.selection.ids().to_vec();
        if doomed.is_empty() || !self.selection.clear(&mut self.scene)? {
            return Ok(false);
        }
        let mut deleted = false;
        for id in doomed {
            if self.scene.contains(id) && self.scene.remove_from_parent(id)? {
                self.scene.destroy(id)?;
                deleted = true;
            }
        }
        Ok(deleted)
    }

    /// Detach and destroy one shape, dropping it from the selection.
    pub fn delete_shape(&mut self, id: ShapeId) -> Result<bool> {
        if !self.scene.remove_from_parent(id)? {
            return Ok(false);
        }
        self.selection.prune(&mut self.scene)?;
        self.scene.destroy(id)?;
        Ok(true)
    }

    /// Select every visible shape on the active layer.
    pub fn select_all(&mut self) -> Result<bool> {
        let layer = self.scene.selected_layer();
        let mut changed = false;
        for child in self.scene.children(layer)?.to_vec() {
            if self.scene.get(child)?.is_visible() {
                changed |= self.selection.add(&mut self.scene, child)?;
            }
        }
        Ok(changed)
    }

    /// Move the selection by `(dx, dy)` in each shape's parent space.
    pub fn nudge(&mut self, dx: f64, dy: f64) -> Result<bool> {
        let mut changed = false;
        for id in self.selection.ids().to_vec() {
            changed |= self.scene.edit(id)?.move_by(dx, dy)?;
        }
        Ok(changed)
    }
}
