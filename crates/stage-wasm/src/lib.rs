//! WASM bridge for Stage: exposes the editing stage to JavaScript.
//!
//! Compiled via `wasm-pack build --target web`. The host forwards raw
//! pointer and key events and calls `render` once per animation frame for
//! each pane it owns; only dirty panes draw.

mod canvas;

pub use canvas::Canvas2D;

use serde_json::json;
use stage_core::{
    Arrow, Bounds, Circle, Ellipse, Group, Paint, Plus, Point, Result, Scene, ShapeConfig,
    ShapeId, ShapeKind, Square, StageError, Triangle,
};
use stage_editor::{InputEvent, Modifiers, ShortcutAction, ShortcutMap, Stage, StageConfig};
use wasm_bindgen::prelude::*;
use web_sys::CanvasRenderingContext2d;

/// The JavaScript-facing stage controller.
#[wasm_bindgen]
pub struct WasmStage {
    stage: Stage,
}

#[wasm_bindgen]
impl WasmStage {
    /// Create a stage over an empty scene. `config_json` may be empty or a
    /// partial `StageConfig`; missing fields take their defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> std::result::Result<WasmStage, JsValue> {
        console_error_panic_hook_setup();
        let config = parse_config(config_json).map_err(to_js)?;
        let stage = Stage::new(Scene::new(), config).map_err(to_js)?;
        Ok(Self { stage })
    }

    pub fn set_editable(&mut self, editable: bool) -> bool {
        ok_or_report("set_editable", self.stage.set_editable(editable)).is_some()
    }

    pub fn is_editable(&self) -> bool {
        self.stage.is_editable()
    }

    // ─── Viewport ────────────────────────────────────────────────────────

    /// Resize the drawing surface, in screen pixels.
    pub fn resize(&mut self, width: f64, height: f64) {
        self.stage.set_size(width, height);
    }

    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        self.stage.set_zoom(zoom)
    }

    pub fn get_zoom(&self) -> f64 {
        self.stage.viewport().zoom()
    }

    pub fn set_offset(&mut self, x: f64, y: f64) -> bool {
        self.stage.set_offset(x, y)
    }

    // ─── Input ───────────────────────────────────────────────────────────

    /// Returns true if anything changed.
    #[allow(clippy::too_many_arguments)]
    pub fn handle_pointer_down(
        &mut self,
        x: f64,
        y: f64,
        time_ms: f64,
        shift: bool,
        ctrl: bool,
        alt: bool,
        meta: bool,
    ) -> bool {
        let modifiers = Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        };
        self.route(&InputEvent::pointer_down(x, y, time_ms, modifiers))
    }

    pub fn handle_pointer_move(&mut self, x: f64, y: f64) -> bool {
        self.route(&InputEvent::pointer_move(x, y))
    }

    pub fn handle_pointer_up(&mut self, x: f64, y: f64, time_ms: f64) -> bool {
        self.route(&InputEvent::pointer_up(x, y, time_ms))
    }

    /// Pan by `(dx, dy)` screen pixels and multiply the zoom by `zoom`.
    pub fn handle_scroll(&mut self, dx: f64, dy: f64, zoom: f64) -> bool {
        self.route(&InputEvent::Scroll { dx, dy, zoom })
    }

    /// Handle a keyboard event. Returns a JSON string:
    /// `{"changed":bool, "action":"<action_name>"}`
    pub fn handle_key(&mut self, key: &str, ctrl: bool, shift: bool, alt: bool, meta: bool) -> String {
        let modifiers = Modifiers {
            ctrl,
            shift,
            alt,
            meta,
        };
        let Some(action) = ShortcutMap::resolve(key, modifiers) else {
            return json!({ "changed": false, "action": "none" }).to_string();
        };
        let changed = if self.stage.is_editable() {
            ok_or_report("handle_key", self.stage.apply(action)).unwrap_or(false)
        } else {
            false
        };
        json!({ "changed": changed, "action": action_name(action) }).to_string()
    }

    /// CSS cursor for the control under the pointer.
    pub fn get_cursor(&self) -> String {
        self.stage.cursor().to_owned()
    }

    // ─── Panes ───────────────────────────────────────────────────────────

    /// Returns true if the pane was created.
    pub fn acquire_pane(&mut self, name: &str) -> bool {
        self.stage.acquire_pane(name)
    }

    /// Returns true if the pane is still alive.
    pub fn release_pane(&mut self, name: &str) -> bool {
        self.stage.release_pane(name)
    }

    pub fn needs_repaint(&self, pane: &str) -> bool {
        self.stage.is_dirty(pane)
    }

    /// Flag a pane for repaint; `None` flags them all.
    pub fn request_repaint(&self, pane: Option<String>) {
        self.stage.pane_needs_repaint(pane.as_deref());
    }

    /// Paint `pane` into `ctx` if it is dirty. Returns whether it drew.
    pub fn render(&self, pane: &str, ctx: &CanvasRenderingContext2d) -> bool {
        let mut canvas = Canvas2D::new(ctx);
        ok_or_report("render", self.stage.paint_pane(pane, &mut canvas)).unwrap_or(false)
    }

    // ─── Shapes ──────────────────────────────────────────────────────────

    /// Create a shape of `kind` filling the given frame and attach it to
    /// the selected layer. `config_json` is an optional partial
    /// `ShapeConfig`. Returns the new shape's id.
    pub fn create_shape(
        &mut self,
        kind: &str,
        x: f64,
        y: f64,
        width: f64,
        height: f64,
        config_json: &str,
    ) -> std::result::Result<String, JsValue> {
        self.create(kind, Bounds::new(x, y, width, height), config_json)
            .map(|id| id.get().to_string())
            .map_err(to_js)
    }

    /// Detach and destroy a shape. Returns true if it was removed.
    pub fn remove_shape(&mut self, id: &str) -> bool {
        let Some(id) = self.lookup(id) else {
            return false;
        };
        ok_or_report("remove_shape", self.stage.delete_shape(id)).unwrap_or(false)
    }

    /// Set a shape's fill from a hex color; an empty string clears it.
    pub fn set_fill(&mut self, id: &str, hex: &str) -> bool {
        self.set_paint(id, hex, true)
    }

    /// Set a shape's stroke from a hex color; an empty string clears it.
    pub fn set_stroke(&mut self, id: &str, hex: &str) -> bool {
        self.set_paint(id, hex, false)
    }

    pub fn set_line_width(&mut self, id: &str, width: f64) -> bool {
        let Some(id) = self.lookup(id) else {
            return false;
        };
        let result = self
            .stage
            .scene_mut()
            .edit(id)
            .and_then(|mut shape| shape.set_line_width(width));
        ok_or_report("set_line_width", result).unwrap_or(false)
    }

    /// Shape description as JSON, or `"null"` if the id is unknown.
    pub fn get_shape_json(&self, id: &str) -> String {
        self.lookup(id)
            .and_then(|id| ok_or_report("get_shape_json", self.describe(id)))
            .map_or_else(|| "null".to_owned(), |v| v.to_string())
    }

    // ─── Selection ───────────────────────────────────────────────────────

    /// JSON array of selected shape ids, in selection order.
    pub fn get_selected_ids(&self) -> String {
        let ids: Vec<String> = self
            .stage
            .selection()
            .ids()
            .iter()
            .map(|id| id.get().to_string())
            .collect();
        serde_json::to_string(&ids).unwrap_or_else(|_| "[]".to_owned())
    }

    /// Select a shape by id, adding to the selection when `additive`.
    pub fn select_by_id(&mut self, id: &str, additive: bool) -> bool {
        let Some(id) = self.lookup(id) else {
            return false;
        };
        ok_or_report("select_by_id", self.stage.select(id, additive)).unwrap_or(false)
    }

    // ─── Layers ──────────────────────────────────────────────────────────

    /// Append a layer and make it the target for new shapes. Returns its
    /// id, or an empty string if the scene refused it.
    pub fn add_layer(&mut self) -> String {
        let scene = self.stage.scene_mut();
        match ok_or_report("add_layer", scene.add_layer()).flatten() {
            Some(layer) => {
                let index = scene.layers().len() - 1;
                scene.select_layer(index);
                layer.get().to_string()
            }
            None => String::new(),
        }
    }

    pub fn select_layer(&mut self, index: usize) -> bool {
        self.stage.scene_mut().select_layer(index)
    }

    pub fn layer_count(&self) -> usize {
        self.stage.scene().layers().len()
    }
}

// ─── Internal helpers ────────────────────────────────────────────────────

impl WasmStage {
    fn route(&mut self, event: &InputEvent) -> bool {
        ok_or_report("input", self.stage.handle(event)).unwrap_or(false)
    }

    /// Resolve a JS-side id. Only shapes attached to the scene resolve.
    fn lookup(&self, id: &str) -> Option<ShapeId> {
        let raw: u64 = id.trim().parse().ok()?;
        let scene = self.stage.scene();
        scene
            .layers()
            .iter()
            .copied()
            .chain(scene.attached_shapes())
            .find(|shape| shape.get() == raw)
    }

    fn create(&mut self, kind: &str, frame: Bounds, config_json: &str) -> Result<ShapeId> {
        let kind = shape_kind(kind, frame)?;
        let config = parse_shape_config(config_json)?;
        let scene = self.stage.scene_mut();
        let id = scene.create(kind, config)?;
        if !scene.add(id)? {
            scene.destroy(id)?;
            return Err(StageError::invalid("the scene refused the new shape"));
        }
        log::debug!("created {id}");
        Ok(id)
    }

    fn set_paint(&mut self, id: &str, hex: &str, fill: bool) -> bool {
        let Some(id) = self.lookup(id) else {
            return false;
        };
        let paint = if hex.is_empty() {
            None
        } else {
            match Paint::hex(hex) {
                Some(paint) => Some(paint),
                None => return false,
            }
        };
        let result = self.stage.scene_mut().edit(id).and_then(|mut shape| {
            if fill {
                shape.set_fill_style(paint)
            } else {
                shape.set_stroke_style(paint)
            }
        });
        ok_or_report("set_paint", result).unwrap_or(false)
    }

    fn describe(&self, id: ShapeId) -> Result<serde_json::Value> {
        let scene = self.stage.scene();
        let shape = scene.get(id)?;
        let translation = shape.translation();
        let scale = shape.scale_factor();
        Ok(json!({
            "id": id.get().to_string(),
            "class": shape.class_name(),
            "name": shape.name(),
            "bounds": scene.logical_bounds(id)?,
            "globalBounds": scene.global_bounds(id)?,
            "translation": [translation.x, translation.y],
            "scale": [scale.x, scale.y],
            "rotation": shape.rotation(),
            "visible": shape.is_visible(),
            "pane": self.stage.index().pane_of(scene, id)?,
            "selected": self.stage.selection().contains(id),
            "fill": shape.fill_style().map(paint_css),
            "stroke": shape.stroke_style().map(paint_css),
            "lineWidth": shape.line_width(),
        }))
    }
}

/// Shape kind for a host-facing name, fitted to `frame`.
fn shape_kind(name: &str, frame: Bounds) -> Result<ShapeKind> {
    let (x, y, w, h) = (frame.x, frame.y, frame.width, frame.height);
    let p1 = Point::new(x, y);
    let p2 = Point::new(x + w, y + h);
    let kind: ShapeKind = match name {
        "circle" => Circle::new(x + w / 2.0, y + h / 2.0, w.min(h) / 2.0).into(),
        "square" => Square::new(x, y, w).into(),
        "ellipse" => Ellipse::new(x, y, w, h).into(),
        "triangle" => Triangle::in_frame(frame).into(),
        "plus" => Plus::new(p1, p2).into(),
        "arrow" => Arrow::right_arrow(p1, p2).into(),
        "chevron" => Arrow::right_chevron(p1, p2).into(),
        "group" => Group::new(frame).into(),
        other => return Err(StageError::invalid(format!("unknown shape kind {other:?}"))),
    };
    Ok(kind)
}

fn parse_config(json: &str) -> Result<StageConfig> {
    if json.trim().is_empty() {
        return Ok(StageConfig::default());
    }
    serde_json::from_str(json).map_err(|e| StageError::invalid(format!("stage config: {e}")))
}

fn parse_shape_config(json: &str) -> Result<ShapeConfig> {
    if json.trim().is_empty() {
        return Ok(ShapeConfig::default());
    }
    serde_json::from_str(json).map_err(|e| StageError::invalid(format!("shape config: {e}")))
}

/// CSS for a paint; gradients report their first stop.
fn paint_css(paint: &Paint) -> Option<String> {
    match paint {
        Paint::Solid(c) => Some(c.to_hex()),
        Paint::LinearGradient { stops, .. } | Paint::RadialGradient { stops } => {
            stops.first().map(|s| s.color.to_hex())
        }
    }
}

fn action_name(action: ShortcutAction) -> &'static str {
    match action {
        ShortcutAction::Delete => "delete",
        ShortcutAction::SelectAll => "selectAll",
        ShortcutAction::Deselect => "deselect",
        ShortcutAction::Group => "group",
        ShortcutAction::Ungroup => "ungroup",
        ShortcutAction::Nudge(..) => "nudge",
        ShortcutAction::ZoomIn => "zoomIn",
        ShortcutAction::ZoomOut => "zoomOut",
        ShortcutAction::ZoomReset => "zoomReset",
        ShortcutAction::SendBackward => "sendBackward",
        ShortcutAction::BringForward => "bringForward",
        ShortcutAction::SendToBack => "sendToBack",
        ShortcutAction::BringToFront => "bringToFront",
    }
}

fn ok_or_report<T>(context: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("{context}: {e}");
            #[cfg(target_arch = "wasm32")]
            web_sys::console::warn_1(&format!("stage {context}: {e}").into());
            None
        }
    }
}

fn to_js(e: StageError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Set up a panic hook that logs to the browser console.
fn console_error_panic_hook_setup() {
    #[cfg(target_arch = "wasm32")]
    {
        use std::sync::Once;
        static SET_HOOK: Once = Once::new();
        SET_HOOK.call_once(|| {
            std::panic::set_hook(Box::new(|info| {
                let msg = format!("Stage WASM panic: {info}");
                web_sys::console::error_1(&msg.into());
            }));
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn editable() -> WasmStage {
        let Ok(mut stage) = WasmStage::new("") else {
            panic!("default config rejected");
        };
        assert!(stage.set_editable(true));
        stage
    }

    fn square(stage: &mut WasmStage) -> String {
        match stage.create_shape("square", 0.0, 0.0, 100.0, 100.0, "") {
            Ok(id) => id,
            Err(_) => panic!("square rejected"),
        }
    }

    fn key_reply(stage: &mut WasmStage, key: &str) -> serde_json::Value {
        serde_json::from_str(&stage.handle_key(key, false, false, false, false)).unwrap()
    }

    #[test]
    fn kinds_fit_their_frame() {
        let frame = Bounds::new(10.0, 20.0, 40.0, 30.0);
        let ShapeKind::Circle(c) = shape_kind("circle", frame).unwrap() else {
            panic!("not a circle");
        };
        assert_eq!(c.radius(), 15.0);
        assert!(matches!(
            shape_kind("ellipse", frame).unwrap(),
            ShapeKind::Ellipse(_)
        ));
        assert!(shape_kind("hexagon", frame).is_err());
    }

    #[test]
    fn configs_accept_partial_json() {
        let config = parse_config(r#"{"max_zoom": 4.0}"#).unwrap();
        assert_eq!(config.max_zoom, 4.0);
        assert_eq!(config.default_pane, "main");
        assert!(parse_config("{").is_err());

        let shape = parse_shape_config(r#"{"name": "box", "line_width": 3.0}"#).unwrap();
        assert_eq!(shape.name.as_deref(), Some("box"));
        assert_eq!(shape.line_width, 3.0);
    }

    #[test]
    fn click_then_delete_by_key() {
        let mut stage = editable();
        let id = square(&mut stage);

        assert!(stage.handle_pointer_down(50.0, 50.0, 0.0, false, false, false, false));
        assert!(stage.handle_pointer_up(50.0, 50.0, 20.0));
        assert_eq!(stage.get_selected_ids(), format!(r#"["{id}"]"#));

        let reply = key_reply(&mut stage, "Delete");
        assert_eq!(reply["action"], "delete");
        assert_eq!(reply["changed"], true);
        assert_eq!(stage.get_shape_json(&id), "null");
        assert_eq!(stage.get_selected_ids(), "[]");
    }

    #[test]
    fn unbound_keys_report_no_action() {
        let mut stage = editable();
        let reply = key_reply(&mut stage, "q");
        assert_eq!(reply["action"], "none");
        assert_eq!(reply["changed"], false);
    }

    #[test]
    fn shapes_are_described_by_id() {
        let mut stage = editable();
        let id = square(&mut stage);
        assert!(stage.set_fill(&id, "#FF0000"));
        assert!(!stage.set_fill(&id, "not a color"));
        assert!(stage.select_by_id(&id, false));

        let value: serde_json::Value = serde_json::from_str(&stage.get_shape_json(&id)).unwrap();
        assert_eq!(value["class"], "Square");
        assert_eq!(value["fill"], "#FF0000");
        assert_eq!(value["pane"], "edit");
        assert_eq!(value["bounds"]["width"], 100.0);
        assert_eq!(value["selected"], true);
    }

    #[test]
    fn unknown_ids_are_ignored() {
        let mut stage = editable();
        assert!(!stage.remove_shape("12345678"));
        assert!(!stage.select_by_id("not-a-number", false));
        assert_eq!(stage.get_shape_json("0"), "null");
        assert_eq!(stage.get_shape_json("18446744073709551615"), "null");
    }

    #[test]
    fn new_layers_take_new_shapes() {
        let mut stage = editable();
        assert_eq!(stage.layer_count(), 1);
        let layer = stage.add_layer();
        assert!(!layer.is_empty());
        assert_eq!(stage.layer_count(), 2);

        let id = square(&mut stage);
        let value: serde_json::Value = serde_json::from_str(&stage.get_shape_json(&id)).unwrap();
        assert_eq!(value["class"], "Square");
        assert!(stage.remove_shape(&id));
    }
}
