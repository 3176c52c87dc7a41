//! Rendering surfaces and the viewport they share.
//!
//! Panes are acquired by name and reference counted; the last release
//! drops them. A pane is repainted on the next frame after something marks
//! it dirty, never synchronously on mutation.

use stage_core::{Bounds, Point};

#[derive(Debug, Clone, PartialEq)]
pub struct Pane {
    name: String,
    refs: usize,
    needs_repaint: bool,
}

impl Pane {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn refs(&self) -> usize {
        self.refs
    }

    pub fn needs_repaint(&self) -> bool {
        self.needs_repaint
    }
}

#[derive(Debug)]
pub struct PaneSet {
    panes: Vec<Pane>,
    fallback: String,
}

impl PaneSet {
    /// `fallback` receives repaint requests for panes that do not exist.
    #[must_use]
    pub fn new(fallback: impl Into<String>) -> Self {
        Self {
            panes: Vec::new(),
            fallback: fallback.into(),
        }
    }

    /// Create the pane or bump its count. Returns whether it was created.
    pub fn acquire(&mut self, name: &str) -> bool {
        if let Some(pane) = self.panes.iter_mut().find(|p| p.name == name) {
            pane.refs += 1;
            return false;
        }
        log::debug!("pane {name} created");
        self.panes.push(Pane {
            name: name.to_owned(),
            refs: 1,
            needs_repaint: true,
        });
        true
    }

    /// Drop one reference. Returns whether the pane is still alive.
    pub fn release(&mut self, name: &str) -> bool {
        let Some(index) = self.panes.iter().position(|p| p.name == name) else {
            return false;
        };
        let pane = &mut self.panes[index];
        pane.refs -= 1;
        if pane.refs > 0 {
            return true;
        }
        self.panes.remove(index);
        log::debug!("pane {name} removed");
        false
    }

    pub fn get(&self, name: &str) -> Option<&Pane> {
        self.panes.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.panes.iter().map(|p| p.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.panes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panes.is_empty()
    }

    /// Flag a pane for repaint; `None` flags all of them. Unknown names
    /// flag the fallback pane.
    pub fn needs_repaint(&mut self, name: Option<&str>) {
        match name {
            None => self.panes.iter_mut().for_each(|p| p.needs_repaint = true),
            Some(name) => {
                let target = if self.get(name).is_some() {
                    name
                } else {
                    self.fallback.as_str()
                };
                if let Some(p) = self.panes.iter_mut().find(|p| p.name == target) {
                    p.needs_repaint = true;
                }
            }
        }
    }

    pub fn is_dirty(&self, name: &str) -> bool {
        self.get(name).is_some_and(|p| p.needs_repaint)
    }

    /// Clear the flag, returning whether it was set.
    pub fn take_dirty(&mut self, name: &str) -> bool {
        match self.panes.iter_mut().find(|p| p.name == name) {
            Some(p) => std::mem::take(&mut p.needs_repaint),
            None => false,
        }
    }
}

// ─── Viewport ────────────────────────────────────────────────────────────

/// Pan and zoom applied to every pane. Screen = scene × zoom + offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    zoom: f64,
    offset: Point,
    width: f64,
    height: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            offset: Point::ORIGIN,
            width: 0.0,
            height: 0.0,
        }
    }
}

impl Viewport {
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    /// Callers clamp first. Returns whether the zoom changed.
    pub fn set_zoom(&mut self, zoom: f64) -> bool {
        if self.zoom == zoom {
            return false;
        }
        self.zoom = zoom;
        true
    }

    pub fn set_offset(&mut self, x: f64, y: f64) -> bool {
        let offset = Point::new(x, y);
        if self.offset == offset {
            return false;
        }
        self.offset = offset;
        true
    }

    /// Size of the drawing surface in screen pixels.
    pub fn set_size(&mut self, width: f64, height: f64) {
        self.width = width.max(0.0);
        self.height = height.max(0.0);
    }

    pub fn size(&self) -> (f64, f64) {
        (self.width, self.height)
    }

    pub fn to_scene(&self, x: f64, y: f64) -> Point {
        Point::new(
            (x - self.offset.x) / self.zoom,
            (y - self.offset.y) / self.zoom,
        )
    }

    pub fn to_screen(&self, p: Point) -> Point {
        Point::new(
            p.x * self.zoom + self.offset.x,
            p.y * self.zoom + self.offset.y,
        )
    }

    /// The scene rectangle on screen, or `None` before a size is known.
    pub fn visible_bounds(&self) -> Option<Bounds> {
        if self.width <= 0.0 || self.height <= 0.0 {
            return None;
        }
        let origin = self.to_scene(0.0, 0.0);
        Some(Bounds::new(
            origin.x,
            origin.y,
            self.width / self.zoom,
            self.height / self.zoom,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panes_are_reference_counted() {
        let mut panes = PaneSet::new("main");
        assert!(panes.acquire("main"));
        assert!(!panes.acquire("main"));
        assert_eq!(panes.get("main").map(Pane::refs), Some(2));
        assert!(panes.release("main"));
        assert!(!panes.release("main"));
        assert!(panes.is_empty());
        assert!(!panes.release("main"));
    }

    #[test]
    fn unknown_names_dirty_the_fallback() {
        let mut panes = PaneSet::new("main");
        panes.acquire("main");
        panes.acquire("edit");
        assert!(panes.take_dirty("main"));
        assert!(panes.take_dirty("edit"));
        assert!(!panes.take_dirty("main"));

        panes.needs_repaint(Some("nowhere"));
        assert!(panes.is_dirty("main"));
        assert!(!panes.is_dirty("edit"));

        panes.needs_repaint(None);
        assert!(panes.is_dirty("edit"));
    }

    #[test]
    fn viewport_round_trips_points() {
        let mut vp = Viewport::default();
        vp.set_zoom(2.0);
        vp.set_offset(10.0, 20.0);
        assert_eq!(vp.to_scene(30.0, 40.0), Point::new(10.0, 10.0));
        assert_eq!(vp.to_screen(Point::new(10.0, 10.0)), Point::new(30.0, 40.0));
    }

    #[test]
    fn visible_bounds_need_a_size() {
        let mut vp = Viewport::default();
        assert_eq!(vp.visible_bounds(), None);
        vp.set_size(200.0, 100.0);
        vp.set_zoom(2.0);
        assert_eq!(vp.visible_bounds(), Some(Bounds::new(0.0, 0.0, 100.0, 50.0)));
    }
}
