//! Input abstraction layer.
//!
//! Normalizes mouse and touch events from the host into one `InputEvent`
//! enum the [`Stage`](crate::stage::Stage) consumes. Coordinates are in
//! screen space; times are in milliseconds from any fixed origin.

/// Modifier keys held during a pointer or key event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        ctrl: false,
        shift: false,
        alt: false,
        meta: false,
    };

    /// ⌘ on macOS, Ctrl elsewhere.
    pub fn command(self) -> bool {
        self.ctrl || self.meta
    }

    /// Whether a press adds to the selection instead of replacing it.
    pub fn multi_select(self) -> bool {
        self.meta || self.shift
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InputEvent {
    /// Primary button pressed.
    PointerDown {
        x: f64,
        y: f64,
        time_ms: f64,
        modifiers: Modifiers,
    },

    PointerMove { x: f64, y: f64 },

    PointerUp { x: f64, y: f64, time_ms: f64 },

    /// Scroll / pinch-zoom.
    Scroll {
        dx: f64,
        dy: f64,
        /// Zoom factor (1.0 = no change; >1 = zoom in).
        zoom: f64,
    },

    Key { key: String, modifiers: Modifiers },
}

impl InputEvent {
    pub fn pointer_down(x: f64, y: f64, time_ms: f64, modifiers: Modifiers) -> Self {
        Self::PointerDown {
            x,
            y,
            time_ms,
            modifiers,
        }
    }

    pub fn pointer_move(x: f64, y: f64) -> Self {
        Self::PointerMove { x, y }
    }

    pub fn pointer_up(x: f64, y: f64, time_ms: f64) -> Self {
        Self::PointerUp { x, y, time_ms }
    }

    pub fn key(key: impl Into<String>, modifiers: Modifiers) -> Self {
        Self::Key {
            key: key.into(),
            modifiers,
        }
    }

    /// Extract position if this is a pointer event.
    pub fn position(&self) -> Option<(f64, f64)> {
        match self {
            Self::PointerDown { x, y, .. }
            | Self::PointerMove { x, y }
            | Self::PointerUp { x, y, .. } => Some((*x, *y)),
            _ => None,
        }
    }
}
