//! Keyboard shortcut mapping.
//!
//! Maps key + modifier combos to semantic `ShortcutAction`s. Lives in Rust
//! so the browser bridge and native hosts resolve keys the same way.

use crate::input::Modifiers;

/// Actions that keyboard shortcuts can trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShortcutAction {
    // ── Edit ──
    Delete,
    SelectAll,
    Deselect,
    Group,
    Ungroup,

    // ── Nudge ──
    /// Move the selection by `(dx, dy)` nudge steps.
    Nudge(i8, i8),

    // ── View ──
    ZoomIn,
    ZoomOut,
    ZoomReset,

    // ── Z-order ──
    SendBackward,
    BringForward,
    SendToBack,
    BringToFront,
}

/// Steps a shift-arrow nudge covers.
pub const LARGE_NUDGE: i8 = 10;

/// Resolves key events into shortcut actions.
///
/// On macOS `meta` is ⌘; elsewhere `ctrl` serves the same role.
pub struct ShortcutMap;

impl ShortcutMap {
    /// Resolve a key event to an action.
    ///
    /// `key` is the `KeyboardEvent.key` value (e.g. `"g"`, `"Delete"`).
    /// Returns `None` if the key combo has no binding.
    pub fn resolve(key: &str, modifiers: Modifiers) -> Option<ShortcutAction> {
        let cmd = modifiers.command();
        let shift = modifiers.shift;

        // ── Modifier combos first (most specific) ──
        if cmd && shift {
            return match key {
                "g" | "G" => Some(ShortcutAction::Ungroup),
                // shift turns the brackets into braces on most layouts
                "[" | "{" => Some(ShortcutAction::SendToBack),
                "]" | "}" => Some(ShortcutAction::BringToFront),
                _ => None,
            };
        }

        if cmd {
            return match key {
                "g" | "G" => Some(ShortcutAction::Group),
                "a" | "A" => Some(ShortcutAction::SelectAll),
                "[" => Some(ShortcutAction::SendBackward),
                "]" => Some(ShortcutAction::BringForward),
                "=" | "+" => Some(ShortcutAction::ZoomIn),
                "-" => Some(ShortcutAction::ZoomOut),
                "0" => Some(ShortcutAction::ZoomReset),
                _ => None,
            };
        }

        let step = if shift { LARGE_NUDGE } else { 1 };
        match key {
            "ArrowLeft" => Some(ShortcutAction::Nudge(-step, 0)),
            "ArrowRight" => Some(ShortcutAction::Nudge(step, 0)),
            "ArrowUp" => Some(ShortcutAction::Nudge(0, -step)),
            "ArrowDown" => Some(ShortcutAction::Nudge(0, step)),
            _ if shift => None,
            "Delete" | "Backspace" => Some(ShortcutAction::Delete),
            "Escape" => Some(ShortcutAction::Deselect),
            _ => None,
        }
    }
}
