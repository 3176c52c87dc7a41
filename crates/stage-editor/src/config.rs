//! Editor configuration.
//!
//! Every field has a default, so a partial JSON object from the host page is
//! enough to build a [`StageConfig`].

use serde::{Deserialize, Serialize};
use stage_core::{Result, StageError};

pub const DEFAULT_PANE: &str = "main";
pub const EDIT_PANE: &str = "edit";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Pane for shapes at rest, and for shapes with no pane of their own.
    pub default_pane: String,
    /// Pane selected shapes are moved to while being edited.
    pub edit_pane: String,
    /// Longest press, in milliseconds, still treated as a click.
    pub click_threshold_ms: f64,
    /// Zoom values at or below this reset to 1.
    pub min_zoom: f64,
    /// Zoom values above this are clamped to it.
    pub max_zoom: f64,
    /// Distance arrow keys move the selection, in scene units.
    pub nudge_step: f64,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            default_pane: DEFAULT_PANE.into(),
            edit_pane: EDIT_PANE.into(),
            click_threshold_ms: 500.0,
            min_zoom: 0.0,
            max_zoom: 10.0,
            nudge_step: 1.0,
        }
    }
}

impl StageConfig {
    pub fn validate(&self) -> Result<()> {
        if self.default_pane.is_empty() || self.edit_pane.is_empty() {
            return Err(StageError::invalid("pane names must not be empty"));
        }
        if self.default_pane == self.edit_pane {
            return Err(StageError::invalid(format!(
                "default and edit pane are both {:?}",
                self.default_pane
            )));
        }
        if !(self.click_threshold_ms >= 0.0 && self.click_threshold_ms.is_finite()) {
            return Err(StageError::invalid(format!(
                "click threshold must be non-negative, got {}",
                self.click_threshold_ms
            )));
        }
        if !(self.max_zoom > self.min_zoom && self.max_zoom.is_finite() && self.min_zoom >= 0.0) {
            return Err(StageError::invalid(format!(
                "bad zoom range {}..{}",
                self.min_zoom, self.max_zoom
            )));
        }
        if !self.nudge_step.is_finite() {
            return Err(StageError::invalid("nudge step must be finite"));
        }
        Ok(())
    }

    /// Out-of-range zoom: non-positive (or non-finite) resets to 1, too
    /// large clamps to the maximum.
    pub fn clamp_zoom(&self, zoom: f64) -> f64 {
        if zoom.is_nan() || zoom <= self.min_zoom {
            1.0
        } else if zoom > self.max_zoom {
            self.max_zoom
        } else {
            zoom
        }
    }
}
