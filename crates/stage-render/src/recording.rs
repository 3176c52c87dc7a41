//! A headless [`PaintContext`] that records every call.
//!
//! Used by tests and by callers that want to inspect or replay a frame
//! without a canvas.

use crate::context::PaintContext;
use stage_core::{Bounds, LineCap, LineJoin, Paint, StyleRole};

#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Save,
    Restore,
    Translate(f64, f64),
    Rotate(f64),
    Scale(f64, f64),
    Transform([f64; 6]),
    BeginPath,
    ClosePath,
    MoveTo(f64, f64),
    LineTo(f64, f64),
    Arc {
        x: f64,
        y: f64,
        radius: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    },
    ArcTo {
        x1: f64,
        y1: f64,
        x2: f64,
        y2: f64,
        radius: f64,
    },
    QuadraticCurveTo(f64, f64, f64, f64),
    BezierCurveTo(f64, f64, f64, f64, f64, f64),
    Ellipse {
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
    },
    Rect(f64, f64, f64, f64),
    Fill,
    Stroke,
    FillRect(f64, f64, f64, f64),
    StrokeRect(f64, f64, f64, f64),
    ClearRect(f64, f64, f64, f64),
    SetPaint {
        role: StyleRole,
        paint: Paint,
        bounds: Bounds,
    },
    LineWidth(f64),
    LineCap(LineCap),
    LineJoin(LineJoin),
    MiterLimit(f64),
    LineDash(Vec<f64>),
    LineDashOffset(f64),
}

#[derive(Debug, Default)]
pub struct RecordingContext {
    ops: Vec<DrawOp>,
    depth: usize,
}

impl RecordingContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    /// Drain the recorded ops, keeping the save depth.
    pub fn take(&mut self) -> Vec<DrawOp> {
        std::mem::take(&mut self.ops)
    }

    /// Unmatched `save` calls.
    pub fn depth(&self) -> usize {
        self.depth
    }

    pub fn count(&self, pred: impl Fn(&DrawOp) -> bool) -> usize {
        self.ops.iter().filter(|op| pred(op)).count()
    }

    fn push(&mut self, op: DrawOp) {
        self.ops.push(op);
    }
}

impl PaintContext for RecordingContext {
    fn save(&mut self) {
        self.depth += 1;
        self.push(DrawOp::Save);
    }

    fn restore(&mut self) {
        if self.depth == 0 {
            log::warn!("restore without matching save");
        }
        self.depth = self.depth.saturating_sub(1);
        self.push(DrawOp::Restore);
    }

    fn translate(&mut self, x: f64, y: f64) {
        self.push(DrawOp::Translate(x, y));
    }

    fn rotate(&mut self, angle: f64) {
        self.push(DrawOp::Rotate(angle));
    }

    fn scale(&mut self, x: f64, y: f64) {
        self.push(DrawOp::Scale(x, y));
    }

    fn transform(&mut self, m: [f64; 6]) {
        self.push(DrawOp::Transform(m));
    }

    fn begin_path(&mut self) {
        self.push(DrawOp::BeginPath);
    }

    fn close_path(&mut self) {
        self.push(DrawOp::ClosePath);
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.push(DrawOp::MoveTo(x, y));
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.push(DrawOp::LineTo(x, y));
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        self.push(DrawOp::Arc {
            x,
            y,
            radius,
            start,
            end,
            anticlockwise,
        });
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        self.push(DrawOp::ArcTo {
            x1,
            y1,
            x2,
            y2,
            radius,
        });
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.push(DrawOp::QuadraticCurveTo(cpx, cpy, x, y));
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.push(DrawOp::BezierCurveTo(cp1x, cp1y, cp2x, cp2y, x, y));
    }

    fn ellipse(
        &mut self,
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        _rotation: f64,
        _start: f64,
        _end: f64,
        _anticlockwise: bool,
    ) {
        self.push(DrawOp::Ellipse {
            x,
            y,
            radius_x,
            radius_y,
        });
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawOp::Rect(x, y, width, height));
    }

    fn fill(&mut self) {
        self.push(DrawOp::Fill);
    }

    fn stroke(&mut self) {
        self.push(DrawOp::Stroke);
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawOp::FillRect(x, y, width, height));
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawOp::StrokeRect(x, y, width, height));
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.push(DrawOp::ClearRect(x, y, width, height));
    }

    fn set_paint(&mut self, role: StyleRole, paint: &Paint, bounds: &Bounds) {
        self.push(DrawOp::SetPaint {
            role,
            paint: paint.clone(),
            bounds: *bounds,
        });
    }

    fn set_line_width(&mut self, width: f64) {
        self.push(DrawOp::LineWidth(width));
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.push(DrawOp::LineCap(cap));
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.push(DrawOp::LineJoin(join));
    }

    fn set_miter_limit(&mut self, limit: f64) {
        self.push(DrawOp::MiterLimit(limit));
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        self.push(DrawOp::LineDash(segments.to_vec()));
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        self.push(DrawOp::LineDashOffset(offset));
    }
}
