//! `PaintContext` over a browser `CanvasRenderingContext2d`.
//!
//! Colors go out as CSS hex strings. Gradients are built per call against
//! the bounds handed to `set_paint`.

use stage_core::{Bounds, Color, GradientStop, LineCap, LineJoin, Paint, Point, StyleRole};
use stage_render::PaintContext;
use wasm_bindgen::JsValue;
use web_sys::{CanvasGradient, CanvasRenderingContext2d};

pub struct Canvas2D<'a> {
    ctx: &'a CanvasRenderingContext2d,
}

impl<'a> Canvas2D<'a> {
    pub fn new(ctx: &'a CanvasRenderingContext2d) -> Self {
        Self { ctx }
    }

    fn set_css(&self, role: StyleRole, css: &str) {
        match role {
            StyleRole::Fill => self.ctx.set_fill_style_str(css),
            StyleRole::Stroke => self.ctx.set_stroke_style_str(css),
        }
    }

    fn set_gradient(&self, role: StyleRole, gradient: &CanvasGradient, stops: &[GradientStop]) {
        for stop in stops {
            let _ = gradient.add_color_stop(stop.offset, &stop.color.to_hex());
        }
        match role {
            StyleRole::Fill => self.ctx.set_fill_style_canvas_gradient(gradient),
            StyleRole::Stroke => self.ctx.set_stroke_style_canvas_gradient(gradient),
        }
    }
}

/// Endpoints of a linear gradient at `angle` degrees that spans `b`.
pub fn linear_endpoints(angle: f32, b: &Bounds) -> (Point, Point) {
    let rad = f64::from(angle).to_radians();
    let (sin, cos) = rad.sin_cos();
    let c = b.center();
    let len = (b.width * cos.abs() + b.height * sin.abs()) / 2.0;
    (
        Point::new(c.x - len * cos, c.y - len * sin),
        Point::new(c.x + len * cos, c.y + len * sin),
    )
}

/// Outer radius of a radial gradient centered in `b`.
pub fn radial_extent(b: &Bounds) -> f64 {
    b.width.min(b.height) / 2.0
}

/// First stop's color, for when the canvas refuses a gradient.
fn fallback_color(stops: &[GradientStop]) -> Color {
    stops.first().map_or(Color::BLACK, |s| s.color)
}

impl PaintContext for Canvas2D<'_> {
    fn save(&mut self) {
        self.ctx.save();
    }

    fn restore(&mut self) {
        self.ctx.restore();
    }

    fn translate(&mut self, x: f64, y: f64) {
        let _ = self.ctx.translate(x, y);
    }

    fn rotate(&mut self, angle: f64) {
        let _ = self.ctx.rotate(angle);
    }

    fn scale(&mut self, x: f64, y: f64) {
        let _ = self.ctx.scale(x, y);
    }

    fn transform(&mut self, m: [f64; 6]) {
        let _ = self.ctx.transform(m[0], m[1], m[2], m[3], m[4], m[5]);
    }

    fn begin_path(&mut self) {
        self.ctx.begin_path();
    }

    fn close_path(&mut self) {
        self.ctx.close_path();
    }

    fn move_to(&mut self, x: f64, y: f64) {
        self.ctx.move_to(x, y);
    }

    fn line_to(&mut self, x: f64, y: f64) {
        self.ctx.line_to(x, y);
    }

    fn arc(&mut self, x: f64, y: f64, radius: f64, start: f64, end: f64, anticlockwise: bool) {
        let _ = self
            .ctx
            .arc_with_anticlockwise(x, y, radius, start, end, anticlockwise);
    }

    fn arc_to(&mut self, x1: f64, y1: f64, x2: f64, y2: f64, radius: f64) {
        let _ = self.ctx.arc_to(x1, y1, x2, y2, radius);
    }

    fn quadratic_curve_to(&mut self, cpx: f64, cpy: f64, x: f64, y: f64) {
        self.ctx.quadratic_curve_to(cpx, cpy, x, y);
    }

    fn bezier_curve_to(&mut self, cp1x: f64, cp1y: f64, cp2x: f64, cp2y: f64, x: f64, y: f64) {
        self.ctx.bezier_curve_to(cp1x, cp1y, cp2x, cp2y, x, y);
    }

    #[allow(clippy::too_many_arguments)]
    fn ellipse(
        &mut self,
        x: f64,
        y: f64,
        radius_x: f64,
        radius_y: f64,
        rotation: f64,
        start: f64,
        end: f64,
        anticlockwise: bool,
    ) {
        let _ = self.ctx.ellipse_with_anticlockwise(
            x,
            y,
            radius_x,
            radius_y,
            rotation,
            start,
            end,
            anticlockwise,
        );
    }

    fn rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.rect(x, y, width, height);
    }

    fn fill(&mut self) {
        self.ctx.fill();
    }

    fn stroke(&mut self) {
        self.ctx.stroke();
    }

    fn fill_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.fill_rect(x, y, width, height);
    }

    fn stroke_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.stroke_rect(x, y, width, height);
    }

    fn clear_rect(&mut self, x: f64, y: f64, width: f64, height: f64) {
        self.ctx.clear_rect(x, y, width, height);
    }

    fn set_paint(&mut self, role: StyleRole, paint: &Paint, bounds: &Bounds) {
        match paint {
            Paint::Solid(c) => self.set_css(role, &c.to_hex()),
            Paint::LinearGradient { angle, stops } => {
                let (p0, p1) = linear_endpoints(*angle, bounds);
                let gradient = self.ctx.create_linear_gradient(p0.x, p0.y, p1.x, p1.y);
                self.set_gradient(role, &gradient, stops);
            }
            Paint::RadialGradient { stops } => {
                let c = bounds.center();
                match self
                    .ctx
                    .create_radial_gradient(c.x, c.y, 0.0, c.x, c.y, radial_extent(bounds))
                {
                    Ok(gradient) => self.set_gradient(role, &gradient, stops),
                    Err(_) => self.set_css(role, &fallback_color(stops).to_hex()),
                }
            }
        }
    }

    fn set_line_width(&mut self, width: f64) {
        self.ctx.set_line_width(width);
    }

    fn set_line_cap(&mut self, cap: LineCap) {
        self.ctx.set_line_cap(cap.as_str());
    }

    fn set_line_join(&mut self, join: LineJoin) {
        self.ctx.set_line_join(join.as_str());
    }

    fn set_miter_limit(&mut self, limit: f64) {
        self.ctx.set_miter_limit(limit);
    }

    fn set_line_dash(&mut self, segments: &[f64]) {
        let dash: js_sys::Array = segments.iter().map(|s| JsValue::from_f64(*s)).collect();
        let _ = self.ctx.set_line_dash(&dash);
    }

    fn set_line_dash_offset(&mut self, offset: f64) {
        self.ctx.set_line_dash_offset(offset);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizontal_gradient_spans_the_width() {
        let b = Bounds::new(10.0, 20.0, 100.0, 40.0);
        let (p0, p1) = linear_endpoints(0.0, &b);
        assert_eq!(p0, Point::new(10.0, 40.0));
        assert_eq!(p1, Point::new(110.0, 40.0));
    }

    #[test]
    fn vertical_gradient_spans_the_height() {
        let b = Bounds::new(0.0, 0.0, 100.0, 40.0);
        let (p0, p1) = linear_endpoints(90.0, &b);
        assert!((p0.x - 50.0).abs() < 1e-9);
        assert!(p0.y.abs() < 1e-9);
        assert!((p1.y - 40.0).abs() < 1e-9);
    }

    #[test]
    fn radial_extent_fits_the_short_side() {
        assert_eq!(radial_extent(&Bounds::new(0.0, 0.0, 100.0, 40.0)), 20.0);
    }

    #[test]
    fn empty_gradients_fall_back_to_black() {
        assert_eq!(fallback_color(&[]), Color::BLACK);
    }
}
