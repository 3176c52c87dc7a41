//! Shape nodes: identity, transform components, style, and caches.
//!
//! A [`Shape`] is built free-standing and handed to a
//! [`Scene`](crate::scene::Scene), which owns it from then on. All
//! observable mutation goes through the scene so listeners can gate it;
//! this module only exposes reads plus the crate-private writes the scene
//! applies once a change is accepted.

use crate::clock::Stamp;
use crate::controller::{ControlPoint, ShapeController};
use crate::error::{Result, StageError};
use crate::event::{EventHub, Property, PropertyValue};
use crate::geom::{Bounds, Point, Transform};
use crate::id::ShapeId;
use crate::kinds::{Layer, ShapeKind};
use crate::style::{LineCap, LineJoin, Paint};
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub const DEFAULT_LINE_WIDTH: f64 = 2.0;
/// Radius of a grab handle. Shapes may not shrink below twice this.
pub const DEFAULT_CONTROL_RADIUS: f64 = 5.0;

// ─── Config ──────────────────────────────────────────────────────────────

/// Construction options shared by every shape kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeConfig {
    pub name: Option<String>,
    pub z_index: i32,
    pub visible: bool,
    pub line_width: f64,
    pub line_cap: Option<LineCap>,
    pub line_join: Option<LineJoin>,
    pub miter_limit: Option<f64>,
    pub line_dash: Vec<f64>,
    pub line_dash_offset: f64,
    pub fill_style: Option<Paint>,
    pub stroke_style: Option<Paint>,
    pub control_radius: f64,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            name: None,
            z_index: 0,
            visible: true,
            line_width: DEFAULT_LINE_WIDTH,
            line_cap: None,
            line_join: None,
            miter_limit: None,
            line_dash: Vec::new(),
            line_dash_offset: 0.0,
            fill_style: None,
            stroke_style: None,
            control_radius: DEFAULT_CONTROL_RADIUS,
        }
    }
}

impl ShapeConfig {
    #[must_use]
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn fill(mut self, paint: Paint) -> Self {
        self.fill_style = Some(paint);
        self
    }

    #[must_use]
    pub fn stroke(mut self, paint: Paint) -> Self {
        self.stroke_style = Some(paint);
        self
    }

    #[must_use]
    pub fn line_width(mut self, width: f64) -> Self {
        self.line_width = width;
        self
    }

    pub fn validate(&self) -> Result<()> {
        check_line_width(self.line_width)?;
        check_dash(&self.line_dash)?;
        check_miter_limit(self.miter_limit)?;
        if !self.line_dash_offset.is_finite() {
            return Err(StageError::invalid("line dash offset must be finite"));
        }
        if !(self.control_radius > 0.0 && self.control_radius.is_finite()) {
            return Err(StageError::invalid(format!(
                "control radius must be positive, got {}",
                self.control_radius
            )));
        }
        Ok(())
    }
}

pub(crate) fn check_line_width(width: f64) -> Result<()> {
    if width >= 0.0 && width.is_finite() {
        Ok(())
    } else {
        Err(StageError::invalid(format!(
            "line width must be non-negative, got {width}"
        )))
    }
}

pub(crate) fn check_dash(dash: &[f64]) -> Result<()> {
    if dash.iter().all(|d| *d >= 0.0 && d.is_finite()) {
        Ok(())
    } else {
        Err(StageError::invalid(format!(
            "line dash entries must be non-negative, got {dash:?}"
        )))
    }
}

pub(crate) fn check_miter_limit(limit: Option<f64>) -> Result<()> {
    match limit {
        Some(m) if !(m > 0.0 && m.is_finite()) => Err(StageError::invalid(format!(
            "miter limit must be positive, got {m}"
        ))),
        _ => Ok(()),
    }
}

// ─── Shape ───────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Shape {
    id: ShapeId,
    pub(crate) kind: ShapeKind,
    pub(crate) parent: Option<ShapeId>,
    pub(crate) children: Vec<ShapeId>,
    pub(crate) in_scene: bool,
    pub(crate) pane: Option<String>,
    pub(crate) hub: EventHub,

    pub(crate) translation: Point,
    pub(crate) scale_factor: Point,
    pub(crate) rotation: f64,
    pub(crate) props: ShapeConfig,

    last_updated: Stamp,
    last_transformed: Stamp,
    bounds_cache: Cell<Option<Bounds>>,
    pub(crate) global_cache: Cell<Transform>,
    controller: &'static dyn ShapeController,
    control_points: RefCell<Option<(Stamp, Rc<[ControlPoint]>)>>,
}

impl Shape {
    /// Build a detached shape. Fails on a malformed kind or config.
    pub fn new(kind: impl Into<ShapeKind>, config: ShapeConfig) -> Result<Self> {
        let kind = kind.into();
        kind.geometry().validate()?;
        config.validate()?;
        if kind.is_layer() {
            return Err(StageError::invalid("layers are created by the scene"));
        }
        Ok(Self::build(kind, config))
    }

    pub(crate) fn layer() -> Self {
        Self::build(ShapeKind::Layer(Layer), ShapeConfig::default())
    }

    fn build(kind: ShapeKind, props: ShapeConfig) -> Self {
        let now = Stamp::next();
        Self {
            id: ShapeId::next(),
            controller: kind.controller(),
            kind,
            parent: None,
            children: Vec::new(),
            in_scene: false,
            pane: None,
            hub: EventHub::new(),
            translation: Point::ORIGIN,
            scale_factor: Point::new(1.0, 1.0),
            rotation: 0.0,
            props,
            last_updated: now,
            last_transformed: now,
            bounds_cache: Cell::new(None),
            global_cache: Cell::new(Transform::identity()),
            control_points: RefCell::new(None),
        }
    }

    pub fn id(&self) -> ShapeId {
        self.id
    }

    pub fn kind(&self) -> &ShapeKind {
        &self.kind
    }

    pub fn class_name(&self) -> &'static str {
        self.kind.class_name()
    }

    pub fn parent(&self) -> Option<ShapeId> {
        self.parent
    }

    pub fn children(&self) -> &[ShapeId] {
        &self.children
    }

    /// Whether the shape currently hangs off one of the scene's layers
    /// (or is a layer).
    pub fn is_in_scene(&self) -> bool {
        self.in_scene
    }

    pub fn pane(&self) -> Option<&str> {
        self.pane.as_deref()
    }

    /// This shape's own listeners. Subscribe here before inserting the
    /// shape, or through [`Scene::hub_of`](crate::scene::Scene::hub_of).
    pub fn hub_mut(&mut self) -> &mut EventHub {
        &mut self.hub
    }

    pub fn controller(&self) -> &'static dyn ShapeController {
        self.controller
    }

    // ─── Transform components ───

    pub fn translation(&self) -> Point {
        self.translation
    }

    pub fn scale_factor(&self) -> Point {
        self.scale_factor
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    /// Forward map from local space into the parent's child space:
    /// translate, then rotate and scale about the bounds center.
    pub fn local_transform(&self) -> Transform {
        let c = self.logical_bounds().center();
        let t = self.translation;
        Transform::identity()
            .translate(t.x + c.x, t.y + c.y)
            .rotate(self.rotation)
            .scale(self.scale_factor.x, self.scale_factor.y)
            .translate(-c.x, -c.y)
    }

    pub fn has_transform(&self) -> bool {
        self.translation != Point::ORIGIN
            || self.rotation != 0.0
            || self.scale_factor != Point::new(1.0, 1.0)
    }

    // ─── Style ───

    pub fn name(&self) -> Option<&str> {
        self.props.name.as_deref()
    }

    pub fn z_index(&self) -> i32 {
        self.props.z_index
    }

    pub fn is_visible(&self) -> bool {
        self.props.visible
    }

    pub fn line_width(&self) -> f64 {
        self.props.line_width
    }

    pub fn line_cap(&self) -> Option<LineCap> {
        self.props.line_cap
    }

    pub fn line_join(&self) -> Option<LineJoin> {
        self.props.line_join
    }

    pub fn miter_limit(&self) -> Option<f64> {
        self.props.miter_limit
    }

    pub fn line_dash(&self) -> &[f64] {
        &self.props.line_dash
    }

    pub fn line_dash_offset(&self) -> f64 {
        self.props.line_dash_offset
    }

    pub fn fill_style(&self) -> Option<&Paint> {
        self.props.fill_style.as_ref()
    }

    pub fn stroke_style(&self) -> Option<&Paint> {
        self.props.stroke_style.as_ref()
    }

    pub fn control_radius(&self) -> f64 {
        self.props.control_radius
    }

    /// Current value of a non-geometric or transform property.
    /// `None` for [`Property::ControlPoint`], which needs a target point.
    pub fn property(&self, property: Property) -> Option<PropertyValue> {
        let p = &self.props;
        Some(match property {
            Property::Name => PropertyValue::Text(p.name.clone()),
            Property::ZIndex => PropertyValue::Integer(p.z_index),
            Property::Visible => PropertyValue::Flag(p.visible),
            Property::LineWidth => PropertyValue::Number(p.line_width),
            Property::LineCap => PropertyValue::LineCap(p.line_cap),
            Property::LineJoin => PropertyValue::LineJoin(p.line_join),
            Property::MiterLimit => PropertyValue::OptionalNumber(p.miter_limit),
            Property::LineDash => PropertyValue::Dash(p.line_dash.clone()),
            Property::LineDashOffset => PropertyValue::Number(p.line_dash_offset),
            Property::FillStyle => PropertyValue::Paint(p.fill_style.clone()),
            Property::StrokeStyle => PropertyValue::Paint(p.stroke_style.clone()),
            Property::Location => PropertyValue::Point(self.translation),
            Property::Scale => PropertyValue::Point(self.scale_factor),
            Property::Rotation => PropertyValue::Number(self.rotation),
            Property::Bounds => PropertyValue::Bounds(self.logical_bounds()),
            Property::ControlPoint => return None,
        })
    }

    // ─── Bounds ───

    /// Bounds computed fresh from the kind's state, bypassing the cache.
    /// Paths grow by half the line width so the stroke stays inside.
    pub fn eval_bounds(&self) -> Bounds {
        let b = self.kind.geometry().eval_bounds();
        match self.kind {
            ShapeKind::Path(_) => b.inflate(self.props.line_width / 2.0),
            _ => b,
        }
    }

    /// Cached logical bounds.
    pub fn logical_bounds(&self) -> Bounds {
        if let Some(b) = self.bounds_cache.get() {
            return b;
        }
        let b = self.eval_bounds();
        self.bounds_cache.set(Some(b));
        b
    }

    /// Geometry-affecting state changed: drop cached bounds and control
    /// points and advance the transform clock.
    pub(crate) fn mark_transformed(&mut self) {
        self.bounds_cache.set(None);
        let now = Stamp::next();
        self.last_updated = now;
        self.last_transformed = now;
    }

    pub(crate) fn mark_updated(&mut self) {
        self.last_updated = Stamp::next();
    }

    pub fn last_updated(&self) -> Stamp {
        self.last_updated
    }

    pub fn last_transformed(&self) -> Stamp {
        self.last_transformed
    }

    /// Control points from the shape's controller, recomputed only after a
    /// geometry change.
    pub fn control_points(&self) -> Rc<[ControlPoint]> {
        if let Some((stamp, points)) = self.control_points.borrow().as_ref()
            && *stamp == self.last_transformed
        {
            return Rc::clone(points);
        }
        let points: Rc<[ControlPoint]> = self.controller.eval_control_points(self).into();
        *self.control_points.borrow_mut() = Some((self.last_transformed, Rc::clone(&points)));
        points
    }

    /// Write a non-geometric property. The scene calls this only after the
    /// change passed validation.
    pub(crate) fn write_property(&mut self, value: PropertyValue, property: Property) -> Result<()> {
        let p = &mut self.props;
        match (property, value) {
            (Property::Name, PropertyValue::Text(v)) => p.name = v,
            (Property::ZIndex, PropertyValue::Integer(v)) => p.z_index = v,
            (Property::Visible, PropertyValue::Flag(v)) => p.visible = v,
            (Property::LineWidth, PropertyValue::Number(v)) => {
                p.line_width = v;
                // path bounds carry a stroke margin
                self.mark_transformed();
                return Ok(());
            }
            (Property::LineCap, PropertyValue::LineCap(v)) => p.line_cap = v,
            (Property::LineJoin, PropertyValue::LineJoin(v)) => p.line_join = v,
            (Property::MiterLimit, PropertyValue::OptionalNumber(v)) => p.miter_limit = v,
            (Property::LineDash, PropertyValue::Dash(v)) => p.line_dash = v,
            (Property::LineDashOffset, PropertyValue::Number(v)) => p.line_dash_offset = v,
            (Property::FillStyle, PropertyValue::Paint(v)) => p.fill_style = v,
            (Property::StrokeStyle, PropertyValue::Paint(v)) => p.stroke_style = v,
            (property, value) => {
                return Err(StageError::invalid(format!(
                    "cannot write {value:?} to {}",
                    property.as_str()
                )));
            }
        }
        self.mark_updated();
        Ok(())
    }
}

/// Check that `value` fits `property` before any listener sees it.
pub(crate) fn validate_value(property: Property, value: &PropertyValue) -> Result<()> {
    match (property, value) {
        (Property::LineWidth, PropertyValue::Number(w)) => check_line_width(*w),
        (Property::LineDash, PropertyValue::Dash(d)) => check_dash(d),
        (Property::MiterLimit, PropertyValue::OptionalNumber(m)) => check_miter_limit(*m),
        (Property::LineDashOffset, PropertyValue::Number(o)) if !o.is_finite() => {
            Err(StageError::invalid("line dash offset must be finite"))
        }
        (
            Property::Name
            | Property::ZIndex
            | Property::Visible
            | Property::LineCap
            | Property::LineJoin
            | Property::LineDashOffset
            | Property::FillStyle
            | Property::StrokeStyle,
            _,
        ) => Ok(()),
        (property, _) => Err(StageError::invalid(format!(
            "{} is set through its geometry method",
            property.as_str()
        ))),
    }
}
