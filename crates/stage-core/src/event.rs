//! Two-phase change notification.
//!
//! Every mutation builds one [`Event`] and offers it to the "before"
//! listeners of its kind; any of them can veto by returning `false`. Once
//! the change is applied the same record, now marked committed, goes to the
//! "after" listeners. Delivery is synchronous and never queued.

use crate::error::Result;
use crate::geom::{Bounds, Point};
use crate::id::ShapeId;
use crate::path::PathPoint;
use crate::style::{LineCap, LineJoin, Paint};
use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;

/// Ids carried by structural events (the moved shape's descendants, the
/// shapes entering or leaving a selection).
pub type ShapeList = SmallVec<[ShapeId; 4]>;

// ─── Properties ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Name,
    ZIndex,
    Visible,
    LineWidth,
    LineCap,
    LineJoin,
    MiterLimit,
    LineDash,
    LineDashOffset,
    FillStyle,
    StrokeStyle,
    Location,
    Scale,
    Rotation,
    Bounds,
    ControlPoint,
}

impl Property {
    pub fn as_str(self) -> &'static str {
        match self {
            Property::Name => "name",
            Property::ZIndex => "zIndex",
            Property::Visible => "visible",
            Property::LineWidth => "lineWidth",
            Property::LineCap => "lineCap",
            Property::LineJoin => "lineJoin",
            Property::MiterLimit => "miterLimit",
            Property::LineDash => "lineDash",
            Property::LineDashOffset => "lineDashOffset",
            Property::FillStyle => "fillStyle",
            Property::StrokeStyle => "strokeStyle",
            Property::Location => "location",
            Property::Scale => "scale",
            Property::Rotation => "angle",
            Property::Bounds => "bounds",
            Property::ControlPoint => "controlPoint",
        }
    }

    /// Whether the property changes where or how large the shape is.
    pub fn is_geometric(self) -> bool {
        matches!(
            self,
            Property::Location
                | Property::Scale
                | Property::Rotation
                | Property::Bounds
                | Property::ControlPoint
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Text(Option<String>),
    Integer(i32),
    Number(f64),
    OptionalNumber(Option<f64>),
    Flag(bool),
    Point(Point),
    Bounds(Bounds),
    LineCap(Option<LineCap>),
    LineJoin(Option<LineJoin>),
    Paint(Option<Paint>),
    Dash(Vec<f64>),
    PathPoint { target: PathPoint, point: Point },
}

// ─── Events ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    PropertyChanged(Property),
    ShapeAdded,
    ShapeRemoved,
    ShapeIndexChanged,
    LayerAdded,
    LayerRemoved,
    ShapesSelected,
    ShapesUnselected,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventKind::PropertyChanged(p) => write!(f, "PropertyChanged:{}", p.as_str()),
            EventKind::ShapeAdded => f.write_str("ShapeAdded"),
            EventKind::ShapeRemoved => f.write_str("ShapeRemoved"),
            EventKind::ShapeIndexChanged => f.write_str("ShapeIndexChanged"),
            EventKind::LayerAdded => f.write_str("LayerAdded"),
            EventKind::LayerRemoved => f.write_str("LayerRemoved"),
            EventKind::ShapesSelected => f.write_str("ShapesSelected"),
            EventKind::ShapesUnselected => f.write_str("ShapesUnselected"),
        }
    }
}

/// What a mutation proposes to change.
#[derive(Debug, Clone, PartialEq)]
pub enum Change {
    PropertyChanged {
        shape: ShapeId,
        property: Property,
        old: PropertyValue,
        new: PropertyValue,
    },
    ShapeAdded {
        parent: ShapeId,
        shape: ShapeId,
        descendants: ShapeList,
    },
    ShapeRemoved {
        parent: ShapeId,
        shape: ShapeId,
        descendants: ShapeList,
    },
    ShapeIndexChanged {
        parent: ShapeId,
        shape: ShapeId,
        old_index: usize,
        new_index: usize,
    },
    LayerAdded {
        layer: ShapeId,
        index: usize,
    },
    LayerRemoved {
        layer: ShapeId,
        descendants: ShapeList,
    },
    ShapesSelected {
        shapes: ShapeList,
    },
    ShapesUnselected {
        shapes: ShapeList,
    },
}

impl Change {
    pub fn kind(&self) -> EventKind {
        match self {
            Change::PropertyChanged { property, .. } => EventKind::PropertyChanged(*property),
            Change::ShapeAdded { .. } => EventKind::ShapeAdded,
            Change::ShapeRemoved { .. } => EventKind::ShapeRemoved,
            Change::ShapeIndexChanged { .. } => EventKind::ShapeIndexChanged,
            Change::LayerAdded { .. } => EventKind::LayerAdded,
            Change::LayerRemoved { .. } => EventKind::LayerRemoved,
            Change::ShapesSelected { .. } => EventKind::ShapesSelected,
            Change::ShapesUnselected { .. } => EventKind::ShapesUnselected,
        }
    }
}

/// An immutable change record. Before-listeners see it uncommitted;
/// after-listeners see the same record with [`Event::is_committed`] set.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    change: Change,
    committed: bool,
}

impl Event {
    pub fn new(change: Change) -> Self {
        Self {
            change,
            committed: false,
        }
    }

    pub fn change(&self) -> &Change {
        &self.change
    }

    pub fn kind(&self) -> EventKind {
        self.change.kind()
    }

    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Seal the record once the mutation has been applied.
    #[must_use]
    pub fn into_committed(self) -> Self {
        Self {
            committed: true,
            ..self
        }
    }
}

// ─── Hub ─────────────────────────────────────────────────────────────────

/// A listener returns `Ok(false)` to veto (before) or stop delivery (after).
pub type Listener = Box<dyn FnMut(&Event) -> Result<bool>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

#[derive(Default)]
pub struct EventHub {
    before: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
    after: HashMap<EventKind, Vec<(ListenerId, Listener)>>,
    any: Vec<(ListenerId, Listener)>,
    next_id: u64,
}

impl fmt::Debug for EventHub {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = |m: &HashMap<EventKind, Vec<(ListenerId, Listener)>>| {
            m.values().map(Vec::len).sum::<usize>()
        };
        f.debug_struct("EventHub")
            .field("before", &count(&self.before))
            .field("after", &count(&self.after))
            .field("any", &self.any.len())
            .finish()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self) -> ListenerId {
        self.next_id += 1;
        ListenerId(self.next_id)
    }

    /// Register a veto-capable listener for `kind`.
    pub fn before(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&Event) -> Result<bool> + 'static,
    ) -> ListenerId {
        let id = self.allocate();
        self.before
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Register an observer for committed events of `kind`.
    pub fn on(
        &mut self,
        kind: EventKind,
        listener: impl FnMut(&Event) -> Result<bool> + 'static,
    ) -> ListenerId {
        let id = self.allocate();
        self.after
            .entry(kind)
            .or_default()
            .push((id, Box::new(listener)));
        id
    }

    /// Observe every committed event, after the kind-specific listeners.
    pub fn on_any(&mut self, listener: impl FnMut(&Event) -> Result<bool> + 'static) -> ListenerId {
        let id = self.allocate();
        self.any.push((id, Box::new(listener)));
        id
    }

    /// Unregister a listener. Returns whether it was found.
    pub fn off(&mut self, id: ListenerId) -> bool {
        let mut found = false;
        for list in self.before.values_mut().chain(self.after.values_mut()) {
            let len = list.len();
            list.retain(|(lid, _)| *lid != id);
            found |= list.len() != len;
        }
        let len = self.any.len();
        self.any.retain(|(lid, _)| *lid != id);
        found || self.any.len() != len
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.before.get(&kind).map_or(0, Vec::len) + self.after.get(&kind).map_or(0, Vec::len)
    }

    /// Run the before-listeners in registration order. Stops at the first
    /// veto; later listeners are not called.
    pub fn validate_before(&mut self, event: &Event) -> Result<bool> {
        let Some(listeners) = self.before.get_mut(&event.kind()) else {
            return Ok(true);
        };
        for (id, listener) in listeners.iter_mut() {
            if !listener(event)? {
                log::trace!("{} vetoed by listener {:?}", event.kind(), id);
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Run the after-listeners, then the catch-all observers. Stops at the
    /// first `false`.
    pub fn trigger_on(&mut self, event: &Event) -> Result<bool> {
        if let Some(listeners) = self.after.get_mut(&event.kind()) {
            for (_, listener) in listeners.iter_mut() {
                if !listener(event)? {
                    return Ok(false);
                }
            }
        }
        for (_, listener) in self.any.iter_mut() {
            if !listener(event)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
