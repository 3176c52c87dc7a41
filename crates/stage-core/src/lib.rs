pub mod clock;
pub mod controller;
pub mod error;
pub mod event;
pub mod geom;
pub mod id;
pub mod kinds;
pub mod path;
pub mod scene;
pub mod shape;
pub mod style;

pub use clock::Stamp;
pub use controller::{HitInfo, HitKind, ResizeDirection, ShapeController, Snapshot};
pub use error::{Result, StageError};
pub use event::{
    Change, Event, EventHub, EventKind, ListenerId, Property, PropertyValue, ShapeList,
};
pub use geom::{Bounds, Length, LengthUnit, Point, Transform};
pub use id::ShapeId;
pub use kinds::{Arrow, Circle, Ellipse, Geometry, Group, Layer, Plus, ShapeKind, Square, Triangle};
pub use path::{Path, PathPoint, Segment};
pub use scene::{Scene, ShapeMut};
pub use shape::{Shape, ShapeConfig};
pub use style::{Color, GradientStop, LineCap, LineJoin, Paint, StyleRole};
