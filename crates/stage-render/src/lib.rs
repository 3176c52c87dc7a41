pub mod context;
pub mod paint;
pub mod recording;

pub use context::PaintContext;
pub use paint::{
    apply_styles, apply_transforms, draw, draw_controls, paint_scene, paint_shape,
    revert_transforms,
};
pub use recording::{DrawOp, RecordingContext};
