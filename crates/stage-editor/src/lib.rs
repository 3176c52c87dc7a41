pub mod config;
pub mod index;
pub mod input;
pub mod pane;
pub mod selection;
pub mod shortcuts;
pub mod stage;

pub use config::StageConfig;
pub use index::ShapeIndex;
pub use input::{InputEvent, Modifiers};
pub use pane::{Pane, PaneSet, Viewport};
pub use selection::Selection;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use stage::Stage;
