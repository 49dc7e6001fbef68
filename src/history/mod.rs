//! Screen History
//!
//! Groups the flat operation sequence into per-window screen segments and
//! tracks transitions between screen definitions.

pub mod window;
pub mod screen_history;

pub use screen_history::{
    HistoryEntry, InputElementValue, ScreenHistory, ScreenNode, ScreenNodeId, ScreenRef,
    ScreenSegment, ScreenTransition,
};
pub use window::WindowRegistry;
