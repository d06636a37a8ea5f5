//! PDF Editor Core Library
//!
//! Headless editing core for the PDF editor: tools, selection, inline text
//! editing, search and replace, page operations, history and saving.

pub mod config;
pub mod error;
pub mod history;
pub mod interaction;
pub mod overlay;
pub mod search;
pub mod selection;
pub mod session;
pub mod task;
pub mod tool;

pub use config::EditorConfig;
pub use error::{EditorError, SaveError};
pub use history::History;
pub use interaction::{InteractionState, PendingImage, PointerEvent, ScreenPoint};
pub use overlay::OverlayItem;
pub use search::{SearchMatch, SearchState};
pub use selection::{ElementId, Selection, StyleAction};
pub use session::{EditorSession, SaveJob};
pub use task::{ignore_progress, CancellationToken, Progress, ProgressCallback};
pub use tool::{Gesture, Tool};

pub use doc_model;
pub use pdf_engine::LoadError;
