//! Inkmark Core - Platform-agnostic two-color highlight engine
//!
//! This crate holds everything that does not depend on a particular host:
//! the annotation model, character offset mapping over any [`TextTree`],
//! same-color interval merging, the persisted per-session store and the
//! reconciler that paints highlights back onto a tree. It runs both in the
//! native CLI and inside the WASM binding.

pub mod config;
pub mod error;
pub mod interaction;
pub mod markup;
pub mod merge;
pub mod model;
pub mod offsets;
pub mod persist;
pub mod reconcile;
pub mod session;
pub mod storage;
pub mod tree;

pub use config::{HighlightConfig, SessionConfig};
pub use error::{HighlightError, Result};
pub use interaction::{
    Gesture, Interaction, InteractionState, NoPrompts, Outcome, PromptAnchor, PromptSurface,
    SelectionCandidate,
};
pub use markup::{MarkupError, MarkupTree, NodeId};
pub use merge::{color_at, merge, paint_order};
pub use model::{Annotation, HighlightColor, TextRange, UnknownColor};
pub use offsets::{map_selection_to_offsets, MappedSelection, TreePoint, TreeRange};
pub use reconcile::{ReconcileReport, Reconciler, RenderedMarkup};
pub use session::{Session, SessionState};
pub use storage::{KeyValueStore, MemoryStore, StorageError};
pub use tree::{Fragment, HighlightMark, TextTree};
