//! Error types for the highlight engine
//!
//! None of these are fatal: every caller degrades to "operation skipped".

use thiserror::Error;

use crate::markup::MarkupError;
use crate::storage::StorageError;

/// Engine-wide result type
pub type Result<T> = std::result::Result<T, HighlightError>;

#[derive(Error, Debug)]
pub enum HighlightError {
    #[error("selection anchors resolve outside container")]
    SelectionOutOfContainer,

    #[error("selection is empty or collapsed")]
    EmptySelection,

    #[error("container not found: {0}")]
    ContainerNotFound(String),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("markup error: {0}")]
    Markup(#[from] MarkupError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
