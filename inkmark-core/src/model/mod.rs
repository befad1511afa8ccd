pub mod annotation;
pub mod color;
pub mod text_range;

pub use annotation::Annotation;
pub use color::{HighlightColor, UnknownColor};
pub use text_range::TextRange;
