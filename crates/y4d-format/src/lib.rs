mod format;
mod highlight;
mod lang;

pub use format::{format, format_with};
pub use highlight::{HighlightError, Highlighter, SyntectHighlighter};
pub use lang::lookup_language;
