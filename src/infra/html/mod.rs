//! Markup in and out of the document model.

mod export;
mod parse;
mod sanitize;
mod serialize;

pub use export::{ExportError, strip_markers};
pub use parse::parse_fragment;
pub use sanitize::PasteSanitizer;
pub use serialize::{inner_html, outer_html};
