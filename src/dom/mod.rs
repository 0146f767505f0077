//! Headless HTML document model for mdr
//!
//! The previewer never hands its page to a browser engine. Instead the
//! rendered markdown is built directly into a `DocumentTree`, an arena of
//! element, text, and raw-markup nodes that the search engine can walk and
//! rewrite in place, and that serializes back to HTML for display. Raw HTML
//! in the markdown is parsed into the same elements and text.

mod html;
mod parse;
mod tree;

pub use html::{escape_attr, escape_text};
pub use parse::HtmlCursor;
pub use tree::{DocumentTree, Element, Fragment, NodeId, NodeKind};
