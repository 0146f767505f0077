//! Preview hosting for mdr
//!
//! This module owns the frame the rendered page lives in and defines the
//! `DocumentHost` contract the search engine works against: reach the live
//! tree (if any), know which document generation is mounted, and scroll a
//! node into view.

mod frame;

pub use frame::{LoadState, PreviewFrame};

use crate::dom::{DocumentTree, NodeId};

/// Vertical alignment for scroll requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScrollAlign {
    /// Top of the node at the top of the viewport
    Start,
    /// Node centered in the viewport
    #[default]
    Center,
}

/// A surface hosting a mutable document tree.
///
/// `document` and `document_mut` return `None` whenever the tree is not
/// reachable (nothing mounted, or a mount has not finished loading).
pub trait DocumentHost {
    /// The live document, if reachable.
    fn document(&self) -> Option<&DocumentTree>;

    /// The live document for in-place mutation, if reachable.
    fn document_mut(&mut self) -> Option<&mut DocumentTree>;

    /// Generation of the most recently mounted document.
    fn generation(&self) -> u64;

    /// Whether the current generation has finished loading.
    fn is_loaded(&self) -> bool;

    /// Bring `node` into the viewport. Returns `false` if the node is not
    /// attached to the live document.
    fn scroll_into_view(&mut self, node: NodeId, align: ScrollAlign) -> bool;
}
