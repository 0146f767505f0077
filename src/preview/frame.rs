//! The sandboxed frame that hosts the rendered page
//!
//! A new page is mounted in two steps, mirroring how an embedded frame
//! behaves: `mount` discards the old tree and starts loading the new one,
//! and `finish_load` publishes it and fires the load signal. While loading,
//! the document is unreachable and every host operation degrades to a no-op.

use super::{DocumentHost, ScrollAlign};
use crate::dom::{DocumentTree, NodeId};
use log::debug;

/// Load state of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// Nothing has ever been mounted
    #[default]
    Empty,
    /// A document was mounted but has not signalled load yet
    Loading,
    /// The document is live and reachable
    Loaded,
}

/// Hosts the live document tree for the previewer.
#[derive(Debug, Default)]
pub struct PreviewFrame {
    document: Option<DocumentTree>,
    pending: Option<DocumentTree>,
    state: LoadState,
    generation: u64,
    scroll_target: Option<(NodeId, ScrollAlign)>,
}

impl PreviewFrame {
    /// Create an empty frame.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the hosted document wholesale.
    ///
    /// The previous tree (and any markers in it) is dropped immediately.
    /// Returns the generation of the new document.
    pub fn mount(&mut self, tree: DocumentTree) -> u64 {
        self.document = None;
        self.pending = Some(tree);
        self.scroll_target = None;
        self.state = LoadState::Loading;
        self.generation += 1;
        debug!("Frame mounting document generation {}", self.generation);
        self.generation
    }

    /// Complete loading of the mounted document.
    ///
    /// Returns the generation that finished loading, or `None` if nothing
    /// was pending.
    pub fn finish_load(&mut self) -> Option<u64> {
        let mut tree = self.pending.take()?;
        let root = tree.root();
        tree.normalize(root);
        self.document = Some(tree);
        self.state = LoadState::Loaded;
        debug!("Frame loaded document generation {}", self.generation);
        Some(self.generation)
    }

    /// Mount and immediately finish loading.
    pub fn load(&mut self, tree: DocumentTree) -> u64 {
        self.mount(tree);
        self.finish_load();
        self.generation
    }

    /// Current load state.
    pub fn load_state(&self) -> LoadState {
        self.state
    }

    /// The node most recently scrolled into view.
    pub fn scroll_target(&self) -> Option<NodeId> {
        self.scroll_target.map(|(node, _)| node)
    }

    /// Serialize the live page, prefixed with a doctype.
    pub fn html(&self) -> Option<String> {
        self.document
            .as_ref()
            .map(|tree| format!("<!DOCTYPE html>{}", tree.to_html()))
    }
}

impl DocumentHost for PreviewFrame {
    fn document(&self) -> Option<&DocumentTree> {
        match self.state {
            LoadState::Loaded => self.document.as_ref(),
            _ => None,
        }
    }

    fn document_mut(&mut self) -> Option<&mut DocumentTree> {
        match self.state {
            LoadState::Loaded => self.document.as_mut(),
            _ => None,
        }
    }

    fn generation(&self) -> u64 {
        self.generation
    }

    fn is_loaded(&self) -> bool {
        self.state == LoadState::Loaded
    }

    fn scroll_into_view(&mut self, node: NodeId, align: ScrollAlign) -> bool {
        let attached = self
            .document()
            .map(|tree| tree.is_attached(node))
            .unwrap_or(false);
        if attached {
            self.scroll_target = Some((node, align));
        }
        attached
    }
}
