//! Arena-backed document tree
//!
//! Nodes are addressed by `NodeId` handles into a flat arena. Removed nodes
//! leave a free slot that later insertions reuse, so repeated highlight and
//! clear cycles on the same document keep the arena at a steady size.

// ─────────────────────────────────────────────────────────────────────────────
// Node Types
// ─────────────────────────────────────────────────────────────────────────────

/// Handle to a node in a `DocumentTree`.
///
/// A handle is only meaningful for the tree that produced it, and only until
/// that node is removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element with a tag name and ordered attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    /// Create an element with no attributes.
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: &str, value: &str) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Get an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing any existing value.
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attrs.iter_mut().find(|(key, _)| key == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.attrs.push((name.to_string(), value.to_string())),
        }
    }

    /// Remove an attribute if present.
    pub fn remove_attr(&mut self, name: &str) {
        self.attrs.retain(|(key, _)| key != name);
    }

    /// Check whether the `class` attribute contains `class`.
    pub fn has_class(&self, class: &str) -> bool {
        self.attr("class")
            .map(|classes| classes.split_whitespace().any(|c| c == class))
            .unwrap_or(false)
    }

    /// Add a class if not already present.
    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let classes = match self.attr("class") {
            Some(existing) if !existing.trim().is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", &classes);
    }

    /// Remove a class if present. Drops the attribute when it becomes empty.
    pub fn remove_class(&mut self, class: &str) {
        let Some(existing) = self.attr("class") else {
            return;
        };
        let remaining: Vec<&str> = existing.split_whitespace().filter(|c| *c != class).collect();
        if remaining.is_empty() {
            self.remove_attr("class");
        } else {
            let joined = remaining.join(" ");
            self.set_attr("class", &joined);
        }
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// The tree root
    Document,
    /// An element with children
    Element(Element),
    /// A run of text
    Text(String),
    /// Markup passed through untouched (comments, doctypes)
    Raw(String),
}

/// A piece of a fragment that replaces a text node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment {
    /// Plain text
    Text(String),
    /// Text wrapped in a single element
    Wrapped { element: Element, text: String },
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

// ─────────────────────────────────────────────────────────────────────────────
// DocumentTree
// ─────────────────────────────────────────────────────────────────────────────

/// A mutable HTML-like document tree.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<Option<Node>>,
    free: Vec<usize>,
    root: NodeId,
}

impl Default for DocumentTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentTree {
    /// Create an empty tree containing only the document root.
    pub fn new() -> Self {
        Self {
            nodes: vec![Some(Node {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            })],
            free: Vec::new(),
            root: NodeId(0),
        }
    }

    /// The document root.
    pub fn root(&self) -> NodeId {
        self.root
    }

    /// Number of live nodes, including the root.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    /// Whether the tree holds nothing but the root.
    pub fn is_empty(&self) -> bool {
        self.children(self.root).is_empty()
    }

    fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0).and_then(Option::as_mut)
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let node = Node {
            kind,
            parent,
            children: Vec::new(),
        };
        match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = Some(node);
                NodeId(slot)
            }
            None => {
                self.nodes.push(Some(node));
                NodeId(self.nodes.len() - 1)
            }
        }
    }

    /// Release a node and its whole subtree. Does not touch the parent's child list.
    fn release(&mut self, id: NodeId) {
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            if let Some(node) = self.nodes.get_mut(current.0).and_then(Option::take) {
                stack.extend(node.children);
                self.free.push(current.0);
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────────

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.alloc(kind, Some(parent));
        match self.node_mut(parent) {
            Some(node) => node.children.push(id),
            None => log::warn!("Appending to a detached node {:?}", parent),
        }
        id
    }

    /// Append an element under `parent`.
    pub fn append_element(&mut self, parent: NodeId, element: Element) -> NodeId {
        self.append(parent, NodeKind::Element(element))
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> NodeId {
        self.append(parent, NodeKind::Text(text.to_string()))
    }

    /// Append a verbatim markup node under `parent`.
    pub fn append_raw(&mut self, parent: NodeId, html: &str) -> NodeId {
        self.append(parent, NodeKind::Raw(html.to_string()))
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the kind of a node.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.node(id).map(|node| &node.kind)
    }

    /// Get a node as an element.
    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match self.kind(id) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Get a node as a mutable element.
    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match self.node_mut(id).map(|node| &mut node.kind) {
            Some(NodeKind::Element(element)) => Some(element),
            _ => None,
        }
    }

    /// Get the content of a text node.
    pub fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id) {
            Some(NodeKind::Text(text)) => Some(text.as_str()),
            _ => None,
        }
    }

    /// Children of a node (empty for removed nodes).
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.node(id)
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// Parent of a node.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).and_then(|node| node.parent)
    }

    /// Whether `id` is a live node reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            if current == self.root {
                return true;
            }
            match self.parent(current) {
                Some(parent) if self.children(parent).contains(&current) => current = parent,
                _ => return false,
            }
        }
    }

    /// All nodes below `id` (inclusive) in depth-first pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut order = Vec::new();
        if self.node(id).is_none() {
            return order;
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        order
    }

    /// Elements below the root matching `predicate`, in document order.
    pub fn find_elements<F>(&self, predicate: F) -> Vec<NodeId>
    where
        F: Fn(&Element) -> bool,
    {
        self.descendants(self.root)
            .into_iter()
            .filter(|id| self.element(*id).map(&predicate).unwrap_or(false))
            .collect()
    }

    /// First element with the given `id` attribute.
    pub fn element_by_id(&self, html_id: &str) -> Option<NodeId> {
        self.find_elements(|element| element.attr("id") == Some(html_id))
            .into_iter()
            .next()
    }

    /// Concatenated text of every text node below `id`.
    ///
    /// Raw markup nodes contribute nothing.
    pub fn text_content(&self, id: NodeId) -> String {
        self.descendants(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .collect()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Replace a text node with a sequence of fragments, in place.
    ///
    /// Returns the ids of the nodes created for each fragment, in order. For
    /// `Fragment::Wrapped` the id is that of the wrapping element. Returns an
    /// empty vector (and leaves the tree untouched) if `id` is not an
    /// attached text node.
    pub fn replace_with(&mut self, id: NodeId, fragments: Vec<Fragment>) -> Vec<NodeId> {
        if self.text(id).is_none() {
            return Vec::new();
        }
        let Some(parent) = self.parent(id) else {
            return Vec::new();
        };
        let Some(position) = self.children(parent).iter().position(|c| *c == id) else {
            return Vec::new();
        };

        let mut created = Vec::with_capacity(fragments.len());
        for fragment in fragments {
            let new_id = match fragment {
                Fragment::Text(text) => self.alloc(NodeKind::Text(text), Some(parent)),
                Fragment::Wrapped { element, text } => {
                    let wrapper = self.alloc(NodeKind::Element(element), Some(parent));
                    let inner = self.alloc(NodeKind::Text(text), Some(wrapper));
                    if let Some(node) = self.node_mut(wrapper) {
                        node.children.push(inner);
                    }
                    wrapper
                }
            };
            created.push(new_id);
        }

        if let Some(node) = self.node_mut(parent) {
            node.children
                .splice(position..=position, created.iter().copied());
        }
        self.release(id);
        created
    }

    /// Replace an element with its own children.
    ///
    /// Returns the parent the children moved into, or `None` if `id` is not
    /// an attached element.
    pub fn unwrap(&mut self, id: NodeId) -> Option<NodeId> {
        self.element(id)?;
        let parent = self.parent(id)?;
        let position = self.children(parent).iter().position(|c| *c == id)?;

        let children = self
            .node_mut(id)
            .map(|node| std::mem::take(&mut node.children))
            .unwrap_or_default();
        for child in &children {
            if let Some(node) = self.node_mut(*child) {
                node.parent = Some(parent);
            }
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.splice(position..=position, children);
        }
        self.release(id);
        Some(parent)
    }

    /// Merge adjacent text children and drop empty text nodes, recursively.
    pub fn normalize(&mut self, id: NodeId) {
        for node in self.descendants(id) {
            self.normalize_children(node);
        }
    }

    /// Merge adjacent text children of a single node.
    pub fn normalize_children(&mut self, id: NodeId) {
        let children = self.children(id).to_vec();
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        let mut removed: Vec<NodeId> = Vec::new();

        for child in children {
            let Some(text) = self.text(child).map(str::to_string) else {
                kept.push(child);
                continue;
            };
            if text.is_empty() {
                removed.push(child);
                continue;
            }
            let previous_text = kept.last().filter(|prev| self.text(**prev).is_some());
            match previous_text.copied() {
                Some(previous) => {
                    if let Some(Node {
                        kind: NodeKind::Text(existing),
                        ..
                    }) = self.node_mut(previous)
                    {
                        existing.push_str(&text);
                    }
                    removed.push(child);
                }
                None => kept.push(child),
            }
        }

        if removed.is_empty() {
            return;
        }
        if let Some(node) = self.node_mut(id) {
            node.children = kept;
        }
        for child in removed {
            self.release(child);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
