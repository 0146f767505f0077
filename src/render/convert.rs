//! Conversion from the comrak AST to a document tree
//!
//! Walks the parsed markdown and appends the equivalent HTML elements under
//! a parent node, collecting the heading outline on the way. Raw HTML is
//! parsed into elements too; an element it leaves open receives the
//! following sibling blocks, as it would in a browser.

use super::HeadingEntry;
use crate::dom::{DocumentTree, Element, HtmlCursor, NodeId};
use comrak::nodes::{AstNode, ListType, NodeValue, TableAlignment};
use std::collections::HashMap;

/// Turn heading text into a URL fragment.
///
/// Lowercases, collapses every run of characters outside `[a-z0-9]` into a
/// single `-`, and trims dashes from both ends.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.to_lowercase().chars() {
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            slug.push(c);
            pending_dash = false;
        } else {
            pending_dash = true;
        }
    }
    slug
}

fn alignment_style(alignment: TableAlignment) -> Option<&'static str> {
    match alignment {
        TableAlignment::None => None,
        TableAlignment::Left => Some("text-align: left"),
        TableAlignment::Center => Some("text-align: center"),
        TableAlignment::Right => Some("text-align: right"),
    }
}

/// Plain text of a markdown subtree, as it would read on the page.
fn plain_text<'a>(node: &'a AstNode<'a>) -> String {
    let mut text = String::new();
    for descendant in node.descendants() {
        match &descendant.data.borrow().value {
            NodeValue::Text(t) => text.push_str(t),
            NodeValue::Code(code) => text.push_str(&code.literal),
            NodeValue::SoftBreak | NodeValue::LineBreak => text.push(' '),
            _ => {}
        }
    }
    text.trim().to_string()
}

/// Whether a paragraph sits directly inside an item of a tight list.
fn in_tight_list<'a>(node: &'a AstNode<'a>) -> bool {
    let Some(item) = node.parent() else {
        return false;
    };
    if !matches!(
        item.data.borrow().value,
        NodeValue::Item(_) | NodeValue::TaskItem(_)
    ) {
        return false;
    }
    let Some(list) = item.parent() else {
        return false;
    };
    let tight = match &list.data.borrow().value {
        NodeValue::List(list) => list.tight,
        _ => false,
    };
    tight
}

/// Builds document tree nodes from a comrak AST.
pub(super) struct Converter<'t> {
    tree: &'t mut DocumentTree,
    outline: Vec<HeadingEntry>,
    slugs: HashMap<String, usize>,
    alignments: Vec<TableAlignment>,
    /// One cursor per sibling run being converted
    cursors: Vec<HtmlCursor>,
}

impl<'t> Converter<'t> {
    pub(super) fn new(tree: &'t mut DocumentTree) -> Self {
        Self {
            tree,
            outline: Vec::new(),
            slugs: HashMap::new(),
            alignments: Vec::new(),
            cursors: Vec::new(),
        }
    }

    /// The heading outline collected so far.
    pub(super) fn into_outline(self) -> Vec<HeadingEntry> {
        self.outline
    }

    /// Allocate a unique heading id for `text`.
    fn heading_id(&mut self, text: &str) -> String {
        let mut base = slugify(text);
        if base.is_empty() {
            base = "section".to_string();
        }
        let seen = self.slugs.entry(base.clone()).or_insert(0);
        let id = if *seen == 0 {
            base
        } else {
            format!("{}-{}", base, seen)
        };
        *seen += 1;
        id
    }

    fn children<'a>(&mut self, node: &'a AstNode<'a>, parent: NodeId) {
        self.cursors.push(HtmlCursor::new(parent));
        for child in node.children() {
            let at = self.cursors.last().map(HtmlCursor::current).unwrap_or(parent);
            self.convert(child, at);
        }
        self.cursors.pop();
    }

    fn raw_html(&mut self, parent: NodeId, html: &str) {
        match self.cursors.last_mut() {
            Some(cursor) => cursor.feed(self.tree, html),
            None => HtmlCursor::new(parent).feed(self.tree, html),
        }
    }

    fn wrap<'a>(&mut self, node: &'a AstNode<'a>, parent: NodeId, element: Element) -> NodeId {
        let id = self.tree.append_element(parent, element);
        self.children(node, id);
        id
    }

    /// Append the HTML for `node` under `parent`.
    pub(super) fn convert<'a>(&mut self, node: &'a AstNode<'a>, parent: NodeId) {
        let ast = node.data.borrow();
        match &ast.value {
            NodeValue::Document => self.children(node, parent),
            NodeValue::FrontMatter(_) => {}
            NodeValue::BlockQuote => {
                self.wrap(node, parent, Element::new("blockquote"));
            }
            NodeValue::List(list) => {
                let element = match list.list_type {
                    ListType::Bullet => Element::new("ul"),
                    ListType::Ordered if list.start != 1 => {
                        Element::new("ol").with_attr("start", &list.start.to_string())
                    }
                    ListType::Ordered => Element::new("ol"),
                };
                self.wrap(node, parent, element);
            }
            NodeValue::Item(_) => {
                self.wrap(node, parent, Element::new("li"));
            }
            NodeValue::TaskItem(checked) => {
                let li = self
                    .tree
                    .append_element(parent, Element::new("li").with_attr("class", "task-list-item"));
                let mut checkbox = Element::new("input")
                    .with_attr("type", "checkbox")
                    .with_attr("disabled", "");
                if checked.map(|c| c == 'x' || c == 'X').unwrap_or(false) {
                    checkbox.set_attr("checked", "");
                }
                self.tree.append_element(li, checkbox);
                self.tree.append_text(li, " ");
                self.children(node, li);
            }
            NodeValue::DescriptionList => {
                self.wrap(node, parent, Element::new("dl"));
            }
            NodeValue::DescriptionItem(_) => self.children(node, parent),
            NodeValue::DescriptionTerm => {
                self.wrap(node, parent, Element::new("dt"));
            }
            NodeValue::DescriptionDetails => {
                self.wrap(node, parent, Element::new("dd"));
            }
            NodeValue::CodeBlock(code) => {
                let pre = self.tree.append_element(parent, Element::new("pre"));
                let mut element = Element::new("code");
                if let Some(language) = code.info.split_whitespace().next() {
                    element.set_attr("class", &format!("language-{}", language));
                }
                let code_el = self.tree.append_element(pre, element);
                self.tree.append_text(code_el, &code.literal);
            }
            NodeValue::HtmlBlock(html) => self.raw_html(parent, &html.literal),
            NodeValue::Paragraph => {
                if in_tight_list(node) {
                    self.children(node, parent);
                } else {
                    self.wrap(node, parent, Element::new("p"));
                }
            }
            NodeValue::Heading(heading) => {
                let level = heading.level.clamp(1, 6);
                let mut element = Element::new(&format!("h{}", level));
                let text = plain_text(node);
                if !text.is_empty() {
                    let id = self.heading_id(&text);
                    element.set_attr("id", &id);
                    self.outline.push(HeadingEntry { id, text, level });
                }
                self.wrap(node, parent, element);
            }
            NodeValue::ThematicBreak => {
                self.tree.append_element(parent, Element::new("hr"));
            }
            NodeValue::FootnoteDefinition(def) => {
                let element = Element::new("div")
                    .with_attr("class", "footnote")
                    .with_attr("id", &format!("fn-{}", def.name));
                self.wrap(node, parent, element);
            }
            NodeValue::FootnoteReference(reference) => {
                let sup = self
                    .tree
                    .append_element(parent, Element::new("sup").with_attr("class", "footnote-ref"));
                let link = self.tree.append_element(
                    sup,
                    Element::new("a")
                        .with_attr("href", &format!("#fn-{}", reference.name))
                        .with_attr("id", &format!("fnref-{}", reference.name)),
                );
                self.tree.append_text(link, &reference.name);
            }
            NodeValue::Table(table) => {
                self.alignments = table.alignments.clone();
                let table_el = self.tree.append_element(parent, Element::new("table"));
                let mut body = None;
                for row in node.children() {
                    let is_header = matches!(row.data.borrow().value, NodeValue::TableRow(true));
                    let section = if is_header {
                        self.tree.append_element(table_el, Element::new("thead"))
                    } else {
                        *body.get_or_insert_with(|| {
                            self.tree.append_element(table_el, Element::new("tbody"))
                        })
                    };
                    self.convert(row, section);
                }
                self.alignments.clear();
            }
            NodeValue::TableRow(header) => {
                let tr = self.tree.append_element(parent, Element::new("tr"));
                let tag = if *header { "th" } else { "td" };
                for (column, cell) in node.children().enumerate() {
                    let mut element = Element::new(tag);
                    if let Some(style) = self
                        .alignments
                        .get(column)
                        .and_then(|alignment| alignment_style(*alignment))
                    {
                        element.set_attr("style", style);
                    }
                    let td = self.tree.append_element(tr, element);
                    self.children(cell, td);
                }
            }
            NodeValue::TableCell => self.children(node, parent),
            NodeValue::Text(text) => {
                self.tree.append_text(parent, text);
            }
            NodeValue::SoftBreak => {
                self.tree.append_text(parent, "\n");
            }
            NodeValue::LineBreak => {
                self.tree.append_element(parent, Element::new("br"));
            }
            NodeValue::Code(code) => {
                let element = self.tree.append_element(parent, Element::new("code"));
                self.tree.append_text(element, &code.literal);
            }
            NodeValue::HtmlInline(html) => self.raw_html(parent, html),
            NodeValue::Emph => {
                self.wrap(node, parent, Element::new("em"));
            }
            NodeValue::Strong => {
                self.wrap(node, parent, Element::new("strong"));
            }
            NodeValue::Strikethrough => {
                self.wrap(node, parent, Element::new("del"));
            }
            NodeValue::Superscript => {
                self.wrap(node, parent, Element::new("sup"));
            }
            NodeValue::Link(link) => {
                let mut element = Element::new("a").with_attr("href", &link.url);
                if !link.title.is_empty() {
                    element.set_attr("title", &link.title);
                }
                self.wrap(node, parent, element);
            }
            NodeValue::Image(image) => {
                let mut element = Element::new("img")
                    .with_attr("src", &image.url)
                    .with_attr("alt", &plain_text(node));
                if !image.title.is_empty() {
                    element.set_attr("title", &image.title);
                }
                self.tree.append_element(parent, element);
            }
            // Extensions we do not enable still render their content
            _ => self.children(node, parent),
        }
    }
}
