//! Page skeleton around rendered markdown

use crate::config::Palette;
use crate::dom::{DocumentTree, Element, NodeId};

/// Build the page skeleton and return the tree with its content wrapper.
///
/// `html > head > (meta, meta, style) + body.palette-<mode> > div#wrapper`
pub(super) fn skeleton(css: &str, palette: Palette) -> (DocumentTree, NodeId) {
    let mut tree = DocumentTree::new();
    let html = tree.append_element(tree.root(), Element::new("html"));

    let head = tree.append_element(html, Element::new("head"));
    tree.append_element(head, Element::new("meta").with_attr("charset", "utf-8"));
    tree.append_element(
        head,
        Element::new("meta")
            .with_attr("name", "viewport")
            .with_attr("content", "width=device-width,initial-scale=1"),
    );
    let style = tree.append_element(head, Element::new("style"));
    tree.append_text(style, css);

    let body = tree.append_element(
        html,
        Element::new("body").with_attr("class", &format!("palette-{}", palette.label())),
    );
    let wrapper = tree.append_element(body, Element::new("div").with_attr("id", "wrapper"));
    (tree, wrapper)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skeleton_structure() {
        let (tree, wrapper) = skeleton("p{}", Palette::Dark);
        assert_eq!(tree.element_by_id("wrapper"), Some(wrapper));
        assert_eq!(
            tree.to_html(),
            "<html><head><meta charset=\"utf-8\">\
<meta name=\"viewport\" content=\"width=device-width,initial-scale=1\">\
<style>p{}</style></head><body class=\"palette-dark\"><div id=\"wrapper\"></div></body></html>"
        );
    }
}
