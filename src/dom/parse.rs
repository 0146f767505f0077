//! Raw HTML fragments as document nodes
//!
//! Markdown may embed raw HTML. Each fragment is tokenized into tags, text
//! and markup, then built into real elements so that its text is walked,
//! searched and highlighted like any other. A fragment may open an element
//! and leave it open (`<div>` on its own line, or an inline `<span>`); an
//! `HtmlCursor` remembers those, and later siblings land inside them until
//! the matching close tag arrives.

use super::html::{RAW_TEXT_ELEMENTS, VOID_ELEMENTS};
use super::tree::{DocumentTree, Element, NodeId};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Open { element: Element, self_closing: bool },
    Close(String),
    Text(String),
    /// Comment, doctype or processing instruction, kept verbatim
    Markup(String),
}

// ─────────────────────────────────────────────────────────────────────────────
// Cursor
// ─────────────────────────────────────────────────────────────────────────────

/// Insertion point for a run of sibling HTML fragments under one parent.
#[derive(Debug, Clone)]
pub struct HtmlCursor {
    base: NodeId,
    open: Vec<(NodeId, String)>,
}

impl HtmlCursor {
    pub fn new(base: NodeId) -> Self {
        Self {
            base,
            open: Vec::new(),
        }
    }

    /// Where the next node should be appended.
    pub fn current(&self) -> NodeId {
        self.open.last().map(|(id, _)| *id).unwrap_or(self.base)
    }

    /// Build `html` into the tree at the cursor.
    ///
    /// Close tags without a matching open element are ignored. Elements
    /// still open at the end stay open for later fragments.
    pub fn feed(&mut self, tree: &mut DocumentTree, html: &str) {
        for token in tokenize(html) {
            match token {
                Token::Open {
                    element,
                    self_closing,
                } => {
                    let void = self_closing || VOID_ELEMENTS.contains(&element.tag.as_str());
                    let tag = element.tag.clone();
                    let id = tree.append_element(self.current(), element);
                    if !void {
                        self.open.push((id, tag));
                    }
                }
                Token::Close(tag) => {
                    if let Some(position) = self.open.iter().rposition(|(_, open)| *open == tag) {
                        self.open.truncate(position);
                    }
                }
                Token::Text(text) => {
                    tree.append_text(self.current(), &text);
                }
                Token::Markup(markup) => {
                    tree.append_raw(self.current(), &markup);
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizer
// ─────────────────────────────────────────────────────────────────────────────

fn tokenize(html: &str) -> Vec<Token> {
    let bytes = html.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;
    let mut text_start = 0;

    while pos < html.len() {
        if bytes[pos] != b'<' {
            pos += 1;
            continue;
        }
        let rest = &html[pos..];
        let Some((token, len)) = parse_tag(rest) else {
            // A lone '<' is text
            pos += 1;
            continue;
        };

        push_text(&mut tokens, &html[text_start..pos]);
        let raw_text_tag = match &token {
            Token::Open {
                element,
                self_closing: false,
            } if RAW_TEXT_ELEMENTS.contains(&element.tag.as_str()) => Some(element.tag.clone()),
            _ => None,
        };
        tokens.push(token);
        pos += len;
        text_start = pos;

        // Script and style bodies are opaque up to their close tag
        if let Some(tag) = raw_text_tag {
            let end = html[pos..]
                .to_ascii_lowercase()
                .find(&format!("</{}", tag))
                .map(|offset| pos + offset)
                .unwrap_or(html.len());
            if end > pos {
                tokens.push(Token::Text(html[pos..end].to_string()));
            }
            pos = end;
            text_start = end;
        }
    }

    push_text(&mut tokens, &html[text_start..]);
    tokens
}

fn push_text(tokens: &mut Vec<Token>, text: &str) {
    if !text.is_empty() {
        tokens.push(Token::Text(decode_entities(text)));
    }
}

/// Parse the tag at the start of `rest`, returning it and its byte length.
fn parse_tag(rest: &str) -> Option<(Token, usize)> {
    if let Some(body) = rest.strip_prefix("<!--") {
        let len = body.find("-->").map(|i| i + 7).unwrap_or(rest.len());
        return Some((Token::Markup(rest[..len].to_string()), len));
    }
    if rest.starts_with("<!") || rest.starts_with("<?") {
        let len = rest.find('>').map(|i| i + 1).unwrap_or(rest.len());
        return Some((Token::Markup(rest[..len].to_string()), len));
    }
    if let Some(body) = rest.strip_prefix("</") {
        let name = tag_name(body)?;
        let len = body.find('>')? + 3;
        return Some((Token::Close(name.to_ascii_lowercase()), len));
    }
    parse_open_tag(rest)
}

/// The tag name at the start of `s`, if it starts with a letter.
fn tag_name(s: &str) -> Option<&str> {
    if !s.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let end = s
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-'))
        .unwrap_or(s.len());
    Some(&s[..end])
}

fn parse_open_tag(rest: &str) -> Option<(Token, usize)> {
    let name = tag_name(&rest[1..])?;
    let mut element = Element::new(name);
    let mut i = 1 + name.len();

    loop {
        i += whitespace_len(&rest[i..]);
        let tail = &rest[i..];
        if tail.is_empty() {
            // Unterminated tag
            return None;
        }
        if tail.starts_with("/>") {
            return Some((
                Token::Open {
                    element,
                    self_closing: true,
                },
                i + 2,
            ));
        }
        if tail.starts_with('>') {
            return Some((
                Token::Open {
                    element,
                    self_closing: false,
                },
                i + 1,
            ));
        }
        if tail.starts_with('/') {
            i += 1;
            continue;
        }

        let name_len = tail
            .find(|c: char| c.is_whitespace() || c == '=' || c == '>' || c == '/')
            .unwrap_or(tail.len());
        if name_len == 0 {
            // Stray '=' or similar
            i += tail.chars().next().map(char::len_utf8).unwrap_or(1);
            continue;
        }
        let attr_name = tail[..name_len].to_ascii_lowercase();
        i += name_len;

        let after_name = whitespace_len(&rest[i..]);
        let mut value = String::new();
        if rest[i + after_name..].starts_with('=') {
            i += after_name + 1;
            i += whitespace_len(&rest[i..]);
            let tail = &rest[i..];
            match tail.chars().next() {
                Some(quote @ ('"' | '\'')) => {
                    let close = tail[1..].find(quote)?;
                    value = decode_entities(&tail[1..1 + close]);
                    i += close + 2;
                }
                Some(_) => {
                    let len = tail
                        .find(|c: char| c.is_whitespace() || c == '>')
                        .unwrap_or(tail.len());
                    value = decode_entities(&tail[..len]);
                    i += len;
                }
                None => return None,
            }
        }

        // The first occurrence of an attribute wins
        if element.attr(&attr_name).is_none() {
            element.set_attr(&attr_name, &value);
        }
    }
}

fn whitespace_len(s: &str) -> usize {
    s.find(|c: char| !c.is_whitespace()).unwrap_or(s.len())
}

/// Replace character references with the characters they name.
///
/// Unknown references are left as written.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let decoded = tail
            .find(';')
            .filter(|semi| *semi <= 10)
            .and_then(|semi| entity_char(&tail[1..semi]).map(|c| (c, semi + 1)));
        match decoded {
            Some((c, len)) => {
                out.push(c);
                rest = &tail[len..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn entity_char(name: &str) -> Option<char> {
    if let Some(hex) = name.strip_prefix("#x").or_else(|| name.strip_prefix("#X")) {
        return u32::from_str_radix(hex, 16).ok().and_then(char::from_u32);
    }
    if let Some(dec) = name.strip_prefix('#') {
        return dec.parse().ok().and_then(char::from_u32);
    }
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        "copy" => Some('©'),
        "reg" => Some('®'),
        "hellip" => Some('…'),
        "mdash" => Some('—'),
        "ndash" => Some('–'),
        _ => None,
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    fn build(fragments: &[&str]) -> DocumentTree {
        let mut tree = DocumentTree::new();
        let mut cursor = HtmlCursor::new(tree.root());
        for fragment in fragments {
            cursor.feed(&mut tree, fragment);
        }
        tree
    }

    #[test]
    fn test_tokenize_tags_and_text() {
        let tokens = tokenize("<p class=\"a\">hi</p>");
        assert_eq!(
            tokens,
            vec![
                Token::Open {
                    element: Element::new("p").with_attr("class", "a"),
                    self_closing: false,
                },
                Token::Text("hi".to_string()),
                Token::Close("p".to_string()),
            ]
        );
    }

    #[test]
    fn test_attribute_forms() {
        let tree = build(&["<img SRC=logo.png alt='a &amp; b' hidden width = \"10\" src=\"x\">"]);
        let img = tree.children(tree.root())[0];
        let element = tree.element(img).unwrap();
        assert_eq!(element.tag, "img");
        assert_eq!(element.attr("src"), Some("logo.png"));
        assert_eq!(element.attr("alt"), Some("a & b"));
        assert_eq!(element.attr("hidden"), Some(""));
        assert_eq!(element.attr("width"), Some("10"));
    }

    #[test]
    fn test_nested_block_text_is_real_text() {
        let tree = build(&["<details><summary>Install steps</summary>\nRun it.\n</details>\n"]);
        assert_eq!(tree.text_content(tree.root()), "Install steps\nRun it.\n\n");
        assert_eq!(
            tree.to_html(),
            "<details><summary>Install steps</summary>\nRun it.\n</details>\n"
        );
    }

    #[test]
    fn test_open_element_spans_fragments() {
        let mut tree = DocumentTree::new();
        let root = tree.root();
        let mut cursor = HtmlCursor::new(root);
        cursor.feed(&mut tree, "<div align=\"center\">\n");
        let inside = cursor.current();
        assert_ne!(inside, root);

        let p = tree.append_element(inside, Element::new("p"));
        tree.append_text(p, "middle");
        cursor.feed(&mut tree, "</div>\n");
        assert_eq!(cursor.current(), root);

        assert_eq!(
            tree.to_html(),
            "<div align=\"center\">\n<p>middle</p></div>\n"
        );
    }

    #[test]
    fn test_unmatched_close_is_ignored() {
        let tree = build(&["</span>text<br/>more"]);
        assert_eq!(tree.to_html(), "text<br>more");
    }

    #[test]
    fn test_script_body_stays_opaque() {
        let tree = build(&["<script>if (a < b) { x('</p>'); }</script>after"]);
        let script = tree.children(tree.root())[0];
        assert_eq!(tree.element(script).unwrap().tag, "script");
        assert_eq!(tree.text_content(script), "if (a < b) { x('</p>'); }");
        assert!(tree.to_html().ends_with("after"));
    }

    #[test]
    fn test_comments_and_stray_brackets() {
        let tree = build(&["<!-- note --> 1 < 2 <3"]);
        let children = tree.children(tree.root());
        assert!(matches!(tree.kind(children[0]), Some(NodeKind::Raw(_))));
        assert_eq!(tree.text_content(tree.root()), " 1 < 2 <3");
    }

    #[test]
    fn test_decode_entities() {
        assert_eq!(decode_entities("a &amp; b &lt;c&gt;"), "a & b <c>");
        assert_eq!(decode_entities("&#65;&#x42;&nbsp;"), "AB\u{a0}");
        assert_eq!(decode_entities("&unknown; & alone"), "&unknown; & alone");
    }
}
