#![forbid(unsafe_code)]

//! HTML serialization of a subtree.
//!
//! The plain forms skip comments, so anchor comments inserted by the
//! renderer never show up in assertions; [`Dom::debug_html`] keeps them.

use std::fmt::Write as _;

use crate::{Dom, NodeId, NodeKind};

/// Elements serialized without a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

#[derive(Clone, Copy)]
struct Options {
    comments: bool,
}

impl Dom {
    /// Markup of the children of `node`, comments omitted.
    #[must_use]
    pub fn inner_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_node(child, Options { comments: false }, &mut out);
        }
        out
    }

    /// Markup of `node` itself, comments omitted.
    #[must_use]
    pub fn outer_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        self.write_node(node, Options { comments: false }, &mut out);
        out
    }

    /// Markup of the children of `node` including comment anchors.
    #[must_use]
    pub fn debug_html(&self, node: NodeId) -> String {
        let mut out = String::new();
        for child in self.children(node) {
            self.write_node(child, Options { comments: true }, &mut out);
        }
        out
    }

    fn write_node(&self, node: NodeId, options: Options, out: &mut String) {
        let Ok(kind) = self.kind(node) else {
            return;
        };
        match kind {
            NodeKind::Text(text) => escape_into(&text, false, out),
            NodeKind::Comment(text) => {
                if options.comments {
                    let _ = write!(out, "<!--{text}-->");
                }
            }
            NodeKind::Element { tag, attributes } => {
                out.push('<');
                out.push_str(&tag);
                for (name, value) in &attributes {
                    let _ = write!(out, " {name}=\"");
                    escape_into(value, true, out);
                    out.push('"');
                }
                out.push('>');
                if VOID_ELEMENTS.contains(&tag.as_str()) {
                    return;
                }
                for child in self.children(node) {
                    self.write_node(child, options, out);
                }
                let _ = write!(out, "</{tag}>");
            }
        }
    }
}

fn escape_into(text: &str, attribute: bool, out: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::Dom;

    #[test]
    fn serializes_nested_markup() {
        let dom = Dom::new();
        let div = dom.create_element("div");
        dom.set_attribute(div, "class", "card").unwrap();
        let p = dom.create_element("p");
        let text = dom.create_text("a < b & c");
        dom.append_child(p, text).unwrap();
        dom.append_child(div, p).unwrap();
        dom.append_child(dom.body(), div).unwrap();

        assert_eq!(
            dom.inner_html(dom.body()),
            r#"<div class="card"><p>a &lt; b &amp; c</p></div>"#
        );
    }

    #[test]
    fn comments_only_in_debug_output() {
        let dom = Dom::new();
        let start = dom.create_comment("start");
        let text = dom.create_text("x");
        dom.append_child(dom.body(), start).unwrap();
        dom.append_child(dom.body(), text).unwrap();

        assert_eq!(dom.inner_html(dom.body()), "x");
        assert_eq!(dom.debug_html(dom.body()), "<!--start-->x");
    }

    #[test]
    fn void_elements_have_no_closing_tag() {
        let dom = Dom::new();
        let input = dom.create_element("input");
        dom.set_attribute(input, "value", "say \"hi\"").unwrap();
        assert_eq!(dom.outer_html(input), r#"<input value="say &quot;hi&quot;">"#);
    }
}
