//! Markup serialization for result trees.

use crate::node::{Element, Node};
use std::fmt::Write;

/// The `xsl:output method` a result tree was built for.
///
/// Serialization always follows the HTML fragment serializer (`innerHTML`).
/// The method decides which elements count as HTML elements there.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMethod {
    /// Elements are not HTML elements: no void elements, no raw text, every
    /// element gets an end tag.
    Xml,
    /// Elements are HTML elements.
    #[default]
    Html,
    /// The result is its text content, escaped as one text node.
    Text,
}

impl OutputMethod {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim() {
            "xml" => Some(OutputMethod::Xml),
            "html" => Some(OutputMethod::Html),
            "text" => Some(OutputMethod::Text),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            OutputMethod::Xml => "xml",
            OutputMethod::Html => "html",
            OutputMethod::Text => "text",
        }
    }
}

const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "basefont", "bgsound", "br", "col", "embed", "frame", "hr", "img", "input",
    "keygen", "link", "meta", "param", "source", "track", "wbr",
];

const HTML_RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

pub fn nodes_to_string(nodes: &[Node], method: OutputMethod) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(&mut out, node, method, false);
    }
    out
}

fn write_node(out: &mut String, node: &Node, method: OutputMethod, raw_text: bool) {
    match node {
        _ if method == OutputMethod::Text => {
            out.push_str(&escape_html(&node.text_content(), false))
        }
        Node::Element(el) => write_element(out, el, method),
        Node::Text(t) if raw_text => out.push_str(t),
        Node::Text(t) => out.push_str(&escape_html(t, false)),
        Node::Comment(c) => {
            let _ = write!(out, "<!--{}-->", c);
        }
        Node::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if !data.is_empty() {
                out.push(' ');
                out.push_str(data);
            }
            out.push('>');
        }
    }
}

fn write_element(out: &mut String, el: &Element, method: OutputMethod) {
    out.push('<');
    out.push_str(&el.name);
    for attr in &el.attributes {
        let _ = write!(out, " {}=\"{}\"", attr.name, escape_html(&attr.value, true));
    }
    out.push('>');

    let html_name = (method == OutputMethod::Html).then(|| el.name.to_ascii_lowercase());
    let is_html = |names: &[&str]| html_name.as_deref().is_some_and(|n| names.contains(&n));
    if is_html(HTML_VOID_ELEMENTS) {
        return;
    }

    let raw_text = is_html(HTML_RAW_TEXT_ELEMENTS);
    for child in &el.children {
        write_node(out, child, method, raw_text);
    }
    let _ = write!(out, "</{}>", el.name);
}

/// Escapes text the way the HTML fragment serializer does: `&`, no-break
/// space, and either `"` (attribute values) or `<` and `>` (text).
pub fn escape_html(text: &str, in_attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            '"' if in_attribute => out.push_str("&quot;"),
            '<' if !in_attribute => out.push_str("&lt;"),
            '>' if !in_attribute => out.push_str("&gt;"),
            other => out.push(other),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::Fragment;

    fn sample() -> Fragment {
        Fragment::from_nodes(vec![
            Node::Element(
                Element::new("p")
                    .with_attribute("title", "a \"quoted\" & <b>")
                    .with_child(Node::text("1 < 2 & 3"))
                    .with_child(Node::Element(Element::new("br"))),
            ),
            Node::Comment(" note ".into()),
            Node::ProcessingInstruction {
                target: "pi".into(),
                data: "x".into(),
            },
        ])
    }

    #[test]
    fn test_html_serialization() {
        assert_eq!(
            sample().to_markup(OutputMethod::Html),
            "<p title=\"a &quot;quoted&quot; &amp; <b>\">1 &lt; 2 &amp; 3<br></p><!-- note --><?pi x>"
        );
    }

    #[test]
    fn test_xml_elements_are_not_html_elements() {
        assert_eq!(
            sample().to_markup(OutputMethod::Xml),
            "<p title=\"a &quot;quoted&quot; &amp; <b>\">1 &lt; 2 &amp; 3<br></br></p><!-- note --><?pi x>"
        );
        let script = Element::new("script").with_child(Node::text("a < b"));
        let fragment = Fragment::from_nodes(vec![Node::Element(script)]);
        assert_eq!(fragment.to_markup(OutputMethod::Xml), "<script>a &lt; b</script>");
    }

    #[test]
    fn test_text_serialization_is_one_escaped_text_node() {
        assert_eq!(sample().to_markup(OutputMethod::Text), "1 &lt; 2 &amp; 3");
    }

    #[test]
    fn test_empty_element_keeps_end_tag() {
        let fragment = Fragment::from_nodes(vec![Node::Element(Element::new("div"))]);
        assert_eq!(fragment.to_markup(OutputMethod::Html), "<div></div>");
        assert_eq!(fragment.to_markup(OutputMethod::Xml), "<div></div>");
    }

    #[test]
    fn test_html_script_content_is_raw() {
        let script = Element::new("script").with_child(Node::text("if (a < b && c) {}"));
        let fragment = Fragment::from_nodes(vec![Node::Element(script)]);
        assert_eq!(
            fragment.to_markup(OutputMethod::Html),
            "<script>if (a < b && c) {}</script>"
        );
    }

    #[test]
    fn test_nbsp_is_named_in_html() {
        assert_eq!(escape_html("a\u{a0}b", false), "a&nbsp;b");
    }

    #[test]
    fn test_method_names() {
        assert_eq!(OutputMethod::from_name("xml"), Some(OutputMethod::Xml));
        assert_eq!(OutputMethod::from_name(" text "), Some(OutputMethod::Text));
        assert_eq!(OutputMethod::from_name("xhtml"), None);
        assert_eq!(OutputMethod::default().name(), "html");
    }
}
