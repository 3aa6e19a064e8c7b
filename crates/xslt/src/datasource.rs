//! XML source documents and the `roxmltree` view the executor navigates.

use crate::ast::SpaceRules;
use crate::error::XsltError;
use roxmltree::{Node, ParsingOptions};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use xslview_xpath1::{DocumentNode, NodeType, QName, XML_NAMESPACE};

/// A well-formed XML document, kept as its text.
///
/// The text is checked once when the document is created; the tree view is
/// re-parsed from it whenever a transform needs one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    text: String,
}

impl SourceDocument {
    /// Checks that `text` is well-formed XML. A leading byte-order mark is dropped.
    pub fn parse(text: impl Into<String>) -> Result<Self, XsltError> {
        let mut text = text.into();
        if text.starts_with('\u{feff}') {
            text.drain(..'\u{feff}'.len_utf8());
        }
        roxmltree::Document::parse_with_options(&text, parsing_options())?;
        Ok(Self { text })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn tree(&self) -> Result<roxmltree::Document<'_>, XsltError> {
        Ok(roxmltree::Document::parse_with_options(
            &self.text,
            parsing_options(),
        )?)
    }

    /// The qualified name of the document element.
    pub fn root_element_name(&self) -> Result<String, XsltError> {
        let tree = self.tree()?;
        Ok(XmlNode::new(tree.root_element(), &SpaceRules::default())
            .name()
            .map(|q| q.to_string())
            .unwrap_or_default())
    }
}

fn parsing_options<'a>() -> ParsingOptions<'a> {
    ParsingOptions {
        allow_dtd: true,
        ..ParsingOptions::default()
    }
}

/// Wrapper around a parsed `roxmltree::Document` and the whitespace rules
/// applied while navigating it.
pub struct XmlDocument<'input> {
    doc: roxmltree::Document<'input>,
    space: SpaceRules,
}

impl<'input> XmlDocument<'input> {
    pub fn parse(text: &'input str) -> Result<Self, XsltError> {
        Ok(Self::new(
            roxmltree::Document::parse_with_options(text, parsing_options())?,
            SpaceRules::default(),
        ))
    }

    pub fn new(doc: roxmltree::Document<'input>, space: SpaceRules) -> Self {
        Self { doc, space }
    }

    pub fn root_node(&self) -> XmlNode<'_, 'input> {
        XmlNode::new(self.doc.root(), &self.space)
    }
}

#[derive(Debug, Clone, Copy)]
enum Kind<'a, 'input> {
    Node(Node<'a, 'input>),
    /// roxmltree keeps attributes as data on the element, so they are
    /// addressed by owner and index.
    Attribute {
        parent: Node<'a, 'input>,
        index: usize,
    },
}

/// A node of a source document: an element, text, comment, processing
/// instruction, the root, or an attribute.
#[derive(Debug, Clone, Copy)]
pub struct XmlNode<'a, 'input> {
    kind: Kind<'a, 'input>,
    space: &'a SpaceRules,
}

impl<'a, 'input> XmlNode<'a, 'input> {
    pub fn new(node: Node<'a, 'input>, space: &'a SpaceRules) -> Self {
        Self {
            kind: Kind::Node(node),
            space,
        }
    }

    pub fn inner(&self) -> Option<Node<'a, 'input>> {
        match self.kind {
            Kind::Node(node) => Some(node),
            Kind::Attribute { .. } => None,
        }
    }

    fn wrap(&self, node: Node<'a, 'input>) -> Self {
        Self::new(node, self.space)
    }

    fn id_key(&self) -> (u64, usize) {
        match self.kind {
            Kind::Node(node) => (node.id().get() as u64, 0),
            Kind::Attribute { parent, index } => (parent.id().get() as u64, index + 1),
        }
    }

    /// Whether whitespace-only text children of `element` are dropped.
    fn strips_children_of(&self, element: Node<'a, 'input>) -> bool {
        if self.space.is_empty() || !element.is_element() {
            return false;
        }
        let preserved = element
            .ancestors()
            .find_map(|n| n.attribute((XML_NAMESPACE, "space")))
            .is_some_and(|v| v == "preserve");
        if preserved {
            return false;
        }
        let tag = element.tag_name();
        self.space.strips(tag.namespace(), tag.name())
    }
}

impl<'a> XmlNode<'a, 'a> {
    fn collect_text(&self, out: &mut String) {
        for child in self.children() {
            match child.kind {
                Kind::Node(n) if n.is_text() => out.push_str(n.text().unwrap_or("")),
                Kind::Node(n) if n.is_element() => child.collect_text(out),
                _ => {}
            }
        }
    }
}

impl PartialEq for XmlNode<'_, '_> {
    fn eq(&self, other: &Self) -> bool {
        self.id_key() == other.id_key()
    }
}

impl Eq for XmlNode<'_, '_> {}

impl PartialOrd for XmlNode<'_, '_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Document order. roxmltree numbers nodes in parse order; an element's
/// attributes sort right after it and before its first child.
impl Ord for XmlNode<'_, '_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id_key().cmp(&other.id_key())
    }
}

impl Hash for XmlNode<'_, '_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id_key().hash(state);
    }
}

fn is_xml_whitespace(text: &str) -> bool {
    text.chars().all(|c| matches!(c, ' ' | '\t' | '\r' | '\n'))
}

fn prefix_for<'a>(node: Node<'a, 'a>, namespace: Option<&str>) -> Option<&'a str> {
    match namespace {
        Some(XML_NAMESPACE) => Some("xml"),
        Some(uri) => node.lookup_prefix(uri),
        None => None,
    }
}

impl<'a> DocumentNode<'a> for XmlNode<'a, 'a> {
    fn node_type(&self) -> NodeType {
        match self.kind {
            Kind::Node(node) => {
                if node.is_root() {
                    NodeType::Root
                } else if node.is_text() {
                    NodeType::Text
                } else if node.is_comment() {
                    NodeType::Comment
                } else if node.is_pi() {
                    NodeType::ProcessingInstruction
                } else {
                    NodeType::Element
                }
            }
            Kind::Attribute { .. } => NodeType::Attribute,
        }
    }

    fn name(&self) -> Option<QName<'a>> {
        match self.kind {
            Kind::Node(node) if node.is_element() => {
                let tag = node.tag_name();
                Some(QName {
                    prefix: prefix_for(node, tag.namespace()),
                    local_part: tag.name(),
                })
            }
            Kind::Node(node) => node.pi().map(|pi| QName {
                prefix: None,
                local_part: pi.target,
            }),
            Kind::Attribute { parent, index } => {
                parent.attributes().nth(index).map(|attr| QName {
                    prefix: prefix_for(parent, attr.namespace()),
                    local_part: attr.name(),
                })
            }
        }
    }

    fn namespace_uri(&self) -> Option<&'a str> {
        match self.kind {
            Kind::Node(node) if node.is_element() => node.tag_name().namespace(),
            Kind::Node(_) => None,
            Kind::Attribute { parent, index } => {
                parent.attributes().nth(index).and_then(|a| a.namespace())
            }
        }
    }

    fn string_value(&self) -> String {
        match self.kind {
            Kind::Node(node) => {
                if node.is_element() || node.is_root() {
                    let mut out = String::new();
                    self.collect_text(&mut out);
                    out
                } else if let Some(pi) = node.pi() {
                    pi.value.unwrap_or("").to_string()
                } else {
                    node.text().unwrap_or("").to_string()
                }
            }
            Kind::Attribute { parent, index } => parent
                .attributes()
                .nth(index)
                .map(|attr| attr.value().to_string())
                .unwrap_or_default(),
        }
    }

    fn attributes(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self.kind {
            Kind::Node(node) if node.is_element() => {
                let space = self.space;
                let count = node.attributes().len();
                Box::new((0..count).map(move |index| XmlNode {
                    kind: Kind::Attribute {
                        parent: node,
                        index,
                    },
                    space,
                }))
            }
            _ => Box::new(std::iter::empty()),
        }
    }

    fn children(&self) -> Box<dyn Iterator<Item = Self> + 'a> {
        match self.kind {
            Kind::Node(node) => {
                let space = self.space;
                let strip = self.strips_children_of(node);
                Box::new(
                    node.children()
                        .filter(move |c| {
                            !(strip && c.is_text() && is_xml_whitespace(c.text().unwrap_or("")))
                        })
                        .map(move |c| XmlNode::new(c, space)),
                )
            }
            Kind::Attribute { .. } => Box::new(std::iter::empty()),
        }
    }

    fn parent(&self) -> Option<Self> {
        match self.kind {
            Kind::Node(node) => node.parent().map(|p| self.wrap(p)),
            Kind::Attribute { parent, .. } => Some(self.wrap(parent)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SpaceTest;

    fn child_named<'a>(node: XmlNode<'a, 'a>, name: &str) -> XmlNode<'a, 'a> {
        node.children()
            .find(|n| n.name().is_some_and(|q| q.local_part == name))
            .unwrap()
    }

    #[test]
    fn test_xml_node_attributes() {
        let xml = r#"<root><item id="123" status="active">Text</item></root>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let item = child_named(child_named(doc.root_node(), "root"), "item");

        let attrs: Vec<_> = item.attributes().collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].node_type(), NodeType::Attribute);
        assert_eq!(attrs[0].name().unwrap().local_part, "id");
        assert_eq!(attrs[0].string_value(), "123");
        assert_eq!(attrs[1].name().unwrap().local_part, "status");
        assert_eq!(attrs[1].string_value(), "active");
        assert_eq!(attrs[0].parent(), Some(item));
    }

    #[test]
    fn test_document_order_places_attributes_before_children() {
        let xml = r#"<a x="1" y="2"><b/></a>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let a = child_named(doc.root_node(), "a");
        let b = child_named(a, "b");
        let attrs: Vec<_> = a.attributes().collect();

        let mut nodes = vec![b, attrs[1], a, attrs[0], doc.root_node()];
        nodes.sort();
        assert_eq!(nodes, vec![doc.root_node(), a, attrs[0], attrs[1], b]);
    }

    #[test]
    fn test_prefixed_names_and_namespaces() {
        let xml = r#"<r xmlns:m="urn:m"><m:item xml:lang="en">x</m:item></r>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let item = child_named(child_named(doc.root_node(), "r"), "item");
        let name = item.name().unwrap();
        assert_eq!(name.prefix, Some("m"));
        assert_eq!(name.to_string(), "m:item");
        assert_eq!(item.namespace_uri(), Some("urn:m"));

        let lang = item.attributes().next().unwrap();
        assert_eq!(lang.name().unwrap().to_string(), "xml:lang");
    }

    #[test]
    fn test_comment_and_pi_nodes() {
        let xml = r#"<r><!-- note --><?target data here?></r>"#;
        let doc = XmlDocument::parse(xml).unwrap();
        let kids: Vec<_> = child_named(doc.root_node(), "r").children().collect();
        assert_eq!(kids[0].node_type(), NodeType::Comment);
        assert_eq!(kids[0].string_value(), " note ");
        assert_eq!(kids[1].node_type(), NodeType::ProcessingInstruction);
        assert_eq!(kids[1].name().unwrap().local_part, "target");
        assert_eq!(kids[1].string_value(), "data here");
    }

    #[test]
    fn test_strip_space_rules() {
        let xml = "<list>\n  <item> a </item>\n  <pre xml:space=\"preserve\">\n  <b/></pre>\n</list>";
        let tree = roxmltree::Document::parse(xml).unwrap();
        let rules = SpaceRules {
            strip: vec![SpaceTest::Any],
            preserve: vec![],
        };
        let doc = XmlDocument::new(tree, rules);
        let list = child_named(doc.root_node(), "list");
        assert_eq!(list.children().count(), 2);
        assert_eq!(list.string_value(), " a \n  ");

        let pre = child_named(list, "pre");
        assert_eq!(pre.children().count(), 2);
    }

    #[test]
    fn test_source_document_checks_well_formedness() {
        assert!(SourceDocument::parse("<a><b></a>").is_err());
        let doc = SourceDocument::parse("\u{feff}<a/>").unwrap();
        assert_eq!(doc.text(), "<a/>");
        assert_eq!(doc.root_element_name().unwrap(), "a");
    }
}
