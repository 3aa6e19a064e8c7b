//! The in-memory result tree a transform builds.

use crate::serialize::{self, OutputMethod};

/// A node in a result tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
    Comment(String),
    ProcessingInstruction { target: String, data: String },
}

impl Node {
    pub fn text(content: impl Into<String>) -> Self {
        Node::Text(content.into())
    }

    /// The concatenated text of this node and its descendants.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.push_text(&mut out);
        out
    }

    fn push_text(&self, out: &mut String) {
        match self {
            Node::Element(el) => el.children.iter().for_each(|c| c.push_text(out)),
            Node::Text(t) => out.push_str(t),
            Node::Comment(_) | Node::ProcessingInstruction { .. } => {}
        }
    }

    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Node::Element(el) => Some(el),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

/// An element with ordered attributes and children.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.set_attribute(name, value);
        self
    }

    pub fn with_child(mut self, node: Node) -> Self {
        self.append(node);
        self
    }

    /// Adds an attribute, replacing the value of an existing one with the same
    /// name while keeping its position.
    pub fn set_attribute(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|a| a.name == name) {
            Some(existing) => existing.value = value.to_string(),
            None => self.attributes.push(Attribute {
                name: name.to_string(),
                value: value.to_string(),
            }),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Appends a child. Text directly after text is merged into one node and
    /// empty text is dropped.
    pub fn append(&mut self, node: Node) {
        append_merging(&mut self.children, node);
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }

    /// The serialized markup of the children only, like `innerHTML`.
    pub fn inner_markup(&self, method: OutputMethod) -> String {
        serialize::nodes_to_string(&self.children, method)
    }

    /// The serialized markup of the element itself, like `outerHTML`.
    pub fn outer_markup(&self, method: OutputMethod) -> String {
        serialize::nodes_to_string(std::slice::from_ref(&Node::Element(self.clone())), method)
    }
}

pub(crate) fn append_merging(children: &mut Vec<Node>, node: Node) {
    if let Node::Text(text) = &node {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(last)) = children.last_mut() {
            last.push_str(text);
            return;
        }
    }
    children.push(node);
}

/// A detached, ordered list of top-level nodes produced by a transform.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Fragment {
    pub children: Vec<Node>,
}

impl Fragment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes(nodes: Vec<Node>) -> Self {
        let mut fragment = Self::new();
        nodes.into_iter().for_each(|n| fragment.append(n));
        fragment
    }

    pub fn append(&mut self, node: Node) {
        append_merging(&mut self.children, node);
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Deep-copies the fragment as the children of a new detached element.
    /// The fragment itself is left untouched.
    pub fn clone_into_container(&self, container_name: &str) -> Element {
        let mut container = Element::new(container_name);
        for child in &self.children {
            container.append(child.clone());
        }
        container
    }

    pub fn to_markup(&self, method: OutputMethod) -> String {
        serialize::nodes_to_string(&self.children, method)
    }

    pub fn text_content(&self) -> String {
        self.children.iter().map(Node::text_content).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_attribute_replaces_in_place() {
        let mut el = Element::new("a").with_attribute("href", "x").with_attribute("id", "1");
        el.set_attribute("href", "y");
        assert_eq!(el.attributes.len(), 2);
        assert_eq!(el.attributes[0].name, "href");
        assert_eq!(el.attribute("href"), Some("y"));
        assert_eq!(el.attribute("missing"), None);
    }

    #[test]
    fn test_adjacent_text_is_merged() {
        let mut fragment = Fragment::new();
        fragment.append(Node::text("Hello"));
        fragment.append(Node::text(""));
        fragment.append(Node::text(", world"));
        fragment.append(Node::Comment("c".into()));
        fragment.append(Node::text("!"));
        assert_eq!(
            fragment.children,
            vec![
                Node::text("Hello, world"),
                Node::Comment("c".into()),
                Node::text("!")
            ]
        );
        assert_eq!(fragment.text_content(), "Hello, world!");
    }

    #[test]
    fn test_clone_into_container_is_deep_and_detached() {
        let original = Fragment::from_nodes(vec![
            Node::Element(Element::new("p").with_child(Node::text("one"))),
            Node::text("two"),
        ]);
        let mut container = original.clone_into_container("output");
        assert_eq!(container.name, "output");
        assert_eq!(container.children, original.children);

        container.children.clear();
        assert_eq!(original.len(), 2);
    }

    #[test]
    fn test_empty_fragment() {
        let fragment = Fragment::new();
        assert!(fragment.is_empty());
        let container = fragment.clone_into_container("output");
        assert_eq!(container.inner_markup(OutputMethod::Html), "");
        assert_eq!(container.outer_markup(OutputMethod::Xml), "<output></output>");
    }
}
