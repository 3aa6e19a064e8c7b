//! An `OutputBuilder` that assembles an `xslview_dom::Fragment`.

use crate::output::OutputBuilder;
use xslview_dom::{Element, Fragment, Node};

/// Builds a result tree fragment from executor events.
#[derive(Debug, Default)]
pub struct FragmentBuilder {
    fragment: Fragment,
    open: Vec<Element>,
}

impl FragmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Closes any elements left open and returns the fragment.
    pub fn get_result(mut self) -> Fragment {
        while !self.open.is_empty() {
            self.end_element();
        }
        self.fragment
    }

    fn push_node(&mut self, node: Node) {
        match self.open.last_mut() {
            Some(parent) => parent.append(node),
            None => self.fragment.append(node),
        }
    }
}

impl OutputBuilder for FragmentBuilder {
    fn start_element(&mut self, name: &str) {
        self.open.push(Element::new(name));
    }

    fn end_element(&mut self) {
        if let Some(element) = self.open.pop() {
            self.push_node(Node::Element(element));
        }
    }

    fn set_attribute(&mut self, name: &str, value: &str) {
        match self.open.last_mut() {
            Some(element) if element.children.is_empty() => element.set_attribute(name, value),
            Some(element) => log::warn!(
                "Ignoring attribute '{}' added to <{}> after its children",
                name,
                element.name
            ),
            None => log::warn!("Ignoring attribute '{}' outside of any element", name),
        }
    }

    fn add_text(&mut self, text: &str) {
        self.push_node(Node::text(text));
    }

    fn add_comment(&mut self, text: &str) {
        self.push_node(Node::Comment(text.to_string()));
    }

    fn add_processing_instruction(&mut self, target: &str, data: &str) {
        self.push_node(Node::ProcessingInstruction {
            target: target.to_string(),
            data: data.to_string(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_nested_elements() {
        let mut builder = FragmentBuilder::new();
        builder.start_element("ul");
        builder.set_attribute("class", "items");
        builder.start_element("li");
        builder.add_text("one");
        builder.end_element();
        builder.end_element();
        builder.add_comment("done");

        let fragment = builder.get_result();
        assert_eq!(fragment.len(), 2);
        let ul = fragment.children[0].as_element().unwrap();
        assert_eq!(ul.attribute("class"), Some("items"));
        assert_eq!(ul.children[0].text_content(), "one");
    }

    #[test]
    fn test_late_attribute_is_ignored() {
        let mut builder = FragmentBuilder::new();
        builder.start_element("p");
        builder.add_text("body");
        builder.set_attribute("id", "late");
        builder.end_element();
        builder.set_attribute("orphan", "x");

        let fragment = builder.get_result();
        let p = fragment.children[0].as_element().unwrap();
        assert!(p.attributes.is_empty());
    }

    #[test]
    fn test_unclosed_elements_are_closed() {
        let mut builder = FragmentBuilder::new();
        builder.start_element("div");
        builder.start_element("span");
        builder.add_text("x");
        let fragment = builder.get_result();
        assert_eq!(fragment.len(), 1);
        assert_eq!(fragment.text_content(), "x");
    }
}
