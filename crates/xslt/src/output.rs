//! Defines the `OutputBuilder` trait, which decouples the XSLT executor
//! from the concrete result tree it produces.

/// The semantic actions of building a result tree, without exposing the
/// underlying node types.
pub trait OutputBuilder {
    fn start_element(&mut self, name: &str);
    fn end_element(&mut self);

    /// Sets an attribute on the currently open element.
    fn set_attribute(&mut self, name: &str, value: &str);

    fn add_text(&mut self, text: &str);
    fn add_comment(&mut self, text: &str);
    fn add_processing_instruction(&mut self, target: &str, data: &str);
}

/// Collects only the text written at the top level; elements and their
/// content are ignored. Used where XSLT requires a string result, such as
/// the value of `xsl:attribute` or `xsl:comment`.
#[derive(Debug, Default)]
pub struct TextCollector {
    text: String,
    depth: usize,
    discarded: bool,
}

impl TextCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_text(self) -> String {
        self.text
    }

    /// Whether anything other than text was produced and dropped.
    pub fn discarded_nodes(&self) -> bool {
        self.discarded
    }
}

impl OutputBuilder for TextCollector {
    fn start_element(&mut self, _name: &str) {
        self.depth += 1;
        self.discarded = true;
    }

    fn end_element(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn set_attribute(&mut self, _name: &str, _value: &str) {
        self.discarded = true;
    }

    fn add_text(&mut self, text: &str) {
        if self.depth == 0 {
            self.text.push_str(text);
        }
    }

    fn add_comment(&mut self, _text: &str) {
        self.discarded = true;
    }

    fn add_processing_instruction(&mut self, _target: &str, _data: &str) {
        self.discarded = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_collector_ignores_nested_content() {
        let mut collector = TextCollector::new();
        collector.add_text("a");
        collector.start_element("b");
        collector.add_text("ignored");
        collector.end_element();
        collector.add_text("c");
        assert!(collector.discarded_nodes());
        assert_eq!(collector.into_text(), "ac");
    }
}
