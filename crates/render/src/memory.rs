use crate::error::RenderError;
use crate::traits::Page;
use std::collections::HashMap;

/// A page that only tracks the text of its elements.
///
/// Elements must be declared before text can be assigned to them, so a
/// missing element fails the same way it does on a real page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryPage {
    elements: HashMap<String, String>,
}

impl MemoryPage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares an empty element with the given id.
    pub fn with_element(mut self, element_id: impl Into<String>) -> Self {
        self.elements.insert(element_id.into(), String::new());
        self
    }

    pub fn text_content(&self, element_id: &str) -> Option<&str> {
        self.elements.get(element_id).map(String::as_str)
    }
}

impl Page for MemoryPage {
    fn set_text_content(&mut self, element_id: &str, text: &str) -> Result<(), RenderError> {
        let content = self
            .elements
            .get_mut(element_id)
            .ok_or_else(|| RenderError::ElementNotFound(element_id.to_string()))?;
        *content = text.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assigns_declared_element() {
        let mut page = MemoryPage::new().with_element("output");
        assert_eq!(page.text_content("output"), Some(""));
        page.set_text_content("output", "<b>x</b>").unwrap();
        assert_eq!(page.text_content("output"), Some("<b>x</b>"));
    }

    #[test]
    fn test_undeclared_element() {
        let mut page = MemoryPage::new();
        assert!(matches!(
            page.set_text_content("output", "x"),
            Err(RenderError::ElementNotFound(_))
        ));
        assert_eq!(page.text_content("output"), None);
    }
}
