use crate::error::RenderError;
use crate::traits::Page;
use xslview_dom::{Fragment, OutputMethod};

/// Name of the detached element a fragment is cloned into before serialization.
pub const DEFAULT_CONTAINER: &str = "output";

/// Serializes result fragments and writes the markup into a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renderer {
    container: String,
    method: OutputMethod,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(OutputMethod::default())
    }
}

impl Renderer {
    pub fn new(method: OutputMethod) -> Self {
        Self {
            container: DEFAULT_CONTAINER.to_string(),
            method,
        }
    }

    pub fn with_container(mut self, name: impl Into<String>) -> Self {
        self.container = name.into();
        self
    }

    pub fn method(&self) -> OutputMethod {
        self.method
    }

    /// Clones `fragment` into a detached container and returns the
    /// container's inner markup. The fragment is left untouched.
    pub fn serialize(&self, fragment: &Fragment) -> String {
        let container = fragment.clone_into_container(&self.container);
        container.inner_markup(self.method)
    }

    /// Serializes `fragment` and assigns the markup as the visible text of
    /// `element_id`. Returns the assigned markup.
    pub fn render(
        &self,
        fragment: &Fragment,
        page: &mut dyn Page,
        element_id: &str,
    ) -> Result<String, RenderError> {
        let markup = self.serialize(fragment);
        log::info!("{}", markup);
        page.set_text_content(element_id, &markup)?;
        Ok(markup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryPage;
    use xslview_dom::{Element, Node};

    fn fragment() -> Fragment {
        Fragment::from_nodes(vec![
            Node::Element(
                Element::new("p")
                    .with_attribute("class", "note")
                    .with_child(Node::text("a < b")),
            ),
            Node::Element(Element::new("br")),
        ])
    }

    #[test]
    fn test_serialize_html() {
        let renderer = Renderer::new(OutputMethod::Html);
        assert_eq!(
            renderer.serialize(&fragment()),
            r#"<p class="note">a &lt; b</p><br>"#
        );
    }

    #[test]
    fn test_serialize_xml() {
        let renderer = Renderer::new(OutputMethod::Xml);
        assert_eq!(
            renderer.serialize(&fragment()),
            r#"<p class="note">a &lt; b</p><br></br>"#
        );
    }

    #[test]
    fn test_serialize_text_escapes_like_a_text_node() {
        let fragment = Fragment::from_nodes(vec![Node::text("1 < 2 & 3")]);
        assert_eq!(
            Renderer::new(OutputMethod::Text).serialize(&fragment),
            "1 &lt; 2 &amp; 3"
        );
    }

    #[test]
    fn test_render_assigns_markup_as_text() {
        let mut page = MemoryPage::new().with_element("output");
        let markup = Renderer::default()
            .render(&fragment(), &mut page, "output")
            .unwrap();
        assert_eq!(page.text_content("output"), Some(markup.as_str()));
        assert!(markup.starts_with("<p"));
    }

    #[test]
    fn test_empty_fragment_renders_empty() {
        let mut page = MemoryPage::new().with_element("output");
        let markup = Renderer::default()
            .render(&Fragment::new(), &mut page, "output")
            .unwrap();
        assert_eq!(markup, "");
        assert_eq!(page.text_content("output"), Some(""));
    }

    #[test]
    fn test_missing_element() {
        let mut page = MemoryPage::new();
        assert!(matches!(
            Renderer::default().render(&fragment(), &mut page, "output"),
            Err(RenderError::ElementNotFound(_))
        ));
    }
}
