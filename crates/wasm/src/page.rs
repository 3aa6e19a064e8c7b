//! The live browser document as a render target.

use wasm_bindgen::JsCast;
use web_sys::{Document, HtmlElement};
use xslview::{Page, RenderError};

/// Writes the result into an element of the current document.
///
/// The markup is assigned as text, so the browser shows the tags instead of
/// interpreting them.
#[derive(Debug, Clone)]
pub struct DomPage {
    document: Document,
}

impl DomPage {
    pub fn new(document: Document) -> Self {
        Self { document }
    }

    /// The document of the global `window`, if there is one.
    pub fn current() -> Option<Self> {
        web_sys::window()
            .and_then(|window| window.document())
            .map(Self::new)
    }
}

impl Page for DomPage {
    fn set_text_content(&mut self, element_id: &str, text: &str) -> Result<(), RenderError> {
        let element = self
            .document
            .get_element_by_id(element_id)
            .ok_or_else(|| RenderError::ElementNotFound(element_id.to_string()))?;

        match element.dyn_ref::<HtmlElement>() {
            Some(html) => html.set_inner_text(text),
            None => element.set_text_content(Some(text)),
        }
        Ok(())
    }
}
