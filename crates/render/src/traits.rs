use crate::error::RenderError;

/// A page whose elements can receive text.
pub trait Page {
    /// Replaces the content of the element with id `element_id` by `text`.
    /// The text is shown as-is; markup in it is never interpreted.
    fn set_text_content(&mut self, element_id: &str, text: &str) -> Result<(), RenderError>;
}
