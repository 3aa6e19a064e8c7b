//! A host page held as XHTML text.

use crate::error::RenderError;
use crate::traits::Page;
use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::escape::unescape;
use quick_xml::events::{BytesStart, BytesText, Event};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XhtmlPage {
    markup: String,
}

impl XhtmlPage {
    pub fn new(markup: impl Into<String>) -> Self {
        Self {
            markup: markup.into(),
        }
    }

    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn into_markup(self) -> String {
        self.markup
    }
}

fn has_id(element: &BytesStart, id: &str) -> Result<bool, RenderError> {
    for attr in element.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        if attr.key.as_ref() == b"id" {
            let value = std::str::from_utf8(&attr.value)?;
            return Ok(unescape(value).map_err(quick_xml::Error::from)? == id);
        }
    }
    Ok(false)
}

/// Copies `markup`, replacing the children of the first element with the
/// given id by a single text node.
fn replace_content(markup: &str, element_id: &str, text: &str) -> Result<String, RenderError> {
    let mut reader = Reader::from_str(markup);
    let mut writer = Writer::new(Vec::new());
    let mut found = false;
    // Nesting depth inside the element being replaced.
    let mut skipping: Option<usize> = None;

    loop {
        let event = reader.read_event()?;
        if let Some(depth) = skipping.as_mut() {
            match event {
                Event::Start(_) => *depth += 1,
                Event::End(end) if *depth == 0 => {
                    writer.write_event(Event::Text(BytesText::new(text)))?;
                    writer.write_event(Event::End(end))?;
                    skipping = None;
                }
                Event::End(_) => *depth -= 1,
                Event::Eof => break,
                _ => {}
            }
            continue;
        }

        match event {
            Event::Start(start) if !found && has_id(&start, element_id)? => {
                found = true;
                writer.write_event(Event::Start(start))?;
                skipping = Some(0);
            }
            Event::Empty(start) if !found && has_id(&start, element_id)? => {
                found = true;
                let end = start.to_end().into_owned();
                writer.write_event(Event::Start(start))?;
                writer.write_event(Event::Text(BytesText::new(text)))?;
                writer.write_event(Event::End(end))?;
            }
            Event::Eof => break,
            other => writer.write_event(other)?,
        }
    }

    if !found {
        return Err(RenderError::ElementNotFound(element_id.to_string()));
    }
    Ok(String::from_utf8(writer.into_inner()).map_err(|e| e.utf8_error())?)
}

impl Page for XhtmlPage {
    fn set_text_content(&mut self, element_id: &str, text: &str) -> Result<(), RenderError> {
        self.markup = replace_content(&self.markup, element_id, text)?;
        log::debug!("Assigned {} characters to #{}", text.len(), element_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<?xml version="1.0"?>
<html xmlns="http://www.w3.org/1999/xhtml">
  <body>
    <h1>Result</h1>
    <div id="output"><p>placeholder <b>text</b></p></div>
    <pre id="empty"/>
  </body>
</html>"#;

    #[test]
    fn test_replaces_children_with_escaped_text() {
        let mut page = XhtmlPage::new(PAGE);
        page.set_text_content("output", "<p>Hi & bye</p>").unwrap();
        let markup = page.into_markup();
        assert!(markup.contains(r#"<div id="output">&lt;p&gt;Hi &amp; bye&lt;/p&gt;</div>"#));
        assert!(!markup.contains("placeholder"));
        assert!(markup.contains("<h1>Result</h1>"));
        assert!(markup.starts_with(r#"<?xml version="1.0"?>"#));
    }

    #[test]
    fn test_expands_empty_element() {
        let mut page = XhtmlPage::new(PAGE);
        page.set_text_content("empty", "x").unwrap();
        assert!(page.markup().contains(r#"<pre id="empty">x</pre>"#));
    }

    #[test]
    fn test_empty_text_clears_content() {
        let mut page = XhtmlPage::new(PAGE);
        page.set_text_content("output", "").unwrap();
        assert!(page.markup().contains(r#"<div id="output"></div>"#));
    }

    #[test]
    fn test_missing_element() {
        let mut page = XhtmlPage::new(PAGE);
        let err = page.set_text_content("missing", "x").unwrap_err();
        assert!(matches!(err, RenderError::ElementNotFound(ref id) if id == "missing"));
        assert_eq!(page.markup(), PAGE);
    }

    #[test]
    fn test_setting_twice_replaces_previous_text() {
        let mut page = XhtmlPage::new(PAGE);
        page.set_text_content("output", "first").unwrap();
        page.set_text_content("output", "second").unwrap();
        assert!(page.markup().contains(r#"<div id="output">second</div>"#));
    }
}
