//! A "dumb" XML driver that reads an XSLT source file and notifies a builder object of events.
use super::compiler::StylesheetBuilder;
use super::util::get_owned_attributes;
use crate::error::XsltError;
use quick_xml::Reader;
use quick_xml::escape::unescape;
use quick_xml::events::Event as XmlEvent;

/// Drives the parsing process, calling builder methods for each significant XML event.
///
/// Character data split across text, entity reference and CDATA events is
/// delivered to the builder as one string.
pub fn parse_stylesheet_content(
    source: &str,
    builder: &mut impl StylesheetBuilder,
) -> Result<(), XsltError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();
    let mut pending_text = String::new();

    loop {
        let pos = reader.buffer_position() as usize;
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Text(e) => {
                let raw_text = std::str::from_utf8(e.as_ref())?;
                pending_text.push_str(&unescape_text(raw_text)?);
            }
            XmlEvent::GeneralRef(e) => {
                let entity = format!("&{};", std::str::from_utf8(e.as_ref())?);
                pending_text.push_str(&unescape_text(&entity)?);
            }
            XmlEvent::CData(e) => {
                pending_text.push_str(std::str::from_utf8(e.as_ref())?);
            }
            XmlEvent::Start(e) => {
                flush_text(&mut pending_text, builder)?;
                let name = std::str::from_utf8(e.name().as_ref())?.to_string();
                let attributes = get_owned_attributes(&e)?;
                builder.start_element(&name, attributes, pos, source)?;
            }
            XmlEvent::Empty(e) => {
                flush_text(&mut pending_text, builder)?;
                let name = std::str::from_utf8(e.name().as_ref())?.to_string();
                let attributes = get_owned_attributes(&e)?;
                builder.empty_element(&name, attributes, pos, source)?;
            }
            XmlEvent::End(e) => {
                flush_text(&mut pending_text, builder)?;
                let name = std::str::from_utf8(e.name().as_ref())?.to_string();
                builder.end_element(&name, pos, source)?;
            }
            XmlEvent::Eof => break,
            // Comments and processing instructions in a stylesheet separate
            // text nodes but produce nothing themselves.
            XmlEvent::Comment(_) | XmlEvent::PI(_) => flush_text(&mut pending_text, builder)?,
            _ => (),
        }
        buf.clear();
    }
    flush_text(&mut pending_text, builder)
}

fn unescape_text(raw: &str) -> Result<String, XsltError> {
    Ok(unescape(raw)
        .map_err(|e| XsltError::Compilation(e.to_string()))?
        .into_owned())
}

fn flush_text(pending: &mut String, builder: &mut impl StylesheetBuilder) -> Result<(), XsltError> {
    if pending.is_empty() {
        return Ok(());
    }
    builder.text(std::mem::take(pending))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::OwnedAttributes;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl StylesheetBuilder for Recorder {
        fn start_element(
            &mut self,
            name: &str,
            attrs: OwnedAttributes,
            _pos: usize,
            _source: &str,
        ) -> Result<(), XsltError> {
            let attrs: Vec<String> = attrs.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
            self.0.push(format!("start {} [{}]", name, attrs.join(",")));
            Ok(())
        }

        fn end_element(&mut self, name: &str, _pos: usize, _source: &str) -> Result<(), XsltError> {
            self.0.push(format!("end {}", name));
            Ok(())
        }

        fn text(&mut self, text: String) -> Result<(), XsltError> {
            self.0.push(format!("text {:?}", text));
            Ok(())
        }
    }

    #[test]
    fn test_events_and_merged_text() {
        let mut recorder = Recorder::default();
        parse_stylesheet_content(
            r#"<a x="1 &amp; 2"><b/>Tom &amp; <![CDATA[<Jerry>]]><!-- c -->!</a>"#,
            &mut recorder,
        )
        .unwrap();
        assert_eq!(
            recorder.0,
            vec![
                "start a [x=1 & 2]",
                "start b []",
                "end b",
                "text \"Tom & <Jerry>\"",
                "text \"!\"",
                "end a",
            ]
        );
    }

    #[test]
    fn test_mismatched_end_tag_is_an_error() {
        let mut recorder = Recorder::default();
        assert!(parse_stylesheet_content("<a><b></a>", &mut recorder).is_err());
    }
}
