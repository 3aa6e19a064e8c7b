use crate::ast::{AttributeValueTemplate, AvtPart};
use crate::error::{Location, XsltError};
use quick_xml::escape::unescape;
use quick_xml::events::BytesStart;
use xslview_xpath1::parse_expression;

/// Attribute name and unescaped value pairs, in source order.
pub type OwnedAttributes = Vec<(String, String)>;

pub(crate) fn get_owned_attributes(e: &BytesStart) -> Result<OwnedAttributes, XsltError> {
    let mut attributes = Vec::new();
    for attr in e.attributes() {
        let attr = attr?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let raw = std::str::from_utf8(&attr.value)?;
        let value = unescape(raw)
            .map_err(|e| XsltError::Compilation(format!("In attribute '{}': {}", key, e)))?
            .into_owned();
        attributes.push((key, value));
    }
    Ok(attributes)
}

pub(crate) fn get_line_col_from_pos(source: &str, pos: usize) -> (usize, usize) {
    let before = &source[..pos.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let col = before.rfind('\n').map_or(before.len(), |nl| before.len() - nl - 1) + 1;
    (line, col)
}

pub(crate) fn get_attr_owned_optional(attributes: &OwnedAttributes, name: &str) -> Option<String> {
    attributes
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.clone())
}

pub(crate) fn get_attr_owned_required(
    attributes: &OwnedAttributes,
    name: &str,
    tag_name: &str,
    pos: usize,
    source: &str,
) -> Result<String, XsltError> {
    get_attr_owned_optional(attributes, name).ok_or_else(|| XsltError::TemplateStructure {
        message: format!("Missing required attribute '{}' on <{}>", name, tag_name),
        location: Location::from(get_line_col_from_pos(source, pos)),
    })
}

/// Parses an attribute value template such as `item-{@id}`. `{{` and `}}`
/// stand for literal braces.
pub(crate) fn parse_avt(text: &str) -> Result<AttributeValueTemplate, XsltError> {
    let mut parts = Vec::new();
    let mut literal = String::new();
    let mut chars = text.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '{' if chars.peek().is_some_and(|&(_, n)| n == '{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek().is_some_and(|&(_, n)| n == '}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let start = i + 1;
                let mut quote: Option<char> = None;
                let mut end = None;
                for (j, c) in chars.by_ref() {
                    match (quote, c) {
                        (Some(q), c) if c == q => quote = None,
                        (Some(_), _) => {}
                        (None, '\'' | '"') => quote = Some(c),
                        (None, '}') => {
                            end = Some(j);
                            break;
                        }
                        (None, _) => {}
                    }
                }
                let end = end.ok_or_else(|| {
                    XsltError::Compilation(format!(
                        "Unterminated expression in attribute value template '{}'",
                        text
                    ))
                })?;
                if !literal.is_empty() {
                    parts.push(AvtPart::Static(std::mem::take(&mut literal)));
                }
                parts.push(AvtPart::Dynamic(parse_expression(&text[start..end])?));
            }
            '}' => {
                return Err(XsltError::Compilation(format!(
                    "Unescaped '}}' in attribute value template '{}'",
                    text
                )));
            }
            _ => literal.push(c),
        }
    }

    if parts.is_empty() {
        return Ok(AttributeValueTemplate::Static(literal));
    }
    if !literal.is_empty() {
        parts.push(AvtPart::Static(literal));
    }
    Ok(AttributeValueTemplate::Dynamic(parts))
}
