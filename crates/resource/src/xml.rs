use crate::{LoadError, ResourceLoader};
use xslview_xslt::SourceDocument;

/// Loads `path` and checks that it is well-formed XML.
///
/// A UTF-16 byte-order mark selects UTF-16. Otherwise the `encoding` of the
/// XML declaration is honoured for UTF-8 and for the labels browsers decode
/// as windows-1252 (`ISO-8859-1`, `US-ASCII`, ...); without one the bytes
/// must be UTF-8.
pub fn load_xml(loader: &dyn ResourceLoader, path: &str) -> Result<SourceDocument, LoadError> {
    log::debug!("Loading '{}' with {}", path, loader.name());
    let data = loader.load(path)?;
    let text = decode(path, &data)?;
    SourceDocument::parse(text).map_err(|source| LoadError::Xml {
        path: path.to_string(),
        source,
    })
}

fn decode(path: &str, data: &[u8]) -> Result<String, LoadError> {
    if let Some(units) = data.strip_prefix(&[0xFF, 0xFE]) {
        return decode_utf16(path, units, u16::from_le_bytes);
    }
    if let Some(units) = data.strip_prefix(&[0xFE, 0xFF]) {
        return decode_utf16(path, units, u16::from_be_bytes);
    }

    let encoding = declared_encoding(data).map(|e| e.to_ascii_lowercase());
    match encoding.as_deref() {
        None | Some("utf-8" | "utf8" | "unicode-1-1-utf-8") => std::str::from_utf8(data)
            .map(str::to_string)
            .map_err(|source| LoadError::Encoding {
                path: path.to_string(),
                source,
            }),
        Some(label) if WINDOWS_1252_LABELS.contains(&label) => {
            Ok(data.iter().map(|&b| windows_1252_char(b)).collect())
        }
        Some(label) => Err(LoadError::UnsupportedEncoding {
            path: path.to_string(),
            encoding: label.to_string(),
        }),
    }
}

fn decode_utf16(
    path: &str,
    data: &[u8],
    unit: fn([u8; 2]) -> u16,
) -> Result<String, LoadError> {
    let units = data.chunks(2).map(|pair| match pair {
        [a, b] => unit([*a, *b]),
        // A dangling byte decodes as an unpaired surrogate.
        _ => 0xD800,
    });
    char::decode_utf16(units)
        .collect::<Result<String, _>>()
        .map_err(|source| LoadError::Utf16 {
            path: path.to_string(),
            source,
        })
}

/// The `encoding` pseudo-attribute of a leading XML declaration.
fn declared_encoding(data: &[u8]) -> Option<&str> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);
    if !data.starts_with(b"<?xml") {
        return None;
    }
    let end = data.windows(2).position(|w| w == b"?>")?;
    let declaration = std::str::from_utf8(&data[..end]).ok()?;
    let rest = declaration.split_once("encoding")?.1.trim_start();
    let rest = rest.strip_prefix('=')?.trim_start();
    let quote = rest.chars().next().filter(|c| matches!(c, '"' | '\''))?;
    let value = &rest[1..];
    value.find(quote).map(|close| &value[..close])
}

const WINDOWS_1252_LABELS: &[&str] = &[
    "windows-1252", "cp1252", "x-cp1252", "iso-8859-1", "iso8859-1", "iso_8859-1", "latin1",
    "l1", "us-ascii", "ascii", "cp819", "ibm819",
];

/// windows-1252 differs from Latin-1 only in 0x80..=0x9F.
const WINDOWS_1252_HIGH: [char; 32] = [
    '\u{20AC}', '\u{81}', '\u{201A}', '\u{192}', '\u{201E}', '\u{2026}', '\u{2020}', '\u{2021}',
    '\u{2C6}', '\u{2030}', '\u{160}', '\u{2039}', '\u{152}', '\u{8D}', '\u{17D}', '\u{8F}',
    '\u{90}', '\u{2018}', '\u{2019}', '\u{201C}', '\u{201D}', '\u{2022}', '\u{2013}', '\u{2014}',
    '\u{2DC}', '\u{2122}', '\u{161}', '\u{203A}', '\u{153}', '\u{9D}', '\u{17E}', '\u{178}',
];

fn windows_1252_char(byte: u8) -> char {
    match byte {
        0x80..=0x9F => WINDOWS_1252_HIGH[usize::from(byte - 0x80)],
        _ => char::from(byte),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InMemoryResourceLoader, ResourceError};

    #[test]
    fn test_load_well_formed() {
        let loader = InMemoryResourceLoader::new()
            .with("message.xml", "\u{feff}<message>hello</message>")
            .unwrap();
        let doc = load_xml(&loader, "message.xml").unwrap();
        assert_eq!(doc.text(), "<message>hello</message>");
        assert_eq!(doc.root_element_name().unwrap(), "message");
    }

    #[test]
    fn test_malformed_xml() {
        let loader = InMemoryResourceLoader::new()
            .with("broken.xml", "<message><unclosed></message>")
            .unwrap();
        let err = load_xml(&loader, "broken.xml").unwrap_err();
        assert!(matches!(err, LoadError::Xml { ref path, .. } if path == "broken.xml"));
    }

    #[test]
    fn test_invalid_utf8() {
        let loader = InMemoryResourceLoader::new()
            .with("latin1.xml", vec![b'<', b'a', b'>', 0xE9, b'<', b'/', b'a', b'>'])
            .unwrap();
        assert!(matches!(
            load_xml(&loader, "latin1.xml"),
            Err(LoadError::Encoding { .. })
        ));
    }

    #[test]
    fn test_declared_latin1() {
        let mut bytes = br#"<?xml version="1.0" encoding="ISO-8859-1"?><a>caf"#.to_vec();
        bytes.extend([0xE9, 0x80]);
        bytes.extend(b"</a>");
        let loader = InMemoryResourceLoader::new().with("latin1.xml", bytes).unwrap();
        let doc = load_xml(&loader, "latin1.xml").unwrap();
        assert!(doc.text().ends_with("<a>caf\u{e9}\u{20ac}</a>"));
    }

    #[test]
    fn test_utf16_with_byte_order_mark() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a>\u{e9}t\u{e9}</a>".encode_utf16() {
            bytes.extend(unit.to_le_bytes());
        }
        let loader = InMemoryResourceLoader::new().with("utf16.xml", bytes).unwrap();
        assert_eq!(load_xml(&loader, "utf16.xml").unwrap().text(), "<a>\u{e9}t\u{e9}</a>");
    }

    #[test]
    fn test_unsupported_encoding() {
        let loader = InMemoryResourceLoader::new()
            .with("sjis.xml", r#"<?xml version='1.0' encoding='Shift_JIS'?><a/>"#)
            .unwrap();
        assert!(matches!(
            load_xml(&loader, "sjis.xml"),
            Err(LoadError::UnsupportedEncoding { ref encoding, .. }) if encoding == "shift_jis"
        ));
    }

    #[test]
    fn test_declared_encoding() {
        assert_eq!(declared_encoding(br#"<?xml version="1.0" encoding = 'UTF-8' ?><a/>"#), Some("UTF-8"));
        assert_eq!(declared_encoding(br#"<?xml version="1.0"?><a/>"#), None);
        assert_eq!(declared_encoding(b"<a/>"), None);
    }

    #[test]
    fn test_missing_resource() {
        let loader = InMemoryResourceLoader::new();
        assert!(matches!(
            load_xml(&loader, "missing.xml"),
            Err(LoadError::Resource(ResourceError::NotFound(_)))
        ));
    }
}
