use crate::executor::ExecutionError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub col: usize,
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}, column {}", self.line, self.col)
    }
}

impl From<(usize, usize)> for Location {
    fn from((line, col): (usize, usize)) -> Self {
        Location { line, col }
    }
}

#[derive(Error, Debug)]
pub enum XsltError {
    #[error("XML parsing error: {0}")]
    XmlParse(#[from] roxmltree::Error),

    #[error("Quick-XML error: {0}")]
    QuickXml(#[from] quick_xml::Error),

    #[error("XPath error: {0}")]
    XPath(#[from] xslview_xpath1::XPathError),

    #[error("Stylesheet compilation error: {0}")]
    Compilation(String),

    #[error("Stylesheet structure error at {location}: {message}")]
    TemplateStructure { message: String, location: Location },

    #[error("Transform failed: {0}")]
    Execution(#[from] ExecutionError),

    #[error("No stylesheet has been imported")]
    NoStylesheet,

    #[error("Could not start the transform thread: {0}")]
    Thread(#[from] std::io::Error),

    #[error("UTF-8 string error: {0}")]
    Utf8Str(#[from] std::str::Utf8Error),
}

impl From<quick_xml::events::attributes::AttrError> for XsltError {
    fn from(e: quick_xml::events::attributes::AttrError) -> Self {
        XsltError::QuickXml(quick_xml::Error::InvalidAttr(e))
    }
}
