use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("Page has no element with id '{0}'")]
    ElementNotFound(String),

    #[error("Malformed page markup: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Page markup is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
