use thiserror::Error;
use xslview_xslt::XsltError;

/// Failure to fetch the bytes of a resource.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Request for '{path}' failed with status {status}")]
    Status { path: String, status: u16 },

    #[error("Failed to load resource '{path}': {message}")]
    LoadFailed { path: String, message: String },

    #[error("Invalid resource path '{path}': {message}")]
    InvalidPath { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ResourceError {
    fn from(err: std::io::Error) -> Self {
        ResourceError::Io(err.to_string())
    }
}

/// Failure to load a resource as an XML document.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error(transparent)]
    Resource(#[from] ResourceError),

    #[error("Resource '{path}' is not valid UTF-8: {source}")]
    Encoding {
        path: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("Resource '{path}' is not valid UTF-16: {source}")]
    Utf16 {
        path: String,
        #[source]
        source: std::char::DecodeUtf16Error,
    },

    #[error("Resource '{path}' declares the unsupported encoding '{encoding}'")]
    UnsupportedEncoding { path: String, encoding: String },

    #[error("Resource '{path}' is not well-formed XML: {source}")]
    Xml {
        path: String,
        #[source]
        source: XsltError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_error_display() {
        let err = ResourceError::NotFound("test.xml".to_string());
        assert!(err.to_string().contains("test.xml"));

        let err = ResourceError::Status {
            path: "missing.xml".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "Request for 'missing.xml' failed with status 404");

        let err = ResourceError::LoadFailed {
            path: "file.xml".to_string(),
            message: "connection refused".to_string(),
        };
        assert!(err.to_string().contains("file.xml"));
        assert!(err.to_string().contains("connection refused"));
    }

    #[test]
    fn test_resource_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: ResourceError = io_err.into();
        assert!(matches!(err, ResourceError::Io(_)));
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_load_error_wraps_resource_error() {
        let err: LoadError = ResourceError::NotFound("a.xml".to_string()).into();
        assert_eq!(err.to_string(), "Resource not found: a.xml");
    }
}
