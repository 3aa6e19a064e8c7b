//! Error handling for WASM bindings.
//!
//! Converts xslview's error types into JavaScript `Error` objects carrying a
//! `code` property.

use wasm_bindgen::prelude::*;
use xslview::{LoadError, PipelineError, RenderError, ResourceError};

/// Error codes for TypeScript consumption.
#[wasm_bindgen]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid configuration passed from JavaScript
    Config,
    /// A request failed or returned a non-success status
    Network,
    /// A resource is not well-formed XML
    Parse,
    /// Stylesheet compilation or execution failed
    Transform,
    /// The output element is missing
    Render,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Config => "CONFIG_ERROR",
            ErrorCode::Network => "NETWORK_ERROR",
            ErrorCode::Parse => "PARSE_ERROR",
            ErrorCode::Transform => "TRANSFORM_ERROR",
            ErrorCode::Render => "RENDER_ERROR",
            ErrorCode::Unknown => "UNKNOWN_ERROR",
        }
    }
}

/// A JavaScript-friendly error.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct ViewError {
    code: ErrorCode,
    message: String,
}

impl ViewError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<PipelineError> for ViewError {
    fn from(err: PipelineError) -> Self {
        let code = match &err {
            PipelineError::Load(LoadError::Resource(_)) => ErrorCode::Network,
            PipelineError::Load(_) => ErrorCode::Parse,
            PipelineError::Transform(_) => ErrorCode::Transform,
            PipelineError::Render(_) => ErrorCode::Render,
            PipelineError::Config(_) => ErrorCode::Config,
            PipelineError::Io(_) => ErrorCode::Unknown,
        };
        Self::new(code, err.to_string())
    }
}

impl From<ResourceError> for ViewError {
    fn from(err: ResourceError) -> Self {
        Self::new(ErrorCode::Network, err.to_string())
    }
}

impl From<RenderError> for ViewError {
    fn from(err: RenderError) -> Self {
        Self::new(ErrorCode::Render, err.to_string())
    }
}

impl From<serde_wasm_bindgen::Error> for ViewError {
    fn from(err: serde_wasm_bindgen::Error) -> Self {
        Self::new(ErrorCode::Config, err.to_string())
    }
}

impl From<ViewError> for JsValue {
    fn from(err: ViewError) -> Self {
        let js_error = js_sys::Error::new(&err.message);
        js_sys::Reflect::set(
            &js_error,
            &"code".into(),
            &JsValue::from_str(err.code.as_str()),
        )
        .ok();
        js_error.into()
    }
}
