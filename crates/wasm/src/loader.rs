//! Resource loading with synchronous `XMLHttpRequest`.

use std::sync::Arc;
use web_sys::XmlHttpRequest;
use xslview::{ResourceError, ResourceLoader};

/// Fetches resources relative to the page, or to an explicit base URL.
///
/// Requests are synchronous and block the page until they finish.
#[derive(Debug, Clone, Default)]
pub struct XhrResourceLoader {
    base: Option<String>,
}

impl XhrResourceLoader {
    /// Paths resolve against the page location.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl Into<String>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    pub fn resolve(&self, path: &str) -> String {
        match &self.base {
            Some(base) => format!(
                "{}/{}",
                base.trim_end_matches('/'),
                path.trim_start_matches('/')
            ),
            None => path.to_string(),
        }
    }

    fn request(&self, method: &str, path: &str) -> Result<XmlHttpRequest, ResourceError> {
        let failed = |e: wasm_bindgen::JsValue| ResourceError::LoadFailed {
            path: path.to_string(),
            message: format!("{:?}", e),
        };
        let url = self.resolve(path);
        log::debug!("{} {} (synchronous)", method, url);

        let xhr = XmlHttpRequest::new().map_err(failed)?;
        xhr.open_with_async(method, &url, false).map_err(failed)?;
        // Synchronous requests cannot ask for an ArrayBuffer; this charset
        // keeps every byte as one character instead.
        xhr.override_mime_type("text/plain; charset=x-user-defined").map_err(failed)?;
        xhr.send().map_err(failed)?;
        Ok(xhr)
    }
}

/// Undoes the `x-user-defined` decoding: bytes 0x80..=0xFF arrive as
/// U+F780..=U+F7FF, ASCII as itself.
fn user_defined_bytes(text: &str) -> Vec<u8> {
    text.chars().map(|c| (u32::from(c) & 0xFF) as u8).collect()
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl ResourceLoader for XhrResourceLoader {
    fn load(&self, path: &str) -> Result<Arc<Vec<u8>>, ResourceError> {
        let xhr = self.request("GET", path)?;
        let status = xhr.status().map_err(|e| ResourceError::LoadFailed {
            path: path.to_string(),
            message: format!("{:?}", e),
        })?;
        if !is_success(status) {
            return Err(ResourceError::Status {
                path: path.to_string(),
                status,
            });
        }
        let text = xhr.response_text().ok().flatten().unwrap_or_default();
        Ok(Arc::new(user_defined_bytes(&text)))
    }

    fn exists(&self, path: &str) -> bool {
        self.request("HEAD", path)
            .ok()
            .and_then(|xhr| xhr.status().ok())
            .is_some_and(is_success)
    }

    fn base(&self) -> Option<&str> {
        self.base.as_deref()
    }

    fn name(&self) -> &'static str {
        "XhrResourceLoader"
    }
}
