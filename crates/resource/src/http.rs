//! Blocking HTTP loader.

use crate::{ResourceError, ResourceLoader, SharedResourceData};
use reqwest::blocking::Client;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Fetches resources with a blocking GET, resolving paths against a base URL
/// the way a browser resolves relative links.
#[derive(Debug)]
pub struct HttpResourceLoader {
    base: Url,
    client: Client,
}

impl HttpResourceLoader {
    /// Creates a loader for `base`. Requests have no timeout unless one is given.
    pub fn new(base: &str, timeout: Option<Duration>) -> Result<Self, ResourceError> {
        let base = Url::parse(base).map_err(|e| ResourceError::InvalidPath {
            path: base.to_string(),
            message: e.to_string(),
        })?;
        // The blocking client waits 30 seconds by default; `None` disables that.
        let client = Client::builder().timeout(timeout).build().map_err(|e| ResourceError::LoadFailed {
            path: base.to_string(),
            message: format!("Failed to build HTTP client: {}", e),
        })?;
        Ok(Self { base, client })
    }

    /// Creates a loader that sends its requests through `client`.
    pub fn with_client(base: Url, client: Client) -> Self {
        Self { base, client }
    }

    pub fn resolve(&self, path: &str) -> Result<Url, ResourceError> {
        self.base.join(path).map_err(|e| ResourceError::InvalidPath {
            path: path.to_string(),
            message: e.to_string(),
        })
    }
}

impl ResourceLoader for HttpResourceLoader {
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError> {
        let url = self.resolve(path)?;
        log::debug!("GET {}", url);

        let failed = |e: reqwest::Error| ResourceError::LoadFailed {
            path: path.to_string(),
            message: e.to_string(),
        };
        let response = self.client.get(url).send().map_err(failed)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ResourceError::Status {
                path: path.to_string(),
                status: status.as_u16(),
            });
        }
        let body = response.bytes().map_err(failed)?;
        log::debug!("Received {} bytes for '{}'", body.len(), path);
        Ok(Arc::new(body.to_vec()))
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve(path)
            .ok()
            .and_then(|url| self.client.head(url).send().ok())
            .is_some_and(|response| response.status().is_success())
    }

    fn base(&self) -> Option<&str> {
        Some(self.base.as_str())
    }

    fn name(&self) -> &'static str {
        "HttpResourceLoader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serves one canned response on a local port and returns the base URL.
    fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());
            let mut line = String::new();
            while reader.read_line(&mut line).unwrap() > 0 {
                if line == "\r\n" {
                    break;
                }
                line.clear();
            }
            write!(
                stream,
                "HTTP/1.1 {}\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            )
            .unwrap();
        });
        format!("http://127.0.0.1:{}/app/", port)
    }

    fn local_loader(base: &str) -> HttpResourceLoader {
        let client = Client::builder()
            .no_proxy()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap();
        HttpResourceLoader::with_client(Url::parse(base).unwrap(), client)
    }

    #[test]
    fn test_resolve_relative_paths() {
        let loader = HttpResourceLoader::new("http://example.com/app/index.html", None).unwrap();
        assert_eq!(
            loader.resolve("filter.xslt").unwrap().as_str(),
            "http://example.com/app/filter.xslt"
        );
        assert_eq!(
            loader.resolve("../data/message.xml").unwrap().as_str(),
            "http://example.com/data/message.xml"
        );
        assert_eq!(loader.base(), Some("http://example.com/app/index.html"));
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            HttpResourceLoader::new("not a url", None),
            Err(ResourceError::InvalidPath { .. })
        ));
    }

    #[test]
    fn test_load_success() {
        let base = serve_once("200 OK", "<message>hi</message>");
        let loader = local_loader(&base);
        let data = loader.load("message.xml").unwrap();
        assert_eq!(&*data, b"<message>hi</message>");
    }

    #[test]
    fn test_non_success_status() {
        let base = serve_once("404 Not Found", "");
        let loader = local_loader(&base);
        assert_eq!(
            loader.load("missing.xml").unwrap_err(),
            ResourceError::Status {
                path: "missing.xml".to_string(),
                status: 404
            }
        );
    }
}
