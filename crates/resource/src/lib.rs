//! Resource loaders for xslview.
//!
//! A [`ResourceLoader`] resolves a relative path against its base and returns
//! the raw bytes with a single blocking round trip. [`load_xml`] turns those
//! bytes into a checked XML [`SourceDocument`].
//!
//! ## Available Loaders
//!
//! - [`HttpResourceLoader`]: blocking GET against a base URL (`http` feature)
//! - [`FilesystemResourceLoader`]: reads relative to a base directory
//! - [`InMemoryResourceLoader`]: pre-populated map, for tests and embedding

mod error;
mod filesystem;
#[cfg(feature = "http")]
mod http;
mod memory;
mod xml;

use std::fmt::Debug;
use std::sync::Arc;

pub use error::{LoadError, ResourceError};
pub use filesystem::FilesystemResourceLoader;
#[cfg(feature = "http")]
pub use http::HttpResourceLoader;
pub use memory::InMemoryResourceLoader;
pub use xml::load_xml;
pub use xslview_xslt::SourceDocument;

/// Shared resource data (reference-counted bytes).
pub type SharedResourceData = Arc<Vec<u8>>;

/// Loads resources by relative path.
///
/// Every call blocks until the resource is available or has failed. Nothing
/// is cached or retried.
pub trait ResourceLoader: Send + Sync + Debug {
    /// Loads the resource at `path`, resolved against [`base`](Self::base).
    fn load(&self, path: &str) -> Result<SharedResourceData, ResourceError>;

    /// Whether the resource exists and could be loaded.
    fn exists(&self, path: &str) -> bool;

    /// The URL or directory relative paths are resolved against, if any.
    fn base(&self) -> Option<&str> {
        None
    }

    /// A human-readable name for logging.
    fn name(&self) -> &'static str;
}
