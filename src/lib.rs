//! xslview fetches an XML document and an XSLT stylesheet, applies the
//! transform and writes the serialized result into a page element.
//!
//! The [`Pipeline`] runs the four steps in order with blocking loads:
//!
//! 1. load the stylesheet and import it into an [`XsltProcessor`],
//! 2. load the source document,
//! 3. transform it into a result [`Fragment`],
//! 4. serialize the fragment and assign the markup to the page element.
//!
//! The building blocks live in their own crates and are re-exported here.

pub mod config;
pub mod error;
pub mod pipeline;

pub use config::Config;
pub use error::PipelineError;
pub use pipeline::Pipeline;

pub use xslview_dom::{Element, Fragment, Node, OutputMethod};
pub use xslview_render::{MemoryPage, Page, RenderError, Renderer, XhtmlPage};
pub use xslview_resource::{
    FilesystemResourceLoader, InMemoryResourceLoader, LoadError, ResourceError, ResourceLoader,
    SourceDocument, load_xml,
};
#[cfg(feature = "http")]
pub use xslview_resource::HttpResourceLoader;
pub use xslview_xslt::{ExecutionConfig, XsltError, XsltProcessor};
