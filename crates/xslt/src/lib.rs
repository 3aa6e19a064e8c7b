//! XSLT 1.0 processor that turns XML source documents into result tree
//! fragments.
//!
//! Stylesheets are compiled once into a [`CompiledStylesheet`] and executed
//! against a `roxmltree` view of each source document. The executor writes
//! through the [`OutputBuilder`] trait, and [`FragmentBuilder`] assembles the
//! events into an `xslview_dom::Fragment`.

pub mod ast;
pub mod compiler;
pub mod datasource;
pub mod error;
pub mod executor;
pub mod fragment_builder;
pub mod output;
pub mod parser;
pub mod pattern;
pub mod processor;
mod util;

mod compiler_handlers;
mod executor_handlers;

pub use ast::CompiledStylesheet;
pub use datasource::{SourceDocument, XmlDocument, XmlNode};
pub use error::{Location, XsltError};
pub use executor::{ExecutionError, TemplateExecutor};
pub use fragment_builder::FragmentBuilder;
pub use output::{OutputBuilder, TextCollector};
pub use processor::{ExecutionConfig, XsltProcessor};
pub use xslview_dom::{Fragment, OutputMethod};
