//! Result tree fragments produced by a transform, and their serialization
//! to markup text.

pub mod node;
pub mod serialize;

pub use node::{Attribute, Element, Fragment, Node};
pub use serialize::{OutputMethod, escape_html, nodes_to_string};
