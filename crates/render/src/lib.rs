//! Rendering of result fragments into a host page.
//!
//! - [`Page`] abstracts the page that owns the target element
//! - [`XhtmlPage`] edits a host page kept as XHTML text
//! - [`MemoryPage`] keeps element contents in a map, for headless runs
//! - [`Renderer`] clones a fragment into a container, serializes it and
//!   assigns the markup as the visible text of the target element

mod error;
mod memory;
mod renderer;
mod traits;
mod xhtml;

pub use error::RenderError;
pub use memory::MemoryPage;
pub use renderer::{DEFAULT_CONTAINER, Renderer};
pub use traits::Page;
pub use xhtml::XhtmlPage;
