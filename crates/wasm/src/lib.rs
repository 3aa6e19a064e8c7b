//! WebAssembly bindings for xslview.
//!
//! Runs the same four-step pipeline as the native crate inside a browser
//! page: resources are fetched with synchronous `XMLHttpRequest` relative to
//! the page, and the serialized result is assigned as text to an element of
//! the live document.
//!
//! # Example
//!
//! ```javascript
//! import init, { run } from '@xslview/wasm';
//!
//! await init();
//! // Fetches filter.xslt and message.xml, writes into <pre id="output">
//! run('filter.xslt', 'message.xml', 'output');
//! ```
//!
//! Failures surface as a JavaScript `Error` with a `code` property such as
//! `NETWORK_ERROR` or `RENDER_ERROR`.

mod error;
mod loader;
#[cfg(feature = "console-logging")]
mod logging;
mod page;

pub use error::{ErrorCode, ViewError};
pub use loader::XhrResourceLoader;
pub use page::DomPage;

use wasm_bindgen::prelude::*;
use xslview::{Config, Pipeline, PipelineError, Renderer, SourceDocument, XsltProcessor};

/// Module initialization, called automatically by wasm-bindgen.
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();

    #[cfg(feature = "console-logging")]
    logging::init(log::LevelFilter::Info);
}

/// Returns the version of xslview-wasm.
#[wasm_bindgen(js_name = getVersion)]
pub fn get_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

/// Fetches the stylesheet and the document next to the page, transforms
/// and writes the markup into the element with `element_id`.
///
/// Returns the markup that was written.
#[wasm_bindgen]
pub fn run(stylesheet: &str, document: &str, element_id: &str) -> Result<String, JsValue> {
    let config = Config::new()
        .with_stylesheet(stylesheet)
        .with_document(document)
        .with_element_id(element_id);
    Ok(run_config(config)?)
}

/// Like [`run`], configured from a plain object with the fields of
/// [`Config`] (`base`, `stylesheet`, `document`, `elementId`, `parameters`,
/// `strict`, ...). Missing fields take their defaults.
#[wasm_bindgen(js_name = runWithConfig)]
pub fn run_with_config(config: JsValue) -> Result<String, JsValue> {
    let config: Config = if config.is_undefined() || config.is_null() {
        Config::default()
    } else {
        serde_wasm_bindgen::from_value(config).map_err(ViewError::from)?
    };
    Ok(run_config(config)?)
}

/// Transforms document text with stylesheet text and returns the markup,
/// without touching the page.
#[wasm_bindgen]
pub fn transform(stylesheet: &str, document: &str) -> Result<String, JsValue> {
    Ok(transform_text(stylesheet, document).map_err(ViewError::from)?)
}

fn run_config(config: Config) -> Result<String, ViewError> {
    let loader = match &config.base {
        Some(base) => XhrResourceLoader::with_base(base.as_str()),
        None => XhrResourceLoader::new(),
    };
    let mut page = DomPage::current().ok_or_else(|| {
        ViewError::new(ErrorCode::Render, "no document available in this context")
    })?;
    let pipeline = Pipeline::new(config, Box::new(loader));
    Ok(pipeline.run(&mut page)?)
}

fn transform_text(stylesheet: &str, document: &str) -> Result<String, PipelineError> {
    let mut processor = XsltProcessor::new();
    processor.import_stylesheet(&SourceDocument::parse(stylesheet)?)?;
    let fragment = processor.transform_to_fragment(&SourceDocument::parse(document)?)?;
    Ok(Renderer::new(processor.output_method()).serialize(&fragment))
}
