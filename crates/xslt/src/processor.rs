use crate::ast::CompiledStylesheet;
use crate::compiler;
use crate::datasource::{SourceDocument, XmlDocument};
use crate::error::XsltError;
use crate::executor::{DEFAULT_MAX_DEPTH, TemplateExecutor};
use crate::fragment_builder::FragmentBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use xslview_dom::{Fragment, OutputMethod};

/// Options that affect how a transform runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Undeclared variables and undeclared `with-param` names are errors
    /// instead of empty values.
    pub strict: bool,
    /// Maximum nesting of template invocations.
    pub max_depth: usize,
}

/// Stack reserved for each level of template nesting.
#[cfg(not(target_arch = "wasm32"))]
const STACK_BYTES_PER_LEVEL: usize = 64 * 1024;

/// Stack for everything outside template nesting: parsing, key indexes,
/// globals and deeply nested instructions within one template.
#[cfg(not(target_arch = "wasm32"))]
const BASE_STACK_BYTES: usize = 2 * 1024 * 1024;

#[cfg(not(target_arch = "wasm32"))]
fn run_with_stack<T, F>(max_depth: usize, f: F) -> Result<T, XsltError>
where
    T: Send,
    F: FnOnce() -> Result<T, XsltError> + Send,
{
    let stack_size =
        BASE_STACK_BYTES.saturating_add(max_depth.saturating_mul(STACK_BYTES_PER_LEVEL));
    std::thread::scope(|scope| {
        let handle = std::thread::Builder::new()
            .name("xslt-transform".to_string())
            .stack_size(stack_size)
            .spawn_scoped(scope, f)?;
        match handle.join() {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    })
}

/// wasm32 has no threads; the default depth fits its 1 MiB stack.
#[cfg(target_arch = "wasm32")]
fn run_with_stack<T, F>(_max_depth: usize, f: F) -> Result<T, XsltError>
where
    F: FnOnce() -> Result<T, XsltError>,
{
    f()
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// Applies an XSLT 1.0 stylesheet to source documents.
///
/// The stylesheet is imported once; every transform after that starts from
/// the same compiled form, so identical inputs always give identical output.
#[derive(Debug, Default)]
pub struct XsltProcessor {
    stylesheet: Option<Arc<CompiledStylesheet>>,
    parameters: HashMap<String, String>,
    config: ExecutionConfig,
}

impl XsltProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ExecutionConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Compiles `stylesheet` and makes it the transform for later calls,
    /// replacing any stylesheet imported before.
    pub fn import_stylesheet(&mut self, stylesheet: &SourceDocument) -> Result<(), XsltError> {
        let compiled = compiler::compile(stylesheet.text())?;
        log::debug!(
            "Imported stylesheet with {} named templates, output method {:?}",
            compiled.named_templates.len(),
            compiled.output.method
        );
        self.stylesheet = Some(Arc::new(compiled));
        Ok(())
    }

    /// Transforms `source` into a detached result fragment.
    ///
    /// Outside wasm32 the transform runs on its own thread, with a stack
    /// sized for `max_depth` nested template invocations.
    pub fn transform_to_fragment(&self, source: &SourceDocument) -> Result<Fragment, XsltError> {
        let stylesheet = self.stylesheet.as_deref().ok_or(XsltError::NoStylesheet)?;
        run_with_stack(self.config.max_depth, || self.execute(stylesheet, source))
    }

    fn execute(
        &self,
        stylesheet: &CompiledStylesheet,
        source: &SourceDocument,
    ) -> Result<Fragment, XsltError> {
        let doc = XmlDocument::new(source.tree()?, stylesheet.space_rules.clone());

        let mut builder = FragmentBuilder::new();
        let mut executor = TemplateExecutor::new(stylesheet, doc.root_node(), self.config.strict)?
            .with_max_depth(self.config.max_depth);
        executor.execute(&self.parameters, &mut builder)?;

        let fragment = builder.get_result();
        log::debug!("Transform produced {} top-level nodes", fragment.len());
        Ok(fragment)
    }

    pub fn set_parameter(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.parameters.insert(name.into(), value.into());
    }

    pub fn get_parameter(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn remove_parameter(&mut self, name: &str) -> Option<String> {
        self.parameters.remove(name)
    }

    pub fn clear_parameters(&mut self) {
        self.parameters.clear();
    }

    /// Drops the stylesheet and all parameters.
    pub fn reset(&mut self) {
        self.stylesheet = None;
        self.parameters.clear();
    }

    /// The `xsl:output method` of the imported stylesheet; HTML when the
    /// stylesheet does not name one or none is imported.
    pub fn output_method(&self) -> OutputMethod {
        self.stylesheet
            .as_ref()
            .and_then(|s| s.output.method)
            .unwrap_or_default()
    }

    pub fn stylesheet(&self) -> Option<&CompiledStylesheet> {
        self.stylesheet.as_deref()
    }

    pub fn config(&self) -> ExecutionConfig {
        self.config
    }
}
