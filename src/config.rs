use crate::error::PipelineError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use xslview_xslt::ExecutionConfig;
use xslview_xslt::executor::DEFAULT_MAX_DEPTH;

pub const DEFAULT_STYLESHEET: &str = "filter.xslt";
pub const DEFAULT_DOCUMENT: &str = "message.xml";
pub const DEFAULT_ELEMENT_ID: &str = "output";

/// Everything one run of the pipeline needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
    /// URL or directory the resource paths are resolved against. The
    /// current directory when unset.
    pub base: Option<String>,
    pub stylesheet: String,
    pub document: String,
    /// Id of the page element that receives the output.
    pub element_id: String,
    /// Name of the detached element the fragment is cloned into.
    pub container: String,
    /// Values for top-level `xsl:param` declarations.
    pub parameters: BTreeMap<String, String>,
    pub strict: bool,
    pub max_depth: usize,
    /// Request timeout for HTTP resources. No timeout when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base: None,
            stylesheet: DEFAULT_STYLESHEET.to_string(),
            document: DEFAULT_DOCUMENT.to_string(),
            element_id: DEFAULT_ELEMENT_ID.to_string(),
            container: xslview_render::DEFAULT_CONTAINER.to_string(),
            parameters: BTreeMap::new(),
            strict: false,
            max_depth: DEFAULT_MAX_DEPTH,
            timeout_secs: None,
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, PipelineError> {
        serde_json::from_str(json).map_err(|e| PipelineError::Config(e.to_string()))
    }

    pub fn with_base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    pub fn with_stylesheet(mut self, path: impl Into<String>) -> Self {
        self.stylesheet = path.into();
        self
    }

    pub fn with_document(mut self, path: impl Into<String>) -> Self {
        self.document = path.into();
        self
    }

    pub fn with_element_id(mut self, id: impl Into<String>) -> Self {
        self.element_id = id.into();
        self
    }

    pub fn with_container(mut self, name: impl Into<String>) -> Self {
        self.container = name.into();
        self
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn execution_config(&self) -> ExecutionConfig {
        ExecutionConfig {
            strict: self.strict,
            max_depth: self.max_depth,
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// Whether the base names an HTTP(S) location rather than a directory.
    pub fn is_remote(&self) -> bool {
        self.base
            .as_deref()
            .is_some_and(|b| b.starts_with("http://") || b.starts_with("https://"))
    }
}

/// Parses a `name=value` parameter assignment.
pub fn parse_parameter(assignment: &str) -> Result<(String, String), PipelineError> {
    match assignment.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_string(), value.to_string()))
        }
        _ => Err(PipelineError::Config(format!(
            "Parameter '{}' is not of the form name=value",
            assignment
        ))),
    }
}
