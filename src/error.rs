use thiserror::Error;
use xslview_render::RenderError;
use xslview_resource::{LoadError, ResourceError};
use xslview_xslt::XsltError;

/// Every way a run can fail. None of them are retried.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Loading failed: {0}")]
    Load(#[from] LoadError),

    #[error("Transform failed: {0}")]
    Transform(#[from] XsltError),

    #[error("Rendering failed: {0}")]
    Render(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ResourceError> for PipelineError {
    fn from(e: ResourceError) -> Self {
        PipelineError::Load(LoadError::Resource(e))
    }
}
