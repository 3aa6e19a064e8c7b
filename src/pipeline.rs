//! The four-step flow: load stylesheet, load document, transform, render.

use crate::config::Config;
use crate::error::PipelineError;
use xslview_dom::Fragment;
use xslview_render::{Page, Renderer};
use xslview_resource::{FilesystemResourceLoader, ResourceLoader, SourceDocument, load_xml};
use xslview_xslt::XsltProcessor;

/// Runs one fixed transform of one stylesheet and one document into one
/// page element.
#[derive(Debug)]
pub struct Pipeline {
    config: Config,
    loader: Box<dyn ResourceLoader>,
}

impl Pipeline {
    pub fn new(config: Config, loader: Box<dyn ResourceLoader>) -> Self {
        Self { config, loader }
    }

    /// Picks the loader from the configured base: HTTP for `http(s)://`
    /// URLs, the filesystem otherwise.
    pub fn from_config(config: Config) -> Result<Self, PipelineError> {
        let loader: Box<dyn ResourceLoader> = if config.is_remote() {
            remote_loader(&config)?
        } else {
            Box::new(FilesystemResourceLoader::new(
                config.base.as_deref().unwrap_or("."),
            ))
        };
        log::debug!("Using {} for base {:?}", loader.name(), loader.base());
        Ok(Self::new(config, loader))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Step 1: fetches the stylesheet and configures a processor with it.
    pub fn load_stylesheet(&self) -> Result<XsltProcessor, PipelineError> {
        let stylesheet = load_xml(self.loader.as_ref(), &self.config.stylesheet)?;
        let mut processor = XsltProcessor::with_config(self.config.execution_config());
        processor.import_stylesheet(&stylesheet)?;
        for (name, value) in &self.config.parameters {
            processor.set_parameter(name.as_str(), value.as_str());
        }
        log::debug!("Stylesheet '{}' imported", self.config.stylesheet);
        Ok(processor)
    }

    /// Step 2: fetches the source document.
    pub fn load_document(&self) -> Result<SourceDocument, PipelineError> {
        let document = load_xml(self.loader.as_ref(), &self.config.document)?;
        log::debug!("Document '{}' loaded", self.config.document);
        Ok(document)
    }

    /// Step 3: applies the stylesheet to the document.
    pub fn transform(
        &self,
        processor: &XsltProcessor,
        document: &SourceDocument,
    ) -> Result<Fragment, PipelineError> {
        Ok(processor.transform_to_fragment(document)?)
    }

    /// Step 4: serializes the fragment and writes it into the page.
    pub fn render(
        &self,
        processor: &XsltProcessor,
        fragment: &Fragment,
        page: &mut dyn Page,
    ) -> Result<String, PipelineError> {
        let renderer =
            Renderer::new(processor.output_method()).with_container(self.config.container.as_str());
        Ok(renderer.render(fragment, page, &self.config.element_id)?)
    }

    /// Runs all four steps. Returns the markup assigned to the element.
    pub fn run(&self, page: &mut dyn Page) -> Result<String, PipelineError> {
        let processor = self.load_stylesheet()?;
        let document = self.load_document()?;
        let fragment = self.transform(&processor, &document)?;
        self.render(&processor, &fragment, page)
    }
}

#[cfg(feature = "http")]
fn remote_loader(config: &Config) -> Result<Box<dyn ResourceLoader>, PipelineError> {
    let base = config.base.as_deref().unwrap_or_default();
    Ok(Box::new(xslview_resource::HttpResourceLoader::new(
        base,
        config.timeout(),
    )?))
}

#[cfg(not(feature = "http"))]
fn remote_loader(config: &Config) -> Result<Box<dyn ResourceLoader>, PipelineError> {
    Err(PipelineError::Config(format!(
        "Base '{}' needs the `http` feature",
        config.base.as_deref().unwrap_or_default()
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use xslview_render::{MemoryPage, RenderError};
    use xslview_resource::{InMemoryResourceLoader, LoadError};

    const FILTER: &str = r#"<xsl:stylesheet version="1.0" xmlns:xsl="http://www.w3.org/1999/XSL/Transform">
        <xsl:param name="who" select="'everyone'"/>
        <xsl:template match="/message">
            <p class="msg"><xsl:value-of select="text"/> to <xsl:value-of select="$who"/></p>
        </xsl:template>
    </xsl:stylesheet>"#;

    const MESSAGE: &str = "<message><text>Hello</text></message>";

    fn pipeline(config: Config, stylesheet: &str, document: &str) -> Pipeline {
        let loader = InMemoryResourceLoader::new()
            .with("filter.xslt", stylesheet)
            .unwrap()
            .with("message.xml", document)
            .unwrap();
        Pipeline::new(config, Box::new(loader))
    }

    #[test]
    fn test_run_writes_markup_into_element() {
        let mut page = MemoryPage::new().with_element("output");
        let markup = pipeline(Config::default(), FILTER, MESSAGE)
            .run(&mut page)
            .unwrap();
        assert_eq!(markup, r#"<p class="msg">Hello to everyone</p>"#);
        assert_eq!(page.text_content("output"), Some(markup.as_str()));
    }

    #[test]
    fn test_parameters_reach_stylesheet() {
        let mut page = MemoryPage::new().with_element("output");
        let config = Config::default().with_parameter("who", "you");
        let markup = pipeline(config, FILTER, MESSAGE).run(&mut page).unwrap();
        assert_eq!(markup, r#"<p class="msg">Hello to you</p>"#);
    }

    #[test]
    fn test_malformed_document_fails_before_render() {
        let mut page = MemoryPage::new().with_element("output");
        let err = pipeline(Config::default(), FILTER, "<message>")
            .run(&mut page)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Load(LoadError::Xml { .. })));
        assert_eq!(page.text_content("output"), Some(""));
    }

    #[test]
    fn test_missing_element_fails_at_render() {
        let mut page = MemoryPage::new();
        let err = pipeline(Config::default(), FILTER, MESSAGE)
            .run(&mut page)
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Render(RenderError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_missing_stylesheet_resource() {
        let loader = InMemoryResourceLoader::new().with("message.xml", MESSAGE).unwrap();
        let pipeline = Pipeline::new(Config::default(), Box::new(loader));
        assert!(matches!(
            pipeline.run(&mut MemoryPage::new().with_element("output")),
            Err(PipelineError::Load(LoadError::Resource(_)))
        ));
    }

    #[test]
    fn test_from_config_uses_filesystem_for_directories() {
        let pipeline = Pipeline::from_config(Config::default().with_base("fixtures")).unwrap();
        assert_eq!(pipeline.loader.name(), "FilesystemResourceLoader");
    }
}
