use clap::Parser;
use std::fs;
use std::path::PathBuf;
use xslview::config::{DEFAULT_DOCUMENT, DEFAULT_ELEMENT_ID, DEFAULT_STYLESHEET, parse_parameter};
use xslview::{Config, MemoryPage, Pipeline, PipelineError, XhtmlPage};

/// Transforms an XML document with an XSLT stylesheet and shows the markup
/// in a page element.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// URL or directory the resource paths are resolved against
    #[arg(long, env = "XSLVIEW_BASE")]
    base: Option<String>,

    /// Path of the stylesheet, relative to the base
    #[arg(long, env = "XSLVIEW_STYLESHEET", default_value = DEFAULT_STYLESHEET)]
    stylesheet: String,

    /// Path of the XML document, relative to the base
    #[arg(long, env = "XSLVIEW_DOCUMENT", default_value = DEFAULT_DOCUMENT)]
    document: String,

    /// Host XHTML page; without one the markup is printed
    #[arg(long, env = "XSLVIEW_PAGE")]
    page: Option<PathBuf>,

    /// Id of the element that receives the output
    #[arg(long, env = "XSLVIEW_ELEMENT", default_value = DEFAULT_ELEMENT_ID)]
    element: String,

    /// Where to write the updated page; stdout when absent
    #[arg(long, env = "XSLVIEW_OUT")]
    out: Option<PathBuf>,

    /// Stylesheet parameter as name=value (repeatable)
    #[arg(long = "param", env = "XSLVIEW_PARAMS", value_delimiter = ',')]
    params: Vec<String>,

    /// Treat undeclared variables and parameters as errors
    #[arg(long, env = "XSLVIEW_STRICT", default_value_t = false)]
    strict: bool,

    /// Maximum nesting of template invocations
    #[arg(long, env = "XSLVIEW_MAX_DEPTH")]
    max_depth: Option<usize>,

    /// Timeout for HTTP requests, in seconds
    #[arg(long, env = "XSLVIEW_TIMEOUT_SECS")]
    timeout_secs: Option<u64>,
}

impl Args {
    fn to_config(&self) -> Result<Config, PipelineError> {
        let mut config = Config::new()
            .with_stylesheet(self.stylesheet.as_str())
            .with_document(self.document.as_str())
            .with_element_id(self.element.as_str())
            .with_strict(self.strict);
        if let Some(base) = &self.base {
            config = config.with_base(base.as_str());
        }
        if let Some(max_depth) = self.max_depth {
            config = config.with_max_depth(max_depth);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_timeout_secs(secs);
        }
        for assignment in &self.params {
            let (name, value) = parse_parameter(assignment)?;
            config = config.with_parameter(name, value);
        }
        Ok(config)
    }
}

fn main() -> Result<(), PipelineError> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("xslview=info"))
        .init();

    let args = Args::parse();
    let pipeline = Pipeline::from_config(args.to_config()?)?;

    match &args.page {
        Some(page_path) => {
            let mut page = XhtmlPage::new(fs::read_to_string(page_path)?);
            pipeline.run(&mut page)?;
            match &args.out {
                Some(out) => fs::write(out, page.into_markup())?,
                None => println!("{}", page.into_markup()),
            }
        }
        None => {
            let mut page = MemoryPage::new().with_element(args.element.as_str());
            let markup = pipeline.run(&mut page)?;
            match &args.out {
                Some(out) => fs::write(out, markup)?,
                None => println!("{}", markup),
            }
        }
    }
    Ok(())
}
