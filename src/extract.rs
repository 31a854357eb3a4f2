//! One extraction pass: parse, index comments, build the model.

use std::path::Path;

use tracing::{debug, info};

use crate::comments::{CommentIndex, ParsedComment};
use crate::error::Result;
use crate::frontend::{CppFrontEnd, Diagnostic, FrontEnd, TranslationUnit};
use crate::model::{Module, ModelBuilder};

/// The result of extracting one translation unit.
#[derive(Debug)]
pub struct Extraction {
    pub module: Module,
    /// Front-end problems. Extraction went ahead regardless.
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn has_problems(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}

/// Runs extractions with a given front end.
pub struct Extractor<F: FrontEnd = CppFrontEnd> {
    front_end: F,
}

impl Extractor<CppFrontEnd> {
    pub fn new() -> Self {
        Self::with_front_end(CppFrontEnd::new())
    }
}

impl Default for Extractor<CppFrontEnd> {
    fn default() -> Self {
        Self::new()
    }
}

impl<F: FrontEnd> Extractor<F> {
    pub fn with_front_end(front_end: F) -> Self {
        Self { front_end }
    }

    pub fn extract(&self, path: &Path, args: &[String]) -> Result<Extraction> {
        info!("Extracting {} with {}", path.display(), self.front_end.name());
        let unit = self.front_end.parse(path, args)?;
        run(unit)
    }

    pub fn extract_source(&self, path: &Path, source: &str, args: &[String]) -> Result<Extraction> {
        let unit = self.front_end.parse_source(path, source, args)?;
        run(unit)
    }
}

/// Extracts `path` with the default front end.
pub fn extract(path: &Path, args: &[String]) -> Result<Extraction> {
    Extractor::new().extract(path, args)
}

/// Extracts in-memory `source` as if it were the contents of `path`.
pub fn extract_source(path: &Path, source: &str, args: &[String]) -> Result<Extraction> {
    Extractor::new().extract_source(path, source, args)
}

fn run(unit: TranslationUnit) -> Result<Extraction> {
    let comments = CommentIndex::build(&unit);
    debug!("Attached {} comments", comments.len());

    let graph = ModelBuilder::new(&unit, &comments).build()?;
    debug!("Built {} entities", graph.len());

    let top = ParsedComment::from_raw(comments.top_comment());
    let module = graph.into_module(top.title, top.body, unit.main_file().to_string());

    Ok(Extraction {
        module,
        diagnostics: unit.diagnostics().to_vec(),
    })
}
