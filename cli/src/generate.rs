#![deny(missing_docs)]

//! # Generate
//!
//! Loads the inputs, runs the reconciler and writes the result.
//!
//! 1. **Registry**: every `--functions` file, in order.
//! 2. **Descriptions**: every `--descriptions` file, or `*.md` under a directory.
//! 3. **Input**: the existing document, indexed for diagnostic positions.
//! 4. **Output**: `-o`, else the input file, else stdout.

use apispec_core::{
    reconcile, AppError, AppResult, DescriptionCatalog, Document, FunctionRegistry,
    LandmarkIndex, ReconcileOptions,
};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Name used in landmarks for a document read from stdin.
const STDIN_NAME: &str = "<stdin>";

/// Arguments for a reconciliation run.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct GenerateArgs {
    /// API function registry (JSON). Repeat to merge several files.
    #[clap(long, env = "APISPEC_FUNCTIONS", value_delimiter = ',')]
    pub functions: Vec<PathBuf>,

    /// Existing OpenAPI document to merge into; `-` reads stdin.
    #[clap(short, long)]
    pub input: Option<PathBuf>,

    /// Markdown description file or directory. Repeatable.
    #[clap(long, env = "APISPEC_DESCRIPTIONS", value_delimiter = ',')]
    pub descriptions: Vec<PathBuf>,

    /// Output file; `-` writes stdout. Defaults to the input file.
    #[clap(short, long)]
    pub output: Option<PathBuf>,

    /// Replace `$ref`s in the input that differ from the computed ones.
    #[clap(long)]
    pub override_ref: bool,

    /// Replace conflicting query and body parameters.
    #[clap(long)]
    pub override_param: bool,

    /// Rebuild response schemas and fields.
    #[clap(long)]
    pub override_response: bool,

    /// Replace operation tags with the registry's.
    #[clap(long)]
    pub override_tags: bool,

    /// Replace shared schemas and parameters with the built-in definitions.
    #[clap(long)]
    pub override_schema: bool,

    /// Keep existing summaries and descriptions over catalog text.
    #[clap(long)]
    pub no_override_description: bool,

    /// Sort tags and paths even when merging into an input document.
    #[clap(long)]
    pub sort: bool,
}

impl GenerateArgs {
    /// The reconciler mode these flags select.
    pub fn options(&self) -> ReconcileOptions {
        ReconcileOptions {
            override_ref: self.override_ref,
            override_param: self.override_param,
            override_response: self.override_response,
            override_tags: self.override_tags,
            override_schema: self.override_schema,
            override_description: !self.no_override_description,
            sort: self.sort,
        }
    }

    /// Where the document is written; `None` is stdout.
    fn output_target(&self) -> Option<&Path> {
        let target = self.output.as_deref().or(self.input.as_deref())?;
        if is_stdio(target) {
            None
        } else {
            Some(target)
        }
    }
}

fn is_stdio(path: &Path) -> bool {
    path.as_os_str() == "-"
}

/// Input text plus the name its landmarks use.
struct Source {
    name: String,
    text: String,
}

fn read_source(path: &Path) -> AppResult<Source> {
    if is_stdio(path) {
        let text = io::read_to_string(io::stdin())?;
        return Ok(Source {
            name: STDIN_NAME.to_string(),
            text,
        });
    }
    let text = fs::read_to_string(path)
        .map_err(|e| AppError::General(format!("Failed to read {:?}: {}", path, e)))?;
    Ok(Source {
        name: path.display().to_string(),
        text,
    })
}

fn load_registry(paths: &[PathBuf]) -> AppResult<FunctionRegistry> {
    let mut registry = FunctionRegistry::new();
    for path in paths {
        let source = read_source(path)?;
        registry.load_json_str(&source.text).map_err(|e| {
            AppError::InvalidInput(format!("{}: {}", source.name, e))
        })?;
    }
    tracing::info!(functions = registry.len(), "loaded function registry");
    Ok(registry)
}

/// Markdown files named by `path`: the file itself, or `*.md` below a directory
/// in file-name order.
fn markdown_files(path: &Path) -> Vec<PathBuf> {
    if !path.is_dir() {
        return vec![path.to_path_buf()];
    }
    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "md"))
        .collect()
}

fn load_descriptions(paths: &[PathBuf]) -> AppResult<DescriptionCatalog> {
    let mut catalog = DescriptionCatalog::new();
    for path in paths {
        for file in markdown_files(path) {
            let source = read_source(&file)?;
            let added = catalog.add_markdown(&source.text);
            tracing::debug!(file = %source.name, entries = added, "loaded descriptions");
        }
    }
    tracing::info!(entries = catalog.len(), "loaded description catalog");
    Ok(catalog)
}

/// Executes one reconciliation run.
///
/// Diagnostics go to stderr; they never fail the run.
pub fn execute(args: &GenerateArgs) -> AppResult<()> {
    let registry = load_registry(&args.functions)?;
    let catalog = load_descriptions(&args.descriptions)?;

    let input = args.input.as_deref().map(read_source).transpose()?;
    let landmarks = input
        .as_ref()
        .map(|source| LandmarkIndex::build(&source.name, &source.text));
    let existing = input
        .as_ref()
        .map(|source| Document::parse(&source.text))
        .transpose()?;

    let result = reconcile(
        &registry,
        &catalog,
        args.options(),
        existing,
        landmarks.as_ref(),
    )?;
    for diagnostic in &result.diagnostics {
        eprintln!("{}", diagnostic);
    }

    let text = result.document.to_json_pretty()?;
    match args.output_target() {
        Some(path) => {
            fs::write(path, text)
                .map_err(|e| AppError::General(format!("Failed to write {:?}: {}", path, e)))?;
            tracing::info!(output = %path.display(), "wrote specification");
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
        }
    }
    Ok(())
}
