//! Walks a source tree and writes one output file per tagged source file.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, info};
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::config::GenerateSettings;
use crate::engine::{Synthesis, synthesize};
use crate::errors::Warning;
use crate::extract::{TAG_ATTRIBUTE, parse_source};
use crate::render::{header_comment, render_file};

/// What happened to one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Written,
    /// Source no longer produces methods and its old output was deleted.
    Removed,
    /// Output differs from what is on disk but writing was disabled.
    Stale,
    Unchanged,
    /// Tags were found but no method came out of them, and there is no old output.
    Empty,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub source: PathBuf,
    pub output: PathBuf,
    pub methods: usize,
    pub warnings: Vec<Warning>,
    #[serde(flatten)]
    pub outcome: Outcome,
}

impl FileReport {
    fn new(source: &Path, output: PathBuf) -> Self {
        Self {
            source: source.to_path_buf(),
            output,
            methods: 0,
            warnings: Vec::new(),
            outcome: Outcome::Empty,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    pub files: Vec<FileReport>,
}

impl RunSummary {
    pub fn count(&self, outcome: fn(&Outcome) -> bool) -> usize {
        self.files.iter().filter(|f| outcome(&f.outcome)).count()
    }

    pub fn has_failures(&self) -> bool {
        self.count(|o| matches!(o, Outcome::Failed { .. })) > 0
    }

    pub fn has_stale(&self) -> bool {
        self.count(|o| matches!(o, Outcome::Stale)) > 0
    }

    pub fn warnings(&self) -> impl Iterator<Item = (&Path, &Warning)> {
        self.files
            .iter()
            .flat_map(|f| f.warnings.iter().map(move |w| (f.source.as_path(), w)))
    }
}

/// Rendered output for one source file.
#[derive(Debug, Clone)]
pub struct Generated {
    pub synthesis: Synthesis,
    /// `None` when the file produced no methods.
    pub code: Option<String>,
}

/// `src/foo.rs` -> `src/foo_meta.rs`
pub fn output_path(source: &Path, suffix: &str) -> PathBuf {
    let stem = source.file_stem().and_then(|s| s.to_str()).unwrap_or_default();
    source.with_file_name(format!("{stem}{suffix}.rs"))
}

/// Extract, synthesize and render one file.
pub fn generate_file(source: &Path, settings: &GenerateSettings) -> Result<Generated> {
    let content = fs::read_to_string(source).with_context(|| format!("Failed to read {}", source.display()))?;
    generate_source(&content, &source.display().to_string(), settings)
}

pub fn generate_source(content: &str, path: &str, settings: &GenerateSettings) -> Result<Generated> {
    let unit = parse_source(content, path)?;
    let synthesis = synthesize(&unit).with_context(|| format!("Failed to synthesize methods for {path}"))?;
    let code = if synthesis.registry.is_empty() {
        None
    } else {
        Some(render_file(&synthesis.registry, &settings.header).with_context(|| format!("Failed to render {path}"))?)
    };
    Ok(Generated { synthesis, code })
}

/// Rust files under `root` that may carry tags, in sorted order.
///
/// Hidden and excluded directories are not descended into; generated files are skipped.
pub fn discover(root: &Path, settings: &GenerateSettings) -> Vec<PathBuf> {
    let skip_dir = |entry: &DirEntry| {
        entry.depth() > 0
            && entry.file_type().is_dir()
            && entry
                .file_name()
                .to_str()
                .is_some_and(|name| name.starts_with('.') || settings.exclude.iter().any(|e| e == name))
    };

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| !skip_dir(e))
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(DirEntry::into_path)
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "rs")
                && !path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|stem| stem.ends_with(&settings.suffix))
        })
        .collect()
}

/// Quick text check before doing full parsing.
fn may_contain_tags(content: &str) -> bool {
    content.contains(&format!("#[{TAG_ATTRIBUTE}"))
}

/// Generates output for every tagged file under a root.
pub struct Driver {
    root: PathBuf,
    settings: GenerateSettings,
    write: bool,
}

impl Driver {
    pub fn new(root: impl Into<PathBuf>, settings: GenerateSettings) -> Self {
        Self {
            root: root.into(),
            settings,
            write: true,
        }
    }

    /// When disabled, changed or orphaned outputs are reported as [`Outcome::Stale`]
    /// instead of written or removed.
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Process every discovered file. A failing file is recorded and the run continues.
    pub fn run(&self) -> Result<RunSummary> {
        if !self.root.exists() {
            anyhow::bail!("Scan path {} does not exist", self.root.display());
        }

        let mut summary = RunSummary::default();
        for source in discover(&self.root, &self.settings) {
            let output = output_path(&source, &self.settings.suffix);
            let content = match fs::read_to_string(&source) {
                Ok(content) => content,
                Err(err) => {
                    debug!("Failed to read {}: {err}", source.display());
                    let mut report = FileReport::new(&source, output);
                    report.outcome = Outcome::Failed {
                        error: format!("Failed to read {}: {err}", source.display()),
                    };
                    summary.files.push(report);
                    continue;
                }
            };
            if !may_contain_tags(&content) && !self.owns(&output) {
                continue;
            }
            debug!("Processing {}", source.display());
            summary.files.push(self.process(&source, output, &content));
        }
        Ok(summary)
    }

    fn process(&self, source: &Path, output: PathBuf, content: &str) -> FileReport {
        let mut report = FileReport::new(source, output.clone());

        let result = generate_source(content, &source.display().to_string(), &self.settings)
            .and_then(|generated| {
                report.methods = generated.synthesis.registry.len();
                report.warnings = generated.synthesis.warnings;
                match generated.code {
                    Some(code) => self.emit(&output, &code),
                    None => self.retire(&output),
                }
            });

        report.outcome = result.unwrap_or_else(|err| Outcome::Failed {
            error: format!("{err:#}"),
        });
        report
    }

    /// Only write if content has changed, to avoid needless recompilation.
    fn emit(&self, output: &Path, code: &str) -> Result<Outcome> {
        let unchanged = fs::read_to_string(output).is_ok_and(|existing| existing == code);
        if unchanged {
            return Ok(Outcome::Unchanged);
        }
        if !self.write {
            return Ok(Outcome::Stale);
        }

        fs::write(output, code).with_context(|| format!("Failed to write {}", output.display()))?;
        info!("Wrote {}", output.display());
        Ok(Outcome::Written)
    }

    /// Delete an output written by an earlier run once its source produces nothing.
    fn retire(&self, output: &Path) -> Result<Outcome> {
        if !self.owns(output) {
            return Ok(Outcome::Empty);
        }
        if !self.write {
            return Ok(Outcome::Stale);
        }

        fs::remove_file(output).with_context(|| format!("Failed to remove {}", output.display()))?;
        info!("Removed {}", output.display());
        Ok(Outcome::Removed)
    }

    /// Whether `output` exists and starts with this generator's header.
    fn owns(&self, output: &Path) -> bool {
        let header = header_comment(&self.settings.header);
        fs::read_to_string(output).is_ok_and(|existing| existing.starts_with(&header))
    }
}
