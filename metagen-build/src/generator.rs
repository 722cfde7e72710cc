//! Runs the file generator from a build script.

use anyhow::{Context, Result, bail};
use metagen::config::MetagenConfig;
use metagen::driver::{Driver, Outcome, RunSummary};
use std::path::PathBuf;

/// Builder for configuring and running the generator.
pub struct MetaGenerator {
    scan_paths: Vec<PathBuf>,
    config_dir: PathBuf,
    suffix: Option<String>,
}

impl MetaGenerator {
    /// Create a new generator with default settings.
    pub fn new() -> Self {
        Self {
            scan_paths: Vec::new(),
            config_dir: PathBuf::from("."),
            suffix: None,
        }
    }

    /// Add a path to scan for tagged structs.
    ///
    /// Can be called multiple times to scan multiple directories.
    pub fn scan_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.scan_paths.push(path.into());
        self
    }

    /// Directory holding `metagen.toml`.
    ///
    /// Default: the current directory, which is the package root inside a build script.
    pub fn config_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_dir = path.into();
        self
    }

    /// Override the output file suffix from `metagen.toml`.
    pub fn suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }

    /// Run the generator.
    ///
    /// Skipped directives are reported as cargo warnings. Any file that fails to
    /// parse or synthesize fails the run after every path has been processed.
    pub fn run(self) -> Result<()> {
        let summaries = self.generate()?;

        let mut failures = Vec::new();
        for summary in &summaries {
            for (source, warning) in summary.warnings() {
                println!("cargo:warning={}: {warning}", source.display());
            }
            for file in &summary.files {
                match &file.outcome {
                    Outcome::Written => {
                        eprintln!(
                            "metagen-build: Generated {} with {} methods",
                            file.output.display(),
                            file.methods
                        );
                    }
                    Outcome::Removed => eprintln!("metagen-build: Removed {}", file.output.display()),
                    Outcome::Failed { error } => failures.push(format!("{}: {error}", file.source.display())),
                    _ => {}
                }
            }
        }

        if !failures.is_empty() {
            bail!("Failed to generate meta files:\n{}", failures.join("\n"));
        }
        Ok(())
    }

    fn generate(self) -> Result<Vec<RunSummary>> {
        let mut settings = MetagenConfig::load(&self.config_dir)?.generate;
        if let Some(suffix) = self.suffix {
            settings.suffix = suffix;
        }

        // Default to scanning "src/" if no paths specified
        let scan_paths = if self.scan_paths.is_empty() {
            vec![PathBuf::from("src/")]
        } else {
            self.scan_paths
        };

        scan_paths
            .iter()
            .map(|path| {
                Driver::new(path, settings.clone())
                    .run()
                    .with_context(|| format!("Failed to scan {}", path.display()))
            })
            .collect()
    }
}

impl Default for MetaGenerator {
    fn default() -> Self {
        Self::new()
    }
}
