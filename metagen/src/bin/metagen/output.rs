use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{Attribute, Cell, Color as TableColor, Table};
use serde::Serialize;
use std::io::Write;

use crate::theme::{ICONS, THEME};

/// Output format options for CLI commands
#[derive(Clone, Debug, ValueEnum, Default, PartialEq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

/// Global CLI options that affect output and behavior
#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Trait for data that can be displayed as a table
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
    fn to_compact(&self) -> String;
}

/// Output manager handles formatting and display
pub struct OutputManager {
    pub options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    pub fn is_json(&self) -> bool {
        matches!(self.options.output_format, OutputFormat::Json)
    }

    /// Display data according to the configured output format
    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet && !self.is_json() {
            return Ok(());
        }

        match self.options.output_format {
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(data)?;
                println!("{json}");
            }
            OutputFormat::Table => {
                let table = data.to_table(self);
                println!("{table}");
            }
            OutputFormat::Compact => {
                println!("{}", data.to_compact());
            }
        }
        Ok(())
    }

    /// Colored icon and message, or plain text with `--no-color`
    fn decorate(&self, icon: &str, message: &str, color: colored::Color) -> String {
        if self.options.no_color {
            format!("{icon} {message}")
        } else {
            format!("{} {}", icon.color(color), message.color(color))
        }
    }

    /// Status lines are suppressed in JSON mode so stdout stays parseable.
    fn chatty(&self) -> bool {
        !self.options.quiet && !self.is_json()
    }

    /// Display a success message with color and icon
    pub fn success(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.decorate(ICONS.success, message, THEME.success));
        }
    }

    /// Display an error message with color and icon
    pub fn error(&self, message: &str) {
        eprintln!("{}", self.decorate(ICONS.error, message, THEME.error));
    }

    /// Display a warning message
    pub fn warning(&self, message: &str) {
        if !self.options.quiet {
            eprintln!("{}", self.decorate(ICONS.warning, message, THEME.warning));
        }
    }

    /// Display info message with color and icon
    pub fn info(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.decorate(ICONS.info, message, THEME.info));
        }
    }

    /// Display verbose information (only if verbose mode is enabled)
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            eprintln!("{}", self.decorate(ICONS.arrow, message, THEME.muted));
        }
    }

    /// Display a heading
    pub fn heading(&self, text: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("\n{text}\n{}", "=".repeat(text.chars().count()))
            } else {
                format!("\n{}", text.color(THEME.primary).bold())
            };
            println!("{output}");
        }
    }

    /// Display a key-value pair
    pub fn key_value(&self, key: &str, value: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("{key}: {value}")
            } else {
                format!("{}: {}", key.color(THEME.key).bold(), value.color(THEME.value))
            };
            println!("{output}");
        }
    }

    /// Display indented text with a prefix icon
    pub fn indented(&self, icon: &str, text: &str) {
        if self.chatty() {
            let output = if self.options.no_color {
                format!("  {icon} {text}")
            } else {
                format!("  {} {text}", icon.color(THEME.muted))
            };
            println!("{output}");
        }
    }

    /// Create a themed table
    pub fn create_table(&self) -> Table {
        let mut table = Table::new();

        if !self.options.no_color {
            table.load_preset(comfy_table::presets::UTF8_FULL_CONDENSED);
        } else {
            table.load_preset(comfy_table::presets::ASCII_FULL);
        }

        table
    }

    /// Add themed header to table
    pub fn add_table_header(&self, table: &mut Table, headers: &[&str]) {
        let header_cells: Vec<Cell> = headers
            .iter()
            .map(|h| {
                let cell = Cell::new(h).add_attribute(Attribute::Bold);
                if self.options.no_color { cell } else { cell.fg(TableColor::Cyan) }
            })
            .collect();
        table.set_header(header_cells);
    }

    /// Display progress indicator
    pub fn progress(&self, message: &str) {
        if !self.chatty() {
            return;
        }

        let output = if self.options.no_color {
            format!("{} {message}...", ICONS.loading)
        } else {
            format!(
                "{} {}...",
                ICONS.loading.color(THEME.highlight).bold(),
                message.color(THEME.highlight)
            )
        };

        print!("\r{output}");
        std::io::stdout().flush().ok();
    }

    /// Clear the current line (useful after progress indicators)
    pub fn clear_line(&self) {
        if !self.chatty() {
            return;
        }

        print!("\r{}", " ".repeat(80));
        print!("\r");
        std::io::stdout().flush().ok();
    }
}
