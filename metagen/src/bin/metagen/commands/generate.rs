use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};

use metagen::config::MetagenConfig;
use metagen::driver::{Driver, Outcome, RunSummary};

use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[
    ExampleGroup {
        title: "Generate",
        commands: &[
            "metagen generate                     # Generate *_meta.rs files under the current directory",
            "metagen generate --path src          # Only scan src/",
            "metagen generate --suffix _gen       # Write foo_gen.rs instead of foo_meta.rs",
        ],
    },
    ExampleGroup {
        title: "Verify",
        commands: &[
            "metagen generate --check             # Fail if any generated file is out of date",
            "metagen generate --dry-run           # Show what would change without writing",
            "metagen --output json generate       # Machine-readable report",
        ],
    },
];

#[derive(Args)]
pub struct GenerateArgs {
    /// Directory to scan; metagen.toml is read from here
    #[arg(long, default_value = ".")]
    pub path: PathBuf,

    /// Fail if any generated file is out of date, without writing
    #[arg(long)]
    pub check: bool,

    /// Report what would be written without touching any file
    #[arg(long, conflicts_with = "check")]
    pub dry_run: bool,

    /// Output file suffix (overrides metagen.toml)
    #[arg(long)]
    pub suffix: Option<String>,
}

pub fn handle_generate(args: GenerateArgs, output: &OutputManager) -> Result<()> {
    let config = MetagenConfig::load(&args.path)?;
    let mut settings = config.generate;
    if let Some(suffix) = args.suffix {
        settings.suffix = suffix;
    }
    output.verbose(&format!(
        "Scanning {} (suffix {}, excluding {})",
        args.path.display(),
        settings.suffix,
        settings.exclude.join(", ")
    ));

    output.progress("Scanning for #[meta] tags");
    let summary = Driver::new(&args.path, settings)
        .write(!(args.check || args.dry_run))
        .run()
        .with_context(|| format!("Failed to generate under {}", args.path.display()))?;
    output.clear_line();

    if summary.files.is_empty() {
        output.info("No #[meta] tags found");
        return Ok(());
    }

    output.display(&summary)?;

    for (source, warning) in summary.warnings() {
        output.warning(&format!("{}: {warning}", source.display()));
    }

    for file in &summary.files {
        if let Outcome::Failed { error } = &file.outcome {
            output.error(&format!("{}: {error}", file.source.display()));
        }
    }

    let failed = summary.count(|o| matches!(o, Outcome::Failed { .. }));
    if failed > 0 {
        anyhow::bail!("{failed} file(s) failed");
    }

    let stale = summary.count(|o| matches!(o, Outcome::Stale));
    if args.check && stale > 0 {
        output.info("Run 'metagen generate' to update them.");
        anyhow::bail!("{stale} generated file(s) are out of date");
    }

    if args.dry_run {
        for file in summary.files.iter().filter(|f| f.outcome == Outcome::Stale) {
            output.indented(ICONS.changed, &format!("would update {}", file.output.display()));
        }
    } else if !args.check {
        let written = summary.count(|o| matches!(o, Outcome::Written));
        output.success(&format!("Generated {written} file(s)"));
        let removed = summary.count(|o| matches!(o, Outcome::Removed));
        if removed > 0 {
            output.info(&format!("Removed {removed} orphaned file(s)"));
        }
    } else {
        output.success("All generated files are up to date");
    }

    Ok(())
}

fn outcome_label(outcome: &Outcome) -> &'static str {
    match outcome {
        Outcome::Written => "written",
        Outcome::Removed => "removed",
        Outcome::Stale => "stale",
        Outcome::Unchanged => "unchanged",
        Outcome::Empty => "empty",
        Outcome::Failed { .. } => "failed",
    }
}

impl TableDisplay for RunSummary {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Source", "Output", "Methods", "Warnings", "Status"]);

        for file in &self.files {
            table.add_row(vec![
                Cell::new(format!("{} {}", ICONS.file, file.source.display())),
                Cell::new(file.output.display()),
                Cell::new(file.methods),
                Cell::new(file.warnings.len()),
                Cell::new(outcome_label(&file.outcome)),
            ]);
        }

        table
    }

    fn to_compact(&self) -> String {
        let count = |label: &str| self.files.iter().filter(|f| outcome_label(&f.outcome) == label).count();
        format!(
            "files={} written={} removed={} stale={} unchanged={} empty={} failed={}",
            self.files.len(),
            count("written"),
            count("removed"),
            count("stale"),
            count("unchanged"),
            count("empty"),
            count("failed")
        )
    }
}
