use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Table};
use serde::Serialize;

use metagen::config::MetagenConfig;
use metagen::driver::generate_source;
use metagen::render::method_name;
use metagen::{MethodSpec, Synthesis, SynthesisKind};

use crate::examples::ExampleGroup;
use crate::output::{OutputManager, TableDisplay};
use crate::theme::ICONS;

pub const EXAMPLES: &[ExampleGroup] = &[ExampleGroup {
    title: "Inspect",
    commands: &[
        "metagen inspect src/models/person.rs             # List the methods a file's tags produce",
        "metagen inspect src/models/person.rs --render    # Print the generated source",
        "metagen --output json inspect src/models/person.rs",
    ],
}];

#[derive(Args)]
pub struct InspectArgs {
    /// Rust source file to inspect
    pub file: PathBuf,

    /// Print the generated source instead of the method table
    #[arg(long)]
    pub render: bool,
}

#[derive(Serialize)]
struct InspectReport {
    file: PathBuf,
    #[serde(flatten)]
    synthesis: Synthesis,
}

pub fn handle_inspect(args: InspectArgs, output: &OutputManager) -> Result<()> {
    let content =
        std::fs::read_to_string(&args.file).with_context(|| format!("Failed to read {}", args.file.display()))?;
    let root = args.file.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let config = MetagenConfig::load(root)?;

    let generated = generate_source(&content, &args.file.display().to_string(), &config.generate)?;

    for warning in &generated.synthesis.warnings {
        output.warning(&warning.to_string());
    }

    if args.render {
        match &generated.code {
            Some(code) => print!("{code}"),
            None => output.info("No methods generated"),
        }
        return Ok(());
    }

    output.heading(&format!("{} {}", ICONS.file, args.file.display()));
    let imports: Vec<&str> = generated.synthesis.registry.imports().collect();
    if !imports.is_empty() {
        output.key_value("imports", &imports.join(", "));
    }

    output.display(&InspectReport {
        file: args.file,
        synthesis: generated.synthesis,
    })
}

fn signature(spec: &MethodSpec) -> String {
    match &spec.kind {
        SynthesisKind::Stringer(parts) => format!("\"{}\"", parts.format_string()),
        SynthesisKind::Constructor(parts) => format!("({})", parts.parameter_list()),
        SynthesisKind::Equal(parts) => parts
            .comparisons
            .iter()
            .map(|c| if c.deep { format!("{} (deep)", c.field) } else { c.field.clone() })
            .collect::<Vec<_>>()
            .join(", "),
        _ if spec.arg_type.is_empty() => String::new(),
        _ => format!("{}: {}", spec.arg_name, spec.arg_type),
    }
}

impl TableDisplay for InspectReport {
    fn to_table(&self, output: &OutputManager) -> Table {
        let mut table = output.create_table();
        output.add_table_header(&mut table, &["Type", "Method", "Kind", "Receiver", "Field", "Arguments", "Returns"]);

        for spec in self.synthesis.registry.methods() {
            table.add_row(vec![
                Cell::new(&spec.type_name),
                Cell::new(method_name(spec)),
                Cell::new(spec.kind.tag()),
                Cell::new(&spec.receiver_type),
                Cell::new(&spec.field_name),
                Cell::new(signature(spec)),
                Cell::new(&spec.return_type),
            ]);
        }

        table
    }

    fn to_compact(&self) -> String {
        let methods: Vec<String> = self
            .synthesis
            .registry
            .methods()
            .iter()
            .map(|spec| format!("{}::{}", spec.type_name, method_name(spec)))
            .collect();
        format!(
            "{}: {} warnings={}",
            self.file.display(),
            methods.join(" "),
            self.synthesis.warnings.len()
        )
    }
}
