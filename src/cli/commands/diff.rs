use colored::Colorize;

use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::{ForgeError, Result};
use crate::core::models::diff_result::{DiffEntry, DiffKind, DiffResult};
use crate::core::services::template_diff::TemplateDiff;

/// Execute the `ecsforge diff` command.
///
/// Assembles the environment in memory and compares each unit with the
/// template last written by `synth`. Nothing is written to disk.
pub fn execute(ctx: &Context, fail: bool) -> Result<()> {
    let units = ctx.assemble()?;
    let writer = ctx.writer();

    output::header(&format!(
        "🔍 ecsforge diff ({}, {})",
        ctx.environment, ctx.stack_type
    ));
    if let Some(manifest) = writer.read_manifest()? {
        println!(
            "  Comparing against synthesis from {}",
            manifest.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }

    let mut total = 0;
    for unit in &units {
        let previous = writer.read_previous(unit)?;
        let current = unit.template.to_value()?;
        let result = TemplateDiff.diff(&unit.stack_name, previous.as_ref(), &current)?;

        print_stack_diff(&result);
        total += result.len();
    }

    println!();
    if total == 0 {
        output::success("No differences found");
        return Ok(());
    }

    output::warning(&format!(
        "{total} difference(s) across {} stack(s)",
        units.len()
    ));

    if fail {
        return Err(ForgeError::DifferencesFound { count: total });
    }
    Ok(())
}

fn print_stack_diff(result: &DiffResult) {
    println!("\n  {}", result.stack_name.bold());

    if !result.had_previous {
        println!("    {}", "(no previous synthesis)".dimmed());
    }
    if result.is_empty() {
        println!("    {}", "unchanged".dimmed());
        return;
    }

    let id_width = result
        .resources
        .iter()
        .chain(&result.outputs)
        .map(|e| e.logical_id.len())
        .max()
        .unwrap_or(8)
        .max(8);

    for entry in &result.resources {
        print_entry(entry, id_width);
    }
    for entry in &result.outputs {
        print_entry(entry, id_width);
    }
}

fn print_entry(entry: &DiffEntry, width: usize) {
    match &entry.kind {
        DiffKind::Added => println!(
            "    {} {:<width$}   {}",
            "+".green(),
            entry.logical_id.green(),
            entry.resource_type.dimmed()
        ),
        DiffKind::Removed => println!(
            "    {} {:<width$}   {}",
            "-".red(),
            entry.logical_id.red(),
            entry.resource_type.dimmed()
        ),
        DiffKind::Modified {
            type_change,
            changed_properties,
        } => {
            let detail = match type_change {
                Some((old, new)) => format!("type {old} → {new} (replacement)"),
                None => changed_properties.join(", "),
            };
            println!(
                "    {} {:<width$}   {}",
                "~".yellow(),
                entry.logical_id.yellow(),
                detail
            );
        }
    }
}
