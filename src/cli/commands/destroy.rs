use std::io::{self, BufRead, Write};

use crate::cli::commands::deploy::spinner;
use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::{ForgeError, Result};
use crate::core::traits::engine::ProvisioningEngine;

/// Execute the `ecsforge destroy` command.
///
/// Asks for confirmation on stdin unless `--force` or `--dry-run` is given.
pub fn execute(ctx: &Context, force: bool, dry_run: bool) -> Result<()> {
    let units = ctx.assemble()?;
    let engine = ctx.engine(dry_run);

    output::header(&format!(
        "🔥 ecsforge destroy ({}){}",
        ctx.environment,
        output::dry_run_marker(dry_run)
    ));

    for unit in &units {
        output::item(&format!("{} ({})", unit.stack_name, unit.region));
    }
    println!();

    if !force && !dry_run {
        print!("  Delete these {} stack(s)? [y/N]: ", units.len());
        io::stdout().flush()?;

        let mut input = String::new();
        io::stdin().lock().read_line(&mut input)?;
        let answer = input.trim().to_lowercase();

        if answer != "y" && answer != "yes" {
            return Err(ForgeError::Aborted);
        }
    }

    for unit in &units {
        tracing::info!(stack = %unit.stack_name, engine = engine.name(), "destroying");

        if dry_run {
            engine.destroy(unit)?;
            continue;
        }

        let spinner = spinner(&format!("Deleting {}...", unit.stack_name));
        let result = engine.destroy(unit);
        spinner.finish_and_clear();
        result?;

        output::success(&format!("{} deleted", unit.stack_name));
    }

    Ok(())
}
