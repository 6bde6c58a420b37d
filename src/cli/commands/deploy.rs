use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::Result;
use crate::core::traits::engine::ProvisioningEngine;

/// Execute the `ecsforge deploy` command.
///
/// Synthesizes first, then hands each unit to the engine in region order.
/// The first failure stops the run; units already deployed stay deployed.
pub fn execute(ctx: &Context, dry_run: bool) -> Result<()> {
    let units = ctx.assemble()?;
    let writer = ctx.writer();
    writer.write(&units, ctx.account.as_deref())?;

    let engine = ctx.engine(dry_run);

    output::header(&format!(
        "🚀 ecsforge deploy ({}, {}){}",
        ctx.environment,
        ctx.stack_type,
        output::dry_run_marker(dry_run)
    ));

    for unit in &units {
        let template_path = writer.template_path(unit);
        tracing::info!(stack = %unit.stack_name, engine = engine.name(), "deploying");

        if dry_run {
            engine.deploy(unit, &template_path)?;
            continue;
        }

        let spinner = spinner(&format!("Deploying {}...", unit.stack_name));
        let result = engine.deploy(unit, &template_path);
        spinner.finish_and_clear();
        result?;

        output::success(&format!("{} deployed to {}", unit.stack_name, unit.region));
    }

    if !dry_run {
        println!();
        output::success(&format!("{} stack(s) deployed", units.len()));
    }
    Ok(())
}

pub(crate) fn spinner(message: &str) -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::default_spinner());
    spinner.set_message(message.to_string());
    spinner.enable_steady_tick(Duration::from_millis(120));
    spinner
}
