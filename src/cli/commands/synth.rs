use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `ecsforge synth` command.
///
/// Writes one template per region plus `manifest.json` into `--out`.
pub fn execute(ctx: &Context) -> Result<()> {
    let units = ctx.assemble()?;
    let writer = ctx.writer();
    let manifest = writer.write(&units, ctx.account.as_deref())?;

    output::header(&format!(
        "🧱 ecsforge synth ({}, {})",
        ctx.environment, ctx.stack_type
    ));

    for entry in &manifest.units {
        output::success(&format!(
            "{} → {} ({} resources)",
            entry.stack_name,
            writer.out_dir().join(&entry.template_file).display(),
            entry.resource_count
        ));
    }

    if manifest.account.is_none() {
        output::warning("CDK_DEFAULT_ACCOUNT not set; manifest has no account");
    }

    println!();
    output::success(&format!(
        "{} stack(s) synthesized into {}",
        manifest.units.len(),
        writer.out_dir().display()
    ));
    Ok(())
}
