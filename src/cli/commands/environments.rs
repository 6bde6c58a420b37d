use colored::Colorize;

use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::Result;

/// Execute the `ecsforge environments` command.
pub fn execute(ctx: &Context) -> Result<()> {
    let table = &ctx.table;

    output::header(&format!("📋 ecsforge environments ({})", table.source));

    let name_width = table.names().iter().map(|n| n.len()).max().unwrap_or(4).max(4);

    for (name, env) in &table.environments {
        let marker = if *name == table.settings.default_environment {
            "*".green().to_string()
        } else {
            " ".to_string()
        };
        let regions: Vec<&str> = env.regions.keys().map(String::as_str).collect();

        println!(
            "  {marker} {:<width$}   capacity {}..{} (desired {})   {} cpu / {} MiB   {} / {}   {}",
            name.bold(),
            env.min_capacity,
            env.max_capacity,
            env.desired_count,
            env.cpu,
            env.memory_mib,
            env.routing.kind(),
            env.deployment.kind(),
            regions.join(", ").dimmed(),
            width = name_width
        );
    }

    println!();
    println!(
        "  {} default environment",
        "*".green()
    );
    Ok(())
}
