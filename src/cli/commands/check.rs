use crate::cli::context::Context;
use crate::cli::output;
use crate::core::errors::{ForgeError, Result};
use crate::core::services::config_check::ConfigCheck;

/// Execute the `ecsforge check` command.
///
/// Validates every environment in the table, not only the selected one,
/// and lists each violation.
pub fn execute(ctx: &Context) -> Result<()> {
    let result = ConfigCheck.check_table(&ctx.table);

    output::header(&format!("🔍 ecsforge check ({})", ctx.table.source));

    if result.is_ok() {
        output::success(&format!(
            "{} environment(s) checked, all good",
            result.environments_checked
        ));
        return Ok(());
    }

    output::warning(&format!("Problems found ({}):", result.issue_count()));
    for issue in &result.issues {
        output::item(&issue.to_string());
    }
    println!();

    Err(ForgeError::InvalidConfig {
        detail: format!(
            "{} problem(s) in {} environment(s)",
            result.issue_count(),
            result.environments_checked
        ),
    })
}
