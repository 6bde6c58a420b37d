use colored::Colorize;

/// Print a success message.
pub fn success(msg: &str) {
    println!("  {} {}", "✓".green(), msg);
}

/// Print a warning message.
pub fn warning(msg: &str) {
    println!("  {} {}", "⚠".yellow(), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("  {} {}", "✗".red(), msg);
}

/// Print a header line.
pub fn header(msg: &str) {
    println!("\n{}", msg.bold());
}

/// Print an indented bullet under a warning or header.
pub fn item(msg: &str) {
    println!("    • {msg}");
}

/// Suffix for headers of commands that only print what they would do.
pub fn dry_run_marker(dry_run: bool) -> String {
    if dry_run {
        format!(" {}", "[dry run]".cyan())
    } else {
        String::new()
    }
}
