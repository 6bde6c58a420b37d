use std::collections::BTreeMap;
use std::path::Path;

use crate::core::errors::{ForgeError, Result};
use crate::core::traits::parser::VariableParser;

/// Parses `.env` files into container environment variables.
///
/// Supports:
/// - `KEY=value` entries, optionally prefixed with `export `
/// - Quoted values (`KEY="value"` and `KEY='value'`)
/// - Comment lines (`# ...`) and blank lines
///
/// A key repeated later in the file overrides the earlier value.
pub struct DotenvParser;

impl DotenvParser {
    /// Parse a single line. `Ok(None)` for comments and blanks.
    fn parse_line(raw: &str, line_number: usize, origin: &Path) -> Result<Option<(String, String)>> {
        let trimmed = raw.trim();

        if trimmed.is_empty() || trimmed.starts_with('#') {
            return Ok(None);
        }

        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);

        let Some(eq_pos) = trimmed.find('=') else {
            return Err(ForgeError::ParseError {
                file: origin.to_path_buf(),
                detail: format!("line {line_number}: expected KEY=value, got: {trimmed}"),
            });
        };

        let key = trimmed[..eq_pos].trim().to_string();
        if key.is_empty() {
            return Err(ForgeError::ParseError {
                file: origin.to_path_buf(),
                detail: format!("line {line_number}: empty key"),
            });
        }

        let value = strip_quotes(trimmed[eq_pos + 1..].trim());
        Ok(Some((key, value)))
    }
}

/// Remove matching surrounding quotes (single or double) from a value.
fn strip_quotes(s: &str) -> String {
    let bytes = s.as_bytes();
    if bytes.len() >= 2 {
        let first = bytes[0];
        let last = bytes[bytes.len() - 1];
        if (first == b'"' && last == b'"') || (first == b'\'' && last == b'\'') {
            return s[1..s.len() - 1].to_string();
        }
    }
    s.to_string()
}

impl VariableParser for DotenvParser {
    fn parse(&self, content: &str, origin: &Path) -> Result<BTreeMap<String, String>> {
        let mut vars = BTreeMap::new();

        for (idx, raw) in content.lines().enumerate() {
            if let Some((key, value)) = Self::parse_line(raw, idx + 1, origin)? {
                vars.insert(key, value);
            }
        }

        Ok(vars)
    }
}
