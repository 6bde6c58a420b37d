use std::collections::BTreeMap;
use std::path::Path;

use crate::core::errors::Result;

/// Port for reading extra container variables from a file.
///
/// Only `DotenvParser` ships today; the trait keeps the config loader
/// independent of the file format.
pub trait VariableParser: Send + Sync {
    /// Parse raw file content into name → value pairs.
    ///
    /// `origin` is only used in error messages.
    fn parse(&self, content: &str, origin: &Path) -> Result<BTreeMap<String, String>>;
}
