/// Classification of a single resource or output difference.
#[derive(Debug, Clone, PartialEq)]
pub enum DiffKind {
    Added,
    Removed,
    Modified {
        /// Set when the resource type itself changed (forces replacement).
        type_change: Option<(String, String)>,
        /// Top-level property names whose values differ, sorted.
        changed_properties: Vec<String>,
    },
}

/// One entry in a template comparison.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffEntry {
    pub logical_id: String,
    /// Resource type, or `Output` for stack outputs.
    pub resource_type: String,
    pub kind: DiffKind,
}

/// Result of comparing the previous and the new template of one stack.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffResult {
    pub stack_name: String,
    /// False when there was no previous synthesis to compare against.
    pub had_previous: bool,
    pub resources: Vec<DiffEntry>,
    pub outputs: Vec<DiffEntry>,
}

impl DiffResult {
    /// Returns true if there are no differences.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty() && self.outputs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.resources.len() + self.outputs.len()
    }
}
