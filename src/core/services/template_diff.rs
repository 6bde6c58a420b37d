use std::collections::BTreeSet;

use serde_json::{Map, Value};

use crate::core::errors::{ForgeError, Result};
use crate::core::models::diff_result::{DiffEntry, DiffKind, DiffResult};

/// Resource type recorded for output entries.
pub const OUTPUT_TYPE: &str = "Output";

/// Compares a previously synthesized template with a new one.
pub struct TemplateDiff;

impl TemplateDiff {
    /// Compare two templates in their JSON form.
    ///
    /// - Logical ids only in `previous` are `Removed`
    /// - Logical ids only in `current` are `Added`
    /// - Logical ids in both whose type, properties or `DependsOn` differ
    ///   are `Modified`
    ///
    /// A missing `previous` reports every resource and output as added.
    /// Entries are sorted by logical id.
    pub fn diff(
        &self,
        stack_name: &str,
        previous: Option<&Value>,
        current: &Value,
    ) -> Result<DiffResult> {
        let empty = Map::new();
        let section = |template: Option<&Value>, name: &str| -> Result<Map<String, Value>> {
            match template.and_then(|t| t.get(name)) {
                None => Ok(empty.clone()),
                Some(Value::Object(map)) => Ok(map.clone()),
                Some(_) => Err(ForgeError::Template {
                    detail: format!("'{name}' in template for {stack_name} is not an object"),
                }),
            }
        };

        let resources = diff_section(
            &section(previous, "Resources")?,
            &section(Some(current), "Resources")?,
            compare_resource,
            |body| {
                body.get("Type")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown")
                    .to_string()
            },
        );
        let outputs = diff_section(
            &section(previous, "Outputs")?,
            &section(Some(current), "Outputs")?,
            compare_output,
            |_| OUTPUT_TYPE.to_string(),
        );

        tracing::debug!(
            stack = stack_name,
            resources = resources.len(),
            outputs = outputs.len(),
            "compared templates"
        );

        Ok(DiffResult {
            stack_name: stack_name.to_string(),
            had_previous: previous.is_some(),
            resources,
            outputs,
        })
    }
}

fn diff_section(
    old: &Map<String, Value>,
    new: &Map<String, Value>,
    compare: impl Fn(&Value, &Value) -> Option<DiffKind>,
    type_of: impl Fn(&Value) -> String,
) -> Vec<DiffEntry> {
    let ids: BTreeSet<&String> = old.keys().chain(new.keys()).collect();
    let mut entries = Vec::new();

    for id in ids {
        let entry = match (old.get(id), new.get(id)) {
            (Some(before), None) => Some((type_of(before), DiffKind::Removed)),
            (None, Some(after)) => Some((type_of(after), DiffKind::Added)),
            (Some(before), Some(after)) => compare(before, after).map(|k| (type_of(after), k)),
            (None, None) => None,
        };
        if let Some((resource_type, kind)) = entry {
            entries.push(DiffEntry {
                logical_id: id.clone(),
                resource_type,
                kind,
            });
        }
    }

    entries
}

fn compare_resource(before: &Value, after: &Value) -> Option<DiffKind> {
    if before == after {
        return None;
    }

    let type_of = |v: &Value| v.get("Type").and_then(Value::as_str).unwrap_or("").to_string();
    let (old_type, new_type) = (type_of(before), type_of(after));
    let type_change = (old_type != new_type).then_some((old_type, new_type));

    let mut changed = changed_keys(before.get("Properties"), after.get("Properties"));
    if before.get("DependsOn") != after.get("DependsOn") {
        changed.insert("DependsOn".to_string());
    }

    Some(DiffKind::Modified {
        type_change,
        changed_properties: changed.into_iter().collect(),
    })
}

fn compare_output(before: &Value, after: &Value) -> Option<DiffKind> {
    (before != after).then(|| DiffKind::Modified {
        type_change: None,
        changed_properties: changed_keys(Some(before), Some(after)).into_iter().collect(),
    })
}

/// Top-level keys whose values differ between two JSON objects.
fn changed_keys(before: Option<&Value>, after: Option<&Value>) -> BTreeSet<String> {
    let empty = Map::new();
    let old = before.and_then(Value::as_object).unwrap_or(&empty);
    let new = after.and_then(Value::as_object).unwrap_or(&empty);

    old.keys()
        .chain(new.keys())
        .filter(|k| old.get(*k) != new.get(*k))
        .cloned()
        .collect()
}
