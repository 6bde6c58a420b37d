use std::collections::{BTreeMap, BTreeSet};

use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::{Value, json};

use crate::core::errors::{ForgeError, Result};

/// Version string every CloudFormation template carries.
pub const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// A single declared resource.
#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub logical_id: String,
    pub resource_type: String,
    pub properties: Value,
    /// Explicit ordering edges; written out as `DependsOn`.
    pub depends_on: BTreeSet<String>,
}

impl Resource {
    pub fn new(logical_id: impl Into<String>, resource_type: &str, properties: Value) -> Self {
        Self {
            logical_id: logical_id.into(),
            resource_type: resource_type.to_string(),
            properties,
            depends_on: BTreeSet::new(),
        }
    }

    /// Add an explicit ordering edge on another resource.
    pub fn depends_on(mut self, other: &ResourceRef) -> Self {
        self.depends_on.insert(other.id().to_string());
        self
    }

    /// Logical ids referenced through `Ref` or `Fn::GetAtt` anywhere in
    /// the properties. Pseudo parameters (`AWS::Region`, ...) are skipped.
    pub fn references(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        collect_references(&self.properties, &mut out);
        out
    }
}

/// Walk a JSON value and collect intrinsic reference targets.
pub fn collect_references(value: &Value, out: &mut BTreeSet<String>) {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(target)) = map.get("Ref") {
                if !target.starts_with("AWS::") {
                    out.insert(target.clone());
                }
            }
            match map.get("Fn::GetAtt") {
                Some(Value::Array(parts)) => {
                    if let Some(Value::String(target)) = parts.first() {
                        out.insert(target.clone());
                    }
                }
                Some(Value::String(dotted)) => {
                    if let Some((target, _)) = dotted.split_once('.') {
                        out.insert(target.to_string());
                    }
                }
                _ => {}
            }
            for nested in map.values() {
                collect_references(nested, out);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_references(item, out);
            }
        }
        _ => {}
    }
}

/// Handle to a resource already added to a graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceRef {
    logical_id: String,
}

impl ResourceRef {
    pub(crate) fn new(logical_id: &str) -> Self {
        Self {
            logical_id: logical_id.to_string(),
        }
    }

    pub fn id(&self) -> &str {
        &self.logical_id
    }

    /// `{"Ref": "<id>"}`
    pub fn reference(&self) -> Value {
        json!({ "Ref": self.logical_id })
    }

    /// `{"Fn::GetAtt": ["<id>", "<attribute>"]}`
    pub fn attr(&self, attribute: &str) -> Value {
        json!({ "Fn::GetAtt": [self.logical_id, attribute] })
    }
}

/// A named stack output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Output {
    pub description: String,
    pub value: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<ExportName>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportName {
    pub name: String,
}

impl Output {
    pub fn new(description: &str, value: Value) -> Self {
        Self {
            description: description.to_string(),
            value,
            export: None,
        }
    }

    pub fn exported_as(mut self, name: String) -> Self {
        self.export = Some(ExportName { name });
        self
    }
}

/// A synthesized CloudFormation template.
///
/// `resources` are kept in creation order (dependencies first); the JSON
/// form preserves that order.
#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    pub description: String,
    pub resources: Vec<Resource>,
    pub outputs: BTreeMap<String, Output>,
}

impl Template {
    #[cfg(test)]
    pub fn resource(&self, logical_id: &str) -> Option<&Resource> {
        self.resources.iter().find(|r| r.logical_id == logical_id)
    }

    /// Resources of the given CloudFormation type, in creation order.
    #[cfg(test)]
    pub fn resources_of_type<'a>(
        &'a self,
        resource_type: &'a str,
    ) -> impl Iterator<Item = &'a Resource> + 'a {
        self.resources
            .iter()
            .filter(move |r| r.resource_type == resource_type)
    }

    pub fn creation_order(&self) -> Vec<&str> {
        self.resources.iter().map(|r| r.logical_id.as_str()).collect()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| ForgeError::Template {
            detail: format!("Failed to serialize template: {e}"),
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ForgeError::Template {
            detail: format!("Failed to serialize template: {e}"),
        })
    }
}

struct ResourceBody<'a>(&'a Resource);

impl Serialize for ResourceBody<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let resource = self.0;
        let len = if resource.depends_on.is_empty() { 2 } else { 3 };
        let mut map = serializer.serialize_map(Some(len))?;
        map.serialize_entry("Type", &resource.resource_type)?;
        if !resource.depends_on.is_empty() {
            map.serialize_entry("DependsOn", &resource.depends_on)?;
        }
        map.serialize_entry("Properties", &resource.properties)?;
        map.end()
    }
}

struct OrderedResources<'a>(&'a [Resource]);

impl Serialize for OrderedResources<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for resource in self.0 {
            map.serialize_entry(&resource.logical_id, &ResourceBody(resource))?;
        }
        map.end()
    }
}

impl Serialize for Template {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("AWSTemplateFormatVersion", TEMPLATE_FORMAT_VERSION)?;
        map.serialize_entry("Description", &self.description)?;
        map.serialize_entry("Resources", &OrderedResources(&self.resources))?;
        map.serialize_entry("Outputs", &self.outputs)?;
        map.end()
    }
}
