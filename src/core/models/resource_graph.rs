use std::collections::{BTreeMap, BTreeSet};

use crate::core::errors::{ForgeError, Result};
use crate::core::models::template::{Output, Resource, ResourceRef, Template, collect_references};

/// Explicit directed acyclic graph of the resources in one stack.
///
/// Edges come from two places: explicit `depends_on` entries and every
/// `Ref` / `Fn::GetAtt` found in a resource's properties. The graph is
/// turned into a [`Template`] by emitting resources in topological order.
#[derive(Debug, Clone, Default)]
pub struct ResourceGraph {
    stack: String,
    resources: BTreeMap<String, Resource>,
}

impl ResourceGraph {
    pub fn new(stack: &str) -> Self {
        Self {
            stack: stack.to_string(),
            resources: BTreeMap::new(),
        }
    }

    /// Add a resource and return a handle for wiring it into others.
    ///
    /// # Errors
    ///
    /// `DuplicateResource` if the logical id is already taken.
    pub fn add(&mut self, resource: Resource) -> Result<ResourceRef> {
        if self.resources.contains_key(&resource.logical_id) {
            return Err(ForgeError::DuplicateResource {
                stack: self.stack.clone(),
                logical_id: resource.logical_id,
            });
        }
        let handle = ResourceRef::new(&resource.logical_id);
        self.resources.insert(resource.logical_id.clone(), resource);
        Ok(handle)
    }

    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Every resource the given one must be created after.
    pub fn dependencies(&self, logical_id: &str) -> BTreeSet<String> {
        self.resources
            .get(logical_id)
            .map(|r| {
                let mut deps = r.references();
                deps.extend(r.depends_on.iter().cloned());
                deps
            })
            .unwrap_or_default()
    }

    /// Order resources so each one follows all of its dependencies.
    ///
    /// Kahn's algorithm; among resources that are ready at the same time
    /// the smallest logical id goes first, so output is deterministic.
    ///
    /// # Errors
    ///
    /// - `UnknownReference` if a dependency is not declared.
    /// - `DependencyCycle` if the graph is not acyclic.
    pub fn topological_order(&self) -> Result<Vec<&Resource>> {
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<String, Vec<&str>> = BTreeMap::new();

        for id in self.resources.keys() {
            let deps = self.dependencies(id);
            for dep in &deps {
                if !self.resources.contains_key(dep) {
                    return Err(ForgeError::UnknownReference {
                        from: id.clone(),
                        target: dep.clone(),
                    });
                }
                dependents.entry(dep.clone()).or_default().push(id.as_str());
            }
            in_degree.insert(id.as_str(), deps.len());
        }

        let mut ready: BTreeSet<&str> = in_degree
            .iter()
            .filter(|(_, degree)| **degree == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut order = Vec::with_capacity(self.resources.len());
        while let Some(id) = ready.pop_first() {
            if let Some(resource) = self.resources.get(id) {
                order.push(resource);
            }
            if let Some(children) = dependents.get(id) {
                for child in children {
                    if let Some(degree) = in_degree.get_mut(child) {
                        *degree -= 1;
                        if *degree == 0 {
                            ready.insert(*child);
                        }
                    }
                }
            }
        }

        if order.len() < self.resources.len() {
            let members: Vec<&str> = in_degree
                .iter()
                .filter(|(_, degree)| **degree > 0)
                .map(|(id, _)| *id)
                .collect();
            return Err(ForgeError::DependencyCycle {
                members: members.join(", "),
            });
        }

        Ok(order)
    }

    /// Emit the graph as a template.
    ///
    /// Outputs may only reference declared resources.
    pub fn into_template(
        self,
        description: &str,
        outputs: BTreeMap<String, Output>,
    ) -> Result<Template> {
        for (name, output) in &outputs {
            let mut refs = BTreeSet::new();
            collect_references(&output.value, &mut refs);
            if let Some(missing) = refs.iter().find(|r| !self.resources.contains_key(*r)) {
                return Err(ForgeError::UnknownReference {
                    from: format!("Outputs.{name}"),
                    target: missing.clone(),
                });
            }
        }

        let resources = self
            .topological_order()?
            .into_iter()
            .cloned()
            .collect();

        Ok(Template {
            description: description.to_string(),
            resources,
            outputs,
        })
    }
}
