use super::component::{Component, ParameterDomain};
use crate::error::{CoevoError, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct SearchSpaceDescriptor {
    #[serde(default)]
    repository: Option<String>,
    components: Vec<Component>,
}

/// Name-unique component catalog, ordered by component name.
#[derive(Debug, Clone, Default)]
pub struct ComponentRepository {
    name: Option<String>,
    components: Vec<Arc<Component>>,
    index: HashMap<String, usize>,
}

impl ComponentRepository {
    pub fn new(components: Vec<Component>) -> Result<Self> {
        let mut components: Vec<Arc<Component>> = components.into_iter().map(Arc::new).collect();
        components.sort_by(|a, b| a.name.cmp(&b.name));

        let mut index = HashMap::with_capacity(components.len());
        for (i, component) in components.iter().enumerate() {
            for parameter in &component.parameters {
                if let ParameterDomain::Categorical { values } = &parameter.domain {
                    if values.is_empty() {
                        return Err(CoevoError::Configuration(format!(
                            "Parameter '{}' of '{}' has no categorical values",
                            parameter.name, component.name
                        )));
                    }
                }
            }
            if index.insert(component.name.clone(), i).is_some() {
                return Err(CoevoError::Configuration(format!(
                    "Duplicate component name '{}' in repository",
                    component.name
                )));
            }
        }

        Ok(Self {
            name: None,
            components,
            index,
        })
    }

    /// Parse a JSON search space descriptor after substituting `{{variable}}` templates.
    pub fn from_json_str(descriptor: &str, template_variables: &HashMap<String, String>) -> Result<Self> {
        let mut resolved = descriptor.to_string();
        for (key, value) in template_variables {
            resolved = resolved.replace(&format!("{{{{{}}}}}", key), value);
        }

        let parsed: SearchSpaceDescriptor = serde_json::from_str(&resolved)?;
        let mut repository = Self::new(parsed.components)?;
        repository.name = parsed.repository;
        log::debug!(
            "Loaded component repository {:?} with {} components",
            repository.name,
            repository.len()
        );
        Ok(repository)
    }

    pub fn load<P: AsRef<Path>>(path: P, template_variables: &HashMap<String, String>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&contents, template_variables)
    }

    /// Returns a new repository with `component` added.
    pub fn with_component(&self, component: Component) -> Result<Self> {
        let mut components: Vec<Component> = self.components.iter().map(|c| (**c).clone()).collect();
        components.push(component);
        let mut repository = Self::new(components)?;
        repository.name = self.name.clone();
        Ok(repository)
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn get(&self, name: &str) -> Option<&Arc<Component>> {
        self.index.get(name).map(|&i| &self.components[i])
    }

    pub fn component(&self, name: &str) -> Result<&Arc<Component>> {
        self.get(name).ok_or_else(|| {
            CoevoError::RepositoryLookup(format!("Component '{}' is not in the repository", name))
        })
    }

    /// Components providing `interface`, sorted by name.
    pub fn providers_of(&self, interface: &str) -> Vec<&Arc<Component>> {
        self.components
            .iter()
            .filter(|c| c.provides_interface(interface))
            .collect()
    }

    pub fn components(&self) -> &[Arc<Component>] {
        &self.components
    }

    pub fn len(&self) -> usize {
        self.components.len()
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}
