use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Value domain of a component parameter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ParameterDomain {
    Categorical {
        values: Vec<String>,
    },
    Numeric {
        min: f64,
        max: f64,
        #[serde(default)]
        integer: bool,
    },
}

impl ParameterDomain {
    pub fn categorical<S: Into<String>>(values: impl IntoIterator<Item = S>) -> Self {
        ParameterDomain::Categorical {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn integer(min: i64, max: i64) -> Self {
        ParameterDomain::Numeric {
            min: min as f64,
            max: max as f64,
            integer: true,
        }
    }

    pub fn real(min: f64, max: f64) -> Self {
        ParameterDomain::Numeric {
            min,
            max,
            integer: false,
        }
    }

    pub fn is_categorical(&self) -> bool {
        matches!(self, ParameterDomain::Categorical { .. })
    }

    /// A domain with a single admissible value consumes no gene.
    pub fn is_degenerate(&self) -> bool {
        match self {
            ParameterDomain::Categorical { values } => values.len() <= 1,
            ParameterDomain::Numeric { min, max, .. } => min >= max,
        }
    }

    /// The single admissible value of a degenerate domain.
    pub fn fixed_value(&self) -> Option<String> {
        if !self.is_degenerate() {
            return None;
        }
        match self {
            ParameterDomain::Categorical { values } => values.first().cloned(),
            ParameterDomain::Numeric { min, integer, .. } => Some(format_number(*min, *integer)),
        }
    }
}

/// Render a numeric parameter value the way construction strings expect it.
pub fn format_number(value: f64, integer: bool) -> String {
    if integer {
        format!("{}", value.round() as i64)
    } else {
        format!("{}", value)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub domain: ParameterDomain,
}

impl Parameter {
    pub fn new(name: impl Into<String>, domain: ParameterDomain) -> Self {
        Self {
            name: name.into(),
            domain,
        }
    }
}

/// A capability a component consumes, satisfied by `min <= n < max` child instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequiredInterface {
    pub id: String,
    pub interface: String,
    #[serde(default = "default_min")]
    pub min: usize,
    #[serde(default = "default_max")]
    pub max: usize,
}

fn default_min() -> usize {
    1
}

fn default_max() -> usize {
    2
}

impl RequiredInterface {
    /// Exactly one satisfying child.
    pub fn single(id: impl Into<String>, interface: impl Into<String>) -> Self {
        Self::bounded(id, interface, 1, 2)
    }

    pub fn optional(id: impl Into<String>, interface: impl Into<String>) -> Self {
        Self::bounded(id, interface, 0, 2)
    }

    pub fn bounded(id: impl Into<String>, interface: impl Into<String>, min: usize, max: usize) -> Self {
        Self {
            id: id.into(),
            interface: interface.into(),
            min,
            max,
        }
    }

    pub fn admits(&self, count: usize) -> bool {
        count >= self.min && count < self.max
    }

    /// Whether more than one child may satisfy this interface.
    pub fn is_fan_out(&self) -> bool {
        self.max > 2
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub name: String,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
    #[serde(default)]
    pub required_interfaces: Vec<RequiredInterface>,
    #[serde(default)]
    pub provided_interfaces: BTreeSet<String>,
    /// Import lines the rendered pipeline needs for this component.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl Component {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: Vec::new(),
            required_interfaces: Vec::new(),
            provided_interfaces: BTreeSet::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn provides(mut self, interface: impl Into<String>) -> Self {
        self.provided_interfaces.insert(interface.into());
        self
    }

    pub fn requires(mut self, required: RequiredInterface) -> Self {
        self.required_interfaces.push(required);
        self
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }

    pub fn with_dependency(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    pub fn parameter(&self, name: &str) -> Option<&Parameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn required_interface(&self, id: &str) -> Option<&RequiredInterface> {
        self.required_interfaces.iter().find(|r| r.id == id)
    }

    pub fn provides_interface(&self, interface: &str) -> bool {
        self.provided_interfaces.contains(interface)
    }

    /// Parameter-less, dependency-less leaf.
    pub fn is_bare_leaf(&self) -> bool {
        self.parameters.is_empty() && self.required_interfaces.is_empty()
    }

    /// Class name without its module path
    pub fn short_name(&self) -> &str {
        match self.name.rfind('.') {
            Some(pos) => &self.name[pos + 1..],
            None => &self.name,
        }
    }

    /// Declared dependencies, or a `from module import Class` line derived from a dotted name.
    pub fn import_lines(&self) -> Vec<String> {
        if !self.dependencies.is_empty() {
            return self.dependencies.clone();
        }
        match self.name.rfind('.') {
            Some(pos) => vec![format!("from {} import {}", &self.name[..pos], &self.name[pos + 1..])],
            None => Vec::new(),
        }
    }
}
