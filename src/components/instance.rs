use super::component::Component;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// A decoded phenotype node: a component with concrete parameter values and
/// the child instances satisfying each of its required interfaces.
#[derive(Debug, Clone, PartialEq)]
pub struct ComponentInstance {
    pub component: Arc<Component>,
    pub parameters: BTreeMap<String, String>,
    pub satisfaction: BTreeMap<String, Vec<ComponentInstance>>,
}

impl ComponentInstance {
    pub fn new(component: Arc<Component>) -> Self {
        Self {
            component,
            parameters: BTreeMap::new(),
            satisfaction: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.component.name
    }

    pub fn parameter_value(&self, name: &str) -> Option<&str> {
        self.parameters.get(name).map(String::as_str)
    }

    pub fn children(&self, interface_id: &str) -> &[ComponentInstance] {
        self.satisfaction
            .get(interface_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every parameter carries a value and every required interface is
    /// satisfied by a child count inside its `[min, max)` bound.
    pub fn is_completely_defined(&self) -> bool {
        let parameters_set = self
            .component
            .parameters
            .iter()
            .all(|p| self.parameters.contains_key(&p.name));
        if !parameters_set {
            return false;
        }
        self.component
            .required_interfaces
            .iter()
            .all(|required| required.admits(self.children(&required.id).len()))
    }

    /// Component names of the whole tree in pre-order.
    pub fn component_names(&self) -> Vec<String> {
        let mut names = vec![self.component.name.clone()];
        for children in self.satisfaction.values() {
            for child in children {
                names.extend(child.component_names());
            }
        }
        names
    }

    /// First instance in the tree (pre-order) that provides `interface`.
    pub fn find_provider(&self, interface: &str) -> Option<&ComponentInstance> {
        if self.component.provides_interface(interface) {
            return Some(self);
        }
        self.satisfaction
            .values()
            .flatten()
            .find_map(|child| child.find_provider(interface))
    }
}

impl fmt::Display for ComponentInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.component.name)?;
        if !self.parameters.is_empty() {
            let params: Vec<String> = self
                .parameters
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            write!(f, "{{{}}}", params.join(", "))?;
        }
        for (id, children) in &self.satisfaction {
            let rendered: Vec<String> = children.iter().map(|c| c.to_string()).collect();
            write!(f, "[{}: {}]", id, rendered.join(", "))?;
        }
        Ok(())
    }
}
