use super::gene_consumer::GeneConsumer;
use crate::components::component::format_number;
use crate::components::{Component, ComponentInstance, ComponentRepository, ParameterDomain};
use crate::error::{CoevoError, Result};
use std::sync::Arc;

/// Extra children a fan-out interface may receive beyond its minimum.
const MAX_EXTRA_CHILDREN: usize = 3;

/// Grammatical-evolution mapping from a linear genotype to a component tree.
///
/// Expansion starts at an interface. Each expansion step consumes codons to pick a
/// provider, then its parameter values, then how many children every required
/// interface receives. At `max_depth` only providers that can close the tree
/// (all required interfaces optional) are eligible.
pub struct GrammarMapper {
    repository: Arc<ComponentRepository>,
    max_depth: usize,
}

impl GrammarMapper {
    pub fn new(repository: Arc<ComponentRepository>, max_depth: usize) -> Self {
        Self { repository, max_depth }
    }

    pub fn repository(&self) -> &Arc<ComponentRepository> {
        &self.repository
    }

    /// Map a genotype into a completely defined instance providing `interface`.
    pub fn map(&self, genome: &[u32], interface: &str) -> Result<ComponentInstance> {
        let mut consumer = GeneConsumer::new(genome);
        let instance = self.build_for_interface(interface, &mut consumer, 0)?;
        if !instance.is_completely_defined() {
            return Err(CoevoError::Generation(format!("Mapped tree is incomplete: {}", instance)));
        }
        Ok(instance)
    }

    fn build_for_interface(&self, interface: &str, consumer: &mut GeneConsumer, depth: usize) -> Result<ComponentInstance> {
        let providers = self.repository.providers_of(interface);
        if providers.is_empty() {
            return Err(CoevoError::Generation(format!("No component provides '{}'", interface)));
        }

        // Depth limit to prevent infinite recursion
        let candidates: Vec<&Arc<Component>> = if depth >= self.max_depth {
            providers
                .into_iter()
                .filter(|c| c.required_interfaces.iter().all(|r| r.min == 0))
                .collect()
        } else {
            providers
        };
        if candidates.is_empty() {
            return Err(CoevoError::Generation(format!(
                "Depth limit {} reached while expanding '{}'",
                self.max_depth, interface
            )));
        }

        let component = candidates[consumer.choose(candidates.len())];
        self.build_component(component, consumer, depth)
    }

    fn build_component(&self, component: &Arc<Component>, consumer: &mut GeneConsumer, depth: usize) -> Result<ComponentInstance> {
        let mut instance = ComponentInstance::new(Arc::clone(component));

        for parameter in &component.parameters {
            let value = match parameter.domain.fixed_value() {
                Some(fixed) => fixed,
                None => match &parameter.domain {
                    ParameterDomain::Categorical { values } => values[consumer.choose(values.len())].clone(),
                    ParameterDomain::Numeric { min, max, integer: true } => {
                        consumer.int_range(min.round() as i64, max.round() as i64).to_string()
                    }
                    ParameterDomain::Numeric { min, max, integer: false } => {
                        format_number(consumer.float_range(*min, *max), false)
                    }
                },
            };
            instance.parameters.insert(parameter.name.clone(), value);
        }

        for required in &component.required_interfaces {
            let count = if depth >= self.max_depth {
                0
            } else {
                let highest = required
                    .max
                    .saturating_sub(1)
                    .min(required.min.saturating_add(MAX_EXTRA_CHILDREN));
                if highest <= required.min {
                    required.min
                } else {
                    required.min + consumer.choose(highest - required.min + 1)
                }
            };

            let mut children = Vec::with_capacity(count);
            for _ in 0..count {
                children.push(self.build_for_interface(&required.interface, consumer, depth + 1)?);
            }
            instance.satisfaction.insert(required.id.clone(), children);
        }

        Ok(instance)
    }
}
