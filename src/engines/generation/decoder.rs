use super::codec::{GenomeCodec, GenomeEntry};
use super::genome::Genome;
use super::strategy::GenomeStrategy;
use crate::components::ComponentInstance;
use crate::error::{CoevoError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

const DEFAULT_MAX_DEPTH: usize = 32;

/// Where decoding starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecodeMode {
    /// The first provider of the interface is the single, always-present root.
    RootInterface(String),
    /// Every active main component becomes an independent root.
    MainComponents,
}

/// Resolves genomes into validated component-instance trees.
pub struct PhenotypeDecoder {
    codec: Arc<GenomeCodec>,
    strategy: Arc<dyn GenomeStrategy>,
    mode: DecodeMode,
    max_depth: usize,
}

impl PhenotypeDecoder {
    pub fn new(codec: Arc<GenomeCodec>, strategy: Arc<dyn GenomeStrategy>, mode: DecodeMode) -> Self {
        Self {
            codec,
            strategy,
            mode,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn codec(&self) -> &Arc<GenomeCodec> {
        &self.codec
    }

    pub fn strategy(&self) -> &Arc<dyn GenomeStrategy> {
        &self.strategy
    }

    /// Decode a genome into its root phenotypes.
    ///
    /// Returns `ConfigurationInfeasible` when no completely defined tree results, and
    /// `RepositoryLookup` when the genome references components the repository lacks
    /// or the interface graph recurses past the depth bound.
    pub fn decode(&self, genome: &Genome) -> Result<Vec<ComponentInstance>> {
        if genome.len() != self.codec.gene_count() {
            return Err(CoevoError::RepositoryLookup(format!(
                "Genome has {} genes, layout expects {}",
                genome.len(),
                self.codec.gene_count()
            )));
        }
        for line in self.codec.describe(genome) {
            log::trace!("{}", line);
        }

        let mut path = Vec::new();
        let roots = match &self.mode {
            DecodeMode::RootInterface(interface) => {
                let providers = self.codec.repository().providers_of(interface);
                let root = providers.first().ok_or_else(|| {
                    CoevoError::RepositoryLookup(format!("No component provides root interface '{}'", interface))
                })?;
                let entry = self.codec.entry(&root.name)?;
                self.resolve(entry, genome, &mut path)?.into_iter().collect::<Vec<_>>()
            }
            DecodeMode::MainComponents => {
                let mut roots = Vec::new();
                for entry in self.codec.main_entries() {
                    if let Some(instance) = self.decode_component(entry, genome, &mut path)? {
                        roots.push(instance);
                    }
                }
                roots
            }
        };

        if roots.is_empty() {
            return Err(CoevoError::ConfigurationInfeasible(
                "Genome decodes to no completely defined component".to_string(),
            ));
        }
        for root in &roots {
            log::debug!("Component instance found: {}", root);
        }
        Ok(roots)
    }

    fn decode_component(
        &self,
        entry: &GenomeEntry,
        genome: &Genome,
        path: &mut Vec<String>,
    ) -> Result<Option<ComponentInstance>> {
        if !self.strategy.is_activated(&self.codec, entry, genome) {
            return Ok(None);
        }
        self.resolve(entry, genome, path)
    }

    /// Build the instance of an already-activated entry and resolve its required interfaces.
    fn resolve(&self, entry: &GenomeEntry, genome: &Genome, path: &mut Vec<String>) -> Result<Option<ComponentInstance>> {
        let name = entry.name().to_string();
        if path.contains(&name) || path.len() >= self.max_depth {
            return Err(CoevoError::RepositoryLookup(format!(
                "Cyclic interface resolution at '{}' via {}",
                name,
                path.join(" -> ")
            )));
        }
        let component = Arc::clone(self.codec.repository().component(&name)?);

        let mut instance = ComponentInstance::new(Arc::clone(&component));
        instance.parameters = self.codec.parameter_values(entry, genome);

        path.push(name);
        for required in &component.required_interfaces {
            let mut children = Vec::new();
            for provider in self.codec.repository().providers_of(&required.interface) {
                let child_entry = self.codec.entry(&provider.name)?;
                if let Some(child) = self.decode_component(child_entry, genome, path)? {
                    children.push(child);
                }
            }
            instance.satisfaction.insert(required.id.clone(), children);
        }
        path.pop();

        if instance.is_completely_defined() {
            Ok(Some(instance))
        } else {
            log::trace!("Incompletely defined: {}", instance);
            Ok(None)
        }
    }
}
