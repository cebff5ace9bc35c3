use super::codec::{GenomeCodec, GenomeEntry};
use super::genome::Genome;
use crate::components::ParameterDomain;
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Decides component activation and builds the starting genomes of a search.
pub trait GenomeStrategy: Send + Sync {
    /// An entry with an activation gene is active iff the gene is set. Entries without one
    /// self-activate when any of their parameter genes decodes to `"true"`.
    fn is_activated(&self, codec: &GenomeCodec, entry: &GenomeEntry, genome: &Genome) -> bool {
        default_activation(codec, entry, genome)
    }

    /// Blank genome with main components off and their boolean parameters at `false`.
    fn empty_genome(&self, codec: &GenomeCodec) -> Genome {
        let mut genome = codec.blank_genome();
        for entry in codec.main_entries() {
            if let Some(index) = entry.activation_gene {
                if let Some(gene) = genome.gene_mut(index) {
                    gene.set_bool(false);
                }
            }
            for (&index, parameter) in &entry.parameter_genes {
                if let ParameterDomain::Categorical { values } = &parameter.domain {
                    if let Some(position) = values.iter().position(|v| v.eq_ignore_ascii_case("false")) {
                        if let Some(gene) = genome.gene_mut(index) {
                            gene.set_integer(position as i64);
                        }
                    }
                }
            }
        }
        genome
    }

    /// Hand-crafted genomes placed at the front of the initial population.
    fn seed_genomes(&self, _codec: &GenomeCodec) -> Result<Vec<Genome>> {
        Ok(Vec::new())
    }
}

pub fn default_activation(codec: &GenomeCodec, entry: &GenomeEntry, genome: &Genome) -> bool {
    if let Some(index) = entry.activation_gene {
        return genome.gene(index).and_then(|g| g.as_bool()).unwrap_or(false);
    }
    entry.parameter_genes.iter().any(|(&index, parameter)| {
        genome
            .gene(index)
            .map(|gene| codec.interpret(parameter, gene).eq_ignore_ascii_case("true"))
            .unwrap_or(false)
    })
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterAssignment {
    pub component: String,
    pub parameter: String,
    pub value: String,
}

/// Declarative seed genome: start from the empty genome, switch components on, set parameters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SeedSpec {
    #[serde(default)]
    pub activate: Vec<String>,
    #[serde(default)]
    pub parameters: Vec<ParameterAssignment>,
}

impl SeedSpec {
    pub fn activating<S: Into<String>>(components: impl IntoIterator<Item = S>) -> Self {
        Self {
            activate: components.into_iter().map(Into::into).collect(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, component: &str, parameter: &str, value: &str) -> Self {
        self.parameters.push(ParameterAssignment {
            component: component.to_string(),
            parameter: parameter.to_string(),
            value: value.to_string(),
        });
        self
    }

    pub fn apply(&self, codec: &GenomeCodec, genome: &mut Genome) -> Result<()> {
        for component in &self.activate {
            codec.set_activation(genome, component, true)?;
        }
        for assignment in &self.parameters {
            codec.set_parameter(genome, &assignment.component, &assignment.parameter, &assignment.value)?;
        }
        Ok(())
    }
}

fn build_seeds<S: GenomeStrategy + ?Sized>(strategy: &S, codec: &GenomeCodec, seeds: &[SeedSpec]) -> Result<Vec<Genome>> {
    seeds
        .iter()
        .map(|seed| {
            let mut genome = strategy.empty_genome(codec);
            seed.apply(codec, &mut genome)?;
            Ok(genome)
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct BasicStrategy {
    pub seeds: Vec<SeedSpec>,
}

impl BasicStrategy {
    pub fn new(seeds: Vec<SeedSpec>) -> Self {
        Self { seeds }
    }
}

impl GenomeStrategy for BasicStrategy {
    fn seed_genomes(&self, codec: &GenomeCodec) -> Result<Vec<Genome>> {
        build_seeds(self, codec, &self.seeds)
    }
}

/// Wrapper components (name containing `wrapper_marker`) switch themselves on as soon
/// as any provider of `child_interface` is active.
#[derive(Debug, Clone)]
pub struct WrapperActivationStrategy {
    pub wrapper_marker: String,
    pub child_interface: String,
    pub seeds: Vec<SeedSpec>,
}

impl WrapperActivationStrategy {
    pub fn new(wrapper_marker: impl Into<String>, child_interface: impl Into<String>, seeds: Vec<SeedSpec>) -> Self {
        Self {
            wrapper_marker: wrapper_marker.into(),
            child_interface: child_interface.into(),
            seeds,
        }
    }
}

impl GenomeStrategy for WrapperActivationStrategy {
    fn is_activated(&self, codec: &GenomeCodec, entry: &GenomeEntry, genome: &Genome) -> bool {
        if entry.activation_gene.is_none() && entry.name().contains(&self.wrapper_marker) {
            let child_active = codec
                .repository()
                .providers_of(&self.child_interface)
                .into_iter()
                .filter(|provider| provider.name != entry.name())
                .filter_map(|provider| codec.entry(&provider.name).ok())
                .any(|child| self.is_activated(codec, child, genome));
            if child_active {
                return true;
            }
        }
        default_activation(codec, entry, genome)
    }

    fn seed_genomes(&self, codec: &GenomeCodec) -> Result<Vec<Genome>> {
        build_seeds(self, codec, &self.seeds)
    }
}
