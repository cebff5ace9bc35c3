use super::genome::{Gene, Genome};
use crate::components::component::format_number;
use crate::components::{Component, ComponentRepository, Parameter, ParameterDomain};
use crate::error::{CoevoError, Result};
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

/// Gene layout of one repository component.
#[derive(Debug, Clone)]
pub struct GenomeEntry {
    pub component: Arc<Component>,
    pub activation_gene: Option<usize>,
    pub parameter_genes: BTreeMap<usize, Parameter>,
    /// Values of degenerate parameters, which consume no gene
    pub fixed_parameters: BTreeMap<String, String>,
}

impl GenomeEntry {
    pub fn name(&self) -> &str {
        &self.component.name
    }

    pub fn parameter_gene(&self, parameter: &str) -> Option<usize> {
        self.parameter_genes
            .iter()
            .find(|(_, p)| p.name == parameter)
            .map(|(&index, _)| index)
    }
}

/// Maps a component repository onto a fixed typed gene layout.
///
/// Components are laid out in name order. Each one gets an activation gene if it is
/// a main component that is not exempted, or a bare leaf (no parameters, no required
/// interfaces). Every non-degenerate parameter gets one gene sized to its domain.
#[derive(Debug, Clone)]
pub struct GenomeCodec {
    repository: Arc<ComponentRepository>,
    entries: Vec<GenomeEntry>,
    index: HashMap<String, usize>,
    main_components: BTreeSet<String>,
    blank: Vec<Gene>,
}

impl GenomeCodec {
    pub fn new(
        repository: Arc<ComponentRepository>,
        main_components: &[String],
        without_activation: &[String],
    ) -> Self {
        let main_components: BTreeSet<String> = main_components.iter().cloned().collect();
        let without_activation: BTreeSet<&str> = without_activation.iter().map(String::as_str).collect();

        let mut entries = Vec::with_capacity(repository.len());
        let mut index = HashMap::with_capacity(repository.len());
        let mut blank = Vec::new();

        for component in repository.components() {
            let needs_activation = if main_components.contains(&component.name) {
                !without_activation.contains(component.name.as_str())
            } else {
                component.is_bare_leaf()
            };

            let activation_gene = if needs_activation {
                blank.push(Gene::Binary(false));
                log::debug!("({}) {}=[true, false]", blank.len() - 1, component.name);
                Some(blank.len() - 1)
            } else {
                None
            };

            let mut parameter_genes = BTreeMap::new();
            let mut fixed_parameters = BTreeMap::new();
            for parameter in &component.parameters {
                if let Some(value) = parameter.domain.fixed_value() {
                    fixed_parameters.insert(parameter.name.clone(), value);
                    continue;
                }
                let gene = match &parameter.domain {
                    ParameterDomain::Categorical { values } => Gene::Integer {
                        value: 0,
                        min: 0,
                        max: values.len() as i64 - 1,
                    },
                    ParameterDomain::Numeric { min, max, integer: true } => Gene::Integer {
                        value: min.round() as i64,
                        min: min.round() as i64,
                        max: max.round() as i64,
                    },
                    ParameterDomain::Numeric { min, max, integer: false } => Gene::Real {
                        value: *min,
                        min: *min,
                        max: *max,
                    },
                };
                blank.push(gene);
                log::debug!("({}) {}#{}={:?}", blank.len() - 1, component.name, parameter.name, parameter.domain);
                parameter_genes.insert(blank.len() - 1, parameter.clone());
            }

            index.insert(component.name.clone(), entries.len());
            entries.push(GenomeEntry {
                component: Arc::clone(component),
                activation_gene,
                parameter_genes,
                fixed_parameters,
            });
        }

        log::debug!(
            "Genome layout: {} genes over {} components",
            blank.len(),
            entries.len()
        );

        Self {
            repository,
            entries,
            index,
            main_components,
            blank,
        }
    }

    pub fn repository(&self) -> &Arc<ComponentRepository> {
        &self.repository
    }

    pub fn gene_count(&self) -> usize {
        self.blank.len()
    }

    pub fn entries(&self) -> &[GenomeEntry] {
        &self.entries
    }

    /// Entry by exact component name.
    pub fn entry(&self, name: &str) -> Result<&GenomeEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .ok_or_else(|| CoevoError::RepositoryLookup(format!("No genome entry for component '{}'", name)))
    }

    /// Entry by exact name, falling back to the first entry whose name ends with `name`.
    pub fn find_entry(&self, name: &str) -> Option<&GenomeEntry> {
        self.index
            .get(name)
            .map(|&i| &self.entries[i])
            .or_else(|| self.entries.iter().find(|e| e.name().ends_with(name)))
    }

    pub fn main_entries(&self) -> Vec<&GenomeEntry> {
        self.entries
            .iter()
            .filter(|e| self.main_components.contains(e.name()))
            .collect()
    }

    pub fn is_main_component(&self, name: &str) -> bool {
        self.main_components.contains(name)
    }

    pub fn activation_gene(&self, component: &str) -> Option<usize> {
        self.find_entry(component).and_then(|e| e.activation_gene)
    }

    pub fn parameter_gene(&self, component: &str, parameter: &str) -> Option<usize> {
        self.find_entry(component).and_then(|e| e.parameter_gene(parameter))
    }

    /// Genome with every gene at its initial value: activations off, integers and reals at their minimum.
    pub fn blank_genome(&self) -> Genome {
        Genome::new(self.blank.clone())
    }

    pub fn random_genome<R: Rng>(&self, rng: &mut R) -> Genome {
        let mut genome = self.blank_genome();
        for gene in genome.genes.iter_mut() {
            gene.randomize(rng);
        }
        genome
    }

    /// Parameter value a gene encodes, as the string the phenotype carries.
    pub fn interpret(&self, parameter: &Parameter, gene: &Gene) -> String {
        match (&parameter.domain, gene) {
            (ParameterDomain::Categorical { values }, Gene::Integer { value, .. }) => {
                let i = (*value).clamp(0, values.len().saturating_sub(1) as i64) as usize;
                values.get(i).cloned().unwrap_or_default()
            }
            (_, Gene::Integer { value, .. }) => value.to_string(),
            (_, Gene::Real { value, .. }) => format_number(*value, false),
            (_, Gene::Binary(b)) => b.to_string(),
        }
    }

    /// Parameter values of an entry: fixed ones plus every gene-encoded one.
    pub fn parameter_values(&self, entry: &GenomeEntry, genome: &Genome) -> BTreeMap<String, String> {
        let mut values = entry.fixed_parameters.clone();
        for (&index, parameter) in &entry.parameter_genes {
            if let Some(gene) = genome.gene(index) {
                values.insert(parameter.name.clone(), self.interpret(parameter, gene));
            }
        }
        values
    }

    pub fn set_activation(&self, genome: &mut Genome, component: &str, on: bool) -> Result<()> {
        let index = self.activation_gene(component).ok_or_else(|| {
            CoevoError::Configuration(format!("Component '{}' has no activation gene", component))
        })?;
        if let Some(gene) = genome.gene_mut(index) {
            gene.set_bool(on);
        }
        Ok(())
    }

    /// Set a parameter gene from its string value.
    pub fn set_parameter(&self, genome: &mut Genome, component: &str, parameter: &str, value: &str) -> Result<()> {
        let entry = self
            .find_entry(component)
            .ok_or_else(|| CoevoError::Configuration(format!("Unknown component '{}'", component)))?;
        let index = entry.parameter_gene(parameter).ok_or_else(|| {
            CoevoError::Configuration(format!("Component '{}' has no parameter gene '{}'", entry.name(), parameter))
        })?;
        let domain = &entry.parameter_genes[&index].domain;
        let invalid = || CoevoError::Configuration(format!("Invalid value '{}' for {}#{}", value, entry.name(), parameter));

        let gene = match genome.gene_mut(index) {
            Some(gene) => gene,
            None => return Err(invalid()),
        };
        match domain {
            ParameterDomain::Categorical { values } => {
                let position = values.iter().position(|v| v == value).ok_or_else(invalid)?;
                gene.set_integer(position as i64);
            }
            ParameterDomain::Numeric { integer: true, .. } => {
                gene.set_integer(value.parse::<i64>().map_err(|_| invalid())?);
            }
            ParameterDomain::Numeric { integer: false, .. } => {
                gene.set_real(value.parse::<f64>().map_err(|_| invalid())?);
            }
        }
        Ok(())
    }

    /// One `(index) component#parameter=value` line per gene.
    pub fn describe(&self, genome: &Genome) -> Vec<String> {
        let mut lines = BTreeMap::new();
        for entry in &self.entries {
            if let Some(index) = entry.activation_gene {
                if let Some(gene) = genome.gene(index) {
                    lines.insert(index, format!("({}) {}={}", index, entry.name(), gene.as_bool().unwrap_or(false)));
                }
            }
            for (&index, parameter) in &entry.parameter_genes {
                if let Some(gene) = genome.gene(index) {
                    lines.insert(
                        index,
                        format!("({}) {}#{}={}", index, entry.name(), parameter.name, self.interpret(parameter, gene)),
                    );
                }
            }
        }
        lines.into_values().collect()
    }
}
