use crate::types::{infeasible_objectives, Objectives};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// A single typed gene of a feature-extraction genome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Gene {
    /// Component activation toggle
    Binary(bool),
    /// Categorical choice index or discretised numeric value, inclusive bounds
    Integer { value: i64, min: i64, max: i64 },
    /// Continuous numeric value, inclusive bounds
    Real { value: f64, min: f64, max: f64 },
}

impl Gene {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Gene::Binary(b) => Some(*b),
            _ => None,
        }
    }

    pub fn set_bool(&mut self, on: bool) {
        if let Gene::Binary(b) = self {
            *b = on;
        }
    }

    pub fn set_integer(&mut self, new_value: i64) {
        if let Gene::Integer { value, min, max } = self {
            *value = new_value.clamp(*min, *max);
        }
    }

    pub fn set_real(&mut self, new_value: f64) {
        if let Gene::Real { value, min, max } = self {
            *value = new_value.clamp(*min, *max);
        }
    }

    /// Draw a uniformly distributed value from the gene's domain.
    pub fn randomize<R: Rng>(&mut self, rng: &mut R) {
        match self {
            Gene::Binary(b) => *b = rng.gen_bool(0.5),
            Gene::Integer { value, min, max } => *value = rng.gen_range(*min..=*max),
            Gene::Real { value, min, max } => {
                *value = if *min < *max { rng.gen_range(*min..=*max) } else { *min }
            }
        }
    }
}

/// Fixed-length typed genome of the outer feature-extraction search.
///
/// The gene layout is owned by the [`GenomeCodec`](super::codec::GenomeCodec)
/// that created the genome: gene `i` always encodes the same component
/// activation or parameter for the lifetime of a run. Genomes additionally
/// carry the two minimised objective values assigned by the evaluation:
///
/// - objective 0: aggregated regression quality of pipelines using this extractor
/// - objective 1: negated usage count (or the same sentinel on failure)
///
/// Unevaluated genomes start at the infeasible sentinel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Genome {
    pub genes: Vec<Gene>,
    pub objectives: Objectives,
}

impl Genome {
    pub fn new(genes: Vec<Gene>) -> Self {
        Self {
            genes,
            objectives: infeasible_objectives(),
        }
    }

    pub fn len(&self) -> usize {
        self.genes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.genes.is_empty()
    }

    pub fn gene(&self, index: usize) -> Option<&Gene> {
        self.genes.get(index)
    }

    pub fn gene_mut(&mut self, index: usize) -> Option<&mut Gene> {
        self.genes.get_mut(index)
    }

    /// Stable textual key of the gene values, objectives excluded.
    pub fn fingerprint(&self) -> String {
        self.genes
            .iter()
            .map(|g| match g {
                Gene::Binary(b) => if *b { "1".to_string() } else { "0".to_string() },
                Gene::Integer { value, .. } => value.to_string(),
                Gene::Real { value, .. } => value.to_string(),
            })
            .collect::<Vec<_>>()
            .join(",")
    }
}
