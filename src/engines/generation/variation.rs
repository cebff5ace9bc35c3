use super::genome::{Gene, Genome};
use super::pareto::{crowded_comparison, MultiObjectiveIndividual};
use rand::Rng;

/// Share of a real gene's range a single mutation may move it.
const REAL_STEP: f64 = 0.1;

/// Binary tournament on (rank, crowding distance). Returns the winner's index.
pub fn pareto_tournament_selection<T, R: Rng>(
    ranked: &[MultiObjectiveIndividual<T>],
    tournament_size: usize,
    rng: &mut R,
) -> usize {
    let mut best = rng.gen_range(0..ranked.len());
    for _ in 1..tournament_size.max(1) {
        let challenger = rng.gen_range(0..ranked.len());
        if crowded_comparison(&ranked[challenger], &ranked[best]) {
            best = challenger;
        }
    }
    best
}

/// Swap each gene between the parents with probability one half.
/// Children start unevaluated.
pub fn uniform_crossover<R: Rng>(parent1: &Genome, parent2: &Genome, rng: &mut R) -> (Genome, Genome) {
    let mut genes1 = parent1.genes.clone();
    let mut genes2 = parent2.genes.clone();

    for i in 0..genes1.len().min(genes2.len()) {
        if rng.gen_bool(0.5) {
            std::mem::swap(&mut genes1[i], &mut genes2[i]);
        }
    }

    (Genome::new(genes1), Genome::new(genes2))
}

/// Type-aware mutation: flip bits, reset integers, perturb reals within bounds.
pub fn mutate<R: Rng>(genome: &mut Genome, mutation_rate: f64, rng: &mut R) {
    for gene in genome.genes.iter_mut() {
        if rng.gen::<f64>() >= mutation_rate {
            continue;
        }
        match gene {
            Gene::Binary(b) => *b = !*b,
            Gene::Integer { .. } => gene.randomize(rng),
            Gene::Real { value, min, max } => {
                let span = *max - *min;
                // triangular step centred on the current value
                let step = (rng.gen::<f64>() + rng.gen::<f64>() - 1.0) * REAL_STEP * span;
                *value = (*value + step).clamp(*min, *max);
            }
        }
    }
}
