use rand::Rng;

/// Linear genotype of the inner search
pub type Codons = Vec<u32>;

/// Tournament selection: pick the lowest score of K random candidates
pub fn tournament_selection<'a, R: Rng>(
    population: &'a [(Codons, f64)],
    tournament_size: usize,
    rng: &mut R,
) -> &'a Codons {
    let mut best_idx = rng.gen_range(0..population.len());
    let mut best_score = population[best_idx].1;

    for _ in 1..tournament_size {
        let idx = rng.gen_range(0..population.len());
        if population[idx].1 < best_score {
            best_idx = idx;
            best_score = population[idx].1;
        }
    }

    &population[best_idx].0
}

/// Single-point crossover: swap genome segments
pub fn crossover<R: Rng>(parent1: &Codons, parent2: &Codons, rng: &mut R) -> (Codons, Codons) {
    let len = parent1.len().min(parent2.len());
    if len <= 1 {
        return (parent1.clone(), parent2.clone());
    }

    let point = rng.gen_range(1..len);

    let mut child1 = parent1[..point].to_vec();
    child1.extend_from_slice(&parent2[point..]);
    let mut child2 = parent2[..point].to_vec();
    child2.extend_from_slice(&parent1[point..]);

    (child1, child2)
}

/// Mutation: randomly replace codons
pub fn mutate<R: Rng>(genome: &mut Codons, mutation_rate: f64, rng: &mut R) {
    for gene in genome.iter_mut() {
        if rng.gen::<f64>() < mutation_rate {
            *gene = rng.gen();
        }
    }
}

pub fn random_genome<R: Rng>(length: usize, rng: &mut R) -> Codons {
    (0..length).map(|_| rng.gen()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_tournament_prefers_lower_scores() {
        let population = vec![(vec![1], 50.0), (vec![2], 5.0), (vec![3], 500.0)];
        let mut rng = StdRng::seed_from_u64(3);
        // a tournament as large as the population almost surely sees the best
        let mut wins = 0;
        for _ in 0..100 {
            if tournament_selection(&population, 10, &mut rng) == &vec![2] {
                wins += 1;
            }
        }
        assert!(wins > 90);
    }

    #[test]
    fn test_crossover_keeps_length_and_material() {
        let mut rng = StdRng::seed_from_u64(9);
        let a = vec![0; 8];
        let b = vec![1; 8];
        let (c, d) = crossover(&a, &b, &mut rng);
        assert_eq!(c.len(), 8);
        assert_eq!(d.len(), 8);
        assert_eq!(c[0], 0);
        assert_eq!(d[0], 1);
        assert_eq!(c.iter().sum::<u32>() + d.iter().sum::<u32>(), 8);
    }

    #[test]
    fn test_mutation_rates() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut genome = vec![7; 32];
        mutate(&mut genome, 0.0, &mut rng);
        assert!(genome.iter().all(|g| *g == 7));
        mutate(&mut genome, 1.0, &mut rng);
        assert!(genome.iter().filter(|g| **g != 7).count() > 28);
    }
}
