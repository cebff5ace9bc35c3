/// Pareto optimization utilities for multi-objective evolution
/// Implements NSGA-II style fast non-dominated sorting, crowding distance and elitist survival

use std::cmp::Ordering;

/// Defines whether an objective should be maximized or minimized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimizationDirection {
    Maximize,
    Minimize,
}

/// Both feature-extractor objectives are losses.
pub const MINIMIZE_BOTH: [OptimizationDirection; 2] = [OptimizationDirection::Minimize, OptimizationDirection::Minimize];

/// Individual with multiple objective values
#[derive(Debug, Clone)]
pub struct MultiObjectiveIndividual<T> {
    pub data: T,
    pub objectives: Vec<f64>,
    pub rank: usize,           // Pareto rank (0 = best frontier)
    pub crowding_distance: f64, // Diversity measure
}

impl<T> MultiObjectiveIndividual<T> {
    pub fn new(data: T, objectives: Vec<f64>) -> Self {
        Self {
            data,
            objectives,
            rank: 0,
            crowding_distance: 0.0,
        }
    }
}

/// Check if individual A dominates individual B
/// A dominates B if A is no worse than B in all objectives and strictly better in at least one
pub fn dominates(a_objectives: &[f64], b_objectives: &[f64], directions: &[OptimizationDirection]) -> bool {
    if a_objectives.len() != b_objectives.len() || a_objectives.len() != directions.len() {
        return false;
    }

    let mut at_least_one_better = false;

    for i in 0..a_objectives.len() {
        let a_val = a_objectives[i];
        let b_val = b_objectives[i];

        let (a_better, b_better) = match directions[i] {
            OptimizationDirection::Maximize => (a_val > b_val, b_val > a_val),
            OptimizationDirection::Minimize => (a_val < b_val, b_val < a_val),
        };

        if b_better {
            return false;
        }

        if a_better {
            at_least_one_better = true;
        }
    }

    at_least_one_better
}

/// Fast non-dominated sorting (NSGA-II algorithm)
/// Returns individual indices grouped by Pareto front (0 = best, 1 = second best, etc.)
pub fn fast_non_dominated_sort<T>(
    individuals: &mut [MultiObjectiveIndividual<T>],
    directions: &[OptimizationDirection],
) -> Vec<Vec<usize>> {
    let n = individuals.len();

    // domination_count: how many individuals dominate i
    // dominated_solutions: indices of individuals i dominates
    let mut domination_count = vec![0; n];
    let mut dominated_solutions: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut fronts: Vec<Vec<usize>> = Vec::new();
    let mut first_front = Vec::new();

    for i in 0..n {
        for j in 0..n {
            if i == j {
                continue;
            }

            if dominates(&individuals[i].objectives, &individuals[j].objectives, directions) {
                dominated_solutions[i].push(j);
            } else if dominates(&individuals[j].objectives, &individuals[i].objectives, directions) {
                domination_count[i] += 1;
            }
        }

        if domination_count[i] == 0 {
            individuals[i].rank = 0;
            first_front.push(i);
        }
    }

    fronts.push(first_front);

    let mut front_index = 0;
    while front_index < fronts.len() && !fronts[front_index].is_empty() {
        let mut next_front = Vec::new();

        for &i in &fronts[front_index] {
            for &j in &dominated_solutions[i] {
                domination_count[j] -= 1;
                if domination_count[j] == 0 {
                    individuals[j].rank = front_index + 1;
                    next_front.push(j);
                }
            }
        }

        if !next_front.is_empty() {
            fronts.push(next_front);
        }
        front_index += 1;
    }

    fronts
}

/// Calculate crowding distance for individuals in a front
/// Higher values indicate more isolated individuals
pub fn calculate_crowding_distance<T>(individuals: &mut [MultiObjectiveIndividual<T>], front_indices: &[usize]) {
    let front_size = front_indices.len();

    if front_size <= 2 {
        for &idx in front_indices {
            individuals[idx].crowding_distance = f64::INFINITY;
        }
        return;
    }

    let num_objectives = individuals[front_indices[0]].objectives.len();

    for &idx in front_indices {
        individuals[idx].crowding_distance = 0.0;
    }

    for obj in 0..num_objectives {
        let mut sorted_indices: Vec<usize> = front_indices.to_vec();
        sorted_indices.sort_by(|&a, &b| individuals[a].objectives[obj].total_cmp(&individuals[b].objectives[obj]));

        // Boundary points have infinite distance
        individuals[sorted_indices[0]].crowding_distance = f64::INFINITY;
        individuals[sorted_indices[front_size - 1]].crowding_distance = f64::INFINITY;

        let min_val = individuals[sorted_indices[0]].objectives[obj];
        let max_val = individuals[sorted_indices[front_size - 1]].objectives[obj];
        let range = max_val - min_val;

        if range.abs() < 1e-10 {
            continue;
        }

        for i in 1..(front_size - 1) {
            let idx = sorted_indices[i];
            let prev_val = individuals[sorted_indices[i - 1]].objectives[obj];
            let next_val = individuals[sorted_indices[i + 1]].objectives[obj];

            individuals[idx].crowding_distance += (next_val - prev_val) / range;
        }
    }
}

/// Assign rank and crowding distance to every individual.
pub fn rank_population<T>(individuals: &mut [MultiObjectiveIndividual<T>], directions: &[OptimizationDirection]) -> Vec<Vec<usize>> {
    let fronts = fast_non_dominated_sort(individuals, directions);
    for front in &fronts {
        calculate_crowding_distance(individuals, front);
    }
    fronts
}

/// Compare two individuals for selection (crowded comparison operator)
/// Returns true if individual A should be preferred over individual B
pub fn crowded_comparison<T>(a: &MultiObjectiveIndividual<T>, b: &MultiObjectiveIndividual<T>) -> bool {
    if a.rank < b.rank {
        return true;
    }
    if a.rank > b.rank {
        return false;
    }

    // Same rank: prefer higher crowding distance (more diverse)
    a.crowding_distance > b.crowding_distance
}

/// Elitist survival: fill `size` slots front by front, breaking the last front by crowding distance.
/// The survivors come back ranked.
pub fn environmental_selection<T>(
    mut individuals: Vec<MultiObjectiveIndividual<T>>,
    size: usize,
    directions: &[OptimizationDirection],
) -> Vec<MultiObjectiveIndividual<T>> {
    if individuals.len() <= size {
        rank_population(&mut individuals, directions);
        return individuals;
    }

    let fronts = rank_population(&mut individuals, directions);
    let mut keep = vec![false; individuals.len()];
    let mut kept = 0;

    for front in fronts {
        if kept + front.len() <= size {
            for idx in front {
                keep[idx] = true;
                kept += 1;
            }
            continue;
        }

        let mut last = front;
        last.sort_by(|&a, &b| {
            individuals[b]
                .crowding_distance
                .partial_cmp(&individuals[a].crowding_distance)
                .unwrap_or(Ordering::Equal)
        });
        for idx in last.into_iter().take(size - kept) {
            keep[idx] = true;
        }
        break;
    }

    let mut survivors: Vec<MultiObjectiveIndividual<T>> = individuals
        .into_iter()
        .zip(keep)
        .filter_map(|(individual, keep)| keep.then_some(individual))
        .collect();
    rank_population(&mut survivors, directions);
    survivors
}
