//! Genetic algorithm over the five heuristic weights of a genome evaluator.
//!
//! An individual is a gene array `[corner, empty, monotonicity, merge,
//! max_tile]` (see [`presets::genome`]) plus the fitness its last game earned.
//!
//! # Generation Step
//!
//! 1. **Sort** individuals by fitness, best first
//! 2. **Elitism** keeps the top `floor(elite_fraction · size)` unchanged
//! 3. **Roulette selection** picks two parents, weighted by `max(0, fitness)`
//! 4. **Crossover** averages the parents gene by gene
//! 5. **Mutation** perturbs each gene with probability `mutation_rate` by a
//!    uniform value in `[-mutation_range, mutation_range]`
//!
//! Steps 3-5 repeat until the population is full again, then the generation
//! counter advances.
//!
//! # Fitness
//!
//! A game's fitness is `score + 100 · max_tile` ([`game_fitness`]). The
//! in-game agent assigns it one game at a time; offline training can instead
//! play every individual on a fixed set of seeds in parallel with
//! [`Population::evaluate_fitness`].
//!
//! # Example
//!
//! ```
//! use arena2048_engine::SpawnSeed;
//! use arena2048_training::genetic::{Population, PopulationEvolver};
//!
//! let mut rng = rand::rng();
//! let mut population = Population::random(6, &mut rng);
//! let seeds = [SpawnSeed::from_u128(1), SpawnSeed::from_u128(2)];
//! let evolver = PopulationEvolver::default();
//!
//! for _ in 0..2 {
//!     population.evaluate_fitness(&seeds, 30);
//!     population = evolver.evolve(&population, &mut rng);
//! }
//! assert_eq!(population.generation(), 2);
//! ```

use std::thread;

use arena2048_engine::{GameState, SpawnSeed};
use arena2048_evaluator::{
    presets::{self, GENOME_LEN},
    turn_evaluator::TurnEvaluator,
};
use arena2048_stats::descriptive::DescriptiveStats;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::weights;

/// Upper bounds of the initial gene values.
pub const INITIAL_GENE_BOUNDS: [f32; GENOME_LEN] = [20.0, 15.0, 10.0, 5.0, 3.0];

pub const DEFAULT_POPULATION_SIZE: usize = 20;
pub const DEFAULT_MUTATION_RATE: f32 = 0.1;
pub const MAX_MUTATION_RATE: f32 = 0.5;

/// Fitness of one finished game.
#[expect(clippy::cast_precision_loss)]
#[must_use]
pub fn game_fitness(score: u64, max_tile: u32) -> f32 {
    (score + 100 * u64::from(max_tile)) as f32
}

/// A genome and its fitness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    genes: [f32; GENOME_LEN],
    fitness: f32,
}

impl Individual {
    #[must_use]
    pub fn new(genes: [f32; GENOME_LEN]) -> Self {
        Self {
            genes,
            fitness: 0.0,
        }
    }

    /// Samples every gene uniformly below its [`INITIAL_GENE_BOUNDS`] entry.
    pub fn random<R>(rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        Self::new(weights::random_below(rng, &INITIAL_GENE_BOUNDS))
    }

    #[must_use]
    pub fn genes(&self) -> &[f32; GENOME_LEN] {
        &self.genes
    }

    #[must_use]
    pub fn fitness(&self) -> f32 {
        self.fitness
    }

    pub fn set_fitness(&mut self, fitness: f32) {
        self.fitness = fitness;
    }
}

/// Individuals of one generation; never empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "PopulationFile")]
pub struct Population {
    individuals: Vec<Individual>,
    generation: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("population must not be empty")]
pub struct EmptyPopulationError;

/// Unchecked form of [`Population`] as stored in JSON.
#[derive(Deserialize)]
struct PopulationFile {
    individuals: Vec<Individual>,
    generation: u32,
}

impl TryFrom<PopulationFile> for Population {
    type Error = EmptyPopulationError;

    fn try_from(file: PopulationFile) -> Result<Self, Self::Error> {
        if file.individuals.is_empty() {
            return Err(EmptyPopulationError);
        }
        Ok(Self {
            individuals: file.individuals,
            generation: file.generation,
        })
    }
}

impl Population {
    /// Creates generation 0 with `size` random individuals (at least one).
    pub fn random<R>(size: usize, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let individuals = (0..size.max(1)).map(|_| Individual::random(rng)).collect();
        Self {
            individuals,
            generation: 0,
        }
    }

    /// # Panics
    ///
    /// Panics if `individuals` is empty.
    #[must_use]
    pub fn from_individuals(individuals: Vec<Individual>, generation: u32) -> Self {
        assert!(!individuals.is_empty(), "population must not be empty");
        Self {
            individuals,
            generation,
        }
    }

    #[must_use]
    pub fn individuals(&self) -> &[Individual] {
        &self.individuals
    }

    #[must_use]
    pub fn individual_mut(&mut self, index: usize) -> Option<&mut Individual> {
        self.individuals.get_mut(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.individuals.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.individuals.is_empty()
    }

    #[must_use]
    pub fn generation(&self) -> u32 {
        self.generation
    }

    /// The individual with the highest fitness; the first one on ties.
    #[must_use]
    pub fn best(&self) -> Option<&Individual> {
        self.individuals
            .iter()
            .reduce(|best, ind| if ind.fitness > best.fitness { ind } else { best })
    }

    /// Plays one game per seed for every individual, in parallel, and sets
    /// each fitness to the mean [`game_fitness`] over those games.
    ///
    /// Games stop after `move_limit` moves if they have not ended before.
    pub fn evaluate_fitness(&mut self, seeds: &[SpawnSeed], move_limit: usize) {
        if seeds.is_empty() {
            return;
        }
        thread::scope(|s| {
            for ind in &mut self.individuals {
                let turn_evaluator = TurnEvaluator::new(Box::new(presets::genome(ind.genes)));
                s.spawn(move || {
                    let total: f32 = seeds
                        .iter()
                        .map(|seed| {
                            let mut rng = seed.rng();
                            let mut state = GameState::new(&mut rng);
                            turn_evaluator.play_session(&mut state, &mut rng, move_limit);
                            game_fitness(state.score(), state.max_tile())
                        })
                        .sum();
                    #[expect(clippy::cast_precision_loss)]
                    let games = seeds.len() as f32;
                    ind.fitness = total / games;
                });
            }
        });
    }

    #[must_use]
    pub fn compute_fitness_stats(&self) -> Option<DescriptiveStats> {
        DescriptiveStats::new(self.individuals.iter().map(|ind| f64::from(ind.fitness)))
    }

    /// Statistics of each gene across the population, in gene order.
    #[must_use]
    pub fn compute_gene_stats(&self) -> Vec<DescriptiveStats> {
        (0..GENOME_LEN)
            .filter_map(|i| {
                DescriptiveStats::new(self.individuals.iter().map(|ind| f64::from(ind.genes[i])))
            })
            .collect()
    }
}

/// Parameters of one generation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopulationEvolver {
    /// Share of the population carried over unchanged
    pub elite_fraction: f32,
    /// Per-gene mutation probability
    pub mutation_rate: f32,
    /// Half-width of the uniform mutation perturbation
    pub mutation_range: f32,
}

impl Default for PopulationEvolver {
    fn default() -> Self {
        Self {
            elite_fraction: 0.2,
            mutation_rate: DEFAULT_MUTATION_RATE,
            mutation_range: 1.0,
        }
    }
}

impl PopulationEvolver {
    /// Builds the next generation, of the same size, with fitness reset to 0
    /// for every child.
    #[must_use]
    pub fn evolve<R>(&self, population: &Population, rng: &mut R) -> Population
    where
        R: Rng + ?Sized,
    {
        let mut ranked = population.individuals.clone();
        ranked.sort_by(|a, b| b.fitness.total_cmp(&a.fitness));
        let fitness = ranked.iter().map(Individual::fitness).collect::<Vec<_>>();

        let size = ranked.len();
        #[expect(clippy::cast_precision_loss)]
        #[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let elite_count = ((size as f32 * self.elite_fraction).floor() as usize).min(size);

        let mut next = ranked[..elite_count].to_vec();
        while next.len() < size {
            let p1 = weights::roulette_select(&fitness, rng).unwrap_or(0);
            let p2 = weights::roulette_select(&fitness, rng).unwrap_or(0);
            let mut genes = weights::average(&ranked[p1].genes, &ranked[p2].genes);
            weights::mutate(&mut genes, self.mutation_rate, self.mutation_range, rng);
            next.push(Individual::new(genes));
        }

        if let Some(best) = ranked.first() {
            log::info!(
                "generation {} evolved: best fitness {:.1}, {elite_count} elites",
                population.generation,
                best.fitness
            );
        }

        Population {
            individuals: next,
            generation: population.generation + 1,
        }
    }
}
