use std::ops::RangeInclusive;

use arena2048_engine::{Direction, GameState, SpawnSeed};
use arena2048_evaluator::{position_evaluator::FeatureBasedEvaluator, presets, turn_evaluator};
use arena2048_training::genetic::{
    DEFAULT_MUTATION_RATE, DEFAULT_POPULATION_SIZE, Individual, MAX_MUTATION_RATE, Population,
    PopulationEvolver, game_fitness,
};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use crate::{
    agent::Agent,
    kind::AgentKind,
    params::{AgentParams, clamp_or},
};

pub const POPULATION_SIZE_RANGE: RangeInclusive<usize> = 2..=200;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneticConfig {
    pub population_size: usize,
    pub mutation_rate: f32,
}

impl Default for GeneticConfig {
    fn default() -> Self {
        Self {
            population_size: DEFAULT_POPULATION_SIZE,
            mutation_rate: DEFAULT_MUTATION_RATE,
        }
    }
}

impl GeneticConfig {
    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self {
            population_size: clamp_or(
                params.population_size,
                DEFAULT_POPULATION_SIZE,
                POPULATION_SIZE_RANGE,
            ),
            mutation_rate: clamp_or(
                params.mutation_rate,
                DEFAULT_MUTATION_RATE,
                0.0..=MAX_MUTATION_RATE,
            ),
        }
    }
}

/// Evolves genome evaluators online: each individual plays one game, and a
/// new generation is bred once every individual has played.
#[derive(Debug, Clone)]
pub struct GeneticAgent {
    population: Population,
    active: usize,
    evolver: PopulationEvolver,
    evaluator: FeatureBasedEvaluator,
    rng: Pcg32,
}

impl GeneticAgent {
    #[must_use]
    pub fn new(config: GeneticConfig, mut rng: Pcg32) -> Self {
        let population = Population::random(config.population_size, &mut rng);
        let evolver = PopulationEvolver {
            mutation_rate: config.mutation_rate,
            ..PopulationEvolver::default()
        };
        let evaluator = genome_evaluator(&population, 0);
        Self {
            population,
            active: 0,
            evolver,
            evaluator,
            rng,
        }
    }

    #[must_use]
    pub fn from_params(params: &AgentParams) -> Self {
        Self::new(GeneticConfig::from_params(params), params.rng())
    }

    #[must_use]
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Index of the individual playing the current game.
    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn active_individual(&self) -> Option<&Individual> {
        self.population.individuals().get(self.active)
    }

    #[must_use]
    pub fn mutation_rate(&self) -> f32 {
        self.evolver.mutation_rate
    }

    pub fn set_mutation_rate(&mut self, rate: f32) {
        self.evolver.mutation_rate =
            clamp_or(Some(rate), DEFAULT_MUTATION_RATE, 0.0..=MAX_MUTATION_RATE);
    }

    /// Replaces the population; an out-of-range `active` restarts at 0.
    pub fn set_population(&mut self, population: Population, active: usize) {
        self.active = if active < population.len() { active } else { 0 };
        self.population = population;
        self.evaluator = genome_evaluator(&self.population, self.active);
    }

    /// Assigns the fitness of a finished game to the active individual.
    pub fn update_fitness(&mut self, score: u64, max_tile: u32) {
        let fitness = game_fitness(score, max_tile);
        if let Some(individual) = self.population.individual_mut(self.active) {
            individual.set_fitness(fitness);
        }
    }

    /// Scores every individual on the same seeded games, played in
    /// parallel, instead of one live game each.
    pub fn evaluate_population(&mut self, seeds: &[SpawnSeed], move_limit: usize) {
        self.population.evaluate_fitness(seeds, move_limit);
    }

    /// Breeds the next generation and hands play to its first individual.
    pub fn evolve(&mut self) {
        self.population = self.evolver.evolve(&self.population, &mut self.rng);
        self.active = 0;
        self.evaluator = genome_evaluator(&self.population, self.active);
    }
}

fn genome_evaluator(population: &Population, active: usize) -> FeatureBasedEvaluator {
    let genes = population
        .individuals()
        .get(active)
        .map_or([0.0; presets::GENOME_LEN], |ind| *ind.genes());
    presets::genome(genes)
}

impl Agent for GeneticAgent {
    fn kind(&self) -> AgentKind {
        AgentKind::GeneticAlgorithm
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        turn_evaluator::select_best_move(&self.evaluator, state).map(|(direction, _)| direction)
    }

    fn end_episode(&mut self, final_state: &GameState) {
        self.update_fitness(final_state.score(), final_state.max_tile());
        log::debug!(
            "individual {} of generation {} scored {}",
            self.active,
            self.population.generation(),
            final_state.score()
        );
        self.active += 1;
        if self.active >= self.population.len() {
            self.evolve();
        } else {
            self.evaluator = genome_evaluator(&self.population, self.active);
        }
    }
}
