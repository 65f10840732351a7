use std::path::PathBuf;

use arena2048_ai::{agent::Agent as _, any_agent::AnyAgent, kind::AgentKind};
use arena2048_engine::{Game, SpawnSeed};
use arena2048_stats::descriptive::DescriptiveStats;
use chrono::Utc;
use rand::Rng as _;

use crate::{
    command::agent_params::AgentParamsArg,
    model::agent_model::{self, AgentModel},
    util::{self, Output},
};

const REPORT_COUNT: usize = 10;

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TrainArg {
    /// Agent kind to train (defaults to the kind of --model)
    #[arg(long)]
    agent: Option<AgentKind>,
    #[command(flatten)]
    params: AgentParamsArg,
    /// Number of training games
    #[arg(long, default_value_t = 100)]
    episodes: usize,
    /// Stop a game after this many moves
    #[arg(long, default_value_t = 5000)]
    max_moves: u32,
    /// Model file to continue training from
    #[arg(long)]
    model: Option<PathBuf>,
    /// Genetic agent only: generations of offline evolution, each individual
    /// playing the same seeded games, before the online episodes
    #[arg(long, default_value_t = 0)]
    generations: usize,
    /// Games per individual in an offline generation
    #[arg(long, default_value_t = 3)]
    games_per_individual: usize,
    /// Seed from which the spawn seeds of all games are drawn
    #[arg(long)]
    seed: Option<SpawnSeed>,
    /// Name stored in the model (defaults to the agent tag)
    #[arg(long)]
    name: Option<String>,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

pub(crate) fn run(arg: &TrainArg) -> anyhow::Result<()> {
    let TrainArg {
        agent,
        params,
        episodes,
        max_moves,
        model,
        generations,
        games_per_individual,
        seed,
        name,
        output,
    } = arg;

    let overrides = params.to_params();
    let (mut agent, base_model) =
        agent_model::load_agent(*agent, model.as_deref(), &overrides)?;
    let kind = agent.kind();
    if !kind.is_learning() {
        eprintln!("Note: {kind} does not learn; the model only records its parameters.");
    }
    let seed = seed.unwrap_or_else(rand::random);
    let mut seeds = seed.rng();
    eprintln!("Training {kind} for {episodes} episode(s) from seed {seed}");

    if *generations > 0 {
        evolve_offline(
            &mut agent,
            *generations,
            *games_per_individual,
            *max_moves,
            &mut seeds,
        );
    }

    let report_every = (*episodes / REPORT_COUNT).max(1);
    let mut scores = Vec::with_capacity(*episodes);
    let mut best_score = 0;
    for episode in 1..=*episodes {
        let mut game = Game::with_seed(seeds.random());
        let record = util::play_episode(&mut agent, &mut game, Some(*max_moves), |_, _| {});
        best_score = best_score.max(record.score);
        #[expect(clippy::cast_precision_loss)]
        scores.push(record.score as f64);

        if episode % report_every == 0 || episode == *episodes {
            let window = &scores[scores.len().saturating_sub(report_every)..];
            if let Some(stats) = DescriptiveStats::new(window.iter().copied()) {
                eprintln!("  Episode {episode:>6}: last {} games {stats}", window.len());
            }
        }
    }

    let score_stats = DescriptiveStats::new(scores.iter().copied());
    let mean_score = score_stats.as_ref().map_or(0.0, |s| s.mean);
    eprintln!("{kind} training completed.");

    let previous_episodes = base_model.as_ref().map_or(0, |m| m.episodes);
    let model = AgentModel {
        name: name
            .clone()
            .or_else(|| base_model.as_ref().map(|m| m.name.clone()))
            .unwrap_or_else(|| kind.tag().to_owned()),
        kind,
        trained_at: Utc::now(),
        episodes: previous_episodes + episodes,
        best_score: base_model
            .as_ref()
            .map_or(best_score, |m| m.best_score.max(best_score)),
        mean_score,
        params: base_model
            .as_ref()
            .map_or_else(|| overrides.clone(), |m| m.params.merged_with(&overrides)),
        snapshot: agent.snapshot(),
    };
    Output::save_json(&model, output.clone())?;

    eprintln!();
    eprintln!("Model saved successfully");
    if let Some(path) = &output {
        eprintln!("  Path: {}", path.display());
    }
    eprintln!("  Name: {}", model.name);
    eprintln!("  Trained at: {}", model.trained_at);
    eprintln!("  Episodes: {}", model.episodes);
    eprintln!("  Best score: {}", model.best_score);
    eprintln!("  Mean score: {:.1}", model.mean_score);
    eprintln!("  Snapshot: {}", model.snapshot.family());

    Ok(())
}

fn evolve_offline<R>(
    agent: &mut AnyAgent,
    generations: usize,
    games_per_individual: usize,
    max_moves: u32,
    seeds: &mut R,
) where
    R: rand::Rng + ?Sized,
{
    let AnyAgent::GeneticAlgorithm(genetic) = agent else {
        eprintln!("Note: --generations only applies to the genetic agent; skipped.");
        return;
    };
    for _ in 0..generations {
        let generation = genetic.population().generation();
        eprintln!("Generation #{generation}:");
        let fields = (0..games_per_individual)
            .map(|_| seeds.random::<SpawnSeed>())
            .collect::<Vec<_>>();
        genetic.evaluate_population(&fields, max_moves as usize);

        let population = genetic.population();
        eprintln!("  Individuals:");
        for (i, ind) in population.individuals().iter().enumerate() {
            eprintln!("  {i:2}: {:.3?} => {:.1}", ind.genes(), ind.fitness());
        }
        let gene_stats = population.compute_gene_stats();
        eprintln!("  Gene Stats:");
        eprintln!(
            "    Min:  {:.3?}",
            gene_stats.iter().map(|s| s.min).collect::<Vec<_>>()
        );
        eprintln!(
            "    Max:  {:.3?}",
            gene_stats.iter().map(|s| s.max).collect::<Vec<_>>()
        );
        eprintln!(
            "    Mean: {:.3?}",
            gene_stats.iter().map(|s| s.mean).collect::<Vec<_>>()
        );
        if let Some(fitness_stats) = population.compute_fitness_stats() {
            eprintln!("  Fitness Stats: {fitness_stats}");
        }

        genetic.evolve();
    }
}
