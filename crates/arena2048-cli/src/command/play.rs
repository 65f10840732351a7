use std::path::PathBuf;

use arena2048_ai::{agent::Agent as _, kind::AgentKind};
use arena2048_engine::{Game, SpawnSeed};
use arena2048_stats::descriptive::DescriptiveStats;
use serde::Serialize;

use crate::{
    command::agent_params::AgentParamsArg,
    model::agent_model,
    util::{self, EpisodeRecord, Output},
};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct PlayArg {
    /// Agent kind, e.g. expectimax or alpha-beta (defaults to the kind of --model)
    #[arg(long)]
    agent: Option<AgentKind>,
    #[command(flatten)]
    params: AgentParamsArg,
    /// Spawn seed of the first game, as 32 hex digits
    #[arg(long)]
    seed: Option<SpawnSeed>,
    /// Trained model file (JSON format)
    #[arg(long)]
    model: Option<PathBuf>,
    /// Number of games to play
    #[arg(long, default_value_t = 1)]
    games: usize,
    /// Stop a game after this many moves
    #[arg(long)]
    max_moves: Option<u32>,
    /// Print the board after every move
    #[arg(long)]
    show_board: bool,
    /// Write a JSON summary to this file
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct PlayReport {
    agent: AgentKind,
    seed: SpawnSeed,
    games: Vec<EpisodeRecord>,
    score_stats: Option<DescriptiveStats>,
}

pub(crate) fn run(arg: &PlayArg) -> anyhow::Result<()> {
    let PlayArg {
        agent,
        params,
        seed,
        model,
        games,
        max_moves,
        show_board,
        output,
    } = arg;

    let (mut agent, model) =
        agent_model::load_agent(*agent, model.as_deref(), &params.to_params())?;
    if let Some(model) = &model {
        eprintln!(
            "Loaded model `{}` ({} episodes, trained at {})",
            model.name, model.episodes, model.trained_at
        );
    }

    let seed = seed.unwrap_or_else(rand::random);
    let mut game = Game::with_seed(seed);
    eprintln!("{} playing {games} game(s) from seed {seed}", agent.kind());

    let mut records = Vec::with_capacity(*games);
    for i in 0..*games {
        if i > 0 {
            game.restart();
        }
        if *show_board {
            println!("{}\n", game.state().board());
        }
        let record = util::play_episode(&mut agent, &mut game, *max_moves, |direction, state| {
            if *show_board {
                println!("{direction} (score {})", state.score());
                println!("{}\n", state.board());
            }
        });
        println!(
            "game {:>3}: score {:>6}  max tile {:>5}  moves {:>5}{}",
            i + 1,
            record.score,
            record.max_tile,
            record.moves,
            if record.game_over { "" } else { "  (cut off)" }
        );
        records.push(record);
    }

    #[expect(clippy::cast_precision_loss)]
    let score_stats = DescriptiveStats::new(records.iter().map(|r| r.score as f64));
    if let Some(stats) = &score_stats {
        println!("scores: {stats}");
    }

    if output.is_some() {
        let report = PlayReport {
            agent: agent.kind(),
            seed,
            games: records,
            score_stats,
        };
        Output::save_json(&report, output.clone())?;
    }
    Ok(())
}
