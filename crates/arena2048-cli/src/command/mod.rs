use clap::{Parser, Subcommand};

use self::{play::PlayArg, tournament::TournamentArg, train::TrainArg};

mod agent_params;
mod play;
mod tournament;
mod train;

#[derive(Debug, Clone, Parser)]
#[command(author, version, about, long_about = None)]
pub struct CommandArgs {
    #[command(subcommand)]
    mode: Mode,
}

#[derive(Debug, Clone, Subcommand)]
enum Mode {
    /// Let one agent play games and report the scores
    Play(#[clap(flatten)] PlayArg),
    /// Run arena rounds between several agents
    Tournament(#[clap(flatten)] TournamentArg),
    /// Train a learning agent and save it as a model file
    Train(#[clap(flatten)] TrainArg),
}

pub fn run() -> anyhow::Result<()> {
    let args = CommandArgs::parse();
    match args.mode {
        Mode::Play(arg) => play::run(&arg)?,
        Mode::Tournament(arg) => tournament::run(&arg)?,
        Mode::Train(arg) => train::run(&arg)?,
    }
    Ok(())
}
