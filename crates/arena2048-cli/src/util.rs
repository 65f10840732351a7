use std::{
    fmt,
    fs::File,
    io::{self, BufWriter, StdoutLock, Write as _},
    path::{Path, PathBuf},
};

use anyhow::Context;
use arena2048_ai::{agent::Agent as _, any_agent::AnyAgent};
use arena2048_engine::{Direction, Game, GameState};
use serde::{Deserialize, Serialize};

/// Destination of a JSON report or model: a file, or stdout when no path
/// is given.
#[derive(Debug)]
pub enum Output {
    Stdout(StdoutLock<'static>),
    File {
        writer: BufWriter<File>,
        path: PathBuf,
    },
}

impl Output {
    /// Writes `value` as pretty JSON followed by a newline.
    pub fn save_json<T>(value: &T, output_path: Option<PathBuf>) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let mut output = match output_path {
            Some(path) => {
                let file = File::create(&path)
                    .with_context(|| format!("Failed to create output file: {}", path.display()))?;
                Output::File {
                    writer: BufWriter::new(file),
                    path,
                }
            }
            None => Output::Stdout(io::stdout().lock()),
        };
        serde_json::to_writer_pretty(&mut output, value)
            .and_then(|()| writeln!(output).map_err(serde_json::Error::io))
            .with_context(|| format!("Failed to write JSON to {output}"))?;
        output
            .flush()
            .with_context(|| format!("Failed to flush output to {output}"))?;
        Ok(())
    }
}

impl fmt::Display for Output {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Output::Stdout(_) => f.write_str("stdout"),
            Output::File { path, .. } => write!(f, "{}", path.display()),
        }
    }
}

impl io::Write for Output {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Output::Stdout(writer) => writer.write(buf),
            Output::File { writer, .. } => writer.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Output::Stdout(writer) => writer.flush(),
            Output::File { writer, .. } => writer.flush(),
        }
    }
}

pub fn read_json_file<T, P>(file_kind: &str, path: P) -> anyhow::Result<T>
where
    T: serde::de::DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)
        .with_context(|| format!("Failed to open {} file: {}", file_kind, path.display()))?;

    let reader = io::BufReader::new(file);
    let value = serde_json::from_reader(reader).with_context(|| {
        format!(
            "Failed to parse {} JSON file: {}",
            file_kind,
            path.display()
        )
    })?;
    Ok(value)
}

/// Outcome of one game played by [`play_episode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    pub score: u64,
    pub max_tile: u32,
    pub moves: u32,
    /// `false` if the game was cut off by the move limit.
    pub game_over: bool,
}

/// Lets `agent` play `game` to its end or until `max_moves` moves, then
/// reports the final state to the agent.
///
/// `on_move` sees the state after every move.
pub fn play_episode<F>(
    agent: &mut AnyAgent,
    game: &mut Game,
    max_moves: Option<u32>,
    mut on_move: F,
) -> EpisodeRecord
where
    F: FnMut(Direction, &GameState),
{
    while !game.state().is_terminal()
        && max_moves.is_none_or(|limit| game.state().moves_taken() < limit)
    {
        let Some(direction) = agent.select_move(game.state()) else {
            game.recompute_terminal();
            break;
        };
        if !game.make_move(direction) {
            log::warn!("{} chose {direction}, which does not move", agent.kind());
            break;
        }
        on_move(direction, game.state());
    }

    let state = game.state();
    agent.end_episode(state);
    EpisodeRecord {
        score: state.score(),
        max_tile: state.max_tile(),
        moves: state.moves_taken(),
        game_over: state.is_terminal(),
    }
}
