use arena2048_engine::{Direction, Game, GameStats, SpawnSeed};

use super::WINNING_TILE;
use crate::{agent::Agent, any_agent::AnyAgent, kind::AgentKind};

/// What a combatant did during one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Moved(Direction),
    /// The game was over; it was recorded and a new one started.
    Restarted,
    /// The agent returned no move or a move that changed nothing.
    Stalled,
    /// The combatant reached the winning tile and its game has ended.
    Finished,
}

/// One agent playing consecutive games of its own.
///
/// A game that ends before the winning tile is recorded and immediately
/// replaced. Once the winning tile has been reached the combatant keeps
/// playing that game to its end and then stops for good.
#[derive(Debug, Clone)]
pub struct Combatant {
    name: String,
    agent: AnyAgent,
    game: Game,
    stats: GameStats,
    last_move: Option<Direction>,
    total_moves: u64,
    reached_2048_at: Option<u64>,
    finished: bool,
}

impl Combatant {
    #[must_use]
    pub fn new(name: impl Into<String>, agent: AnyAgent, seed: SpawnSeed) -> Self {
        Self {
            name: name.into(),
            agent,
            game: Game::with_seed(seed),
            stats: GameStats::new(),
            last_move: None,
            total_moves: 0,
            reached_2048_at: None,
            finished: false,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> AgentKind {
        self.agent.kind()
    }

    #[must_use]
    pub fn agent(&self) -> &AnyAgent {
        &self.agent
    }

    #[must_use]
    pub fn game(&self) -> &Game {
        &self.game
    }

    #[must_use]
    pub fn stats(&self) -> &GameStats {
        &self.stats
    }

    #[must_use]
    pub fn last_move(&self) -> Option<Direction> {
        self.last_move
    }

    /// Moves made over all games.
    #[must_use]
    pub fn total_moves(&self) -> u64 {
        self.total_moves
    }

    /// Value of [`Self::total_moves`] when the winning tile first appeared.
    #[must_use]
    pub fn reached_2048_at(&self) -> Option<u64> {
        self.reached_2048_at
    }

    #[must_use]
    pub fn reached_2048(&self) -> bool {
        self.reached_2048_at.is_some()
    }

    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Mean score per game, counting the game in progress.
    #[must_use]
    pub fn average_score(&self) -> f64 {
        let live = (!self.finished).then(|| self.game.state());
        self.stats.average_score(live)
    }

    /// Replaces the game in progress, for example with a prepared position.
    pub fn set_game(&mut self, game: Game) {
        self.game = game;
        self.last_move = None;
    }

    /// Plays at most one move.
    pub fn tick(&mut self) -> TickOutcome {
        if self.finished {
            return TickOutcome::Finished;
        }
        if self.game.state().is_terminal() {
            return self.end_game();
        }

        let Some(direction) = self.agent.select_move(self.game.state()) else {
            self.game.recompute_terminal();
            if self.game.state().is_terminal() {
                return self.end_game();
            }
            log::warn!("{} returned no move on a playable board", self.name);
            return TickOutcome::Stalled;
        };
        if !self.game.make_move(direction) {
            log::warn!("{} chose {direction}, which does not move", self.name);
            return TickOutcome::Stalled;
        }

        self.last_move = Some(direction);
        self.total_moves += 1;
        let state = self.game.state();
        self.stats.observe(state);
        if state.max_tile() >= WINNING_TILE && self.reached_2048_at.is_none() {
            self.reached_2048_at = Some(self.total_moves);
            log::info!(
                "{} reached {WINNING_TILE} after {} moves",
                self.name,
                self.total_moves
            );
        }
        TickOutcome::Moved(direction)
    }

    fn end_game(&mut self) -> TickOutcome {
        let state = self.game.state();
        self.agent.end_episode(state);
        self.stats.record_game(state);
        log::debug!(
            "{} finished game {} with score {}",
            self.name,
            self.stats.games_played(),
            state.score()
        );
        if self.reached_2048() {
            self.finished = true;
            return TickOutcome::Finished;
        }
        self.game.restart();
        self.last_move = None;
        TickOutcome::Restarted
    }
}

#[cfg(test)]
mod tests {
    use arena2048_engine::{Board, GameState};

    use super::*;
    use crate::params::AgentParams;

    fn combatant(kind: AgentKind) -> Combatant {
        let params = AgentParams {
            seed: Some(1),
            ..AgentParams::default()
        };
        Combatant::new(kind.tag(), kind.build(&params), SpawnSeed::from_u128(8))
    }

    #[test]
    fn test_restart_records_finished_game() {
        let mut c = combatant(AgentKind::Random);
        let mut moves = 0;
        let final_score = loop {
            match c.tick() {
                TickOutcome::Moved(direction) => {
                    moves += 1;
                    assert_eq!(c.last_move(), Some(direction));
                }
                TickOutcome::Restarted => break c.stats().total_score(),
                outcome => panic!("unexpected {outcome:?}"),
            }
        };
        assert_eq!(c.stats().games_played(), 1);
        assert_eq!(c.total_moves(), moves);
        assert_eq!(c.game().state().moves_taken(), 0);
        assert_eq!(c.game().state().score(), 0);
        assert_eq!(c.last_move(), None);
        assert_eq!(c.stats().best_score(), final_score);
        assert!(!c.reached_2048());
    }

    #[test]
    fn test_average_counts_live_game() {
        let mut c = combatant(AgentKind::Greedy);
        for _ in 0..30 {
            c.tick();
        }
        let live = c.game().state().score();
        assert_eq!(c.stats().games_played(), 0);
        #[expect(clippy::cast_precision_loss)]
        let expected = live as f64;
        assert!((c.average_score() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_winner_plays_out_then_stops() {
        let mut c = combatant(AgentKind::Greedy);
        // A 1024 pair that any horizontal move joins into the winning tile.
        let board = Board::from_rows([[1024, 1024, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        c.set_game(Game::from_state(GameState::from_board(board, 0), SpawnSeed::from_u128(8)));

        assert!(matches!(c.tick(), TickOutcome::Moved(_)));
        assert!(c.reached_2048());
        assert_eq!(c.reached_2048_at(), Some(1));

        let outcome = loop {
            match c.tick() {
                TickOutcome::Moved(_) => {}
                outcome => break outcome,
            }
        };
        assert_eq!(outcome, TickOutcome::Finished);
        assert!(c.is_finished());
        assert_eq!(c.stats().games_played(), 1);
        assert!(c.stats().best_tile() >= WINNING_TILE);
        assert_eq!(c.tick(), TickOutcome::Finished);
        assert_eq!(c.stats().games_played(), 1);
    }
}
