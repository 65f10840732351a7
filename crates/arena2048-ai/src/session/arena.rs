use std::cmp::Ordering;

use arena2048_engine::SpawnSeed;
use serde::{Deserialize, Serialize};

use super::{Combatant, TickOutcome};
use crate::{any_agent::AnyAgent, kind::AgentKind};

/// Number of winners after which a round ends early.
pub const DEFAULT_WINNERS_NEEDED: usize = 3;

/// A combatant's place in the ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Standing {
    /// 1-based
    pub rank: usize,
    pub name: String,
    pub kind: AgentKind,
    pub reached_2048: bool,
    pub reached_2048_at: Option<u64>,
    pub average_score: f64,
    pub best_score: u64,
    pub best_tile: u32,
    pub games_played: usize,
    pub total_moves: u64,
}

/// Combatants ticked round-robin, one move each per tick.
#[derive(Debug, Clone)]
pub struct Arena {
    combatants: Vec<Combatant>,
    ticks: u64,
    max_ticks: u64,
    winners_needed: usize,
}

impl Arena {
    #[must_use]
    pub fn new(max_ticks: u64) -> Self {
        Self {
            combatants: Vec::new(),
            ticks: 0,
            max_ticks,
            winners_needed: DEFAULT_WINNERS_NEEDED,
        }
    }

    #[must_use]
    pub fn with_winners_needed(mut self, winners_needed: usize) -> Self {
        self.winners_needed = winners_needed.max(1);
        self
    }

    pub fn add(&mut self, name: impl Into<String>, agent: AnyAgent, seed: SpawnSeed) {
        self.combatants.push(Combatant::new(name, agent, seed));
    }

    #[must_use]
    pub fn combatants(&self) -> &[Combatant] {
        &self.combatants
    }

    #[must_use]
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    #[must_use]
    pub fn max_ticks(&self) -> u64 {
        self.max_ticks
    }

    #[must_use]
    pub fn winners(&self) -> usize {
        self.combatants.iter().filter(|c| c.reached_2048()).count()
    }

    /// The round is over when the tick budget is spent, when enough
    /// combatants have won (all of them, if there are fewer than needed) or
    /// when nobody is left playing.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        let needed = self.winners_needed.min(self.combatants.len());
        self.ticks >= self.max_ticks
            || (needed > 0 && self.winners() >= needed)
            || self.combatants.iter().all(Combatant::is_finished)
    }

    /// Gives every combatant one move. Returns the outcomes in order.
    pub fn tick(&mut self) -> Vec<TickOutcome> {
        self.ticks += 1;
        let outcomes = self
            .combatants
            .iter_mut()
            .map(Combatant::tick)
            .collect::<Vec<_>>();
        log::trace!("tick {}: {outcomes:?}", self.ticks);
        outcomes
    }

    /// Ticks until [`Self::is_finished`], calling `on_tick` after each tick.
    pub fn run<F>(&mut self, mut on_tick: F) -> Vec<Standing>
    where
        F: FnMut(&Self),
    {
        while !self.is_finished() {
            self.tick();
            on_tick(self);
        }
        log::info!(
            "round finished after {} ticks with {} winner(s)",
            self.ticks,
            self.winners()
        );
        self.ranking()
    }

    /// Winners first, then by average score per game (the live game
    /// included). Equal combatants keep the order they were added in.
    #[must_use]
    pub fn ranking(&self) -> Vec<Standing> {
        let mut order = self.combatants.iter().collect::<Vec<_>>();
        order.sort_by(|a, b| compare(a, b));
        order
            .into_iter()
            .enumerate()
            .map(|(i, c)| Standing {
                rank: i + 1,
                name: c.name().to_owned(),
                kind: c.kind(),
                reached_2048: c.reached_2048(),
                reached_2048_at: c.reached_2048_at(),
                average_score: c.average_score(),
                best_score: c.stats().best_score(),
                best_tile: c.stats().best_tile(),
                games_played: c.stats().games_played(),
                total_moves: c.total_moves(),
            })
            .collect()
    }

    /// The top three of [`Self::ranking`].
    #[must_use]
    pub fn podium(&self) -> Vec<Standing> {
        let mut ranking = self.ranking();
        ranking.truncate(3);
        ranking
    }
}

fn compare(a: &Combatant, b: &Combatant) -> Ordering {
    b.reached_2048()
        .cmp(&a.reached_2048())
        .then_with(|| b.average_score().total_cmp(&a.average_score()))
}

#[cfg(test)]
mod tests {
    use arena2048_engine::{Board, Game, GameState};

    use super::*;
    use crate::params::AgentParams;

    fn agent(kind: AgentKind) -> AnyAgent {
        kind.build(&AgentParams {
            seed: Some(4),
            ..AgentParams::default()
        })
    }

    #[test]
    fn test_tick_budget_ends_round() {
        let mut arena = Arena::new(25);
        arena.add("random", agent(AgentKind::Random), SpawnSeed::from_u128(1));
        arena.add("greedy", agent(AgentKind::Greedy), SpawnSeed::from_u128(1));
        let mut seen = 0;
        let ranking = arena.run(|_| seen += 1);
        assert_eq!(seen, 25);
        assert_eq!(arena.ticks(), 25);
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].rank, 1);
        assert!(ranking[0].average_score >= ranking[1].average_score);
        assert!(arena.combatants().iter().all(|c| (1..=25).contains(&c.total_moves())));
    }

    #[test]
    fn test_winners_rank_first() {
        let mut arena = Arena::new(1000);
        arena.add("a", agent(AgentKind::Greedy), SpawnSeed::from_u128(2));
        arena.add("b", agent(AgentKind::Greedy), SpawnSeed::from_u128(3));
        let board = Board::from_rows([[1024, 1024, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        arena.combatants[1].set_game(Game::from_state(
            GameState::from_board(board, 0),
            SpawnSeed::from_u128(3),
        ));

        arena.tick();
        assert_eq!(arena.winners(), 1);
        let ranking = arena.ranking();
        assert_eq!(ranking[0].name, "b");
        assert!(ranking[0].reached_2048);
        assert_eq!(ranking[0].reached_2048_at, Some(1));
        assert_eq!(ranking[1].rank, 2);
        assert!(!ranking[1].reached_2048);
    }

    #[test]
    fn test_all_winners_end_a_small_round() {
        let mut arena = Arena::new(10_000).with_winners_needed(3);
        let board = Board::from_rows([[1024, 1024, 0, 0], [0; 4], [0; 4], [0; 4]]).unwrap();
        arena.add("solo", agent(AgentKind::Greedy), SpawnSeed::from_u128(5));
        arena.combatants[0].set_game(Game::from_state(
            GameState::from_board(board, 0),
            SpawnSeed::from_u128(5),
        ));
        assert!(!arena.is_finished());
        arena.tick();
        assert!(arena.is_finished());
        assert_eq!(arena.podium().len(), 1);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut arena = Arena::new(0);
        for name in ["x", "y", "z", "w"] {
            arena.add(name, agent(AgentKind::Random), SpawnSeed::from_u128(9));
        }
        assert!(arena.is_finished());
        let names = arena
            .podium()
            .into_iter()
            .map(|s| s.name)
            .collect::<Vec<_>>();
        assert_eq!(names, ["x", "y", "z"]);
    }
}
