use arena2048_engine::{Direction, GameState};

use crate::kind::AgentKind;

/// A decision-making strategy for 2048.
///
/// The caller owns the game; an agent only sees a borrowed [`GameState`] and
/// answers with a direction. Agents that learn update their internal state
/// inside [`Self::select_move`] (per-step updates) and [`Self::end_episode`]
/// (terminal updates).
pub trait Agent {
    fn kind(&self) -> AgentKind;

    /// Picks the next move, or `None` if no direction changes the board.
    ///
    /// Takes `&mut self` because learning agents update tables, networks or
    /// episode histories on every call.
    fn select_move(&mut self, state: &GameState) -> Option<Direction>;

    /// Called once with the final state when a game ends.
    fn end_episode(&mut self, final_state: &GameState) {
        let _ = final_state;
    }
}
