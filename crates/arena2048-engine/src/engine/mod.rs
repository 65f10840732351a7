//! Game rules and state management.
//!
//! This module builds 2048 gameplay on top of the core [`Board`](crate::Board):
//!
//! - [`GameState`] - Board, score, move counter and terminal flag, with the move rules
//! - [`Game`] - A [`GameState`] owning its own seeded spawn stream
//! - [`GameStats`] - Running statistics over consecutive games
//! - [`SpawnSeed`] - Seed for reproducible tile spawns
//!
//! # Game Flow
//!
//! 1. A new game starts with an empty board and two spawned tiles
//! 2. Each turn the player picks a [`Direction`](crate::Direction)
//! 3. If the slide changes the board, merged values are added to the score,
//!    the move is counted and a new tile (2 or 4) spawns
//! 4. The game is over once no direction changes the board
//!
//! # Example
//!
//! ```
//! use arena2048_engine::{Direction, Game, SpawnSeed};
//!
//! let mut game = Game::with_seed(SpawnSeed::from_u128(2048));
//!
//! for dir in Direction::ALL.into_iter().cycle() {
//!     if game.state().is_terminal() {
//!         break;
//!     }
//!     game.make_move(dir);
//! }
//!
//! println!("final score: {}", game.state().score());
//! ```

pub use self::{game::*, game_state::*, game_stats::*, spawn_seed::*};

mod game;
mod game_state;
mod game_stats;
mod spawn_seed;
