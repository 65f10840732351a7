//! Running many agents side by side.
//!
//! A [`Combatant`] pairs one agent with its own seeded game and keeps score
//! across restarts. An [`Arena`] ticks its combatants round-robin, one move
//! each per tick, until enough of them have reached the 2048 tile or the
//! tick budget is spent, and ranks them with [`Arena::ranking`].

pub use self::{arena::*, combatant::*};

mod arena;
mod combatant;

/// Tile value that counts as a win.
pub const WINNING_TILE: u32 = 2048;
