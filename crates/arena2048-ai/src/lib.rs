//! Agents that play 2048, and the arena that pits them against each other.
//!
//! # Architecture
//!
//! ```text
//! AgentKind + AgentParams
//!     ↓ build
//! AnyAgent (one variant per kind, each with a typed config)
//!     ↓ implements
//! Agent::select_move / Agent::end_episode
//!     ↓ driven by
//! Combatant (agent + own seeded game + running stats)
//!     ↓ ticked round-robin by
//! Arena (ranking and podium)
//! ```
//!
//! - [`agent`] - The [`agent::Agent`] trait
//! - [`baseline`] - Random, greedy and fixed-heuristic agents
//! - [`search`] - Minimax, alpha-beta, expectimax, A*, beam search,
//!   iterative deepening, Monte Carlo and MCTS
//! - [`tabular`] - Q-learning, SARSA and TD(λ) over board fingerprints
//! - [`genetic`] - Online evolution of heuristic weights
//! - [`neural`] - Value network, policy gradient, DQN and actor-critic
//! - [`any_agent`] - Dispatch over every kind, snapshots and retuning
//! - [`session`] - Combatants and the arena
//!
//! Agents never mutate the game they are shown. Searches work on clones and
//! draw spawns from their own random streams, never from the game's.

pub mod agent;
pub mod any_agent;
pub mod baseline;
pub mod genetic;
pub mod kind;
pub mod neural;
pub mod params;
pub mod search;
pub mod session;
pub mod snapshot;
pub mod tabular;
