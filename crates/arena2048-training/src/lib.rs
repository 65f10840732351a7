//! Genetic evolution of heuristic weights.
//!
//! The genetic agent plays one game per individual and calls
//! [`genetic::PopulationEvolver::evolve`] once the whole population has been
//! scored. The same machinery also runs offline, where every individual plays
//! a fixed set of seeded games in parallel.
//!
//! # Architecture
//!
//! ```text
//! Population (gene arrays + fitness)
//!     ↓ each individual drives
//! Genome evaluator (arena2048-evaluator presets)
//!     ↓ plays games, scored by
//! score + 100 · max tile
//!     ↓ guides
//! Elitism, roulette selection, averaging crossover, uniform mutation
//! ```
//!
//! - [`genetic`] - Individuals, populations and the generation step
//! - [`weights`] - Gene array operators used by the generation step

pub mod genetic;
pub mod weights;
