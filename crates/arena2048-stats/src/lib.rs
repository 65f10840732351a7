//! Statistical summaries for the arena2048 workspace.
//!
//! Tournament reports and genetic training both summarize a batch of numbers
//! (final scores, fitness values, gene values) with [`descriptive`].
//!
//! # Example
//!
//! ```
//! use arena2048_stats::descriptive::DescriptiveStats;
//!
//! let scores = [1200.0, 3400.0, 2600.0, 800.0];
//! let stats = DescriptiveStats::new(scores).unwrap();
//! assert_eq!(stats.count, 4);
//! assert_eq!(stats.max, 3400.0);
//! assert_eq!(stats.median, 1900.0);
//! ```

pub mod descriptive;
