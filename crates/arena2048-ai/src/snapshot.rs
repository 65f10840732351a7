//! Learned state of an agent, detached from its configuration.
//!
//! A snapshot carries only what an agent has learned: tables, a genetic
//! population or network weights. Hyperparameters travel separately as
//! [`AgentParams`](crate::params::AgentParams), so a model file can pair any
//! parameters with a snapshot of the same family.

use std::collections::BTreeMap;

use arena2048_training::genetic::Population;
use serde::{Deserialize, Serialize};

use crate::{
    kind::AgentKind,
    neural::Mlp,
    tabular::{QTable, ValueTable},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AgentSnapshot {
    /// Search and baseline agents learn nothing.
    Stateless,
    QTable {
        table: QTable,
    },
    ValueTable {
        table: ValueTable,
    },
    Population {
        population: Population,
        active: usize,
    },
    /// Weights by network name; empty for the heuristic backend.
    Networks {
        networks: BTreeMap<String, Mlp>,
    },
}

impl AgentSnapshot {
    /// Name of the snapshot family, as used in error messages.
    #[must_use]
    pub fn family(&self) -> &'static str {
        match self {
            Self::Stateless => "stateless",
            Self::QTable { .. } => "q-table",
            Self::ValueTable { .. } => "value-table",
            Self::Population { .. } => "population",
            Self::Networks { .. } => "networks",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
pub enum RestoreError {
    #[display("{kind} agent cannot restore a {snapshot} snapshot")]
    WrongFamily {
        kind: AgentKind,
        snapshot: &'static str,
    },
    #[display("{kind} snapshot is missing network `{name}`")]
    MissingNetwork { kind: AgentKind, name: &'static str },
    #[display("{kind} snapshot network `{name}` has the wrong layer sizes")]
    ShapeMismatch { kind: AgentKind, name: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tagged_json() {
        let json = serde_json::to_string(&AgentSnapshot::Stateless).unwrap();
        assert_eq!(json, r#"{"type":"stateless"}"#);
        let json = serde_json::to_string(&AgentSnapshot::ValueTable {
            table: ValueTable::default(),
        })
        .unwrap();
        assert_eq!(json, r#"{"type":"valueTable","table":{}}"#);
        let back: AgentSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back.family(), "value-table");
    }

    #[test]
    fn test_error_messages() {
        let err = RestoreError::WrongFamily {
            kind: AgentKind::Dqn,
            snapshot: "q-table",
        };
        assert_eq!(err.to_string(), "DQN agent cannot restore a q-table snapshot");
        let err = RestoreError::MissingNetwork {
            kind: AgentKind::ActorCritic,
            name: "critic",
        };
        assert_eq!(err.to_string(), "Actor-Critic snapshot is missing network `critic`");
        let err = RestoreError::ShapeMismatch {
            kind: AgentKind::Dqn,
            name: "qNetwork",
        };
        assert_eq!(
            err.to_string(),
            "DQN snapshot network `qNetwork` has the wrong layer sizes"
        );
    }
}
