use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{any_agent::AnyAgent, params::AgentParams};

/// Every agent family, in the order they are listed to users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentKind {
    Random,
    Greedy,
    Heuristic,
    WeightedHeuristic,
    Minimax,
    AlphaBeta,
    Expectimax,
    AStar,
    BeamSearch,
    IterativeDeepening,
    MonteCarlo,
    Mcts,
    QLearning,
    Sarsa,
    TdLearning,
    GeneticAlgorithm,
    NeuralNetwork,
    PolicyGradient,
    Dqn,
    ActorCritic,
}

impl AgentKind {
    pub const ALL: [Self; 20] = [
        Self::Random,
        Self::Greedy,
        Self::Heuristic,
        Self::WeightedHeuristic,
        Self::Minimax,
        Self::AlphaBeta,
        Self::Expectimax,
        Self::AStar,
        Self::BeamSearch,
        Self::IterativeDeepening,
        Self::MonteCarlo,
        Self::Mcts,
        Self::QLearning,
        Self::Sarsa,
        Self::TdLearning,
        Self::GeneticAlgorithm,
        Self::NeuralNetwork,
        Self::PolicyGradient,
        Self::Dqn,
        Self::ActorCritic,
    ];

    /// Short lowercase identifier used on the command line and in JSON.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Random => "random",
            Self::Greedy => "greedy",
            Self::Heuristic => "heuristic",
            Self::WeightedHeuristic => "weightedheuristic",
            Self::Minimax => "minimax",
            Self::AlphaBeta => "alphabeta",
            Self::Expectimax => "expectimax",
            Self::AStar => "astar",
            Self::BeamSearch => "beamsearch",
            Self::IterativeDeepening => "iterativedeepening",
            Self::MonteCarlo => "montecarlo",
            Self::Mcts => "mcts",
            Self::QLearning => "qlearning",
            Self::Sarsa => "sarsa",
            Self::TdLearning => "tdlearning",
            Self::GeneticAlgorithm => "geneticalgorithm",
            Self::NeuralNetwork => "neuralnetwork",
            Self::PolicyGradient => "policygradient",
            Self::Dqn => "dqn",
            Self::ActorCritic => "actorcritic",
        }
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Random => "Random",
            Self::Greedy => "Greedy",
            Self::Heuristic => "Heuristic",
            Self::WeightedHeuristic => "Weighted Heuristic",
            Self::Minimax => "Minimax",
            Self::AlphaBeta => "Alpha-Beta",
            Self::Expectimax => "Expectimax",
            Self::AStar => "A*",
            Self::BeamSearch => "Beam Search",
            Self::IterativeDeepening => "Iterative Deepening",
            Self::MonteCarlo => "Monte Carlo",
            Self::Mcts => "MCTS",
            Self::QLearning => "Q-Learning",
            Self::Sarsa => "SARSA",
            Self::TdLearning => "TD-Learning",
            Self::GeneticAlgorithm => "Genetic Algorithm",
            Self::NeuralNetwork => "Neural Network",
            Self::PolicyGradient => "Policy Gradient",
            Self::Dqn => "DQN",
            Self::ActorCritic => "Actor-Critic",
        }
    }

    /// Returns `true` for agents whose state changes with experience.
    #[must_use]
    pub const fn is_learning(self) -> bool {
        matches!(
            self,
            Self::QLearning
                | Self::Sarsa
                | Self::TdLearning
                | Self::GeneticAlgorithm
                | Self::NeuralNetwork
                | Self::PolicyGradient
                | Self::Dqn
                | Self::ActorCritic
        )
    }

    /// Builds an agent of this kind. See [`AnyAgent::new`].
    #[must_use]
    pub fn build(self, params: &AgentParams) -> AnyAgent {
        AnyAgent::new(self, params)
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, derive_more::Display, derive_more::Error)]
#[display("unknown agent kind `{input}`")]
pub struct ParseAgentKindError {
    pub input: String,
}

impl FromStr for AgentKind {
    type Err = ParseAgentKindError;

    /// Accepts the tag in any case, with `-`, `_` or spaces ignored, so
    /// `alpha-beta`, `Alpha_Beta` and `alphabeta` are all the same kind.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_' | ' '))
            .collect::<String>()
            .to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|kind| kind.tag() == normalized)
            .ok_or_else(|| ParseAgentKindError {
                input: s.to_owned(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for kind in AgentKind::ALL {
            assert_eq!(kind.tag().parse::<AgentKind>().unwrap(), kind);
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.tag()));
        }
    }

    #[test]
    fn test_parse_is_lenient() {
        assert_eq!("Alpha-Beta".parse(), Ok(AgentKind::AlphaBeta));
        assert_eq!("td_learning".parse(), Ok(AgentKind::TdLearning));
        assert_eq!("MCTS".parse(), Ok(AgentKind::Mcts));
        let err = "tetris".parse::<AgentKind>().unwrap_err();
        assert_eq!(err.to_string(), "unknown agent kind `tetris`");
    }
}
