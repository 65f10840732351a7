//! A single type over every agent kind.
//!
//! [`AnyAgent`] is what the arena and the command line work with: it is
//! built from an [`AgentKind`] and an [`AgentParams`] bag, forwards the
//! [`Agent`] calls to the concrete agent, and moves learned state in and out
//! through [`AgentSnapshot`].
//!
//! ```
//! use arena2048_ai::{agent::Agent as _, kind::AgentKind, params::AgentParams};
//! use arena2048_engine::{Game, SpawnSeed};
//!
//! let params = AgentParams { max_depth: Some(1), ..AgentParams::default() };
//! let mut agent = AgentKind::Expectimax.build(&params);
//! let mut game = Game::with_seed(SpawnSeed::from_u128(1));
//!
//! let direction = agent.select_move(game.state()).unwrap();
//! assert!(game.make_move(direction));
//! ```

use arena2048_engine::{Direction, GameState};

use crate::{
    agent::Agent,
    baseline::{GreedyAgent, HeuristicAgent, RandomAgent},
    genetic::GeneticAgent,
    kind::AgentKind,
    neural::{ActorCriticAgent, DqnAgent, NeuralNetworkAgent, PolicyGradientAgent},
    params::AgentParams,
    search::{
        AStarAgent, AlphaBetaAgent, BeamSearchAgent, ExpectimaxAgent, IterativeDeepeningAgent,
        MctsAgent, MinimaxAgent, MonteCarloAgent,
    },
    snapshot::{AgentSnapshot, RestoreError},
    tabular::{QLearningAgent, SarsaAgent, TdLearningAgent},
};

#[derive(Debug, Clone)]
pub enum AnyAgent {
    Random(RandomAgent),
    Greedy(GreedyAgent),
    Heuristic(HeuristicAgent),
    WeightedHeuristic(HeuristicAgent),
    Minimax(MinimaxAgent),
    AlphaBeta(AlphaBetaAgent),
    Expectimax(ExpectimaxAgent),
    AStar(AStarAgent),
    BeamSearch(BeamSearchAgent),
    IterativeDeepening(IterativeDeepeningAgent),
    MonteCarlo(MonteCarloAgent),
    Mcts(MctsAgent),
    QLearning(QLearningAgent),
    Sarsa(SarsaAgent),
    TdLearning(TdLearningAgent),
    GeneticAlgorithm(GeneticAgent),
    NeuralNetwork(NeuralNetworkAgent),
    PolicyGradient(PolicyGradientAgent),
    Dqn(DqnAgent),
    ActorCritic(ActorCriticAgent),
}

macro_rules! dispatch {
    ($self:expr, $agent:ident => $body:expr) => {
        match $self {
            AnyAgent::Random($agent) => $body,
            AnyAgent::Greedy($agent) => $body,
            AnyAgent::Heuristic($agent) | AnyAgent::WeightedHeuristic($agent) => $body,
            AnyAgent::Minimax($agent) => $body,
            AnyAgent::AlphaBeta($agent) => $body,
            AnyAgent::Expectimax($agent) => $body,
            AnyAgent::AStar($agent) => $body,
            AnyAgent::BeamSearch($agent) => $body,
            AnyAgent::IterativeDeepening($agent) => $body,
            AnyAgent::MonteCarlo($agent) => $body,
            AnyAgent::Mcts($agent) => $body,
            AnyAgent::QLearning($agent) => $body,
            AnyAgent::Sarsa($agent) => $body,
            AnyAgent::TdLearning($agent) => $body,
            AnyAgent::GeneticAlgorithm($agent) => $body,
            AnyAgent::NeuralNetwork($agent) => $body,
            AnyAgent::PolicyGradient($agent) => $body,
            AnyAgent::Dqn($agent) => $body,
            AnyAgent::ActorCritic($agent) => $body,
        }
    };
}

impl AnyAgent {
    /// Builds an agent of `kind`, reading the keys of `params` it uses.
    ///
    /// Keys that do not apply to `kind` are ignored, missing ones take the
    /// agent's defaults and out-of-range values are clamped.
    #[must_use]
    pub fn new(kind: AgentKind, params: &AgentParams) -> Self {
        match kind {
            AgentKind::Random => Self::Random(RandomAgent::from_params(params)),
            AgentKind::Greedy => Self::Greedy(GreedyAgent),
            AgentKind::Heuristic => Self::Heuristic(HeuristicAgent::heuristic()),
            AgentKind::WeightedHeuristic => Self::WeightedHeuristic(HeuristicAgent::weighted()),
            AgentKind::Minimax => Self::Minimax(MinimaxAgent::from_params(params)),
            AgentKind::AlphaBeta => Self::AlphaBeta(AlphaBetaAgent::from_params(params)),
            AgentKind::Expectimax => Self::Expectimax(ExpectimaxAgent::from_params(params)),
            AgentKind::AStar => Self::AStar(AStarAgent::from_params(params)),
            AgentKind::BeamSearch => Self::BeamSearch(BeamSearchAgent::from_params(params)),
            AgentKind::IterativeDeepening => {
                Self::IterativeDeepening(IterativeDeepeningAgent::from_params(params))
            }
            AgentKind::MonteCarlo => Self::MonteCarlo(MonteCarloAgent::from_params(params)),
            AgentKind::Mcts => Self::Mcts(MctsAgent::from_params(params)),
            AgentKind::QLearning => Self::QLearning(QLearningAgent::from_params(params)),
            AgentKind::Sarsa => Self::Sarsa(SarsaAgent::from_params(params)),
            AgentKind::TdLearning => Self::TdLearning(TdLearningAgent::from_params(params)),
            AgentKind::GeneticAlgorithm => {
                Self::GeneticAlgorithm(GeneticAgent::from_params(params))
            }
            AgentKind::NeuralNetwork => {
                Self::NeuralNetwork(NeuralNetworkAgent::from_params(params))
            }
            AgentKind::PolicyGradient => {
                Self::PolicyGradient(PolicyGradientAgent::from_params(params))
            }
            AgentKind::Dqn => Self::Dqn(DqnAgent::from_params(params)),
            AgentKind::ActorCritic => Self::ActorCritic(ActorCriticAgent::from_params(params)),
        }
    }

    /// Copies out everything the agent has learned.
    #[must_use]
    pub fn snapshot(&self) -> AgentSnapshot {
        match self {
            Self::QLearning(agent) => AgentSnapshot::QTable {
                table: agent.table().clone(),
            },
            Self::Sarsa(agent) => AgentSnapshot::QTable {
                table: agent.table().clone(),
            },
            Self::TdLearning(agent) => AgentSnapshot::ValueTable {
                table: agent.table().clone(),
            },
            Self::GeneticAlgorithm(agent) => AgentSnapshot::Population {
                population: agent.population().clone(),
                active: agent.active_index(),
            },
            Self::NeuralNetwork(agent) => AgentSnapshot::Networks {
                networks: agent.networks(),
            },
            Self::PolicyGradient(agent) => AgentSnapshot::Networks {
                networks: agent.networks(),
            },
            Self::Dqn(agent) => AgentSnapshot::Networks {
                networks: agent.networks(),
            },
            Self::ActorCritic(agent) => AgentSnapshot::Networks {
                networks: agent.networks(),
            },
            Self::Random(_)
            | Self::Greedy(_)
            | Self::Heuristic(_)
            | Self::WeightedHeuristic(_)
            | Self::Minimax(_)
            | Self::AlphaBeta(_)
            | Self::Expectimax(_)
            | Self::AStar(_)
            | Self::BeamSearch(_)
            | Self::IterativeDeepening(_)
            | Self::MonteCarlo(_)
            | Self::Mcts(_) => AgentSnapshot::Stateless,
        }
    }

    /// Replaces the learned state with `snapshot`.
    ///
    /// The snapshot must come from the same family: tables for the tabular
    /// agents, a population for the genetic agent, networks for the neural
    /// agents and [`AgentSnapshot::Stateless`] for everything else. Networks
    /// must be present and have the layer sizes the agent builds. On error
    /// the agent is left as it was.
    pub fn restore(&mut self, snapshot: &AgentSnapshot) -> Result<(), RestoreError> {
        let kind = self.kind();
        match (self, snapshot) {
            (Self::QLearning(agent), AgentSnapshot::QTable { table }) => {
                agent.set_table(table.clone());
            }
            (Self::Sarsa(agent), AgentSnapshot::QTable { table }) => {
                agent.set_table(table.clone());
            }
            (Self::TdLearning(agent), AgentSnapshot::ValueTable { table }) => {
                agent.set_table(table.clone());
            }
            (Self::GeneticAlgorithm(agent), AgentSnapshot::Population { population, active }) => {
                agent.set_population(population.clone(), *active);
            }
            (Self::NeuralNetwork(agent), AgentSnapshot::Networks { networks }) => {
                agent.restore_networks(networks)?;
            }
            (Self::PolicyGradient(agent), AgentSnapshot::Networks { networks }) => {
                agent.restore_networks(networks)?;
            }
            (Self::Dqn(agent), AgentSnapshot::Networks { networks }) => {
                agent.restore_networks(networks)?;
            }
            (Self::ActorCritic(agent), AgentSnapshot::Networks { networks }) => {
                agent.restore_networks(networks)?;
            }
            (_, AgentSnapshot::Stateless) if !kind.is_learning() => {}
            (_, snapshot) => {
                return Err(RestoreError::WrongFamily {
                    kind,
                    snapshot: snapshot.family(),
                });
            }
        }
        log::info!("restored {kind} from a {} snapshot", snapshot.family());
        Ok(())
    }

    /// Applies every key set in `params` that this kind understands.
    ///
    /// Used to retune an agent after building or restoring it. Keys that
    /// only matter at construction (`seed`, `backend`, `populationSize`) are
    /// ignored.
    pub fn apply_params(&mut self, params: &AgentParams) {
        if let Some(depth) = params.max_depth {
            self.set_max_depth(depth);
        }
        if let Some(width) = params.beam_width {
            self.set_beam_width(width);
        }
        if let Some(simulations) = params.simulations {
            self.set_simulations(simulations);
        }
        if let Some(c) = params.exploration_constant {
            self.set_exploration_constant(c);
        }
        if let Some(rate) = params.learning_rate {
            self.set_learning_rate(rate);
        }
        if let Some(gamma) = params.discount_factor {
            self.set_discount_factor(gamma);
        }
        if let Some(epsilon) = params.epsilon {
            self.set_epsilon(epsilon);
        }
        if let Some(lambda) = params.lambda {
            self.set_lambda(lambda);
        }
        if let Some(rate) = params.mutation_rate {
            self.set_mutation_rate(rate);
        }
    }

    /// Returns `false` if this kind has no search depth.
    pub fn set_max_depth(&mut self, max_depth: u32) -> bool {
        match self {
            Self::Minimax(agent) => agent.set_max_depth(max_depth),
            Self::AlphaBeta(agent) => agent.set_max_depth(max_depth),
            Self::Expectimax(agent) => agent.set_max_depth(max_depth),
            Self::AStar(agent) => agent.set_max_depth(max_depth),
            Self::BeamSearch(agent) => agent.set_max_depth(max_depth),
            Self::IterativeDeepening(agent) => agent.set_max_depth(max_depth),
            _ => return false,
        }
        true
    }

    pub fn set_beam_width(&mut self, beam_width: u32) -> bool {
        let Self::BeamSearch(agent) = self else {
            return false;
        };
        agent.set_beam_width(beam_width);
        true
    }

    pub fn set_simulations(&mut self, simulations: u32) -> bool {
        match self {
            Self::MonteCarlo(agent) => agent.set_simulations(simulations),
            Self::Mcts(agent) => agent.set_simulations(simulations),
            _ => return false,
        }
        true
    }

    pub fn set_exploration_constant(&mut self, c: f64) -> bool {
        let Self::Mcts(agent) = self else {
            return false;
        };
        agent.set_exploration_constant(c);
        true
    }

    pub fn set_learning_rate(&mut self, rate: f32) -> bool {
        match self {
            Self::QLearning(agent) => agent.config_mut().set_learning_rate(rate),
            Self::Sarsa(agent) => agent.config_mut().set_learning_rate(rate),
            Self::TdLearning(agent) => agent.config_mut().set_learning_rate(rate),
            Self::NeuralNetwork(agent) => agent.set_learning_rate(rate),
            Self::PolicyGradient(agent) => agent.set_learning_rate(rate),
            Self::Dqn(agent) => agent.set_learning_rate(rate),
            Self::ActorCritic(agent) => agent.set_learning_rate(rate),
            _ => return false,
        }
        true
    }

    pub fn set_discount_factor(&mut self, gamma: f32) -> bool {
        match self {
            Self::QLearning(agent) => agent.config_mut().set_discount_factor(gamma),
            Self::Sarsa(agent) => agent.config_mut().set_discount_factor(gamma),
            Self::TdLearning(agent) => agent.config_mut().set_discount_factor(gamma),
            Self::NeuralNetwork(agent) => agent.set_discount_factor(gamma),
            Self::PolicyGradient(agent) => agent.set_discount_factor(gamma),
            Self::Dqn(agent) => agent.set_discount_factor(gamma),
            Self::ActorCritic(agent) => agent.set_discount_factor(gamma),
            _ => return false,
        }
        true
    }

    pub fn set_epsilon(&mut self, epsilon: f32) -> bool {
        match self {
            Self::QLearning(agent) => agent.config_mut().set_epsilon(epsilon),
            Self::Sarsa(agent) => agent.config_mut().set_epsilon(epsilon),
            Self::Dqn(agent) => agent.set_epsilon(epsilon),
            _ => return false,
        }
        true
    }

    pub fn set_lambda(&mut self, lambda: f32) -> bool {
        let Self::TdLearning(agent) = self else {
            return false;
        };
        agent.config_mut().set_lambda(lambda);
        true
    }

    pub fn set_mutation_rate(&mut self, rate: f32) -> bool {
        let Self::GeneticAlgorithm(agent) = self else {
            return false;
        };
        agent.set_mutation_rate(rate);
        true
    }
}

impl Agent for AnyAgent {
    fn kind(&self) -> AgentKind {
        dispatch!(self, agent => agent.kind())
    }

    fn select_move(&mut self, state: &GameState) -> Option<Direction> {
        dispatch!(self, agent => agent.select_move(state))
    }

    fn end_episode(&mut self, final_state: &GameState) {
        dispatch!(self, agent => agent.end_episode(final_state));
    }
}
