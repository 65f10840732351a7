use arena2048_ai::{neural::NeuralBackend, params::AgentParams};

#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::FromStr)]
enum Backend {
    Mlp,
    Heuristic,
}

impl From<Backend> for NeuralBackend {
    fn from(backend: Backend) -> Self {
        match backend {
            Backend::Mlp => NeuralBackend::Mlp,
            Backend::Heuristic => NeuralBackend::Heuristic,
        }
    }
}

/// Agent hyperparameters; each agent reads the ones it uses.
#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct AgentParamsArg {
    /// Search depth (1-5)
    #[arg(long)]
    max_depth: Option<u32>,
    /// Playouts per move (10-200)
    #[arg(long)]
    simulations: Option<u32>,
    /// States kept per level of beam search (1-10)
    #[arg(long)]
    beam_width: Option<u32>,
    /// UCB1 exploration constant of MCTS (0.5-2.0)
    #[arg(long)]
    exploration_constant: Option<f64>,
    /// Exploration rate
    #[arg(long)]
    epsilon: Option<f32>,
    #[arg(long)]
    learning_rate: Option<f32>,
    #[arg(long)]
    discount_factor: Option<f32>,
    /// Eligibility trace decay of TD-learning
    #[arg(long)]
    lambda: Option<f32>,
    #[arg(long)]
    mutation_rate: Option<f32>,
    #[arg(long)]
    population_size: Option<usize>,
    /// Time budget of one search, in milliseconds
    #[arg(long)]
    time_limit_ms: Option<u64>,
    /// Seed of the agent's own random stream
    #[arg(long)]
    agent_seed: Option<u64>,
    /// Function approximator of neural agents (mlp or heuristic)
    #[arg(long)]
    backend: Option<Backend>,
}

impl AgentParamsArg {
    pub(crate) fn to_params(&self) -> AgentParams {
        AgentParams {
            max_depth: self.max_depth,
            simulations: self.simulations,
            beam_width: self.beam_width,
            exploration_constant: self.exploration_constant,
            epsilon: self.epsilon,
            learning_rate: self.learning_rate,
            discount_factor: self.discount_factor,
            lambda: self.lambda,
            mutation_rate: self.mutation_rate,
            population_size: self.population_size,
            time_limit_ms: self.time_limit_ms,
            seed: self.agent_seed,
            backend: self.backend.map(NeuralBackend::from),
        }
    }
}
