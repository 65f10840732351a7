use std::path::Path;

use anyhow::{Context, bail};
use arena2048_ai::{
    any_agent::AnyAgent, kind::AgentKind, params::AgentParams, snapshot::AgentSnapshot,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::util;

/// A trained agent as saved by `arena2048 train`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentModel {
    pub name: String,
    pub kind: AgentKind,
    pub trained_at: DateTime<Utc>,
    /// Training episodes over all runs that produced this model
    pub episodes: usize,
    pub best_score: u64,
    pub mean_score: f64,
    pub params: AgentParams,
    pub snapshot: AgentSnapshot,
}

impl AgentModel {
    pub fn open<P>(path: P) -> anyhow::Result<Self>
    where
        P: AsRef<Path>,
    {
        util::read_json_file("agent model", path)
    }

    /// Rebuilds the agent with the saved parameters, `overrides` applied on
    /// top, and loads the learned state.
    pub fn build_agent(&self, overrides: &AgentParams) -> anyhow::Result<AnyAgent> {
        let params = self.params.merged_with(overrides);
        let mut agent = self.kind.build(&params);
        agent
            .restore(&self.snapshot)
            .with_context(|| format!("Failed to load model `{}`", self.name))?;
        Ok(agent)
    }
}

/// Builds the agent a command asked for: from `--model` if given (checked
/// against `--agent`), else a fresh agent of `--agent`.
pub fn load_agent(
    kind: Option<AgentKind>,
    model_path: Option<&Path>,
    params: &AgentParams,
) -> anyhow::Result<(AnyAgent, Option<AgentModel>)> {
    let Some(path) = model_path else {
        let Some(kind) = kind else {
            bail!("either --agent or --model is required");
        };
        return Ok((kind.build(params), None));
    };

    let model = AgentModel::open(path)?;
    if let Some(kind) = kind
        && kind != model.kind
    {
        bail!(
            "{} holds a {} model, not {kind}",
            path.display(),
            model.kind
        );
    }
    let agent = model.build_agent(params)?;
    Ok((agent, Some(model)))
}
