use std::{collections::BTreeMap, path::PathBuf};

use arena2048_ai::{
    kind::AgentKind,
    session::{Arena, DEFAULT_WINNERS_NEEDED, Standing},
};
use arena2048_engine::SpawnSeed;
use rand::Rng as _;
use serde::Serialize;

use crate::{command::agent_params::AgentParamsArg, util::Output};

#[derive(Default, Debug, Clone, clap::Args)]
pub(crate) struct TournamentArg {
    /// Comma-separated agent kinds; a kind may appear more than once
    #[arg(long, value_delimiter = ',', required = true)]
    agents: Vec<AgentKind>,
    #[command(flatten)]
    params: AgentParamsArg,
    /// Number of rounds
    #[arg(long, default_value_t = 1)]
    games: usize,
    /// Tick budget of one round
    #[arg(long, default_value_t = 5000)]
    max_ticks: u64,
    /// Winners after which a round ends early
    #[arg(long, default_value_t = DEFAULT_WINNERS_NEEDED)]
    winners: usize,
    /// Seed from which the spawn seed of every round is drawn
    #[arg(long)]
    seed: Option<SpawnSeed>,
    /// Output file path (stdout if omitted)
    #[arg(long)]
    output: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct RoundReport {
    round: usize,
    seed: SpawnSeed,
    ticks: u64,
    ranking: Vec<Standing>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct OverallStanding {
    name: String,
    kind: Option<AgentKind>,
    wins: usize,
    podiums: usize,
    reached_2048: usize,
    mean_average_score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct TournamentReport {
    seed: SpawnSeed,
    rounds: Vec<RoundReport>,
    overall: Vec<OverallStanding>,
}

/// Unique combatant names: repeated kinds get `#2`, `#3`, ...
fn combatant_names(agents: &[AgentKind]) -> Vec<String> {
    let mut seen = BTreeMap::<AgentKind, usize>::new();
    agents
        .iter()
        .map(|kind| {
            let count = seen.entry(*kind).or_default();
            *count += 1;
            if *count == 1 {
                kind.tag().to_owned()
            } else {
                format!("{} #{count}", kind.tag())
            }
        })
        .collect()
}

pub(crate) fn run(arg: &TournamentArg) -> anyhow::Result<()> {
    let TournamentArg {
        agents,
        params,
        games,
        max_ticks,
        winners,
        seed,
        output,
    } = arg;
    let params = params.to_params();
    let names = combatant_names(agents);
    let seed = seed.unwrap_or_else(rand::random);
    let mut round_seeds = seed.rng();

    let mut rounds = Vec::with_capacity(*games);
    for round in 1..=*games {
        let round_seed: SpawnSeed = round_seeds.random();
        let mut arena = Arena::new(*max_ticks).with_winners_needed(*winners);
        for (name, kind) in names.iter().zip(agents) {
            arena.add(name.clone(), kind.build(&params), round_seed);
        }

        eprintln!("Round #{round} (seed {round_seed}):");
        let report_every = (*max_ticks / 10).max(1);
        let ranking = arena.run(|arena| {
            if arena.ticks() % report_every == 0 {
                let leader = arena.ranking().into_iter().next();
                if let Some(leader) = leader {
                    eprintln!(
                        "  tick {:>6}: leader {} ({:.0} avg), {} winner(s)",
                        arena.ticks(),
                        leader.name,
                        leader.average_score,
                        arena.winners()
                    );
                }
            }
        });

        eprintln!("  Podium:");
        for standing in ranking.iter().take(3) {
            eprintln!(
                "    {}. {:<22} avg {:>8.1}  best {:>6}  tile {:>5}{}",
                standing.rank,
                standing.name,
                standing.average_score,
                standing.best_score,
                standing.best_tile,
                if standing.reached_2048 { "  2048!" } else { "" }
            );
        }
        rounds.push(RoundReport {
            round,
            seed: round_seed,
            ticks: arena.ticks(),
            ranking,
        });
    }

    let overall = summarize(&names, &rounds);
    eprintln!("Overall:");
    for s in &overall {
        eprintln!(
            "  {:<22} wins {:>3}  podiums {:>3}  2048 {:>3}  mean avg {:>8.1}",
            s.name, s.wins, s.podiums, s.reached_2048, s.mean_average_score
        );
    }

    let report = TournamentReport {
        seed,
        rounds,
        overall,
    };
    Output::save_json(&report, output.clone())?;
    Ok(())
}

/// Totals per combatant over all rounds, best first (by wins, then podiums,
/// then mean of the per-round average scores).
fn summarize(names: &[String], rounds: &[RoundReport]) -> Vec<OverallStanding> {
    let mut overall = names
        .iter()
        .map(|name| OverallStanding {
            name: name.clone(),
            ..OverallStanding::default()
        })
        .collect::<Vec<_>>();
    for round in rounds {
        for standing in &round.ranking {
            let Some(entry) = overall.iter_mut().find(|o| o.name == standing.name) else {
                continue;
            };
            entry.kind = Some(standing.kind);
            entry.wins += usize::from(standing.rank == 1);
            entry.podiums += usize::from(standing.rank <= 3);
            entry.reached_2048 += usize::from(standing.reached_2048);
            entry.mean_average_score += standing.average_score;
        }
    }
    if !rounds.is_empty() {
        #[expect(clippy::cast_precision_loss)]
        let n = rounds.len() as f64;
        for entry in &mut overall {
            entry.mean_average_score /= n;
        }
    }
    overall.sort_by(|a, b| {
        b.wins
            .cmp(&a.wins)
            .then(b.podiums.cmp(&a.podiums))
            .then(b.mean_average_score.total_cmp(&a.mean_average_score))
    });
    overall
}

#[cfg(test)]
mod tests {
    use arena2048_ai::params::AgentParams;

    use super::*;

    #[test]
    fn test_repeated_kinds_get_numbered() {
        let names = combatant_names(&[
            AgentKind::Minimax,
            AgentKind::Random,
            AgentKind::Minimax,
            AgentKind::Minimax,
        ]);
        assert_eq!(names, ["minimax", "random", "minimax #2", "minimax #3"]);
    }

    #[test]
    fn test_summary_orders_by_wins() {
        let names = combatant_names(&[AgentKind::Random, AgentKind::Greedy]);
        let mut arena = Arena::new(20);
        for (name, kind) in names.iter().zip([AgentKind::Random, AgentKind::Greedy]) {
            let agent = kind.build(&AgentParams::default());
            arena.add(name.clone(), agent, SpawnSeed::from_u128(1));
        }
        let ranking = arena.run(|_| {});
        let winner = ranking[0].name.clone();
        let rounds = [RoundReport {
            round: 1,
            seed: SpawnSeed::from_u128(1),
            ticks: arena.ticks(),
            ranking,
        }];
        let overall = summarize(&names, &rounds);
        assert_eq!(overall[0].name, winner);
        assert_eq!(overall[0].wins, 1);
        assert_eq!(overall[1].wins, 0);
        assert!(overall.iter().all(|o| o.podiums == 1 && o.kind.is_some()));
    }
}
