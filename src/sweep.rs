//! Talent sweep: every candidate combination against the strategies suited
//! to a target count, ranked by mean DPS

use crate::config::SimConfig;
use crate::error::Result;
use crate::simulation::{run_simulations_sequential, FastRng, Scenario};
use crate::stats::{AggregatedStats, IterationResult};
use crate::strategy::Strategy;
use crate::talents::{Talent, Talents};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// One optional pick in a sweep. Rank choices of the same talent merge into
/// the highest rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TalentChoice {
    SecretInfusion,
    SecretInfusion2,
    InvokersDelight,
    TeaOfPlenty,
    FocusedThunder,
    BonedustBrew,
    Attenuation,
}

impl TalentChoice {
    pub const DEFAULT_CANDIDATES: [TalentChoice; 7] = [
        TalentChoice::SecretInfusion,
        TalentChoice::SecretInfusion2,
        TalentChoice::InvokersDelight,
        TalentChoice::TeaOfPlenty,
        TalentChoice::FocusedThunder,
        TalentChoice::BonedustBrew,
        TalentChoice::Attenuation,
    ];

    pub fn talent(self) -> Talent {
        match self {
            TalentChoice::SecretInfusion | TalentChoice::SecretInfusion2 => Talent::SecretInfusion,
            TalentChoice::InvokersDelight => Talent::InvokersDelight,
            TalentChoice::TeaOfPlenty => Talent::TeaOfPlenty,
            TalentChoice::FocusedThunder => Talent::FocusedThunder,
            TalentChoice::BonedustBrew => Talent::BonedustBrew,
            TalentChoice::Attenuation => Talent::Attenuation,
        }
    }

    pub fn rank(self) -> u8 {
        match self {
            TalentChoice::SecretInfusion2 => 2,
            _ => 1,
        }
    }

    /// The choice that must be in the same combination
    pub fn requires(self) -> Option<TalentChoice> {
        match self {
            TalentChoice::Attenuation => Some(TalentChoice::BonedustBrew),
            TalentChoice::SecretInfusion2 => Some(TalentChoice::SecretInfusion),
            TalentChoice::InvokersDelight => Some(TalentChoice::SecretInfusion2),
            _ => None,
        }
    }
}

impl fmt::Display for TalentChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TalentChoice::SecretInfusion2 => f.write_str("Secret Infusion (2)"),
            other => f.write_str(other.talent().name()),
        }
    }
}

/// A talent combination and the table it produces once merged
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TalentCombo {
    pub choices: Vec<TalentChoice>,
    /// Only the swept talents, not the base build
    pub talents: Talents,
}

impl TalentCombo {
    fn from_choices(choices: Vec<TalentChoice>) -> Self {
        let mut talents = Talents::new();
        for choice in &choices {
            let talent = choice.talent();
            if choice.rank() > talents.rank(talent) {
                talents.set(talent, choice.rank());
            }
        }
        Self { choices, talents }
    }

    pub fn satisfies_requirements(&self) -> bool {
        self.choices
            .iter()
            .all(|c| c.requires().map_or(true, |r| self.choices.contains(&r)))
    }

    pub fn label(&self) -> String {
        self.choices
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(" + ")
    }
}

/// Every `size`-subset of `candidates` that satisfies the dependency rules,
/// keeping the first combination for each distinct talent table
pub fn talent_combinations(candidates: &[TalentChoice], size: usize) -> Vec<TalentCombo> {
    let mut seen = HashSet::new();
    let mut combos = Vec::new();

    for indices in index_combinations(candidates.len(), size) {
        let combo = TalentCombo::from_choices(indices.iter().map(|&i| candidates[i]).collect());
        if combo.satisfies_requirements() && seen.insert(combo.talents) {
            combos.push(combo);
        }
    }

    combos
}

/// Lexicographic `k`-combinations of `0..n`
fn index_combinations(n: usize, k: usize) -> Vec<Vec<usize>> {
    if k > n {
        return Vec::new();
    }

    let mut out = Vec::new();
    let mut current: Vec<usize> = (0..k).collect();
    loop {
        out.push(current.clone());

        // Rightmost position that can still move
        let Some(pos) = (0..k).rev().find(|&i| current[i] < n - k + i) else {
            return out;
        };
        current[pos] += 1;
        for i in pos + 1..k {
            current[i] = current[i - 1] + 1;
        }
    }
}

/// Names of the strategies worth sweeping at a target count
pub fn strategies_for_targets(num_targets: u32) -> &'static [&'static str] {
    match num_targets {
        0..=2 => &["ST"],
        3 => &["ST", "STI"],
        _ => &["MTI"],
    }
}

/// One (strategy, talent combination) entry of a sweep
#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub num_targets: u32,
    pub strategy: String,
    pub combo: TalentCombo,
    /// Base build with the combination merged in
    pub talents: Talents,
    pub stats: AggregatedStats,
    pub best: IterationResult,
}

/// Sweep all configured combinations at one target count.
///
/// Every entry replays the same seeded stream, so the ranking does not
/// depend on `parallel` or on the order entries finish in.
pub fn run_sweep(config: &SimConfig, num_targets: u32, seed: u64, parallel: bool) -> Result<Vec<SweepResult>> {
    let catalog = config.catalog();
    let base = config.talents();
    let combos = talent_combinations(&config.sweep.candidates, config.sweep.combo_size);
    let strategies = strategies_for_targets(num_targets)
        .iter()
        .map(|name| config.strategy(name))
        .collect::<Result<Vec<Strategy>>>()?;

    let jobs: Vec<(&Strategy, &TalentCombo)> = strategies
        .iter()
        .flat_map(|s| combos.iter().map(move |c| (s, c)))
        .collect();

    let run_one = |(strategy, combo): (&Strategy, &TalentCombo)| -> Result<SweepResult> {
        let talents = base.merged(&combo.talents);
        let scenario = Scenario {
            strategy,
            catalog: &catalog,
            character: config.character,
            talents,
            num_targets,
            duration: config.encounter.duration,
        };
        let mut rng = FastRng::new(seed);
        let mut results = run_simulations_sequential(&scenario, config.encounter.iterations, &mut rng)?;
        let stats = AggregatedStats::from_results(&results);

        tracing::debug!(
            targets = num_targets,
            strategy = %strategy.name,
            talents = %combo.label(),
            avg_dps = stats.avg_dps,
            "sweep entry complete"
        );

        let best_index = results
            .iter()
            .enumerate()
            .max_by_key(|(_, r)| r.damage)
            .map(|(i, _)| i)
            .unwrap_or_default();
        let best = if results.is_empty() {
            IterationResult::default()
        } else {
            results.swap_remove(best_index)
        };

        Ok(SweepResult {
            num_targets,
            strategy: strategy.name.clone(),
            combo: combo.clone(),
            talents,
            stats,
            best,
        })
    };

    let mut ranked = if parallel {
        jobs.into_par_iter().map(run_one).collect::<Result<Vec<_>>>()?
    } else {
        jobs.into_iter().map(run_one).collect::<Result<Vec<_>>>()?
    };
    ranked.sort_by(|a, b| b.stats.avg_dps.total_cmp(&a.stats.avg_dps));
    Ok(ranked)
}
