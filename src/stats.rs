//! Per-iteration results and aggregated statistics

use crate::ability::AbilityId;
use crate::state::CombatState;
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use std::fmt;

/// Where a logged damage entry came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DamageSource {
    Ability(AbilityId),
    Weapon,
    WhiteTigerStatue,
    ResonantFists,
}

impl DamageSource {
    /// Directly caused by a cast, as opposed to passive or proc damage
    pub fn is_ability(self) -> bool {
        matches!(self, DamageSource::Ability(_))
    }
}

impl fmt::Display for DamageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DamageSource::Ability(id) => f.write_str(id.name()),
            DamageSource::Weapon => f.write_str("Weapon"),
            DamageSource::WhiteTigerStatue => f.write_str("White Tiger Statue"),
            DamageSource::ResonantFists => f.write_str("Resonant Fists"),
        }
    }
}

impl Serialize for DamageSource {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One history entry, rounded to whole damage when logged
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HitRecord {
    /// Encounter time of the step that produced it
    pub time: f64,
    pub source: DamageSource,
    pub amount: u64,
}

/// Damage attributed to one source over an iteration
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceBreakdown {
    pub source: DamageSource,
    pub damage: u64,
    /// Casts for abilities, logged steps for passive sources
    pub count: u32,
    pub dps: f64,
}

/// Frozen outcome of one iteration
#[derive(Debug, Clone, Default, Serialize)]
pub struct IterationResult {
    pub damage: u64,
    /// Actual elapsed time, including the final step's overshoot
    pub time: f64,
    pub casts: u32,
    #[serde(skip)]
    pub history: Vec<HitRecord>,
}

impl IterationResult {
    pub fn dps(&self) -> f64 {
        if self.time > 0.0 {
            self.damage as f64 / self.time
        } else {
            0.0
        }
    }

    /// Abilities in the order they were cast
    pub fn cast_sequence(&self) -> Vec<AbilityId> {
        self.history
            .iter()
            .filter_map(|h| match h.source {
                DamageSource::Ability(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn ability_damage(&self) -> u64 {
        self.history
            .iter()
            .filter(|h| h.source.is_ability())
            .map(|h| h.amount)
            .sum()
    }

    pub fn passive_damage(&self) -> u64 {
        self.damage - self.ability_damage()
    }

    /// Damage per source, highest first
    pub fn breakdown(&self) -> Vec<SourceBreakdown> {
        let mut by_source: HashMap<DamageSource, (u64, u32)> = HashMap::new();
        for hit in &self.history {
            let entry = by_source.entry(hit.source).or_default();
            entry.0 += hit.amount;
            entry.1 += 1;
        }

        let mut breakdown: Vec<SourceBreakdown> = by_source
            .into_iter()
            .map(|(source, (damage, count))| SourceBreakdown {
                source,
                damage,
                count,
                dps: if self.time > 0.0 { damage as f64 / self.time } else { 0.0 },
            })
            .collect();
        breakdown.sort_by(|a, b| {
            b.damage
                .cmp(&a.damage)
                .then_with(|| a.source.to_string().cmp(&b.source.to_string()))
        });
        breakdown
    }
}

impl From<CombatState> for IterationResult {
    fn from(state: CombatState) -> Self {
        Self {
            damage: state.damage,
            time: state.time,
            casts: state.casts,
            history: state.history,
        }
    }
}

/// Indices of `results` ordered by total damage, lowest first
pub fn rank_by_damage(results: &[IterationResult]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..results.len()).collect();
    order.sort_by_key(|&i| results[i].damage);
    order
}

/// Aggregated statistics from multiple iterations
#[derive(Debug, Clone, Default, Serialize)]
pub struct AggregatedStats {
    pub iterations: usize,
    pub avg_dps: f64,
    pub std_dps: f64,
    pub min_dps: f64,
    pub max_dps: f64,
    pub avg_damage: f64,
    pub avg_time: f64,
    /// DPS of the highest-damage iteration
    pub best_dps: f64,
    /// DPS of the middle iteration by damage (`sorted[len / 2]`)
    pub median_dps: f64,
    /// DPS of the lowest-damage iteration
    pub worst_dps: f64,
}

impl AggregatedStats {
    pub fn from_results(results: &[IterationResult]) -> Self {
        let n = results.len();
        if n == 0 {
            return Self::default();
        }
        let count = n as f64;

        let dps: Vec<f64> = results.iter().map(IterationResult::dps).collect();
        let avg_dps = dps.iter().sum::<f64>() / count;
        let variance = dps.iter().map(|d| (d - avg_dps).powi(2)).sum::<f64>() / count;
        let order = rank_by_damage(results);

        Self {
            iterations: n,
            avg_dps,
            std_dps: variance.sqrt(),
            min_dps: dps.iter().copied().fold(f64::INFINITY, f64::min),
            max_dps: dps.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            avg_damage: results.iter().map(|r| r.damage as f64).sum::<f64>() / count,
            avg_time: results.iter().map(|r| r.time).sum::<f64>() / count,
            best_dps: dps[order[n - 1]],
            median_dps: dps[order[n / 2]],
            worst_dps: dps[order[0]],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(damage: u64, time: f64) -> IterationResult {
        IterationResult {
            damage,
            time,
            casts: 1,
            history: vec![HitRecord {
                time: 0.0,
                source: DamageSource::Ability(AbilityId::TigerPalm),
                amount: damage,
            }],
        }
    }

    #[test]
    fn aggregates_best_median_worst() {
        let results = vec![result(300, 10.0), result(100, 10.0), result(200, 10.0), result(400, 10.0)];
        let stats = AggregatedStats::from_results(&results);
        assert_eq!(stats.iterations, 4);
        assert_eq!(stats.avg_dps, 25.0);
        assert_eq!(stats.best_dps, 40.0);
        assert_eq!(stats.worst_dps, 10.0);
        // Upper middle for even counts
        assert_eq!(stats.median_dps, 30.0);
    }

    #[test]
    fn empty_results_aggregate_to_zero() {
        let stats = AggregatedStats::from_results(&[]);
        assert_eq!(stats.iterations, 0);
        assert_eq!(stats.avg_dps, 0.0);
    }

    #[test]
    fn breakdown_groups_by_source() {
        let mut r = result(100, 4.0);
        r.history.push(HitRecord { time: 1.5, source: DamageSource::Weapon, amount: 40 });
        r.history.push(HitRecord {
            time: 1.5,
            source: DamageSource::Ability(AbilityId::TigerPalm),
            amount: 60,
        });
        r.damage = 200;

        let breakdown = r.breakdown();
        assert_eq!(breakdown[0].source, DamageSource::Ability(AbilityId::TigerPalm));
        assert_eq!(breakdown[0].damage, 160);
        assert_eq!(breakdown[0].count, 2);
        assert_eq!(breakdown[1].dps, 10.0);
        assert_eq!(r.passive_damage(), 40);
        assert_eq!(r.cast_sequence(), vec![AbilityId::TigerPalm, AbilityId::TigerPalm]);
    }
}
