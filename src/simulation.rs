//! Iteration runner and Monte-Carlo aggregation
//!
//! One [`Simulation`] runs many independent iterations of a single
//! (strategy, talents, target count) scenario. In the reference mode every
//! iteration continues one shared RNG stream, so results depend only on the
//! seed. The parallel mode gives each iteration its own substream derived
//! from `(seed, iteration index)` instead, which is reproducible too but
//! draws different numbers than the sequential mode.

use crate::ability::AbilityCatalog;
use crate::config::CharacterStats;
use crate::error::{Result, SimError};
use crate::state::CombatState;
use crate::stats::{rank_by_damage, AggregatedStats, IterationResult};
use crate::strategy::Strategy;
use crate::talents::Talents;
use rayon::prelude::*;

/// 64-bit fractional golden-ratio constant for seed mixing
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Consecutive casts allowed without the clock moving
const MAX_STALLED_STEPS: u32 = 64;

/// Fast RNG wrapper for better performance
#[derive(Clone)]
pub struct FastRng {
    inner: fastrand::Rng,
}

impl FastRng {
    #[inline(always)]
    pub fn new(seed: u64) -> Self {
        Self {
            inner: fastrand::Rng::with_seed(seed),
        }
    }

    /// Uniform in `[0, 1)`
    #[inline(always)]
    pub fn f64(&mut self) -> f64 {
        self.inner.f64()
    }
}

/// Seed of the private substream for iteration `index`
pub fn iteration_seed(seed: u64, index: usize) -> u64 {
    seed ^ (index as u64).wrapping_mul(MIXING_CONSTANT)
}

/// Everything one iteration needs besides the RNG
#[derive(Debug, Clone, Copy)]
pub struct Scenario<'a> {
    pub strategy: &'a Strategy,
    pub catalog: &'a AbilityCatalog,
    pub character: CharacterStats,
    pub talents: Talents,
    pub num_targets: u32,
    /// Encounter length in seconds; the last cast may run past it
    pub duration: f64,
}

/// Run a single iteration with a specific RNG
pub fn run_simulation_with_rng(scenario: &Scenario<'_>, rng: &mut FastRng) -> Result<IterationResult> {
    let mut state = CombatState::new(scenario.character, scenario.talents);
    let mut stalled = 0u32;

    while state.time < scenario.duration {
        let ability = scenario.strategy.resolve(&state, scenario.catalog)?;
        let before = state.time;
        state.cast_ability(ability, scenario.num_targets, rng)?;

        if state.time > before {
            stalled = 0;
        } else {
            stalled += 1;
            if stalled > MAX_STALLED_STEPS {
                return Err(SimError::Stalled {
                    strategy: scenario.strategy.name.clone(),
                    time: state.time,
                });
            }
        }
    }

    Ok(state.into())
}

/// Run a single iteration with a specific seed
pub fn run_simulation_with_seed(scenario: &Scenario<'_>, seed: u64) -> Result<IterationResult> {
    let mut rng = FastRng::new(seed);
    run_simulation_with_rng(scenario, &mut rng)
}

/// Run `count` iterations sharing one RNG stream
pub fn run_simulations_sequential(scenario: &Scenario<'_>, count: usize, rng: &mut FastRng) -> Result<Vec<IterationResult>> {
    (0..count)
        .map(|_| run_simulation_with_rng(scenario, rng))
        .collect()
}

/// Run `count` iterations on the rayon pool, one substream per iteration
pub fn run_simulations_parallel(scenario: &Scenario<'_>, count: usize, seed: u64) -> Result<Vec<IterationResult>> {
    (0..count)
        .into_par_iter()
        .map(|i| run_simulation_with_seed(scenario, iteration_seed(seed, i)))
        .collect()
}

/// Run iterations and return aggregated stats
pub fn run_and_aggregate(scenario: &Scenario<'_>, count: usize, seed: u64, parallel: bool) -> Result<AggregatedStats> {
    let results = if parallel {
        run_simulations_parallel(scenario, count, seed)?
    } else {
        run_simulations_sequential(scenario, count, &mut FastRng::new(seed))?
    };

    Ok(AggregatedStats::from_results(&results))
}

/// Many iterations of one scenario and their summary statistics
#[derive(Debug, Clone)]
pub struct Simulation<'a> {
    scenario: Scenario<'a>,
    iteration_count: usize,
    iterations: Vec<IterationResult>,
}

impl<'a> Simulation<'a> {
    pub fn new(scenario: Scenario<'a>, iteration_count: usize) -> Self {
        Self {
            scenario,
            iteration_count,
            iterations: Vec::with_capacity(iteration_count),
        }
    }

    /// Run another batch of iterations, continuing `rng`.
    ///
    /// A fault in any iteration aborts the batch and keeps none of it.
    pub fn run(&mut self, rng: &mut FastRng) -> Result<()> {
        let batch = run_simulations_sequential(&self.scenario, self.iteration_count, rng)?;
        self.finish_batch(batch);
        Ok(())
    }

    /// Like [`Simulation::run`] but spread over the rayon pool
    pub fn run_parallel(&mut self, seed: u64) -> Result<()> {
        let batch = run_simulations_parallel(&self.scenario, self.iteration_count, seed)?;
        self.finish_batch(batch);
        Ok(())
    }

    fn finish_batch(&mut self, batch: Vec<IterationResult>) {
        self.iterations.extend(batch);
        tracing::debug!(
            strategy = %self.scenario.strategy.name,
            targets = self.scenario.num_targets,
            iterations = self.iterations.len(),
            avg_dps = self.average_dps(),
            "simulation batch complete"
        );
    }

    pub fn iterations(&self) -> &[IterationResult] {
        &self.iterations
    }

    pub fn best_iteration(&self) -> Option<&IterationResult> {
        self.iterations.iter().max_by_key(|r| r.damage)
    }

    /// Middle iteration by damage, `sorted[len / 2]`; the upper of the two
    /// middles for even counts
    pub fn median_iteration(&self) -> Option<&IterationResult> {
        let order = rank_by_damage(&self.iterations);
        order.get(order.len() / 2).map(|&i| &self.iterations[i])
    }

    pub fn worst_iteration(&self) -> Option<&IterationResult> {
        self.iterations.iter().min_by_key(|r| r.damage)
    }

    pub fn average_dps(&self) -> f64 {
        if self.iterations.is_empty() {
            return 0.0;
        }
        self.iterations.iter().map(IterationResult::dps).sum::<f64>() / self.iterations.len() as f64
    }

    /// Mean DPS of the `n` highest-DPS iterations
    pub fn average_dps_of_best(&self, n: usize) -> f64 {
        let take = n.min(self.iterations.len());
        if take == 0 {
            return 0.0;
        }
        let mut dps: Vec<f64> = self.iterations.iter().map(IterationResult::dps).collect();
        dps.sort_by(|a, b| b.total_cmp(a));
        dps[..take].iter().sum::<f64>() / take as f64
    }

    pub fn stats(&self) -> AggregatedStats {
        AggregatedStats::from_results(&self.iterations)
    }
}
