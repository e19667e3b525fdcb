//! Per-iteration combat state and the cast transition
//!
//! A [`CombatState`] is created fresh for every iteration and only mutated
//! through [`CombatState::cast_ability`], which runs one full step: cooldown,
//! damage, side effects, passive damage, procs, logging, and the clock tick.

use crate::ability::{Ability, AbilityId};
use crate::config::CharacterStats;
use crate::error::{Result, SimError};
use crate::simulation::FastRng;
use crate::stats::{DamageSource, HitRecord};
use crate::talents::{Talent, Talents};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;

/// Timers at or below this are treated as expired, absorbing float drift
pub const ACTIVE_EPSILON: f64 = 0.01;

const TIMER_SLOTS: usize = 16;

const INVOKERS_DELIGHT_HASTE: f64 = 0.33;
const FEROCITY_OF_XUEN_MULTIPLIER: f64 = 1.04;
const BONEDUST_BREW_MULTIPLIER: f64 = 1.25;
const ATTENUATION_MULTIPLIER: f64 = 1.2;
const WHITE_TIGER_AP_SCALING: f64 = 0.25;
const WHITE_TIGER_PULSE_INTERVAL: f64 = 2.0;
const RESONANT_FISTS_CHANCE: f64 = 0.10;
const RESONANT_FISTS_AP_SCALING: f64 = 0.1;
const RESONANT_FISTS_MAX_TARGETS: u32 = 5;

/// Timed buffs and debuffs the rotation tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Buff {
    FaelineStomp,
    BonedustBrew,
    WhiteTigerStatue,
    InvokersDelight,
    SecretInfusion,
}

impl TimerKey for Buff {
    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Buff {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Buff::FaelineStomp => "Faeline Stomp",
            Buff::BonedustBrew => "Bonedust Brew",
            Buff::WhiteTigerStatue => "White Tiger Statue",
            Buff::InvokersDelight => "Invoker's Delight",
            Buff::SecretInfusion => "Secret Infusion",
        };
        f.write_str(name)
    }
}

/// Keys that own a slot in a [`Timers`] table
pub trait TimerKey: Copy {
    fn index(self) -> usize;
}

/// Remaining seconds per key. Unseen keys read as 0 (expired).
///
/// Values keep counting down past zero and are never clamped; only
/// [`Timers::is_active`] decides whether a timer is running.
#[derive(Debug, Clone)]
pub struct Timers<K> {
    remaining: [f64; TIMER_SLOTS],
    _key: PhantomData<K>,
}

impl<K: TimerKey> Timers<K> {
    pub fn new() -> Self {
        Self {
            remaining: [0.0; TIMER_SLOTS],
            _key: PhantomData,
        }
    }

    #[inline(always)]
    pub fn remaining(&self, key: K) -> f64 {
        self.remaining[key.index()]
    }

    #[inline(always)]
    pub fn set(&mut self, key: K, seconds: f64) {
        self.remaining[key.index()] = seconds;
    }

    /// Add `delta` seconds; negative values shorten the timer
    #[inline(always)]
    pub fn adjust(&mut self, key: K, delta: f64) {
        self.remaining[key.index()] += delta;
    }

    #[inline(always)]
    pub fn is_active(&self, key: K) -> bool {
        self.remaining(key) > ACTIVE_EPSILON
    }

    /// Count every timer down by `seconds`
    #[inline(always)]
    pub fn tick(&mut self, seconds: f64) {
        for slot in &mut self.remaining {
            *slot -= seconds;
        }
    }
}

impl<K: TimerKey> Default for Timers<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Mutable state of one simulated encounter
#[derive(Debug, Clone)]
pub struct CombatState {
    pub character: CharacterStats,
    pub talents: Talents,

    pub time: f64,
    pub cooldowns: Timers<AbilityId>,
    pub buffs: Timers<Buff>,

    // Bounded counters, only touched by ability side effects
    pub teachings: u8,
    pub empowered_rsks: u8,
    pub first_tft_empower_available: bool,

    // Running statistics
    pub damage: u64,
    pub casts: u32,
    pub history: Vec<HitRecord>,
}

impl CombatState {
    pub fn new(character: CharacterStats, talents: Talents) -> Self {
        Self {
            character,
            talents,
            time: 0.0,
            cooldowns: Timers::new(),
            buffs: Timers::new(),
            teachings: 0,
            empowered_rsks: 0,
            first_tft_empower_available: false,
            damage: 0,
            casts: 0,
            history: Vec::with_capacity(256),
        }
    }

    pub fn haste(&self) -> f64 {
        let invokers_delight = if self.buff_active(Buff::InvokersDelight) {
            INVOKERS_DELIGHT_HASTE
        } else {
            0.0
        };
        self.character.haste + invokers_delight
    }

    pub fn versatility(&self) -> f64 {
        self.character.versatility + self.secret_infusion_bonus()
    }

    pub fn critical_strike(&self) -> f64 {
        self.character.critical_strike
    }

    fn secret_infusion_bonus(&self) -> f64 {
        if !self.buff_active(Buff::SecretInfusion) {
            return 0.0;
        }
        match self.talents.rank(Talent::SecretInfusion) {
            0 => 0.0,
            1 => 0.08,
            _ => 0.15,
        }
    }

    /// Every multiplier shared by ability and passive damage this instant
    pub fn damage_multiplier(&self) -> f64 {
        let mut multiplier = (1.0 + self.versatility()) * (1.0 + self.critical_strike());
        if self.talents.enabled(Talent::FerocityOfXuen) {
            multiplier *= FEROCITY_OF_XUEN_MULTIPLIER;
        }
        if self.buff_active(Buff::BonedustBrew) {
            multiplier *= BONEDUST_BREW_MULTIPLIER;
            if self.talents.enabled(Talent::Attenuation) {
                multiplier *= ATTENUATION_MULTIPLIER;
            }
        }
        multiplier
    }

    /// Unmitigated statue damage per second; zero while no statue is up
    pub fn white_tiger_dps(&self, num_targets: u32) -> f64 {
        if !self.buff_active(Buff::WhiteTigerStatue) {
            return 0.0;
        }
        WHITE_TIGER_AP_SCALING * self.character.attack_power * num_targets as f64
            / WHITE_TIGER_PULSE_INTERVAL
    }

    #[inline(always)]
    pub fn on_cooldown(&self, ability: AbilityId) -> bool {
        self.cooldowns.is_active(ability)
    }

    #[inline(always)]
    pub fn off_cooldown(&self, ability: AbilityId) -> bool {
        !self.on_cooldown(ability)
    }

    #[inline(always)]
    pub fn buff_active(&self, buff: Buff) -> bool {
        self.buffs.is_active(buff)
    }

    #[inline(always)]
    pub fn buff_inactive(&self, buff: Buff) -> bool {
        !self.buff_active(buff)
    }

    /// Off cooldown and talented
    pub fn can_cast(&self, ability: &Ability) -> bool {
        self.off_cooldown(ability.id)
            && ability.required_talent.map_or(true, |t| self.talents.enabled(t))
    }

    pub fn dps(&self) -> f64 {
        if self.time > 0.0 {
            self.damage as f64 / self.time
        } else {
            0.0
        }
    }

    /// Cast `ability` at `num_targets` enemies and advance the clock by its
    /// hasted GCD.
    ///
    /// The caller must only pass castable abilities; anything else is a
    /// resolver bug and aborts the iteration.
    pub fn cast_ability(&mut self, ability: &Ability, num_targets: u32, rng: &mut FastRng) -> Result<()> {
        if self.on_cooldown(ability.id) {
            return Err(SimError::AbilityOnCooldown {
                ability: ability.id,
                remaining: self.cooldowns.remaining(ability.id),
            });
        }
        if let Some(talent) = ability.required_talent {
            if !self.talents.enabled(talent) {
                return Err(SimError::TalentMissing { ability: ability.id, talent });
            }
        }

        let cast_at = self.time;
        self.cooldowns.set(ability.id, ability.hasted_cooldown(self));

        let cast = ability.damage(self, num_targets);
        ability.apply_side_effects(self, num_targets, rng);

        // Haste and multipliers are read after side effects so a buff
        // applied by this cast already covers its own GCD.
        let gcd = ability.gcd / (1.0 + self.haste());
        let multiplier = self.damage_multiplier();
        let weapon = self.character.weapon_dps * gcd * multiplier;
        let statue = self.white_tiger_dps(num_targets) * gcd * multiplier;

        let proc_damage = if self.talents.enabled(Talent::ResonantFists) {
            let swings = u32::from(weapon > 0.0);
            let pulses = if statue > 0.0 { num_targets } else { 0 };
            self.roll_resonant_fists(cast.hits + swings + pulses, num_targets, multiplier, rng)
        } else {
            0.0
        };

        self.record(cast_at, DamageSource::Ability(ability.id), cast.amount, true);
        self.record(cast_at, DamageSource::Weapon, weapon, false);
        self.record(cast_at, DamageSource::WhiteTigerStatue, statue, false);
        self.record(cast_at, DamageSource::ResonantFists, proc_damage, false);
        self.casts += 1;

        tracing::trace!(
            time = cast_at,
            ability = %ability.id,
            damage = cast.amount,
            gcd,
            "cast"
        );

        self.cooldowns.tick(gcd);
        self.buffs.tick(gcd);
        self.time += gcd;
        Ok(())
    }

    /// One independent roll per proc-eligible hit, in the order the hits
    /// were produced
    fn roll_resonant_fists(&self, opportunities: u32, num_targets: u32, multiplier: f64, rng: &mut FastRng) -> f64 {
        let mut procs = 0u32;
        for _ in 0..opportunities {
            if rng.f64() < RESONANT_FISTS_CHANCE {
                procs += 1;
            }
        }
        if procs == 0 {
            return 0.0;
        }
        let rank = f64::from(self.talents.rank(Talent::ResonantFists));
        let targets = num_targets.min(RESONANT_FISTS_MAX_TARGETS) as f64;
        procs as f64 * RESONANT_FISTS_AP_SCALING * rank * self.character.attack_power * targets * multiplier
    }

    /// Append one history entry. Ability casts are always logged, passive
    /// sources only when they dealt damage.
    fn record(&mut self, time: f64, source: DamageSource, amount: f64, always: bool) {
        let amount = amount.round() as u64;
        if amount == 0 && !always {
            return;
        }
        self.damage += amount;
        self.history.push(HitRecord { time, source, amount });
    }
}
