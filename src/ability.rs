//! Ability catalog and the per-ability damage and side-effect rules
//!
//! Every ability shares the same generic damage formula; the handful that
//! behave differently are dispatched on [`AbilityId`] inside
//! [`Ability::damage`] and [`Ability::apply_side_effects`].

use crate::error::{Result, SimError};
use crate::simulation::FastRng;
use crate::state::{Buff, CombatState, TimerKey};
use crate::talents::Talent;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Damage multiplier applied to physical-school abilities
pub const ARMOR_RESISTANCE: f64 = 0.735;

const MAX_TEACHINGS: u8 = 3;
const RSK_RESET_CHANCE: f64 = 0.15;
const RSK_RESET_FAELINE_BONUS: f64 = 0.6;
const FAELINE_BLACKOUT_KICK_TARGETS: u32 = 3;
const SCK_FULL_DAMAGE_TARGETS: u32 = 5;
const EMPOWERED_RSK_REFUND: f64 = 9.0;
const TFT_REARM_COOLDOWN: f64 = 30.0;
const GIFT_OF_THE_CELESTIALS_COOLDOWN: f64 = 60.0;
const TEA_OF_PLENTY_ROLLS: usize = 2;
/// Each Tea of Plenty roll above this grants an extra empowered cast.
/// At zero every roll lands, matching the reference numbers.
const TEA_OF_PLENTY_THRESHOLD: f64 = 0.0;

const FAELINE_STOMP_DURATION: f64 = 30.0;
const BONEDUST_BREW_DURATION: f64 = 10.0;
const WHITE_TIGER_STATUE_DURATION: f64 = 30.0;
const SECRET_INFUSION_DURATION: f64 = 10.0;
const INVOKERS_DELIGHT_DURATION: f64 = 20.0;
const INVOKERS_DELIGHT_GIFT_DURATION: f64 = 8.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbilityId {
    TigerPalm,
    BlackoutKick,
    RisingSunKick,
    SpinningCraneKick,
    ZenPulse,
    ChiBurst,
    FaelineStomp,
    BonedustBrew,
    SummonWhiteTigerStatue,
    InvokeChiJi,
    ThunderFocusTea,
}

impl AbilityId {
    pub const ALL: [AbilityId; 11] = [
        AbilityId::TigerPalm,
        AbilityId::BlackoutKick,
        AbilityId::RisingSunKick,
        AbilityId::SpinningCraneKick,
        AbilityId::ZenPulse,
        AbilityId::ChiBurst,
        AbilityId::FaelineStomp,
        AbilityId::BonedustBrew,
        AbilityId::SummonWhiteTigerStatue,
        AbilityId::InvokeChiJi,
        AbilityId::ThunderFocusTea,
    ];

    pub fn name(self) -> &'static str {
        match self {
            AbilityId::TigerPalm => "Tiger Palm",
            AbilityId::BlackoutKick => "Blackout Kick",
            AbilityId::RisingSunKick => "Rising Sun Kick",
            AbilityId::SpinningCraneKick => "Spinning Crane Kick",
            AbilityId::ZenPulse => "Zen Pulse",
            AbilityId::ChiBurst => "Chi Burst",
            AbilityId::FaelineStomp => "Faeline Stomp",
            AbilityId::BonedustBrew => "Bonedust Brew",
            AbilityId::SummonWhiteTigerStatue => "Summon White Tiger Statue",
            AbilityId::InvokeChiJi => "Invoke Chi-Ji",
            AbilityId::ThunderFocusTea => "Thunder Focus Tea",
        }
    }
}

impl TimerKey for AbilityId {
    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for AbilityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Damage school; only physical damage is reduced by armor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum School {
    Physical,
    Nature,
}

/// Damage produced by one cast, before rounding
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CastDamage {
    pub amount: f64,
    /// Discrete hits landed, used to count proc opportunities
    pub hits: u32,
}

/// Static description of a castable ability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ability {
    pub id: AbilityId,
    pub ap_scaling: f64,
    pub sp_scaling: f64,
    /// Flat percentage adjustment to the base damage
    pub modifier: f64,
    pub cooldown: f64,
    /// `None` hits every target
    pub max_targets: Option<u32>,
    pub school: School,
    /// Cooldown is divided by `1 + haste` when set
    pub haste_flagged: bool,
    pub gcd: f64,
    pub required_talent: Option<Talent>,
}

impl Ability {
    /// Default entry for `id`: a 1.5s GCD, single-target physical ability
    /// with the coefficients of the live game data.
    pub fn base(id: AbilityId) -> Self {
        let generic = Ability {
            id,
            ap_scaling: 0.0,
            sp_scaling: 0.0,
            modifier: 0.0,
            cooldown: 0.0,
            max_targets: Some(1),
            school: School::Physical,
            haste_flagged: false,
            gcd: 1.5,
            required_talent: None,
        };

        match id {
            AbilityId::TigerPalm => Ability { ap_scaling: 0.27027, modifier: 1.0, ..generic },
            AbilityId::BlackoutKick => Ability {
                ap_scaling: 0.847,
                modifier: -0.15,
                cooldown: 3.0,
                haste_flagged: true,
                ..generic
            },
            AbilityId::RisingSunKick => Ability {
                ap_scaling: 1.438,
                modifier: 0.38,
                cooldown: 12.0,
                haste_flagged: true,
                ..generic
            },
            AbilityId::SpinningCraneKick => Ability {
                ap_scaling: 0.4,
                modifier: 1.35,
                max_targets: None,
                ..generic
            },
            AbilityId::ZenPulse => Ability {
                sp_scaling: 1.37816,
                cooldown: 30.0,
                max_targets: None,
                school: School::Nature,
                ..generic
            },
            AbilityId::ChiBurst => Ability {
                sp_scaling: 0.46,
                cooldown: 30.0,
                max_targets: None,
                school: School::Nature,
                ..generic
            },
            AbilityId::FaelineStomp => Ability {
                ap_scaling: 0.4,
                cooldown: 30.0,
                max_targets: Some(5),
                school: School::Nature,
                ..generic
            },
            AbilityId::BonedustBrew => Ability {
                cooldown: 60.0,
                gcd: 1.0,
                required_talent: Some(Talent::BonedustBrew),
                ..generic
            },
            AbilityId::SummonWhiteTigerStatue => Ability {
                cooldown: 120.0,
                gcd: 1.0,
                required_talent: Some(Talent::SummonWhiteTigerStatue),
                ..generic
            },
            AbilityId::InvokeChiJi => Ability {
                cooldown: 180.0,
                gcd: 1.0,
                required_talent: Some(Talent::InvokersDelight),
                ..generic
            },
            AbilityId::ThunderFocusTea => Ability { cooldown: 30.0, gcd: 0.0, ..generic },
        }
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }

    /// Cooldown to put the ability on when it is cast now
    pub fn hasted_cooldown(&self, state: &CombatState) -> f64 {
        if self.haste_flagged {
            self.cooldown / (1.0 + state.haste())
        } else {
            self.cooldown
        }
    }

    /// Target cap in the current state
    pub fn max_targets(&self, state: &CombatState) -> Option<u32> {
        match self.id {
            AbilityId::BlackoutKick if state.buff_active(Buff::FaelineStomp) => {
                Some(FAELINE_BLACKOUT_KICK_TARGETS)
            }
            _ => self.max_targets,
        }
    }

    pub fn targets_hit(&self, state: &CombatState, num_targets: u32) -> u32 {
        match self.max_targets(state) {
            Some(cap) => num_targets.min(cap),
            None => num_targets,
        }
    }

    /// Expected damage of one cast against `num_targets` enemies.
    ///
    /// Critical strike and versatility enter as flat multipliers through
    /// [`CombatState::damage_multiplier`]; nothing here draws from the RNG.
    pub fn damage(&self, state: &CombatState, num_targets: u32) -> CastDamage {
        let character = &state.character;
        let mut base = self.ap_scaling * character.attack_power + self.sp_scaling * character.spell_power;
        base += base * self.modifier;
        if base == 0.0 {
            return CastDamage::default();
        }

        let targets = self.targets_hit(state, num_targets);
        let armor = match self.school {
            School::Physical => ARMOR_RESISTANCE,
            School::Nature => 1.0,
        };
        let mut amount = base * targets as f64 * armor * state.damage_multiplier();
        let mut hits = targets;

        match self.id {
            AbilityId::TigerPalm => {
                if state.buff_active(Buff::FaelineStomp) {
                    amount *= 2.0;
                }
            }
            AbilityId::BlackoutKick => {
                let strikes = 1 + u32::from(state.teachings);
                amount *= strikes as f64;
                hits *= strikes;
            }
            AbilityId::RisingSunKick => {
                if state.talents.enabled(Talent::FastFeet) {
                    amount *= 1.7;
                }
            }
            AbilityId::SpinningCraneKick => {
                if state.talents.enabled(Talent::FastFeet) {
                    amount *= 1.1;
                }
                if num_targets > SCK_FULL_DAMAGE_TARGETS {
                    amount *= (SCK_FULL_DAMAGE_TARGETS as f64 / num_targets as f64).sqrt();
                }
            }
            _ => {}
        }

        CastDamage { amount, hits }
    }

    /// State changes beyond the generic cooldown and damage bookkeeping
    pub fn apply_side_effects(&self, state: &mut CombatState, num_targets: u32, rng: &mut FastRng) {
        match self.id {
            AbilityId::TigerPalm => {
                if state.talents.enabled(Talent::Teachings) {
                    let gained = if state.buff_active(Buff::FaelineStomp) { 2 } else { 1 };
                    state.teachings = (state.teachings + gained).min(MAX_TEACHINGS);
                }
            }
            AbilityId::BlackoutKick => {
                let reset_chance = self.rsk_reset_chance(state, num_targets);
                if rng.f64() < reset_chance {
                    state.cooldowns.set(AbilityId::RisingSunKick, 0.0);
                }
                state.teachings = 0;
            }
            AbilityId::RisingSunKick => {
                if state.empowered_rsks > 0 {
                    state.cooldowns.adjust(self.id, -EMPOWERED_RSK_REFUND);
                    state.first_tft_empower_available = false;
                    state.empowered_rsks -= 1;
                    state.cooldowns.set(AbilityId::ThunderFocusTea, TFT_REARM_COOLDOWN);
                    if state.talents.enabled(Talent::SecretInfusion) {
                        state.buffs.set(Buff::SecretInfusion, SECRET_INFUSION_DURATION);
                    }
                }
            }
            AbilityId::FaelineStomp => state.buffs.set(Buff::FaelineStomp, FAELINE_STOMP_DURATION),
            AbilityId::BonedustBrew => state.buffs.set(Buff::BonedustBrew, BONEDUST_BREW_DURATION),
            AbilityId::SummonWhiteTigerStatue => {
                state.buffs.set(Buff::WhiteTigerStatue, WHITE_TIGER_STATUE_DURATION)
            }
            AbilityId::InvokeChiJi => {
                let gift = state.talents.enabled(Talent::GiftOfTheCelestials);
                if gift {
                    state.cooldowns.set(self.id, GIFT_OF_THE_CELESTIALS_COOLDOWN);
                }
                if state.talents.enabled(Talent::InvokersDelight) {
                    let duration = if gift { INVOKERS_DELIGHT_GIFT_DURATION } else { INVOKERS_DELIGHT_DURATION };
                    state.buffs.set(Buff::InvokersDelight, duration);
                }
            }
            AbilityId::ThunderFocusTea => {
                let mut charges = 1u8;
                if state.talents.enabled(Talent::FocusedThunder) {
                    charges += 1;
                }
                if state.talents.enabled(Talent::TeaOfPlenty) {
                    for _ in 0..TEA_OF_PLENTY_ROLLS {
                        if rng.f64() > TEA_OF_PLENTY_THRESHOLD {
                            charges += 1;
                        }
                    }
                }
                state.first_tft_empower_available = true;
                state.empowered_rsks = state.empowered_rsks.saturating_add(charges);
            }
            AbilityId::SpinningCraneKick | AbilityId::ZenPulse | AbilityId::ChiBurst => {}
        }
    }

    /// Chance that a Blackout Kick resets Rising Sun Kick, from the number
    /// of kicks it lands this cast
    fn rsk_reset_chance(&self, state: &CombatState, num_targets: u32) -> f64 {
        let hits = self.targets_hit(state, num_targets) * (1 + u32::from(state.teachings));
        let mut per_hit = RSK_RESET_CHANCE;
        if state.buff_active(Buff::FaelineStomp) {
            per_hit += RSK_RESET_FAELINE_BONUS;
        }
        1.0 - per_hit.powi(hits as i32)
    }
}

/// Coefficient overrides for one catalog entry, as read from a config file.
///
/// Values must keep every cast's damage non-negative; see
/// [`AbilityOverride::validate`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AbilityOverride {
    #[serde(default)]
    pub ap_scaling: Option<f64>,
    #[serde(default)]
    pub sp_scaling: Option<f64>,
    #[serde(default)]
    pub modifier: Option<f64>,
    #[serde(default)]
    pub cooldown: Option<f64>,
    #[serde(default)]
    pub max_targets: Option<u32>,
    #[serde(default)]
    pub gcd: Option<f64>,
}

impl AbilityOverride {
    pub fn validate(&self, ability: AbilityId) -> Result<()> {
        let invalid = |reason: String| Err(SimError::InvalidOverride { ability, reason });

        for (field, value) in [("ap_scaling", self.ap_scaling), ("sp_scaling", self.sp_scaling)] {
            if let Some(v) = value {
                if v < 0.0 || !v.is_finite() {
                    return invalid(format!("{field} must be a non-negative number, got {v}"));
                }
            }
        }
        if let Some(m) = self.modifier {
            if m < -1.0 || !m.is_finite() {
                return invalid(format!("modifier must be at least -1, got {m}"));
            }
        }
        for (field, value) in [("cooldown", self.cooldown), ("gcd", self.gcd)] {
            if let Some(v) = value {
                if v < 0.0 || !v.is_finite() {
                    return invalid(format!("{field} must be a non-negative number of seconds, got {v}"));
                }
            }
        }
        Ok(())
    }
}

/// The set of abilities a simulation may cast, one entry per [`AbilityId`]
#[derive(Debug, Clone, PartialEq)]
pub struct AbilityCatalog {
    abilities: Vec<Ability>,
}

impl AbilityCatalog {
    pub fn mistweaver() -> Self {
        Self {
            abilities: AbilityId::ALL.into_iter().map(Ability::base).collect(),
        }
    }

    #[inline(always)]
    pub fn get(&self, id: AbilityId) -> &Ability {
        &self.abilities[id as usize]
    }

    /// Replace the entry for `ability.id`
    pub fn with(mut self, ability: Ability) -> Self {
        let slot = ability.id as usize;
        self.abilities[slot] = ability;
        self
    }

    pub fn apply_override(&mut self, id: AbilityId, o: &AbilityOverride) {
        let ability = &mut self.abilities[id as usize];
        if let Some(v) = o.ap_scaling {
            ability.ap_scaling = v;
        }
        if let Some(v) = o.sp_scaling {
            ability.sp_scaling = v;
        }
        if let Some(v) = o.modifier {
            ability.modifier = v;
        }
        if let Some(v) = o.cooldown {
            ability.cooldown = v;
        }
        if let Some(v) = o.max_targets {
            ability.max_targets = Some(v);
        }
        if let Some(v) = o.gcd {
            ability.gcd = v;
        }
    }
}

impl Default for AbilityCatalog {
    fn default() -> Self {
        Self::mistweaver()
    }
}
