//! Priority-list strategies and the decision resolver
//!
//! A strategy is plain data: an ordered list of abilities, each optionally
//! guarded by a [`Condition`]. The resolver picks the first entry that is
//! castable right now. It never mutates state or draws random numbers, so
//! the selected sequence only changes with the seed when a condition reads
//! state that a proc has changed.

use crate::ability::{Ability, AbilityCatalog, AbilityId};
use crate::error::{Result, SimError};
use crate::state::{Buff, CombatState};
use crate::talents::Talent;
use serde::{Deserialize, Serialize};

/// Eligibility predicate over the combat state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Condition {
    BuffActive(Buff),
    BuffInactive(Buff),
    TeachingsAtMost(u8),
    /// An empowered Rising Sun Kick from the latest Thunder Focus Tea is
    /// still unspent
    TftEmpowerAvailable,
    Talent(Talent),
    All(Vec<Condition>),
    Any(Vec<Condition>),
    Not(Box<Condition>),
}

impl Condition {
    pub fn holds(&self, state: &CombatState) -> bool {
        match self {
            Condition::BuffActive(buff) => state.buff_active(*buff),
            Condition::BuffInactive(buff) => state.buff_inactive(*buff),
            Condition::TeachingsAtMost(n) => state.teachings <= *n,
            Condition::TftEmpowerAvailable => state.first_tft_empower_available,
            Condition::Talent(talent) => state.talents.enabled(*talent),
            Condition::All(conditions) => conditions.iter().all(|c| c.holds(state)),
            Condition::Any(conditions) => conditions.iter().any(|c| c.holds(state)),
            Condition::Not(inner) => !inner.holds(state),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyEntry {
    pub ability: AbilityId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub when: Option<Condition>,
}

/// Named priority list. The last entry should always be castable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Strategy {
    pub name: String,
    pub entries: Vec<StrategyEntry>,
}

impl Strategy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entries: Vec::new(),
        }
    }

    /// Append an unconditional entry
    pub fn then(mut self, ability: AbilityId) -> Self {
        self.entries.push(StrategyEntry { ability, when: None });
        self
    }

    /// Append an entry guarded by `condition`
    pub fn then_if(mut self, ability: AbilityId, condition: Condition) -> Self {
        self.entries.push(StrategyEntry {
            ability,
            when: Some(condition),
        });
        self
    }

    /// First entry that is off cooldown, talented, and whose condition holds
    pub fn resolve<'c>(&self, state: &CombatState, catalog: &'c AbilityCatalog) -> Result<&'c Ability> {
        self.entries
            .iter()
            .find_map(|entry| {
                let ability = catalog.get(entry.ability);
                let eligible = state.can_cast(ability)
                    && entry.when.as_ref().map_or(true, |c| c.holds(state));
                eligible.then_some(ability)
            })
            .ok_or_else(|| SimError::NoEligibleAbility {
                strategy: self.name.clone(),
                time: state.time,
            })
    }

    /// Single-target priority
    pub fn single_target() -> Self {
        Self::new("ST")
            .then(AbilityId::ThunderFocusTea)
            .then(AbilityId::SummonWhiteTigerStatue)
            .then_if(AbilityId::FaelineStomp, Condition::BuffInactive(Buff::FaelineStomp))
            .then(AbilityId::InvokeChiJi)
            .then(AbilityId::BonedustBrew)
            .then(AbilityId::RisingSunKick)
            .then_if(AbilityId::TigerPalm, Condition::TeachingsAtMost(1))
            .then(AbilityId::BlackoutKick)
    }

    /// Single-target priority that saves Rising Sun Kick for Secret Infusion
    pub fn single_target_infusion() -> Self {
        Self::new("STI")
            .then(AbilityId::ThunderFocusTea)
            .then(AbilityId::SummonWhiteTigerStatue)
            .then_if(AbilityId::FaelineStomp, Condition::BuffInactive(Buff::FaelineStomp))
            .then(AbilityId::InvokeChiJi)
            .then(AbilityId::BonedustBrew)
            .then_if(AbilityId::RisingSunKick, infusion_window())
            .then_if(AbilityId::TigerPalm, Condition::TeachingsAtMost(1))
            .then(AbilityId::BlackoutKick)
    }

    /// AoE priority
    pub fn many_target() -> Self {
        Self::new("MT")
            .then(AbilityId::ThunderFocusTea)
            .then(AbilityId::SummonWhiteTigerStatue)
            .then(AbilityId::InvokeChiJi)
            .then(AbilityId::BonedustBrew)
            .then(AbilityId::ZenPulse)
            .then(AbilityId::SpinningCraneKick)
    }

    /// AoE priority with the Secret Infusion Rising Sun Kick weave
    pub fn many_target_infusion() -> Self {
        Self::new("MTI")
            .then(AbilityId::ThunderFocusTea)
            .then(AbilityId::SummonWhiteTigerStatue)
            .then(AbilityId::InvokeChiJi)
            .then(AbilityId::BonedustBrew)
            .then_if(AbilityId::RisingSunKick, infusion_window())
            .then(AbilityId::ZenPulse)
            .then(AbilityId::SpinningCraneKick)
    }

    pub fn builtins() -> Vec<Strategy> {
        vec![
            Self::single_target(),
            Self::single_target_infusion(),
            Self::many_target(),
            Self::many_target_infusion(),
        ]
    }
}

fn infusion_window() -> Condition {
    Condition::All(vec![
        Condition::TftEmpowerAvailable,
        Condition::Talent(Talent::SecretInfusion),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CharacterStats;
    use crate::talents::Talents;

    fn state() -> CombatState {
        CombatState::new(CharacterStats::default(), Talents::baseline())
    }

    #[test]
    fn picks_first_castable_entry() {
        let catalog = AbilityCatalog::mistweaver();
        let strategy = Strategy::new("t")
            .then(AbilityId::RisingSunKick)
            .then(AbilityId::TigerPalm);
        let mut s = state();
        assert_eq!(strategy.resolve(&s, &catalog).unwrap().id, AbilityId::RisingSunKick);
        s.cooldowns.set(AbilityId::RisingSunKick, 5.0);
        assert_eq!(strategy.resolve(&s, &catalog).unwrap().id, AbilityId::TigerPalm);
    }

    #[test]
    fn skips_untalented_and_guarded_entries() {
        let catalog = AbilityCatalog::mistweaver();
        let strategy = Strategy::new("t")
            .then(AbilityId::BonedustBrew)
            .then_if(AbilityId::TigerPalm, Condition::TeachingsAtMost(1))
            .then(AbilityId::BlackoutKick);
        let mut s = state();
        s.teachings = 2;
        assert_eq!(strategy.resolve(&s, &catalog).unwrap().id, AbilityId::BlackoutKick);
    }

    #[test]
    fn no_eligible_entry_is_a_selection_fault() {
        let catalog = AbilityCatalog::mistweaver();
        let strategy = Strategy::new("broken").then(AbilityId::RisingSunKick);
        let mut s = state();
        s.cooldowns.set(AbilityId::RisingSunKick, 1.0);
        let err = strategy.resolve(&s, &catalog).unwrap_err();
        assert!(matches!(err, SimError::NoEligibleAbility { ref strategy, .. } if strategy == "broken"));
    }

    #[test]
    fn combinators_evaluate_against_state() {
        let mut s = state();
        s.buffs.set(Buff::FaelineStomp, 3.0);
        let cond = Condition::All(vec![
            Condition::BuffActive(Buff::FaelineStomp),
            Condition::Not(Box::new(Condition::TftEmpowerAvailable)),
            Condition::Any(vec![
                Condition::Talent(Talent::Attenuation),
                Condition::Talent(Talent::FastFeet),
            ]),
        ]);
        assert!(cond.holds(&s));
        s.first_tft_empower_available = true;
        assert!(!cond.holds(&s));
    }

    #[test]
    fn strategies_parse_from_yaml() {
        let yaml = "
name: custom
entries:
  - ability: thunder_focus_tea
  - ability: faeline_stomp
    when:
      buff_inactive: faeline_stomp
  - ability: rising_sun_kick
    when:
      all: [tft_empower_available, { talent: secret_infusion }]
  - ability: tiger_palm
";
        let strategy: Strategy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(strategy.entries.len(), 4);
        assert_eq!(strategy.entries[2].when, Some(infusion_window()));
        assert_eq!(strategy.entries[3].when, None);
    }

    #[test]
    fn builtins_survive_a_json_round_trip() {
        for strategy in Strategy::builtins() {
            let json = serde_json::to_string(&strategy).unwrap();
            let back: Strategy = serde_json::from_str(&json).unwrap();
            assert_eq!(back, strategy);
        }
    }
}
