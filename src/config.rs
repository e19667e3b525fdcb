//! Configuration structures for loading simulation YAML/JSON files
//!
//! Every section is optional; a missing file section falls back to the
//! character sheet and encounter the rotation was tuned against.

use crate::ability::{AbilityCatalog, AbilityId, AbilityOverride};
use crate::error::{Result, SimError};
use crate::strategy::Strategy;
use crate::sweep::TalentChoice;
use crate::talents::Talents;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// Character sheet. Secondary stats are fractions (0.1182 = 11.82%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterStats {
    pub attack_power: f64,
    pub spell_power: f64,
    pub weapon_dps: f64,
    pub versatility: f64,
    pub haste: f64,
    pub critical_strike: f64,
}

impl Default for CharacterStats {
    fn default() -> Self {
        Self {
            attack_power: 6764.0,
            spell_power: 6504.0,
            weapon_dps: 1582.24,
            versatility: 0.0998,
            haste: 0.1182,
            critical_strike: 0.1508,
        }
    }
}

/// Encounter shape shared by every simulation in a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncounterConfig {
    /// Seconds per iteration
    pub duration: f64,
    pub iterations: usize,
    /// Random when absent
    pub seed: Option<u64>,
    pub targets: Vec<u32>,
}

impl Default for EncounterConfig {
    fn default() -> Self {
        Self {
            duration: 120.0,
            iterations: 100,
            seed: None,
            targets: vec![1, 2, 3, 4, 5],
        }
    }
}

impl EncounterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.duration <= 0.0 || !self.duration.is_finite() {
            return Err(SimError::InvalidEncounter(format!(
                "duration must be a positive number of seconds, got {}",
                self.duration
            )));
        }
        if self.iterations == 0 {
            return Err(SimError::InvalidEncounter("iterations must be at least 1".into()));
        }
        if self.targets.is_empty() || self.targets.contains(&0) {
            return Err(SimError::InvalidEncounter(format!(
                "target counts must be positive, got {:?}",
                self.targets
            )));
        }
        Ok(())
    }

    /// Configured seed, or a fresh random one
    pub fn resolve_seed(&self) -> u64 {
        self.seed.unwrap_or_else(rand::random::<u64>)
    }
}

/// Talent sweep settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    pub candidates: Vec<TalentChoice>,
    pub combo_size: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            candidates: TalentChoice::DEFAULT_CANDIDATES.to_vec(),
            combo_size: 4,
        }
    }
}

/// Full simulation configuration loaded from YAML/JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub character: CharacterStats,
    /// Talents for single-strategy runs and the base of every sweep build.
    /// Falls back to [`Talents::baseline`] when omitted.
    #[serde(default)]
    pub talents: Option<Talents>,
    #[serde(default)]
    pub encounter: EncounterConfig,
    /// Extra strategies; a name matching a built-in replaces it
    #[serde(default)]
    pub strategies: Vec<Strategy>,
    #[serde(default)]
    pub abilities: BTreeMap<AbilityId, AbilityOverride>,
    #[serde(default)]
    pub sweep: SweepConfig,
}

impl SimConfig {
    /// Load a configuration file; `.json` files are parsed as JSON,
    /// anything else as YAML
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let path_str = path.as_ref().to_string_lossy().to_lowercase();

        let config: SimConfig = if path_str.ends_with(".json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Encounter bounds and ability overrides
    pub fn validate(&self) -> Result<()> {
        self.encounter.validate()?;
        for (id, o) in &self.abilities {
            o.validate(*id)?;
        }
        Ok(())
    }

    pub fn talents(&self) -> Talents {
        self.talents.unwrap_or_else(Talents::baseline)
    }

    /// The ability catalog with this config's coefficient overrides applied
    pub fn catalog(&self) -> AbilityCatalog {
        let mut catalog = AbilityCatalog::mistweaver();
        for (id, o) in &self.abilities {
            catalog.apply_override(*id, o);
        }
        catalog
    }

    /// Built-in strategies followed by the configured ones
    pub fn strategies(&self) -> Vec<Strategy> {
        let mut strategies = Strategy::builtins();
        for custom in &self.strategies {
            match strategies.iter_mut().find(|s| s.name == custom.name) {
                Some(existing) => *existing = custom.clone(),
                None => strategies.push(custom.clone()),
            }
        }
        strategies
    }

    pub fn strategy(&self, name: &str) -> Result<Strategy> {
        self.strategies()
            .into_iter()
            .find(|s| s.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| SimError::UnknownStrategy(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::talents::Talent;

    #[test]
    fn empty_yaml_uses_defaults() {
        let config: SimConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.character, CharacterStats::default());
        assert_eq!(config.encounter, EncounterConfig::default());
        assert_eq!(config.talents(), Talents::baseline());
        assert_eq!(config.strategies().len(), Strategy::builtins().len());
    }

    #[test]
    fn partial_sections_keep_remaining_defaults() {
        let yaml = "
character:
  haste: 0.2
encounter:
  duration: 60
  seed: 7
talents:
  fast_feet: true
  secret_infusion: 2
abilities:
  rising_sun_kick:
    cooldown: 10
";
        let config: SimConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.character.haste, 0.2);
        assert_eq!(config.character.attack_power, 6764.0);
        assert_eq!(config.encounter.duration, 60.0);
        assert_eq!(config.encounter.iterations, 100);
        assert_eq!(config.encounter.resolve_seed(), 7);
        assert_eq!(config.talents().rank(Talent::SecretInfusion), 2);
        assert!(!config.talents().enabled(Talent::Teachings));
        assert_eq!(config.catalog().get(AbilityId::RisingSunKick).cooldown, 10.0);
    }

    #[test]
    fn invalid_encounters_are_rejected() {
        let zero_targets = EncounterConfig { targets: vec![0], ..EncounterConfig::default() };
        assert!(zero_targets.validate().is_err());
        let no_iterations = EncounterConfig { iterations: 0, ..EncounterConfig::default() };
        assert!(no_iterations.validate().is_err());
        let negative = EncounterConfig { duration: -1.0, ..EncounterConfig::default() };
        assert!(negative.validate().is_err());
    }

    #[test]
    fn damage_flipping_overrides_are_rejected() {
        let yaml = "
abilities:
  tiger_palm:
    modifier: -1.5
";
        let config: SimConfig = serde_yaml::from_str(yaml).unwrap();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, SimError::InvalidOverride { ability: AbilityId::TigerPalm, .. }));

        let negative_scaling: SimConfig =
            serde_json::from_str(r#"{"abilities": {"zen_pulse": {"sp_scaling": -0.2}}}"#).unwrap();
        assert!(negative_scaling.validate().is_err());
        assert!(SimConfig::from_json(r#"{"abilities": {"zen_pulse": {"sp_scaling": -0.2}}}"#).is_err());

        let full_cancel: SimConfig = serde_yaml::from_str("abilities: {tiger_palm: {modifier: -1}}").unwrap();
        assert!(full_cancel.validate().is_ok());
    }

    #[test]
    fn unknown_strategy_is_an_error() {
        let config = SimConfig::default();
        assert!(matches!(config.strategy("nope"), Err(SimError::UnknownStrategy(_))));
        assert!(config.strategy("st").is_ok());
    }
}
