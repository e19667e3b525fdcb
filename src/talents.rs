//! Talent identifiers and the per-build talent table

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Talents the engine knows how to model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Talent {
    FerocityOfXuen,
    FastFeet,
    SummonWhiteTigerStatue,
    Teachings,
    GiftOfTheCelestials,
    TeaOfPlenty,
    SecretInfusion,
    InvokersDelight,
    FocusedThunder,
    BonedustBrew,
    Attenuation,
    ResonantFists,
}

impl Talent {
    pub const COUNT: usize = 12;

    pub const ALL: [Talent; Talent::COUNT] = [
        Talent::FerocityOfXuen,
        Talent::FastFeet,
        Talent::SummonWhiteTigerStatue,
        Talent::Teachings,
        Talent::GiftOfTheCelestials,
        Talent::TeaOfPlenty,
        Talent::SecretInfusion,
        Talent::InvokersDelight,
        Talent::FocusedThunder,
        Talent::BonedustBrew,
        Talent::Attenuation,
        Talent::ResonantFists,
    ];

    #[inline(always)]
    fn index(self) -> usize {
        self as usize
    }

    pub fn name(self) -> &'static str {
        match self {
            Talent::FerocityOfXuen => "Ferocity of Xuen",
            Talent::FastFeet => "Fast Feet",
            Talent::SummonWhiteTigerStatue => "Summon White Tiger Statue",
            Talent::Teachings => "Teachings of the Monastery",
            Talent::GiftOfTheCelestials => "Gift of the Celestials",
            Talent::TeaOfPlenty => "Tea of Plenty",
            Talent::SecretInfusion => "Secret Infusion",
            Talent::InvokersDelight => "Invoker's Delight",
            Talent::FocusedThunder => "Focused Thunder",
            Talent::BonedustBrew => "Bonedust Brew",
            Talent::Attenuation => "Attenuation",
            Talent::ResonantFists => "Resonant Fists",
        }
    }
}

impl fmt::Display for Talent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A talent entry in a config file: either `true`/`false` or a rank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TalentSetting {
    Flag(bool),
    Rank(u8),
}

impl TalentSetting {
    pub fn rank(self) -> u8 {
        match self {
            TalentSetting::Flag(enabled) => u8::from(enabled),
            TalentSetting::Rank(rank) => rank,
        }
    }
}

/// Talent ranks for one build. Unset talents are rank 0 (disabled).
///
/// Immutable once handed to a combat state; sweeps build a fresh table per
/// combination with [`Talents::merged`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "HashMap<Talent, TalentSetting>", into = "BTreeMap<Talent, u8>")]
pub struct Talents {
    ranks: [u8; Talent::COUNT],
}

impl Talents {
    pub fn new() -> Self {
        Self::default()
    }

    /// The talents every sweep starts from
    pub fn baseline() -> Self {
        Self::new()
            .with(Talent::FerocityOfXuen, 1)
            .with(Talent::FastFeet, 1)
            .with(Talent::SummonWhiteTigerStatue, 1)
            .with(Talent::Teachings, 1)
            .with(Talent::GiftOfTheCelestials, 1)
    }

    pub fn with(mut self, talent: Talent, rank: u8) -> Self {
        self.set(talent, rank);
        self
    }

    pub fn set(&mut self, talent: Talent, rank: u8) {
        self.ranks[talent.index()] = rank;
    }

    #[inline(always)]
    pub fn rank(&self, talent: Talent) -> u8 {
        self.ranks[talent.index()]
    }

    #[inline(always)]
    pub fn enabled(&self, talent: Talent) -> bool {
        self.rank(talent) > 0
    }

    /// Overlay every talent set in `other` on top of `self`
    pub fn merged(&self, other: &Talents) -> Talents {
        let mut merged = *self;
        for talent in Talent::ALL {
            if other.enabled(talent) {
                merged.set(talent, other.rank(talent));
            }
        }
        merged
    }

    /// Enabled talents with their ranks, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = (Talent, u8)> + '_ {
        Talent::ALL
            .into_iter()
            .filter(|t| self.enabled(*t))
            .map(|t| (t, self.rank(t)))
    }
}

impl From<HashMap<Talent, TalentSetting>> for Talents {
    fn from(map: HashMap<Talent, TalentSetting>) -> Self {
        let mut talents = Talents::new();
        for (talent, setting) in map {
            talents.set(talent, setting.rank());
        }
        talents
    }
}

impl From<Talents> for BTreeMap<Talent, u8> {
    fn from(talents: Talents) -> Self {
        talents.iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_talents_are_disabled() {
        let talents = Talents::new();
        for talent in Talent::ALL {
            assert!(!talents.enabled(talent));
            assert_eq!(talents.rank(talent), 0);
        }
    }

    #[test]
    fn merge_keeps_base_and_overrides_ranks() {
        let base = Talents::baseline().with(Talent::SecretInfusion, 1);
        let extra = Talents::new().with(Talent::SecretInfusion, 2);
        let merged = base.merged(&extra);
        assert!(merged.enabled(Talent::FastFeet));
        assert_eq!(merged.rank(Talent::SecretInfusion), 2);
    }

    #[test]
    fn parses_flags_and_ranks_from_yaml() {
        let yaml = "fast_feet: true\nsecret_infusion: 2\nattenuation: false\n";
        let talents: Talents = serde_yaml::from_str(yaml).unwrap();
        assert!(talents.enabled(Talent::FastFeet));
        assert_eq!(talents.rank(Talent::SecretInfusion), 2);
        assert!(!talents.enabled(Talent::Attenuation));
    }
}
