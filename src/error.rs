//! Error type shared by the engine, the configuration loader and the sweep

use crate::ability::AbilityId;
use crate::talents::Talent;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimError {
    /// The strategy had no castable entry at this point of the encounter.
    #[error("strategy '{strategy}' has no eligible ability at {time:.2}s")]
    NoEligibleAbility { strategy: String, time: f64 },

    #[error("cannot cast {ability} while on cooldown ({remaining:.2}s remaining)")]
    AbilityOnCooldown { ability: AbilityId, remaining: f64 },

    #[error("cannot cast {ability} without the {talent} talent")]
    TalentMissing { ability: AbilityId, talent: Talent },

    /// Only zero-GCD abilities were cast for too many consecutive steps.
    #[error("strategy '{strategy}' stopped advancing time at {time:.2}s")]
    Stalled { strategy: String, time: f64 },

    #[error("unknown strategy: {0}")]
    UnknownStrategy(String),

    #[error("invalid encounter: {0}")]
    InvalidEncounter(String),

    #[error("invalid override for {ability}: {reason}")]
    InvalidOverride { ability: AbilityId, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SimError>;
