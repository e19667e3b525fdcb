//! Monte-Carlo rotation simulator for a Mistweaver Monk damage rotation.
//!
//! A [`state::CombatState`] is advanced one global cooldown at a time by
//! casting whatever a [`strategy::Strategy`] picks from the
//! [`ability::AbilityCatalog`]. [`simulation`] repeats that over many seeded
//! iterations and [`sweep`] does it for every candidate talent build.

pub mod ability;
pub mod config;
pub mod error;
pub mod simulation;
pub mod state;
pub mod stats;
pub mod strategy;
pub mod sweep;
pub mod talents;

#[cfg(feature = "python")]
mod python;

pub use ability::{Ability, AbilityCatalog, AbilityId};
pub use config::{CharacterStats, SimConfig};
pub use error::{Result, SimError};
pub use simulation::{FastRng, Scenario, Simulation};
pub use state::CombatState;
pub use stats::{AggregatedStats, IterationResult};
pub use strategy::{Condition, Strategy};
pub use talents::{Talent, Talents};
