//! Dice engine for Tavernkeep.
//!
//! Provides polyhedral die types, pluggable random sources (entropy,
//! seeded, scripted), skill/attack/saving-throw rolls with advantage and
//! disadvantage, damage-expression evaluation, and an append-only roll
//! history with aggregate statistics.
//!
//! Everything here is synchronous and single-threaded; a [`DiceRoller`]
//! owns its own random source, so concurrent callers need one roller each
//! or external synchronization.

pub mod die;
pub mod error;
pub mod expr;
pub mod history;
pub mod roll;
pub mod roller;
pub mod source;

pub use die::Die;
pub use error::{DiceError, DiceResult};
pub use expr::{DamageExpression, DamageRollOutcome};
pub use history::{RollEvent, RollHistory, RollKind, RollStatistics};
pub use roll::{AdvantageState, AttackRoll, DieRoll, SkillRoll};
pub use roller::DiceRoller;
pub use source::{EntropySource, FixedSource, RandomSource, SeededSource};
