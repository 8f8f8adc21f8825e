//! Deterministic skill-check resolution for tabletop play.
//!
//! The crate turns a free-text action request into a fully-provenanced
//! check outcome: rule evaluation decides whether a roll is needed and
//! at what DC, the character manager resolves modifiers, the policy
//! engine applies advantage and profile adjustments, and the roller
//! (from `tk-dice`) produces the dice. The [`engine::GameEngine`] wires
//! these together over one authoritative game state and journals every
//! decision.
//!
//! The engine is single-threaded: calls run to completion with no
//! internal locking, and seeded runs replay identically.

pub mod character;
pub mod engine;
pub mod error;
pub mod policy;
pub mod request;
pub mod rules;

pub use character::{CharacterData, CharacterManager, CharacterRecord, SkillData};
pub use engine::journal::{DecisionEntry, DecisionLog, DecisionSink, NullSink};
pub use engine::outcome::{CheckOutcome, ContestResult};
pub use engine::state::{CharacterSummary, CombatState, GameState, GameStateSnapshot, SessionStats};
pub use engine::{EngineConfig, GameEngine, GameStatistics};
pub use error::{CheckEngineResult, CheckError};
pub use policy::profile::{PolicyProfile, ProfileKind, RuleValue};
pub use policy::{AdvantageResolution, DcAdjustment, DcAdjustmentResult, PolicyEngine};
pub use request::{CharacterId, CheckKind, CheckRequest, Context};
pub use rules::{Ability, CheckRequirement, RulesEnforcer};
