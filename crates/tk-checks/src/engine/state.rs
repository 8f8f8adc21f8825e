//! Authoritative game state owned by the engine.
//!
//! `GameState` is mutated exclusively through `GameEngine` methods; other
//! components receive `&GameState` and read through getters, so a
//! non-owning component cannot mutate it. The character entries here are
//! denormalized summaries kept in sync by explicit engine calls; the
//! canonical records live in the character manager.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::request::{CharacterId, Context};

/// A denormalized view of one character, enough for policy queries and
/// state transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterSummary {
    /// The character's id.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Character level.
    pub level: u32,
    /// Active conditions, in application order.
    pub conditions: Vec<String>,
    /// Feature names (e.g. "darkvision").
    pub features: BTreeSet<String>,
    /// Whether the character is currently hidden.
    pub hidden: bool,
}

impl CharacterSummary {
    /// Whether a condition is active.
    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.iter().any(|c| c == condition)
    }

    /// Whether the character has a feature.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }
}

/// Current combat bookkeeping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CombatState {
    /// Whether combat is running.
    pub active: bool,
    /// Characters currently flanking an enemy.
    pub flanking: BTreeSet<CharacterId>,
}

/// Session counters. `successful` never exceeds `total`: both are only
/// written together by the engine's record call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Rolled checks processed this session. Auto-resolved requests do
    /// not count here; they appear only in the decision journal.
    pub total_checks: u32,
    /// Checks that succeeded.
    pub successful_checks: u32,
    /// When the session started.
    pub started_at: DateTime<Utc>,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self {
            total_checks: 0,
            successful_checks: 0,
            started_at: Utc::now(),
        }
    }
}

/// The root state aggregate. Created with the engine, torn down with it.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    characters: BTreeMap<CharacterId, CharacterSummary>,
    combat: CombatState,
    environment: Context,
    campaign_flags: Context,
    stats: SessionStats,
}

impl GameState {
    /// Create an empty state.
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// The character summaries, keyed by id.
    pub fn characters(&self) -> &BTreeMap<CharacterId, CharacterSummary> {
        &self.characters
    }

    /// One character summary.
    pub fn character(&self, id: &CharacterId) -> Option<&CharacterSummary> {
        self.characters.get(id)
    }

    /// Current combat bookkeeping.
    pub fn combat(&self) -> &CombatState {
        &self.combat
    }

    /// The shared environment map.
    pub fn environment(&self) -> &Context {
        &self.environment
    }

    /// Campaign flags set during play.
    pub fn campaign_flags(&self) -> &Context {
        &self.campaign_flags
    }

    /// Session counters.
    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// A plain serializable copy for the external persistence collaborator.
    pub fn snapshot(&self) -> GameStateSnapshot {
        GameStateSnapshot {
            characters: self.characters.clone(),
            combat: self.combat.clone(),
            environment: self.environment.clone(),
            campaign_flags: self.campaign_flags.clone(),
            stats: self.stats.clone(),
        }
    }

    // Mutation is crate-internal: only the engine writes.

    pub(crate) fn upsert_character(&mut self, summary: CharacterSummary) {
        self.characters.insert(summary.id.clone(), summary);
    }

    pub(crate) fn set_character_conditions(&mut self, id: &CharacterId, conditions: Vec<String>) {
        if let Some(summary) = self.characters.get_mut(id) {
            summary.conditions = conditions;
        }
    }

    pub(crate) fn set_hidden(&mut self, id: &CharacterId, hidden: bool) {
        if let Some(summary) = self.characters.get_mut(id) {
            summary.hidden = hidden;
        }
    }

    pub(crate) fn set_environment_value(&mut self, key: &str, value: Value) {
        self.environment.insert(key.to_string(), value);
    }

    pub(crate) fn set_campaign_flag(&mut self, key: &str, value: Value) {
        self.campaign_flags.insert(key.to_string(), value);
    }

    pub(crate) fn set_combat_active(&mut self, active: bool) {
        self.combat.active = active;
        if !active {
            self.combat.flanking.clear();
        }
    }

    pub(crate) fn set_flanking(&mut self, id: &CharacterId, flanking: bool) {
        if flanking {
            self.combat.flanking.insert(id.clone());
        } else {
            self.combat.flanking.remove(id);
        }
    }

    /// Record one processed check. The only writer of the counters, so
    /// `successful_checks <= total_checks` always holds.
    pub(crate) fn record_check(&mut self, success: bool) {
        self.stats.total_checks += 1;
        if success {
            self.stats.successful_checks += 1;
        }
    }
}

/// A serializable copy of the whole game state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStateSnapshot {
    /// Character summaries.
    pub characters: BTreeMap<CharacterId, CharacterSummary>,
    /// Combat bookkeeping.
    pub combat: CombatState,
    /// Environment map.
    pub environment: Context,
    /// Campaign flags.
    pub campaign_flags: Context,
    /// Session counters.
    pub stats: SessionStats,
}
