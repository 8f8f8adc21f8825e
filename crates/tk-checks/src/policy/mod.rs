//! Policy engine: advantage state, DC adjustment, and rule profiles.
//!
//! Advantage and disadvantage reasons are collected from three sources
//! (conditions, flanking, environment) and compared by count; any excess
//! collapses to a single advantage or disadvantage, never stacking.
//! Rule values resolve through a fixed chain: temporary override, then
//! custom rule, then the active profile.

pub mod profile;

use serde::{Deserialize, Serialize};

use crate::engine::state::GameState;
use crate::error::{CheckEngineResult, CheckError};
use crate::request::{CharacterId, Context, ctx_bool, ctx_i64, ctx_str};
use crate::rules::tables::LookupTable;
use profile::{PolicyProfile, ProfileKind, RuleValue};
use tk_dice::AdvantageState;

/// Whether a condition helps or hinders a roll.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvantageEffect {
    /// The condition grants advantage.
    Advantage,
    /// The condition imposes disadvantage.
    Disadvantage,
}

/// The standard condition-to-effect table.
pub fn condition_effect_table() -> LookupTable<AdvantageEffect> {
    LookupTable::from_entries(
        "condition_effects",
        [
            ("blinded", AdvantageEffect::Disadvantage),
            ("poisoned", AdvantageEffect::Disadvantage),
            ("frightened", AdvantageEffect::Disadvantage),
            ("restrained", AdvantageEffect::Disadvantage),
            ("prone", AdvantageEffect::Disadvantage),
            ("exhausted", AdvantageEffect::Disadvantage),
            ("blessed", AdvantageEffect::Advantage),
            ("guided", AdvantageEffect::Advantage),
            ("inspired", AdvantageEffect::Advantage),
            ("invisible", AdvantageEffect::Advantage),
        ],
    )
}

/// Skills whose checks involve moving through the space.
const MOVEMENT_SKILLS: &[&str] = &["acrobatics", "athletics", "stealth"];

/// How the advantage state was resolved, with every contributing reason.
///
/// Both source lists are preserved even when they cancel out, so a log
/// reader can tell a zero-zero tie from an equal-nonzero tie.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdvantageResolution {
    /// The final advantage state for the roll.
    pub state: AdvantageState,
    /// Reasons granting advantage.
    pub advantage_sources: Vec<String>,
    /// Reasons imposing disadvantage.
    pub disadvantage_sources: Vec<String>,
}

impl AdvantageResolution {
    /// Number of advantage reasons.
    pub fn advantage_count(&self) -> usize {
        self.advantage_sources.len()
    }

    /// Number of disadvantage reasons.
    pub fn disadvantage_count(&self) -> usize {
        self.disadvantage_sources.len()
    }
}

/// One named delta applied while adjusting a DC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DcAdjustment {
    /// What produced the delta.
    pub name: String,
    /// The signed delta.
    pub delta: i32,
}

/// The result of adjusting a base DC.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DcAdjustmentResult {
    /// The DC before adjustment.
    pub base_dc: i32,
    /// The clamped final DC, always in `5..=30`.
    pub final_dc: i32,
    /// Every named delta that was applied.
    pub adjustments: Vec<DcAdjustment>,
    /// True iff clamping changed the value.
    pub bounded: bool,
}

/// Computes advantage state, DC adjustments, and rule values under the
/// active profile.
#[derive(Debug, Clone)]
pub struct PolicyEngine {
    profile: PolicyProfile,
    custom_rules: std::collections::BTreeMap<String, RuleValue>,
    overrides: std::collections::BTreeMap<String, RuleValue>,
    condition_effects: LookupTable<AdvantageEffect>,
}

impl Default for PolicyEngine {
    fn default() -> Self {
        Self::new(ProfileKind::Raw)
    }
}

impl PolicyEngine {
    /// Create a policy engine with the given profile preset.
    pub fn new(kind: ProfileKind) -> Self {
        Self {
            profile: PolicyProfile::preset(kind),
            custom_rules: std::collections::BTreeMap::new(),
            overrides: std::collections::BTreeMap::new(),
            condition_effects: condition_effect_table(),
        }
    }

    /// The active profile.
    pub fn profile(&self) -> &PolicyProfile {
        &self.profile
    }

    /// Replace the condition-effect table (externally loaded rule content).
    pub fn set_condition_effects(&mut self, table: LookupTable<AdvantageEffect>) {
        self.condition_effects = table;
    }

    /// Resolve a rule value: temporary override, then custom rule, then
    /// the active profile. Unregistered names are a hard error.
    pub fn rule_value(&self, name: &str) -> CheckEngineResult<RuleValue> {
        if let Some(&value) = self.overrides.get(name) {
            return Ok(value);
        }
        if let Some(&value) = self.custom_rules.get(name) {
            return Ok(value);
        }
        self.profile
            .rule(name)
            .map(|entry| entry.value)
            .ok_or_else(|| CheckError::UnknownRule(name.to_string()))
    }

    /// Register a custom rule. Survives profile changes.
    pub fn set_custom_rule(&mut self, name: impl Into<String>, value: RuleValue) {
        self.custom_rules.insert(name.into(), value);
    }

    /// Set a temporary override. Cleared on the next profile change.
    pub fn set_temporary_override(&mut self, name: impl Into<String>, value: RuleValue) {
        self.overrides.insert(name.into(), value);
    }

    /// Switch profiles. Clears temporary overrides, keeps custom rules.
    pub fn change_profile(&mut self, kind: ProfileKind) {
        self.profile = PolicyProfile::preset(kind);
        self.overrides.clear();
    }

    /// Collect advantage and disadvantage reasons and resolve the state.
    pub fn compute_advantage(
        &self,
        state: &GameState,
        actor: &CharacterId,
        skill: &str,
        context: &Context,
    ) -> AdvantageResolution {
        let mut advantage = Vec::new();
        let mut disadvantage = Vec::new();
        let summary = state.character(actor);

        // Condition effects.
        if let Some(summary) = summary {
            for condition in &summary.conditions {
                match self.condition_effects.lookup(condition) {
                    Some(AdvantageEffect::Advantage) => {
                        advantage.push(format!("condition: {condition}"));
                    }
                    Some(AdvantageEffect::Disadvantage) => {
                        disadvantage.push(format!("condition: {condition}"));
                    }
                    None => {}
                }
            }
        }

        // Flanking, only when the profile allows it.
        if self.rule_bool("flanking_advantage")
            && state.combat().active
            && state.combat().flanking.contains(actor)
        {
            advantage.push("flanking".to_string());
        }

        // Environment: the request context wins over the shared map.
        let lighting = ctx_str(context, "lighting")
            .or_else(|| ctx_str(state.environment(), "lighting"));
        if matches!(lighting, Some("dim") | Some("dark"))
            && !summary.is_some_and(|s| s.has_feature("darkvision"))
        {
            disadvantage.push(format!("lighting: {}", lighting.unwrap_or_default()));
        }

        let difficult_terrain = ctx_bool(context, "difficult_terrain")
            .or_else(|| ctx_bool(state.environment(), "difficult_terrain"))
            == Some(true);
        if difficult_terrain && MOVEMENT_SKILLS.contains(&skill) {
            disadvantage.push("difficult terrain".to_string());
        }

        // Any positive excess collapses to a single advantage or
        // disadvantage; equal counts cancel to a normal roll.
        let resolved = match advantage.len().cmp(&disadvantage.len()) {
            std::cmp::Ordering::Greater => AdvantageState::Advantage,
            std::cmp::Ordering::Less => AdvantageState::Disadvantage,
            std::cmp::Ordering::Equal => AdvantageState::Normal,
        };

        AdvantageResolution {
            state: resolved,
            advantage_sources: advantage,
            disadvantage_sources: disadvantage,
        }
    }

    /// Accumulate named DC deltas and clamp the result into `5..=30`.
    pub fn adjust_difficulty(&self, base_dc: i32, context: &Context) -> DcAdjustmentResult {
        let mut adjustments = Vec::new();

        let profile_delta = self.rule_int("global_dc_adjustment");
        if profile_delta != 0 {
            adjustments.push(DcAdjustment {
                name: "profile_adjustment".to_string(),
                delta: profile_delta,
            });
        }

        if let Some(delta) = ctx_i64(context, "scenario_modifier") {
            adjustments.push(DcAdjustment {
                name: "scenario".to_string(),
                delta: delta as i32,
            });
        }

        if let Some(level) = ctx_i64(context, "party_level") {
            if level < 3 {
                adjustments.push(DcAdjustment {
                    name: "low_party_level".to_string(),
                    delta: -2,
                });
            } else if level > 10 {
                adjustments.push(DcAdjustment {
                    name: "high_party_level".to_string(),
                    delta: 2,
                });
            }
        }

        let high_stress = ctx_bool(context, "high_stress") == Some(true)
            || ctx_str(context, "environment") == Some("high_stress");
        if high_stress {
            let penalty = self.rule_int("stress_dc_penalty");
            if penalty != 0 {
                adjustments.push(DcAdjustment {
                    name: "high_stress".to_string(),
                    delta: penalty,
                });
            }
        }

        let unclamped = base_dc + adjustments.iter().map(|a| a.delta).sum::<i32>();
        let final_dc = unclamped.clamp(5, 30);

        DcAdjustmentResult {
            base_dc,
            final_dc,
            adjustments,
            bounded: final_dc != unclamped,
        }
    }

    /// Passive score for a modifier: `10 + modifier`.
    pub fn passive_score(&self, modifier: i32) -> i32 {
        10 + modifier
    }

    /// Reject modifiers beyond the profile's cap.
    pub fn validate_modifier(&self, modifier: i32) -> CheckEngineResult<()> {
        let cap = self.rule_int("modifier_cap");
        if modifier.abs() > cap {
            return Err(CheckError::ModifierOutOfRange {
                value: modifier,
                cap,
            });
        }
        Ok(())
    }

    // Internal readers for rules every preset carries.

    fn rule_bool(&self, name: &str) -> bool {
        self.rule_value(name)
            .ok()
            .and_then(RuleValue::as_bool)
            .unwrap_or(false)
    }

    fn rule_int(&self, name: &str) -> i32 {
        self.rule_value(name)
            .ok()
            .and_then(RuleValue::as_int)
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::state::CharacterSummary;
    use proptest::prelude::*;
    use serde_json::json;

    fn state_with(conditions: &[&str], features: &[&str]) -> (GameState, CharacterId) {
        let id = CharacterId::new("pc-1");
        let mut state = GameState::new();
        state.upsert_character(CharacterSummary {
            id: id.clone(),
            name: "Test".to_string(),
            level: 3,
            conditions: conditions.iter().map(|s| s.to_string()).collect(),
            features: features.iter().map(|s| s.to_string()).collect(),
            hidden: false,
        });
        (state, id)
    }

    #[test]
    fn conditions_produce_sources() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        let (state, id) = state_with(&["blessed", "poisoned", "frightened"], &[]);
        let res = policy.compute_advantage(&state, &id, "athletics", &Context::new());
        assert_eq!(res.advantage_count(), 1);
        assert_eq!(res.disadvantage_count(), 2);
        assert_eq!(res.state, AdvantageState::Disadvantage);
    }

    #[test]
    fn equal_counts_cancel_to_normal() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        let (state, id) = state_with(&["blessed", "poisoned"], &[]);
        let res = policy.compute_advantage(&state, &id, "athletics", &Context::new());
        assert_eq!(res.state, AdvantageState::Normal);
        // Sources stay visible even though they cancel.
        assert_eq!(res.advantage_count(), 1);
        assert_eq!(res.disadvantage_count(), 1);
    }

    #[test]
    fn excess_does_not_stack() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        let (state, id) = state_with(&["blessed", "inspired", "guided"], &[]);
        let res = policy.compute_advantage(&state, &id, "athletics", &Context::new());
        assert_eq!(res.state, AdvantageState::Advantage);
        assert_eq!(res.advantage_count(), 3);
    }

    #[test]
    fn flanking_gated_by_profile() {
        let (mut state, id) = state_with(&[], &[]);
        state.set_combat_active(true);
        state.set_flanking(&id, true);

        let raw = PolicyEngine::new(ProfileKind::Raw);
        let res = raw.compute_advantage(&state, &id, "athletics", &Context::new());
        assert_eq!(res.state, AdvantageState::Normal);

        let house = PolicyEngine::new(ProfileKind::House);
        let res = house.compute_advantage(&state, &id, "athletics", &Context::new());
        assert_eq!(res.state, AdvantageState::Advantage);
        assert!(res.advantage_sources.contains(&"flanking".to_string()));
    }

    #[test]
    fn dim_light_without_darkvision() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        let (state, id) = state_with(&[], &[]);
        let mut context = Context::new();
        context.insert("lighting".to_string(), json!("dim"));
        let res = policy.compute_advantage(&state, &id, "perception", &context);
        assert_eq!(res.state, AdvantageState::Disadvantage);

        let (state, id) = state_with(&[], &["darkvision"]);
        let res = policy.compute_advantage(&state, &id, "perception", &context);
        assert_eq!(res.state, AdvantageState::Normal);
    }

    #[test]
    fn difficult_terrain_only_for_movement_skills() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        let (state, id) = state_with(&[], &[]);
        let mut context = Context::new();
        context.insert("difficult_terrain".to_string(), json!(true));

        let res = policy.compute_advantage(&state, &id, "stealth", &context);
        assert_eq!(res.state, AdvantageState::Disadvantage);

        let res = policy.compute_advantage(&state, &id, "persuasion", &context);
        assert_eq!(res.state, AdvantageState::Normal);
    }

    #[test]
    fn dc_adjustments_named_and_clamped() {
        let policy = PolicyEngine::new(ProfileKind::Easy);
        let mut context = Context::new();
        context.insert("party_level".to_string(), json!(1));

        let res = policy.adjust_difficulty(15, &context);
        assert_eq!(res.final_dc, 11); // -2 profile, -2 low party level
        assert!(!res.bounded);
        let names: Vec<&str> = res.adjustments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["profile_adjustment", "low_party_level"]);

        let res = policy.adjust_difficulty(6, &context);
        assert_eq!(res.final_dc, 5);
        assert!(res.bounded);
    }

    #[test]
    fn high_stress_uses_profile_penalty() {
        let mut context = Context::new();
        context.insert("high_stress".to_string(), json!(true));

        let raw = PolicyEngine::new(ProfileKind::Raw);
        let res = raw.adjust_difficulty(15, &context);
        assert_eq!(res.final_dc, 17);

        // Easy mode zeroes the stress penalty entirely.
        let easy = PolicyEngine::new(ProfileKind::Easy);
        let res = easy.adjust_difficulty(15, &context);
        assert_eq!(res.final_dc, 13);
        assert!(res.adjustments.iter().all(|a| a.name != "high_stress"));
    }

    #[test]
    fn rule_resolution_order() {
        let mut policy = PolicyEngine::new(ProfileKind::Raw);
        assert_eq!(
            policy.rule_value("flanking_advantage").unwrap(),
            RuleValue::Bool(false)
        );

        policy.set_custom_rule("flanking_advantage", RuleValue::Bool(true));
        assert_eq!(
            policy.rule_value("flanking_advantage").unwrap(),
            RuleValue::Bool(true)
        );

        policy.set_temporary_override("flanking_advantage", RuleValue::Bool(false));
        assert_eq!(
            policy.rule_value("flanking_advantage").unwrap(),
            RuleValue::Bool(false)
        );
    }

    #[test]
    fn unknown_rule_is_hard_error() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        assert!(matches!(
            policy.rule_value("no_such_rule"),
            Err(CheckError::UnknownRule(_))
        ));
    }

    #[test]
    fn profile_change_clears_overrides_keeps_custom() {
        let mut policy = PolicyEngine::new(ProfileKind::House);
        policy.set_custom_rule("homebrew_bonus", RuleValue::Int(1));
        policy.set_temporary_override("global_dc_adjustment", RuleValue::Int(5));

        policy.change_profile(ProfileKind::Easy);
        assert_eq!(policy.profile().kind, ProfileKind::Easy);
        // Override gone: back to the Easy preset value.
        assert_eq!(
            policy.rule_value("global_dc_adjustment").unwrap(),
            RuleValue::Int(-2)
        );
        // Custom rule survives.
        assert_eq!(
            policy.rule_value("homebrew_bonus").unwrap(),
            RuleValue::Int(1)
        );
    }

    #[test]
    fn validate_modifier_respects_cap() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        assert!(policy.validate_modifier(15).is_ok());
        assert!(policy.validate_modifier(-20).is_ok());
        assert!(matches!(
            policy.validate_modifier(21),
            Err(CheckError::ModifierOutOfRange { value: 21, cap: 20 })
        ));
    }

    #[test]
    fn passive_score() {
        let policy = PolicyEngine::new(ProfileKind::Raw);
        assert_eq!(policy.passive_score(7), 17);
        assert_eq!(policy.passive_score(-1), 9);
    }

    proptest! {
        #[test]
        fn adjusted_dc_always_in_bounds(base in -50i32..80, level in prop::option::of(0i64..25)) {
            let policy = PolicyEngine::new(ProfileKind::House);
            let mut context = Context::new();
            if let Some(level) = level {
                context.insert("party_level".to_string(), json!(level));
            }
            let res = policy.adjust_difficulty(base, &context);
            prop_assert!((5..=30).contains(&res.final_dc));
            let unclamped = base + res.adjustments.iter().map(|a| a.delta).sum::<i32>();
            prop_assert_eq!(res.bounded, !(5..=30).contains(&unclamped));
        }

        #[test]
        fn advantage_resolution_matches_counts(adv in 0usize..4, dis in 0usize..4) {
            let policy = PolicyEngine::new(ProfileKind::Raw);
            let adv_conditions = ["blessed", "inspired", "guided"];
            let dis_conditions = ["poisoned", "frightened", "blinded"];
            let conditions: Vec<&str> = adv_conditions[..adv.min(3)]
                .iter()
                .chain(dis_conditions[..dis.min(3)].iter())
                .copied()
                .collect();
            let (state, id) = state_with(&conditions, &[]);
            let res = policy.compute_advantage(&state, &id, "history", &Context::new());
            let expected = match adv.min(3).cmp(&dis.min(3)) {
                std::cmp::Ordering::Greater => AdvantageState::Advantage,
                std::cmp::Ordering::Less => AdvantageState::Disadvantage,
                std::cmp::Ordering::Equal => AdvantageState::Normal,
            };
            prop_assert_eq!(res.state, expected);
        }
    }
}
