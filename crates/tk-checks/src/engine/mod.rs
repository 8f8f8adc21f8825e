//! The game engine: pipeline orchestration and authoritative state.
//!
//! `GameEngine` drives every check through a fixed seven-stage pipeline:
//! rule evaluation, modifier resolution, advantage resolution, roll,
//! comparison, state application, and decision logging. A stage error
//! never propagates; it becomes a failed [`CheckOutcome`] carrying the
//! error message, and state counters are only touched after the roll is
//! final.

pub mod journal;
pub mod outcome;
pub mod state;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::character::{CharacterData, CharacterManager, SkillData};
use crate::error::CheckEngineResult;
use crate::policy::PolicyEngine;
use crate::policy::profile::{ProfileKind, RuleValue};
use crate::request::{CharacterId, CheckKind, CheckRequest, ctx_str};
use crate::rules::{Ability, RulesEnforcer};
use journal::{DecisionSink, NullSink};
use outcome::{CheckOutcome, ContestResult};
use state::{CharacterSummary, GameState, GameStateSnapshot};
use tk_dice::{DiceRoller, RollStatistics};

/// Engine construction options.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Seed for reproducible rolls; OS entropy when absent.
    pub seed: Option<u64>,
    /// The rule-interpretation profile to start with.
    pub profile: ProfileKind,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            seed: None,
            profile: ProfileKind::Raw,
        }
    }
}

impl EngineConfig {
    /// Use a fixed RNG seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Start with a specific profile.
    pub fn with_profile(mut self, profile: ProfileKind) -> Self {
        self.profile = profile;
        self
    }
}

/// Aggregate session statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameStatistics {
    /// Rolled checks processed this session.
    pub total_checks: u32,
    /// Rolled checks that succeeded.
    pub successful_checks: u32,
    /// Success ratio, 0 when nothing was rolled yet.
    pub success_rate: f64,
    /// Statistics over the roll ledger.
    pub roll_stats: RollStatistics,
}

/// Orchestrates rules, characters, policy, and dice over one game state.
///
/// Single-threaded by design: every call runs to completion with no
/// internal locking. Wrap the engine in a mutex or an owning task before
/// exposing it to concurrent callers.
pub struct GameEngine {
    rules: RulesEnforcer,
    characters: CharacterManager,
    policy: PolicyEngine,
    dice: DiceRoller,
    state: GameState,
    sink: Box<dyn DecisionSink>,
}

impl std::fmt::Debug for GameEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameEngine")
            .field("characters", &self.characters.len())
            .field("profile", &self.policy.profile().kind)
            .field("total_checks", &self.state.stats().total_checks)
            .finish()
    }
}

impl Default for GameEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl GameEngine {
    /// Create an engine from a config.
    pub fn new(config: EngineConfig) -> Self {
        let dice = match config.seed {
            Some(seed) => DiceRoller::seeded(seed),
            None => DiceRoller::new(),
        };
        Self {
            rules: RulesEnforcer::new(),
            characters: CharacterManager::new(),
            policy: PolicyEngine::new(config.profile),
            dice,
            state: GameState::new(),
            sink: Box::new(NullSink),
        }
    }

    /// Create an engine with a scripted roll sequence (tests, replays).
    pub fn scripted(rolls: impl IntoIterator<Item = u32>, profile: ProfileKind) -> Self {
        let mut engine = Self::new(EngineConfig::default().with_profile(profile));
        engine.dice = DiceRoller::scripted(rolls);
        engine
    }

    /// Attach a decision sink. The engine behaves identically (minus
    /// auditing) with the default no-op sink.
    pub fn set_decision_sink(&mut self, sink: Box<dyn DecisionSink>) {
        self.sink = sink;
    }

    /// Process one check request through the seven-stage pipeline.
    ///
    /// Never fails: stage errors come back as a failed outcome with the
    /// error message. Auto-resolved requests return after stage 1 and are
    /// journaled but do not advance the session counters.
    pub fn process_skill_check(&mut self, request: CheckRequest) -> CheckOutcome {
        let correlation_id = ctx_str(&request.context, "correlation_id")
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let outcome = match self.run_pipeline(&request, &correlation_id) {
            Ok(outcome) => outcome,
            Err(e) => CheckOutcome::failed(
                &correlation_id,
                request.actor.clone(),
                request.skill.clone(),
                e.to_string(),
            ),
        };

        // Stage 7: best-effort audit. Every outcome is journaled,
        // including auto results and failures.
        self.sink
            .log_skill_check(&correlation_id, &request, &outcome);
        outcome
    }

    fn run_pipeline(
        &mut self,
        request: &CheckRequest,
        correlation_id: &str,
    ) -> CheckEngineResult<CheckOutcome> {
        // Stage 1: rule evaluation.
        let requirement = self.rules.determine_check_needed(request);
        if !requirement.check_needed {
            let success = !requirement.auto_failure;
            return Ok(CheckOutcome::auto(
                correlation_id,
                request.actor.clone(),
                request.skill.clone(),
                success,
                requirement.reason,
            ));
        }

        let skill_label = request
            .skill
            .clone()
            .unwrap_or_else(|| requirement.kind.to_string());

        // Stage 2: modifier resolution. Unknown characters degrade to a
        // zero-modifier record; the degradation reason is carried into
        // the outcome's breakdown.
        let skill_data = self.resolve_modifier(request, requirement.kind, &skill_label);
        self.policy.validate_modifier(skill_data.modifier)?;

        // Stage 3: advantage resolution and final DC.
        let advantage = self.policy.compute_advantage(
            &self.state,
            &request.actor,
            &skill_label,
            &request.context,
        );
        let dc_result = self
            .policy
            .adjust_difficulty(requirement.dc, &request.context);

        // Stage 4: roll.
        let roll = match requirement.kind {
            CheckKind::Attack => {
                self.dice
                    .attack_roll(skill_data.modifier, advantage.state, correlation_id)
                    .roll
            }
            CheckKind::SavingThrow => self.dice.saving_throw(
                &skill_data
                    .ability
                    .map_or_else(|| skill_label.clone(), |a| a.to_string()),
                skill_data.modifier,
                advantage.state,
                correlation_id,
            ),
            _ => self.dice.skill_roll(
                &skill_label,
                skill_data.modifier,
                advantage.state,
                correlation_id,
            ),
        };

        // Stage 5: compare.
        let success = self.compare(requirement.kind, roll.total, roll.selected, dc_result.final_dc);

        // Stage 6: apply state. Counters move only here, after the roll
        // is final, so a stage error can never leave them half-written.
        self.state.record_check(success);
        self.apply_skill_transitions(&request.actor, &skill_label, success, request);

        Ok(CheckOutcome {
            success,
            check_needed: true,
            roll_total: roll.total,
            raw_rolls: roll.raw_rolls.clone(),
            selected_roll: roll.selected,
            dc: dc_result.final_dc,
            dc_source: requirement.dc_source,
            dc_adjustments: dc_result.adjustments,
            advantage_state: advantage.state,
            advantage_sources: advantage.advantage_sources,
            disadvantage_sources: advantage.disadvantage_sources,
            character_modifier: skill_data.modifier,
            modifier_breakdown: skill_data.breakdown,
            roll_breakdown: roll.breakdown(),
            correlation_id: correlation_id.to_string(),
            actor: request.actor.clone(),
            skill: request.skill.clone(),
            timestamp: roll.rolled_at,
            reason: requirement.reason,
            error: skill_data.error,
        })
    }

    fn resolve_modifier(
        &self,
        request: &CheckRequest,
        kind: CheckKind,
        skill_label: &str,
    ) -> SkillData {
        if kind == CheckKind::SavingThrow {
            let ability = request
                .skill
                .as_deref()
                .and_then(Ability::parse)
                .or_else(|| ctx_str(&request.context, "ability").and_then(Ability::parse));
            if let Some(ability) = ability {
                let modifier = self.characters.saving_throw_modifier(&request.actor, ability);
                let mut data = self.characters.skill_data(&request.actor, &ability.to_string());
                data.ability = Some(ability);
                data.modifier = modifier;
                data.breakdown = format!("{ability} save {modifier:+}");
                return data;
            }
        }
        self.characters.skill_data(&request.actor, skill_label)
    }

    fn compare(&self, kind: CheckKind, total: i32, selected: u32, dc: i32) -> bool {
        // Natural 1 on an attack always misses; natural 20 always hits.
        if kind == CheckKind::Attack {
            if selected == 1 {
                return false;
            }
            if selected == 20 {
                return true;
            }
        } else if selected == 20
            && self
                .policy
                .rule_value("critical_skill_success")
                .ok()
                .and_then(RuleValue::as_bool)
                == Some(true)
        {
            return true;
        }
        total >= dc
    }

    /// State transitions keyed by skill name. An open table: add an arm
    /// per skill that should touch state on resolution.
    fn apply_skill_transitions(
        &mut self,
        actor: &CharacterId,
        skill: &str,
        success: bool,
        request: &CheckRequest,
    ) {
        match skill {
            "stealth" => {
                // Success hides the actor; a failed attempt blows cover.
                self.state.set_hidden(actor, success);
            }
            "perception" | "investigation" => {
                if success
                    && let Some(info) = request.context.get("hidden_information")
                {
                    let mut revealed = self
                        .state
                        .campaign_flags()
                        .get("revealed_info")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default();
                    revealed.push(info.clone());
                    self.state
                        .set_campaign_flag("revealed_info", Value::Array(revealed));
                }
            }
            _ => {}
        }
    }

    /// Run a contested check: both actors roll, strictly-greater total
    /// wins, equal totals are a tie with no winner.
    pub fn process_contested_check(
        &mut self,
        actor1: &CharacterId,
        skill1: &str,
        actor2: &CharacterId,
        skill2: &str,
        context: crate::request::Context,
    ) -> ContestResult {
        let base_id = ctx_str(&context, "correlation_id")
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        let modifier1 = self.characters.skill_data(actor1, skill1).modifier;
        let modifier2 = self.characters.skill_data(actor2, skill2).modifier;

        let first = self.contested_leg(actor1, skill1, modifier2, &context, &format!("{base_id}-a"));
        let second =
            self.contested_leg(actor2, skill2, modifier1, &context, &format!("{base_id}-b"));

        let (winner, margin) = match first.roll_total.cmp(&second.roll_total) {
            std::cmp::Ordering::Greater => {
                (Some(actor1.clone()), first.roll_total - second.roll_total)
            }
            std::cmp::Ordering::Less => {
                (Some(actor2.clone()), second.roll_total - first.roll_total)
            }
            std::cmp::Ordering::Equal => (None, 0),
        };

        ContestResult {
            winner,
            margin,
            first,
            second,
        }
    }

    fn contested_leg(
        &mut self,
        actor: &CharacterId,
        skill: &str,
        opposing_modifier: i32,
        context: &crate::request::Context,
        correlation_id: &str,
    ) -> CheckOutcome {
        let mut request = CheckRequest::new(format!("contest: {skill}"), actor.clone())
            .with_skill(skill)
            .with_context("correlation_id", correlation_id);
        for (key, value) in context {
            if key != "correlation_id" {
                request.context.insert(key.clone(), value.clone());
            }
        }
        if !request.context.contains_key("dc") {
            request
                .context
                .insert("dc".to_string(), self.rules.contested_dc(opposing_modifier).into());
        }
        self.process_skill_check(request)
    }

    // Mutators that bypass the pipeline. Synchronous, direct writes.

    /// Add a character and sync its summary into the game state.
    pub fn add_character(&mut self, data: CharacterData) -> CharacterId {
        let id = self.characters.add_character(data);
        self.sync_character(&id);
        id
    }

    /// Add or remove a condition. Returns false for unknown characters.
    pub fn set_character_condition(
        &mut self,
        id: &CharacterId,
        condition: &str,
        add: bool,
    ) -> bool {
        if !self.characters.update_condition(id, condition, add) {
            return false;
        }
        if let Some(record) = self.characters.get(id) {
            let conditions = record.conditions.clone();
            self.state.set_character_conditions(id, conditions);
        }
        true
    }

    /// Set a shared environment value.
    pub fn update_environment(&mut self, key: &str, value: Value) {
        self.state.set_environment_value(key, value);
    }

    /// Set a campaign flag.
    pub fn set_campaign_flag(&mut self, key: &str, value: Value) {
        self.state.set_campaign_flag(key, value);
    }

    /// Start or stop combat. Stopping clears flanking.
    pub fn set_combat_active(&mut self, active: bool) {
        self.state.set_combat_active(active);
    }

    /// Mark a character as flanking (or not).
    pub fn set_flanking(&mut self, id: &CharacterId, flanking: bool) {
        self.state.set_flanking(id, flanking);
    }

    fn sync_character(&mut self, id: &CharacterId) {
        if let Some(record) = self.characters.get(id) {
            self.state.upsert_character(CharacterSummary {
                id: record.id.clone(),
                name: record.name.clone(),
                level: record.level,
                conditions: record.conditions.clone(),
                features: record.features.clone(),
                hidden: self
                    .state
                    .character(id)
                    .map(|s| s.hidden)
                    .unwrap_or(false),
            });
        }
    }

    // Read-only projections and component access.

    /// The authoritative game state (read-only).
    pub fn state(&self) -> &GameState {
        &self.state
    }

    /// A serializable snapshot for the persistence collaborator.
    pub fn export_game_state(&self) -> GameStateSnapshot {
        self.state.snapshot()
    }

    /// Aggregate session statistics.
    pub fn game_statistics(&self) -> GameStatistics {
        let stats = self.state.stats();
        let success_rate = if stats.total_checks == 0 {
            0.0
        } else {
            f64::from(stats.successful_checks) / f64::from(stats.total_checks)
        };
        GameStatistics {
            total_checks: stats.total_checks,
            successful_checks: stats.successful_checks,
            success_rate,
            roll_stats: self.dice.statistics(),
        }
    }

    /// The character manager.
    pub fn characters(&self) -> &CharacterManager {
        &self.characters
    }

    /// The policy engine.
    pub fn policy(&self) -> &PolicyEngine {
        &self.policy
    }

    /// Mutable policy access for profile changes and rule overrides.
    pub fn policy_mut(&mut self) -> &mut PolicyEngine {
        &mut self.policy
    }

    /// The rules enforcer.
    pub fn rules(&self) -> &RulesEnforcer {
        &self.rules
    }

    /// Mutable rules access for loading external rule tables.
    pub fn rules_mut(&mut self) -> &mut RulesEnforcer {
        &mut self.rules
    }

    /// The dice roller and its history.
    pub fn dice(&self) -> &DiceRoller {
        &self.dice
    }

    /// Mutable roller access (e.g. clearing history).
    pub fn dice_mut(&mut self) -> &mut DiceRoller {
        &mut self.dice
    }
}
