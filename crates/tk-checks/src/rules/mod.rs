//! Rules enforcement: does an action need a check, and at what DC.
//!
//! The [`RulesEnforcer`] classifies a [`CheckRequest`] into a
//! [`CheckRequirement`] without ever failing: automatic outcomes are
//! detected first, then the check type is classified, then the DC is
//! derived through a fixed priority chain (explicit value, contextual
//! table, named difficulty, type default).

pub mod tables;

use serde::{Deserialize, Serialize};

use crate::request::{CheckKind, CheckRequest, Context, ctx_bool, ctx_i64, ctx_str};
use tables::LookupTable;

/// One of the six character abilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ability {
    /// Raw physical power.
    Strength,
    /// Agility and reflexes.
    Dexterity,
    /// Endurance and health.
    Constitution,
    /// Reasoning and memory.
    Intelligence,
    /// Perception and insight.
    Wisdom,
    /// Force of personality.
    Charisma,
}

impl Ability {
    /// All abilities in canonical order.
    pub fn all() -> &'static [Self] {
        &[
            Self::Strength,
            Self::Dexterity,
            Self::Constitution,
            Self::Intelligence,
            Self::Wisdom,
            Self::Charisma,
        ]
    }

    /// Parse an ability from a full name or three-letter abbreviation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "strength" | "str" => Some(Self::Strength),
            "dexterity" | "dex" => Some(Self::Dexterity),
            "constitution" | "con" => Some(Self::Constitution),
            "intelligence" | "int" => Some(Self::Intelligence),
            "wisdom" | "wis" => Some(Self::Wisdom),
            "charisma" | "cha" => Some(Self::Charisma),
            _ => None,
        }
    }
}

impl std::fmt::Display for Ability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strength => write!(f, "strength"),
            Self::Dexterity => write!(f, "dexterity"),
            Self::Constitution => write!(f, "constitution"),
            Self::Intelligence => write!(f, "intelligence"),
            Self::Wisdom => write!(f, "wisdom"),
            Self::Charisma => write!(f, "charisma"),
        }
    }
}

/// The standard skill-to-governing-ability table.
pub fn skill_ability_table() -> LookupTable<Ability> {
    LookupTable::from_entries(
        "skill_abilities",
        [
            ("athletics", Ability::Strength),
            ("acrobatics", Ability::Dexterity),
            ("sleight_of_hand", Ability::Dexterity),
            ("stealth", Ability::Dexterity),
            ("arcana", Ability::Intelligence),
            ("history", Ability::Intelligence),
            ("investigation", Ability::Intelligence),
            ("nature", Ability::Intelligence),
            ("religion", Ability::Intelligence),
            ("animal_handling", Ability::Wisdom),
            ("insight", Ability::Wisdom),
            ("medicine", Ability::Wisdom),
            ("perception", Ability::Wisdom),
            ("survival", Ability::Wisdom),
            ("deception", Ability::Charisma),
            ("intimidation", Ability::Charisma),
            ("performance", Ability::Charisma),
            ("persuasion", Ability::Charisma),
        ],
    )
}

/// What stage 1 of the pipeline decided about a request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckRequirement {
    /// Whether a die roll is required.
    pub check_needed: bool,
    /// What kind of check applies.
    pub kind: CheckKind,
    /// The base DC before policy adjustment.
    pub dc: i32,
    /// Where the DC came from (provenance for auditing).
    pub dc_source: String,
    /// The action succeeds without a roll.
    pub auto_success: bool,
    /// The action fails without a roll.
    pub auto_failure: bool,
    /// Why this requirement was decided.
    pub reason: String,
}

impl CheckRequirement {
    fn no_check(reason: impl Into<String>) -> Self {
        Self {
            check_needed: false,
            kind: CheckKind::None,
            dc: 0,
            dc_source: "none".to_string(),
            auto_success: false,
            auto_failure: false,
            reason: reason.into(),
        }
    }

    fn auto(success: bool, reason: impl Into<String>) -> Self {
        Self {
            auto_success: success,
            auto_failure: !success,
            ..Self::no_check(reason)
        }
    }
}

/// Classifies requests and derives difficulty classes.
#[derive(Debug, Clone)]
pub struct RulesEnforcer {
    skill_abilities: LookupTable<Ability>,
    action_keywords: LookupTable<CheckKind>,
    contextual_dcs: LookupTable<i32>,
    named_difficulties: LookupTable<i32>,
}

impl Default for RulesEnforcer {
    fn default() -> Self {
        Self::new()
    }
}

impl RulesEnforcer {
    /// Create an enforcer with the standard rule tables.
    pub fn new() -> Self {
        Self {
            skill_abilities: skill_ability_table(),
            action_keywords: LookupTable::from_entries(
                "action_keywords",
                [
                    ("persuade", CheckKind::Skill),
                    ("convince", CheckKind::Skill),
                    ("sneak", CheckKind::Skill),
                    ("hide", CheckKind::Skill),
                    ("search", CheckKind::Skill),
                    ("climb", CheckKind::Skill),
                    ("jump", CheckKind::Skill),
                    ("lie", CheckKind::Skill),
                    ("intimidate", CheckKind::Skill),
                    ("attack", CheckKind::Attack),
                    ("strike", CheckKind::Attack),
                    ("shoot", CheckKind::Attack),
                    ("save", CheckKind::SavingThrow),
                    ("resist", CheckKind::SavingThrow),
                    ("withstand", CheckKind::SavingThrow),
                ],
            ),
            contextual_dcs: LookupTable::from_entries(
                "contextual_dcs",
                [
                    ("persuade_friendly_npc", 10),
                    ("persuade_neutral_npc", 15),
                    ("persuade_hostile_npc", 20),
                    ("search_obvious_clues", 10),
                    ("search_hidden_clues", 15),
                    ("search_obscure_clues", 20),
                ],
            ),
            named_difficulties: LookupTable::from_entries(
                "named_difficulties",
                [
                    ("trivial", 5),
                    ("easy", 10),
                    ("medium", 15),
                    ("hard", 20),
                    ("very_hard", 25),
                    ("nearly_impossible", 30),
                ],
            ),
        }
    }

    /// Replace the contextual DC table (externally loaded rule content).
    pub fn set_contextual_dcs(&mut self, table: LookupTable<i32>) {
        self.contextual_dcs = table;
    }

    /// Replace the named-difficulty table.
    pub fn set_named_difficulties(&mut self, table: LookupTable<i32>) {
        self.named_difficulties = table;
    }

    /// The governing ability for a skill, when the skill is known.
    pub fn skill_ability(&self, skill: &str) -> Option<Ability> {
        self.skill_abilities.lookup(skill).copied()
    }

    /// Decide whether the request needs a check, what kind, and at what DC.
    ///
    /// Never fails: unknown skills degrade to an ability check, and
    /// unclassifiable actions come back as no check needed.
    pub fn determine_check_needed(&self, request: &CheckRequest) -> CheckRequirement {
        // 1. Automatic outcomes.
        if ctx_bool(&request.context, "impossible") == Some(true) {
            return CheckRequirement::auto(false, "action is impossible in this situation");
        }
        if ctx_bool(&request.context, "trivial") == Some(true) {
            return CheckRequirement::auto(true, "action is trivial in this situation");
        }
        if self.is_leisurely_search(request) {
            return CheckRequirement::auto(
                true,
                "unlimited time searching for something not hidden",
            );
        }

        // 2. Classification.
        let (kind, reason) = self.classify(request);
        if kind == CheckKind::None {
            return CheckRequirement::no_check(reason);
        }

        // 3. DC derivation.
        let (dc, dc_source) = self.derive_dc(request, kind);

        CheckRequirement {
            check_needed: true,
            kind,
            dc,
            dc_source,
            auto_success: false,
            auto_failure: false,
            reason,
        }
    }

    /// DC for the passive side of a contested check.
    pub fn contested_dc(&self, opposing_modifier: i32) -> i32 {
        8 + opposing_modifier
    }

    fn is_leisurely_search(&self, request: &CheckRequest) -> bool {
        let searching = request.action.to_lowercase().contains("search")
            || request.skill.as_deref() == Some("investigation");
        searching
            && ctx_bool(&request.context, "unlimited_time") == Some(true)
            && ctx_bool(&request.context, "hidden") != Some(true)
    }

    fn classify(&self, request: &CheckRequest) -> (CheckKind, String) {
        // Explicit kind on the request wins over everything.
        if let Some(kind) = request.kind {
            return (kind, format!("explicit check type: {kind}"));
        }
        if let Some(kind) = ctx_str(&request.context, "type").and_then(CheckKind::parse) {
            return (kind, format!("explicit check type: {kind}"));
        }

        // Named skills classify as skill checks; unknown skill names
        // degrade to a raw ability check.
        if let Some(skill) = &request.skill {
            return if self.skill_abilities.contains(skill) {
                (CheckKind::Skill, format!("skill check: {skill}"))
            } else {
                (
                    CheckKind::Ability,
                    format!("unknown skill '{skill}', treating as ability check"),
                )
            };
        }

        // Keyword match against the action text.
        let action = request.action.to_lowercase();
        for (keyword, kind) in self.action_keywords.iter() {
            if action.contains(keyword.as_str()) {
                return (*kind, format!("action keyword: {keyword}"));
            }
        }

        (CheckKind::None, "action requires no check".to_string())
    }

    /// Derive the base DC. Priority: explicit `context.dc`, contextual
    /// table via a synthesized key, named difficulty, type default.
    fn derive_dc(&self, request: &CheckRequest, kind: CheckKind) -> (i32, String) {
        if let Some(dc) = ctx_i64(&request.context, "dc") {
            return (dc as i32, "explicit".to_string());
        }

        for key in self.contextual_keys(request) {
            if let Some(&dc) = self.contextual_dcs.lookup(&key) {
                return (dc, format!("contextual:{key}"));
            }
        }

        if let Some(name) = ctx_str(&request.context, "difficulty") {
            let normalized = name.to_lowercase().replace([' ', '-'], "_");
            if let Some(&dc) = self.named_difficulties.lookup(&normalized) {
                return (dc, format!("difficulty:{normalized}"));
            }
        }

        let default = match kind {
            CheckKind::Attack => 0, // target AC is resolved elsewhere
            _ => 15,
        };
        (default, "default".to_string())
    }

    /// Synthesize candidate contextual-DC keys from the request.
    fn contextual_keys(&self, request: &CheckRequest) -> Vec<String> {
        let mut keys = Vec::new();
        let action = request.action.to_lowercase();
        let context: &Context = &request.context;

        let persuading = action.contains("persuade")
            || action.contains("convince")
            || request.skill.as_deref() == Some("persuasion");
        if persuading && let Some(attitude) = ctx_str(context, "npc_attitude") {
            keys.push(format!("persuade_{}_npc", attitude.to_lowercase()));
        }

        let searching = action.contains("search")
            || matches!(
                request.skill.as_deref(),
                Some("investigation") | Some("perception")
            );
        if searching && let Some(difficulty) = ctx_str(context, "clue_difficulty") {
            keys.push(format!("search_{}_clues", difficulty.to_lowercase()));
        }

        keys
    }
}
