//! Character records and modifier computation.
//!
//! The [`CharacterManager`] owns the canonical character store. Derived
//! values (ability modifiers, proficiency bonus) are computed at creation
//! time from the raw scores and level; condition updates are the only
//! post-creation mutation.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::request::CharacterId;
use crate::rules::{Ability, skill_ability_table};
use crate::rules::tables::LookupTable;

/// The ability modifier for a raw score: `floor((score - 10) / 2)`.
pub fn ability_modifier(score: i32) -> i32 {
    (score - 10).div_euclid(2)
}

/// The proficiency bonus for a level: `2 + floor((level - 1) / 4)`.
pub fn proficiency_bonus(level: u32) -> i32 {
    2 + ((level.max(1) - 1) / 4) as i32
}

/// A stored character with raw scores and derived values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CharacterRecord {
    /// Unique id within the store.
    pub id: CharacterId,
    /// Display name.
    pub name: String,
    /// Character level (1 or higher).
    pub level: u32,
    /// Level-derived proficiency bonus.
    pub proficiency_bonus: i32,
    /// Raw ability scores.
    pub ability_scores: BTreeMap<Ability, i32>,
    /// Derived ability modifiers, kept in sync with the scores.
    pub ability_modifiers: BTreeMap<Ability, i32>,
    /// Skills the character is proficient in.
    pub proficient_skills: BTreeSet<String>,
    /// Skills with expertise (doubled proficiency).
    pub expertise_skills: BTreeSet<String>,
    /// Active conditions, in the order they were applied.
    pub conditions: Vec<String>,
    /// Features that grant situational bonuses (e.g. "guidance").
    pub features: BTreeSet<String>,
}

impl CharacterRecord {
    /// The modifier for an ability, defaulting to 0 for missing scores.
    pub fn ability_modifier(&self, ability: Ability) -> i32 {
        self.ability_modifiers.get(&ability).copied().unwrap_or(0)
    }

    /// Whether the character has a feature.
    pub fn has_feature(&self, feature: &str) -> bool {
        self.features.contains(feature)
    }

    /// Whether a condition is active.
    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.iter().any(|c| c == condition)
    }
}

/// Input for creating a character, builder style.
#[derive(Debug, Clone, Default)]
pub struct CharacterData {
    /// Display name.
    pub name: String,
    /// Character level; values below 1 are raised to 1.
    pub level: u32,
    /// Raw ability scores; unset abilities default to 10.
    pub ability_scores: BTreeMap<Ability, i32>,
    /// Skills the character is proficient in.
    pub proficient_skills: Vec<String>,
    /// Skills with expertise.
    pub expertise_skills: Vec<String>,
    /// Feature names.
    pub features: Vec<String>,
    /// Initial conditions.
    pub conditions: Vec<String>,
    /// Caller-supplied id; generated when absent.
    pub id: Option<CharacterId>,
}

impl CharacterData {
    /// Start building a character with a name and level.
    pub fn new(name: impl Into<String>, level: u32) -> Self {
        Self {
            name: name.into(),
            level,
            ..Self::default()
        }
    }

    /// Set an ability score.
    pub fn with_score(mut self, ability: Ability, score: i32) -> Self {
        self.ability_scores.insert(ability, score);
        self
    }

    /// Mark a skill as proficient.
    pub fn with_proficiency(mut self, skill: impl Into<String>) -> Self {
        self.proficient_skills.push(skill.into());
        self
    }

    /// Mark a skill as expertise (implies proficiency).
    pub fn with_expertise(mut self, skill: impl Into<String>) -> Self {
        let skill = skill.into();
        self.proficient_skills.push(skill.clone());
        self.expertise_skills.push(skill);
        self
    }

    /// Add a feature.
    pub fn with_feature(mut self, feature: impl Into<String>) -> Self {
        self.features.push(feature.into());
        self
    }

    /// Add an initial condition.
    pub fn with_condition(mut self, condition: impl Into<String>) -> Self {
        self.conditions.push(condition.into());
        self
    }

    /// Use a caller-supplied id instead of a generated one.
    pub fn with_id(mut self, id: impl Into<CharacterId>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Everything needed to roll a skill check for one character.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillData {
    /// The ability governing the skill, when known.
    pub ability: Option<Ability>,
    /// The governing ability's modifier.
    pub ability_modifier: i32,
    /// The character's proficiency bonus.
    pub proficiency_bonus: i32,
    /// Whether proficiency applies to this skill.
    pub proficient: bool,
    /// Whether expertise doubles the proficiency bonus.
    pub expertise: bool,
    /// Named situational bonuses from features.
    pub other_bonuses: BTreeMap<String, i32>,
    /// The final skill modifier.
    pub modifier: i32,
    /// Active conditions, for advantage resolution downstream.
    pub conditions: Vec<String>,
    /// Human-readable composition of the modifier.
    pub breakdown: String,
    /// Set when the character (or skill) could not be resolved; the
    /// values above are zeroed defaults in that case.
    pub error: Option<String>,
}

impl SkillData {
    fn unknown(reason: impl Into<String>) -> Self {
        Self {
            ability: None,
            ability_modifier: 0,
            proficiency_bonus: 0,
            proficient: false,
            expertise: false,
            other_bonuses: BTreeMap::new(),
            modifier: 0,
            conditions: Vec::new(),
            breakdown: "+0 (unresolved)".to_string(),
            error: Some(reason.into()),
        }
    }
}

/// Owns the character store and computes modifiers.
#[derive(Debug, Clone)]
pub struct CharacterManager {
    records: BTreeMap<CharacterId, CharacterRecord>,
    skill_abilities: LookupTable<Ability>,
}

impl Default for CharacterManager {
    fn default() -> Self {
        Self::new()
    }
}

impl CharacterManager {
    /// Create an empty manager with the standard skill table.
    pub fn new() -> Self {
        Self {
            records: BTreeMap::new(),
            skill_abilities: skill_ability_table(),
        }
    }

    /// Add a character, deriving modifiers and proficiency from the data.
    ///
    /// Returns the id the character was stored under.
    pub fn add_character(&mut self, data: CharacterData) -> CharacterId {
        let id = data
            .id
            .unwrap_or_else(|| CharacterId::new(Uuid::new_v4().to_string()));
        let level = data.level.max(1);

        let mut ability_scores: BTreeMap<Ability, i32> = Ability::all()
            .iter()
            .map(|&a| (a, 10))
            .collect();
        ability_scores.extend(data.ability_scores);
        let ability_modifiers = ability_scores
            .iter()
            .map(|(&a, &score)| (a, ability_modifier(score)))
            .collect();

        let mut conditions = Vec::new();
        for condition in data.conditions {
            if !conditions.contains(&condition) {
                conditions.push(condition);
            }
        }

        let record = CharacterRecord {
            id: id.clone(),
            name: data.name,
            level,
            proficiency_bonus: proficiency_bonus(level),
            ability_scores,
            ability_modifiers,
            proficient_skills: data.proficient_skills.into_iter().collect(),
            expertise_skills: data.expertise_skills.into_iter().collect(),
            conditions,
            features: data.features.into_iter().collect(),
        };
        self.records.insert(id.clone(), record);
        id
    }

    /// Look up a stored character.
    pub fn get(&self, id: &CharacterId) -> Option<&CharacterRecord> {
        self.records.get(id)
    }

    /// Whether a character exists.
    pub fn contains(&self, id: &CharacterId) -> bool {
        self.records.contains_key(id)
    }

    /// Number of stored characters.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate stored characters in id order.
    pub fn iter(&self) -> impl Iterator<Item = &CharacterRecord> {
        self.records.values()
    }

    /// Resolve everything needed to roll a skill check.
    ///
    /// An unknown character id returns a zero-modifier [`SkillData`] with
    /// `error` set; callers must check that field rather than expect an
    /// `Err`. A skill name that is actually an ability resolves as a raw
    /// ability check.
    pub fn skill_data(&self, id: &CharacterId, skill: &str) -> SkillData {
        let Some(record) = self.records.get(id) else {
            return SkillData::unknown(format!("unknown character: {id}"));
        };

        let ability = self
            .skill_abilities
            .lookup(skill)
            .copied()
            .or_else(|| Ability::parse(skill));
        let ability_mod = ability.map_or(0, |a| record.ability_modifier(a));

        let proficient = record.proficient_skills.contains(skill);
        let expertise = record.expertise_skills.contains(skill);
        let proficiency_part = if proficient {
            record.proficiency_bonus * if expertise { 2 } else { 1 }
        } else {
            0
        };

        let other_bonuses = self.feature_bonuses(record, skill);
        let other_total: i32 = other_bonuses.values().sum();
        let modifier = ability_mod + proficiency_part + other_total;

        let mut parts = Vec::new();
        match ability {
            Some(a) => parts.push(format!("{a} {ability_mod:+}")),
            None => parts.push("no governing ability +0".to_string()),
        }
        if proficient {
            if expertise {
                parts.push(format!(
                    "expertise {:+}",
                    record.proficiency_bonus * 2
                ));
            } else {
                parts.push(format!("proficiency {:+}", record.proficiency_bonus));
            }
        }
        for (name, bonus) in &other_bonuses {
            parts.push(format!("{name} {bonus:+}"));
        }
        let breakdown = format!("{} = {modifier:+}", parts.join(", "));

        SkillData {
            ability,
            ability_modifier: ability_mod,
            proficiency_bonus: record.proficiency_bonus,
            proficient,
            expertise,
            other_bonuses,
            modifier,
            conditions: record.conditions.clone(),
            breakdown,
            error: None,
        }
    }

    /// The saving-throw modifier for an ability. Zero for unknown ids.
    pub fn saving_throw_modifier(&self, id: &CharacterId, ability: Ability) -> i32 {
        self.records
            .get(id)
            .map_or(0, |r| r.ability_modifier(ability))
    }

    /// The passive score for a skill: `10 + skill modifier`.
    pub fn passive_score(&self, id: &CharacterId, skill: &str) -> i32 {
        10 + self.skill_data(id, skill).modifier
    }

    /// Add or remove a condition. Returns false for unknown characters.
    pub fn update_condition(&mut self, id: &CharacterId, condition: &str, add: bool) -> bool {
        let Some(record) = self.records.get_mut(id) else {
            return false;
        };
        if add {
            if !record.has_condition(condition) {
                record.conditions.push(condition.to_string());
            }
        } else {
            record.conditions.retain(|c| c != condition);
        }
        true
    }

    /// Feature-gated situational bonuses for a skill.
    fn feature_bonuses(&self, record: &CharacterRecord, skill: &str) -> BTreeMap<String, i32> {
        let mut bonuses = BTreeMap::new();
        if record.has_feature("guidance") && matches!(skill, "investigation" | "perception") {
            bonuses.insert("guidance".to_string(), 1);
        }
        bonuses
    }
}
