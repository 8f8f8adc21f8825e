//! Roll records produced by the roller.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::die::Die;

/// Record of a single physical die roll.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DieRoll {
    /// The die that was rolled.
    pub die: Die,
    /// The value rolled (1 to `die.sides()`).
    pub value: u32,
    /// Unique id for this roll.
    pub id: Uuid,
    /// When the roll happened.
    pub rolled_at: DateTime<Utc>,
}

/// Whether a d20 roll is made normally, with advantage, or with disadvantage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdvantageState {
    /// Roll one d20.
    #[default]
    Normal,
    /// Roll two d20, keep the higher.
    Advantage,
    /// Roll two d20, keep the lower.
    Disadvantage,
}

impl std::fmt::Display for AdvantageState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Normal => write!(f, "normal"),
            Self::Advantage => write!(f, "advantage"),
            Self::Disadvantage => write!(f, "disadvantage"),
        }
    }
}

/// The result of a skill, ability, or saving-throw roll.
///
/// Immutable once created; the roller appends a copy of the relevant
/// fields to its history ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillRoll {
    /// The skill or save label this roll was made for.
    pub skill: String,
    /// All d20 values rolled (two under advantage or disadvantage).
    pub raw_rolls: Vec<u32>,
    /// The die value that was kept.
    pub selected: u32,
    /// Named modifier contributions, in stable order.
    pub modifiers: BTreeMap<String, i32>,
    /// Selected roll plus the sum of all modifiers.
    pub total: i32,
    /// How the d20s were rolled.
    pub advantage: AdvantageState,
    /// The id threading this roll through a larger request.
    pub correlation_id: String,
    /// When the roll happened.
    pub rolled_at: DateTime<Utc>,
}

impl SkillRoll {
    /// Sum of all modifier contributions.
    pub fn modifier_total(&self) -> i32 {
        self.modifiers.values().sum()
    }

    /// Human-readable breakdown, e.g. `d20[14, 9] keep 14 + 7 = 21`.
    pub fn breakdown(&self) -> String {
        let rolls: Vec<String> = self.raw_rolls.iter().map(u32::to_string).collect();
        let modifier = self.modifier_total();
        let sign = if modifier < 0 { "-" } else { "+" };
        format!(
            "d20[{}] keep {} {} {} = {}",
            rolls.join(", "),
            self.selected,
            sign,
            modifier.abs(),
            self.total
        )
    }
}

impl std::fmt::Display for SkillRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.skill, self.breakdown())
    }
}

/// The result of an attack roll.
///
/// Critical flags depend only on the kept natural die value, never on
/// the modifier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttackRoll {
    /// The underlying d20 roll.
    pub roll: SkillRoll,
    /// The kept die was a natural 20.
    pub is_critical_hit: bool,
    /// The kept die was a natural 1.
    pub is_critical_miss: bool,
}

impl std::fmt::Display for AttackRoll {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.roll)?;
        if self.is_critical_hit {
            write!(f, " (critical hit!)")?;
        }
        if self.is_critical_miss {
            write!(f, " (critical miss)")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_roll(raw: Vec<u32>, selected: u32, modifier: i32) -> SkillRoll {
        let mut modifiers = BTreeMap::new();
        modifiers.insert("ability".to_string(), modifier);
        SkillRoll {
            skill: "stealth".to_string(),
            raw_rolls: raw,
            selected,
            modifiers,
            total: selected as i32 + modifier,
            advantage: AdvantageState::Advantage,
            correlation_id: "test".to_string(),
            rolled_at: Utc::now(),
        }
    }

    #[test]
    fn breakdown_positive_modifier() {
        let roll = make_roll(vec![14, 9], 14, 7);
        assert_eq!(roll.breakdown(), "d20[14, 9] keep 14 + 7 = 21");
    }

    #[test]
    fn breakdown_negative_modifier() {
        let roll = make_roll(vec![5], 5, -2);
        assert_eq!(roll.breakdown(), "d20[5] keep 5 - 2 = 3");
    }

    #[test]
    fn modifier_total_sums_entries() {
        let mut roll = make_roll(vec![10], 10, 3);
        roll.modifiers.insert("proficiency".to_string(), 4);
        assert_eq!(roll.modifier_total(), 7);
    }

    #[test]
    fn advantage_state_display() {
        assert_eq!(AdvantageState::Normal.to_string(), "normal");
        assert_eq!(AdvantageState::Advantage.to_string(), "advantage");
        assert_eq!(AdvantageState::Disadvantage.to_string(), "disadvantage");
    }

    #[test]
    fn attack_display_flags_crit() {
        let attack = AttackRoll {
            roll: make_roll(vec![20], 20, 5),
            is_critical_hit: true,
            is_critical_miss: false,
        };
        assert!(attack.to_string().contains("critical hit"));
    }

    #[test]
    fn round_trip_serde() {
        let roll = make_roll(vec![14, 9], 14, 7);
        let json = serde_json::to_string(&roll).unwrap();
        let back: SkillRoll = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total, 21);
        assert_eq!(back.advantage, AdvantageState::Advantage);
    }
}
