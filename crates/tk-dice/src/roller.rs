//! The dice roller: rolls, advantage resolution, and history bookkeeping.

use std::collections::BTreeMap;

use chrono::Utc;
use uuid::Uuid;

use crate::die::Die;
use crate::expr::{DamageExpression, DamageRollOutcome, DamageTerm};
use crate::history::{RollEvent, RollHistory, RollKind, RollStatistics};
use crate::roll::{AdvantageState, AttackRoll, DieRoll, SkillRoll};
use crate::source::{EntropySource, FixedSource, RandomSource, SeededSource};

/// Rolls dice and records every roll in an append-only history.
///
/// Each roller owns its own random source; construct one per engine
/// instance (or synchronize externally) when sharing across threads.
pub struct DiceRoller {
    source: Box<dyn RandomSource + Send>,
    history: RollHistory,
}

impl std::fmt::Debug for DiceRoller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiceRoller")
            .field("history_len", &self.history.len())
            .finish()
    }
}

impl Default for DiceRoller {
    fn default() -> Self {
        Self::new()
    }
}

impl DiceRoller {
    /// Create a roller drawing from OS entropy. The production default.
    pub fn new() -> Self {
        Self::with_source(Box::new(EntropySource::new()))
    }

    /// Create a roller with a reproducible seeded source.
    pub fn seeded(seed: u64) -> Self {
        Self::with_source(Box::new(SeededSource::new(seed)))
    }

    /// Create a roller replaying a scripted value sequence.
    pub fn scripted(values: impl IntoIterator<Item = u32>) -> Self {
        Self::with_source(Box::new(FixedSource::new(values)))
    }

    /// Create a roller with an arbitrary random source.
    pub fn with_source(source: Box<dyn RandomSource + Send>) -> Self {
        Self {
            source,
            history: RollHistory::new(),
        }
    }

    /// Roll a single die.
    pub fn roll_die(&mut self, die: Die) -> DieRoll {
        let value = self.source.next(die.sides());
        self.history.append(RollEvent {
            kind: RollKind::Die,
            skill: None,
            raw_rolls: vec![value],
            selected: value,
            total: value as i32,
            correlation_id: None,
            rolled_at: Utc::now(),
        });
        DieRoll {
            die,
            value,
            id: Uuid::new_v4(),
            rolled_at: Utc::now(),
        }
    }

    /// Roll a skill check: one d20, or two under advantage/disadvantage.
    pub fn skill_roll(
        &mut self,
        skill: &str,
        modifier: i32,
        advantage: AdvantageState,
        correlation_id: &str,
    ) -> SkillRoll {
        self.d20_roll(RollKind::Skill, skill, modifier, advantage, correlation_id)
    }

    /// Roll a saving throw for an ability. Recorded as `save_<ability>`.
    pub fn saving_throw(
        &mut self,
        ability: &str,
        modifier: i32,
        advantage: AdvantageState,
        correlation_id: &str,
    ) -> SkillRoll {
        let label = format!("save_{}", ability.to_lowercase());
        self.d20_roll(
            RollKind::SavingThrow,
            &label,
            modifier,
            advantage,
            correlation_id,
        )
    }

    /// Roll an attack. Natural 20 flags a critical hit and natural 1 a
    /// critical miss, regardless of the modifier.
    pub fn attack_roll(
        &mut self,
        modifier: i32,
        advantage: AdvantageState,
        correlation_id: &str,
    ) -> AttackRoll {
        let roll = self.d20_roll(
            RollKind::Attack,
            "attack",
            modifier,
            advantage,
            correlation_id,
        );
        AttackRoll {
            is_critical_hit: roll.selected == 20,
            is_critical_miss: roll.selected == 1,
            roll,
        }
    }

    /// Evaluate a damage expression, recording each dice term.
    pub fn damage_roll(&mut self, expr: &DamageExpression, modifier: i32) -> DamageRollOutcome {
        let outcome = expr.evaluate(modifier, self.source.as_mut());
        for term_roll in &outcome.term_rolls {
            if let DamageTerm::Dice { .. } = term_roll.term {
                let sum: i32 = term_roll.rolls.iter().map(|&v| v as i32).sum();
                self.history.append(RollEvent {
                    kind: RollKind::Damage,
                    skill: None,
                    raw_rolls: term_roll.rolls.clone(),
                    selected: term_roll.rolls.iter().copied().max().unwrap_or(0),
                    total: sum,
                    correlation_id: None,
                    rolled_at: Utc::now(),
                });
            }
        }
        outcome
    }

    /// Roll percentile dice: two d10 combined as tens and ones digits,
    /// with a double zero read as 100.
    pub fn percentile_roll(&mut self) -> u32 {
        let tens = self.source.next(10) % 10;
        let ones = self.source.next(10) % 10;
        let value = if tens == 0 && ones == 0 {
            100
        } else {
            tens * 10 + ones
        };
        self.history.append(RollEvent {
            kind: RollKind::Percentile,
            skill: None,
            raw_rolls: vec![tens, ones],
            selected: value,
            total: value as i32,
            correlation_id: None,
            rolled_at: Utc::now(),
        });
        value
    }

    /// The full roll ledger.
    pub fn history(&self) -> &RollHistory {
        &self.history
    }

    /// Statistics over every recorded roll.
    pub fn statistics(&self) -> RollStatistics {
        self.history.statistics()
    }

    /// Statistics over rolls tagged with a correlation id.
    pub fn statistics_for(&self, correlation_id: &str) -> RollStatistics {
        self.history.statistics_for(correlation_id)
    }

    /// Empty the roll ledger.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    fn d20_roll(
        &mut self,
        kind: RollKind,
        skill: &str,
        modifier: i32,
        advantage: AdvantageState,
        correlation_id: &str,
    ) -> SkillRoll {
        let raw_rolls: Vec<u32> = match advantage {
            AdvantageState::Normal => vec![self.source.next(20)],
            AdvantageState::Advantage | AdvantageState::Disadvantage => {
                vec![self.source.next(20), self.source.next(20)]
            }
        };
        let selected = match advantage {
            AdvantageState::Disadvantage => raw_rolls.iter().copied().min(),
            _ => raw_rolls.iter().copied().max(),
        }
        .unwrap_or(0);

        let mut modifiers = BTreeMap::new();
        modifiers.insert("modifier".to_string(), modifier);
        let total = selected as i32 + modifier;

        self.history.append(RollEvent {
            kind,
            skill: Some(skill.to_string()),
            raw_rolls: raw_rolls.clone(),
            selected,
            total,
            correlation_id: Some(correlation_id.to_string()),
            rolled_at: Utc::now(),
        });

        SkillRoll {
            skill: skill.to_string(),
            raw_rolls,
            selected,
            modifiers,
            total,
            advantage,
            correlation_id: correlation_id.to_string(),
            rolled_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roll_die_in_range() {
        let mut roller = DiceRoller::seeded(42);
        for _ in 0..50 {
            let roll = roller.roll_die(Die::D6);
            assert!((1..=6).contains(&roll.value));
        }
        assert_eq!(roller.history().len(), 50);
    }

    #[test]
    fn seeded_rollers_agree() {
        let mut a = DiceRoller::seeded(7);
        let mut b = DiceRoller::seeded(7);
        for _ in 0..20 {
            assert_eq!(a.roll_die(Die::D20).value, b.roll_die(Die::D20).value);
        }
    }

    #[test]
    fn normal_roll_uses_one_die() {
        let mut roller = DiceRoller::scripted([11]);
        let roll = roller.skill_roll("athletics", 2, AdvantageState::Normal, "c1");
        assert_eq!(roll.raw_rolls, vec![11]);
        assert_eq!(roll.selected, 11);
        assert_eq!(roll.total, 13);
    }

    #[test]
    fn advantage_keeps_higher() {
        let mut roller = DiceRoller::scripted([14, 9]);
        let roll = roller.skill_roll("stealth", 7, AdvantageState::Advantage, "c1");
        assert_eq!(roll.raw_rolls, vec![14, 9]);
        assert_eq!(roll.selected, 14);
        assert_eq!(roll.total, 21);
    }

    #[test]
    fn disadvantage_keeps_lower() {
        let mut roller = DiceRoller::scripted([14, 9]);
        let roll = roller.skill_roll("stealth", 0, AdvantageState::Disadvantage, "c1");
        assert_eq!(roll.selected, 9);
    }

    #[test]
    fn attack_natural_twenty_is_critical() {
        let mut roller = DiceRoller::scripted([20]);
        let attack = roller.attack_roll(-5, AdvantageState::Normal, "c1");
        assert!(attack.is_critical_hit);
        assert!(!attack.is_critical_miss);
    }

    #[test]
    fn attack_natural_one_is_miss() {
        let mut roller = DiceRoller::scripted([1]);
        let attack = roller.attack_roll(10, AdvantageState::Normal, "c1");
        assert!(attack.is_critical_miss);
        assert!(!attack.is_critical_hit);
    }

    #[test]
    fn saving_throw_labelled_by_ability() {
        let mut roller = DiceRoller::scripted([10]);
        let roll = roller.saving_throw("Dexterity", 3, AdvantageState::Normal, "c1");
        assert_eq!(roll.skill, "save_dexterity");
        assert_eq!(roller.statistics().by_skill["save_dexterity"], 1);
    }

    #[test]
    fn damage_roll_records_dice_terms() {
        let expr = DamageExpression::parse("2d6+3").unwrap();
        let mut roller = DiceRoller::scripted([4, 5]);
        let outcome = roller.damage_roll(&expr, 0);
        assert_eq!(outcome.total, 12);
        // One history event for the single dice term; the constant is not a roll.
        assert_eq!(roller.history().len(), 1);
        assert_eq!(roller.history().events()[0].raw_rolls, vec![4, 5]);
    }

    #[test]
    fn percentile_combines_digits() {
        // 3 and 7 → 37
        let mut roller = DiceRoller::scripted([3, 7]);
        assert_eq!(roller.percentile_roll(), 37);
    }

    #[test]
    fn percentile_double_zero_is_hundred() {
        // 10 % 10 == 0 for both digits
        let mut roller = DiceRoller::scripted([10, 10]);
        assert_eq!(roller.percentile_roll(), 100);
    }

    #[test]
    fn statistics_track_by_correlation() {
        let mut roller = DiceRoller::scripted([20, 1]);
        roller.skill_roll("perception", 0, AdvantageState::Normal, "a");
        roller.skill_roll("perception", 0, AdvantageState::Normal, "b");
        assert_eq!(roller.statistics().natural_twenties, 1);
        assert_eq!(roller.statistics_for("a").count, 1);
        assert_eq!(roller.statistics_for("a").natural_twenties, 1);
        assert_eq!(roller.statistics_for("b").natural_ones, 1);
    }

    #[test]
    fn clear_history() {
        let mut roller = DiceRoller::seeded(1);
        roller.roll_die(Die::D20);
        roller.clear_history();
        assert!(roller.history().is_empty());
    }
}
