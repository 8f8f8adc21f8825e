//! Check outcomes: the fully-provenanced decision record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::policy::DcAdjustment;
use crate::request::CharacterId;
use tk_dice::AdvantageState;

/// The decision record emitted for every processed check.
///
/// Carries full provenance: where the DC came from, which adjustments
/// moved it, every advantage and disadvantage reason, and the modifier
/// composition. Auto-resolved and failed requests use the same shape so
/// a session log can distinguish "no check was necessary" from "the
/// engine could not evaluate this request".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// Whether the action succeeded.
    pub success: bool,
    /// Whether a die was actually rolled.
    pub check_needed: bool,
    /// Roll total including modifiers (0 when no roll happened).
    pub roll_total: i32,
    /// Every die value rolled.
    pub raw_rolls: Vec<u32>,
    /// The die value that was kept.
    pub selected_roll: u32,
    /// The final DC after adjustment.
    pub dc: i32,
    /// Where the base DC came from.
    pub dc_source: String,
    /// Named deltas applied to the base DC.
    pub dc_adjustments: Vec<DcAdjustment>,
    /// How the d20s were rolled.
    pub advantage_state: AdvantageState,
    /// Every reason granting advantage.
    pub advantage_sources: Vec<String>,
    /// Every reason imposing disadvantage.
    pub disadvantage_sources: Vec<String>,
    /// The actor's total modifier.
    pub character_modifier: i32,
    /// Human-readable modifier composition.
    pub modifier_breakdown: String,
    /// Human-readable roll composition.
    pub roll_breakdown: String,
    /// Id threading this request through all stages.
    pub correlation_id: String,
    /// Who acted.
    pub actor: CharacterId,
    /// The skill that was tested, when any.
    pub skill: Option<String>,
    /// When the outcome was produced.
    pub timestamp: DateTime<Utc>,
    /// Why the requirement was decided the way it was.
    pub reason: String,
    /// Set when a pipeline stage failed; the outcome is then a failure
    /// record, not a resolved check.
    pub error: Option<String>,
}

impl CheckOutcome {
    /// An outcome resolved without a roll (auto success/failure or no
    /// check needed).
    pub fn auto(
        correlation_id: impl Into<String>,
        actor: CharacterId,
        skill: Option<String>,
        success: bool,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            success,
            check_needed: false,
            roll_total: 0,
            raw_rolls: Vec::new(),
            selected_roll: 0,
            dc: 0,
            dc_source: "none".to_string(),
            dc_adjustments: Vec::new(),
            advantage_state: AdvantageState::Normal,
            advantage_sources: Vec::new(),
            disadvantage_sources: Vec::new(),
            character_modifier: 0,
            modifier_breakdown: String::new(),
            roll_breakdown: String::new(),
            correlation_id: correlation_id.into(),
            actor,
            skill,
            timestamp: Utc::now(),
            reason: reason.into(),
            error: None,
        }
    }

    /// A failure record for a pipeline stage error.
    pub fn failed(
        correlation_id: impl Into<String>,
        actor: CharacterId,
        skill: Option<String>,
        error: impl Into<String>,
    ) -> Self {
        let error = error.into();
        let mut outcome = Self::auto(
            correlation_id,
            actor,
            skill,
            false,
            "check could not be evaluated",
        );
        outcome.error = Some(error);
        outcome
    }
}

impl std::fmt::Display for CheckOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(error) = &self.error {
            return write!(f, "[{}] error: {error}", self.correlation_id);
        }
        if !self.check_needed {
            return write!(
                f,
                "[{}] {} ({})",
                self.correlation_id,
                if self.success { "success" } else { "failure" },
                self.reason
            );
        }
        write!(
            f,
            "[{}] {} vs DC {}: {}",
            self.correlation_id,
            self.roll_total,
            self.dc,
            if self.success { "success" } else { "failure" }
        )
    }
}

/// The result of a contested (opposed) check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContestResult {
    /// The higher-rolling actor, or `None` on a tie.
    pub winner: Option<CharacterId>,
    /// Absolute difference between the two totals; 0 on a tie.
    pub margin: i32,
    /// The first actor's outcome.
    pub first: CheckOutcome,
    /// The second actor's outcome.
    pub second: CheckOutcome,
}

impl std::fmt::Display for ContestResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.winner {
            Some(winner) => write!(f, "{winner} wins by {}", self.margin),
            None => write!(f, "tie"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn auto_outcome_carries_reason() {
        let outcome = CheckOutcome::auto(
            "c1",
            CharacterId::new("pc-1"),
            None,
            true,
            "action is trivial",
        );
        assert!(outcome.success);
        assert!(!outcome.check_needed);
        assert_eq!(outcome.error, None);
        assert!(outcome.to_string().contains("trivial"));
    }

    #[test]
    fn failed_outcome_carries_error() {
        let outcome = CheckOutcome::failed(
            "c2",
            CharacterId::new("pc-1"),
            Some("stealth".to_string()),
            "unknown rule: x",
        );
        assert!(!outcome.success);
        assert_eq!(outcome.error.as_deref(), Some("unknown rule: x"));
        assert!(outcome.to_string().contains("error"));
    }

    #[test]
    fn contest_display() {
        let first = CheckOutcome::auto("a", CharacterId::new("a"), None, true, "r");
        let second = CheckOutcome::auto("b", CharacterId::new("b"), None, false, "r");
        let contest = ContestResult {
            winner: Some(CharacterId::new("a")),
            margin: 4,
            first: first.clone(),
            second: second.clone(),
        };
        assert_eq!(contest.to_string(), "a wins by 4");

        let tie = ContestResult {
            winner: None,
            margin: 0,
            first,
            second,
        };
        assert_eq!(tie.to_string(), "tie");
    }
}
