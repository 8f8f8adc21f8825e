//! Rule-interpretation profiles.
//!
//! A profile is an immutable snapshot of named rule values with
//! provenance. The presets mirror three table styles: strict
//! rules-as-written, a common house-rule set, and a forgiving
//! low-difficulty variant. `Custom` starts from rules-as-written and is
//! meant to be reshaped through custom rules.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The value a rule resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleValue {
    /// An on/off rule.
    Bool(bool),
    /// A numeric rule (adjustment, cap).
    Int(i32),
}

impl RuleValue {
    /// The boolean value, if this is a boolean rule.
    pub fn as_bool(self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(b),
            Self::Int(_) => None,
        }
    }

    /// The integer value, if this is a numeric rule.
    pub fn as_int(self) -> Option<i32> {
        match self {
            Self::Int(n) => Some(n),
            Self::Bool(_) => None,
        }
    }
}

impl std::fmt::Display for RuleValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

/// One rule in a profile, with provenance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleEntry {
    /// The rule's value under this profile.
    pub value: RuleValue,
    /// What the rule controls.
    pub description: String,
    /// Where the interpretation comes from.
    pub source: String,
}

/// Which rule-interpretation profile is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileKind {
    /// Rules as written.
    Raw,
    /// Common house rules (flanking advantage, generous criticals).
    House,
    /// Forgiving table: lower DCs, no stress penalties.
    Easy,
    /// Starts from rules-as-written; meant to be reshaped via custom rules.
    Custom,
}

impl ProfileKind {
    /// Parse a profile name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "raw" => Some(Self::Raw),
            "house" => Some(Self::House),
            "easy" => Some(Self::Easy),
            "custom" => Some(Self::Custom),
            _ => None,
        }
    }
}

impl std::fmt::Display for ProfileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Raw => write!(f, "raw"),
            Self::House => write!(f, "house"),
            Self::Easy => write!(f, "easy"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// An immutable named rule set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyProfile {
    /// Which preset this is.
    pub kind: ProfileKind,
    rules: BTreeMap<String, RuleEntry>,
}

impl PolicyProfile {
    /// Build the preset for a profile kind.
    pub fn preset(kind: ProfileKind) -> Self {
        let (flanking, dc_adjustment, crit_success, stress_penalty) = match kind {
            ProfileKind::Raw | ProfileKind::Custom => (false, 0, false, 2),
            ProfileKind::House => (true, 0, true, 2),
            ProfileKind::Easy => (true, -2, true, 0),
        };
        let source = match kind {
            ProfileKind::Raw => "rules as written",
            ProfileKind::House => "house rules",
            ProfileKind::Easy => "easy mode",
            ProfileKind::Custom => "custom baseline (rules as written)",
        };

        let mut rules = BTreeMap::new();
        let mut add = |name: &str, value: RuleValue, description: &str| {
            rules.insert(
                name.to_string(),
                RuleEntry {
                    value,
                    description: description.to_string(),
                    source: source.to_string(),
                },
            );
        };

        add(
            "flanking_advantage",
            RuleValue::Bool(flanking),
            "flanking a combatant grants advantage",
        );
        add(
            "global_dc_adjustment",
            RuleValue::Int(dc_adjustment),
            "flat adjustment applied to every derived DC",
        );
        add(
            "critical_skill_success",
            RuleValue::Bool(crit_success),
            "a natural 20 always succeeds on skill checks",
        );
        add(
            "modifier_cap",
            RuleValue::Int(20),
            "largest absolute modifier accepted on a roll",
        );
        add(
            "stress_dc_penalty",
            RuleValue::Int(stress_penalty),
            "DC increase in high-stress environments",
        );

        Self { kind, rules }
    }

    /// Look up a rule entry.
    pub fn rule(&self, name: &str) -> Option<&RuleEntry> {
        self.rules.get(name)
    }

    /// Iterate rules in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RuleEntry)> {
        self.rules.iter()
    }
}
