//! Append-only roll history and aggregate statistics.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of roll produced a history event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RollKind {
    /// A bare die roll.
    Die,
    /// A skill or ability check.
    Skill,
    /// A saving throw.
    SavingThrow,
    /// An attack roll.
    Attack,
    /// One term of a damage expression.
    Damage,
    /// A percentile (d100) roll.
    Percentile,
}

/// One entry in the roll ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RollEvent {
    /// What kind of roll this was.
    pub kind: RollKind,
    /// Skill or save label, when applicable.
    pub skill: Option<String>,
    /// All die values involved.
    pub raw_rolls: Vec<u32>,
    /// The value that was kept (for d20 rolls) or summed result.
    pub selected: u32,
    /// Final total including modifiers.
    pub total: i32,
    /// Correlation id threading the roll through a request, if any.
    pub correlation_id: Option<String>,
    /// When the roll happened.
    pub rolled_at: DateTime<Utc>,
}

/// Append-only ledger of every roll a roller has made.
///
/// Unbounded unless explicitly cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RollHistory {
    events: Vec<RollEvent>,
}

impl RollHistory {
    /// Create an empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event to the ledger.
    pub fn append(&mut self, event: RollEvent) {
        self.events.push(event);
    }

    /// All events, oldest first.
    pub fn events(&self) -> &[RollEvent] {
        &self.events
    }

    /// Number of recorded events.
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the ledger is empty.
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Remove every recorded event.
    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Statistics over the whole ledger.
    pub fn statistics(&self) -> RollStatistics {
        RollStatistics::from_events(self.events.iter())
    }

    /// Statistics over events with the given correlation id.
    pub fn statistics_for(&self, correlation_id: &str) -> RollStatistics {
        RollStatistics::from_events(
            self.events
                .iter()
                .filter(|e| e.correlation_id.as_deref() == Some(correlation_id)),
        )
    }
}

/// Aggregate statistics over a set of roll events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RollStatistics {
    /// Number of rolls counted.
    pub count: u32,
    /// Mean of the kept values.
    pub average_selected: f64,
    /// Lowest kept value.
    pub min_selected: u32,
    /// Highest kept value.
    pub max_selected: u32,
    /// How many d20 rolls kept a natural 20.
    pub natural_twenties: u32,
    /// How many d20 rolls kept a natural 1.
    pub natural_ones: u32,
    /// Roll counts per skill label.
    pub by_skill: BTreeMap<String, u32>,
}

impl RollStatistics {
    fn from_events<'a>(events: impl Iterator<Item = &'a RollEvent>) -> Self {
        let mut stats = Self {
            min_selected: u32::MAX,
            ..Self::default()
        };
        let mut sum = 0u64;

        for event in events {
            stats.count += 1;
            sum += u64::from(event.selected);
            stats.min_selected = stats.min_selected.min(event.selected);
            stats.max_selected = stats.max_selected.max(event.selected);

            let is_d20 = matches!(
                event.kind,
                RollKind::Skill | RollKind::SavingThrow | RollKind::Attack
            );
            if is_d20 && event.selected == 20 {
                stats.natural_twenties += 1;
            }
            if is_d20 && event.selected == 1 {
                stats.natural_ones += 1;
            }

            if let Some(skill) = &event.skill {
                *stats.by_skill.entry(skill.clone()).or_insert(0) += 1;
            }
        }

        if stats.count == 0 {
            stats.min_selected = 0;
        } else {
            stats.average_selected = sum as f64 / f64::from(stats.count);
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(kind: RollKind, skill: Option<&str>, selected: u32, corr: Option<&str>) -> RollEvent {
        RollEvent {
            kind,
            skill: skill.map(str::to_string),
            raw_rolls: vec![selected],
            selected,
            total: selected as i32,
            correlation_id: corr.map(str::to_string),
            rolled_at: Utc::now(),
        }
    }

    #[test]
    fn empty_history() {
        let history = RollHistory::new();
        assert!(history.is_empty());
        let stats = history.statistics();
        assert_eq!(stats.count, 0);
        assert_eq!(stats.min_selected, 0);
        assert_eq!(stats.max_selected, 0);
    }

    #[test]
    fn statistics_aggregate() {
        let mut history = RollHistory::new();
        history.append(event(RollKind::Skill, Some("stealth"), 20, None));
        history.append(event(RollKind::Skill, Some("stealth"), 1, None));
        history.append(event(RollKind::Skill, Some("perception"), 12, None));

        let stats = history.statistics();
        assert_eq!(stats.count, 3);
        assert_eq!(stats.min_selected, 1);
        assert_eq!(stats.max_selected, 20);
        assert_eq!(stats.natural_twenties, 1);
        assert_eq!(stats.natural_ones, 1);
        assert_eq!(stats.by_skill["stealth"], 2);
        assert_eq!(stats.by_skill["perception"], 1);
        assert!((stats.average_selected - 11.0).abs() < 1e-9);
    }

    #[test]
    fn nat20_only_counted_for_d20_kinds() {
        let mut history = RollHistory::new();
        history.append(event(RollKind::Damage, None, 20, None));
        assert_eq!(history.statistics().natural_twenties, 0);
    }

    #[test]
    fn statistics_filtered_by_correlation() {
        let mut history = RollHistory::new();
        history.append(event(RollKind::Skill, Some("athletics"), 10, Some("a")));
        history.append(event(RollKind::Skill, Some("athletics"), 15, Some("b")));

        let stats = history.statistics_for("a");
        assert_eq!(stats.count, 1);
        assert_eq!(stats.max_selected, 10);
    }

    #[test]
    fn clear_empties_ledger() {
        let mut history = RollHistory::new();
        history.append(event(RollKind::Die, None, 4, None));
        assert_eq!(history.len(), 1);
        history.clear();
        assert!(history.is_empty());
    }
}
