//! Decision auditing: the sink trait and an in-memory journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::outcome::CheckOutcome;
use crate::request::CheckRequest;

/// Receives one record per processed check.
///
/// Treated as a best-effort sink: the method cannot fail, so a slow or
/// broken implementation can never abort an otherwise-successful check.
pub trait DecisionSink: Send {
    /// Record one processed check.
    fn log_skill_check(
        &mut self,
        correlation_id: &str,
        request: &CheckRequest,
        outcome: &CheckOutcome,
    );
}

/// A sink that discards everything. The engine's default.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DecisionSink for NullSink {
    fn log_skill_check(&mut self, _: &str, _: &CheckRequest, _: &CheckOutcome) {}
}

/// One journaled decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionEntry {
    /// The id threading the request through all stages.
    pub correlation_id: String,
    /// The request as received.
    pub request: CheckRequest,
    /// The outcome that was produced.
    pub outcome: CheckOutcome,
    /// When the entry was journaled.
    pub logged_at: DateTime<Utc>,
}

/// An in-memory decision journal with export.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DecisionLog {
    entries: Vec<DecisionEntry>,
}

impl DecisionLog {
    /// Create an empty journal.
    pub fn new() -> Self {
        Self::default()
    }

    /// All entries, oldest first.
    pub fn entries(&self) -> &[DecisionEntry] {
        &self.entries
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the journal is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Export the journal as markdown.
    pub fn export_markdown(&self) -> String {
        let mut out = String::from("# Check Decision Journal\n\n");
        for entry in &self.entries {
            out.push_str(&format!(
                "## {} — {}\n\n",
                entry.correlation_id, entry.request.action
            ));
            out.push_str(&format!("**Actor**: {}\n", entry.request.actor));
            if let Some(skill) = &entry.request.skill {
                out.push_str(&format!("**Skill**: {skill}\n"));
            }
            out.push_str(&format!("**Result**: {}\n", entry.outcome));
            if entry.outcome.check_needed {
                out.push_str(&format!(
                    "**Roll**: {} (DC {} from {})\n",
                    entry.outcome.roll_breakdown, entry.outcome.dc, entry.outcome.dc_source
                ));
            }
            out.push('\n');
        }
        out
    }

    /// Export the journal as plain text, one line per decision.
    pub fn export_text(&self) -> String {
        let mut out = String::from("Check Decision Journal\n");
        for entry in &self.entries {
            out.push_str(&format!("{}\n", entry.outcome));
        }
        out
    }
}

impl DecisionSink for DecisionLog {
    fn log_skill_check(
        &mut self,
        correlation_id: &str,
        request: &CheckRequest,
        outcome: &CheckOutcome,
    ) {
        self.entries.push(DecisionEntry {
            correlation_id: correlation_id.to_string(),
            request: request.clone(),
            outcome: outcome.clone(),
            logged_at: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::CharacterId;

    fn sample() -> (CheckRequest, CheckOutcome) {
        let request = CheckRequest::new("sneak past", "pc-1").with_skill("stealth");
        let outcome = CheckOutcome::auto(
            "c1",
            CharacterId::new("pc-1"),
            Some("stealth".to_string()),
            true,
            "trivial",
        );
        (request, outcome)
    }

    #[test]
    fn null_sink_discards() {
        let (request, outcome) = sample();
        let mut sink = NullSink;
        sink.log_skill_check("c1", &request, &outcome);
    }

    #[test]
    fn log_appends_entries() {
        let (request, outcome) = sample();
        let mut log = DecisionLog::new();
        assert!(log.is_empty());
        log.log_skill_check("c1", &request, &outcome);
        assert_eq!(log.len(), 1);
        assert_eq!(log.entries()[0].correlation_id, "c1");
    }

    #[test]
    fn markdown_export() {
        let (request, outcome) = sample();
        let mut log = DecisionLog::new();
        log.log_skill_check("c1", &request, &outcome);
        let md = log.export_markdown();
        assert!(md.contains("# Check Decision Journal"));
        assert!(md.contains("sneak past"));
        assert!(md.contains("pc-1"));
    }

    #[test]
    fn text_export() {
        let (request, outcome) = sample();
        let mut log = DecisionLog::new();
        log.log_skill_check("c1", &request, &outcome);
        let text = log.export_text();
        assert!(text.contains("c1"));
    }
}
