//! Shared workflow state threaded through every pipeline stage.
//!
//! One `WorkflowState` value exists per run. Each stage consumes it by
//! value, mutates only the fields it owns, and returns a new value to
//! the driver — the caller's copy is never mutated in place. `log` and
//! `errors` are append-only; the content fields are replaced wholesale
//! by the stage that produces them.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

/// Stage names, as used in state bookkeeping and message routing.
pub const STAGE_INTAKE: &str = "intake";
pub const STAGE_ANALYSIS: &str = "analysis";
pub const STAGE_LOOKUP: &str = "lookup";
pub const STAGE_REPORTING: &str = "reporting";

/// Sentinel `next_stage` value signalling termination.
pub const STAGE_END: &str = "end";

/// One audit-trail entry — a meaningful side effect or decision a stage took.
#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub stage: String,
    pub action: String,
    pub details: Value,
    pub timestamp: DateTime<Utc>,
}

/// Structured result of the analysis stage.
///
/// A closed record: the oracle's function-call arguments are parsed into
/// this shape with every missing key defaulted, so downstream stages never
/// duck-type against free-form maps.
#[derive(Debug, Clone, Default, Serialize, serde::Deserialize)]
#[serde(default)]
pub struct AnalysisReport {
    pub summary: String,
    pub topics: Vec<String>,
    pub needs_lookup: bool,
    pub lookup_topics: Vec<String>,
    pub needs_external_sharing: bool,
    pub sharing_reason: String,
    pub sharing_target: String,
}

/// The single mutable record threaded through the pipeline.
#[derive(Debug, Clone, Serialize)]
pub struct WorkflowState {
    /// Immutable after creation.
    pub subject_url: String,
    pub raw_content: String,
    pub extracted_text: String,
    /// Written once, by the analysis stage. `None` until then.
    pub analysis: Option<AnalysisReport>,
    /// Accumulated by the lookup stage, keyed by lookup topic.
    pub lookup_results: BTreeMap<String, Value>,
    /// Written by the terminal stage; empty if generation failed.
    pub final_report: String,
    pub current_stage: String,
    pub next_stage: String,
    /// Append-only. A populated list marks the run as degraded but does
    /// not, by itself, stop pipeline progress.
    pub errors: Vec<String>,
    /// Append-only audit trail.
    pub log: Vec<LogEntry>,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl WorkflowState {
    /// Seed the state for a new run.
    pub fn new(subject_url: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            subject_url: subject_url.into(),
            raw_content: String::new(),
            extracted_text: String::new(),
            analysis: None,
            lookup_results: BTreeMap::new(),
            final_report: String::new(),
            current_stage: STAGE_INTAKE.into(),
            next_stage: String::new(),
            errors: Vec::new(),
            log: Vec::new(),
            created_at: now,
            last_updated: now,
        }
    }

    /// Append an audit-trail entry.
    pub fn log_action(&mut self, stage: &str, action: &str, details: Value) {
        self.log.push(LogEntry {
            stage: stage.into(),
            action: action.into(),
            details,
            timestamp: Utc::now(),
        });
    }

    /// Record a human-readable error. Never clears prior entries.
    pub fn record_error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
    }

    /// Mark a stage-local failure: append the error and short-circuit
    /// the stage chain to the end sentinel.
    pub fn fail(&mut self, stage: &str, message: impl std::fmt::Display) {
        self.record_error(format!("{stage} stage error: {message}"));
        self.next_stage = STAGE_END.into();
    }

    /// Refresh the bookkeeping timestamp. Stages call this on return.
    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }

    /// Snapshot of which fields are populated, for observability.
    pub fn status(&self) -> Value {
        json!({
            "current_stage": &self.current_stage,
            "next_stage": &self.next_stage,
            "actions_logged": self.log.len(),
            "has_content": !self.extracted_text.is_empty(),
            "has_analysis": self.analysis.is_some(),
            "has_lookup_results": !self.lookup_results.is_empty(),
            "has_report": !self.final_report.is_empty(),
            "errors": &self.errors,
        })
    }
}
