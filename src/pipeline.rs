//! Pipeline driver — wires the four fixed stages and aggregates the outcome.
//!
//! Topology is fixed and linear: intake → analysis → lookup → reporting.
//! The driver owns the per-run bus and state, threads the state value
//! through each stage, and never skips a stage — an upstream failure
//! sets `next_stage = "end"` but downstream stages still run on the
//! degraded state and defend against empty inputs.

use futures_util::FutureExt;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::agent::analysis::AnalysisStage;
use crate::agent::intake::IntakeStage;
use crate::agent::lookup::LookupStage;
use crate::agent::reporting::ReportingStage;
use crate::agent::{Stage, StageContext};
use crate::bus::{Envelope, MessageBus};
use crate::config::OracleConfig;
use crate::oracle::client::ChatClient;
use crate::oracle::Oracle;
use crate::state::{LogEntry, WorkflowState, STAGE_END};
use crate::tools::{standard_registry, ToolRegistry};

/// Aggregate result of one pipeline run. Partial results are always
/// returned, never discarded.
#[derive(Debug, Serialize)]
pub struct RunOutcome {
    pub success: bool,
    pub final_report: String,
    pub log: Vec<LogEntry>,
    pub errors: Vec<String>,
    pub message_history: Vec<Envelope>,
    pub summary: RunSummary,
    /// Populated-fields snapshot of the final state.
    pub status: Value,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub stages_executed: usize,
    pub final_stage: String,
    pub has_errors: bool,
}

impl RunOutcome {
    fn aggregate(success: bool, state: WorkflowState, bus: &MessageBus) -> Self {
        let stages_executed = state
            .log
            .iter()
            .map(|entry| entry.stage.as_str())
            .collect::<HashSet<_>>()
            .len();
        let status = state.status();
        Self {
            success,
            summary: RunSummary {
                stages_executed,
                final_stage: state.current_stage.clone(),
                has_errors: !state.errors.is_empty(),
            },
            final_report: state.final_report,
            log: state.log,
            errors: state.errors,
            message_history: bus.history(),
            status,
        }
    }
}

/// The pipeline driver. Oracle and registry are shared collaborators;
/// each run gets its own state and bus.
pub struct Pipeline {
    oracle: Arc<dyn Oracle>,
    registry: Arc<ToolRegistry>,
}

impl Pipeline {
    pub fn new(oracle: Arc<dyn Oracle>, registry: Arc<ToolRegistry>) -> Self {
        Self { oracle, registry }
    }

    /// Production wiring: chat-completions oracle plus the standard
    /// tool registry, documents written to the working directory.
    pub fn standard(config: &OracleConfig) -> Self {
        Self::new(
            Arc::new(ChatClient::new(config)),
            Arc::new(standard_registry(".")),
        )
    }

    /// Run the pipeline for one subject URL.
    pub async fn run(&self, subject_url: &str) -> RunOutcome {
        self.run_with_cancel(subject_url, CancellationToken::new())
            .await
    }

    /// Run with a caller-supplied cancellation signal, propagated to
    /// every stage's oracle and tool calls.
    pub async fn run_with_cancel(
        &self,
        subject_url: &str,
        cancel: CancellationToken,
    ) -> RunOutcome {
        let bus = Arc::new(MessageBus::new());
        let ctx = StageContext {
            bus: bus.clone(),
            oracle: self.oracle.clone(),
            registry: self.registry.clone(),
            cancel,
        };

        let stages: [Box<dyn Stage>; 4] = [
            Box::new(IntakeStage),
            Box::new(AnalysisStage),
            Box::new(LookupStage),
            Box::new(ReportingStage),
        ];

        let mut state = WorkflowState::new(subject_url);
        for stage in &stages {
            tracing::info!(stage = stage.name(), "executing stage");
            // Stages uphold a no-panic contract; if one breaks it, the
            // run is reported failed with the state as of the previous
            // stage.
            let snapshot = state.clone();
            match AssertUnwindSafe(stage.execute(state, &ctx)).catch_unwind().await {
                Ok(next) => state = next,
                Err(_) => {
                    tracing::error!(stage = stage.name(), "stage panicked");
                    let mut failed = snapshot;
                    failed.record_error(format!("{} stage violated its contract", stage.name()));
                    failed.next_stage = STAGE_END.into();
                    return RunOutcome::aggregate(false, failed, &bus);
                }
            }
        }

        RunOutcome::aggregate(true, state, &bus)
    }
}
