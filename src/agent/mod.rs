//! Agent stages — the uniform wrapper around each pipeline position.
//!
//! Every stage follows the same shape: receive messages → consult the
//! oracle → resolve actions → write state → send a message onward →
//! log. Only the prompt, the declared capability list, and the state
//! fields read/written differ per stage.
//!
//! ## Stages
//!
//! - `intake`: deterministic fetch + extract (no oracle decision point)
//! - `analysis`: content analysis via a decision-only oracle function
//! - `lookup`: corpus lookups chosen by the oracle
//! - `reporting`: gated report creation and optional external sharing
//! - `prompts`: stage prompt templates

pub mod analysis;
pub mod intake;
pub mod lookup;
pub mod prompts;
pub mod reporting;

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::bus::MessageBus;
use crate::oracle::{DeclaredAction, Oracle, OracleError};
use crate::state::WorkflowState;
use crate::tools::{ToolError, ToolRegistry, ToolSpec};

/// Collaborators shared by every stage for the duration of one run.
/// The bus is per-run; oracle and registry may be shared across runs.
pub struct StageContext {
    pub bus: Arc<MessageBus>,
    pub oracle: Arc<dyn Oracle>,
    pub registry: Arc<ToolRegistry>,
    pub cancel: CancellationToken,
}

impl StageContext {
    /// Consult the oracle, honoring cancellation.
    pub async fn consult(
        &self,
        prompt: &str,
        declared: &[ToolSpec],
    ) -> Result<Vec<DeclaredAction>, OracleError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(OracleError::Cancelled),
            result = self.oracle.consult(prompt, declared) => result,
        }
    }

    /// Invoke a registry tool directly, honoring cancellation. Used by
    /// the deterministic intake path and stage fallbacks; oracle-chosen
    /// actions go through the resolver instead.
    pub async fn invoke_tool(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(ToolError::Cancelled),
            result = self.registry.invoke(name, args) => result,
        }
    }
}

/// One position in the fixed pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Stage name, as used in state bookkeeping and message routing.
    fn name(&self) -> &str;

    /// Run this stage: consume the incoming state by value, return the
    /// outgoing state. Must never fail past this boundary — internal
    /// faults become an `errors` append plus `next_stage = "end"`, and
    /// the partially mutated state is still returned so downstream
    /// aggregation sees partial progress.
    async fn execute(&self, state: WorkflowState, ctx: &StageContext) -> WorkflowState;
}
