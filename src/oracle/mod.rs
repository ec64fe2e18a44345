//! Decision oracle — how stages choose among declared actions.
//!
//! Stages hand the oracle a prompt plus the capability specs they are
//! willing to act on; the oracle answers with zero or more chosen
//! actions. An empty answer is a valid, non-error outcome every caller
//! must default around.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use crate::tools::ToolSpec;

/// Errors from oracle consultations.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("missing API key: {0}")]
    MissingApiKey(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("cancelled")]
    Cancelled,
}

/// One action chosen by the oracle: a tool, its arguments, and an
/// optional name to bind the result under for later actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeclaredAction {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
    #[serde(default)]
    pub result_binding: Option<String>,
}

impl DeclaredAction {
    pub fn new(tool: impl Into<String>, arguments: Value) -> Self {
        Self {
            tool: tool.into(),
            arguments,
            result_binding: None,
        }
    }
}

/// The external decision-making collaborator consulted by each stage.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Ask for a decision among `declared` capabilities.
    async fn consult(
        &self,
        prompt: &str,
        declared: &[ToolSpec],
    ) -> Result<Vec<DeclaredAction>, OracleError>;
}
