//! Analysis stage — content analysis via a decision-only oracle function.
//!
//! The oracle is offered a single `analyze_content` function whose
//! arguments ARE the analysis — it never reaches the registry. The
//! chosen arguments are parsed into the closed `AnalysisReport` record
//! with missing keys defaulted.

use async_trait::async_trait;
use serde_json::json;

use super::{prompts, Stage, StageContext};
use crate::oracle::DeclaredAction;
use crate::state::{AnalysisReport, WorkflowState, STAGE_ANALYSIS, STAGE_LOOKUP};
use crate::tools::ToolSpec;

pub const ANALYZE_FN: &str = "analyze_content";

/// Fallback topic when the oracle declines to analyze.
pub const DEFAULT_LOOKUP_TOPIC: &str = "competitive intelligence";

pub struct AnalysisStage;

/// Declared-action schema for the analysis decision.
pub fn analyze_spec() -> ToolSpec {
    ToolSpec {
        name: ANALYZE_FN.into(),
        description: "Analyze the extracted content and identify key topics and insights."
            .into(),
        arguments: json!({
            "type": "object",
            "properties": {
                "summary": {"type": "string", "description": "Detailed analysis of the content"},
                "topics": {"type": "array", "items": {"type": "string"}, "description": "Key topics found"},
                "needs_lookup": {"type": "boolean", "description": "Whether an internal data lookup is needed"},
                "lookup_topics": {"type": "array", "items": {"type": "string"}, "description": "Topics to look up internally"},
                "needs_external_sharing": {"type": "boolean", "description": "Whether the analysis requires external sharing"},
                "sharing_reason": {"type": "string", "description": "Business reason for external sharing if required"},
                "sharing_target": {"type": "string", "description": "External endpoint URL if sharing is required"}
            },
            "required": ["summary", "topics", "needs_lookup"]
        }),
    }
}

/// Parse the oracle's chosen actions into an analysis report, falling
/// back to a default that still drives one lookup downstream.
pub fn report_from_actions(actions: &[DeclaredAction]) -> AnalysisReport {
    actions
        .iter()
        .find(|a| a.tool == ANALYZE_FN)
        .and_then(|a| serde_json::from_value(a.arguments.clone()).ok())
        .unwrap_or_else(|| AnalysisReport {
            summary: "No analysis available".into(),
            needs_lookup: true,
            lookup_topics: vec![DEFAULT_LOOKUP_TOPIC.into()],
            ..Default::default()
        })
}

#[async_trait]
impl Stage for AnalysisStage {
    fn name(&self) -> &str {
        STAGE_ANALYSIS
    }

    async fn execute(&self, mut state: WorkflowState, ctx: &StageContext) -> WorkflowState {
        state.current_stage = STAGE_ANALYSIS.into();

        // The incoming message wins over state if both carry text.
        let inbox = ctx.bus.receive(STAGE_ANALYSIS);
        let extracted = inbox
            .last()
            .and_then(|m| m.payload.get("extracted_text"))
            .and_then(|v| v.as_str())
            .map(String::from)
            .unwrap_or_else(|| state.extracted_text.clone());

        let actions = match ctx
            .consult(&prompts::analysis_prompt(&extracted), &[analyze_spec()])
            .await
        {
            Ok(actions) => actions,
            Err(e) => {
                state.fail(STAGE_ANALYSIS, e);
                state.touch();
                return state;
            }
        };

        let report = report_from_actions(&actions);
        state.log_action(
            STAGE_ANALYSIS,
            "content_analysis",
            json!({
                "topics": report.topics.len(),
                "needs_lookup": report.needs_lookup,
                "needs_external_sharing": report.needs_external_sharing,
            }),
        );

        ctx.bus.send(
            STAGE_ANALYSIS,
            STAGE_LOOKUP,
            json!({"analysis": &report}),
        );

        state.analysis = Some(report);
        state.next_stage = STAGE_LOOKUP.into();
        state.touch();
        state
    }
}
