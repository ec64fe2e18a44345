//! Reporting stage — gated report creation and optional external sharing.
//!
//! Least-privilege gating: the oracle is offered the `http.post`
//! capability only when the analysis marked external sharing as
//! required. The `docs.create` capability is always offered, and a
//! deterministic fallback template guarantees a non-empty report on
//! any run that does not fail inside this stage.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use super::{prompts, Stage, StageContext};
use crate::resolver::resolve_actions;
use crate::state::{AnalysisReport, WorkflowState, STAGE_END, STAGE_REPORTING};
use crate::tools::ToolSpec;

pub const REPORT_TOOL: &str = "docs.create";
pub const SHARE_TOOL: &str = "http.post";

const FALLBACK_FILENAME: &str = "competitive_analysis_report.md";

pub struct ReportingStage;

/// Capabilities offered to the oracle for this consultation. The
/// external-send tool appears only when the analysis requires sharing.
pub fn declared_specs(ctx: &StageContext, needs_sharing: bool) -> Vec<ToolSpec> {
    let mut declared = Vec::new();
    if needs_sharing {
        if let Some(spec) = ctx.registry.spec(SHARE_TOOL) {
            declared.push(spec);
        }
    }
    if let Some(spec) = ctx.registry.spec(REPORT_TOOL) {
        declared.push(spec);
    }
    declared
}

/// Deterministic report used when the oracle produces no report action.
pub fn fallback_report(
    analysis: &AnalysisReport,
    lookup_results: &BTreeMap<String, Value>,
) -> String {
    let summary = if analysis.summary.is_empty() {
        "No analysis available"
    } else {
        &analysis.summary
    };
    let topics = if analysis.topics.is_empty() {
        "none identified".to_string()
    } else {
        analysis.topics.join(", ")
    };
    let lookups = if lookup_results.is_empty() {
        "No internal data gathered.".to_string()
    } else {
        lookup_results
            .keys()
            .map(|topic| format!("- {topic}"))
            .collect::<Vec<_>>()
            .join("\n")
    };

    format!(
        "\
# Competitive Analysis Report

## Analysis Summary
{summary}

## Key Topics Identified
{topics}

## Internal Data Consulted
{lookups}

## Recommendations
### Strategic Insights
- **Market Analysis**: Competitive positioning analysis completed
- **Business Intelligence**: Key market trends and opportunities identified

### Action Items
1. Review competitive positioning and market opportunities
2. Develop strategic response to identified market gaps
3. Monitor competitive landscape for emerging trends
"
    )
}

#[async_trait]
impl Stage for ReportingStage {
    fn name(&self) -> &str {
        STAGE_REPORTING
    }

    async fn execute(&self, mut state: WorkflowState, ctx: &StageContext) -> WorkflowState {
        state.current_stage = STAGE_REPORTING.into();
        // Terminal stage, no matter what happens below.
        state.next_stage = STAGE_END.into();

        // Message payload wins over state for upstream results.
        let inbox = ctx.bus.receive(STAGE_REPORTING);
        let latest = inbox.last();
        let analysis: AnalysisReport = latest
            .and_then(|m| m.payload.get("analysis"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .or_else(|| state.analysis.clone())
            .unwrap_or_default();
        let lookup_results: BTreeMap<String, Value> = latest
            .and_then(|m| m.payload.get("lookup_results"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_else(|| state.lookup_results.clone());

        let declared = declared_specs(ctx, analysis.needs_external_sharing);
        let prompt = prompts::reporting_prompt(&state.extracted_text, &analysis, &lookup_results);

        let actions = match ctx.consult(&prompt, &declared).await {
            Ok(actions) => actions,
            Err(e) => {
                state.fail(STAGE_REPORTING, e);
                state.touch();
                return state;
            }
        };

        // Only declared capabilities execute: the sharing gate holds
        // even if the oracle names `http.post` unprompted.
        let actions: Vec<_> = actions
            .into_iter()
            .filter(|a| {
                if declared.iter().any(|spec| spec.name == a.tool) {
                    true
                } else {
                    tracing::warn!(tool = %a.tool, "dropping undeclared action");
                    false
                }
            })
            .collect();

        let resolution = match resolve_actions(&ctx.registry, &actions, &ctx.cancel).await {
            Ok(resolution) => resolution,
            Err(e) => {
                state.fail(STAGE_REPORTING, e);
                state.touch();
                return state;
            }
        };

        let mut report_created = false;
        for outcome in &resolution.outcomes {
            match outcome.tool.as_str() {
                REPORT_TOOL => {
                    let refused = outcome.result.get("error").is_some();
                    // A write with no report text does not count as a
                    // created report; the fallback template fires instead.
                    let content = outcome.arguments["content"]
                        .as_str()
                        .filter(|c| !c.is_empty());
                    if outcome.ok() && !refused {
                        match content {
                            Some(content) => {
                                report_created = true;
                                state.final_report = content.to_string();
                                state.log_action(
                                    STAGE_REPORTING,
                                    "report_creation",
                                    json!({"filename": &outcome.result["filename"]}),
                                );
                            }
                            None => {
                                state.record_error(
                                    "report creation produced no content".to_string(),
                                );
                            }
                        }
                    } else {
                        state.record_error(format!(
                            "report creation failed: {}",
                            outcome
                                .error
                                .clone()
                                .unwrap_or_else(|| outcome.result["error"].to_string())
                        ));
                    }
                }
                SHARE_TOOL => {
                    state.log_action(
                        STAGE_REPORTING,
                        "external_sharing",
                        json!({
                            "url": &outcome.arguments["url"],
                            "reason": &analysis.sharing_reason,
                            "result": &outcome.result,
                        }),
                    );
                    if let Some(error) = &outcome.error {
                        state.record_error(format!("external sharing failed: {error}"));
                    }
                }
                _ => {}
            }
        }

        if !report_created {
            let report = fallback_report(&analysis, &lookup_results);
            match ctx
                .invoke_tool(
                    REPORT_TOOL,
                    json!({"content": &report, "filename": FALLBACK_FILENAME}),
                )
                .await
            {
                Ok(result) => {
                    state.log_action(
                        STAGE_REPORTING,
                        "fallback_report_creation",
                        json!({"filename": &result["filename"]}),
                    );
                }
                Err(e) => {
                    // The report text still lands in state even if the
                    // document write failed.
                    state.record_error(format!("fallback report write failed: {e}"));
                }
            }
            state.final_report = report;
        }

        state.touch();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_report_carries_summary_and_topics() {
        let analysis = AnalysisReport {
            summary: "Strong positioning".into(),
            topics: vec!["pricing".into(), "expansion".into()],
            ..Default::default()
        };
        let mut lookups = BTreeMap::new();
        lookups.insert("pricing".to_string(), json!({"sections": {}}));

        let report = fallback_report(&analysis, &lookups);
        assert!(report.contains("Strong positioning"));
        assert!(report.contains("pricing, expansion"));
        assert!(report.contains("- pricing"));
    }

    #[test]
    fn fallback_report_defends_empty_inputs() {
        let report = fallback_report(&AnalysisReport::default(), &BTreeMap::new());
        assert!(report.contains("No analysis available"));
        assert!(report.contains("none identified"));
        assert!(report.contains("No internal data gathered."));
        assert!(!report.is_empty());
    }
}
