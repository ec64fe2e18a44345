//! Lookup stage — oracle-chosen corpus queries via the action resolver.
//!
//! The oracle may declare zero or more `db.lookup` actions, each a
//! separate query. When it declares none, the stage falls back to
//! querying the suggested topics itself so downstream reporting never
//! starves.

use async_trait::async_trait;
use serde_json::json;

use super::analysis::DEFAULT_LOOKUP_TOPIC;
use super::{prompts, Stage, StageContext};
use crate::resolver::resolve_actions;
use crate::state::{AnalysisReport, WorkflowState, STAGE_LOOKUP, STAGE_REPORTING};

pub const LOOKUP_TOOL: &str = "db.lookup";

pub struct LookupStage;

#[async_trait]
impl Stage for LookupStage {
    fn name(&self) -> &str {
        STAGE_LOOKUP
    }

    async fn execute(&self, mut state: WorkflowState, ctx: &StageContext) -> WorkflowState {
        state.current_stage = STAGE_LOOKUP.into();

        // Message payload wins over state for the analysis record.
        let inbox = ctx.bus.receive(STAGE_LOOKUP);
        let analysis: AnalysisReport = inbox
            .last()
            .and_then(|m| m.payload.get("analysis"))
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .or_else(|| state.analysis.clone())
            .unwrap_or_default();

        let topics = if analysis.lookup_topics.is_empty() {
            vec![DEFAULT_LOOKUP_TOPIC.to_string()]
        } else {
            analysis.lookup_topics.clone()
        };

        let declared = match ctx.registry.spec(LOOKUP_TOOL) {
            Some(spec) => vec![spec],
            None => Vec::new(),
        };

        let actions = match ctx
            .consult(&prompts::lookup_prompt(&analysis, &topics), &declared)
            .await
        {
            Ok(actions) => actions,
            Err(e) => {
                state.fail(STAGE_LOOKUP, e);
                state.touch();
                return state;
            }
        };

        // Only the declared capability executes here: actions naming
        // any other tool are dropped before resolution, side effects
        // included.
        let actions: Vec<_> = actions
            .into_iter()
            .filter(|a| {
                if a.tool == LOOKUP_TOOL {
                    true
                } else {
                    tracing::warn!(tool = %a.tool, "dropping undeclared action");
                    false
                }
            })
            .collect();

        if actions.is_empty() {
            // No oracle decision — query the suggested topics directly.
            for topic in &topics {
                match ctx.invoke_tool(LOOKUP_TOOL, json!({"topic": topic})).await {
                    Ok(result) => {
                        state.lookup_results.insert(topic.clone(), result);
                    }
                    Err(e) => {
                        state.fail(STAGE_LOOKUP, e);
                        state.touch();
                        return state;
                    }
                }
            }
        } else {
            let resolution = match resolve_actions(&ctx.registry, &actions, &ctx.cancel).await {
                Ok(resolution) => resolution,
                Err(e) => {
                    state.fail(STAGE_LOOKUP, e);
                    state.touch();
                    return state;
                }
            };
            for outcome in resolution.outcomes {
                let topic = outcome.arguments["topic"]
                    .as_str()
                    .unwrap_or(DEFAULT_LOOKUP_TOPIC)
                    .to_string();
                if let Some(error) = outcome.error {
                    state.record_error(format!("lookup for '{topic}' failed: {error}"));
                }
                state.lookup_results.insert(topic, outcome.result);
            }
        }

        state.log_action(
            STAGE_LOOKUP,
            "corpus_lookup",
            json!({"lookups_performed": state.lookup_results.len()}),
        );

        ctx.bus.send(
            STAGE_LOOKUP,
            STAGE_REPORTING,
            json!({
                "lookup_results": &state.lookup_results,
                "analysis": &analysis,
            }),
        );

        state.next_stage = STAGE_REPORTING.into();
        state.touch();
        state
    }
}
