//! Intake stage — deterministic fetch and text extraction.
//!
//! The one stage with no decision point: it always fetches the subject
//! URL and extracts its visible text, so the oracle is never consulted.

use async_trait::async_trait;
use serde_json::json;

use super::{Stage, StageContext};
use crate::state::{WorkflowState, STAGE_ANALYSIS, STAGE_INTAKE};

pub struct IntakeStage;

#[async_trait]
impl Stage for IntakeStage {
    fn name(&self) -> &str {
        STAGE_INTAKE
    }

    async fn execute(&self, mut state: WorkflowState, ctx: &StageContext) -> WorkflowState {
        state.current_stage = STAGE_INTAKE.into();

        let fetched = ctx
            .invoke_tool("web.fetch", json!({"url": &state.subject_url}))
            .await;

        let raw = match fetched {
            Ok(value) => value.as_str().unwrap_or_default().to_string(),
            Err(e) => {
                state.fail(STAGE_INTAKE, e);
                state.touch();
                return state;
            }
        };
        state.log_action(STAGE_INTAKE, "fetch", json!({"url": &state.subject_url}));

        let extracted = match ctx.invoke_tool("web.extract", json!({"html": &raw})).await {
            Ok(value) => value.as_str().unwrap_or_default().to_string(),
            Err(e) => {
                state.fail(STAGE_INTAKE, e);
                state.touch();
                return state;
            }
        };
        state.log_action(
            STAGE_INTAKE,
            "extract",
            json!({"text_length": extracted.len()}),
        );

        ctx.bus.send(
            STAGE_INTAKE,
            STAGE_ANALYSIS,
            json!({
                "extracted_text": &extracted,
                "subject_url": &state.subject_url,
            }),
        );

        state.raw_content = raw;
        state.extracted_text = extracted;
        state.next_stage = STAGE_ANALYSIS.into();
        state.touch();
        state
    }
}
