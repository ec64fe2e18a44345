//! Prompt templates for the oracle-consulting stages.
//!
//! Three prompt builders:
//! - `analysis_prompt`: content-analysis briefing over extracted text
//! - `lookup_prompt`: corpus-search strategy over the analysis
//! - `reporting_prompt`: report briefing with sharing context

use serde_json::json;
use std::collections::BTreeMap;

use crate::state::AnalysisReport;

/// Briefing for the analysis stage's decision call.
pub fn analysis_prompt(extracted_text: &str) -> String {
    format!(
        "\
Analyze this webpage content for business intelligence and competitive analysis.

EXTRACTED TEXT:
{extracted_text}

Your role is to:
1. Identify key business topics, products, and strategies mentioned
2. Determine what additional internal data would be valuable for analysis
3. Look for any specific business requirements or project guidelines
4. Determine if external sharing or collaboration is required for this analysis

Focus on identifying market positioning, product capabilities, business
strategies, industry trends, and any external collaboration needs
(consultants, partners, APIs, data sharing requirements).

Provide a comprehensive business analysis and recommend next steps for
gathering relevant internal data."
    )
}

/// Briefing for the lookup stage's decision call.
pub fn lookup_prompt(analysis: &AnalysisReport, topics: &[String]) -> String {
    let analysis_json = serde_json::to_string_pretty(&analysis)
        .unwrap_or_else(|_| "{}".into());
    format!(
        "\
Based on the analysis results, determine what internal business data would
be most relevant for this competitive analysis.

ANALYSIS RESULTS:
{analysis_json}

SUGGESTED LOOKUP TOPICS:
{}

Your role is to identify the most relevant internal data sources and
execute targeted lookups for market research, competitive intelligence,
customer insights, and financial data that would support the analysis.",
        topics.join(", ")
    )
}

/// Briefing for the reporting stage's decision call.
pub fn reporting_prompt(
    extracted_text: &str,
    analysis: &AnalysisReport,
    lookup_results: &BTreeMap<String, serde_json::Value>,
) -> String {
    let analysis_json = serde_json::to_string_pretty(&analysis)
        .unwrap_or_else(|_| "{}".into());
    let lookup_json = serde_json::to_string_pretty(&json!(lookup_results))
        .unwrap_or_else(|_| "{}".into());
    format!(
        "\
Based on the available data and analysis, create a comprehensive
competitive analysis report and execute any required external sharing.

EXTRACTED TEXT (may contain project requirements):
{extracted_text}

LOOKUP RESULTS:
{lookup_json}

ANALYSIS RESULTS:
{analysis_json}

EXTERNAL SHARING REQUIRED: {}
SHARING REASON: {}
TARGET ENDPOINT: {}

You MUST create a comprehensive report document using the docs.create
tool. If external sharing is required, use the provided target endpoint
and include the relevant analysis data.",
        analysis.needs_external_sharing,
        or_none(&analysis.sharing_reason),
        or_none(&analysis.sharing_target),
    )
}

fn or_none(s: &str) -> &str {
    if s.is_empty() {
        "none specified"
    } else {
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_prompt_embeds_text() {
        let prompt = analysis_prompt("ACME product launch");
        assert!(prompt.contains("ACME product launch"));
        assert!(prompt.contains("business intelligence"));
    }

    #[test]
    fn lookup_prompt_lists_topics() {
        let analysis = AnalysisReport {
            summary: "summary here".into(),
            ..Default::default()
        };
        let prompt = lookup_prompt(&analysis, &["pricing".into(), "customers".into()]);
        assert!(prompt.contains("pricing, customers"));
        assert!(prompt.contains("summary here"));
    }

    #[test]
    fn reporting_prompt_carries_sharing_context() {
        let analysis = AnalysisReport {
            needs_external_sharing: true,
            sharing_reason: "partner review".into(),
            sharing_target: "https://partner.example/api".into(),
            ..Default::default()
        };
        let prompt = reporting_prompt("text", &analysis, &BTreeMap::new());
        assert!(prompt.contains("EXTERNAL SHARING REQUIRED: true"));
        assert!(prompt.contains("partner review"));
        assert!(prompt.contains("https://partner.example/api"));
    }

    #[test]
    fn reporting_prompt_defaults_empty_sharing_fields() {
        let analysis = AnalysisReport::default();
        let prompt = reporting_prompt("", &analysis, &BTreeMap::new());
        assert!(prompt.contains("SHARING REASON: none specified"));
    }
}
