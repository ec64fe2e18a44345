//! Internal lookup corpus — a fixed in-memory dataset queried by topic.
//!
//! Total over its input: unrecognized topics return a no-match marker
//! record rather than failing.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{Tool, ToolError};

/// Query the internal business-data corpus by free-text topic.
#[derive(Debug)]
pub struct CorpusLookup {
    corpus: Value,
}

impl CorpusLookup {
    pub fn new() -> Self {
        Self {
            corpus: builtin_corpus(),
        }
    }

    /// Sections whose keywords appear in the topic, case-insensitively.
    fn matching_sections(&self, topic: &str) -> Map<String, Value> {
        let needle = topic.to_lowercase();
        let mut sections = Map::new();
        for (section, keywords) in SECTION_KEYWORDS {
            if keywords.iter().any(|k| needle.contains(*k)) {
                if let Some(data) = self.corpus.get(*section) {
                    sections.insert((*section).to_string(), data.clone());
                }
            }
        }
        sections
    }
}

impl Default for CorpusLookup {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for CorpusLookup {
    fn name(&self) -> &str {
        "db.lookup"
    }

    fn description(&self) -> &str {
        "Search internal databases by a free-text topic and return matching records."
    }

    fn argument_shape(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "topic": {"type": "string", "description": "Topic to search for"}
            },
            "required": ["topic"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let topic = args.get("topic").and_then(Value::as_str).unwrap_or_default();
        let sections = self.matching_sections(topic);
        if sections.is_empty() {
            return Ok(json!({"topic": topic, "no_match": true}));
        }
        Ok(json!({"topic": topic, "sections": sections}))
    }
}

/// Keywords that route a topic to each corpus section.
const SECTION_KEYWORDS: &[(&str, &[&str])] = &[
    ("customer_records", &["customer", "client", "account", "churn"]),
    ("pricing_data", &["pricing", "price", "cost", "margin", "discount"]),
    (
        "strategic_plans",
        &["strategy", "strategic", "plan", "competit", "market", "intelligence"],
    ),
    ("internal_notes", &["note", "internal"]),
];

fn builtin_corpus() -> Value {
    json!({
        "customer_records": [
            {"id": "C001", "name": "Acme Corp", "revenue": "$2.5M", "status": "active", "contract_value": "$500K"},
            {"id": "C002", "name": "TechStart Inc", "revenue": "$800K", "status": "prospect", "contract_value": "$200K"},
            {"id": "C003", "name": "Global Enterprises", "revenue": "$4.2M", "status": "active", "contract_value": "$1.2M"}
        ],
        "pricing_data": {
            "internal_costs": {"starter": "$45", "pro": "$120", "enterprise": "$280"},
            "profit_margins": {"starter": "85%", "pro": "80%", "enterprise": "78%"},
            "discount_strategies": {"enterprise": "15% volume discount", "annual": "20% prepay discount"}
        },
        "strategic_plans": {
            "q2_objectives": "Increase market share by 15% through aggressive pricing",
            "competitive_threats": "New competitor entering market in Q3 with 30% lower pricing",
            "expansion_plans": "Enter European market with localized pricing strategy"
        },
        "internal_notes": {
            "acme_corp": "Vulnerable to competitor poaching - considering 25% discount",
            "techstart": "High churn risk - needs immediate attention",
            "pricing_strategy": "Planning 15% price increase in Q2 to offset rising costs"
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn recognized_topic_returns_sections() {
        let tool = CorpusLookup::new();
        let result = tool
            .invoke(json!({"topic": "Competitive Intelligence"}))
            .await
            .unwrap();
        assert_eq!(result["topic"], "Competitive Intelligence");
        assert!(result["sections"]["strategic_plans"].is_object());
        assert!(result.get("no_match").is_none());
    }

    #[tokio::test]
    async fn topic_can_match_multiple_sections() {
        let tool = CorpusLookup::new();
        let result = tool
            .invoke(json!({"topic": "customer pricing"}))
            .await
            .unwrap();
        let sections = result["sections"].as_object().unwrap();
        assert!(sections.contains_key("customer_records"));
        assert!(sections.contains_key("pricing_data"));
    }

    #[tokio::test]
    async fn unrecognized_topic_returns_no_match_marker() {
        let tool = CorpusLookup::new();
        let result = tool.invoke(json!({"topic": "weather"})).await.unwrap();
        assert_eq!(result["no_match"], true);
        assert!(result.get("sections").is_none());
    }

    #[tokio::test]
    async fn missing_topic_is_total() {
        let tool = CorpusLookup::new();
        let result = tool.invoke(json!({})).await.unwrap();
        assert_eq!(result["no_match"], true);
    }
}
