//! HTTP client for an OpenAI-compatible chat-completions oracle.
//!
//! Serde-serializable wire types for function calling; the client maps
//! the model's tool calls back into `DeclaredAction`s. A reserved
//! `result_binding` argument, when the model supplies one, is stripped
//! from the arguments and promoted to `DeclaredAction::result_binding`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;

use super::{DeclaredAction, Oracle, OracleError};
use crate::config::OracleConfig;
use crate::tools::ToolSpec;

const RESULT_BINDING_KEY: &str = "result_binding";

/// Request body for the chat-completions endpoint.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<FunctionTool>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// A declared capability in OpenAI function-calling form.
#[derive(Debug, Serialize)]
struct FunctionTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: FunctionSpec,
}

#[derive(Debug, Serialize)]
struct FunctionSpec {
    name: String,
    description: String,
    parameters: Value,
}

impl From<&ToolSpec> for FunctionTool {
    fn from(spec: &ToolSpec) -> Self {
        Self {
            tool_type: "function",
            function: FunctionSpec {
                name: spec.name.clone(),
                description: spec.description.clone(),
                parameters: spec.arguments.clone(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    tool_calls: Option<Vec<ToolCallWire>>,
}

#[derive(Debug, Deserialize)]
struct ToolCallWire {
    function: FunctionCallWire,
}

#[derive(Debug, Deserialize)]
struct FunctionCallWire {
    name: String,
    /// JSON-encoded arguments object, as the API delivers it.
    arguments: String,
}

/// Chat-completions client with a caller-supplied per-call timeout.
#[derive(Debug)]
pub struct ChatClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl ChatClient {
    pub fn new(config: &OracleConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            timeout: config.timeout,
        }
    }
}

#[async_trait]
impl Oracle for ChatClient {
    async fn consult(
        &self,
        prompt: &str,
        declared: &[ToolSpec],
    ) -> Result<Vec<DeclaredAction>, OracleError> {
        let request = ChatRequest {
            model: self.model.clone(),
            max_tokens: 1024,
            temperature: 0.3,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: prompt.into(),
            }],
            tools: declared.iter().map(FunctionTool::from).collect(),
        };

        let url = format!("{}/chat/completions", self.base_url);
        let send = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send();

        let response = tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| OracleError::Timeout(self.timeout))??;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_else(|_| "(no body)".into());
            return Err(OracleError::Api {
                status,
                message: body,
            });
        }

        let resp: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::InvalidResponse(format!("failed to parse response: {e}")))?;

        let calls = resp
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.tool_calls)
            .unwrap_or_default();

        Ok(calls.into_iter().map(to_declared_action).collect())
    }
}

fn to_declared_action(call: ToolCallWire) -> DeclaredAction {
    // Malformed argument payloads degrade to an empty object rather
    // than failing the whole consultation.
    let mut arguments: Value =
        serde_json::from_str(&call.function.arguments).unwrap_or_else(|_| json!({}));

    let result_binding = arguments
        .as_object_mut()
        .and_then(|map| map.remove(RESULT_BINDING_KEY))
        .and_then(|v| v.as_str().map(String::from));

    DeclaredAction {
        tool: call.function.name,
        arguments,
        result_binding,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_serializes_function_tools() {
        let spec = ToolSpec {
            name: "db.lookup".into(),
            description: "Search internal databases.".into(),
            arguments: json!({"type": "object", "properties": {"topic": {"type": "string"}}}),
        };
        let request = ChatRequest {
            model: "test-model".into(),
            max_tokens: 1024,
            temperature: 0.3,
            messages: vec![ChatMessage {
                role: "user".into(),
                content: "hi".into(),
            }],
            tools: vec![FunctionTool::from(&spec)],
        };

        let wire = serde_json::to_value(&request).unwrap();
        assert_eq!(wire["tools"][0]["type"], "function");
        assert_eq!(wire["tools"][0]["function"]["name"], "db.lookup");
        assert_eq!(
            wire["tools"][0]["function"]["parameters"]["properties"]["topic"]["type"],
            "string"
        );
    }

    #[test]
    fn request_skips_empty_tools() {
        let request = ChatRequest {
            model: "m".into(),
            max_tokens: 1,
            temperature: 0.0,
            messages: vec![],
            tools: vec![],
        };
        let wire = serde_json::to_value(&request).unwrap();
        assert!(wire.get("tools").is_none());
    }

    #[test]
    fn response_parses_tool_calls() {
        let body = r#"{
            "choices": [{
                "message": {
                    "tool_calls": [{
                        "function": {
                            "name": "db.lookup",
                            "arguments": "{\"topic\": \"pricing\"}"
                        }
                    }]
                }
            }]
        }"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        let calls = resp.choices[0].message.tool_calls.as_ref().unwrap();
        assert_eq!(calls[0].function.name, "db.lookup");
    }

    #[test]
    fn response_without_tool_calls_parses() {
        let body = r#"{"choices": [{"message": {"content": "just text"}}]}"#;
        let resp: ChatResponse = serde_json::from_str(body).unwrap();
        assert!(resp.choices[0].message.tool_calls.is_none());
    }

    #[test]
    fn declared_action_extracts_result_binding() {
        let call = ToolCallWire {
            function: FunctionCallWire {
                name: "db.lookup".into(),
                arguments: r#"{"topic": "pricing", "result_binding": "pricing_data"}"#.into(),
            },
        };
        let action = to_declared_action(call);
        assert_eq!(action.tool, "db.lookup");
        assert_eq!(action.result_binding.as_deref(), Some("pricing_data"));
        assert_eq!(action.arguments["topic"], "pricing");
        assert!(action.arguments.get(RESULT_BINDING_KEY).is_none());
    }

    #[test]
    fn malformed_arguments_degrade_to_empty_object() {
        let call = ToolCallWire {
            function: FunctionCallWire {
                name: "db.lookup".into(),
                arguments: "not json".into(),
            },
        };
        let action = to_declared_action(call);
        assert_eq!(action.arguments, json!({}));
        assert!(action.result_binding.is_none());
    }
}
