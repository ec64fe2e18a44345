//! Outbound JSON POST tool.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

use super::{Tool, ToolError};

const POST_TIMEOUT: Duration = Duration::from_secs(10);

/// Maximum characters of a non-JSON response body carried back.
const BODY_SNIPPET_LEN: usize = 200;

/// POST a JSON payload to an external URL and report status plus a
/// body snippet. Fails only on transport errors; HTTP error statuses
/// are reported in the result (`ok: false`).
#[derive(Debug, Default)]
pub struct HttpPost {
    http: reqwest::Client,
}

impl HttpPost {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Tool for HttpPost {
    fn name(&self) -> &str {
        "http.post"
    }

    fn description(&self) -> &str {
        "Send analysis data to an external endpoint as JSON."
    }

    fn argument_shape(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The external endpoint URL"},
                "json": {"type": "object", "description": "The JSON payload to send"}
            },
            "required": ["url", "json"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let url = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("url is required".into()))?;
        let body = args.get("json").cloned().unwrap_or(json!({}));

        let response = self
            .http
            .post(url)
            .timeout(POST_TIMEOUT)
            .json(&body)
            .send()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let ok = response.status().is_success();
        let text = response
            .text()
            .await
            .map_err(|e| ToolError::Transport(e.to_string()))?;

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(parsed) => parsed,
            Err(_) => Value::String(text.chars().take(BODY_SNIPPET_LEN).collect()),
        };

        tracing::info!(url, status, ok, "outbound post completed");
        Ok(json!({"status": status, "ok": ok, "body": body}))
    }
}
