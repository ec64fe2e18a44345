//! Page fetch and visible-text extraction tools.

use async_trait::async_trait;
use scraper::{ElementRef, Html};
use serde_json::{json, Value};
use std::time::Duration;

use super::{Tool, ToolError};

const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Fetch raw HTML from a URL. Fails on transport errors and non-2xx
/// statuses.
#[derive(Debug, Default)]
pub struct PageFetch {
    http: reqwest::Client,
}

impl PageFetch {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl Tool for PageFetch {
    fn name(&self) -> &str {
        "web.fetch"
    }

    fn description(&self) -> &str {
        "Fetch raw HTML content from a URL."
    }

    fn argument_shape(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "url": {"type": "string", "description": "The URL to fetch"}
            },
            "required": ["url"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let url = args
            .get("url")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("url is required".into()))?;

        let response = self
            .http
            .get(url)
            .timeout(FETCH_TIMEOUT)
            .send()
            .await
            .map_err(|e| ToolError::Fetch(e.to_string()))?
            .error_for_status()
            .map_err(|e| ToolError::Fetch(e.to_string()))?;

        let body = response
            .text()
            .await
            .map_err(|e| ToolError::Fetch(e.to_string()))?;

        tracing::debug!(url, bytes = body.len(), "fetched page");
        Ok(Value::String(body))
    }
}

/// Extract visible text from HTML. Total — malformed or missing input
/// yields an empty string, never an error.
#[derive(Debug)]
pub struct TextExtract;

#[async_trait]
impl Tool for TextExtract {
    fn name(&self) -> &str {
        "web.extract"
    }

    fn description(&self) -> &str {
        "Extract all visible text from HTML content."
    }

    fn argument_shape(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "html": {"type": "string", "description": "The HTML document to extract from"}
            },
            "required": ["html"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let html = args.get("html").and_then(Value::as_str).unwrap_or_default();
        Ok(Value::String(visible_text(html)))
    }
}

/// Visible text of an HTML document: one trimmed text node per line,
/// with `script` and `style` subtrees dropped.
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut lines = Vec::new();
    collect_text(document.root_element(), &mut lines);
    lines.join("\n")
}

fn collect_text(element: ElementRef<'_>, out: &mut Vec<String>) {
    let tag = element.value().name();
    if tag == "script" || tag == "style" {
        return;
    }
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                out.push(trimmed.to_string());
            }
        } else if let Some(child_element) = ElementRef::wrap(child) {
            collect_text(child_element, out);
        }
    }
}
