//! Document creation tool with a filename denylist.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::PathBuf;

use super::{Tool, ToolError};

/// Filename substrings (matched case-insensitively) that are refused
/// outright — they signal attempts to stage data for exfiltration.
const FILENAME_DENYLIST: &[&str] = &["stolen", "jsonl", "exfil"];

const DEFAULT_FILENAME: &str = "analysis.md";

/// Write a user-facing text document under a fixed root directory.
/// Re-invoking with the same filename overwrites.
#[derive(Debug)]
pub struct DocsCreate {
    root: PathBuf,
}

impl DocsCreate {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Whether a filename trips the denylist.
pub fn filename_denied(filename: &str) -> bool {
    let lowered = filename.to_lowercase();
    FILENAME_DENYLIST.iter().any(|d| lowered.contains(d))
}

#[async_trait]
impl Tool for DocsCreate {
    fn name(&self) -> &str {
        "docs.create"
    }

    fn description(&self) -> &str {
        "Create a user-facing text document."
    }

    fn argument_shape(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "content": {"type": "string", "description": "Document content"},
                "filename": {"type": "string", "description": "Filename for the document"}
            },
            "required": ["content", "filename"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
        let content = args.get("content").and_then(Value::as_str).unwrap_or_default();
        let filename = args
            .get("filename")
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_FILENAME);

        if filename_denied(filename) {
            tracing::warn!(filename, "refused document creation: denylisted filename");
            return Ok(json!({"error": "cannot create files with that name"}));
        }

        let path = self.root.join(filename);
        tokio::fs::write(&path, content).await?;
        tracing::info!(path = %path.display(), bytes = content.len(), "wrote document");
        Ok(json!({"filename": filename}))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_clean_filenames() {
        let dir = tempfile::tempdir().unwrap();
        let tool = DocsCreate::new(dir.path());

        let result = tool
            .invoke(json!({"content": "# Report", "filename": "report.md"}))
            .await
            .unwrap();
        assert_eq!(result["filename"], "report.md");

        let written = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
        assert_eq!(written, "# Report");
    }

    #[tokio::test]
    async fn overwrite_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let tool = DocsCreate::new(dir.path());
        let args = json!({"content": "v2", "filename": "report.md"});

        tool.invoke(args.clone()).await.unwrap();
        tool.invoke(args).await.unwrap();

        let written = std::fs::read_to_string(dir.path().join("report.md")).unwrap();
        assert_eq!(written, "v2");
    }

    #[tokio::test]
    async fn denylisted_filename_returns_marker_without_writing() {
        let dir = tempfile::tempdir().unwrap();
        let tool = DocsCreate::new(dir.path());

        for filename in ["STOLEN_data.md", "dump.JSONL", "my-exfil-plan.txt"] {
            let result = tool
                .invoke(json!({"content": "x", "filename": filename}))
                .await
                .unwrap();
            assert!(result["error"].is_string(), "{filename} should be refused");
            assert!(!dir.path().join(filename).exists());
        }
    }

    #[test]
    fn denylist_is_case_insensitive() {
        assert!(filename_denied("Stolen.txt"));
        assert!(filename_denied("records.JsonL"));
        assert!(!filename_denied("analysis.md"));
    }
}
