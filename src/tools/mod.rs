//! Tool framework — self-describing capabilities behind a registry.
//!
//! Tools don't decide — they execute. Every tool carries metadata
//! (name, description, argument shape) so the registry can advertise
//! capabilities to the oracle, and an async `invoke` the resolver
//! dispatches to. Side effects live entirely inside individual tools;
//! the registry itself only dispatches.

pub mod browser;
pub mod corpus;
pub mod docs;
pub mod outbound;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Errors from tool operations.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    Unknown(String),

    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("cancelled")]
    Cancelled,
}

/// A declared capability, as advertised to the oracle.
///
/// `arguments` is the JSON-schema parameter object for the capability.
/// Stages also construct these directly for decision-only functions
/// that never reach the registry.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: String,
    pub description: String,
    pub arguments: Value,
}

/// A named, self-documenting capability.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Tool name (used in dispatch and oracle schemas).
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// JSON-schema parameter object for this tool's arguments.
    fn argument_shape(&self) -> Value;

    /// Execute with already-substituted arguments. Argument validation
    /// beyond the shape description is the implementation's job.
    async fn invoke(&self, args: Value) -> Result<Value, ToolError>;
}

/// Name → capability mapping. Read-only after construction, so a single
/// registry may back concurrent runs as long as the tools themselves
/// are safe for concurrent invocation.
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    /// Descriptors for every registered tool, in name order.
    pub fn describe(&self) -> Vec<ToolSpec> {
        self.tools.values().map(|t| spec_of(t.as_ref())).collect()
    }

    /// Descriptor for one tool, if registered.
    pub fn spec(&self, name: &str) -> Option<ToolSpec> {
        self.tools.get(name).map(|t| spec_of(t.as_ref()))
    }

    /// Dispatch to a registered tool.
    pub async fn invoke(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        match self.tools.get(name) {
            Some(tool) => tool.invoke(args).await,
            None => Err(ToolError::Unknown(name.to_string())),
        }
    }
}

fn spec_of(tool: &dyn Tool) -> ToolSpec {
    ToolSpec {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        arguments: tool.argument_shape(),
    }
}

/// The standard registry backing a production run: page fetch, text
/// extraction, corpus lookup, document creation, outbound POST.
pub fn standard_registry(docs_root: impl Into<std::path::PathBuf>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(browser::PageFetch::new()));
    registry.register(Arc::new(browser::TextExtract));
    registry.register(Arc::new(corpus::CorpusLookup::new()));
    registry.register(Arc::new(docs::DocsCreate::new(docs_root)));
    registry.register(Arc::new(outbound::HttpPost::new()));
    registry
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Echo;

    #[async_trait]
    impl Tool for Echo {
        fn name(&self) -> &str {
            "test.echo"
        }

        fn description(&self) -> &str {
            "Echo the arguments back."
        }

        fn argument_shape(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
            Ok(args)
        }
    }

    #[tokio::test]
    async fn registry_dispatches_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));

        assert!(registry.contains("test.echo"));
        let result = registry.invoke("test.echo", json!({"k": "v"})).await.unwrap();
        assert_eq!(result["k"], "v");
    }

    #[tokio::test]
    async fn unknown_tool_errors() {
        let registry = ToolRegistry::new();
        let err = registry.invoke("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::Unknown(_)));
        assert!(err.to_string().contains("nope"));
    }

    #[test]
    fn describe_lists_registered_tools() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Echo));
        let specs = registry.describe();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].name, "test.echo");
        assert!(!specs[0].description.is_empty());
    }

    #[test]
    fn standard_registry_has_core_tools() {
        let registry = standard_registry(".");
        for name in ["web.fetch", "web.extract", "db.lookup", "docs.create", "http.post"] {
            assert!(registry.contains(name), "missing {name}");
        }
    }
}
