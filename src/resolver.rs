//! Action resolver — sequential tool execution with result binding.
//!
//! Declared actions run strictly in list order, never concurrently:
//! later actions may reference earlier bound results via `{{name}}`
//! placeholders, which are replaced with the JSON-serialized bound
//! value before invocation. Unknown tools are skipped silently; a
//! failing tool is recorded and the rest of the list still runs.

use serde_json::{json, Value};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;

use crate::oracle::DeclaredAction;
use crate::tools::{ToolError, ToolRegistry};

/// Name → result bindings accumulated across one action list. Scoped
/// to a single resolver pass and discarded with it.
pub type Bindings = BTreeMap<String, Value>;

/// Outcome of one resolved action, in input order.
#[derive(Debug, Clone)]
pub struct ActionOutcome {
    pub tool: String,
    /// Arguments after placeholder substitution.
    pub arguments: Value,
    /// Tool result, or an `{"error": ...}` marker on failure.
    pub result: Value,
    pub error: Option<String>,
}

impl ActionOutcome {
    pub fn ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Everything a resolver pass produced: per-action outcomes plus the
/// final bindings, for stage-level post-processing.
#[derive(Debug, Default)]
pub struct Resolution {
    pub outcomes: Vec<ActionOutcome>,
    pub bindings: Bindings,
}

/// Execute a declared action list against the registry.
///
/// The only resolver-level error is cancellation; tool failures are
/// captured per action and execution continues to maximize partial
/// progress.
pub async fn resolve_actions(
    registry: &ToolRegistry,
    actions: &[DeclaredAction],
    cancel: &CancellationToken,
) -> Result<Resolution, ToolError> {
    let mut resolution = Resolution::default();

    for action in actions {
        if !registry.contains(&action.tool) {
            tracing::debug!(tool = %action.tool, "dropping action for unregistered tool");
            continue;
        }

        let arguments = substitute(&action.arguments, &resolution.bindings);

        let invoked = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ToolError::Cancelled),
            result = registry.invoke(&action.tool, arguments.clone()) => result,
        };

        let (result, error) = match invoked {
            Ok(value) => (value, None),
            Err(e) => {
                tracing::warn!(tool = %action.tool, error = %e, "tool invocation failed");
                (json!({"error": e.to_string()}), Some(e.to_string()))
            }
        };

        // Error markers bind too: a later reference to a failed result
        // substitutes the serialized marker verbatim.
        if let Some(name) = &action.result_binding {
            resolution.bindings.insert(name.clone(), result.clone());
        }

        resolution.outcomes.push(ActionOutcome {
            tool: action.tool.clone(),
            arguments,
            result,
            error,
        });
    }

    Ok(resolution)
}

/// Recursively replace `{{name}}` placeholders in every string value
/// with the JSON serialization of the bound result. Unresolved names
/// stay as literal text — a declared-but-unused binding never fails
/// the run.
pub fn substitute(value: &Value, bindings: &Bindings) -> Value {
    match value {
        Value::String(s) => Value::String(substitute_str(s, bindings)),
        Value::Array(items) => Value::Array(items.iter().map(|v| substitute(v, bindings)).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), substitute(v, bindings)))
                .collect(),
        ),
        other => other.clone(),
    }
}

// Single left-to-right scan: each `{{name}}` is looked up once, and
// replacement text is never rescanned, so a bound value that happens
// to contain placeholder syntax stays verbatim.
fn substitute_str(s: &str, bindings: &Bindings) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                if let Some(value) = bindings.get(&after[..end]) {
                    out.push_str(&value.to_string());
                    rest = &after[end + 2..];
                } else {
                    // Unresolved name stays literal.
                    out.push_str("{{");
                    rest = after;
                }
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::Tool;
    use async_trait::async_trait;
    use std::sync::Arc;

    /// Returns `{"seen": <args>}` — makes substitution observable.
    struct Probe;

    #[async_trait]
    impl Tool for Probe {
        fn name(&self) -> &str {
            "test.probe"
        }

        fn description(&self) -> &str {
            "Record the arguments it was invoked with."
        }

        fn argument_shape(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, args: Value) -> Result<Value, ToolError> {
            Ok(json!({"seen": args}))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl Tool for AlwaysFails {
        fn name(&self) -> &str {
            "test.fails"
        }

        fn description(&self) -> &str {
            "Always fails."
        }

        fn argument_shape(&self) -> Value {
            json!({"type": "object"})
        }

        async fn invoke(&self, _args: Value) -> Result<Value, ToolError> {
            Err(ToolError::Transport("boom".into()))
        }
    }

    fn test_registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(Probe));
        registry.register(Arc::new(AlwaysFails));
        registry
    }

    fn action(tool: &str, arguments: Value, binding: Option<&str>) -> DeclaredAction {
        DeclaredAction {
            tool: tool.into(),
            arguments,
            result_binding: binding.map(String::from),
        }
    }

    #[tokio::test]
    async fn sequential_substitution_feeds_later_actions() {
        let registry = test_registry();
        let actions = vec![
            action("test.probe", json!({"q": "first"}), Some("x")),
            action("test.probe", json!({"prev": "got {{x}}"}), None),
        ];

        let res = resolve_actions(&registry, &actions, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(res.outcomes.len(), 2);
        assert_eq!(res.outcomes[0].tool, "test.probe");
        // Second action saw the JSON-serialized result of the first.
        let prev = res.outcomes[1].arguments["prev"].as_str().unwrap();
        assert!(prev.starts_with("got {"));
        assert!(prev.contains("\"seen\""));
        assert!(prev.contains("\"first\""));
        assert_eq!(res.bindings.len(), 1);
    }

    #[tokio::test]
    async fn unknown_tool_is_skipped_silently() {
        let registry = test_registry();
        let actions = vec![
            action("no.such.tool", json!({}), Some("x")),
            action("test.probe", json!({"ok": true}), None),
        ];

        let res = resolve_actions(&registry, &actions, &CancellationToken::new())
            .await
            .unwrap();

        // No outcome for the dropped action, and the rest still ran.
        assert_eq!(res.outcomes.len(), 1);
        assert_eq!(res.outcomes[0].tool, "test.probe");
        assert!(res.bindings.is_empty());
    }

    #[tokio::test]
    async fn failure_is_recorded_and_execution_continues() {
        let registry = test_registry();
        let actions = vec![
            action("test.fails", json!({}), Some("bad")),
            action("test.probe", json!({"note": "prior was {{bad}}"}), None),
        ];

        let res = resolve_actions(&registry, &actions, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(res.outcomes.len(), 2);
        assert!(!res.outcomes[0].ok());
        assert_eq!(res.outcomes[0].result["error"], "transport error: boom");
        // The error marker substitutes verbatim into the next action.
        let note = res.outcomes[1].arguments["note"].as_str().unwrap();
        assert!(note.contains("transport error: boom"));
        assert!(res.outcomes[1].ok());
    }

    #[tokio::test]
    async fn empty_action_list_is_empty_resolution() {
        let registry = test_registry();
        let res = resolve_actions(&registry, &[], &CancellationToken::new())
            .await
            .unwrap();
        assert!(res.outcomes.is_empty());
        assert!(res.bindings.is_empty());
    }

    #[tokio::test]
    async fn cancellation_aborts_resolution() {
        let registry = test_registry();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let actions = vec![action("test.probe", json!({}), None)];
        let err = resolve_actions(&registry, &actions, &cancel).await.unwrap_err();
        assert!(matches!(err, ToolError::Cancelled));
    }

    #[test]
    fn substitution_is_permissive_and_recursive() {
        let mut bindings = Bindings::new();
        bindings.insert("x".into(), json!({"a": 1}));

        let input = json!({
            "direct": "{{x}}",
            "nested": {"list": ["{{x}} and {{unknown}}", 7]},
            "untouched": 42
        });
        let out = substitute(&input, &bindings);

        assert_eq!(out["direct"], "{\"a\":1}");
        let item = out["nested"]["list"][0].as_str().unwrap();
        assert!(item.contains("{\"a\":1}"));
        // Unresolved names stay literal.
        assert!(item.contains("{{unknown}}"));
        assert_eq!(out["untouched"], 42);
    }

    #[test]
    fn bound_text_containing_placeholder_syntax_stays_verbatim() {
        let mut bindings = Bindings::new();
        bindings.insert("a".into(), json!("literal {{b}} inside"));
        bindings.insert("b".into(), json!("late"));

        let out = substitute(&json!("{{a}}"), &bindings);
        // Replacement text is not rescanned for further placeholders.
        assert_eq!(out, "\"literal {{b}} inside\"");

        let tail = substitute(&json!("{{a}} then {{b}}"), &bindings);
        assert_eq!(tail, "\"literal {{b}} inside\" then \"late\"");
    }

    #[test]
    fn string_binding_substitutes_with_quotes() {
        let mut bindings = Bindings::new();
        bindings.insert("name".into(), json!("acme"));
        let out = substitute(&json!("hello {{name}}"), &bindings);
        // JSON serialization of a string keeps its quotes.
        assert_eq!(out, "hello \"acme\"");
    }
}
