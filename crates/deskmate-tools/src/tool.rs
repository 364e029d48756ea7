//! Tool trait and registry.
//!
//! The [`ToolRegistry`] looks tools up by name for the model exchange and
//! exports their function declarations. Listing tools attach their results
//! to [`ToolOutput::candidates`], which is how the conversation layer learns
//! that the user has to pick one.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::error::ToolError;
use crate::types::CandidateList;

/// Result of one tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolOutput {
    /// Payload sent back to the model.
    pub payload: Value,
    /// Set by listing tools: every element they returned.
    pub candidates: Option<CandidateList>,
}

impl ToolOutput {
    pub fn value(payload: Value) -> Self {
        Self {
            payload,
            candidates: None,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::value(Value::String(text.into()))
    }

    /// Output of a listing tool. The payload is the serialized list.
    pub fn listing(payload: Value, candidates: CandidateList) -> Self {
        Self {
            payload,
            candidates: Some(candidates),
        }
    }

    /// Error payload fed back to the model instead of aborting the exchange.
    pub fn error(message: impl Into<String>) -> Self {
        Self::value(json!({ "error": message.into() }))
    }

    /// The listing, if it holds more than one element.
    pub fn ambiguous_candidates(&self) -> Option<&CandidateList> {
        self.candidates.as_ref().filter(|c| c.is_ambiguous())
    }
}

/// A function the model may call.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique name, used in declarations and calls.
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> Value;

    async fn invoke(&self, args: Value) -> Result<ToolOutput, ToolError>;
}

/// Tools available to one session, indexed by name.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tools.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Function declarations `{name, description, parameters}`, sorted by
    /// name.
    pub fn declarations(&self) -> Vec<Value> {
        self.names()
            .into_iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| {
                json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema(),
                })
            })
            .collect()
    }

    /// Run the named tool.
    pub async fn dispatch(&self, name: &str, args: Value) -> Result<ToolOutput, ToolError> {
        let tool = self
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::DirectoryCandidate;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echoes its input"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"text": {"type": "string"}}})
        }

        async fn invoke(&self, args: Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::value(args))
        }
    }

    #[tokio::test]
    async fn test_dispatch_known_and_unknown() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        assert_eq!(registry.len(), 1);

        let out = registry.dispatch("echo", json!({"text": "oi"})).await.unwrap();
        assert_eq!(out.payload, json!({"text": "oi"}));
        assert!(out.candidates.is_none());

        let err = registry.dispatch("nope", json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::UnknownTool(name) if name == "nope"));
    }

    #[test]
    fn test_declarations_shape() {
        let mut registry = ToolRegistry::new();
        registry.register(Arc::new(EchoTool));
        let decls = registry.declarations();
        assert_eq!(decls.len(), 1);
        assert_eq!(decls[0]["name"], "echo");
        assert_eq!(decls[0]["parameters"]["type"], "object");
    }

    #[test]
    fn test_ambiguous_candidates_requires_more_than_one() {
        let one = CandidateList::Directory(vec![DirectoryCandidate {
            name: "Ana".into(),
            department: "Ti".into(),
            extension: "210".into(),
        }]);
        let out = ToolOutput::listing(json!([]), one.clone());
        assert!(out.ambiguous_candidates().is_none());

        let CandidateList::Directory(mut items) = one else {
            unreachable!()
        };
        items.push(items[0].clone());
        let out = ToolOutput::listing(json!([]), CandidateList::Directory(items));
        assert_eq!(out.ambiguous_candidates().map(CandidateList::len), Some(2));
    }

    #[test]
    fn test_error_output() {
        assert_eq!(ToolOutput::error("boom").payload, json!({"error": "boom"}));
    }
}
