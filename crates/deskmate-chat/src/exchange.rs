//! Bounded model/tool round-trip.
//!
//! One exchange submits the user message, runs every tool the model asks
//! for, and resubmits with the result until the model answers with text.
//! New turns are collected locally; the caller commits them to the session
//! history only when the exchange succeeds.

use std::time::Duration;

use tracing::{debug, warn};

use deskmate_core::config::ModelConfig;
use deskmate_tools::{CandidateList, ToolOutput, ToolRegistry};

use crate::error::ChatError;
use crate::provider::ModelProvider;
use crate::types::{ModelReply, Turn};

/// Bounds applied to one exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExchangeLimits {
    /// Tool calls allowed before the exchange is abandoned.
    pub max_tool_rounds: u32,
    /// Timeout for each model call.
    pub timeout: Duration,
}

impl ExchangeLimits {
    pub fn from_config(config: &ModelConfig) -> Self {
        Self {
            max_tool_rounds: config.max_tool_rounds,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

impl Default for ExchangeLimits {
    fn default() -> Self {
        Self::from_config(&ModelConfig::default())
    }
}

/// Result of a successful exchange.
#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeOutcome {
    /// Final model text, untrimmed.
    pub text: String,
    /// Turns to append to history: the user turn, every call and result,
    /// and the final model turn.
    pub turns: Vec<Turn>,
    /// Listing returned by the last tool of the exchange when it held more
    /// than one element.
    pub candidates: Option<CandidateList>,
}

/// Run one exchange on top of `history`.
pub async fn run_exchange(
    provider: &dyn ModelProvider,
    tools: &ToolRegistry,
    history: &[Turn],
    message: String,
    limits: &ExchangeLimits,
) -> Result<ExchangeOutcome, ChatError> {
    let declarations = tools.declarations();
    let mut conversation: Vec<Turn> = history.to_vec();
    conversation.push(Turn::user(message));
    let base = history.len();

    let mut rounds: u32 = 0;
    let mut last_output: Option<ToolOutput> = None;

    loop {
        let reply = tokio::time::timeout(
            limits.timeout,
            provider.generate(&conversation, &declarations),
        )
        .await
        .map_err(|_| ChatError::Timeout(limits.timeout.as_secs()))??;

        match reply {
            ModelReply::Text(text) => {
                debug!(rounds, "exchange finished");
                conversation.push(Turn::model(text.clone()));
                let candidates = last_output
                    .as_ref()
                    .and_then(ToolOutput::ambiguous_candidates)
                    .cloned();
                return Ok(ExchangeOutcome {
                    text,
                    turns: conversation.split_off(base),
                    candidates,
                });
            }
            ModelReply::ToolCall(call) => {
                if rounds >= limits.max_tool_rounds {
                    warn!(
                        limit = limits.max_tool_rounds,
                        tool = %call.name,
                        "tool round limit reached"
                    );
                    return Err(ChatError::ToolLoopExceeded(limits.max_tool_rounds));
                }
                rounds += 1;
                debug!(round = rounds, tool = %call.name, "dispatching tool call");

                let output = match tools.dispatch(&call.name, call.args.clone()).await {
                    Ok(output) => output,
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "tool call failed");
                        ToolOutput::error(e.to_string())
                    }
                };

                let name = call.name.clone();
                conversation.push(Turn::tool_call(call));
                conversation.push(Turn::tool_result(name, output.payload.clone()));
                last_output = Some(output);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use deskmate_tools::{DirectoryCandidate, Tool, ToolError};

    use crate::scripted::ScriptedProvider;
    use crate::types::{Part, TurnRole};

    struct PeopleTool {
        count: usize,
    }

    #[async_trait]
    impl Tool for PeopleTool {
        fn name(&self) -> &str {
            "find_ramal_by_name"
        }

        fn description(&self) -> &str {
            "Lists people"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {"nome": {"type": "string"}}})
        }

        async fn invoke(&self, _args: Value) -> Result<ToolOutput, ToolError> {
            let people: Vec<DirectoryCandidate> = (0..self.count)
                .map(|i| DirectoryCandidate {
                    name: format!("Pessoa {i}"),
                    department: "Ti".into(),
                    extension: format!("2{i:02}"),
                })
                .collect();
            let payload = serde_json::to_value(&people).unwrap_or_default();
            Ok(ToolOutput::listing(payload, CandidateList::Directory(people)))
        }
    }

    struct PlainTool;

    #[async_trait]
    impl Tool for PlainTool {
        fn name(&self) -> &str {
            "get_company_history"
        }

        fn description(&self) -> &str {
            "History"
        }

        fn parameters_schema(&self) -> Value {
            json!({"type": "object", "properties": {}})
        }

        async fn invoke(&self, _args: Value) -> Result<ToolOutput, ToolError> {
            Ok(ToolOutput::text("Fundada em 1990."))
        }
    }

    fn registry(count: usize) -> ToolRegistry {
        let mut tools = ToolRegistry::new();
        tools.register(Arc::new(PeopleTool { count }));
        tools.register(Arc::new(PlainTool));
        tools
    }

    // ========================================================================
    // Round trip
    // ========================================================================

    #[tokio::test]
    async fn test_text_reply_without_tools() {
        let provider = ScriptedProvider::new();
        provider.push_text("Olá!");

        let outcome = run_exchange(
            &provider,
            &registry(2),
            &[Turn::user("system"), Turn::model("ok")],
            "oi".into(),
            &ExchangeLimits::default(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.text, "Olá!");
        assert_eq!(outcome.turns, vec![Turn::user("oi"), Turn::model("Olá!")]);
        assert!(outcome.candidates.is_none());
    }

    #[tokio::test]
    async fn test_tool_turns_are_collected_in_order() {
        let provider = ScriptedProvider::new();
        provider
            .push_tool_call("find_ramal_by_name", json!({"nome": "pessoa"}))
            .push_text("Encontrei duas pessoas.");

        let outcome = run_exchange(
            &provider,
            &registry(2),
            &[],
            "ramal da pessoa".into(),
            &ExchangeLimits::default(),
        )
        .await
        .unwrap();

        let roles: Vec<TurnRole> = outcome.turns.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![TurnRole::User, TurnRole::Model, TurnRole::Function, TurnRole::Model]
        );
        assert!(matches!(outcome.candidates, Some(CandidateList::Directory(ref p)) if p.len() == 2));

        // The second model call saw the call and its result.
        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[1].len(), 3);
    }

    // ------------------------------------------------------------------------
    // Candidate signal
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_single_result_is_not_ambiguous() {
        let provider = ScriptedProvider::new();
        provider
            .push_tool_call("find_ramal_by_name", json!({"nome": "pessoa"}))
            .push_text("Achei.");

        let outcome = run_exchange(
            &provider,
            &registry(1),
            &[],
            "ramal".into(),
            &ExchangeLimits::default(),
        )
        .await
        .unwrap();
        assert!(outcome.candidates.is_none());
    }

    #[tokio::test]
    async fn test_only_last_tool_counts() {
        let provider = ScriptedProvider::new();
        provider
            .push_tool_call("find_ramal_by_name", json!({"nome": "pessoa"}))
            .push_tool_call("get_company_history", json!({}))
            .push_text("Pronto.");

        let outcome = run_exchange(
            &provider,
            &registry(3),
            &[],
            "ramal e história".into(),
            &ExchangeLimits::default(),
        )
        .await
        .unwrap();
        assert!(outcome.candidates.is_none());
    }

    // ------------------------------------------------------------------------
    // Failures
    // ------------------------------------------------------------------------

    #[tokio::test]
    async fn test_unknown_tool_is_fed_back_as_error() {
        let provider = ScriptedProvider::new();
        provider
            .push_tool_call("does_not_exist", json!({}))
            .push_text("Desculpe.");

        let outcome = run_exchange(
            &provider,
            &registry(1),
            &[],
            "x".into(),
            &ExchangeLimits::default(),
        )
        .await
        .unwrap();

        match &outcome.turns[2].parts[0] {
            Part::FunctionResponse { name, response } => {
                assert_eq!(name, "does_not_exist");
                assert!(response.get("error").is_some());
            }
            other => panic!("expected function response, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tool_round_limit() {
        let provider = ScriptedProvider::new();
        for _ in 0..3 {
            provider.push_tool_call("get_company_history", json!({}));
        }
        let limits = ExchangeLimits {
            max_tool_rounds: 2,
            timeout: Duration::from_secs(5),
        };

        let err = run_exchange(&provider, &registry(1), &[], "x".into(), &limits)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::ToolLoopExceeded(2)));
    }

    #[tokio::test]
    async fn test_provider_error_propagates() {
        let provider = ScriptedProvider::new();
        provider.push_error("quota");

        let err = run_exchange(
            &provider,
            &registry(1),
            &[],
            "x".into(),
            &ExchangeLimits::default(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ChatError::Provider(_)));
    }

    struct SlowProvider;

    #[async_trait]
    impl ModelProvider for SlowProvider {
        async fn generate(&self, _history: &[Turn], _tools: &[Value]) -> Result<ModelReply, ChatError> {
            tokio::time::sleep(Duration::from_secs(120)).await;
            Ok(ModelReply::Text("tarde demais".into()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_model_call_timeout() {
        let limits = ExchangeLimits {
            max_tool_rounds: 5,
            timeout: Duration::from_secs(60),
        };
        let err = run_exchange(&SlowProvider, &registry(1), &[], "x".into(), &limits)
            .await
            .unwrap_err();
        assert!(matches!(err, ChatError::Timeout(60)));
    }
}
