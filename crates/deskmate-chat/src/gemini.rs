//! HTTP client for the Gemini `generateContent` REST endpoint.
//!
//! Function calling is driven manually: every reply is either text or a
//! single function call, and the exchange loop resubmits with the result.

use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use deskmate_core::config::ModelConfig;

use crate::error::ChatError;
use crate::provider::ModelProvider;
use crate::types::{ModelReply, Part, ToolCall, Turn, TurnRole};

/// Gemini REST client.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    /// Build a client from configuration. `GEMINI_API_KEY` wins over the
    /// file; a missing key is a configuration error.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ChatError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| ChatError::Provider("model API key is not configured".to_string()))?;
        Self::new(config, api_key)
    }

    /// Build a client with an explicit key.
    pub fn new(config: &ModelConfig, api_key: String) -> Result<Self, ChatError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()
            .map_err(|e| ChatError::Provider(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        )
    }
}

#[async_trait]
impl ModelProvider for GeminiClient {
    async fn generate(&self, history: &[Turn], tools: &[Value]) -> Result<ModelReply, ChatError> {
        let body = build_request(history, tools);

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        debug!(%status, turns = history.len(), "Gemini response");
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, "Gemini request failed");
            return Err(ChatError::Provider(format!(
                "status {}: {}",
                status,
                text.chars().take(300).collect::<String>()
            )));
        }

        let payload: Value = response.json().await?;
        parse_reply(&payload)
    }
}

/// Request body: history as `contents`, tools as one declarations block.
pub fn build_request(history: &[Turn], tools: &[Value]) -> Value {
    let contents: Vec<Value> = history.iter().map(turn_to_content).collect();
    let mut body = json!({ "contents": contents });
    if !tools.is_empty() {
        let declarations: Vec<Value> = tools.iter().map(declaration_for_gemini).collect();
        body["tools"] = json!([{ "functionDeclarations": declarations }]);
    }
    body
}

fn turn_to_content(turn: &Turn) -> Value {
    let role = match turn.role {
        TurnRole::User => "user",
        TurnRole::Model => "model",
        TurnRole::Function => "function",
    };
    let parts: Vec<Value> = turn
        .parts
        .iter()
        .map(|part| match part {
            Part::Text(text) => json!({ "text": text }),
            Part::FunctionCall(call) => json!({
                "functionCall": { "name": call.name, "args": call.args }
            }),
            Part::FunctionResponse { name, response } => json!({
                "functionResponse": { "name": name, "response": wrap_response(response) }
            }),
        })
        .collect();
    json!({ "role": role, "parts": parts })
}

/// Function responses must be JSON objects.
fn wrap_response(response: &Value) -> Value {
    if response.is_object() {
        response.clone()
    } else {
        json!({ "result": response })
    }
}

/// Gemini rejects object schemas without properties; drop them.
fn declaration_for_gemini(declaration: &Value) -> Value {
    let mut declaration = declaration.clone();
    let empty = declaration
        .get("parameters")
        .and_then(|p| p.get("properties"))
        .and_then(Value::as_object)
        .is_some_and(Map::is_empty);
    if empty {
        if let Some(obj) = declaration.as_object_mut() {
            obj.remove("parameters");
        }
    }
    declaration
}

/// First function call wins; otherwise all text parts concatenated.
pub fn parse_reply(payload: &Value) -> Result<ModelReply, ChatError> {
    let parts = payload
        .get("candidates")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| {
            let reason = payload
                .pointer("/promptFeedback/blockReason")
                .and_then(Value::as_str)
                .unwrap_or("no candidates");
            ChatError::MalformedReply(reason.to_string())
        })?;

    for part in parts {
        if let Some(call) = part.get("functionCall") {
            let name = call
                .get("name")
                .and_then(Value::as_str)
                .ok_or_else(|| ChatError::MalformedReply("function call without name".into()))?;
            let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
            return Ok(ModelReply::ToolCall(ToolCall {
                name: name.to_string(),
                args,
            }));
        }
    }

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();
    Ok(ModelReply::Text(text))
}
