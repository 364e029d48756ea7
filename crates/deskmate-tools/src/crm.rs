//! HTTP client for the CRM REST API (client-credentials OAuth).
//!
//! Every data request fetches a fresh access token first. Failures are
//! logged and turned into empty results or error payloads here, so tool
//! callers never see a transport error.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use deskmate_core::config::CrmConfig;

use crate::error::ToolError;
use crate::search::{filter_matches, first_list, query_variants};
use crate::types::{EntityCandidate, Responsible};

/// Reply when a client record cannot be fetched.
pub const CLIENT_DETAILS_UNAVAILABLE: &str = "Não foi possível obter os detalhes da empresa.";
/// Reply when a client has no tax group.
pub const NO_TAX_GROUP: &str = "Não possui um regime tributário associado.";

const UNKNOWN_POSITION: &str = "N/A";

/// CRM operations used by the tools.
///
/// None of these fail: adapter errors become empty lists, a fixed message
/// or an `{"error": ...}` payload.
#[async_trait]
pub trait CrmApi: Send + Sync {
    /// Companies matching free text, trying the fallback variants in order.
    async fn search_clients(&self, text: &str) -> Vec<EntityCandidate>;

    /// People responsible for a client account.
    async fn responsibles(&self, client_id: i64) -> Vec<Responsible>;

    /// Tax groups of a client joined with ", ".
    async fn tax_group(&self, client_id: i64) -> String;

    /// `{"telefones": [...], "emails": [...]}` or `{"error": ...}`.
    async fn contacts(&self, client_id: i64) -> Value;

    /// The client's address object or `{"error": ...}`.
    async fn address(&self, client_id: i64) -> Value;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// reqwest-backed [`CrmApi`].
#[derive(Debug, Clone)]
pub struct CrmClient {
    http: reqwest::Client,
    base_url: String,
    credentials: Option<(String, String)>,
    token_timeout: Duration,
}

impl CrmClient {
    /// Build a client from configuration. Credentials come from the
    /// environment first, then the config file.
    pub fn from_config(config: &CrmConfig) -> Result<Self, ToolError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| ToolError::Crm(format!("failed to build HTTP client: {e}")))?;

        let credentials = config.resolve_credentials();
        if credentials.is_none() {
            warn!("CRM credentials are not configured; CRM tools will return empty results");
        }

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            credentials,
            token_timeout: Duration::from_secs(config.token_timeout_secs),
        })
    }

    async fn access_token(&self) -> Result<String, ToolError> {
        let (client_id, client_secret) = self
            .credentials
            .as_ref()
            .ok_or_else(|| ToolError::Crm("missing client credentials".to_string()))?;

        let response = self
            .http
            .post(format!("{}/oauth/token", self.base_url))
            .timeout(self.token_timeout)
            .form(&[
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("grant_type", "client_credentials"),
            ])
            .send()
            .await?
            .error_for_status()?;

        let token: TokenResponse = response.json().await?;
        Ok(token.access_token)
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ToolError> {
        let token = self.access_token().await?;
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        debug!(path, %status, "CRM response");
        let response = response.error_for_status()?;

        let body = response.bytes().await?;
        if body.is_empty() {
            return Ok(json!({}));
        }
        serde_json::from_slice(&body).map_err(|e| ToolError::Crm(format!("invalid JSON: {e}")))
    }

    async fn client_details(&self, client_id: i64) -> Option<Value> {
        match self.get_json(&format!("/clientes/{client_id}"), &[]).await {
            Ok(details) if details.is_object() => Some(details),
            Ok(_) => None,
            Err(e) => {
                warn!(client_id, error = %e, "Failed to fetch client details");
                None
            }
        }
    }
}

#[async_trait]
impl CrmApi for CrmClient {
    async fn search_clients(&self, text: &str) -> Vec<EntityCandidate> {
        for variant in query_variants(text) {
            let results = match self
                .get_json("/clientes/search", &[("texto", variant.as_str())])
                .await
            {
                Ok(payload) => first_list(&payload),
                Err(e) => {
                    warn!(variant = %variant, error = %e, "Client search failed");
                    continue;
                }
            };

            let matched = filter_matches(text, &results);
            if !matched.is_empty() {
                debug!(variant = %variant, count = matched.len(), "Client search matched");
                return matched;
            }
        }
        Vec::new()
    }

    async fn responsibles(&self, client_id: i64) -> Vec<Responsible> {
        let payload = match self
            .get_json(&format!("/clientes/{client_id}/responsaveis"), &[])
            .await
        {
            Ok(payload) => payload,
            Err(e) => {
                warn!(client_id, error = %e, "Failed to fetch responsibles");
                return Vec::new();
            }
        };

        first_list(&payload)
            .iter()
            .filter_map(|raw| {
                let name = raw.get("nome").and_then(Value::as_str)?;
                if name.is_empty() {
                    return None;
                }
                let position = raw
                    .get("cargo")
                    .and_then(|c| c.get("nome"))
                    .and_then(Value::as_str)
                    .unwrap_or(UNKNOWN_POSITION);
                Some(Responsible {
                    name: name.to_string(),
                    position: position.to_string(),
                })
            })
            .collect()
    }

    async fn tax_group(&self, client_id: i64) -> String {
        let Some(details) = self.client_details(client_id).await else {
            return CLIENT_DETAILS_UNAVAILABLE.to_string();
        };

        let groups: Vec<&str> = details
            .get("grupos")
            .and_then(Value::as_array)
            .map(|groups| {
                groups
                    .iter()
                    .filter_map(|g| g.get("nome").and_then(Value::as_str))
                    .filter(|name| !name.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        if groups.is_empty() {
            NO_TAX_GROUP.to_string()
        } else {
            groups.join(", ")
        }
    }

    async fn contacts(&self, client_id: i64) -> Value {
        match self.client_details(client_id).await {
            Some(details) => json!({
                "telefones": details.get("telefones").cloned().unwrap_or_else(|| json!([])),
                "emails": details.get("emails").cloned().unwrap_or_else(|| json!([])),
            }),
            None => json!({ "error": CLIENT_DETAILS_UNAVAILABLE }),
        }
    }

    async fn address(&self, client_id: i64) -> Value {
        match self.client_details(client_id).await {
            Some(details) => details.get("endereco").cloned().unwrap_or_else(|| json!({})),
            None => json!({ "error": CLIENT_DETAILS_UNAVAILABLE }),
        }
    }
}
