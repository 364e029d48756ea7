//! The fixed tool set registered for every conversation session.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::crm::CrmApi;
use crate::directory::NO_DIRECTORY_MESSAGE;
use crate::error::ToolError;
use crate::knowledge::KnowledgeSnapshot;
use crate::tool::{Tool, ToolOutput, ToolRegistry};
use crate::types::CandidateList;

pub const SEARCH_CLIENTS: &str = "search_clients_by_text";
pub const LIST_RESPONSIBLES: &str = "list_client_responsibles";
pub const GET_CLIENT_GROUP: &str = "get_client_group";
pub const GET_CLIENT_CONTACTS: &str = "get_client_contacts";
pub const GET_CLIENT_ADDRESS: &str = "get_client_address";
pub const FORMAT_EXTENSIONS: &str = "format_ramais_list";
pub const FIND_EXTENSION: &str = "find_ramal_by_name";
pub const GET_HISTORY: &str = "get_company_history";

/// Reply when no history text is stored.
pub const NO_HISTORY_MESSAGE: &str = "Não encontrei informações sobre a história da empresa.";

/// Build the registry with all eight tools over one knowledge snapshot.
pub fn default_registry(knowledge: Arc<KnowledgeSnapshot>, crm: Arc<dyn CrmApi>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(SearchClients { crm: crm.clone() }));
    for kind in [
        ClientLookup::Responsibles,
        ClientLookup::Group,
        ClientLookup::Contacts,
        ClientLookup::Address,
    ] {
        registry.register(Arc::new(ClientTool {
            kind,
            crm: crm.clone(),
        }));
    }
    registry.register(Arc::new(FormatExtensions {
        knowledge: knowledge.clone(),
    }));
    registry.register(Arc::new(FindExtension {
        knowledge: knowledge.clone(),
    }));
    registry.register(Arc::new(CompanyHistory { knowledge }));
    registry
}

fn no_params() -> Value {
    json!({ "type": "object", "properties": {} })
}

fn string_arg(args: &Value, key: &str) -> Result<String, ToolError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing string argument '{key}'")))
}

/// Model function calls may encode integers as floats or strings.
fn id_arg(args: &Value, key: &str) -> Result<i64, ToolError> {
    let raw = args
        .get(key)
        .ok_or_else(|| ToolError::InvalidArguments(format!("missing argument '{key}'")))?;
    let id = match raw {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    };
    id.ok_or_else(|| ToolError::InvalidArguments(format!("'{key}' must be an integer id")))
}

// ---- CRM ----

struct SearchClients {
    crm: Arc<dyn CrmApi>,
}

#[async_trait]
impl Tool for SearchClients {
    fn name(&self) -> &str {
        SEARCH_CLIENTS
    }

    fn description(&self) -> &str {
        "Busca empresas clientes por nome, parte do nome ou CNPJ. Retorna uma lista com id, nome e inscricao."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "search_text": {"type": "string", "description": "Nome ou CNPJ da empresa"}
            },
            "required": ["search_text"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let text = string_arg(&args, "search_text")?;
        let found = self.crm.search_clients(&text).await;
        let payload = serde_json::to_value(&found)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        Ok(ToolOutput::listing(payload, CandidateList::Entities(found)))
    }
}

#[derive(Clone, Copy)]
enum ClientLookup {
    Responsibles,
    Group,
    Contacts,
    Address,
}

struct ClientTool {
    kind: ClientLookup,
    crm: Arc<dyn CrmApi>,
}

#[async_trait]
impl Tool for ClientTool {
    fn name(&self) -> &str {
        match self.kind {
            ClientLookup::Responsibles => LIST_RESPONSIBLES,
            ClientLookup::Group => GET_CLIENT_GROUP,
            ClientLookup::Contacts => GET_CLIENT_CONTACTS,
            ClientLookup::Address => GET_CLIENT_ADDRESS,
        }
    }

    fn description(&self) -> &str {
        match self.kind {
            ClientLookup::Responsibles => {
                "Lista os responsáveis (nome e cargo) pela empresa com o id informado."
            }
            ClientLookup::Group => {
                "Retorna o regime tributário (grupos) da empresa com o id informado."
            }
            ClientLookup::Contacts => "Retorna telefones e e-mails da empresa com o id informado.",
            ClientLookup::Address => "Retorna o endereço da empresa com o id informado.",
        }
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "client_id": {"type": "integer", "description": "ID da empresa no CRM"}
            },
            "required": ["client_id"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let id = id_arg(&args, "client_id")?;
        let output = match self.kind {
            ClientLookup::Responsibles => {
                let people = self.crm.responsibles(id).await;
                ToolOutput::value(
                    serde_json::to_value(people)
                        .map_err(|e| ToolError::InvalidArguments(e.to_string()))?,
                )
            }
            ClientLookup::Group => ToolOutput::text(self.crm.tax_group(id).await),
            ClientLookup::Contacts => ToolOutput::value(self.crm.contacts(id).await),
            ClientLookup::Address => ToolOutput::value(self.crm.address(id).await),
        };
        Ok(output)
    }
}

// ---- Knowledge snapshot ----

struct FormatExtensions {
    knowledge: Arc<KnowledgeSnapshot>,
}

#[async_trait]
impl Tool for FormatExtensions {
    fn name(&self) -> &str {
        FORMAT_EXTENSIONS
    }

    fn description(&self) -> &str {
        "Retorna a lista completa de ramais e equipes, já formatada em HTML."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn invoke(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        let text = match self.knowledge.directory() {
            Some(directory) => directory.format_listing(),
            None => NO_DIRECTORY_MESSAGE.to_string(),
        };
        Ok(ToolOutput::text(text))
    }
}

struct FindExtension {
    knowledge: Arc<KnowledgeSnapshot>,
}

#[async_trait]
impl Tool for FindExtension {
    fn name(&self) -> &str {
        FIND_EXTENSION
    }

    fn description(&self) -> &str {
        "Procura o ramal de um colaborador pelo nome ou apelido. Retorna nome, depto e ramal de cada pessoa encontrada."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "nome": {"type": "string", "description": "Nome ou apelido do colaborador"}
            },
            "required": ["nome"]
        })
    }

    async fn invoke(&self, args: Value) -> Result<ToolOutput, ToolError> {
        let name = string_arg(&args, "nome")?;
        let found = self
            .knowledge
            .directory()
            .map(|d| d.find_by_name(&name))
            .unwrap_or_default();
        let payload = serde_json::to_value(&found)
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;
        Ok(ToolOutput::listing(payload, CandidateList::Directory(found)))
    }
}

struct CompanyHistory {
    knowledge: Arc<KnowledgeSnapshot>,
}

#[async_trait]
impl Tool for CompanyHistory {
    fn name(&self) -> &str {
        GET_HISTORY
    }

    fn description(&self) -> &str {
        "Retorna a história resumida da empresa, em HTML."
    }

    fn parameters_schema(&self) -> Value {
        no_params()
    }

    async fn invoke(&self, _args: Value) -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput::text(
            self.knowledge.history_text().unwrap_or(NO_HISTORY_MESSAGE),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EntityCandidate, Responsible};

    struct FakeCrm;

    #[async_trait]
    impl CrmApi for FakeCrm {
        async fn search_clients(&self, text: &str) -> Vec<EntityCandidate> {
            (1..=2)
                .map(|id| EntityCandidate {
                    id,
                    name: format!("{text} {id}"),
                    tax_id: String::new(),
                })
                .collect()
        }

        async fn responsibles(&self, _client_id: i64) -> Vec<Responsible> {
            vec![Responsible {
                name: "Maria".into(),
                position: "Contadora".into(),
            }]
        }

        async fn tax_group(&self, client_id: i64) -> String {
            format!("Simples Nacional ({client_id})")
        }

        async fn contacts(&self, _client_id: i64) -> Value {
            json!({"telefones": [], "emails": []})
        }

        async fn address(&self, _client_id: i64) -> Value {
            json!({"cidade": "Santos"})
        }
    }

    fn registry(knowledge: Value) -> ToolRegistry {
        let snapshot = KnowledgeSnapshot::new(knowledge.as_object().cloned().unwrap());
        default_registry(Arc::new(snapshot), Arc::new(FakeCrm))
    }

    #[test]
    fn test_registry_has_all_tools() {
        let reg = registry(json!({}));
        assert_eq!(
            reg.names(),
            vec![
                FIND_EXTENSION,
                FORMAT_EXTENSIONS,
                GET_CLIENT_ADDRESS,
                GET_CLIENT_CONTACTS,
                GET_CLIENT_GROUP,
                GET_HISTORY,
                LIST_RESPONSIBLES,
                SEARCH_CLIENTS,
            ]
        );
    }

    #[tokio::test]
    async fn test_search_reports_entity_listing() {
        let reg = registry(json!({}));
        let out = reg
            .dispatch(SEARCH_CLIENTS, json!({"search_text": "ACME"}))
            .await
            .unwrap();
        let list = out.ambiguous_candidates().unwrap();
        assert!(list.is_entities());
        assert_eq!(out.payload[1]["nome"], "ACME 2");
    }

    #[tokio::test]
    async fn test_client_id_accepts_float_and_string() {
        let reg = registry(json!({}));
        let out = reg
            .dispatch(GET_CLIENT_GROUP, json!({"client_id": 101.0}))
            .await
            .unwrap();
        assert_eq!(out.payload, json!("Simples Nacional (101)"));

        let out = reg
            .dispatch(GET_CLIENT_GROUP, json!({"client_id": "7"}))
            .await
            .unwrap();
        assert_eq!(out.payload, json!("Simples Nacional (7)"));

        let err = reg
            .dispatch(GET_CLIENT_GROUP, json!({"client_id": 1.5}))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn test_responsibles_payload() {
        let reg = registry(json!({}));
        let out = reg
            .dispatch(LIST_RESPONSIBLES, json!({"client_id": 1}))
            .await
            .unwrap();
        assert_eq!(out.payload, json!([{"nome": "Maria", "cargo": "Contadora"}]));
        assert!(out.candidates.is_none());
    }

    #[tokio::test]
    async fn test_find_extension_single_match_is_not_ambiguous() {
        let reg = registry(json!({
            "departments": {"TI": [{"ramal": "210", "equipe": [
                {"nome": "Ana Souza", "apelidos": ["Aninha"]}
            ]}]}
        }));
        let out = reg
            .dispatch(FIND_EXTENSION, json!({"nome": "aninha"}))
            .await
            .unwrap();
        assert_eq!(
            out.payload,
            json!([{"nome": "Ana Souza", "depto": "Ti", "ramal": "210"}])
        );
        assert!(out.candidates.is_some());
        assert!(out.ambiguous_candidates().is_none());
    }

    #[tokio::test]
    async fn test_knowledge_tools_without_data() {
        let reg = registry(json!({}));
        let listing = reg.dispatch(FORMAT_EXTENSIONS, json!({})).await.unwrap();
        assert_eq!(listing.payload, json!(NO_DIRECTORY_MESSAGE));
        let history = reg.dispatch(GET_HISTORY, json!({})).await.unwrap();
        assert_eq!(history.payload, json!(NO_HISTORY_MESSAGE));
        let found = reg
            .dispatch(FIND_EXTENSION, json!({"nome": "ana"}))
            .await
            .unwrap();
        assert_eq!(found.payload, json!([]));
    }

    #[tokio::test]
    async fn test_missing_argument_is_invalid() {
        let reg = registry(json!({}));
        let err = reg.dispatch(FIND_EXTENSION, json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
