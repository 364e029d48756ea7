use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{DeskmateError, Result};

/// Environment variable that overrides `model.api_key`.
pub const MODEL_API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable that overrides `crm.client_id`.
pub const CRM_CLIENT_ID_ENV: &str = "CRM_CLIENT_ID";
/// Environment variable that overrides `crm.client_secret`.
pub const CRM_CLIENT_SECRET_ENV: &str = "CRM_CLIENT_SECRET";

/// Top-level configuration for the Deskmate service.
///
/// Loaded from `~/.deskmate/config.toml` by default. Every section falls back
/// to its defaults when omitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeskmateConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub crm: CrmConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl DeskmateConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: DeskmateConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| DeskmateError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory holding the SQLite database.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.deskmate/data".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Requests per second accepted on authenticated routes.
    pub rate_limit_per_sec: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            rate_limit_per_sec: 100,
        }
    }
}

/// Language-model service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub base_url: String,
    pub model: String,
    /// API key. `GEMINI_API_KEY` takes precedence when set.
    pub api_key: Option<String>,
    /// Timeout applied to every model call.
    pub timeout_secs: u64,
    /// Maximum tool calls the model may chain inside one exchange.
    pub max_tool_rounds: u32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com".to_string(),
            model: "gemini-1.5-flash".to_string(),
            api_key: None,
            timeout_secs: 60,
            max_tool_rounds: 5,
        }
    }
}

impl ModelConfig {
    /// The API key to use, preferring the environment over the file.
    pub fn resolve_api_key(&self) -> Option<String> {
        env_or(MODEL_API_KEY_ENV, self.api_key.as_deref())
    }
}

/// CRM service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmConfig {
    pub base_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    /// Timeout for the token exchange.
    pub token_timeout_secs: u64,
    /// Timeout for data requests.
    pub request_timeout_secs: u64,
}

impl Default for CrmConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.gclick.com.br".to_string(),
            client_id: None,
            client_secret: None,
            token_timeout_secs: 10,
            request_timeout_secs: 30,
        }
    }
}

impl CrmConfig {
    /// Client credentials, preferring the environment over the file.
    ///
    /// Returns `None` when either half is missing.
    pub fn resolve_credentials(&self) -> Option<(String, String)> {
        let id = env_or(CRM_CLIENT_ID_ENV, self.client_id.as_deref())?;
        let secret = env_or(CRM_CLIENT_SECRET_ENV, self.client_secret.as_deref())?;
        Some((id, secret))
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Messages longer than this many characters are rejected.
    pub max_message_length: usize,
    /// Name the assistant introduces itself with.
    pub assistant_name: String,
    /// Organization the assistant works for.
    pub organization_name: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_length: 2000,
            assistant_name: "Deskmate".to_string(),
            organization_name: "Contec Contabilidade".to_string(),
        }
    }
}

fn env_or(var: &str, fallback: Option<&str>) -> Option<String> {
    std::env::var(var)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .or_else(|| fallback.map(str::to_string))
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_temp_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_default_config() {
        let config = DeskmateConfig::default();
        assert_eq!(config.general.data_dir, "~/.deskmate/data");
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.model.model, "gemini-1.5-flash");
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.model.max_tool_rounds, 5);
        assert_eq!(config.crm.base_url, "https://api.gclick.com.br");
        assert_eq!(config.crm.token_timeout_secs, 10);
        assert_eq!(config.chat.max_message_length, 2000);
        assert_eq!(config.chat.assistant_name, "Deskmate");
    }

    #[test]
    fn test_load_valid_config() {
        let content = r#"
[general]
data_dir = "/srv/deskmate"
log_level = "debug"

[server]
host = "0.0.0.0"
port = 8080

[model]
model = "gemini-1.5-pro"
max_tool_rounds = 3

[crm]
base_url = "http://crm.local"
client_id = "abc"
client_secret = "xyz"
"#;
        let file = create_temp_config(content);
        let config = DeskmateConfig::load(file.path()).unwrap();
        assert_eq!(config.general.data_dir, "/srv/deskmate");
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.rate_limit_per_sec, 100);
        assert_eq!(config.model.model, "gemini-1.5-pro");
        assert_eq!(config.model.max_tool_rounds, 3);
        assert_eq!(config.model.timeout_secs, 60);
        assert_eq!(config.crm.base_url, "http://crm.local");
        assert_eq!(config.crm.client_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_load_partial_config_uses_defaults() {
        let file = create_temp_config("[general]\nlog_level = \"warn\"\n");
        let config = DeskmateConfig::load(file.path()).unwrap();
        assert_eq!(config.general.log_level, "warn");
        assert_eq!(config.general.data_dir, "~/.deskmate/data");
        assert_eq!(config.server.port, 5000);
    }

    #[test]
    fn test_load_invalid_toml_is_config_error() {
        let file = create_temp_config("[server\nport = ");
        let err = DeskmateConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, DeskmateError::Config(_)));
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let config = DeskmateConfig::load_or_default(Path::new("/nonexistent/config.toml"));
        assert_eq!(config.general.data_dir, "~/.deskmate/data");
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = DeskmateConfig::default();
        config.server.port = 6001;
        config.save(&path).unwrap();

        let reloaded = DeskmateConfig::load(&path).unwrap();
        assert_eq!(reloaded.server.port, 6001);
        assert_eq!(reloaded.model.base_url, config.model.base_url);
    }

    #[test]
    fn test_env_or_prefers_nonempty_fallback() {
        let value = env_or("DESKMATE_TEST_UNSET_VARIABLE", Some("from-file"));
        assert_eq!(value.as_deref(), Some("from-file"));
        assert_eq!(env_or("DESKMATE_TEST_UNSET_VARIABLE", Some("  ")), None);
        assert_eq!(env_or("DESKMATE_TEST_UNSET_VARIABLE", None), None);
    }
}
