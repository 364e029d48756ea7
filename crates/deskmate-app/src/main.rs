//! Deskmate application binary - composition root.
//!
//! 1. Parse CLI flags and load configuration from TOML
//! 2. Install the tracing subscriber
//! 3. Open the SQLite database
//! 4. Build the model and CRM clients and the session registry
//! 5. Start the axum REST API server
//!
//! `--add-user` creates an account and prints its token instead of serving.

mod cli;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use deskmate_api::auth::generate_token;
use deskmate_api::routes;
use deskmate_api::state::AppState;
use deskmate_chat::{ExchangeLimits, GeminiClient, SessionFactory, SessionRegistry};
use deskmate_core::config::DeskmateConfig;
use deskmate_core::types::Role;
use deskmate_storage::{Database, KnowledgeRepository, UserRepository};
use deskmate_tools::CrmClient;

use cli::CliArgs;

/// Expand ~ to the home directory in a path string.
fn resolve_data_dir(data_dir: &str) -> PathBuf {
    match data_dir.strip_prefix("~/") {
        Some(rest) => {
            let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
            PathBuf::from(home).join(rest)
        }
        None => PathBuf::from(data_dir),
    }
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // The subscriber is not installed yet; config load warnings are dropped.
    let config_file = args.resolve_config_path();
    let mut config = DeskmateConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    config.server.port = args.resolve_port(config.server.port);

    let log_level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.general.log_level.clone());
    init_tracing(&log_level);

    tracing::info!("Starting Deskmate v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(path = %config_file.display(), "Configuration resolved");

    // Storage.
    let data_dir = resolve_data_dir(&config.general.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("deskmate.db");
    let db = Arc::new(Database::new(&db_path)?);
    tracing::info!(path = %db_path.display(), "SQLite database opened");

    if let Some(username) = args.add_user.as_deref() {
        let role = if args.admin { Role::Admin } else { Role::User };
        let token = generate_token();
        let user = UserRepository::new(db.clone()).create(username, role, &token)?;
        tracing::info!(user_id = user.id, role = role.as_str(), "User created");
        println!("{}", token);
        return Ok(());
    }

    // External services.
    let provider = match GeminiClient::from_config(&config.model) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!(error = %e, "Model client unavailable; set GEMINI_API_KEY or model.api_key");
            return Err(e.into());
        }
    };
    tracing::info!(model = provider.model(), "Model client ready");

    if config.crm.resolve_credentials().is_none() {
        tracing::error!("CRM credentials missing; company lookups will return no results");
    }
    let crm = CrmClient::from_config(&config.crm)?;

    let factory = SessionFactory::new(
        KnowledgeRepository::new(db.clone()),
        Arc::new(provider),
        Arc::new(crm),
        ExchangeLimits::from_config(&config.model),
        config.chat.clone(),
    );
    let sessions = SessionRegistry::new(factory);

    // === API server ===

    let state = AppState::new(config.clone(), db, sessions);
    routes::start_server(&config, state).await?;

    Ok(())
}
