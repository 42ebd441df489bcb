//! `zkid-server` entry point: parses the CLI, loads `ServerConfig`, wires a
//! `Verifier` and its collaborators, and either serves the axum HTTP
//! surface or dispatches a direct administrative subcommand.

mod admin;
mod cli;
mod config;
mod handlers;
mod logging;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tower_http::trace::TraceLayer;

use zkid_core::proof::StaticVerifyingKeyStore;
use zkid_core::registry::{self, IssuerRegistry, InMemoryIssuerRegistry};
use zkid_core::revocation::{IndexedTree, RevocationBackend, SparseMerkleTree, SparseRevocationBackend};
use zkid_core::stores::{GovernorRateLimiter, InMemoryChallengeStore, InMemoryNonceStore};
use zkid_core::telemetry::{BroadcastTelemetrySink, TelemetryCounters, TracingTelemetrySink};
use zkid_core::VerifierBuilder;
use zkid_types::ZkIdResult;

use cli::{Cli, Commands, IssuerAction};
use config::{RevocationBackendConfig, ServerConfig};
use state::AppState;

fn default_config_path(cli: &Cli) -> PathBuf {
    cli.config.clone().unwrap_or_else(|| PathBuf::from("zkid-server.toml"))
}

fn issuer_registry_path(cli: &Cli, config: &ServerConfig) -> PathBuf {
    config
        .issuer_registry_path
        .clone()
        .unwrap_or_else(|| cli.data_dir.clone().unwrap_or_else(|| PathBuf::from(".")).join("issuers.toml"))
}

async fn build_revocation_backend(config: &ServerConfig) -> ZkIdResult<Option<Arc<dyn RevocationBackend>>> {
    match &config.revocation_backend {
        RevocationBackendConfig::None => Ok(None),
        RevocationBackendConfig::Sparse => {
            let tree = SparseMerkleTree::new(config.verifier.revocation_tree.depth)?;
            Ok(Some(Arc::new(SparseRevocationBackend::new(tree)) as Arc<dyn RevocationBackend>))
        }
        RevocationBackendConfig::Indexed { database_url, table_prefix } => {
            let pool = PgPoolOptions::new()
                .max_connections(8)
                .connect(database_url)
                .await
                .map_err(|e| zkid_types::ZkIdError::Config(format!("connecting to revocation database: {e}")))?;
            let tree = IndexedTree::open(pool, table_prefix, config.verifier.revocation_tree.depth).await?;
            Ok(Some(Arc::new(tree) as Arc<dyn RevocationBackend>))
        }
    }
}

fn load_issuer_registry(path: &PathBuf) -> ZkIdResult<Arc<dyn IssuerRegistry>> {
    if path.exists() {
        Ok(Arc::new(registry::load_from_toml_file(path)?))
    } else {
        Ok(Arc::new(InMemoryIssuerRegistry::new()))
    }
}

async fn serve(cli: &Cli, config: ServerConfig, bind_override: Option<String>) -> anyhow::Result<()> {
    let issuer_registry = load_issuer_registry(&issuer_registry_path(cli, &config))?;
    let revocation_backend = build_revocation_backend(&config).await?;
    let scenarios = Arc::new(config.scenario_map()?);

    let vk_store = StaticVerifyingKeyStore::new();
    for entry in &config.verifying_keys {
        let bytes = std::fs::read(&entry.path)
            .map_err(|e| anyhow::anyhow!("reading verifying key {}: {e}", entry.path.display()))?;
        vk_store.insert(entry.variant.clone(), &bytes)?;
    }

    let rate_limiter = Arc::new(GovernorRateLimiter::new(
        config.verifier.rate_limit.limit as u32,
        config.verifier.rate_limit.window_ms as u64,
    ));

    let counters = Arc::new(TelemetryCounters::new());
    let telemetry = Arc::new(BroadcastTelemetrySink::new(vec![
        Box::new(TracingTelemetrySink),
        Box::new(counters.clone()),
    ]));

    let mut builder = VerifierBuilder::new(config.verifier.clone())
        .vk_store(Arc::new(vk_store))
        .issuer_registry(issuer_registry.clone())
        .rate_limiter(rate_limiter)
        .challenge_store(Arc::new(InMemoryChallengeStore::new()))
        .nonce_store(Arc::new(InMemoryNonceStore::new()))
        .telemetry(telemetry);

    if let Some(backend) = revocation_backend.clone() {
        builder = builder.revocation_backend(backend);
    }

    let verifier = Arc::new(builder.build()?);

    let state = AppState {
        verifier,
        issuer_registry,
        revocation_backend,
        scenarios,
        counters,
    };

    let app = Router::new()
        .route("/verify", post(handlers::verify))
        .route("/verify/scenario", post(handlers::verify_scenario))
        .route("/revocation/root", get(handlers::revocation_root))
        .route("/revocation/witness", get(handlers::revocation_witness))
        .route("/challenge", post(handlers::create_challenge))
        .route("/healthz", get(handlers::healthz))
        .route("/metrics", get(handlers::metrics))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let bind_addr = bind_override.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!(%bind_addr, "zkid-server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(&cli);

    let config_path = default_config_path(&cli);
    let config = if config_path.exists() {
        ServerConfig::from_toml_file(&config_path)?
    } else {
        ServerConfig::default()
    };

    match &cli.command {
        Commands::Serve { bind } => {
            let bind = bind.clone();
            serve(&cli, config, bind).await?;
        }
        Commands::Issuer { action } => match action {
            IssuerAction::Add {
                issuer,
                public_key,
                jurisdiction,
                valid_from,
                valid_to,
            } => {
                let path = issuer_registry_path(&cli, &config);
                let valid_from = valid_from.as_deref().map(|s| s.parse()).transpose()?;
                let valid_to = valid_to.as_deref().map(|s| s.parse()).transpose()?;
                admin::add_issuer(&path, issuer.clone(), public_key.clone(), jurisdiction.clone(), valid_from, valid_to)?;
                println!("added issuer record for {issuer}");
            }
            IssuerAction::List => {
                let path = issuer_registry_path(&cli, &config);
                for record in admin::list_issuers(&path)? {
                    println!("{}\t{:?}\t{}", record.issuer, record.status, record.public_key);
                }
            }
            IssuerAction::Suspend { issuer } => {
                let path = issuer_registry_path(&cli, &config);
                admin::suspend_issuer(&path, issuer)?;
                println!("suspended {issuer}");
            }
        },
        Commands::Revoke { commitment } => {
            let backend = build_revocation_backend(&config)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no revocation backend configured"))?;
            let root = admin::revoke_commitment(backend.as_ref(), commitment).await?;
            println!("revoked. new root: {root}");
        }
        Commands::RevocationRoot => {
            let backend = build_revocation_backend(&config)
                .await?
                .ok_or_else(|| anyhow::anyhow!("no revocation backend configured"))?;
            let root = backend.get_root().await?;
            println!("{root}");
        }
    }

    Ok(())
}
