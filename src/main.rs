use std::path::Path;
use std::sync::Arc;

use funnel_sim::config::SimConfig;
use funnel_sim::insights::InsightEngine;
use funnel_sim::server::{AppState, api_routes};
use funnel_sim::session::Simulator;
use funnel_sim::store::{FunnelStore, LibSqlStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let config = SimConfig::from_env()?;

    eprintln!("📈 Funnel Sim v{}", env!("CARGO_PKG_VERSION"));
    eprintln!("   API: http://0.0.0.0:{}/api", config.port);
    eprintln!("   Database: {}", config.db_path);
    eprintln!(
        "   Step processing delay: {}ms",
        config.processing_delay.as_millis()
    );
    if let Some(csv) = &config.csv_backup {
        eprintln!("   CSV backup: {}", csv.display());
    }
    eprintln!();

    // ── Store ───────────────────────────────────────────────────────────
    let mut store = LibSqlStore::new_local(Path::new(&config.db_path)).await?;
    if let Some(csv) = &config.csv_backup {
        store = store.with_csv_backup(csv);
    }
    let store: Arc<dyn FunnelStore> = Arc::new(store);

    // ── Core ────────────────────────────────────────────────────────────
    let simulator = Arc::new(Simulator::new(
        Arc::clone(&store),
        config.processing_delay,
    ));
    let engine = Arc::new(InsightEngine::default_rules().with_limit(config.insight_limit));

    // ── REST server ─────────────────────────────────────────────────────
    let app = api_routes(AppState {
        simulator,
        store,
        engine,
    });
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?;
    tracing::info!(port = config.port, "REST server started");
    axum::serve(listener, app).await?;

    Ok(())
}
