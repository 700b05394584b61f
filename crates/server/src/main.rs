use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;

use spacexp_common::config::load_config;
use spacexp_common::logging;
use spacexp_server::{router, AppState};

#[derive(Parser)]
#[command(name = "spacexp-server", about = "Web UI and JSON API for a SpacExp catalog")]
struct Args {
    /// Path to config file (default: $SPACEXP_CONFIG, else ./spacexp.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Listen address, overriding server.bind
    #[arg(long, env = "SPACEXP_BIND")]
    bind: Option<String>,
    /// SQLite catalog, overriding output.database
    #[arg(long)]
    db: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = load_config(args.config.as_deref())?;
    let _guard = logging::init(
        &config.log,
        "warn,spacexp_server=info,spacexp_extract_dispatch=info,tower_http=info",
    );

    let db_path = args.db.unwrap_or_else(|| config.output.database.clone());
    // Fail at startup rather than on the first request.
    spacexp_store::open(&db_path)?;

    let bind = args.bind.unwrap_or_else(|| config.server.bind.clone());
    let state = Arc::new(AppState { db_path, index: config.index });
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind)
        .await
        .with_context(|| format!("binding to {bind}"))?;

    tracing::info!("listening on {bind}");
    axum::serve(listener, app).await.context("server error")?;

    Ok(())
}
