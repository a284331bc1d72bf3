//! listenlab-study - audio transcription study service
//!
//! Serves the participant-facing study API: deterministic stimulus
//! assignment, linear session flow, and resumable progress reconstructed
//! from the record store.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use listenlab_common::config::{
    database_path, ensure_root_folder, resolve_root_folder, StudyConfig,
};
use listenlab_common::db::init_database;
use listenlab_study::content::{
    ContentCatalog, ContentStore, HttpContentStore, LocalContentStore,
};
use listenlab_study::session::SessionService;
use listenlab_study::store::SqliteStore;
use listenlab_study::{build_router, AppState};

#[derive(Debug, Parser)]
#[command(name = "listenlab-study", about = "Audio transcription study service")]
struct Args {
    /// Root folder holding the database, config, and local content
    #[arg(long)]
    root_folder: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber first
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Build identification before any slow startup work
    info!(
        "Starting ListenLab Study (listenlab-study) v{} [{}] built {} ({})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );

    let args = Args::parse();
    let root_folder = resolve_root_folder(args.root_folder.as_deref());
    ensure_root_folder(&root_folder)?;
    info!("Root folder: {}", root_folder.display());

    let config = StudyConfig::load(&root_folder)?;

    let db_path = database_path(&root_folder);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path).await?;
    let store = Arc::new(SqliteStore::new(pool));

    let content: Arc<dyn ContentStore> = match &config.content_base_url {
        Some(base_url) => {
            info!("Using remote content store: {}", base_url);
            Arc::new(HttpContentStore::new(base_url.clone())?)
        }
        None => {
            let content_root = root_folder.join("content");
            info!("Using local content store: {}", content_root.display());
            Arc::new(LocalContentStore::new(content_root))
        }
    };

    // Pool shortfalls surface here, before any participant can start
    let catalog = Arc::new(ContentCatalog::load(content.as_ref(), &config).await?);

    let service = Arc::new(SessionService::new(catalog, store));
    let state = AppState::new(service, content);
    let app = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("listenlab-study listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
