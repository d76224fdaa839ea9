//! Project Hub - a personal registry of local development projects
//!
//! # Usage
//! ```bash
//! project-hub                                   # Serve data/projects.json on :3001
//! project-hub --data-file ~/hub.json --open     # Custom catalog, open browser
//! HOST_PROJECTS_ROOT=/Users/me/code \
//! CONTAINER_PROJECTS_ROOT=/projects project-hub # Translate host paths
//! ```

mod error;
mod git;
mod models;
mod paths;
mod readme;
mod routes;
mod store;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use clap::{Parser, ValueEnum};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use git::{GitCli, HistoryResolver, Libgit2, LogSource};
use paths::PathResolver;
use routes::AppState;
use store::ProjectStore;

/// Project Hub - catalog your local projects and peek at their git history
#[derive(Parser)]
#[command(name = "project-hub")]
#[command(about = "A personal registry of local development projects", long_about = None)]
struct Cli {
    /// JSON document holding the project collection
    #[arg(long, env = "PROJECT_HUB_DATA", default_value = "data/projects.json")]
    data_file: PathBuf,

    /// Root under which stored project paths were recorded
    #[arg(long, env = "HOST_PROJECTS_ROOT")]
    host_root: Option<PathBuf>,

    /// Where that same root is reachable from this process
    #[arg(long, env = "CONTAINER_PROJECTS_ROOT")]
    container_root: Option<PathBuf>,

    /// Port to run the server on
    #[arg(short, long, default_value = "3001")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    bind: String,

    /// Seconds before a `git log` call is abandoned
    #[arg(long, value_name = "SECONDS", default_value = "10")]
    git_timeout: u64,

    /// How commit history is read
    #[arg(long, value_enum, default_value_t = HistoryBackend::GitCli)]
    history_backend: HistoryBackend,

    /// Open browser automatically after starting
    #[arg(short, long)]
    open: bool,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum HistoryBackend {
    /// Shell out to the `git` executable
    GitCli,
    /// Read the repository in-process
    Libgit2,
}

impl HistoryBackend {
    fn source(self, timeout: Duration) -> Arc<dyn LogSource> {
        match self {
            HistoryBackend::GitCli => Arc::new(GitCli::new(timeout)),
            HistoryBackend::Libgit2 => Arc::new(Libgit2),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = Arc::new(ProjectStore::new(cli.data_file.clone()));
    let existing = {
        let store = store.clone();
        tokio::task::spawn_blocking(move || store.list().len()).await?
    };

    let paths = PathResolver::new(cli.host_root.clone(), cli.container_root.clone());
    let translating = paths.is_translating();
    let history = HistoryResolver::new(
        cli.history_backend.source(Duration::from_secs(cli.git_timeout)),
    );

    let data_file = store.path().to_path_buf();
    let state = AppState {
        store,
        paths: Arc::new(paths),
        history,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .merge(routes::create_router(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", cli.bind, cli.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("✗ Failed to bind to {}: {}", addr, e);
            eprintln!("  Try a different port with --port <PORT>");
            std::process::exit(1);
        }
    };

    tracing::info!(
        data_file = %data_file.display(),
        projects = existing,
        backend = ?cli.history_backend,
        "registry loaded"
    );

    let url = format!("http://{}", addr);
    println!();
    println!("  Project Hub");
    println!();
    println!("  Catalog: {}", data_file.display());
    println!("  Server:  {}", url);
    if let (true, Some(host), Some(container)) = (translating, &cli.host_root, &cli.container_root) {
        println!("  Paths:   {} -> {}", host.display(), container.display());
    }
    println!();
    println!("  Press Ctrl+C to stop");
    println!();

    if cli.open {
        if let Err(e) = open::that(&url) {
            eprintln!("  Warning: Could not open browser: {}", e);
        }
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
        println!("\n  Shutting down...");
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
