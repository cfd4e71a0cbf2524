//! Study Reader
//!
//! Serves the reader site and builds its chapter and deck indexes.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use study_reader::config::Config;
use study_reader::content::FsContentStore;
use study_reader::highlights::HighlightLog;
use study_reader::library::{ChapterBuilder, DeckScanner, PandocConverter};
use study_reader::reader::ReaderSession;
use study_reader::routes;
use study_reader::state::AppState;
use study_reader::storage::FileStore;

#[derive(Parser)]
#[command(name = "study-reader")]
#[command(about = "Static study reader with durable highlights", long_about = None)]
struct Cli {
    /// Web root (overrides CONTENT_ROOT)
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Reader state file (overrides STATE_FILE)
    #[arg(long, global = true, value_name = "FILE")]
    state_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the web root over HTTP (default)
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    /// Convert .docx sources into chapter fragments and index.json
    BuildChapters {
        /// Source tree laid out as <source>/<system>/<name>.docx
        #[arg(long, value_name = "DIR")]
        sources: Option<PathBuf>,
        /// pandoc executable
        #[arg(long, default_value = "pandoc")]
        pandoc: PathBuf,
    },
    /// Scan deck folders and write the deck index
    BuildDecks {
        /// Folder holding quick/, firstaid/, pathoma/ and images/
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
        /// Output file (defaults to <dir>/app/index.json)
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },
    /// Print a chapter with its saved highlights applied
    Render {
        /// Chapter URL relative to the web root
        url: String,
    },
    /// List, or clear, the saved highlights of a chapter
    Highlights {
        /// Chapter URL relative to the web root
        url: String,
        #[arg(long)]
        clear: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "study_reader=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();

    let mut config = Config::from_env().unwrap_or_else(|e| {
        tracing::warn!("Failed to load config from env: {}, using defaults", e);
        Config::default()
    });

    let cli = Cli::parse();
    if let Some(root) = cli.root {
        config.content.root = root;
    }
    if let Some(state_file) = cli.state_file {
        config.storage.state_file = state_file;
    }

    match cli.command.unwrap_or(Command::Serve {
        host: None,
        port: None,
    }) {
        Command::Serve { host, port } => {
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            serve(config).await
        }
        Command::BuildChapters { sources, pandoc } => {
            let sources = sources.unwrap_or_else(|| config.content.sources_dir.clone());
            let builder =
                ChapterBuilder::new(sources, &config.content.root, PandocConverter::new(pandoc))?;
            let index = builder.build().await?;
            println!("Built {} chapters", index.items.len());
            Ok(())
        }
        Command::BuildDecks { dir, out } => {
            if let Some(dir) = dir {
                config.content.decks_dir = dir;
            }
            let out = out.unwrap_or_else(|| config.content.deck_index_path());
            let index = DeckScanner::new(&config.content.decks_dir)?.write(&out)?;
            println!(
                "Wrote {} ({} systems, {} topics)",
                out.display(),
                index.systems.len(),
                index.topic_count()
            );
            Ok(())
        }
        Command::Render { url } => {
            let store = FileStore::open(&config.storage.state_file)?;
            let content = FsContentStore::new(&config.content.root);
            let mut session = ReaderSession::new(store).without_resume_tracking();
            session
                .open(&content, &url)
                .await
                .with_context(|| format!("Could not open {}", url))?;
            if let Some(html) = session.render() {
                println!("{}", html);
            }
            Ok(())
        }
        Command::Highlights { url, clear } => {
            let store = FileStore::open(&config.storage.state_file)?;
            let log = HighlightLog::new(&store);
            if clear {
                log.clear_all(&url)?;
                println!("Cleared highlights for {}", url);
            } else {
                for descriptor in log.load_all(&url) {
                    println!("{}", serde_json::to_string(&descriptor)?);
                }
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!("Starting Study Reader v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Web root: {}", config.content.root.display());

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .with_context(|| format!("Invalid listen address {}:{}", config.server.host, config.server.port))?;
    let app = routes::router(AppState::new(config));

    tracing::info!("Study Reader listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
