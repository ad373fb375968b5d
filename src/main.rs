use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use rollout::cache::CacheOverlay;
use rollout::cli::{
    FlagCommands, PilotCommands, run_check, run_flag_create, run_flag_delete, run_flag_list,
    run_flag_update, run_pilot_list, run_pilot_set, run_pilot_unset,
};
use rollout::config::Config;
use rollout::server::{AppState, create_router};
use rollout::store::{MemoryStore, SqliteStore, Store};

#[derive(Parser)]
#[command(name = "rollout")]
#[command(about = "A release flag rollout service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Serve {
        /// Path to a TOML configuration file
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// Keep all data in memory instead of SQLite
        #[arg(long)]
        in_memory: bool,
    },

    /// Manage release flags
    Flag {
        #[command(subcommand)]
        command: FlagCommands,
    },

    /// Manage pilot overrides
    Pilot {
        #[command(subcommand)]
        command: PilotCommands,
    },

    /// Evaluate flags, globally or for one pilot
    Check {
        /// Data directory for the database
        #[arg(long, default_value = "./data")]
        data_dir: String,

        /// Path to a TOML configuration file; only `[decision]` is used
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// External id of the pilot to evaluate for
        #[arg(long)]
        pilot: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Flag names
        #[arg(required = true)]
        flags: Vec<String>,
    },
}

fn open_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    if config.storage.in_memory {
        info!("Using in-memory storage");
        return Ok(Arc::new(MemoryStore::new()));
    }

    fs::create_dir_all(&config.storage.data_dir)?;
    let db_path = config.storage.db_path();
    let store = SqliteStore::new(&db_path)?;
    store.initialize()?;
    info!("Using database at {}", db_path.display());
    Ok(Arc::new(store))
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let backend = open_store(&config)?;

    let cache = if config.cache.enabled {
        let cache = Arc::new(CacheOverlay::with_config(backend.clone(), &config.cache));
        cache.start()?;
        info!("Cache enabled with {}s TTL", config.cache.ttl_secs);
        Some(cache)
    } else {
        None
    };

    let store: Arc<dyn Store> = match &cache {
        Some(cache) => cache.clone(),
        None => backend.clone(),
    };

    let state = Arc::new(AppState::new(store, &config.decision)?);

    let app = create_router(state);
    let addr = config.server.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    match cache {
        Some(cache) => cache.shutdown().await?,
        None => backend.close()?,
    }

    info!("Server shut down gracefully");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("rollout=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            in_memory,
        } => {
            let mut config = match config {
                Some(path) => Config::load(path)?,
                None => Config::default(),
            };
            if let Some(host) = host {
                config.server.host = host;
            }
            if let Some(port) = port {
                config.server.port = port;
            }
            if let Some(data_dir) = data_dir {
                config.storage.data_dir = data_dir;
            }
            config.storage.in_memory |= in_memory;

            serve(config).await?;
        }
        Commands::Flag { command } => match command {
            FlagCommands::Create {
                data_dir,
                name,
                percentage,
                decision_logic_api,
                rand_seed,
            } => run_flag_create(data_dir, name, percentage, decision_logic_api, rand_seed)?,
            FlagCommands::List { data_dir, json } => run_flag_list(data_dir, json)?,
            FlagCommands::Update {
                data_dir,
                name,
                percentage,
                decision_logic_api,
                rand_seed,
            } => run_flag_update(data_dir, name, percentage, decision_logic_api, rand_seed)?,
            FlagCommands::Delete { data_dir, name } => run_flag_delete(data_dir, name)?,
        },
        Commands::Pilot { command } => match command {
            PilotCommands::Set {
                data_dir,
                flag,
                pilot,
                enrolled,
            } => run_pilot_set(data_dir, flag, pilot, enrolled)?,
            PilotCommands::Unset {
                data_dir,
                flag,
                pilot,
            } => run_pilot_unset(data_dir, flag, pilot)?,
            PilotCommands::List {
                data_dir,
                flag,
                json,
            } => run_pilot_list(data_dir, flag, json)?,
        },
        Commands::Check {
            data_dir,
            config,
            pilot,
            json,
            flags,
        } => run_check(data_dir, config, pilot, flags, json).await?,
    }

    Ok(())
}
