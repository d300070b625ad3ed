use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tokio::time::Duration;

use options_ingest::app;
use options_ingest::config::{IngestConfig, RunMode};
use options_ingest::db;
use options_ingest::external::polygon::PolygonProvider;
use options_ingest::external::ticker_universe::FileTickerUniverse;
use options_ingest::external::yield_classifier::YahooDividendClassifier;
use options_ingest::logging::{init_logging, LoggingConfig, QUIET_DEPENDENCIES};
use options_ingest::services::clock::{Clock, TokioClock};
use options_ingest::services::scheduler::IngestionScheduler;
use options_ingest::state::AppState;

#[derive(Parser)]
#[command(name = "options-ingest")]
#[command(about = "Rate-limited option-chain poller", long_about = None)]
struct Cli {
    /// Path to the SQLite database file (overrides OPTIONS_DB)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll option chains into the local store
    Run {
        /// Seconds between API calls (overrides POLL_INTERVAL_SECS)
        #[arg(long)]
        interval: Option<u64>,

        #[arg(long, value_enum, default_value_t = RunMode::Continuous)]
        mode: RunMode,
    },
    /// Serve read-only contract queries over HTTP
    Serve {
        #[arg(long, default_value_t = 3000)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Initialize logging FIRST
    let logging = LoggingConfig::from_env().with_default_directives(QUIET_DEPENDENCIES);
    init_logging(logging).map_err(|e| anyhow::anyhow!(e))?;

    let mut config = IngestConfig::from_env()?;
    if let Some(db) = cli.db {
        config.db_path = db;
    }

    match cli.command {
        Commands::Run { interval, mode } => {
            if let Some(secs) = interval {
                config.interval = Duration::from_secs(secs);
            }
            config.validate()?;
            config.require_credential()?;
            run_ingest(config, mode).await
        }
        Commands::Serve { port } => serve(config, port).await,
    }
}

async fn run_ingest(config: IngestConfig, mode: RunMode) -> anyhow::Result<()> {
    let pool = db::connect(&config.db_path).await?;
    let clock: Arc<dyn Clock> = Arc::new(TokioClock);

    let provider = PolygonProvider::new(
        config.api_key.clone(),
        &config.base_url,
        config.retry_policy(),
        config.request_timeout,
        clock.clone(),
    );

    let scheduler = IngestionScheduler::new(
        pool.clone(),
        Arc::new(provider),
        Arc::new(FileTickerUniverse::new(&config.tickers_file)),
        Arc::new(YahooDividendClassifier::new(config.request_timeout)),
        config.scheduler_settings(),
    )
    .with_clock(clock);

    let shutdown = scheduler.shutdown_signal();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("🛑 Ctrl-C received, finishing current call");
            shutdown.trigger();
        }
    });

    tracing::info!("🚀 Starting ingestion in {:?} mode (db: {})", mode, config.db_path.display());
    let summary = scheduler.run(mode).await;

    if summary.items_failed > 0 {
        tracing::warn!("{} symbol polls failed; see ticker_fetch_failures", summary.items_failed);
    }

    pool.close().await;
    Ok(())
}

async fn serve(config: IngestConfig, port: u16) -> anyhow::Result<()> {
    let pool = db::connect(&config.db_path).await?;
    let app = app::create_app(AppState { pool });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("🚀 Options query API running at http://{}/", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;

    Ok(())
}
