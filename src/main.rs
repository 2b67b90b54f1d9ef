//! `ocpp-bridge` — OCPP 1.6-J message engine, a headless process suitable for
//! deployment as a systemd service or container, following a
//! config-then-tracing-then-wiring entrypoint order.
//!
//! ```sh
//! ocpp-bridge
//! ocpp-bridge --config /etc/ocpp-bridge/config.toml
//! ocpp-bridge --check
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use sea_orm_migration::MigratorTrait;
use tracing::{error, info};

use ocpp_bridge::cache::DashMapCorrelator;
use ocpp_bridge::config::{default_config_path, AppConfig};
use ocpp_bridge::engine::OcppEngine;
use ocpp_bridge::shutdown::ShutdownCoordinator;
use ocpp_bridge::store::{migrator::Migrator, InMemoryChargePointStore, SeaOrmChargePointStore};
use ocpp_bridge::transport::{run_transport_loop, InMemoryTransport, TransportLoopConfig};

#[derive(Parser, Debug)]
#[command(
    name = "ocpp-bridge",
    version,
    about = "OCPP 1.6-J message engine bridging a message bus to a Central System store"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "OCPP_BRIDGE_CONFIG")]
    config: Option<PathBuf>,

    /// Override the worker concurrency.
    #[arg(long)]
    concurrency: Option<usize>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting.
    #[arg(long)]
    check: bool,

    /// Run against the in-memory store instead of the SeaORM-backed one.
    #[arg(long)]
    in_memory_store: bool,

    /// Skip running database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = match AppConfig::load(&config_path) {
        Ok(cfg) => {
            init_tracing(&cfg.logging.level);
            info!("configuration loaded from {}", config_path.display());
            cfg
        }
        Err(e) => {
            init_tracing("info");
            error!("failed to load config from {}: {e}", config_path.display());
            error!("using default configuration");
            AppConfig::default()
        }
    };

    if let Some(concurrency) = cli.concurrency {
        config.worker.concurrency = concurrency;
    }
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }

    if cli.check {
        println!("configuration is valid");
        println!("  config file  : {}", config_path.display());
        println!("  bus inbound  : {}", config.bus.inbound_topic);
        println!("  bus outbound : {}", config.bus.outbound_topic);
        println!("  store dsn    : {}", config.store.dsn);
        println!("  concurrency  : {}", config.worker.concurrency);
        return Ok(());
    }

    let recorder = metrics_exporter_prometheus::PrometheusBuilder::new();
    recorder.install()?;

    let store: Arc<dyn ocpp_bridge::store::ChargePointStore> = if cli.in_memory_store {
        info!("using in-memory charge point store");
        Arc::new(InMemoryChargePointStore::new())
    } else {
        let db = sea_orm::Database::connect(&config.store.dsn).await?;
        if !cli.no_migrate {
            Migrator::up(&db, None).await?;
        }
        Arc::new(SeaOrmChargePointStore::new(db))
    };

    let cache = Arc::new(DashMapCorrelator::new(config.cache.ttl_seconds as i64));

    let shutdown = ShutdownCoordinator::new(30);
    shutdown.start_signal_listener();

    let engine = Arc::new(
        OcppEngine::builder()
            .with_cache(cache)
            .with_store(store)
            .with_cache_timeout(std::time::Duration::from_secs(config.worker.cache_timeout_secs))
            .with_store_timeout(std::time::Duration::from_secs(config.worker.store_timeout_secs))
            .with_shutdown_signal(shutdown.signal())
            .build()?,
    );

    // The message-bus transport itself is out of scope (SPEC_FULL.md §1);
    // the in-memory double stands in for it in this reference binary.
    let transport = Arc::new(InMemoryTransport::new());

    let loop_config = TransportLoopConfig {
        send_timeout: std::time::Duration::from_secs(config.worker.send_timeout_secs),
        ..TransportLoopConfig::default()
    };

    let worker_count = config.worker.concurrency.max(1);
    info!(workers = worker_count, "ocpp-bridge running, press Ctrl+C to shut down");
    let mut loop_handles = Vec::with_capacity(worker_count);
    for _ in 0..worker_count {
        loop_handles.push(tokio::spawn(run_transport_loop(
            transport.clone(),
            engine.clone(),
            shutdown.signal(),
            loop_config,
        )));
    }

    shutdown.wait_for_shutdown().await;
    for handle in loop_handles {
        handle.await?;
    }

    Ok(())
}

fn init_tracing(level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .init();
}
