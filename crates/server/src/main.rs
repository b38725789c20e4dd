use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use sha2::{Digest, Sha256};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use reportrelay_core::config::LoggingConfig;
use reportrelay_core::{load_config, validate_config, Config, Orchestrator, RunReport, UploadStatus};
use reportrelay_server::api::create_router;
use reportrelay_server::cli::{requested_range, Cli, Commands};
use reportrelay_server::state::AppState;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        error!("Fatal error: {:#}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let loaded = load_config(&cli.config);

    let logging = match &loaded {
        Ok(config) => config.logging.clone(),
        Err(_) => LoggingConfig::default(),
    };
    init_logging(&logging, cli.log_json);

    info!("Loading configuration from {:?}", cli.config);
    let config =
        loaded.with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    let config_json = serde_json::to_string(&config).unwrap_or_default();
    let config_hash = format!("{:x}", Sha256::digest(config_json.as_bytes()));
    info!("Configuration loaded (hash {})", &config_hash[..16]);

    match cli.command {
        Commands::Run {
            start_date,
            end_date,
        } => {
            let range = requested_range(&config.date_range, start_date, end_date)
                .context("Invalid date range")?;
            let orchestrator = build_orchestrator(config)?;
            let report = orchestrator.run(range).await;
            log_report(&report);
            if !report.success {
                bail!(
                    "Workflow failed at {}: {}",
                    report
                        .failed_step
                        .map(|s| s.to_string())
                        .unwrap_or_else(|| "unknown step".to_string()),
                    report.error.unwrap_or_default()
                );
            }
        }
        Commands::Serve => serve(config, &cli.config).await?,
        Commands::ValidateConfig => {
            validate_config(&config).context("Configuration validation failed")?;
            info!("Configuration is valid");
            println!("Configuration is valid");
        }
        Commands::TestUpload => {
            let orchestrator = build_orchestrator(config)?;
            orchestrator
                .test_upload_connection()
                .await
                .context("Upload connection test failed")?;
            info!("Upload connection OK");
        }
        Commands::TestExtraction => {
            let orchestrator = build_orchestrator(config)?;
            orchestrator
                .test_extraction_connection()
                .await
                .context("Extraction connection test failed")?;
            info!("Extraction host reachable");
        }
        Commands::TestDetection => {
            let orchestrator = build_orchestrator(config)?;
            let artifact = orchestrator
                .test_file_detection()
                .await
                .context("File detection test failed")?;
            info!(
                "Found {} ({} bytes, {:?} old) after {} poll(s)",
                artifact.path.display(),
                artifact.size,
                artifact.age,
                artifact.polls
            );
        }
        Commands::Process { file } => {
            let orchestrator = build_orchestrator(config)?;
            let report = orchestrator.process_file_only(&file).await;
            log_report(&report);
            if !report.success {
                bail!(
                    "Processing {} failed: {}",
                    file.display(),
                    report.error.unwrap_or_default()
                );
            }
        }
        Commands::Cleanup { days } => {
            let days = days.unwrap_or(config.backup.retention_days);
            let orchestrator = build_orchestrator(config)?;
            let removed = orchestrator
                .cleanup_old_files(days)
                .await
                .context("Backup cleanup failed")?;
            info!("Removed {} old backup(s)", removed);
        }
    }

    Ok(())
}

fn init_logging(logging: &LoggingConfig, force_json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},tower_http=debug", logging.level)));
    let registry = tracing_subscriber::registry().with(filter);

    if logging.json || force_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

fn build_orchestrator(config: Config) -> Result<Orchestrator> {
    Orchestrator::from_config(config).context("Failed to create orchestrator")
}

fn log_report(report: &RunReport) {
    if let Some(artifact) = &report.artifact {
        info!("Report file: {}", artifact.path.display());
    }
    match &report.upload {
        Some(UploadStatus::Uploaded { receipt, attempts }) => info!(
            "Uploaded {} ({:?}, {} chunk(s), {} attempt(s))",
            receipt.remote_path, receipt.mode, receipt.chunks, attempts
        ),
        Some(UploadStatus::Failed { error, attempts }) => {
            warn!("Upload failed after {} attempt(s): {}", attempts, error)
        }
        Some(UploadStatus::NotConfigured) | None => {}
    }
    for warning in &report.warnings {
        warn!("{}", warning);
    }
    if report.success {
        info!(
            "Run {} succeeded in {} ms ({} extraction retries, {} backup(s))",
            report.run_id,
            report.duration_ms(),
            report.extraction_retries(),
            report.backups.len()
        );
    } else {
        error!(
            "Run {} failed at {}: {}",
            report.run_id,
            report
                .failed_step
                .map(|s| s.to_string())
                .unwrap_or_default(),
            report.error.as_deref().unwrap_or_default()
        );
    }
}

async fn serve(config: Config, config_path: &std::path::Path) -> Result<()> {
    validate_config(&config).context("Configuration validation failed")?;

    let addr = SocketAddr::new(config.server.host, config.server.port);
    let auto_start = config.schedule.auto_start;
    let state = Arc::new(AppState::from_config(config, config_path)?);
    let scheduler = Arc::clone(state.scheduler());

    if auto_start {
        scheduler
            .start()
            .await
            .context("Failed to start scheduler")?;
    } else {
        info!("Scheduler auto-start disabled; start it through the API");
    }

    let app = create_router(state);

    info!("Starting control API on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutting down...");
    if scheduler.is_active() {
        if let Err(e) = scheduler.stop().await {
            warn!("Failed to stop scheduler: {}", e);
        }
    }
    info!("Shutdown complete");

    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
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
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
