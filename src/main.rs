//! REPRICER: Competitive catalog repricing
//!
//! Entry point. Loads configuration, initialises structured logging, logs
//! into the catalog, and runs one search→parse→decide→update pass over the
//! product list with graceful shutdown on Ctrl+C.

use anyhow::{Context, Result};
use clap::Parser;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use repricer::catalog::shop_api::ShopApiClient;
use repricer::catalog::{CatalogClient, Credentials};
use repricer::config::{self, AppConfig};
use repricer::logging;
use repricer::engine::runner::{Repricer, RunReport};
use repricer::market::http::{build_client, HttpFetcher};

#[derive(Debug, Parser)]
#[command(version, about = "Keeps catalog prices competitive against a price-comparison site")]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(default_value = "config.toml")]
    config: String,

    /// Log proposed updates without pushing them to the catalog.
    #[arg(long)]
    dry_run: bool,

    /// Evaluate only the first N catalog products.
    #[arg(long, value_name = "N")]
    limit: Option<usize>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let mut cfg = config::AppConfig::load(&args.config)?;
    if args.dry_run {
        cfg.general.price_update_enabled = false;
    }
    if let Some(limit) = args.limit {
        cfg.general.max_products = Some(limit);
    }
    cfg.validate()?;

    let _log_guard = init_logging(&cfg)?;

    info!(
        shop = %cfg.general.shop_name,
        updates_enabled = cfg.general.price_update_enabled,
        delay_secs = cfg.general.request_delay_secs,
        "REPRICER starting up"
    );
    if !cfg.general.price_update_enabled {
        warn!("Price updates are disabled, running in dry-run mode");
    }

    // -- Initialise components -------------------------------------------

    let credentials = Credentials {
        username: AppConfig::resolve_env(&cfg.credentials.username_env)?,
        password: SecretString::new(AppConfig::resolve_env(&cfg.credentials.password_env)?),
    };
    let challenge_cookie = cfg
        .credentials
        .challenge_cookie_env
        .as_deref()
        .and_then(|env| std::env::var(env).ok());

    let http = build_client(&cfg, challenge_cookie.as_deref())?;
    let catalog: Arc<dyn CatalogClient> = Arc::new(ShopApiClient::new(http.clone(), cfg.api.clone()));
    let fetcher = Arc::new(HttpFetcher::from_config(http, &cfg)?);

    let token = catalog
        .login(&credentials)
        .await
        .context("Catalog login failed")?;
    info!("Logged into catalog");

    let products = catalog
        .list_products(&token)
        .await
        .context("Failed to load catalog products")?;
    info!(count = products.len(), "Catalog loaded");

    let repricer = Repricer::from_config(&cfg, fetcher, catalog, token)?;

    // -- Run -------------------------------------------------------------

    tokio::select! {
        report = repricer.run(&products) => {
            log_run_report(&report);
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received.");
        }
    }

    Ok(())
}

/// Log a human-readable run summary.
fn log_run_report(report: &RunReport) {
    let elapsed = report
        .finished_at
        .map(|end| (end - report.started_at).num_seconds())
        .unwrap_or_default();
    info!(
        run_id = %report.run_id,
        listed = report.products_listed,
        evaluated = report.evaluated,
        applied = report.applied,
        rejected = report.rejected,
        disabled = report.disabled,
        unchanged = report.no_change,
        not_found = report.not_found,
        parse_failures = report.parse_failures,
        errors = report.errors,
        skipped = report.skipped,
        elapsed_secs = elapsed,
        "Run complete"
    );
    if report.aborted_by_challenge {
        warn!(skipped = report.skipped, "Run ended early on a challenge page");
    }
}

/// Initialise the `tracing` subscriber.
///
/// The returned guard flushes the log file on drop and must live until exit.
fn init_logging(cfg: &config::AppConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("repricer={}", cfg.logging.level)));

    let json_logging = std::env::var("REPRICER_LOG_JSON").is_ok();

    let stdout_layer = if json_logging {
        fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .boxed()
    } else {
        fmt::layer().with_target(true).boxed()
    };

    let (file_layer, guard) = match logging::file_appender(&cfg.logging)? {
        Some(appender) => {
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}
