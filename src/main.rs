use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use futures::future::join_all;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use sluice::client::{DocumentSender, DryRunTransport, HttpTransport, SendOutcome, Transport};
use sluice::config::SluiceConfig;
use sluice::document::Document;
use sluice::ratelimit::{CancellationToken, SlidingWindowLimiter};

/// Send documents to the documents API without exceeding its rate limit.
#[derive(Debug, Parser)]
#[command(name = "sluice", version, about)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path to a JSON document to send (an empty document if omitted)
    #[arg(short, long)]
    document: Option<PathBuf>,

    /// Signature attached to every request
    #[arg(short, long, default_value = "")]
    signature: String,

    /// Number of concurrent sends
    #[arg(short = 'n', long, default_value_t = 1)]
    count: usize,

    /// Log documents instead of sending them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_thread_ids(true)
        .init();

    let cli = Cli::parse();

    info!("Starting Sluice");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = match &cli.config {
        Some(path) => SluiceConfig::from_file(path)?,
        None => SluiceConfig::default(),
    };
    let quota = config.limiter.quota()?;
    info!(
        limit = quota.limit(),
        window = ?quota.window(),
        endpoint = %config.client.endpoint,
        "Configuration loaded"
    );

    let document = match &cli.document {
        Some(path) => Document::from_json(&std::fs::read_to_string(path)?)?,
        None => Document::default(),
    };

    let transport: Arc<dyn Transport> = if cli.dry_run {
        Arc::new(DryRunTransport)
    } else {
        Arc::new(HttpTransport::new(&config.client)?)
    };
    let sender = DocumentSender::new(SlidingWindowLimiter::new(quota), transport);

    let shutdown = CancellationToken::new();
    tokio::spawn({
        let shutdown = shutdown.clone();
        async move {
            shutdown_signal().await;
            shutdown.cancel();
        }
    });

    let sends = (0..cli.count).map(|_| sender.send_with(&document, &cli.signature, &shutdown));
    let results = join_all(sends).await;

    let mut sent = 0;
    let mut skipped = 0;
    let mut failed = 0;
    for result in results {
        match result {
            Ok(SendOutcome::Sent(_)) => sent += 1,
            Ok(SendOutcome::NotAdmitted) => skipped += 1,
            Err(e) => {
                error!(error = %e, "Send failed");
                failed += 1;
            }
        }
    }

    info!(sent, skipped, failed, "Sluice finished");
    if failed > 0 {
        anyhow::bail!("{} of {} sends failed", failed, cli.count);
    }
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
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
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, cancelling pending sends");
        }
        _ = terminate => {
            info!("Received SIGTERM, cancelling pending sends");
        }
    }
}
