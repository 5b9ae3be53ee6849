//! depthcast producer — entry point.
//!
//! ```text
//! depthcast-producer [HOST PORT]          Stream to HOST:PORT (default localhost:5000)
//! depthcast-producer --config <path>      Load a custom config TOML
//! depthcast-producer --frames <n>         Stop after n color frames
//! depthcast-producer --gen-config         Write default config to stdout
//! ```

use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use depthcast_producer::cli::Cli;
use depthcast_producer::config::ProducerConfig;
use depthcast_producer::service::ProducerService;
use depthcast_producer::signals::spawn_shutdown_listener;

// ── Main ─────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Wrong positional count exits here with usage and status 2.
    let cli = Cli::parse();

    // --gen-config: dump defaults and exit.
    if cli.gen_config {
        let text = toml::to_string_pretty(&ProducerConfig::default())?;
        println!("{text}");
        return Ok(());
    }

    // Load config, then let the command line override it.
    let mut config = ProducerConfig::load(&cli.config);
    cli.apply(&mut config);

    // Init tracing.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("depthcast-producer v{}", env!("CARGO_PKG_VERSION"));
    info!("collector: {}", config.to_target());
    info!(
        "source: {}x{} @ {} fps",
        config.source.width, config.source.height, config.source.fps
    );

    let service = ProducerService::new(config);
    let signals = spawn_shutdown_listener(service.stop_handle())?;

    let outcome = service.run().await;
    signals.abort();

    match outcome {
        Ok(summary) => {
            info!(
                "{} frames uploaded, {} failed, {} bytes sent",
                summary.uploaded, summary.failed, summary.bytes_uploaded
            );
            Ok(())
        }
        Err(e) => {
            error!("producer failed: {e}");
            Err(e.into())
        }
    }
}
