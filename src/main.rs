use anyhow::Context;
use biodesk::{utils::config::Config, Application};
use tokio::signal;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let config = Config::new().context("Failed to load configuration")?;
    // Initialize logging; the guard flushes the file sink on exit
    let _log_guard = init_tracing(&config);

    info!("Starting biodesk v{}", env!("CARGO_PKG_VERSION"));

    // Initialize application
    let app = Application::new(config).await.map_err(|e| {
        error!("Failed to initialize application: {}", e);
        e
    })?;

    // Start the API server
    app.start().await.map_err(|e| {
        error!("Failed to start application: {}", e);
        e
    })?;

    // Wait for shutdown signal
    match signal::ctrl_c().await {
        Ok(()) => info!("Received shutdown signal"),
        Err(err) => error!("Failed to listen for shutdown signal: {}", err),
    }

    // Perform graceful shutdown
    if let Err(e) = app.shutdown().await {
        error!("Error during shutdown: {}", e);
    }

    Ok(())
}

fn init_tracing(config: &Config) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.server.log_level));

    let stdout = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_level(true)
        .with_file(true)
        .with_line_number(true);

    // Optional daily-rotated file output
    let (file_layer, guard) = match &config.logging.directory {
        Some(directory) => {
            let appender = tracing_appender::rolling::daily(directory, &config.logging.file_prefix);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer().with_ansi(false).with_writer(writer);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(stdout)
        .with(file_layer)
        .init();

    guard
}
