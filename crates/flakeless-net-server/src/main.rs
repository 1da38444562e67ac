use anyhow::Context;
use clap::Parser;
use flakeless::{Flakeless, GeneratorConfig};
use flakeless_net_server::{CliArgs, Server, ServerConfig, StateFile, init_telemetry};
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    init_telemetry(config.log_format)?;

    let server = Server::start(&config)
        .await
        .with_context(|| format!("failed to listen on {}", config.server_addr))?;
    log_startup_info(&server, &config);

    let state_files = bind_channels(&server, &config)?;
    let flusher = CancellationToken::new();
    let flush_task = tokio::spawn(flush_periodically(
        state_files.clone(),
        config.state_flush_interval,
        flusher.clone(),
    ));

    shutdown_signal().await;
    tracing::info!("Shutdown signal received, terminating gracefully...");

    if let Err(e) = server.shutdown().await {
        tracing::error!("Error during server shutdown: {e}");
    }

    flusher.cancel();
    let _ = flush_task.await;
    flush_all(&state_files);

    tracing::info!("Service shut down successfully");
    Ok(())
}

fn log_startup_info(server: &Server, config: &ServerConfig) {
    if cfg!(debug_assertions) {
        tracing::info!(
            "Starting ID service on {} with full config: {:#?}",
            server.local_addr(),
            config
        );
    } else {
        tracing::info!(
            "Starting ID service on {} with {} channels",
            server.local_addr(),
            config.channels.len()
        );
    }
}

/// Binds one generator per configured channel, wiring state files in when a
/// state directory is set.
fn bind_channels(server: &Server, config: &ServerConfig) -> anyhow::Result<Vec<StateFile>> {
    let mut state_files = Vec::new();

    for channel in &config.channels {
        let mut generator_config = GeneratorConfig::new()
            .with_worker_id(channel.worker_id)
            .with_epoch_start(config.epoch_start)
            .with_output_format(config.output_format);

        if let Some(dir) = &config.state_dir {
            let file = StateFile::for_channel(dir, &channel.name);
            generator_config = file
                .attach(generator_config)
                .with_context(|| format!("failed to read {}", file.path().display()))?;
            state_files.push(file);
        }

        let generator = Flakeless::new(generator_config)
            .with_context(|| format!("failed to restore state for {}", channel.name))?;
        if generator.worker_id() != channel.worker_id {
            tracing::warn!(
                channel = %channel.name,
                configured = channel.worker_id,
                restored = generator.worker_id(),
                "restored state carries a different worker id",
            );
        }
        server.bind(&channel.name, generator)?;
    }

    Ok(state_files)
}

async fn flush_periodically(
    files: Vec<StateFile>,
    every: core::time::Duration,
    stop: CancellationToken,
) {
    if files.is_empty() {
        return;
    }
    let mut ticker = tokio::time::interval(every);
    loop {
        tokio::select! {
            () = stop.cancelled() => break,
            _ = ticker.tick() => flush_all(&files),
        }
    }
}

fn flush_all(files: &[StateFile]) {
    for file in files {
        match file.flush() {
            Ok(true) => tracing::trace!(path = %file.path().display(), "state flushed"),
            Ok(false) => {}
            Err(e) => tracing::error!(path = %file.path().display(), "failed to write state: {e}"),
        }
    }
}

async fn shutdown_signal() {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl+C signal"),
        () = terminate => tracing::info!("Received SIGTERM signal"),
    }
}
