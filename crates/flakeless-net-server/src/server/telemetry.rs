//! # Logging
//!
//! Installs a global `tracing` subscriber:
//!
//! - `RUST_LOG` selects what is recorded (default `info`), e.g.
//!   `RUST_LOG=flakeless_net_server=debug,flakeless=trace`.
//! - [`LogFormat::Text`] prints human-readable lines with local RFC 3339
//!   timestamps; [`LogFormat::Json`] prints one JSON object per event for log
//!   shippers.
//!
//! The `flakeless` core crate is built with its `tracing` feature here, so
//! `RUST_LOG=flakeless=trace` also shows every generator step.

use crate::server::config::LogFormat;
use tracing_subscriber::{
    EnvFilter, fmt::time::ChronoLocal, layer::SubscriberExt, util::SubscriberInitExt,
};

pub fn init_telemetry(format: LogFormat) -> anyhow::Result<()> {
    let registry = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()));

    match format {
        LogFormat::Text => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_thread_ids(true)
                    .with_line_number(true)
                    .with_target(false)
                    .with_timer(ChronoLocal::rfc_3339())
                    .with_file(true),
            )
            .try_init()?,
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_thread_ids(true)
                    .with_target(true)
                    .with_timer(ChronoLocal::rfc_3339()),
            )
            .try_init()?,
    }

    Ok(())
}
