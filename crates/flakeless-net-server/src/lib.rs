//! # flakeless-net-server
//!
//! Serves batches of flakeless IDs to many clients over persistent TCP
//! connections. Each named channel (namespace) is bound to one generator,
//! owned by a dedicated worker task, so a generator is never stepped
//! concurrently.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use flakeless::{Flakeless, GeneratorConfig};
//! use flakeless_net_server::{Server, ServerConfig};
//!
//! let config = ServerConfig {
//!     server_addr: "127.0.0.1:4000".to_owned(),
//!     ..ServerConfig::default()
//! };
//! let server = Server::start(&config).await?;
//! server.bind("/orders", Flakeless::new(GeneratorConfig::new().with_worker_id(1))?)?;
//! // ...
//! server.shutdown().await?;
//! # Ok(())
//! # }
//! ```

pub mod server;

pub use server::{
    config::{ChannelSpec, CliArgs, LogFormat, ServerConfig},
    persistence::StateFile,
    pool::{ChannelPool, WorkRequest},
    service::Server,
    telemetry::init_telemetry,
};
