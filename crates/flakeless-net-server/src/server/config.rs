use anyhow::{anyhow, bail};
use clap::{Parser, ValueEnum};
use core::{str::FromStr, time::Duration};
use flakeless::{FlakeId, OutputFormat};
use flakeless_net_core::normalize_namespace;
use std::{collections::HashSet, path::PathBuf};

/// Listen address used when none is configured.
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:4000";

/// Largest batch a single request may ask for by default.
pub const DEFAULT_MAX_BATCH_SIZE: u32 = 65_536;

/// Hard ceiling for `MAX_BATCH_SIZE`, keeping a full batch of decimal IDs
/// well inside one frame.
pub const MAX_BATCH_LIMIT: u32 = 262_144;

/// Runtime configuration for the `flakeless-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a
/// `.env` file is honoured), with defaults suitable for a single node.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "flakeless-server",
    version,
    about = "Serves batches of time-sortable 63-bit IDs over named channels"
)]
pub struct CliArgs {
    /// Address to listen on.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from(DEFAULT_SERVER_ADDR))]
    pub server_addr: String,

    /// Unix millisecond every channel's timestamps are measured from.
    ///
    /// Must stay fixed for the lifetime of the ID space: changing it can
    /// produce IDs that sort before ones already issued.
    ///
    /// Environment variable: `EPOCH_START`
    #[arg(long, env = "EPOCH_START", default_value_t = 1)]
    pub epoch_start: u64,

    /// Rendering of served IDs: `decimal`, `hex` or `base64`.
    ///
    /// Environment variable: `OUTPUT_FORMAT`
    #[arg(long, env = "OUTPUT_FORMAT", default_value_t = OutputFormat::Base64Custom)]
    pub output_format: OutputFormat,

    /// A channel binding as `namespace=workerID`, e.g. `/orders=1`.
    /// Repeat the flag, or comma-separate in the environment variable.
    ///
    /// Environment variable: `CHANNELS`
    #[arg(long = "channel", env = "CHANNELS", value_delimiter = ',', required = true)]
    pub channels: Vec<ChannelSpec>,

    /// Maximum number of IDs allowed per request. Larger requests are
    /// rejected, not truncated.
    ///
    /// Environment variable: `MAX_BATCH_SIZE`
    #[arg(long, env = "MAX_BATCH_SIZE", default_value_t = DEFAULT_MAX_BATCH_SIZE)]
    pub max_batch_size: u32,

    /// Directory holding one `<channel>.state` file per channel. Generators
    /// resume from these files on start. Persistence is off when unset.
    ///
    /// Environment variable: `STATE_DIR`
    #[arg(long, env = "STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    /// How often state files are rewritten, in milliseconds.
    ///
    /// Environment variable: `STATE_FLUSH_INTERVAL_MS`
    #[arg(long, env = "STATE_FLUSH_INTERVAL_MS", default_value_t = 1_000)]
    pub state_flush_interval_ms: u64,

    /// Seconds to wait for connections and workers to stop.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,

    /// Log output format.
    ///
    /// Environment variable: `LOG_FORMAT`
    #[arg(long, env = "LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// One `namespace=workerID` binding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChannelSpec {
    pub name: String,
    pub worker_id: u64,
}

impl FromStr for ChannelSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, worker_id) = s
            .split_once('=')
            .ok_or_else(|| anyhow!("expected `namespace=workerID`, got {s:?}"))?;
        let worker_id = worker_id
            .trim()
            .parse()
            .map_err(|e| anyhow!("invalid worker id in {s:?}: {e}"))?;
        Ok(Self {
            name: normalize_namespace(name),
            worker_id,
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub epoch_start: u64,
    pub output_format: OutputFormat,
    pub channels: Vec<ChannelSpec>,
    pub max_batch_size: u32,
    pub state_dir: Option<PathBuf>,
    pub state_flush_interval: Duration,
    pub shutdown_timeout: Duration,
    pub log_format: LogFormat,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: DEFAULT_SERVER_ADDR.to_owned(),
            epoch_start: 1,
            output_format: OutputFormat::default(),
            channels: Vec::new(),
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            state_dir: None,
            state_flush_interval: Duration::from_secs(1),
            shutdown_timeout: Duration::from_secs(3),
            log_format: LogFormat::default(),
        }
    }
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.channels.is_empty() {
            bail!("at least one --channel is required");
        }

        let mut seen = HashSet::new();
        for channel in &args.channels {
            if channel.worker_id > FlakeId::max_worker_id() {
                bail!(
                    "worker id {} for channel {} exceeds the worker id space (max = {})",
                    channel.worker_id,
                    channel.name,
                    FlakeId::max_worker_id()
                );
            }
            if !seen.insert(channel.name.as_str()) {
                bail!("channel {} is bound more than once", channel.name);
            }
        }

        if args.max_batch_size == 0 {
            bail!("MAX_BATCH_SIZE must be greater than 0");
        }
        if args.max_batch_size > MAX_BATCH_LIMIT {
            bail!(
                "MAX_BATCH_SIZE ({}) exceeds the per-frame limit ({MAX_BATCH_LIMIT})",
                args.max_batch_size
            );
        }
        if args.state_flush_interval_ms == 0 {
            bail!("STATE_FLUSH_INTERVAL_MS must be greater than 0");
        }

        Ok(Self {
            server_addr: args.server_addr,
            epoch_start: args.epoch_start,
            output_format: args.output_format,
            channels: args.channels,
            max_batch_size: args.max_batch_size,
            state_dir: args.state_dir,
            state_flush_interval: Duration::from_millis(args.state_flush_interval_ms),
            shutdown_timeout: Duration::from_secs(args.shutdown_timeout),
            log_format: args.log_format,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> anyhow::Result<ServerConfig> {
        let argv = std::iter::once("flakeless-server").chain(args.iter().copied());
        ServerConfig::try_from(CliArgs::try_parse_from(argv)?)
    }

    #[test]
    fn channel_spec_parses_and_normalizes() {
        let spec: ChannelSpec = "orders=12".parse().unwrap();
        assert_eq!(
            spec,
            ChannelSpec {
                name: "/orders".to_owned(),
                worker_id: 12
            }
        );
        assert!("orders".parse::<ChannelSpec>().is_err());
        assert!("orders=x".parse::<ChannelSpec>().is_err());
        assert!("orders=-1".parse::<ChannelSpec>().is_err());
    }

    #[test]
    fn parses_full_command_line() {
        let config = parse(&[
            "--server-addr",
            "127.0.0.1:9000",
            "--epoch-start",
            "1577836800000",
            "--output-format",
            "hex",
            "--channel",
            "/a=1",
            "--channel",
            "b=2",
            "--max-batch-size",
            "10",
            "--shutdown-timeout",
            "5",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(config.server_addr, "127.0.0.1:9000");
        assert_eq!(config.epoch_start, 1_577_836_800_000);
        assert_eq!(config.output_format, OutputFormat::Hex);
        assert_eq!(config.channels.len(), 2);
        assert_eq!(config.channels[1].name, "/b");
        assert_eq!(config.max_batch_size, 10);
        assert_eq!(config.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
        assert!(config.state_dir.is_none());
    }

    #[test]
    fn rejects_unknown_output_format() {
        assert!(parse(&["--channel", "/a=1", "--output-format", "base32"]).is_err());
    }

    #[test]
    fn rejects_out_of_range_worker_id() {
        let err = parse(&["--channel", "/a=1024"]).unwrap_err();
        assert!(err.to_string().contains("worker id 1024"));
    }

    #[test]
    fn rejects_duplicate_channels() {
        let err = parse(&["--channel", "/a=1", "--channel", "a=2"]).unwrap_err();
        assert!(err.to_string().contains("more than once"));
    }

    #[test]
    fn rejects_bad_batch_limits() {
        assert!(parse(&["--channel", "/a=1", "--max-batch-size", "0"]).is_err());
        assert!(parse(&["--channel", "/a=1", "--max-batch-size", "262145"]).is_err());
    }
}
