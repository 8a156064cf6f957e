use clap::{Parser, Subcommand};

use std::path::PathBuf;

use super::constants::{
    APP_NAME_LOWER, ENV_BLOCK_WHEN_FULL, ENV_CONFIG, ENV_DEBUG, ENV_DEBUG_DIR,
    ENV_GRPC_MAX_MESSAGE_BYTES, ENV_GRPC_PORT, ENV_HOST, ENV_MAX_SPANS_PER_BATCH, ENV_QUEUE_SIZE,
};

#[derive(Parser)]
#[command(name = APP_NAME_LOWER)]
#[command(version, about = "OTLP trace ingestion server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Server host address
    #[arg(long, short = 'H', global = true, env = ENV_HOST)]
    pub host: Option<String>,

    /// OTLP gRPC port
    #[arg(long, global = true, env = ENV_GRPC_PORT)]
    pub grpc_port: Option<u16>,

    /// Maximum encoded/decoded gRPC message size in bytes
    #[arg(long, global = true, env = ENV_GRPC_MAX_MESSAGE_BYTES)]
    pub grpc_max_message_bytes: Option<usize>,

    /// Enable debug mode (writes incoming trace batches to the debug folder)
    #[arg(long, global = true, env = ENV_DEBUG)]
    pub debug: bool,

    /// Directory for debug output
    #[arg(long, global = true, env = ENV_DEBUG_DIR)]
    pub debug_dir: Option<String>,

    /// Path to config file
    #[arg(long, short = 'c', global = true, env = ENV_CONFIG)]
    pub config: Option<PathBuf>,

    /// Number of batches buffered between receiver and pipeline
    #[arg(long, global = true, env = ENV_QUEUE_SIZE)]
    pub queue_size: Option<usize>,

    /// Wait for queue capacity instead of refusing exports when full
    #[arg(long, global = true, env = ENV_BLOCK_WHEN_FULL)]
    pub block_when_full: Option<bool>,

    /// Reject batches with more spans than this (0 = unlimited)
    #[arg(long, global = true, env = ENV_MAX_SPANS_PER_BATCH)]
    pub max_spans_per_batch: Option<usize>,
}

#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Start the server (default command)
    Start,
    /// Load and validate the configuration, print it, and exit
    Validate,
}

/// Configuration derived from CLI arguments
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub host: Option<String>,
    pub grpc_port: Option<u16>,
    pub grpc_max_message_bytes: Option<usize>,
    pub debug: bool,
    pub debug_dir: Option<String>,
    pub config: Option<PathBuf>,
    pub queue_size: Option<usize>,
    pub block_when_full: Option<bool>,
    pub max_spans_per_batch: Option<usize>,
}

impl From<Cli> for CliConfig {
    fn from(cli: Cli) -> Self {
        Self {
            host: cli.host,
            grpc_port: cli.grpc_port,
            grpc_max_message_bytes: cli.grpc_max_message_bytes,
            debug: cli.debug,
            debug_dir: cli.debug_dir,
            config: cli.config,
            queue_size: cli.queue_size,
            block_when_full: cli.block_when_full,
            max_spans_per_batch: cli.max_spans_per_batch,
        }
    }
}

/// Parse CLI arguments and return config with command
pub fn parse() -> (CliConfig, Option<Commands>) {
    let mut cli = Cli::parse();
    let command = cli.command.take();
    (cli.into(), command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from([
            "traceport",
            "-H",
            "0.0.0.0",
            "--grpc-port",
            "14317",
            "--grpc-max-message-bytes",
            "1048576",
            "--queue-size",
            "16",
            "--block-when-full",
            "false",
            "--max-spans-per-batch",
            "100",
            "--debug",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        let config = CliConfig::from(cli);
        assert_eq!(config.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(config.grpc_port, Some(14317));
        assert_eq!(config.grpc_max_message_bytes, Some(1_048_576));
        assert_eq!(config.queue_size, Some(16));
        assert_eq!(config.block_when_full, Some(false));
        assert_eq!(config.max_spans_per_batch, Some(100));
        assert!(config.debug);
    }

    #[test]
    fn test_cli_subcommands() {
        let cli = Cli::try_parse_from(["traceport", "validate", "-c", "custom.json"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Validate)));
        assert_eq!(cli.config, Some(PathBuf::from("custom.json")));

        let cli = Cli::try_parse_from(["traceport", "start"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Start)));
    }

    #[test]
    fn test_cli_rejects_invalid_port() {
        assert!(Cli::try_parse_from(["traceport", "--grpc-port", "99999"]).is_err());
    }
}
