use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::utils::file::expand_path;

use super::cli::CliConfig;
use super::constants::{
    APP_DOT_FOLDER, CONFIG_FILE_NAME, DEFAULT_BLOCK_WHEN_FULL, DEFAULT_DEBUG_DIR,
    DEFAULT_GRPC_MAX_MESSAGE_BYTES, DEFAULT_GRPC_PORT, DEFAULT_HOST, DEFAULT_MAX_SPANS_PER_BATCH,
    DEFAULT_QUEUE_SIZE,
};

// =============================================================================
// File Config (JSON)
// =============================================================================

/// Server configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct ServerFileConfig {
    pub host: Option<String>,
}

/// gRPC configuration (nested under otel)
#[derive(Debug, Default, Clone, Deserialize)]
pub struct GrpcFileConfig {
    pub port: Option<u16>,
    pub max_message_bytes: Option<usize>,
}

/// OpenTelemetry configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct OtelFileConfig {
    pub grpc: Option<GrpcFileConfig>,
}

/// Trace pipeline configuration section
#[derive(Debug, Default, Clone, Deserialize)]
pub struct PipelineFileConfig {
    pub queue_size: Option<usize>,
    pub block_when_full: Option<bool>,
    pub max_spans_per_batch: Option<usize>,
}

/// File-based configuration (JSON)
#[derive(Debug, Default, Deserialize)]
pub struct FileConfig {
    pub server: Option<ServerFileConfig>,
    pub otel: Option<OtelFileConfig>,
    pub pipeline: Option<PipelineFileConfig>,
    pub debug: Option<bool>,
    pub debug_dir: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}

impl FileConfig {
    /// Load configuration from a JSON file
    fn load_from_file(path: &Path) -> Result<Self> {
        tracing::debug!(path = %path.display(), "Loading config file");
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        tracing::trace!(config = ?config, "Parsed config file");
        Ok(config)
    }

    /// Warn about unknown fields in the config
    fn warn_unknown_fields(&self) {
        if let serde_json::Value::Object(map) = &self.extra
            && !map.is_empty()
        {
            let keys_str: String = map
                .keys()
                .map(|k| k.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            tracing::warn!(
                fields = %keys_str,
                "Unknown fields in config file (possible typos)"
            );
        }
    }

    /// Merge another FileConfig into this one (other takes precedence)
    fn merge(&mut self, other: FileConfig) {
        if let Some(server) = other.server {
            let current = self.server.get_or_insert_with(ServerFileConfig::default);
            if server.host.is_some() {
                tracing::trace!(host = ?server.host, "Merging server.host");
                current.host = server.host;
            }
        }

        if let Some(otel) = other.otel {
            let current = self.otel.get_or_insert_with(OtelFileConfig::default);
            if let Some(grpc) = otel.grpc {
                let current_grpc = current.grpc.get_or_insert_with(GrpcFileConfig::default);
                if grpc.port.is_some() {
                    tracing::trace!(port = ?grpc.port, "Merging otel.grpc.port");
                    current_grpc.port = grpc.port;
                }
                if grpc.max_message_bytes.is_some() {
                    tracing::trace!(
                        max_message_bytes = ?grpc.max_message_bytes,
                        "Merging otel.grpc.max_message_bytes"
                    );
                    current_grpc.max_message_bytes = grpc.max_message_bytes;
                }
            }
        }

        if let Some(pipeline) = other.pipeline {
            let current = self
                .pipeline
                .get_or_insert_with(PipelineFileConfig::default);
            if pipeline.queue_size.is_some() {
                tracing::trace!(queue_size = ?pipeline.queue_size, "Merging pipeline.queue_size");
                current.queue_size = pipeline.queue_size;
            }
            if pipeline.block_when_full.is_some() {
                tracing::trace!(
                    block_when_full = ?pipeline.block_when_full,
                    "Merging pipeline.block_when_full"
                );
                current.block_when_full = pipeline.block_when_full;
            }
            if pipeline.max_spans_per_batch.is_some() {
                tracing::trace!(
                    max_spans_per_batch = ?pipeline.max_spans_per_batch,
                    "Merging pipeline.max_spans_per_batch"
                );
                current.max_spans_per_batch = pipeline.max_spans_per_batch;
            }
        }

        if other.debug.is_some() {
            self.debug = other.debug;
        }
        if other.debug_dir.is_some() {
            self.debug_dir = other.debug_dir;
        }
    }
}

// =============================================================================
// Resolved Config
// =============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct ServerConfig {
    pub host: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GrpcConfig {
    pub port: u16,
    pub max_message_bytes: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    /// Batches buffered between the receiver and the pipeline task
    pub queue_size: usize,
    /// Wait for queue capacity instead of refusing with a retryable error
    pub block_when_full: bool,
    /// Reject batches with more spans than this (0 = unlimited)
    pub max_spans_per_batch: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            queue_size: DEFAULT_QUEUE_SIZE,
            block_when_full: DEFAULT_BLOCK_WHEN_FULL,
            max_spans_per_batch: DEFAULT_MAX_SPANS_PER_BATCH,
        }
    }
}

/// Effective application configuration
#[derive(Debug, Clone, Serialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub grpc: GrpcConfig,
    pub pipeline: PipelineConfig,
    pub debug: bool,
    pub debug_dir: PathBuf,
}

impl AppConfig {
    /// Load configuration from all sources
    ///
    /// Priority (lowest to highest):
    /// 1. Defaults
    /// 2. Profile directory config (~/.traceport/traceport.json)
    /// 3. Local directory config OR CLI-specified config path
    /// 4. CLI arguments (which include env var fallbacks via clap)
    pub fn load(cli: &CliConfig) -> Result<Self> {
        tracing::debug!("Loading application configuration");
        tracing::trace!(cli = ?cli, "CLI config");

        let mut file_config = FileConfig::default();
        let mut found_configs: Vec<String> = Vec::new();

        // 1. Load from profile dir (~/.traceport/traceport.json) - skip if not exists
        if let Some(profile_path) = get_profile_config_path()
            && profile_path.exists()
        {
            let profile_config = FileConfig::load_from_file(&profile_path)?;
            profile_config.warn_unknown_fields();
            file_config.merge(profile_config);
            found_configs.push(profile_path.display().to_string());
        }

        // 2. Load from CLI-specified path OR local directory
        let overlay_path = if let Some(ref path) = cli.config {
            let expanded = expand_path(&path.to_string_lossy());
            if !expanded.exists() {
                anyhow::bail!("Config file not found: {}", expanded.display());
            }
            Some(expanded)
        } else {
            let local = PathBuf::from(CONFIG_FILE_NAME);
            if local.exists() { Some(local) } else { None }
        };

        if let Some(path) = overlay_path {
            let overlay_config = FileConfig::load_from_file(&path)?;
            overlay_config.warn_unknown_fields();
            file_config.merge(overlay_config);
            found_configs.push(path.display().to_string());
        }

        tracing::debug!(configs = ?found_configs, "Config files loaded");

        let config = Self::resolve(cli, file_config);
        config.validate()?;

        tracing::debug!(
            host = %config.server.host,
            grpc_port = config.grpc.port,
            queue_size = config.pipeline.queue_size,
            block_when_full = config.pipeline.block_when_full,
            debug = config.debug,
            "Configuration loaded"
        );

        Ok(config)
    }

    /// Layer configs: defaults -> file config -> CLI/env overrides
    fn resolve(cli: &CliConfig, file_config: FileConfig) -> Self {
        let file_server = file_config.server.unwrap_or_default();
        let file_otel = file_config.otel.unwrap_or_default();
        let file_grpc = file_otel.grpc.unwrap_or_default();
        let file_pipeline = file_config.pipeline.unwrap_or_default();

        let host = cli
            .host
            .clone()
            .or(file_server.host)
            .unwrap_or_else(|| DEFAULT_HOST.to_string());

        let grpc = GrpcConfig {
            port: cli.grpc_port.or(file_grpc.port).unwrap_or(DEFAULT_GRPC_PORT),
            max_message_bytes: cli
                .grpc_max_message_bytes
                .or(file_grpc.max_message_bytes)
                .unwrap_or(DEFAULT_GRPC_MAX_MESSAGE_BYTES),
        };

        let pipeline = PipelineConfig {
            queue_size: cli
                .queue_size
                .or(file_pipeline.queue_size)
                .unwrap_or(DEFAULT_QUEUE_SIZE),
            block_when_full: cli
                .block_when_full
                .or(file_pipeline.block_when_full)
                .unwrap_or(DEFAULT_BLOCK_WHEN_FULL),
            max_spans_per_batch: cli
                .max_spans_per_batch
                .or(file_pipeline.max_spans_per_batch)
                .unwrap_or(DEFAULT_MAX_SPANS_PER_BATCH),
        };

        // --debug only ever enables; the file may enable it too
        let debug = cli.debug || file_config.debug.unwrap_or(false);
        let debug_dir = expand_path(
            cli.debug_dir
                .as_deref()
                .or(file_config.debug_dir.as_deref())
                .unwrap_or(DEFAULT_DEBUG_DIR),
        );

        Self {
            server: ServerConfig { host },
            grpc,
            pipeline,
            debug,
            debug_dir,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            anyhow::bail!("Configuration error: server.host must not be empty");
        }
        if self.grpc.port == 0 {
            anyhow::bail!("Configuration error: otel.grpc.port must be greater than 0");
        }
        if self.grpc.max_message_bytes == 0 {
            anyhow::bail!("Configuration error: otel.grpc.max_message_bytes must be greater than 0");
        }
        if self.pipeline.queue_size == 0 {
            anyhow::bail!("Configuration error: pipeline.queue_size must be greater than 0");
        }
        Ok(())
    }
}

/// Get the profile config path (~/.traceport/traceport.json)
fn get_profile_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|h| h.join(APP_DOT_FOLDER).join(CONFIG_FILE_NAME))
}
