// =============================================================================
// Application Identity
// =============================================================================

/// Application name in title case (for display)
pub const APP_NAME: &str = "Traceport";

/// Application name in lowercase (for paths and identifiers)
pub const APP_NAME_LOWER: &str = "traceport";

/// Unix-style dotfile folder name
pub const APP_DOT_FOLDER: &str = ".traceport";

// =============================================================================
// Configuration Files
// =============================================================================

/// Config file name
pub const CONFIG_FILE_NAME: &str = "traceport.json";

/// Environment variable for config file path
pub const ENV_CONFIG: &str = "TRACEPORT_CONFIG";

// =============================================================================
// Environment Variables - Debug
// =============================================================================

/// Environment variable for debug mode
pub const ENV_DEBUG: &str = "TRACEPORT_DEBUG";

/// Environment variable for the debug output directory
pub const ENV_DEBUG_DIR: &str = "TRACEPORT_DEBUG_DIR";

/// Default debug output directory (relative to the working directory)
pub const DEFAULT_DEBUG_DIR: &str = "debug";

/// Debug file receiving one JSON line per accepted trace batch
pub const DEBUG_TRACES_FILE: &str = "traces.jsonl";

// =============================================================================
// Environment Variables - Server
// =============================================================================

/// Environment variable for server host
pub const ENV_HOST: &str = "TRACEPORT_HOST";

/// Environment variable for log level/filter
pub const ENV_LOG: &str = "TRACEPORT_LOG";

/// Default server host
pub const DEFAULT_HOST: &str = "127.0.0.1";

// =============================================================================
// OTLP gRPC
// =============================================================================

/// Environment variable for the OTLP gRPC port
pub const ENV_GRPC_PORT: &str = "TRACEPORT_GRPC_PORT";

/// Environment variable for the maximum gRPC message size
pub const ENV_GRPC_MAX_MESSAGE_BYTES: &str = "TRACEPORT_GRPC_MAX_MESSAGE_BYTES";

/// Default OTLP gRPC port (standard OTLP gRPC port)
pub const DEFAULT_GRPC_PORT: u16 = 4317;

/// Default maximum encoded/decoded gRPC message size (64 MB)
pub const DEFAULT_GRPC_MAX_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Data format tag recorded for every export handled by the gRPC receiver
pub const DATA_FORMAT_PROTOBUF: &str = "protobuf";

/// Transport tag recorded by the receiver observability report
pub const TRANSPORT_GRPC: &str = "grpc";

/// Receiver identifier used in logs
pub const RECEIVER_OTLP: &str = "otlp";

// =============================================================================
// Trace Pipeline
// =============================================================================

/// Environment variable for the pipeline queue capacity
pub const ENV_QUEUE_SIZE: &str = "TRACEPORT_QUEUE_SIZE";

/// Environment variable controlling backpressure behavior
pub const ENV_BLOCK_WHEN_FULL: &str = "TRACEPORT_BLOCK_WHEN_FULL";

/// Environment variable for the per-batch span limit
pub const ENV_MAX_SPANS_PER_BATCH: &str = "TRACEPORT_MAX_SPANS_PER_BATCH";

/// Default number of batches buffered between receiver and pipeline
pub const DEFAULT_QUEUE_SIZE: usize = 1024;

/// Block exporters until queue capacity frees up (instead of refusing)
pub const DEFAULT_BLOCK_WHEN_FULL: bool = true;

/// Per-batch span limit (0 = unlimited)
pub const DEFAULT_MAX_SPANS_PER_BATCH: usize = 0;

/// Per-item timeout while draining the queue during shutdown (milliseconds)
pub const PIPELINE_DRAIN_TIMEOUT_MS: u64 = 100;

// =============================================================================
// Shutdown
// =============================================================================

/// Maximum time to wait for background tasks during shutdown
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;
