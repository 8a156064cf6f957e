//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod context;
pub mod shutdown;

pub use crate::app::CoreApp;
pub use cli::{CliConfig, Commands};
pub use config::{AppConfig, GrpcConfig, PipelineConfig, ServerConfig};
pub use context::{ContextError, RequestContext};
pub use shutdown::ShutdownService;
