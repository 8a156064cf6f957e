//! Trace ingestion downstream of the receivers
//!
//! - `consumer` - The `TracesConsumer` contract receivers deliver to
//! - `error` - Consumer error classification
//! - `queue` - Bounded handoff into the pipeline task
//! - `debug` - JSON lines capture of incoming batches (debug mode)
//! - `pipeline` - Background task draining the queue

mod consumer;
mod debug;
mod error;
mod pipeline;
mod queue;

pub use consumer::TracesConsumer;
pub use debug::DebugConsumer;
pub use error::ConsumerError;
pub use pipeline::{PipelineStats, PipelineStatsSnapshot, TracePipeline, summarize_by_service};
pub use queue::QueueConsumer;
