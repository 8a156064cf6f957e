//! Domain logic for trace ingestion
//!
//! - `traces` - Consumers and the trace processing pipeline

pub mod traces;

pub use traces::{ConsumerError, TracePipeline, TracesConsumer};
