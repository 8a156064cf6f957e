//! Debug tee: records every batch to disk before handing it on

use std::path::PathBuf;

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;

use super::consumer::TracesConsumer;
use super::error::ConsumerError;
use crate::core::constants::DEBUG_TRACES_FILE;
use crate::core::context::RequestContext;
use crate::utils::debug::write_debug;
use crate::utils::otlp::SpanCount;

/// Wraps a consumer and appends each batch to `<debug_path>/traces.jsonl`.
/// Write failures are logged and never affect the inner consumer's result.
///
/// Every batch is captured before the inner consumer sees it, including
/// batches the inner consumer then refuses (span limit, full queue). The
/// capture is a record of what arrived, not of what was accepted.
pub struct DebugConsumer<C> {
    inner: C,
    debug_path: PathBuf,
}

impl<C: TracesConsumer> DebugConsumer<C> {
    pub fn new(inner: C, debug_path: PathBuf) -> Self {
        tracing::debug!(path = %debug_path.display(), "Debug trace capture enabled");
        Self { inner, debug_path }
    }
}

#[async_trait]
impl<C: TracesConsumer> TracesConsumer for DebugConsumer<C> {
    async fn consume_traces(
        &self,
        cx: &RequestContext,
        batch: &ExportTraceServiceRequest,
    ) -> Result<(), ConsumerError> {
        write_debug(&self.debug_path, DEBUG_TRACES_FILE, batch.span_count(), batch).await;
        self.inner.consume_traces(cx, batch).await
    }
}
