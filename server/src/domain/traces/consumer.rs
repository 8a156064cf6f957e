//! Downstream trace consumer contract

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;

use super::error::ConsumerError;
use crate::core::context::RequestContext;

/// Receives trace batches accepted by a receiver.
///
/// `Ok(())` means the batch was fully (or acceptably partially) taken over.
/// Implementations that block must observe `cx` (see
/// [`RequestContext::done`]) so a cancelled request releases them.
#[async_trait]
pub trait TracesConsumer: Send + Sync {
    async fn consume_traces(
        &self,
        cx: &RequestContext,
        batch: &ExportTraceServiceRequest,
    ) -> Result<(), ConsumerError>;
}
