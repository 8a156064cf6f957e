//! Bounded handoff from receivers to the trace pipeline

use async_trait::async_trait;
use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use tokio::sync::mpsc;
use tonic::Status;

use super::consumer::TracesConsumer;
use super::error::ConsumerError;
use crate::core::config::PipelineConfig;
use crate::core::context::RequestContext;
use crate::utils::otlp::SpanCount;

/// Enqueues batches for the [`TracePipeline`](super::TracePipeline) task.
///
/// Classification of failures:
/// - batch over `max_spans_per_batch`: `InvalidArgument` status (caller error)
/// - pipeline task gone: permanent
/// - queue full without blocking: non-permanent
pub struct QueueConsumer {
    tx: mpsc::Sender<ExportTraceServiceRequest>,
    block_when_full: bool,
    max_spans_per_batch: usize,
}

impl QueueConsumer {
    /// Create the consumer and the receiving half handed to the pipeline
    pub fn new(config: &PipelineConfig) -> (Self, mpsc::Receiver<ExportTraceServiceRequest>) {
        let (tx, rx) = mpsc::channel(config.queue_size.max(1));
        let consumer = Self {
            tx,
            block_when_full: config.block_when_full,
            max_spans_per_batch: config.max_spans_per_batch,
        };
        (consumer, rx)
    }

    fn check_batch_size(&self, batch: &ExportTraceServiceRequest) -> Result<(), ConsumerError> {
        if self.max_spans_per_batch == 0 {
            return Ok(());
        }
        let span_count = batch.span_count();
        if span_count > self.max_spans_per_batch {
            return Err(Status::invalid_argument(format!(
                "batch of {} spans exceeds limit of {} spans",
                span_count, self.max_spans_per_batch
            ))
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl TracesConsumer for QueueConsumer {
    async fn consume_traces(
        &self,
        cx: &RequestContext,
        batch: &ExportTraceServiceRequest,
    ) -> Result<(), ConsumerError> {
        self.check_batch_size(batch)?;

        if let Some(err) = cx.err() {
            return Err(err.into());
        }

        if !self.block_when_full {
            return match self.tx.try_send(batch.clone()) {
                Ok(()) => Ok(()),
                Err(mpsc::error::TrySendError::Full(_)) => {
                    tracing::debug!("Trace queue full, refusing batch");
                    Err(ConsumerError::non_permanent("trace queue is full"))
                }
                Err(mpsc::error::TrySendError::Closed(_)) => Err(pipeline_stopped()),
            };
        }

        // Wait for capacity, but never past the caller's cancellation or deadline
        tokio::select! {
            biased;
            permit = self.tx.reserve() => match permit {
                Ok(permit) => {
                    permit.send(batch.clone());
                    Ok(())
                }
                Err(_) => Err(pipeline_stopped()),
            },
            err = cx.done() => Err(err.into()),
        }
    }
}

fn pipeline_stopped() -> ConsumerError {
    ConsumerError::permanent("trace pipeline is not running")
}
