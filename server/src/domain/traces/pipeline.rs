//! Trace Processing Pipeline
//!
//! Drains the queue filled by [`QueueConsumer`](super::QueueConsumer):
//!
//! ```text
//! receiver ──▶ QueueConsumer ──▶ mpsc ──▶ TracePipeline ──▶ summary + stats
//! ```
//!
//! Each batch is summarised per `service.name` and counted. Export to storage
//! backends is not part of this server.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
use prost::Message;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::core::constants::PIPELINE_DRAIN_TIMEOUT_MS;
use crate::utils::otlp::{SpanCount, service_name};

/// Counters updated by the pipeline task
#[derive(Debug, Default)]
pub struct PipelineStats {
    batches: AtomicU64,
    spans: AtomicU64,
    bytes: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStatsSnapshot {
    pub batches: u64,
    pub spans: u64,
    pub bytes: u64,
}

impl PipelineStats {
    fn record(&self, spans: usize, bytes: usize) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        self.spans.fetch_add(spans as u64, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> PipelineStatsSnapshot {
        PipelineStatsSnapshot {
            batches: self.batches.load(Ordering::Relaxed),
            spans: self.spans.load(Ordering::Relaxed),
            bytes: self.bytes.load(Ordering::Relaxed),
        }
    }
}

// ============================================================================
// PIPELINE PROCESSOR
// ============================================================================

/// Trace processing pipeline orchestrator.
pub struct TracePipeline {
    stats: Arc<PipelineStats>,
}

impl Default for TracePipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl TracePipeline {
    pub fn new() -> Self {
        Self::with_stats(Arc::new(PipelineStats::default()))
    }

    /// Pipeline updating counters owned by the caller
    pub fn with_stats(stats: Arc<PipelineStats>) -> Self {
        Self { stats }
    }

    /// Shared handle to the pipeline counters
    pub fn stats(&self) -> Arc<PipelineStats> {
        Arc::clone(&self.stats)
    }

    /// Start the pipeline processor, consuming from `rx`.
    ///
    /// Exits when every sender is dropped, or after shutdown once the queue
    /// has been drained.
    pub fn start(
        self,
        mut rx: mpsc::Receiver<ExportTraceServiceRequest>,
        mut shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            tracing::debug!("TracePipeline started");

            let mut shutdown_requested = false;

            loop {
                if shutdown_requested {
                    // Drain remaining batches with timeout
                    match tokio::time::timeout(
                        Duration::from_millis(PIPELINE_DRAIN_TIMEOUT_MS),
                        rx.recv(),
                    )
                    .await
                    {
                        Ok(Some(batch)) => {
                            self.run(&batch);
                            continue;
                        }
                        _ => break,
                    }
                }

                tokio::select! {
                    biased;
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            tracing::debug!("TracePipeline received shutdown, draining...");
                            shutdown_requested = true;
                        }
                    }
                    batch = rx.recv() => {
                        match batch {
                            Some(batch) => self.run(&batch),
                            None => break,
                        }
                    }
                }
            }

            let stats = self.stats.snapshot();
            tracing::debug!(
                batches = stats.batches,
                spans = stats.spans,
                bytes = stats.bytes,
                "TracePipeline shutdown complete"
            );
        })
    }

    // ========================================================================
    // PIPELINE EXECUTION
    // ========================================================================

    fn run(&self, batch: &ExportTraceServiceRequest) {
        let spans = batch.span_count();
        let bytes = batch.encoded_len();
        self.stats.record(spans, bytes);

        let services = summarize_by_service(batch);
        tracing::debug!(
            spans,
            bytes,
            resources = batch.resource_spans.len(),
            services = ?services,
            "Processed trace batch"
        );
    }
}

/// Span counts keyed by `service.name`, resources without spans omitted
pub fn summarize_by_service(batch: &ExportTraceServiceRequest) -> BTreeMap<String, usize> {
    let mut services = BTreeMap::new();
    for resource_spans in &batch.resource_spans {
        let count = resource_spans.span_count();
        if count > 0 {
            *services.entry(service_name(resource_spans)).or_insert(0) += count;
        }
    }
    services
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::otlp::UNKNOWN_SERVICE;
    use crate::utils::otlp::fixtures::{resource_spans, trace_request};

    #[test]
    fn test_summarize_by_service() {
        let batch = ExportTraceServiceRequest {
            resource_spans: vec![
                resource_spans(Some("api"), &[2]),
                resource_spans(Some("db"), &[1, 1]),
                resource_spans(Some("api"), &[3]),
                resource_spans(None, &[1]),
                resource_spans(Some("idle"), &[0]),
            ],
        };
        let summary = summarize_by_service(&batch);
        assert_eq!(summary.get("api"), Some(&5));
        assert_eq!(summary.get("db"), Some(&2));
        assert_eq!(summary.get(UNKNOWN_SERVICE), Some(&1));
        assert!(!summary.contains_key("idle"));
    }

    #[tokio::test]
    async fn test_pipeline_counts_batches_until_senders_dropped() {
        let pipeline = TracePipeline::new();
        let stats = pipeline.stats();
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = pipeline.start(rx, shutdown_rx);
        tx.send(trace_request(2)).await.unwrap();
        tx.send(trace_request(3)).await.unwrap();
        drop(tx);

        handle.await.unwrap();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.batches, 2);
        assert_eq!(snapshot.spans, 5);
        assert!(snapshot.bytes > 0);
    }

    #[tokio::test]
    async fn test_pipeline_drains_queue_on_shutdown() {
        let pipeline = TracePipeline::new();
        let stats = pipeline.stats();
        let (tx, rx) = mpsc::channel(8);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        for _ in 0..3 {
            tx.send(trace_request(1)).await.unwrap();
        }
        shutdown_tx.send(true).unwrap();

        let handle = pipeline.start(rx, shutdown_rx);
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(stats.snapshot().batches, 3);
        assert_eq!(stats.snapshot().spans, 3);
        // The task exited on shutdown while a sender was still alive
        assert!(tx.is_closed());
    }
}
