//! Receiver observability: one start/end record per handled export
//!
//! [`TracesOp`] is the scoped form of the record: it calls
//! [`ObsReport::start_traces_op`] when created and guarantees exactly one
//! [`ObsReport::end_traces_op`], either through [`TracesOp::end`] or, if the
//! handler future is dropped first, from `Drop` with a cancellation error.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::core::context::{ContextError, RequestContext};
use crate::domain::ConsumerError;

/// Sink for receiver operation records
pub trait ObsReport: Send + Sync {
    /// Open a record, returning the context to pass downstream
    fn start_traces_op(&self, cx: &RequestContext) -> RequestContext;

    /// Close the record opened for `cx`
    fn end_traces_op(
        &self,
        cx: &RequestContext,
        format: &str,
        span_count: usize,
        err: Option<&ConsumerError>,
    );
}

/// Scoped observability record for a single export
pub struct TracesOp<'a> {
    report: &'a dyn ObsReport,
    cx: RequestContext,
    format: &'static str,
    span_count: usize,
    ended: bool,
}

impl<'a> TracesOp<'a> {
    pub fn start(
        report: &'a dyn ObsReport,
        cx: &RequestContext,
        format: &'static str,
        span_count: usize,
    ) -> Self {
        let cx = report.start_traces_op(cx);
        Self {
            report,
            cx,
            format,
            span_count,
            ended: false,
        }
    }

    /// Derived context for the downstream call
    pub fn context(&self) -> &RequestContext {
        &self.cx
    }

    pub fn end(mut self, err: Option<&ConsumerError>) {
        self.finish(err);
    }

    fn finish(&mut self, err: Option<&ConsumerError>) {
        if self.ended {
            return;
        }
        self.ended = true;
        self.report
            .end_traces_op(&self.cx, self.format, self.span_count, err);
    }
}

impl Drop for TracesOp<'_> {
    fn drop(&mut self) {
        if !self.ended {
            let err = ConsumerError::from(ContextError::Cancelled);
            self.finish(Some(&err));
        }
    }
}

// ============================================================================
// DEFAULT REPORTER
// ============================================================================

/// Counters kept by [`ReceiverObsReport`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiverStats {
    pub accepted_spans: u64,
    pub refused_spans: u64,
}

/// Logs every operation and keeps accepted/refused span totals
pub struct ReceiverObsReport {
    receiver: &'static str,
    transport: &'static str,
    accepted_spans: AtomicU64,
    refused_spans: AtomicU64,
}

impl ReceiverObsReport {
    pub fn new(receiver: &'static str, transport: &'static str) -> Self {
        Self {
            receiver,
            transport,
            accepted_spans: AtomicU64::new(0),
            refused_spans: AtomicU64::new(0),
        }
    }

    pub fn stats(&self) -> ReceiverStats {
        ReceiverStats {
            accepted_spans: self.accepted_spans.load(Ordering::Relaxed),
            refused_spans: self.refused_spans.load(Ordering::Relaxed),
        }
    }
}

impl ObsReport for ReceiverObsReport {
    fn start_traces_op(&self, cx: &RequestContext) -> RequestContext {
        tracing::trace!(
            receiver = self.receiver,
            transport = self.transport,
            "Traces receive started"
        );
        cx.child()
    }

    fn end_traces_op(
        &self,
        cx: &RequestContext,
        format: &str,
        span_count: usize,
        err: Option<&ConsumerError>,
    ) {
        let duration_ms = cx.elapsed().as_secs_f64() * 1000.0;
        match err {
            None => {
                self.accepted_spans
                    .fetch_add(span_count as u64, Ordering::Relaxed);
                tracing::debug!(
                    receiver = self.receiver,
                    transport = self.transport,
                    format,
                    spans = span_count,
                    duration_ms,
                    "Accepted spans"
                );
            }
            Some(e) => {
                self.refused_spans
                    .fetch_add(span_count as u64, Ordering::Relaxed);
                tracing::warn!(
                    receiver = self.receiver,
                    transport = self.transport,
                    format,
                    spans = span_count,
                    duration_ms,
                    error = %e,
                    kind = e.kind(),
                    "Refused spans"
                );
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingObsReport;
    use super::*;

    #[test]
    fn test_op_end_records_once() {
        let report = RecordingObsReport::default();
        let op = TracesOp::start(&report, &RequestContext::new(), "protobuf", 4);
        op.end(None);

        assert_eq!(report.start_count(), 1);
        let ends = report.ends();
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].format, "protobuf");
        assert_eq!(ends[0].span_count, 4);
        assert!(ends[0].err.is_none());
    }

    #[test]
    fn test_op_dropped_without_end_records_cancellation() {
        let report = RecordingObsReport::default();
        {
            let _op = TracesOp::start(&report, &RequestContext::new(), "protobuf", 2);
        }

        let ends = report.ends();
        assert_eq!(ends.len(), 1);
        assert_eq!(ends[0].err.as_ref().map(ConsumerError::kind), Some("cancelled"));
    }

    #[test]
    fn test_op_context_is_child_of_request() {
        let report = RecordingObsReport::default();
        let cx = RequestContext::new();
        let op = TracesOp::start(&report, &cx, "protobuf", 1);

        cx.cancel();
        assert!(op.context().is_cancelled());
        op.end(None);
    }

    #[test]
    fn test_receiver_obsreport_counts_spans() {
        let report = ReceiverObsReport::new("otlp", "grpc");
        let cx = RequestContext::new();

        let op = TracesOp::start(&report, &cx, "protobuf", 5);
        op.end(None);
        let op = TracesOp::start(&report, &cx, "protobuf", 3);
        op.end(Some(&ConsumerError::other("backend timeout")));

        assert_eq!(
            report.stats(),
            ReceiverStats {
                accepted_spans: 5,
                refused_spans: 3,
            }
        );
    }
}
