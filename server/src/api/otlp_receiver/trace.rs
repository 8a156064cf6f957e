//! OTLP trace export handler

use std::sync::Arc;

use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse, trace_service_server::TraceService,
};
use tonic::{Request, Response, Status};

use super::obsreport::{ObsReport, TracesOp};
use super::status::status_from_error;
use crate::core::constants::DATA_FORMAT_PROTOBUF;
use crate::core::context::RequestContext;
use crate::domain::{ConsumerError, TracesConsumer};
use crate::utils::otlp::SpanCount;

/// Receives OTLP trace exports and hands them to the next consumer
#[derive(Clone)]
pub struct TraceReceiver {
    next: Arc<dyn TracesConsumer>,
    obsreport: Arc<dyn ObsReport>,
}

impl TraceReceiver {
    pub fn new(next: Arc<dyn TracesConsumer>, obsreport: Arc<dyn ObsReport>) -> Self {
        Self { next, obsreport }
    }

    /// Handle one export call.
    ///
    /// Empty batches succeed without touching the consumer or the
    /// observability report. Otherwise exactly one consumer call and one
    /// observability record are made, and a consumer failure is returned as
    /// the translated status.
    pub async fn export(
        &self,
        cx: &RequestContext,
        batch: &ExportTraceServiceRequest,
    ) -> Result<ExportTraceServiceResponse, Status> {
        let span_count = batch.span_count();
        if span_count == 0 {
            return Ok(empty_response());
        }

        let op = TracesOp::start(self.obsreport.as_ref(), cx, DATA_FORMAT_PROTOBUF, span_count);
        let result = self.consume(op.context(), batch).await;
        op.end(result.as_ref().err());

        match result {
            Ok(()) => Ok(empty_response()),
            Err(e) => Err(status_from_error(&e)),
        }
    }

    /// Run the consumer until it finishes or `cx` is done, whichever is first
    async fn consume(
        &self,
        cx: &RequestContext,
        batch: &ExportTraceServiceRequest,
    ) -> Result<(), ConsumerError> {
        tokio::select! {
            biased;
            result = self.next.consume_traces(cx, batch) => result,
            err = cx.done() => Err(err.into()),
        }
    }
}

fn empty_response() -> ExportTraceServiceResponse {
    ExportTraceServiceResponse {
        partial_success: None,
    }
}

#[tonic::async_trait]
impl TraceService for TraceReceiver {
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> Result<Response<ExportTraceServiceResponse>, Status> {
        let cx = RequestContext::from_metadata(request.metadata());
        // tonic drops this future when the client goes away or the
        // grpc-timeout elapses; the guard propagates that as cancellation
        let _cancel_on_drop = cx.cancellation_token().clone().drop_guard();

        let batch = request.into_inner();
        TraceReceiver::export(self, &cx, &batch)
            .await
            .map(Response::new)
    }
}
