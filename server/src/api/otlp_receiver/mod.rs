//! OpenTelemetry Protocol (OTLP) gRPC trace receiver
//!
//! - `trace` - Export handler (`TraceService` implementation)
//! - `status` - Consumer error to gRPC status translation
//! - `obsreport` - Per-export observability records
//! - `grpc` - tonic server hosting the handler

mod grpc;
mod obsreport;
mod status;
mod trace;

pub use grpc::OtlpGrpcServer;
pub use obsreport::{ObsReport, ReceiverObsReport, ReceiverStats, TracesOp};
pub use status::status_from_error;
pub use trace::TraceReceiver;
