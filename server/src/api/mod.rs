//! Network-facing receivers

pub mod otlp_receiver;

pub use otlp_receiver::{OtlpGrpcServer, TraceReceiver};
