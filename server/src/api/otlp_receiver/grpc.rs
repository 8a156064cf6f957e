//! gRPC OTLP server

use std::net::SocketAddr;

use anyhow::{Context, Result};
use opentelemetry_proto::tonic::collector::trace::v1::trace_service_server::TraceServiceServer;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server as TonicServer;

use super::trace::TraceReceiver;
use crate::core::config::GrpcConfig;

pub struct OtlpGrpcServer {
    listener: TcpListener,
    receiver: TraceReceiver,
    max_message_bytes: usize,
}

impl OtlpGrpcServer {
    /// Bind the listening socket. Port 0 picks an ephemeral port.
    pub async fn bind(config: &GrpcConfig, host: &str, receiver: TraceReceiver) -> Result<Self> {
        let addr = SocketAddr::new(
            host.parse()
                .with_context(|| format!("Invalid host address: {}", host))?,
            config.port,
        );
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind OTLP gRPC server to {}", addr))?;
        Ok(Self {
            listener,
            receiver,
            max_message_bytes: config.max_message_bytes,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serve until `shutdown_rx` turns true
    pub async fn start(self, mut shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let addr = self.local_addr()?;
        tracing::info!(%addr, "OTLP gRPC receiver listening");

        TonicServer::builder()
            .add_service(
                TraceServiceServer::new(self.receiver)
                    .max_decoding_message_size(self.max_message_bytes)
                    .max_encoding_message_size(self.max_message_bytes),
            )
            .serve_with_incoming_shutdown(TcpListenerStream::new(self.listener), async move {
                let _ = shutdown_rx.wait_for(|&v| v).await;
                tracing::debug!("OTLP gRPC server shutting down");
            })
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use opentelemetry_proto::tonic::collector::trace::v1::ExportTraceServiceRequest;
    use opentelemetry_proto::tonic::collector::trace::v1::trace_service_client::TraceServiceClient;
    use tokio::sync::mpsc;
    use tokio::task::JoinHandle;
    use tonic::Code;

    use super::*;
    use crate::api::otlp_receiver::obsreport::ReceiverObsReport;
    use crate::core::config::PipelineConfig;
    use crate::domain::traces::QueueConsumer;
    use crate::utils::otlp::SpanCount;
    use crate::utils::otlp::fixtures::trace_request;

    struct Harness {
        addr: SocketAddr,
        obsreport: Arc<ReceiverObsReport>,
        rx: mpsc::Receiver<ExportTraceServiceRequest>,
        shutdown_tx: watch::Sender<bool>,
        handle: JoinHandle<Result<()>>,
    }

    async fn start_server(pipeline: PipelineConfig, max_message_bytes: usize) -> Harness {
        let (consumer, rx) = QueueConsumer::new(&pipeline);
        let obsreport = Arc::new(ReceiverObsReport::new("otlp", "grpc"));
        let receiver = TraceReceiver::new(Arc::new(consumer), obsreport.clone());
        let config = GrpcConfig {
            port: 0,
            max_message_bytes,
        };
        let server = OtlpGrpcServer::bind(&config, "127.0.0.1", receiver)
            .await
            .unwrap();
        let addr = server.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(server.start(shutdown_rx));
        Harness {
            addr,
            obsreport,
            rx,
            shutdown_tx,
            handle,
        }
    }

    async fn connect(addr: SocketAddr) -> TraceServiceClient<tonic::transport::Channel> {
        TraceServiceClient::connect(format!("http://{}", addr))
            .await
            .unwrap()
    }

    fn pipeline(queue_size: usize, block_when_full: bool, max_spans: usize) -> PipelineConfig {
        PipelineConfig {
            queue_size,
            block_when_full,
            max_spans_per_batch: max_spans,
        }
    }

    #[tokio::test]
    async fn test_export_round_trip() {
        let mut harness = start_server(pipeline(8, true, 0), 4 * 1024 * 1024).await;
        let mut client = connect(harness.addr).await;

        let response = client.export(trace_request(5)).await.unwrap();
        assert!(response.into_inner().partial_success.is_none());

        let received = harness.rx.recv().await.unwrap();
        assert_eq!(received.span_count(), 5);
        assert_eq!(harness.obsreport.stats().accepted_spans, 5);

        harness.shutdown_tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(5), harness.handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_export_not_enqueued() {
        let mut harness = start_server(pipeline(8, true, 0), 4 * 1024 * 1024).await;
        let mut client = connect(harness.addr).await;

        client.export(trace_request(0)).await.unwrap();

        assert!(harness.rx.try_recv().is_err());
        assert_eq!(harness.obsreport.stats().accepted_spans, 0);
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn test_oversized_batch_rejected_with_invalid_argument() {
        let harness = start_server(pipeline(8, true, 2), 4 * 1024 * 1024).await;
        let mut client = connect(harness.addr).await;

        let status = client.export(trace_request(3)).await.unwrap_err();
        assert_eq!(status.code(), Code::InvalidArgument);
        assert_eq!(harness.obsreport.stats().refused_spans, 3);
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn test_stopped_pipeline_returns_internal() {
        let harness = start_server(pipeline(8, true, 0), 4 * 1024 * 1024).await;
        drop(harness.rx);
        let mut client = connect(harness.addr).await;

        let status = client.export(trace_request(1)).await.unwrap_err();
        assert_eq!(status.code(), Code::Internal);
        assert_eq!(status.message(), "trace pipeline is not running");
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn test_full_queue_returns_unavailable() {
        let harness = start_server(pipeline(1, false, 0), 4 * 1024 * 1024).await;
        let mut client = connect(harness.addr).await;

        client.export(trace_request(1)).await.unwrap();
        let status = client.export(trace_request(1)).await.unwrap_err();
        assert_eq!(status.code(), Code::Unavailable);
        assert_eq!(status.message(), "trace queue is full");
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn test_message_over_size_limit_rejected() {
        let harness = start_server(pipeline(8, true, 0), 64).await;
        let mut client = connect(harness.addr).await;

        let status = client.export(trace_request(50)).await.unwrap_err();
        assert_eq!(status.code(), Code::OutOfRange);
        assert_eq!(harness.obsreport.stats().accepted_spans, 0);
        let _ = harness.shutdown_tx.send(true);
    }

    #[tokio::test]
    async fn test_bind_rejects_invalid_host() {
        let (consumer, _rx) = QueueConsumer::new(&pipeline(1, true, 0));
        let receiver = TraceReceiver::new(
            Arc::new(consumer),
            Arc::new(ReceiverObsReport::new("otlp", "grpc")),
        );
        let config = GrpcConfig {
            port: 0,
            max_message_bytes: 1024,
        };
        let err = OtlpGrpcServer::bind(&config, "not-an-ip", receiver)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Invalid host address"));
    }
}
