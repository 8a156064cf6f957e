//! Core application

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::otlp_receiver::ReceiverObsReport;
use crate::api::{OtlpGrpcServer, TraceReceiver};
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG, RECEIVER_OTLP, TRANSPORT_GRPC};
use crate::core::shutdown::ShutdownService;
use crate::domain::TracesConsumer;
use crate::domain::traces::{DebugConsumer, PipelineStats, QueueConsumer, TracePipeline};

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub obsreport: Arc<ReceiverObsReport>,
    pub pipeline_stats: Arc<PipelineStats>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        tracing::trace!(command = ?command, "Parsed command");

        match command {
            Some(Commands::Validate) => Self::validate_config(&cli_config),
            Some(Commands::Start) | None => {
                let app = Self::init(&cli_config)?;
                app.start_server().await
            }
        }
    }

    fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;
        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            obsreport: Arc::new(ReceiverObsReport::new(RECEIVER_OTLP, TRANSPORT_GRPC)),
            pipeline_stats: Arc::new(PipelineStats::default()),
        })
    }

    fn validate_config(cli: &CliConfig) -> Result<()> {
        let config = AppConfig::load(cli)?;
        let rendered =
            serde_json::to_string_pretty(&config).context("Failed to render configuration")?;
        println!("{}", rendered);
        println!("\nConfiguration is valid.");
        Ok(())
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    /// Build the consumer chain handed to the receiver
    fn build_consumer(&self, queue: QueueConsumer) -> Arc<dyn TracesConsumer> {
        if self.config.debug {
            Arc::new(DebugConsumer::new(queue, self.config.debug_dir.clone()))
        } else {
            Arc::new(queue)
        }
    }

    async fn start_server(self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        self.shutdown.install_signal_handlers();

        let (queue, rx) = QueueConsumer::new(&self.config.pipeline);
        let pipeline = TracePipeline::with_stats(Arc::clone(&self.pipeline_stats));
        self.shutdown
            .register(pipeline.start(rx, self.shutdown.subscribe()))
            .await;

        let receiver = TraceReceiver::new(self.build_consumer(queue), self.obsreport.clone());
        let grpc_server =
            OtlpGrpcServer::bind(&self.config.grpc, &self.config.server.host, receiver)
                .await
                .context("Failed to start OTLP gRPC receiver")?;
        let addr = grpc_server.local_addr()?;

        let shutdown_rx = self.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = grpc_server.start(shutdown_rx).await {
                tracing::error!(error = %e, "OTLP gRPC server error");
            }
        });
        self.shutdown.register(handle).await;

        tracing::info!(
            %addr,
            queue_size = self.config.pipeline.queue_size,
            block_when_full = self.config.pipeline.block_when_full,
            debug = self.config.debug,
            "{} ready",
            APP_NAME
        );

        self.shutdown.wait().await;
        self.shutdown.shutdown().await;

        let received = self.obsreport.stats();
        let processed = self.pipeline_stats.snapshot();
        tracing::info!(
            accepted_spans = received.accepted_spans,
            refused_spans = received.refused_spans,
            batches = processed.batches,
            spans = processed.spans,
            bytes = processed.bytes,
            "{} stopped",
            APP_NAME
        );

        Ok(())
    }
}
