mod api;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::net::TcpListener;
use tracing::info;

use roomscribe_config::defaults::{DEFAULT_BIND, DEFAULT_LOG_LEVEL, DEFAULT_PORT};
use roomscribe_config::RoomscribeConfig;
use roomscribe_core::{ModelClient, ProcessingMode};
use roomscribe_logging::{init_logger, LogFormat, LogOptions};
use roomscribe_providers::{ClientConfig, MockModel, OpenRouterClient, RetryPolicy, RetryingClient};
use roomscribe_understanding::{BatchCoordinator, CaptionPolicy, ImagePipeline, StageRunner};

use api::AppState;

#[derive(Parser)]
#[command(name = "roomscribe")]
#[command(about = "Marketing captions for real-estate listing photos")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP API server
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
    },
    /// Analyze image URLs once and print the batch result as JSON
    Analyze {
        #[arg(required = true)]
        urls: Vec<String>,
        /// sequential or concurrent (defaults to pipeline.defaultMode)
        #[arg(short, long)]
        mode: Option<ProcessingMode>,
        /// Answer from canned replies instead of calling the model endpoint
        #[arg(long)]
        dry_run: bool,
    },
    /// Print the effective configuration with secrets masked
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = roomscribe_config::load_resolved(cli.config.as_deref()).await?;

    init_logger(&log_options(&config));

    match cli.command {
        Commands::Serve { port } => {
            roomscribe_config::check(&config)?;
            run_server(config, port).await?;
        }
        Commands::Analyze { urls, mode, dry_run } => {
            if !dry_run {
                roomscribe_config::check(&config)?;
            }
            let coordinator = build_coordinator(&config, build_client(&config, dry_run)?);
            let mode = mode.unwrap_or_else(|| default_mode(&config));
            let result = coordinator.process_batch(&urls, mode).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Config => {
            let report = roomscribe_config::validate(&config);
            for issue in report.errors.iter().chain(&report.warnings) {
                eprintln!("{issue}");
            }
            let value = serde_json::to_value(&config)?;
            println!("{}", serde_json::to_string_pretty(&roomscribe_config::redact(&value))?);
        }
    }

    Ok(())
}

fn log_options(config: &RoomscribeConfig) -> LogOptions {
    let logging = config.logging();
    LogOptions {
        level: logging.level.unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
        format: if logging.json.unwrap_or(false) {
            LogFormat::Json
        } else {
            LogFormat::Pretty
        },
        log_dir: logging.dir.map(PathBuf::from),
    }
}

fn default_mode(config: &RoomscribeConfig) -> ProcessingMode {
    config.pipeline().default_mode.unwrap_or_default()
}

/// Build the model client from config; `dry_run` swaps in canned replies.
fn build_client(config: &RoomscribeConfig, dry_run: bool) -> Result<Arc<dyn ModelClient>> {
    if dry_run {
        info!("Dry run: using canned model replies");
        return Ok(Arc::new(MockModel::listing()));
    }

    let model = config.model();
    let mut client_config = ClientConfig::new(model.api_key.unwrap_or_default());
    if let Some(provider) = model.provider {
        client_config.name = provider;
    }
    if let Some(url) = model.base_url {
        client_config = client_config.with_base_url(url);
    }
    if let Some(name) = model.model {
        client_config = client_config.with_model(name);
    }
    if let Some(mode) = model.image_mode {
        client_config = client_config.with_image_mode(mode);
    }
    if let Some(secs) = model.timeout_secs {
        client_config.timeout = Duration::from_secs(secs);
    }
    client_config.max_tokens = model.max_tokens;
    client_config.temperature = model.temperature;
    client_config.referer = model.referer;
    client_config.title = model.title;

    let client: Arc<dyn ModelClient> = Arc::new(
        OpenRouterClient::new(client_config).context("Failed to build model client")?,
    );

    let retry = model.retry.unwrap_or_default();
    let defaults = RetryPolicy::default();
    let policy = RetryPolicy {
        max_attempts: retry.max_attempts.unwrap_or(defaults.max_attempts),
        base_delay_ms: retry.base_delay_ms.unwrap_or(defaults.base_delay_ms),
        backoff_factor: retry.backoff_factor.unwrap_or(defaults.backoff_factor),
        max_delay_ms: retry.max_delay_ms.unwrap_or(defaults.max_delay_ms),
        jitter: retry.jitter.unwrap_or(defaults.jitter),
    };
    if policy.max_attempts > 1 {
        info!(max_attempts = policy.max_attempts, "Model call retries enabled");
        return Ok(Arc::new(RetryingClient::new(client, policy)));
    }
    Ok(client)
}

fn build_coordinator(config: &RoomscribeConfig, client: Arc<dyn ModelClient>) -> BatchCoordinator {
    let pipeline = config.pipeline();
    let caption = pipeline.caption.unwrap_or_default();
    let defaults = CaptionPolicy::default();
    let policy = CaptionPolicy {
        min_chars: caption.min_chars.unwrap_or(defaults.min_chars),
        max_chars: caption.max_chars.unwrap_or(defaults.max_chars),
        on_violation: caption.length_policy.unwrap_or(defaults.on_violation),
    };

    let runner = StageRunner::new(client).with_caption_policy(policy);
    let mut coordinator = BatchCoordinator::new(ImagePipeline::new(runner));
    if let Some(n) = pipeline.max_concurrency {
        coordinator = coordinator.with_max_concurrency(n);
    }
    if let Some(n) = pipeline.max_batch_size {
        coordinator = coordinator.with_max_batch_size(n);
    }
    coordinator
}

async fn run_server(config: RoomscribeConfig, port: Option<u16>) -> Result<()> {
    let server = config.server();
    let bind = server.bind.unwrap_or_else(|| DEFAULT_BIND.to_string());
    let port = port.or(server.port).unwrap_or(DEFAULT_PORT);

    let client = build_client(&config, false)?;
    let model_name = config.model().model.unwrap_or_else(|| client.name().to_string());
    info!(
        provider = %client.name(),
        model = %model_name,
        mode = %default_mode(&config),
        "Starting roomscribe"
    );

    let state = Arc::new(AppState {
        coordinator: build_coordinator(&config, client),
        default_mode: default_mode(&config),
        model_name,
    });
    let app = api::build_router(state);
    let addr = format!("{bind}:{port}");

    info!(addr = %addr, "HTTP API listening");

    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    axum::serve(listener, app).await?;

    Ok(())
}
