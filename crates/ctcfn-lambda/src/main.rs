use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ctcfn_engine::{CustomResourceHandler, HandlerConfig, InvocationContext, observability};
use ctcfn_lambda::runtime::{self, RuntimeClient};

#[derive(Parser)]
#[command(name = "ctcfn")]
#[command(about = "CloudFormation custom resource for commercetools subscriptions and extensions")]
#[command(version)]
struct Cli {
    /// Handler configuration file (TOML)
    #[arg(long, global = true, env = "CTCFN_CONFIG")]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve invocations from the Lambda Runtime API (default)
    Serve,
    /// Run a single CloudFormation event from a JSON file
    Invoke {
        /// Path to the event JSON
        #[arg(long)]
        event: PathBuf,

        /// Log stream name reported to CloudFormation
        #[arg(long, default_value = "local")]
        log_stream: String,
    },
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => serve(config).await,
        Commands::Invoke { event, log_stream } => invoke(config, &event, log_stream).await,
    }
}

fn build_handler(config_path: Option<&str>) -> Result<CustomResourceHandler> {
    let cfg = HandlerConfig::load(config_path).context("failed to load configuration")?;
    observability::init_tracing_with_level(&cfg.logging.level);

    tracing::info!(
        max_attempts = cfg.retry.max_attempts,
        delay_ms = cfg.retry.delay_ms,
        timeout_ms = cfg.http.timeout_ms,
        "Configuration loaded"
    );

    CustomResourceHandler::new(cfg).context("failed to build handler")
}

async fn serve(config_path: Option<&str>) -> Result<()> {
    let runtime = RuntimeClient::from_env()?;

    let handler = match build_handler(config_path) {
        Ok(handler) => handler,
        Err(e) => {
            runtime.post_init_error(&format!("{e:#}")).await?;
            return Err(e);
        }
    };

    let log_stream = std::env::var("AWS_LAMBDA_LOG_STREAM_NAME").ok();
    runtime::run(&runtime, &handler, log_stream.as_deref()).await
}

async fn invoke(config_path: Option<&str>, event_path: &Path, log_stream: String) -> Result<()> {
    let handler = build_handler(config_path)?;

    let raw = tokio::fs::read_to_string(event_path)
        .await
        .with_context(|| format!("failed to read {}", event_path.display()))?;
    let event: serde_json::Value =
        serde_json::from_str(&raw).with_context(|| format!("{} is not JSON", event_path.display()))?;

    let invocation = InvocationContext {
        request_id: "local".to_string(),
        log_stream_name: Some(log_stream),
    };
    let status = handler.handle(&event, &invocation).await?;

    println!("{}", serde_json::json!({ "Status": status }));
    Ok(())
}
