//! deadline-run
//!
//! Performs a single HTTP request under a wall-clock deadline.
//!
//! # Exit codes
//! - `0`: the request completed
//! - `1`: the request failed (transport error, or error status with
//!   `http.error_for_status`)
//! - `124`: the deadline elapsed first

use clap::Parser;
use reqwest::Method;
use serde_json::json;
use std::error::Error;
use std::io::Write;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use deadline_exec::config::{load_config, validate_config, ConfigError, DeadlineConfig};
use deadline_exec::http::{HttpPipeline, PipelineResult};
use deadline_exec::observability::{logging, metrics};

const EXIT_COMPLETED: u8 = 0;
const EXIT_FAILED: u8 = 1;
const EXIT_TIMED_OUT: u8 = 124;

#[derive(Parser)]
#[command(name = "deadline-run")]
#[command(about = "Run one HTTP request under a wall-clock deadline", long_about = None)]
struct Cli {
    /// Target URL.
    url: String,

    /// TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Deadline in milliseconds (overrides the config file).
    #[arg(short, long)]
    timeout_ms: Option<u64>,

    /// HTTP method.
    #[arg(short = 'X', long, default_value = "GET")]
    method: String,

    /// Request body.
    #[arg(short, long)]
    data: Option<String>,

    /// Print a JSON summary instead of the response body.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => DeadlineConfig::default(),
    };
    if let Some(timeout_ms) = cli.timeout_ms {
        config.executor.timeout_ms = timeout_ms;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let pipeline = HttpPipeline::from_config(&config)?;
    let method = Method::from_bytes(cli.method.to_uppercase().as_bytes())?;
    let mut builder = pipeline.request(method, &cli.url);
    if let Some(data) = cli.data {
        builder = builder.body(data);
    }
    let request = builder.build()?;

    tracing::info!(
        host = request.url().host_str().unwrap_or_default(),
        method = %request.method(),
        timeout_ms = config.executor.timeout_ms,
        "Configuration loaded"
    );

    let started = Instant::now();
    let result = pipeline.send(request).await;
    let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
    let code = exit_code(&result);

    match result {
        Ok(response) => {
            if cli.json {
                let summary = json!({
                    "outcome": "completed",
                    "status": response.status.as_u16(),
                    "bytes": response.body.len(),
                    "elapsed_ms": elapsed_ms,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                std::io::stdout().write_all(&response.body)?;
            }
        }
        Err(err) => {
            if cli.json {
                let summary = json!({
                    "outcome": err.kind().as_str(),
                    "error": err.to_string(),
                    "elapsed_ms": elapsed_ms,
                });
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                eprintln!("Error: {}", err);
                let mut source = err.source();
                while let Some(cause) = source {
                    eprintln!("  caused by: {}", cause);
                    source = cause.source();
                }
            }
        }
    }

    Ok(ExitCode::from(code))
}

/// Process exit status for a finished request.
fn exit_code(result: &PipelineResult) -> u8 {
    match result {
        Ok(_) => EXIT_COMPLETED,
        Err(err) if err.is_timeout() => EXIT_TIMED_OUT,
        Err(_) => EXIT_FAILED,
    }
}
