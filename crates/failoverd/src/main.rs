// # failoverd - DNS Failover Function
//
// This binary is a THIN integration layer:
// - DO NOT add failover logic, DNS logic, or retry logic here
// - All failover logic lives in failover-core
// - Configuration is via environment variables ONLY
//
// The failoverd binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Building the Route 53 provider and the failover engine
// 4. Feeding notifications to the engine, one invocation at a time
//
// ## Modes
//
// - **Function mode** (default): serves invocations from the function runtime
//   until the runtime shuts the process down
// - **One-shot mode**: when `FAILOVER_EVENT_FILE` is set, handles the single
//   notification stored in that file, prints the outcome as JSON and exits
//
// ## Configuration
//
// ### Failover pair
// - `HOSTED_ZONE_ID`: Hosted zone containing both variants
// - `RECORD_SET_NAME`: Record name (a trailing dot is appended if missing)
// - `PRIMARY_IDENTIFIER`: Set identifier of the primary variant
// - `SECONDARY_IDENTIFIER`: Set identifier of the secondary variant
// - `RECORD_TYPE`: Record type, `A` (default), `AAAA` or `CNAME`
//
// ### Process
// - `LOG_LEVEL`: trace, debug, info (default), warn, error
// - `DRY_RUN`: `true`, `1` or `yes` to log change batches instead of submitting them
// - `FAILOVER_EVENT_FILE`: Path to a notification for one-shot mode
//
// AWS credentials and region come from the default AWS provider chain.
//
// ## Example
//
// ```bash
// export HOSTED_ZONE_ID=Z1234567890ABC
// export RECORD_SET_NAME=app.example.com.
// export PRIMARY_IDENTIFIER=primary
// export SECONDARY_IDENTIFIER=secondary
// export DRY_RUN=true
// export FAILOVER_EVENT_FILE=./alarm.json
//
// failoverd
// ```

use anyhow::{Context, Result};
use failover_core::{ChangeOutcome, FailoverConfig, FailoverEngine, OutcomeAction};
use failover_provider_route53::Route53Provider;
use lambda_runtime::{LambdaEvent, service_fn};
use serde_json::Value;
use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{Level, error, info, warn};
use tracing_subscriber::FmtSubscriber;

const ENV_LOG_LEVEL: &str = "LOG_LEVEL";
const ENV_DRY_RUN: &str = "DRY_RUN";
const ENV_EVENT_FILE: &str = "FAILOVER_EVENT_FILE";

/// Exit codes for different termination scenarios
///
/// - 0: Clean exit
/// - 1: Configuration or startup error
/// - 2: Runtime error (including a failed one-shot invocation)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailoverExitCode {
    /// Clean exit (normal termination)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error
    RuntimeError = 2,
}

impl From<FailoverExitCode> for ExitCode {
    fn from(code: FailoverExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Process configuration
#[derive(Debug)]
struct Config {
    failover: FailoverConfig,
    log_level: String,
    dry_run: bool,
    event_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let failover = FailoverConfig::from_lookup(&lookup)
            .context("failed to load failover pair configuration")?;

        Ok(Self {
            failover,
            log_level: lookup(ENV_LOG_LEVEL)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| "info".to_string()),
            dry_run: lookup(ENV_DRY_RUN).is_some_and(|s| parse_flag(&s)),
            event_file: lookup(ENV_EVENT_FILE)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        self.failover.validate()?;
        parse_log_level(&self.log_level)?;
        Ok(())
    }
}

/// Interpret a boolean environment flag
fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}

fn parse_log_level(value: &str) -> Result<Level> {
    match value.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "{} '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            ENV_LOG_LEVEL,
            value
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return FailoverExitCode::ConfigError.into();
        }
    };

    // Validate configuration
    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return FailoverExitCode::ConfigError.into();
    }

    // Initialize tracing
    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .without_time()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return FailoverExitCode::ConfigError.into();
    }

    info!("Starting failoverd");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return FailoverExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run(config)).into()
}

/// Build the engine and run in the configured mode
async fn run(config: Config) -> FailoverExitCode {
    let provider = Route53Provider::from_env(config.dry_run).await;

    let engine = match FailoverEngine::new(Arc::new(provider), config.failover) {
        Ok(engine) => Arc::new(engine),
        Err(e) => {
            error!("Failed to create failover engine: {}", e);
            return FailoverExitCode::ConfigError;
        }
    };

    let result = match config.event_file {
        Some(path) => run_once(&engine, &path).await.map(|outcome| {
            match serde_json::to_string_pretty(&outcome) {
                Ok(json) => println!("{}", json),
                Err(e) => warn!("Failed to render outcome: {}", e),
            }
        }),
        None => serve(engine).await,
    };

    match result {
        Ok(()) => FailoverExitCode::CleanShutdown,
        Err(e) => {
            error!("failoverd error: {:#}", e);
            FailoverExitCode::RuntimeError
        }
    }
}

/// Handle the notification stored in `path`
async fn run_once(engine: &FailoverEngine, path: &Path) -> Result<ChangeOutcome> {
    info!("One-shot mode: reading notification from {}", path.display());

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;

    match engine.handle_str(&raw).await {
        Ok(outcome) => {
            log_outcome(&outcome);
            Ok(outcome)
        }
        Err(e) => {
            log_outcome(&e.outcome);
            Err(e.into())
        }
    }
}

/// Serve invocations from the function runtime
async fn serve(engine: Arc<FailoverEngine>) -> Result<()> {
    info!("Function mode: waiting for invocations");

    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let engine = engine.clone();
        async move { handle_invocation(&engine, event.payload).await }
    }))
    .await
    .map_err(|e| anyhow::anyhow!("function runtime stopped: {}", e))
}

/// One function invocation
///
/// A failed outcome is returned as an invocation error so the trigger's
/// redelivery policy applies.
async fn handle_invocation(
    engine: &FailoverEngine,
    payload: Value,
) -> std::result::Result<Value, lambda_runtime::Error> {
    match engine.handle(payload).await {
        Ok(outcome) => {
            log_outcome(&outcome);
            Ok(serde_json::to_value(&outcome)?)
        }
        Err(e) => {
            log_outcome(&e.outcome);
            Err(e.into())
        }
    }
}

/// Log the outcome record as one JSON line
fn log_outcome(outcome: &ChangeOutcome) {
    let rendered = match serde_json::to_string(outcome) {
        Ok(json) => json,
        Err(e) => format!("{:?} (not serializable: {})", outcome, e),
    };

    if outcome.action == OutcomeAction::Failed {
        error!("Invocation outcome: {}", rendered);
    } else {
        info!("Invocation outcome: {}", rendered);
    }
}
