//! Requester CLI Application
//!
//! Sends one HTTP request per URL argument through a bounded worker pool and
//! prints `<url> <md5>` for every successful response.

mod ui;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::Parser;
use requester_lib::{
    is_blank, load_env_config, ConfigManager, Dispatcher, DispatcherConfig, EnvConfig, FileConfig,
    Request, RequesterError,
};
use std::io::IsTerminal;
use std::process;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Yellow.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

/// Exit status when at least one request failed.
const EXIT_REQUEST_FAILURES: i32 = 2;

/// CLI arguments for requester
#[derive(Parser, Debug)]
#[command(name = "requester")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Send HTTP requests in parallel and print an MD5 digest of each response")]
#[command(
    long_about = "Send one HTTP request per URL through a fixed pool of workers.\n\nEvery successful (200 OK) response is printed as '<url> <md5 of body>'. URLs without a scheme get http:// prepended."
)]
#[command(styles = STYLES)]
pub struct Args {
    /// URLs to request
    #[arg(value_name = "URLS", required = true, help_heading = "Requests")]
    pub urls: Vec<String>,

    /// HTTP method used for every URL [default: GET]
    #[arg(short = 'X', long = "method", value_name = "METHOD", help_heading = "Requests")]
    pub method: Option<String>,

    /// Request body sent with every URL
    #[arg(short = 'd', long = "data", value_name = "BODY", help_heading = "Requests")]
    pub data: Option<String>,

    /// Number of parallel workers; zero or negative means the default (10)
    #[arg(
        short = 'p',
        long = "parallel",
        value_name = "N",
        allow_negative_numbers = true,
        help_heading = "Performance"
    )]
    pub parallel: Option<i64>,

    /// Print one JSON object per successful response
    #[arg(short = 'j', long = "json", help_heading = "Output Format")]
    pub json: bool,

    /// Print a success/failure summary to stderr when done
    #[arg(long = "summary", help_heading = "Output Format")]
    pub summary: bool,

    /// Use specific config file instead of automatic discovery
    #[arg(long = "config", value_name = "FILE", help_heading = "Configuration")]
    pub config: Option<String>,

    /// Debug-level logging
    #[arg(long = "debug", help_heading = "Configuration")]
    pub debug: bool,

    /// Verbose logging
    #[arg(short = 'v', long = "verbose", help_heading = "Configuration")]
    pub verbose: bool,
}

/// Fully resolved settings for one run.
struct RunSettings {
    dispatcher: DispatcherConfig,
    method: String,
    body: String,
}

/// Outcome counters shared with the dispatcher callbacks.
#[derive(Debug, Default)]
struct RunStats {
    succeeded: AtomicUsize,
    failed: AtomicUsize,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(&args);

    match run(args).await {
        Ok(stats) if stats.failed.load(Ordering::SeqCst) > 0 => {
            process::exit(EXIT_REQUEST_FAILURES);
        }
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

/// Install the log subscriber. `RUST_LOG` overrides the flags.
fn init_tracing(args: &Args) {
    let default_level = if args.debug {
        "debug"
    } else if args.verbose {
        "info"
    } else {
        "warn"
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .with_target(false)
        .try_init();
}

/// Main request logic
async fn run(args: Args) -> Result<Arc<RunStats>, Box<dyn std::error::Error>> {
    let settings = build_settings(&args)?;
    let requests = build_requests(&args.urls, &settings.method, &settings.body)?;

    if requests.is_empty() {
        return Err("at least one url is required".into());
    }

    let stats = Arc::new(RunStats::default());
    let json = args.json;
    let success_stats = Arc::clone(&stats);
    let failure_stats = Arc::clone(&stats);

    let config = settings
        .dispatcher
        .on_success(move |request, body| {
            success_stats.succeeded.fetch_add(1, Ordering::SeqCst);
            ui::print_success(&request, &body, json);
        })
        .on_failure(move |error| {
            failure_stats.failed.fetch_add(1, Ordering::SeqCst);
            ui::print_failure(&error);
        });

    let dispatcher = Dispatcher::new(config)?;
    info!(
        requests = requests.len(),
        workers = dispatcher.worker_count(),
        "dispatching requests"
    );

    let started = Instant::now();
    let completed = tokio::select! {
        result = submit_and_wait(&dispatcher, requests) => {
            result?;
            true
        }
        _ = shutdown_signal() => false,
    };

    if !completed {
        warn!(
            outstanding = dispatcher.outstanding(),
            "shutdown requested, waiting for in-flight requests"
        );
        dispatcher.wait().await;
    }
    dispatcher.close().await;

    if args.summary {
        ui::print_summary(
            stats.succeeded.load(Ordering::SeqCst),
            stats.failed.load(Ordering::SeqCst),
            started.elapsed(),
        );
    }

    Ok(stats)
}

async fn submit_and_wait(
    dispatcher: &Dispatcher,
    requests: Vec<Request>,
) -> Result<(), RequesterError> {
    dispatcher.submit(requests).await?;
    dispatcher.wait().await;
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}

/// Turn URL arguments into validated requests, skipping blank ones.
fn build_requests(urls: &[String], method: &str, body: &str) -> Result<Vec<Request>, RequesterError> {
    urls.iter()
        .filter(|url| !is_blank(url))
        .map(|url| Request::new(url, method, body))
        .collect()
}

/// Resolve settings with precedence: defaults < config file < environment < CLI.
fn build_settings(args: &Args) -> Result<RunSettings, Box<dyn std::error::Error>> {
    let env_config = load_env_config();
    let file_config = load_file_config(args, &env_config)?;

    let dispatcher = file_config.apply_to(DispatcherConfig::default());
    let dispatcher = env_config.apply_to(dispatcher);
    let dispatcher = match args.parallel {
        Some(parallel) => dispatcher.with_worker_count(worker_count_from_arg(parallel)),
        None => dispatcher,
    };

    let method = args
        .method
        .clone()
        .or_else(|| env_config.method.clone())
        .or_else(|| file_config.method().map(str::to_string))
        .unwrap_or_else(|| "GET".to_string());

    let body = args
        .data
        .clone()
        .or_else(|| file_config.body().map(str::to_string))
        .unwrap_or_default();

    Ok(RunSettings {
        dispatcher,
        method,
        body,
    })
}

fn load_file_config(
    args: &Args,
    env_config: &EnvConfig,
) -> Result<FileConfig, Box<dyn std::error::Error>> {
    let manager = ConfigManager::new(args.verbose);

    if let Some(path) = args.config.as_ref().or(env_config.config.as_ref()) {
        info!(path = %path, "using explicit config file");
        let file_config = manager
            .load_file(path)
            .map_err(|e| format!("Failed to load config file '{}': {}", path, e))?;
        return Ok(file_config);
    }

    match manager.discover_and_load() {
        Ok(file_config) => Ok(file_config),
        Err(e) => {
            warn!(error = %e, "config discovery failed, using defaults");
            Ok(FileConfig::default())
        }
    }
}

/// Non-positive counts select the library default.
fn worker_count_from_arg(parallel: i64) -> usize {
    usize::try_from(parallel).unwrap_or(0)
}
