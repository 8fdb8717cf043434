//! Binary entry point for `autoreply-bot`.
//!
//! This module provides the command-line interface for autoreply-bot with options
//! for configuration file paths and logging verbosity. It initializes the
//! necessary components and starts the service.

use autoreply_bot::base::{
    config::Config,
    types::{Shutdown, Void},
};
use clap::Parser;
use opentelemetry::trace::TracerProvider;
use opentelemetry_otlp::{Protocol, WithExportConfig};
use tracing::warn;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt};

/// Exit status that asks the process supervisor to start the bot again.
const RESTART_EXIT_CODE: i32 = 75;

/// Autoreply-bot: randomized, non-repeating replies to trigger phrases.
///
/// Configuration can come from `config.toml` or environment variables.
/// The trigger table and access configuration are separate files that can be
/// reloaded at runtime with the `reload` command.
#[derive(Parser, Debug)]
#[command(version, author, about, long_about = None)]
struct Args {
    /// Override the config file path (optional).
    ///
    /// By default, the bot will look for a config file at `.hidden/config.toml`
    /// in the current directory.
    #[arg(short, long)]
    config: Option<std::path::PathBuf>,
    /// Increase log verbosity (-v, -vv, etc.).
    ///
    /// Use multiple times to increase verbosity:
    /// - No flag: INFO level
    /// - -v: DEBUG level
    /// - -vv or more: TRACE level
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
    /// Export spans over OTLP (HTTP) in addition to stdout logging.
    #[arg(long)]
    otlp: bool,
}

/// Main entry point for the autoreply-bot binary.
///
/// Sets up logging based on verbosity, loads configuration, and starts the bot.
#[tokio::main]
async fn main() -> Void {
    let args = Args::parse();

    // Construct the level filter.

    let level = match args.verbose {
        0 => tracing::Level::INFO,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    let level_filter = tracing_subscriber::filter::LevelFilter::from_level(level);

    // Prepare the log layer.

    let stdout = tracing_subscriber::fmt::layer()
        .with_ansi(true)
        .with_level(true)
        .with_file(false)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_span_events(FmtSpan::CLOSE);

    // Prepare the otlp layer.

    let otel = if args.otlp {
        let exporter = opentelemetry_otlp::SpanExporter::builder().with_http().with_protocol(Protocol::HttpBinary).build()?;
        let tracer = opentelemetry_sdk::trace::SdkTracerProvider::builder().with_simple_exporter(exporter).build().tracer("autoreply-bot");
        Some(tracing_opentelemetry::layer().with_tracer(tracer))
    } else {
        None
    };

    tracing_subscriber::registry().with(otel).with(level_filter).with(stdout).init();

    let config = Config::load(args.config.as_deref())?;

    match autoreply_bot::start(config).await? {
        Shutdown::Stopped => Ok(()),
        Shutdown::Restart => {
            warn!("Exiting with status {} so the supervisor restarts the bot.", RESTART_EXIT_CODE);
            std::process::exit(RESTART_EXIT_CODE);
        }
    }
}
