// fridactl/src/main.rs
use std::fs;
use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;
use fridactl_common::config::Config;
use tracing::level_filters::LevelFilter;
use tracing::{debug, error};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

mod cli;

use cli::CliArgs;

const LOG_FILE_NAME: &str = "fridactl.log";

fn main() -> ExitCode {
    let cli_args = CliArgs::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: Could not load config: {:#}", "Error".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    cli_args.apply_overrides(&mut config);

    // Flushes the log file when dropped at the end of main.
    let _guard = init_logging(&config, cli_args.verbose);

    match cli_args.command.run(&config) {
        Ok(true) => {
            debug!("Command completed successfully.");
            ExitCode::SUCCESS
        }
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            error!("Command failed: {:#}", e);
            eprintln!("{}: {:#}", "Error".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(config: &Config, verbose: u8) -> Option<WorkerGuard> {
    let level_filter = match verbose {
        0 => LevelFilter::INFO,
        1 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    let max_log_level = level_filter.into_level().unwrap_or(tracing::Level::INFO);

    let env_filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .with_env_var("FRIDACTL_LOG")
        .from_env_lossy();

    if verbose == 0 {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return None;
    }

    let log_dir = config.logs_dir();
    if let Err(e) = fs::create_dir_all(&log_dir) {
        eprintln!(
            "{} Failed to create log directory {}: {}",
            "Warning:".yellow().bold(),
            log_dir.display(),
            e
        );
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .without_time()
            .try_init();
        return None;
    }

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE_NAME);
    let (non_blocking_appender, guard) = tracing_appender::non_blocking(file_appender);

    // Verbose mode shows debug/trace logs on stderr too.
    let stderr_writer = std::io::stderr.with_max_level(max_log_level);
    let file_writer = non_blocking_appender.with_max_level(max_log_level);

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(stderr_writer.and(file_writer))
        .with_ansi(true)
        .without_time()
        .try_init();

    debug!(
        "Verbose logging enabled. Writing logs to: {}/{}",
        log_dir.display(),
        LOG_FILE_NAME
    );
    Some(guard)
}
