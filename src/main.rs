mod cli;
mod config;
mod errors;
mod execution;
mod handlers;
mod printer;
mod process;
mod tui;
mod utils;

use std::fs::{self, OpenOptions};
use std::str::FromStr;

use anyhow::{Context, Result};
use config::Config;
use log::LevelFilter;

enum LogTarget {
    /// The TUI owns the terminal, so logs go to `LOG_FILE`.
    File,
    Stderr,
}

fn init_logging(cfg: &Config, target: LogTarget) -> Result<()> {
    let level = std::env::var("RUST_LOG")
        .ok()
        .and_then(|v| LevelFilter::from_str(&v).ok())
        .or_else(|| LevelFilter::from_str(&cfg.log_level()).ok())
        .unwrap_or(LevelFilter::Info);

    let mut builder = env_logger::Builder::new();
    builder.filter_level(level);
    match target {
        LogTarget::File => {
            let path = cfg.log_file();
            if let Some(dir) = path.parent() {
                fs::create_dir_all(dir)
                    .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            }
            let log_file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .with_context(|| format!("cannot open log file {}", path.display()))?;
            builder.target(env_logger::Target::Pipe(Box::new(log_file)));
        }
        LogTarget::Stderr => {
            builder.target(env_logger::Target::Stderr);
        }
    }
    builder.init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Cli::parse();

    // CLI overrides config
    let mut cfg = Config::load();
    if let Some(python) = &args.python {
        cfg.set("PYTHON_PATH", python.display().to_string());
    }
    if let Some(timeout) = args.timeout {
        cfg.set("RUN_TIMEOUT", timeout.to_string());
    }

    match &args.command {
        Some(cli::Command::Run { file }) => {
            init_logging(&cfg, LogTarget::Stderr)?;
            log::debug!("config file: {}", cfg.config_path.display());
            let succeeded = handlers::run::run(&cfg, file).await?;
            if !succeeded {
                std::process::exit(1);
            }
            Ok(())
        }
        None => {
            init_logging(&cfg, LogTarget::File)?;
            log::debug!("config file: {}", cfg.config_path.display());
            handlers::repl::run(&cfg, args.file.as_deref()).await
        }
    }
}
