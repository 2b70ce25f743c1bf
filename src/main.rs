//! Scribe - A reactive build pipeline for markdown blogs.

mod cli;
mod compiler;
mod config;
mod data;
mod logger;
mod pipeline;
mod sink;
mod validation;
mod watch;

use anyhow::{Context, Result, bail};
use clap::Parser;
use cli::{Cli, Commands};
use compiler::Transforms;
use config::{Config, load_config};
use logger::log_failures;
use pipeline::Pipeline;
use std::sync::Arc;
use watch::NotifySource;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Arc::new(configure(&cli)?);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start the event loop")?;

    match cli.command {
        Commands::Build { .. } => runtime.block_on(build(config)),
        Commands::Watch { .. } => runtime.block_on(watch(config)),
    }
}

/// Load the configuration file and apply command-line overrides.
fn configure(cli: &Cli) -> Result<Config> {
    let mut config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(failures) => {
            log_failures("config", "invalid configuration", &failures);
            bail!("Could not load {}", cli.config.display());
        }
    };

    if let Some(minify) = cli.build_args().minify {
        config.minify = minify;
    }

    log!("config"; "{}", config.config_path.display());
    Ok(config)
}

/// Compile everything once. Fails if any artifact failed.
async fn build(config: Arc<Config>) -> Result<()> {
    let source = NotifySource::scan_only();
    let pipeline = Pipeline::build(config.clone(), Transforms::standard(&config), &source)?;

    let report = sink::drain(pipeline.output).await;
    log!("build"; "{} written, {} failed", report.written, report.failed);

    if report.failed > 0 {
        bail!("{} of {} outputs failed", report.failed, report.written + report.failed);
    }
    Ok(())
}

/// Compile everything, then keep recompiling until Ctrl+C.
async fn watch(config: Arc<Config>) -> Result<()> {
    let source = NotifySource::live();
    let Pipeline {
        output,
        posts,
        pages,
        layouts,
    } = Pipeline::build(config.clone(), Transforms::standard(&config), &source)?;

    let (stop_tx, mut stop_rx) = tokio::sync::mpsc::unbounded_channel();
    ctrlc::set_handler(move || {
        log!("watch"; "shutting down...");
        let _ = stop_tx.send(());
    })
    .context("Failed to set Ctrl+C handler")?;

    tokio::select! {
        report = sink::drain(output) => {
            log!("watch"; "sources closed, {} written, {} failed", report.written, report.failed);
        }
        _ = stop_rx.recv() => {}
    }

    log!(
        "watch";
        "stopped with {} posts, {} pages and {} layouts",
        posts.borrow().len(),
        pages.borrow().pages.len(),
        layouts.borrow().layouts.len()
    );
    Ok(())
}
