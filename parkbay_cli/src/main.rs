mod check;
mod cli;
mod error_fmt;
mod logging;
mod replay;

use std::sync::Arc;

use clap::Parser;
use eyre::WrapErr;
use parkbay_traits::SteppedClock;

use crate::cli::{Cli, Commands, JSON_MODE};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    let _ = color_eyre::install();
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);

    if let Err(e) = run(cli) {
        if JSON_MODE.get().copied().unwrap_or(false) {
            eprintln!("{}", format_error_json(&e));
        } else {
            eprintln!("{}", humanize(&e));
        }
        std::process::exit(exit_code_for_error(&e));
    }
}

fn run(cli: Cli) -> eyre::Result<()> {
    let cfg = parkbay_config::load_file(&cli.config)
        .wrap_err_with(|| format!("load config {:?}", cli.config))?;
    logging::init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;
    tracing::debug!(config = %cli.config.display(), bay = %cfg.bay.id, "config loaded");

    // Replay drives simulated time; `check` never advances it.
    let clock = SteppedClock::new();
    let mut monitor = parkbay_core::build_monitor(&cfg, Arc::new(clock.clone()))?;

    match cli.cmd {
        Commands::Check => {
            if cli.json {
                println!("{}", check::summary_json(&monitor));
            } else {
                print!("{}", check::summary_text(&monitor));
            }
        }
        Commands::Replay {
            readings,
            pace_ms,
            online,
        } => {
            let script = replay::Script::from_path(&readings)
                .wrap_err_with(|| format!("replay script {readings:?}"))?;
            if script.is_empty() {
                tracing::warn!(path = %readings.display(), "replay script has no rows");
            }
            let shutdown = replay::install_ctrlc();
            let opts = replay::ReplayOptions {
                cycle_ms: cfg.system.cycle_ms,
                pace_ms,
                online,
                json: cli.json,
            };
            let reports = replay::run(&mut monitor, &clock, &script, &opts, &shutdown);
            tracing::info!(
                cycles = reports.len(),
                activity = %monitor.activity(),
                lifecycle = %monitor.lifecycle(),
                "replay complete"
            );
        }
    }
    Ok(())
}
