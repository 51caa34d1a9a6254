//! Lockstep CLI entry point.

use std::{process, str::FromStr};

use clap::Parser;
use log::{LevelFilter, debug, error, info};

use lockstep_cli::{Args, error_adapter::to_reportables};

fn main() {
    miette::set_panic_hook();

    let args = Args::parse();

    let log_level = LevelFilter::from_str(&args.log_level).unwrap_or_else(|_| {
        eprintln!(
            "Invalid log level: {}. Using 'warn' instead.",
            args.log_level
        );
        LevelFilter::Warn
    });

    env_logger::Builder::from_env(env_logger::Env::default())
        .filter_level(log_level)
        .init();

    info!(log_level:?; "Starting Lockstep");
    debug!(args:?; "Parsed arguments");

    match lockstep_cli::run(&args) {
        Ok(report) => {
            info!(applied = report.applied(), rejected = report.rejected(); "Completed successfully");
        }
        Err(err) => {
            let reporter = miette::GraphicalReportHandler::new();

            for reportable in to_reportables(&err) {
                let mut writer = String::new();
                if reporter.render_report(&mut writer, &reportable).is_err() {
                    writer = err.to_string();
                }
                error!("{writer}");
            }

            process::exit(1);
        }
    }
}
