mod aggregation;
mod app;
mod chart;
mod collection;
mod config;
mod constants;
mod driver;
mod error;
mod geometry;
mod input;
mod logging;
mod network;
mod signals;
mod surface;
mod terminal_mode;
mod time_series;
mod ui;
mod util;
mod window;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use crate::config::DashboardConfig;
use crate::constants::{DEFAULT_HISTORY_BUCKETS, DEFAULT_OVERSIZE_FACTOR, DEFAULT_SURFACE_LINES};
use crate::network::SamplerDetector;
use crate::signals::InterruptFlag;

/// Live bar chart of a network interface's throughput, drawn in a few lines
/// of the terminal.
#[derive(Parser, Debug)]
#[command(name = "netbars", version, about)]
struct Args {
    /// Network interface to watch, e.g. eth0
    interface: String,

    /// Height of the chart in terminal lines
    #[arg(short, long, default_value_t = DEFAULT_SURFACE_LINES)]
    lines: u16,

    /// Buckets kept per resolution before the oldest are dropped
    #[arg(long, default_value_t = DEFAULT_HISTORY_BUCKETS)]
    history: usize,

    /// How far past --history a resolution may grow before it is cut back
    #[arg(long, default_value_t = DEFAULT_OVERSIZE_FACTOR)]
    oversize_factor: f64,

    /// Log file path (defaults to the user cache directory)
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    // a panic mid-frame must not leave the shell in raw mode
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        terminal_mode::emergency_cleanup();
        default_hook(info);
    }));

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<()> {
    let requested_log = args.log_file.clone().unwrap_or_else(logging::default_log_path);
    let log_file = logging::init_global(&requested_log)?;

    let config = DashboardConfig::new(&args.interface)
        .with_surface_lines(args.lines)
        .with_history(args.history, args.oversize_factor)
        .with_log_file(log_file);
    tracing::info!(?config, "starting");

    let interrupt = InterruptFlag::install()?;

    let detection = SamplerDetector::default()
        .detect(&config.interface)
        .with_context(|| format!("Cannot sample interface {}", config.interface))?;
    tracing::info!(sampler = detection.sampler.name(), "sampler selected");

    ui::run(&config, detection, interrupt)
}
