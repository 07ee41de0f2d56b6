mod app;
mod browser;
mod cli;
mod config;
mod error;
mod network;
mod ping;
mod process;
mod theme;
mod timer;
mod tray;

use std::path::PathBuf;

use anyhow::anyhow;
use clap::{Parser, Subcommand};
use eframe::egui;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::app::UtilifiApp;
use crate::config::{APP_NAME, Config};

#[derive(Parser)]
#[command(name = "utilifi")]
#[command(version, about = "Process manager, browser launcher and network check in one window")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to a TOML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the window (default)
    Gui,

    /// Print processes sorted by CPU usage
    Ps {
        /// Process name or PID
        #[arg(short, long)]
        filter: Option<String>,

        /// Maximum rows to print
        #[arg(short, long, default_value = "25")]
        limit: usize,
    },

    /// Terminate a process, force-killing it if it does not exit
    Kill {
        pid: u32,

        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },

    /// Send one ping and report the round-trip time
    Ping {
        /// Host to ping, defaults to the configured host
        host: Option<String>,
    },

    /// Show the local IP address
    Ip,
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("utilifi={}", level)));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn run_gui(config: Config) -> anyhow::Result<()> {
    let ip_probe = config.ip_probe_addr()?;
    let options = eframe::NativeOptions {
        initial_window_size: Some(egui::vec2(config.window_width, config.window_height)),
        min_window_size: Some(egui::vec2(800.0, 500.0)),
        decorated: false,
        ..Default::default()
    };
    info!("starting {}", APP_NAME);
    eframe::run_native(
        APP_NAME,
        options,
        Box::new(move |cc| Box::new(UtilifiApp::new(cc, config, ip_probe))),
    )
    .map_err(|e| anyhow!("failed to open window: {}", e))
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();
    init_logging(&args.log_level);
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        None | Some(Commands::Gui) => run_gui(config)?,
        Some(Commands::Ps { filter, limit }) => cli::print_processes(filter.as_deref(), limit),
        Some(Commands::Kill { pid, yes }) => cli::kill(pid, yes, &config)?,
        Some(Commands::Ping { host }) => {
            let host = host.unwrap_or_else(|| config.default_ping_host.clone());
            let outcome = cli::ping(&host, &config)?;
            if !outcome.is_success() {
                std::process::exit(1);
            }
        }
        Some(Commands::Ip) => cli::print_ip(&config)?,
    }
    Ok(())
}
