use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod check_config;
mod demo;
mod report;

pub use report::SessionReport;

/// mzaccess - Indexed spectrum access over external decoders
#[derive(Parser)]
#[command(name = "mzaccess")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk a synthetic in-memory run and report cache and escalation behaviour
    Demo {
        /// Number of spectra in the synthetic run
        #[arg(short = 'n', long, default_value = "60")]
        spectra: usize,

        /// Load accessor settings from a TOML config file
        #[arg(long, value_name = "FILE")]
        config: Option<PathBuf>,

        /// Enable the decoded cache with this capacity
        #[arg(long, value_name = "N")]
        cache: Option<usize>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate an accessor TOML config file
    CheckConfig {
        /// Config file path
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Demo {
            spectra,
            config,
            cache,
            json,
        } => demo::run(spectra, config, cache, json),
        Commands::CheckConfig { file } => check_config::run(file),
    }
}
