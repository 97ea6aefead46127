//! # mzaccess
//!
//! Command-line front end for the `mzaccess` library.
//!
//! ## Usage
//!
//! ```bash
//! # Walk a synthetic run and print what the accessor did
//! mzaccess demo --spectra 120 -v
//!
//! # Same, as JSON
//! mzaccess demo --json
//!
//! # Check a configuration file and show the decorator chain it builds
//! mzaccess check-config mzaccess.toml
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
