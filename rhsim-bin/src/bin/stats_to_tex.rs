use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;
use rhsim_bin::{csv, tex};

/// CLI arguments for the `stats_to_tex` binary.
#[derive(Debug, Parser)]
struct CliArgs {
    /// Statistics file (CSV) written by `estimate`.
    stats: PathBuf,
}

fn main() -> Result<()> {
    env_logger::init();

    let args = CliArgs::parse();
    let rows = csv::read_rows(&args.stats)?;
    info!("Read {} rows from {}", rows.len(), args.stats.display());
    for line in tex::table_rows(rows)? {
        println!("{}", line);
    }
    Ok(())
}
