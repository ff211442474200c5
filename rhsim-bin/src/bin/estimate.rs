use std::{
    fs::File,
    io::{BufWriter, stdout},
    path::PathBuf,
};

use anyhow::Result;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use itertools::Itertools;
use log::{info, warn};
use rayon::prelude::*;
use rhsim_bin::{NamedProgress, csv, exploits::ExploitSpec, init_logging_with_progress};
use rhsim_core::{Experiment, Fliptable, FliptableEstimator, memory::LayoutRegistry};

/// CLI arguments for the `estimate` binary.
#[derive(Debug, Parser)]
struct CliArgs {
    /// Experiment files (JSON) to estimate.
    #[clap(required = true)]
    experiments: Vec<PathBuf>,
    /// Exploit models to run: `any`, `pte[:PHYS_BITS]` or `range:START-END`.
    #[clap(long = "exploit", short = 'e', default_value = "any")]
    exploits: Vec<ExploitSpec>,
    /// Output file for the statistics (CSV). Defaults to stdout.
    #[clap(long = "output", short = 'o')]
    output: Option<PathBuf>,
    /// Print a human-readable summary per experiment and model.
    #[clap(long = "summary")]
    summary: bool,
    /// Replace the memory layout when experiments use different configurations.
    #[clap(long = "overwrite-layout")]
    overwrite_layout: bool,
}

fn load_fliptables(args: &CliArgs) -> Vec<Fliptable> {
    let mut registry = LayoutRegistry::new(rhsim_bitdefs::layout_builder());
    let mut fliptables = vec![];
    for path in &args.experiments {
        let ftbl = Experiment::from_jsonfile(path).and_then(|experiment| {
            Fliptable::from_experiment(&experiment, &mut registry, args.overwrite_layout)
        });
        match ftbl {
            Ok(ftbl) => fliptables.push(ftbl),
            Err(e) => warn!("Skipping {}: {}", path.display(), e),
        }
    }
    fliptables
}

fn main() -> Result<()> {
    let progress = init_logging_with_progress()?;

    let args = CliArgs::parse();
    info!("CLI args: {:?}", args);

    let fliptables = load_fliptables(&args);
    info!(
        "Loaded {}/{} experiments",
        fliptables.len(),
        args.experiments.len()
    );

    let jobs = fliptables
        .iter()
        .cartesian_product(args.exploits.iter())
        .collect::<Vec<_>>();
    let bar = progress.add(
        ProgressBar::new(jobs.len() as u64).with_style(ProgressStyle::named_bar("Estimating")),
    );
    let results = jobs
        .par_iter()
        .filter_map(|(ftbl, spec)| {
            let model = spec.build();
            let mut estimator = FliptableEstimator::new(ftbl);
            let run = estimator.run_exploit(&*model).map(|_| ());
            bar.inc(1);
            match run {
                Ok(()) => Some((*spec, estimator)),
                Err(e) => {
                    warn!("Estimation of {} on {} failed: {}", spec, ftbl, e);
                    None
                }
            }
        })
        .collect::<Vec<_>>();
    bar.finish_and_clear();

    if args.summary {
        for (spec, estimator) in &results {
            println!("{} with exploit {}", estimator.fliptable(), spec);
            estimator.print_stats();
            println!();
        }
    }

    let records = results
        .iter()
        .map(|(spec, estimator)| estimator.get_csv_stats(&spec.to_string()))
        .collect::<Vec<_>>();
    match &args.output {
        Some(path) => {
            csv::write_stats(BufWriter::new(File::create(path)?), &records)?;
            info!("Statistics saved to {}", path.display());
        }
        None => csv::write_stats(stdout().lock(), &records)?,
    }
    Ok(())
}
