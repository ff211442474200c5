//! # rhsim binaries
//!
//! Command line front-ends for the rhsim exploitability estimation:
//!
//! - `estimate`: loads experiment files, runs the selected exploit models over
//!   every experiment and writes the statistics as CSV.
//! - `stats_to_tex`: renders such a CSV file as LaTeX table rows.
//!
//! Both binaries log through `env_logger`; use `RUST_LOG` to adjust the level.
pub mod csv;
pub mod exploits;
pub mod tex;

use indicatif::MultiProgress;
use indicatif_log_bridge::LogWrapper;

pub fn init_logging_with_progress() -> anyhow::Result<MultiProgress> {
    let logger =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).build();
    let progress = MultiProgress::new();
    LogWrapper::new(progress.clone(), logger).try_init()?;
    Ok(progress)
}

/// Progress bar style with a fixed-width label.
pub trait NamedProgress {
    /// Creates a bar style labelled with `name`.
    fn named_bar(name: &str) -> Self;
}

impl NamedProgress for indicatif::ProgressStyle {
    fn named_bar(name: &str) -> Self {
        let fmt = format!(
            "{:<31}{{wide_bar:40.cyan/blue}} {{pos:>3}}/{{len:<3}} [{{elapsed_precise}} ({{eta}} remaining)] {{msg}}",
            name
        );
        indicatif::ProgressStyle::default_bar()
            .template(&fmt)
            .unwrap_or(indicatif::ProgressStyle::default_bar())
    }
}
