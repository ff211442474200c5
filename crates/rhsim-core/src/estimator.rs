//! Exploitability estimation over a [`Fliptable`].
//!
//! A [`FliptableEstimator`] runs one [`ExploitModel`] over all templates of a
//! fliptable, keeps the exploitable flips, and derives the statistics from
//! them. Use [`FliptableEstimator::clear`] before running another model.

use itertools::Itertools;
use log::{debug, info};
use thiserror::Error;

use crate::exploit::ExploitModel;
use crate::fliptable::Fliptable;
use crate::stats::{
    Stat, StatsRecord, Summary, expl_flip_ratio, exploitable_flips_over_time, mean_distance,
};
use crate::victim::TSPageFlip;

/// Errors that can occur while running an estimator.
#[derive(Debug, Error)]
pub enum EstimatorError {
    /// Results of a previous run are still held.
    #[error("Estimator holds results of a previous run, clear it first")]
    ResultsPending,
}

/// Runs exploit models over one fliptable and computes statistics.
pub struct FliptableEstimator<'a> {
    ftbl: &'a Fliptable,
    results: Option<Vec<TSPageFlip>>,
}

impl<'a> FliptableEstimator<'a> {
    /// Creates an idle estimator for `ftbl`.
    pub fn new(ftbl: &'a Fliptable) -> Self {
        FliptableEstimator {
            ftbl,
            results: None,
        }
    }

    /// Creates an estimator, runs `model` and prints the summary.
    ///
    /// # Errors
    ///
    /// Never fails for a fresh estimator; see [`FliptableEstimator::run_exploit`].
    pub fn main<M: ExploitModel>(ftbl: &'a Fliptable, model: M) -> Result<Self, EstimatorError> {
        let mut est = Self::new(ftbl);
        est.run_exploit(model)?;
        est.print_stats();
        Ok(est)
    }

    /// Runs `model` over all templates and stores the exploitable flips.
    ///
    /// # Errors
    ///
    /// Returns [`EstimatorError::ResultsPending`] if a previous run was not
    /// cleared.
    pub fn run_exploit<M: ExploitModel>(
        &mut self,
        model: M,
    ) -> Result<&[TSPageFlip], EstimatorError> {
        if self.results.is_some() {
            return Err(EstimatorError::ResultsPending);
        }
        debug!(
            "Running exploit model over {} templates of DIMM {}",
            self.ftbl.templates().len(),
            self.ftbl.dimm_id()
        );
        let results = model
            .check_templates(self.ftbl.templates(), self.ftbl.mem_layout())
            .collect::<Vec<_>>();
        info!(
            "DIMM {}: {} exploitable flips",
            self.ftbl.dimm_id(),
            results.len()
        );
        Ok(self.results.insert(results).as_slice())
    }

    /// Drops the results of the last run.
    pub fn clear(&mut self) {
        self.results = None;
    }

    /// Returns `true` if a run completed and was not cleared.
    pub fn is_complete(&self) -> bool {
        self.results.is_some()
    }

    /// Returns the exploitable flips of the last run, empty when idle.
    pub fn results(&self) -> &[TSPageFlip] {
        self.results.as_deref().unwrap_or_default()
    }

    /// Returns the fliptable under estimation.
    pub fn fliptable(&self) -> &'a Fliptable {
        self.ftbl
    }

    fn flip_times(&self) -> Vec<i64> {
        exploitable_flips_over_time(self.results(), self.ftbl.t_start())
            .into_iter()
            .map(|(ts, _)| ts)
            .collect()
    }

    /// Computes the human-readable summary.
    pub fn summary(&self) -> Summary {
        let results = self.results();
        let tot_flips = self.ftbl.total_flips();
        let duration = self.ftbl.duration();
        let (first_ttf, mean_ttf) = if results.is_empty() {
            (Stat::NotApplicable, Stat::NotApplicable)
        } else {
            let times = self.flip_times();
            let padded = std::iter::once(0)
                .chain(times.iter().copied())
                .chain(std::iter::once(duration as i64))
                .collect::<Vec<_>>();
            (times.first().copied().into(), mean_distance(&padded))
        };
        Summary {
            duration,
            tot_templates: self.ftbl.templates().len(),
            tot_flips,
            tot_expl_flips: results.len(),
            tot_expl_tmpl: results.iter().unique().count(),
            tot_expl_flip_str: expl_flip_ratio(results.len(), tot_flips),
            first_ttf,
            mean_ttf,
            low_confidence: results.len() == 1,
        }
    }

    /// Prints the human-readable summary to stdout.
    pub fn print_stats(&self) {
        print!("{}", self.summary());
    }

    /// Computes the structured statistics record for export.
    ///
    /// `expl_name` labels the exploit model the results were produced with.
    pub fn get_csv_stats(&self, expl_name: &str) -> StatsRecord {
        let results = self.results();
        let tot_flips = self.ftbl.total_flips();
        let (first_ttf, mean_ttf) = if results.is_empty() {
            (Stat::NotApplicable, Stat::NotApplicable)
        } else {
            let times = self.flip_times();
            let padded = std::iter::once(0)
                .chain(times.iter().copied())
                .collect::<Vec<_>>();
            (times.first().copied().into(), mean_distance(&padded))
        };
        StatsRecord {
            expl_name: expl_name.to_string(),
            dimm_id: self.ftbl.dimm_id().clone(),
            duration: self.ftbl.duration(),
            pattern: self.ftbl.pattern().clone(),
            mapping: self.ftbl.mapping().clone(),
            tot_templates: self.ftbl.templates().len(),
            tot_flips,
            tot_expl_flips: results.len(),
            tot_expl_flip_str: expl_flip_ratio(results.len(), tot_flips),
            first_ttf,
            mean_ttf,
            latex_export: StatsRecord::latex_cell(results.len(), mean_ttf),
            low_confidence: results.len() == 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exploit::ExploitFn;
    use crate::fliptable::DimmId;
    use crate::flip::{RawFlipRecord, Template};
    use crate::memory::{DRAMAddr, RowPages};
    use crate::victim::VictimPage;
    use serde_json::json;
    use std::sync::Arc;

    fn template(ts: u64, data: u64, bitmask: u64) -> Template {
        Template::from_record(&RawFlipRecord {
            dram_addr: DRAMAddr::new(0, 3, 0x10),
            observed_at: ts,
            data,
            bitmask,
            page_offset: 0x10,
            addr: "0x3010".into(),
        })
        .unwrap()
    }

    fn fliptable(templates: Vec<Template>, start: u64, end: u64) -> Fliptable {
        Fliptable::new(
            DimmId::Number(7),
            templates,
            Arc::new(RowPages),
            start,
            end,
            json!("pattern-1"),
            json!("mapping-1"),
        )
        .unwrap()
    }

    fn pullups(vpage: &VictimPage) -> bool {
        !vpage.pullups.is_empty()
    }

    #[test]
    fn test_single_exploitable_flip() {
        // one pull-up (bit 0) and one pull-down (bit 1)
        let ftbl = fliptable(vec![template(10, 0b10, 0b11)], 0, 100);
        let mut est = FliptableEstimator::new(&ftbl);
        est.run_exploit(ExploitFn(pullups)).unwrap();

        let summary = est.summary();
        assert_eq!(summary.first_ttf, Stat::Value(10));
        assert_eq!(summary.mean_ttf, Stat::Value(50.0));
        assert!(summary.low_confidence);
        assert!(summary.to_string().contains("00:00:50*"));

        let record = est.get_csv_stats("pullup");
        assert_eq!(record.first_ttf, Stat::Value(10));
        assert_eq!(record.mean_ttf, Stat::Value(10.0));
        assert_eq!(record.tot_flips, 2);
        assert_eq!(record.tot_expl_flips, 1);
        assert_eq!(record.tot_expl_flip_str, Stat::Value("1/2 (0.500)".into()));
        assert!(record.low_confidence);
        assert!(record.latex_export.ends_with('*'));
    }

    #[test]
    fn test_no_exploitable_flips() {
        let ftbl = fliptable(vec![template(10, 0xff, 0x0f)], 0, 100);
        let mut est = FliptableEstimator::new(&ftbl);
        est.run_exploit(ExploitFn(pullups)).unwrap();
        assert!(est.results().is_empty());

        let record = est.get_csv_stats("pullup");
        assert_eq!(record.expl_name, "pullup");
        assert_eq!(record.dimm_id, DimmId::Number(7));
        assert_eq!(record.duration, 100);
        assert_eq!(record.pattern, json!("pattern-1"));
        assert_eq!(record.mapping, json!("mapping-1"));
        assert_eq!(record.tot_flips, 4);
        assert_eq!(record.tot_expl_flips, 0);
        assert_eq!(record.tot_expl_flip_str, Stat::NotApplicable);
        assert_eq!(record.first_ttf, Stat::NotApplicable);
        assert_eq!(record.mean_ttf, Stat::NotApplicable);
        assert_eq!(record.latex_export, "   -- &         -- ");
        assert!(!record.low_confidence);

        let summary = est.summary();
        assert_eq!(summary.mean_ttf, Stat::NotApplicable);
        assert_eq!(summary.to_string(), "No vulnerable template in: 00:01:40\n");
    }

    #[test]
    fn test_empty_fliptable() {
        let ftbl = fliptable(vec![], 50, 50);
        let mut est = FliptableEstimator::new(&ftbl);
        est.run_exploit(ExploitFn(|_: &VictimPage| true)).unwrap();
        let record = est.get_csv_stats("any");
        assert_eq!(record.tot_templates, 0);
        assert_eq!(record.tot_flips, 0);
        assert_eq!(record.tot_expl_flip_str, Stat::NotApplicable);
    }

    #[test]
    fn test_flip_curve_statistics() {
        let templates = vec![
            template(130, 0, 0b11),
            template(110, 0, 0b1),
            template(160, 0xff, 0b1),
            template(130, 0, 0b100),
        ];
        let ftbl = fliptable(templates, 100, 200);
        let mut est = FliptableEstimator::new(&ftbl);
        est.run_exploit(ExploitFn(pullups)).unwrap();
        assert_eq!(est.results().len(), 4);

        let summary = est.summary();
        // padded: 0, 10, 30, 100
        assert_eq!(summary.first_ttf, Stat::Value(10));
        assert_eq!(summary.mean_ttf, Stat::Value(100.0 / 3.0));
        assert_eq!(summary.tot_expl_tmpl, 4);
        assert!(!summary.low_confidence);

        let record = est.get_csv_stats("pullup");
        // padded: 0, 10, 30
        assert_eq!(record.mean_ttf, Stat::Value(15.0));
        assert_eq!(record.tot_expl_flip_str, Stat::Value("4/5 (0.800)".into()));
        assert_eq!(record.latex_export, "    4 &         15\\,s ");
    }

    #[test]
    fn test_duplicate_results_are_counted_once_as_distinct() {
        let templates = vec![template(5, 0, 0b1), template(5, 0, 0b1)];
        let ftbl = fliptable(templates, 0, 10);
        let mut est = FliptableEstimator::new(&ftbl);
        est.run_exploit(ExploitFn(pullups)).unwrap();
        let summary = est.summary();
        assert_eq!(summary.tot_expl_flips, 2);
        assert_eq!(summary.tot_expl_tmpl, 1);
    }

    #[test]
    fn test_rerun_requires_clear() {
        let ftbl = fliptable(vec![template(3, 0, 0xff), template(4, 0xff, 0xff)], 0, 10);
        let mut est = FliptableEstimator::new(&ftbl);
        assert!(!est.is_complete());
        let first = est.run_exploit(ExploitFn(pullups)).unwrap().to_vec();
        assert!(matches!(
            est.run_exploit(ExploitFn(pullups)),
            Err(EstimatorError::ResultsPending)
        ));
        est.clear();
        assert!(est.results().is_empty());
        let second = est.run_exploit(ExploitFn(pullups)).unwrap().to_vec();
        assert_eq!(first, second);
        assert_eq!(first.len(), 8);
    }
}
