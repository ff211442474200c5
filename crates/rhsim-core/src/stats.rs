//! Exploitability statistics.
//!
//! Derived values that cannot be computed (no exploitable flip, no flip at
//! all) are carried as [`Stat::NotApplicable`] and rendered as `N/A`.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use itertools::Itertools;
use serde::{Serialize, Serializer};
use serde_json::Value;

use crate::fliptable::DimmId;
use crate::util::{NOT_APPLICABLE, format_hms, group_thousands};
use crate::victim::TSPageFlip;

/// A statistic that may not apply to the data at hand.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Stat<T> {
    /// Computed value
    Value(T),
    /// The statistic is undefined for this data
    NotApplicable,
}

impl<T> Stat<T> {
    /// Returns the value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            Stat::Value(v) => Some(v),
            Stat::NotApplicable => None,
        }
    }
}

impl<T> From<Option<T>> for Stat<T> {
    fn from(value: Option<T>) -> Self {
        value.map_or(Stat::NotApplicable, Stat::Value)
    }
}

impl<T: Display> Display for Stat<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Stat::Value(v) => Display::fmt(v, f),
            Stat::NotApplicable => f.pad(NOT_APPLICABLE),
        }
    }
}

impl<T: Serialize> Serialize for Stat<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Stat::Value(v) => v.serialize(serializer),
            Stat::NotApplicable => serializer.serialize_str(NOT_APPLICABLE),
        }
    }
}

/// Returns the cumulative number of exploitable flips over time.
///
/// Each entry is `(ts - t_start, flips observed up to and including ts)`,
/// ascending by time. Flips sharing a timestamp are counted together.
pub fn exploitable_flips_over_time(results: &[TSPageFlip], t_start: u64) -> Vec<(i64, usize)> {
    let mut per_ts = BTreeMap::new();
    for flip in results {
        *per_ts.entry(flip.ts as i64 - t_start as i64).or_insert(0) += 1;
    }
    per_ts
        .into_iter()
        .scan(0, |total, (ts, count)| {
            *total += count;
            Some((ts, *total))
        })
        .collect()
}

/// Returns the mean absolute distance between consecutive values.
///
/// Undefined for fewer than two values.
pub fn mean_distance(values: &[i64]) -> Stat<f64> {
    if values.len() < 2 {
        return Stat::NotApplicable;
    }
    let total: i64 = values
        .iter()
        .tuple_windows()
        .map(|(prev, next)| (next - prev).abs())
        .sum();
    Stat::Value(total as f64 / (values.len() - 1) as f64)
}

/// Formats the exploitable flip ratio as `a/b (r.rrr)`.
///
/// Not applicable without exploitable flips. A ratio over zero flips renders
/// as `N/A` inside the string.
pub fn expl_flip_ratio(tot_expl_flips: usize, tot_flips: usize) -> Stat<String> {
    if tot_expl_flips == 0 {
        return Stat::NotApplicable;
    }
    let ratio: Stat<String> = (tot_flips != 0)
        .then(|| format!("{:.3}", tot_expl_flips as f64 / tot_flips as f64))
        .into();
    Stat::Value(format!("{}/{} ({})", tot_expl_flips, tot_flips, ratio))
}

/// Human-readable summary of one estimator run.
///
/// The mean time between exploitable flips is measured from the experiment
/// start up to the experiment end, i.e. the flip curve is padded with both
/// `0` and the duration.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary {
    /// Experiment duration in seconds
    pub duration: u64,
    /// Number of templates
    pub tot_templates: usize,
    /// Number of flips over all templates
    pub tot_flips: usize,
    /// Number of exploitable flips
    pub tot_expl_flips: usize,
    /// Number of distinct exploitable flips
    pub tot_expl_tmpl: usize,
    /// `a/b (ratio)` of exploitable to total flips
    pub tot_expl_flip_str: Stat<String>,
    /// Seconds from start to the first exploitable flip
    pub first_ttf: Stat<i64>,
    /// Mean seconds between exploitable flips
    pub mean_ttf: Stat<f64>,
    /// The mean is based on a single exploitable flip
    pub low_confidence: bool,
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.tot_expl_flips == 0 {
            return writeln!(
                f,
                "No vulnerable template in: {}",
                format_hms(self.duration as f64)
            );
        }
        let hms = |stat: Stat<f64>| match stat {
            Stat::Value(secs) => format_hms(secs),
            Stat::NotApplicable => NOT_APPLICABLE.to_string(),
        };
        let mut mean_ttf = hms(self.mean_ttf);
        if self.low_confidence {
            mean_ttf.push('*');
        }
        writeln!(f, "{:<40} {:>20}", "Total time:", format_hms(self.duration as f64))?;
        writeln!(f, "{:<40} {:>20}", "Total templates:", self.tot_templates)?;
        writeln!(f, "{:<40} {:>20}", "Total flips:", self.tot_flips)?;
        writeln!(f, "{:<40} {:>20}", "Total exploitable flips:", self.tot_expl_flip_str)?;
        writeln!(f, "{:<40} {:>20}", "Distinct exploitable flips:", self.tot_expl_tmpl)?;
        writeln!(
            f,
            "{:<40} {:>20}",
            "Time to first expl flip:",
            hms(self.first_ttf.value().map(|&t| t as f64).into())
        )?;
        writeln!(f, "{:<40} {:>20}", "Avg time to flip:", mean_ttf)
    }
}

/// Column names of [`StatsRecord`] in export order.
pub const STATS_FIELDS: [&str; 12] = [
    "expl_name",
    "dimm_id",
    "duration",
    "pattern",
    "mapping",
    "tot_templates",
    "tot_flips",
    "tot_expl_flips",
    "tot_expl_flip_str",
    "first_ttf",
    "mean_ttf",
    "latex_export",
];

/// Structured statistics of one (fliptable, exploit model) pair.
///
/// Unlike [`Summary`], the mean time between exploitable flips only spans
/// from the experiment start to the last exploitable flip.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatsRecord {
    /// Name of the exploit model
    pub expl_name: String,
    /// DIMM under test
    pub dimm_id: DimmId,
    /// Experiment duration in seconds
    pub duration: u64,
    /// Hammering pattern descriptor
    pub pattern: Value,
    /// Address-mapping descriptor
    pub mapping: Value,
    /// Number of templates
    pub tot_templates: usize,
    /// Number of flips over all templates
    pub tot_flips: usize,
    /// Number of exploitable flips
    pub tot_expl_flips: usize,
    /// `a/b (ratio)` of exploitable to total flips
    pub tot_expl_flip_str: Stat<String>,
    /// Seconds from start to the first exploitable flip
    pub first_ttf: Stat<i64>,
    /// Mean seconds between exploitable flips
    pub mean_ttf: Stat<f64>,
    /// Pre-formatted `count & time` table cell
    pub latex_export: String,
    /// The mean is based on a single exploitable flip
    #[serde(skip)]
    pub low_confidence: bool,
}

impl StatsRecord {
    /// Formats the `count & time` table cell.
    ///
    /// Without exploitable flips both columns are `--`. A single exploitable
    /// flip is marked with a trailing `*`.
    pub fn latex_cell(tot_expl_flips: usize, mean_ttf: Stat<f64>) -> String {
        match mean_ttf {
            Stat::Value(mean) if tot_expl_flips > 0 => {
                let marker = if tot_expl_flips == 1 { '*' } else { ' ' };
                format!(
                    "{:>5} & {:>10}\\,s{}",
                    tot_expl_flips,
                    group_thousands(mean as i64),
                    marker
                )
            }
            _ => format!("{:>5} & {:>10} ", "--", "--"),
        }
    }

    /// Returns `(column, value)` pairs in [`STATS_FIELDS`] order.
    ///
    /// Strings are rendered without quotes, other JSON descriptors compactly.
    pub fn fields(&self) -> Vec<(&'static str, String)> {
        let json = |value: &Value| match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let values = [
            self.expl_name.clone(),
            self.dimm_id.to_string(),
            self.duration.to_string(),
            json(&self.pattern),
            json(&self.mapping),
            self.tot_templates.to_string(),
            self.tot_flips.to_string(),
            self.tot_expl_flips.to_string(),
            self.tot_expl_flip_str.to_string(),
            self.first_ttf.to_string(),
            self.mean_ttf.to_string(),
            self.latex_export.clone(),
        ];
        STATS_FIELDS.into_iter().zip(values).collect()
    }
}
