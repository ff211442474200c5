//! LaTeX rendering of exported statistics.

use std::collections::HashMap;

use anyhow::{Context, Result};
use rhsim_core::util::GroupBy;

/// Formats seconds compactly as hours/minutes/seconds, right-aligned.
///
/// Seconds are only shown for durations below one hour; above, minutes are
/// rounded up when more than 30 seconds remain.
pub fn short_time(secs: u64) -> String {
    let (m, s) = (secs / 60, secs % 60);
    let (h, mut m) = (m / 60, m % 60);
    let mut out = String::new();
    if h > 0 {
        out += &format!(" {:>3}h", h);
        if m > 0 && s > 30 {
            m += 1;
        }
    }
    if m > 0 {
        out += &format!(" {:>2}m", m);
    }
    if s > 0 && h == 0 {
        out += &format!(" {:>2}s", s);
    }
    format!("{:>13}", out)
}

fn column<'a>(row: &'a HashMap<String, String>, name: &str) -> Result<&'a str> {
    row.get(name)
        .map(String::as_str)
        .with_context(|| format!("missing column `{}`", name))
}

/// Renders one table row per DIMM from exported statistics rows.
///
/// Each row lists, per exploit model in name order, the number of exploitable
/// flips and the mean time between them. Inapplicable entries render as
/// `--`, means over a single flip are marked with `*`. Rows are sorted.
pub fn table_rows(rows: Vec<HashMap<String, String>>) -> Result<Vec<String>> {
    let mut lines = vec![];
    for (dimm, dimm_rows) in rows.group_by(|row| row.get("dimm_id").cloned()) {
        let dimm = dimm.context("missing column `dimm_id`")?;
        let mut line = format!("{:>17} &", dimm);
        let mut by_expl = dimm_rows
            .group_by(|row| row.get("expl_name").cloned().unwrap_or_default())
            .into_iter()
            .collect::<Vec<_>>();
        by_expl.sort_by(|a, b| a.0.cmp(&b.0));
        for (_, expl_rows) in by_expl {
            let row = &expl_rows[0];
            let mean = column(row, "mean_ttf")?.parse::<f64>().ok();
            let (flips, mean) = match mean {
                Some(mean) => {
                    let flips = column(row, "tot_expl_flips")?
                        .parse::<u64>()
                        .context("invalid tot_expl_flips")?;
                    let marker = if flips == 1 { "*" } else { " " };
                    (flips.to_string(), short_time(mean as u64) + marker)
                }
                None => ("--".to_string(), "--".to_string()),
            };
            line += &format!("{:>10} & {:>14} &  ", flips, mean);
        }
        let line = line.strip_suffix("&  ").unwrap_or(&line).to_string() + "\\\\";
        lines.push(line);
    }
    lines.sort();
    Ok(lines)
}
