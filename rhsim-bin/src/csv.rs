//! Minimal CSV export and import of statistics records.
//!
//! Fields containing separators, quotes or line breaks are quoted, quotes
//! inside quoted fields are doubled.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result, bail};
use rhsim_core::{STATS_FIELDS, StatsRecord};

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Writes `records` with a header line.
pub fn write_stats<W: Write>(mut writer: W, records: &[StatsRecord]) -> Result<()> {
    writeln!(writer, "{}", STATS_FIELDS.join(","))?;
    for record in records {
        let line = record
            .fields()
            .iter()
            .map(|(_, value)| escape(value))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(writer, "{}", line)?;
    }
    writer.flush()?;
    Ok(())
}

/// Splits one CSV line into its fields.
pub fn split_line(line: &str) -> Result<Vec<String>> {
    let mut fields = vec![];
    let mut field = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match (c, quoted) {
            ('"', true) if chars.peek() == Some(&'"') => {
                chars.next();
                field.push('"');
            }
            ('"', true) => quoted = false,
            ('"', false) if field.is_empty() => quoted = true,
            (',', false) => fields.push(std::mem::take(&mut field)),
            (c, _) => field.push(c),
        }
    }
    if quoted {
        bail!("unterminated quote in line: {}", line);
    }
    fields.push(field);
    Ok(fields)
}

/// Reads a CSV file into one column-keyed map per row.
pub fn read_rows<P: AsRef<Path>>(path: P) -> Result<Vec<HashMap<String, String>>> {
    let path = path.as_ref();
    let reader = BufReader::new(
        File::open(path).with_context(|| format!("failed to open {}", path.display()))?,
    );
    let mut lines = reader.lines();
    let header = match lines.next() {
        Some(line) => split_line(&line?)?,
        None => bail!("{} is empty", path.display()),
    };
    let mut rows = vec![];
    for (lineno, line) in lines.enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_line(&line)?;
        if fields.len() != header.len() {
            bail!(
                "{}:{}: expected {} fields, got {}",
                path.display(),
                lineno + 2,
                header.len(),
                fields.len()
            );
        }
        rows.push(header.iter().cloned().zip(fields).collect());
    }
    Ok(rows)
}
