//! Experiment results.
//!
//! A [`Fliptable`] is the complete, immutable result of one hammering
//! experiment against one DIMM: the decomposed templates in observation order,
//! the timing bounds, and the memory layout the flips are resolved with.

use std::fmt::{self, Display, Formatter};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::flip::{FlipError, Template};
use crate::memory::{LayoutError, LayoutRegistry, MemLayout};

/// Errors that can occur while assembling a [`Fliptable`].
#[derive(Debug, Error)]
pub enum FliptableError {
    /// A flip record could not be decomposed.
    #[error("Malformed flip record #{index}: {source}")]
    MalformedRecord {
        /// Position of the record in `flips.details`
        index: usize,
        /// Decomposition failure
        source: FlipError,
    },
    /// The experiment ends before it starts.
    #[error("Invalid time range: end {end} < start {start}")]
    InvalidTimeRange {
        /// Start time in seconds
        start: u64,
        /// End time in seconds
        end: u64,
    },
    /// The memory layout could not be initialized.
    #[error(transparent)]
    LayoutError(#[from] LayoutError),
    /// Reading an experiment file failed.
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    /// An experiment file could not be parsed.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Identifier of the DIMM under test, numeric or free-form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DimmId {
    /// Numeric database identifier
    Number(u64),
    /// Free-form name
    Name(String),
}

impl Display for DimmId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DimmId::Number(id) => write!(f, "{}", id),
            DimmId::Name(name) => f.write_str(name),
        }
    }
}

/// The `flips` section of a sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FlipDetails {
    /// Raw flip records, decoded one by one
    pub details: Vec<Value>,
}

/// Raw results of one sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepData {
    /// Captured flip records
    pub flips: FlipDetails,
    /// Hammering pattern descriptor
    pub pattern: Value,
    /// Address-mapping descriptor
    pub mapping: Value,
}

/// Metadata accompanying a sweep.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SweepMetadata {
    /// Memory configuration handed to the layout resolver
    pub memory_config: Value,
    /// DIMM under test
    pub dimm_id: DimmId,
    /// Start time in seconds
    pub start: u64,
    /// End time in seconds
    pub end: u64,
}

/// A sweep and its metadata, as stored in one experiment file.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Experiment {
    /// Raw sweep results
    pub data: SweepData,
    /// Sweep metadata
    pub metadata: SweepMetadata,
}

impl Experiment {
    /// Loads an experiment from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be read or parsed.
    pub fn from_jsonfile<P: AsRef<Path>>(path: P) -> Result<Experiment, FliptableError> {
        let reader = BufReader::new(File::open(path)?);
        Ok(serde_json::from_reader(reader)?)
    }
}

/// The complete result of one hammering experiment.
#[derive(Debug, Clone)]
pub struct Fliptable {
    dimm_id: DimmId,
    templates: Vec<Template>,
    mem_layout: Arc<dyn MemLayout>,
    t_start: u64,
    t_end: u64,
    pattern: Value,
    mapping: Value,
}

impl Fliptable {
    /// Creates a fliptable from already decomposed templates.
    ///
    /// # Errors
    ///
    /// Returns [`FliptableError::InvalidTimeRange`] if `t_end < t_start`.
    pub fn new(
        dimm_id: DimmId,
        templates: Vec<Template>,
        mem_layout: Arc<dyn MemLayout>,
        t_start: u64,
        t_end: u64,
        pattern: Value,
        mapping: Value,
    ) -> Result<Self, FliptableError> {
        if t_end < t_start {
            return Err(FliptableError::InvalidTimeRange {
                start: t_start,
                end: t_end,
            });
        }
        Ok(Fliptable {
            dimm_id,
            templates,
            mem_layout,
            t_start,
            t_end,
            pattern,
            mapping,
        })
    }

    /// Assembles a fliptable from a sweep and its metadata.
    ///
    /// Initializes the memory layout in `registry` from
    /// `metadata.memory_config`; see [`LayoutRegistry::init_layout`] for the
    /// meaning of `layout_overwrite`.
    ///
    /// # Errors
    ///
    /// Fails on the first malformed flip record, on an invalid time range, or
    /// if the layout cannot be initialized.
    pub fn from_sweep(
        data: &SweepData,
        metadata: &SweepMetadata,
        registry: &mut LayoutRegistry,
        layout_overwrite: bool,
    ) -> Result<Self, FliptableError> {
        let mem_layout = registry.init_layout(&metadata.memory_config, layout_overwrite)?;
        let templates = data
            .flips
            .details
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Template::from_json_entry(entry)
                    .map_err(|source| FliptableError::MalformedRecord { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;
        debug!("Decomposed {} flip records", templates.len());

        let ftbl = Fliptable::new(
            metadata.dimm_id.clone(),
            templates,
            mem_layout,
            metadata.start,
            metadata.end,
            data.pattern.clone(),
            data.mapping.clone(),
        )?;
        info!(
            "Loaded fliptable for DIMM {}: {} templates, {} flips",
            ftbl.dimm_id,
            ftbl.templates.len(),
            ftbl.total_flips()
        );
        Ok(ftbl)
    }

    /// Assembles a fliptable from an [`Experiment`].
    ///
    /// # Errors
    ///
    /// See [`Fliptable::from_sweep`].
    pub fn from_experiment(
        experiment: &Experiment,
        registry: &mut LayoutRegistry,
        layout_overwrite: bool,
    ) -> Result<Self, FliptableError> {
        Self::from_sweep(
            &experiment.data,
            &experiment.metadata,
            registry,
            layout_overwrite,
        )
    }

    /// Returns the DIMM identifier.
    pub fn dimm_id(&self) -> &DimmId {
        &self.dimm_id
    }

    /// Returns the templates in observation order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    /// Returns the memory layout the flips are resolved with.
    pub fn mem_layout(&self) -> &dyn MemLayout {
        self.mem_layout.as_ref()
    }

    /// Returns the start time in seconds.
    pub fn t_start(&self) -> u64 {
        self.t_start
    }

    /// Returns the end time in seconds.
    pub fn t_end(&self) -> u64 {
        self.t_end
    }

    /// Returns the experiment duration in seconds.
    pub fn duration(&self) -> u64 {
        self.t_end - self.t_start
    }

    /// Returns the hammering pattern descriptor.
    pub fn pattern(&self) -> &Value {
        &self.pattern
    }

    /// Returns the address-mapping descriptor.
    pub fn mapping(&self) -> &Value {
        &self.mapping
    }

    /// Returns the number of flips over all templates.
    pub fn total_flips(&self) -> usize {
        self.templates.iter().map(|t| t.flips.len()).sum()
    }
}

impl Display for Fliptable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Fliptable(dimm: {}, tot_templates={}, pattern={}, dt={})",
            self.dimm_id,
            self.templates.len(),
            self.pattern,
            self.duration()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::row_pages;
    use serde_json::json;

    fn experiment(details: Value, start: u64, end: u64) -> Experiment {
        serde_json::from_value(json!({
            "data": {
                "flips": {"details": details},
                "pattern": "p17",
                "mapping": {"bank": 3},
            },
            "metadata": {
                "memory_config": {"name": "test"},
                "dimm_id": 502,
                "start": start,
                "end": end,
            },
        }))
        .unwrap()
    }

    fn entry(ts: u64, bitmask: u64) -> Value {
        json!({
            "dram_addr": {"bank": 1, "row": 2, "col": 8},
            "observed_at": ts,
            "data": 0,
            "bitmask": bitmask,
            "page_offset": 8,
            "addr": "0x3008",
        })
    }

    #[test]
    fn test_from_sweep() -> anyhow::Result<()> {
        let mut registry = row_pages();
        let exp = experiment(json!([entry(20, 0b11), entry(10, 0b1)]), 5, 105);
        let ftbl = Fliptable::from_experiment(&exp, &mut registry, false)?;
        assert!(registry.is_initialized());
        assert_eq!(ftbl.dimm_id(), &DimmId::Number(502));
        assert_eq!(ftbl.duration(), 100);
        assert_eq!(ftbl.total_flips(), 3);
        // observation order, not timestamp order
        assert_eq!(
            ftbl.templates().iter().map(|t| t.ts).collect::<Vec<_>>(),
            vec![20, 10]
        );
        assert_eq!(
            ftbl.to_string(),
            "Fliptable(dimm: 502, tot_templates=2, pattern=\"p17\", dt=100)"
        );
        Ok(())
    }

    #[test]
    fn test_malformed_record_reports_index() {
        let mut registry = row_pages();
        let exp = experiment(json!([entry(1, 1), entry(2, 300)]), 0, 10);
        let err = Fliptable::from_experiment(&exp, &mut registry, false).unwrap_err();
        assert!(matches!(
            err,
            FliptableError::MalformedRecord {
                index: 1,
                source: FlipError::OutOfRange { field: "bitmask", .. }
            }
        ));
    }

    #[test]
    fn test_invalid_time_range() {
        let mut registry = row_pages();
        let exp = experiment(json!([]), 10, 9);
        assert!(matches!(
            Fliptable::from_experiment(&exp, &mut registry, false),
            Err(FliptableError::InvalidTimeRange { start: 10, end: 9 })
        ));
    }

    #[test]
    fn test_dimm_id_name() {
        let id: DimmId = serde_json::from_value(json!("samsung-4")).unwrap();
        assert_eq!(id.to_string(), "samsung-4");
    }
}
