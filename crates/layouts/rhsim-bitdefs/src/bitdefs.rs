use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use thiserror::Error;

/// Defines which physical address bits are used for DRAM mapping.
///
/// Can specify a single bit or multiple bits for row/column/bank functions.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BitDef {
    /// Single bit function
    Single(u64),
    /// XOR of multiple bits
    Multi(Vec<u64>),
}

impl BitDef {
    /// Converts bit definition to a bitmask.
    ///
    /// # Returns
    ///
    /// Bitmask with bits set at the specified positions
    pub fn to_bitstr(&self) -> usize {
        match self {
            BitDef::Single(bit) => 1 << bit,
            BitDef::Multi(bits) => bits.iter().fold(0, |res, bit| res | 1 << bit),
        }
    }

    /// Returns the highest bit used by this function.
    pub fn max_bit(&self) -> Option<u64> {
        match self {
            BitDef::Single(bit) => Some(*bit),
            BitDef::Multi(bits) => bits.iter().max().copied(),
        }
    }
}

/// Errors that can occur when building a memory configuration.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum BitDefError {
    #[error("Expected {expected} bit functions in total, got {actual}")]
    WrongSize { expected: usize, actual: usize },
    #[error("Bit {0} is outside the {max}-bit address matrix", max = crate::MTX_SIZE)]
    BitOutOfRange(u64),
    #[error("No bank bits defined")]
    NoBankBits,
    #[error("The address matrix is not invertible")]
    NotInvertible,
    #[error("Inverted matrix has non-binary element {0}")]
    NonBinary(i8),
    #[error(transparent)]
    IoError(#[from] std::io::Error),
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Result type for bit-definition based constructors.
pub type Result<T> = std::result::Result<T, BitDefError>;

/// DRAM geometry given as physical address bit functions.
#[derive(Clone, Debug, Deserialize)]
pub struct DramConfig {
    /// Physical address bits used for DRAM bank selection
    pub bank_bits: Vec<BitDef>,
    /// Physical address bits used for DRAM row selection
    pub row_bits: Vec<BitDef>,
    /// Physical address bits used for DRAM column selection
    pub col_bits: Vec<BitDef>,
}

impl DramConfig {
    /// Parses a configuration from an experiment's `memory_config`.
    ///
    /// # Errors
    ///
    /// Returns error if the value does not describe bank, row and column bits.
    pub fn from_value(value: &Value) -> Result<DramConfig> {
        Ok(DramConfig::deserialize(value)?)
    }

    /// Loads configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_jsonfile<P: AsRef<Path>>(filepath: P) -> Result<DramConfig> {
        let reader = BufReader::new(File::open(filepath)?);
        Ok(serde_json::from_reader(reader)?)
    }
}
