use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// DRAM address with bank, row, and column components.
///
/// Represents the physical organization of a memory cell in DRAM, as recorded
/// by the capture tooling for every flip-bearing observation. Resolving it to a
/// physical address is up to a [`MemLayout`](super::MemLayout).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct DRAMAddr {
    /// Bank number
    pub bank: usize,
    /// Row number
    pub row: usize,
    /// Column number
    pub col: usize,
}

impl Display for DRAMAddr {
    fn fmt(&self, fmt: &mut Formatter) -> fmt::Result {
        write!(fmt, "({}, {}, {})", self.bank, self.row, self.col)
    }
}

impl DRAMAddr {
    /// Creates a new DRAM address.
    ///
    /// # Arguments
    ///
    /// * `bank` - Bank number
    /// * `row` - Row number
    /// * `col` - Column number
    pub fn new(bank: usize, row: usize, col: usize) -> Self {
        DRAMAddr { bank, row, col }
    }

    /// Linearizes DRAM address components into a single value.
    ///
    /// Bank, row and column are placed at the given shifts. Layout
    /// implementations use this as the input to their address matrix.
    pub fn linearize(&self, bk_shift: usize, row_shift: usize, col_shift: usize) -> usize {
        (self.bank << bk_shift) | (self.row << row_shift) | (self.col << col_shift)
    }
}

#[cfg(test)]
mod tests {
    use super::DRAMAddr;

    #[test]
    fn test_missing_component_is_rejected() {
        let res = serde_json::from_str::<DRAMAddr>(r#"{"bank": 1, "row": 2}"#);
        assert!(res.is_err());
        let addr: DRAMAddr = serde_json::from_str(r#"{"bank": 1, "row": 2, "col": 3}"#).unwrap();
        assert_eq!(addr, DRAMAddr::new(1, 2, 3));
    }

    #[test]
    fn test_linearize() {
        let addr = DRAMAddr::new(0b11, 0b101, 0b1);
        assert_eq!(addr.linearize(8, 2, 0), 0b11_0001_0101);
    }
}
