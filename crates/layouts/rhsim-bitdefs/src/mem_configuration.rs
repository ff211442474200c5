use log::debug;
use nalgebra::SMatrix;
use rhsim_core::memory::{DRAMAddr, MemLayout, PhysAddr};

use crate::{BitDef, BitDefError, DramConfig, Result};

/// Size of DRAM addressing matrices
pub const MTX_SIZE: usize = 30;

/// DRAM addressing configuration.
///
/// Defines how physical addresses map to DRAM organization (bank, row,
/// column) and back using transformation matrices.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MemConfiguration {
    /// Bit shift for bank extraction
    pub bk_shift: usize,
    /// Bit mask for bank extraction
    pub bk_mask: usize,
    /// Bit shift for row extraction
    pub row_shift: usize,
    /// Bit mask for row extraction
    pub row_mask: usize,
    /// Bit shift for column extraction
    pub col_shift: usize,
    /// Bit mask for column extraction
    pub col_mask: usize,
    /// DRAM addressing matrix (physical to DRAM)
    pub dram_mtx: [usize; MTX_SIZE],
    /// Address reconstruction matrix (DRAM to physical)
    pub addr_mtx: [usize; MTX_SIZE],
    /// Maximum bank bit position
    pub max_bank_bit: u64,
}

impl MemConfiguration {
    /// Builds the configuration from a [`DramConfig`].
    ///
    /// # Errors
    ///
    /// See [`MemConfiguration::from_bitdefs`].
    pub fn from_dram_config(config: &DramConfig) -> Result<Self> {
        Self::from_bitdefs(&config.bank_bits, &config.row_bits, &config.col_bits)
    }

    /// Builds the configuration from bank, row and column bit functions.
    ///
    /// Functions are stacked bank first, then column, then row, so that the
    /// bank ends up in the most significant bits of a linearized address.
    ///
    /// # Errors
    ///
    /// Fails if the functions do not add up to [`MTX_SIZE`], no bank bit is
    /// given, or the resulting matrix cannot be inverted over GF(2).
    pub fn from_bitdefs(
        bank_bits: &[BitDef],
        row_bits: &[BitDef],
        col_bits: &[BitDef],
    ) -> Result<Self> {
        let total = bank_bits.len() + col_bits.len() + row_bits.len();
        if total != MTX_SIZE {
            return Err(BitDefError::WrongSize {
                expected: MTX_SIZE,
                actual: total,
            });
        }

        let defs = || bank_bits.iter().chain(col_bits).chain(row_bits);
        if let Some(bit) = defs()
            .filter_map(BitDef::max_bit)
            .find(|&bit| bit >= MTX_SIZE as u64)
        {
            return Err(BitDefError::BitOutOfRange(bit));
        }

        let mut out = MemConfiguration {
            bk_shift: MTX_SIZE - bank_bits.len(),
            bk_mask: (1 << bank_bits.len()) - 1,
            col_shift: MTX_SIZE - bank_bits.len() - col_bits.len(),
            col_mask: (1 << col_bits.len()) - 1,
            row_shift: 0,
            row_mask: (1 << row_bits.len()) - 1,
            max_bank_bit: bank_bits
                .iter()
                .filter_map(BitDef::max_bit)
                .max()
                .ok_or(BitDefError::NoBankBits)?,
            ..Default::default()
        };

        // construct dram matrix
        for (row, def) in defs().enumerate() {
            out.dram_mtx[row] = def.to_bitstr();
        }

        // construct addr matrix
        let mut matrix = SMatrix::<u8, MTX_SIZE, MTX_SIZE>::zeros();
        for row in 0..MTX_SIZE {
            for col in 0..MTX_SIZE {
                matrix[(row, col)] = ((out.dram_mtx[row] >> (MTX_SIZE - col - 1)) & 1) as u8;
            }
        }
        let matrix_inv = matrix
            .cast::<f64>()
            .try_inverse()
            .ok_or(BitDefError::NotInvertible)?
            .map(|e| e.round() as i8)
            .map(|e| e.abs());

        for row in 0..MTX_SIZE {
            for col in 0..MTX_SIZE {
                match matrix_inv[(row, col)] {
                    0 => {}
                    1 => out.addr_mtx[row] |= 1 << (MTX_SIZE - col - 1),
                    other => return Err(BitDefError::NonBinary(other)),
                }
            }
        }
        debug!(
            "Built memory configuration with {} banks and {} rows: {:?}",
            out.get_bank_count(),
            out.get_row_count(),
            out
        );
        Ok(out)
    }

    /// Returns the number of banks in this DRAM configuration.
    pub fn get_bank_count(&self) -> usize {
        1 << self.bk_mask.count_ones()
    }

    /// Returns the number of rows in this DRAM configuration.
    pub fn get_row_count(&self) -> usize {
        1_usize << (self.row_mask.count_ones() as usize)
    }

    /// Decodes a physical address into DRAM components.
    pub fn dram_addr(&self, addr: PhysAddr) -> DRAMAddr {
        let p = addr.as_usize();
        let mut res = 0;
        for &i in self.dram_mtx.iter() {
            res <<= 1;
            res |= (p & i).count_ones() as usize & 1;
        }
        DRAMAddr {
            bank: (res >> self.bk_shift) & self.bk_mask,
            row: (res >> self.row_shift) & self.row_mask,
            col: (res >> self.col_shift) & self.col_mask,
        }
    }
}

impl MemLayout for MemConfiguration {
    fn to_phys(&self, addr: &DRAMAddr) -> PhysAddr {
        let l = addr.linearize(self.bk_shift, self.row_shift, self.col_shift);
        let mut res = 0;
        for &i in self.addr_mtx.iter() {
            res <<= 1;
            res |= (l & i).count_ones() as usize % 2;
        }
        PhysAddr::new(res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 13 column bits, 4 XORed bank functions, 13 row bits, most significant first.
    fn xor_banks() -> MemConfiguration {
        let bank_bits = (13..17)
            .rev()
            .map(|b| BitDef::Multi(vec![b, b + 4]))
            .collect::<Vec<_>>();
        let col_bits = (0..13).rev().map(BitDef::Single).collect::<Vec<_>>();
        let row_bits = (17..30).rev().map(BitDef::Single).collect::<Vec<_>>();
        MemConfiguration::from_bitdefs(&bank_bits, &row_bits, &col_bits).unwrap()
    }

    #[test]
    fn test_geometry() {
        let config = xor_banks();
        assert_eq!(config.get_bank_count(), 16);
        assert_eq!(config.get_row_count(), 1 << 13);
        assert_eq!(config.max_bank_bit, 20);
    }

    #[test]
    fn test_to_phys_inverts_dram_addr() {
        let config = xor_banks();
        for phys in [0x0, 0x1234, 0x2f1_e040, 0x3fff_ffff] {
            let dram = config.dram_addr(PhysAddr::new(phys));
            assert_eq!(config.to_phys(&dram), PhysAddr::new(phys));
        }
    }

    #[test]
    fn test_xor_bank() {
        let config = xor_banks();
        // bit 13 and bit 17 cancel out in bank function 0
        let dram = config.dram_addr(PhysAddr::new(1 << 13 | 1 << 17));
        assert_eq!(dram.bank, 0);
        assert_eq!(dram.row, 1);
        assert_eq!(dram.col, 0);
    }

    #[test]
    fn test_wrong_size() {
        let res = MemConfiguration::from_bitdefs(&[BitDef::Single(13)], &[], &[]);
        assert!(matches!(
            res,
            Err(BitDefError::WrongSize { expected: 30, actual: 1 })
        ));
    }

    #[test]
    fn test_bit_out_of_range() {
        let bank_bits = (13..17).rev().map(BitDef::Single).collect::<Vec<_>>();
        let row_bits = (17..30).rev().map(BitDef::Single).collect::<Vec<_>>();
        for bit in [30, 63, 70] {
            let mut col_bits = (0..13).rev().map(BitDef::Single).collect::<Vec<_>>();
            col_bits[0] = BitDef::Multi(vec![12, bit]);
            assert!(matches!(
                MemConfiguration::from_bitdefs(&bank_bits, &row_bits, &col_bits),
                Err(BitDefError::BitOutOfRange(b)) if b == bit
            ));
        }
    }

    #[test]
    fn test_not_invertible() {
        let mut col_bits = (0..13).map(BitDef::Single).collect::<Vec<_>>();
        col_bits[12] = BitDef::Single(0);
        let bank_bits = (13..17).map(BitDef::Single).collect::<Vec<_>>();
        let row_bits = (17..30).map(BitDef::Single).collect::<Vec<_>>();
        assert!(matches!(
            MemConfiguration::from_bitdefs(&bank_bits, &row_bits, &col_bits),
            Err(BitDefError::NotInvertible)
        ));
    }
}
