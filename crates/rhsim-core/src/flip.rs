//! Bit flip and template model.
//!
//! A captured observation reports one byte whose value differs from the
//! expected (golden) value. [`Template::from_record`] decomposes such a record
//! into one [`Flip`] per differing bit.

use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::memory::{DRAMAddr, MemLayout, PhysAddr};
use crate::util::{BITS_PER_BYTE, PAGE_MASK};

/// Errors that can occur while decomposing a raw flip record.
#[derive(Debug, Error)]
pub enum FlipError {
    /// A byte-valued field does not fit into 0..=255.
    #[error("Field `{field}` out of range: {value} (expected 0..=255)")]
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// The value found in the record
        value: u64,
    },
    /// The bitmask does not mark any bit.
    #[error("Empty bitmask, record carries no flip")]
    EmptyBitmask,
    /// The virtual address is not a hexadecimal number.
    #[error("Invalid virtual address: {0:?}")]
    InvalidAddr(String),
    /// The record could not be decoded.
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),
}

/// Virtual address as captured, kept in its raw hexadecimal form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "String")]
pub struct HexAddr {
    raw: String,
    value: usize,
}

impl HexAddr {
    /// Parses a hexadecimal address with optional `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns [`FlipError::InvalidAddr`] if `raw` is not a hexadecimal number.
    pub fn parse(raw: &str) -> Result<Self, FlipError> {
        let digits = raw
            .trim()
            .strip_prefix("0x")
            .or_else(|| raw.trim().strip_prefix("0X"))
            .unwrap_or(raw.trim());
        let value = usize::from_str_radix(digits, 16)
            .map_err(|_| FlipError::InvalidAddr(raw.to_string()))?;
        Ok(HexAddr {
            raw: raw.to_string(),
            value,
        })
    }

    /// Returns the numeric address.
    pub fn value(&self) -> usize {
        self.value
    }

    /// Returns the address as captured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl<'de> Deserialize<'de> for HexAddr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        HexAddr::parse(&raw).map_err(serde::de::Error::custom)
    }
}

impl From<HexAddr> for String {
    fn from(addr: HexAddr) -> Self {
        addr.raw
    }
}

impl Display for HexAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One flip-bearing observation as written by the capture tooling.
///
/// `data` and `bitmask` are kept wide so that out-of-range values are reported
/// as [`FlipError::OutOfRange`] instead of a generic decode error.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawFlipRecord {
    /// DRAM location of the observed byte
    pub dram_addr: DRAMAddr,
    /// Observation time in seconds
    pub observed_at: u64,
    /// Data byte used to classify the flip direction
    pub data: u64,
    /// Bits that differ from the golden value
    pub bitmask: u64,
    /// Byte offset within the page
    pub page_offset: usize,
    /// Virtual address of the byte
    pub addr: String,
}

/// Direction of a single bit flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipDirection {
    /// Bit flipped from 0 to 1
    PullUp,
    /// Bit flipped from 1 to 0
    PullDown,
}

impl FlipDirection {
    /// Returns `true` for [`FlipDirection::PullUp`].
    pub fn is_pullup(&self) -> bool {
        matches!(self, FlipDirection::PullUp)
    }
}

/// Location at which a flip may be resolved: as captured in DRAM coordinates
/// or already translated to a physical address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub enum FlipAddr {
    /// Bank/row/column as captured
    Dram(DRAMAddr),
    /// Physical address
    Phys(PhysAddr),
}

/// A single bit that differed from its expected value in one observation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Flip {
    /// Location of the flipped byte
    pub addr: FlipAddr,
    /// Bit index within the byte (0..=7)
    pub bit: u8,
    /// Transition direction
    pub direction: FlipDirection,
    /// Byte offset within the page
    pub byte_offset: usize,
    /// Virtual address of the flipped byte
    pub addr_virt: HexAddr,
}

/// A byte with one flipped bit at a particular offset within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct PageBitFlip {
    /// Byte offset within the page
    pub byte_offset: usize,
    /// Single-bit mask of the flipped bit
    pub mask: u8,
}

impl Flip {
    /// Returns `true` if the bit flipped from 0 to 1.
    pub fn pullup(&self) -> bool {
        self.direction.is_pullup()
    }

    /// Returns the physical address of the flip.
    ///
    /// Captures record the virtual address of a physically contiguous
    /// mapping, so the virtual address doubles as the physical one.
    pub fn phys_addr(&self) -> PhysAddr {
        match self.addr {
            FlipAddr::Phys(addr) => addr,
            FlipAddr::Dram(_) => PhysAddr::new(self.addr_virt.value()),
        }
    }

    /// Converts the flip to its physical-memory view.
    pub fn to_physmem(&self) -> Flip {
        Flip {
            addr: FlipAddr::Phys(self.phys_addr()),
            ..self.clone()
        }
    }

    /// Converts the flip to its page-relative view.
    ///
    /// The byte offset is taken from the physical address the DRAM location
    /// resolves to under `layout`.
    pub fn to_page_bit_flip(&self, layout: &dyn MemLayout) -> PageBitFlip {
        let phys = match &self.addr {
            FlipAddr::Dram(addr) => layout.to_phys(addr),
            FlipAddr::Phys(addr) => *addr,
        };
        PageBitFlip {
            byte_offset: phys.as_usize() & PAGE_MASK,
            mask: 1 << self.bit,
        }
    }
}

impl Display for Flip {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.addr {
            FlipAddr::Dram(addr) => write!(
                f,
                "Flip( addr: bk{}.r{}, bit: {} pullup: {:>5})",
                addr.bank,
                addr.row,
                self.bit,
                self.pullup()
            ),
            FlipAddr::Phys(addr) => write!(
                f,
                "Flip( addr: {:>#12x}, bit: {} pullup: {:>5})",
                addr.as_usize(),
                self.bit,
                self.pullup()
            ),
        }
    }
}

/// All flips observed at one timestamp within one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    /// Flips in decomposition order
    pub flips: Vec<Flip>,
    /// Observation time in seconds
    pub ts: u64,
}

fn byte_field(field: &'static str, value: u64) -> Result<u8, FlipError> {
    u8::try_from(value).map_err(|_| FlipError::OutOfRange { field, value })
}

impl Template {
    /// Decomposes a raw record into one [`Flip`] per bit set in `bitmask`.
    ///
    /// Bits with a 0 in `data` are pull-ups, bits with a 1 are pull-downs.
    /// Pull-ups are emitted first, each direction scanned from bit 0 to bit 7.
    ///
    /// # Errors
    ///
    /// Fails if `data` or `bitmask` exceed a byte, `bitmask` is empty, or the
    /// virtual address is malformed.
    pub fn from_record(record: &RawFlipRecord) -> Result<Template, FlipError> {
        let data = byte_field("data", record.data)?;
        let bitmask = byte_field("bitmask", record.bitmask)?;
        if bitmask == 0 {
            return Err(FlipError::EmptyBitmask);
        }
        let addr_virt = HexAddr::parse(&record.addr)?;

        let pullups = !data & bitmask;
        let pulldowns = data & bitmask;
        let flips = [
            (FlipDirection::PullUp, pullups),
            (FlipDirection::PullDown, pulldowns),
        ]
        .into_iter()
        .flat_map(|(direction, bits)| {
            (0..BITS_PER_BYTE)
                .filter(move |bit| bits & (1 << bit) != 0)
                .map(move |bit| (direction, bit))
        })
        .map(|(direction, bit)| Flip {
            addr: FlipAddr::Dram(record.dram_addr.clone()),
            bit,
            direction,
            byte_offset: record.page_offset,
            addr_virt: addr_virt.clone(),
        })
        .collect();

        Ok(Template {
            flips,
            ts: record.observed_at,
        })
    }

    /// Decodes and decomposes a JSON record.
    ///
    /// # Errors
    ///
    /// See [`Template::from_record`].
    pub fn from_json_entry(entry: &serde_json::Value) -> Result<Template, FlipError> {
        let record = RawFlipRecord::deserialize(entry)?;
        Template::from_record(&record)
    }

    /// Maps every flip to its physical-memory view.
    pub fn to_physmem(&self) -> Template {
        Template {
            flips: self.flips.iter().map(Flip::to_physmem).collect(),
            ts: self.ts,
        }
    }
}

impl Display for Template {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "Template(flips: [")?;
        for (i, flip) in self.flips.iter().enumerate() {
            if i > 0 {
                write!(f, "\n\t\t")?;
            }
            write!(f, "{}", flip)?;
        }
        write!(f, "], ts:{:>12})", self.ts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn record(data: u64, bitmask: u64) -> RawFlipRecord {
        RawFlipRecord {
            dram_addr: DRAMAddr::new(3, 1200, 64),
            observed_at: 5,
            data,
            bitmask,
            page_offset: 0,
            addr: "0x1000".into(),
        }
    }

    #[test]
    fn test_decompose_mixed_directions() {
        let tmpl = Template::from_record(&record(0b1011_0000, 0b1111_0000)).unwrap();
        assert_eq!(tmpl.ts, 5);
        let flips = tmpl
            .flips
            .iter()
            .map(|f| (f.bit, f.direction))
            .collect::<Vec<_>>();
        assert_eq!(
            flips,
            vec![
                (6, FlipDirection::PullUp),
                (4, FlipDirection::PullDown),
                (5, FlipDirection::PullDown),
                (7, FlipDirection::PullDown),
            ]
        );
    }

    #[test]
    fn test_decompose_bit_positions() {
        let tmpl = Template::from_record(&record(0b0101_0000, 0b1111_0000)).unwrap();
        let mut by_bit = tmpl
            .flips
            .iter()
            .map(|f| (f.bit, f.pullup()))
            .collect::<Vec<_>>();
        by_bit.sort();
        assert_eq!(
            by_bit,
            vec![(4, false), (5, true), (6, false), (7, true)]
        );
        assert_eq!(tmpl.flips.iter().filter(|f| f.pullup()).count(), 2);
    }

    #[test]
    fn test_decompose_is_lossless() {
        let mut rng = StdRng::seed_from_u64(0x5eed);
        for _ in 0..1000 {
            let data: u8 = rng.random();
            let bitmask: u8 = rng.random_range(1..=255);
            let tmpl = Template::from_record(&record(data as u64, bitmask as u64)).unwrap();
            assert_eq!(tmpl.flips.len(), bitmask.count_ones() as usize);
            for flip in &tmpl.flips {
                assert!(flip.bit < 8);
                assert_ne!(bitmask & (1 << flip.bit), 0);
                assert_eq!(flip.pullup(), (!data >> flip.bit) & 1 == 1);
            }
            let mut bits = tmpl.flips.iter().map(|f| f.bit).collect::<Vec<_>>();
            bits.sort();
            bits.dedup();
            assert_eq!(bits.len(), tmpl.flips.len());
        }
    }

    #[test]
    fn test_out_of_range() {
        assert!(matches!(
            Template::from_record(&record(256, 1)),
            Err(FlipError::OutOfRange { field: "data", value: 256 })
        ));
        assert!(matches!(
            Template::from_record(&record(0, 0x1ff)),
            Err(FlipError::OutOfRange { field: "bitmask", .. })
        ));
        assert!(matches!(
            Template::from_record(&record(0, 0)),
            Err(FlipError::EmptyBitmask)
        ));
    }

    #[test]
    fn test_invalid_addr() {
        let mut rec = record(0, 1);
        rec.addr = "0xnope".into();
        assert!(matches!(
            Template::from_record(&rec),
            Err(FlipError::InvalidAddr(_))
        ));
    }

    #[test]
    fn test_from_json_entry_missing_dram_component() {
        let entry = serde_json::json!({
            "dram_addr": {"bank": 1, "col": 0},
            "observed_at": 1,
            "data": 0,
            "bitmask": 1,
            "page_offset": 0,
            "addr": "0x2000",
        });
        assert!(matches!(
            Template::from_json_entry(&entry),
            Err(FlipError::JsonError(_))
        ));
    }

    #[test]
    fn test_physmem_view() {
        let tmpl = Template::from_record(&record(0, 0b11)).unwrap();
        let phys = tmpl.to_physmem();
        assert_eq!(phys.ts, tmpl.ts);
        for flip in &phys.flips {
            assert_eq!(flip.addr, FlipAddr::Phys(PhysAddr::new(0x1000)));
        }
        assert!(phys.flips[0].to_string().contains("0x1000"));
        assert!(tmpl.flips[0].to_string().starts_with("Flip( addr: bk3.r1200, bit: 0"));
    }

    #[test]
    fn test_page_bit_flip() {
        let layout = crate::memory::RowPages;
        let tmpl = Template::from_record(&record(0, 0b100)).unwrap();
        let pflip = tmpl.flips[0].to_page_bit_flip(&layout);
        assert_eq!(pflip, PageBitFlip { byte_offset: 64, mask: 0b100 });
    }
}
