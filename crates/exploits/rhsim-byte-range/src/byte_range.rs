use std::ops::Range;

use log::trace;
use rhsim_core::util::PAGE_SIZE;
use rhsim_core::{ExploitModel, FlipDirection, VictimPage};
use serde::Deserialize;

/// Exploit model accepting every flip.
#[derive(Clone, Copy, Debug, Default)]
pub struct AnyFlip;

impl ExploitModel for AnyFlip {
    fn check_page(&self, vpage: &VictimPage) -> bool {
        vpage.flips().next().is_some()
    }
}

/// Exploit model accepting flips within a byte range of the page.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct ByteRange {
    /// Accepted page byte offsets
    pub range: Range<usize>,
    /// Accepted bits within a byte
    #[serde(default = "all_bits")]
    pub bits: u8,
    /// Accepted direction, `None` for both
    #[serde(default)]
    pub direction: Option<FlipDirection>,
}

fn all_bits() -> u8 {
    0xff
}

impl ByteRange {
    /// Creates a model accepting any bit in either direction within `range`.
    pub fn new(range: Range<usize>) -> Self {
        ByteRange {
            range,
            bits: all_bits(),
            direction: None,
        }
    }

    /// Restricts the model to the bits set in `bits`.
    pub fn with_bits(mut self, bits: u8) -> Self {
        self.bits = bits;
        self
    }

    /// Restricts the model to one flip direction.
    pub fn with_direction(mut self, direction: FlipDirection) -> Self {
        self.direction = Some(direction);
        self
    }

    /// Parses `START-END` (decimal or `0x` hex, end exclusive).
    ///
    /// # Examples
    ///
    /// ```
    /// use rhsim_byte_range::ByteRange;
    ///
    /// assert_eq!(ByteRange::parse("0x10-0x18"), Some(ByteRange::new(16..24)));
    /// assert_eq!(ByteRange::parse("8-4"), None);
    /// ```
    pub fn parse(spec: &str) -> Option<Self> {
        fn offset(s: &str) -> Option<usize> {
            let s = s.trim();
            match s.strip_prefix("0x") {
                Some(hex) => usize::from_str_radix(hex, 16).ok(),
                None => s.parse().ok(),
            }
        }
        let (start, end) = spec.split_once('-')?;
        let range = offset(start)?..offset(end)?;
        (range.start < range.end && range.end <= PAGE_SIZE).then(|| ByteRange::new(range))
    }
}

impl ExploitModel for ByteRange {
    fn check_page(&self, vpage: &VictimPage) -> bool {
        vpage.flips().any(|(flip, pullup)| {
            let direction_ok = self
                .direction
                .is_none_or(|direction| direction.is_pullup() == pullup);
            let hit = self.range.contains(&flip.byte_offset) && flip.mask & self.bits != 0;
            trace!("{:?} on page {:#x}: hit={}", flip, vpage.pfn, hit && direction_ok);
            hit && direction_ok
        })
    }
}
