use log::trace;
use rhsim_core::{ExploitModel, FlipDirection, PageBitFlip, VictimPage};
use serde::Deserialize;

/// Size of one page-table entry in bytes
pub const PTE_SIZE: usize = 8;
/// First bit of the page frame number within an entry
pub const PTE_PFN_SHIFT: u32 = 12;

/// Exploit model accepting flips in the PFN field of x86-64 page-table entries.
///
/// The victim page is treated as an array of little-endian 8-byte entries.
/// A flip is accepted when its bit index within the entry falls into
/// `[12, phys_bits)`.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct PteFlip {
    /// Number of physical address bits of the machine
    pub phys_bits: u32,
    /// Accepted direction, `None` for both
    #[serde(default)]
    pub direction: Option<FlipDirection>,
}

impl Default for PteFlip {
    fn default() -> Self {
        PteFlip {
            phys_bits: 39,
            direction: None,
        }
    }
}

impl PteFlip {
    /// Returns the bit index of `flip` within its page-table entry.
    pub fn entry_bit(flip: &PageBitFlip) -> u32 {
        (flip.byte_offset % PTE_SIZE) as u32 * 8 + flip.mask.trailing_zeros()
    }

    fn in_pfn_field(&self, flip: &PageBitFlip) -> bool {
        (PTE_PFN_SHIFT..self.phys_bits).contains(&Self::entry_bit(flip))
    }
}

impl ExploitModel for PteFlip {
    fn check_page(&self, vpage: &VictimPage) -> bool {
        vpage.flips().any(|(flip, pullup)| {
            let accepted = self.in_pfn_field(flip)
                && self
                    .direction
                    .is_none_or(|direction| direction.is_pullup() == pullup);
            if accepted {
                trace!(
                    "PTE bit {} flipped on page {:#x}",
                    Self::entry_bit(flip),
                    vpage.pfn
                );
            }
            accepted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(byte_offset: usize, bit: u8, pullup: bool) -> VictimPage {
        VictimPage::single(
            1,
            PageBitFlip {
                byte_offset,
                mask: 1 << bit,
            },
            pullup,
        )
    }

    #[test]
    fn test_entry_bit() {
        let flip = PageBitFlip {
            byte_offset: 0x10 + 2,
            mask: 0b100,
        };
        assert_eq!(PteFlip::entry_bit(&flip), 18);
    }

    #[test]
    fn test_pfn_field_bounds() {
        let model = PteFlip::default();
        // bit 11 (byte 1, bit 3) is a flag bit
        assert!(!model.check_page(&page(1, 3, true)));
        // bit 12 (byte 1, bit 4) is the lowest PFN bit
        assert!(model.check_page(&page(1, 4, true)));
        // bit 38 (byte 4, bit 6) is the highest PFN bit with 39 physical bits
        assert!(model.check_page(&page(4, 6, false)));
        assert!(!model.check_page(&page(4, 7, false)));
        // NX bit of the next entry
        assert!(!model.check_page(&page(15, 7, false)));
    }

    #[test]
    fn test_direction() {
        let model = PteFlip {
            phys_bits: 46,
            direction: Some(FlipDirection::PullUp),
        };
        assert!(model.check_page(&page(2, 0, true)));
        assert!(!model.check_page(&page(2, 0, false)));
    }
}
