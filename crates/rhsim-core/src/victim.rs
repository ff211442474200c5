//! Victim page views derived from templates.
//!
//! Exploit models judge flips per physical page. Each flip of a template is
//! handed out as its own [`VictimPage`] so that exploitability can be counted
//! per flip rather than per template.

use std::collections::BTreeSet;
use std::slice;

use serde::Serialize;

use crate::flip::{Flip, PageBitFlip, Template};
use crate::memory::MemLayout;

/// The flip outcome of one rowhammer attack on one physical page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VictimPage {
    /// Page frame number
    pub pfn: usize,
    /// Flips from 0 to 1
    pub pullups: BTreeSet<PageBitFlip>,
    /// Flips from 1 to 0
    pub pulldowns: BTreeSet<PageBitFlip>,
}

impl VictimPage {
    /// Creates a victim page holding exactly `flip`.
    pub fn single(pfn: usize, flip: PageBitFlip, pullup: bool) -> Self {
        let (pullups, pulldowns) = if pullup {
            (BTreeSet::from([flip]), BTreeSet::new())
        } else {
            (BTreeSet::new(), BTreeSet::from([flip]))
        };
        VictimPage {
            pfn,
            pullups,
            pulldowns,
        }
    }

    /// Iterates over all flips on the page, pull-ups first.
    pub fn flips(&self) -> impl Iterator<Item = (&PageBitFlip, bool)> {
        self.pullups
            .iter()
            .map(|f| (f, true))
            .chain(self.pulldowns.iter().map(|f| (f, false)))
    }
}

/// An exploitable page bit flip together with the time it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct TSPageFlip {
    /// Byte offset within the page
    pub byte_offset: usize,
    /// Single-bit mask of the flipped bit
    pub mask: u8,
    /// `true` if the bit flipped from 0 to 1
    pub pullup: bool,
    /// Observation time in seconds
    pub ts: u64,
}

/// Iterator over the single-flip victim pages of one template.
///
/// Created by [`Template::victim_pages`].
pub struct VictimPages<'a> {
    pfn: usize,
    flips: slice::Iter<'a, Flip>,
    layout: &'a dyn MemLayout,
}

impl Iterator for VictimPages<'_> {
    type Item = VictimPage;

    fn next(&mut self) -> Option<Self::Item> {
        let flip = self.flips.next()?;
        Some(VictimPage::single(
            self.pfn,
            flip.to_page_bit_flip(self.layout),
            flip.pullup(),
        ))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.flips.size_hint()
    }
}

impl Template {
    /// Derives one [`VictimPage`] per flip.
    ///
    /// The page frame number is taken from the first flip's physical address
    /// for all pages of the template. Flips of one template are assumed to
    /// share a page.
    pub fn victim_pages<'a>(&'a self, layout: &'a dyn MemLayout) -> VictimPages<'a> {
        let pfn = self
            .flips
            .first()
            .map(|flip| flip.phys_addr().pfn())
            .unwrap_or_default();
        VictimPages {
            pfn,
            flips: self.flips.iter(),
            layout,
        }
    }
}
