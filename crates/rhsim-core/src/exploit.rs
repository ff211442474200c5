//! Exploitability predicates.
//!
//! This module defines the [`ExploitModel`] trait that decides whether a flip
//! outcome on a victim page is usable by an attacker. Models only judge single
//! pages; [`ExploitModel::check_templates`] feeds them the victim pages of a
//! whole experiment and yields the accepted flips with their timestamps.

use std::slice;

use crate::flip::Template;
use crate::memory::MemLayout;
use crate::victim::{TSPageFlip, VictimPage, VictimPages};

/// Trait for attacker models judging the exploitability of bit flips.
///
/// # Required Methods
///
/// Implementors must provide:
/// * [`check_page()`](ExploitModel::check_page) - Decides whether a victim page is exploitable
///
/// # Examples
///
/// See the model crates such as `rhsim-byte-range` or `rhsim-pte` for concrete
/// implementations.
pub trait ExploitModel {
    /// Returns whether the flips on `vpage` are exploitable.
    ///
    /// Must be free of side effects. Victim pages handed out by
    /// [`check_templates`](ExploitModel::check_templates) hold either a single
    /// pull-up or a single pull-down.
    fn check_page(&self, vpage: &VictimPage) -> bool;

    /// Runs the model over every flip of `templates`.
    ///
    /// The returned iterator is lazy and single-pass; restart it by calling
    /// this method again.
    ///
    /// # Panics
    ///
    /// The iterator panics if a derived victim page does not hold exactly one
    /// flip.
    fn check_templates<'a>(
        &'a self,
        templates: &'a [Template],
        layout: &'a dyn MemLayout,
    ) -> CheckTemplates<'a, Self>
    where
        Self: Sized,
    {
        CheckTemplates {
            model: self,
            templates: templates.iter(),
            layout,
            current: None,
        }
    }
}

impl<M: ExploitModel + ?Sized> ExploitModel for &M {
    fn check_page(&self, vpage: &VictimPage) -> bool {
        (**self).check_page(vpage)
    }
}

impl<M: ExploitModel + ?Sized> ExploitModel for Box<M> {
    fn check_page(&self, vpage: &VictimPage) -> bool {
        (**self).check_page(vpage)
    }
}

/// Exploit model backed by a plain predicate function.
pub struct ExploitFn<F>(pub F);

impl<F: Fn(&VictimPage) -> bool> ExploitModel for ExploitFn<F> {
    fn check_page(&self, vpage: &VictimPage) -> bool {
        (self.0)(vpage)
    }
}

/// Iterator over the exploitable flips of a series of templates.
///
/// Created by [`ExploitModel::check_templates`].
pub struct CheckTemplates<'a, M> {
    model: &'a M,
    templates: slice::Iter<'a, Template>,
    layout: &'a dyn MemLayout,
    current: Option<(u64, VictimPages<'a>)>,
}

fn accepted_flip(vpage: &VictimPage, ts: u64) -> TSPageFlip {
    let mut flips = vpage.flips();
    let (flip, pullup) = match (flips.next(), flips.next()) {
        (Some((flip, pullup)), None) => (*flip, pullup),
        _ => panic!(
            "victim page {:#x} must hold exactly one flip, got {} pull-ups and {} pull-downs",
            vpage.pfn,
            vpage.pullups.len(),
            vpage.pulldowns.len()
        ),
    };
    TSPageFlip {
        byte_offset: flip.byte_offset,
        mask: flip.mask,
        pullup,
        ts,
    }
}

impl<M: ExploitModel> Iterator for CheckTemplates<'_, M> {
    type Item = TSPageFlip;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((ts, pages)) = self.current.as_mut() {
                for vpage in pages.by_ref() {
                    if self.model.check_page(&vpage) {
                        return Some(accepted_flip(&vpage, *ts));
                    }
                }
            }
            let tmpl = self.templates.next()?;
            self.current = Some((tmpl.ts, tmpl.victim_pages(self.layout)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flip::RawFlipRecord;
    use crate::memory::{DRAMAddr, RowPages};
    use std::cell::Cell;
    use std::collections::BTreeSet;

    fn template(ts: u64, data: u64, bitmask: u64) -> Template {
        Template::from_record(&RawFlipRecord {
            dram_addr: DRAMAddr::new(0, 1, 0x80),
            observed_at: ts,
            data,
            bitmask,
            page_offset: 0x80,
            addr: "0x1080".into(),
        })
        .unwrap()
    }

    #[test]
    fn test_check_templates_yields_accepted_flips() {
        let templates = vec![template(10, 0b0000_0001, 0b0000_0011), template(20, 0, 0b1000_0000)];
        let pullups_only = ExploitFn(|vpage: &VictimPage| !vpage.pullups.is_empty());
        let results = pullups_only
            .check_templates(&templates, &RowPages)
            .collect::<Vec<_>>();
        assert_eq!(
            results,
            vec![
                TSPageFlip { byte_offset: 0x80, mask: 0b10, pullup: true, ts: 10 },
                TSPageFlip { byte_offset: 0x80, mask: 0b1000_0000, pullup: true, ts: 20 },
            ]
        );
    }

    #[test]
    fn test_check_templates_is_lazy() {
        struct Counting(Cell<usize>);
        impl ExploitModel for Counting {
            fn check_page(&self, _vpage: &VictimPage) -> bool {
                self.0.set(self.0.get() + 1);
                true
            }
        }
        let templates = vec![template(1, 0, 0xff), template(2, 0, 0xff)];
        let model = Counting(Cell::new(0));
        let mut iter = model.check_templates(&templates, &RowPages);
        assert_eq!(model.0.get(), 0);
        iter.next();
        assert_eq!(model.0.get(), 1);
        assert_eq!(iter.count(), 15);
        assert_eq!(model.0.get(), 16);
    }

    #[test]
    fn test_boxed_models() {
        let templates = vec![template(1, 0xff, 0x0f)];
        let models: Vec<Box<dyn ExploitModel>> = vec![
            Box::new(ExploitFn(|_: &VictimPage| true)),
            Box::new(ExploitFn(|_: &VictimPage| false)),
        ];
        let counts = models
            .iter()
            .map(|m| m.check_templates(&templates, &RowPages).count())
            .collect::<Vec<_>>();
        assert_eq!(counts, vec![4, 0]);
    }

    #[test]
    #[should_panic(expected = "exactly one flip")]
    fn test_multi_flip_page_is_fatal() {
        let page = VictimPage {
            pfn: 1,
            pullups: BTreeSet::from([
                crate::PageBitFlip { byte_offset: 0, mask: 1 },
                crate::PageBitFlip { byte_offset: 0, mask: 2 },
            ]),
            pulldowns: BTreeSet::new(),
        };
        accepted_flip(&page, 0);
    }
}
