//! Page-table exploit model.
//!
//! A flip in the page-frame-number field of a page-table entry redirects the
//! mapping to another physical page, which classic Rowhammer privilege
//! escalations turn into a writable page table. [`PteFlip`] accepts flips that
//! land in that field when the victim page holds x86-64 page-table entries.
//!
//! Implements the [`rhsim_core::ExploitModel`] trait.

#![warn(missing_docs)]

mod pte;

pub use pte::{PTE_PFN_SHIFT, PTE_SIZE, PteFlip};
