//! # rhsim Core
//!
//! `rhsim-core` post-processes captured Rowhammer flips and estimates how many
//! of them an attacker could exploit. It provides the flip model, the
//! exploit-model capability, and the statistics engine; concrete memory
//! layouts and exploit models live in their own crates.
//!
//! ## Pipeline
//!
//! 1. Raw flip records are decomposed into [`Template`]s of single-bit
//!    [`Flip`]s.
//! 2. The templates of one experiment, its timing bounds and the memory layout
//!    form a [`Fliptable`]. The layout is initialized once through a
//!    [`memory::LayoutRegistry`] and shared read-only.
//! 3. A [`FliptableEstimator`] runs an [`ExploitModel`] over the fliptable.
//!    Every flip is judged as its own [`VictimPage`]; accepted flips are kept
//!    as [`TSPageFlip`]s.
//! 4. The estimator derives a human-readable [`Summary`] and an exportable
//!    [`StatsRecord`] (counts, time to first exploitable flip, mean time
//!    between exploitable flips).
//!
//! ## Main Components
//!
//! - [`exploit::ExploitModel`] - Decides whether a victim page is exploitable.
//! - [`memory::MemLayout`] - Resolves DRAM addresses to physical addresses.
//! - [`util`] module - Page constants and report formatting helpers.

#![warn(missing_docs)]

mod estimator;
pub mod exploit;
mod flip;
mod fliptable;
pub mod memory;
pub mod stats;
pub mod util;
mod victim;

pub use crate::estimator::{EstimatorError, FliptableEstimator};
pub use crate::exploit::{CheckTemplates, ExploitFn, ExploitModel};
pub use crate::flip::{
    Flip, FlipAddr, FlipDirection, FlipError, HexAddr, PageBitFlip, RawFlipRecord, Template,
};
pub use crate::fliptable::{
    DimmId, Experiment, FlipDetails, Fliptable, FliptableError, SweepData, SweepMetadata,
};
pub use crate::stats::{STATS_FIELDS, Stat, StatsRecord, Summary};
pub use crate::victim::{TSPageFlip, VictimPage, VictimPages};
