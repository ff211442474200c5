//! # rhsim
//!
//! rhsim post-processes the flips captured during Rowhammer experiments and
//! estimates how many of them an attacker model could exploit, how long it
//! takes until the first exploitable flip, and how long on average between
//! exploitable flips.
//!
//! This crate re-exports [`rhsim_core`] and, behind features, the bundled
//! memory layouts and exploit models:
//!
//! - `bitdefs`: [`bitdefs`] - DRAM layouts defined by physical address bit functions
//! - `byte-range`: [`byte_range`] - Exploit models matching page byte ranges
//! - `pte`: [`pte`] - Exploit model for page-table entry PFN fields
//!
//! ## Example
//!
//! ```ignore
//! use rhsim::memory::LayoutRegistry;
//! use rhsim::{Experiment, Fliptable, FliptableEstimator};
//!
//! let mut registry = LayoutRegistry::new(rhsim::bitdefs::layout_builder());
//! let experiment = Experiment::from_jsonfile("sweep.json")?;
//! let ftbl = Fliptable::from_experiment(&experiment, &mut registry, false)?;
//! let est = FliptableEstimator::main(&ftbl, rhsim::pte::PteFlip::default())?;
//! println!("{:?}", est.get_csv_stats("pte"));
//! ```

pub use rhsim_core::*;

#[cfg(feature = "bitdefs")]
pub use rhsim_bitdefs as bitdefs;
#[cfg(feature = "byte-range")]
pub use rhsim_byte_range as byte_range;
#[cfg(feature = "pte")]
pub use rhsim_pte as pte;
