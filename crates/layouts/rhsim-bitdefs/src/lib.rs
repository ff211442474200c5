//! Bit-definition memory layout for rhsim.
//!
//! This crate resolves DRAM addresses with a memory configuration described by
//! the physical address bits feeding each bank, row and column function (a
//! single bit, or several bits XORed together). The forward matrix maps a
//! physical address to its DRAM address; its inverse maps DRAM addresses back.
//!
//! Implements the [`rhsim_core::memory::MemLayout`] trait.
//!
//! # Configuration
//!
//! The `memory_config` of an experiment is a JSON object such as
//!
//! ```json
//! { "bank_bits": [[6, 13], [14, 18]], "row_bits": [18, 19], "col_bits": [0, 1] }
//! ```
//!
//! defining exactly [`MTX_SIZE`] functions in total.

#![warn(missing_docs)]

mod bitdefs;
mod mem_configuration;

pub use bitdefs::*;
pub use mem_configuration::{MTX_SIZE, MemConfiguration};

use std::sync::Arc;

use rhsim_core::memory::{LayoutBuilder, LayoutError, MemLayout};

/// Returns a [`LayoutBuilder`] that parses `memory_config` as a [`DramConfig`].
pub fn layout_builder() -> LayoutBuilder {
    Box::new(|config| {
        let layout = DramConfig::from_value(config)
            .and_then(|config| MemConfiguration::from_dram_config(&config))
            .map_err(|e| LayoutError::InvalidConfig(Box::new(e)))?;
        Ok(Arc::new(layout) as Arc<dyn MemLayout>)
    })
}
