//! The `memory` module provides the address types shared by the flip model and
//! the memory-layout capability.
//!
//! - `DRAMAddr`: A bank/row/column address as recorded by the capture tooling.
//! - `PhysAddr`: A physical address.
//! - `MemLayout`: A trait for resolving a `DRAMAddr` to a `PhysAddr`.
//! - `LayoutRegistry`: The explicit, once-initialized holder of the active `MemLayout`.
mod dram_addr;
mod layout;
mod phys_addr;

pub use self::dram_addr::DRAMAddr;
pub use self::layout::{LayoutBuilder, LayoutError, LayoutRegistry, MemLayout};
pub use self::phys_addr::PhysAddr;

#[cfg(test)]
pub(crate) use self::layout::tests::{RowPages, row_pages};
