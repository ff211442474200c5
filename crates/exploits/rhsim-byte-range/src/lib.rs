//! Byte-range exploit models.
//!
//! This crate provides exploit models that accept flips by their position in
//! the victim page: [`AnyFlip`] accepts every flip and gives an upper bound
//! on exploitability, [`ByteRange`] accepts flips landing in a byte range of
//! the page, optionally restricted to some bits and one flip direction.
//!
//! Implements the [`rhsim_core::ExploitModel`] trait.

#![warn(missing_docs)]

mod byte_range;

pub use byte_range::{AnyFlip, ByteRange};
