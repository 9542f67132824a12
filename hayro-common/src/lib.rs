//! An internal crate containing the bit and byte readers shared by the
//! fax and TIFF decoding crates.
//!
//! This crate is not meant for external consumption.

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod bit;
pub mod byte;
