//! Shared foundational types used across the tilepack packer.
//!
//! This crate provides interned identifiers for cell types, port and parameter
//! names, 4-state logic values and packed bit-vectors used for truth tables
//! and bit-vector parameters, and content hashes used to fingerprint netlists.

#![warn(missing_docs)]

pub mod hash;
pub mod ident;
pub mod logic;
pub mod logic_vec;

pub use hash::ContentHash;
pub use ident::{Ident, Interner};
pub use logic::Logic;
pub use logic_vec::LogicVec;
