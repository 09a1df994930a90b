//! Parsing and validation of packer configuration files.
//!
//! A packer configuration describes one logic family of one architecture: the
//! chain fabric (tile capacity, chain ports, compatibility ports), the boundary
//! cell templates used when a chain is split, truth-table shapes for constant
//! folding, and the rewrite rules that retarget abstract cells.

#![warn(missing_docs)]

pub mod error;
pub mod loader;
pub mod types;

pub use error::ConfigError;
pub use loader::{load_config, load_config_from_str};
pub use types::*;
