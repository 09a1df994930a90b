//! Architecture-layer interfaces consumed by the packer core.
//!
//! This crate provides the [`ChainFabric`] trait that abstracts over the chain
//! resources of different FPGA families (carry chains, register chains,
//! cascade buses): which cells take part, how they link, how many fit in a
//! tile, which cells may share a tile, and which boundary cells legalize a
//! split. [`ConfiguredFabric`] implements it from a packer configuration file.
//!
//! # Usage
//!
//! ```
//! use tilepack_arch::{ChainFabric, ConfiguredFabric};
//! use tilepack_common::Interner;
//! use tilepack_config::load_config_from_str;
//!
//! let config = load_config_from_str(r#"
//! [chain]
//! tile_capacity = 8
//! chain_in = "CI"
//! chain_out = "CO"
//! cell_types = ["CARRY"]
//! "#).unwrap();
//! let interner = Interner::new();
//! let fabric = ConfiguredFabric::from_config(&config, &interner).unwrap();
//! assert_eq!(fabric.tile_capacity(), 8);
//! ```

#![warn(missing_docs)]

pub mod configured;
pub mod template;

pub use configured::ConfiguredFabric;
pub use template::{param_value, BoundaryTemplate, CellTemplate};

use tilepack_common::Ident;
use tilepack_netlist::{Cell, CellId, CellRole, Netlist};

/// The chain resources of one FPGA logic family.
///
/// Capacity and compatibility queries are required; limits that many families
/// do not have default to "unbounded" or "always compatible".
pub trait ChainFabric: std::fmt::Debug {
    /// Returns a short name for diagnostics (e.g. "ice40_carry").
    fn family_name(&self) -> &str;

    /// Returns the chain input port name (e.g. `CI`).
    fn chain_in(&self) -> Ident;

    /// Returns the chain output port name (e.g. `CO`).
    fn chain_out(&self) -> Ident;

    /// Returns `true` if the cell takes part in this chain fabric.
    fn is_chain_cell(&self, cell: &Cell) -> bool;

    /// Returns the number of chain cells one tile holds.
    fn tile_capacity(&self) -> usize;

    /// Returns the maximum physical segment length, boundary cells included.
    fn max_chain_length(&self) -> usize {
        usize::MAX
    }

    /// Returns the shortest chain worth packing as a chain.
    fn min_length(&self) -> usize {
        1
    }

    /// Returns the number of sub-tile slots used for cluster offsets.
    fn slots_per_tile(&self) -> usize {
        self.tile_capacity()
    }

    /// Returns `true` if all `cells` may share one tile.
    fn compatible(&self, _netlist: &Netlist<'_>, _cells: &[CellId]) -> bool {
        true
    }

    /// Returns the boundary cell template for a role, if the fabric has one.
    fn boundary(&self, role: CellRole) -> Option<&BoundaryTemplate>;
}
