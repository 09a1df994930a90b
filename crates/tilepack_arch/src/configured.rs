//! A [`ChainFabric`] described entirely by a packer configuration.

use crate::template::BoundaryTemplate;
use crate::ChainFabric;
use std::collections::BTreeSet;
use tilepack_common::{Ident, Interner};
use tilepack_config::{ConfigError, PackConfig};
use tilepack_netlist::{Cell, CellId, CellRole, Netlist};

/// A chain fabric read from the `[chain]` and `[boundary.*]` sections.
///
/// Cells are compatible when they agree on the nets of every configured
/// compatibility port (e.g. clock, clock enable and reset).
#[derive(Debug)]
pub struct ConfiguredFabric {
    name: String,
    chain_in: Ident,
    chain_out: Ident,
    cell_types: BTreeSet<Ident>,
    tile_capacity: usize,
    max_chain_length: usize,
    min_length: usize,
    slots_per_tile: usize,
    compat_ports: Vec<Ident>,
    feed_in: Option<BoundaryTemplate>,
    pass_through: Option<BoundaryTemplate>,
    pass_out: Option<BoundaryTemplate>,
}

impl ConfiguredFabric {
    /// Builds the fabric from a validated configuration.
    ///
    /// Fails with [`ConfigError::MissingField`] if there is no `[chain]` section.
    pub fn from_config(config: &PackConfig, interner: &Interner) -> Result<Self, ConfigError> {
        let chain = config
            .chain
            .as_ref()
            .ok_or_else(|| ConfigError::MissingField("chain".to_string()))?;
        let boundary = &config.boundary;
        let template = |cfg: &Option<tilepack_config::BoundaryCellConfig>| {
            cfg.as_ref().map(|c| BoundaryTemplate::from_config(c, interner))
        };
        Ok(Self {
            name: chain.cell_types.join("+"),
            chain_in: interner.get_or_intern(&chain.chain_in),
            chain_out: interner.get_or_intern(&chain.chain_out),
            cell_types: chain
                .cell_types
                .iter()
                .map(|t| interner.get_or_intern(t))
                .collect(),
            tile_capacity: chain.tile_capacity,
            max_chain_length: chain.max_chain_length.unwrap_or(usize::MAX),
            min_length: chain.min_length,
            slots_per_tile: chain.slots(),
            compat_ports: chain
                .compat_ports
                .iter()
                .map(|p| interner.get_or_intern(p))
                .collect(),
            feed_in: template(&boundary.feed_in),
            pass_through: template(&boundary.pass_through),
            pass_out: template(&boundary.pass_out),
        })
    }
}

impl ChainFabric for ConfiguredFabric {
    fn family_name(&self) -> &str {
        &self.name
    }

    fn chain_in(&self) -> Ident {
        self.chain_in
    }

    fn chain_out(&self) -> Ident {
        self.chain_out
    }

    fn is_chain_cell(&self, cell: &Cell) -> bool {
        cell.role == CellRole::Normal && self.cell_types.contains(&cell.cell_type)
    }

    fn tile_capacity(&self) -> usize {
        self.tile_capacity
    }

    fn max_chain_length(&self) -> usize {
        self.max_chain_length
    }

    fn min_length(&self) -> usize {
        self.min_length
    }

    fn slots_per_tile(&self) -> usize {
        self.slots_per_tile
    }

    fn compatible(&self, netlist: &Netlist<'_>, cells: &[CellId]) -> bool {
        let Some((&first, rest)) = cells.split_first() else {
            return true;
        };
        self.compat_ports.iter().all(|&port| {
            let expected = netlist.net_of(first, port);
            rest.iter().all(|&c| netlist.net_of(c, port) == expected)
        })
    }

    fn boundary(&self, role: CellRole) -> Option<&BoundaryTemplate> {
        match role {
            CellRole::Normal => None,
            CellRole::FeedIn => self.feed_in.as_ref(),
            CellRole::PassThrough => self.pass_through.as_ref(),
            CellRole::PassOut => self.pass_out.as_ref(),
        }
    }
}
