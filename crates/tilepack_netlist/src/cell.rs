//! Cells, their ports, roles and cluster descriptors.

use crate::ids::{CellId, NetId};
use crate::param::ParamValue;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tilepack_common::Ident;

/// Direction of a cell port.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PortDirection {
    /// The port reads its net.
    In,
    /// The port drives its net.
    Out,
    /// Bidirectional. Connected as a reader.
    InOut,
}

/// One port of a cell.
#[derive(Clone, Debug)]
pub struct Port {
    /// The port name.
    pub name: Ident,
    /// The port direction.
    pub direction: PortDirection,
    /// The connected net, if any.
    pub net: Option<NetId>,
}

/// Why a cell exists: an ordinary netlist cell, or a boundary cell synthesized
/// while legalizing a chain.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, Serialize, Deserialize)]
pub enum CellRole {
    /// An ordinary cell.
    #[default]
    Normal,
    /// Lets a signal from general routing enter the chain.
    FeedIn,
    /// Continues the chain and re-exposes the chain signal to general routing.
    PassThrough,
    /// Terminates a chain segment and re-drives the chain signal to general routing.
    PassOut,
}

impl CellRole {
    /// Returns `true` for the three synthesized boundary roles.
    pub fn is_boundary(self) -> bool {
        self != CellRole::Normal
    }

    /// The marker string recorded on boundary cells.
    pub fn marker(self) -> &'static str {
        match self {
            CellRole::Normal => "normal",
            CellRole::FeedIn => "feed-in",
            CellRole::PassThrough => "pass-through",
            CellRole::PassOut => "pass-out",
        }
    }
}

impl fmt::Display for CellRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.marker())
    }
}

/// Placement constraint of a cell relative to its cluster root.
///
/// A root has `root == Some(self)` and zero offsets. Members carry offsets from
/// the root; with `abs_z` set, `dz` is an absolute sub-tile slot.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ClusterDescriptor {
    /// The cluster root, or `None` when the cell is unclustered.
    pub root: Option<CellId>,
    /// Horizontal tile offset from the root.
    pub dx: i32,
    /// Vertical tile offset from the root.
    pub dy: i32,
    /// Sub-tile slot offset from the root, or absolute slot with `abs_z`.
    pub dz: i32,
    /// Whether `dz` is an absolute slot.
    pub abs_z: bool,
    /// Non-root members, only populated on the root.
    pub children: Vec<CellId>,
}

/// A netlist instance.
#[derive(Clone, Debug)]
pub struct Cell {
    /// Instance name.
    pub name: String,
    /// Abstract or physical type tag.
    pub cell_type: Ident,
    /// Ports in declaration order.
    pub ports: Vec<Port>,
    /// Typed parameters.
    pub params: BTreeMap<Ident, ParamValue>,
    /// Free-form attributes.
    pub attrs: BTreeMap<Ident, ParamValue>,
    /// Architecture-defined location binding.
    pub bel: Option<Ident>,
    /// Why the cell exists.
    pub role: CellRole,
    /// Cluster membership.
    pub cluster: ClusterDescriptor,
}

impl Cell {
    pub(crate) fn new(name: String, cell_type: Ident) -> Self {
        Self {
            name,
            cell_type,
            ports: Vec::new(),
            params: BTreeMap::new(),
            attrs: BTreeMap::new(),
            bel: None,
            role: CellRole::Normal,
            cluster: ClusterDescriptor::default(),
        }
    }

    /// Returns the port with the given name.
    pub fn port(&self, name: Ident) -> Option<&Port> {
        self.ports.iter().find(|p| p.name == name)
    }

    pub(crate) fn port_mut(&mut self, name: Ident) -> Option<&mut Port> {
        self.ports.iter_mut().find(|p| p.name == name)
    }

    /// Returns the net connected to the given port.
    pub fn port_net(&self, name: Ident) -> Option<NetId> {
        self.port(name).and_then(|p| p.net)
    }

    /// Iterates over the connected output ports and their nets.
    pub fn outputs(&self) -> impl Iterator<Item = (Ident, NetId)> + '_ {
        self.ports
            .iter()
            .filter(|p| p.direction == PortDirection::Out)
            .filter_map(|p| p.net.map(|n| (p.name, n)))
    }

    /// Returns `true` if any port is connected.
    pub fn has_connections(&self) -> bool {
        self.ports.iter().any(|p| p.net.is_some())
    }
}
