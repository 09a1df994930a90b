//! Nets, port references and constant tags.

use crate::ids::CellId;
use serde::{Deserialize, Serialize};
use tilepack_common::Ident;

/// A non-owning reference to one port of one cell.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct PortRef {
    /// The cell owning the port.
    pub cell: CellId,
    /// The port name.
    pub port: Ident,
}

/// The value carried by a constant net.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum ConstValue {
    /// Tied low.
    Zero,
    /// Tied high.
    One,
}

impl ConstValue {
    /// Returns the logic level as a boolean.
    pub fn as_bool(self) -> bool {
        self == ConstValue::One
    }
}

/// A single electrical signal.
#[derive(Clone, Debug)]
pub struct Net {
    /// The net name.
    pub name: String,
    /// The port driving this net, if any.
    pub driver: Option<PortRef>,
    /// Ports reading this net, in connection order.
    pub sinks: Vec<PortRef>,
    /// Constant tag. A tagged net never has a cell driver.
    pub constant: Option<ConstValue>,
}

impl Net {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            driver: None,
            sinks: Vec::new(),
            constant: None,
        }
    }

    /// Returns `true` if the net has neither a driver nor any sink.
    pub fn is_floating(&self) -> bool {
        self.driver.is_none() && self.sinks.is_empty()
    }
}
