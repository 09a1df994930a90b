//! The packer's net/cell repository.
//!
//! [`Netlist`] owns every [`Cell`] and [`Net`] in slot arenas keyed by
//! [`CellId`] and [`NetId`]. Nets refer back to cells through non-owning
//! [`PortRef`]s and cells carry [`ClusterDescriptor`]s that point at their
//! cluster root by ID, so cyclic structures such as carry chains need no
//! shared ownership. Every fallible operation returns a [`PackResult`].

#![warn(missing_docs)]

pub mod arena;
pub mod cell;
pub mod error;
pub mod ids;
pub mod net;
pub mod netlist;
pub mod param;

pub use cell::{Cell, CellRole, ClusterDescriptor, Port, PortDirection};
pub use error::{PackError, PackResult};
pub use ids::{CellId, NetId};
pub use net::{ConstValue, Net, PortRef};
pub use netlist::{Netlist, GND_NET_NAME, VCC_NET_NAME};
pub use param::ParamValue;
