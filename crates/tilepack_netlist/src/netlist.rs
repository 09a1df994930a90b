//! The cell/net repository every packing pass mutates.

use crate::arena::SlotArena;
use crate::cell::{Cell, Port, PortDirection};
use crate::error::{PackError, PackResult};
use crate::ids::{CellId, NetId};
use crate::net::{ConstValue, Net, PortRef};
use std::collections::BTreeSet;
use std::fmt::Write;
use tilepack_common::{ContentHash, Ident, Interner};

/// Name of the well-known tie-low net.
pub const GND_NET_NAME: &str = "$PACKER_GND_NET";
/// Name of the well-known tie-high net.
pub const VCC_NET_NAME: &str = "$PACKER_VCC_NET";

/// The packer's netlist: owns every cell and net, keyed by stable IDs.
///
/// Cross references (net drivers and sinks, cluster roots and children) are
/// plain IDs and [`PortRef`]s. Iteration is always in creation order, which is
/// what makes every pass reproducible for a fixed input.
///
/// Deletion is two-phase: passes call [`mark_for_removal`](Self::mark_for_removal)
/// while iterating and [`flush`](Self::flush) afterwards.
pub struct Netlist<'a> {
    /// The interner that owns every [`Ident`] stored in this netlist.
    pub interner: &'a Interner,
    cells: SlotArena<CellId, Cell>,
    nets: SlotArena<NetId, Net>,
    pending_removal: BTreeSet<CellId>,
    gnd_net: Option<NetId>,
    vcc_net: Option<NetId>,
    name_counter: u32,
}

impl<'a> Netlist<'a> {
    /// Creates an empty netlist.
    pub fn new(interner: &'a Interner) -> Self {
        Self {
            interner,
            cells: SlotArena::new(),
            nets: SlotArena::new(),
            pending_removal: BTreeSet::new(),
            gnd_net: None,
            vcc_net: None,
            name_counter: 0,
        }
    }

    /// Creates a cell with no ports.
    pub fn create_cell(&mut self, cell_type: Ident, name: impl Into<String>) -> CellId {
        self.cells.alloc(Cell::new(name.into(), cell_type))
    }

    /// Creates a net with no driver and no sinks.
    pub fn create_net(&mut self, name: impl Into<String>) -> NetId {
        self.nets.alloc(Net::new(name.into()))
    }

    /// Returns the cell with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the cell was removed.
    pub fn cell(&self, id: CellId) -> &Cell {
        match self.cells.get(id) {
            Some(cell) => cell,
            None => panic!("cell {id} does not exist"),
        }
    }

    /// Returns the cell with the given ID mutably.
    ///
    /// Ports must be changed through [`connect`](Self::connect) and friends so
    /// that nets stay consistent.
    ///
    /// # Panics
    ///
    /// Panics if the cell was removed.
    pub fn cell_mut(&mut self, id: CellId) -> &mut Cell {
        match self.cells.get_mut(id) {
            Some(cell) => cell,
            None => panic!("cell {id} does not exist"),
        }
    }

    /// Returns the cell with the given ID, or `None` if it was removed.
    pub fn try_cell(&self, id: CellId) -> Option<&Cell> {
        self.cells.get(id)
    }

    /// Returns the net with the given ID.
    ///
    /// # Panics
    ///
    /// Panics if the net was removed.
    pub fn net(&self, id: NetId) -> &Net {
        match self.nets.get(id) {
            Some(net) => net,
            None => panic!("net {id} does not exist"),
        }
    }

    /// Returns the net with the given ID, or `None` if it was removed.
    pub fn try_net(&self, id: NetId) -> Option<&Net> {
        self.nets.get(id)
    }

    /// Iterates over live cells in creation order.
    pub fn cells(&self) -> impl Iterator<Item = (CellId, &Cell)> {
        self.cells.iter()
    }

    /// Returns the IDs of live cells in creation order.
    pub fn cell_ids(&self) -> Vec<CellId> {
        self.cells.ids()
    }

    /// Iterates over live nets in creation order.
    pub fn nets(&self) -> impl Iterator<Item = (NetId, &Net)> {
        self.nets.iter()
    }

    /// Returns the number of live cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Returns the number of live nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Returns the IDs of live cells of the given type, in creation order.
    pub fn cells_of_type(&self, cell_type: Ident) -> Vec<CellId> {
        self.cells
            .iter()
            .filter(|(_, c)| c.cell_type == cell_type)
            .map(|(id, _)| id)
            .collect()
    }

    /// Finds a live cell by name.
    pub fn find_cell(&self, name: &str) -> Option<CellId> {
        self.cells
            .iter()
            .find(|(_, c)| c.name == name)
            .map(|(id, _)| id)
    }

    /// Finds a live net by name.
    pub fn find_net(&self, name: &str) -> Option<NetId> {
        self.nets
            .iter()
            .find(|(_, n)| n.name == name)
            .map(|(id, _)| id)
    }

    /// Returns a fresh `base$N` name for a synthesized cell or net.
    pub fn unique_name(&mut self, base: &str) -> String {
        let name = format!("{base}${}", self.name_counter);
        self.name_counter += 1;
        name
    }

    fn cell_checked(&self, id: CellId) -> PackResult<&Cell> {
        self.cells
            .get(id)
            .ok_or_else(|| PackError::Invariant(format!("cell {id} does not exist")))
    }

    fn cell_checked_mut(&mut self, id: CellId) -> PackResult<&mut Cell> {
        self.cells
            .get_mut(id)
            .ok_or_else(|| PackError::Invariant(format!("cell {id} does not exist")))
    }

    fn net_checked_mut(&mut self, id: NetId) -> PackResult<&mut Net> {
        self.nets
            .get_mut(id)
            .ok_or_else(|| PackError::Invariant(format!("net {id} does not exist")))
    }

    fn port_checked(&self, cell: CellId, port: Ident) -> PackResult<&Port> {
        let c = self.cell_checked(cell)?;
        c.port(port).ok_or_else(|| {
            PackError::Invariant(format!(
                "cell '{}' has no port '{}'",
                c.name,
                self.interner.resolve(port)
            ))
        })
    }

    /// Adds a port to a cell. Adding an existing port with the same direction
    /// is a no-op.
    pub fn add_port(
        &mut self,
        cell: CellId,
        name: Ident,
        direction: PortDirection,
    ) -> PackResult<()> {
        let interner = self.interner;
        let c = self.cell_checked_mut(cell)?;
        match c.port(name) {
            Some(p) if p.direction == direction => Ok(()),
            Some(_) => Err(PackError::Invariant(format!(
                "port '{}.{}' already exists with a different direction",
                c.name,
                interner.resolve(name)
            ))),
            None => {
                c.ports.push(Port {
                    name,
                    direction,
                    net: None,
                });
                Ok(())
            }
        }
    }

    /// Removes an unconnected port from a cell.
    pub fn remove_port(&mut self, cell: CellId, name: Ident) -> PackResult<()> {
        if self.port_checked(cell, name)?.net.is_some() {
            return Err(PackError::Invariant(format!(
                "cannot remove connected port '{}.{}'",
                self.cell(cell).name,
                self.interner.resolve(name)
            )));
        }
        self.cell_mut(cell).ports.retain(|p| p.name != name);
        Ok(())
    }

    /// Renames a port, keeping its direction, position and connection.
    pub fn rename_port(&mut self, cell: CellId, old: Ident, new: Ident) -> PackResult<()> {
        if old == new {
            self.port_checked(cell, old)?;
            return Ok(());
        }
        let net = self.port_checked(cell, old)?.net;
        if self.cell(cell).port(new).is_some() {
            return Err(PackError::Invariant(format!(
                "cannot rename '{}.{}': port '{}' already exists",
                self.cell(cell).name,
                self.interner.resolve(old),
                self.interner.resolve(new)
            )));
        }
        if let Some(port) = self.cell_mut(cell).port_mut(old) {
            port.name = new;
        }
        if let Some(net) = net {
            let old_ref = PortRef { cell, port: old };
            let new_ref = PortRef { cell, port: new };
            let n = self.net_checked_mut(net)?;
            if n.driver == Some(old_ref) {
                n.driver = Some(new_ref);
            }
            for sink in n.sinks.iter_mut().filter(|s| **s == old_ref) {
                *sink = new_ref;
            }
        }
        Ok(())
    }

    /// Connects a cell port to a net.
    ///
    /// Reconnecting a port to the net it is already on is a no-op. A port on a
    /// different net fails with [`PackError::PortConflict`]; the caller must
    /// [`disconnect`](Self::disconnect) first. Output ports fail with
    /// [`PackError::Invariant`] when the net already has a driver or is a
    /// constant net.
    pub fn connect(&mut self, cell: CellId, port: Ident, net: NetId) -> PackResult<()> {
        let (direction, current) = {
            let p = self.port_checked(cell, port)?;
            (p.direction, p.net)
        };
        match current {
            Some(existing) if existing == net => return Ok(()),
            Some(existing) => {
                return Err(PackError::PortConflict {
                    cell: self.cell(cell).name.clone(),
                    port: self.interner.resolve(port).to_string(),
                    existing: self.net(existing).name.clone(),
                    requested: self.net_name_or_id(net),
                });
            }
            None => {}
        }
        let interner = self.interner;
        let cell_name = self.cell(cell).name.clone();
        let port_name = interner.resolve(port);
        let pref = PortRef { cell, port };
        let n = self.net_checked_mut(net)?;
        match direction {
            PortDirection::Out => {
                if n.constant.is_some() {
                    return Err(PackError::Invariant(format!(
                        "output '{cell_name}.{port_name}' cannot drive constant net '{}'",
                        n.name
                    )));
                }
                if n.driver.is_some() {
                    return Err(PackError::Invariant(format!(
                        "net '{}' already has a driver, cannot connect output '{cell_name}.{port_name}'",
                        n.name
                    )));
                }
                n.driver = Some(pref);
            }
            PortDirection::In | PortDirection::InOut => n.sinks.push(pref),
        }
        if let Some(p) = self.cell_mut(cell).port_mut(port) {
            p.net = Some(net);
        }
        Ok(())
    }

    fn net_name_or_id(&self, net: NetId) -> String {
        self.nets
            .get(net)
            .map_or_else(|| net.to_string(), |n| n.name.clone())
    }

    /// Disconnects a cell port, returning the net it was connected to.
    pub fn disconnect(&mut self, cell: CellId, port: Ident) -> PackResult<Option<NetId>> {
        let Some(net) = self.port_checked(cell, port)?.net else {
            return Ok(None);
        };
        let pref = PortRef { cell, port };
        let n = self.net_checked_mut(net)?;
        if n.driver == Some(pref) {
            n.driver = None;
        }
        n.sinks.retain(|s| *s != pref);
        if let Some(p) = self.cell_mut(cell).port_mut(port) {
            p.net = None;
        }
        Ok(Some(net))
    }

    /// Removes a cell. Fails if any port is still connected or if it is still
    /// part of a cluster.
    pub fn remove_cell(&mut self, id: CellId) -> PackResult<Cell> {
        let cell = self.cell_checked(id)?;
        if let Some(port) = cell.ports.iter().find(|p| p.net.is_some()) {
            return Err(PackError::Invariant(format!(
                "cannot remove cell '{}': port '{}' is still connected",
                cell.name,
                self.interner.resolve(port.name)
            )));
        }
        if cell.cluster.root.is_some() {
            return Err(PackError::Invariant(format!(
                "cannot remove cell '{}': it belongs to a cluster",
                cell.name
            )));
        }
        self.pending_removal.remove(&id);
        self.cells
            .remove(id)
            .ok_or_else(|| PackError::Invariant(format!("cell {id} does not exist")))
    }

    /// Removes a net. Fails if it still has a driver or any sink.
    pub fn remove_net(&mut self, id: NetId) -> PackResult<Net> {
        let net = self
            .nets
            .get(id)
            .ok_or_else(|| PackError::Invariant(format!("net {id} does not exist")))?;
        if !net.is_floating() {
            return Err(PackError::Invariant(format!(
                "cannot remove net '{}': it still has {} connection(s)",
                net.name,
                net.sinks.len() + usize::from(net.driver.is_some())
            )));
        }
        if self.gnd_net == Some(id) {
            self.gnd_net = None;
        }
        if self.vcc_net == Some(id) {
            self.vcc_net = None;
        }
        self.nets
            .remove(id)
            .ok_or_else(|| PackError::Invariant(format!("net {id} does not exist")))
    }

    /// Returns the net connected to a cell port.
    pub fn net_of(&self, cell: CellId, port: Ident) -> Option<NetId> {
        self.cells.get(cell)?.port_net(port)
    }

    /// Returns `true` if the cell has the port and it is connected.
    pub fn port_used(&self, cell: CellId, port: Ident) -> bool {
        self.net_of(cell, port).is_some()
    }

    /// Returns the cell driving `net` through `port`, if it matches `pred`.
    pub fn net_driven_by(
        &self,
        net: NetId,
        pred: impl Fn(&Cell) -> bool,
        port: Ident,
    ) -> Option<CellId> {
        let driver = self.nets.get(net)?.driver?;
        let cell = self.cells.get(driver.cell)?;
        (driver.port == port && pred(cell)).then_some(driver.cell)
    }

    /// Returns the first sink of `net` on `port` whose cell matches `pred`.
    ///
    /// With `exclusive`, the net must have exactly one sink.
    pub fn net_only_drives(
        &self,
        net: NetId,
        pred: impl Fn(&Cell) -> bool,
        port: Ident,
        exclusive: bool,
    ) -> Option<CellId> {
        let n = self.nets.get(net)?;
        if exclusive && n.sinks.len() != 1 {
            return None;
        }
        n.sinks
            .iter()
            .filter(|s| s.port == port)
            .find(|s| self.cells.get(s.cell).is_some_and(&pred))
            .map(|s| s.cell)
    }

    /// Returns the well-known constant net for `value`, creating it on first use.
    pub fn constant_net(&mut self, value: ConstValue) -> NetId {
        let existing = match value {
            ConstValue::Zero => self.gnd_net,
            ConstValue::One => self.vcc_net,
        };
        if let Some(id) = existing {
            return id;
        }
        let name = match value {
            ConstValue::Zero => GND_NET_NAME,
            ConstValue::One => VCC_NET_NAME,
        };
        let mut net = Net::new(name.to_string());
        net.constant = Some(value);
        let id = self.nets.alloc(net);
        match value {
            ConstValue::Zero => self.gnd_net = Some(id),
            ConstValue::One => self.vcc_net = Some(id),
        }
        id
    }

    /// Returns the constant tag of a net.
    pub fn const_value(&self, net: NetId) -> Option<ConstValue> {
        self.nets.get(net)?.constant
    }

    /// Queues a cell for removal by the next [`flush`](Self::flush).
    pub fn mark_for_removal(&mut self, cell: CellId) {
        if self.cells.contains(cell) {
            self.pending_removal.insert(cell);
        }
    }

    /// Returns `true` if the cell is queued for removal.
    pub fn is_marked_for_removal(&self, cell: CellId) -> bool {
        self.pending_removal.contains(&cell)
    }

    /// Disconnects and removes every queued cell, then removes the nets they
    /// left floating. Constant nets are kept. Returns the number of removed cells.
    pub fn flush(&mut self) -> PackResult<usize> {
        let queued = std::mem::take(&mut self.pending_removal);
        let mut touched = BTreeSet::new();
        for &cell in &queued {
            let ports: Vec<Ident> = self.cell_checked(cell)?.ports.iter().map(|p| p.name).collect();
            for port in ports {
                if let Some(net) = self.disconnect(cell, port)? {
                    touched.insert(net);
                }
            }
            self.remove_cell(cell)?;
        }
        for net in touched {
            let floating = self
                .nets
                .get(net)
                .is_some_and(|n| n.is_floating() && n.constant.is_none());
            if floating {
                self.remove_net(net)?;
            }
        }
        Ok(queued.len())
    }

    /// Computes a content hash over a canonical rendering of the netlist:
    /// names, types, ports, parameters, attributes, roles, cluster descriptors
    /// and net connectivity. Raw IDs do not contribute.
    pub fn fingerprint(&self) -> ContentHash {
        let mut text = String::new();
        let cell_name = |id: CellId| self.cells.get(id).map_or("?", |c| c.name.as_str());
        for (_, cell) in self.cells.iter() {
            let _ = writeln!(
                text,
                "cell {} {} {}",
                cell.name,
                self.interner.resolve(cell.cell_type),
                cell.role
            );
            if let Some(bel) = cell.bel {
                let _ = writeln!(text, "  bel {}", self.interner.resolve(bel));
            }
            for port in &cell.ports {
                let net = port
                    .net
                    .and_then(|n| self.nets.get(n))
                    .map_or("-", |n| n.name.as_str());
                let _ = writeln!(
                    text,
                    "  port {} {:?} {}",
                    self.interner.resolve(port.name),
                    port.direction,
                    net
                );
            }
            let mut params: Vec<(&str, String)> = cell
                .params
                .iter()
                .map(|(k, v)| (self.interner.resolve(*k), v.to_string()))
                .collect();
            params.sort();
            for (k, v) in params {
                let _ = writeln!(text, "  param {k} {v}");
            }
            let mut attrs: Vec<(&str, String)> = cell
                .attrs
                .iter()
                .map(|(k, v)| (self.interner.resolve(*k), v.to_string()))
                .collect();
            attrs.sort();
            for (k, v) in attrs {
                let _ = writeln!(text, "  attr {k} {v}");
            }
            let cl = &cell.cluster;
            if let Some(root) = cl.root {
                let _ = writeln!(
                    text,
                    "  cluster {} {} {} {} {}",
                    cell_name(root),
                    cl.dx,
                    cl.dy,
                    cl.dz,
                    cl.abs_z
                );
                for &child in &cl.children {
                    let _ = writeln!(text, "  child {}", cell_name(child));
                }
            }
        }
        for (_, net) in self.nets.iter() {
            let _ = writeln!(text, "net {} {:?}", net.name, net.constant);
            if let Some(d) = net.driver {
                let port = self.interner.resolve(d.port);
                let _ = writeln!(text, "  driver {}.{port}", cell_name(d.cell));
            }
            for s in &net.sinks {
                let port = self.interner.resolve(s.port);
                let _ = writeln!(text, "  sink {}.{port}", cell_name(s.cell));
            }
        }
        ContentHash::from_bytes(text.as_bytes())
    }
}

impl std::fmt::Debug for Netlist<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Netlist")
            .field("cells", &self.cells.len())
            .field("nets", &self.nets.len())
            .finish()
    }
}
