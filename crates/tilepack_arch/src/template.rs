//! Data-described cell templates for synthesized cells.

use std::collections::BTreeMap;
use tilepack_common::{Ident, Interner};
use tilepack_config::{BoundaryCellConfig, ParamConfig};
use tilepack_netlist::{CellId, Netlist, PackResult, ParamValue, PortDirection};

/// Converts a configured parameter value into a [`ParamValue`].
pub fn param_value(config: &ParamConfig) -> ParamValue {
    match config {
        ParamConfig::Int(v) => ParamValue::Int(*v),
        ParamConfig::Text(s) => ParamValue::parse(s),
    }
}

/// Interns the keys of a configured parameter table.
pub fn param_table(
    table: &BTreeMap<String, ParamConfig>,
    interner: &Interner,
) -> BTreeMap<Ident, ParamValue> {
    table
        .iter()
        .map(|(k, v)| (interner.get_or_intern(k), param_value(v)))
        .collect()
}

/// A cell type with its port list and fixed parameters.
#[derive(Clone, Debug)]
pub struct CellTemplate {
    /// Physical type of instances.
    pub cell_type: Ident,
    /// Ports in declaration order.
    pub ports: Vec<(Ident, PortDirection)>,
    /// Parameters set on every instance.
    pub params: BTreeMap<Ident, ParamValue>,
}

impl CellTemplate {
    /// Creates an unconnected instance named `name`.
    pub fn instantiate(&self, netlist: &mut Netlist<'_>, name: String) -> PackResult<CellId> {
        let cell = netlist.create_cell(self.cell_type, name);
        for &(port, direction) in &self.ports {
            netlist.add_port(cell, port, direction)?;
        }
        netlist.cell_mut(cell).params = self.params.clone();
        Ok(cell)
    }
}

/// A boundary cell: a template plus the roles of its ports.
///
/// The `input` port receives the signal carried across the boundary;
/// `chain_output` drives the next chain member's chain input and
/// `fabric_output` re-drives the signal into general routing.
#[derive(Clone, Debug)]
pub struct BoundaryTemplate {
    /// The cell to instantiate.
    pub cell: CellTemplate,
    /// Input port.
    pub input: Ident,
    /// Chain-side output port.
    pub chain_output: Option<Ident>,
    /// Fabric-side output port.
    pub fabric_output: Option<Ident>,
}

impl BoundaryTemplate {
    /// Builds a template from its configuration.
    pub fn from_config(config: &BoundaryCellConfig, interner: &Interner) -> Self {
        let input = interner.get_or_intern(&config.input);
        let chain_output = config.chain_output.as_deref().map(|p| interner.get_or_intern(p));
        let fabric_output = config
            .fabric_output
            .as_deref()
            .map(|p| interner.get_or_intern(p));
        let mut ports = vec![(input, PortDirection::In)];
        ports.extend(chain_output.map(|p| (p, PortDirection::Out)));
        ports.extend(fabric_output.map(|p| (p, PortDirection::Out)));
        Self {
            cell: CellTemplate {
                cell_type: interner.get_or_intern(&config.cell_type),
                ports,
                params: param_table(&config.params, interner),
            },
            input,
            chain_output,
            fabric_output,
        }
    }
}
