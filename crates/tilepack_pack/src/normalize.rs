//! Constant and dead-logic normalization.
//!
//! Canonicalizes constant-valued signals before chain discovery runs:
//! nets driven by tie cells are merged into the well-known constant nets,
//! constant truth-table inputs are folded into the table, and logic with no
//! observable effect is pruned. [`normalize`] repeats these steps until
//! nothing changes, so applying it to its own output is a no-op.

use crate::pass::PackPass;
use std::collections::{BTreeMap, BTreeSet};
use tilepack_common::{Ident, Interner, LogicVec};
use tilepack_config::PackConfig;
use tilepack_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tilepack_netlist::{
    CellId, ConstValue, Netlist, PackError, PackResult, ParamValue, PortDirection,
};

const NORMALIZE_SUMMARY: DiagnosticCode = DiagnosticCode::new(Category::Normalize, 1);
const CONSTANT_MERGED: DiagnosticCode = DiagnosticCode::new(Category::Normalize, 2);

/// Where a truth-table cell keeps its table and which ports select rows.
#[derive(Clone, Debug)]
pub struct LutShape {
    /// Parameter holding the `2^k` bit table.
    pub param: Ident,
    /// Input ports, least significant select bit first.
    pub inputs: Vec<Ident>,
}

impl LutShape {
    /// Number of rows in the truth table.
    pub fn rows(&self) -> u32 {
        1 << self.inputs.len()
    }
}

/// Settings for the normalizer.
#[derive(Clone, Debug, Default)]
pub struct NormalizeOptions {
    /// Truth-table shapes keyed by cell type.
    pub lut_shapes: BTreeMap<Ident, LutShape>,
    /// Cell types never pruned, such as I/O buffers.
    pub keep_types: BTreeSet<Ident>,
    /// Cell types driving logic 0.
    pub gnd_driver_types: BTreeSet<Ident>,
    /// Cell types driving logic 1.
    pub vcc_driver_types: BTreeSet<Ident>,
}

impl NormalizeOptions {
    /// Builds the options from the `[lut.*]` and `[normalize]` sections.
    pub fn from_config(config: &PackConfig, interner: &Interner) -> Self {
        let intern_all = |names: &[String]| -> BTreeSet<Ident> {
            names.iter().map(|n| interner.get_or_intern(n)).collect()
        };
        Self {
            lut_shapes: config
                .lut
                .iter()
                .map(|(ty, shape)| {
                    let shape = LutShape {
                        param: interner.get_or_intern(&shape.param),
                        inputs: shape.inputs.iter().map(|p| interner.get_or_intern(p)).collect(),
                    };
                    (interner.get_or_intern(ty), shape)
                })
                .collect(),
            keep_types: intern_all(&config.normalize.keep_types),
            gnd_driver_types: intern_all(&config.normalize.gnd_driver_types),
            vcc_driver_types: intern_all(&config.normalize.vcc_driver_types),
        }
    }

    fn tie_value(&self, cell_type: Ident) -> Option<ConstValue> {
        if self.gnd_driver_types.contains(&cell_type) {
            Some(ConstValue::Zero)
        } else if self.vcc_driver_types.contains(&cell_type) {
            Some(ConstValue::One)
        } else {
            None
        }
    }
}

/// What one [`normalize`] run changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NormalizeReport {
    /// Tie-cell nets merged into a constant net.
    pub merged_nets: usize,
    /// Truth-table inputs folded.
    pub folded_inputs: usize,
    /// Output ports disconnected because nothing read them.
    pub pruned_ports: usize,
    /// Cells removed.
    pub removed_cells: usize,
}

impl NormalizeReport {
    /// Returns `true` if nothing changed.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Moves every sink of a tie-cell driven net onto the matching constant net,
/// then removes the net and queues the tie cell for removal.
///
/// Returns the number of merged nets.
pub fn merge_constant_drivers(
    netlist: &mut Netlist<'_>,
    options: &NormalizeOptions,
) -> PackResult<usize> {
    let mut merged = 0;
    for cell in netlist.cell_ids() {
        let Some(value) = options.tie_value(netlist.cell(cell).cell_type) else {
            continue;
        };
        let outputs: Vec<_> = netlist.cell(cell).outputs().collect();
        let constant = netlist.constant_net(value);
        for (port, net) in outputs {
            let sinks = netlist.net(net).sinks.clone();
            for sink in sinks {
                netlist.disconnect(sink.cell, sink.port)?;
                netlist.connect(sink.cell, sink.port, constant)?;
            }
            netlist.disconnect(cell, port)?;
            netlist.remove_net(net)?;
            merged += 1;
        }
        netlist.mark_for_removal(cell);
    }
    Ok(merged)
}

/// Folds one constant-driven input of a truth-table cell into its table.
///
/// Every row of the new table reads the row of the old table whose select bit
/// for `port` equals the constant, so the table no longer depends on that
/// input. The port is then disconnected. Returns `false` without changes when
/// the port is not on a constant net or is not a truth-table input.
///
/// Fails with [`PackError::MissingParameter`] when the cell's type has no
/// known shape or the table parameter is absent or malformed.
pub fn fold_constant_input(
    netlist: &mut Netlist<'_>,
    options: &NormalizeOptions,
    cell: CellId,
    port: Ident,
) -> PackResult<bool> {
    let Some(value) = netlist.net_of(cell, port).and_then(|n| netlist.const_value(n)) else {
        return Ok(false);
    };
    let interner = netlist.interner;
    let c = netlist.cell(cell);
    let Some(shape) = options.lut_shapes.get(&c.cell_type) else {
        return Err(PackError::MissingParameter {
            cell: c.name.clone(),
            param: format!("truth table of {}", interner.resolve(c.cell_type)),
        });
    };
    let Some(bit) = shape.inputs.iter().position(|&p| p == port) else {
        return Ok(false);
    };
    let missing = || PackError::MissingParameter {
        cell: c.name.clone(),
        param: interner.resolve(shape.param).to_string(),
    };
    let original = c.params.get(&shape.param).ok_or_else(missing)?;
    let table = original.to_bits(shape.rows()).ok_or_else(missing)?;

    let select = 1u32 << bit;
    let mut folded = LogicVec::new(table.width());
    for row in 0..table.width() {
        let source = if value.as_bool() { row | select } else { row & !select };
        folded.set(row, table.get(source));
    }
    let folded = match (original, folded.to_u64()) {
        (ParamValue::Int(_), Some(v)) if table.width() <= 64 => ParamValue::Int(v as i64),
        _ => ParamValue::Bits(folded),
    };

    let param = shape.param;
    netlist.cell_mut(cell).params.insert(param, folded);
    netlist.disconnect(cell, port)?;
    Ok(true)
}

/// Folds every constant-driven truth-table input of one cell.
///
/// Returns the number of folded inputs.
pub fn fold_constant_inputs(
    netlist: &mut Netlist<'_>,
    options: &NormalizeOptions,
    cell: CellId,
) -> PackResult<usize> {
    let constant_inputs: Vec<Ident> = netlist
        .cell(cell)
        .ports
        .iter()
        .filter(|p| p.direction == PortDirection::In)
        .filter(|p| p.net.is_some_and(|n| netlist.const_value(n).is_some()))
        .map(|p| p.name)
        .collect();
    let mut folded = 0;
    for port in constant_inputs {
        if fold_constant_input(netlist, options, cell, port)? {
            folded += 1;
        }
    }
    Ok(folded)
}

/// Disconnects output ports whose net has no sinks and queues cells left with
/// no observable output for removal.
///
/// Cells of a `keep_types` type and cells that never had an output port are
/// treated as side-effecting and kept. Returns the number of pruned ports.
pub fn prune_dead_outputs(
    netlist: &mut Netlist<'_>,
    options: &NormalizeOptions,
) -> PackResult<usize> {
    let mut pruned = 0;
    for cell in netlist.cell_ids() {
        let c = netlist.cell(cell);
        if options.keep_types.contains(&c.cell_type) || netlist.is_marked_for_removal(cell) {
            continue;
        }
        let has_outputs = c.ports.iter().any(|p| p.direction == PortDirection::Out);
        let dead: Vec<_> = c
            .outputs()
            .filter(|&(_, net)| netlist.net(net).sinks.is_empty())
            .collect();
        for (port, net) in dead {
            netlist.disconnect(cell, port)?;
            if netlist.net(net).is_floating() {
                netlist.remove_net(net)?;
            }
            pruned += 1;
        }
        if has_outputs && netlist.cell(cell).outputs().next().is_none() {
            netlist.mark_for_removal(cell);
        }
    }
    Ok(pruned)
}

/// Runs merge, fold, prune and flush until a fixed point is reached.
pub fn normalize(
    netlist: &mut Netlist<'_>,
    options: &NormalizeOptions,
    sink: &DiagnosticSink,
) -> PackResult<NormalizeReport> {
    let mut report = NormalizeReport::default();
    loop {
        let mut round = NormalizeReport {
            merged_nets: merge_constant_drivers(netlist, options)?,
            ..NormalizeReport::default()
        };
        if round.merged_nets > 0 {
            sink.emit(Diagnostic::note(
                CONSTANT_MERGED,
                format!("merged {} tie-cell net(s) into constant nets", round.merged_nets),
            ));
        }
        for cell in netlist.cell_ids() {
            let cell_type = netlist.cell(cell).cell_type;
            if options.lut_shapes.contains_key(&cell_type) && !netlist.is_marked_for_removal(cell) {
                round.folded_inputs += fold_constant_inputs(netlist, options, cell)?;
            }
        }
        round.pruned_ports = prune_dead_outputs(netlist, options)?;
        round.removed_cells = netlist.flush()?;

        if round.is_empty() {
            break;
        }
        report.merged_nets += round.merged_nets;
        report.folded_inputs += round.folded_inputs;
        report.pruned_ports += round.pruned_ports;
        report.removed_cells += round.removed_cells;
    }
    if !report.is_empty() {
        sink.emit(Diagnostic::note(
            NORMALIZE_SUMMARY,
            format!(
                "folded {} constant input(s), pruned {} dead output(s), removed {} cell(s)",
                report.folded_inputs, report.pruned_ports, report.removed_cells
            ),
        ));
    }
    Ok(report)
}

/// [`normalize`] as a [`PackPass`].
pub struct NormalizePass {
    /// Normalizer settings.
    pub options: NormalizeOptions,
}

impl PackPass for NormalizePass {
    fn name(&self) -> &str {
        "normalize"
    }

    fn run(&self, netlist: &mut Netlist<'_>, sink: &DiagnosticSink) -> PackResult<bool> {
        Ok(!normalize(netlist, &self.options, sink)?.is_empty())
    }
}
