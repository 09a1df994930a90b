//! Chain discovery over the net graph.
//!
//! [`find_chains`] partitions the cells matching a predicate into maximal
//! ordered chains using a pair of navigation functions. [`carry_navigators`]
//! builds the usual pair for cells linked through a chain-in/chain-out port.

use std::collections::BTreeSet;
use tilepack_common::Ident;
use tilepack_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tilepack_netlist::{Cell, CellId, Netlist};

const CHAIN_FOUND: DiagnosticCode = DiagnosticCode::new(Category::Chain, 1);

/// An ordered sequence of cells linked head to tail.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CellChain {
    /// Members in chain order.
    pub cells: Vec<CellId>,
}

impl CellChain {
    /// Returns the number of cells in the chain.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// Returns `true` if the chain has no cells.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Returns the first cell.
    pub fn head(&self) -> Option<CellId> {
        self.cells.first().copied()
    }
}

/// Finds every maximal chain of cells matching `predicate`.
///
/// Cells are visited in netlist order. For each unchained match, the walk
/// goes back through `get_previous` to the chain start, stopping at a cell
/// with no predecessor, an already-chained predecessor, a revisited cell, or a
/// predecessor whose `get_next` is not the current cell. It then collects
/// cells forward through `get_next` until it returns `None` or a cell already
/// chained or collected. Chains shorter than `min_length` are dropped and
/// their cells stay available.
pub fn find_chains<P, G, N>(
    netlist: &Netlist<'_>,
    predicate: P,
    get_previous: G,
    get_next: N,
    min_length: usize,
    sink: &DiagnosticSink,
) -> Vec<CellChain>
where
    P: Fn(&Cell) -> bool,
    G: Fn(&Netlist<'_>, CellId) -> Option<CellId>,
    N: Fn(&Netlist<'_>, CellId) -> Option<CellId>,
{
    let mut chained: BTreeSet<CellId> = BTreeSet::new();
    let mut chains = Vec::new();
    for (id, cell) in netlist.cells() {
        if chained.contains(&id) || !predicate(cell) {
            continue;
        }

        let mut start = id;
        let mut seen = BTreeSet::from([id]);
        while let Some(prev) = get_previous(netlist, start) {
            if chained.contains(&prev)
                || !seen.insert(prev)
                || get_next(netlist, prev) != Some(start)
            {
                break;
            }
            start = prev;
        }

        let mut chain = CellChain::default();
        let mut collected = BTreeSet::new();
        let mut cursor = Some(start);
        while let Some(c) = cursor {
            if chained.contains(&c) || !collected.insert(c) {
                break;
            }
            chain.cells.push(c);
            cursor = get_next(netlist, c);
        }

        if chain.is_empty() || chain.len() < min_length {
            continue;
        }
        chained.extend(chain.cells.iter().copied());
        sink.emit(Diagnostic::note(
            CHAIN_FOUND,
            format!(
                "Found chain of {} cells starting at {}",
                chain.len(),
                netlist.cell(start).name
            ),
        ));
        chains.push(chain);
    }
    chains
}

/// Navigation through a chain-in/chain-out port pair.
#[derive(Clone, Debug)]
pub struct CarryNavigator<F> {
    chain_in: Ident,
    chain_out: Ident,
    predicate: F,
}

/// Builds the standard navigator for cells linked `chain_out -> chain_in`.
pub fn carry_navigators<F>(chain_in: Ident, chain_out: Ident, predicate: F) -> CarryNavigator<F>
where
    F: Fn(&Cell) -> bool,
{
    CarryNavigator {
        chain_in,
        chain_out,
        predicate,
    }
}

impl<F> CarryNavigator<F>
where
    F: Fn(&Cell) -> bool,
{
    /// Returns the matching cell driving this cell's chain input from its
    /// chain output.
    pub fn previous(&self, netlist: &Netlist<'_>, cell: CellId) -> Option<CellId> {
        let net = netlist.net_of(cell, self.chain_in)?;
        netlist.net_driven_by(net, &self.predicate, self.chain_out)
    }

    /// Returns the first matching cell reading this cell's chain output on
    /// its chain input. Other sinks of the net are allowed.
    pub fn next(&self, netlist: &Netlist<'_>, cell: CellId) -> Option<CellId> {
        let net = netlist.net_of(cell, self.chain_out)?;
        netlist.net_only_drives(net, &self.predicate, self.chain_in, false)
    }
}

/// Wraps every cell matching `predicate` that is in none of `chains` as a
/// single-cell chain.
pub fn singleton_chains(
    netlist: &Netlist<'_>,
    predicate: impl Fn(&Cell) -> bool,
    chains: &[CellChain],
) -> Vec<CellChain> {
    let chained: BTreeSet<CellId> = chains.iter().flat_map(|c| c.cells.iter().copied()).collect();
    netlist
        .cells()
        .filter(|(id, cell)| !chained.contains(id) && predicate(cell))
        .map(|(id, _)| CellChain { cells: vec![id] })
        .collect()
}
