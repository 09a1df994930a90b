//! Chain legalization.
//!
//! A discovered chain may be longer than a tile, mix cells that cannot share
//! a tile, enter the chain fabric from general routing, or fan out of it at
//! interior nodes. [`legalize_chain`] splits it into placeable segments and
//! inserts boundary cells where the chain signal must cross between the chain
//! fabric and general routing:
//!
//! - a *feed-in* cell at the start of a segment whose chain input comes from
//!   general routing;
//! - a *pass-through* cell where an interior chain output also feeds
//!   general logic;
//! - a *pass-out* cell at the end of a segment whose chain output is still
//!   needed, which re-drives the original net from fabric routing.
//!
//! Tracing the chain signal through the boundary cells with [`trace_chain`]
//! recovers the original chain order.

use crate::chains::CellChain;
use std::collections::BTreeSet;
use tilepack_arch::{BoundaryTemplate, ChainFabric};
use tilepack_common::Ident;
use tilepack_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use tilepack_netlist::{CellId, CellRole, NetId, Netlist, PackError, PackResult, ParamValue};

const CHAIN_LEGALIZED: DiagnosticCode = DiagnosticCode::new(Category::Legalize, 1);
const UNDRIVEN_CHAIN_INPUT: DiagnosticCode = DiagnosticCode::new(Category::Legalize, 2);

/// Attribute naming the boundary role of a synthesized cell.
pub const BOUNDARY_ROLE_ATTR: &str = "BOUNDARY_ROLE";

/// One physically placeable piece of a chain.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChainSegment {
    /// Physical members in chain order, boundary cells included.
    pub members: Vec<CellId>,
    originals: usize,
}

impl ChainSegment {
    /// Returns the number of original chain cells in the segment.
    pub fn logical_len(&self) -> usize {
        self.originals
    }

    /// Returns the first physical member.
    pub fn root(&self) -> Option<CellId> {
        self.members.first().copied()
    }
}

/// The segments a chain was split into, in chain order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LegalizedChain {
    /// Segments in chain order.
    pub segments: Vec<ChainSegment>,
}

#[derive(Default)]
struct Inserted {
    feed_in: usize,
    pass_through: usize,
    pass_out: usize,
}

/// One netlist edit decided while scanning the chain.
#[derive(Clone, Copy, Debug)]
enum Step {
    FeedIn(CellId),
    PassThrough { prev: CellId, next: CellId },
    Member(CellId),
    PassOut(CellId),
    Close,
}

impl Step {
    fn role(self) -> Option<CellRole> {
        match self {
            Step::FeedIn(_) => Some(CellRole::FeedIn),
            Step::PassThrough { .. } => Some(CellRole::PassThrough),
            Step::PassOut(_) => Some(CellRole::PassOut),
            Step::Member(_) | Step::Close => None,
        }
    }
}

/// Splits `chain` into segments that satisfy the fabric's limits.
///
/// The tile window holds the original cells of the current segment; a split
/// happens when it exceeds the tile capacity, when the fabric rejects it as
/// incompatible, or when the segment would exceed the maximum chain length.
/// The length counts boundary cells, plus a slot for the pass-out a cell
/// would need if the segment ended on it, which is only reserved while the
/// cell's chain output is still used.
///
/// All splits are decided before the netlist is touched. Fails with
/// [`PackError::ChainTooLong`] if a cell cannot start a segment of its own,
/// and with [`PackError::Invariant`] if the chain's links are broken or the
/// fabric lacks a boundary cell it needs; in both cases the netlist is left
/// unchanged.
pub fn legalize_chain(
    netlist: &mut Netlist<'_>,
    fabric: &dyn ChainFabric,
    chain: &CellChain,
    sink: &DiagnosticSink,
) -> PackResult<LegalizedChain> {
    let ci = fabric.chain_in();
    let co = fabric.chain_out();
    check_links(netlist, chain, ci, co)?;
    let steps = plan_segments(netlist, fabric, chain, sink)?;
    check_templates(fabric, &steps)?;

    let mut result = LegalizedChain::default();
    let mut inserted = Inserted::default();
    let mut segment = ChainSegment::default();
    for step in steps {
        match step {
            Step::FeedIn(cell) => {
                segment.members.push(insert_feed_in(netlist, fabric, cell, ci)?);
                inserted.feed_in += 1;
            }
            Step::PassThrough { prev, next } => {
                let pt = insert_pass_through(netlist, fabric, prev, co, next, ci)?;
                segment.members.push(pt);
                inserted.pass_through += 1;
            }
            Step::Member(cell) => {
                segment.members.push(cell);
                segment.originals += 1;
            }
            Step::PassOut(tail) => {
                segment.members.push(insert_pass_out(netlist, fabric, tail, co)?);
                inserted.pass_out += 1;
            }
            Step::Close => result.segments.push(std::mem::take(&mut segment)),
        }
    }

    if let Some(head) = chain.head() {
        sink.emit(
            Diagnostic::note(
                CHAIN_LEGALIZED,
                format!(
                    "Legalized chain of {} cells into {} segment(s)",
                    chain.len(),
                    result.segments.len()
                ),
            )
            .with_subject(netlist.cell(head).name.clone())
            .with_note(format!(
                "inserted {} feed-in, {} pass-through, {} pass-out cell(s)",
                inserted.feed_in, inserted.pass_through, inserted.pass_out
            )),
        );
    }
    Ok(result)
}

/// Scans the chain left to right without editing the netlist.
///
/// Boundary cells only rewire nets at or behind the scan position, so the
/// feed-in and fan-out checks read the same answers the edited netlist would
/// give: after a split the next head's chain input is re-driven by the
/// pass-out, just as it was driven by the previous cell before.
fn plan_segments(
    netlist: &Netlist<'_>,
    fabric: &dyn ChainFabric,
    chain: &CellChain,
    sink: &DiagnosticSink,
) -> PackResult<Vec<Step>> {
    let ci = fabric.chain_in();
    let co = fabric.chain_out();
    let mut steps = Vec::new();
    let mut members = 0;
    let mut window: Vec<CellId> = Vec::new();
    let mut tail: Option<CellId> = None;
    let mut i = 0;
    while i < chain.cells.len() {
        let cell = chain.cells[i];
        let start = tail.is_none();
        if start {
            window.clear();
        }
        window.push(cell);

        let feed_in = start && needs_feed_in(netlist, cell, ci, sink);
        let pass_through = tail.is_some_and(|prev| fans_out(netlist, prev, co, cell, ci));
        let placed = members + usize::from(feed_in) + usize::from(pass_through) + 1;
        let reserve = usize::from(output_used(netlist, cell, co));
        let split = window.len() > fabric.tile_capacity()
            || !fabric.compatible(netlist, &window)
            || placed + reserve > fabric.max_chain_length();

        if split {
            window.pop();
            let Some(prev) = tail else {
                return Err(PackError::ChainTooLong {
                    cell: netlist.cell(cell).name.clone(),
                    tile_capacity: fabric.tile_capacity(),
                    max_chain_length: fabric.max_chain_length(),
                });
            };
            steps.extend([Step::PassOut(prev), Step::Close]);
            members = 0;
            tail = None;
            continue;
        }

        if feed_in {
            steps.push(Step::FeedIn(cell));
        }
        if let (true, Some(prev)) = (pass_through, tail) {
            steps.push(Step::PassThrough { prev, next: cell });
        }
        steps.push(Step::Member(cell));
        members = placed;
        tail = Some(cell);
        i += 1;
    }

    if let Some(last) = tail {
        if output_used(netlist, last, co) {
            steps.push(Step::PassOut(last));
        }
        steps.push(Step::Close);
    }
    Ok(steps)
}

/// Whether `cell`'s chain output net has any sinks.
fn output_used(netlist: &Netlist<'_>, cell: CellId, co: Ident) -> bool {
    netlist
        .net_of(cell, co)
        .is_some_and(|net| !netlist.net(net).sinks.is_empty())
}

/// Fails before any edit if a planned boundary cell has no usable template.
fn check_templates(fabric: &dyn ChainFabric, steps: &[Step]) -> PackResult<()> {
    for role in steps.iter().filter_map(|s| s.role()) {
        let template = boundary_template(fabric, role)?;
        if role != CellRole::PassOut {
            required(template.chain_output, fabric, role, "chain output")?;
        }
        if role != CellRole::FeedIn {
            required(template.fabric_output, fabric, role, "fabric output")?;
        }
    }
    Ok(())
}

fn check_links(netlist: &Netlist<'_>, chain: &CellChain, ci: Ident, co: Ident) -> PackResult<()> {
    for pair in chain.cells.windows(2) {
        let out = netlist.net_of(pair[0], co);
        if out.is_none() || out != netlist.net_of(pair[1], ci) {
            return Err(PackError::Invariant(format!(
                "chain link from '{}' to '{}' is broken",
                netlist.cell(pair[0]).name,
                netlist.cell(pair[1]).name
            )));
        }
    }
    Ok(())
}

/// A segment head needs a feed-in when its chain input is driven from
/// general routing.
fn needs_feed_in(netlist: &Netlist<'_>, cell: CellId, ci: Ident, sink: &DiagnosticSink) -> bool {
    let Some(net) = netlist.net_of(cell, ci) else {
        return false;
    };
    let n = netlist.net(net);
    if n.constant.is_some() {
        return false;
    }
    if n.driver.is_none() {
        sink.emit(
            Diagnostic::warning(
                UNDRIVEN_CHAIN_INPUT,
                format!("chain input is connected to undriven net '{}'", n.name),
            )
            .with_subject(netlist.cell(cell).name.clone())
            .with_help("no feed-in cell is inserted for an undriven net"),
        );
        return false;
    }
    true
}

/// Returns `true` if `prev`'s chain output reaches anything besides `next`'s
/// chain input.
fn fans_out(netlist: &Netlist<'_>, prev: CellId, co: Ident, next: CellId, ci: Ident) -> bool {
    netlist.net_of(prev, co).is_some_and(|net| {
        netlist
            .net(net)
            .sinks
            .iter()
            .any(|s| s.cell != next || s.port != ci)
    })
}

fn boundary_cell<'f>(
    netlist: &mut Netlist<'_>,
    fabric: &'f dyn ChainFabric,
    role: CellRole,
    anchor: CellId,
) -> PackResult<(CellId, &'f BoundaryTemplate)> {
    let template = boundary_template(fabric, role)?;
    let base = format!(
        "{}${}",
        netlist.cell(anchor).name,
        role.marker().replace('-', "_")
    );
    let name = netlist.unique_name(&base);
    let cell = template.cell.instantiate(netlist, name)?;
    let interner = netlist.interner;
    let c = netlist.cell_mut(cell);
    c.role = role;
    c.attrs.insert(
        interner.get_or_intern(BOUNDARY_ROLE_ATTR),
        ParamValue::Str(role.marker().to_string()),
    );
    Ok((cell, template))
}

fn boundary_template(
    fabric: &dyn ChainFabric,
    role: CellRole,
) -> PackResult<&BoundaryTemplate> {
    fabric.boundary(role).ok_or_else(|| {
        PackError::Invariant(format!(
            "fabric '{}' has no {} cell",
            fabric.family_name(),
            role.marker()
        ))
    })
}

fn required(
    port: Option<Ident>,
    fabric: &dyn ChainFabric,
    role: CellRole,
    which: &str,
) -> PackResult<Ident> {
    port.ok_or_else(|| {
        PackError::Invariant(format!(
            "{} cell of fabric '{}' has no {which} port",
            role.marker(),
            fabric.family_name()
        ))
    })
}

fn link_net(netlist: &mut Netlist<'_>, cell: CellId) -> NetId {
    let base = format!("{}$chain", netlist.cell(cell).name);
    let name = netlist.unique_name(&base);
    netlist.create_net(name)
}

fn detach(netlist: &mut Netlist<'_>, cell: CellId, port: Ident) -> PackResult<NetId> {
    netlist.disconnect(cell, port)?.ok_or_else(|| {
        PackError::Invariant(format!(
            "port '{}.{}' is not connected",
            netlist.cell(cell).name,
            netlist.interner.resolve(port)
        ))
    })
}

/// Moves `cell`'s chain input onto a feed-in cell reading the old net.
fn insert_feed_in(
    netlist: &mut Netlist<'_>,
    fabric: &dyn ChainFabric,
    cell: CellId,
    ci: Ident,
) -> PackResult<CellId> {
    let (fi, template) = boundary_cell(netlist, fabric, CellRole::FeedIn, cell)?;
    let chain_output = required(template.chain_output, fabric, CellRole::FeedIn, "chain output")?;
    let external = detach(netlist, cell, ci)?;
    netlist.connect(fi, template.input, external)?;
    let link = link_net(netlist, fi);
    netlist.connect(fi, chain_output, link)?;
    netlist.connect(cell, ci, link)?;
    Ok(fi)
}

/// Terminates a segment after `tail`: the pass-out takes the chain output and
/// re-drives the original net from fabric routing.
fn insert_pass_out(
    netlist: &mut Netlist<'_>,
    fabric: &dyn ChainFabric,
    tail: CellId,
    co: Ident,
) -> PackResult<CellId> {
    let (po, template) = boundary_cell(netlist, fabric, CellRole::PassOut, tail)?;
    let fabric_output =
        required(template.fabric_output, fabric, CellRole::PassOut, "fabric output")?;
    let original = detach(netlist, tail, co)?;
    let link = link_net(netlist, tail);
    netlist.connect(tail, co, link)?;
    netlist.connect(po, template.input, link)?;
    netlist.connect(po, fabric_output, original)?;
    Ok(po)
}

/// Splices a pass-through between `prev` and `next`: the original net keeps
/// its other sinks, driven by the fabric output, while `next` reads the chain
/// output.
fn insert_pass_through(
    netlist: &mut Netlist<'_>,
    fabric: &dyn ChainFabric,
    prev: CellId,
    co: Ident,
    next: CellId,
    ci: Ident,
) -> PackResult<CellId> {
    let role = CellRole::PassThrough;
    let (pt, template) = boundary_cell(netlist, fabric, role, prev)?;
    let chain_output = required(template.chain_output, fabric, role, "chain output")?;
    let fabric_output = required(template.fabric_output, fabric, role, "fabric output")?;
    let original = detach(netlist, prev, co)?;
    let link_in = link_net(netlist, prev);
    netlist.connect(prev, co, link_in)?;
    netlist.connect(pt, template.input, link_in)?;
    netlist.connect(pt, fabric_output, original)?;
    netlist.disconnect(next, ci)?;
    let link_out = link_net(netlist, pt);
    netlist.connect(pt, chain_output, link_out)?;
    netlist.connect(next, ci, link_out)?;
    Ok(pt)
}

/// Follows the chain signal from `first` through boundary cells and returns
/// the original chain cells visited, in order.
///
/// Chain cells continue through their chain output. Boundary cells continue
/// through their chain output when it is connected and their fabric output
/// otherwise. On each net, a chain cell's chain input is preferred over a
/// boundary cell's input.
pub fn trace_chain(netlist: &Netlist<'_>, fabric: &dyn ChainFabric, first: CellId) -> Vec<CellId> {
    let ci = fabric.chain_in();
    let co = fabric.chain_out();
    let mut order = Vec::new();
    let mut visited = BTreeSet::new();
    let mut cursor = Some(first);
    while let Some(current) = cursor {
        if !visited.insert(current) {
            break;
        }
        let cell = netlist.cell(current);
        let out = match cell.role {
            CellRole::Normal => {
                order.push(current);
                netlist.net_of(current, co)
            }
            role => fabric.boundary(role).and_then(|t| {
                t.chain_output
                    .and_then(|p| netlist.net_of(current, p))
                    .or_else(|| t.fabric_output.and_then(|p| netlist.net_of(current, p)))
            }),
        };
        cursor = out.and_then(|net| next_on_net(netlist, fabric, net, ci));
    }
    order
}

fn next_on_net(
    netlist: &Netlist<'_>,
    fabric: &dyn ChainFabric,
    net: NetId,
    ci: Ident,
) -> Option<CellId> {
    let sinks = &netlist.net(net).sinks;
    sinks
        .iter()
        .find(|s| s.port == ci && fabric.is_chain_cell(netlist.cell(s.cell)))
        .or_else(|| {
            sinks.iter().find(|s| {
                let role = netlist.cell(s.cell).role;
                fabric.boundary(role).is_some_and(|t| t.input == s.port)
            })
        })
        .map(|s| s.cell)
}
