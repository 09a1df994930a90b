//! Packing core for the tilepack FPGA toolchain.
//!
//! This crate turns a generic netlist into physical cells carrying the
//! cluster constraints a placer must honor. The passes run in this order:
//! 1. **Normalization**: constant nets are canonicalized, constant truth-table
//!    inputs folded and dead logic pruned
//! 2. **Rewriting**: abstract cell types are retargeted by declarative rules
//! 3. **Chain packing**: chains are discovered, legalized against the
//!    fabric's tile limits and constrained into clusters
//!
//! # Usage
//!
//! ```ignore
//! use tilepack_pack::{pack_chains, normalize, NormalizeOptions};
//! normalize(&mut netlist, &NormalizeOptions::from_config(&config, &interner), &sink)?;
//! let segments = pack_chains(&mut netlist, &fabric, &sink)?;
//! ```

#![warn(missing_docs)]

pub mod chains;
pub mod cluster;
pub mod legalize;
pub mod normalize;
pub mod pass;
pub mod rewrite;

pub use chains::{carry_navigators, find_chains, singleton_chains, CarryNavigator, CellChain};
pub use cluster::{
    build_cluster, check_cluster, cluster_views, constrain_chain_segment, constrain_pairs,
    ClusterOffset, ClusterView,
};
pub use legalize::{legalize_chain, trace_chain, ChainSegment, LegalizedChain, BOUNDARY_ROLE_ATTR};
pub use normalize::{
    fold_constant_input, fold_constant_inputs, merge_constant_drivers, normalize,
    prune_dead_outputs, LutShape, NormalizeOptions, NormalizePass, NormalizeReport,
};
pub use pass::{run_passes, PackPass};
pub use rewrite::{generic_xform, xform_cell, RewritePass, RewriteRule, RuleSet, XformSummary};

use tilepack_arch::ChainFabric;
use tilepack_diagnostics::DiagnosticSink;
use tilepack_netlist::{Cell, Netlist, PackResult};

/// Discovers, legalizes and clusters every chain of the fabric.
///
/// Cells that already belong to a cluster are not considered, so running
/// this twice packs nothing the second time. Returns the segments in the
/// order they were produced; each segment's first member is its cluster root.
pub fn pack_chains(
    netlist: &mut Netlist<'_>,
    fabric: &dyn ChainFabric,
    sink: &DiagnosticSink,
) -> PackResult<Vec<ChainSegment>> {
    let eligible = |c: &Cell| fabric.is_chain_cell(c) && c.cluster.root.is_none();
    let nav = carry_navigators(fabric.chain_in(), fabric.chain_out(), eligible);
    let chains = find_chains(
        netlist,
        eligible,
        |nl, c| nav.previous(nl, c),
        |nl, c| nav.next(nl, c),
        fabric.min_length(),
        sink,
    );

    let mut segments = Vec::new();
    for chain in &chains {
        let legal = legalize_chain(netlist, fabric, chain, sink)?;
        for segment in legal.segments {
            constrain_chain_segment(netlist, &segment.members, fabric.slots_per_tile())?;
            segments.push(segment);
        }
    }
    Ok(segments)
}

/// [`pack_chains`] as a [`PackPass`].
pub struct ChainPackPass<F> {
    /// The chain fabric to pack for.
    pub fabric: F,
}

impl<F: ChainFabric> PackPass for ChainPackPass<F> {
    fn name(&self) -> &str {
        self.fabric.family_name()
    }

    fn run(&self, netlist: &mut Netlist<'_>, sink: &DiagnosticSink) -> PackResult<bool> {
        Ok(!pack_chains(netlist, &self.fabric, sink)?.is_empty())
    }
}
