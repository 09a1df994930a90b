//! Packing pass runner and pass trait.
//!
//! Provides the [`PackPass`] trait for implementing packing passes and the
//! [`run_passes`] function that runs them in order over one netlist.

use tilepack_diagnostics::DiagnosticSink;
use tilepack_netlist::{Netlist, PackError, PackResult};

/// Trait for a single packing pass.
///
/// Each pass inspects and modifies the netlist, returning `true` if any
/// changes were made. Failures are fatal and stop the pipeline.
pub trait PackPass {
    /// Returns the pass name used in diagnostics.
    fn name(&self) -> &str;

    /// Runs the pass on the netlist, returning `true` if it made changes.
    fn run(&self, netlist: &mut Netlist<'_>, sink: &DiagnosticSink) -> PackResult<bool>;
}

/// Runs the passes in order, stopping at the first error.
///
/// A pass that returns `Ok` but emitted error diagnostics also stops the run,
/// with [`PackError::PassFailed`]. Errors already in the sink before the run
/// are not counted against any pass. Returns `true` if any pass changed the
/// netlist.
pub fn run_passes(
    passes: &[&dyn PackPass],
    netlist: &mut Netlist<'_>,
    sink: &DiagnosticSink,
) -> PackResult<bool> {
    let mut changed = false;
    for pass in passes {
        let before = sink.error_count();
        changed |= pass.run(netlist, sink)?;
        let errors = sink.error_count() - before;
        if errors > 0 {
            return Err(PackError::PassFailed {
                pass: pass.name().to_string(),
                errors,
            });
        }
    }
    Ok(changed)
}
