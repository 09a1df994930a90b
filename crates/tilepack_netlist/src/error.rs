//! Error types shared by every packing operation.

/// A fatal packing error.
///
/// Every variant reflects either an architecture-description bug or a netlist
/// the architecture cannot implement. Names are resolved so that the message
/// stands on its own.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PackError {
    /// A port is already connected to a different net.
    #[error(
        "port '{cell}.{port}' is already connected to net '{existing}', cannot connect it to '{requested}'"
    )]
    PortConflict {
        /// Cell name.
        cell: String,
        /// Port name.
        port: String,
        /// Net the port is connected to.
        existing: String,
        /// Net the caller tried to connect.
        requested: String,
    },

    /// A structural netlist invariant would be violated.
    #[error("netlist invariant violated: {0}")]
    Invariant(String),

    /// A cell lacks the truth-table parameter constant folding needs.
    #[error("cell '{cell}' has no usable truth-table parameter '{param}'")]
    MissingParameter {
        /// Cell name.
        cell: String,
        /// Parameter name.
        param: String,
    },

    /// No legal split exists for a chain under the fabric's limits.
    #[error(
        "chain cannot be split at cell '{cell}': tile capacity {tile_capacity}, maximum chain length {max_chain_length}"
    )]
    ChainTooLong {
        /// The cell that cannot start a viable segment.
        cell: String,
        /// The fabric's tile capacity.
        tile_capacity: usize,
        /// The fabric's maximum chain length.
        max_chain_length: usize,
    },

    /// A cell was claimed by two clusters.
    #[error(
        "cell '{cell}' already belongs to the cluster rooted at '{existing_root}', cannot add it to '{requested_root}'"
    )]
    ClusterConflict {
        /// Cell name.
        cell: String,
        /// Root of the cluster the cell belongs to.
        existing_root: String,
        /// Root of the cluster the caller tried to add it to.
        requested_root: String,
    },

    /// Two members of one cluster resolve to the same slot.
    #[error(
        "cells '{first}' and '{second}' of the cluster rooted at '{root}' both occupy slot {slot}"
    )]
    SlotCollision {
        /// Root cell name.
        root: String,
        /// First member at the slot.
        first: String,
        /// Second member at the slot.
        second: String,
        /// Rendered slot, e.g. `(0, 1, 3)`.
        slot: String,
    },

    /// A pass returned normally but reported error diagnostics.
    #[error("pass '{pass}' reported {errors} error(s)")]
    PassFailed {
        /// Name of the pass.
        pass: String,
        /// Error diagnostics the pass emitted.
        errors: usize,
    },
}

/// Convenience alias for results of packing operations.
pub type PackResult<T> = Result<T, PackError>;
