//! Cell and net handles.
//!
//! Both are slot indices into the [`Netlist`](crate::Netlist) arenas and order
//! by creation. A removed cell's handle is never reused.

use crate::arena::ArenaId;
use serde::{Deserialize, Serialize};

macro_rules! define_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
        pub struct $name(u32);

        impl $name {
            /// Wraps an arena slot index.
            pub fn from_raw(index: u32) -> Self {
                Self(index)
            }

            /// The arena slot index.
            pub fn as_raw(self) -> u32 {
                self.0
            }
        }

        impl ArenaId for $name {
            fn from_raw(index: u32) -> Self {
                $name::from_raw(index)
            }

            fn as_raw(self) -> u32 {
                $name::as_raw(self)
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

define_id!(
    /// Handle to a cell, displayed as `c<index>`.
    CellId, "c"
);

define_id!(
    /// Handle to a net, displayed as `n<index>`.
    NetId, "n"
);
