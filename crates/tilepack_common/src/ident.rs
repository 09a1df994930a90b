//! Interned names for cell types, ports, parameters and attributes.

use lasso::ThreadedRodeo;
use serde::{Deserialize, Serialize};

/// An interned name.
///
/// Cell types, port names, parameter and attribute keys are all `Ident`s, so
/// comparing two port names never touches string data. Ordering follows
/// interning order, which is deterministic for a fixed sequence of
/// [`Interner::get_or_intern`] calls.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
pub struct Ident(u32);

impl Ident {
    /// Wraps a raw interner index. Tests use this to build cells without an interner.
    pub fn from_raw(index: u32) -> Self {
        Self(index)
    }

    /// The raw interner index.
    pub fn as_raw(self) -> u32 {
        self.0
    }
}

// SAFETY: every u32 fits in usize on supported targets, and `try_from_usize`
// refuses indices above u32::MAX.
unsafe impl lasso::Key for Ident {
    fn into_usize(self) -> usize {
        self.0 as usize
    }

    fn try_from_usize(int: usize) -> Option<Self> {
        u32::try_from(int).ok().map(Self)
    }
}

/// Thread-safe string interner backed by [`lasso::ThreadedRodeo`].
///
/// One interner is shared by a netlist and every rule set, fabric description
/// and template that refers to names inside it.
pub struct Interner {
    rodeo: ThreadedRodeo<Ident>,
}

impl Interner {
    /// An interner with no names.
    pub fn new() -> Self {
        Self {
            rodeo: ThreadedRodeo::new(),
        }
    }

    /// Interns `s`, reusing the existing [`Ident`] when it is already known.
    pub fn get_or_intern(&self, s: &str) -> Ident {
        self.rodeo.get_or_intern(s)
    }

    /// The [`Ident`] for `s`, if anything interned it already. Never allocates.
    pub fn get(&self, s: &str) -> Option<Ident> {
        self.rodeo.get(s)
    }

    /// Number of distinct names interned so far.
    pub fn len(&self) -> usize {
        self.rodeo.len()
    }

    /// Whether nothing has been interned.
    pub fn is_empty(&self) -> bool {
        self.rodeo.is_empty()
    }

    /// The string behind `ident`. Panics on an `Ident` from another interner.
    pub fn resolve(&self, ident: Ident) -> &str {
        self.rodeo.resolve(&ident)
    }
}

impl Default for Interner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Interner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Interner")
            .field("len", &self.len())
            .finish()
    }
}
