//! Diagnostic codes grouped by the packing pass that emits them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The packing pass a diagnostic code belongs to.
///
/// Each category owns one hundred codes: `N1xx` for the normalizer, `N2xx` for
/// the rewrite engine, `N3xx` for chain discovery, `N4xx` for the chain
/// legalizer and `N5xx` for the cluster builder.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum Category {
    /// Constant and dead-logic normalization.
    Normalize,
    /// Rule-driven cell rewriting.
    Rewrite,
    /// Chain discovery.
    Chain,
    /// Chain legalization and boundary cell insertion.
    Legalize,
    /// Cluster construction.
    Cluster,
}

impl Category {
    /// Returns the first code number of this category's range.
    pub fn base(self) -> u16 {
        match self {
            Category::Normalize => 100,
            Category::Rewrite => 200,
            Category::Chain => 300,
            Category::Legalize => 400,
            Category::Cluster => 500,
        }
    }
}

/// A structured diagnostic code combining a pass category and a number within it.
///
/// Displayed as `N` followed by the 3-digit code, e.g. `N101`, `N402`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct DiagnosticCode {
    /// The pass this diagnostic belongs to.
    pub category: Category,
    /// The number within the category, below 100.
    pub number: u16,
}

impl DiagnosticCode {
    /// Creates a new diagnostic code.
    pub const fn new(category: Category, number: u16) -> Self {
        Self { category, number }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N{:03}", self.category.base() + self.number % 100)
    }
}
