//! Configuration types deserialized from a packer TOML file.

use serde::Deserialize;
use std::collections::BTreeMap;

/// The top-level packer configuration.
#[derive(Debug, Default, Deserialize)]
pub struct PackConfig {
    /// Chain fabric description. Absent for families without chains.
    #[serde(default)]
    pub chain: Option<ChainConfig>,
    /// Boundary cell templates inserted when a chain is split.
    #[serde(default)]
    pub boundary: BoundaryConfig,
    /// Truth-table shapes keyed by cell type.
    #[serde(default)]
    pub lut: BTreeMap<String, LutShapeConfig>,
    /// Constant and dead-logic normalization settings.
    #[serde(default)]
    pub normalize: NormalizeConfig,
    /// Rewrite rules keyed by source cell type.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleConfig>,
}

/// Description of one chain fabric (e.g. a carry chain or a register chain).
#[derive(Debug, Clone, Deserialize)]
pub struct ChainConfig {
    /// Number of chain cells one tile holds.
    pub tile_capacity: usize,
    /// Maximum physical length of one chain segment, boundary cells included.
    #[serde(default)]
    pub max_chain_length: Option<usize>,
    /// Chains shorter than this are left unchained.
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    /// Name of the chain input port (e.g. `CI`).
    pub chain_in: String,
    /// Name of the chain output port (e.g. `CO`).
    pub chain_out: String,
    /// Cell types that take part in the chain.
    pub cell_types: Vec<String>,
    /// Ports whose nets must agree for cells to share a tile (e.g. `CLK`).
    #[serde(default)]
    pub compat_ports: Vec<String>,
    /// Sub-tile slots per tile used for cluster offsets. Defaults to `tile_capacity`.
    #[serde(default)]
    pub slots_per_tile: Option<usize>,
}

fn default_min_length() -> usize {
    1
}

/// The three boundary cell templates of a chain fabric.
#[derive(Debug, Default, Deserialize)]
pub struct BoundaryConfig {
    /// Cell that lets general routing enter the chain.
    #[serde(default)]
    pub feed_in: Option<BoundaryCellConfig>,
    /// Cell that continues the chain and re-exposes the signal to fabric.
    #[serde(default)]
    pub pass_through: Option<BoundaryCellConfig>,
    /// Cell that terminates a chain segment and re-drives the signal to fabric.
    #[serde(default)]
    pub pass_out: Option<BoundaryCellConfig>,
}

/// A data-described boundary cell.
#[derive(Debug, Clone, Deserialize)]
pub struct BoundaryCellConfig {
    /// Physical type of the synthesized cell.
    pub cell_type: String,
    /// Input port receiving the signal being carried across the boundary.
    pub input: String,
    /// Output port driving the next chain member's chain input.
    #[serde(default)]
    pub chain_output: Option<String>,
    /// Output port re-driving the signal into general routing.
    #[serde(default)]
    pub fabric_output: Option<String>,
    /// Parameters set on every instance.
    #[serde(default)]
    pub params: BTreeMap<String, ParamConfig>,
}

/// Shape of a truth-table cell: the parameter holding the table and its inputs.
#[derive(Debug, Clone, Deserialize)]
pub struct LutShapeConfig {
    /// Parameter holding the `2^k` bit truth table (e.g. `INIT`).
    pub param: String,
    /// Input port names, least significant select bit first.
    pub inputs: Vec<String>,
}

/// Settings for the constant and dead-logic normalizer.
#[derive(Debug, Default, Deserialize)]
pub struct NormalizeConfig {
    /// Cell types with side effects that are never pruned.
    #[serde(default)]
    pub keep_types: Vec<String>,
    /// Cell types whose outputs are tied low.
    #[serde(default)]
    pub gnd_driver_types: Vec<String>,
    /// Cell types whose outputs are tied high.
    #[serde(default)]
    pub vcc_driver_types: Vec<String>,
}

/// A declarative rewrite rule for one source cell type.
#[derive(Debug, Clone, Deserialize)]
pub struct RuleConfig {
    /// The physical type the cell becomes.
    pub new_type: String,
    /// One-to-one port renames.
    #[serde(default)]
    pub port_rename: BTreeMap<String, String>,
    /// Ports whose net is wired to several new ports.
    #[serde(default)]
    pub port_fanout_rename: BTreeMap<String, Vec<String>>,
    /// Parameters copied under a new name.
    #[serde(default)]
    pub param_rename: BTreeMap<String, String>,
    /// Attributes overlaid unconditionally.
    #[serde(default)]
    pub fixed_attrs: BTreeMap<String, ParamConfig>,
    /// Parameters overlaid unconditionally.
    #[serde(default)]
    pub fixed_params: BTreeMap<String, ParamConfig>,
    /// Parameters set only when absent.
    #[serde(default)]
    pub default_params: BTreeMap<String, ParamConfig>,
}

/// A parameter or attribute value as written in TOML.
///
/// Strings prefixed with `0b` or `0x` are read as bit-vectors by the
/// consumers of this configuration; other strings are enumerated values.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum ParamConfig {
    /// An integer value.
    Int(i64),
    /// A string value.
    Text(String),
}

impl ChainConfig {
    /// Returns the sub-tile slot count, falling back to the tile capacity.
    pub fn slots(&self) -> usize {
        self.slots_per_tile.unwrap_or(self.tile_capacity)
    }
}
