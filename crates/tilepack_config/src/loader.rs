//! Configuration file loading and validation.

use crate::error::ConfigError;
use crate::types::{BoundaryCellConfig, PackConfig};
use std::collections::BTreeSet;
use std::path::Path;

/// Loads and validates a packer configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PackConfig, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    load_config_from_str(&content)
}

/// Parses and validates a packer configuration from a string.
///
/// Useful for testing without filesystem dependencies.
pub fn load_config_from_str(content: &str) -> Result<PackConfig, ConfigError> {
    let config: PackConfig =
        toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates that required fields are present and configuration values are consistent.
fn validate_config(config: &PackConfig) -> Result<(), ConfigError> {
    if let Some(chain) = &config.chain {
        if chain.tile_capacity == 0 {
            return Err(ConfigError::Invalid(
                "chain.tile_capacity must be at least 1".to_string(),
            ));
        }
        if chain.max_chain_length == Some(0) {
            return Err(ConfigError::Invalid(
                "chain.max_chain_length must be at least 1".to_string(),
            ));
        }
        if chain.slots_per_tile == Some(0) {
            return Err(ConfigError::Invalid(
                "chain.slots_per_tile must be at least 1".to_string(),
            ));
        }
        if chain.chain_in.is_empty() {
            return Err(ConfigError::MissingField("chain.chain_in".to_string()));
        }
        if chain.chain_out.is_empty() {
            return Err(ConfigError::MissingField("chain.chain_out".to_string()));
        }
        if chain.chain_in == chain.chain_out {
            return Err(ConfigError::Invalid(format!(
                "chain.chain_in and chain.chain_out are both '{}'",
                chain.chain_in
            )));
        }
        if chain.cell_types.is_empty() {
            return Err(ConfigError::MissingField("chain.cell_types".to_string()));
        }
    }

    let boundary = &config.boundary;
    if let Some(cell) = &boundary.feed_in {
        validate_boundary("boundary.feed_in", cell, true, false)?;
    }
    if let Some(cell) = &boundary.pass_through {
        validate_boundary("boundary.pass_through", cell, true, true)?;
    }
    if let Some(cell) = &boundary.pass_out {
        validate_boundary("boundary.pass_out", cell, false, true)?;
    }

    for (ty, shape) in &config.lut {
        if shape.param.is_empty() {
            return Err(ConfigError::MissingField(format!("lut.{ty}.param")));
        }
        if shape.inputs.is_empty() || shape.inputs.len() > 16 {
            return Err(ConfigError::Invalid(format!(
                "lut.{ty}.inputs must list between 1 and 16 ports"
            )));
        }
        let distinct: BTreeSet<&String> = shape.inputs.iter().collect();
        if distinct.len() != shape.inputs.len() {
            return Err(ConfigError::Invalid(format!(
                "lut.{ty}.inputs contains a duplicate port"
            )));
        }
    }

    for (ty, rule) in &config.rules {
        if rule.new_type.is_empty() {
            return Err(ConfigError::MissingField(format!("rules.{ty}.new_type")));
        }
        if let Some((port, _)) = rule.port_fanout_rename.iter().find(|(_, v)| v.is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "rules.{ty}.port_fanout_rename.{port} lists no ports"
            )));
        }
    }
    Ok(())
}

fn validate_boundary(
    section: &str,
    cell: &BoundaryCellConfig,
    needs_chain_output: bool,
    needs_fabric_output: bool,
) -> Result<(), ConfigError> {
    if cell.cell_type.is_empty() {
        return Err(ConfigError::MissingField(format!("{section}.cell_type")));
    }
    if cell.input.is_empty() {
        return Err(ConfigError::MissingField(format!("{section}.input")));
    }
    let mut ports = vec![cell.input.as_str()];
    match (&cell.chain_output, needs_chain_output) {
        (Some(port), _) => ports.push(port),
        (None, true) => {
            return Err(ConfigError::MissingField(format!("{section}.chain_output")));
        }
        (None, false) => {}
    }
    match (&cell.fabric_output, needs_fabric_output) {
        (Some(port), _) => ports.push(port),
        (None, true) => {
            return Err(ConfigError::MissingField(format!("{section}.fabric_output")));
        }
        (None, false) => {}
    }
    let distinct: BTreeSet<&str> = ports.iter().copied().collect();
    if distinct.len() != ports.len() || distinct.contains("") {
        return Err(ConfigError::Invalid(format!(
            "{section} must name distinct, non-empty ports"
        )));
    }
    Ok(())
}
