//! Why a packer configuration was rejected.

/// A configuration that cannot drive packing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read packer configuration: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for a packer configuration.
    #[error("malformed packer configuration: {0}")]
    Parse(String),

    /// A section or key the packer needs is absent or empty, named by its dotted path.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A value is present but unusable, e.g. a zero tile capacity.
    #[error("invalid packer configuration: {0}")]
    Invalid(String),
}
