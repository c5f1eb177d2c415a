//! Engine fault types.
//!
//! Everything here describes a problem with the environment the engine runs
//! in. Consensus rejections are never errors; they travel as
//! [`ValidationOutcome`](crate::ValidationOutcome) values.

use crate::limits::LimitName;
use sonet_core::{Height, TxType};
use thiserror::Error;

/// Failure reported by a chain-facts provider
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The backing store could not answer; retrying may succeed
    #[error("Chain data unavailable: {0}")]
    Unavailable(String),

    /// Stored records could not be decoded
    #[error("Malformed stored data: {0}")]
    MalformedData(String),
}

/// Engine fault, distinct from a consensus rejection
#[derive(Error, Debug)]
pub enum ConsensusError {
    /// A chain-facts read failed
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// A rule asked for a limit missing from its table
    #[error("Limit {0} is not registered")]
    LimitNotRegistered(LimitName),

    /// The first entry of the limit activates above `height`
    #[error("Limit {name} has no entry active at height {height}")]
    LimitNotActive { name: LimitName, height: Height },

    /// Limit schedule or override rejected at construction
    #[error("Limit {name}: {reason}")]
    InvalidLimit { name: LimitName, reason: String },

    /// Checkpoint JSON that does not parse
    #[error("Malformed checkpoint list: {0}")]
    MalformedCheckpoints(String),

    /// Rule activations registered out of height order
    #[error("Rule checkpoint out of order for {category}: {reason}")]
    CheckpointOrder { category: String, reason: String },

    /// A block that does not extend the chain it is connected to
    #[error("Invalid block: {0}")]
    InvalidBlock(String),

    /// The type belongs to no rule category
    #[error("No consensus rules for transaction type {0}")]
    UnsupportedTransactionType(TxType),

    /// Unusable engine settings
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// Malformed transaction or block data
    #[error("Data model error: {0}")]
    Core(#[from] sonet_core::CoreError),

    /// Reading a configuration or checkpoint file
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration file is not valid TOML
    #[error("TOML parse error: {0}")]
    TomlDeError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}

impl ConsensusError {
    /// Whether the same validation may succeed once the environment recovers
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ConsensusError::Provider(ProviderError::Unavailable(_)) | ConsensusError::IoError(_)
        )
    }

    /// Whether the fault comes from the engine's own configuration
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ConsensusError::LimitNotRegistered(_)
                | ConsensusError::LimitNotActive { .. }
                | ConsensusError::InvalidLimit { .. }
                | ConsensusError::MalformedCheckpoints(_)
                | ConsensusError::CheckpointOrder { .. }
                | ConsensusError::ConfigurationError(_)
        )
    }
}
