//! Error types for SoNet data model operations

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Unknown transaction type code: {0}")]
    UnknownTxType(u32),

    #[error("Transaction {hash} already confirmed at height {height}")]
    AlreadyConfirmed { hash: String, height: u64 },

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}
