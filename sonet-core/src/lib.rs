//! SoNet Core - social transaction data model
//!
//! This crate provides the transaction types shared by every layer of a SoNet
//! node: the closed set of social transaction types, the transaction record
//! with its optional payload, and the candidate block the consensus layer
//! validates against.

pub mod block;
pub mod error;
pub mod transaction;
pub mod tx_type;

pub use block::CandidateBlock;
pub use error::CoreError;
pub use transaction::{Payload, SocialTransaction};
pub use tx_type::TxType;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

/// Block height, used as the deterministic clock for rule versioning
pub type Height = u64;

/// SoNet data model version
pub const SONET_VERSION: &str = "0.1.0";
