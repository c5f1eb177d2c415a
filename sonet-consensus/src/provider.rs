//! Contract for the chain-state collaborator.
//!
//! The consensus rules never read storage directly. Every fact they need
//! about confirmed history or the pending pool comes through [`ChainFacts`],
//! one synchronous point-in-time read per call.

use crate::ProviderError;
use sonet_core::{Height, TxType};

/// Nickname collisions found for an address
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DuplicateCounts {
    /// Confirmed accounts of other addresses using the nickname inside the window
    pub chain: u64,
    /// Pending accounts of other addresses using the nickname
    pub pool: u64,
}

/// Read-only view of chain history and the pending pool
pub trait ChainFacts {
    /// Count accounts other than `address` holding `nickname`.
    ///
    /// `nickname` is already lowercased; chain matches are restricted to
    /// heights at or above `height_floor`. Stored nicknames must be folded
    /// the same way, ASCII letters only, so that non-ASCII characters never
    /// collide with ASCII ones.
    fn count_recent_duplicate_nicknames(
        &self,
        address: &str,
        height_floor: Height,
        nickname: &str,
    ) -> Result<DuplicateCounts, ProviderError>;

    /// Type of the most recent confirmed transaction of `address` among `types`
    fn last_transaction_type(
        &self,
        address: &str,
        types: &[TxType],
    ) -> Result<Option<TxType>, ProviderError>;

    /// Confirmed transactions of `address` among `types` at or above `height_floor`
    fn edit_count_since(
        &self,
        address: &str,
        types: &[TxType],
        height_floor: Height,
    ) -> Result<u64, ProviderError>;

    /// Whether the pending pool holds a transaction of `address` among `types`
    fn pending_edit_exists(&self, address: &str, types: &[TxType]) -> Result<bool, ProviderError>;
}
