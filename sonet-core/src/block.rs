//! Candidate blocks handed to block-level validation

use crate::{Height, SocialTransaction, TxType};
use serde::{Deserialize, Serialize};

/// A block being assembled or revalidated.
///
/// Holds the social transactions staged so far, in block order. Validation
/// only ever borrows it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CandidateBlock {
    /// Height the block will occupy
    pub height: Height,

    /// Staged social transactions in block order
    pub transactions: Vec<SocialTransaction>,
}

impl CandidateBlock {
    pub fn new(height: Height, transactions: Vec<SocialTransaction>) -> Self {
        Self {
            height,
            transactions,
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    /// Transactions other than `tx` whose type is one of `types`
    pub fn others<'a>(
        &'a self,
        tx: &'a SocialTransaction,
        types: &'a [TxType],
    ) -> impl Iterator<Item = &'a SocialTransaction> + 'a {
        self.transactions
            .iter()
            .filter(move |other| other.hash() != tx.hash() && other.tx_type().is_in(types))
    }

    /// Like [`CandidateBlock::others`], restricted to the signer of `tx`
    pub fn others_from_signer<'a>(
        &'a self,
        tx: &'a SocialTransaction,
        types: &'a [TxType],
    ) -> impl Iterator<Item = &'a SocialTransaction> + 'a {
        self.others(tx, types)
            .filter(move |other| other.address() == tx.address())
    }
}
