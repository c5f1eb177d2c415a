//! In-memory chain state implementing [`ChainFacts`]

use crate::provider::{ChainFacts, DuplicateCounts};
use crate::{ConsensusError, ProviderError, Result};
use sonet_core::{CandidateBlock, CoreError, Height, SocialTransaction, TxType};
use std::collections::BTreeMap;
use tracing::debug;

/// Connected blocks plus the pending pool
#[derive(Debug, Clone, Default)]
pub struct MemoryChainState {
    /// Connected blocks in height order; transactions carry their height
    blocks: Vec<CandidateBlock>,

    /// Pending transactions keyed by hash
    pending: BTreeMap<String, SocialTransaction>,
}

impl MemoryChainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Height of the last connected block
    pub fn tip(&self) -> Option<Height> {
        self.blocks.last().map(|b| b.height)
    }

    /// Height the next block will occupy
    pub fn next_height(&self) -> Height {
        self.tip().map_or(0, |h| h + 1)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn get_pending(&self, hash: &str) -> Option<&SocialTransaction> {
        self.pending.get(hash)
    }

    /// Add a transaction to the pending pool
    pub fn add_pending(&mut self, tx: SocialTransaction) -> Result<()> {
        if let Some(height) = tx.height() {
            return Err(CoreError::AlreadyConfirmed {
                hash: tx.hash().to_string(),
                height,
            }
            .into());
        }

        self.pending.insert(tx.hash().to_string(), tx);
        Ok(())
    }

    pub fn remove_pending(&mut self, hash: &str) -> Option<SocialTransaction> {
        self.pending.remove(hash)
    }

    /// Connect `block` at the tip.
    ///
    /// Every transaction is confirmed at the block height in block order and
    /// leaves the pending pool.
    pub fn connect_block(&mut self, mut block: CandidateBlock) -> Result<()> {
        let expected = self.next_height();
        if block.height != expected {
            return Err(ConsensusError::InvalidBlock(format!(
                "height {} does not extend tip, expected {}",
                block.height, expected
            )));
        }

        for (order, tx) in (0u32..).zip(block.transactions.iter_mut()) {
            tx.confirm(block.height, order)?;
        }
        for tx in &block.transactions {
            self.pending.remove(tx.hash());
        }

        debug!(height = block.height, transactions = block.len(), "block connected");
        self.blocks.push(block);
        Ok(())
    }

    /// Disconnect the tip block, returning its transactions to the pool.
    ///
    /// Returns the height that was disconnected.
    pub fn disconnect_tip(&mut self) -> Option<Height> {
        let block = self.blocks.pop()?;

        for mut tx in block.transactions {
            tx.reset_height();
            self.pending.insert(tx.hash().to_string(), tx);
        }

        debug!(height = block.height, "block disconnected");
        Some(block.height)
    }

    /// Confirmed transactions, oldest first
    fn confirmed(&self) -> impl DoubleEndedIterator<Item = &SocialTransaction> {
        self.blocks.iter().flat_map(|b| b.transactions.iter())
    }
}

impl ChainFacts for MemoryChainState {
    fn count_recent_duplicate_nicknames(
        &self,
        address: &str,
        height_floor: Height,
        nickname: &str,
    ) -> std::result::Result<DuplicateCounts, ProviderError> {
        let collides = |tx: &&SocialTransaction| {
            tx.tx_type() == TxType::AccountUser && tx.address() != address && tx.lowercase_name() == nickname
        };

        let chain = self
            .confirmed()
            .filter(|tx| tx.height().is_some_and(|h| h >= height_floor))
            .filter(collides)
            .count();
        let pool = self.pending.values().filter(collides).count();

        Ok(DuplicateCounts {
            chain: chain as u64,
            pool: pool as u64,
        })
    }

    fn last_transaction_type(
        &self,
        address: &str,
        types: &[TxType],
    ) -> std::result::Result<Option<TxType>, ProviderError> {
        Ok(self
            .confirmed()
            .rev()
            .find(|tx| tx.address() == address && tx.tx_type().is_in(types))
            .map(SocialTransaction::tx_type))
    }

    fn edit_count_since(
        &self,
        address: &str,
        types: &[TxType],
        height_floor: Height,
    ) -> std::result::Result<u64, ProviderError> {
        let count = self
            .confirmed()
            .filter(|tx| tx.address() == address && tx.tx_type().is_in(types))
            .filter(|tx| tx.height().is_some_and(|h| h >= height_floor))
            .count();
        Ok(count as u64)
    }

    fn pending_edit_exists(
        &self,
        address: &str,
        types: &[TxType],
    ) -> std::result::Result<bool, ProviderError> {
        Ok(self
            .pending
            .values()
            .any(|tx| tx.address() == address && tx.tx_type().is_in(types)))
    }
}
