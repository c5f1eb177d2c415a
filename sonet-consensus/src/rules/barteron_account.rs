//! Barter marketplace account (BARTERON_ACCOUNT)

use super::{base, Placement, RuleEnv};
use crate::config::{EnforcementPolicy, Network};
use crate::limits::{LimitEntry, LimitName, LimitTable};
use crate::provider::ChainFacts;
use crate::{ConsensusResult, Result, StepResult};
use sonet_core::{CandidateBlock, SocialTransaction, TxType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BarteronAccountFacts {
    /// Pending barter account transaction of the signer
    pub pending: bool,
}

/// Barter account profile; one per signer per block and per pool
#[derive(Debug, Clone)]
pub struct BarteronAccountRule {
    limits: LimitTable,
    policy: EnforcementPolicy,
}

impl BarteronAccountRule {
    pub fn new(network: Network, policy: EnforcementPolicy) -> Result<Self> {
        Ok(Self::with_limits(Self::default_limits(network)?, policy))
    }

    pub fn with_limits(limits: LimitTable, policy: EnforcementPolicy) -> Self {
        Self { limits, policy }
    }

    pub fn default_limits(network: Network) -> Result<LimitTable> {
        let payload_size = match network {
            Network::Main | Network::Test => LimitEntry::fixed(0, 2048),
            Network::Regtest => LimitEntry::new(0, 256, 65_536, 2048),
        };
        LimitTable::new().with(LimitName::PayloadSize, vec![payload_size])
    }

    pub fn limits(&self) -> &LimitTable {
        &self.limits
    }

    pub fn check(&self, tx: &SocialTransaction, env: &RuleEnv<'_>) -> Result<StepResult> {
        ensure_step!(base::check_base(tx, env));
        ensure_step!(base::check_payload_size(tx, &self.limits, LimitName::PayloadSize, env)?);
        ensure_step!(base::check_digest(tx, env, &self.policy));
        Ok(Ok(()))
    }

    /// Only pool facts are needed, so nothing is read inside a block
    pub fn fetch_facts(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<BarteronAccountFacts> {
        let pending = placement.is_mempool()
            && provider.pending_edit_exists(tx.address(), &[TxType::BarteronAccount])?;
        Ok(BarteronAccountFacts { pending })
    }

    /// No chain predicates beyond the common ones
    pub fn validate_chain(&self, _tx: &SocialTransaction, _env: &RuleEnv<'_>) -> StepResult {
        Ok(())
    }

    /// One barter account transaction per signer per block
    pub fn validate_block(
        &self,
        tx: &SocialTransaction,
        block: &CandidateBlock,
        env: &RuleEnv<'_>,
    ) -> StepResult {
        if block
            .others_from_signer(tx, &[TxType::BarteronAccount])
            .next()
            .is_some()
        {
            return base::reject(tx, ConsensusResult::ManyTransactions, env);
        }
        Ok(())
    }

    pub fn validate_mempool(&self, _tx: &SocialTransaction, facts: &BarteronAccountFacts) -> StepResult {
        if facts.pending {
            return Err(ConsensusResult::ManyTransactions);
        }
        Ok(())
    }
}
