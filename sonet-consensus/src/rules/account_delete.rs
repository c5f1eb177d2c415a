//! Account deletion (ACCOUNT_DELETE)

use super::{base, Placement, RuleEnv};
use crate::config::EnforcementPolicy;
use crate::provider::ChainFacts;
use crate::{ConsensusResult, Result, StepResult};
use sonet_core::{CandidateBlock, SocialTransaction, TxType};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountDeleteFacts {
    pub last_tx_type: Option<TxType>,
    pub pending_edit: bool,
}

/// Deletion carries no payload, so only identity and history are checked
#[derive(Debug, Clone)]
pub struct AccountDeleteRule {
    policy: EnforcementPolicy,
}

impl AccountDeleteRule {
    pub fn new(policy: EnforcementPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &EnforcementPolicy {
        &self.policy
    }

    pub fn check(&self, tx: &SocialTransaction, env: &RuleEnv<'_>) -> Result<StepResult> {
        ensure_step!(base::check_base(tx, env));
        ensure_step!(base::check_digest(tx, env, &self.policy));
        Ok(Ok(()))
    }

    pub fn fetch_facts(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<AccountDeleteFacts> {
        let pending_edit = placement.is_mempool()
            && provider.pending_edit_exists(tx.address(), &TxType::ACCOUNT_EDITS)?;

        Ok(AccountDeleteFacts {
            last_tx_type: provider.last_transaction_type(tx.address(), &TxType::ACCOUNT_EDITS)?,
            pending_edit,
        })
    }

    pub fn validate_chain(
        &self,
        tx: &SocialTransaction,
        env: &RuleEnv<'_>,
        facts: &AccountDeleteFacts,
    ) -> StepResult {
        match facts.last_tx_type {
            None => base::reject(tx, ConsensusResult::NotRegistered, env),
            Some(TxType::AccountDelete) => base::reject(tx, ConsensusResult::AccountDeleted, env),
            Some(_) => Ok(()),
        }
    }

    pub fn validate_block(
        &self,
        tx: &SocialTransaction,
        block: &CandidateBlock,
        env: &RuleEnv<'_>,
    ) -> StepResult {
        if block.others_from_signer(tx, &TxType::ACCOUNT_EDITS).next().is_some() {
            return base::reject(tx, ConsensusResult::ChangeInfoDoubleInBlock, env);
        }
        Ok(())
    }

    pub fn validate_mempool(&self, _tx: &SocialTransaction, facts: &AccountDeleteFacts) -> StepResult {
        if facts.pending_edit {
            return Err(ConsensusResult::ChangeInfoDoubleInMempool);
        }
        Ok(())
    }
}
