//! Consensus rule variants.
//!
//! A [`Rule`] is a closed union over the transaction categories this engine
//! validates. Every variant answers the same four steps:
//!
//! 1. `check` - structural, looks at the transaction alone
//! 2. `validate` - fetches facts from the provider, applies chain predicates,
//!    then hands over to step 3 or 4 depending on the placement
//! 3. `validate_block` - conflicts with other transactions of the candidate block
//! 4. `validate_mempool` - conflicts with the pending pool
//!
//! Facts are fetched once per `validate` call and passed down explicitly, so
//! a rule instance holds nothing but its limits and enforcement switches.

/// Return the rejection from the enclosing step if `$step` failed
macro_rules! ensure_step {
    ($step:expr) => {
        if let Err(reason) = $step {
            return Ok(Err(reason));
        }
    };
}

pub mod account_delete;
pub mod account_user;
pub mod barteron_account;
mod base;

pub use account_delete::{AccountDeleteFacts, AccountDeleteRule};
pub use account_user::{AccountUserFacts, AccountUserRule};
pub use barteron_account::{BarteronAccountFacts, BarteronAccountRule};

use crate::provider::ChainFacts;
use crate::{CheckpointRegistry, ConsensusError, Result, Stage, StepResult, ValidationOutcome};
use serde::{Deserialize, Serialize};
use sonet_core::{CandidateBlock, Height, SocialTransaction, TxType};
use std::fmt;

/// Group of transaction types sharing one rule schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleCategory {
    AccountUser,
    AccountDelete,
    BarteronAccount,
}

impl RuleCategory {
    pub const ALL: [RuleCategory; 3] = [
        RuleCategory::AccountUser,
        RuleCategory::AccountDelete,
        RuleCategory::BarteronAccount,
    ];

    /// Category validating `tx_type`, if this engine handles it
    pub fn of(tx_type: TxType) -> Option<Self> {
        match tx_type {
            TxType::AccountUser => Some(RuleCategory::AccountUser),
            TxType::AccountDelete => Some(RuleCategory::AccountDelete),
            TxType::BarteronAccount => Some(RuleCategory::BarteronAccount),
            _ => None,
        }
    }
}

impl fmt::Display for RuleCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RuleCategory::AccountUser => "account_user",
            RuleCategory::AccountDelete => "account_delete",
            RuleCategory::BarteronAccount => "barteron_account",
        };
        f.write_str(name)
    }
}

/// Where a transaction is being validated
#[derive(Debug, Clone, Copy)]
pub enum Placement<'a> {
    /// Inside a candidate block, alongside its other transactions
    Block(&'a CandidateBlock),
    /// For admission to the pending pool, at the next block height
    Mempool { height: Height },
}

impl Placement<'_> {
    pub fn height(&self) -> Height {
        match self {
            Placement::Block(block) => block.height,
            Placement::Mempool { height } => *height,
        }
    }

    pub fn is_mempool(&self) -> bool {
        matches!(self, Placement::Mempool { .. })
    }
}

/// Ambient inputs of one validation call
#[derive(Debug, Clone, Copy)]
pub struct RuleEnv<'a> {
    /// Height the transaction is validated at
    pub height: Height,
    /// Allow-list consulted before any rejection outside the pool
    pub checkpoints: &'a CheckpointRegistry,
}

/// Facts fetched for one `validate` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Facts {
    AccountUser(AccountUserFacts),
    AccountDelete(AccountDeleteFacts),
    BarteronAccount(BarteronAccountFacts),
}

/// Rule variant for one category
#[derive(Debug, Clone)]
pub enum Rule {
    AccountUser(AccountUserRule),
    AccountDelete(AccountDeleteRule),
    BarteronAccount(BarteronAccountRule),
}

impl Rule {
    pub fn category(&self) -> RuleCategory {
        match self {
            Rule::AccountUser(_) => RuleCategory::AccountUser,
            Rule::AccountDelete(_) => RuleCategory::AccountDelete,
            Rule::BarteronAccount(_) => RuleCategory::BarteronAccount,
        }
    }

    /// Structural check
    pub fn check(&self, tx: &SocialTransaction, env: &RuleEnv<'_>) -> Result<StepResult> {
        match self {
            Rule::AccountUser(rule) => rule.check(tx, env),
            Rule::AccountDelete(rule) => rule.check(tx, env),
            Rule::BarteronAccount(rule) => rule.check(tx, env),
        }
    }

    /// Read the facts this variant needs at `placement` from the provider.
    ///
    /// Pool-only facts are not read for a block placement.
    pub fn fetch_facts(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        env: &RuleEnv<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<Facts> {
        Ok(match self {
            Rule::AccountUser(rule) => Facts::AccountUser(rule.fetch_facts(tx, placement, env, provider)?),
            Rule::AccountDelete(rule) => Facts::AccountDelete(rule.fetch_facts(tx, placement, provider)?),
            Rule::BarteronAccount(rule) => {
                Facts::BarteronAccount(rule.fetch_facts(tx, placement, provider)?)
            }
        })
    }

    /// Contextual validation, dispatching to the block or mempool step
    pub fn validate(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        env: &RuleEnv<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<ValidationOutcome> {
        let facts = self.fetch_facts(tx, placement, env, provider)?;

        if let Err(reason) = self.validate_chain(tx, env, &facts)? {
            return Ok(ValidationOutcome::rejected(reason, Stage::Validate));
        }

        match placement {
            Placement::Block(block) => Ok(ValidationOutcome::from_step(
                self.validate_block(tx, block, env),
                Stage::Block,
            )),
            Placement::Mempool { .. } => Ok(ValidationOutcome::from_step(
                self.validate_mempool(tx, &facts)?,
                Stage::Mempool,
            )),
        }
    }

    /// Chain predicates over already fetched facts
    pub fn validate_chain(
        &self,
        tx: &SocialTransaction,
        env: &RuleEnv<'_>,
        facts: &Facts,
    ) -> Result<StepResult> {
        match (self, facts) {
            (Rule::AccountUser(rule), Facts::AccountUser(facts)) => rule.validate_chain(tx, env, facts),
            (Rule::AccountDelete(rule), Facts::AccountDelete(facts)) => Ok(rule.validate_chain(tx, env, facts)),
            (Rule::BarteronAccount(rule), Facts::BarteronAccount(_)) => Ok(rule.validate_chain(tx, env)),
            _ => Err(self.facts_mismatch(facts)),
        }
    }

    /// Conflicts with the other transactions of `block`
    pub fn validate_block(
        &self,
        tx: &SocialTransaction,
        block: &CandidateBlock,
        env: &RuleEnv<'_>,
    ) -> StepResult {
        match self {
            Rule::AccountUser(rule) => rule.validate_block(tx, block, env),
            Rule::AccountDelete(rule) => rule.validate_block(tx, block, env),
            Rule::BarteronAccount(rule) => rule.validate_block(tx, block, env),
        }
    }

    /// Conflicts with the pending pool; never overridden by checkpoints
    pub fn validate_mempool(&self, tx: &SocialTransaction, facts: &Facts) -> Result<StepResult> {
        match (self, facts) {
            (Rule::AccountUser(rule), Facts::AccountUser(facts)) => Ok(rule.validate_mempool(tx, facts)),
            (Rule::AccountDelete(rule), Facts::AccountDelete(facts)) => Ok(rule.validate_mempool(tx, facts)),
            (Rule::BarteronAccount(rule), Facts::BarteronAccount(facts)) => {
                Ok(rule.validate_mempool(tx, facts))
            }
            _ => Err(self.facts_mismatch(facts)),
        }
    }

    fn facts_mismatch(&self, facts: &Facts) -> ConsensusError {
        ConsensusError::ConfigurationError(format!(
            "{} rule given facts {:?}",
            self.category(),
            facts
        ))
    }
}
