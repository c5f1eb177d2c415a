//! User account creation and edits (ACCOUNT_USER)

use super::{base, Placement, RuleEnv};
use crate::config::{EnforcementPolicy, Network, SoftCheck};
use crate::limits::{LimitEntry, LimitName, LimitTable};
use crate::provider::{ChainFacts, DuplicateCounts};
use crate::{ConsensusResult, Result, StepResult};
use sonet_core::{CandidateBlock, SocialTransaction, TxType};

/// Facts about the signer and its nickname, fetched per validation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AccountUserFacts {
    pub duplicates: DuplicateCounts,
    /// Most recent confirmed account transaction of the signer
    pub last_tx_type: Option<TxType>,
    /// Confirmed edits inside the lookback window
    pub edits_count: u64,
    /// Pending account transaction of the signer
    pub pending_edit: bool,
}

/// Registration and profile edits of a user account.
///
/// Nickname uniqueness is judged on the ASCII-folded name within the `Depth`
/// window; edits are rate limited by `EditAccountDailyCount` over the same
/// window.
#[derive(Debug, Clone)]
pub struct AccountUserRule {
    limits: LimitTable,
    policy: EnforcementPolicy,
}

impl AccountUserRule {
    pub fn new(network: Network, policy: EnforcementPolicy) -> Result<Self> {
        Ok(Self::with_limits(Self::default_limits(network)?, policy))
    }

    pub fn with_limits(limits: LimitTable, policy: EnforcementPolicy) -> Self {
        Self { limits, policy }
    }

    /// Built-in limit schedule for `network`
    pub fn default_limits(network: Network) -> Result<LimitTable> {
        match network {
            Network::Main => LimitTable::new()
                .with(LimitName::Depth, vec![LimitEntry::fixed(0, 1440)])?
                .with(
                    LimitName::EditAccountDailyCount,
                    vec![LimitEntry::fixed(0, 10), LimitEntry::fixed(1_324_655, 5)],
                )?
                .with(LimitName::MaxUserSize, vec![LimitEntry::fixed(0, 2048)])?
                .with(LimitName::MaxNicknameLength, vec![LimitEntry::fixed(0, 20)]),
            Network::Test => LimitTable::new()
                .with(LimitName::Depth, vec![LimitEntry::fixed(0, 1440)])?
                .with(LimitName::EditAccountDailyCount, vec![LimitEntry::fixed(0, 10)])?
                .with(LimitName::MaxUserSize, vec![LimitEntry::fixed(0, 2048)])?
                .with(LimitName::MaxNicknameLength, vec![LimitEntry::fixed(0, 20)]),
            Network::Regtest => LimitTable::new()
                .with(LimitName::Depth, vec![LimitEntry::new(0, 1, 43_200, 1440)])?
                .with(LimitName::EditAccountDailyCount, vec![LimitEntry::new(0, 0, 1_000, 10)])?
                .with(LimitName::MaxUserSize, vec![LimitEntry::new(0, 256, 65_536, 2048)])?
                .with(LimitName::MaxNicknameLength, vec![LimitEntry::new(0, 1, 64, 20)]),
        }
    }

    pub fn limits(&self) -> &LimitTable {
        &self.limits
    }

    pub fn check(&self, tx: &SocialTransaction, env: &RuleEnv<'_>) -> Result<StepResult> {
        ensure_step!(base::check_base(tx, env));

        if tx.payload().is_none() {
            ensure_step!(base::reject(tx, ConsensusResult::Failed, env));
        }

        ensure_step!(base::check_payload_size(tx, &self.limits, LimitName::MaxUserSize, env)?);

        if tx.referrer() == Some(tx.address()) {
            ensure_step!(base::reject(tx, ConsensusResult::ReferrerSelf, env));
        }

        ensure_step!(self.check_login(tx, env)?);
        ensure_step!(base::check_digest(tx, env, &self.policy));

        Ok(Ok(()))
    }

    /// Nickname format, judged on the casing the signer used
    fn check_login(&self, tx: &SocialTransaction, env: &RuleEnv<'_>) -> Result<StepResult> {
        let name = tx.name().unwrap_or_default();

        if name.is_empty() {
            ensure_step!(self.soft_reject(tx, ConsensusResult::Failed, SoftCheck::EmptyNickname, env));
        }

        let max_length = self.limits.get(LimitName::MaxNicknameLength, env.height)?;
        if name.len() as u64 > max_length {
            ensure_step!(self.soft_reject(tx, ConsensusResult::NicknameLong, SoftCheck::NicknameLength, env));
        }

        if !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
            ensure_step!(self.soft_reject(tx, ConsensusResult::Failed, SoftCheck::NicknameCharset, env));
        }

        Ok(Ok(()))
    }

    /// Facts for `tx`; the pending-edit read is skipped inside a block
    pub fn fetch_facts(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        env: &RuleEnv<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<AccountUserFacts> {
        let floor = base::height_floor(&self.limits, env)?;
        let address = tx.address();

        let pending_edit = if placement.is_mempool() {
            provider.pending_edit_exists(address, &TxType::ACCOUNT_EDITS)?
        } else {
            false
        };

        Ok(AccountUserFacts {
            duplicates: provider.count_recent_duplicate_nicknames(address, floor, &tx.lowercase_name())?,
            last_tx_type: provider.last_transaction_type(address, &TxType::ACCOUNT_EDITS)?,
            edits_count: provider.edit_count_since(address, &[TxType::AccountUser], floor)?,
            pending_edit,
        })
    }

    pub fn validate_chain(
        &self,
        tx: &SocialTransaction,
        env: &RuleEnv<'_>,
        facts: &AccountUserFacts,
    ) -> Result<StepResult> {
        if facts.duplicates.chain > 0 {
            ensure_step!(base::reject(tx, ConsensusResult::NicknameDouble, env));
        }

        // A deleted account cannot be restored
        if facts.last_tx_type == Some(TxType::AccountDelete) {
            ensure_step!(base::reject(tx, ConsensusResult::AccountDeleted, env));
        }

        let edits_limit = self.limits.get(LimitName::EditAccountDailyCount, env.height)?;
        if facts.edits_count > edits_limit {
            ensure_step!(base::reject(tx, ConsensusResult::ChangeInfoLimit, env));
        }

        Ok(Ok(()))
    }

    pub fn validate_block(
        &self,
        tx: &SocialTransaction,
        block: &CandidateBlock,
        env: &RuleEnv<'_>,
    ) -> StepResult {
        let name = tx.lowercase_name();

        for other in block.others(tx, &TxType::ACCOUNT_EDITS) {
            if other.address() == tx.address() {
                base::reject(tx, ConsensusResult::ChangeInfoDoubleInBlock, env)?;
            }

            if other.tx_type() == TxType::AccountUser && other.lowercase_name() == name {
                self.soft_reject(
                    tx,
                    ConsensusResult::NicknameDouble,
                    SoftCheck::BlockDuplicateNickname,
                    env,
                )?;
            }
        }

        Ok(())
    }

    pub fn validate_mempool(&self, _tx: &SocialTransaction, facts: &AccountUserFacts) -> StepResult {
        if facts.pending_edit {
            return Err(ConsensusResult::ChangeInfoDoubleInMempool);
        }

        if facts.duplicates.pool > 0 {
            return Err(ConsensusResult::NicknameDouble);
        }

        Ok(())
    }

    fn soft_reject(
        &self,
        tx: &SocialTransaction,
        result: ConsensusResult,
        check: SoftCheck,
        env: &RuleEnv<'_>,
    ) -> StepResult {
        base::soft_reject(tx, result, check, env, &self.policy)
    }
}
