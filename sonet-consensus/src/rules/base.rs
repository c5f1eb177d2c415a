//! Predicates shared by every rule variant

use super::RuleEnv;
use crate::config::{EnforcementPolicy, SoftCheck};
use crate::limits::{LimitName, LimitTable};
use crate::{ConsensusResult, Result, StepResult};
use sonet_core::{Height, SocialTransaction};
use tracing::{debug, warn};

/// Transaction must identify itself and its signer
pub(crate) fn check_base(tx: &SocialTransaction, env: &RuleEnv<'_>) -> StepResult {
    if tx.hash().is_empty() || tx.address().is_empty() {
        return reject(tx, ConsensusResult::Failed, env);
    }
    Ok(())
}

/// Summed payload bytes must not exceed `limit`
pub(crate) fn check_payload_size(
    tx: &SocialTransaction,
    limits: &LimitTable,
    limit: LimitName,
    env: &RuleEnv<'_>,
) -> Result<StepResult> {
    let max_size = limits.get(limit, env.height)?;
    if tx.payload_size() as u64 > max_size {
        return Ok(reject(tx, ConsensusResult::ContentSizeLimit, env));
    }
    Ok(Ok(()))
}

/// Recomputed payload digest must match the one embedded at signing time
pub(crate) fn check_digest(
    tx: &SocialTransaction,
    env: &RuleEnv<'_>,
    policy: &EnforcementPolicy,
) -> StepResult {
    let Some(embedded) = tx.embedded_digest() else {
        return Ok(());
    };

    let recomputed = tx.build_digest();
    if recomputed == embedded {
        return Ok(());
    }

    if env.checkpoints.is_digest_checkpoint(tx.hash(), &recomputed) {
        debug!(hash = tx.hash(), "digest mismatch allowed by checkpoint");
        return Ok(());
    }

    soft_reject(tx, ConsensusResult::FailedOpReturn, SoftCheck::PayloadDigest, env, policy)
}

/// Reject with `result` unless the transaction is checkpointed for it
pub(crate) fn reject(tx: &SocialTransaction, result: ConsensusResult, env: &RuleEnv<'_>) -> StepResult {
    if env.checkpoints.is_checkpoint(tx.hash(), tx.tx_type(), result) {
        debug!(hash = tx.hash(), %result, "rejection overridden by checkpoint");
        return Ok(());
    }
    Err(result)
}

/// Like [`reject`], but only logs when `check` is not enforced
pub(crate) fn soft_reject(
    tx: &SocialTransaction,
    result: ConsensusResult,
    check: SoftCheck,
    env: &RuleEnv<'_>,
    policy: &EnforcementPolicy,
) -> StepResult {
    match reject(tx, result, env) {
        Err(result) if !policy.enforces(check) => {
            warn!(hash = tx.hash(), ?check, %result, "soft check failed, not enforced");
            Ok(())
        }
        other => other,
    }
}

/// Lowest height inside the lookback window ending at `env.height`
pub(crate) fn height_floor(limits: &LimitTable, env: &RuleEnv<'_>) -> Result<Height> {
    let depth = limits.get(LimitName::Depth, env.height)?;
    Ok(env.height.saturating_sub(depth))
}
