//! Consensus result taxonomy and validation outcomes

use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason code attached to every validation decision.
///
/// `Success` is the only passing variant. Codes are stable and shared with
/// consumers of the reason code, so variants are only ever appended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[repr(i32)]
pub enum ConsensusResult {
    Success = 0,
    NotRegistered = 1,
    ChangeInfoLimit = 6,
    NicknameDouble = 9,
    NicknameLong = 10,
    ReferrerSelf = 11,
    Failed = 12,
    FailedOpReturn = 13,
    ContentSizeLimit = 33,
    ChangeInfoDoubleInBlock = 36,
    ChangeInfoDoubleInMempool = 38,
    AccountDeleted = 60,
    ManyTransactions = 63,
    NotAllowed = 65,
}

impl ConsensusResult {
    pub fn code(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ConsensusResult::Success
    }
}

impl fmt::Display for ConsensusResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Outcome of a single predicate or step: `Err` carries the rejection reason
pub type StepResult = std::result::Result<(), ConsensusResult>;

/// Pipeline step that produced a decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Structural check of the transaction alone
    Check,
    /// Chain-context predicates
    Validate,
    /// Conflicts with the candidate block
    Block,
    /// Conflicts with the pending pool
    Mempool,
}

/// Accept/reject decision returned to pool admission and block connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub accepted: bool,
    pub reason: ConsensusResult,
    /// Step that decided; the last step run when accepted
    pub stage: Stage,
}

impl ValidationOutcome {
    pub fn success(stage: Stage) -> Self {
        Self {
            accepted: true,
            reason: ConsensusResult::Success,
            stage,
        }
    }

    pub fn rejected(reason: ConsensusResult, stage: Stage) -> Self {
        Self {
            accepted: reason.is_success(),
            reason,
            stage,
        }
    }

    /// Build an outcome from a step result
    pub fn from_step(step: StepResult, stage: Stage) -> Self {
        match step {
            Ok(()) => Self::success(stage),
            Err(reason) => Self::rejected(reason, stage),
        }
    }
}

impl fmt::Display for ValidationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.accepted {
            write!(f, "accepted")
        } else {
            write!(f, "rejected at {:?}: {} ({})", self.stage, self.reason, self.reason.code())
        }
    }
}
