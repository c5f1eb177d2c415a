//! SoNet Consensus Layer - deterministic social transaction validation
//!
//! This crate decides whether a social transaction is admissible to the
//! pending pool or valid inside a candidate block. Every decision is a pure
//! function of the transaction, the block height, the candidate block and the
//! facts read from a [`ChainFacts`] provider, so every node replaying history
//! reaches the same verdict.

pub mod checkpoints;
pub mod config;
pub mod engine;
pub mod error;
pub mod factory;
pub mod limits;
pub mod memory;
pub mod provider;
pub mod result;
pub mod rules;

pub use checkpoints::CheckpointRegistry;
pub use config::{EngineConfig, EnforcementPolicy, Network, SoftCheck};
pub use engine::{BlockEntry, BlockReport, ConsensusEngine};
pub use error::{ConsensusError, ProviderError};
pub use factory::{ConsensusFactory, RuleCheckpoint};
pub use limits::{LimitEntry, LimitName, LimitTable};
pub use memory::MemoryChainState;
pub use provider::{ChainFacts, DuplicateCounts};
pub use result::{ConsensusResult, Stage, StepResult, ValidationOutcome};
pub use rules::{Facts, Placement, Rule, RuleCategory, RuleEnv};

/// Result type for consensus operations
pub type Result<T> = std::result::Result<T, ConsensusError>;

/// Consensus rules version
pub const CONSENSUS_VERSION: &str = "0.1.0";

/// Network activation heights
pub mod constants {
    use sonet_core::Height;

    /// Height used for rules whose activation is not scheduled yet
    pub const UNSCHEDULED: Height = 99_999_999;

    /// First main-network height accepting barter accounts
    // TODO: replace with the release height once the barter fork is scheduled
    pub const BARTERON_MAIN_ACTIVATION: Height = UNSCHEDULED;

    /// First test-network height accepting barter accounts
    // TODO: replace with the release height once the barter fork is scheduled
    pub const BARTERON_TEST_ACTIVATION: Height = UNSCHEDULED;
}
