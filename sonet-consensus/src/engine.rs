//! Consensus engine facade.
//!
//! Owns the rule schedules and the checkpoint registry for one network and
//! answers validation requests from pool admission and block connection.
//! The engine holds no mutable state; a single instance is shared by
//! reference across threads.

use crate::checkpoints::CheckpointRegistry;
use crate::config::EngineConfig;
use crate::factory::ConsensusFactory;
use crate::provider::ChainFacts;
use crate::rules::{Facts, Placement, Rule, RuleCategory, RuleEnv};
use crate::{ConsensusError, ConsensusResult, Result, Stage, ValidationOutcome};
use sonet_core::{CandidateBlock, Height, SocialTransaction};
use tracing::{debug, info, warn};

/// Decision for one transaction of a block
#[derive(Debug)]
pub struct BlockEntry {
    /// Transaction hash
    pub hash: String,
    /// Engine faults are kept per entry and never abort the block scan
    pub outcome: Result<ValidationOutcome>,
}

/// Per-transaction decisions for a candidate block, in block order
#[derive(Debug)]
pub struct BlockReport {
    /// Height of the candidate block
    pub height: Height,
    /// One entry per transaction
    pub entries: Vec<BlockEntry>,
}

impl BlockReport {
    /// Every transaction was evaluated and accepted
    pub fn is_valid(&self) -> bool {
        self.entries
            .iter()
            .all(|e| matches!(&e.outcome, Ok(outcome) if outcome.accepted))
    }

    /// Consensus rejections, in block order
    pub fn rejected(&self) -> impl Iterator<Item = (&str, &ValidationOutcome)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            Ok(outcome) if !outcome.accepted => Some((e.hash.as_str(), outcome)),
            _ => None,
        })
    }

    /// Engine faults, in block order
    pub fn faults(&self) -> impl Iterator<Item = (&str, &ConsensusError)> {
        self.entries.iter().filter_map(|e| match &e.outcome {
            Err(err) => Some((e.hash.as_str(), err)),
            Ok(_) => None,
        })
    }

    pub fn accepted_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| matches!(&e.outcome, Ok(outcome) if outcome.accepted))
            .count()
    }
}

/// Validation entry point for one network.
///
/// Built from an [`EngineConfig`]; chain facts are supplied per call through
/// a [`ChainFacts`] provider.
pub struct ConsensusEngine {
    config: EngineConfig,
    factory: ConsensusFactory,
    checkpoints: CheckpointRegistry,
}

impl ConsensusEngine {
    /// Build the engine for `config.network` with its embedded checkpoints
    pub fn new(config: EngineConfig) -> Result<Self> {
        let checkpoints = CheckpointRegistry::embedded(config.network)?;
        Self::with_checkpoints(config, checkpoints)
    }

    /// Build the engine with an explicit checkpoint registry
    pub fn with_checkpoints(config: EngineConfig, checkpoints: CheckpointRegistry) -> Result<Self> {
        config.validate()?;

        let factory =
            ConsensusFactory::for_network(config.network, config.enforcement, &config.limit_overrides)?;

        info!(
            network = %config.network,
            rules = RuleCategory::ALL.iter().map(|c| factory.rule_count(*c)).sum::<usize>(),
            social_checkpoints = checkpoints.social_count(),
            digest_checkpoints = checkpoints.digest_count(),
            "consensus engine ready"
        );

        Ok(Self {
            config,
            factory,
            checkpoints,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn factory(&self) -> &ConsensusFactory {
        &self.factory
    }

    pub fn checkpoints(&self) -> &CheckpointRegistry {
        &self.checkpoints
    }

    /// Rule in force for `tx` at `height`.
    ///
    /// A type outside every category is a fault; a category without an
    /// active rule yields `None`.
    pub fn rule_for(&self, tx: &SocialTransaction, height: Height) -> Result<Option<&Rule>> {
        let category = RuleCategory::of(tx.tx_type())
            .ok_or(ConsensusError::UnsupportedTransactionType(tx.tx_type()))?;
        Ok(self.factory.get_rule(category, height))
    }

    fn env(&self, height: Height) -> RuleEnv<'_> {
        RuleEnv {
            height,
            checkpoints: &self.checkpoints,
        }
    }

    /// Structural check of `tx` under the rules active at `height`
    pub fn check(&self, tx: &SocialTransaction, height: Height) -> Result<ValidationOutcome> {
        let Some(rule) = self.rule_for(tx, height)? else {
            return Ok(not_allowed(tx, height, Stage::Check));
        };

        let step = rule.check(tx, &self.env(height))?;
        Ok(ValidationOutcome::from_step(step, Stage::Check))
    }

    /// Contextual validation at `placement`
    pub fn validate(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<ValidationOutcome> {
        let height = placement.height();
        let Some(rule) = self.rule_for(tx, height)? else {
            return Ok(not_allowed(tx, height, Stage::Validate));
        };

        rule.validate(tx, placement, &self.env(height), provider)
    }

    /// Facts the active rule needs for `tx` at `placement`, or `None` without an active rule
    pub fn fetch_facts(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<Option<Facts>> {
        let height = placement.height();
        match self.rule_for(tx, height)? {
            Some(rule) => Ok(Some(rule.fetch_facts(tx, placement, &self.env(height), provider)?)),
            None => Ok(None),
        }
    }

    /// Block-conflict step alone
    pub fn validate_block_step(&self, tx: &SocialTransaction, block: &CandidateBlock) -> Result<ValidationOutcome> {
        let Some(rule) = self.rule_for(tx, block.height)? else {
            return Ok(not_allowed(tx, block.height, Stage::Block));
        };

        let step = rule.validate_block(tx, block, &self.env(block.height));
        Ok(ValidationOutcome::from_step(step, Stage::Block))
    }

    /// Pool-conflict step alone, over facts fetched at `height`
    pub fn validate_mempool_step(
        &self,
        tx: &SocialTransaction,
        height: Height,
        facts: &Facts,
    ) -> Result<ValidationOutcome> {
        let Some(rule) = self.rule_for(tx, height)? else {
            return Ok(not_allowed(tx, height, Stage::Mempool));
        };

        let step = rule.validate_mempool(tx, facts)?;
        Ok(ValidationOutcome::from_step(step, Stage::Mempool))
    }

    /// Full acceptance: check, then validate at `placement`
    pub fn accept(
        &self,
        tx: &SocialTransaction,
        placement: Placement<'_>,
        provider: &dyn ChainFacts,
    ) -> Result<ValidationOutcome> {
        let checked = self.check(tx, placement.height())?;
        if !checked.accepted {
            return Ok(checked);
        }

        let outcome = self.validate(tx, placement, provider)?;
        if !outcome.accepted {
            debug!(hash = tx.hash(), %outcome, "transaction rejected");
        }
        Ok(outcome)
    }

    /// Accept every transaction of `block` independently
    pub fn validate_block(&self, block: &CandidateBlock, provider: &dyn ChainFacts) -> BlockReport {
        let entries = block
            .transactions
            .iter()
            .map(|tx| {
                let outcome = self.accept(tx, Placement::Block(block), provider);
                if let Err(err) = &outcome {
                    warn!(hash = tx.hash(), height = block.height, error = %err, "validation fault");
                }
                BlockEntry {
                    hash: tx.hash().to_string(),
                    outcome,
                }
            })
            .collect();

        BlockReport {
            height: block.height,
            entries,
        }
    }
}

fn not_allowed(tx: &SocialTransaction, height: Height, stage: Stage) -> ValidationOutcome {
    debug!(hash = tx.hash(), tx_type = %tx.tx_type(), height, "no rule active");
    ValidationOutcome::rejected(ConsensusResult::NotAllowed, stage)
}
