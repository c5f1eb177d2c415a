//! Allow-list of historical consensus exceptions.
//!
//! Some transactions were mined before a rule was tightened and would fail
//! it today. Instead of branching predicates on height, each such
//! transaction is listed here with the result it is allowed to override.
//! The lists are embedded per network and loaded once at startup.

use crate::config::Network;
use crate::{ConsensusError, ConsensusResult, Result};
use serde::{Deserialize, Serialize};
use sonet_core::TxType;
use std::collections::{BTreeMap, BTreeSet};

const MAIN_CHECKPOINTS: &str = include_str!("../checkpoints/main.json");
const TEST_CHECKPOINTS: &str = include_str!("../checkpoints/test.json");
const REGTEST_CHECKPOINTS: &str = include_str!("../checkpoints/regtest.json");

/// Overridden result for one transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
struct SocialEntry {
    hash: String,
    tx_type: TxType,
    result: ConsensusResult,
}

/// Accepted digest for a transaction serialized under an older format
#[derive(Debug, Clone, Serialize, Deserialize)]
struct DigestEntry {
    hash: String,
    digest: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CheckpointList {
    #[serde(default)]
    social: Vec<SocialEntry>,
    #[serde(default)]
    digest: Vec<DigestEntry>,
}

/// Immutable checkpoint lookup tables
#[derive(Debug, Clone, Default)]
pub struct CheckpointRegistry {
    social: BTreeMap<String, BTreeMap<TxType, BTreeSet<ConsensusResult>>>,
    digest: BTreeMap<String, BTreeSet<String>>,
}

impl CheckpointRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry built from the list embedded for `network`
    pub fn embedded(network: Network) -> Result<Self> {
        let json = match network {
            Network::Main => MAIN_CHECKPOINTS,
            Network::Test => TEST_CHECKPOINTS,
            Network::Regtest => REGTEST_CHECKPOINTS,
        };
        Self::from_json(json)
    }

    /// Parse a checkpoint list document
    pub fn from_json(json: &str) -> Result<Self> {
        let list: CheckpointList = serde_json::from_str(json)
            .map_err(|e| ConsensusError::MalformedCheckpoints(e.to_string()))?;

        let mut registry = Self::new();
        for entry in list.social {
            if entry.result.is_success() {
                return Err(ConsensusError::MalformedCheckpoints(format!(
                    "checkpoint {} overrides Success",
                    entry.hash
                )));
            }
            registry = registry.with_social(entry.hash, entry.tx_type, entry.result);
        }
        for entry in list.digest {
            registry = registry.with_digest(entry.hash, entry.digest);
        }

        Ok(registry)
    }

    /// Allow `result` to be overridden for transaction `hash` of `tx_type`
    pub fn with_social(mut self, hash: impl Into<String>, tx_type: TxType, result: ConsensusResult) -> Self {
        self.social
            .entry(hash.into())
            .or_default()
            .entry(tx_type)
            .or_default()
            .insert(result);
        self
    }

    /// Accept `digest` as the payload digest of transaction `hash`
    pub fn with_digest(mut self, hash: impl Into<String>, digest: impl Into<String>) -> Self {
        self.digest.entry(hash.into()).or_default().insert(digest.into());
        self
    }

    /// Whether `result` is allowed to pass for this transaction
    pub fn is_checkpoint(&self, hash: &str, tx_type: TxType, result: ConsensusResult) -> bool {
        self.social
            .get(hash)
            .and_then(|by_type| by_type.get(&tx_type))
            .is_some_and(|results| results.contains(&result))
    }

    /// Whether `digest` is an accepted recomputed digest for this transaction
    pub fn is_digest_checkpoint(&self, hash: &str, digest: &str) -> bool {
        self.digest
            .get(hash)
            .is_some_and(|digests| digests.contains(digest))
    }

    /// Number of (hash, type, result) overrides
    pub fn social_count(&self) -> usize {
        self.social
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeSet::len)
            .sum()
    }

    /// Number of (hash, digest) exceptions
    pub fn digest_count(&self) -> usize {
        self.digest.values().map(BTreeSet::len).sum()
    }
}
