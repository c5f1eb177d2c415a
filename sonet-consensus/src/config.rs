//! Engine configuration

use crate::limits::LimitName;
use crate::{ConsensusError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Chain the node follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Network {
    #[default]
    Main,
    Test,
    Regtest,
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Network::Main => "main",
            Network::Test => "test",
            Network::Regtest => "regtest",
        };
        f.write_str(name)
    }
}

/// Predicates that historical nodes evaluated but only logged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SoftCheck {
    EmptyNickname,
    NicknameLength,
    NicknameCharset,
    BlockDuplicateNickname,
    PayloadDigest,
}

/// Per-check enforcement switches.
///
/// A disabled check still runs and logs what it would have rejected, then
/// lets the step continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnforcementPolicy {
    pub empty_nickname: bool,
    pub nickname_length: bool,
    pub nickname_charset: bool,
    pub block_duplicate_nickname: bool,
    pub payload_digest: bool,
}

impl EnforcementPolicy {
    /// Every check rejects
    pub fn strict() -> Self {
        Self {
            empty_nickname: true,
            nickname_length: true,
            nickname_charset: true,
            block_duplicate_nickname: true,
            payload_digest: true,
        }
    }

    /// Every check only logs, as on historical nodes
    pub fn lenient() -> Self {
        Self {
            empty_nickname: false,
            nickname_length: false,
            nickname_charset: false,
            block_duplicate_nickname: false,
            payload_digest: false,
        }
    }

    pub fn enforces(&self, check: SoftCheck) -> bool {
        match check {
            SoftCheck::EmptyNickname => self.empty_nickname,
            SoftCheck::NicknameLength => self.nickname_length,
            SoftCheck::NicknameCharset => self.nickname_charset,
            SoftCheck::BlockDuplicateNickname => self.block_duplicate_nickname,
            SoftCheck::PayloadDigest => self.payload_digest,
        }
    }
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self::strict()
    }
}

/// Consensus engine configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Network whose rule schedule and checkpoints are loaded
    pub network: Network,
    /// Soft-check switches
    pub enforcement: EnforcementPolicy,
    /// Limit values replacing the built-in ones; regtest only
    pub limit_overrides: BTreeMap<LimitName, u64>,
}

impl EngineConfig {
    pub fn for_network(network: Network) -> Self {
        Self {
            network,
            ..Self::default()
        }
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !self.limit_overrides.is_empty() && self.network != Network::Regtest {
            return Err(ConsensusError::ConfigurationError(format!(
                "limit overrides are only allowed on regtest, network is {}",
                self.network
            )));
        }

        Ok(())
    }
}
