//! Height-versioned numeric consensus limits

use crate::{ConsensusError, Result};
use serde::{Deserialize, Serialize};
use sonet_core::Height;
use std::collections::BTreeMap;
use std::fmt;

/// Name of a consensus limit
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitName {
    /// Lookback window, in blocks, for duplicate and edit-rate checks
    Depth,
    /// Account edits allowed inside the lookback window
    EditAccountDailyCount,
    /// Summed payload bytes of a user account transaction
    MaxUserSize,
    /// Nickname bytes
    MaxNicknameLength,
    /// Summed payload bytes of a barter account transaction
    PayloadSize,
}

impl LimitName {
    pub fn as_str(self) -> &'static str {
        match self {
            LimitName::Depth => "depth",
            LimitName::EditAccountDailyCount => "edit_account_daily_count",
            LimitName::MaxUserSize => "max_user_size",
            LimitName::MaxNicknameLength => "max_nickname_length",
            LimitName::PayloadSize => "payload_size",
        }
    }
}

impl fmt::Display for LimitName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One version of a limit, effective from `activation` onwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitEntry {
    pub activation: Height,
    /// Lowest value an override may set
    pub min: u64,
    /// Highest value an override may set
    pub max: u64,
    /// Effective value
    pub default: u64,
}

impl LimitEntry {
    pub fn new(activation: Height, min: u64, max: u64, default: u64) -> Self {
        Self {
            activation,
            min,
            max,
            default,
        }
    }

    /// Entry whose value cannot be overridden
    pub fn fixed(activation: Height, value: u64) -> Self {
        Self::new(activation, value, value, value)
    }

    fn contains(&self, value: u64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Set of limits owned by one rule variant.
///
/// Filled at construction, read-only afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitTable {
    entries: BTreeMap<LimitName, Vec<LimitEntry>>,
}

impl LimitTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every version of `name`.
    ///
    /// Activation heights must be strictly increasing and each default must
    /// lie inside its own bounds.
    pub fn set(&mut self, name: LimitName, entries: Vec<LimitEntry>) -> Result<()> {
        if entries.is_empty() {
            return Err(ConsensusError::InvalidLimit {
                name,
                reason: "no entries".to_string(),
            });
        }

        for pair in entries.windows(2) {
            if pair[1].activation <= pair[0].activation {
                return Err(ConsensusError::InvalidLimit {
                    name,
                    reason: format!(
                        "activation {} does not follow {}",
                        pair[1].activation, pair[0].activation
                    ),
                });
            }
        }

        if let Some(entry) = entries.iter().find(|e| !e.contains(e.default)) {
            return Err(ConsensusError::InvalidLimit {
                name,
                reason: format!(
                    "default {} outside [{}, {}] at activation {}",
                    entry.default, entry.min, entry.max, entry.activation
                ),
            });
        }

        self.entries.insert(name, entries);
        Ok(())
    }

    /// Builder form of [`LimitTable::set`]
    pub fn with(mut self, name: LimitName, entries: Vec<LimitEntry>) -> Result<Self> {
        self.set(name, entries)?;
        Ok(self)
    }

    /// Value of `name` in force at `height`
    pub fn get(&self, name: LimitName, height: Height) -> Result<u64> {
        let entries = self
            .entries
            .get(&name)
            .ok_or(ConsensusError::LimitNotRegistered(name))?;

        let active = entries.partition_point(|e| e.activation <= height);
        if active == 0 {
            return Err(ConsensusError::LimitNotActive { name, height });
        }

        Ok(entries[active - 1].default)
    }

    pub fn contains(&self, name: LimitName) -> bool {
        self.entries.contains_key(&name)
    }

    /// Replace the value of every version of `name`, within each version's bounds
    pub fn override_value(&mut self, name: LimitName, value: u64) -> Result<()> {
        let entries = self
            .entries
            .get_mut(&name)
            .ok_or(ConsensusError::LimitNotRegistered(name))?;

        if let Some(entry) = entries.iter().find(|e| !e.contains(value)) {
            return Err(ConsensusError::InvalidLimit {
                name,
                reason: format!(
                    "override {} outside [{}, {}] at activation {}",
                    value, entry.min, entry.max, entry.activation
                ),
            });
        }

        for entry in entries.iter_mut() {
            entry.default = value;
        }
        Ok(())
    }
}
