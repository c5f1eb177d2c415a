//! Height-indexed rule schedules.
//!
//! Each [`RuleCategory`] owns a list of [`RuleCheckpoint`]s sorted by
//! `(activation, ordinal)`. The rule for a height is the latest entry
//! activated at or below it that has not been deactivated, so a block
//! replayed years later sees exactly the rules it was mined under.

use crate::config::{EnforcementPolicy, Network};
use crate::constants;
use crate::limits::{LimitName, LimitTable};
use crate::rules::{AccountDeleteRule, AccountUserRule, BarteronAccountRule, Rule, RuleCategory};
use crate::{ConsensusError, Result};
use sonet_core::Height;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// One version of a category's rule
#[derive(Debug, Clone)]
pub struct RuleCheckpoint {
    pub activation: Height,
    /// First height the rule no longer applies to
    pub deactivation: Option<Height>,
    /// Tie breaker among equal activations; larger wins
    pub ordinal: u32,
    pub rule: Rule,
}

impl RuleCheckpoint {
    pub fn new(activation: Height, rule: Rule) -> Self {
        Self {
            activation,
            deactivation: None,
            ordinal: 0,
            rule,
        }
    }

    pub fn with_ordinal(mut self, ordinal: u32) -> Self {
        self.ordinal = ordinal;
        self
    }

    pub fn until(mut self, deactivation: Height) -> Self {
        self.deactivation = Some(deactivation);
        self
    }

    fn key(&self) -> (Height, u32) {
        (self.activation, self.ordinal)
    }

    fn is_open_at(&self, height: Height) -> bool {
        self.deactivation.map_or(true, |end| end > height)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConsensusFactory {
    schedules: BTreeMap<RuleCategory, Vec<RuleCheckpoint>>,
}

impl ConsensusFactory {
    /// Factory with no schedules
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in schedules for `network`, with regtest limit overrides applied
    pub fn for_network(
        network: Network,
        policy: EnforcementPolicy,
        overrides: &BTreeMap<LimitName, u64>,
    ) -> Result<Self> {
        let mut user_limits = AccountUserRule::default_limits(network)?;
        let mut barteron_limits = BarteronAccountRule::default_limits(network)?;
        apply_overrides(&mut [&mut user_limits, &mut barteron_limits], overrides)?;

        let barteron_activation = match network {
            Network::Main => constants::BARTERON_MAIN_ACTIVATION,
            Network::Test => constants::BARTERON_TEST_ACTIVATION,
            Network::Regtest => 0,
        };

        let mut factory = Self::new();
        factory.register(RuleCheckpoint::new(
            0,
            Rule::AccountUser(AccountUserRule::with_limits(user_limits, policy)),
        ))?;
        factory.register(RuleCheckpoint::new(
            0,
            Rule::AccountDelete(AccountDeleteRule::new(policy)),
        ))?;
        factory.register(RuleCheckpoint::new(
            barteron_activation,
            Rule::BarteronAccount(BarteronAccountRule::with_limits(barteron_limits, policy)),
        ))?;

        Ok(factory)
    }

    /// Append a checkpoint to its category's schedule.
    ///
    /// Checkpoints must be registered in increasing `(activation, ordinal)`
    /// order.
    pub fn register(&mut self, checkpoint: RuleCheckpoint) -> Result<()> {
        let category = checkpoint.rule.category();

        if let Some(end) = checkpoint.deactivation {
            if end <= checkpoint.activation {
                return Err(ConsensusError::CheckpointOrder {
                    category: category.to_string(),
                    reason: format!(
                        "deactivation {} not after activation {}",
                        end, checkpoint.activation
                    ),
                });
            }
        }

        let schedule = self.schedules.entry(category).or_default();
        if let Some(last) = schedule.last() {
            if checkpoint.key() <= last.key() {
                return Err(ConsensusError::CheckpointOrder {
                    category: category.to_string(),
                    reason: format!(
                        "({}, {}) registered after ({}, {})",
                        checkpoint.activation, checkpoint.ordinal, last.activation, last.ordinal
                    ),
                });
            }
        }

        debug!(%category, activation = checkpoint.activation, ordinal = checkpoint.ordinal, "rule registered");
        schedule.push(checkpoint);
        Ok(())
    }

    /// Rule of `category` in force at `height`, if any
    pub fn get_rule(&self, category: RuleCategory, height: Height) -> Option<&Rule> {
        let schedule = self.schedules.get(&category)?;
        let activated = schedule.partition_point(|c| c.activation <= height);

        let selected = schedule[..activated]
            .iter()
            .rev()
            .find(|c| c.is_open_at(height))?;

        debug!(%category, height, activation = selected.activation, "rule selected");
        Some(&selected.rule)
    }

    /// Number of checkpoints registered for `category`
    pub fn rule_count(&self, category: RuleCategory) -> usize {
        self.schedules.get(&category).map_or(0, Vec::len)
    }
}

/// Override each named limit in every table that registers it
fn apply_overrides(tables: &mut [&mut LimitTable], overrides: &BTreeMap<LimitName, u64>) -> Result<()> {
    let mut applied = BTreeSet::new();

    for (&name, &value) in overrides {
        for table in tables.iter_mut() {
            if table.contains(name) {
                table.override_value(name, value)?;
                applied.insert(name);
            }
        }
    }

    if let Some(name) = overrides.keys().find(|name| !applied.contains(*name)) {
        return Err(ConsensusError::LimitNotRegistered(*name));
    }

    Ok(())
}
