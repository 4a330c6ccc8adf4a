//! Ledger configuration: who administers it and who starts out as a fundraiser.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use fundraising_core::{DomainError, Identity, LedgerId};

use crate::error::LedgerError;
use crate::ledger::{CallContext, Ledger};

/// Required: identity of the administrator.
pub const ADMIN_ENV: &str = "FUNDRAISING_ADMIN";
/// Optional: comma-separated identities activated at creation.
pub const FUNDRAISERS_ENV: &str = "FUNDRAISING_FUNDRAISERS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid identity in {setting}: {source}")]
    InvalidIdentity {
        setting: &'static str,
        #[source]
        source: DomainError,
    },

    #[error("invalid ledger config json: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerConfig {
    pub administrator: Identity,
    #[serde(default)]
    pub initial_fundraisers: Vec<Identity>,
}

impl LedgerConfig {
    pub fn new(administrator: Identity) -> Self {
        Self {
            administrator,
            initial_fundraisers: Vec::new(),
        }
    }

    pub fn with_fundraiser(mut self, fundraiser: Identity) -> Self {
        self.initial_fundraisers.push(fundraiser);
        self
    }

    /// Read [`ADMIN_ENV`] and [`FUNDRAISERS_ENV`] from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LedgerConfig::from_env`], reading settings through `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let admin = lookup(ADMIN_ENV)
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing(ADMIN_ENV))?;
        let administrator = parse_identity(ADMIN_ENV, &admin)?;

        let initial_fundraisers = match lookup(FUNDRAISERS_ENV) {
            Some(list) => list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| parse_identity(FUNDRAISERS_ENV, s))
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        Ok(Self {
            administrator,
            initial_fundraisers,
        })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Create a fresh ledger with the configured administrator as creator.
    pub fn build(&self, at: DateTime<Utc>) -> Result<Ledger, LedgerError> {
        Ledger::new(
            LedgerId::new(),
            &CallContext::new(self.administrator, at),
            &self.initial_fundraisers,
        )
    }
}

fn parse_identity(setting: &'static str, value: &str) -> Result<Identity, ConfigError> {
    value
        .parse()
        .map_err(|source| ConfigError::InvalidIdentity { setting, source })
}
