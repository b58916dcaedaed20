//! Account configuration
//!
//! Everything an [`Account`](crate::account::Account) or
//! [`MultisigCoordinator`](crate::multisig::MultisigCoordinator) needs to know
//! about the account it drives. Passed explicitly into constructors.

use crate::session::SessionGrant;
use crate::types::{TransactionVersion, felt_to_hex};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

/// Default fee multiplier applied to estimates (percent)
pub const DEFAULT_FEE_MULTIPLIER_PCT: u32 = 150;

fn default_fee_multiplier() -> u32 {
    DEFAULT_FEE_MULTIPLIER_PCT
}

/// Configuration of one modular account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Account contract address
    pub address: Felt,
    /// Chain the account lives on
    pub chain_id: Felt,
    /// Class hash of the core (owner) validator module
    #[serde(default)]
    pub core_validator_class: Option<Felt>,
    /// Class hash of the session-key validator module
    #[serde(default)]
    pub session_validator_class: Option<Felt>,
    /// Transaction version used when options do not override it
    #[serde(default)]
    pub version: TransactionVersion,
    /// Fee estimate multiplier in percent
    #[serde(default = "default_fee_multiplier")]
    pub fee_multiplier_pct: u32,
    /// Co-signatures required by the core validator
    #[serde(default)]
    pub multisig_threshold: Option<usize>,
    /// Default lifetime of new session grants, in seconds
    #[serde(default)]
    pub session_ttl_secs: Option<u64>,
}

impl AccountConfig {
    /// Config with defaults for everything but address and chain
    pub fn new(address: Felt, chain_id: Felt) -> Self {
        Self {
            address,
            chain_id,
            core_validator_class: None,
            session_validator_class: None,
            version: TransactionVersion::default(),
            fee_multiplier_pct: DEFAULT_FEE_MULTIPLIER_PCT,
            multisig_threshold: None,
            session_ttl_secs: None,
        }
    }

    /// Parse and validate a JSON config document
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the core validator class
    pub fn with_core_validator(mut self, class_hash: Felt) -> Self {
        self.core_validator_class = Some(class_hash);
        self
    }

    /// Set the session-key validator class
    pub fn with_session_validator(mut self, class_hash: Felt) -> Self {
        self.session_validator_class = Some(class_hash);
        self
    }

    /// Set the default transaction version
    pub fn with_version(mut self, version: TransactionVersion) -> Self {
        self.version = version;
        self
    }

    /// Set the fee multiplier (percent)
    pub fn with_fee_multiplier(mut self, pct: u32) -> Self {
        self.fee_multiplier_pct = pct;
        self
    }

    /// Set the multisig threshold
    pub fn with_multisig_threshold(mut self, threshold: usize) -> Self {
        self.multisig_threshold = Some(threshold);
        self
    }

    /// Set the default session lifetime
    pub fn with_session_ttl(mut self, ttl_secs: u64) -> Self {
        self.session_ttl_secs = Some(ttl_secs);
        self
    }

    /// Session grant on this account for `auth_key`
    ///
    /// Expires after `session_ttl_secs` when set, otherwise never.
    pub fn session_grant(&self, auth_key: Felt) -> Result<SessionGrant> {
        let validator_class = self
            .session_validator_class
            .ok_or_else(|| Error::InvalidConfig("no session validator configured".into()))?;

        let grant = SessionGrant::new(self.address, validator_class, auth_key, self.chain_id);
        Ok(match self.session_ttl_secs {
            Some(ttl) => grant.expires_in(ttl),
            None => grant,
        })
    }

    /// Check internal consistency
    pub fn validate(&self) -> Result<()> {
        if self.address == Felt::ZERO {
            return Err(Error::InvalidConfig("account address is zero".into()));
        }
        if self.fee_multiplier_pct < 100 {
            return Err(Error::InvalidConfig(format!(
                "fee multiplier {}% would under-fund estimates",
                self.fee_multiplier_pct
            )));
        }
        if self.multisig_threshold == Some(0) {
            return Err(Error::InvalidConfig("multisig threshold must be at least 1".into()));
        }
        if let (Some(core), Some(session)) =
            (self.core_validator_class, self.session_validator_class)
        {
            if core == session {
                return Err(Error::InvalidConfig(format!(
                    "core and session validator share class {}",
                    felt_to_hex(&core)
                )));
            }
        }
        Ok(())
    }
}
