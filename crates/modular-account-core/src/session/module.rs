//! Session-key module
//!
//! Holds one session authorization and walks it through its lifecycle:
//!
//! ```text
//!   Unbound --request(g)--> Bound --add_signature--> Signed
//!      ^                      |                        |
//!      +-------reset----------+------------reset-------+
//! ```
//!
//! The grantor class is bound once; asking again with a different grantor is
//! a [`Error::GrantorConflict`] until the authorization is reset. Signature
//! components are append-only so several grantor signers can contribute.

use super::message::hash_auth_message;
use crate::account::AccountModule;
use crate::policy::PolicyManager;
use crate::types::{Call, SignatureComponents, felt_to_hex, felt_to_u64, selector_from_name};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;
use std::fmt;
use tracing::debug;

/// Entrypoint that receives module prefix calls
pub const MODULE_VALIDATE_ENTRYPOINT: &str = "__module_validate__";

/// Number of fixed calldata words after the count in a session prefix
const SESSION_PREFIX_FIXED_WORDS: usize = 6;

/// Lifecycle state of a session authorization
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// No grantor chosen yet
    Unbound,
    /// Grantor bound, no signature yet
    Bound,
    /// At least one signature component collected
    Signed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Unbound => write!(f, "unbound"),
            SessionState::Bound => write!(f, "bound"),
            SessionState::Signed => write!(f, "signed"),
        }
    }
}

/// Immutable terms of a session grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionGrant {
    /// Account the session is granted on
    pub account_address: Felt,
    /// Session validator class hash
    pub validator_class: Felt,
    /// Session public key
    pub auth_key: Felt,
    /// Expiry timestamp in seconds, 0 for none
    pub expires: Felt,
    /// Policy Merkle root, 0 for unrestricted
    pub policy_root: Felt,
    /// Target chain
    pub chain_id: Felt,
}

impl SessionGrant {
    /// Unrestricted, non-expiring grant
    pub fn new(
        account_address: Felt,
        validator_class: Felt,
        auth_key: Felt,
        chain_id: Felt,
    ) -> Self {
        Self {
            account_address,
            validator_class,
            auth_key,
            expires: Felt::ZERO,
            policy_root: Felt::ZERO,
            chain_id,
        }
    }

    /// Set an absolute expiry timestamp
    pub fn with_expires(mut self, expires: u64) -> Self {
        self.expires = Felt::from(expires);
        self
    }

    /// Expire `ttl_secs` from now
    pub fn expires_in(self, ttl_secs: u64) -> Self {
        let now = chrono::Utc::now().timestamp().max(0) as u64;
        self.with_expires(now.saturating_add(ttl_secs))
    }

    /// Restrict the session to a policy allow-list
    pub fn with_policies(mut self, policies: &PolicyManager) -> Self {
        self.policy_root = policies.root();
        self
    }

    /// Set a raw policy root
    pub fn with_policy_root(mut self, root: Felt) -> Self {
        self.policy_root = root;
        self
    }
}

/// A session authorization: grant terms plus the grantor binding and signature
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorization {
    /// Account the session is granted on
    pub account_address: Felt,
    /// Session validator class hash
    pub validator_class: Felt,
    /// Session public key
    pub auth_key: Felt,
    /// Expiry timestamp, 0 for none
    pub expires: Felt,
    /// Policy Merkle root, 0 for unrestricted
    pub policy_root: Felt,
    /// Target chain
    pub chain_id: Felt,
    /// Entrypoint selector of the prefix call
    pub selector: Felt,
    /// Grantor module class hash, once bound
    pub grantor_class: Option<Felt>,
    /// Grantor signature components
    pub signature: SignatureComponents,
}

impl Authorization {
    fn new(grant: SessionGrant) -> Self {
        Self {
            account_address: grant.account_address,
            validator_class: grant.validator_class,
            auth_key: grant.auth_key,
            expires: grant.expires,
            policy_root: grant.policy_root,
            chain_id: grant.chain_id,
            selector: selector_from_name(MODULE_VALIDATE_ENTRYPOINT),
            grantor_class: None,
            signature: Vec::new(),
        }
    }

    /// Terms this authorization was created from
    pub fn grant(&self) -> SessionGrant {
        SessionGrant {
            account_address: self.account_address,
            validator_class: self.validator_class,
            auth_key: self.auth_key,
            expires: self.expires,
            policy_root: self.policy_root,
            chain_id: self.chain_id,
        }
    }
}

/// Session fields recovered from a prefix call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionPrefix {
    /// Account the prefix targets
    pub account_address: Felt,
    /// Session validator class hash
    pub validator_class: Felt,
    /// Grantor module class hash
    pub grantor_class: Felt,
    /// Session public key
    pub auth_key: Felt,
    /// Expiry timestamp, 0 for none
    pub expires: Felt,
    /// Policy Merkle root
    pub policy_root: Felt,
    /// Grantor signature components
    pub signature: SignatureComponents,
}

impl SessionPrefix {
    /// Decode a `__module_validate__` call carrying a session authorization
    pub fn decode(call: &Call) -> Result<Self> {
        if call.selector != selector_from_name(MODULE_VALIDATE_ENTRYPOINT) {
            return Err(Error::Serialization(format!(
                "call {} is not a module prefix",
                call
            )));
        }

        let data = &call.calldata;
        if data.len() < 1 + SESSION_PREFIX_FIXED_WORDS {
            return Err(Error::Serialization(format!(
                "session prefix too short: {} words",
                data.len()
            )));
        }

        let count = felt_to_u64(&data[0])? as usize;
        if count != data.len() - 1 {
            return Err(Error::Serialization(format!(
                "prefix count {} does not match {} trailing words",
                count,
                data.len() - 1
            )));
        }

        let sig_len = felt_to_u64(&data[6])? as usize;
        let signature = &data[7..];
        if signature.len() != sig_len {
            return Err(Error::Serialization(format!(
                "signature length {} does not match {} components",
                sig_len,
                signature.len()
            )));
        }

        Ok(Self {
            account_address: call.to,
            validator_class: data[1],
            grantor_class: data[2],
            auth_key: data[3],
            expires: data[4],
            policy_root: data[5],
            signature: signature.to_vec(),
        })
    }

    /// Digest the grantor signature must cover
    pub fn digest(&self, chain_id: &Felt) -> Felt {
        hash_auth_message(
            &self.account_address,
            &self.validator_class,
            &self.grantor_class,
            &self.auth_key,
            &self.expires,
            &self.policy_root,
            chain_id,
        )
    }
}

/// Client-side holder of one session authorization
#[derive(Debug, Clone)]
pub struct SessionKeyModule {
    auth: Authorization,
}

impl SessionKeyModule {
    /// Create an unbound module for the given grant
    pub fn new(grant: SessionGrant) -> Self {
        Self {
            auth: Authorization::new(grant),
        }
    }

    /// Current authorization
    pub fn authorization(&self) -> &Authorization {
        &self.auth
    }

    /// Lifecycle state
    pub fn state(&self) -> SessionState {
        match (&self.auth.grantor_class, self.auth.signature.is_empty()) {
            (None, _) => SessionState::Unbound,
            (Some(_), true) => SessionState::Bound,
            (Some(_), false) => SessionState::Signed,
        }
    }

    /// Bind a grantor (once) and return the digest it must sign
    ///
    /// Re-requesting with the already bound grantor is idempotent.
    pub fn request(&mut self, grantor_class: Felt) -> Result<Felt> {
        match self.auth.grantor_class {
            Some(bound) if bound != grantor_class => {
                return Err(Error::GrantorConflict {
                    bound,
                    requested: grantor_class,
                });
            }
            Some(_) => {}
            None => {
                debug!(grantor = %felt_to_hex(&grantor_class), "Binding session grantor");
                self.auth.grantor_class = Some(grantor_class);
            }
        }

        self.digest()
    }

    /// Authorization digest under the bound grantor
    pub fn digest(&self) -> Result<Felt> {
        let grantor_class = self
            .auth
            .grantor_class
            .ok_or_else(|| Error::NotReady("no grantor bound".into()))?;

        Ok(hash_auth_message(
            &self.auth.account_address,
            &self.auth.validator_class,
            &grantor_class,
            &self.auth.auth_key,
            &self.auth.expires,
            &self.auth.policy_root,
            &self.auth.chain_id,
        ))
    }

    /// Append grantor signature components
    pub fn add_signature(&mut self, components: &[Felt]) -> Result<()> {
        if self.auth.grantor_class.is_none() {
            return Err(Error::NotReady(
                "cannot add a signature before a grantor is bound".into(),
            ));
        }

        self.auth.signature.extend_from_slice(components);
        debug!(
            added = components.len(),
            total = self.auth.signature.len(),
            "Session signature components appended"
        );
        Ok(())
    }

    /// Return to `Unbound`, keeping the grant terms
    pub fn reset(&mut self) {
        self.auth.grantor_class = None;
        self.auth.signature.clear();
    }

    /// Parse a prefix call back into its session fields
    pub fn decode_prefix(call: &Call) -> Result<SessionPrefix> {
        SessionPrefix::decode(call)
    }

    /// Build the `__module_validate__` prefix call
    ///
    /// Calldata: `[count, validator, grantor, auth_key, expires, root,
    /// sig_len, ...sig]` where `count` is the number of words that follow it.
    pub fn prefix_call(&self) -> Result<Call> {
        let grantor_class = self
            .auth
            .grantor_class
            .ok_or_else(|| Error::NotReady("no grantor bound".into()))?;

        let signature = &self.auth.signature;
        let count = SESSION_PREFIX_FIXED_WORDS + signature.len();

        let mut calldata = Vec::with_capacity(1 + count);
        calldata.push(Felt::from(count as u64));
        calldata.push(self.auth.validator_class);
        calldata.push(grantor_class);
        calldata.push(self.auth.auth_key);
        calldata.push(self.auth.expires);
        calldata.push(self.auth.policy_root);
        calldata.push(Felt::from(signature.len() as u64));
        calldata.extend_from_slice(signature);

        Ok(Call::new(
            self.auth.account_address,
            self.auth.selector,
            calldata,
        ))
    }
}

impl AccountModule for SessionKeyModule {
    fn prefix(&self, _calls: &[Call]) -> Result<Call> {
        self.prefix_call()
    }
}
