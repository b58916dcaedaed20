//! Authorization message digest
//!
//! The digest a grantor signs is a typed-data style hash over the session
//! terms, the bound modules and the chain. The type hashes are fixed wire
//! values: the on-chain session validator recomputes exactly these.

use crate::hash::elements_hash;
use starknet_types_core::felt::Felt;

/// Type hash of the `StarkNetDomain` struct
pub const STARKNET_DOMAIN_TYPE_HASH: Felt =
    Felt::from_hex_unchecked("0x13cda234a04d66db62c06b8e3ad5f91bd0c67286c2c7519a826cf49da6ba478");

/// Type hash of the `Session` struct
pub const SESSION_TYPE_HASH: Felt =
    Felt::from_hex_unchecked("0x1aa0e1c56b45cf06a54534fa1707c54e520b842feb21d03b7deddb6f1e340c");

/// `"StarkNet Message"` as a short string
pub const STARKNET_MESSAGE: Felt = Felt::from_hex_unchecked("0x537461726b4e6574204d657373616765");

/// Inputs to the authorization digest
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthMessage {
    /// Account the session is granted on
    pub account_address: Felt,
    /// Class hash of the session-key validator module
    pub validator_class: Felt,
    /// Class hash of the module that authorizes the grant
    pub grantor_class: Felt,
    /// Session public key
    pub auth_key: Felt,
    /// Expiry timestamp (0 = none)
    pub expires: Felt,
    /// Policy Merkle root (0 = unrestricted)
    pub policy_root: Felt,
    /// Target chain
    pub chain_id: Felt,
}

impl AuthMessage {
    /// Digest of this message
    pub fn hash(&self) -> Felt {
        hash_auth_message(
            &self.account_address,
            &self.validator_class,
            &self.grantor_class,
            &self.auth_key,
            &self.expires,
            &self.policy_root,
            &self.chain_id,
        )
    }
}

/// Compute the authorization digest
///
/// ```text
/// session = H(SESSION_TYPE_HASH, auth_key, expires, root)
/// domain  = H(DOMAIN_TYPE_HASH, chain_id)
/// digest  = H("StarkNet Message", account, validator, grantor, session, domain)
/// ```
pub fn hash_auth_message(
    account_address: &Felt,
    validator_class: &Felt,
    grantor_class: &Felt,
    auth_key: &Felt,
    expires: &Felt,
    policy_root: &Felt,
    chain_id: &Felt,
) -> Felt {
    let session = elements_hash(&[SESSION_TYPE_HASH, *auth_key, *expires, *policy_root]);
    let domain = elements_hash(&[STARKNET_DOMAIN_TYPE_HASH, *chain_id]);

    elements_hash(&[
        STARKNET_MESSAGE,
        *account_address,
        *validator_class,
        *grantor_class,
        session,
        domain,
    ])
}
