//! Session Policy Manager
//!
//! Scopes a session key to an allow-list of contract calls. Each allowed
//! `(contract, selector)` pair becomes one leaf of a commutative Merkle tree;
//! the root is bound into the session authorization and the on-chain session
//! validator checks a per-call inclusion proof at execution time.
//!
//! ## Example
//!
//! ```rust,ignore
//! use modular_account_core::policy::{Policy, PolicyManager};
//!
//! let manager = PolicyManager::builder()
//!     .allow_by_name(eth_token, "transfer")
//!     .allow_by_name(eth_token, "approve")
//!     .build();
//!
//! let root = manager.root();
//! let proof = manager.proof(&Policy::by_name(eth_token, "transfer"))?;
//! ```

use crate::hash::elements_hash;
use crate::merkle::MerkleTree;
use crate::types::{Call, felt_to_hex, selector_from_name};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;

/// One allowed contract call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Policy {
    /// Contract the session key may call
    pub contract_address: Felt,
    /// Entrypoint selector on that contract
    pub selector: Felt,
}

impl Policy {
    /// Create a policy from a numeric selector
    pub fn new(contract_address: Felt, selector: Felt) -> Self {
        Self {
            contract_address,
            selector,
        }
    }

    /// Create a policy from an entrypoint name
    pub fn by_name(contract_address: Felt, entrypoint: &str) -> Self {
        Self::new(contract_address, selector_from_name(entrypoint))
    }

    /// Policy matching a call's target and selector
    pub fn for_call(call: &Call) -> Self {
        Self::new(call.to, call.selector)
    }

    /// Merkle leaf encoding
    pub fn leaf(&self) -> Felt {
        elements_hash(&[self.contract_address, self.selector])
    }
}

/// Builds the policy tree and serves inclusion proofs
#[derive(Debug, Clone)]
pub struct PolicyManager {
    policies: Vec<Policy>,
    tree: MerkleTree,
}

impl PolicyManager {
    /// Create a manager over a set of policies
    pub fn new(policies: Vec<Policy>) -> Self {
        let tree = MerkleTree::new(policies.iter().map(Policy::leaf));
        Self { policies, tree }
    }

    /// Manager with no policies (unrestricted session)
    pub fn unrestricted() -> Self {
        Self::new(Vec::new())
    }

    /// Start a policy builder
    pub fn builder() -> PolicyBuilder {
        PolicyBuilder::default()
    }

    /// Configured policies, in insertion order
    pub fn policies(&self) -> &[Policy] {
        &self.policies
    }

    /// Whether the session is unrestricted
    pub fn is_unrestricted(&self) -> bool {
        self.policies.is_empty()
    }

    /// Merkle root, `0x0` when no policies are configured
    pub fn root(&self) -> Felt {
        self.tree.root()
    }

    /// Whether a policy is part of the allow-list
    pub fn contains(&self, policy: &Policy) -> bool {
        self.tree.contains(&policy.leaf())
    }

    /// Inclusion proof for a policy
    pub fn proof(&self, policy: &Policy) -> Result<Vec<Felt>> {
        self.proof_for_leaf(&policy.leaf()).map_err(|_| {
            Error::NotFound(format!(
                "policy {}::{} not in allow-list",
                felt_to_hex(&policy.contract_address),
                felt_to_hex(&policy.selector)
            ))
        })
    }

    /// Inclusion proof for a raw leaf
    pub fn proof_for_leaf(&self, leaf: &Felt) -> Result<Vec<Felt>> {
        self.tree.proof(leaf)
    }

    /// Proofs for every call in a batch, in batch order
    pub fn proofs_for_calls(&self, calls: &[Call]) -> Result<Vec<Vec<Felt>>> {
        calls
            .iter()
            .map(|call| self.proof(&Policy::for_call(call)))
            .collect()
    }

    /// Check a proof against a policy root
    pub fn verify(root: &Felt, policy: &Policy, proof: &[Felt]) -> bool {
        MerkleTree::verify(root, &policy.leaf(), proof)
    }
}

impl Default for PolicyManager {
    fn default() -> Self {
        Self::unrestricted()
    }
}

/// Builder for policy allow-lists
#[derive(Debug, Default)]
pub struct PolicyBuilder {
    policies: Vec<Policy>,
}

impl PolicyBuilder {
    /// Create a new policy builder
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow a contract/selector pair
    pub fn allow(mut self, contract_address: Felt, selector: Felt) -> Self {
        self.policies.push(Policy::new(contract_address, selector));
        self
    }

    /// Allow a contract/entrypoint-name pair
    pub fn allow_by_name(mut self, contract_address: Felt, entrypoint: &str) -> Self {
        self.policies.push(Policy::by_name(contract_address, entrypoint));
        self
    }

    /// Build the manager
    pub fn build(self) -> PolicyManager {
        PolicyManager::new(self.policies)
    }
}
