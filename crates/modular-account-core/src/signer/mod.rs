//! Signer collaborators
//!
//! A [`Signer`] turns a digest (or an invoke transaction) into signature
//! components. The account core treats every curve the same way; only the
//! component layout differs:
//!
//! | Signer | Public key | Components |
//! |--------|------------|------------|
//! | [`StarkSigner`] | Stark public key | `[r, s]` |
//! | [`EthSigner`] | Ethereum address | `[r_lo, r_hi, s_lo, s_hi, y_parity]` |
//! | [`P256Signer`] | hash of the point's u256 halves | `[r_lo, r_hi, s_lo, s_hi]` |

mod stark;

#[cfg(feature = "secp256k1")]
mod secp256k1;

#[cfg(feature = "p256")]
mod secp256r1;

pub use stark::{StarkSigner, verify_stark};

#[cfg(feature = "secp256k1")]
pub use secp256k1::EthSigner;

#[cfg(feature = "p256")]
pub use secp256r1::P256Signer;

use crate::chain::tx::transaction_hash;
use crate::types::{Call, SharedDetails, SignatureComponents};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;
use std::sync::Arc;

/// Signature as returned by a signer, before normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawSignature {
    /// Structured `(r, s)` pair
    Rs { r: Felt, s: Felt },
    /// Flat component array
    Array(Vec<Felt>),
}

impl RawSignature {
    /// Flatten into the account's signature layout
    pub fn into_components(self) -> SignatureComponents {
        match self {
            RawSignature::Rs { r, s } => vec![r, s],
            RawSignature::Array(components) => components,
        }
    }

    /// Normalize into exactly `(r, s)`
    ///
    /// Accepts a structured pair or a two-element array; anything else is a
    /// [`Error::SignatureFormat`].
    pub fn normalize_rs(&self) -> Result<[Felt; 2]> {
        match self {
            RawSignature::Rs { r, s } => Ok([*r, *s]),
            RawSignature::Array(components) => match components.as_slice() {
                [r, s] => Ok([*r, *s]),
                other => Err(Error::SignatureFormat(format!(
                    "expected 2 components (r, s), got {}",
                    other.len()
                ))),
            },
        }
    }
}

/// Context a transaction signature is bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxContext {
    /// Account submitting the transaction
    pub sender: Felt,
    /// Chain the transaction targets
    pub chain_id: Felt,
}

impl TxContext {
    /// Create a transaction context
    pub fn new(sender: Felt, chain_id: Felt) -> Self {
        Self { sender, chain_id }
    }
}

/// Signing-key collaborator
#[async_trait]
pub trait Signer: Send + Sync {
    /// Public identity of the key
    fn public_key(&self) -> Felt;

    /// Sign a field-element digest
    async fn sign_digest(&self, digest: &Felt) -> Result<RawSignature>;

    /// Sign an invoke transaction over `calls` with the given shared details
    ///
    /// Deterministic in `(calls, details, ctx, key)`.
    async fn sign_transaction(
        &self,
        calls: &[Call],
        details: &SharedDetails,
        ctx: &TxContext,
    ) -> Result<SignatureComponents> {
        let hash = transaction_hash(&ctx.sender, calls, details, &ctx.chain_id);
        Ok(self.sign_digest(&hash).await?.into_components())
    }
}

#[async_trait]
impl<T: Signer + ?Sized> Signer for Arc<T> {
    fn public_key(&self) -> Felt {
        (**self).public_key()
    }

    async fn sign_digest(&self, digest: &Felt) -> Result<RawSignature> {
        (**self).sign_digest(digest).await
    }

    async fn sign_transaction(
        &self,
        calls: &[Call],
        details: &SharedDetails,
        ctx: &TxContext,
    ) -> Result<SignatureComponents> {
        (**self).sign_transaction(calls, details, ctx).await
    }
}
