//! Ethereum-style secp256k1 signer
//!
//! Used with the secp256k1 validator module. The public identity is the
//! 20-byte Ethereum address; signatures are u256 halves plus the y parity.

use super::{RawSignature, Signer};
use crate::types::u256_to_felts;
use crate::{Error, Result};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use starknet_types_core::felt::Felt;
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// secp256k1 signer (key material zeroized on drop by `k256`)
#[derive(Clone)]
pub struct EthSigner {
    key: SigningKey,
    address: Felt,
}

impl EthSigner {
    /// Create a signer from a 32-byte secret scalar
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let key = SigningKey::from_bytes(&(*secret).into())
            .map_err(|e| Error::Crypto(format!("invalid secp256k1 key: {}", e)))?;
        Ok(Self::from_signing_key(key))
    }

    /// Generate a random signer
    pub fn random() -> Self {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    fn from_signing_key(key: SigningKey) -> Self {
        let address = Self::derive_address(&key);
        Self { key, address }
    }

    fn derive_address(key: &SigningKey) -> Felt {
        let point = key.verifying_key().as_affine().to_encoded_point(false);

        let mut hasher = Keccak::v256();
        hasher.update(&point.as_bytes()[1..]);
        let mut hash = [0u8; 32];
        hasher.finalize(&mut hash);

        let mut address = [0u8; 32];
        address[12..].copy_from_slice(&hash[12..]);
        Felt::from_bytes_be(&address)
    }

    /// Ethereum address as a field element
    pub fn address(&self) -> Felt {
        self.address
    }
}

impl fmt::Debug for EthSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EthSigner")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for EthSigner {
    fn public_key(&self) -> Felt {
        self.address
    }

    async fn sign_digest(&self, digest: &Felt) -> Result<RawSignature> {
        let prehash = digest.to_bytes_be();
        let (signature, recovery_id) = self
            .key
            .sign_prehash_recoverable(&prehash)
            .map_err(|e| Error::Crypto(format!("secp256k1 signing failed: {}", e)))?;

        let (r_bytes, s_bytes) = signature.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);

        let (r_lo, r_hi) = u256_to_felts(&r);
        let (s_lo, s_hi) = u256_to_felts(&s);
        let y_parity = Felt::from(recovery_id.is_y_odd() as u64);

        Ok(RawSignature::Array(vec![r_lo, r_hi, s_lo, s_hi, y_parity]))
    }
}
