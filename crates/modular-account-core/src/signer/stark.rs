//! Native Stark-curve signer

use super::{RawSignature, Signer};
use crate::types::felt_from_hex;
use crate::{Error, Result};
use async_trait::async_trait;
use rand::RngCore;
use starknet_crypto::{get_public_key, rfc6979_generate_k, sign, verify};
use starknet_types_core::felt::Felt;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Stark ECDSA signer holding a private key in memory
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct StarkSigner {
    secret: [u8; 32],
    #[zeroize(skip)]
    public_key: Felt,
}

impl StarkSigner {
    /// Create a signer from a private key
    pub fn from_private_key(private_key: Felt) -> Result<Self> {
        if private_key == Felt::ZERO {
            return Err(Error::Crypto("private key must be non-zero".into()));
        }

        Ok(Self {
            secret: private_key.to_bytes_be(),
            public_key: get_public_key(&private_key),
        })
    }

    /// Create a signer from a hex-encoded private key
    pub fn from_hex(private_key: &str) -> Result<Self> {
        Self::from_private_key(felt_from_hex(private_key)?)
    }

    /// Generate a fresh random key (used for ephemeral session keys)
    pub fn random() -> Self {
        let mut rng = rand::thread_rng();
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            // keep the scalar below 2^251
            bytes[0] &= 0x07;

            let candidate = Felt::from_bytes_be(&bytes);
            bytes.zeroize();
            if let Ok(signer) = Self::from_private_key(candidate) {
                return signer;
            }
        }
    }

    fn private_key(&self) -> Felt {
        Felt::from_bytes_be(&self.secret)
    }

    /// Synchronous signing, deterministic per RFC 6979
    pub fn sign_felt(&self, digest: &Felt) -> Result<(Felt, Felt)> {
        let private_key = self.private_key();
        let k = rfc6979_generate_k(digest, &private_key, None);
        let signature = sign(&private_key, digest, &k)
            .map_err(|e| Error::Crypto(format!("stark signing failed: {:?}", e)))?;
        Ok((signature.r, signature.s))
    }
}

impl fmt::Debug for StarkSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StarkSigner")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for StarkSigner {
    fn public_key(&self) -> Felt {
        self.public_key
    }

    async fn sign_digest(&self, digest: &Felt) -> Result<RawSignature> {
        let (r, s) = self.sign_felt(digest)?;
        Ok(RawSignature::Rs { r, s })
    }
}

/// Verify a Stark ECDSA signature, treating malformed inputs as invalid
pub fn verify_stark(public_key: &Felt, digest: &Felt, r: &Felt, s: &Felt) -> bool {
    verify(public_key, digest, r, s).unwrap_or(false)
}
