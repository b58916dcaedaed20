//! NIST P-256 signer, as used by passkey/WebAuthn-style validator modules

use super::{RawSignature, Signer};
use crate::hash::elements_hash;
use crate::types::u256_to_felts;
use crate::{Error, Result};
use async_trait::async_trait;
use p256::ecdsa::signature::hazmat::PrehashSigner;
use p256::ecdsa::{Signature, SigningKey};
use p256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use starknet_types_core::felt::Felt;
use std::fmt;

/// P-256 signer
///
/// The public identity is `elements_hash([x_lo, x_hi, y_lo, y_hi])` of the
/// uncompressed public point.
#[derive(Clone)]
pub struct P256Signer {
    key: SigningKey,
    public_key: Felt,
}

impl P256Signer {
    /// Create a signer from a 32-byte secret scalar
    pub fn from_bytes(secret: &[u8; 32]) -> Result<Self> {
        let key = SigningKey::from_bytes(&(*secret).into())
            .map_err(|e| Error::Crypto(format!("invalid p256 key: {}", e)))?;
        Self::from_signing_key(key)
    }

    /// Generate a random signer
    pub fn random() -> Result<Self> {
        Self::from_signing_key(SigningKey::random(&mut OsRng))
    }

    fn from_signing_key(key: SigningKey) -> Result<Self> {
        let point = key.verifying_key().as_affine().to_encoded_point(false);
        let (x, y) = match (point.x(), point.y()) {
            (Some(x), Some(y)) => (x, y),
            _ => return Err(Error::Crypto("p256 public key is the identity".into())),
        };

        let mut x_bytes = [0u8; 32];
        let mut y_bytes = [0u8; 32];
        x_bytes.copy_from_slice(x);
        y_bytes.copy_from_slice(y);

        let (x_lo, x_hi) = u256_to_felts(&x_bytes);
        let (y_lo, y_hi) = u256_to_felts(&y_bytes);
        let public_key = elements_hash(&[x_lo, x_hi, y_lo, y_hi]);

        Ok(Self { key, public_key })
    }
}

impl fmt::Debug for P256Signer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("P256Signer")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Signer for P256Signer {
    fn public_key(&self) -> Felt {
        self.public_key
    }

    async fn sign_digest(&self, digest: &Felt) -> Result<RawSignature> {
        let prehash = digest.to_bytes_be();
        let signature: Signature = self
            .key
            .sign_prehash(&prehash)
            .map_err(|e| Error::Crypto(format!("p256 signing failed: {}", e)))?;
        let signature = signature.normalize_s().unwrap_or(signature);

        let (r_bytes, s_bytes) = signature.split_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&r_bytes);
        s.copy_from_slice(&s_bytes);

        let (r_lo, r_hi) = u256_to_felts(&r);
        let (s_lo, s_hi) = u256_to_felts(&s);
        Ok(RawSignature::Array(vec![r_lo, r_hi, s_lo, s_hi]))
    }
}
