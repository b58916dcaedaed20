//! Core types for modular account authorization
//!
//! Field-element helpers, the call structure consumed by account `__execute__`,
//! and the fee/nonce bundle shared between co-signers.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;
use std::fmt;
use tiny_keccak::{Hasher, Keccak};

/// Ordered signature components as consumed by an account's `signature` field
pub type SignatureComponents = Vec<Felt>;

/// Big-endian bytes of the Stark field modulus `2^251 + 17 * 2^192 + 1`
const FIELD_MODULUS_BE: [u8; 32] = [
    0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x11, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00,
    0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01,
];

/// Entrypoints whose selector is zero rather than their keccak
const DEFAULT_ENTRYPOINT_NAMES: [&str; 2] = ["__default__", "__l1_default__"];

// ============================================================================
// Field Element Helpers
// ============================================================================

/// Parse a `0x`-prefixed (or bare) hex string into a canonical field element
///
/// Values at or above the field modulus are rejected instead of being reduced.
pub fn felt_from_hex(value: &str) -> Result<Felt> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);

    if digits.is_empty() || digits.len() > 64 {
        return Err(Error::InvalidFelt(format!("bad hex length: {}", value)));
    }

    let padded = format!("{:0>64}", digits);
    let decoded = hex::decode(padded)?;
    let bytes: [u8; 32] = decoded
        .try_into()
        .map_err(|_| Error::Internal("decoded felt is not 32 bytes".into()))?;

    if bytes >= FIELD_MODULUS_BE {
        return Err(Error::InvalidFelt(format!("{} exceeds field modulus", value)));
    }

    Ok(Felt::from_bytes_be(&bytes))
}

/// Minimal `0x`-prefixed lowercase hex rendering of a field element
pub fn felt_to_hex(value: &Felt) -> String {
    let encoded = hex::encode(value.to_bytes_be());
    let trimmed = encoded.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{}", trimmed)
    }
}

/// Convert a field element to `u64`, failing if it does not fit
pub fn felt_to_u64(value: &Felt) -> Result<u64> {
    let bytes = value.to_bytes_be();
    if bytes[..24].iter().any(|b| *b != 0) {
        return Err(Error::InvalidFelt(format!(
            "{} does not fit in u64",
            felt_to_hex(value)
        )));
    }

    let low: [u8; 8] = bytes[24..]
        .try_into()
        .map_err(|_| Error::Internal("invalid u64 slice".into()))?;
    Ok(u64::from_be_bytes(low))
}

/// Encode an ASCII string of at most 31 bytes as a Cairo short string
pub fn short_string(value: &str) -> Result<Felt> {
    if !value.is_ascii() {
        return Err(Error::InvalidFelt(format!(
            "short string must be ASCII: {}",
            value
        )));
    }
    if value.len() > 31 {
        return Err(Error::InvalidFelt(format!(
            "short string longer than 31 bytes: {}",
            value
        )));
    }

    let mut bytes = [0u8; 32];
    bytes[32 - value.len()..].copy_from_slice(value.as_bytes());
    Ok(Felt::from_bytes_be(&bytes))
}

/// Starknet keccak: keccak-256 truncated to its low 250 bits
pub fn starknet_keccak(data: &[u8]) -> Felt {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut hash = [0u8; 32];
    hasher.finalize(&mut hash);

    hash[0] &= 0x03;
    Felt::from_bytes_be(&hash)
}

/// Map a human-readable entrypoint name to its canonical selector
pub fn selector_from_name(name: &str) -> Felt {
    if DEFAULT_ENTRYPOINT_NAMES.contains(&name) {
        Felt::ZERO
    } else {
        starknet_keccak(name.as_bytes())
    }
}

/// Split a big-endian 256-bit value into `(low, high)` 128-bit felts
pub fn u256_to_felts(value: &[u8; 32]) -> (Felt, Felt) {
    let mut high = [0u8; 16];
    let mut low = [0u8; 16];
    high.copy_from_slice(&value[..16]);
    low.copy_from_slice(&value[16..]);
    (
        Felt::from(u128::from_be_bytes(low)),
        Felt::from(u128::from_be_bytes(high)),
    )
}

// ============================================================================
// Calls
// ============================================================================

/// A single contract invocation inside an account call batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Call {
    /// Target contract address
    pub to: Felt,
    /// Entrypoint selector
    pub selector: Felt,
    /// Raw calldata
    pub calldata: Vec<Felt>,
}

impl Call {
    /// Create a call from an already-computed selector
    pub fn new(to: Felt, selector: Felt, calldata: Vec<Felt>) -> Self {
        Self {
            to,
            selector,
            calldata,
        }
    }

    /// Create a call from an entrypoint name
    pub fn by_name(to: Felt, entrypoint: &str, calldata: Vec<Felt>) -> Self {
        Self::new(to, selector_from_name(entrypoint), calldata)
    }
}

impl fmt::Display for Call {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}::{} ({} args)",
            felt_to_hex(&self.to),
            felt_to_hex(&self.selector),
            self.calldata.len()
        )
    }
}

// ============================================================================
// Transaction Details
// ============================================================================

/// Invoke transaction version
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionVersion {
    /// Pedersen-hashed invoke with a single `max_fee`
    V1,
    /// Poseidon-hashed invoke with per-resource bounds
    #[default]
    V3,
}

impl TransactionVersion {
    /// Version number as it appears in the transaction hash
    pub fn as_felt(&self) -> Felt {
        match self {
            TransactionVersion::V1 => Felt::ONE,
            TransactionVersion::V3 => Felt::from(3u64),
        }
    }
}

impl fmt::Display for TransactionVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionVersion::V1 => write!(f, "v1"),
            TransactionVersion::V3 => write!(f, "v3"),
        }
    }
}

/// Upper bounds for one fee resource
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceBounds {
    /// Maximum units of the resource
    pub max_amount: u64,
    /// Maximum price per unit
    pub max_price_per_unit: u128,
}

impl ResourceBounds {
    /// Create resource bounds
    pub fn new(max_amount: u64, max_price_per_unit: u128) -> Self {
        Self {
            max_amount,
            max_price_per_unit,
        }
    }

    /// Scale both bounds by a percentage (150 = 1.5x)
    pub fn scaled(&self, pct: u32) -> Self {
        Self {
            max_amount: self.max_amount.saturating_mul(pct as u64) / 100,
            max_price_per_unit: self.max_price_per_unit.saturating_mul(pct as u128) / 100,
        }
    }
}

/// Fee bounds attached to a transaction, per version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeeBounds {
    /// Legacy single max fee
    V1 { max_fee: u128 },
    /// Resource bounds plus tip
    V3 {
        l1_gas: ResourceBounds,
        l2_gas: ResourceBounds,
        tip: u64,
    },
}

impl FeeBounds {
    /// Transaction version these bounds belong to
    pub fn version(&self) -> TransactionVersion {
        match self {
            FeeBounds::V1 { .. } => TransactionVersion::V1,
            FeeBounds::V3 { .. } => TransactionVersion::V3,
        }
    }

    /// Zero bounds, used when estimating before any fee is known
    pub fn zero(version: TransactionVersion) -> Self {
        match version {
            TransactionVersion::V1 => FeeBounds::V1 { max_fee: 0 },
            TransactionVersion::V3 => FeeBounds::V3 {
                l1_gas: ResourceBounds::default(),
                l2_gas: ResourceBounds::default(),
                tip: 0,
            },
        }
    }

    /// Maximum total fee these bounds allow
    pub fn max_total(&self) -> u128 {
        match self {
            FeeBounds::V1 { max_fee } => *max_fee,
            FeeBounds::V3 { l1_gas, l2_gas, .. } => (l1_gas.max_amount as u128)
                .saturating_mul(l1_gas.max_price_per_unit)
                .saturating_add(
                    (l2_gas.max_amount as u128).saturating_mul(l2_gas.max_price_per_unit),
                ),
        }
    }
}

/// Nonce and fee bundle computed once per call batch and shared by every co-signer
///
/// Every partial signature over a batch must be computed against the same
/// `SharedDetails`; signatures over divergent details cannot be aggregated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedDetails {
    /// Account nonce at preparation time
    pub nonce: Felt,
    /// Fee bounds derived from the estimate
    pub fee: FeeBounds,
}

impl SharedDetails {
    /// Create shared details
    pub fn new(nonce: Felt, fee: FeeBounds) -> Self {
        Self { nonce, fee }
    }

    /// Transaction version implied by the fee bounds
    pub fn version(&self) -> TransactionVersion {
        self.fee.version()
    }
}
