//! # Chain Provider
//!
//! Chain-agnostic interface the account core talks to. The core never speaks
//! JSON-RPC itself: a [`Provider`] supplies nonces, fee estimates, transaction
//! submission and receipts.
//!
//! - [`tx`] - `__execute__` calldata encoding and v1/v3 invoke hashing
//! - [`devnet`] - in-memory provider that validates transactions the way the
//!   account contract does (feature `runtime`)
//!
//! ## Example
//!
//! ```rust,ignore
//! use modular_account_core::chain::{Provider, DevnetProvider};
//!
//! let provider = DevnetProvider::new(sn_sepolia());
//! let nonce = provider.get_nonce(&account).await?;
//! let handle = provider.invoke(tx).await?;
//! let receipt = provider.wait_for_receipt(&handle, 30).await?;
//! ```

pub mod tx;

#[cfg(feature = "runtime")]
pub mod devnet;

#[cfg(feature = "runtime")]
pub use devnet::{DevnetAccount, DevnetProvider};

use crate::types::{
    Call, FeeBounds, ResourceBounds, SharedDetails, SignatureComponents, TransactionVersion,
    felt_to_hex,
};
use crate::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use starknet_types_core::felt::Felt;
use std::fmt;
use std::sync::Arc;

// ============================================================================
// Chain Identifiers
// ============================================================================

/// `SN_MAIN` chain id
pub fn sn_main() -> Felt {
    Felt::from(0x534e5f4d41494eu64)
}

/// `SN_SEPOLIA` chain id
pub fn sn_sepolia() -> Felt {
    Felt::from(0x534e5f5345504f4c4941u128)
}

/// Human-readable name for a chain id
pub fn chain_name(chain_id: &Felt) -> &'static str {
    if *chain_id == sn_main() {
        "Starknet Mainnet"
    } else if *chain_id == sn_sepolia() {
        "Starknet Sepolia"
    } else {
        "Unknown Chain"
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// Invoke transaction as submitted to a provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvokeTransaction {
    /// Account submitting the transaction
    pub sender_address: Felt,
    /// Call batch, including any module prefix call
    pub calls: Vec<Call>,
    /// Signature components
    pub signature: SignatureComponents,
    /// Nonce and fee bounds
    pub details: SharedDetails,
}

impl InvokeTransaction {
    /// Create an invoke transaction
    pub fn new(
        sender_address: Felt,
        calls: Vec<Call>,
        signature: SignatureComponents,
        details: SharedDetails,
    ) -> Self {
        Self {
            sender_address,
            calls,
            signature,
            details,
        }
    }

    /// Unsigned transaction with zero fee bounds, used for fee estimation
    pub fn for_estimate(
        sender_address: Felt,
        calls: Vec<Call>,
        nonce: Felt,
        version: TransactionVersion,
    ) -> Self {
        Self::new(
            sender_address,
            calls,
            Vec::new(),
            SharedDetails::new(nonce, FeeBounds::zero(version)),
        )
    }

    /// `__execute__` calldata
    pub fn calldata(&self) -> Vec<Felt> {
        tx::encode_execute_calldata(&self.calls)
    }

    /// Transaction hash on the given chain
    pub fn hash(&self, chain_id: &Felt) -> Felt {
        tx::transaction_hash(&self.sender_address, &self.calls, &self.details, chain_id)
    }
}

/// Fee estimate returned by a provider
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeEstimate {
    /// L1 gas consumed
    pub l1_gas_consumed: u64,
    /// L1 gas price
    pub l1_gas_price: u128,
    /// L2 gas consumed
    pub l2_gas_consumed: u64,
    /// L2 gas price
    pub l2_gas_price: u128,
    /// Total fee at the quoted prices
    pub overall_fee: u128,
}

impl FeeEstimate {
    /// Derive fee bounds, scaled by `multiplier_pct` (150 = 1.5x)
    pub fn to_fee_bounds(&self, version: TransactionVersion, multiplier_pct: u32) -> FeeBounds {
        match version {
            TransactionVersion::V1 => FeeBounds::V1 {
                max_fee: self.overall_fee.saturating_mul(multiplier_pct as u128) / 100,
            },
            TransactionVersion::V3 => FeeBounds::V3 {
                l1_gas: ResourceBounds::new(self.l1_gas_consumed, self.l1_gas_price)
                    .scaled(multiplier_pct),
                l2_gas: ResourceBounds::new(self.l2_gas_consumed, self.l2_gas_price)
                    .scaled(multiplier_pct),
                tip: 0,
            },
        }
    }
}

/// Handle for a submitted transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TxHandle {
    /// Transaction hash
    pub transaction_hash: Felt,
}

impl TxHandle {
    /// Create a handle
    pub fn new(transaction_hash: Felt) -> Self {
        Self { transaction_hash }
    }
}

impl fmt::Display for TxHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", felt_to_hex(&self.transaction_hash))
    }
}

/// Transaction receipt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    /// Transaction hash
    pub transaction_hash: Felt,
    /// Block the transaction landed in
    pub block_number: u64,
    /// Execution outcome
    pub status: TxStatus,
    /// Fee actually charged
    pub actual_fee: u128,
}

impl Receipt {
    /// Whether the transaction was accepted
    pub fn success(&self) -> bool {
        matches!(self.status, TxStatus::Accepted)
    }
}

/// Transaction outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TxStatus {
    /// Validated and executed
    Accepted,
    /// Rejected by the account or the sequencer
    Rejected { reason: String },
}

// ============================================================================
// Provider Trait
// ============================================================================

/// Chain access used by accounts and co-signing coordinators
#[async_trait]
pub trait Provider: Send + Sync {
    /// Chain the provider is connected to
    async fn chain_id(&self) -> Result<Felt>;

    /// Current nonce of an account
    async fn get_nonce(&self, address: &Felt) -> Result<Felt>;

    /// Estimate the fee of an (unsigned) invoke
    async fn estimate_fee(&self, tx: &InvokeTransaction) -> Result<FeeEstimate>;

    /// Submit a signed invoke
    async fn invoke(&self, tx: InvokeTransaction) -> Result<TxHandle>;

    /// Receipt of a transaction, `None` while pending
    async fn get_receipt(&self, handle: &TxHandle) -> Result<Option<Receipt>>;

    /// Poll for a receipt until it is available
    #[cfg(feature = "runtime")]
    async fn wait_for_receipt(&self, handle: &TxHandle, timeout_secs: u64) -> Result<Receipt> {
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(timeout_secs);
        loop {
            if let Some(receipt) = self.get_receipt(handle).await? {
                return Ok(receipt);
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(Error::Timeout(format!("receipt of {}", handle)));
            }
            tokio::time::sleep(std::time::Duration::from_millis(250)).await;
        }
    }

    /// Check once for a receipt (no timer without the `runtime` feature)
    #[cfg(not(feature = "runtime"))]
    async fn wait_for_receipt(&self, handle: &TxHandle, _timeout_secs: u64) -> Result<Receipt> {
        self.get_receipt(handle)
            .await?
            .ok_or_else(|| Error::Timeout(format!("receipt of {}", handle)))
    }
}

#[async_trait]
impl<T: Provider + ?Sized> Provider for Arc<T> {
    async fn chain_id(&self) -> Result<Felt> {
        (**self).chain_id().await
    }

    async fn get_nonce(&self, address: &Felt) -> Result<Felt> {
        (**self).get_nonce(address).await
    }

    async fn estimate_fee(&self, tx: &InvokeTransaction) -> Result<FeeEstimate> {
        (**self).estimate_fee(tx).await
    }

    async fn invoke(&self, tx: InvokeTransaction) -> Result<TxHandle> {
        (**self).invoke(tx).await
    }

    async fn get_receipt(&self, handle: &TxHandle) -> Result<Option<Receipt>> {
        (**self).get_receipt(handle).await
    }

    async fn wait_for_receipt(&self, handle: &TxHandle, timeout_secs: u64) -> Result<Receipt> {
        (**self).wait_for_receipt(handle, timeout_secs).await
    }
}
