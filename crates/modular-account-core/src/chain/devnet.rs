//! In-memory devnet provider for testing and local development
//!
//! Simulates the on-chain half of the protocol: registered accounts with a
//! core owner validator (owner keys plus a threshold) and, optionally, the
//! session-key validator module. Invokes are validated the way the account
//! contract does it and produce receipts immediately.
//!
//! Each fee estimate moves the simulated gas price, so two signers that
//! estimate independently end up with different fee bounds, and therefore
//! different transaction hashes.

use super::{FeeEstimate, InvokeTransaction, Provider, Receipt, TxHandle, TxStatus};
use crate::policy::{Policy, PolicyManager};
use crate::session::{SessionPrefix, is_prefix_call};
use crate::signer::verify_stark;
use crate::types::{SignatureComponents, felt_to_hex, felt_to_u64};
use crate::{Error, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::RwLock;
use starknet_types_core::felt::Felt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Base L1 gas price before drift
const BASE_L1_GAS_PRICE: u128 = 100;
/// Base L2 gas price before drift
const BASE_L2_GAS_PRICE: u128 = 10;

/// Account registered on the devnet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevnetAccount {
    /// Class hash of the core owner validator
    pub core_validator_class: Felt,
    /// Owner public keys, in registration order
    pub owners: Vec<Felt>,
    /// Owner signatures required
    pub threshold: usize,
    /// Installed session-key validator class, if any
    pub session_validator_class: Option<Felt>,
    nonce: u64,
}

impl DevnetAccount {
    /// Account governed by `owners` with the given threshold
    pub fn new(core_validator_class: Felt, owners: Vec<Felt>, threshold: usize) -> Self {
        Self {
            core_validator_class,
            owners,
            threshold,
            session_validator_class: None,
            nonce: 0,
        }
    }

    /// Single-owner account
    pub fn single_owner(core_validator_class: Felt, owner: Felt) -> Self {
        Self::new(core_validator_class, vec![owner], 1)
    }

    /// Install the session-key validator module
    pub fn with_session_validator(mut self, class_hash: Felt) -> Self {
        self.session_validator_class = Some(class_hash);
        self
    }

    /// Current nonce
    pub fn nonce(&self) -> u64 {
        self.nonce
    }
}

#[derive(Debug)]
struct ChainState {
    timestamp: u64,
    block_number: u64,
    gas_drift: u128,
}

/// In-memory chain
///
/// Cloning yields a handle onto the same chain state.
#[derive(Debug, Clone)]
pub struct DevnetProvider {
    chain_id: Felt,
    accounts: Arc<DashMap<Felt, DevnetAccount>>,
    receipts: Arc<DashMap<Felt, Receipt>>,
    state: Arc<RwLock<ChainState>>,
}

impl DevnetProvider {
    /// Create an empty devnet on `chain_id`, clock set to now
    pub fn new(chain_id: Felt) -> Self {
        Self {
            chain_id,
            accounts: Arc::new(DashMap::new()),
            receipts: Arc::new(DashMap::new()),
            state: Arc::new(RwLock::new(ChainState {
                timestamp: chrono::Utc::now().timestamp().max(0) as u64,
                block_number: 0,
                gas_drift: 0,
            })),
        }
    }

    /// Register an account at `address`
    pub fn deploy_account(&self, address: Felt, account: DevnetAccount) -> Result<()> {
        if account.threshold == 0 || account.threshold > account.owners.len() {
            return Err(Error::InvalidConfig(format!(
                "threshold {} with {} owners",
                account.threshold,
                account.owners.len()
            )));
        }
        if self.accounts.contains_key(&address) {
            return Err(Error::Chain(format!(
                "account {} already deployed",
                felt_to_hex(&address)
            )));
        }

        debug!(
            address = %felt_to_hex(&address),
            owners = account.owners.len(),
            threshold = account.threshold,
            "Devnet account deployed"
        );
        self.accounts.insert(address, account);
        Ok(())
    }

    /// Snapshot of a registered account
    pub fn account(&self, address: &Felt) -> Option<DevnetAccount> {
        self.accounts.get(address).map(|a| a.clone())
    }

    /// Current block timestamp
    pub fn timestamp(&self) -> u64 {
        self.state.read().timestamp
    }

    /// Set the block timestamp
    pub fn set_timestamp(&self, timestamp: u64) {
        self.state.write().timestamp = timestamp;
    }

    /// Move the clock forward
    pub fn advance_time(&self, secs: u64) {
        let mut state = self.state.write();
        state.timestamp = state.timestamp.saturating_add(secs);
    }

    /// Number of distinct transactions processed
    ///
    /// A rejected transaction that is later resubmitted with a valid
    /// signature counts once.
    pub fn transaction_count(&self) -> usize {
        self.receipts.len()
    }

    /// Validate a transaction against an account, returning a rejection reason
    fn validate(
        &self,
        account: &DevnetAccount,
        tx: &InvokeTransaction,
        tx_hash: &Felt,
    ) -> std::result::Result<(), String> {
        let prefix = tx
            .calls
            .first()
            .filter(|call| is_prefix_call(call, &tx.sender_address));

        let Some(prefix) = prefix else {
            return verify_owner_signatures(account, tx_hash, &tx.signature);
        };

        let data = &prefix.calldata;
        if data.len() < 2 || felt_to_u64(&data[0]).ok() != Some((data.len() - 1) as u64) {
            return Err("malformed module prefix".into());
        }

        let validator = data[1];
        if Some(validator) == account.session_validator_class {
            self.validate_session(account, tx, tx_hash)
        } else if validator == account.core_validator_class {
            verify_owner_signatures(account, tx_hash, &tx.signature)
        } else {
            Err(format!("module {} is not installed", felt_to_hex(&validator)))
        }
    }

    fn validate_session(
        &self,
        account: &DevnetAccount,
        tx: &InvokeTransaction,
        tx_hash: &Felt,
    ) -> std::result::Result<(), String> {
        let prefix = SessionPrefix::decode(&tx.calls[0]).map_err(|e| e.to_string())?;

        if prefix.grantor_class != account.core_validator_class {
            return Err(format!(
                "grantor module {} is not installed",
                felt_to_hex(&prefix.grantor_class)
            ));
        }

        let expires = felt_to_u64(&prefix.expires).map_err(|e| e.to_string())?;
        if expires != 0 && expires <= self.timestamp() {
            return Err("session expired".into());
        }

        let digest = prefix.digest(&self.chain_id);
        verify_owner_signatures(account, &digest, &prefix.signature)
            .map_err(|reason| format!("session authorization: {}", reason))?;

        let (r, s) = match tx.signature.as_slice() {
            [r, s, ..] => (r, s),
            _ => return Err("session signature too short".into()),
        };
        if !verify_stark(&prefix.auth_key, tx_hash, r, s) {
            return Err("invalid session key signature".into());
        }

        if prefix.policy_root != Felt::ZERO {
            let mut rest = &tx.signature[2..];
            for call in &tx.calls[1..] {
                let (len, tail) = rest
                    .split_first()
                    .ok_or_else(|| format!("missing policy proof for {}", call))?;
                let len = felt_to_u64(len).map_err(|e| e.to_string())? as usize;
                if tail.len() < len {
                    return Err(format!("truncated policy proof for {}", call));
                }

                let (proof, remaining) = tail.split_at(len);
                if !PolicyManager::verify(&prefix.policy_root, &Policy::for_call(call), proof) {
                    return Err(format!("call {} violates session policy", call));
                }
                rest = remaining;
            }
        }

        Ok(())
    }

    fn quote(&self, tx: &InvokeTransaction) -> FeeEstimate {
        let drift = self.state.read().gas_drift;
        let l1_gas_consumed = 50 + 2 * tx.calls.len() as u64;
        let l2_gas_consumed = 1_000 + 20 * tx.calldata().len() as u64;
        let l1_gas_price = BASE_L1_GAS_PRICE + drift;
        let l2_gas_price = BASE_L2_GAS_PRICE + drift;

        FeeEstimate {
            l1_gas_consumed,
            l1_gas_price,
            l2_gas_consumed,
            l2_gas_price,
            overall_fee: l1_gas_consumed as u128 * l1_gas_price
                + l2_gas_consumed as u128 * l2_gas_price,
        }
    }
}

/// Check `[r, s]` pairs against owners in registration order
fn verify_owner_signatures(
    account: &DevnetAccount,
    digest: &Felt,
    signature: &SignatureComponents,
) -> std::result::Result<(), String> {
    if signature.is_empty() || signature.len() % 2 != 0 {
        return Err(format!("malformed signature of {} components", signature.len()));
    }

    let signers = signature.len() / 2;
    if signers < account.threshold {
        return Err(format!(
            "threshold not met: {} of {} signatures",
            signers, account.threshold
        ));
    }

    let mut next_owner = 0;
    for pair in signature.chunks(2) {
        let matched = account.owners[next_owner..]
            .iter()
            .position(|owner| verify_stark(owner, digest, &pair[0], &pair[1]));
        match matched {
            Some(offset) => next_owner += offset + 1,
            None => return Err("invalid signature or signer order".into()),
        }
    }

    Ok(())
}

#[async_trait]
impl Provider for DevnetProvider {
    async fn chain_id(&self) -> Result<Felt> {
        Ok(self.chain_id)
    }

    async fn get_nonce(&self, address: &Felt) -> Result<Felt> {
        self.accounts
            .get(address)
            .map(|account| Felt::from(account.nonce))
            .ok_or_else(|| Error::Chain(format!("contract {} not deployed", felt_to_hex(address))))
    }

    async fn estimate_fee(&self, tx: &InvokeTransaction) -> Result<FeeEstimate> {
        if !self.accounts.contains_key(&tx.sender_address) {
            return Err(Error::Chain(format!(
                "contract {} not deployed",
                felt_to_hex(&tx.sender_address)
            )));
        }

        let estimate = self.quote(tx);
        self.state.write().gas_drift += 1;
        Ok(estimate)
    }

    async fn invoke(&self, tx: InvokeTransaction) -> Result<TxHandle> {
        let tx_hash = tx.hash(&self.chain_id);
        let accepted = self
            .receipts
            .get(&tx_hash)
            .is_some_and(|receipt| receipt.success());
        if accepted {
            return Err(Error::Chain(format!(
                "transaction {} already submitted",
                felt_to_hex(&tx_hash)
            )));
        }

        let mut account = self.accounts.get_mut(&tx.sender_address).ok_or_else(|| {
            Error::Chain(format!(
                "contract {} not deployed",
                felt_to_hex(&tx.sender_address)
            ))
        })?;

        let expected_nonce = Felt::from(account.nonce);
        let outcome = if tx.details.nonce != expected_nonce {
            Err(format!(
                "invalid nonce: expected {}, got {}",
                felt_to_hex(&expected_nonce),
                felt_to_hex(&tx.details.nonce)
            ))
        } else if tx.details.fee.max_total() == 0 {
            Err("fee bounds are zero".to_string())
        } else {
            self.validate(&account, &tx, &tx_hash)
        };

        let status = match outcome {
            Ok(()) => {
                account.nonce += 1;
                debug!(tx = %felt_to_hex(&tx_hash), "Devnet transaction accepted");
                TxStatus::Accepted
            }
            Err(reason) => {
                warn!(tx = %felt_to_hex(&tx_hash), reason = %reason, "Devnet transaction rejected");
                TxStatus::Rejected { reason }
            }
        };
        drop(account);

        let actual_fee = self.quote(&tx).overall_fee.min(tx.details.fee.max_total());
        let block_number = {
            let mut state = self.state.write();
            state.block_number += 1;
            state.block_number
        };

        self.receipts.insert(
            tx_hash,
            Receipt {
                transaction_hash: tx_hash,
                block_number,
                status,
                actual_fee,
            },
        );
        Ok(TxHandle::new(tx_hash))
    }

    async fn get_receipt(&self, handle: &TxHandle) -> Result<Option<Receipt>> {
        Ok(self
            .receipts
            .get(&handle.transaction_hash)
            .map(|r| r.clone()))
    }
}
