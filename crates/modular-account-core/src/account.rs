//! Account execution layer
//!
//! Owns call batching and submission for one modular account: prepends the
//! active module's prefix call, fetches nonce and fee once, signs and submits.

use crate::chain::{InvokeTransaction, Provider, Receipt, TxHandle};
use crate::config::AccountConfig;
use crate::hash::elements_hash;
use crate::session::MODULE_VALIDATE_ENTRYPOINT;
use crate::signer::{Signer, TxContext};
use crate::types::{
    Call, SharedDetails, SignatureComponents, TransactionVersion, felt_to_hex, selector_from_name,
};
use crate::{Error, Result};
use starknet_types_core::felt::Felt;
use tracing::{debug, info, instrument};

/// `"STARKNET_CONTRACT_ADDRESS"` as a short string
const CONTRACT_ADDRESS_PREFIX: Felt =
    Felt::from_hex_unchecked("0x535441524b4e45545f434f4e54524143545f41444452455353");

/// Contract addresses live below `2^251 - 256`
const ADDRESS_BOUND_BE: [u8; 32] = [
    0x07, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff,
    0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x00,
];

/// Deterministic address of a contract deployed through a deployer
pub fn contract_address(
    salt: &Felt,
    class_hash: &Felt,
    constructor_calldata: &[Felt],
    deployer_address: &Felt,
) -> Felt {
    let raw = elements_hash(&[
        CONTRACT_ADDRESS_PREFIX,
        *deployer_address,
        *salt,
        *class_hash,
        elements_hash(constructor_calldata),
    ]);

    if raw.to_bytes_be() >= ADDRESS_BOUND_BE {
        raw - Felt::from_bytes_be(&ADDRESS_BOUND_BE)
    } else {
        raw
    }
}

// ============================================================================
// Modules
// ============================================================================

/// A validator module that must announce itself ahead of the user's calls
pub trait AccountModule: Send + Sync {
    /// Prefix call to prepend to `calls`
    fn prefix(&self, calls: &[Call]) -> Result<Call>;
}

/// Non-session validator module (secp256k1, P-256, multisig, ...)
///
/// Its prefix only routes validation: calldata `[1, class_hash]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatorModule {
    account_address: Felt,
    class_hash: Felt,
}

impl ValidatorModule {
    /// Create a module routing validation to `class_hash`
    pub fn new(account_address: Felt, class_hash: Felt) -> Self {
        Self {
            account_address,
            class_hash,
        }
    }

    /// Validator class hash
    pub fn class_hash(&self) -> Felt {
        self.class_hash
    }
}

impl AccountModule for ValidatorModule {
    fn prefix(&self, _calls: &[Call]) -> Result<Call> {
        Ok(Call::new(
            self.account_address,
            selector_from_name(MODULE_VALIDATE_ENTRYPOINT),
            vec![Felt::ONE, self.class_hash],
        ))
    }
}

// ============================================================================
// Execution
// ============================================================================

/// Per-call overrides for [`Account::execute`]
///
/// Defaults: fetch fresh details, use the configured version and fee
/// multiplier, prepend the module prefix.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExecuteOptions {
    /// Pre-computed details (skips nonce and fee fetching)
    pub details: Option<SharedDetails>,
    /// Transaction version override
    pub version: Option<TransactionVersion>,
    /// Fee multiplier override, percent
    pub fee_multiplier_pct: Option<u32>,
    /// Submit the calls without the module prefix
    pub skip_prefix: bool,
}

impl ExecuteOptions {
    /// Use pre-computed details
    pub fn with_details(mut self, details: SharedDetails) -> Self {
        self.details = Some(details);
        self
    }

    /// Override the transaction version
    pub fn with_version(mut self, version: TransactionVersion) -> Self {
        self.version = Some(version);
        self
    }

    /// Override the fee multiplier
    pub fn with_fee_multiplier(mut self, pct: u32) -> Self {
        self.fee_multiplier_pct = Some(pct);
        self
    }

    /// Skip the module prefix
    pub fn skip_prefix(mut self) -> Self {
        self.skip_prefix = true;
        self
    }
}

/// Prepend the module prefix, if any
pub(crate) fn with_prefix(
    module: Option<&dyn AccountModule>,
    calls: &[Call],
    skip_prefix: bool,
) -> Result<Vec<Call>> {
    let mut batch = Vec::with_capacity(calls.len() + 1);
    if let Some(module) = module.filter(|_| !skip_prefix) {
        batch.push(module.prefix(calls)?);
    }
    batch.extend_from_slice(calls);
    Ok(batch)
}

/// Fetch nonce and fee once for a full batch
pub(crate) async fn fetch_details<P: Provider + ?Sized>(
    provider: &P,
    config: &AccountConfig,
    batch: &[Call],
    options: &ExecuteOptions,
) -> Result<SharedDetails> {
    let version = options.version.unwrap_or(config.version);
    let multiplier = options
        .fee_multiplier_pct
        .unwrap_or(config.fee_multiplier_pct);

    let nonce = provider.get_nonce(&config.address).await?;
    let estimate = provider
        .estimate_fee(&InvokeTransaction::for_estimate(
            config.address,
            batch.to_vec(),
            nonce,
            version,
        ))
        .await?;

    let details = SharedDetails::new(nonce, estimate.to_fee_bounds(version, multiplier));
    debug!(
        nonce = %felt_to_hex(&nonce),
        version = %version,
        max_fee = details.fee.max_total(),
        "Transaction details prepared"
    );
    Ok(details)
}

/// Signing context, checking the provider is on the configured chain
pub(crate) async fn tx_context<P: Provider + ?Sized>(
    provider: &P,
    config: &AccountConfig,
) -> Result<TxContext> {
    let chain_id = provider.chain_id().await?;
    if chain_id != config.chain_id {
        return Err(Error::InvalidConfig(format!(
            "provider is on chain {}, account configured for {}",
            felt_to_hex(&chain_id),
            felt_to_hex(&config.chain_id)
        )));
    }
    Ok(TxContext::new(config.address, chain_id))
}

/// A modular account driven by one signer
pub struct Account<P: Provider, S: Signer> {
    config: AccountConfig,
    provider: P,
    signer: S,
    module: Option<Box<dyn AccountModule>>,
}

impl<P: Provider, S: Signer> Account<P, S> {
    /// Create an account
    pub fn new(config: AccountConfig, provider: P, signer: S) -> Self {
        Self {
            config,
            provider,
            signer,
            module: None,
        }
    }

    /// Attach a validator module whose prefix precedes every batch
    pub fn with_module(mut self, module: impl AccountModule + 'static) -> Self {
        self.module = Some(Box::new(module));
        self
    }

    /// Replace or clear the active module
    pub fn set_module(&mut self, module: Option<Box<dyn AccountModule>>) {
        self.module = module;
    }

    /// Account address
    pub fn address(&self) -> Felt {
        self.config.address
    }

    /// Account configuration
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Chain provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Transaction signer
    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Full batch: module prefix (unless skipped) followed by `calls`
    pub fn build_calls(&self, calls: &[Call], skip_prefix: bool) -> Result<Vec<Call>> {
        with_prefix(self.module.as_deref(), calls, skip_prefix)
    }

    /// Fetch nonce and fee bounds for a full batch
    #[instrument(skip(self, batch, options), fields(account = %felt_to_hex(&self.config.address)))]
    pub async fn prepare_details(
        &self,
        batch: &[Call],
        options: &ExecuteOptions,
    ) -> Result<SharedDetails> {
        fetch_details(&self.provider, &self.config, batch, options).await
    }

    /// Sign a full batch under fixed details
    #[instrument(skip(self, batch, details), fields(account = %felt_to_hex(&self.config.address)))]
    pub async fn sign(
        &self,
        batch: &[Call],
        details: &SharedDetails,
    ) -> Result<SignatureComponents> {
        let ctx = tx_context(&self.provider, &self.config).await?;
        self.signer.sign_transaction(batch, details, &ctx).await
    }

    /// Build, sign and submit `calls`
    #[instrument(skip(self, calls, options), fields(account = %felt_to_hex(&self.config.address)))]
    pub async fn execute(&self, calls: &[Call], options: ExecuteOptions) -> Result<TxHandle> {
        let batch = self.build_calls(calls, options.skip_prefix)?;
        let details = match options.details {
            Some(details) => details,
            None => self.prepare_details(&batch, &options).await?,
        };
        let signature = self.sign(&batch, &details).await?;
        self.execute_with_signature(batch, details, signature).await
    }

    /// Submit an already signed full batch
    #[instrument(skip_all, fields(account = %felt_to_hex(&self.config.address)))]
    pub async fn execute_with_signature(
        &self,
        batch: Vec<Call>,
        details: SharedDetails,
        signature: SignatureComponents,
    ) -> Result<TxHandle> {
        let calls = batch.len();
        let tx = InvokeTransaction::new(self.config.address, batch, signature, details);
        let handle = self.provider.invoke(tx).await?;
        info!(tx = %handle, calls, "Transaction submitted");
        Ok(handle)
    }

    /// Wait for the receipt of a submitted transaction
    pub async fn wait_for_receipt(&self, handle: &TxHandle, timeout_secs: u64) -> Result<Receipt> {
        self.provider.wait_for_receipt(handle, timeout_secs).await
    }
}
