//! Multisig co-signing coordinator
//!
//! Several independent keys jointly authorize one invocation of a
//! multi-owner account:
//!
//! 1. **Prepare** - nonce and fee bounds are fetched exactly once
//! 2. **Sign** - each signer signs the identical `(calls, details)`
//! 3. **Aggregate** - partial signatures are concatenated in signer order
//! 4. **Execute** - the batch is submitted with the aggregated signature
//!
//! Every signer must receive the same [`PreparedBatch`]. A signer that
//! fetches its own nonce/fee produces a signature over a different hash and
//! the account rejects the aggregate.

use crate::account::{AccountModule, ExecuteOptions, fetch_details, tx_context, with_prefix};
use crate::chain::{InvokeTransaction, Provider, TxHandle};
use crate::config::AccountConfig;
use crate::signer::{Signer, TxContext};
use crate::types::{Call, SharedDetails, SignatureComponents, felt_to_hex};
use crate::{Error, Result};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// A call batch frozen together with its shared details
///
/// Distributed to every co-signer after [`MultisigCoordinator::prepare_details`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedBatch {
    /// Full batch, module prefix included
    pub calls: Vec<Call>,
    /// Nonce and fee bounds every signer signs over
    pub details: SharedDetails,
    /// Signing context
    pub context: TxContext,
}

/// Coordinates a co-signing round for a multi-owner account
pub struct MultisigCoordinator<P: Provider> {
    config: AccountConfig,
    provider: P,
    module: Option<Box<dyn AccountModule>>,
}

impl<P: Provider> MultisigCoordinator<P> {
    /// Create a coordinator
    pub fn new(config: AccountConfig, provider: P) -> Self {
        Self {
            config,
            provider,
            module: None,
        }
    }

    /// Attach a validator module whose prefix precedes every batch
    pub fn with_module(mut self, module: impl AccountModule + 'static) -> Self {
        self.module = Some(Box::new(module));
        self
    }

    /// Account configuration
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// Chain provider
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Fetch nonce and fee once and freeze them with the batch
    ///
    /// The module prefix (if any) is prepended before estimation so the fee
    /// covers its validation cost.
    #[instrument(skip(self, calls), fields(account = %felt_to_hex(&self.config.address)))]
    pub async fn prepare_details(&self, calls: &[Call]) -> Result<PreparedBatch> {
        self.prepare_with_options(calls, &ExecuteOptions::default())
            .await
    }

    /// [`prepare_details`](Self::prepare_details) with version/fee overrides
    pub async fn prepare_with_options(
        &self,
        calls: &[Call],
        options: &ExecuteOptions,
    ) -> Result<PreparedBatch> {
        let batch = with_prefix(self.module.as_deref(), calls, options.skip_prefix)?;
        let context = tx_context(&self.provider, &self.config).await?;
        let details = match options.details {
            Some(details) => details,
            None => fetch_details(&self.provider, &self.config, &batch, options).await?,
        };

        info!(
            calls = batch.len(),
            nonce = %felt_to_hex(&details.nonce),
            "Co-signing batch prepared"
        );

        Ok(PreparedBatch {
            calls: batch,
            details,
            context,
        })
    }

    /// Produce one signer's partial signature over the prepared batch
    ///
    /// Pure in `(batch, key)`: no network access.
    ///
    /// # Arguments
    /// * `signer` - Co-signer key
    /// * `batch` - Batch returned by [`prepare_details`](Self::prepare_details)
    #[instrument(skip_all, fields(signer = %felt_to_hex(&signer.public_key())))]
    pub async fn sign_with_details<S: Signer + ?Sized>(
        &self,
        signer: &S,
        batch: &PreparedBatch,
    ) -> Result<SignatureComponents> {
        let signature = signer
            .sign_transaction(&batch.calls, &batch.details, &batch.context)
            .await?;
        debug!(components = signature.len(), "Partial signature produced");
        Ok(signature)
    }

    /// Collect partial signatures from several signers concurrently
    ///
    /// Results come back in the order of `signers`. The first failure aborts
    /// the round.
    pub async fn sign_all(
        &self,
        signers: &[&dyn Signer],
        batch: &PreparedBatch,
    ) -> Result<Vec<SignatureComponents>> {
        try_join_all(
            signers
                .iter()
                .map(|signer| self.sign_with_details(*signer, batch)),
        )
        .await
    }

    /// Concatenate partial signatures in the order given
    ///
    /// The order is never changed here: the account expects signatures in
    /// signer-registration order and callers must supply them that way.
    pub fn aggregate(&self, signatures: Vec<SignatureComponents>) -> Result<SignatureComponents> {
        let required = self.config.multisig_threshold.unwrap_or(1);
        if signatures.is_empty() || signatures.len() < required {
            warn!(
                required,
                actual = signatures.len(),
                "Not enough partial signatures"
            );
            return Err(Error::ThresholdNotMet {
                required,
                actual: signatures.len(),
            });
        }

        Ok(signatures.into_iter().flatten().collect())
    }

    /// Submit the batch with its aggregated signature
    #[instrument(skip_all, fields(account = %felt_to_hex(&self.config.address)))]
    pub async fn execute(
        &self,
        batch: &PreparedBatch,
        signature: SignatureComponents,
    ) -> Result<TxHandle> {
        let tx = InvokeTransaction::new(
            batch.context.sender,
            batch.calls.clone(),
            signature,
            batch.details,
        );
        let handle = self.provider.invoke(tx).await?;
        info!(tx = %handle, "Co-signed transaction submitted");
        Ok(handle)
    }
}
