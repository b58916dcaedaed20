//! Session-key transaction signer
//!
//! Signs account transactions with the session private key. When the session
//! is policy-restricted, the validator needs an inclusion proof for every
//! user call, so the signature is `[r, s, (proof_len, ...proof) per call]`.

use super::module::MODULE_VALIDATE_ENTRYPOINT;
use crate::Result;
use crate::chain::tx::transaction_hash;
use crate::policy::PolicyManager;
use crate::signer::{RawSignature, Signer, StarkSigner, TxContext};
use crate::types::{Call, SharedDetails, SignatureComponents, selector_from_name};
use async_trait::async_trait;
use starknet_types_core::felt::Felt;

/// Whether `call` is a module prefix addressed to `sender`
pub fn is_prefix_call(call: &Call, sender: &Felt) -> bool {
    call.to == *sender && call.selector == selector_from_name(MODULE_VALIDATE_ENTRYPOINT)
}

/// Signs transactions with a session key, attaching policy proofs
#[derive(Debug, Clone)]
pub struct SessionTransactionSigner {
    session_key: StarkSigner,
    policies: PolicyManager,
}

impl SessionTransactionSigner {
    /// Create a signer for a session key and its allow-list
    pub fn new(session_key: StarkSigner, policies: PolicyManager) -> Self {
        Self {
            session_key,
            policies,
        }
    }

    /// Policy allow-list
    pub fn policies(&self) -> &PolicyManager {
        &self.policies
    }

    /// Proof words for the user calls of a batch (prefix calls skipped)
    pub fn proof_components(&self, calls: &[Call], sender: &Felt) -> Result<Vec<Felt>> {
        if self.policies.is_unrestricted() {
            return Ok(Vec::new());
        }

        let user_calls: Vec<Call> = calls
            .iter()
            .filter(|call| !is_prefix_call(call, sender))
            .cloned()
            .collect();

        let mut components = Vec::new();
        for proof in self.policies.proofs_for_calls(&user_calls)? {
            components.push(Felt::from(proof.len() as u64));
            components.extend(proof);
        }
        Ok(components)
    }
}

#[async_trait]
impl Signer for SessionTransactionSigner {
    fn public_key(&self) -> Felt {
        self.session_key.public_key()
    }

    async fn sign_digest(&self, digest: &Felt) -> Result<RawSignature> {
        self.session_key.sign_digest(digest).await
    }

    async fn sign_transaction(
        &self,
        calls: &[Call],
        details: &SharedDetails,
        ctx: &TxContext,
    ) -> Result<SignatureComponents> {
        let proofs = self.proof_components(calls, &ctx.sender)?;
        let hash = transaction_hash(&ctx.sender, calls, details, &ctx.chain_id);
        let (r, s) = self.session_key.sign_felt(&hash)?;

        let mut signature = Vec::with_capacity(2 + proofs.len());
        signature.push(r);
        signature.push(s);
        signature.extend(proofs);
        Ok(signature)
    }
}
