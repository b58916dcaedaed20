//! Session-key grantor
//!
//! A grantor is a validator module already trusted by the account (usually
//! the core owner validator) vouching for a session key. It binds itself to
//! the session authorization and signs the resulting digest.

use super::module::SessionKeyModule;
use crate::Result;
use crate::signer::Signer;
use crate::types::felt_to_hex;
use starknet_types_core::felt::Felt;
use tracing::{debug, info, instrument};

/// Signs session authorizations on behalf of a grantor module
#[derive(Debug, Clone)]
pub struct SessionKeyGrantor<S: Signer> {
    grantor_class: Felt,
    signer: S,
}

impl<S: Signer> SessionKeyGrantor<S> {
    /// Create a grantor for `grantor_class` backed by `signer`
    pub fn new(grantor_class: Felt, signer: S) -> Self {
        Self {
            grantor_class,
            signer,
        }
    }

    /// Grantor module class hash
    pub fn grantor_class(&self) -> Felt {
        self.grantor_class
    }

    /// Underlying signer
    pub fn signer(&self) -> &S {
        &self.signer
    }

    /// Bind to the module and sign its digest, returning `(r, s)`
    ///
    /// The module moves from `Unbound` to `Bound` as a side effect (or keeps
    /// an existing binding to the same grantor). The signature is not
    /// appended; see [`SessionKeyGrantor::authorize`].
    #[instrument(skip(self, module), fields(grantor = %felt_to_hex(&self.grantor_class)))]
    pub async fn sign(&self, module: &mut SessionKeyModule) -> Result<[Felt; 2]> {
        let digest = module.request(self.grantor_class)?;
        debug!(digest = %felt_to_hex(&digest), "Signing session authorization");

        let raw = self.signer.sign_digest(&digest).await?;
        let components = raw.normalize_rs()?;

        info!(
            auth_key = %felt_to_hex(&module.authorization().auth_key),
            "Session authorization signed"
        );
        Ok(components)
    }

    /// Sign and append the signature to the module
    pub async fn authorize(&self, module: &mut SessionKeyModule) -> Result<()> {
        let components = self.sign(module).await?;
        module.add_signature(&components)
    }
}
