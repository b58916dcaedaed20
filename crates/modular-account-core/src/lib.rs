//! # Modular Account Core
//!
//! Client-side control plane for modular Starknet smart accounts whose
//! validation is delegated to pluggable validator modules.
//!
//! ## Architecture
//!
//! This crate provides:
//! - **Session Keys**: owner-granted keys bound to an expiry and a policy root,
//!   carried to the account as a `__module_validate__` prefix call
//! - **Policy Trees**: commutative Merkle allow-lists of `(contract, selector)`
//! - **Multisig Co-Signing**: prepare once, sign independently, aggregate, submit
//! - **Signers**: Stark, secp256k1 and P-256 keys behind one [`Signer`] trait
//! - **Providers**: chain access behind the [`Provider`] trait, with an
//!   in-memory devnet that validates the way the account contract does
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use modular_account_core::{
//!     Account, AccountConfig, ExecuteOptions, PolicyManager, SessionGrant,
//!     SessionKeyGrantor, SessionKeyModule, SessionTransactionSigner, StarkSigner,
//! };
//!
//! // Scope the session to token transfers
//! let policies = PolicyManager::builder().allow_by_name(token, "transfer").build();
//! let session_key = StarkSigner::random();
//!
//! let grant = SessionGrant::new(account, session_validator, session_key.public_key(), chain_id)
//!     .expires_in(3600)
//!     .with_policies(&policies);
//!
//! // The owner vouches through the core validator module
//! let mut module = SessionKeyModule::new(grant);
//! SessionKeyGrantor::new(core_validator, owner).authorize(&mut module).await?;
//!
//! // The session key now signs on its own
//! let signer = SessionTransactionSigner::new(session_key, policies);
//! let account = Account::new(config, provider, signer).with_module(module);
//! let handle = account.execute(&calls, ExecuteOptions::default()).await?;
//! ```
//!
//! ## Security Model
//!
//! The grantor signature binds the session key to one account, one validator
//! module, one grantor module and one chain. The policy root and expiry are
//! inside the signed digest, so neither can be widened after the grant.

pub mod account;
pub mod chain;
pub mod config;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod multisig;
pub mod policy;
pub mod session;
pub mod signer;
pub mod types;

pub use account::{Account, AccountModule, ExecuteOptions, ValidatorModule, contract_address};
pub use config::AccountConfig;
pub use error::{Error, Result};
pub use hash::{compress, elements_hash};
pub use merkle::MerkleTree;
pub use multisig::{MultisigCoordinator, PreparedBatch};
pub use policy::{Policy, PolicyBuilder, PolicyManager};
pub use session::{
    AuthMessage, Authorization, SessionGrant, SessionKeyGrantor, SessionKeyModule,
    SessionState, SessionTransactionSigner, hash_auth_message,
};
pub use signer::{RawSignature, Signer, StarkSigner, TxContext};
pub use types::{
    Call, FeeBounds, ResourceBounds, SharedDetails, SignatureComponents, TransactionVersion,
    felt_from_hex, felt_to_hex, selector_from_name, short_string,
};

#[cfg(feature = "secp256k1")]
pub use signer::EthSigner;

#[cfg(feature = "p256")]
pub use signer::P256Signer;

pub use chain::{FeeEstimate, InvokeTransaction, Provider, Receipt, TxHandle, TxStatus};

#[cfg(feature = "runtime")]
pub use chain::{DevnetAccount, DevnetProvider};

/// Field element type used throughout the crate
pub use starknet_types_core::felt::Felt;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
