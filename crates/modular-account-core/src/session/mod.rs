//! # Session Keys
//!
//! Delegated signing for modular accounts. An owner-trusted grantor module
//! signs an authorization binding a session public key, an expiry and a
//! policy root to the account; the session key then signs transactions on
//! its own, each batch carrying the authorization as a prefix call.
//!
//! ## Flow
//!
//! ```text
//! SessionGrant ──▶ SessionKeyModule ──request(grantor)──▶ digest
//!                        ▲                                  │
//!                        └──── add_signature ◀── SessionKeyGrantor::sign
//!
//! Account::execute(calls)  =>  [prefix_call, ...calls] signed by SessionTransactionSigner
//! ```

pub mod grantor;
pub mod message;
pub mod module;
pub mod signer;

pub use grantor::SessionKeyGrantor;
pub use message::{AuthMessage, hash_auth_message};
pub use module::{
    Authorization, MODULE_VALIDATE_ENTRYPOINT, SessionGrant, SessionKeyModule, SessionPrefix,
    SessionState,
};
pub use signer::{SessionTransactionSigner, is_prefix_call};
