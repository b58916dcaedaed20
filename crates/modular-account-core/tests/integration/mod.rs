//! Integration tests module
//!
//! End-to-end flows against the in-memory devnet:
//! - Session-key grant and use
//! - Multisig co-signing
//! - Account execution

pub mod multisig_flow_test;
pub mod session_flow_test;
