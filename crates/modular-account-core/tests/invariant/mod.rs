//! Invariant tests module
//!
//! State-machine and protocol invariants that must hold for any sequence
//! of operations:
//! - Session module lifecycle
//! - Multisig aggregation
