//! Hash primitives
//!
//! `compress` is the two-input Pedersen compression function of the Stark
//! curve. Everything else in the authorization core (the elements hash, the
//! policy Merkle tree, v1 transaction hashes, contract addresses) is built
//! on top of it.

use starknet_crypto::pedersen_hash;
use starknet_types_core::felt::Felt;

/// Two-input compression function
pub fn compress(a: &Felt, b: &Felt) -> Felt {
    pedersen_hash(a, b)
}

/// Order-sensitive chained hash over a sequence of field elements
///
/// Folds `compress(acc, x)` from an accumulator of zero, then compresses the
/// result with the element count: `h(h(h(h(0, e0), e1), e2), 3)`.
pub fn elements_hash(elements: &[Felt]) -> Felt {
    let folded = elements
        .iter()
        .fold(Felt::ZERO, |acc, element| compress(&acc, element));
    compress(&folded, &Felt::from(elements.len() as u64))
}
