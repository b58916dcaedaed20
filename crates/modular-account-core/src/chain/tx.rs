//! Invoke transaction encoding and hashing
//!
//! Both supported invoke versions are hashed here so that every signer in a
//! co-signing round derives the same digest from `(calls, details)`.

use crate::hash::elements_hash;
use crate::types::{Call, FeeBounds, ResourceBounds, SharedDetails};
use starknet_crypto::poseidon_hash_many;
use starknet_types_core::felt::Felt;

/// `"invoke"` as a Cairo short string
const INVOKE_PREFIX: u64 = 0x696e766f6b65;

/// Resource names packed into the top 64 bits of a v3 bound
const L1_GAS_NAME: &[u8; 6] = b"L1_GAS";
const L2_GAS_NAME: &[u8; 6] = b"L2_GAS";

/// Flatten calls into `__execute__` calldata
///
/// `[n_calls, (to, selector, calldata_len, ...calldata) per call]`
pub fn encode_execute_calldata(calls: &[Call]) -> Vec<Felt> {
    let words: usize = calls.iter().map(|c| 3 + c.calldata.len()).sum();
    let mut calldata = Vec::with_capacity(1 + words);
    calldata.push(Felt::from(calls.len() as u64));
    for call in calls {
        calldata.push(call.to);
        calldata.push(call.selector);
        calldata.push(Felt::from(call.calldata.len() as u64));
        calldata.extend_from_slice(&call.calldata);
    }
    calldata
}

/// Pedersen hash of a v1 invoke transaction
pub fn invoke_v1_hash(
    sender: &Felt,
    calldata: &[Felt],
    max_fee: u128,
    chain_id: &Felt,
    nonce: &Felt,
) -> Felt {
    elements_hash(&[
        Felt::from(INVOKE_PREFIX),
        Felt::ONE,
        *sender,
        Felt::ZERO,
        elements_hash(calldata),
        Felt::from(max_fee),
        *chain_id,
        *nonce,
    ])
}

/// Pack one resource bound: `name << 192 | max_amount << 128 | max_price`
fn encode_resource_bound(name: &[u8; 6], bounds: &ResourceBounds) -> Felt {
    let mut bytes = [0u8; 32];
    bytes[2..8].copy_from_slice(name);
    bytes[8..16].copy_from_slice(&bounds.max_amount.to_be_bytes());
    bytes[16..].copy_from_slice(&bounds.max_price_per_unit.to_be_bytes());
    Felt::from_bytes_be(&bytes)
}

/// Poseidon hash of a v3 invoke transaction
///
/// Paymaster and account-deployment data are always empty and both data
/// availability modes are L1.
pub fn invoke_v3_hash(
    sender: &Felt,
    calldata: &[Felt],
    l1_gas: &ResourceBounds,
    l2_gas: &ResourceBounds,
    tip: u64,
    chain_id: &Felt,
    nonce: &Felt,
) -> Felt {
    let fee_fields = poseidon_hash_many(&[
        Felt::from(tip),
        encode_resource_bound(L1_GAS_NAME, l1_gas),
        encode_resource_bound(L2_GAS_NAME, l2_gas),
    ]);

    poseidon_hash_many(&[
        Felt::from(INVOKE_PREFIX),
        Felt::from(3u64),
        *sender,
        fee_fields,
        poseidon_hash_many(&[]),
        *chain_id,
        *nonce,
        Felt::ZERO,
        poseidon_hash_many(&[]),
        poseidon_hash_many(calldata),
    ])
}

/// Hash of an invoke over `calls`, version selected by the fee bounds
pub fn transaction_hash(
    sender: &Felt,
    calls: &[Call],
    details: &SharedDetails,
    chain_id: &Felt,
) -> Felt {
    let calldata = encode_execute_calldata(calls);
    match details.fee {
        FeeBounds::V1 { max_fee } => {
            invoke_v1_hash(sender, &calldata, max_fee, chain_id, &details.nonce)
        }
        FeeBounds::V3 {
            l1_gas,
            l2_gas,
            tip,
        } => invoke_v3_hash(
            sender,
            &calldata,
            &l1_gas,
            &l2_gas,
            tip,
            chain_id,
            &details.nonce,
        ),
    }
}
