//! Signer tests

use modular_account_core::signer::verify_stark;
use modular_account_core::{
    Call, EthSigner, FeeBounds, Felt, P256Signer, RawSignature, SharedDetails, Signer,
    StarkSigner, TransactionVersion, TxContext,
};

fn details() -> SharedDetails {
    SharedDetails::new(Felt::from(4u64), FeeBounds::V1 { max_fee: 10_000 })
}

#[tokio::test]
async fn test_stark_transaction_signature_verifies() {
    let signer = StarkSigner::from_hex("0xfeed").unwrap();
    let ctx = TxContext::new(Felt::from(0xaccu64), Felt::from(1u64));
    let calls = vec![Call::by_name(Felt::from(0x70u64), "transfer", vec![Felt::ONE])];

    let signature = signer.sign_transaction(&calls, &details(), &ctx).await.unwrap();
    let hash = modular_account_core::chain::tx::transaction_hash(
        &ctx.sender,
        &calls,
        &details(),
        &ctx.chain_id,
    );

    assert_eq!(signature.len(), 2);
    assert!(verify_stark(&signer.public_key(), &hash, &signature[0], &signature[1]));
}

#[tokio::test]
async fn test_transaction_signature_depends_on_details() {
    let signer = StarkSigner::from_hex("0xfeed").unwrap();
    let ctx = TxContext::new(Felt::from(0xaccu64), Felt::from(1u64));

    let a = signer.sign_transaction(&[], &details(), &ctx).await.unwrap();
    let other = SharedDetails::new(Felt::from(4u64), FeeBounds::zero(TransactionVersion::V3));
    let b = signer.sign_transaction(&[], &other, &ctx).await.unwrap();
    assert_ne!(a, b);
}

#[tokio::test]
async fn test_alternate_curves_do_not_normalize_to_rs() {
    let eth = EthSigner::random();
    let p256 = P256Signer::random().unwrap();
    let digest = Felt::from(0x5151u64);

    let eth_sig = eth.sign_digest(&digest).await.unwrap();
    let p256_sig = p256.sign_digest(&digest).await.unwrap();

    assert!(matches!(eth_sig, RawSignature::Array(ref c) if c.len() == 5));
    assert!(matches!(p256_sig, RawSignature::Array(ref c) if c.len() == 4));
    assert!(eth_sig.normalize_rs().is_err());
    assert!(p256_sig.normalize_rs().is_err());
}

#[test]
fn test_shared_signer_through_arc() {
    let signer = std::sync::Arc::new(StarkSigner::from_hex("0xfeed").unwrap());
    let direct = StarkSigner::from_hex("0xfeed").unwrap();
    assert_eq!(signer.public_key(), direct.public_key());
}
