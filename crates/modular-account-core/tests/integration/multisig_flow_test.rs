//! Integration tests for multisig co-signing
//!
//! A threshold-2 account accepts the aggregate only when both partial
//! signatures were computed over the same shared details.

use crate::common::{config, core_validator, devnet, init_tracing, owners, transfer};
use async_trait::async_trait;
use modular_account_core::{
    Error, Felt, MultisigCoordinator, Provider, RawSignature, Result, Signer, TxStatus,
    ValidatorModule,
};

fn account_address() -> Felt {
    Felt::from(0x3u64 << 40)
}

/// Co-signer whose key store is unavailable
struct UnavailableSigner;

#[async_trait]
impl Signer for UnavailableSigner {
    fn public_key(&self) -> Felt {
        Felt::from(0xdeadu64)
    }

    async fn sign_digest(&self, _digest: &Felt) -> Result<RawSignature> {
        Err(Error::Crypto("key store unavailable".into()))
    }
}

#[tokio::test]
async fn test_shared_details_are_accepted() {
    init_tracing();
    let provider = devnet(account_address(), 2);
    let coordinator = MultisigCoordinator::new(
        config(account_address()).with_multisig_threshold(2),
        provider.clone(),
    );
    let owners = owners();

    let batch = coordinator.prepare_details(&[transfer(10)]).await.unwrap();
    let first = coordinator.sign_with_details(&owners[0], &batch).await.unwrap();
    let second = coordinator.sign_with_details(&owners[1], &batch).await.unwrap();

    let signature = coordinator.aggregate(vec![first, second]).unwrap();
    assert_eq!(signature.len(), 4);

    let handle = coordinator.execute(&batch, signature).await.unwrap();
    let receipt = provider.wait_for_receipt(&handle, 5).await.unwrap();
    assert!(receipt.success(), "{:?}", receipt.status);
    assert_eq!(provider.get_nonce(&account_address()).await.unwrap(), Felt::ONE);
}

#[tokio::test]
async fn test_independent_details_are_rejected() {
    let provider = devnet(account_address(), 2);
    let coordinator = MultisigCoordinator::new(config(account_address()), provider.clone());
    let owners = owners();

    // each signer fetches its own nonce and fee
    let batch_a = coordinator.prepare_details(&[transfer(10)]).await.unwrap();
    let batch_b = coordinator.prepare_details(&[transfer(10)]).await.unwrap();
    assert_eq!(batch_a.details.nonce, batch_b.details.nonce);
    assert_ne!(batch_a.details, batch_b.details);

    let first = coordinator.sign_with_details(&owners[0], &batch_a).await.unwrap();
    let second = coordinator.sign_with_details(&owners[1], &batch_b).await.unwrap();
    let signature = coordinator.aggregate(vec![first, second]).unwrap();

    let handle = coordinator.execute(&batch_a, signature).await.unwrap();
    let receipt = provider.wait_for_receipt(&handle, 5).await.unwrap();
    assert!(matches!(receipt.status, TxStatus::Rejected { .. }));
    assert_eq!(provider.get_nonce(&account_address()).await.unwrap(), Felt::ZERO);
}

#[tokio::test]
async fn test_signer_order_matters() {
    let provider = devnet(account_address(), 2);
    let coordinator = MultisigCoordinator::new(config(account_address()), provider.clone());
    let owners = owners();

    let batch = coordinator.prepare_details(&[transfer(10)]).await.unwrap();
    let first = coordinator.sign_with_details(&owners[0], &batch).await.unwrap();
    let third = coordinator.sign_with_details(&owners[2], &batch).await.unwrap();

    let reversed = coordinator
        .aggregate(vec![third.clone(), first.clone()])
        .unwrap();
    let handle = coordinator.execute(&batch, reversed).await.unwrap();
    assert!(!provider.wait_for_receipt(&handle, 5).await.unwrap().success());

    // registration order, skipping the second owner
    let ordered = coordinator.aggregate(vec![first, third]).unwrap();
    let handle = coordinator.execute(&batch, ordered).await.unwrap();
    assert!(provider.wait_for_receipt(&handle, 5).await.unwrap().success());
    assert_eq!(provider.transaction_count(), 1);
}

#[tokio::test]
async fn test_sign_all_concurrently() {
    let provider = devnet(account_address(), 3);
    let coordinator = MultisigCoordinator::new(
        config(account_address()).with_multisig_threshold(3),
        provider.clone(),
    );
    let owners = owners();
    let signers: Vec<&dyn Signer> = owners.iter().map(|o| o as &dyn Signer).collect();

    let batch = coordinator.prepare_details(&[transfer(1), transfer(2)]).await.unwrap();
    let partials = coordinator.sign_all(&signers, &batch).await.unwrap();
    assert_eq!(partials.len(), 3);

    let handle = coordinator
        .execute(&batch, coordinator.aggregate(partials).unwrap())
        .await
        .unwrap();
    assert!(provider.wait_for_receipt(&handle, 5).await.unwrap().success());
}

#[tokio::test]
async fn test_failing_cosigner_aborts_round() {
    let provider = devnet(account_address(), 2);
    let coordinator = MultisigCoordinator::new(
        config(account_address()).with_multisig_threshold(2),
        provider.clone(),
    );
    let owners = owners();
    let unavailable = UnavailableSigner;
    let signers = vec![&owners[0] as &dyn Signer, &unavailable, &owners[2]];

    let batch = coordinator.prepare_details(&[transfer(3)]).await.unwrap();
    let err = coordinator.sign_all(&signers, &batch).await.unwrap_err();

    assert!(matches!(err, Error::Crypto(ref reason) if reason.contains("unavailable")));
    assert_eq!(provider.transaction_count(), 0);
    assert_eq!(provider.get_nonce(&account_address()).await.unwrap(), Felt::ZERO);
}

#[tokio::test]
async fn test_client_side_threshold_check() {
    let provider = devnet(account_address(), 2);
    let coordinator = MultisigCoordinator::new(
        config(account_address()).with_multisig_threshold(2),
        provider,
    );
    let batch = coordinator.prepare_details(&[transfer(1)]).await.unwrap();
    let only = coordinator
        .sign_with_details(&owners()[0], &batch)
        .await
        .unwrap();

    assert!(matches!(
        coordinator.aggregate(vec![only]),
        Err(Error::ThresholdNotMet {
            required: 2,
            actual: 1
        })
    ));
    assert!(matches!(
        coordinator.aggregate(vec![]),
        Err(Error::ThresholdNotMet { .. })
    ));
}

#[tokio::test]
async fn test_module_prefix_is_signed_and_routed() {
    let provider = devnet(account_address(), 2);
    let coordinator = MultisigCoordinator::new(config(account_address()), provider.clone())
        .with_module(ValidatorModule::new(account_address(), core_validator()));
    let owners = owners();

    let batch = coordinator.prepare_details(&[transfer(3)]).await.unwrap();
    assert_eq!(batch.calls.len(), 2);
    assert_eq!(batch.calls[0].calldata, vec![Felt::ONE, core_validator()]);

    let partials = vec![
        coordinator.sign_with_details(&owners[0], &batch).await.unwrap(),
        coordinator.sign_with_details(&owners[1], &batch).await.unwrap(),
    ];
    let handle = coordinator
        .execute(&batch, coordinator.aggregate(partials).unwrap())
        .await
        .unwrap();
    assert!(provider.wait_for_receipt(&handle, 5).await.unwrap().success());
}

#[tokio::test]
async fn test_uninstalled_module_is_rejected() {
    let provider = devnet(account_address(), 1);
    let coordinator = MultisigCoordinator::new(config(account_address()), provider.clone())
        .with_module(ValidatorModule::new(account_address(), Felt::from(0xe7au64)));

    let batch = coordinator.prepare_details(&[transfer(3)]).await.unwrap();
    let signature = coordinator
        .sign_with_details(&owners()[0], &batch)
        .await
        .unwrap();
    let handle = coordinator.execute(&batch, signature).await.unwrap();

    match provider.wait_for_receipt(&handle, 5).await.unwrap().status {
        TxStatus::Rejected { reason } => assert!(reason.contains("not installed")),
        other => panic!("expected rejection, got {:?}", other),
    }
}
