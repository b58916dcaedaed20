//! Integration tests for the session-key flow
//!
//! Grant a session through the core validator, then let the session key
//! execute on its own, with and without a policy allow-list.

use crate::common::{
    config, core_validator, devnet, init_tracing, owners, session_validator, token, transfer,
};
use modular_account_core::chain::sn_sepolia;
use modular_account_core::session::SessionPrefix;
use modular_account_core::signer::verify_stark;
use modular_account_core::{
    Account, AccountModule, Call, Error, ExecuteOptions, Felt, PolicyManager, Provider,
    SessionGrant, SessionKeyGrantor, SessionKeyModule, SessionState, SessionTransactionSigner,
    Signer, StarkSigner, TxStatus, hash_auth_message,
};

fn account_address() -> Felt {
    Felt::from(0xa11ce0u64)
}

fn session_key() -> StarkSigner {
    StarkSigner::from_hex("0x5e551011").unwrap()
}

fn grant(policies: &PolicyManager) -> SessionGrant {
    SessionGrant::new(
        account_address(),
        session_validator(),
        session_key().public_key(),
        sn_sepolia(),
    )
    .with_policies(policies)
}

// ============================================================================
// Authorization
// ============================================================================

#[tokio::test]
async fn test_prefix_roundtrips_to_signed_digest() {
    let owner = owners().remove(0);
    let grantor = SessionKeyGrantor::new(core_validator(), owner.clone());
    let mut module = SessionKeyModule::new(grant(&PolicyManager::unrestricted()).with_expires(0));

    let [r, s] = grantor.sign(&mut module).await.unwrap();
    let signed_digest = module.digest().unwrap();
    module.add_signature(&[r, s]).unwrap();
    assert_eq!(module.state(), SessionState::Signed);

    let prefix = module.prefix(&[]).unwrap();
    assert_eq!(prefix.to, account_address());

    let data = &prefix.calldata;
    let recomputed = hash_auth_message(
        &prefix.to,
        &data[1],
        &data[2],
        &data[3],
        &data[4],
        &data[5],
        &sn_sepolia(),
    );
    assert_eq!(recomputed, signed_digest);
    assert_eq!(data[2], core_validator());
    assert!(verify_stark(&owner.public_key(), &recomputed, &data[7], &data[8]));
}

// ============================================================================
// Execution
// ============================================================================

async fn session_account(
    provider: &modular_account_core::DevnetProvider,
    grant: SessionGrant,
    grantors: &[StarkSigner],
    policies: PolicyManager,
) -> Account<modular_account_core::DevnetProvider, SessionTransactionSigner> {
    let mut module = SessionKeyModule::new(grant);
    for owner in grantors {
        SessionKeyGrantor::new(core_validator(), owner.clone())
            .authorize(&mut module)
            .await
            .unwrap();
    }

    Account::new(
        config(account_address()),
        provider.clone(),
        SessionTransactionSigner::new(session_key(), policies),
    )
    .with_module(module)
}

#[tokio::test]
async fn test_unrestricted_session_executes() {
    init_tracing();
    let provider = devnet(account_address(), 1);
    let grant = config(account_address())
        .with_session_ttl(3600)
        .session_grant(session_key().public_key())
        .unwrap();
    let account = session_account(
        &provider,
        grant,
        &owners()[..1],
        PolicyManager::unrestricted(),
    )
    .await;

    let handle = account
        .execute(&[transfer(100)], ExecuteOptions::default())
        .await
        .unwrap();
    let receipt = account.wait_for_receipt(&handle, 5).await.unwrap();

    assert!(receipt.success(), "{:?}", receipt.status);
    assert_eq!(provider.get_nonce(&account_address()).await.unwrap(), Felt::ONE);
}

#[tokio::test]
async fn test_policy_restricted_session_executes_allowed_calls() {
    let provider = devnet(account_address(), 1);
    let policies = PolicyManager::builder()
        .allow_by_name(token(), "transfer")
        .allow_by_name(token(), "approve")
        .allow_by_name(Felt::from(0xd3au64), "swap")
        .build();
    let account = session_account(&provider, grant(&policies), &owners()[..1], policies).await;

    let calls = vec![
        transfer(5),
        Call::by_name(token(), "approve", vec![Felt::ONE, Felt::from(9u64), Felt::ZERO]),
    ];
    let handle = account.execute(&calls, ExecuteOptions::default()).await.unwrap();
    let receipt = account.wait_for_receipt(&handle, 5).await.unwrap();
    assert!(receipt.success(), "{:?}", receipt.status);
}

#[tokio::test]
async fn test_disallowed_call_never_leaves_the_client() {
    let provider = devnet(account_address(), 1);
    let policies = PolicyManager::builder()
        .allow_by_name(token(), "transfer")
        .build();
    let account = session_account(&provider, grant(&policies), &owners()[..1], policies).await;

    let err = account
        .execute(
            &[Call::by_name(token(), "burn", vec![])],
            ExecuteOptions::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(provider.transaction_count(), 0);
}

#[tokio::test]
async fn test_widened_policy_is_rejected_on_chain() {
    let provider = devnet(account_address(), 1);
    let granted = PolicyManager::builder()
        .allow_by_name(token(), "transfer")
        .build();
    // signer claims a wider allow-list than the owner granted
    let widened = PolicyManager::builder()
        .allow_by_name(token(), "transfer")
        .allow_by_name(token(), "burn")
        .build();
    let account = session_account(&provider, grant(&granted), &owners()[..1], widened).await;

    let handle = account
        .execute(
            &[Call::by_name(token(), "burn", vec![])],
            ExecuteOptions::default(),
        )
        .await
        .unwrap();
    let receipt = account.wait_for_receipt(&handle, 5).await.unwrap();
    match receipt.status {
        TxStatus::Rejected { reason } => assert!(reason.contains("policy"), "{}", reason),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let provider = devnet(account_address(), 1);
    let policies = PolicyManager::unrestricted();
    let expires = provider.timestamp() + 60;
    let account = session_account(
        &provider,
        grant(&policies).with_expires(expires),
        &owners()[..1],
        policies,
    )
    .await;

    provider.advance_time(120);
    let handle = account
        .execute(&[transfer(1)], ExecuteOptions::default())
        .await
        .unwrap();
    let receipt = account.wait_for_receipt(&handle, 5).await.unwrap();
    assert_eq!(
        receipt.status,
        TxStatus::Rejected {
            reason: "session expired".into()
        }
    );
}

#[tokio::test]
async fn test_session_granted_by_stranger_is_rejected() {
    let provider = devnet(account_address(), 1);
    let policies = PolicyManager::unrestricted();
    let stranger = StarkSigner::from_hex("0xbad").unwrap();
    let account = session_account(&provider, grant(&policies), &[stranger], policies).await;

    let handle = account
        .execute(&[transfer(1)], ExecuteOptions::default())
        .await
        .unwrap();
    let receipt = account.wait_for_receipt(&handle, 5).await.unwrap();
    match receipt.status {
        TxStatus::Rejected { reason } => assert!(reason.starts_with("session authorization")),
        other => panic!("expected rejection, got {:?}", other),
    }
}

#[tokio::test]
async fn test_multisig_account_grants_session_with_threshold() {
    let provider = devnet(account_address(), 2);
    let policies = PolicyManager::unrestricted();
    let owners = owners();

    // one grantor signature is not enough
    let single =
        session_account(&provider, grant(&policies), &owners[..1], policies.clone()).await;
    let handle = single
        .execute(&[transfer(1)], ExecuteOptions::default())
        .await
        .unwrap();
    assert!(!single.wait_for_receipt(&handle, 5).await.unwrap().success());

    // two owners in registration order
    let double = session_account(&provider, grant(&policies), &owners[..2], policies).await;
    let handle = double
        .execute(&[transfer(1)], ExecuteOptions::default())
        .await
        .unwrap();
    let receipt = double.wait_for_receipt(&handle, 5).await.unwrap();
    assert!(receipt.success(), "{:?}", receipt.status);
}

#[tokio::test]
async fn test_decoded_prefix_matches_devnet_view() {
    let policies = PolicyManager::unrestricted();
    let mut module = SessionKeyModule::new(grant(&policies));
    SessionKeyGrantor::new(core_validator(), owners().remove(0))
        .authorize(&mut module)
        .await
        .unwrap();

    let decoded = SessionPrefix::decode(&module.prefix(&[]).unwrap()).unwrap();
    assert_eq!(decoded.auth_key, session_key().public_key());
    assert_eq!(decoded.validator_class, session_validator());
    assert_eq!(decoded.signature.len(), 2);
}
