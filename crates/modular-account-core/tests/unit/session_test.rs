//! Authorization digest and session module tests

use modular_account_core::session::{
    MODULE_VALIDATE_ENTRYPOINT, SessionPrefix, message::SESSION_TYPE_HASH,
};
use modular_account_core::{
    AccountModule, AuthMessage, Error, Felt, SessionGrant, SessionKeyModule, SessionState,
    elements_hash, felt_from_hex, hash_auth_message, selector_from_name, short_string,
};

fn grant() -> SessionGrant {
    SessionGrant::new(
        Felt::from(0xacc0u64),
        Felt::from(0x5e55u64),
        Felt::from(0xbeefu64),
        short_string("SN_SEPOLIA").unwrap(),
    )
    .with_expires(2_000_000_000)
}

// ============================================================================
// Authorization Digest
// ============================================================================

#[test]
fn test_digest_is_deterministic() {
    let args = [
        Felt::from(0xacc0u64),
        Felt::from(0x5e55u64),
        Felt::from(0xc0e0u64),
        Felt::from(0xbeefu64),
        Felt::from(2_000_000_000u64),
        Felt::ZERO,
        short_string("SN_SEPOLIA").unwrap(),
    ];
    let digest = |a: &[Felt; 7]| hash_auth_message(&a[0], &a[1], &a[2], &a[3], &a[4], &a[5], &a[6]);

    let base = digest(&args);
    assert_eq!(base, digest(&args));

    // grantor class, expiry, root
    for index in [2, 4, 5] {
        let mut changed = args;
        changed[index] = changed[index] + Felt::ONE;
        assert_ne!(digest(&changed), base, "input {} not bound", index);
    }
}

#[test]
fn test_digest_matches_struct_form() {
    let message = AuthMessage {
        account_address: Felt::from(1u64),
        validator_class: Felt::from(2u64),
        grantor_class: Felt::from(3u64),
        auth_key: Felt::from(4u64),
        expires: Felt::from(5u64),
        policy_root: Felt::from(6u64),
        chain_id: Felt::from(7u64),
    };
    assert_eq!(
        message.hash(),
        hash_auth_message(
            &Felt::from(1u64),
            &Felt::from(2u64),
            &Felt::from(3u64),
            &Felt::from(4u64),
            &Felt::from(5u64),
            &Felt::from(6u64),
            &Felt::from(7u64),
        )
    );
}

#[test]
fn test_session_type_hash_value() {
    assert_eq!(
        SESSION_TYPE_HASH,
        felt_from_hex("0x1aa0e1c56b45cf06a54534fa1707c54e520b842feb21d03b7deddb6f1e340c").unwrap()
    );
}

// ============================================================================
// Session Module
// ============================================================================

#[test]
fn test_rerequest_same_grantor_returns_same_digest() {
    let mut module = SessionKeyModule::new(grant());
    let a = module.request(Felt::from(0xau64)).unwrap();
    let b = module.request(Felt::from(0xau64)).unwrap();
    assert_eq!(a, b);
    assert_eq!(module.state(), SessionState::Bound);
}

#[test]
fn test_rebinding_requires_reset() {
    let mut module = SessionKeyModule::new(grant());
    module.request(Felt::from(0xau64)).unwrap();

    assert!(matches!(
        module.request(Felt::from(0xbu64)),
        Err(Error::GrantorConflict { .. })
    ));

    module.reset();
    let digest_b = module.request(Felt::from(0xbu64)).unwrap();
    assert_eq!(
        module.authorization().grantor_class,
        Some(Felt::from(0xbu64))
    );
    assert_eq!(digest_b, module.digest().unwrap());
}

#[test]
fn test_prefix_before_request_is_not_ready() {
    let module = SessionKeyModule::new(grant());
    assert!(matches!(module.prefix(&[]), Err(Error::NotReady(_))));
}

#[test]
fn test_prefix_with_empty_signature() {
    let mut module = SessionKeyModule::new(grant());
    module.request(Felt::from(0xau64)).unwrap();

    let prefix = module.prefix(&[]).unwrap();
    assert_eq!(prefix.selector, selector_from_name(MODULE_VALIDATE_ENTRYPOINT));
    assert_eq!(prefix.calldata.len(), 7);
    assert_eq!(prefix.calldata[0], Felt::from(6u64));
    assert_eq!(prefix.calldata[6], Felt::ZERO);
}

#[test]
fn test_prefix_roundtrips_to_signed_digest() {
    let mut module = SessionKeyModule::new(grant());
    let digest = module.request(Felt::from(0xau64)).unwrap();
    module
        .add_signature(&[Felt::from(0x11u64), Felt::from(0x22u64)])
        .unwrap();

    let prefix = SessionKeyModule::decode_prefix(&module.prefix(&[]).unwrap()).unwrap();
    assert_eq!(prefix.digest(&grant().chain_id), digest);
    assert_eq!(prefix.signature, vec![Felt::from(0x11u64), Felt::from(0x22u64)]);
}

#[test]
fn test_policy_root_flows_into_prefix() {
    let root = elements_hash(&[Felt::ONE]);
    let mut module = SessionKeyModule::new(grant().with_policy_root(root));
    module.request(Felt::from(0xau64)).unwrap();

    let decoded: SessionPrefix = SessionPrefix::decode(&module.prefix(&[]).unwrap()).unwrap();
    assert_eq!(decoded.policy_root, root);
}
