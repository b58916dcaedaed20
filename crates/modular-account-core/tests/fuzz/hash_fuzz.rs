//! Fuzz tests for hashing and prefix encoding

use modular_account_core::session::SessionPrefix;
use modular_account_core::{
    AccountModule, Felt, SessionGrant, SessionKeyModule, compress, elements_hash,
    hash_auth_message,
};
use proptest::prelude::*;

fn felt_strategy() -> impl Strategy<Value = Felt> {
    prop::array::uniform32(any::<u8>()).prop_map(|mut bytes| {
        bytes[0] &= 0x07;
        Felt::from_bytes_be(&bytes)
    })
}

proptest! {
    /// Elements hash equals its defining fold
    #[test]
    fn elements_hash_matches_fold(elements in prop::collection::vec(felt_strategy(), 0..16)) {
        let folded = elements.iter().fold(Felt::ZERO, |acc, e| compress(&acc, e));
        let expected = compress(&folded, &Felt::from(elements.len() as u64));
        prop_assert_eq!(elements_hash(&elements), expected);
    }

    /// Swapping two distinct elements changes the hash
    #[test]
    fn elements_hash_is_order_sensitive(a in felt_strategy(), b in felt_strategy()) {
        prop_assume!(a != b);
        prop_assert_ne!(elements_hash(&[a, b]), elements_hash(&[b, a]));
    }

    /// The prefix carries everything needed to recompute the signed digest
    #[test]
    fn prefix_recomputes_digest(
        account in felt_strategy(),
        validator in felt_strategy(),
        grantor in felt_strategy(),
        auth_key in felt_strategy(),
        expires in any::<u64>(),
        root in felt_strategy(),
        chain_id in felt_strategy(),
        signature in prop::collection::vec(felt_strategy(), 0..6),
    ) {
        let grant = SessionGrant::new(account, validator, auth_key, chain_id)
            .with_expires(expires)
            .with_policy_root(root);
        let mut module = SessionKeyModule::new(grant);
        let digest = module.request(grantor).unwrap();
        module.add_signature(&signature).unwrap();

        let prefix = module.prefix(&[]).unwrap();
        prop_assert_eq!(prefix.calldata[0], Felt::from((prefix.calldata.len() - 1) as u64));

        let decoded = SessionPrefix::decode(&prefix).unwrap();
        prop_assert_eq!(decoded.signature, signature);
        prop_assert_eq!(
            hash_auth_message(
                &decoded.account_address,
                &decoded.validator_class,
                &decoded.grantor_class,
                &decoded.auth_key,
                &decoded.expires,
                &decoded.policy_root,
                &chain_id,
            ),
            digest
        );
    }
}
