use alloy::primitives::{Bytes, B256, U256};
use covenant::caveats::{resolve_scope, CaveatKind, Scope};
use covenant::delegation::{
    create_delegation, create_open_delegation, create_scoped_delegation, decode_delegations,
    encode_delegations, Authority, DelegationError, ROOT_AUTHORITY,
};
use covenant::signer::{DelegatorSigner, KeySigner};

mod common;

use common::{key, sepolia, DELEGATE, DELEGATOR, OWNER_KEY, SECOND_KEY, TOKEN};

#[tokio::test]
async fn test_scope_to_signed_permission_context() {
    let environment = sepolia();
    let owner = KeySigner::new(key(OWNER_KEY));

    let scope = Scope::Erc20TransferAmount {
        token: TOKEN,
        max_amount: U256::from(10).pow(U256::from(18)),
    };
    let unsigned = create_scoped_delegation(
        &environment,
        &scope,
        DELEGATOR,
        DELEGATE,
        Authority::Root,
        Vec::new(),
    )
    .unwrap()
    .with_salt(B256::with_last_byte(1));

    assert_eq!(unsigned.caveats, resolve_scope(&environment, &scope).unwrap());
    let digest = unsigned.signing_hash(&environment);
    let delegation = unsigned.sign(&owner, &environment).await.unwrap();

    assert_eq!(delegation.authority(), ROOT_AUTHORITY);
    assert_eq!(delegation.recover_signer(&environment).unwrap(), owner.address());
    assert_eq!(
        delegation.caveats()[1].enforcer,
        environment.enforcer(CaveatKind::Erc20TransferAmount).unwrap()
    );

    // signing the digest directly yields the same signature
    assert_eq!(&owner.sign_hash(digest).await.unwrap(), delegation.signature());

    let context = encode_delegations(std::slice::from_ref(&delegation));
    assert_eq!(decode_delegations(&context).unwrap(), vec![delegation]);
}

#[tokio::test]
async fn test_redelegation_chain() {
    let environment = sepolia();
    let owner = KeySigner::new(key(OWNER_KEY));
    let delegate = KeySigner::new(key(SECOND_KEY));

    let root = create_scoped_delegation(
        &environment,
        &Scope::NativeTokenTransferAmount {
            max_amount: U256::from(1_000_000),
            calldata_guard: None,
        },
        DELEGATOR,
        delegate.address(),
        Authority::Root,
        Vec::new(),
    )
    .unwrap()
    .sign(&owner, &environment)
    .await
    .unwrap();

    let leaf = create_open_delegation(delegate.address(), Authority::from(&root), Vec::new())
        .sign(&delegate, &environment)
        .await
        .unwrap();

    assert_eq!(leaf.authority(), root.hash());
    assert!(leaf.is_open());
    assert_eq!(leaf.recover_signer(&environment).unwrap(), delegate.address());

    let chain = decode_delegations(&encode_delegations(&[leaf.clone(), root.clone()])).unwrap();
    assert_eq!(chain[0].hash(), leaf.hash());
    assert_eq!(chain[1].hash(), root.hash());
}

#[test]
fn test_delegation_without_salt_is_deterministic() {
    let environment = sepolia();
    let caveats = resolve_scope(
        &environment,
        &Scope::Erc721Transfer {
            token: TOKEN,
            token_id: U256::from(7),
        },
    )
    .unwrap();

    let first = create_delegation(DELEGATOR, DELEGATE, Authority::Root, caveats.clone());
    let second = create_delegation(DELEGATOR, DELEGATE, Authority::Root, caveats);
    assert_eq!(first.salt, B256::ZERO);
    assert_eq!(first.hash(), second.hash());
    assert_eq!(first.signing_hash(&environment), second.signing_hash(&environment));
}

#[test]
fn test_garbage_signature_does_not_recover() {
    let environment = sepolia();
    let delegation = create_delegation(DELEGATOR, DELEGATE, Authority::Root, Vec::new())
        .with_signature(Bytes::from(vec![0u8; 12]));
    assert!(matches!(
        delegation.recover_signer(&environment).unwrap_err(),
        DelegationError::InvalidSignature { .. }
    ));
}
