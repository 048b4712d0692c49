use alloy::primitives::{address, U256};
use covenant::caveats::{resolve_scope, CaveatError, CaveatKind, Scope};
use covenant::environment::{
    builtin_environment, get_environment, override_environment, EnvironmentError,
};

mod common;

const LOCAL_CHAIN: u64 = 1_337_000;

#[test]
fn test_override_registers_local_chain() {
    assert!(matches!(
        get_environment(LOCAL_CHAIN, Some("1.3.0")).unwrap_err(),
        EnvironmentError::UnsupportedEnvironment { chain_id: LOCAL_CHAIN, .. }
    ));

    let local = builtin_environment(1, "1.3.0").unwrap().with_enforcer(
        CaveatKind::LimitedCalls,
        address!("0x00000000000000000000000000000000000000f1"),
    );
    override_environment(LOCAL_CHAIN, "1.3.0", local);

    let resolved = get_environment(LOCAL_CHAIN, Some("1.3.0")).unwrap();
    assert_eq!(resolved.chain_id, LOCAL_CHAIN);
    assert_eq!(
        resolved.enforcer(CaveatKind::LimitedCalls).unwrap(),
        address!("0x00000000000000000000000000000000000000f1")
    );
}

#[test]
fn test_missing_deployment_fails_with_unknown_enforcer() {
    let chain = LOCAL_CHAIN + 1;
    let partial = builtin_environment(1, "1.3.0")
        .unwrap()
        .without_enforcer(CaveatKind::Erc20TransferAmount);
    override_environment(chain, "1.3.0", partial);
    let environment = get_environment(chain, Some("1.3.0")).unwrap();

    // a zero allowance is invalid terms, but the missing enforcer is reported first
    let err = resolve_scope(
        &environment,
        &Scope::Erc20TransferAmount {
            token: common::TOKEN,
            max_amount: U256::ZERO,
        },
    )
    .unwrap_err();
    assert!(matches!(
        err,
        CaveatError::UnknownEnforcer {
            kind: CaveatKind::Erc20TransferAmount,
            chain_id,
            ..
        } if chain_id == chain
    ));
}
