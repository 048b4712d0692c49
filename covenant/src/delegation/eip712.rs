use alloy::{
    dyn_abi::{Eip712Domain, TypedData},
    primitives::{Address, B256},
    sol_types::{eip712_domain, SolStruct},
};
use ruint::aliases::U256;

use crate::caveats::Caveat;

/// EIP-712 domain name of the delegation manager.
pub const DOMAIN_NAME: &str = "DelegationManager";

/// EIP-712 domain version of the delegation manager.
pub const DOMAIN_VERSION: &str = "1";

/// On-chain struct names are part of the type hash, so they live in their own scope.
///
/// Reference: <https://github.com/MetaMask/delegation-framework/blob/main/src/utils/Types.sol>
#[allow(missing_docs)]
mod typed {
    alloy::sol! {
        #[derive(Debug, serde::Serialize)]
        struct Caveat {
            address enforcer;
            bytes terms;
        }

        #[derive(Debug, serde::Serialize)]
        struct Delegation {
            address delegate;
            address delegator;
            bytes32 authority;
            Caveat[] caveats;
            uint256 salt;
        }
    }
}

pub(crate) use typed::Delegation as TypedDelegation;

/// The domain binding signatures to one delegation manager on one chain.
#[must_use]
pub fn delegation_domain(chain_id: u64, delegation_manager: Address) -> Eip712Domain {
    eip712_domain! {
        name: DOMAIN_NAME,
        version: DOMAIN_VERSION,
        chain_id: chain_id,
        verifying_contract: delegation_manager,
    }
}

/// Builds the hashed representation of a delegation.
pub(crate) fn typed_delegation(
    delegate: Address,
    delegator: Address,
    authority: B256,
    caveats: &[Caveat],
    salt: B256,
) -> TypedDelegation {
    TypedDelegation {
        delegate,
        delegator,
        authority,
        caveats: caveats
            .iter()
            .map(|caveat| typed::Caveat {
                enforcer: caveat.enforcer,
                terms: caveat.terms.clone(),
            })
            .collect(),
        salt: U256::from_be_bytes(salt.0),
    }
}

/// EIP-712 struct hash, identical to `DelegationManager.getDelegationHash`.
pub(crate) fn struct_hash(delegation: &TypedDelegation) -> B256 {
    delegation.eip712_hash_struct()
}

/// Digest the delegator signs.
pub(crate) fn signing_hash(delegation: &TypedDelegation, domain: &Eip712Domain) -> B256 {
    delegation.eip712_signing_hash(domain)
}

/// Typed data document for wallets that sign EIP-712 JSON.
pub(crate) fn typed_data(delegation: &TypedDelegation, domain: Eip712Domain) -> TypedData {
    TypedData::from_struct(delegation, Some(domain))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256, keccak256};

    use super::*;

    #[test]
    fn test_type_hashes_match_delegation_manager() {
        assert_eq!(
            TypedDelegation::eip712_encode_type(),
            "Delegation(address delegate,address delegator,bytes32 authority,Caveat[] caveats,uint256 salt)Caveat(address enforcer,bytes terms)"
        );
        assert_eq!(
            keccak256(TypedDelegation::eip712_encode_type().as_bytes()),
            b256!("0x88c1d2ecf185adf710588203a5f263f0ff61be0d33da39792cde19ba9aa4331e")
        );
        assert_eq!(
            keccak256(typed::Caveat::eip712_encode_type().as_bytes()),
            b256!("0x80ad7e1b04ee6d994a125f4714ca0720908bd80ed16063ec8aee4b88e9253e2d")
        );
    }

    #[test]
    fn test_typed_data_hash_matches_struct_signing_hash() {
        let manager = address!("0xdb9B1e94B5b69Df7e401DDbedE43491141047dB3");
        let delegation = typed_delegation(
            address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            B256::repeat_byte(0xff),
            &[Caveat {
                enforcer: address!("0x04658B29F6b82ed55274221a06Fc97D318E25416"),
                terms: alloy::primitives::Bytes::from(vec![0u8; 32]),
                args: alloy::primitives::Bytes::new(),
            }],
            B256::with_last_byte(7),
        );
        let domain = delegation_domain(1, manager);

        assert_eq!(
            typed_data(&delegation, domain.clone())
                .eip712_signing_hash()
                .unwrap(),
            signing_hash(&delegation, &domain)
        );
        assert_eq!(delegation.salt, U256::from(7));
    }

    #[test]
    fn test_domain_binds_chain_and_manager() {
        let manager = address!("0xdb9B1e94B5b69Df7e401DDbedE43491141047dB3");
        let mainnet = delegation_domain(1, manager);
        let sepolia = delegation_domain(11_155_111, manager);
        assert_ne!(mainnet.separator(), sepolia.separator());
        assert_eq!(mainnet.name.as_deref(), Some(DOMAIN_NAME));
        assert_eq!(mainnet.version.as_deref(), Some(DOMAIN_VERSION));
        assert_eq!(mainnet.verifying_contract, Some(manager));
    }
}
