use alloy::primitives::{Bytes, B256};
use alloy::sol_types::SolValue;
use ruint::aliases::U256;

use super::{Delegation, DelegationError};
use crate::caveats::Caveat;

#[allow(missing_docs)]
mod wire {
    alloy::sol! {
        #[derive(Debug)]
        struct Caveat {
            address enforcer;
            bytes terms;
            bytes args;
        }

        #[derive(Debug)]
        struct Delegation {
            address delegate;
            address delegator;
            bytes32 authority;
            Caveat[] caveats;
            uint256 salt;
            bytes signature;
        }
    }
}

impl From<&Delegation> for wire::Delegation {
    fn from(delegation: &Delegation) -> Self {
        Self {
            delegate: delegation.delegate,
            delegator: delegation.delegator,
            authority: delegation.authority,
            caveats: delegation
                .caveats
                .iter()
                .map(|caveat| wire::Caveat {
                    enforcer: caveat.enforcer,
                    terms: caveat.terms.clone(),
                    args: caveat.args.clone(),
                })
                .collect(),
            salt: U256::from_be_bytes(delegation.salt.0),
            signature: delegation.signature.clone(),
        }
    }
}

impl From<wire::Delegation> for Delegation {
    fn from(delegation: wire::Delegation) -> Self {
        Self {
            delegate: delegation.delegate,
            delegator: delegation.delegator,
            authority: delegation.authority,
            caveats: delegation
                .caveats
                .into_iter()
                .map(|caveat| Caveat {
                    enforcer: caveat.enforcer,
                    terms: caveat.terms,
                    args: caveat.args,
                })
                .collect(),
            salt: B256::from(delegation.salt.to_be_bytes::<32>()),
            signature: delegation.signature,
        }
    }
}

/// ABI-encodes a delegation chain as `Delegation[]`, leaf first.
///
/// The result is the permission context handed to `redeemDelegations`.
#[must_use]
pub fn encode_delegations(delegations: &[Delegation]) -> Bytes {
    delegations
        .iter()
        .map(wire::Delegation::from)
        .collect::<Vec<_>>()
        .abi_encode()
        .into()
}

/// Decodes a permission context produced by [`encode_delegations`].
///
/// # Errors
/// - `DelegationError::Encoding` if `data` is not an ABI-encoded `Delegation[]`.
pub fn decode_delegations(data: &[u8]) -> Result<Vec<Delegation>, DelegationError> {
    let decoded =
        Vec::<wire::Delegation>::abi_decode(data).map_err(|e| DelegationError::Encoding {
            message: e.to_string(),
        })?;
    Ok(decoded.into_iter().map(Delegation::from).collect())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, bytes};

    use super::*;
    use crate::delegation::ROOT_AUTHORITY;

    fn sample(salt: u8) -> Delegation {
        Delegation {
            delegate: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            delegator: address!("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"),
            authority: ROOT_AUTHORITY,
            caveats: vec![Caveat {
                enforcer: address!("0x04658B29F6b82ed55274221a06Fc97D318E25416"),
                terms: bytes!("0x0000000000000000000000000000000000000000000000000000000000000003"),
                args: bytes!("0xbeef"),
            }],
            salt: B256::with_last_byte(salt),
            signature: Bytes::from(vec![0x11; 65]),
        }
    }

    #[test]
    fn test_permission_context_layout() {
        let encoded = encode_delegations(&[sample(1)]);
        // head: offset of the array, then its length
        assert_eq!(encoded[31], 0x20);
        assert_eq!(encoded[63], 1);
        assert_eq!(encoded.len() % 32, 0);
    }

    #[test]
    fn test_decode_restores_args_and_signature() {
        let chain = vec![sample(1), sample(2)];
        let decoded = decode_delegations(&encode_delegations(&chain)).unwrap();
        assert_eq!(decoded, chain);
        assert_eq!(decoded[0].caveats()[0].args, bytes!("0xbeef"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            decode_delegations(&[0u8; 7]).unwrap_err(),
            DelegationError::Encoding { .. }
        ));
    }
}
