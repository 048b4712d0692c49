use std::collections::HashSet;

use alloy::primitives::{Address, Bytes, B256};
use async_trait::async_trait;

use super::{aggregate_signature, DelegatorSigner, PartialSignature, SignatureType};
use crate::delegation::DelegationError;

/// Signs for a threshold multisig delegator with every registered key.
///
/// Signers are kept in registration order. That order, not the order in which
/// signatures come back, determines the aggregated signature.
///
/// Only ECDSA members are supported: the multisig delegator verifies packed
/// 65 byte ECDSA signatures, so WebAuthn signers cannot be members.
pub struct MultiSigner {
    account: Address,
    signers: Vec<Box<dyn DelegatorSigner>>,
}

impl MultiSigner {
    /// Creates a signer for the multisig `account`.
    ///
    /// # Errors
    /// - `DelegationError::InvalidInput` if `signers` is empty, contains a non-ECDSA
    ///   signer (WebAuthn included) or the same key twice.
    pub fn new(
        account: Address,
        signers: Vec<Box<dyn DelegatorSigner>>,
    ) -> Result<Self, DelegationError> {
        if signers.is_empty() {
            return Err(DelegationError::InvalidInput {
                attribute: "signers",
                message: "at least one signer is required".to_string(),
            });
        }
        let mut seen = HashSet::with_capacity(signers.len());
        for signer in &signers {
            if signer.signature_type() != SignatureType::Ecdsa {
                return Err(DelegationError::InvalidInput {
                    attribute: "signers",
                    message: format!(
                        "{} signs with {:?}, multisig members must be ECDSA signers",
                        signer.address(),
                        signer.signature_type()
                    ),
                });
            }
            if !seen.insert(signer.address()) {
                return Err(DelegationError::InvalidInput {
                    attribute: "signers",
                    message: format!("{} is registered more than once", signer.address()),
                });
            }
        }
        Ok(Self { account, signers })
    }

    /// Registered key addresses, in registration order.
    #[must_use]
    pub fn signer_addresses(&self) -> Vec<Address> {
        self.signers.iter().map(|signer| signer.address()).collect()
    }
}

#[async_trait]
impl DelegatorSigner for MultiSigner {
    fn address(&self) -> Address {
        self.account
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes, DelegationError> {
        crate::debug!(
            "Collecting {} signatures for multisig {}",
            self.signers.len(),
            self.account
        );
        let mut partials = Vec::with_capacity(self.signers.len());
        for signer in &self.signers {
            partials.push(PartialSignature {
                signer: signer.address(),
                signature: signer.sign_hash(hash).await?,
                signature_type: signer.signature_type(),
            });
        }
        aggregate_signature(&partials)
    }

    fn stub_signature(&self) -> Bytes {
        self.signers
            .iter()
            .flat_map(|signer| signer.stub_signature().to_vec())
            .collect::<Vec<u8>>()
            .into()
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, b256};
    use alloy::signers::local::PrivateKeySigner;

    use super::*;
    use crate::signer::KeySigner;

    const ACCOUNT: Address = address!("0x00000000000000000000000000000000000000cc");
    const HASH: B256 = b256!("0x3333333333333333333333333333333333333333333333333333333333333333");

    fn keys() -> (PrivateKeySigner, PrivateKeySigner) {
        (
            PrivateKeySigner::from_slice(&[1u8; 32]).unwrap(),
            PrivateKeySigner::from_slice(&[2u8; 32]).unwrap(),
        )
    }

    fn multisig(first: &PrivateKeySigner, second: &PrivateKeySigner) -> MultiSigner {
        multisig_result(first, second).unwrap()
    }

    #[tokio::test]
    async fn test_signs_in_registration_order() {
        let (a, b) = keys();
        let ab = multisig(&a, &b).sign_hash(HASH).await.unwrap();
        let ba = multisig(&b, &a).sign_hash(HASH).await.unwrap();

        assert_eq!(ab.len(), 130);
        assert_ne!(ab, ba);
        assert_eq!(&ab[..65], &ba[65..]);
        assert_eq!(ab, multisig(&a, &b).sign_hash(HASH).await.unwrap());
    }

    #[test]
    fn test_rejects_invalid_registrations() {
        let (a, _) = keys();
        assert!(MultiSigner::new(ACCOUNT, Vec::new()).is_err());
        assert!(multisig_result(&a, &a).is_err());
    }

    fn multisig_result(
        first: &PrivateKeySigner,
        second: &PrivateKeySigner,
    ) -> Result<MultiSigner, DelegationError> {
        MultiSigner::new(
            ACCOUNT,
            vec![
                Box::new(KeySigner::new(first.clone())),
                Box::new(KeySigner::new(second.clone())),
            ],
        )
    }

    struct PasskeyMember;

    #[async_trait]
    impl DelegatorSigner for PasskeyMember {
        fn address(&self) -> Address {
            address!("0x00000000000000000000000000000000000000dd")
        }

        fn signature_type(&self) -> SignatureType {
            SignatureType::WebAuthn
        }

        async fn sign_hash(&self, _hash: B256) -> Result<Bytes, DelegationError> {
            Ok(Bytes::new())
        }
    }

    #[test]
    fn test_rejects_webauthn_members_by_name() {
        let (a, _) = keys();
        let members: Vec<Box<dyn DelegatorSigner>> =
            vec![Box::new(KeySigner::new(a)), Box::new(PasskeyMember)];
        let err = MultiSigner::new(ACCOUNT, members).err().unwrap();
        match err {
            DelegationError::InvalidInput { attribute, message } => {
                assert_eq!(attribute, "signers");
                assert!(message.contains("WebAuthn"), "{message}");
                assert!(message.contains("ECDSA"), "{message}");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_account_and_stub() {
        let (a, b) = keys();
        let signer = multisig(&a, &b);
        assert_eq!(signer.address(), ACCOUNT);
        assert_eq!(signer.signer_addresses(), vec![a.address(), b.address()]);
        assert_eq!(signer.stub_signature().len(), 130);
    }
}
