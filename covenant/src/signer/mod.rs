use std::collections::HashSet;

use alloy::dyn_abi::TypedData;
use alloy::primitives::{eip191_hash_message, Address, Bytes, B256};
use alloy::signers::Signature;
use async_trait::async_trait;

use crate::delegation::DelegationError;

mod local;
mod multisig;
mod webauthn;

pub use local::{KeySigner, WalletSigner};
pub use multisig::MultiSigner;
pub use webauthn::{WebAuthnAssertion, WebAuthnAuthenticator, WebAuthnSigner};

/// Signature scheme of a signer backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum SignatureType {
    /// secp256k1 ECDSA, 65 bytes `r ∥ s ∥ v`.
    Ecdsa,
    /// P-256 assertion from a passkey, ABI-encoded.
    WebAuthn,
}

/// Produces delegator signatures.
///
/// Only [`Self::sign_hash`] is required. Implementations may suspend (hardware
/// prompts, remote wallets); callers await each request exactly once.
#[async_trait]
pub trait DelegatorSigner: Send + Sync {
    /// Address of the key, or of the account for aggregating signers.
    fn address(&self) -> Address;

    /// Scheme of the produced signatures.
    fn signature_type(&self) -> SignatureType {
        SignatureType::Ecdsa
    }

    /// Signs a 32 byte digest.
    ///
    /// # Errors
    /// - `DelegationError::SignerUnavailable` if the backend cannot be reached.
    /// - `DelegationError::Signing` if the backend fails to sign.
    async fn sign_hash(&self, hash: B256) -> Result<Bytes, DelegationError>;

    /// Signs an EIP-191 `personal_sign` message.
    ///
    /// # Errors
    /// See [`Self::sign_hash`].
    async fn sign_message(&self, message: &[u8]) -> Result<Bytes, DelegationError> {
        self.sign_hash(eip191_hash_message(message)).await
    }

    /// Signs EIP-712 typed data.
    ///
    /// # Errors
    /// - `DelegationError::Encoding` if the typed data cannot be hashed.
    /// - See [`Self::sign_hash`].
    async fn sign_typed_data(&self, typed_data: &TypedData) -> Result<Bytes, DelegationError> {
        let hash = typed_data
            .eip712_signing_hash()
            .map_err(|e| DelegationError::Encoding {
                message: e.to_string(),
            })?;
        self.sign_hash(hash).await
    }

    /// A signature of the right shape for gas estimation. It never validates.
    fn stub_signature(&self) -> Bytes {
        ecdsa_stub_signature()
    }
}

/// 65 byte ECDSA-shaped placeholder.
#[must_use]
pub fn ecdsa_stub_signature() -> Bytes {
    let mut stub = vec![0xff; 64];
    stub.push(0x1b);
    stub.into()
}

/// One signer's contribution to an aggregated signature.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialSignature {
    /// The signing key.
    pub signer: Address,
    /// Raw signature as returned by the signer.
    pub signature: Bytes,
    /// Scheme of `signature`.
    pub signature_type: SignatureType,
}

/// Concatenates ECDSA signatures in the given order, which must be the order the
/// signers are registered in the multisig account.
///
/// Each signature is normalised to 65 bytes with `v` in `{27, 28}`.
///
/// # Errors
/// - `DelegationError::InvalidInput` if the list is empty, contains a non-ECDSA
///   signature or repeats a signer.
/// - `DelegationError::InvalidSignature` if a signature is not 65 bytes or has an invalid `v`.
pub fn aggregate_signature(signatures: &[PartialSignature]) -> Result<Bytes, DelegationError> {
    if signatures.is_empty() {
        return Err(DelegationError::InvalidInput {
            attribute: "signatures",
            message: "at least one signature is required".to_string(),
        });
    }

    let mut seen = HashSet::with_capacity(signatures.len());
    let mut aggregated = Vec::with_capacity(signatures.len() * 65);
    for partial in signatures {
        if partial.signature_type != SignatureType::Ecdsa {
            return Err(DelegationError::InvalidInput {
                attribute: "signatures",
                message: format!("signature of {} is not an ECDSA signature", partial.signer),
            });
        }
        if !seen.insert(partial.signer) {
            return Err(DelegationError::InvalidInput {
                attribute: "signatures",
                message: format!("{} signed more than once", partial.signer),
            });
        }
        aggregated.extend_from_slice(&canonical_ecdsa(&partial.signature)?);
    }
    Ok(aggregated.into())
}

fn canonical_ecdsa(raw: &[u8]) -> Result<[u8; 65], DelegationError> {
    if raw.len() != 65 {
        return Err(DelegationError::InvalidSignature {
            message: format!("expected 65 bytes, got {}", raw.len()),
        });
    }
    let signature = Signature::from_raw(raw).map_err(|e| DelegationError::InvalidSignature {
        message: e.to_string(),
    })?;
    Ok(signature.as_bytes())
}
