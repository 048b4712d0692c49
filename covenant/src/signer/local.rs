use std::str::FromStr;

use alloy::primitives::{Address, Bytes, B256};
use alloy::signers::{local::PrivateKeySigner, Signer, SignerSync};
use async_trait::async_trait;

use super::DelegatorSigner;
use crate::delegation::DelegationError;

/// Signs with a secp256k1 key held in memory.
#[derive(Debug, Clone)]
pub struct KeySigner(PrivateKeySigner);

impl KeySigner {
    /// Wraps an existing key.
    #[must_use]
    pub const fn new(signer: PrivateKeySigner) -> Self {
        Self(signer)
    }

    /// Parses a hex-encoded private key, with or without `0x`.
    ///
    /// # Errors
    /// - `DelegationError::InvalidInput` if the key is not 32 bytes of hex or not a valid scalar.
    pub fn from_private_key(private_key: &str) -> Result<Self, DelegationError> {
        PrivateKeySigner::from_str(private_key)
            .map(Self)
            .map_err(|e| DelegationError::InvalidInput {
                attribute: "private_key",
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl DelegatorSigner for KeySigner {
    fn address(&self) -> Address {
        self.0.address()
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes, DelegationError> {
        let signature = self
            .0
            .sign_hash_sync(&hash)
            .map_err(|e| DelegationError::Signing {
                message: e.to_string(),
            })?;
        Ok(signature.as_bytes().to_vec().into())
    }
}

/// Adapts any alloy [`Signer`] (remote wallets, hardware keys) to a delegator signer.
///
/// Failures of the wallet are reported as `SignerUnavailable`.
pub struct WalletSigner<S> {
    inner: S,
}

impl<S> WalletSigner<S> {
    /// Wraps `inner`.
    pub const fn new(inner: S) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<S> DelegatorSigner for WalletSigner<S>
where
    S: Signer + Send + Sync,
{
    fn address(&self) -> Address {
        self.inner.address()
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes, DelegationError> {
        let signature =
            self.inner
                .sign_hash(&hash)
                .await
                .map_err(|e| DelegationError::SignerUnavailable {
                    message: e.to_string(),
                })?;
        Ok(signature.as_bytes().to_vec().into())
    }
}
