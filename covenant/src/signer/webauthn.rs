//! Passkey signatures for hybrid delegator accounts.
//!
//! The assertion itself comes from the platform authenticator; this module only
//! shapes it into the tuple the account's P-256 verifier expects.
//!
//! Reference: <https://github.com/MetaMask/delegation-framework/blob/main/src/libraries/WebAuthn.sol>

use alloy::primitives::{keccak256, uint, Address, Bytes, B256};
use alloy::sol_types::SolValue;
use async_trait::async_trait;
use ruint::aliases::U256;

use super::{DelegatorSigner, SignatureType};
use crate::delegation::DelegationError;

/// Order of the P-256 group.
const P256_N: U256 =
    uint!(0xFFFFFFFF00000000FFFFFFFFFFFFFFFFBCE6FAADA7179E84F3B9CAC2FC632551_U256);

const CHALLENGE_MARKER: &str = "\"challenge\":\"";
const RESPONSE_TYPE: &str = "\"type\":\"webauthn.get\"";

/// Flags byte offset within authenticator data, after the 32 byte RP id hash.
const FLAGS_OFFSET: usize = 32;
/// Authenticator data is at least the RP id hash, the flags byte and the sign counter.
const MIN_AUTHENTICATOR_DATA: usize = 37;
const USER_VERIFIED: u8 = 0x04;

/// A WebAuthn assertion over a challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebAuthnAssertion {
    /// Raw authenticator data.
    pub authenticator_data: Bytes,
    /// The client data JSON exactly as produced by the platform.
    pub client_data_json: String,
    /// Signature `r`.
    pub r: U256,
    /// Signature `s`, not necessarily low.
    pub s: U256,
}

/// Platform authenticator producing assertions (a passkey prompt, a security key).
#[async_trait]
pub trait WebAuthnAuthenticator: Send + Sync {
    /// Asks the user to sign `challenge`.
    ///
    /// # Errors
    /// Any failure of the platform, including the user dismissing the prompt.
    async fn get_assertion(&self, challenge: B256) -> anyhow::Result<WebAuthnAssertion>;
}

/// Signs through a passkey registered on a hybrid delegator.
pub struct WebAuthnSigner<A> {
    authenticator: A,
    key_id: String,
    account: Address,
}

impl<A> WebAuthnSigner<A> {
    /// Binds a passkey `key_id` registered on `account`.
    pub const fn new(authenticator: A, key_id: String, account: Address) -> Self {
        Self {
            authenticator,
            key_id,
            account,
        }
    }

    fn encode(&self, assertion: &WebAuthnAssertion) -> Result<Bytes, DelegationError> {
        for (component, value) in [("r", assertion.r), ("s", assertion.s)] {
            if value.is_zero() || value >= P256_N {
                return Err(DelegationError::Signing {
                    message: format!("signature {component} is not in [1, n) of P-256"),
                });
            }
        }

        let flags = assertion
            .authenticator_data
            .get(FLAGS_OFFSET)
            .filter(|_| assertion.authenticator_data.len() >= MIN_AUTHENTICATOR_DATA)
            .ok_or_else(|| DelegationError::Signing {
                message: format!(
                    "authenticator data must be at least {MIN_AUTHENTICATOR_DATA} bytes"
                ),
            })?;

        let (prefix, suffix) = split_client_data(&assertion.client_data_json)?;
        let response_type_location = assertion
            .client_data_json
            .find(RESPONSE_TYPE)
            .ok_or_else(|| DelegationError::Signing {
                message: "client data is not a webauthn.get response".to_string(),
            })?;

        let encoded = (
            keccak256(self.key_id.as_bytes()),
            assertion.r,
            low_s(assertion.s),
            assertion.authenticator_data.clone(),
            flags & USER_VERIFIED != 0,
            prefix.to_string(),
            suffix.to_string(),
            U256::from(response_type_location),
        )
            .abi_encode_params();
        Ok(encoded.into())
    }
}

/// P-256 verifiers only accept `s <= n / 2`. `s` must already be below `n`.
fn low_s(s: U256) -> U256 {
    if s > P256_N >> 1 {
        P256_N - s
    } else {
        s
    }
}

/// Splits the client data around the challenge value, dropping the challenge.
/// The verifier re-inserts the encoded digest between both parts.
fn split_client_data(client_data: &str) -> Result<(&str, &str), DelegationError> {
    let missing = || DelegationError::Signing {
        message: "client data does not contain a challenge".to_string(),
    };
    let start = client_data.find(CHALLENGE_MARKER).ok_or_else(missing)? + CHALLENGE_MARKER.len();
    let end = client_data[start..].find('"').ok_or_else(missing)? + start;
    Ok((&client_data[..start], &client_data[end..]))
}

#[async_trait]
impl<A: WebAuthnAuthenticator> DelegatorSigner for WebAuthnSigner<A> {
    fn address(&self) -> Address {
        self.account
    }

    fn signature_type(&self) -> SignatureType {
        SignatureType::WebAuthn
    }

    async fn sign_hash(&self, hash: B256) -> Result<Bytes, DelegationError> {
        crate::debug!("Requesting passkey assertion for {}", self.account);
        let assertion = self
            .authenticator
            .get_assertion(hash)
            .await
            .map_err(|e| DelegationError::SignerUnavailable {
                message: format!("{e:#}"),
            })?;
        self.encode(&assertion)
    }

    fn stub_signature(&self) -> Bytes {
        let mut authenticator_data = vec![0u8; MIN_AUTHENTICATOR_DATA];
        authenticator_data[FLAGS_OFFSET] = USER_VERIFIED | 0x01;
        let stub = WebAuthnAssertion {
            authenticator_data: authenticator_data.into(),
            client_data_json: format!(
                "{{{RESPONSE_TYPE},{CHALLENGE_MARKER}{}\",\"origin\":\"https://localhost\",\"crossOrigin\":false}}",
                "A".repeat(43)
            ),
            r: P256_N >> 2,
            s: P256_N >> 2,
        };
        self.encode(&stub).unwrap_or_default()
    }
}
