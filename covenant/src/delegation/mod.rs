use alloy::dyn_abi::TypedData;
use alloy::primitives::{address, Address, Bytes, B256};
use alloy::signers::Signature;
use serde::{Deserialize, Serialize};

use crate::caveats::{create_caveat_builder_from_scope, Caveat, CaveatError, Scope};
use crate::environment::{DeleGatorEnvironment, EnvironmentError};
use crate::primitives::config::CaveatBuilderConfig;
use crate::primitives::PrimitiveError;
use crate::signer::DelegatorSigner;

mod abi;
mod eip712;

pub use abi::{decode_delegations, encode_delegations};
pub use eip712::{delegation_domain, DOMAIN_NAME, DOMAIN_VERSION};

/// Authority of a delegation that is not derived from another delegation.
pub const ROOT_AUTHORITY: B256 = B256::repeat_byte(0xff);

/// Delegate of an open delegation. Anyone can redeem it.
pub const ANY_BENEFICIARY: Address = address!("0x0000000000000000000000000000000000000a11");

/// Errors raised while assembling, signing or encoding delegations.
#[crate::covenant_error]
pub enum DelegationError {
    /// The signer backend could not produce a signature (key unavailable, prompt dismissed, wallet unreachable).
    #[error("signer unavailable: {message}")]
    SignerUnavailable {
        /// Reason reported by the backend.
        message: String,
    },
    /// The signer was reachable but signing failed.
    #[error("failed to sign: {message}")]
    Signing {
        /// Underlying failure.
        message: String,
    },
    /// A signature is malformed or does not recover to a signer.
    #[error("invalid signature: {message}")]
    InvalidSignature {
        /// Why the signature was rejected.
        message: String,
    },
    /// A provided input is invalid.
    #[error("invalid input on {attribute}: {message}")]
    InvalidInput {
        /// The name of the attribute that was invalid.
        attribute: &'static str,
        /// Explicit failure message for the attribute validation.
        message: String,
    },
    /// ABI or typed-data encoding failed.
    #[error("encoding error: {message}")]
    Encoding {
        /// Underlying failure.
        message: String,
    },
    /// Caveat composition failed.
    #[error(transparent)]
    Caveat(#[from] CaveatError),
    /// The environment could not be resolved.
    #[error(transparent)]
    Environment(#[from] EnvironmentError),
    /// A primitive parsing failure.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

/// Where a delegation's authority comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Authority {
    /// The delegator grants from its own account.
    #[default]
    Root,
    /// Re-delegates a subset of the permission granted by the delegation with this hash.
    Parent(B256),
}

impl Authority {
    /// The on-chain `authority` field.
    #[must_use]
    pub const fn to_b256(self) -> B256 {
        match self {
            Self::Root => ROOT_AUTHORITY,
            Self::Parent(hash) => hash,
        }
    }
}

impl From<B256> for Authority {
    fn from(value: B256) -> Self {
        if value == ROOT_AUTHORITY {
            Self::Root
        } else {
            Self::Parent(value)
        }
    }
}

impl From<&Delegation> for Authority {
    fn from(parent: &Delegation) -> Self {
        Self::Parent(parent.hash())
    }
}

/// A delegation that still has to be signed by its delegator.
///
/// Fields are public until signing; [`UnsignedDelegation::sign`] consumes the
/// record so a signed delegation can never be mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsignedDelegation {
    /// Account allowed to redeem.
    pub delegate: Address,
    /// Account granting the permission.
    pub delegator: Address,
    /// [`ROOT_AUTHORITY`] or the hash of the parent delegation.
    pub authority: B256,
    /// Restrictions, evaluated in order at redemption.
    pub caveats: Vec<Caveat>,
    /// Distinguishes otherwise identical delegations. Zero unless set.
    pub salt: B256,
}

impl UnsignedDelegation {
    /// Replaces the salt.
    #[must_use]
    pub const fn with_salt(mut self, salt: B256) -> Self {
        self.salt = salt;
        self
    }

    /// EIP-712 struct hash, equal to `DelegationManager.getDelegationHash`.
    #[must_use]
    pub fn hash(&self) -> B256 {
        eip712::struct_hash(&self.typed())
    }

    /// The digest the delegator signs for `environment`.
    #[must_use]
    pub fn signing_hash(&self, environment: &DeleGatorEnvironment) -> B256 {
        eip712::signing_hash(&self.typed(), &domain_of(environment))
    }

    /// The delegation as an EIP-712 typed data document.
    #[must_use]
    pub fn typed_data(&self, environment: &DeleGatorEnvironment) -> TypedData {
        eip712::typed_data(&self.typed(), domain_of(environment))
    }

    /// Signs the delegation for the delegation manager of `environment`.
    ///
    /// The signer is asked exactly once; there is no retry.
    ///
    /// # Errors
    /// - `DelegationError::SignerUnavailable` or `DelegationError::Signing` as reported by the signer.
    pub async fn sign<S>(
        self,
        signer: &S,
        environment: &DeleGatorEnvironment,
    ) -> Result<Delegation, DelegationError>
    where
        S: DelegatorSigner + ?Sized,
    {
        let typed_data = self.typed_data(environment);
        crate::debug!(
            "Requesting signature from {} for delegation on chain {}",
            signer.address(),
            environment.chain_id
        );
        let signature = signer.sign_typed_data(&typed_data).await?;
        Ok(self.with_signature(signature))
    }

    /// Attaches a signature produced elsewhere.
    #[must_use]
    pub fn with_signature(self, signature: Bytes) -> Delegation {
        Delegation {
            delegate: self.delegate,
            delegator: self.delegator,
            authority: self.authority,
            caveats: self.caveats,
            salt: self.salt,
            signature,
        }
    }

    fn typed(&self) -> eip712::TypedDelegation {
        eip712::typed_delegation(
            self.delegate,
            self.delegator,
            self.authority,
            &self.caveats,
            self.salt,
        )
    }
}

/// A signed delegation. Immutable; build a new one to change anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delegation {
    delegate: Address,
    delegator: Address,
    authority: B256,
    caveats: Vec<Caveat>,
    salt: B256,
    signature: Bytes,
}

impl Delegation {
    /// Account allowed to redeem.
    #[must_use]
    pub const fn delegate(&self) -> Address {
        self.delegate
    }

    /// Account granting the permission.
    #[must_use]
    pub const fn delegator(&self) -> Address {
        self.delegator
    }

    /// Authority field.
    #[must_use]
    pub const fn authority(&self) -> B256 {
        self.authority
    }

    /// Caveats in evaluation order.
    #[must_use]
    pub fn caveats(&self) -> &[Caveat] {
        &self.caveats
    }

    /// Salt.
    #[must_use]
    pub const fn salt(&self) -> B256 {
        self.salt
    }

    /// Delegator signature over the EIP-712 digest.
    #[must_use]
    pub const fn signature(&self) -> &Bytes {
        &self.signature
    }

    /// Whether anyone may redeem this delegation.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.delegate == ANY_BENEFICIARY
    }

    /// EIP-712 struct hash, used as the `authority` of child delegations.
    #[must_use]
    pub fn hash(&self) -> B256 {
        hash_delegation(self)
    }

    /// Recovers the EOA that produced an ECDSA signature for `environment`.
    ///
    /// Smart account signatures (WebAuthn, aggregated multisig) are validated on-chain instead.
    ///
    /// # Errors
    /// - `DelegationError::InvalidSignature` if the signature is not a recoverable 65 byte ECDSA signature.
    pub fn recover_signer(&self, environment: &DeleGatorEnvironment) -> Result<Address, DelegationError> {
        if self.signature.len() != 65 {
            return Err(DelegationError::InvalidSignature {
                message: format!("expected 65 bytes, got {}", self.signature.len()),
            });
        }
        let signature = Signature::from_raw(&self.signature).map_err(|e| {
            DelegationError::InvalidSignature {
                message: e.to_string(),
            }
        })?;
        let digest = eip712::signing_hash(&self.typed(), &domain_of(environment));
        signature
            .recover_address_from_prehash(&digest)
            .map_err(|e| DelegationError::InvalidSignature {
                message: e.to_string(),
            })
    }

    fn typed(&self) -> eip712::TypedDelegation {
        eip712::typed_delegation(
            self.delegate,
            self.delegator,
            self.authority,
            &self.caveats,
            self.salt,
        )
    }
}

fn domain_of(environment: &DeleGatorEnvironment) -> alloy::sol_types::Eip712Domain {
    delegation_domain(environment.chain_id, environment.delegation_manager)
}

/// Builds an unsigned delegation with a zero salt.
#[must_use]
pub fn create_delegation(
    delegator: Address,
    delegate: Address,
    authority: Authority,
    caveats: Vec<Caveat>,
) -> UnsignedDelegation {
    UnsignedDelegation {
        delegate,
        delegator,
        authority: authority.to_b256(),
        caveats,
        salt: B256::ZERO,
    }
}

/// Builds an unsigned delegation that any account can redeem.
#[must_use]
pub fn create_open_delegation(
    delegator: Address,
    authority: Authority,
    caveats: Vec<Caveat>,
) -> UnsignedDelegation {
    create_delegation(delegator, ANY_BENEFICIARY, authority, caveats)
}

/// Builds an unsigned delegation whose caveats come from `scope`, followed by `additional` caveats.
///
/// # Errors
/// - `CaveatError` variants if the scope does not resolve or an additional caveat is
///   unknown to the environment, malformed or a forbidden duplicate.
pub fn create_scoped_delegation(
    environment: &DeleGatorEnvironment,
    scope: &Scope,
    delegator: Address,
    delegate: Address,
    authority: Authority,
    additional: Vec<Caveat>,
) -> Result<UnsignedDelegation, DelegationError> {
    let builder =
        create_caveat_builder_from_scope(environment, scope, CaveatBuilderConfig::default())?;
    let caveats = additional
        .into_iter()
        .try_fold(builder, crate::caveats::CaveatBuilder::add_raw_caveat)?
        .build()?;

    crate::debug!(
        "Created {} delegation from {delegator} to {delegate} with {} caveats",
        scope.name(),
        caveats.len()
    );
    Ok(create_delegation(delegator, delegate, authority, caveats))
}

/// EIP-712 struct hash of a signed delegation.
#[must_use]
pub fn hash_delegation(delegation: &Delegation) -> B256 {
    eip712::struct_hash(&delegation.typed())
}

/// EIP-712 typed data of an unsigned delegation, for wallets that sign JSON payloads.
#[must_use]
pub fn delegation_typed_data(
    delegation: &UnsignedDelegation,
    environment: &DeleGatorEnvironment,
) -> TypedData {
    delegation.typed_data(environment)
}

/// A uniformly random salt, for delegations that must not be linkable to each other.
#[must_use]
pub fn random_salt() -> B256 {
    B256::from(rand::random::<[u8; 32]>())
}
