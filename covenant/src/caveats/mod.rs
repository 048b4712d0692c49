use std::fmt::Display;

use alloy::primitives::{Address, Bytes};
use serde::{Deserialize, Serialize};

use crate::primitives::{HexEncodedData, PrimitiveError};

mod builder;
mod scope;
/// Reads of per-delegation enforcer state through an external contract reader.
pub mod state;
/// Term encoders and decoders, one per caveat kind.
pub mod terms;

pub use builder::CaveatBuilder;
pub use scope::{create_caveat_builder_from_scope, resolve_scope, CalldataGuard, Scope};
pub use terms::*;

/// Largest accepted unix timestamp in seconds (`9999-12-31T23:59:59Z`).
///
/// Millisecond timestamps are larger than this and get rejected.
pub const MAX_TIMESTAMP: u64 = 253_402_300_799;

/// Every caveat kind with a deployed enforcer contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, uniffi::Enum)]
#[serde(rename_all = "camelCase")]
pub enum CaveatKind {
    /// Calldata must contain the expected bytes at an offset.
    AllowedCalldata,
    /// Calldata must start with one of a set of selectors.
    AllowedMethods,
    /// Execution target must be one of a set of addresses.
    AllowedTargets,
    /// Redemption args must equal the terms.
    ArgsEqualityCheck,
    /// Redemption must happen within a block number window.
    BlockNumber,
    /// Deploys a contract before execution if it is missing.
    Deployed,
    /// ERC-20 balance of a recipient must change by at least an amount.
    Erc20BalanceChange,
    /// Caps the total ERC-20 amount transferred.
    Erc20TransferAmount,
    /// ERC-20 allowance that resets every period.
    Erc20PeriodTransfer,
    /// ERC-20 allowance that unlocks linearly over time.
    Erc20Streaming,
    /// ERC-721 balance of a recipient must change by at least an amount.
    Erc721BalanceChange,
    /// Permits transferring one specific ERC-721 token.
    Erc721Transfer,
    /// ERC-1155 balance of a recipient must change by at least an amount.
    Erc1155BalanceChange,
    /// Calldata of every execution in a batch must match exactly.
    ExactCalldataBatch,
    /// Calldata must match exactly.
    ExactCalldata,
    /// Every execution in a batch must match exactly.
    ExactExecutionBatch,
    /// The execution must match exactly.
    ExactExecution,
    /// One-time id shared by a group of delegations.
    Id,
    /// Caps the number of redemptions.
    LimitedCalls,
    /// Periodic allowances over several tokens.
    MultiTokenPeriod,
    /// Native balance of a recipient must change by at least an amount.
    NativeBalanceChange,
    /// Requires a native token payment to a recipient on redemption.
    NativeTokenPayment,
    /// Native token allowance that resets every period.
    NativeTokenPeriodTransfer,
    /// Native token allowance that unlocks linearly over time.
    NativeTokenStreaming,
    /// Caps the total native token amount transferred.
    NativeTokenTransferAmount,
    /// Bulk revocation through the delegator's nonce.
    Nonce,
    /// Permits transferring ownership of one contract.
    OwnershipTransfer,
    /// Restricts who can redeem.
    Redeemer,
    /// A fixed ERC-20 transfer followed by a fixed call.
    SpecificActionErc20TransferBatch,
    /// Redemption must happen within a time window.
    Timestamp,
    /// Caps the native value of an execution.
    ValueLte,
}

impl CaveatKind {
    /// All caveat kinds, in enforcer name order.
    pub const ALL: [Self; 31] = [
        Self::AllowedCalldata,
        Self::AllowedMethods,
        Self::AllowedTargets,
        Self::ArgsEqualityCheck,
        Self::BlockNumber,
        Self::Deployed,
        Self::Erc20BalanceChange,
        Self::Erc20TransferAmount,
        Self::Erc20PeriodTransfer,
        Self::Erc20Streaming,
        Self::Erc721BalanceChange,
        Self::Erc721Transfer,
        Self::Erc1155BalanceChange,
        Self::ExactCalldataBatch,
        Self::ExactCalldata,
        Self::ExactExecutionBatch,
        Self::ExactExecution,
        Self::Id,
        Self::LimitedCalls,
        Self::MultiTokenPeriod,
        Self::NativeBalanceChange,
        Self::NativeTokenPayment,
        Self::NativeTokenPeriodTransfer,
        Self::NativeTokenStreaming,
        Self::NativeTokenTransferAmount,
        Self::Nonce,
        Self::OwnershipTransfer,
        Self::Redeemer,
        Self::SpecificActionErc20TransferBatch,
        Self::Timestamp,
        Self::ValueLte,
    ];

    /// Name of the enforcer contract, as used in its revert strings (`<EnforcerName>:<reason>`).
    #[must_use]
    pub const fn enforcer_name(self) -> &'static str {
        match self {
            Self::AllowedCalldata => "AllowedCalldataEnforcer",
            Self::AllowedMethods => "AllowedMethodsEnforcer",
            Self::AllowedTargets => "AllowedTargetsEnforcer",
            Self::ArgsEqualityCheck => "ArgsEqualityCheckEnforcer",
            Self::BlockNumber => "BlockNumberEnforcer",
            Self::Deployed => "DeployedEnforcer",
            Self::Erc20BalanceChange => "ERC20BalanceChangeEnforcer",
            Self::Erc20TransferAmount => "ERC20TransferAmountEnforcer",
            Self::Erc20PeriodTransfer => "ERC20PeriodTransferEnforcer",
            Self::Erc20Streaming => "ERC20StreamingEnforcer",
            Self::Erc721BalanceChange => "ERC721BalanceChangeEnforcer",
            Self::Erc721Transfer => "ERC721TransferEnforcer",
            Self::Erc1155BalanceChange => "ERC1155BalanceChangeEnforcer",
            Self::ExactCalldataBatch => "ExactCalldataBatchEnforcer",
            Self::ExactCalldata => "ExactCalldataEnforcer",
            Self::ExactExecutionBatch => "ExactExecutionBatchEnforcer",
            Self::ExactExecution => "ExactExecutionEnforcer",
            Self::Id => "IdEnforcer",
            Self::LimitedCalls => "LimitedCallsEnforcer",
            Self::MultiTokenPeriod => "MultiTokenPeriodEnforcer",
            Self::NativeBalanceChange => "NativeBalanceChangeEnforcer",
            Self::NativeTokenPayment => "NativeTokenPaymentEnforcer",
            Self::NativeTokenPeriodTransfer => "NativeTokenPeriodTransferEnforcer",
            Self::NativeTokenStreaming => "NativeTokenStreamingEnforcer",
            Self::NativeTokenTransferAmount => "NativeTokenTransferAmountEnforcer",
            Self::Nonce => "NonceEnforcer",
            Self::OwnershipTransfer => "OwnershipTransferEnforcer",
            Self::Redeemer => "RedeemerEnforcer",
            Self::SpecificActionErc20TransferBatch => "SpecificActionERC20TransferBatchEnforcer",
            Self::Timestamp => "TimestampEnforcer",
            Self::ValueLte => "ValueLteEnforcer",
        }
    }

    /// Composable kinds can appear several times in one delegation, because each
    /// occurrence checks an independent property of the same execution.
    #[must_use]
    pub const fn is_composable(self) -> bool {
        matches!(
            self,
            Self::AllowedCalldata
                | Self::NativeBalanceChange
                | Self::Erc20BalanceChange
                | Self::Erc721BalanceChange
                | Self::Erc1155BalanceChange
        )
    }
}

impl Display for CaveatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.enforcer_name())
    }
}

/// A single restriction attached to a delegation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caveat {
    /// Enforcer contract that decodes `terms` at redemption.
    pub enforcer: Address,
    /// Kind-specific encoded restriction.
    pub terms: Bytes,
    /// Redemption-time data supplied by the redeemer. Almost always empty.
    pub args: Bytes,
}

/// Errors raised while encoding, decoding or composing caveats.
#[crate::covenant_error]
pub enum CaveatError {
    /// A field of the caveat parameters is out of range or malformed.
    #[error("invalid {kind} terms, {field}: {message}")]
    InvalidTerms {
        /// The caveat kind being encoded.
        kind: CaveatKind,
        /// The offending field.
        field: &'static str,
        /// Why the field was rejected.
        message: String,
    },
    /// Decode was called on bytes of the wrong width.
    #[error("{kind} terms must be {expected} bytes, got {actual}")]
    TermsLengthMismatch {
        /// The caveat kind being decoded.
        kind: CaveatKind,
        /// Description of the accepted width.
        expected: String,
        /// The length of the provided terms.
        actual: usize,
    },
    /// The environment has no deployed enforcer for the kind.
    #[error("no {kind} deployed on chain {chain_id} for framework version {version}")]
    UnknownEnforcer {
        /// The caveat kind without deployment.
        kind: CaveatKind,
        /// The chain of the environment.
        chain_id: u64,
        /// The framework version of the environment.
        version: String,
    },
    /// A raw caveat names an enforcer that is not part of the environment.
    #[error("enforcer {enforcer} is not a known enforcer of this environment")]
    UnrecognizedEnforcer {
        /// The unknown enforcer address.
        enforcer: Address,
    },
    /// A non-composable enforcer was added twice.
    #[error("{kind} was already added and cannot be repeated")]
    DuplicateEnforcer {
        /// The repeated caveat kind.
        kind: CaveatKind,
    },
    /// `build()` was called without any caveat.
    #[error("no caveats found, a delegation without caveats grants unrestricted access")]
    EmptyCaveats,
    /// A primitive encoding failure.
    #[error(transparent)]
    Primitive(#[from] PrimitiveError),
}

impl CaveatError {
    pub(crate) fn invalid(kind: CaveatKind, field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidTerms {
            kind,
            field,
            message: message.into(),
        }
    }

    /// Maps a packing failure to an `InvalidTerms` error naming the field.
    pub(crate) fn field(kind: CaveatKind, field: &'static str) -> impl FnOnce(PrimitiveError) -> Self {
        move |err| Self::invalid(kind, field, err.to_string())
    }
}

/// Encoder/decoder pair for one caveat kind.
///
/// `decode_terms(encode_terms(x)) == x` for every `x` that encodes successfully.
pub trait TermsCodec: Sized {
    /// The kind whose enforcer decodes these terms.
    const KIND: CaveatKind;

    /// Validates the parameters and packs them into the enforcer's layout.
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` naming the first invalid field.
    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError>;

    /// Unpacks terms produced by [`Self::encode_terms`].
    ///
    /// # Errors
    /// - `CaveatError::TermsLengthMismatch` if the total length is wrong for the kind.
    /// - `CaveatError::InvalidTerms` if a decoded field is out of range.
    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError>;

    /// Hex form of [`Self::encode_terms`].
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` naming the first invalid field.
    fn encode_terms_hex(&self) -> Result<HexEncodedData, CaveatError> {
        self.encode_terms().map(HexEncodedData::from_bytes)
    }
}

pub(crate) fn expect_len(kind: CaveatKind, terms: &[u8], expected: usize) -> Result<(), CaveatError> {
    if terms.len() == expected {
        return Ok(());
    }
    Err(CaveatError::TermsLengthMismatch {
        kind,
        expected: expected.to_string(),
        actual: terms.len(),
    })
}

pub(crate) fn expect_min_len(kind: CaveatKind, terms: &[u8], min: usize) -> Result<(), CaveatError> {
    if terms.len() >= min {
        return Ok(());
    }
    Err(CaveatError::TermsLengthMismatch {
        kind,
        expected: format!("at least {min}"),
        actual: terms.len(),
    })
}

pub(crate) fn expect_multiple_of(kind: CaveatKind, terms: &[u8], chunk: usize) -> Result<(), CaveatError> {
    if !terms.is_empty() && terms.len() % chunk == 0 {
        return Ok(());
    }
    Err(CaveatError::TermsLengthMismatch {
        kind,
        expected: format!("a non-zero multiple of {chunk}"),
        actual: terms.len(),
    })
}

macro_rules! caveat_terms {
    ($($(#[$doc:meta])* $variant:ident($terms:ty)),+ $(,)?) => {
        /// Parameters of any caveat kind, tagged by kind.
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(tag = "type", rename_all = "camelCase")]
        pub enum CaveatTerms {
            $($(#[$doc])* $variant($terms),)+
        }

        impl CaveatTerms {
            /// The kind these parameters belong to.
            #[must_use]
            pub const fn kind(&self) -> CaveatKind {
                match self {
                    $(Self::$variant(_) => CaveatKind::$variant,)+
                }
            }

            /// Encodes with the kind's encoder.
            ///
            /// # Errors
            /// - `CaveatError::InvalidTerms` naming the first invalid field.
            pub fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
                match self {
                    $(Self::$variant(terms) => terms.encode_terms(),)+
                }
            }

            /// Decodes `terms` with the decoder of `kind`.
            ///
            /// # Errors
            /// - `CaveatError::TermsLengthMismatch` if the length is wrong for `kind`.
            pub fn decode(kind: CaveatKind, terms: &[u8]) -> Result<Self, CaveatError> {
                match kind {
                    $(CaveatKind::$variant => <$terms as TermsCodec>::decode_terms(terms).map(Self::$variant),)+
                }
            }
        }

        $(
            impl From<$terms> for CaveatTerms {
                fn from(terms: $terms) -> Self {
                    Self::$variant(terms)
                }
            }
        )+
    };
}

caveat_terms! {
    /// See [`AllowedCalldataTerms`].
    AllowedCalldata(AllowedCalldataTerms),
    /// See [`AllowedMethodsTerms`].
    AllowedMethods(AllowedMethodsTerms),
    /// See [`AllowedTargetsTerms`].
    AllowedTargets(AllowedTargetsTerms),
    /// See [`ArgsEqualityCheckTerms`].
    ArgsEqualityCheck(ArgsEqualityCheckTerms),
    /// See [`BlockNumberTerms`].
    BlockNumber(BlockNumberTerms),
    /// See [`DeployedTerms`].
    Deployed(DeployedTerms),
    /// See [`Erc20BalanceChangeTerms`].
    Erc20BalanceChange(Erc20BalanceChangeTerms),
    /// See [`Erc20TransferAmountTerms`].
    Erc20TransferAmount(Erc20TransferAmountTerms),
    /// See [`Erc20PeriodTransferTerms`].
    Erc20PeriodTransfer(Erc20PeriodTransferTerms),
    /// See [`Erc20StreamingTerms`].
    Erc20Streaming(Erc20StreamingTerms),
    /// See [`Erc721BalanceChangeTerms`].
    Erc721BalanceChange(Erc721BalanceChangeTerms),
    /// See [`Erc721TransferTerms`].
    Erc721Transfer(Erc721TransferTerms),
    /// See [`Erc1155BalanceChangeTerms`].
    Erc1155BalanceChange(Erc1155BalanceChangeTerms),
    /// See [`ExactCalldataBatchTerms`].
    ExactCalldataBatch(ExactCalldataBatchTerms),
    /// See [`ExactCalldataTerms`].
    ExactCalldata(ExactCalldataTerms),
    /// See [`ExactExecutionBatchTerms`].
    ExactExecutionBatch(ExactExecutionBatchTerms),
    /// See [`ExactExecutionTerms`].
    ExactExecution(ExactExecutionTerms),
    /// See [`IdTerms`].
    Id(IdTerms),
    /// See [`LimitedCallsTerms`].
    LimitedCalls(LimitedCallsTerms),
    /// See [`MultiTokenPeriodTerms`].
    MultiTokenPeriod(MultiTokenPeriodTerms),
    /// See [`NativeBalanceChangeTerms`].
    NativeBalanceChange(NativeBalanceChangeTerms),
    /// See [`NativeTokenPaymentTerms`].
    NativeTokenPayment(NativeTokenPaymentTerms),
    /// See [`NativeTokenPeriodTransferTerms`].
    NativeTokenPeriodTransfer(NativeTokenPeriodTransferTerms),
    /// See [`NativeTokenStreamingTerms`].
    NativeTokenStreaming(NativeTokenStreamingTerms),
    /// See [`NativeTokenTransferAmountTerms`].
    NativeTokenTransferAmount(NativeTokenTransferAmountTerms),
    /// See [`NonceTerms`].
    Nonce(NonceTerms),
    /// See [`OwnershipTransferTerms`].
    OwnershipTransfer(OwnershipTransferTerms),
    /// See [`RedeemerTerms`].
    Redeemer(RedeemerTerms),
    /// See [`SpecificActionErc20TransferBatchTerms`].
    SpecificActionErc20TransferBatch(SpecificActionErc20TransferBatchTerms),
    /// See [`TimestampTerms`].
    Timestamp(TimestampTerms),
    /// See [`ValueLteTerms`].
    ValueLte(ValueLteTerms),
}
