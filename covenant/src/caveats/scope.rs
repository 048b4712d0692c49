use alloy::primitives::Address;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use super::{
    AllowedCalldataTerms, AllowedMethodsTerms, AllowedTargetsTerms, Caveat, CaveatBuilder,
    CaveatError, CaveatKind, Erc20PeriodTransferTerms, Erc20StreamingTerms, Erc20TransferAmountTerms,
    Erc721TransferTerms, ExactCalldataTerms, MethodSelector, NativeTokenPeriodTransferTerms,
    NativeTokenStreamingTerms, NativeTokenTransferAmountTerms, OwnershipTransferTerms,
    PeriodSchedule, StreamingSchedule, ValueLteTerms,
};
use crate::environment::DeleGatorEnvironment;
use crate::primitives::config::CaveatBuilderConfig;

/// Restricts the shape of the calldata a native-token scope can be redeemed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CalldataGuard {
    /// Calldata must match exactly.
    Exact(ExactCalldataTerms),
    /// Calldata must contain each of these at their offsets.
    Allowed(Vec<AllowedCalldataTerms>),
}

impl CalldataGuard {
    /// The guard injected when a native-token scope carries none: no calldata at all,
    /// so the allowance can only be spent on plain value transfers.
    #[must_use]
    pub fn empty_calldata() -> Self {
        Self::Exact(ExactCalldataTerms {
            calldata: alloy::primitives::Bytes::new(),
        })
    }

    /// An `Allowed` guard without entries restricts nothing.
    fn is_empty(&self) -> bool {
        matches!(self, Self::Allowed(allowed) if allowed.is_empty())
    }

    fn apply<'env>(&self, builder: CaveatBuilder<'env>) -> Result<CaveatBuilder<'env>, CaveatError> {
        match self {
            Self::Exact(exact) => builder.add_caveat(exact.clone()),
            Self::Allowed(allowed) if allowed.is_empty() => Err(CaveatError::invalid(
                CaveatKind::AllowedCalldata,
                "calldataGuard",
                "an allowed-calldata guard needs at least one entry",
            )),
            Self::Allowed(allowed) => allowed
                .iter()
                .try_fold(builder, |builder, terms| builder.add_caveat(terms.clone())),
        }
    }
}

/// A named permission intent that expands into a fixed caveat sequence.
///
/// The same scope always resolves to byte-identical caveats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Scope {
    /// Spend at most `max_amount` of the native token in total.
    NativeTokenTransferAmount {
        /// Total allowance in wei.
        max_amount: U256,
        /// Calldata restriction; the empty-calldata guard is used when absent.
        calldata_guard: Option<CalldataGuard>,
    },
    /// Spend the native token along a streaming schedule.
    NativeTokenStreaming {
        /// The unlock schedule.
        schedule: StreamingSchedule,
        /// Calldata restriction; the empty-calldata guard is used when absent.
        calldata_guard: Option<CalldataGuard>,
    },
    /// Spend the native token up to an amount per period.
    NativeTokenPeriodTransfer {
        /// The reset schedule.
        schedule: PeriodSchedule,
        /// Calldata restriction; the empty-calldata guard is used when absent.
        calldata_guard: Option<CalldataGuard>,
    },
    /// Transfer at most `max_amount` of an ERC-20 token in total.
    Erc20TransferAmount {
        /// The token.
        token: Address,
        /// Total allowance.
        max_amount: U256,
    },
    /// Transfer an ERC-20 token along a streaming schedule.
    Erc20Streaming {
        /// The token.
        token: Address,
        /// The unlock schedule.
        schedule: StreamingSchedule,
    },
    /// Transfer an ERC-20 token up to an amount per period.
    Erc20PeriodTransfer {
        /// The token.
        token: Address,
        /// The reset schedule.
        schedule: PeriodSchedule,
    },
    /// Transfer one specific NFT.
    Erc721Transfer {
        /// The collection.
        token: Address,
        /// The token.
        token_id: U256,
    },
    /// Transfer ownership of one contract.
    OwnershipTransfer {
        /// The owned contract.
        contract_address: Address,
    },
    /// Call selected methods on selected contracts.
    FunctionCall {
        /// Callable contracts.
        targets: Vec<Address>,
        /// Callable methods.
        selectors: Vec<MethodSelector>,
        /// Optional calldata restriction.
        calldata_guard: Option<CalldataGuard>,
        /// Largest native value per call, zero when absent.
        value_lte: Option<U256>,
    },
}

impl Scope {
    /// Name of the scope type, as used in its serialized tag.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NativeTokenTransferAmount { .. } => "nativeTokenTransferAmount",
            Self::NativeTokenStreaming { .. } => "nativeTokenStreaming",
            Self::NativeTokenPeriodTransfer { .. } => "nativeTokenPeriodTransfer",
            Self::Erc20TransferAmount { .. } => "erc20TransferAmount",
            Self::Erc20Streaming { .. } => "erc20Streaming",
            Self::Erc20PeriodTransfer { .. } => "erc20PeriodTransfer",
            Self::Erc721Transfer { .. } => "erc721Transfer",
            Self::OwnershipTransfer { .. } => "ownershipTransfer",
            Self::FunctionCall { .. } => "functionCall",
        }
    }
}

fn native_guard(
    guard: Option<&CalldataGuard>,
    config: &CaveatBuilderConfig,
) -> Option<CalldataGuard> {
    match guard.filter(|guard| !guard.is_empty()) {
        Some(guard) => Some(guard.clone()),
        None if config.inject_default_guards => Some(CalldataGuard::empty_calldata()),
        None => None,
    }
}

fn with_guard<'env>(
    builder: CaveatBuilder<'env>,
    guard: Option<CalldataGuard>,
) -> Result<CaveatBuilder<'env>, CaveatError> {
    match guard {
        Some(guard) => guard.apply(builder),
        None => Ok(builder),
    }
}

/// Expands `scope` into a builder pre-filled with its caveats, so callers can append more.
///
/// Calldata guards always precede the allowance they protect.
///
/// # Errors
/// - `CaveatError::UnknownEnforcer` if the environment lacks one of the scope's enforcers.
/// - `CaveatError::InvalidTerms` if the scope parameters are invalid.
pub fn create_caveat_builder_from_scope<'env>(
    environment: &'env DeleGatorEnvironment,
    scope: &Scope,
    config: CaveatBuilderConfig,
) -> Result<CaveatBuilder<'env>, CaveatError> {
    crate::debug!("Resolving scope {}", scope.name());
    let builder = CaveatBuilder::with_config(environment, config);

    match scope {
        Scope::NativeTokenTransferAmount {
            max_amount,
            calldata_guard,
        } => with_guard(builder, native_guard(calldata_guard.as_ref(), &config))?
            .add_caveat(NativeTokenTransferAmountTerms {
                max_amount: *max_amount,
            }),
        Scope::NativeTokenStreaming {
            schedule,
            calldata_guard,
        } => with_guard(builder, native_guard(calldata_guard.as_ref(), &config))?
            .add_caveat(NativeTokenStreamingTerms {
                schedule: *schedule,
            }),
        Scope::NativeTokenPeriodTransfer {
            schedule,
            calldata_guard,
        } => with_guard(builder, native_guard(calldata_guard.as_ref(), &config))?
            .add_caveat(NativeTokenPeriodTransferTerms {
                schedule: *schedule,
            }),
        Scope::Erc20TransferAmount { token, max_amount } => builder
            .add_caveat(ValueLteTerms {
                max_value: U256::ZERO,
            })?
            .add_caveat(Erc20TransferAmountTerms {
                token: *token,
                max_amount: *max_amount,
            }),
        Scope::Erc20Streaming { token, schedule } => builder
            .add_caveat(ValueLteTerms {
                max_value: U256::ZERO,
            })?
            .add_caveat(Erc20StreamingTerms {
                token: *token,
                schedule: *schedule,
            }),
        Scope::Erc20PeriodTransfer { token, schedule } => builder
            .add_caveat(ValueLteTerms {
                max_value: U256::ZERO,
            })?
            .add_caveat(Erc20PeriodTransferTerms {
                token: *token,
                schedule: *schedule,
            }),
        Scope::Erc721Transfer { token, token_id } => builder.add_caveat(Erc721TransferTerms {
            token: *token,
            token_id: *token_id,
        }),
        Scope::OwnershipTransfer { contract_address } => {
            builder.add_caveat(OwnershipTransferTerms {
                contract_address: *contract_address,
            })
        }
        Scope::FunctionCall {
            targets,
            selectors,
            calldata_guard,
            value_lte,
        } => {
            let builder = builder
                .add_caveat(AllowedTargetsTerms {
                    targets: targets.clone(),
                })?
                .add_caveat(AllowedMethodsTerms {
                    selectors: selectors.clone(),
                })?;
            with_guard(builder, calldata_guard.clone())?.add_caveat(ValueLteTerms {
                max_value: value_lte.unwrap_or(U256::ZERO),
            })
        }
    }
}

/// Resolves `scope` into its caveats with the default builder policy.
///
/// # Errors
/// See [`create_caveat_builder_from_scope`].
pub fn resolve_scope(
    environment: &DeleGatorEnvironment,
    scope: &Scope,
) -> Result<Vec<Caveat>, CaveatError> {
    create_caveat_builder_from_scope(environment, scope, CaveatBuilderConfig::default())?.build()
}
