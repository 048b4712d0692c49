use alloy::primitives::{Address, B256};
use ruint::aliases::U256;

use crate::caveats::{MethodSelector, PeriodSchedule, Scope, StreamingSchedule};
use crate::covenant_export;
use crate::delegation::{
    create_scoped_delegation, encode_delegations, Authority, DelegationError, UnsignedDelegation,
};
use crate::environment::{get_environment, DeleGatorEnvironment};
use crate::primitives::{HexEncodedData, ParseFromForeignBinding, PrimitiveError};
use crate::signer::KeySigner;

/// String-typed mirror of [`Scope`] for foreign callers.
///
/// Amounts are decimal or `0x`-prefixed hex strings, addresses are hex strings.
/// Native scopes always use the empty-calldata guard.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Enum)]
pub enum UnparsedScope {
    /// See [`Scope::NativeTokenTransferAmount`].
    NativeTokenTransferAmount {
        /// Total allowance in wei.
        max_amount: String,
    },
    /// See [`Scope::NativeTokenStreaming`].
    NativeTokenStreaming {
        /// Amount available at `start_time`.
        initial_amount: String,
        /// Cap on the total amount.
        max_amount: String,
        /// Amount unlocked per second.
        amount_per_second: String,
        /// Unix timestamp in seconds.
        start_time: u64,
    },
    /// See [`Scope::NativeTokenPeriodTransfer`].
    NativeTokenPeriodTransfer {
        /// Allowance per period.
        period_amount: String,
        /// Period length in seconds.
        period_duration: u64,
        /// Unix timestamp in seconds.
        start_date: u64,
    },
    /// See [`Scope::Erc20TransferAmount`].
    Erc20TransferAmount {
        /// Token contract.
        token: String,
        /// Total allowance.
        max_amount: String,
    },
    /// See [`Scope::Erc20Streaming`].
    Erc20Streaming {
        /// Token contract.
        token: String,
        /// Amount available at `start_time`.
        initial_amount: String,
        /// Cap on the total amount.
        max_amount: String,
        /// Amount unlocked per second.
        amount_per_second: String,
        /// Unix timestamp in seconds.
        start_time: u64,
    },
    /// See [`Scope::Erc20PeriodTransfer`].
    Erc20PeriodTransfer {
        /// Token contract.
        token: String,
        /// Allowance per period.
        period_amount: String,
        /// Period length in seconds.
        period_duration: u64,
        /// Unix timestamp in seconds.
        start_date: u64,
    },
    /// See [`Scope::Erc721Transfer`].
    Erc721Transfer {
        /// Collection contract.
        token: String,
        /// Token id.
        token_id: String,
    },
    /// See [`Scope::OwnershipTransfer`].
    OwnershipTransfer {
        /// Owned contract.
        contract_address: String,
    },
    /// See [`Scope::FunctionCall`].
    FunctionCall {
        /// Callable contracts.
        targets: Vec<String>,
        /// Selectors as 4 byte hex or function signatures like `transfer(address,uint256)`.
        selectors: Vec<String>,
        /// Largest native value per call.
        value_lte: Option<String>,
    },
}

fn streaming(
    initial_amount: &str,
    max_amount: &str,
    amount_per_second: &str,
    start_time: u64,
) -> Result<StreamingSchedule, PrimitiveError> {
    Ok(StreamingSchedule {
        initial_amount: U256::parse_from_ffi(initial_amount, "initial_amount")?,
        max_amount: U256::parse_from_ffi(max_amount, "max_amount")?,
        amount_per_second: U256::parse_from_ffi(amount_per_second, "amount_per_second")?,
        start_time,
    })
}

fn period(
    period_amount: &str,
    period_duration: u64,
    start_date: u64,
) -> Result<PeriodSchedule, PrimitiveError> {
    Ok(PeriodSchedule {
        period_amount: U256::parse_from_ffi(period_amount, "period_amount")?,
        period_duration,
        start_date,
    })
}

impl TryFrom<UnparsedScope> for Scope {
    type Error = DelegationError;

    fn try_from(value: UnparsedScope) -> Result<Self, Self::Error> {
        let scope = match value {
            UnparsedScope::NativeTokenTransferAmount { max_amount } => {
                Self::NativeTokenTransferAmount {
                    max_amount: U256::parse_from_ffi(&max_amount, "max_amount")?,
                    calldata_guard: None,
                }
            }
            UnparsedScope::NativeTokenStreaming {
                initial_amount,
                max_amount,
                amount_per_second,
                start_time,
            } => Self::NativeTokenStreaming {
                schedule: streaming(&initial_amount, &max_amount, &amount_per_second, start_time)?,
                calldata_guard: None,
            },
            UnparsedScope::NativeTokenPeriodTransfer {
                period_amount,
                period_duration,
                start_date,
            } => Self::NativeTokenPeriodTransfer {
                schedule: period(&period_amount, period_duration, start_date)?,
                calldata_guard: None,
            },
            UnparsedScope::Erc20TransferAmount { token, max_amount } => Self::Erc20TransferAmount {
                token: Address::parse_from_ffi(&token, "token")?,
                max_amount: U256::parse_from_ffi(&max_amount, "max_amount")?,
            },
            UnparsedScope::Erc20Streaming {
                token,
                initial_amount,
                max_amount,
                amount_per_second,
                start_time,
            } => Self::Erc20Streaming {
                token: Address::parse_from_ffi(&token, "token")?,
                schedule: streaming(&initial_amount, &max_amount, &amount_per_second, start_time)?,
            },
            UnparsedScope::Erc20PeriodTransfer {
                token,
                period_amount,
                period_duration,
                start_date,
            } => Self::Erc20PeriodTransfer {
                token: Address::parse_from_ffi(&token, "token")?,
                schedule: period(&period_amount, period_duration, start_date)?,
            },
            UnparsedScope::Erc721Transfer { token, token_id } => Self::Erc721Transfer {
                token: Address::parse_from_ffi(&token, "token")?,
                token_id: U256::parse_from_ffi(&token_id, "token_id")?,
            },
            UnparsedScope::OwnershipTransfer { contract_address } => Self::OwnershipTransfer {
                contract_address: Address::parse_from_ffi(&contract_address, "contract_address")?,
            },
            UnparsedScope::FunctionCall {
                targets,
                selectors,
                value_lte,
            } => Self::FunctionCall {
                targets: targets
                    .iter()
                    .map(|target| Address::parse_from_ffi(target, "targets"))
                    .collect::<Result<_, _>>()?,
                selectors: selectors
                    .iter()
                    .map(|selector| MethodSelector::parse(selector))
                    .collect::<Result<_, _>>()?,
                calldata_guard: None,
                value_lte: value_lte
                    .map(|value| U256::parse_from_ffi(&value, "value_lte"))
                    .transpose()?,
            },
        };
        Ok(scope)
    }
}

/// Signs root delegations for a delegator account owned by a local key.
#[derive(Debug, uniffi::Object)]
pub struct LocalDelegator {
    signer: KeySigner,
    delegator: Address,
}

#[covenant_export]
impl LocalDelegator {
    /// Binds a hex-encoded owner key to the delegator account it controls.
    ///
    /// # Errors
    /// - `DelegationError::InvalidInput` if the key is malformed.
    /// - `DelegationError::Primitive` if the address is malformed.
    #[uniffi::constructor]
    pub fn new(private_key: String, delegator_address: &str) -> Result<Self, DelegationError> {
        let signer = KeySigner::from_private_key(&private_key)?;
        let delegator = Address::parse_from_ffi(delegator_address, "delegator_address")?;
        crate::debug!("Initialized LocalDelegator for {delegator}");
        Ok(Self { signer, delegator })
    }

    /// Address of the delegator account.
    #[must_use]
    pub fn delegator_address(&self) -> String {
        self.delegator.to_checksum(None)
    }

    /// Creates and signs a root delegation for `scope` and returns the ABI-encoded permission context.
    ///
    /// # Arguments
    /// * `chain_id` - Chain whose delegation manager verifies the signature.
    /// * `delegate` - Account allowed to redeem.
    /// * `scope` - The permission to grant.
    /// * `salt` - Optional 32 byte hex salt. Zero when absent.
    ///
    /// # Errors
    /// - `DelegationError::Environment` if the chain has no deployment.
    /// - `DelegationError::Caveat` if the scope parameters are invalid.
    /// - `DelegationError::Signing` if signing fails.
    pub async fn sign_delegation(
        &self,
        chain_id: u64,
        delegate: String,
        scope: UnparsedScope,
        salt: Option<String>,
    ) -> Result<HexEncodedData, DelegationError> {
        let (environment, unsigned) = self.unsigned(chain_id, &delegate, scope, salt.as_deref())?;
        let delegation = unsigned.sign(&self.signer, &environment).await?;
        Ok(encode_delegations(&[delegation]).into())
    }

    /// The delegation hash `sign_delegation` would produce for the same inputs.
    ///
    /// # Errors
    /// Same as `sign_delegation`, except signing errors.
    pub fn delegation_hash(
        &self,
        chain_id: u64,
        delegate: String,
        scope: UnparsedScope,
        salt: Option<String>,
    ) -> Result<HexEncodedData, DelegationError> {
        let (_, unsigned) = self.unsigned(chain_id, &delegate, scope, salt.as_deref())?;
        Ok(unsigned.hash().into())
    }
}

impl LocalDelegator {
    fn unsigned(
        &self,
        chain_id: u64,
        delegate: &str,
        scope: UnparsedScope,
        salt: Option<&str>,
    ) -> Result<(DeleGatorEnvironment, UnsignedDelegation), DelegationError> {
        let environment = get_environment(chain_id, None)?;
        let delegate = Address::parse_from_ffi(delegate, "delegate")?;
        let salt = salt
            .map(|salt| B256::parse_from_ffi(salt, "salt"))
            .transpose()?
            .unwrap_or_default();
        let scope = Scope::try_from(scope)?;

        let unsigned = create_scoped_delegation(
            &environment,
            &scope,
            self.delegator,
            delegate,
            Authority::Root,
            Vec::new(),
        )?
        .with_salt(salt);
        Ok((environment, unsigned))
    }
}

/// Amount of a streaming allowance available at `now`, as a decimal string.
///
/// # Errors
/// - `PrimitiveError::InvalidInput` if an amount is not a valid number.
#[uniffi::export]
pub fn streaming_available_amount(
    initial_amount: &str,
    max_amount: &str,
    amount_per_second: &str,
    start_time: u64,
    now: u64,
    spent: &str,
) -> Result<String, PrimitiveError> {
    let schedule = streaming(initial_amount, max_amount, amount_per_second, start_time)?;
    let spent = U256::parse_from_ffi(spent, "spent")?;
    Ok(schedule.available_amount(now, spent).to_string())
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;
    use crate::delegation::decode_delegations;

    const ANVIL_KEY: &str = "ac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
    const DELEGATOR: &str = "0x1234567890123456789012345678901234567890";
    const DELEGATE: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

    fn erc20_scope() -> UnparsedScope {
        UnparsedScope::Erc20TransferAmount {
            token: "0x6B175474E89094C44Da98b954EedeAC495271d0F".to_string(),
            max_amount: "1000000000000000000".to_string(),
        }
    }

    #[test]
    fn test_unparsed_scope_conversion() {
        let scope = Scope::try_from(UnparsedScope::FunctionCall {
            targets: vec![DELEGATE.to_string()],
            selectors: vec!["transfer(address,uint256)".to_string(), "0x095ea7b3".to_string()],
            value_lte: Some("0x10".to_string()),
        })
        .unwrap();

        let Scope::FunctionCall {
            targets,
            selectors,
            value_lte,
            ..
        } = scope
        else {
            panic!("expected a function call scope");
        };
        assert_eq!(targets, vec![address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8")]);
        assert_eq!(selectors[0].to_string(), "0xa9059cbb");
        assert_eq!(selectors[1].to_string(), "0x095ea7b3");
        assert_eq!(value_lte, Some(U256::from(16)));

        let err = Scope::try_from(UnparsedScope::Erc20TransferAmount {
            token: "not an address".to_string(),
            max_amount: "1".to_string(),
        })
        .unwrap_err();
        assert!(matches!(
            err,
            DelegationError::Primitive(PrimitiveError::InvalidInput { attribute: "token", .. })
        ));
    }

    #[tokio::test]
    async fn test_signed_context_matches_hash() {
        let delegator = LocalDelegator::new(ANVIL_KEY.to_string(), DELEGATOR).unwrap();
        let salt = Some(format!("0x{}", "01".repeat(32)));

        let context = delegator
            .sign_delegation(1, DELEGATE.to_string(), erc20_scope(), salt.clone())
            .await
            .unwrap();
        let hash = delegator
            .delegation_hash(1, DELEGATE.to_string(), erc20_scope(), salt)
            .unwrap();

        let decoded = decode_delegations(&context.to_bytes()).unwrap();
        assert_eq!(decoded.len(), 1);
        assert_eq!(decoded[0].hash().to_string(), hash.to_hex_string());
        assert_eq!(decoded[0].delegator().to_checksum(None), DELEGATOR);
        assert_eq!(decoded[0].caveats().len(), 2);
    }

    #[test]
    fn test_unknown_chain_is_reported() {
        let delegator = LocalDelegator::new(ANVIL_KEY.to_string(), DELEGATOR).unwrap();
        let err = delegator
            .delegation_hash(9_999_991, DELEGATE.to_string(), erc20_scope(), None)
            .unwrap_err();
        assert!(matches!(err, DelegationError::Environment(_)));
    }

    #[test]
    fn test_streaming_available_amount() {
        let start = 1_717_200_000;
        assert_eq!(
            streaming_available_amount("5", "10", "1", start, start, "0").unwrap(),
            "5"
        );
        assert_eq!(
            streaming_available_amount("5", "10", "1", start, start + 10, "0").unwrap(),
            "10"
        );
        assert_eq!(
            streaming_available_amount("5", "10", "1", start, start - 1, "0").unwrap(),
            "0"
        );
        assert!(streaming_available_amount("five", "10", "1", start, start, "0").is_err());
    }
}
