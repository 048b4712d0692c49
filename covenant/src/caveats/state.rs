//! Client-side view of what an enforcer has recorded for a delegation.
//!
//! Reads go through a caller-supplied [`ContractReader`]; this crate never opens a
//! connection itself. Terms are decoded before any read, so a malformed caveat
//! fails locally instead of producing a misleading on-chain answer.

use alloy::primitives::{Address, Bytes, B256};
use alloy::sol_types::SolCall;
use anyhow::Context;
use async_trait::async_trait;
use ruint::aliases::U256;

use super::{
    CaveatError, CaveatKind, Erc20PeriodTransferTerms, Erc20StreamingTerms,
    NativeTokenPeriodTransferTerms, NativeTokenStreamingTerms, PeriodAvailability,
    StreamingSchedule, TermsCodec,
};
use crate::environment::DeleGatorEnvironment;

#[allow(missing_docs)]
mod contracts {
    alloy::sol! {
        interface INativeTokenStreamingEnforcer {
            function streamingAllowances(address delegationManager, bytes32 delegationHash)
                external
                view
                returns (
                    uint256 initialAmount,
                    uint256 maxAmount,
                    uint256 amountPerSecond,
                    uint256 startTime,
                    uint256 spent
                );
        }

        interface IERC20StreamingEnforcer {
            function streamingAllowances(address delegationManager, bytes32 delegationHash)
                external
                view
                returns (
                    address tokenAddress,
                    uint256 initialAmount,
                    uint256 maxAmount,
                    uint256 amountPerSecond,
                    uint256 startTime,
                    uint256 spent
                );
        }

        interface IPeriodTransferEnforcer {
            function getAvailableAmount(bytes32 delegationHash, address delegationManager, bytes calldata terms)
                external
                view
                returns (uint256 availableAmount, bool isNewPeriod, uint256 currentPeriod);
        }

        interface ILimitedCallsEnforcer {
            function callCounts(address delegationManager, bytes32 delegationHash) external view returns (uint256);
        }

        interface INonceEnforcer {
            function currentNonce(address delegationManager, address delegator) external view returns (uint256);
        }
    }
}

use contracts::{
    IERC20StreamingEnforcer, ILimitedCallsEnforcer, INativeTokenStreamingEnforcer,
    INonceEnforcer, IPeriodTransferEnforcer,
};

/// Read-only `eth_call` capability supplied by the caller (an RPC client, a local node, a test double).
#[async_trait]
pub trait ContractReader: Send + Sync {
    /// Executes `calldata` against `to` at the latest block and returns the raw output.
    ///
    /// # Errors
    /// Any transport or execution failure of the underlying client.
    async fn call(&self, to: Address, calldata: Bytes) -> anyhow::Result<Bytes>;
}

/// Encodes `call`, executes it through `reader` and decodes the return value.
///
/// # Errors
/// - The reader's error if the call fails.
/// - A decoding error if the output does not match the function's return types.
pub async fn read_contract<C, R>(reader: &R, to: Address, call: &C) -> anyhow::Result<C::Return>
where
    C: SolCall + Sync,
    R: ContractReader + ?Sized,
{
    let output = reader.call(to, call.abi_encode().into()).await?;
    C::abi_decode_returns(&output)
        .with_context(|| format!("failed to decode the output of {} on {to}", C::SIGNATURE))
}

/// How often a limited-calls delegation was redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallUsage {
    /// Redemptions so far.
    pub used: U256,
    /// Maximum from the caveat terms.
    pub limit: u64,
}

impl CallUsage {
    /// Redemptions left before the enforcer starts reverting.
    #[must_use]
    pub fn remaining(&self) -> U256 {
        U256::from(self.limit).saturating_sub(self.used)
    }
}

/// Queries enforcer state for delegations of one environment.
pub struct EnforcerState<'a, R: ContractReader + ?Sized> {
    reader: &'a R,
    environment: &'a DeleGatorEnvironment,
}

impl<'a, R: ContractReader + ?Sized> EnforcerState<'a, R> {
    /// Binds a reader to an environment.
    pub const fn new(reader: &'a R, environment: &'a DeleGatorEnvironment) -> Self {
        Self {
            reader,
            environment,
        }
    }

    /// Native amount still available to a streaming delegation at `now`.
    ///
    /// Before the first redemption the enforcer has no record; the schedule from
    /// `terms` is used with nothing spent.
    ///
    /// # Errors
    /// - `CaveatError::TermsLengthMismatch` if `terms` are not native streaming terms.
    /// - `CaveatError::UnknownEnforcer` if the enforcer is not deployed.
    /// - `CaveatError::Generic` if the read fails.
    pub async fn native_streaming_available_amount(
        &self,
        delegation_hash: B256,
        terms: &[u8],
        now: u64,
    ) -> Result<U256, CaveatError> {
        let declared = NativeTokenStreamingTerms::decode_terms(terms)?.schedule;
        let enforcer = self.environment.enforcer(CaveatKind::NativeTokenStreaming)?;
        crate::debug!("Reading native streaming allowance for {delegation_hash}");

        let stored = read_contract(
            self.reader,
            enforcer,
            &INativeTokenStreamingEnforcer::streamingAllowancesCall {
                delegationManager: self.environment.delegation_manager,
                delegationHash: delegation_hash,
            },
        )
        .await?;

        if stored.startTime.is_zero() {
            return Ok(declared.available_amount(now, U256::ZERO));
        }
        let schedule = StreamingSchedule {
            initial_amount: stored.initialAmount,
            max_amount: stored.maxAmount,
            amount_per_second: stored.amountPerSecond,
            start_time: u64::try_from(stored.startTime).context("stored start time overflows u64")?,
        };
        Ok(schedule.available_amount(now, stored.spent))
    }

    /// ERC-20 amount still available to a streaming delegation at `now`.
    ///
    /// # Errors
    /// Same as [`Self::native_streaming_available_amount`].
    pub async fn erc20_streaming_available_amount(
        &self,
        delegation_hash: B256,
        terms: &[u8],
        now: u64,
    ) -> Result<U256, CaveatError> {
        let declared = Erc20StreamingTerms::decode_terms(terms)?.schedule;
        let enforcer = self.environment.enforcer(CaveatKind::Erc20Streaming)?;
        crate::debug!("Reading ERC-20 streaming allowance for {delegation_hash}");

        let stored = read_contract(
            self.reader,
            enforcer,
            &IERC20StreamingEnforcer::streamingAllowancesCall {
                delegationManager: self.environment.delegation_manager,
                delegationHash: delegation_hash,
            },
        )
        .await?;

        if stored.startTime.is_zero() {
            return Ok(declared.available_amount(now, U256::ZERO));
        }
        let schedule = StreamingSchedule {
            initial_amount: stored.initialAmount,
            max_amount: stored.maxAmount,
            amount_per_second: stored.amountPerSecond,
            start_time: u64::try_from(stored.startTime).context("stored start time overflows u64")?,
        };
        Ok(schedule.available_amount(now, stored.spent))
    }

    /// Availability of a native or ERC-20 period-transfer delegation, as computed by its enforcer.
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` if `kind` is not a period-transfer kind.
    /// - `CaveatError::TermsLengthMismatch` if `terms` do not decode for `kind`.
    /// - `CaveatError::Generic` if the read fails.
    pub async fn period_transfer_availability(
        &self,
        kind: CaveatKind,
        delegation_hash: B256,
        terms: &[u8],
    ) -> Result<PeriodAvailability, CaveatError> {
        match kind {
            CaveatKind::NativeTokenPeriodTransfer => {
                NativeTokenPeriodTransferTerms::decode_terms(terms)?;
            }
            CaveatKind::Erc20PeriodTransfer => {
                Erc20PeriodTransferTerms::decode_terms(terms)?;
            }
            other => {
                return Err(CaveatError::invalid(
                    other,
                    "kind",
                    "not a period transfer enforcer",
                ))
            }
        }
        let enforcer = self.environment.enforcer(kind)?;
        crate::debug!("Reading {kind} availability for {delegation_hash}");

        let result = read_contract(
            self.reader,
            enforcer,
            &IPeriodTransferEnforcer::getAvailableAmountCall {
                delegationHash: delegation_hash,
                delegationManager: self.environment.delegation_manager,
                terms: Bytes::copy_from_slice(terms),
            },
        )
        .await?;

        Ok(PeriodAvailability {
            available_amount: result.availableAmount,
            is_new_period: result.isNewPeriod,
            current_period: u64::try_from(result.currentPeriod)
                .context("current period overflows u64")?,
        })
    }

    /// Redemptions recorded for a limited-calls delegation.
    ///
    /// # Errors
    /// - `CaveatError::TermsLengthMismatch` if `terms` are not limited-calls terms.
    /// - `CaveatError::Generic` if the read fails.
    pub async fn limited_calls_usage(
        &self,
        delegation_hash: B256,
        terms: &[u8],
    ) -> Result<CallUsage, CaveatError> {
        let limit = super::LimitedCallsTerms::decode_terms(terms)?.limit;
        let enforcer = self.environment.enforcer(CaveatKind::LimitedCalls)?;

        let used = read_contract(
            self.reader,
            enforcer,
            &ILimitedCallsEnforcer::callCountsCall {
                delegationManager: self.environment.delegation_manager,
                delegationHash: delegation_hash,
            },
        )
        .await?;

        Ok(CallUsage { used, limit })
    }

    /// The delegator's current revocation nonce. Delegations carrying a different nonce are revoked.
    ///
    /// # Errors
    /// - `CaveatError::UnknownEnforcer` if the nonce enforcer is not deployed.
    /// - `CaveatError::Generic` if the read fails.
    pub async fn current_nonce(&self, delegator: Address) -> Result<U256, CaveatError> {
        let enforcer = self.environment.enforcer(CaveatKind::Nonce)?;
        let nonce = read_contract(
            self.reader,
            enforcer,
            &INonceEnforcer::currentNonceCall {
                delegationManager: self.environment.delegation_manager,
                delegator,
            },
        )
        .await?;
        Ok(nonce)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use alloy::primitives::b256;
    use alloy::sol_types::SolValue;

    use super::*;
    use crate::caveats::{LimitedCallsTerms, PeriodSchedule};
    use crate::environment::builtin_environment;

    const HASH: B256 = b256!("0x1111111111111111111111111111111111111111111111111111111111111111");
    const START: u64 = 1_717_200_000;

    /// Replays a canned output and records the calls it received.
    struct CannedReader {
        output: Bytes,
        calls: Mutex<Vec<(Address, Bytes)>>,
    }

    impl CannedReader {
        fn new(output: Vec<u8>) -> Self {
            Self {
                output: output.into(),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ContractReader for CannedReader {
        async fn call(&self, to: Address, calldata: Bytes) -> anyhow::Result<Bytes> {
            self.calls.lock().unwrap().push((to, calldata));
            Ok(self.output.clone())
        }
    }

    struct FailingReader;

    #[async_trait]
    impl ContractReader for FailingReader {
        async fn call(&self, _to: Address, _calldata: Bytes) -> anyhow::Result<Bytes> {
            Err(anyhow::anyhow!("connection refused"))
        }
    }

    fn native_terms() -> Vec<u8> {
        NativeTokenStreamingTerms {
            schedule: StreamingSchedule {
                initial_amount: U256::from(5),
                max_amount: U256::from(10),
                amount_per_second: U256::from(1),
                start_time: START,
            },
        }
        .encode_terms()
        .unwrap()
    }

    #[tokio::test]
    async fn test_streaming_uses_terms_before_first_redemption() {
        let environment = builtin_environment(1, "1.3.0").unwrap();
        let reader = CannedReader::new(
            (U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO, U256::ZERO).abi_encode(),
        );
        let state = EnforcerState::new(&reader, &environment);

        let available = state
            .native_streaming_available_amount(HASH, &native_terms(), START + 2)
            .await
            .unwrap();
        assert_eq!(available, U256::from(7));

        let (to, calldata) = reader.calls.lock().unwrap()[0].clone();
        assert_eq!(
            to,
            environment.enforcer(CaveatKind::NativeTokenStreaming).unwrap()
        );
        assert_eq!(
            &calldata[..4],
            INativeTokenStreamingEnforcer::streamingAllowancesCall::SELECTOR.as_slice()
        );
    }

    #[tokio::test]
    async fn test_streaming_subtracts_stored_spend() {
        let environment = builtin_environment(1, "1.3.0").unwrap();
        let reader = CannedReader::new(
            (
                U256::from(5),
                U256::from(10),
                U256::from(1),
                U256::from(START),
                U256::from(6),
            )
                .abi_encode(),
        );
        let state = EnforcerState::new(&reader, &environment);
        let available = state
            .native_streaming_available_amount(HASH, &native_terms(), START + 10)
            .await
            .unwrap();
        assert_eq!(available, U256::from(4));
    }

    #[tokio::test]
    async fn test_terms_are_checked_before_reading() {
        let environment = builtin_environment(1, "1.3.0").unwrap();
        let reader = CannedReader::new(Vec::new());
        let state = EnforcerState::new(&reader, &environment);

        let err = state
            .native_streaming_available_amount(HASH, &[0u8; 127], START)
            .await
            .unwrap_err();
        assert!(matches!(err, CaveatError::TermsLengthMismatch { .. }));

        let err = state
            .limited_calls_usage(HASH, &[0u8; 33])
            .await
            .unwrap_err();
        assert!(matches!(err, CaveatError::TermsLengthMismatch { .. }));
        assert_eq!(reader.call_count(), 0);
    }

    #[tokio::test]
    async fn test_period_availability_is_forwarded() {
        let environment = builtin_environment(1, "1.3.0").unwrap();
        let reader = CannedReader::new((U256::from(40), true, U256::from(3)).abi_encode());
        let state = EnforcerState::new(&reader, &environment);
        let terms = NativeTokenPeriodTransferTerms {
            schedule: PeriodSchedule {
                period_amount: U256::from(40),
                period_duration: 60,
                start_date: START,
            },
        }
        .encode_terms()
        .unwrap();

        let availability = state
            .period_transfer_availability(CaveatKind::NativeTokenPeriodTransfer, HASH, &terms)
            .await
            .unwrap();
        assert_eq!(availability.available_amount, U256::from(40));
        assert!(availability.is_new_period);
        assert_eq!(availability.current_period, 3);

        let err = state
            .period_transfer_availability(CaveatKind::Nonce, HASH, &terms)
            .await
            .unwrap_err();
        assert!(matches!(err, CaveatError::InvalidTerms { field: "kind", .. }));
    }

    #[tokio::test]
    async fn test_limited_calls_usage() {
        let environment = builtin_environment(1, "1.3.0").unwrap();
        let reader = CannedReader::new(U256::from(2).abi_encode());
        let state = EnforcerState::new(&reader, &environment);
        let terms = LimitedCallsTerms { limit: 5 }.encode_terms().unwrap();

        let usage = state.limited_calls_usage(HASH, &terms).await.unwrap();
        assert_eq!(usage.used, U256::from(2));
        assert_eq!(usage.remaining(), U256::from(3));
    }

    #[tokio::test]
    async fn test_reader_failure_surfaces_as_generic() {
        let environment = builtin_environment(1, "1.3.0").unwrap();
        let state = EnforcerState::new(&FailingReader, &environment);
        let err = state.current_nonce(Address::ZERO).await.unwrap_err();
        assert!(matches!(err, CaveatError::Generic { .. }));
        assert!(err.to_string().contains("connection refused"));
    }
}
