//! One module per family of enforcers. All layouts are big-endian, byte-exact
//! concatenations; the enforcers slice them at fixed offsets.

mod calldata;
mod execution;
mod native;
mod nonce;
mod period;
mod streaming;
mod targets;
mod time;
mod token;

pub use calldata::{
    AllowedCalldataTerms, AllowedMethodsTerms, ArgsEqualityCheckTerms, ExactCalldataTerms,
    MethodSelector,
};
pub use execution::{
    ExactCalldataBatchTerms, ExactExecutionBatchTerms, ExactExecutionTerms, Execution,
};
pub use native::{
    BalanceChangeType, NativeBalanceChangeTerms, NativeTokenPaymentTerms,
    NativeTokenTransferAmountTerms, ValueLteTerms,
};
pub use nonce::{IdTerms, LimitedCallsTerms, NonceTerms};
pub use period::{
    Erc20PeriodTransferTerms, MultiTokenPeriodTerms, NativeTokenPeriodTransferTerms,
    PeriodAvailability, PeriodSchedule, TokenPeriod,
};
pub use streaming::{Erc20StreamingTerms, NativeTokenStreamingTerms, StreamingSchedule};
pub use targets::{AllowedTargetsTerms, DeployedTerms, OwnershipTransferTerms, RedeemerTerms};
pub use time::{BlockNumberTerms, TimestampTerms};
pub use token::{
    Erc1155BalanceChangeTerms, Erc20BalanceChangeTerms, Erc20TransferAmountTerms,
    Erc721BalanceChangeTerms, Erc721TransferTerms, SpecificActionErc20TransferBatchTerms,
};
