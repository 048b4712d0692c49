use alloy::primitives::Address;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::terms::native::require_positive;
use crate::caveats::{expect_len, CaveatError, CaveatKind, TermsCodec, MAX_TIMESTAMP};
use crate::primitives::codec::{TermsReader, TermsWriter, ADDRESS, WORD};

/// An allowance that starts at `initial_amount` and unlocks `amount_per_second`
/// from `start_time` on, capped at `max_amount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamingSchedule {
    /// Unlocked immediately at `start_time`.
    pub initial_amount: U256,
    /// Cap on the total ever unlocked.
    pub max_amount: U256,
    /// Unlock rate.
    pub amount_per_second: U256,
    /// Unix seconds at which the stream starts.
    pub start_time: u64,
}

impl StreamingSchedule {
    /// Amount still available at `now` after `spent` has been consumed.
    ///
    /// Nothing is available before `start_time`, whatever was spent. Afterwards
    /// the unlocked amount is `min(initial + rate * elapsed, max)` and the result
    /// is `unlocked - spent`, floored at zero.
    #[must_use]
    pub fn available_amount(&self, now: u64, spent: U256) -> U256 {
        if now < self.start_time {
            return U256::ZERO;
        }
        let elapsed = U256::from(now - self.start_time);
        let unlocked = self
            .initial_amount
            .saturating_add(self.amount_per_second.saturating_mul(elapsed))
            .min(self.max_amount);
        unlocked.saturating_sub(spent)
    }

    fn validate(&self, kind: CaveatKind) -> Result<(), CaveatError> {
        require_positive(kind, "max_amount", self.max_amount)?;
        require_positive(kind, "amount_per_second", self.amount_per_second)?;
        if self.max_amount < self.initial_amount {
            return Err(CaveatError::invalid(
                kind,
                "max_amount",
                "must be greater than or equal to initial_amount",
            ));
        }
        if self.start_time == 0 {
            return Err(CaveatError::invalid(kind, "start_time", "must be greater than zero"));
        }
        if self.start_time > MAX_TIMESTAMP {
            return Err(CaveatError::invalid(
                kind,
                "start_time",
                format!("must be at most {MAX_TIMESTAMP}"),
            ));
        }
        Ok(())
    }

    fn write(&self, writer: TermsWriter) -> TermsWriter {
        writer
            .word(self.initial_amount)
            .word(self.max_amount)
            .word(self.amount_per_second)
            .word(U256::from(self.start_time))
    }

    fn read(kind: CaveatKind, reader: &mut TermsReader<'_>) -> Result<Self, CaveatError> {
        Ok(Self {
            initial_amount: reader.word()?,
            max_amount: reader.word()?,
            amount_per_second: reader.word()?,
            start_time: reader
                .uint_u64(WORD, "start_time")
                .map_err(CaveatError::field(kind, "start_time"))?,
        })
    }
}

/// Streaming allowance over the native token.
///
/// Layout: `initialAmount` ∥ `maxAmount` ∥ `amountPerSecond` ∥ `startTime`, 32 bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenStreamingTerms {
    /// The unlock schedule.
    pub schedule: StreamingSchedule,
}

impl TermsCodec for NativeTokenStreamingTerms {
    const KIND: CaveatKind = CaveatKind::NativeTokenStreaming;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        self.schedule.validate(Self::KIND)?;
        Ok(self.schedule.write(TermsWriter::new()).finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, 4 * WORD)?;
        let schedule = StreamingSchedule::read(Self::KIND, &mut TermsReader::new(terms))?;
        Ok(Self { schedule })
    }
}

/// Streaming allowance over one ERC-20 token.
///
/// Layout: `token`(20) followed by the native streaming layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20StreamingTerms {
    /// The streamed token.
    pub token: Address,
    /// The unlock schedule.
    pub schedule: StreamingSchedule,
}

impl TermsCodec for Erc20StreamingTerms {
    const KIND: CaveatKind = CaveatKind::Erc20Streaming;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        self.schedule.validate(Self::KIND)?;
        Ok(self
            .schedule
            .write(TermsWriter::new().address(self.token))
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, ADDRESS + 4 * WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            token: reader.address()?,
            schedule: StreamingSchedule::read(Self::KIND, &mut reader)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    const START: u64 = 1_717_200_000;

    fn schedule() -> StreamingSchedule {
        StreamingSchedule {
            initial_amount: U256::from(5),
            max_amount: U256::from(10),
            amount_per_second: U256::from(1),
            start_time: START,
        }
    }

    #[test]
    fn test_available_amount_unlocks_linearly_up_to_max() {
        let schedule = schedule();
        assert_eq!(schedule.available_amount(START, U256::ZERO), U256::from(5));
        assert_eq!(schedule.available_amount(START + 3, U256::ZERO), U256::from(8));
        assert_eq!(schedule.available_amount(START + 10, U256::ZERO), U256::from(10));
        assert_eq!(schedule.available_amount(START + 10_000, U256::ZERO), U256::from(10));
    }

    #[test]
    fn test_available_amount_is_zero_before_start() {
        let schedule = schedule();
        assert_eq!(schedule.available_amount(START - 1, U256::ZERO), U256::ZERO);
        assert_eq!(schedule.available_amount(0, U256::ZERO), U256::ZERO);
    }

    #[test]
    fn test_available_amount_subtracts_spent_saturating() {
        let schedule = schedule();
        assert_eq!(schedule.available_amount(START + 2, U256::from(4)), U256::from(3));
        assert_eq!(schedule.available_amount(START, U256::from(50)), U256::ZERO);
    }

    #[test]
    fn test_available_amount_does_not_overflow() {
        let schedule = StreamingSchedule {
            initial_amount: U256::MAX,
            max_amount: U256::MAX,
            amount_per_second: U256::MAX,
            start_time: 1,
        };
        assert_eq!(schedule.available_amount(u64::MAX, U256::ZERO), U256::MAX);
    }

    #[test]
    fn test_native_streaming_layout() {
        let terms = NativeTokenStreamingTerms { schedule: schedule() };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 128);
        assert_eq!(encoded[31], 5);
        assert_eq!(encoded[63], 10);
        assert_eq!(encoded[95], 1);
        assert_eq!(U256::from_be_slice(&encoded[96..]), U256::from(START));
        assert_eq!(NativeTokenStreamingTerms::decode_terms(&encoded).unwrap(), terms);
    }

    #[test]
    fn test_erc20_streaming_prefixes_token() {
        let token = address!("0x2cfc85d8e48f8eab294be644d9e25c3030863003");
        let terms = Erc20StreamingTerms {
            token,
            schedule: schedule(),
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 148);
        assert_eq!(&encoded[..20], token.as_slice());
        assert_eq!(Erc20StreamingTerms::decode_terms(&encoded).unwrap(), terms);
        assert!(Erc20StreamingTerms::decode_terms(&encoded[..147]).is_err());
    }

    #[test]
    fn test_streaming_validation() {
        let invalid = |schedule: StreamingSchedule| {
            NativeTokenStreamingTerms { schedule }.encode_terms().unwrap_err()
        };

        let err = invalid(StreamingSchedule {
            initial_amount: U256::from(11),
            ..schedule()
        });
        assert!(matches!(err, CaveatError::InvalidTerms { field: "max_amount", .. }));

        let err = invalid(StreamingSchedule {
            start_time: 0,
            ..schedule()
        });
        assert!(matches!(err, CaveatError::InvalidTerms { field: "start_time", .. }));

        let err = invalid(StreamingSchedule {
            start_time: MAX_TIMESTAMP + 1,
            ..schedule()
        });
        assert!(matches!(err, CaveatError::InvalidTerms { field: "start_time", .. }));

        let err = invalid(StreamingSchedule {
            amount_per_second: U256::ZERO,
            ..schedule()
        });
        assert!(matches!(
            err,
            CaveatError::InvalidTerms { field: "amount_per_second", .. }
        ));
    }
}
