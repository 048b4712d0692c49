use alloy::primitives::Address;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::terms::native::require_positive;
use crate::caveats::{
    expect_len, expect_multiple_of, CaveatError, CaveatKind, TermsCodec, MAX_TIMESTAMP,
};
use crate::primitives::codec::{TermsReader, TermsWriter, ADDRESS, WORD};

/// An allowance of `period_amount` that resets every `period_duration` seconds from `start_date` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSchedule {
    /// Allowance per period.
    pub period_amount: U256,
    /// Period length in seconds.
    pub period_duration: u64,
    /// Unix seconds at which the first period starts.
    pub start_date: u64,
}

/// Result of [`PeriodSchedule::available_amount`], mirroring the enforcer's `getAvailableAmount`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodAvailability {
    /// What can still be transferred in the current period.
    pub available_amount: U256,
    /// No transfer has happened in the current period yet.
    pub is_new_period: bool,
    /// One-based index of the current period, 0 before `start_date`.
    pub current_period: u64,
}

impl PeriodSchedule {
    /// Amount available at `now`, given what the enforcer recorded for the last transfer.
    ///
    /// Periods are numbered from 1, so a `last_transfer_period` of 0 means nothing was
    /// transferred yet. `transferred` only counts when it was recorded in the current period.
    #[must_use]
    pub fn available_amount(
        &self,
        now: u64,
        transferred: U256,
        last_transfer_period: u64,
    ) -> PeriodAvailability {
        if now < self.start_date || self.period_duration == 0 {
            return PeriodAvailability {
                available_amount: U256::ZERO,
                is_new_period: false,
                current_period: 0,
            };
        }
        let current_period = (now - self.start_date) / self.period_duration + 1;
        let is_new_period = current_period > last_transfer_period;
        let transferred = if is_new_period { U256::ZERO } else { transferred };
        PeriodAvailability {
            available_amount: self.period_amount.saturating_sub(transferred),
            is_new_period,
            current_period,
        }
    }

    fn validate(&self, kind: CaveatKind) -> Result<(), CaveatError> {
        require_positive(kind, "period_amount", self.period_amount)?;
        if self.period_duration == 0 {
            return Err(CaveatError::invalid(
                kind,
                "period_duration",
                "must be greater than zero",
            ));
        }
        if self.start_date == 0 {
            return Err(CaveatError::invalid(kind, "start_date", "must be greater than zero"));
        }
        if self.start_date > MAX_TIMESTAMP {
            return Err(CaveatError::invalid(
                kind,
                "start_date",
                format!("must be at most {MAX_TIMESTAMP}"),
            ));
        }
        Ok(())
    }

    fn write(&self, writer: TermsWriter) -> TermsWriter {
        writer
            .word(self.period_amount)
            .word(U256::from(self.period_duration))
            .word(U256::from(self.start_date))
    }

    fn read(kind: CaveatKind, reader: &mut TermsReader<'_>) -> Result<Self, CaveatError> {
        Ok(Self {
            period_amount: reader.word()?,
            period_duration: reader
                .uint_u64(WORD, "period_duration")
                .map_err(CaveatError::field(kind, "period_duration"))?,
            start_date: reader
                .uint_u64(WORD, "start_date")
                .map_err(CaveatError::field(kind, "start_date"))?,
        })
    }
}

const SCHEDULE_LEN: usize = 3 * WORD;

/// Periodic allowance over the native token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenPeriodTransferTerms {
    /// The reset schedule.
    pub schedule: PeriodSchedule,
}

impl TermsCodec for NativeTokenPeriodTransferTerms {
    const KIND: CaveatKind = CaveatKind::NativeTokenPeriodTransfer;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        self.schedule.validate(Self::KIND)?;
        Ok(self.schedule.write(TermsWriter::new()).finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, SCHEDULE_LEN)?;
        let schedule = PeriodSchedule::read(Self::KIND, &mut TermsReader::new(terms))?;
        Ok(Self { schedule })
    }
}

/// Periodic allowance over one ERC-20 token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20PeriodTransferTerms {
    /// The token.
    pub token: Address,
    /// The reset schedule.
    pub schedule: PeriodSchedule,
}

impl TermsCodec for Erc20PeriodTransferTerms {
    const KIND: CaveatKind = CaveatKind::Erc20PeriodTransfer;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        self.schedule.validate(Self::KIND)?;
        Ok(self
            .schedule
            .write(TermsWriter::new().address(self.token))
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, ADDRESS + SCHEDULE_LEN)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            token: reader.address()?,
            schedule: PeriodSchedule::read(Self::KIND, &mut reader)?,
        })
    }
}

/// One token entry of a [`MultiTokenPeriodTerms`]. The zero address stands for the native token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPeriod {
    /// The token.
    pub token: Address,
    /// The reset schedule for this token.
    pub schedule: PeriodSchedule,
}

/// Independent periodic allowances over several tokens; the redemption picks one by index in `args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiTokenPeriodTerms {
    /// Per-token allowances, at least one.
    pub periods: Vec<TokenPeriod>,
}

impl TermsCodec for MultiTokenPeriodTerms {
    const KIND: CaveatKind = CaveatKind::MultiTokenPeriod;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        if self.periods.is_empty() {
            return Err(CaveatError::invalid(
                Self::KIND,
                "periods",
                "at least one token period is required",
            ));
        }
        let mut writer = TermsWriter::new();
        for period in &self.periods {
            period.schedule.validate(Self::KIND)?;
            writer = period.schedule.write(writer.address(period.token));
        }
        Ok(writer.finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_multiple_of(Self::KIND, terms, ADDRESS + SCHEDULE_LEN)?;
        let mut reader = TermsReader::new(terms);
        let mut periods = Vec::with_capacity(terms.len() / (ADDRESS + SCHEDULE_LEN));
        while reader.remaining() > 0 {
            periods.push(TokenPeriod {
                token: reader.address()?,
                schedule: PeriodSchedule::read(Self::KIND, &mut reader)?,
            });
        }
        Ok(Self { periods })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    const START: u64 = 1_717_200_000;
    const DAY: u64 = 86_400;

    fn daily(amount: u64) -> PeriodSchedule {
        PeriodSchedule {
            period_amount: U256::from(amount),
            period_duration: DAY,
            start_date: START,
        }
    }

    #[test]
    fn test_available_amount_before_start() {
        let availability = daily(100).available_amount(START - 1, U256::ZERO, 0);
        assert_eq!(availability.available_amount, U256::ZERO);
        assert_eq!(availability.current_period, 0);
    }

    #[test]
    fn test_available_amount_counts_transfers_in_current_period_only() {
        let schedule = daily(100);

        let same_period = schedule.available_amount(START + 10, U256::from(30), 1);
        assert_eq!(same_period.available_amount, U256::from(70));
        assert!(!same_period.is_new_period);
        assert_eq!(same_period.current_period, 1);

        let next_period = schedule.available_amount(START + DAY, U256::from(30), 1);
        assert_eq!(next_period.available_amount, U256::from(100));
        assert!(next_period.is_new_period);
        assert_eq!(next_period.current_period, 2);

        let overspent = schedule.available_amount(START, U256::from(500), 1);
        assert_eq!(overspent.available_amount, U256::ZERO);
    }

    #[test]
    fn test_erc20_period_layout() {
        let terms = Erc20PeriodTransferTerms {
            token: address!("0x2cfc85d8e48f8eab294be644d9e25c3030863003"),
            schedule: daily(100),
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 116);
        assert_eq!(U256::from_be_slice(&encoded[52..84]), U256::from(DAY));
        assert_eq!(Erc20PeriodTransferTerms::decode_terms(&encoded).unwrap(), terms);
    }

    #[test]
    fn test_period_validation() {
        let err = NativeTokenPeriodTransferTerms {
            schedule: PeriodSchedule {
                period_duration: 0,
                ..daily(1)
            },
        }
        .encode_terms()
        .unwrap_err();
        assert!(matches!(err, CaveatError::InvalidTerms { field: "period_duration", .. }));

        assert!(NativeTokenPeriodTransferTerms { schedule: daily(0) }
            .encode_terms()
            .is_err());
    }

    #[test]
    fn test_multi_token_period_round_trip() {
        let terms = MultiTokenPeriodTerms {
            periods: vec![
                TokenPeriod {
                    token: Address::ZERO,
                    schedule: daily(1),
                },
                TokenPeriod {
                    token: address!("0x2cfc85d8e48f8eab294be644d9e25c3030863003"),
                    schedule: daily(2),
                },
            ],
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 232);
        assert_eq!(MultiTokenPeriodTerms::decode_terms(&encoded).unwrap(), terms);
        assert!(MultiTokenPeriodTerms::decode_terms(&encoded[..200]).is_err());
        assert!(MultiTokenPeriodTerms { periods: vec![] }.encode_terms().is_err());
    }
}
