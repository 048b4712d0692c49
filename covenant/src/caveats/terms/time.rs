use chrono::{Duration, Utc};
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::{expect_len, CaveatError, CaveatKind, TermsCodec, MAX_TIMESTAMP};
use crate::primitives::codec::{TermsReader, TermsWriter, WORD};

/// Redemption must happen strictly after `after_threshold` and strictly before
/// `before_threshold` (unix seconds). Zero leaves that side unbounded.
///
/// The thresholds are not checked against each other; the enforcer rejects an
/// empty window at redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampTerms {
    /// Lower bound in seconds, 0 for none.
    pub after_threshold: u64,
    /// Upper bound in seconds, 0 for none.
    pub before_threshold: u64,
}

impl TimestampTerms {
    /// A window that opens now and closes once `lifetime` has elapsed.
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` if `lifetime` is not positive or the window ends
    ///   past the largest supported timestamp.
    pub fn expiring_in(lifetime: Duration) -> Result<Self, CaveatError> {
        if lifetime <= Duration::zero() {
            return Err(CaveatError::invalid(
                Self::KIND,
                "before_threshold",
                "lifetime must be positive",
            ));
        }
        let out_of_range = || {
            CaveatError::invalid(
                Self::KIND,
                "before_threshold",
                format!("{lifetime} from now is out of range"),
            )
        };
        let expiry = Utc::now()
            .checked_add_signed(lifetime)
            .ok_or_else(out_of_range)?;
        let terms = Self {
            after_threshold: 0,
            before_threshold: u64::try_from(expiry.timestamp()).map_err(|_| out_of_range())?,
        };
        terms.check()?;
        Ok(terms)
    }

    fn check(&self) -> Result<(), CaveatError> {
        for (field, value) in [
            ("after_threshold", self.after_threshold),
            ("before_threshold", self.before_threshold),
        ] {
            if value > MAX_TIMESTAMP {
                return Err(CaveatError::invalid(
                    Self::KIND,
                    field,
                    format!("{value} is past {MAX_TIMESTAMP}, timestamps are in seconds"),
                ));
            }
        }
        Ok(())
    }
}

impl TermsCodec for TimestampTerms {
    const KIND: CaveatKind = CaveatKind::Timestamp;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        self.check()?;
        Ok(TermsWriter::new()
            .word(U256::from(self.after_threshold))
            .word(U256::from(self.before_threshold))
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, 2 * WORD)?;
        let mut reader = TermsReader::new(terms);
        let decoded = Self {
            after_threshold: reader
                .uint_u64(WORD, "after_threshold")
                .map_err(CaveatError::field(Self::KIND, "after_threshold"))?,
            before_threshold: reader
                .uint_u64(WORD, "before_threshold")
                .map_err(CaveatError::field(Self::KIND, "before_threshold"))?,
        };
        decoded.check()?;
        Ok(decoded)
    }
}

const BLOCK_NUMBER_WIDTH: usize = 16;

/// Redemption must happen strictly after block `after_threshold` and strictly
/// before block `before_threshold`. Zero leaves that side unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockNumberTerms {
    /// Lower bound, 0 for none.
    pub after_threshold: u128,
    /// Upper bound, 0 for none.
    pub before_threshold: u128,
}

impl TermsCodec for BlockNumberTerms {
    const KIND: CaveatKind = CaveatKind::BlockNumber;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        if self.after_threshold == 0 && self.before_threshold == 0 {
            return Err(CaveatError::invalid(
                Self::KIND,
                "after_threshold",
                "at least one threshold must be set",
            ));
        }
        if self.before_threshold != 0 && self.after_threshold >= self.before_threshold {
            return Err(CaveatError::invalid(
                Self::KIND,
                "before_threshold",
                "must be greater than after_threshold",
            ));
        }
        Ok(TermsWriter::new()
            .bytes(&self.after_threshold.to_be_bytes())
            .bytes(&self.before_threshold.to_be_bytes())
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, 2 * BLOCK_NUMBER_WIDTH)?;
        let mut reader = TermsReader::new(terms);
        let after = reader.fixed::<BLOCK_NUMBER_WIDTH>()?;
        let before = reader.fixed::<BLOCK_NUMBER_WIDTH>()?;
        Ok(Self {
            after_threshold: u128::from_be_bytes(after.0),
            before_threshold: u128::from_be_bytes(before.0),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_layout() {
        let terms = TimestampTerms {
            after_threshold: 1_700_000_000,
            before_threshold: 0,
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 64);
        assert_eq!(U256::from_be_slice(&encoded[..32]), U256::from(1_700_000_000u64));
        assert_eq!(&encoded[32..], &[0u8; 32]);
        assert_eq!(TimestampTerms::decode_terms(&encoded).unwrap(), terms);
    }

    #[test]
    fn test_timestamp_has_no_ordering_constraint() {
        let inverted = TimestampTerms {
            after_threshold: 2_000,
            before_threshold: 1_000,
        };
        assert!(inverted.encode_terms().is_ok());
    }

    #[test]
    fn test_timestamp_rejects_milliseconds() {
        let err = TimestampTerms {
            after_threshold: 1_700_000_000_000,
            before_threshold: 0,
        }
        .encode_terms()
        .unwrap_err();
        assert!(matches!(
            err,
            CaveatError::InvalidTerms { field: "after_threshold", .. }
        ));
    }

    #[test]
    fn test_expiring_window() {
        let before = Utc::now().timestamp() as u64;
        let terms = TimestampTerms::expiring_in(Duration::hours(1)).unwrap();
        assert_eq!(terms.after_threshold, 0);
        assert!(terms.before_threshold >= before + 3_600);
        assert!(terms.before_threshold <= before + 3_602);

        assert!(TimestampTerms::expiring_in(Duration::zero()).is_err());
        assert!(TimestampTerms::expiring_in(Duration::days(365 * 10_000)).is_err());
    }

    #[test]
    fn test_expiring_window_overflow_is_an_error() {
        assert!(matches!(
            TimestampTerms::expiring_in(Duration::MAX).unwrap_err(),
            CaveatError::InvalidTerms {
                field: "before_threshold",
                ..
            }
        ));
    }

    #[test]
    fn test_block_number_layout_and_validation() {
        let terms = BlockNumberTerms {
            after_threshold: 100,
            before_threshold: 200,
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 32);
        assert_eq!(encoded[15], 100);
        assert_eq!(encoded[31], 200);
        assert_eq!(BlockNumberTerms::decode_terms(&encoded).unwrap(), terms);

        assert!(BlockNumberTerms::default().encode_terms().is_err());
        assert!(BlockNumberTerms {
            after_threshold: 5,
            before_threshold: 5
        }
        .encode_terms()
        .is_err());
        assert!(BlockNumberTerms::decode_terms(&[0u8; 64]).is_err());
    }
}
