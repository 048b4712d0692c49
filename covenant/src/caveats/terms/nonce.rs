use alloy::primitives::B256;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::{expect_len, CaveatError, CaveatKind, TermsCodec};
use crate::primitives::codec::{self, TermsReader, TermsWriter, WORD};

/// Revocation nonce. The delegator bulk-revokes every delegation carrying an
/// older nonce by incrementing its nonce on the enforcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonceTerms {
    /// The nonce, left-padded to 32 bytes.
    pub nonce: B256,
}

impl NonceTerms {
    /// Parses a `0x`-prefixed hex nonce of at most 32 bytes.
    ///
    /// Short values are left-padded. An odd number of digits is read as a number,
    /// so `0x123` is the same nonce as `0x0123`.
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` if the nonce is empty, not `0x`-prefixed hex, or longer than 32 bytes.
    pub fn from_hex(nonce: &str) -> Result<Self, CaveatError> {
        if nonce.is_empty() || nonce == "0x" {
            return Err(Self::invalid("must not be empty"));
        }
        let Some(digits) = codec::strip_hex_prefix(nonce) else {
            return Err(Self::invalid("must be a hex string prefixed with 0x"));
        };
        if !codec::is_hex(nonce) {
            return Err(Self::invalid("must be a valid BytesLike value"));
        }
        if digits.len() > 2 * WORD {
            return Err(Self::invalid("must be 32 bytes or less in length"));
        }

        let even = if digits.len() % 2 == 1 {
            format!("0{digits}")
        } else {
            digits.to_string()
        };
        let bytes = hex::decode(even).map_err(|e| Self::invalid(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    /// Builds a nonce from at most 32 raw bytes.
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` if `bytes` is empty or longer than 32 bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CaveatError> {
        if bytes.is_empty() {
            return Err(Self::invalid("must not be empty"));
        }
        let padded = codec::pad_left(bytes, WORD)
            .map_err(|_| Self::invalid("must be 32 bytes or less in length"))?;
        Ok(Self {
            nonce: B256::from_slice(&padded),
        })
    }

    fn invalid(message: impl Into<String>) -> CaveatError {
        CaveatError::invalid(Self::KIND, "nonce", message)
    }
}

impl From<U256> for NonceTerms {
    fn from(nonce: U256) -> Self {
        Self {
            nonce: B256::from(nonce.to_be_bytes::<WORD>()),
        }
    }
}

impl TermsCodec for NonceTerms {
    const KIND: CaveatKind = CaveatKind::Nonce;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(self.nonce.to_vec())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, WORD)?;
        Ok(Self {
            nonce: B256::from_slice(terms),
        })
    }
}

/// Only one delegation sharing `id` can ever be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdTerms {
    /// Group id.
    pub id: U256,
}

impl TermsCodec for IdTerms {
    const KIND: CaveatKind = CaveatKind::Id;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(TermsWriter::new().word(self.id).finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, WORD)?;
        Ok(Self {
            id: TermsReader::new(terms).word()?,
        })
    }
}

/// Caps how many times the delegation can be redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LimitedCallsTerms {
    /// Maximum number of redemptions, at least one.
    pub limit: u64,
}

impl TermsCodec for LimitedCallsTerms {
    const KIND: CaveatKind = CaveatKind::LimitedCalls;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        if self.limit == 0 {
            return Err(CaveatError::invalid(Self::KIND, "limit", "must be greater than zero"));
        }
        Ok(TermsWriter::new().word(U256::from(self.limit)).finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, WORD)?;
        let limit = TermsReader::new(terms)
            .uint_u64(WORD, "limit")
            .map_err(CaveatError::field(Self::KIND, "limit"))?;
        Ok(Self { limit })
    }
}
