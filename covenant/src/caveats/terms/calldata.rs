use std::fmt::Display;

use alloy::primitives::{keccak256, Bytes, FixedBytes};
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::{expect_min_len, expect_multiple_of, CaveatError, CaveatKind, TermsCodec};
use crate::primitives::codec::{self, TermsReader, TermsWriter, WORD};

/// The redemption calldata must equal `calldata` byte for byte.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExactCalldataTerms {
    /// The expected calldata. Empty means "no calldata", i.e. a plain value transfer.
    pub calldata: Bytes,
}

impl ExactCalldataTerms {
    /// Parses `0x`-prefixed hex calldata.
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` if the prefix is missing or the hex is malformed.
    pub fn from_hex(calldata: &str) -> Result<Self, CaveatError> {
        let calldata = codec::decode_prefixed_hex(calldata, "calldata")
            .map_err(CaveatError::field(Self::KIND, "calldata"))?;
        Ok(Self {
            calldata: calldata.into(),
        })
    }
}

impl TermsCodec for ExactCalldataTerms {
    const KIND: CaveatKind = CaveatKind::ExactCalldata;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(self.calldata.to_vec())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        Ok(Self {
            calldata: Bytes::copy_from_slice(terms),
        })
    }
}

/// The redemption calldata must contain `value` starting at byte `start_index`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedCalldataTerms {
    /// Offset into the calldata, selector included.
    pub start_index: U256,
    /// Bytes expected at the offset.
    pub value: Bytes,
}

impl TermsCodec for AllowedCalldataTerms {
    const KIND: CaveatKind = CaveatKind::AllowedCalldata;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        if self.value.is_empty() {
            return Err(CaveatError::invalid(Self::KIND, "value", "must not be empty"));
        }
        Ok(TermsWriter::new()
            .word(self.start_index)
            .bytes(&self.value)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_min_len(Self::KIND, terms, WORD + 1)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            start_index: reader.word()?,
            value: Bytes::copy_from_slice(reader.rest()),
        })
    }
}

/// A 4-byte function selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MethodSelector(pub FixedBytes<4>);

impl MethodSelector {
    /// Accepts either a 4-byte hex selector (`0xa9059cbb`) or a function signature
    /// (`transfer(address,uint256)`), which is hashed.
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` if the input is neither.
    pub fn parse(value: &str) -> Result<Self, CaveatError> {
        if codec::is_hex_of_byte_len(value, 4) {
            let bytes = codec::decode_prefixed_hex(value, "selectors")?;
            return Ok(Self(FixedBytes::from_slice(&bytes)));
        }
        if is_function_signature(value) {
            return Ok(Self::from_signature(value));
        }
        Err(CaveatError::invalid(
            CaveatKind::AllowedMethods,
            "selectors",
            format!("{value} is neither a 4-byte selector nor a function signature"),
        ))
    }

    /// Hashes a canonical function signature into its selector.
    #[must_use]
    pub fn from_signature(signature: &str) -> Self {
        let hash = keccak256(signature.as_bytes());
        Self(FixedBytes::from_slice(&hash[..4]))
    }
}

impl Display for MethodSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

fn is_function_signature(value: &str) -> bool {
    value
        .split_once('(')
        .is_some_and(|(name, rest)| !name.is_empty() && rest.ends_with(')'))
}

/// The redemption calldata must start with one of `selectors`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AllowedMethodsTerms {
    /// Allowed selectors, at least one.
    pub selectors: Vec<MethodSelector>,
}

impl AllowedMethodsTerms {
    /// Parses each entry with [`MethodSelector::parse`].
    ///
    /// # Errors
    /// - `CaveatError::InvalidTerms` if an entry is neither a selector nor a signature.
    pub fn parse<S: AsRef<str>>(selectors: &[S]) -> Result<Self, CaveatError> {
        let selectors = selectors
            .iter()
            .map(|s| MethodSelector::parse(s.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(Self { selectors })
    }
}

impl TermsCodec for AllowedMethodsTerms {
    const KIND: CaveatKind = CaveatKind::AllowedMethods;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        if self.selectors.is_empty() {
            return Err(CaveatError::invalid(
                Self::KIND,
                "selectors",
                "at least one selector is required",
            ));
        }
        Ok(self
            .selectors
            .iter()
            .fold(TermsWriter::new(), |writer, selector| {
                writer.bytes(selector.0.as_slice())
            })
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_multiple_of(Self::KIND, terms, 4)?;
        Ok(Self {
            selectors: terms
                .chunks_exact(4)
                .map(|chunk| MethodSelector(FixedBytes::from_slice(chunk)))
                .collect(),
        })
    }
}

/// The redemption `args` must equal `args`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArgsEqualityCheckTerms {
    /// Expected args.
    pub args: Bytes,
}

impl TermsCodec for ArgsEqualityCheckTerms {
    const KIND: CaveatKind = CaveatKind::ArgsEqualityCheck;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(self.args.to_vec())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        Ok(Self {
            args: Bytes::copy_from_slice(terms),
        })
    }
}
