use std::{fmt::Display, str::FromStr};

use alloy::primitives::{Address, Bytes, FixedBytes};
use ruint::aliases::U256;

/// Fixed-width big-endian packing and hex predicates used by every term encoder.
pub mod codec;

/// Process-wide configuration.
pub mod config;

/// Logging facade that can be integrated with foreign language bindings.
pub mod logger;

pub use codec::{TermsReader, TermsWriter};

/// A wrapper around hex-encoded bytes (may or may not be a number).
///
/// Output is always prefixed with "0x" and lowercase.
///
/// # Examples
/// ```
/// use covenant::primitives::HexEncodedData;
/// let hex_string = HexEncodedData::new("0x1234567890abcdef").unwrap();
/// assert_eq!(hex_string.to_hex_string(), "0x1234567890abcdef");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Object)]
pub struct HexEncodedData(String);

#[uniffi::export]
impl HexEncodedData {
    /// Initializes a new `HexEncodedData` from a hex string.
    ///
    /// # Arguments
    /// * `s` - The hex string to initialize the `HexEncodedData` from. May or may not be prefixed with "0x".
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidHexString` if the provided string is not validly encoded hex data.
    #[uniffi::constructor]
    pub fn new(s: &str) -> Result<Self, PrimitiveError> {
        let s = s.strip_prefix("0x").unwrap_or(s);
        hex::decode(s).map_err(|_| PrimitiveError::InvalidHexString(s.to_string()))?;
        Ok(Self(format!("0x{}", s.to_ascii_lowercase())))
    }

    /// Returns the wrapped hex string as a String. Re-wraps `Display` trait for foreign code.
    #[must_use]
    pub fn to_hex_string(&self) -> String {
        self.0.clone()
    }
}

impl HexEncodedData {
    /// Encodes raw bytes.
    #[must_use]
    pub fn from_bytes(bytes: impl AsRef<[u8]>) -> Self {
        Self(format!("0x{}", hex::encode(bytes)))
    }

    /// Returns the wrapped hex string as a &str.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Decodes the wrapped hex string back into bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        // the inner string is validated on construction
        hex::decode(&self.0[2..]).unwrap_or_default()
    }
}

impl Display for HexEncodedData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<HexEncodedData> for String {
    fn from(hex_encoded_string: HexEncodedData) -> Self {
        hex_encoded_string.0
    }
}

impl From<Bytes> for HexEncodedData {
    fn from(bytes: Bytes) -> Self {
        Self::from_bytes(bytes)
    }
}

impl<const N: usize> From<FixedBytes<N>> for HexEncodedData {
    fn from(bytes: FixedBytes<N>) -> Self {
        Self::from_bytes(bytes)
    }
}

impl TryFrom<&str> for HexEncodedData {
    type Error = PrimitiveError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        Self::new(s)
    }
}

/// Represents primitive errors on covenant.
#[crate::covenant_error]
pub enum PrimitiveError {
    /// The provided string is not validly encoded hex data.
    #[error("invalid hex string: {0}")]
    InvalidHexString(String),
    /// A provided raw input could not be parsed, is incorrectly formatted, incorrectly encoded or otherwise invalid.
    #[error("invalid input on {attribute}: {message}")]
    InvalidInput {
        /// The name of the attribute that was invalid.
        attribute: &'static str,
        /// Explicit failure message for the attribute validation.
        message: String,
    },
    /// A value does not fit into the fixed width it must be packed into. Values are never truncated.
    #[error("value of {actual} bytes does not fit into {width} bytes")]
    TermsOverflow {
        /// The fixed width in bytes.
        width: usize,
        /// The minimal width of the value in bytes.
        actual: usize,
    },
}

/// Parses string-typed values received from foreign code into their strongly typed counterparts.
pub trait ParseFromForeignBinding: Sized {
    /// Parses `value`, naming `attribute` in the error if it is invalid.
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidInput` if the value cannot be parsed.
    fn parse_from_ffi(value: &str, attribute: &'static str) -> Result<Self, PrimitiveError>;
}

impl ParseFromForeignBinding for Address {
    fn parse_from_ffi(value: &str, attribute: &'static str) -> Result<Self, PrimitiveError> {
        Self::from_str(value).map_err(|e| PrimitiveError::InvalidInput {
            attribute,
            message: e.to_string(),
        })
    }
}

impl ParseFromForeignBinding for U256 {
    /// Accepts decimal strings or `0x`-prefixed hex strings.
    fn parse_from_ffi(value: &str, attribute: &'static str) -> Result<Self, PrimitiveError> {
        Self::from_str(value).map_err(|e| PrimitiveError::InvalidInput {
            attribute,
            message: e.to_string(),
        })
    }
}

impl ParseFromForeignBinding for u64 {
    fn parse_from_ffi(value: &str, attribute: &'static str) -> Result<Self, PrimitiveError> {
        let parsed = U256::parse_from_ffi(value, attribute)?;
        parsed.try_into().map_err(|_| PrimitiveError::InvalidInput {
            attribute,
            message: "does not fit in 64 bits".to_string(),
        })
    }
}

impl ParseFromForeignBinding for Bytes {
    /// Byte strings from foreign code must carry the `0x` prefix.
    fn parse_from_ffi(value: &str, attribute: &'static str) -> Result<Self, PrimitiveError> {
        codec::decode_prefixed_hex(value, attribute).map(Into::into)
    }
}

impl ParseFromForeignBinding for FixedBytes<32> {
    /// Accepts any `0x`-prefixed hex value of at most 32 bytes, left-padded with zeros.
    fn parse_from_ffi(value: &str, attribute: &'static str) -> Result<Self, PrimitiveError> {
        let bytes = codec::decode_prefixed_hex(value, attribute)?;
        let padded = codec::pad_left(&bytes, 32)?;
        Ok(Self::from_slice(&padded))
    }
}

/// Chains with a known delegation framework deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum)]
pub enum Network {
    /// Ethereum mainnet.
    Ethereum,
    /// OP Mainnet.
    Optimism,
    /// BNB Smart Chain.
    Bsc,
    /// Gnosis Chain.
    Gnosis,
    /// Polygon PoS.
    Polygon,
    /// Base.
    Base,
    /// Arbitrum One.
    Arbitrum,
    /// Linea.
    Linea,
    /// Sepolia testnet.
    Sepolia,
    /// Base Sepolia testnet.
    BaseSepolia,
    /// Linea Sepolia testnet.
    LineaSepolia,
}

impl Network {
    /// All networks with a known deployment.
    pub const ALL: [Self; 11] = [
        Self::Ethereum,
        Self::Optimism,
        Self::Bsc,
        Self::Gnosis,
        Self::Polygon,
        Self::Base,
        Self::Arbitrum,
        Self::Linea,
        Self::Sepolia,
        Self::BaseSepolia,
        Self::LineaSepolia,
    ];

    /// The EIP-155 chain id.
    #[must_use]
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Ethereum => 1,
            Self::Optimism => 10,
            Self::Bsc => 56,
            Self::Gnosis => 100,
            Self::Polygon => 137,
            Self::Base => 8453,
            Self::Arbitrum => 42161,
            Self::Linea => 59144,
            Self::Sepolia => 11_155_111,
            Self::BaseSepolia => 84532,
            Self::LineaSepolia => 59141,
        }
    }

    /// Looks up a network by chain id.
    #[must_use]
    pub fn from_chain_id(chain_id: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|network| network.chain_id() == chain_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_encoded_string() {
        let hex_string = HexEncodedData::new("0x1234567890ABCDEF").unwrap();

        assert_eq!(hex_string.to_hex_string(), "0x1234567890abcdef".to_string());
        assert_eq!(
            hex_string.to_bytes(),
            vec![0x12, 0x34, 0x56, 0x78, 0x90, 0xab, 0xcd, 0xef]
        );
    }

    #[test]
    fn test_hex_encoded_string_invalid() {
        let hex_string = HexEncodedData::new("0xg1234");

        assert!(hex_string.is_err());
        assert_eq!(
            hex_string.err().unwrap().to_string(),
            "invalid hex string: g1234".to_string()
        );
    }

    #[test]
    fn test_parse_u256_from_ffi_accepts_decimal_and_hex() {
        assert_eq!(U256::parse_from_ffi("1000", "amount").unwrap(), U256::from(1000));
        assert_eq!(U256::parse_from_ffi("0x3e8", "amount").unwrap(), U256::from(1000));

        let err = U256::parse_from_ffi("ten", "amount").unwrap_err();
        assert!(err.to_string().starts_with("invalid input on amount:"));
    }

    #[test]
    fn test_parse_bytes_from_ffi_requires_prefix() {
        assert_eq!(
            Bytes::parse_from_ffi("0xdeadbeef", "calldata").unwrap(),
            Bytes::from(vec![0xde, 0xad, 0xbe, 0xef])
        );
        assert!(Bytes::parse_from_ffi("deadbeef", "calldata").is_err());
    }

    #[test]
    fn test_network_chain_id_round_trip() {
        for network in Network::ALL {
            assert_eq!(Network::from_chain_id(network.chain_id()), Some(network));
        }
        assert_eq!(Network::from_chain_id(31337), None);
    }
}
