//! Fixed-width big-endian packing.
//!
//! Enforcer contracts slice `terms` at hard-coded offsets, so every field is
//! written at its exact width. Values wider than their slot are rejected,
//! never truncated.

use alloy::primitives::{Address, FixedBytes};
use ruint::aliases::U256;

use super::{HexEncodedData, PrimitiveError};

/// Width of an ABI word.
pub const WORD: usize = 32;

/// Width of an address.
pub const ADDRESS: usize = 20;

/// Left-pads `bytes` with zeros up to `width`.
///
/// # Errors
/// - `PrimitiveError::TermsOverflow` if `bytes` is longer than `width`.
pub fn pad_left(bytes: &[u8], width: usize) -> Result<Vec<u8>, PrimitiveError> {
    if bytes.len() > width {
        return Err(PrimitiveError::TermsOverflow {
            width,
            actual: bytes.len(),
        });
    }
    let mut out = vec![0u8; width - bytes.len()];
    out.extend_from_slice(bytes);
    Ok(out)
}

/// Packs an unsigned integer into exactly `width` big-endian bytes.
///
/// # Errors
/// - `PrimitiveError::TermsOverflow` if the value needs more than `width` bytes.
pub fn uint_to_fixed_bytes(value: U256, width: usize) -> Result<Vec<u8>, PrimitiveError> {
    let be: [u8; WORD] = value.to_be_bytes();
    let significant = value.byte_len();
    if significant > width {
        return Err(PrimitiveError::TermsOverflow {
            width,
            actual: significant,
        });
    }
    pad_left(&be[WORD - significant..], width)
}

/// Hex form of [`uint_to_fixed_bytes`].
///
/// # Errors
/// - `PrimitiveError::TermsOverflow` if the value needs more than `width` bytes.
pub fn uint_to_fixed_hex(value: U256, width: usize) -> Result<HexEncodedData, PrimitiveError> {
    uint_to_fixed_bytes(value, width).map(HexEncodedData::from_bytes)
}

/// Hex form of [`pad_left`].
///
/// # Errors
/// - `PrimitiveError::TermsOverflow` if `bytes` is longer than `width`.
pub fn bytes_to_fixed_hex(bytes: &[u8], width: usize) -> Result<HexEncodedData, PrimitiveError> {
    pad_left(bytes, width).map(HexEncodedData::from_bytes)
}

/// Inverse of [`uint_to_fixed_hex`]: the hex value must be exactly `width` bytes.
///
/// # Errors
/// - `PrimitiveError::InvalidInput` if the string is not `0x`-prefixed hex of exactly `width` bytes.
pub fn fixed_hex_to_uint(value: &str, width: usize) -> Result<U256, PrimitiveError> {
    if width > WORD {
        return Err(PrimitiveError::TermsOverflow { width: WORD, actual: width });
    }
    let bytes = decode_prefixed_hex(value, "value")?;
    if bytes.len() != width {
        return Err(PrimitiveError::InvalidInput {
            attribute: "value",
            message: format!("expected {width} bytes, got {}", bytes.len()),
        });
    }
    Ok(U256::from_be_slice(&bytes))
}

/// Returns the digits of a `0x`-prefixed hex string, or `None` if the prefix is missing.
#[must_use]
pub fn strip_hex_prefix(value: &str) -> Option<&str> {
    value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
}

/// Whether `value` is `0x`-prefixed and every following character is a hex digit (either case).
///
/// `0x` alone is valid hex for the empty byte string.
#[must_use]
pub fn is_hex(value: &str) -> bool {
    strip_hex_prefix(value).is_some_and(|digits| digits.chars().all(|c| c.is_ascii_hexdigit()))
}

/// Whether `value` is valid hex of exactly `len` bytes.
#[must_use]
pub fn is_hex_of_byte_len(value: &str, len: usize) -> bool {
    is_hex(value) && strip_hex_prefix(value).is_some_and(|digits| digits.len() == len * 2)
}

/// Compares two hex strings ignoring digit case, as checksummed and lowercase addresses are equivalent.
#[must_use]
pub fn is_equal_hex(a: &str, b: &str) -> bool {
    match (strip_hex_prefix(a), strip_hex_prefix(b)) {
        (Some(a), Some(b)) => is_hex(&format!("0x{a}")) && a.eq_ignore_ascii_case(b),
        _ => false,
    }
}

/// Decodes a `0x`-prefixed, even-length hex string.
///
/// # Errors
/// - `PrimitiveError::InvalidInput` naming `attribute` if the prefix is missing or the digits are invalid.
pub fn decode_prefixed_hex(value: &str, attribute: &'static str) -> Result<Vec<u8>, PrimitiveError> {
    let digits = strip_hex_prefix(value).ok_or_else(|| PrimitiveError::InvalidInput {
        attribute,
        message: "must be a hex string prefixed with 0x".to_string(),
    })?;
    hex::decode(digits).map_err(|e| PrimitiveError::InvalidInput {
        attribute,
        message: e.to_string(),
    })
}

/// Appends fixed-width segments in order.
#[derive(Debug, Default)]
pub struct TermsWriter {
    buf: Vec<u8>,
}

impl TermsWriter {
    /// Creates an empty writer.
    #[must_use]
    pub const fn new() -> Self {
        Self { buf: Vec::new() }
    }

    /// Appends a 20-byte address.
    #[must_use]
    pub fn address(mut self, address: Address) -> Self {
        self.buf.extend_from_slice(address.as_slice());
        self
    }

    /// Appends an unsigned integer packed into `width` bytes.
    ///
    /// # Errors
    /// - `PrimitiveError::TermsOverflow` if the value does not fit.
    pub fn uint(mut self, value: U256, width: usize) -> Result<Self, PrimitiveError> {
        self.buf.extend(uint_to_fixed_bytes(value, width)?);
        Ok(self)
    }

    /// Appends a full 32-byte word.
    #[must_use]
    pub fn word(mut self, value: U256) -> Self {
        self.buf.extend_from_slice(&value.to_be_bytes::<WORD>());
        self
    }

    /// Appends raw bytes verbatim.
    #[must_use]
    pub fn bytes(mut self, bytes: &[u8]) -> Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    /// Returns the packed bytes.
    #[must_use]
    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

/// Reads fixed-width segments in order. Callers check the total length first.
#[derive(Debug)]
pub struct TermsReader<'a> {
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> TermsReader<'a> {
    /// Starts reading at the beginning of `bytes`.
    #[must_use]
    pub const fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, offset: 0 }
    }

    /// Bytes not consumed yet.
    #[must_use]
    pub const fn remaining(&self) -> usize {
        self.bytes.len() - self.offset
    }

    /// Takes the next `len` bytes.
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidInput` if fewer than `len` bytes remain.
    pub fn take(&mut self, len: usize) -> Result<&'a [u8], PrimitiveError> {
        if self.remaining() < len {
            return Err(PrimitiveError::InvalidInput {
                attribute: "terms",
                message: format!(
                    "unexpected end of terms at offset {}, needed {len} more bytes",
                    self.offset
                ),
            });
        }
        let slice = &self.bytes[self.offset..self.offset + len];
        self.offset += len;
        Ok(slice)
    }

    /// Takes a 20-byte address.
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidInput` if fewer than 20 bytes remain.
    pub fn address(&mut self) -> Result<Address, PrimitiveError> {
        self.take(ADDRESS).map(Address::from_slice)
    }

    /// Takes an unsigned integer packed into `width` bytes.
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidInput` if fewer than `width` bytes remain.
    pub fn uint(&mut self, width: usize) -> Result<U256, PrimitiveError> {
        if width > WORD {
            return Err(PrimitiveError::TermsOverflow { width: WORD, actual: width });
        }
        self.take(width).map(U256::from_be_slice)
    }

    /// Takes a 32-byte word.
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidInput` if fewer than 32 bytes remain.
    pub fn word(&mut self) -> Result<U256, PrimitiveError> {
        self.uint(WORD)
    }

    /// Takes an unsigned integer packed into `width` bytes that must fit into a `u64`.
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidInput` if fewer than `width` bytes remain or the value exceeds `u64`.
    pub fn uint_u64(&mut self, width: usize, attribute: &'static str) -> Result<u64, PrimitiveError> {
        let value = self.uint(width)?;
        value.try_into().map_err(|_| PrimitiveError::InvalidInput {
            attribute,
            message: "does not fit in 64 bits".to_string(),
        })
    }

    /// Takes `N` bytes as a fixed array.
    ///
    /// # Errors
    /// - `PrimitiveError::InvalidInput` if fewer than `N` bytes remain.
    pub fn fixed<const N: usize>(&mut self) -> Result<FixedBytes<N>, PrimitiveError> {
        self.take(N).map(FixedBytes::from_slice)
    }

    /// Takes everything that is left.
    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.bytes[self.offset..];
        self.offset = self.bytes.len();
        slice
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_uint_to_fixed_hex_pads_left() {
        assert_eq!(
            uint_to_fixed_hex(U256::from(1), 32).unwrap().to_hex_string(),
            format!("0x{}1", "0".repeat(63))
        );
        assert_eq!(
            uint_to_fixed_hex(U256::from(0xabcd), 2).unwrap().to_hex_string(),
            "0xabcd"
        );
    }

    #[test]
    fn test_uint_to_fixed_bytes_never_truncates() {
        let err = uint_to_fixed_bytes(U256::from(0x0001_0000), 2).unwrap_err();
        assert!(matches!(err, PrimitiveError::TermsOverflow { width: 2, actual: 3 }));

        let err = pad_left(&[1u8; 33], 32).unwrap_err();
        assert!(matches!(err, PrimitiveError::TermsOverflow { width: 32, actual: 33 }));
    }

    #[test]
    fn test_zero_packs_to_full_width() {
        assert_eq!(uint_to_fixed_bytes(U256::ZERO, 16).unwrap(), vec![0u8; 16]);
    }

    #[test]
    fn test_fixed_hex_to_uint_is_inverse() {
        let hex = uint_to_fixed_hex(U256::from(123_456_789u64), 16).unwrap();
        assert_eq!(
            fixed_hex_to_uint(hex.as_str(), 16).unwrap(),
            U256::from(123_456_789u64)
        );
        assert!(fixed_hex_to_uint(hex.as_str(), 32).is_err());
    }

    #[test]
    fn test_hex_predicates() {
        assert!(is_hex("0x"));
        assert!(is_hex("0xDeadBeef"));
        assert!(!is_hex("deadbeef"));
        assert!(!is_hex("0x123g"));
        assert!(is_hex_of_byte_len("0x00ff", 2));
        assert!(!is_hex_of_byte_len("0x00ff", 3));
    }

    #[test]
    fn test_is_equal_hex_ignores_case() {
        assert!(is_equal_hex(
            "0x163f8C2467924be0ae7B5347228CABF260318753",
            "0x163f8c2467924be0ae7b5347228cabf260318753"
        ));
        assert!(!is_equal_hex("0xab", "0xac"));
        assert!(!is_equal_hex("ab", "0xab"));
        assert!(!is_equal_hex("0xzz", "0xZZ"));
    }

    #[test]
    fn test_writer_and_reader_agree_on_offsets() {
        let token = address!("0x2cfc85d8e48f8eab294be644d9e25c3030863003");
        let packed = TermsWriter::new()
            .address(token)
            .uint(U256::from(7), 16)
            .unwrap()
            .word(U256::from(9))
            .bytes(&[0xaa, 0xbb])
            .finish();
        assert_eq!(packed.len(), 20 + 16 + 32 + 2);

        let mut reader = TermsReader::new(&packed);
        assert_eq!(reader.address().unwrap(), token);
        assert_eq!(reader.uint(16).unwrap(), U256::from(7));
        assert_eq!(reader.uint_u64(WORD, "value").unwrap(), 9);
        assert_eq!(reader.rest(), &[0xaa, 0xbb]);
        assert_eq!(reader.remaining(), 0);
        assert!(reader.take(1).is_err());
    }
}
