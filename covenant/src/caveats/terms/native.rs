use alloy::primitives::Address;
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::{expect_len, CaveatError, CaveatKind, TermsCodec};
use crate::primitives::codec::{TermsReader, TermsWriter, ADDRESS, WORD};

/// Direction of a balance change assertion, the leading byte of every balance-change layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum BalanceChangeType {
    /// The recipient's balance must grow by at least the amount.
    Increase = 0,
    /// The recipient's balance must shrink by at most the amount.
    Decrease = 1,
}

impl BalanceChangeType {
    pub(crate) fn from_byte(kind: CaveatKind, byte: u8) -> Result<Self, CaveatError> {
        match byte {
            0 => Ok(Self::Increase),
            1 => Ok(Self::Decrease),
            other => Err(CaveatError::invalid(
                kind,
                "change_type",
                format!("unknown balance change type {other}"),
            )),
        }
    }
}

pub(crate) fn require_positive(kind: CaveatKind, field: &'static str, value: U256) -> Result<(), CaveatError> {
    if value.is_zero() {
        return Err(CaveatError::invalid(kind, field, "must be greater than zero"));
    }
    Ok(())
}

/// Caps the native value of each execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValueLteTerms {
    /// Largest accepted value in wei. Zero forbids sending value.
    pub max_value: U256,
}

impl TermsCodec for ValueLteTerms {
    const KIND: CaveatKind = CaveatKind::ValueLte;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(TermsWriter::new().word(self.max_value).finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, WORD)?;
        Ok(Self {
            max_value: TermsReader::new(terms).word()?,
        })
    }
}

/// Caps the total native token amount across all redemptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenTransferAmountTerms {
    /// Total allowance in wei.
    pub max_amount: U256,
}

impl TermsCodec for NativeTokenTransferAmountTerms {
    const KIND: CaveatKind = CaveatKind::NativeTokenTransferAmount;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        require_positive(Self::KIND, "max_amount", self.max_amount)?;
        Ok(TermsWriter::new().word(self.max_amount).finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, WORD)?;
        Ok(Self {
            max_amount: TermsReader::new(terms).word()?,
        })
    }
}

/// The redeemer must pay `amount` wei to `recipient` for the redemption to succeed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeTokenPaymentTerms {
    /// Who receives the payment.
    pub recipient: Address,
    /// Payment in wei.
    pub amount: U256,
}

impl TermsCodec for NativeTokenPaymentTerms {
    const KIND: CaveatKind = CaveatKind::NativeTokenPayment;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        require_positive(Self::KIND, "amount", self.amount)?;
        Ok(TermsWriter::new()
            .address(self.recipient)
            .word(self.amount)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, ADDRESS + WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            recipient: reader.address()?,
            amount: reader.word()?,
        })
    }
}

/// Asserts the native balance of `recipient` changes by `balance` during the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NativeBalanceChangeTerms {
    /// Direction of the change.
    pub change_type: BalanceChangeType,
    /// Account whose balance is checked.
    pub recipient: Address,
    /// Minimum increase or maximum decrease, in wei.
    pub balance: U256,
}

impl TermsCodec for NativeBalanceChangeTerms {
    const KIND: CaveatKind = CaveatKind::NativeBalanceChange;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        require_positive(Self::KIND, "balance", self.balance)?;
        Ok(TermsWriter::new()
            .bytes(&[self.change_type as u8])
            .address(self.recipient)
            .word(self.balance)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, 1 + ADDRESS + WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            change_type: BalanceChangeType::from_byte(Self::KIND, reader.take(1)?[0])?,
            recipient: reader.address()?,
            balance: reader.word()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::address;

    use super::*;

    #[test]
    fn test_value_lte_zero_is_allowed() {
        let encoded = ValueLteTerms { max_value: U256::ZERO }.encode_terms().unwrap();
        assert_eq!(encoded, vec![0u8; 32]);
    }

    #[test]
    fn test_native_balance_change_layout() {
        let terms = NativeBalanceChangeTerms {
            change_type: BalanceChangeType::Decrease,
            recipient: address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC"),
            balance: U256::from(1),
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 53);
        assert_eq!(encoded[0], 1);
        assert_eq!(NativeBalanceChangeTerms::decode_terms(&encoded).unwrap(), terms);

        let mut corrupted = encoded;
        corrupted[0] = 2;
        assert!(NativeBalanceChangeTerms::decode_terms(&corrupted).is_err());
    }

    #[test]
    fn test_amounts_must_be_positive() {
        assert!(NativeTokenTransferAmountTerms { max_amount: U256::ZERO }
            .encode_terms()
            .is_err());
        assert!(NativeTokenPaymentTerms {
            recipient: Address::ZERO,
            amount: U256::ZERO
        }
        .encode_terms()
        .is_err());
    }
}
