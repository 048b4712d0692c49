use alloy::primitives::{Address, Bytes};
use ruint::aliases::U256;
use serde::{Deserialize, Serialize};

use crate::caveats::terms::native::{require_positive, BalanceChangeType};
use crate::caveats::{expect_len, expect_min_len, CaveatError, CaveatKind, TermsCodec};
use crate::primitives::codec::{TermsReader, TermsWriter, ADDRESS, WORD};

/// Caps the total amount of `token` transferred through `transfer` calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20TransferAmountTerms {
    /// The token.
    pub token: Address,
    /// Total allowance in the token's base unit.
    pub max_amount: U256,
}

impl TermsCodec for Erc20TransferAmountTerms {
    const KIND: CaveatKind = CaveatKind::Erc20TransferAmount;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        require_positive(Self::KIND, "max_amount", self.max_amount)?;
        Ok(TermsWriter::new()
            .address(self.token)
            .word(self.max_amount)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, ADDRESS + WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            token: reader.address()?,
            max_amount: reader.word()?,
        })
    }
}

/// Permits transferring token `token_id` of the `token` collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721TransferTerms {
    /// The collection.
    pub token: Address,
    /// The transferable token.
    pub token_id: U256,
}

impl TermsCodec for Erc721TransferTerms {
    const KIND: CaveatKind = CaveatKind::Erc721Transfer;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        Ok(TermsWriter::new()
            .address(self.token)
            .word(self.token_id)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, ADDRESS + WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            token: reader.address()?,
            token_id: reader.word()?,
        })
    }
}

const TOKEN_BALANCE_CHANGE_LEN: usize = 1 + 2 * ADDRESS + WORD;

struct TokenBalanceChange {
    change_type: BalanceChangeType,
    token: Address,
    recipient: Address,
    balance: U256,
}

impl TokenBalanceChange {
    fn encode(&self, kind: CaveatKind) -> Result<Vec<u8>, CaveatError> {
        require_positive(kind, "balance", self.balance)?;
        Ok(TermsWriter::new()
            .bytes(&[self.change_type as u8])
            .address(self.token)
            .address(self.recipient)
            .word(self.balance)
            .finish())
    }

    fn decode(kind: CaveatKind, terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(kind, terms, TOKEN_BALANCE_CHANGE_LEN)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            change_type: BalanceChangeType::from_byte(kind, reader.take(1)?[0])?,
            token: reader.address()?,
            recipient: reader.address()?,
            balance: reader.word()?,
        })
    }
}

/// Asserts the ERC-20 balance of `recipient` changes by `balance` during the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc20BalanceChangeTerms {
    /// Direction of the change.
    pub change_type: BalanceChangeType,
    /// The token.
    pub token: Address,
    /// Account whose balance is checked.
    pub recipient: Address,
    /// Minimum increase or maximum decrease.
    pub balance: U256,
}

impl TermsCodec for Erc20BalanceChangeTerms {
    const KIND: CaveatKind = CaveatKind::Erc20BalanceChange;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        TokenBalanceChange {
            change_type: self.change_type,
            token: self.token,
            recipient: self.recipient,
            balance: self.balance,
        }
        .encode(Self::KIND)
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        let change = TokenBalanceChange::decode(Self::KIND, terms)?;
        Ok(Self {
            change_type: change.change_type,
            token: change.token,
            recipient: change.recipient,
            balance: change.balance,
        })
    }
}

/// Asserts the number of `token` NFTs held by `recipient` changes by `amount` during the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc721BalanceChangeTerms {
    /// Direction of the change.
    pub change_type: BalanceChangeType,
    /// The collection.
    pub token: Address,
    /// Account whose balance is checked.
    pub recipient: Address,
    /// Minimum increase or maximum decrease in token count.
    pub amount: U256,
}

impl TermsCodec for Erc721BalanceChangeTerms {
    const KIND: CaveatKind = CaveatKind::Erc721BalanceChange;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        TokenBalanceChange {
            change_type: self.change_type,
            token: self.token,
            recipient: self.recipient,
            balance: self.amount,
        }
        .encode(Self::KIND)
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        let change = TokenBalanceChange::decode(Self::KIND, terms)?;
        Ok(Self {
            change_type: change.change_type,
            token: change.token,
            recipient: change.recipient,
            amount: change.balance,
        })
    }
}

/// Asserts the balance of `token_id` held by `recipient` changes by `balance` during the execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Erc1155BalanceChangeTerms {
    /// Direction of the change.
    pub change_type: BalanceChangeType,
    /// The multi-token contract.
    pub token: Address,
    /// Account whose balance is checked.
    pub recipient: Address,
    /// The token id.
    pub token_id: U256,
    /// Minimum increase or maximum decrease.
    pub balance: U256,
}

impl TermsCodec for Erc1155BalanceChangeTerms {
    const KIND: CaveatKind = CaveatKind::Erc1155BalanceChange;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        require_positive(Self::KIND, "balance", self.balance)?;
        Ok(TermsWriter::new()
            .bytes(&[self.change_type as u8])
            .address(self.token)
            .address(self.recipient)
            .word(self.token_id)
            .word(self.balance)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_len(Self::KIND, terms, TOKEN_BALANCE_CHANGE_LEN + WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            change_type: BalanceChangeType::from_byte(Self::KIND, reader.take(1)?[0])?,
            token: reader.address()?,
            recipient: reader.address()?,
            token_id: reader.word()?,
            balance: reader.word()?,
        })
    }
}

/// A batch of exactly two executions: `transfer(recipient, amount)` on `token`,
/// then a call to `target` with `calldata`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SpecificActionErc20TransferBatchTerms {
    /// Token of the first execution.
    pub token: Address,
    /// Transfer recipient.
    pub recipient: Address,
    /// Transfer amount.
    pub amount: U256,
    /// Target of the second execution.
    pub target: Address,
    /// Calldata of the second execution.
    pub calldata: Bytes,
}

impl TermsCodec for SpecificActionErc20TransferBatchTerms {
    const KIND: CaveatKind = CaveatKind::SpecificActionErc20TransferBatch;

    fn encode_terms(&self) -> Result<Vec<u8>, CaveatError> {
        require_positive(Self::KIND, "amount", self.amount)?;
        Ok(TermsWriter::new()
            .address(self.token)
            .address(self.recipient)
            .word(self.amount)
            .address(self.target)
            .bytes(&self.calldata)
            .finish())
    }

    fn decode_terms(terms: &[u8]) -> Result<Self, CaveatError> {
        expect_min_len(Self::KIND, terms, 3 * ADDRESS + WORD)?;
        let mut reader = TermsReader::new(terms);
        Ok(Self {
            token: reader.address()?,
            recipient: reader.address()?,
            amount: reader.word()?,
            target: reader.address()?,
            calldata: Bytes::copy_from_slice(reader.rest()),
        })
    }
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{address, bytes};

    use super::*;

    const TOKEN: Address = address!("0x2cfc85d8e48f8eab294be644d9e25c3030863003");
    const RECIPIENT: Address = address!("0x3C44CdDdB6a900fa2b585dd299e03d12FA4293BC");

    #[test]
    fn test_erc20_transfer_amount_layout() {
        let terms = Erc20TransferAmountTerms {
            token: TOKEN,
            max_amount: U256::from(1_000_000u64),
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 52);
        assert_eq!(&encoded[..20], TOKEN.as_slice());
        assert_eq!(Erc20TransferAmountTerms::decode_terms(&encoded).unwrap(), terms);
        assert!(Erc20TransferAmountTerms::decode_terms(&encoded[..51]).is_err());
    }

    #[test]
    fn test_balance_change_widths() {
        let erc20 = Erc20BalanceChangeTerms {
            change_type: BalanceChangeType::Increase,
            token: TOKEN,
            recipient: RECIPIENT,
            balance: U256::from(5),
        };
        let encoded = erc20.encode_terms().unwrap();
        assert_eq!(encoded.len(), 73);
        assert_eq!(encoded[0], 0);
        assert_eq!(&encoded[21..41], RECIPIENT.as_slice());
        assert_eq!(Erc20BalanceChangeTerms::decode_terms(&encoded).unwrap(), erc20);

        let erc1155 = Erc1155BalanceChangeTerms {
            change_type: BalanceChangeType::Decrease,
            token: TOKEN,
            recipient: RECIPIENT,
            token_id: U256::from(9),
            balance: U256::from(2),
        };
        let encoded = erc1155.encode_terms().unwrap();
        assert_eq!(encoded.len(), 105);
        assert_eq!(Erc1155BalanceChangeTerms::decode_terms(&encoded).unwrap(), erc1155);

        assert!(Erc721BalanceChangeTerms {
            change_type: BalanceChangeType::Increase,
            token: TOKEN,
            recipient: RECIPIENT,
            amount: U256::ZERO,
        }
        .encode_terms()
        .is_err());
    }

    #[test]
    fn test_specific_action_batch_layout() {
        let terms = SpecificActionErc20TransferBatchTerms {
            token: TOKEN,
            recipient: RECIPIENT,
            amount: U256::from(10),
            target: address!("0x70997970C51812dc3A010C7d01b50e0d17dc79C8"),
            calldata: bytes!("0xd0e30db0"),
        };
        let encoded = terms.encode_terms().unwrap();
        assert_eq!(encoded.len(), 96);
        assert_eq!(
            SpecificActionErc20TransferBatchTerms::decode_terms(&encoded).unwrap(),
            terms
        );
    }
}
